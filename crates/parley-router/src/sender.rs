use async_trait::async_trait;
use parley_core::OutgoingMessage;
use thiserror::Error;

/// Outbound delivery failure
#[derive(Error, Debug)]
pub enum SenderError {
    #[error("http error: {0}")]
    Http(String),

    #[error("api error: {status} - {body}")]
    Api { status: u16, body: String },

    #[error("config error: {0}")]
    Config(String),
}

/// Outbound message channel of the messaging platform
#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Answer an inbound event through its reply token
    async fn reply(&self, reply_token: &str, messages: Vec<OutgoingMessage>) -> Result<(), SenderError>;

    /// Send one message straight to a user
    async fn push(&self, user_id: &str, message: OutgoingMessage) -> Result<(), SenderError>;
}
