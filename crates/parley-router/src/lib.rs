pub mod delivery;
pub mod handlers;
pub mod sender;

pub use delivery::{split_for_delivery, truncate_input, DeliverySplit};
pub use handlers::chat::{ConversationOrchestrator, OrchestratorConfig};
pub use handlers::command::{CommandContext, CommandExecutor, CommandHandler};
pub use handlers::EventHandler;
pub use sender::{MessageSender, SenderError};

use parley_llm::LLMError;
use parley_session::StorageError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RouterError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Backend error: {0}")]
    Backend(#[from] LLMError),

    #[error("Delivery error: {0}")]
    Delivery(#[from] SenderError),

    #[error("Handler error: {0}")]
    Handler(String),
}

pub type Result<T> = std::result::Result<T, RouterError>;
