pub mod chat;
pub mod command;

use async_trait::async_trait;
use parley_core::InboundEvent;
use tokio_util::sync::CancellationToken;

use crate::Result;

/// Consumer of normalized inbound events
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle_event(&self, event: InboundEvent, cancel: &CancellationToken) -> Result<()>;
}
