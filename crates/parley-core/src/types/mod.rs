pub mod message;
pub mod model;

pub use message::{ChatMessage, Role};
pub use model::ModelInfo;
