pub mod openai;

pub use openai::{OpenAiTransformer, StreamEvent};
