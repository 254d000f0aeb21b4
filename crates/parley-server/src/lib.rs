pub mod health;
pub mod line;
pub mod server;
pub mod signature;
pub mod state;
pub mod webhook;

pub use line::{LineClient, UserProfile};
pub use server::{create_router, run_server};
pub use state::AppState;
