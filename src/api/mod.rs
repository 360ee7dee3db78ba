pub mod count_tokens;
pub mod health;
pub mod messages;
mod streaming;

pub use count_tokens::count_tokens_handler;
pub use health::health_handler;
pub use messages::messages_handler;
