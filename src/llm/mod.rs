pub mod client;
pub mod groq;
pub mod helpers;
pub mod types;

pub use client::LlmClient;
pub use groq::GroqClient;
pub use types::ChatMessage;
