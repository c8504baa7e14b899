pub mod provider;
pub mod together;
pub mod types;

pub use provider::{EmbeddingProvider, GenerationProvider};
pub use together::TogetherProvider;
pub use types::{ChatMessage, ChatRequest};
