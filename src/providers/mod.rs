//! Completion provider implementations.

pub mod openai;
pub mod traits;

pub use openai::OpenAiProvider;
pub use traits::{FragmentStream, GenerationProvider};
