//! Public types for the Headliner API.

mod attributes;
mod generate;
mod message;
mod response;

pub use attributes::{Attribute, AttributeRecord};
pub use generate::{DEFAULT_MAX_TOKENS, DEFAULT_MODEL, DEFAULT_TEMPERATURE, GenerateOptions};
pub use message::{Message, Role};
pub use response::{Completion, FinishReason, Generated, Usage};
