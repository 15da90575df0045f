//! Headliner - campaign-aware landing-page copy
//!
//! This crate generates a short headline and description for a landing-page
//! visitor, personalized by the UTM attributes of the link they followed.
//! Generated messages are cached per attribute set, and can be delivered
//! either whole or as a stream of fragments that the consumer re-parses as
//! they arrive.
//!
//! # Example
//!
//! ```rust,no_run
//! use headliner::{AttributeRecord, Headliner};
//!
//! #[tokio::main]
//! async fn main() -> headliner::Result<()> {
//!     let service = Headliner::builder()
//!         .openai(std::env::var("OPENAI_API_KEY").ok())
//!         .build()?;
//!
//!     let record = AttributeRecord::from_query("?utm_source=google&utm_medium=cpc");
//!     let generated = service.generate(&record).await?;
//!
//!     let parsed = headliner::parse_message(&generated.message);
//!     println!("{}\n{}", parsed.headline, parsed.description);
//!     Ok(())
//! }
//! ```
//!
//! # Streaming Example
//!
//! ```rust,no_run
//! use futures_util::StreamExt;
//! use headliner::{AttributeRecord, Delivery, Headliner, IncrementalParser};
//!
//! #[tokio::main]
//! async fn main() -> headliner::Result<()> {
//!     let service = Headliner::builder().openai(Some("sk-your-key")).build()?;
//!     let record = AttributeRecord::new().source("linkedin").campaign("q3-launch");
//!
//!     match service.generate_stream(&record).await? {
//!         Delivery::Cached(message) => println!("{message}"),
//!         Delivery::Streaming(mut stream) => {
//!             let mut parser = IncrementalParser::new();
//!             while let Some(chunk) = stream.next().await {
//!                 let parsed = parser.push_bytes(&chunk?);
//!                 println!("{}", parsed.headline);
//!             }
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod cache;
#[cfg(feature = "client")]
pub mod client;
pub mod error;
pub mod gateway;
pub mod parser;
pub mod prompt;
pub mod providers;
#[cfg(feature = "server")]
pub mod server;
pub mod telemetry;
pub mod transport;
pub mod types;

/// Package version from Cargo.toml.
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

// Re-export main types at crate root
pub use cache::{CacheConfig, CacheKey, Clock, ManualClock, MessageCache, SystemClock};
pub use error::{HeadlinerError, Result};
pub use gateway::{Delivery, Headliner, HeadlinerBuilder};
pub use parser::{IncrementalParser, ParsedMessage, parse_message};
pub use providers::{FragmentStream, GenerationProvider, OpenAiProvider};
pub use transport::{MessageStream, StreamTransport, TransportState};

// Re-export all types
pub use types::{
    Attribute, AttributeRecord, Completion, FinishReason, GenerateOptions, Generated, Message,
    Role, Usage,
};
