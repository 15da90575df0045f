//! Caching subsystem.
//!
//! - [`MessageCache`]: process-wide store of generated messages keyed on a
//!   canonical serialization of the visitor's [`AttributeRecord`](crate::AttributeRecord).
//!   Entries expire after a TTL measured on an injectable [`Clock`].

pub mod clock;
pub mod message;

pub use clock::{Clock, ManualClock, SystemClock};
pub use message::{CacheConfig, CacheEntry, CacheKey, MessageCache};
