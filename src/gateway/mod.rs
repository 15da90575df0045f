//! Generation service: validation, cache lookup, generation, delivery.

mod builder;
mod service;

pub use builder::HeadlinerBuilder;
pub use service::{Delivery, Headliner};
