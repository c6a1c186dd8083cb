//! Service layer: business logic orchestration.
//!
//! [`FulfillmentEngine`] drives the reward request lifecycle and
//! [`CatalogService`] guards writes to events and rewards. Both talk to
//! storage only through the [`crate::persistence`] traits.

pub mod catalog_service;
pub mod fulfillment;

pub use catalog_service::CatalogService;
pub use fulfillment::{FulfillmentEngine, TransitionPolicy};
