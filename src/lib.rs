//! # reward-service
//!
//! REST service for an event and reward catalog and the reward requests
//! users submit against it.
//!
//! A reward request claims one reward of one event for one user. The
//! fulfillment engine checks that the event exists and offers the reward,
//! refuses a second active request for the same user, event and reward,
//! and stores the claim as approved. Later updates move it to paid (which
//! records typed payout details) or rejected (which allows a new claim).
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP)
//!     │
//!     ├── REST Handlers (api/)
//!     │
//!     ├── FulfillmentEngine, CatalogService (service/)
//!     │
//!     ├── Event, Reward, RewardRequest (domain/)
//!     │
//!     └── CatalogRepository, RewardRequestStore (persistence/)
//!             ├── in-memory
//!             └── PostgreSQL
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod service;
