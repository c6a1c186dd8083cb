//! Data Transfer Objects for REST request serialization.
//!
//! Request bodies use camelCase keys. Responses serialize the domain
//! records directly.

pub mod common_dto;
pub mod event_dto;
pub mod reward_dto;
pub mod reward_request_dto;

pub use common_dto::*;
pub use event_dto::*;
pub use reward_dto::*;
pub use reward_request_dto::*;
