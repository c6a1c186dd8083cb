//! Domain layer: identifiers, catalog entities, and reward requests.
//!
//! This module holds the service's data model: [`Event`] and [`Reward`]
//! catalog records, the [`RewardRequest`] aggregate with its status
//! state machine, and the typed [`PaidRewardDetails`] payout payload.

pub mod event;
pub mod object_id;
pub mod payout;
pub mod reward;
pub mod reward_request;

pub use event::{Event, EventPatch, EventStatus, NewEvent};
pub use object_id::ObjectId;
pub use payout::PaidRewardDetails;
pub use reward::{NewReward, Reward, RewardPatch};
pub use reward_request::{Claim, RewardRequest, RewardRequestPatch, RewardRequestStatus};
