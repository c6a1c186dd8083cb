//! Reward request DTOs for create and update.

use serde::Deserialize;
use utoipa::ToSchema;

use crate::domain::{Claim, ObjectId, RewardRequestPatch, RewardRequestStatus};

/// Request body for `POST /reward-request`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateRewardRequestBody {
    /// Claiming user (24 hex characters).
    #[schema(value_type = String, example = "65f1c0a2b3d4e5f601234567")]
    pub user_id: ObjectId,
    /// Event the reward is claimed for.
    #[schema(value_type = String)]
    pub event_id: ObjectId,
    /// Claimed reward.
    #[schema(value_type = String)]
    pub reward_id: ObjectId,
}

impl From<CreateRewardRequestBody> for Claim {
    fn from(body: CreateRewardRequestBody) -> Self {
        Self {
            user_id: body.user_id,
            event_id: body.event_id,
            reward_id: body.reward_id,
        }
    }
}

/// Request body for `PATCH /reward-request/{id}`. Every field is optional.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRewardRequestBody {
    /// New status.
    #[serde(default)]
    pub status: Option<RewardRequestStatus>,
    /// Rejection reason or note.
    #[serde(default)]
    pub result_message: Option<String>,
    /// New user reference.
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub user_id: Option<ObjectId>,
    /// New event reference.
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub event_id: Option<ObjectId>,
    /// New reward reference.
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub reward_id: Option<ObjectId>,
}

impl From<UpdateRewardRequestBody> for RewardRequestPatch {
    fn from(body: UpdateRewardRequestBody) -> Self {
        Self {
            status: body.status,
            result_message: body.result_message,
            user_id: body.user_id,
            event_id: body.event_id,
            reward_id: body.reward_id,
            paid_reward_details: None,
        }
    }
}
