//! Reward DTOs for create and update.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::ToSchema;

use super::common_dto::double_option;
use crate::domain::{NewReward, RewardPatch};

/// Request body for `POST /reward`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateRewardBody {
    /// Display name.
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// Type tag, e.g. `point`, `coupon` or `item`.
    #[serde(rename = "type")]
    pub reward_type: String,
    /// Points, face value or quantity depending on the type.
    pub value: f64,
    /// Remaining stock; absent means unlimited.
    #[serde(default)]
    pub stock: Option<u32>,
    /// Expiry date.
    #[serde(default)]
    pub expiry_date: Option<DateTime<Utc>>,
}

impl From<CreateRewardBody> for NewReward {
    fn from(body: CreateRewardBody) -> Self {
        Self {
            name: body.name,
            description: body.description,
            reward_type: body.reward_type,
            value: body.value,
            stock: body.stock,
            expiry_date: body.expiry_date,
        }
    }
}

/// Request body for `PATCH /reward/{id}`. `null` clears `stock` or
/// `expiryDate`.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRewardBody {
    /// New name.
    #[serde(default)]
    pub name: Option<String>,
    /// New description.
    #[serde(default)]
    pub description: Option<String>,
    /// New type tag.
    #[serde(default, rename = "type")]
    pub reward_type: Option<String>,
    /// New value.
    #[serde(default)]
    pub value: Option<f64>,
    /// New stock, or `null` for unlimited.
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<u32>)]
    pub stock: Option<Option<u32>>,
    /// New expiry date, or `null` for none.
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<DateTime<Utc>>)]
    pub expiry_date: Option<Option<DateTime<Utc>>>,
}

impl From<UpdateRewardBody> for RewardPatch {
    fn from(body: UpdateRewardBody) -> Self {
        Self {
            name: body.name,
            description: body.description,
            reward_type: body.reward_type,
            value: body.value,
            stock: body.stock,
            expiry_date: body.expiry_date,
        }
    }
}
