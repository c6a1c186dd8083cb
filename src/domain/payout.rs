//! Typed description of what a paid reward request actually granted.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{ObjectId, Reward, RewardRequest};

/// Payout payload recorded on a paid [`RewardRequest`].
///
/// The variant is chosen by the reward's type tag; tags without a
/// dedicated variant land in [`PaidRewardDetails::Other`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PaidRewardDetails {
    /// Points credited to the user.
    Point {
        /// Number of points.
        amount: f64,
    },
    /// A redeemable coupon code.
    Coupon {
        /// Coupon code handed to the user.
        code: String,
    },
    /// A catalog item.
    Item {
        /// Item reference (the reward id).
        #[serde(rename = "itemId")]
        item_id: String,
        /// Number of units granted.
        quantity: u32,
    },
    /// Any reward type without a dedicated payout shape.
    Other {
        /// The reward's type tag.
        #[serde(rename = "rewardType")]
        reward_type: String,
        /// The reward's value.
        value: f64,
    },
}

impl PaidRewardDetails {
    /// Computes the payout that `reward` grants for `request`.
    #[must_use]
    pub fn for_reward(reward: &Reward, request: &RewardRequest) -> Self {
        match reward.reward_type.to_ascii_lowercase().as_str() {
            "point" | "points" => Self::Point {
                amount: reward.value,
            },
            "coupon" => Self::Coupon {
                code: coupon_code(request.id),
            },
            "item" => Self::Item {
                item_id: reward.id.to_string(),
                quantity: item_quantity(reward.value),
            },
            _ => Self::Other {
                reward_type: reward.reward_type.clone(),
                value: reward.value,
            },
        }
    }
}

/// Coupon codes are the full request id in upper case.
fn coupon_code(request_id: ObjectId) -> String {
    request_id.to_string().to_ascii_uppercase()
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn item_quantity(value: f64) -> u32 {
    let rounded = value.round();
    if rounded.is_finite() && rounded >= 1.0 {
        rounded.min(f64::from(u32::MAX)) as u32
    } else {
        1
    }
}
