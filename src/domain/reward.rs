//! Reward catalog entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::ObjectId;
use crate::error::ServiceError;

/// A grantable reward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Reward {
    /// Reward identifier.
    #[schema(value_type = String)]
    pub id: ObjectId,
    /// Display name.
    pub name: String,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
    /// Free-form type tag such as `"point"` or `"coupon"`.
    #[serde(rename = "type")]
    pub reward_type: String,
    /// Numeric value: points, face value, quantity, depending on type.
    pub value: f64,
    /// Remaining grantable units; `None` means unlimited.
    #[serde(default)]
    pub stock: Option<u32>,
    /// Last moment the reward can be granted.
    #[serde(default)]
    pub expiry_date: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied when creating a reward.
#[derive(Debug, Clone, PartialEq)]
pub struct NewReward {
    /// Display name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Type tag.
    pub reward_type: String,
    /// Numeric value.
    pub value: f64,
    /// Initial stock.
    pub stock: Option<u32>,
    /// Expiry date.
    pub expiry_date: Option<DateTime<Utc>>,
}

/// Partial update for a reward. `Some(None)` clears a nullable field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RewardPatch {
    /// New name.
    pub name: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New type tag.
    pub reward_type: Option<String>,
    /// New value.
    pub value: Option<f64>,
    /// New stock, or `Some(None)` for unlimited.
    pub stock: Option<Option<u32>>,
    /// New expiry date, or `Some(None)` to remove it.
    pub expiry_date: Option<Option<DateTime<Utc>>>,
}

impl Reward {
    /// Builds a reward record with a fresh id.
    #[must_use]
    pub fn from_new(new: NewReward) -> Self {
        let now = Utc::now();
        Self {
            id: ObjectId::new(),
            name: new.name,
            description: new.description,
            reward_type: new.reward_type,
            value: new.value,
            stock: new.stock,
            expiry_date: new.expiry_date,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies `patch` in place and bumps `updated_at`.
    pub fn apply(&mut self, patch: RewardPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(description) = patch.description {
            self.description = Some(description);
        }
        if let Some(reward_type) = patch.reward_type {
            self.reward_type = reward_type;
        }
        if let Some(value) = patch.value {
            self.value = value;
        }
        if let Some(stock) = patch.stock {
            self.stock = stock;
        }
        if let Some(expiry_date) = patch.expiry_date {
            self.expiry_date = expiry_date;
        }
        self.updated_at = Utc::now();
    }

    /// Checks the write-time invariants of a reward record.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Validation`] if the name or type tag is
    /// blank or the value is not a finite number.
    pub fn validate(&self) -> Result<(), ServiceError> {
        if self.name.trim().is_empty() {
            return Err(ServiceError::Validation("name must not be empty".to_string()));
        }
        if self.reward_type.trim().is_empty() {
            return Err(ServiceError::Validation("type must not be empty".to_string()));
        }
        if !self.value.is_finite() {
            return Err(ServiceError::Validation("value must be a finite number".to_string()));
        }
        Ok(())
    }
}
