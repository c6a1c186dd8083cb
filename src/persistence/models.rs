//! Database row models and their conversion into domain records.
//!
//! Ids are stored as `TEXT` and counters as `BIGINT`, so every conversion
//! re-validates. A row that fails conversion indicates corrupted storage
//! and surfaces as [`ServiceError::Persistence`].

use chrono::{DateTime, Utc};
use sqlx::types::Json;

use crate::domain::{
    Event, EventStatus, ObjectId, PaidRewardDetails, Reward, RewardRequest, RewardRequestStatus,
};
use crate::error::ServiceError;

/// A row from the `events` table.
#[derive(Debug, sqlx::FromRow)]
pub struct EventRow {
    /// Event id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Short description.
    pub description: Option<String>,
    /// Long-form content.
    pub content: Option<String>,
    /// Window start.
    pub start_date: DateTime<Utc>,
    /// Window end.
    pub end_date: DateTime<Utc>,
    /// Venue.
    pub location: Option<String>,
    /// Capacity.
    pub capacity: Option<i64>,
    /// Participant counter.
    pub current_participants: i64,
    /// Organizer.
    pub creator: Option<String>,
    /// Status name.
    pub status: String,
    /// Cover image URL.
    pub image_url: Option<String>,
    /// Application form URL.
    pub application_form_url: Option<String>,
    /// Brochure URL.
    pub brochure_url: Option<String>,
    /// Attachment URLs.
    pub attachment_urls: Vec<String>,
    /// Linked reward ids.
    pub reward_ids: Vec<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// A row from the `rewards` table.
#[derive(Debug, sqlx::FromRow)]
pub struct RewardRow {
    /// Reward id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Description.
    pub description: Option<String>,
    /// Type tag.
    pub reward_type: String,
    /// Value.
    pub value: f64,
    /// Remaining stock.
    pub stock: Option<i64>,
    /// Expiry date.
    pub expiry_date: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// A row from the `reward_requests` table.
#[derive(Debug, sqlx::FromRow)]
pub struct RewardRequestRow {
    /// Request id.
    pub id: String,
    /// Claiming user.
    pub user_id: String,
    /// Claimed event.
    pub event_id: String,
    /// Claimed reward.
    pub reward_id: String,
    /// Status name.
    pub status: String,
    /// Submission time.
    pub request_date: DateTime<Utc>,
    /// Processing time.
    pub process_date: Option<DateTime<Utc>>,
    /// Result message.
    pub result_message: Option<String>,
    /// Payout payload.
    pub paid_reward_details: Option<Json<PaidRewardDetails>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

fn corrupt(column: &str, detail: impl std::fmt::Display) -> ServiceError {
    ServiceError::Persistence(format!("corrupt {column} column: {detail}"))
}

fn parse_id(column: &str, raw: &str) -> Result<ObjectId, ServiceError> {
    raw.parse::<ObjectId>().map_err(|e| corrupt(column, e))
}

fn to_u32(column: &str, raw: i64) -> Result<u32, ServiceError> {
    u32::try_from(raw).map_err(|e| corrupt(column, e))
}

/// Converts an optional `u32` into the `BIGINT` representation.
#[must_use]
pub fn opt_u32_to_i64(value: Option<u32>) -> Option<i64> {
    value.map(i64::from)
}

impl TryFrom<EventRow> for Event {
    type Error = ServiceError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        let reward_ids = row
            .reward_ids
            .iter()
            .map(|raw| parse_id("events.reward_ids", raw))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            id: parse_id("events.id", &row.id)?,
            name: row.name,
            description: row.description,
            content: row.content,
            start_date: row.start_date,
            end_date: row.end_date,
            location: row.location,
            capacity: row
                .capacity
                .map(|c| to_u32("events.capacity", c))
                .transpose()?,
            current_participants: to_u32("events.current_participants", row.current_participants)?,
            creator: row.creator,
            status: row
                .status
                .parse::<EventStatus>()
                .map_err(|e| corrupt("events.status", e))?,
            image_url: row.image_url,
            application_form_url: row.application_form_url,
            brochure_url: row.brochure_url,
            attachment_urls: row.attachment_urls,
            reward_ids,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl TryFrom<RewardRow> for Reward {
    type Error = ServiceError;

    fn try_from(row: RewardRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_id("rewards.id", &row.id)?,
            name: row.name,
            description: row.description,
            reward_type: row.reward_type,
            value: row.value,
            stock: row.stock.map(|s| to_u32("rewards.stock", s)).transpose()?,
            expiry_date: row.expiry_date,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl TryFrom<RewardRequestRow> for RewardRequest {
    type Error = ServiceError;

    fn try_from(row: RewardRequestRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_id("reward_requests.id", &row.id)?,
            user_id: parse_id("reward_requests.user_id", &row.user_id)?,
            event_id: parse_id("reward_requests.event_id", &row.event_id)?,
            reward_id: parse_id("reward_requests.reward_id", &row.reward_id)?,
            status: row
                .status
                .parse::<RewardRequestStatus>()
                .map_err(|e| corrupt("reward_requests.status", e))?,
            request_date: row.request_date,
            process_date: row.process_date,
            result_message: row.result_message,
            paid_reward_details: row.paid_reward_details.map(|Json(details)| details),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn request_row(status: &str) -> RewardRequestRow {
        let now = Utc::now();
        RewardRequestRow {
            id: ObjectId::new().to_string(),
            user_id: ObjectId::new().to_string(),
            event_id: ObjectId::new().to_string(),
            reward_id: ObjectId::new().to_string(),
            status: status.to_string(),
            request_date: now,
            process_date: Some(now),
            result_message: None,
            paid_reward_details: Some(Json(PaidRewardDetails::Point { amount: 10.0 })),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn request_row_converts() {
        let Ok(request) = RewardRequest::try_from(request_row("paid")) else {
            panic!("conversion failed");
        };
        assert_eq!(request.status, RewardRequestStatus::Paid);
        assert_eq!(
            request.paid_reward_details,
            Some(PaidRewardDetails::Point { amount: 10.0 })
        );
    }

    #[test]
    fn unknown_status_is_a_persistence_error() {
        let result = RewardRequest::try_from(request_row("archived"));
        assert!(matches!(result, Err(ServiceError::Persistence(_))));
    }

    #[test]
    fn negative_stock_is_a_persistence_error() {
        let now = Utc::now();
        let row = RewardRow {
            id: ObjectId::new().to_string(),
            name: "r".to_string(),
            description: None,
            reward_type: "point".to_string(),
            value: 1.0,
            stock: Some(-1),
            expiry_date: None,
            created_at: now,
            updated_at: now,
        };
        assert!(Reward::try_from(row).is_err());
    }
}
