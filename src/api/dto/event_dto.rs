//! Event DTOs for create and update.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::ToSchema;

use super::common_dto::double_option;
use crate::domain::{EventPatch, EventStatus, NewEvent, ObjectId};

/// Request body for `POST /event`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventBody {
    /// Display name.
    pub name: String,
    /// Short description.
    #[serde(default)]
    pub description: Option<String>,
    /// Long-form content.
    #[serde(default)]
    pub content: Option<String>,
    /// Window start.
    pub start_date: DateTime<Utc>,
    /// Window end; must not precede `startDate`.
    pub end_date: DateTime<Utc>,
    /// Venue.
    #[serde(default)]
    pub location: Option<String>,
    /// Maximum participants.
    #[serde(default)]
    pub capacity: Option<u32>,
    /// Organizer.
    #[serde(default)]
    pub creator: Option<String>,
    /// Initial status; defaults to `scheduled`.
    #[serde(default)]
    pub status: Option<EventStatus>,
    /// Cover image URL.
    #[serde(default)]
    pub image_url: Option<String>,
    /// Application form URL.
    #[serde(default)]
    pub application_form_url: Option<String>,
    /// Brochure URL.
    #[serde(default)]
    pub brochure_url: Option<String>,
    /// Attachment URLs.
    #[serde(default)]
    pub attachment_urls: Vec<String>,
    /// Rewards offered; every id must reference an existing reward.
    #[serde(default)]
    #[schema(value_type = Vec<String>)]
    pub reward_ids: Vec<ObjectId>,
}

impl From<CreateEventBody> for NewEvent {
    fn from(body: CreateEventBody) -> Self {
        Self {
            name: body.name,
            description: body.description,
            content: body.content,
            start_date: body.start_date,
            end_date: body.end_date,
            location: body.location,
            capacity: body.capacity,
            creator: body.creator,
            status: body.status,
            image_url: body.image_url,
            application_form_url: body.application_form_url,
            brochure_url: body.brochure_url,
            attachment_urls: body.attachment_urls,
            reward_ids: body.reward_ids,
        }
    }
}

/// Request body for `PATCH /event/{id}`. Every field is optional;
/// `"capacity": null` removes the limit.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventBody {
    /// New name.
    #[serde(default)]
    pub name: Option<String>,
    /// New description.
    #[serde(default)]
    pub description: Option<String>,
    /// New content.
    #[serde(default)]
    pub content: Option<String>,
    /// New window start.
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    /// New window end.
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    /// New venue.
    #[serde(default)]
    pub location: Option<String>,
    /// New capacity, or `null` for unlimited.
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<u32>)]
    pub capacity: Option<Option<u32>>,
    /// New participant count.
    #[serde(default)]
    pub current_participants: Option<u32>,
    /// New organizer.
    #[serde(default)]
    pub creator: Option<String>,
    /// New status.
    #[serde(default)]
    pub status: Option<EventStatus>,
    /// New cover image URL.
    #[serde(default)]
    pub image_url: Option<String>,
    /// New application form URL.
    #[serde(default)]
    pub application_form_url: Option<String>,
    /// New brochure URL.
    #[serde(default)]
    pub brochure_url: Option<String>,
    /// Replacement attachment list.
    #[serde(default)]
    pub attachment_urls: Option<Vec<String>>,
    /// Replacement reward list.
    #[serde(default)]
    #[schema(value_type = Option<Vec<String>>)]
    pub reward_ids: Option<Vec<ObjectId>>,
}

impl From<UpdateEventBody> for EventPatch {
    fn from(body: UpdateEventBody) -> Self {
        Self {
            name: body.name,
            description: body.description,
            content: body.content,
            start_date: body.start_date,
            end_date: body.end_date,
            location: body.location,
            capacity: body.capacity,
            current_participants: body.current_participants,
            creator: body.creator,
            status: body.status,
            image_url: body.image_url,
            application_form_url: body.application_form_url,
            brochure_url: body.brochure_url,
            attachment_urls: body.attachment_urls,
            reward_ids: body.reward_ids,
        }
    }
}
