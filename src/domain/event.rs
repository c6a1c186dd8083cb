//! Event catalog entity and its reward linkage.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::ObjectId;
use crate::error::ServiceError;

/// Scheduling status of an event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    /// Announced, not started.
    #[default]
    Scheduled,
    /// In progress.
    Ongoing,
    /// Ended normally.
    Finished,
    /// Called off.
    Cancelled,
}

impl EventStatus {
    /// All statuses.
    pub const ALL: [Self; 4] = [
        Self::Scheduled,
        Self::Ongoing,
        Self::Finished,
        Self::Cancelled,
    ];

    /// Lower-case wire and storage name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Ongoing => "ongoing",
            Self::Finished => "finished",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown event status \"{s}\""))
    }
}

/// An event offering rewards to its participants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Event identifier.
    #[schema(value_type = String)]
    pub id: ObjectId,
    /// Display name.
    pub name: String,
    /// Short description.
    #[serde(default)]
    pub description: Option<String>,
    /// Long-form content.
    #[serde(default)]
    pub content: Option<String>,
    /// Start of the event window.
    pub start_date: DateTime<Utc>,
    /// End of the event window.
    pub end_date: DateTime<Utc>,
    /// Venue.
    #[serde(default)]
    pub location: Option<String>,
    /// Maximum participants; `None` means unlimited.
    #[serde(default)]
    pub capacity: Option<u32>,
    /// Participants registered so far.
    #[serde(default)]
    pub current_participants: u32,
    /// Organizer.
    #[serde(default)]
    pub creator: Option<String>,
    /// Scheduling status.
    #[serde(default)]
    pub status: EventStatus,
    /// Cover image URL.
    #[serde(default)]
    pub image_url: Option<String>,
    /// Application form URL.
    #[serde(default)]
    pub application_form_url: Option<String>,
    /// Brochure URL.
    #[serde(default)]
    pub brochure_url: Option<String>,
    /// Other attachment URLs.
    #[serde(default)]
    pub attachment_urls: Vec<String>,
    /// Rewards this event offers. Unique; order is not meaningful.
    #[serde(default)]
    #[schema(value_type = Vec<String>)]
    pub reward_ids: Vec<ObjectId>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied when creating an event.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    /// Display name.
    pub name: String,
    /// Short description.
    pub description: Option<String>,
    /// Long-form content.
    pub content: Option<String>,
    /// Start of the event window.
    pub start_date: DateTime<Utc>,
    /// End of the event window.
    pub end_date: DateTime<Utc>,
    /// Venue.
    pub location: Option<String>,
    /// Capacity.
    pub capacity: Option<u32>,
    /// Organizer.
    pub creator: Option<String>,
    /// Initial status; defaults to scheduled.
    pub status: Option<EventStatus>,
    /// Cover image URL.
    pub image_url: Option<String>,
    /// Application form URL.
    pub application_form_url: Option<String>,
    /// Brochure URL.
    pub brochure_url: Option<String>,
    /// Attachment URLs.
    pub attachment_urls: Vec<String>,
    /// Linked rewards.
    pub reward_ids: Vec<ObjectId>,
}

/// Partial update for an event. `Some(None)` clears the capacity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventPatch {
    /// New name.
    pub name: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New content.
    pub content: Option<String>,
    /// New start date.
    pub start_date: Option<DateTime<Utc>>,
    /// New end date.
    pub end_date: Option<DateTime<Utc>>,
    /// New location.
    pub location: Option<String>,
    /// New capacity, or `Some(None)` for unlimited.
    pub capacity: Option<Option<u32>>,
    /// New participant count.
    pub current_participants: Option<u32>,
    /// New organizer.
    pub creator: Option<String>,
    /// New status.
    pub status: Option<EventStatus>,
    /// New cover image URL.
    pub image_url: Option<String>,
    /// New application form URL.
    pub application_form_url: Option<String>,
    /// New brochure URL.
    pub brochure_url: Option<String>,
    /// Replacement attachment list.
    pub attachment_urls: Option<Vec<String>>,
    /// Replacement reward list.
    pub reward_ids: Option<Vec<ObjectId>>,
}

impl Event {
    /// Builds an event record with a fresh id.
    #[must_use]
    pub fn from_new(new: NewEvent) -> Self {
        let now = Utc::now();
        Self {
            id: ObjectId::new(),
            name: new.name,
            description: new.description,
            content: new.content,
            start_date: new.start_date,
            end_date: new.end_date,
            location: new.location,
            capacity: new.capacity,
            current_participants: 0,
            creator: new.creator,
            status: new.status.unwrap_or_default(),
            image_url: new.image_url,
            application_form_url: new.application_form_url,
            brochure_url: new.brochure_url,
            attachment_urls: new.attachment_urls,
            reward_ids: dedup_ids(new.reward_ids),
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies `patch` in place and bumps `updated_at`.
    pub fn apply(&mut self, patch: EventPatch) {
        macro_rules! set {
            ($($field:ident),* $(,)?) => {
                $(if let Some(v) = patch.$field { self.$field = v; })*
            };
        }
        macro_rules! set_some {
            ($($field:ident),* $(,)?) => {
                $(if let Some(v) = patch.$field { self.$field = Some(v); })*
            };
        }
        set!(name, start_date, end_date, capacity, current_participants, status, attachment_urls);
        set_some!(
            description,
            content,
            location,
            creator,
            image_url,
            application_form_url,
            brochure_url,
        );
        if let Some(ids) = patch.reward_ids {
            self.reward_ids = dedup_ids(ids);
        }
        self.updated_at = Utc::now();
    }

    /// Returns `true` if the event offers `reward_id`.
    #[must_use]
    pub fn offers(&self, reward_id: ObjectId) -> bool {
        self.reward_ids.contains(&reward_id)
    }

    /// Checks the write-time invariants that do not need the catalog.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Validation`] for a blank name or a time
    /// window whose start is after its end.
    pub fn validate(&self) -> Result<(), ServiceError> {
        if self.name.trim().is_empty() {
            return Err(ServiceError::Validation("name must not be empty".to_string()));
        }
        if self.start_date > self.end_date {
            return Err(ServiceError::Validation(format!(
                "startDate {} is after endDate {}",
                self.start_date.to_rfc3339(),
                self.end_date.to_rfc3339()
            )));
        }
        Ok(())
    }
}

/// Removes repeated ids, keeping the first occurrence of each.
fn dedup_ids(ids: Vec<ObjectId>) -> Vec<ObjectId> {
    let mut unique = Vec::with_capacity(ids.len());
    for id in ids {
        if !unique.contains(&id) {
            unique.push(id);
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn new_event(reward_ids: Vec<ObjectId>) -> NewEvent {
        let start = Utc::now();
        NewEvent {
            name: "Spring festival".to_string(),
            description: None,
            content: None,
            start_date: start,
            end_date: start + Duration::days(3),
            location: None,
            capacity: None,
            creator: None,
            status: None,
            image_url: None,
            application_form_url: None,
            brochure_url: None,
            attachment_urls: Vec::new(),
            reward_ids,
        }
    }

    #[test]
    fn from_new_defaults_status_and_counter() {
        let event = Event::from_new(new_event(Vec::new()));
        assert_eq!(event.status, EventStatus::Scheduled);
        assert_eq!(event.current_participants, 0);
        assert!(event.validate().is_ok());
    }

    #[test]
    fn reward_ids_are_deduplicated() {
        let a = ObjectId::new();
        let b = ObjectId::new();
        let event = Event::from_new(new_event(vec![a, b, a]));
        assert_eq!(event.reward_ids, vec![a, b]);
        assert!(event.offers(a));
        assert!(!event.offers(ObjectId::new()));
    }

    #[test]
    fn inverted_window_is_rejected() {
        let mut event = Event::from_new(new_event(Vec::new()));
        event.apply(EventPatch {
            end_date: Some(event.start_date - Duration::hours(1)),
            ..EventPatch::default()
        });
        assert!(event.validate().is_err());
    }

    #[test]
    fn patch_clears_capacity_and_keeps_other_fields() {
        let mut new = new_event(Vec::new());
        new.capacity = Some(50);
        let mut event = Event::from_new(new);
        event.apply(EventPatch {
            capacity: Some(None),
            location: Some("Hall A".to_string()),
            ..EventPatch::default()
        });
        assert_eq!(event.capacity, None);
        assert_eq!(event.location.as_deref(), Some("Hall A"));
        assert_eq!(event.name, "Spring festival");
    }

    #[test]
    fn status_round_trips_through_str() {
        for status in EventStatus::ALL {
            assert_eq!(status.as_str().parse::<EventStatus>().ok(), Some(status));
        }
    }
}
