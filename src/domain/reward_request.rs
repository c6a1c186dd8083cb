//! Reward request aggregate and its lifecycle.
//!
//! A [`RewardRequest`] records a user's claim on a reward offered by an
//! event. Its [`RewardRequestStatus`] follows a small state machine whose
//! designed transitions are captured by
//! [`RewardRequestStatus::can_transition_to`].

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{ObjectId, PaidRewardDetails};

/// Lifecycle status of a reward request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RewardRequestStatus {
    /// Received, not yet evaluated.
    Pending,
    /// Validated and eligible for payout.
    Approved,
    /// Refused; the same claim may be submitted again.
    Rejected,
    /// Payout delivered.
    Paid,
}

impl RewardRequestStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [Self; 4] = [Self::Pending, Self::Approved, Self::Rejected, Self::Paid];

    /// Statuses that block a new claim for the same user, event and reward.
    pub const ACTIVE: [Self; 3] = [Self::Pending, Self::Approved, Self::Paid];

    /// Lower-case wire and storage name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Paid => "paid",
        }
    }

    /// Returns `true` if this status is inside the duplicate-prevention
    /// window.
    #[must_use]
    pub const fn is_active(self) -> bool {
        !matches!(self, Self::Rejected)
    }

    /// Designed lifecycle transitions.
    ///
    /// `Pending → {Approved, Rejected}`, `Approved → {Paid, Rejected}`.
    /// Staying in the same status is always allowed.
    #[must_use]
    pub const fn can_transition_to(self, to: Self) -> bool {
        matches!(
            (self, to),
            (Self::Pending, Self::Pending | Self::Approved | Self::Rejected)
                | (Self::Approved, Self::Approved | Self::Paid | Self::Rejected)
                | (Self::Rejected, Self::Rejected)
                | (Self::Paid, Self::Paid)
        )
    }
}

impl fmt::Display for RewardRequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not a known [`RewardRequestStatus`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown reward request status \"{0}\"")]
pub struct UnknownStatus(String);

impl FromStr for RewardRequestStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// A user's intent to redeem one reward of one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Claim {
    /// Claiming user, authenticated upstream.
    pub user_id: ObjectId,
    /// Event the reward is claimed for.
    pub event_id: ObjectId,
    /// Claimed reward.
    pub reward_id: ObjectId,
}

/// Stored reward request record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RewardRequest {
    /// Request identifier.
    #[schema(value_type = String)]
    pub id: ObjectId,
    /// Claiming user.
    #[schema(value_type = String)]
    pub user_id: ObjectId,
    /// Claimed event.
    #[schema(value_type = String)]
    pub event_id: ObjectId,
    /// Claimed reward.
    #[schema(value_type = String)]
    pub reward_id: ObjectId,
    /// Current lifecycle status.
    pub status: RewardRequestStatus,
    /// When the claim was submitted.
    pub request_date: DateTime<Utc>,
    /// When the status last left or changed from `pending`.
    #[serde(default)]
    pub process_date: Option<DateTime<Utc>>,
    /// Rejection reason or informational note.
    #[serde(default)]
    pub result_message: Option<String>,
    /// What was actually granted, set once the request is paid.
    #[serde(default)]
    pub paid_reward_details: Option<PaidRewardDetails>,
    /// Storage creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Storage last-modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl RewardRequest {
    /// Builds a fresh `pending` request for `claim`.
    #[must_use]
    pub fn pending(claim: Claim) -> Self {
        let now = Utc::now();
        Self {
            id: ObjectId::new(),
            user_id: claim.user_id,
            event_id: claim.event_id,
            reward_id: claim.reward_id,
            status: RewardRequestStatus::Pending,
            request_date: now,
            process_date: None,
            result_message: None,
            paid_reward_details: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// The user, event and reward this request is about.
    #[must_use]
    pub const fn claim(&self) -> Claim {
        Claim {
            user_id: self.user_id,
            event_id: self.event_id,
            reward_id: self.reward_id,
        }
    }

    /// Returns `true` if this request blocks a new claim for its triple.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Moves the request to `status` and stamps `processDate`.
    pub fn set_status(&mut self, status: RewardRequestStatus, at: DateTime<Utc>) {
        self.status = status;
        self.process_date = Some(at);
    }
}

/// Partial update applied by `PATCH /reward-request/{id}`.
///
/// Fields left as `None` are not touched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RewardRequestPatch {
    /// New status.
    pub status: Option<RewardRequestStatus>,
    /// New result message.
    pub result_message: Option<String>,
    /// New user reference.
    pub user_id: Option<ObjectId>,
    /// New event reference.
    pub event_id: Option<ObjectId>,
    /// New reward reference.
    pub reward_id: Option<ObjectId>,
    /// Payout details to record; filled in by the engine, not by clients.
    pub paid_reward_details: Option<PaidRewardDetails>,
}

impl RewardRequestPatch {
    /// Applies the patch to `request`, returning `true` if the status
    /// changed.
    pub fn apply_to(&self, request: &mut RewardRequest, at: DateTime<Utc>) -> bool {
        let status_changed = match self.status {
            Some(status) if status != request.status => {
                request.set_status(status, at);
                true
            }
            _ => false,
        };
        if let Some(message) = &self.result_message {
            request.result_message = Some(message.clone());
        }
        if let Some(user_id) = self.user_id {
            request.user_id = user_id;
        }
        if let Some(event_id) = self.event_id {
            request.event_id = event_id;
        }
        if let Some(reward_id) = self.reward_id {
            request.reward_id = reward_id;
        }
        if let Some(details) = &self.paid_reward_details {
            request.paid_reward_details = Some(details.clone());
        }
        request.updated_at = at;
        status_changed
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use RewardRequestStatus::{Approved, Paid, Pending, Rejected};

    fn claim() -> Claim {
        Claim {
            user_id: ObjectId::new(),
            event_id: ObjectId::new(),
            reward_id: ObjectId::new(),
        }
    }

    #[test]
    fn designed_transitions_are_allowed() {
        assert!(Pending.can_transition_to(Approved));
        assert!(Pending.can_transition_to(Rejected));
        assert!(Approved.can_transition_to(Paid));
        assert!(Approved.can_transition_to(Rejected));
    }

    #[test]
    fn backward_and_skipping_transitions_are_not_allowed() {
        assert!(!Paid.can_transition_to(Pending));
        assert!(!Paid.can_transition_to(Approved));
        assert!(!Rejected.can_transition_to(Approved));
        assert!(!Pending.can_transition_to(Paid));
        assert!(!Approved.can_transition_to(Pending));
    }

    #[test]
    fn self_transitions_are_allowed() {
        for status in RewardRequestStatus::ALL {
            assert!(status.can_transition_to(status));
        }
    }

    #[test]
    fn only_rejected_is_outside_the_duplicate_window() {
        assert_eq!(
            RewardRequestStatus::ALL
                .into_iter()
                .filter(|s| s.is_active())
                .collect::<Vec<_>>(),
            RewardRequestStatus::ACTIVE.to_vec()
        );
    }

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!("PAID".parse::<RewardRequestStatus>().ok(), Some(Paid));
        assert_eq!("approved".parse::<RewardRequestStatus>().ok(), Some(Approved));
        assert!("done".parse::<RewardRequestStatus>().is_err());
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&Rejected).ok();
        assert_eq!(json.as_deref(), Some("\"rejected\""));
    }

    #[test]
    fn pending_request_has_no_process_date() {
        let request = RewardRequest::pending(claim());
        assert_eq!(request.status, Pending);
        assert!(request.process_date.is_none());
        assert!(request.is_active());
    }

    #[test]
    fn patch_stamps_process_date_only_on_status_change() {
        let mut request = RewardRequest::pending(claim());
        let at = Utc::now();

        let patch = RewardRequestPatch {
            result_message: Some("note".to_string()),
            ..RewardRequestPatch::default()
        };
        assert!(!patch.apply_to(&mut request, at));
        assert!(request.process_date.is_none());
        assert_eq!(request.result_message.as_deref(), Some("note"));

        let patch = RewardRequestPatch {
            status: Some(Rejected),
            ..RewardRequestPatch::default()
        };
        assert!(patch.apply_to(&mut request, at));
        assert_eq!(request.status, Rejected);
        assert_eq!(request.process_date, Some(at));
    }

    #[test]
    fn patch_rewrites_references() {
        let mut request = RewardRequest::pending(claim());
        let other = claim();
        let patch = RewardRequestPatch {
            user_id: Some(other.user_id),
            event_id: Some(other.event_id),
            reward_id: Some(other.reward_id),
            ..RewardRequestPatch::default()
        };
        patch.apply_to(&mut request, Utc::now());
        assert_eq!(request.claim(), other);
    }

    #[test]
    fn serializes_camel_case_fields() {
        let request = RewardRequest::pending(claim());
        let Ok(value) = serde_json::to_value(&request) else {
            panic!("serialization failed");
        };
        assert!(value.get("userId").is_some());
        assert!(value.get("requestDate").is_some());
        assert!(value.get("paidRewardDetails").is_some());
        assert_eq!(value.get("status"), Some(&serde_json::json!("pending")));
    }
}
