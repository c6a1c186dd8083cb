//! Persistence layer: catalog and reward-request storage.
//!
//! Defines the [`CatalogRepository`] and [`RewardRequestStore`] traits the
//! service layer talks to, with two backends:
//!
//! - [`memory`]: `tokio::sync::RwLock`-guarded maps, used by default and in
//!   tests.
//! - [`postgres`]: `sqlx::PgPool` with embedded migrations.
//!
//! Both backends enforce that at most one *active* (pending, approved or
//! paid) reward request exists per user, event and reward. Violations are
//! reported as [`ServiceError::DuplicateRequest`].

pub mod memory;
pub mod models;
pub mod postgres;

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{Claim, Event, ObjectId, Reward, RewardRequest, RewardRequestPatch, RewardRequestStatus};
use crate::error::ServiceError;

pub use memory::{InMemoryCatalog, InMemoryRewardRequestStore};
pub use postgres::{PostgresCatalog, PostgresRewardRequestStore};

/// Durable storage and lookup for [`Event`] and [`Reward`] records.
///
/// Lookups return `Ok(None)` for unknown ids; mapping to
/// [`ServiceError::NotFound`] is the caller's decision. Every method fails
/// with [`ServiceError::Persistence`] when the backend does.
#[allow(clippy::missing_errors_doc)]
#[async_trait]
pub trait CatalogRepository: Send + Sync + fmt::Debug {
    /// Stores a new event.
    async fn insert_event(&self, event: Event) -> Result<Event, ServiceError>;

    /// Looks up an event by id.
    async fn get_event(&self, id: ObjectId) -> Result<Option<Event>, ServiceError>;

    /// Returns all events, oldest first.
    async fn list_events(&self) -> Result<Vec<Event>, ServiceError>;

    /// Replaces a stored event. Returns `None` if it does not exist.
    async fn replace_event(&self, event: Event) -> Result<Option<Event>, ServiceError>;

    /// Deletes an event, returning the removed record.
    async fn delete_event(&self, id: ObjectId) -> Result<Option<Event>, ServiceError>;

    /// Stores a new reward.
    async fn insert_reward(&self, reward: Reward) -> Result<Reward, ServiceError>;

    /// Looks up a reward by id.
    async fn get_reward(&self, id: ObjectId) -> Result<Option<Reward>, ServiceError>;

    /// Returns all rewards, oldest first.
    async fn list_rewards(&self) -> Result<Vec<Reward>, ServiceError>;

    /// Replaces a stored reward. Returns `None` if it does not exist.
    async fn replace_reward(&self, reward: Reward) -> Result<Option<Reward>, ServiceError>;

    /// Deletes a reward, returning the removed record.
    async fn delete_reward(&self, id: ObjectId) -> Result<Option<Reward>, ServiceError>;

    /// Returns the subset of `ids` that refer to stored rewards.
    async fn existing_reward_ids(&self, ids: &[ObjectId]) -> Result<HashSet<ObjectId>, ServiceError>;
}

/// Durable storage for [`RewardRequest`] records.
///
/// Every method fails with [`ServiceError::Persistence`] when the backend
/// does.
#[allow(clippy::missing_errors_doc)]
#[async_trait]
pub trait RewardRequestStore: Send + Sync + fmt::Debug {
    /// Finds a request for exactly `claim` whose status is in `statuses`.
    async fn find_matching(
        &self,
        claim: &Claim,
        statuses: &[RewardRequestStatus],
    ) -> Result<Option<RewardRequest>, ServiceError>;

    /// Inserts `request` unless an active request already exists for its
    /// claim.
    ///
    /// The conflict check and the write are one atomic step; a conflict
    /// is reported as [`ServiceError::DuplicateRequest`].
    async fn insert(&self, request: RewardRequest) -> Result<RewardRequest, ServiceError>;

    /// Looks up a request by id.
    async fn find_by_id(&self, id: ObjectId) -> Result<Option<RewardRequest>, ServiceError>;

    /// Applies `patch` atomically.
    ///
    /// With `expected` set, the patch is applied only while the stored
    /// status still equals it; otherwise the record is left untouched and
    /// [`UpdateOutcome::StatusChanged`] carries the status found. A patch
    /// that would leave two active requests for one claim fails with
    /// [`ServiceError::DuplicateRequest`].
    async fn update_by_id(
        &self,
        id: ObjectId,
        expected: Option<RewardRequestStatus>,
        patch: &RewardRequestPatch,
    ) -> Result<UpdateOutcome, ServiceError>;

    /// Deletes a request, returning the removed record.
    async fn delete_by_id(&self, id: ObjectId) -> Result<Option<RewardRequest>, ServiceError>;

    /// Returns all requests ordered by request date.
    async fn list_all(&self) -> Result<Vec<RewardRequest>, ServiceError>;
}

/// Result of [`RewardRequestStore::update_by_id`].
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    /// The patch was applied; holds the stored record.
    Updated(RewardRequest),
    /// No request has the given id.
    Missing,
    /// The stored status differs from the expected one.
    StatusChanged(RewardRequestStatus),
}

/// The pair of stores the service runs on.
#[derive(Debug, Clone)]
pub struct Storage {
    /// Event and reward catalog.
    pub catalog: Arc<dyn CatalogRepository>,
    /// Reward requests.
    pub requests: Arc<dyn RewardRequestStore>,
    /// Backend name reported by the health endpoint.
    pub backend: &'static str,
}

impl Storage {
    /// Fresh in-memory storage.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            catalog: Arc::new(InMemoryCatalog::new()),
            requests: Arc::new(InMemoryRewardRequestStore::new()),
            backend: "memory",
        }
    }

    /// PostgreSQL storage sharing one connection pool.
    #[must_use]
    pub fn postgres(pool: sqlx::PgPool) -> Self {
        Self {
            catalog: Arc::new(PostgresCatalog::new(pool.clone())),
            requests: Arc::new(PostgresRewardRequestStore::new(pool)),
            backend: "postgres",
        }
    }
}

/// Builds the duplicate error for `claim`.
pub(crate) const fn duplicate(claim: &Claim) -> ServiceError {
    ServiceError::DuplicateRequest {
        user_id: claim.user_id,
        event_id: claim.event_id,
        reward_id: claim.reward_id,
    }
}
