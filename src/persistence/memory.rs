//! In-memory storage backend.
//!
//! Each store keeps its records in a `HashMap` behind a single
//! [`tokio::sync::RwLock`]. Reads run concurrently; every write holds the
//! write guard for the whole check-then-modify step, which is what makes
//! [`RewardRequestStore::insert`] and the conditional
//! [`RewardRequestStore::update_by_id`] atomic.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{CatalogRepository, RewardRequestStore, UpdateOutcome, duplicate};
use crate::domain::{Claim, Event, ObjectId, Reward, RewardRequest, RewardRequestPatch, RewardRequestStatus};
use crate::error::ServiceError;

/// In-memory [`CatalogRepository`].
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    events: RwLock<HashMap<ObjectId, Event>>,
    rewards: RwLock<HashMap<ObjectId, Reward>>,
}

impl InMemoryCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Sorts records by creation time, breaking ties by id.
fn oldest_first<T: Clone>(
    map: &HashMap<ObjectId, T>,
    created_at: impl Fn(&T) -> chrono::DateTime<Utc>,
) -> Vec<T> {
    let mut items: Vec<(ObjectId, &T)> = map.iter().map(|(id, item)| (*id, item)).collect();
    items.sort_by(|a, b| created_at(a.1).cmp(&created_at(b.1)).then(a.0.cmp(&b.0)));
    items.into_iter().map(|(_, item)| item.clone()).collect()
}

#[async_trait]
impl CatalogRepository for InMemoryCatalog {
    async fn insert_event(&self, event: Event) -> Result<Event, ServiceError> {
        let mut map = self.events.write().await;
        if map.contains_key(&event.id) {
            return Err(ServiceError::Internal(format!("event {} already exists", event.id)));
        }
        map.insert(event.id, event.clone());
        Ok(event)
    }

    async fn get_event(&self, id: ObjectId) -> Result<Option<Event>, ServiceError> {
        Ok(self.events.read().await.get(&id).cloned())
    }

    async fn list_events(&self) -> Result<Vec<Event>, ServiceError> {
        Ok(oldest_first(&*self.events.read().await, |e| e.created_at))
    }

    async fn replace_event(&self, event: Event) -> Result<Option<Event>, ServiceError> {
        let mut map = self.events.write().await;
        let Some(slot) = map.get_mut(&event.id) else {
            return Ok(None);
        };
        *slot = event.clone();
        Ok(Some(event))
    }

    async fn delete_event(&self, id: ObjectId) -> Result<Option<Event>, ServiceError> {
        Ok(self.events.write().await.remove(&id))
    }

    async fn insert_reward(&self, reward: Reward) -> Result<Reward, ServiceError> {
        let mut map = self.rewards.write().await;
        if map.contains_key(&reward.id) {
            return Err(ServiceError::Internal(format!("reward {} already exists", reward.id)));
        }
        map.insert(reward.id, reward.clone());
        Ok(reward)
    }

    async fn get_reward(&self, id: ObjectId) -> Result<Option<Reward>, ServiceError> {
        Ok(self.rewards.read().await.get(&id).cloned())
    }

    async fn list_rewards(&self) -> Result<Vec<Reward>, ServiceError> {
        Ok(oldest_first(&*self.rewards.read().await, |r| r.created_at))
    }

    async fn replace_reward(&self, reward: Reward) -> Result<Option<Reward>, ServiceError> {
        let mut map = self.rewards.write().await;
        let Some(slot) = map.get_mut(&reward.id) else {
            return Ok(None);
        };
        *slot = reward.clone();
        Ok(Some(reward))
    }

    async fn delete_reward(&self, id: ObjectId) -> Result<Option<Reward>, ServiceError> {
        Ok(self.rewards.write().await.remove(&id))
    }

    async fn existing_reward_ids(&self, ids: &[ObjectId]) -> Result<HashSet<ObjectId>, ServiceError> {
        let map = self.rewards.read().await;
        Ok(ids.iter().copied().filter(|id| map.contains_key(id)).collect())
    }
}

/// In-memory [`RewardRequestStore`].
#[derive(Debug, Default)]
pub struct InMemoryRewardRequestStore {
    requests: RwLock<HashMap<ObjectId, RewardRequest>>,
}

impl InMemoryRewardRequestStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Returns `true` if another record than `except` is active for `claim`.
fn has_active_conflict(
    map: &HashMap<ObjectId, RewardRequest>,
    claim: &Claim,
    except: Option<ObjectId>,
) -> bool {
    map.values()
        .any(|r| Some(r.id) != except && r.is_active() && r.claim() == *claim)
}

#[async_trait]
impl RewardRequestStore for InMemoryRewardRequestStore {
    async fn find_matching(
        &self,
        claim: &Claim,
        statuses: &[RewardRequestStatus],
    ) -> Result<Option<RewardRequest>, ServiceError> {
        let map = self.requests.read().await;
        Ok(map
            .values()
            .find(|r| r.claim() == *claim && statuses.contains(&r.status))
            .cloned())
    }

    async fn insert(&self, request: RewardRequest) -> Result<RewardRequest, ServiceError> {
        let mut map = self.requests.write().await;
        if request.is_active() && has_active_conflict(&map, &request.claim(), None) {
            return Err(duplicate(&request.claim()));
        }
        if map.contains_key(&request.id) {
            return Err(ServiceError::Internal(format!(
                "reward request {} already exists",
                request.id
            )));
        }
        map.insert(request.id, request.clone());
        Ok(request)
    }

    async fn find_by_id(&self, id: ObjectId) -> Result<Option<RewardRequest>, ServiceError> {
        Ok(self.requests.read().await.get(&id).cloned())
    }

    async fn update_by_id(
        &self,
        id: ObjectId,
        expected: Option<RewardRequestStatus>,
        patch: &RewardRequestPatch,
    ) -> Result<UpdateOutcome, ServiceError> {
        let mut map = self.requests.write().await;
        let Some(current) = map.get(&id) else {
            return Ok(UpdateOutcome::Missing);
        };
        if let Some(expected) = expected.filter(|s| *s != current.status) {
            tracing::debug!(
                request_id = %id,
                %expected,
                found = %current.status,
                "update skipped, status changed"
            );
            return Ok(UpdateOutcome::StatusChanged(current.status));
        }
        let mut updated = current.clone();
        patch.apply_to(&mut updated, Utc::now());
        if updated.is_active() && has_active_conflict(&map, &updated.claim(), Some(id)) {
            return Err(duplicate(&updated.claim()));
        }
        map.insert(id, updated.clone());
        Ok(UpdateOutcome::Updated(updated))
    }

    async fn delete_by_id(&self, id: ObjectId) -> Result<Option<RewardRequest>, ServiceError> {
        Ok(self.requests.write().await.remove(&id))
    }

    async fn list_all(&self) -> Result<Vec<RewardRequest>, ServiceError> {
        Ok(oldest_first(&*self.requests.read().await, |r| r.request_date))
    }
}
