//! Catalog service: validated writes for events and rewards.

use std::sync::Arc;

use crate::domain::{Event, EventPatch, NewEvent, NewReward, ObjectId, Reward, RewardPatch};
use crate::error::{EntityKind, ServiceError};
use crate::persistence::CatalogRepository;

/// Write-time validation in front of a [`CatalogRepository`].
///
/// Event writes check that every linked reward exists. Deleting a reward
/// does not touch events or reward requests that still reference it.
#[derive(Debug, Clone)]
pub struct CatalogService {
    catalog: Arc<dyn CatalogRepository>,
}

impl CatalogService {
    /// Creates a new `CatalogService`.
    #[must_use]
    pub fn new(catalog: Arc<dyn CatalogRepository>) -> Self {
        Self { catalog }
    }

    /// Validates and stores a new event.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Validation`] for a blank name, an inverted
    /// time window or an unknown reward id.
    pub async fn create_event(&self, new: NewEvent) -> Result<Event, ServiceError> {
        let event = Event::from_new(new);
        event.validate()?;
        self.ensure_rewards_exist(&event.reward_ids).await?;
        let stored = self.catalog.insert_event(event).await?;
        tracing::info!(event_id = %stored.id, rewards = stored.reward_ids.len(), "event created");
        Ok(stored)
    }

    /// Looks up an event.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] for an unknown id.
    pub async fn find_event(&self, id: ObjectId) -> Result<Event, ServiceError> {
        self.catalog
            .get_event(id)
            .await?
            .ok_or(ServiceError::not_found(EntityKind::Event, id))
    }

    /// Returns all events, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Persistence`] on storage failure.
    pub async fn list_events(&self) -> Result<Vec<Event>, ServiceError> {
        self.catalog.list_events().await
    }

    /// Merges `patch` into a stored event and re-validates the result.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] for an unknown id and
    /// [`ServiceError::Validation`] if the merged record is invalid.
    pub async fn update_event(&self, id: ObjectId, patch: EventPatch) -> Result<Event, ServiceError> {
        let mut event = self.find_event(id).await?;
        let relinked = patch.reward_ids.is_some();
        event.apply(patch);
        event.validate()?;
        if relinked {
            self.ensure_rewards_exist(&event.reward_ids).await?;
        }
        let stored = self
            .catalog
            .replace_event(event)
            .await?
            .ok_or(ServiceError::not_found(EntityKind::Event, id))?;
        tracing::info!(event_id = %id, "event updated");
        Ok(stored)
    }

    /// Deletes an event and returns it.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] for an unknown id.
    pub async fn delete_event(&self, id: ObjectId) -> Result<Event, ServiceError> {
        let removed = self
            .catalog
            .delete_event(id)
            .await?
            .ok_or(ServiceError::not_found(EntityKind::Event, id))?;
        tracing::info!(event_id = %id, "event deleted");
        Ok(removed)
    }

    /// Validates and stores a new reward.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Validation`] if the reward is invalid.
    pub async fn create_reward(&self, new: NewReward) -> Result<Reward, ServiceError> {
        let reward = Reward::from_new(new);
        reward.validate()?;
        let stored = self.catalog.insert_reward(reward).await?;
        tracing::info!(reward_id = %stored.id, reward_type = %stored.reward_type, "reward created");
        Ok(stored)
    }

    /// Looks up a reward.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] for an unknown id.
    pub async fn find_reward(&self, id: ObjectId) -> Result<Reward, ServiceError> {
        self.catalog
            .get_reward(id)
            .await?
            .ok_or(ServiceError::not_found(EntityKind::Reward, id))
    }

    /// Returns all rewards, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Persistence`] on storage failure.
    pub async fn list_rewards(&self) -> Result<Vec<Reward>, ServiceError> {
        self.catalog.list_rewards().await
    }

    /// Merges `patch` into a stored reward and re-validates the result.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] for an unknown id and
    /// [`ServiceError::Validation`] if the merged record is invalid.
    pub async fn update_reward(
        &self,
        id: ObjectId,
        patch: RewardPatch,
    ) -> Result<Reward, ServiceError> {
        let mut reward = self.find_reward(id).await?;
        reward.apply(patch);
        reward.validate()?;
        let stored = self
            .catalog
            .replace_reward(reward)
            .await?
            .ok_or(ServiceError::not_found(EntityKind::Reward, id))?;
        tracing::info!(reward_id = %id, "reward updated");
        Ok(stored)
    }

    /// Deletes a reward and returns it.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] for an unknown id.
    pub async fn delete_reward(&self, id: ObjectId) -> Result<Reward, ServiceError> {
        let removed = self
            .catalog
            .delete_reward(id)
            .await?
            .ok_or(ServiceError::not_found(EntityKind::Reward, id))?;
        tracing::info!(reward_id = %id, "reward deleted");
        Ok(removed)
    }

    async fn ensure_rewards_exist(&self, ids: &[ObjectId]) -> Result<(), ServiceError> {
        if ids.is_empty() {
            return Ok(());
        }
        let known = self.catalog.existing_reward_ids(ids).await?;
        match ids.iter().find(|id| !known.contains(*id)) {
            Some(missing) => Err(ServiceError::Validation(format!(
                "rewardIds references unknown reward \"{missing}\""
            ))),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::persistence::InMemoryCatalog;

    fn service() -> CatalogService {
        CatalogService::new(Arc::new(InMemoryCatalog::new()))
    }

    fn new_reward(name: &str) -> NewReward {
        NewReward {
            name: name.to_string(),
            description: Some("test reward".to_string()),
            reward_type: "coupon".to_string(),
            value: 5.0,
            stock: Some(10),
            expiry_date: None,
        }
    }

    fn new_event(reward_ids: Vec<ObjectId>) -> NewEvent {
        let start = Utc::now();
        NewEvent {
            name: "Spring fair".to_string(),
            description: None,
            content: None,
            start_date: start,
            end_date: start + Duration::hours(6),
            location: Some("Hall A".to_string()),
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

    #[tokio::test]
    async fn event_with_known_rewards_is_created() {
        let svc = service();
        let Ok(reward) = svc.create_reward(new_reward("Coupon")).await else {
            panic!("create reward failed");
        };
        let Ok(event) = svc.create_event(new_event(vec![reward.id, reward.id])).await else {
            panic!("create event failed");
        };
        assert_eq!(event.reward_ids, vec![reward.id]);
        let Ok(found) = svc.find_event(event.id).await else {
            panic!("find event failed");
        };
        assert_eq!(found, event);
    }

    #[tokio::test]
    async fn event_with_unknown_reward_is_rejected() {
        let svc = service();
        let unknown = ObjectId::new();
        let result = svc.create_event(new_event(vec![unknown])).await;
        let Err(ServiceError::Validation(message)) = result else {
            panic!("expected validation error");
        };
        assert!(message.contains(&unknown.to_string()));
        let Ok(events) = svc.list_events().await else {
            panic!("list events failed");
        };
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn event_with_inverted_window_is_rejected() {
        let svc = service();
        let mut new = new_event(Vec::new());
        new.end_date = new.start_date - Duration::hours(1);
        assert!(matches!(
            svc.create_event(new).await,
            Err(ServiceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn update_event_revalidates_merged_record() {
        let svc = service();
        let Ok(event) = svc.create_event(new_event(Vec::new())).await else {
            panic!("create event failed");
        };

        let patch = EventPatch {
            end_date: Some(event.start_date - Duration::days(1)),
            ..EventPatch::default()
        };
        assert!(matches!(
            svc.update_event(event.id, patch).await,
            Err(ServiceError::Validation(_))
        ));

        let patch = EventPatch {
            reward_ids: Some(vec![ObjectId::new()]),
            ..EventPatch::default()
        };
        assert!(matches!(
            svc.update_event(event.id, patch).await,
            Err(ServiceError::Validation(_))
        ));

        let Ok(reward) = svc.create_reward(new_reward("Voucher")).await else {
            panic!("create reward failed");
        };
        let patch = EventPatch {
            reward_ids: Some(vec![reward.id]),
            name: Some("Spring fair 2".to_string()),
            ..EventPatch::default()
        };
        let Ok(updated) = svc.update_event(event.id, patch).await else {
            panic!("update event failed");
        };
        assert!(updated.offers(reward.id));
        assert_eq!(updated.name, "Spring fair 2");
    }

    #[tokio::test]
    async fn reward_validation_rejects_blank_type() {
        let svc = service();
        let mut new = new_reward("Blank");
        new.reward_type = "  ".to_string();
        assert!(matches!(
            svc.create_reward(new).await,
            Err(ServiceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn reward_update_can_clear_stock() {
        let svc = service();
        let Ok(reward) = svc.create_reward(new_reward("Limited")).await else {
            panic!("create reward failed");
        };
        let patch = RewardPatch {
            stock: Some(None),
            ..RewardPatch::default()
        };
        let Ok(updated) = svc.update_reward(reward.id, patch).await else {
            panic!("update reward failed");
        };
        assert_eq!(updated.stock, None);
        assert_eq!(updated.name, "Limited");
    }

    #[tokio::test]
    async fn deleting_a_linked_reward_leaves_the_event_untouched() {
        let svc = service();
        let Ok(reward) = svc.create_reward(new_reward("Linked")).await else {
            panic!("create reward failed");
        };
        let Ok(event) = svc.create_event(new_event(vec![reward.id])).await else {
            panic!("create event failed");
        };
        let Ok(removed) = svc.delete_reward(reward.id).await else {
            panic!("delete reward failed");
        };
        assert_eq!(removed.id, reward.id);
        let Ok(found) = svc.find_event(event.id).await else {
            panic!("find event failed");
        };
        assert!(found.offers(reward.id));
    }

    #[tokio::test]
    async fn unknown_ids_are_not_found() {
        let svc = service();
        let id = ObjectId::new();
        assert!(matches!(
            svc.find_event(id).await,
            Err(ServiceError::NotFound {
                kind: EntityKind::Event,
                ..
            })
        ));
        assert!(matches!(
            svc.delete_reward(id).await,
            Err(ServiceError::NotFound {
                kind: EntityKind::Reward,
                ..
            })
        ));
        assert!(matches!(
            svc.update_reward(id, RewardPatch::default()).await,
            Err(ServiceError::NotFound { .. })
        ));
    }
}
