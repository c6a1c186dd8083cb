//! Reward request fulfillment: claim validation, approval and payout.

use std::sync::Arc;

use chrono::Utc;

use crate::domain::{
    Claim, ObjectId, PaidRewardDetails, RewardRequest, RewardRequestPatch, RewardRequestStatus,
};
use crate::error::{EntityKind, ServiceError};
use crate::persistence::{self, CatalogRepository, RewardRequestStore, UpdateOutcome};

/// How many times `update` re-reads a request whose status changed
/// between its checks and its write.
const UPDATE_ATTEMPTS: u32 = 3;

/// How `update` treats status changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransitionPolicy {
    /// Any status may be set from any status.
    #[default]
    Permissive,
    /// Only [`RewardRequestStatus::can_transition_to`] moves are accepted.
    Strict,
}

impl TransitionPolicy {
    /// Returns `true` if `from → to` is accepted under this policy.
    #[must_use]
    pub const fn allows(self, from: RewardRequestStatus, to: RewardRequestStatus) -> bool {
        match self {
            Self::Permissive => true,
            Self::Strict => from.can_transition_to(to),
        }
    }
}

/// Orchestrates the reward request lifecycle.
///
/// `create` resolves the claimed event and reward, checks that the event
/// offers the reward, rejects duplicates and stores the request as
/// `approved`. The duplicate check here is a fast path: the store's
/// insert is the authority, so concurrent claims for one triple still
/// produce a single record.
#[derive(Debug, Clone)]
pub struct FulfillmentEngine {
    catalog: Arc<dyn CatalogRepository>,
    requests: Arc<dyn RewardRequestStore>,
    policy: TransitionPolicy,
}

impl FulfillmentEngine {
    /// Creates a new `FulfillmentEngine`.
    #[must_use]
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        requests: Arc<dyn RewardRequestStore>,
        policy: TransitionPolicy,
    ) -> Self {
        Self {
            catalog,
            requests,
            policy,
        }
    }

    /// Validates `claim` and stores it as an approved request.
    ///
    /// Nothing is written unless every check passes.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::NotFound`] if the event or reward does not exist.
    /// - [`ServiceError::Linkage`] if the event does not offer the reward.
    /// - [`ServiceError::DuplicateRequest`] if an active request already
    ///   exists for the same user, event and reward.
    /// - [`ServiceError::Persistence`] on storage failure.
    pub async fn create(&self, claim: Claim) -> Result<RewardRequest, ServiceError> {
        let event = self
            .catalog
            .get_event(claim.event_id)
            .await?
            .ok_or(ServiceError::not_found(EntityKind::Event, claim.event_id))?;
        if self.catalog.get_reward(claim.reward_id).await?.is_none() {
            return Err(ServiceError::not_found(EntityKind::Reward, claim.reward_id));
        }
        if !event.offers(claim.reward_id) {
            return Err(ServiceError::Linkage {
                event_id: claim.event_id,
                reward_id: claim.reward_id,
            });
        }

        if self
            .requests
            .find_matching(&claim, &RewardRequestStatus::ACTIVE)
            .await?
            .is_some()
        {
            tracing::debug!(
                user_id = %claim.user_id,
                event_id = %claim.event_id,
                reward_id = %claim.reward_id,
                "duplicate claim rejected"
            );
            return Err(persistence::duplicate(&claim));
        }

        let mut request = RewardRequest::pending(claim);
        let approved = RewardRequestStatus::Approved;
        debug_assert!(request.status.can_transition_to(approved));
        request.set_status(approved, Utc::now());

        let stored = self.requests.insert(request).await?;
        tracing::info!(
            request_id = %stored.id,
            user_id = %stored.user_id,
            event_id = %stored.event_id,
            reward_id = %stored.reward_id,
            "reward request approved"
        );
        Ok(stored)
    }

    /// Returns every reward request, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Persistence`] on storage failure.
    pub async fn find_all(&self) -> Result<Vec<RewardRequest>, ServiceError> {
        self.requests.list_all().await
    }

    /// Looks up one reward request.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] for an unknown id.
    pub async fn find_one(&self, id: ObjectId) -> Result<RewardRequest, ServiceError> {
        self.requests
            .find_by_id(id)
            .await?
            .ok_or(ServiceError::not_found(EntityKind::RewardRequest, id))
    }

    /// Applies `patch` to a stored request.
    ///
    /// Claim references are rewritten without re-validation. Moving a
    /// request to `paid` records the payout for its reward unless one is
    /// already present. A status change is written only if the status it
    /// was checked against is still stored; when a concurrent update got
    /// there first, the request is re-read and the checks run again.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::NotFound`] for an unknown id.
    /// - [`ServiceError::InvalidTransition`] if the strict policy refuses
    ///   the status change, or the status kept changing underneath it.
    /// - [`ServiceError::DuplicateRequest`] if the result would be a
    ///   second active request for its claim.
    pub async fn update(
        &self,
        id: ObjectId,
        patch: RewardRequestPatch,
    ) -> Result<RewardRequest, ServiceError> {
        let mut attempt = 1;
        loop {
            let current = self.find_one(id).await?;
            let mut write = patch.clone();
            let expected = match write.status {
                Some(to) => {
                    if !self.policy.allows(current.status, to) {
                        return Err(ServiceError::InvalidTransition {
                            from: current.status,
                            to,
                        });
                    }
                    if to == RewardRequestStatus::Paid
                        && current.paid_reward_details.is_none()
                        && write.paid_reward_details.is_none()
                    {
                        write.paid_reward_details = self.payout_for(&current, &write).await?;
                    }
                    Some(current.status)
                }
                None => None,
            };

            match self.requests.update_by_id(id, expected, &write).await? {
                UpdateOutcome::Updated(updated) => {
                    if current.status != updated.status {
                        tracing::info!(
                            request_id = %id,
                            from = %current.status,
                            to = %updated.status,
                            "reward request status changed"
                        );
                    }
                    return Ok(updated);
                }
                UpdateOutcome::Missing => {
                    return Err(ServiceError::not_found(EntityKind::RewardRequest, id));
                }
                UpdateOutcome::StatusChanged(found) => {
                    tracing::debug!(
                        request_id = %id,
                        expected = %current.status,
                        %found,
                        attempt,
                        "status changed during update, retrying"
                    );
                    if attempt >= UPDATE_ATTEMPTS {
                        return Err(ServiceError::InvalidTransition {
                            from: found,
                            to: write.status.unwrap_or(found),
                        });
                    }
                    attempt += 1;
                }
            }
        }
    }

    /// Deletes a request and returns it.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] for an unknown id.
    pub async fn remove(&self, id: ObjectId) -> Result<RewardRequest, ServiceError> {
        let removed = self
            .requests
            .delete_by_id(id)
            .await?
            .ok_or(ServiceError::not_found(EntityKind::RewardRequest, id))?;
        tracing::info!(request_id = %id, "reward request deleted");
        Ok(removed)
    }

    /// Computes the payout for `current` as it will look after `patch`.
    async fn payout_for(
        &self,
        current: &RewardRequest,
        patch: &RewardRequestPatch,
    ) -> Result<Option<PaidRewardDetails>, ServiceError> {
        let mut preview = current.clone();
        patch.apply_to(&mut preview, Utc::now());
        match self.catalog.get_reward(preview.reward_id).await? {
            Some(reward) => Ok(Some(PaidRewardDetails::for_reward(&reward, &preview))),
            None => {
                tracing::warn!(
                    request_id = %preview.id,
                    reward_id = %preview.reward_id,
                    "paid request references a missing reward; payout details left empty"
                );
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use async_trait::async_trait;
    use chrono::Duration;

    use super::*;
    use crate::domain::{Event, NewEvent, NewReward, Reward};
    use crate::persistence::Storage;
    use RewardRequestStatus::{Approved, Paid, Pending, Rejected};

    struct Fixture {
        engine: FulfillmentEngine,
        storage: Storage,
        event: Event,
        offered: Reward,
        unoffered: Reward,
    }

    fn new_reward(name: &str, reward_type: &str, value: f64) -> Reward {
        Reward::from_new(NewReward {
            name: name.to_string(),
            description: None,
            reward_type: reward_type.to_string(),
            value,
            stock: None,
            expiry_date: None,
        })
    }

    fn new_event(reward_ids: Vec<ObjectId>) -> Event {
        let start = Utc::now();
        Event::from_new(NewEvent {
            name: "Launch week".to_string(),
            description: None,
            content: None,
            start_date: start,
            end_date: start + Duration::days(7),
            location: None,
            capacity: Some(100),
            creator: None,
            status: None,
            image_url: None,
            application_form_url: None,
            brochure_url: None,
            attachment_urls: Vec::new(),
            reward_ids,
        })
    }

    async fn fixture(policy: TransitionPolicy) -> Fixture {
        let storage = Storage::in_memory();
        let Ok(offered) = storage
            .catalog
            .insert_reward(new_reward("100 points", "point", 100.0))
            .await
        else {
            panic!("insert reward");
        };
        let Ok(unoffered) = storage
            .catalog
            .insert_reward(new_reward("Mug", "item", 1.0))
            .await
        else {
            panic!("insert reward");
        };
        let Ok(event) = storage.catalog.insert_event(new_event(vec![offered.id])).await else {
            panic!("insert event");
        };
        let engine = FulfillmentEngine::new(
            Arc::clone(&storage.catalog),
            Arc::clone(&storage.requests),
            policy,
        );
        Fixture {
            engine,
            storage,
            event,
            offered,
            unoffered,
        }
    }

    fn claim(user_id: ObjectId, event: &Event, reward: &Reward) -> Claim {
        Claim {
            user_id,
            event_id: event.id,
            reward_id: reward.id,
        }
    }

    fn status_patch(status: RewardRequestStatus) -> RewardRequestPatch {
        RewardRequestPatch {
            status: Some(status),
            ..RewardRequestPatch::default()
        }
    }

    #[tokio::test]
    async fn create_approves_linked_claim() {
        let f = fixture(TransitionPolicy::Permissive).await;
        let Ok(request) = f
            .engine
            .create(claim(ObjectId::new(), &f.event, &f.offered))
            .await
        else {
            panic!("create failed");
        };
        assert_eq!(request.status, Approved);
        assert!(request.process_date.is_some());
        assert!(request.paid_reward_details.is_none());

        let Ok(found) = f.engine.find_one(request.id).await else {
            panic!("find_one failed");
        };
        assert_eq!(found, request);
    }

    #[tokio::test]
    async fn create_rejects_unoffered_reward() {
        let f = fixture(TransitionPolicy::Permissive).await;
        let result = f
            .engine
            .create(claim(ObjectId::new(), &f.event, &f.unoffered))
            .await;
        assert!(matches!(result, Err(ServiceError::Linkage { .. })));
        let Ok(all) = f.engine.find_all().await else {
            panic!("find_all failed");
        };
        assert!(all.is_empty());
    }

    #[tokio::test]
    async fn create_reports_missing_event_before_missing_reward() {
        let f = fixture(TransitionPolicy::Permissive).await;
        let missing = Claim {
            user_id: ObjectId::new(),
            event_id: ObjectId::new(),
            reward_id: ObjectId::new(),
        };
        let result = f.engine.create(missing).await;
        assert!(matches!(
            result,
            Err(ServiceError::NotFound {
                kind: EntityKind::Event,
                ..
            })
        ));

        let missing_reward = Claim {
            reward_id: ObjectId::new(),
            ..claim(ObjectId::new(), &f.event, &f.offered)
        };
        let result = f.engine.create(missing_reward).await;
        assert!(matches!(
            result,
            Err(ServiceError::NotFound {
                kind: EntityKind::Reward,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn second_claim_is_a_duplicate_until_rejected() {
        let f = fixture(TransitionPolicy::Permissive).await;
        let c = claim(ObjectId::new(), &f.event, &f.offered);
        let Ok(first) = f.engine.create(c).await else {
            panic!("first create failed");
        };
        assert!(matches!(
            f.engine.create(c).await,
            Err(ServiceError::DuplicateRequest { .. })
        ));

        let Ok(rejected) = f.engine.update(first.id, status_patch(Rejected)).await else {
            panic!("reject failed");
        };
        assert_eq!(rejected.status, Rejected);

        let Ok(second) = f.engine.create(c).await else {
            panic!("resubmission failed");
        };
        assert_ne!(second.id, first.id);
        assert_eq!(second.status, Approved);
    }

    #[tokio::test]
    async fn paid_request_still_blocks_new_claims() {
        let f = fixture(TransitionPolicy::Permissive).await;
        let c = claim(ObjectId::new(), &f.event, &f.offered);
        let Ok(first) = f.engine.create(c).await else {
            panic!("create failed");
        };
        let Ok(_) = f.engine.update(first.id, status_patch(Paid)).await else {
            panic!("pay failed");
        };
        assert!(matches!(
            f.engine.create(c).await,
            Err(ServiceError::DuplicateRequest { .. })
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_claims_admit_exactly_one() {
        let f = fixture(TransitionPolicy::Permissive).await;
        let engine = Arc::new(f.engine);
        let c = claim(ObjectId::new(), &f.event, &f.offered);

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let engine = Arc::clone(&engine);
                tokio::spawn(async move { engine.create(c).await })
            })
            .collect();

        let mut approved = 0;
        let mut duplicates = 0;
        for handle in handles {
            match handle.await {
                Ok(Ok(_)) => approved += 1,
                Ok(Err(ServiceError::DuplicateRequest { .. })) => duplicates += 1,
                other => panic!("unexpected outcome: {other:?}"),
            }
        }
        assert_eq!(approved, 1);
        assert_eq!(duplicates, 15);
    }

    #[tokio::test]
    async fn paying_stamps_payout_details() {
        let f = fixture(TransitionPolicy::Strict).await;
        let Ok(request) = f
            .engine
            .create(claim(ObjectId::new(), &f.event, &f.offered))
            .await
        else {
            panic!("create failed");
        };
        let Ok(paid) = f.engine.update(request.id, status_patch(Paid)).await else {
            panic!("pay failed");
        };
        assert_eq!(paid.status, Paid);
        assert_eq!(
            paid.paid_reward_details,
            Some(PaidRewardDetails::Point { amount: 100.0 })
        );
    }

    #[tokio::test]
    async fn paying_with_dangling_reward_leaves_details_empty() {
        let f = fixture(TransitionPolicy::Permissive).await;
        let Ok(request) = f
            .engine
            .create(claim(ObjectId::new(), &f.event, &f.offered))
            .await
        else {
            panic!("create failed");
        };
        let Ok(Some(_)) = f.storage.catalog.delete_reward(f.offered.id).await else {
            panic!("delete reward failed");
        };
        let Ok(paid) = f.engine.update(request.id, status_patch(Paid)).await else {
            panic!("pay failed");
        };
        assert_eq!(paid.status, Paid);
        assert!(paid.paid_reward_details.is_none());
    }

    #[tokio::test]
    async fn strict_policy_refuses_backward_moves() {
        let f = fixture(TransitionPolicy::Strict).await;
        let Ok(request) = f
            .engine
            .create(claim(ObjectId::new(), &f.event, &f.offered))
            .await
        else {
            panic!("create failed");
        };
        let Ok(_) = f.engine.update(request.id, status_patch(Paid)).await else {
            panic!("pay failed");
        };
        let result = f.engine.update(request.id, status_patch(Pending)).await;
        assert!(matches!(
            result,
            Err(ServiceError::InvalidTransition {
                from: Paid,
                to: Pending
            })
        ));
    }

    /// Store whose lookups return a snapshot that is already `delay` old.
    #[derive(Debug)]
    struct LaggingReads {
        inner: Arc<dyn RewardRequestStore>,
        delay: std::time::Duration,
    }

    #[async_trait]
    impl RewardRequestStore for LaggingReads {
        async fn find_matching(
            &self,
            claim: &Claim,
            statuses: &[RewardRequestStatus],
        ) -> Result<Option<RewardRequest>, ServiceError> {
            self.inner.find_matching(claim, statuses).await
        }

        async fn insert(&self, request: RewardRequest) -> Result<RewardRequest, ServiceError> {
            self.inner.insert(request).await
        }

        async fn find_by_id(&self, id: ObjectId) -> Result<Option<RewardRequest>, ServiceError> {
            let snapshot = self.inner.find_by_id(id).await;
            tokio::time::sleep(self.delay).await;
            snapshot
        }

        async fn update_by_id(
            &self,
            id: ObjectId,
            expected: Option<RewardRequestStatus>,
            patch: &RewardRequestPatch,
        ) -> Result<UpdateOutcome, ServiceError> {
            self.inner.update_by_id(id, expected, patch).await
        }

        async fn delete_by_id(&self, id: ObjectId) -> Result<Option<RewardRequest>, ServiceError> {
            self.inner.delete_by_id(id).await
        }

        async fn list_all(&self) -> Result<Vec<RewardRequest>, ServiceError> {
            self.inner.list_all().await
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_pay_and_reject_settle_on_one_outcome() {
        let f = fixture(TransitionPolicy::Strict).await;
        let Ok(request) = f
            .engine
            .create(claim(ObjectId::new(), &f.event, &f.offered))
            .await
        else {
            panic!("create failed");
        };
        let lagging: Arc<dyn RewardRequestStore> = Arc::new(LaggingReads {
            inner: Arc::clone(&f.storage.requests),
            delay: std::time::Duration::from_millis(50),
        });
        let engine = Arc::new(FulfillmentEngine::new(
            Arc::clone(&f.storage.catalog),
            lagging,
            TransitionPolicy::Strict,
        ));

        let pay = {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move { engine.update(request.id, status_patch(Paid)).await })
        };
        let reject = {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move { engine.update(request.id, status_patch(Rejected)).await })
        };
        let (Ok(paid), Ok(rejected)) = (pay.await, reject.await) else {
            panic!("update task panicked");
        };

        let winner = match (paid, rejected) {
            (Ok(r), Err(ServiceError::InvalidTransition { .. }))
            | (Err(ServiceError::InvalidTransition { .. }), Ok(r)) => r,
            other => panic!("expected exactly one update to win: {other:?}"),
        };
        let Ok(stored) = f.engine.find_one(request.id).await else {
            panic!("find_one failed");
        };
        assert_eq!(stored, winner);
        assert_eq!(
            stored.paid_reward_details.is_some(),
            stored.status == Paid,
            "payout details must match the final status: {stored:?}"
        );
    }

    #[tokio::test]
    async fn permissive_policy_accepts_backward_moves() {
        let f = fixture(TransitionPolicy::Permissive).await;
        let Ok(request) = f
            .engine
            .create(claim(ObjectId::new(), &f.event, &f.offered))
            .await
        else {
            panic!("create failed");
        };
        let Ok(_) = f.engine.update(request.id, status_patch(Paid)).await else {
            panic!("pay failed");
        };
        let Ok(back) = f.engine.update(request.id, status_patch(Pending)).await else {
            panic!("backward move failed");
        };
        assert_eq!(back.status, Pending);
        assert!(back.paid_reward_details.is_some());
    }

    #[tokio::test]
    async fn update_keeps_process_date_without_status_change() {
        let f = fixture(TransitionPolicy::Permissive).await;
        let Ok(request) = f
            .engine
            .create(claim(ObjectId::new(), &f.event, &f.offered))
            .await
        else {
            panic!("create failed");
        };
        let patch = RewardRequestPatch {
            result_message: Some("checked by ops".to_string()),
            ..RewardRequestPatch::default()
        };
        let Ok(updated) = f.engine.update(request.id, patch).await else {
            panic!("update failed");
        };
        assert_eq!(updated.process_date, request.process_date);
        assert_eq!(updated.result_message.as_deref(), Some("checked by ops"));
        assert_eq!(updated.status, Approved);
    }

    #[tokio::test]
    async fn unknown_ids_are_not_found() {
        let f = fixture(TransitionPolicy::Permissive).await;
        let id = ObjectId::new();
        assert!(matches!(
            f.engine.find_one(id).await,
            Err(ServiceError::NotFound { .. })
        ));
        assert!(matches!(
            f.engine.update(id, status_patch(Rejected)).await,
            Err(ServiceError::NotFound { .. })
        ));
        assert!(matches!(
            f.engine.remove(id).await,
            Err(ServiceError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn remove_returns_deleted_record() {
        let f = fixture(TransitionPolicy::Permissive).await;
        let Ok(request) = f
            .engine
            .create(claim(ObjectId::new(), &f.event, &f.offered))
            .await
        else {
            panic!("create failed");
        };
        let Ok(removed) = f.engine.remove(request.id).await else {
            panic!("remove failed");
        };
        assert_eq!(removed, request);
        assert!(matches!(
            f.engine.find_one(request.id).await,
            Err(ServiceError::NotFound { .. })
        ));
    }

    #[test]
    fn permissive_policy_allows_everything() {
        for from in RewardRequestStatus::ALL {
            for to in RewardRequestStatus::ALL {
                assert!(TransitionPolicy::Permissive.allows(from, to));
            }
        }
        assert!(!TransitionPolicy::Strict.allows(Rejected, Approved));
    }
}
