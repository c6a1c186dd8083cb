//! PostgreSQL implementation of the persistence layer.
//!
//! Duplicate prevention relies on the partial unique index
//! `reward_requests_active_claim_key` created by the embedded migrations;
//! a unique violation on insert or update becomes
//! [`ServiceError::DuplicateRequest`].

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;

use super::models::{EventRow, RewardRequestRow, RewardRow, opt_u32_to_i64};
use super::{CatalogRepository, RewardRequestStore, UpdateOutcome, duplicate};
use crate::config::ServiceConfig;
use crate::domain::{Claim, Event, ObjectId, Reward, RewardRequest, RewardRequestPatch, RewardRequestStatus};
use crate::error::ServiceError;

macro_rules! event_columns {
    () => {
        "id, name, description, content, start_date, end_date, location, capacity, \
         current_participants, creator, status, image_url, application_form_url, \
         brochure_url, attachment_urls, reward_ids, created_at, updated_at"
    };
}

macro_rules! reward_columns {
    () => {
        "id, name, description, reward_type, value, stock, expiry_date, created_at, updated_at"
    };
}

macro_rules! request_columns {
    () => {
        "id, user_id, event_id, reward_id, status, request_date, process_date, \
         result_message, paid_reward_details, created_at, updated_at"
    };
}

/// Connects to PostgreSQL using the pool settings from `config` and, if
/// enabled, applies the embedded migrations.
///
/// # Errors
///
/// Returns a [`ServiceError::Persistence`] if the connection or a
/// migration fails.
pub async fn connect(config: &ServiceConfig) -> Result<PgPool, ServiceError> {
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .min_connections(config.database_min_connections)
        .acquire_timeout(std::time::Duration::from_secs(
            config.database_connect_timeout_secs,
        ))
        .connect(&config.database_url)
        .await?;

    if config.database_run_migrations {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| ServiceError::Persistence(format!("migration failed: {e}")))?;
        tracing::info!("database migrations applied");
    }

    Ok(pool)
}

/// Returns `true` if `err` is a unique-constraint violation.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

fn ids_to_strings(ids: &[ObjectId]) -> Vec<String> {
    ids.iter().map(ToString::to_string).collect()
}

/// PostgreSQL-backed [`CatalogRepository`].
#[derive(Debug, Clone)]
pub struct PostgresCatalog {
    pool: PgPool,
}

impl PostgresCatalog {
    /// Creates a catalog over the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn write_event(&self, sql: &'static str, event: &Event) -> Result<Option<Event>, ServiceError> {
        let row = sqlx::query_as::<_, EventRow>(sql)
            .bind(event.id.to_string())
            .bind(&event.name)
            .bind(&event.description)
            .bind(&event.content)
            .bind(event.start_date)
            .bind(event.end_date)
            .bind(&event.location)
            .bind(opt_u32_to_i64(event.capacity))
            .bind(i64::from(event.current_participants))
            .bind(&event.creator)
            .bind(event.status.as_str())
            .bind(&event.image_url)
            .bind(&event.application_form_url)
            .bind(&event.brochure_url)
            .bind(&event.attachment_urls)
            .bind(ids_to_strings(&event.reward_ids))
            .bind(event.created_at)
            .bind(event.updated_at)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Event::try_from).transpose()
    }

    async fn write_reward(&self, sql: &'static str, reward: &Reward) -> Result<Option<Reward>, ServiceError> {
        let row = sqlx::query_as::<_, RewardRow>(sql)
            .bind(reward.id.to_string())
            .bind(&reward.name)
            .bind(&reward.description)
            .bind(&reward.reward_type)
            .bind(reward.value)
            .bind(opt_u32_to_i64(reward.stock))
            .bind(reward.expiry_date)
            .bind(reward.created_at)
            .bind(reward.updated_at)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Reward::try_from).transpose()
    }
}

#[async_trait]
impl CatalogRepository for PostgresCatalog {
    async fn insert_event(&self, event: Event) -> Result<Event, ServiceError> {
        const SQL: &str = concat!(
            "INSERT INTO events (",
            event_columns!(),
            ") VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18) \
             RETURNING ",
            event_columns!()
        );
        self.write_event(SQL, &event)
            .await?
            .ok_or_else(|| ServiceError::Persistence("insert returned no row".to_string()))
    }

    async fn get_event(&self, id: ObjectId) -> Result<Option<Event>, ServiceError> {
        let row = sqlx::query_as::<_, EventRow>(concat!(
            "SELECT ",
            event_columns!(),
            " FROM events WHERE id = $1"
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.map(Event::try_from).transpose()
    }

    async fn list_events(&self) -> Result<Vec<Event>, ServiceError> {
        sqlx::query_as::<_, EventRow>(concat!(
            "SELECT ",
            event_columns!(),
            " FROM events ORDER BY created_at ASC, id ASC"
        ))
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(Event::try_from)
        .collect()
    }

    async fn replace_event(&self, event: Event) -> Result<Option<Event>, ServiceError> {
        const SQL: &str = concat!(
            "UPDATE events SET name = $2, description = $3, content = $4, start_date = $5, \
             end_date = $6, location = $7, capacity = $8, current_participants = $9, \
             creator = $10, status = $11, image_url = $12, application_form_url = $13, \
             brochure_url = $14, attachment_urls = $15, reward_ids = $16, created_at = $17, \
             updated_at = $18 WHERE id = $1 RETURNING ",
            event_columns!()
        );
        self.write_event(SQL, &event).await
    }

    async fn delete_event(&self, id: ObjectId) -> Result<Option<Event>, ServiceError> {
        let row = sqlx::query_as::<_, EventRow>(concat!(
            "DELETE FROM events WHERE id = $1 RETURNING ",
            event_columns!()
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.map(Event::try_from).transpose()
    }

    async fn insert_reward(&self, reward: Reward) -> Result<Reward, ServiceError> {
        const SQL: &str = concat!(
            "INSERT INTO rewards (",
            reward_columns!(),
            ") VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING ",
            reward_columns!()
        );
        self.write_reward(SQL, &reward)
            .await?
            .ok_or_else(|| ServiceError::Persistence("insert returned no row".to_string()))
    }

    async fn get_reward(&self, id: ObjectId) -> Result<Option<Reward>, ServiceError> {
        let row = sqlx::query_as::<_, RewardRow>(concat!(
            "SELECT ",
            reward_columns!(),
            " FROM rewards WHERE id = $1"
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.map(Reward::try_from).transpose()
    }

    async fn list_rewards(&self) -> Result<Vec<Reward>, ServiceError> {
        sqlx::query_as::<_, RewardRow>(concat!(
            "SELECT ",
            reward_columns!(),
            " FROM rewards ORDER BY created_at ASC, id ASC"
        ))
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(Reward::try_from)
        .collect()
    }

    async fn replace_reward(&self, reward: Reward) -> Result<Option<Reward>, ServiceError> {
        const SQL: &str = concat!(
            "UPDATE rewards SET name = $2, description = $3, reward_type = $4, value = $5, \
             stock = $6, expiry_date = $7, created_at = $8, updated_at = $9 \
             WHERE id = $1 RETURNING ",
            reward_columns!()
        );
        self.write_reward(SQL, &reward).await
    }

    async fn delete_reward(&self, id: ObjectId) -> Result<Option<Reward>, ServiceError> {
        let row = sqlx::query_as::<_, RewardRow>(concat!(
            "DELETE FROM rewards WHERE id = $1 RETURNING ",
            reward_columns!()
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.map(Reward::try_from).transpose()
    }

    async fn existing_reward_ids(&self, ids: &[ObjectId]) -> Result<HashSet<ObjectId>, ServiceError> {
        if ids.is_empty() {
            return Ok(HashSet::new());
        }
        let found = sqlx::query_scalar::<_, String>("SELECT id FROM rewards WHERE id = ANY($1)")
            .bind(ids_to_strings(ids))
            .fetch_all(&self.pool)
            .await?;
        // Ids coming back are a subset of the input, so any parse failure
        // means the row itself is corrupt.
        found
            .iter()
            .map(|raw| {
                raw.parse::<ObjectId>()
                    .map_err(|e| ServiceError::Persistence(format!("corrupt rewards.id column: {e}")))
            })
            .collect()
    }
}

/// PostgreSQL-backed [`RewardRequestStore`].
#[derive(Debug, Clone)]
pub struct PostgresRewardRequestStore {
    pool: PgPool,
}

impl PostgresRewardRequestStore {
    /// Creates a store over the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn status_of(&self, id: ObjectId) -> Result<Option<RewardRequestStatus>, ServiceError> {
        let raw = sqlx::query_scalar::<_, String>("SELECT status FROM reward_requests WHERE id = $1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        raw.map(|s| {
            s.parse::<RewardRequestStatus>().map_err(|e| {
                ServiceError::Persistence(format!("corrupt reward_requests.status column: {e}"))
            })
        })
        .transpose()
    }
}

#[async_trait]
impl RewardRequestStore for PostgresRewardRequestStore {
    async fn find_matching(
        &self,
        claim: &Claim,
        statuses: &[RewardRequestStatus],
    ) -> Result<Option<RewardRequest>, ServiceError> {
        let statuses: Vec<&str> = statuses.iter().map(|s| s.as_str()).collect();
        let row = sqlx::query_as::<_, RewardRequestRow>(concat!(
            "SELECT ",
            request_columns!(),
            " FROM reward_requests \
             WHERE user_id = $1 AND event_id = $2 AND reward_id = $3 AND status = ANY($4) \
             ORDER BY request_date ASC LIMIT 1"
        ))
        .bind(claim.user_id.to_string())
        .bind(claim.event_id.to_string())
        .bind(claim.reward_id.to_string())
        .bind(statuses)
        .fetch_optional(&self.pool)
        .await?;
        row.map(RewardRequest::try_from).transpose()
    }

    async fn insert(&self, request: RewardRequest) -> Result<RewardRequest, ServiceError> {
        let result = sqlx::query_as::<_, RewardRequestRow>(concat!(
            "INSERT INTO reward_requests (",
            request_columns!(),
            ") VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING ",
            request_columns!()
        ))
        .bind(request.id.to_string())
        .bind(request.user_id.to_string())
        .bind(request.event_id.to_string())
        .bind(request.reward_id.to_string())
        .bind(request.status.as_str())
        .bind(request.request_date)
        .bind(request.process_date)
        .bind(&request.result_message)
        .bind(request.paid_reward_details.as_ref().map(Json))
        .bind(request.created_at)
        .bind(request.updated_at)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(row) => RewardRequest::try_from(row),
            Err(err) if is_unique_violation(&err) => Err(duplicate(&request.claim())),
            Err(err) => Err(err.into()),
        }
    }

    async fn find_by_id(&self, id: ObjectId) -> Result<Option<RewardRequest>, ServiceError> {
        let row = sqlx::query_as::<_, RewardRequestRow>(concat!(
            "SELECT ",
            request_columns!(),
            " FROM reward_requests WHERE id = $1"
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.map(RewardRequest::try_from).transpose()
    }

    async fn update_by_id(
        &self,
        id: ObjectId,
        expected: Option<RewardRequestStatus>,
        patch: &RewardRequestPatch,
    ) -> Result<UpdateOutcome, ServiceError> {
        let result = sqlx::query_as::<_, RewardRequestRow>(concat!(
            "UPDATE reward_requests SET \
             process_date = CASE WHEN $2::text IS NOT NULL AND $2::text <> status \
                            THEN now() ELSE process_date END, \
             status = COALESCE($2::text, status), \
             result_message = COALESCE($3::text, result_message), \
             user_id = COALESCE($4::text, user_id), \
             event_id = COALESCE($5::text, event_id), \
             reward_id = COALESCE($6::text, reward_id), \
             paid_reward_details = COALESCE($7::jsonb, paid_reward_details), \
             updated_at = now() \
             WHERE id = $1 AND ($8::text IS NULL OR status = $8::text) RETURNING ",
            request_columns!()
        ))
        .bind(id.to_string())
        .bind(patch.status.map(RewardRequestStatus::as_str))
        .bind(&patch.result_message)
        .bind(patch.user_id.map(|v| v.to_string()))
        .bind(patch.event_id.map(|v| v.to_string()))
        .bind(patch.reward_id.map(|v| v.to_string()))
        .bind(patch.paid_reward_details.as_ref().map(Json))
        .bind(expected.map(RewardRequestStatus::as_str))
        .fetch_optional(&self.pool)
        .await;

        match result {
            Ok(Some(row)) => RewardRequest::try_from(row).map(UpdateOutcome::Updated),
            Ok(None) => self.status_of(id).await.map(|found| {
                found.map_or(UpdateOutcome::Missing, UpdateOutcome::StatusChanged)
            }),
            Err(err) if is_unique_violation(&err) => {
                // The failed update left the row untouched; rebuild the
                // claim it would have had to name it in the error.
                let Some(mut current) = self.find_by_id(id).await? else {
                    return Err(err.into());
                };
                patch.apply_to(&mut current, Utc::now());
                Err(duplicate(&current.claim()))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn delete_by_id(&self, id: ObjectId) -> Result<Option<RewardRequest>, ServiceError> {
        let row = sqlx::query_as::<_, RewardRequestRow>(concat!(
            "DELETE FROM reward_requests WHERE id = $1 RETURNING ",
            request_columns!()
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.map(RewardRequest::try_from).transpose()
    }

    async fn list_all(&self) -> Result<Vec<RewardRequest>, ServiceError> {
        sqlx::query_as::<_, RewardRequestRow>(concat!(
            "SELECT ",
            request_columns!(),
            " FROM reward_requests ORDER BY request_date ASC, id ASC"
        ))
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(RewardRequest::try_from)
        .collect()
    }
}
