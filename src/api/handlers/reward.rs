//! Reward catalog handlers.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{CreateRewardBody, UpdateRewardBody};
use crate::app_state::AppState;
use crate::domain::{ObjectId, Reward};
use crate::error::{ErrorResponse, ServiceError};

/// `POST /reward`: Create a reward.
///
/// # Errors
///
/// Returns [`ServiceError::Validation`] for a blank name or type, or a
/// non-finite value.
#[utoipa::path(
    post,
    path = "/api/v1/reward",
    tag = "Rewards",
    summary = "Create a reward",
    request_body = CreateRewardBody,
    responses(
        (status = 201, description = "Reward created", body = Reward),
        (status = 400, description = "Invalid reward", body = ErrorResponse),
    )
)]
pub async fn create_reward(
    State(state): State<AppState>,
    body: Result<Json<CreateRewardBody>, JsonRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let Json(body) = body?;
    let reward = state.catalog.create_reward(body.into()).await?;
    Ok((StatusCode::CREATED, Json(reward)))
}

/// `GET /reward`: List rewards.
///
/// # Errors
///
/// Returns [`ServiceError`] on storage failure.
#[utoipa::path(
    get,
    path = "/api/v1/reward",
    tag = "Rewards",
    summary = "List rewards",
    responses(
        (status = 200, description = "All rewards", body = Vec<Reward>),
    )
)]
pub async fn list_rewards(State(state): State<AppState>) -> Result<impl IntoResponse, ServiceError> {
    Ok(Json(state.catalog.list_rewards().await?))
}

/// `GET /reward/{id}`: Get a reward.
///
/// # Errors
///
/// Returns [`ServiceError::NotFound`] if the reward does not exist.
#[utoipa::path(
    get,
    path = "/api/v1/reward/{id}",
    tag = "Rewards",
    summary = "Get a reward",
    params(
        ("id" = String, Path, description = "Reward id (24 hex characters)"),
    ),
    responses(
        (status = 200, description = "Reward", body = Reward),
        (status = 404, description = "Reward not found", body = ErrorResponse),
    )
)]
pub async fn get_reward(
    State(state): State<AppState>,
    id: Result<Path<ObjectId>, PathRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let Path(id) = id?;
    Ok(Json(state.catalog.find_reward(id).await?))
}

/// `PATCH /reward/{id}`: Update a reward.
///
/// # Errors
///
/// Returns [`ServiceError`] if the reward does not exist or the merged
/// record is invalid.
#[utoipa::path(
    patch,
    path = "/api/v1/reward/{id}",
    tag = "Rewards",
    summary = "Update a reward",
    params(
        ("id" = String, Path, description = "Reward id (24 hex characters)"),
    ),
    request_body = UpdateRewardBody,
    responses(
        (status = 200, description = "Updated reward", body = Reward),
        (status = 400, description = "Invalid update", body = ErrorResponse),
        (status = 404, description = "Reward not found", body = ErrorResponse),
    )
)]
pub async fn update_reward(
    State(state): State<AppState>,
    id: Result<Path<ObjectId>, PathRejection>,
    body: Result<Json<UpdateRewardBody>, JsonRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let Path(id) = id?;
    let Json(body) = body?;
    Ok(Json(state.catalog.update_reward(id, body.into()).await?))
}

/// `DELETE /reward/{id}`: Delete a reward.
///
/// # Errors
///
/// Returns [`ServiceError::NotFound`] if the reward does not exist.
#[utoipa::path(
    delete,
    path = "/api/v1/reward/{id}",
    tag = "Rewards",
    summary = "Delete a reward",
    description = "Events and reward requests that reference the reward keep their references.",
    params(
        ("id" = String, Path, description = "Reward id (24 hex characters)"),
    ),
    responses(
        (status = 200, description = "Deleted reward", body = Reward),
        (status = 404, description = "Reward not found", body = ErrorResponse),
    )
)]
pub async fn delete_reward(
    State(state): State<AppState>,
    id: Result<Path<ObjectId>, PathRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let Path(id) = id?;
    Ok(Json(state.catalog.delete_reward(id).await?))
}

/// Reward routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/reward", post(create_reward).get(list_rewards))
        .route(
            "/reward/{id}",
            get(get_reward).patch(update_reward).delete(delete_reward),
        )
}
