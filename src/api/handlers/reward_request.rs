//! Reward request handlers: create, list, get, update, delete.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{CreateRewardRequestBody, UpdateRewardRequestBody};
use crate::app_state::AppState;
use crate::domain::{ObjectId, RewardRequest};
use crate::error::{ErrorResponse, ServiceError};

/// `POST /reward-request`: Claim a reward for an event.
///
/// # Errors
///
/// Returns [`ServiceError`] when the claim is malformed, references an
/// unknown event or reward, is not offered by the event, or duplicates an
/// active request.
#[utoipa::path(
    post,
    path = "/api/v1/reward-request",
    tag = "Reward Requests",
    summary = "Request a reward",
    description = "Validates that the event exists and offers the reward, rejects duplicates of an active request for the same user, event and reward, then stores the request as approved.",
    request_body = CreateRewardRequestBody,
    responses(
        (status = 201, description = "Request approved", body = RewardRequest),
        (status = 400, description = "Malformed body or reward not offered by the event", body = ErrorResponse),
        (status = 404, description = "Event or reward not found", body = ErrorResponse),
        (status = 409, description = "Active request already exists", body = ErrorResponse),
    )
)]
pub async fn create_reward_request(
    State(state): State<AppState>,
    body: Result<Json<CreateRewardRequestBody>, JsonRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let Json(body) = body?;
    let request = state.fulfillment.create(body.into()).await?;
    Ok((StatusCode::CREATED, Json(request)))
}

/// `GET /reward-request`: List all reward requests.
///
/// # Errors
///
/// Returns [`ServiceError`] on storage failure.
#[utoipa::path(
    get,
    path = "/api/v1/reward-request",
    tag = "Reward Requests",
    summary = "List reward requests",
    description = "Returns every reward request ordered by request date.",
    responses(
        (status = 200, description = "All reward requests", body = Vec<RewardRequest>),
    )
)]
pub async fn list_reward_requests(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(Json(state.fulfillment.find_all().await?))
}

/// `GET /reward-request/{id}`: Get one reward request.
///
/// # Errors
///
/// Returns [`ServiceError::NotFound`] if the request does not exist.
#[utoipa::path(
    get,
    path = "/api/v1/reward-request/{id}",
    tag = "Reward Requests",
    summary = "Get a reward request",
    params(
        ("id" = String, Path, description = "Reward request id (24 hex characters)"),
    ),
    responses(
        (status = 200, description = "Reward request", body = RewardRequest),
        (status = 400, description = "Malformed id", body = ErrorResponse),
        (status = 404, description = "Reward request not found", body = ErrorResponse),
    )
)]
pub async fn get_reward_request(
    State(state): State<AppState>,
    id: Result<Path<ObjectId>, PathRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let Path(id) = id?;
    Ok(Json(state.fulfillment.find_one(id).await?))
}

/// `PATCH /reward-request/{id}`: Update status, message or references.
///
/// # Errors
///
/// Returns [`ServiceError`] if the request does not exist, the body is
/// malformed, or the change is refused.
#[utoipa::path(
    patch,
    path = "/api/v1/reward-request/{id}",
    tag = "Reward Requests",
    summary = "Update a reward request",
    description = "Applies any subset of status, resultMessage, userId, eventId and rewardId. Moving a request to paid records the payout details for its reward.",
    params(
        ("id" = String, Path, description = "Reward request id (24 hex characters)"),
    ),
    request_body = UpdateRewardRequestBody,
    responses(
        (status = 200, description = "Updated reward request", body = RewardRequest),
        (status = 400, description = "Malformed id or body", body = ErrorResponse),
        (status = 404, description = "Reward request not found", body = ErrorResponse),
        (status = 409, description = "Transition refused or duplicate active request", body = ErrorResponse),
    )
)]
pub async fn update_reward_request(
    State(state): State<AppState>,
    id: Result<Path<ObjectId>, PathRejection>,
    body: Result<Json<UpdateRewardRequestBody>, JsonRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let Path(id) = id?;
    let Json(body) = body?;
    Ok(Json(state.fulfillment.update(id, body.into()).await?))
}

/// `DELETE /reward-request/{id}`: Delete a reward request.
///
/// # Errors
///
/// Returns [`ServiceError::NotFound`] if the request does not exist.
#[utoipa::path(
    delete,
    path = "/api/v1/reward-request/{id}",
    tag = "Reward Requests",
    summary = "Delete a reward request",
    params(
        ("id" = String, Path, description = "Reward request id (24 hex characters)"),
    ),
    responses(
        (status = 200, description = "Deleted reward request", body = RewardRequest),
        (status = 400, description = "Malformed id", body = ErrorResponse),
        (status = 404, description = "Reward request not found", body = ErrorResponse),
    )
)]
pub async fn delete_reward_request(
    State(state): State<AppState>,
    id: Result<Path<ObjectId>, PathRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let Path(id) = id?;
    Ok(Json(state.fulfillment.remove(id).await?))
}

/// Reward request routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/reward-request",
            post(create_reward_request).get(list_reward_requests),
        )
        .route(
            "/reward-request/{id}",
            get(get_reward_request)
                .patch(update_reward_request)
                .delete(delete_reward_request),
        )
}
