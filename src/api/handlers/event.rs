//! Event catalog handlers.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{CreateEventBody, UpdateEventBody};
use crate::app_state::AppState;
use crate::domain::{Event, ObjectId};
use crate::error::{ErrorResponse, ServiceError};

/// `POST /event`: Create an event.
///
/// # Errors
///
/// Returns [`ServiceError::Validation`] for an invalid event or an
/// unknown reward id.
#[utoipa::path(
    post,
    path = "/api/v1/event",
    tag = "Events",
    summary = "Create an event",
    request_body = CreateEventBody,
    responses(
        (status = 201, description = "Event created", body = Event),
        (status = 400, description = "Invalid event", body = ErrorResponse),
    )
)]
pub async fn create_event(
    State(state): State<AppState>,
    body: Result<Json<CreateEventBody>, JsonRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let Json(body) = body?;
    let event = state.catalog.create_event(body.into()).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

/// `GET /event`: List events.
///
/// # Errors
///
/// Returns [`ServiceError`] on storage failure.
#[utoipa::path(
    get,
    path = "/api/v1/event",
    tag = "Events",
    summary = "List events",
    responses(
        (status = 200, description = "All events", body = Vec<Event>),
    )
)]
pub async fn list_events(State(state): State<AppState>) -> Result<impl IntoResponse, ServiceError> {
    Ok(Json(state.catalog.list_events().await?))
}

/// `GET /event/{id}`: Get an event.
///
/// # Errors
///
/// Returns [`ServiceError::NotFound`] if the event does not exist.
#[utoipa::path(
    get,
    path = "/api/v1/event/{id}",
    tag = "Events",
    summary = "Get an event",
    params(
        ("id" = String, Path, description = "Event id (24 hex characters)"),
    ),
    responses(
        (status = 200, description = "Event", body = Event),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn get_event(
    State(state): State<AppState>,
    id: Result<Path<ObjectId>, PathRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let Path(id) = id?;
    Ok(Json(state.catalog.find_event(id).await?))
}

/// `PATCH /event/{id}`: Update an event.
///
/// # Errors
///
/// Returns [`ServiceError`] if the event does not exist or the merged
/// record is invalid.
#[utoipa::path(
    patch,
    path = "/api/v1/event/{id}",
    tag = "Events",
    summary = "Update an event",
    params(
        ("id" = String, Path, description = "Event id (24 hex characters)"),
    ),
    request_body = UpdateEventBody,
    responses(
        (status = 200, description = "Updated event", body = Event),
        (status = 400, description = "Invalid update", body = ErrorResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn update_event(
    State(state): State<AppState>,
    id: Result<Path<ObjectId>, PathRejection>,
    body: Result<Json<UpdateEventBody>, JsonRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let Path(id) = id?;
    let Json(body) = body?;
    Ok(Json(state.catalog.update_event(id, body.into()).await?))
}

/// `DELETE /event/{id}`: Delete an event.
///
/// # Errors
///
/// Returns [`ServiceError::NotFound`] if the event does not exist.
#[utoipa::path(
    delete,
    path = "/api/v1/event/{id}",
    tag = "Events",
    summary = "Delete an event",
    params(
        ("id" = String, Path, description = "Event id (24 hex characters)"),
    ),
    responses(
        (status = 200, description = "Deleted event", body = Event),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn delete_event(
    State(state): State<AppState>,
    id: Result<Path<ObjectId>, PathRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let Path(id) = id?;
    Ok(Json(state.catalog.delete_event(id).await?))
}

/// Event routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/event", post(create_event).get(list_events))
        .route(
            "/event/{id}",
            get(get_event).patch(update_event).delete(delete_event),
        )
}
