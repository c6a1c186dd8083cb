//! OpenAPI document assembled from the handler annotations.

use utoipa::OpenApi;

use super::dto::{
    CreateEventBody, CreateRewardBody, CreateRewardRequestBody, UpdateEventBody,
    UpdateRewardBody, UpdateRewardRequestBody,
};
use super::handlers::{event, reward, reward_request, system};
use crate::domain::{Event, EventStatus, PaidRewardDetails, Reward, RewardRequest, RewardRequestStatus};
use crate::error::{ErrorBody, ErrorResponse};

/// OpenAPI description of every REST endpoint.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "reward-service",
        description = "Event and reward catalog with reward request fulfillment."
    ),
    paths(
        reward_request::create_reward_request,
        reward_request::list_reward_requests,
        reward_request::get_reward_request,
        reward_request::update_reward_request,
        reward_request::delete_reward_request,
        event::create_event,
        event::list_events,
        event::get_event,
        event::update_event,
        event::delete_event,
        reward::create_reward,
        reward::list_rewards,
        reward::get_reward,
        reward::update_reward,
        reward::delete_reward,
        system::health_handler,
    ),
    components(schemas(
        RewardRequest,
        RewardRequestStatus,
        PaidRewardDetails,
        Event,
        EventStatus,
        Reward,
        CreateRewardRequestBody,
        UpdateRewardRequestBody,
        CreateEventBody,
        UpdateEventBody,
        CreateRewardBody,
        UpdateRewardBody,
        ErrorResponse,
        ErrorBody,
        system::HealthResponse,
    )),
    tags(
        (name = "Reward Requests", description = "Claim and process rewards"),
        (name = "Events", description = "Event catalog"),
        (name = "Rewards", description = "Reward catalog"),
        (name = "System", description = "Health"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_reward_request_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/v1/reward-request"));
        assert!(doc.paths.paths.contains_key("/api/v1/reward-request/{id}"));
        assert!(doc.paths.paths.contains_key("/health"));
    }
}
