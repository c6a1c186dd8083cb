//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::persistence::Storage;
use crate::service::{CatalogService, FulfillmentEngine, TransitionPolicy};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Reward request lifecycle.
    pub fulfillment: Arc<FulfillmentEngine>,
    /// Event and reward catalog.
    pub catalog: Arc<CatalogService>,
    /// Storage backend name, reported by `/health`.
    pub storage_backend: &'static str,
}

impl AppState {
    /// Wires the service layer on top of `storage`.
    #[must_use]
    pub fn new(storage: Storage, policy: TransitionPolicy) -> Self {
        let fulfillment = FulfillmentEngine::new(
            Arc::clone(&storage.catalog),
            Arc::clone(&storage.requests),
            policy,
        );
        Self {
            fulfillment: Arc::new(fulfillment),
            catalog: Arc::new(CatalogService::new(storage.catalog)),
            storage_backend: storage.backend,
        }
    }
}
