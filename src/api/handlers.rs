//! HTTP API handlers.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;

use crate::error::SubscriptionError;
use crate::subscription::{Collection, FlowInfo, Subscription, SubscriptionPatch, SubscriptionService};

use super::response::{ApiError, ApiSuccess};

/// Application state shared with handlers.
#[derive(Clone)]
pub struct AppState {
    /// Subscription operations.
    pub subs: Arc<SubscriptionService>,
    /// Prometheus handle, when metrics are enabled.
    pub metrics: Option<PrometheusHandle>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("subs", &self.subs)
            .field("metrics", &self.metrics.is_some())
            .finish()
    }
}

impl AppState {
    /// Create new app state.
    pub fn new(subs: Arc<SubscriptionService>) -> Self {
        Self {
            subs,
            metrics: None,
        }
    }

    /// Serve metrics from `handle` on `/metrics`.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

type ApiResult<T> = Result<ApiSuccess<T>, ApiError>;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Status: "ok".
    pub status: &'static str,
}

/// Health check handler - always returns 200.
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

/// Prometheus exposition, or 404 when metrics are disabled.
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (StatusCode::NOT_FOUND, String::new()),
    }
}

/// `GET /api/sub/flow/:name` - remote usage quota of a subscription.
pub async fn get_flow_info(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<FlowInfo> {
    let info = state.subs.flow_info(&name).await?;
    Ok(ApiSuccess::ok(info))
}

/// `POST /api/subs` - create a subscription.
pub async fn create_subscription(
    State(state): State<AppState>,
    body: Result<Json<Subscription>, JsonRejection>,
) -> ApiResult<Subscription> {
    let Json(sub) = body?;
    let created = state.subs.create(sub).await?;
    Ok(ApiSuccess::created(created))
}

/// `GET /api/sub/:name` - one subscription.
pub async fn get_subscription(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Subscription> {
    match state.subs.get(&name) {
        Ok(sub) => Ok(ApiSuccess::ok(sub)),
        Err(SubscriptionError::NotFound(name)) => Err(ApiError::plain(
            StatusCode::NOT_FOUND,
            format!("Subscription {name} not found!"),
        )),
        Err(e) => Err(e.into()),
    }
}

/// `PATCH /api/sub/:name` - merge fields into a subscription, renaming it
/// when the body carries a different name.
pub async fn update_subscription(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: Result<Json<SubscriptionPatch>, JsonRejection>,
) -> ApiResult<Subscription> {
    let Json(patch) = body?;
    match state.subs.update(&name, patch).await {
        Ok(sub) => Ok(ApiSuccess::ok(sub)),
        Err(SubscriptionError::NotFound(name)) => Err(ApiError::plain(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Subscription {name} does not exist, cannot update!"),
        )),
        Err(e) => Err(e.into()),
    }
}

/// `DELETE /api/sub/:name` - remove a subscription and its collection
/// references.
pub async fn delete_subscription(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<()> {
    state.subs.delete(&name).await?;
    Ok(ApiSuccess::empty())
}

/// `GET /api/subs` - all subscriptions.
pub async fn list_subscriptions(State(state): State<AppState>) -> ApiResult<Vec<Subscription>> {
    Ok(ApiSuccess::ok(state.subs.list()?))
}

/// `GET /api/collections` - all collections.
pub async fn list_collections(State(state): State<AppState>) -> ApiResult<Vec<Collection>> {
    Ok(ApiSuccess::ok(state.subs.list_collections()?))
}

/// `GET /api/collection/:name` - one collection.
pub async fn get_collection(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Collection> {
    match state.subs.get_collection(&name) {
        Ok(col) => Ok(ApiSuccess::ok(col)),
        Err(SubscriptionError::NotFound(name)) => Err(ApiError::plain(
            StatusCode::NOT_FOUND,
            format!("Collection {name} not found!"),
        )),
        Err(e) => Err(e.into()),
    }
}
