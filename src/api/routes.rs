//! HTTP API route definitions.

use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::utils::shutdown_signal;

use super::handlers::{
    create_subscription, delete_subscription, get_collection, get_flow_info, get_subscription,
    health, list_collections, list_subscriptions, metrics, update_subscription, AppState,
};

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health and metrics
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        // Subscriptions
        .route("/api/sub/flow/:name", get(get_flow_info))
        .route(
            "/api/sub/:name",
            get(get_subscription)
                .patch(update_subscription)
                .delete(delete_subscription),
        )
        .route(
            "/api/subs",
            get(list_subscriptions).post(create_subscription),
        )
        // Collections (read-only)
        .route("/api/collections", get(list_collections))
        .route("/api/collection/:name", get(get_collection))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind `addr` and serve the API until a shutdown signal arrives.
pub async fn serve(addr: &str, state: AppState) -> crate::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", listener.local_addr()?);

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::store::{KvStoreExt, MemoryStore, COLLECTIONS_KEY};
    use crate::subscription::{Collection, MockFlowFetcher, SubscriptionService};

    fn app_with(flow: MockFlowFetcher) -> (Arc<MemoryStore>, Router) {
        let store = Arc::new(MemoryStore::new());
        let subs = SubscriptionService::new(store.clone(), Arc::new(flow)).unwrap();
        (store, create_router(AppState::new(Arc::new(subs))))
    }

    fn app() -> (Arc<MemoryStore>, Router) {
        app_with(MockFlowFetcher::new())
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(v) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };

        let response = app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let (_, app) = app();
        let (status, body) = send(&app, Method::GET, "/health", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn metrics_endpoint_is_404_when_disabled() {
        let (_, app) = app();
        let response = app
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn create_returns_201_and_get_returns_record() {
        let (_, app) = app();
        let sub = json!({ "name": "hk", "source": "remote", "url": "https://hk.example/sub", "ua": "clash" });

        let (status, body) = send(&app, Method::POST, "/api/subs", Some(sub.clone())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body, json!({ "status": "success", "data": sub }));

        let (status, body) = send(&app, Method::GET, "/api/sub/hk", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], sub);
    }

    #[tokio::test]
    async fn duplicate_create_is_plain_500_and_not_appended() {
        let (_, app) = app();
        let sub = json!({ "name": "hk", "source": "local" });
        send(&app, Method::POST, "/api/subs", Some(sub.clone())).await;

        let (status, body) = send(&app, Method::POST, "/api/subs", Some(sub)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["status"], "failed");
        assert!(body["message"].as_str().unwrap().contains("already exists"));

        let (_, body) = send(&app, Method::GET, "/api/subs", None).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn percent_encoded_names_are_decoded() {
        let (_, app) = app();
        send(&app, Method::POST, "/api/subs", Some(json!({ "name": "my sub/1", "source": "local" }))).await;

        let (status, body) = send(&app, Method::GET, "/api/sub/my%20sub%2F1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["name"], "my sub/1");
    }

    #[tokio::test]
    async fn get_missing_is_plain_404() {
        let (_, app) = app();
        let (status, body) = send(&app, Method::GET, "/api/sub/ghost", None).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["status"], "failed");
        assert!(body.get("error").is_none());
    }

    #[tokio::test]
    async fn patch_missing_is_plain_500() {
        let (_, app) = app();
        let (status, body) = send(&app, Method::PATCH, "/api/sub/ghost", Some(json!({ "url": "x" }))).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["message"].as_str().unwrap().contains("ghost"));
    }

    #[tokio::test]
    async fn patch_renames_and_rewrites_collections() {
        let (store, app) = app();
        store
            .write(COLLECTIONS_KEY, &vec![Collection::new("all", ["a", "b"])])
            .unwrap();
        send(&app, Method::POST, "/api/subs", Some(json!({ "name": "a", "source": "local", "tag": 1 }))).await;

        let (status, body) =
            send(&app, Method::PATCH, "/api/sub/a", Some(json!({ "name": "z", "note": "x" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["data"],
            json!({ "name": "z", "source": "local", "tag": 1, "note": "x" })
        );

        let (_, body) = send(&app, Method::GET, "/api/collection/all", None).await;
        assert_eq!(body["data"]["subscriptions"], json!(["z", "b"]));
    }

    #[tokio::test]
    async fn delete_is_idempotent_and_has_no_data() {
        let (store, app) = app();
        store
            .write(COLLECTIONS_KEY, &vec![Collection::new("all", ["a", "b"])])
            .unwrap();
        send(&app, Method::POST, "/api/subs", Some(json!({ "name": "a", "source": "local" }))).await;

        for _ in 0..2 {
            let (status, body) = send(&app, Method::DELETE, "/api/sub/a", None).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body, json!({ "status": "success" }));
        }

        let (_, body) = send(&app, Method::GET, "/api/collections", None).await;
        assert_eq!(body["data"][0]["subscriptions"], json!(["b"]));
    }

    #[tokio::test]
    async fn malformed_body_is_structured_400() {
        let (_, app) = app();
        let (status, body) = send(&app, Method::POST, "/api/subs", Some(json!({ "source": "local" }))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "INVALID_BODY");
        assert_eq!(body["error"]["type"], "RequestInvalidError");
    }

    #[tokio::test]
    async fn flow_endpoint_success_and_errors() {
        let flow = MockFlowFetcher::new().with_header("https://a", "upload=100;download=200;total=1000");
        let (_, app) = app_with(flow);
        send(&app, Method::POST, "/api/subs", Some(json!({ "name": "a", "url": "https://a" }))).await;
        send(&app, Method::POST, "/api/subs", Some(json!({ "name": "l", "source": "local", "url": "https://a" }))).await;
        send(&app, Method::POST, "/api/subs", Some(json!({ "name": "d", "url": "https://down" }))).await;

        let (status, body) = send(&app, Method::GET, "/api/sub/flow/a", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["data"],
            json!({ "total": 1000, "usage": { "upload": 100, "download": 200 } })
        );

        let (status, body) = send(&app, Method::GET, "/api/sub/flow/ghost", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "RESOURCE_NOT_FOUND");

        let (status, body) = send(&app, Method::GET, "/api/sub/flow/l", None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["code"], "NO_FLOW_INFO");
        assert_eq!(body["error"]["type"], "InternalServerError");

        let (status, body) = send(&app, Method::GET, "/api/sub/flow/d", None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["code"], "URL_NOT_ACCESSIBLE");
        assert_eq!(body["error"]["type"], "NetworkError");
    }
}
