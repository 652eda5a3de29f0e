//! End-to-end tests: the real router over a JSON file store, talking to a
//! local mock subscription provider over HTTP.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{http::HeaderMap, routing::get, Router};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::net::TcpListener;

use sub_store::api::{create_router, AppState};
use sub_store::config::Config;
use sub_store::store::{JsonFileStore, KvStoreExt, COLLECTIONS_KEY, SUBS_KEY};
use sub_store::subscription::{
    Collection, FlowFetcher, HttpFlowFetcher, Subscription, SubscriptionService,
};

/// Serve `router` on an ephemeral local port.
async fn spawn(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// Mock provider: `/full` and `/noexpire` carry a flow header, `/plain` does
/// not, `/gone` answers 404.
async fn spawn_provider() -> SocketAddr {
    let with_header = |value: &'static str| {
        move || async move {
            let mut headers = HeaderMap::new();
            headers.insert("subscription-userinfo", value.parse().unwrap());
            (headers, "proxies: []")
        }
    };

    let router = Router::new()
        .route(
            "/full",
            get(with_header("upload=100; download=200; total=1000; expire=1700000000")),
        )
        .route("/noexpire", get(with_header("upload=1; download=2; total=3")))
        .route("/plain", get(|| async { "proxies: []" }))
        .route(
            "/gone",
            get(|| async { (axum::http::StatusCode::NOT_FOUND, "gone") }),
        );

    spawn(router).await
}

fn test_config(dir: &TempDir) -> Config {
    Config {
        data_path: dir.path().join("sub-store.json"),
        flow_timeout_ms: 2_000,
        ..Config::default()
    }
}

#[tokio::test]
async fn http_fetcher_reads_flow_header() {
    let provider = spawn_provider().await;
    let fetcher = HttpFlowFetcher::new(&Config::default()).unwrap();

    let header = fetcher
        .fetch_flow_headers(&format!("http://{provider}/full"))
        .await
        .unwrap();
    assert_eq!(
        header.as_deref(),
        Some("upload=100; download=200; total=1000; expire=1700000000")
    );

    let none = fetcher
        .fetch_flow_headers(&format!("http://{provider}/plain"))
        .await
        .unwrap();
    assert_eq!(none, None);

    assert!(fetcher
        .fetch_flow_headers(&format!("http://{provider}/gone"))
        .await
        .is_err());
}

#[tokio::test]
async fn full_lifecycle_over_http() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    let provider = spawn_provider().await;

    let service = Arc::new(SubscriptionService::from_config(&config).unwrap());
    let server = spawn(create_router(AppState::new(service))).await;
    let base = format!("http://{server}");
    let client = reqwest::Client::new();

    // Create
    let sub = json!({ "name": "hk", "url": format!("http://{provider}/full"), "ua": "clash" });
    let res = client.post(format!("{base}/api/subs")).json(&sub).send().await.unwrap();
    assert_eq!(res.status(), 201);

    let res = client.post(format!("{base}/api/subs")).json(&sub).send().await.unwrap();
    assert_eq!(res.status(), 500);

    let list: Value = client.get(format!("{base}/api/subs")).send().await.unwrap().json().await.unwrap();
    assert_eq!(list["data"].as_array().unwrap().len(), 1);
    assert_eq!(list["data"][0], sub);

    // Flow
    let flow: Value = client
        .get(format!("{base}/api/sub/flow/hk"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(
        flow,
        json!({
            "status": "success",
            "data": { "expires": 1700000000, "total": 1000, "usage": { "upload": 100, "download": 200 } }
        })
    );

    // Persisted on disk as a whole list under the subscriptions key.
    let on_disk: Value =
        serde_json::from_str(&std::fs::read_to_string(&config.data_path).unwrap()).unwrap();
    assert_eq!(on_disk[SUBS_KEY][0]["name"], "hk");
    assert_eq!(on_disk[COLLECTIONS_KEY], json!([]));

    // Delete twice
    for _ in 0..2 {
        let res = client.delete(format!("{base}/api/sub/hk")).send().await.unwrap();
        assert_eq!(res.status(), 200);
    }
    let res = client.get(format!("{base}/api/sub/hk")).send().await.unwrap();
    assert_eq!(res.status(), 404);
}

#[tokio::test]
async fn rename_and_delete_cascade_survive_restart() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);

    {
        let store = JsonFileStore::open(&config.data_path).unwrap();
        store
            .write(
                SUBS_KEY,
                &vec![Subscription::local("a"), Subscription::local("b")],
            )
            .unwrap();
        store
            .write(
                COLLECTIONS_KEY,
                &vec![
                    Collection::new("mix", ["a", "b"]),
                    Collection::new("solo", ["b"]),
                ],
            )
            .unwrap();
    }

    {
        let service = SubscriptionService::from_config(&config).unwrap();
        let patch = serde_json::from_value(json!({ "name": "renamed" })).unwrap();
        service.update("a", patch).await.unwrap();
        service.delete("b").await.unwrap();
    }

    let service = SubscriptionService::from_config(&config).unwrap();
    let names: Vec<_> = service.list().unwrap().into_iter().map(|s| s.name).collect();
    assert_eq!(names, vec!["renamed"]);

    let cols = service.list_collections().unwrap();
    assert_eq!(cols[0].subscriptions, vec!["renamed"]);
    assert!(cols[1].subscriptions.is_empty());
}

#[tokio::test]
async fn flow_errors_over_http() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    let provider = spawn_provider().await;

    let service = Arc::new(SubscriptionService::from_config(&config).unwrap());
    for (name, path) in [("plain", "plain"), ("gone", "gone"), ("noexp", "noexpire")] {
        service
            .create(Subscription::remote(name, format!("http://{provider}/{path}")))
            .await
            .unwrap();
    }
    let server = spawn(create_router(AppState::new(service))).await;
    let client = reqwest::Client::new();

    let get = |name: &'static str| {
        let client = client.clone();
        async move {
            let res = client
                .get(format!("http://{server}/api/sub/flow/{name}"))
                .send()
                .await
                .unwrap();
            let status = res.status().as_u16();
            (status, res.json::<Value>().await.unwrap())
        }
    };

    let (status, body) = get("noexp").await;
    assert_eq!(status, 200);
    assert_eq!(body["data"], json!({ "total": 3, "usage": { "upload": 1, "download": 2 } }));

    let (status, body) = get("plain").await;
    assert_eq!(status, 500);
    assert_eq!(body["error"]["code"], "NO_FLOW_INFO");

    let (status, body) = get("gone").await;
    assert_eq!(status, 500);
    assert_eq!(body["error"]["code"], "URL_NOT_ACCESSIBLE");

    let (status, body) = get("missing").await;
    assert_eq!(status, 404);
    assert_eq!(body["error"]["code"], "RESOURCE_NOT_FOUND");
}
