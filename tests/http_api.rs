//! HTTP API tests, driven through the router without a socket.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use agridatum::address::Network;
use agridatum::attestation::AttestationService;
use agridatum::config::{AgriConfig, AnchoringConfig};
use agridatum::crypto::verify;
use agridatum::http::{build_router, AppState, X_REQUEST_ID};
use agridatum::record::canonicalize;
use agridatum::record::HarvestRecord;
use agridatum::store::{MemoryStore, RecordFilter, RecordStore};

mod common;
use common::{farmer_keypair, harvest_request, test_wallet, MockChainClient};

fn app(chain: Option<Arc<MockChainClient>>) -> Router {
    let mut service = AttestationService::new(Arc::new(MemoryStore::new()), Network::Testnet);
    if let Some(chain) = chain {
        service = service.with_chain(chain).with_wallet(test_wallet());
    }
    build_router(
        &AgriConfig::default(),
        AppState {
            service: Arc::new(service),
        },
    )
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_health() {
    let app = app(Some(Arc::new(MockChainClient::funded())));
    let response = app.clone().oneshot(get("/health")).await.unwrap();
    assert!(response.headers().contains_key(X_REQUEST_ID));

    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["blockchain"]["enabled"], true);
    assert_eq!(body["blockchain"]["network"], "testnet");
}

#[tokio::test]
async fn test_submit_then_verify() {
    let app = app(Some(Arc::new(MockChainClient::funded())));
    let keypair = farmer_keypair();
    let request = serde_json::to_value(harvest_request(&keypair, true)).unwrap();

    let (status, body) = send(&app, post("/api/harvest/submit", request)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["blockchain"]["submitted"], true);
    let tx = body["blockchain"]["transactionHash"].as_str().unwrap().to_string();
    assert_eq!(tx.len(), 64);
    assert_eq!(body["data"]["transactionId"], json!(tx));
    assert_eq!(body["data"]["cropType"], "maize");
    assert_eq!(body["data"]["indexedOnChain"], true);

    let (status, body) = send(&app, post("/api/harvest/verify", json!({ "transactionHash": tx }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["verification"]["signatureValid"], true);
    assert_eq!(body["verification"]["blockchainValid"], true);
    assert_eq!(body["verification"]["metadataMatches"], true);
    assert_eq!(body["metadata"]["agridatum"]["harvest"]["cropType"], "maize");
    assert_eq!(body["record"]["farmerId"], "farmer-001");
}

#[tokio::test]
async fn test_submit_without_chain_returns_created() {
    let app = app(None);
    let request = serde_json::to_value(harvest_request(&farmer_keypair(), true)).unwrap();

    let (status, body) = send(&app, post("/api/harvest/submit", request)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["blockchain"]["submitted"], false);
    assert_eq!(body["blockchain"]["transactionHash"], Value::Null);
    assert_eq!(body["data"]["indexedOnChain"], false);
}

#[tokio::test]
async fn test_submit_errors_map_to_status() {
    let app = app(None);

    let (status, body) = send(&app, post("/api/harvest/submit", json!({ "farmerId": "f1" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Validation failed");
    assert_eq!(body["details"].as_array().unwrap().len(), 6);

    let mut tampered = serde_json::to_value(harvest_request(&farmer_keypair(), true)).unwrap();
    tampered["cropType"] = json!("beans");
    let (status, body) = send(&app, post("/api/harvest/submit", tampered)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid signature");

    let malformed = Request::builder()
        .method("POST")
        .uri("/api/harvest/submit")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&app, malformed).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid request body");
}

#[tokio::test]
async fn test_verify_requires_target_and_404s() {
    let app = app(None);

    let (status, _) = send(&app, post("/api/harvest/verify", json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, post("/api/harvest/verify", json!({ "recordId": 42 }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Record not found");
}

#[tokio::test]
async fn test_listings_and_stats() {
    let app = app(None);
    let keypair = farmer_keypair();

    for (crop, weight, ts) in [
        ("maize", 10.0, "2024-03-01T08:00:00Z"),
        ("beans", 2.5, "2024-03-03T08:00:00Z"),
        ("maize", 7.25, "2024-03-02T08:00:00Z"),
    ] {
        let mut request = serde_json::to_value(harvest_request(&keypair, false)).unwrap();
        request["cropType"] = json!(crop);
        request["weightKg"] = json!(weight);
        request["timestamp"] = json!(ts);
        let (status, _) = send(&app, post("/api/harvest/submit", request)).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = send(&app, get("/api/harvest/records/farmer-001?limit=2")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total"], 3);
    assert_eq!(body["pagination"]["limit"], 2);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    assert_eq!(body["data"][0]["timestamp"], "2024-03-03T08:00:00Z");

    let (_, body) = send(&app, get("/api/harvest/records?cropType=maize&startDate=2024-03-02")).await;
    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(body["data"][0]["weightKg"], 7.25);

    let (status, _) = send(&app, get("/api/harvest/records?startDate=yesterday")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, get("/api/harvest/stats/farmer-001")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["totalRecords"], 3);
    assert_eq!(body["data"]["totalWeightKg"], 19.75);
    assert_eq!(body["data"]["cropTypes"], 2);
    assert_eq!(body["data"]["lastHarvest"], "2024-03-03T08:00:00Z");
}

#[tokio::test]
async fn test_generate_keys() {
    let app = app(None);

    let (status, body) = send(&app, post("/api/keys/generate", json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Validation failed");

    let harvest = json!({
        "farmerId": "f9",
        "phoneNumber": "+15550001111",
        "plotLocation": "North field",
        "cropType": "sorghum",
        "weightKg": 40,
        "timestamp": "2024-05-05T05:05:05Z"
    });
    let (status, body) = send(
        &app,
        post("/api/keys/generate", json!({ "seedInput": "agent-3", "harvestData": harvest })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["farmerId"].as_str().unwrap().len(), 16);
    assert!(body["farmerAddress"].as_str().unwrap().starts_with("farmer_test1"));
    assert!(body.get("privateKey").is_none());

    let record: HarvestRecord = serde_json::from_value(harvest).unwrap();
    assert!(verify(
        &canonicalize(&record),
        body["signature"].as_str().unwrap(),
        body["publicKey"].as_str().unwrap()
    ));

    let (_, body) = send(
        &app,
        post("/api/keys/generate", json!({ "seedInput": "agent-3", "includePrivateKey": true })),
    )
    .await;
    assert!(body["privateKey"].is_string());
}

#[tokio::test]
async fn test_wallet_endpoint() {
    let (status, _) = send(&app(None), get("/api/wallet")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (status, body) = send(&app(Some(Arc::new(MockChainClient::funded()))), get("/api/wallet")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["address"].as_str().unwrap().starts_with("addr_test1"));
}

#[tokio::test]
async fn test_submission_is_stored_after_request_timeout() {
    let chain = Arc::new(MockChainClient::funded().with_submit_delay(Duration::from_secs(3)));
    let store = Arc::new(MemoryStore::new());
    let service = AttestationService::new(store.clone(), Network::Testnet)
        .with_chain(chain.clone())
        .with_wallet(test_wallet())
        .with_anchoring(AnchoringConfig {
            enabled: true,
            timeout_secs: 10,
        });

    let mut config = AgriConfig::default();
    config.timeouts.request_secs = 1;
    let app = build_router(
        &config,
        AppState {
            service: Arc::new(service),
        },
    );

    let request = serde_json::to_value(harvest_request(&farmer_keypair(), true)).unwrap();
    let (status, _) = send(&app, post("/api/harvest/submit", request)).await;
    assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
    assert_eq!(chain.submit_calls(), 1);

    let mut page = store.list(&RecordFilter::default()).await.unwrap();
    for _ in 0..60 {
        if page.total > 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
        page = store.list(&RecordFilter::default()).await.unwrap();
    }

    assert_eq!(page.total, 1);
    let tx = page.items[0].transaction_id.clone().expect("stored with its transaction");
    assert!(chain.submitted(&tx).is_some());
    assert!(page.items[0].indexed_on_chain);
}
