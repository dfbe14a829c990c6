//! Blockfrost client tests against programmable HTTP backends.

use serde_json::json;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use agridatum::chain::{BlockfrostClient, ChainClient, ChainError};
use agridatum::config::ChainConfig;

mod common;

fn config(primary: SocketAddr, failovers: &[SocketAddr]) -> ChainConfig {
    ChainConfig {
        enabled: true,
        project_id: "preprodTestProject".into(),
        base_url: Some(format!("http://{}/api/v0", primary)),
        failover_urls: failovers.iter().map(|a| format!("http://{}/api/v0", a)).collect(),
        request_timeout_secs: 2,
        lookup_attempts: 3,
        backoff_base_ms: 10,
        backoff_max_ms: 50,
        ..ChainConfig::default()
    }
}

fn utxo_json(i: usize) -> serde_json::Value {
    json!({
        "tx_hash": format!("{:064x}", i),
        "tx_index": 0,
        "amount": [{ "unit": "lovelace", "quantity": "2000000" }]
    })
}

#[tokio::test]
async fn test_lookup_retries_transient_errors() {
    let hits = Arc::new(AtomicU32::new(0));
    let h = hits.clone();
    let addr = common::start_programmable_backend(move |_method, _path| {
        let h = h.clone();
        async move {
            if h.fetch_add(1, Ordering::SeqCst) < 2 {
                (503, r#"{"error":"Service Unavailable"}"#.to_string())
            } else {
                (200, json!({ "min_fee_a": 44, "min_fee_b": 155381, "max_tx_size": 16384, "coins_per_utxo_size": "4310" }).to_string())
            }
        }
    })
    .await;

    let client = BlockfrostClient::new(&config(addr, &[])).unwrap();
    let params = client.fetch_protocol_parameters().await.unwrap();
    assert_eq!(params.min_fee_a, 44);
    assert_eq!(params.coins_per_utxo_byte, 4310);
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_client_errors_are_not_retried() {
    let hits = Arc::new(AtomicU32::new(0));
    let h = hits.clone();
    let addr = common::start_programmable_backend(move |_method, _path| {
        h.fetch_add(1, Ordering::SeqCst);
        async { (400, r#"{"message":"Invalid address"}"#.to_string()) }
    })
    .await;

    let client = BlockfrostClient::new(&config(addr, &[])).unwrap();
    match client.list_utxos("addr_test1bad").await {
        Err(ChainError::Status { status, message }) => {
            assert_eq!(status, 400);
            assert_eq!(message, "Invalid address");
        }
        other => panic!("expected status error, got {:?}", other),
    }
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_lookup_fails_over_to_next_endpoint() {
    let primary = common::start_programmable_backend(|_m, _p| async {
        (500, r#"{"error":"Internal Server Error"}"#.to_string())
    })
    .await;
    let secondary = common::start_programmable_backend(|_m, _p| async {
        (200, json!([utxo_json(1)]).to_string())
    })
    .await;

    let mut cfg = config(primary, &[secondary]);
    cfg.lookup_attempts = 1;
    let client = BlockfrostClient::new(&cfg).unwrap();

    let utxos = client.list_utxos("addr_test1abc").await.unwrap();
    assert_eq!(utxos.len(), 1);
    assert_eq!(utxos[0].amount, 2_000_000);
}

#[tokio::test]
async fn test_not_found_is_data() {
    let addr = common::start_programmable_backend(|_m, _p| async {
        (404, r#"{"status_code":404,"error":"Not Found"}"#.to_string())
    })
    .await;
    let client = BlockfrostClient::new(&config(addr, &[])).unwrap();

    assert!(client.list_utxos("addr_test1new").await.unwrap().is_empty());
    let tx = "ab".repeat(32);
    assert!(!client.get_transaction_status(&tx).await.unwrap().confirmed);
    assert!(client.get_transaction_metadata(&tx, 721).await.unwrap().is_none());
}

#[tokio::test]
async fn test_utxo_listing_pages() {
    let addr = common::start_programmable_backend(|_m, path| async move {
        let body = if path.ends_with("page=1") {
            json!((0..100).map(utxo_json).collect::<Vec<_>>())
        } else if path.ends_with("page=2") {
            json!([utxo_json(100)])
        } else {
            json!([])
        };
        (200, body.to_string())
    })
    .await;
    let client = BlockfrostClient::new(&config(addr, &[])).unwrap();

    let utxos = client.list_utxos("addr_test1rich").await.unwrap();
    assert_eq!(utxos.len(), 101);
}

#[tokio::test]
async fn test_status_and_metadata_lookup() {
    let addr = common::start_programmable_backend(|_m, path| async move {
        if path.ends_with("/metadata") {
            let body = json!([
                { "label": "674", "json_metadata": { "msg": ["hello"] } },
                { "label": "721", "json_metadata": { "agridatum": { "harvest": { "cropType": "maize" } } } }
            ]);
            (200, body.to_string())
        } else {
            (200, json!({ "hash": "ab", "block": "blockhash", "block_height": 42 }).to_string())
        }
    })
    .await;
    let client = BlockfrostClient::new(&config(addr, &[])).unwrap();
    let tx = "ab".repeat(32);

    let status = client.get_transaction_status(&tx).await.unwrap();
    assert!(status.confirmed);
    assert_eq!(status.block_height, Some(42));

    let metadata = client.get_transaction_metadata(&tx, 721).await.unwrap().unwrap();
    assert_eq!(metadata["agridatum"]["harvest"]["cropType"], "maize");
    assert!(client.get_transaction_metadata(&tx, 1).await.unwrap().is_none());
}

#[tokio::test]
async fn test_submit_is_attempted_once() {
    let primary_hits = Arc::new(AtomicU32::new(0));
    let secondary_hits = Arc::new(AtomicU32::new(0));

    let p = primary_hits.clone();
    let primary = common::start_programmable_backend(move |_m, _p| {
        p.fetch_add(1, Ordering::SeqCst);
        async { (500, r#"{"message":"node overloaded"}"#.to_string()) }
    })
    .await;
    let s = secondary_hits.clone();
    let secondary = common::start_programmable_backend(move |_m, _p| {
        s.fetch_add(1, Ordering::SeqCst);
        async { (200, format!("\"{}\"", "cd".repeat(32))) }
    })
    .await;

    let client = BlockfrostClient::new(&config(primary, &[secondary])).unwrap();
    let result = client.submit("84a40081825820").await;

    assert!(matches!(result, Err(ChainError::Submission(_))));
    assert_eq!(primary_hits.load(Ordering::SeqCst), 1);
    assert_eq!(secondary_hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_submit_returns_reported_id() {
    let addr = common::start_programmable_backend(|method, path| async move {
        assert_eq!(method, "POST");
        assert!(path.ends_with("/tx/submit"));
        (200, format!("\"{}\"", "cd".repeat(32)))
    })
    .await;
    let client = BlockfrostClient::new(&config(addr, &[])).unwrap();

    assert_eq!(client.submit("84a0").await.unwrap(), "cd".repeat(32));
    assert!(matches!(client.submit("zz").await, Err(ChainError::Submission(_))));
}
