//! End-to-end endpoint tests over an in-memory store and hand-published
//! snapshots, exercising the full router without a network socket.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::util::ServiceExt;

use portal_api::{router, AppState};
use portal_common::config::Config;
use portal_common::crypto;
use portal_indexer::{
    canonical_wallet, ChainInfo, ChainValidator, SharedIndex, ValidatorIndex, ValidatorRecord,
};
use portal_store::MemoryStore;

const OPERATOR: &str = "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed";
const CONTRACT: &str = "0xfb6916095ca1df60bb79ce92ce3ea74c37c5d359";

struct Harness {
    app: Router,
    index: Arc<SharedIndex>,
}

fn harness() -> Harness {
    let index = Arc::new(SharedIndex::new());
    let state = AppState::new(Config::default(), Arc::new(MemoryStore::new()), index.clone());
    Harness { app: router(state), index }
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

/// A correctly signed registration, returned as (pubkey hex, query tail).
fn signed_registration_query(contract: Option<&str>) -> (String, String) {
    let kp = crypto::generate_keypair_bytes();
    let pubkey = crypto::public_key_from_keypair_bytes(&kp).unwrap();
    let pubkey_bls = vec![0xbb; 64];

    let mut message = pubkey.to_vec();
    message.extend_from_slice(&pubkey_bls);
    let sig = crypto::sign_message(&kp, &message).unwrap();

    let mut query = format!(
        "pubkey_bls={}&sig_ed25519={}&sig_bls={}&operator={}",
        hex::encode(&pubkey_bls),
        hex::encode(&sig),
        "cc".repeat(128),
        OPERATOR,
    );
    if let Some(contract) = contract {
        query.push_str(&format!("&contract={contract}"));
    }
    (hex::encode(pubkey), query)
}

fn publish_active_validator(index: &SharedIndex, pubkey_hex: &str, active: bool) {
    let chain = ChainValidator {
        service_node_pubkey: pubkey_hex.to_string(),
        pubkey_ed25519: pubkey_hex.to_string(),
        bls_key: String::new(),
        active,
        funded: true,
        earned_downtime_blocks: 0,
        staking_requirement: 100,
        total_contributed: 100,
        total_reserved: 100,
        portions_for_operator: 0,
        operator_address: OPERATOR.to_string(),
        requested_unlock_height: 0,
        last_uptime_proof: 0,
        state_height: 0,
        swarm_id: 0,
        is_removable: false,
        is_liquidatable: true,
        contributors: vec![],
    };
    let seq = index.begin_cycle();
    index.publish_validators(ValidatorIndex::build(
        seq,
        ChainInfo { height: 1234, nettype: "mainnet".to_string(), ..Default::default() },
        vec![ValidatorRecord::derive(chain, 1234)],
        canonical_wallet,
    ));
}

#[tokio::test]
async fn test_info_envelope() {
    let h = harness();
    let (status, body) = get(&h.app, "/info").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["network"]["staking_requirement"], 120_000_000_000_000u64);
    assert_eq!(body["network"]["min_operator_stake"], 30_000_000_000_000u64);
    assert_eq!(body["network"]["max_stakers"], 10);
    assert!(body["t"].as_u64().is_some());
}

#[tokio::test]
async fn test_store_and_load_registration() {
    let h = harness();
    let (pubkey, query) = signed_registration_query(None);

    let (status, body) = get(&h.app, &format!("/store/{pubkey}?{query}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["registration"]["type"], "solo");
    assert_eq!(body["registration"]["operator"], "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed");

    let (status, body) = get(&h.app, &format!("/registrations/{pubkey}")).await;
    assert_eq!(status, StatusCode::OK);
    let regs = body["registrations"].as_array().unwrap();
    assert_eq!(regs.len(), 1);
    assert_eq!(regs[0]["pubkey_ed25519"], pubkey);
}

#[tokio::test]
async fn test_store_keeps_one_solo_and_one_contract() {
    let h = harness();
    let (pubkey, solo_query) = signed_registration_query(None);

    let (_, body) = get(&h.app, &format!("/store/{pubkey}?{solo_query}")).await;
    assert_eq!(body["success"], true);
    let (_, body) = get(&h.app, &format!("/store/{pubkey}?{solo_query}&contract={CONTRACT}")).await;
    assert_eq!(body["success"], true);

    let (_, body) = get(&h.app, &format!("/registrations/{pubkey}")).await;
    assert_eq!(body["registrations"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_store_rejects_bad_signature() {
    let h = harness();
    let (pubkey, query) = signed_registration_query(None);
    // flip one hex digit of sig_ed25519
    let idx = query.find("sig_ed25519=").unwrap() + "sig_ed25519=".len();
    let mut chars: Vec<char> = query.chars().collect();
    chars[idx] = if chars[idx] == '0' { '1' } else { '0' };
    let broken: String = chars.into_iter().collect();

    let (_, body) = get(&h.app, &format!("/store/{pubkey}?{broken}")).await;
    assert_eq!(body["error"]["code"], "signature");
}

#[tokio::test]
async fn test_unknown_registration_is_404() {
    let h = harness();
    let (status, _) = get(&h.app, &format!("/registrations/{}", "ab".repeat(32))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_operator_listing_suppresses_active_nodes() {
    let h = harness();
    let (pubkey, query) = signed_registration_query(None);
    get(&h.app, &format!("/store/{pubkey}?{query}")).await;

    let (_, body) = get(&h.app, &format!("/registrations/{OPERATOR}")).await;
    assert_eq!(body["registrations"].as_array().unwrap().len(), 1);

    // once the node shows up active on chain, the listing drops it
    publish_active_validator(&h.index, &pubkey, true);
    let (_, body) = get(&h.app, &format!("/registrations/{OPERATOR}")).await;
    assert_eq!(body["registrations"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_validate_solo_success() {
    let h = harness();
    let (pubkey, query) = signed_registration_query(None);
    let uri = format!("/validate?pubkey_ed25519={pubkey}&{query}&stake=120000");

    let (_, body) = get(&h.app, &uri).await;
    assert_eq!(body["success"], true, "unexpected response: {body}");
    assert_eq!(body["sig_secondary_verified"], false);
    assert!(body.get("remaining_contribution").is_none());
}

#[tokio::test]
async fn test_validate_solo_wrong_stake() {
    let h = harness();
    let (pubkey, query) = signed_registration_query(None);
    let uri = format!("/validate?pubkey_ed25519={pubkey}&{query}&stake=119999");

    let (_, body) = get(&h.app, &uri).await;
    assert_eq!(body["error"]["code"], "wrong_op_stake");
    assert_eq!(
        body["error"]["error"],
        "Invalid operator stake: exactly 120000 SNT is required for a solo node"
    );
}

#[tokio::test]
async fn test_validate_solo_rejects_fee() {
    let h = harness();
    let (pubkey, query) = signed_registration_query(None);
    let uri = format!("/validate?pubkey_ed25519={pubkey}&{query}&stake=120000&fee=100");

    let (_, body) = get(&h.app, &uri).await;
    assert_eq!(body["error"]["code"], "invalid_fee");
}

#[tokio::test]
async fn test_validate_multi_requires_fee() {
    let h = harness();
    let (pubkey, query) = signed_registration_query(Some(CONTRACT));
    let uri = format!("/validate?pubkey_ed25519={pubkey}&{query}&stake=30000");

    let (_, body) = get(&h.app, &uri).await;
    assert_eq!(body["error"]["code"], "invalid_fee");
    assert_eq!(
        body["error"]["detail"],
        "fee is required for a multi-contribution registration"
    );
}

#[tokio::test]
async fn test_validate_multi_with_reserved() {
    let h = harness();
    let (pubkey, query) = signed_registration_query(Some(CONTRACT));

    // operator at exactly a quarter, one reserved slot at the ceiling share
    let uri = format!(
        "/validate?pubkey_ed25519={pubkey}&{query}&stake=30000&fee=1000&res_addr={OPERATOR}&res_stake=10000"
    );
    let (_, body) = get(&h.app, &uri).await;
    assert_eq!(body["success"], true, "unexpected response: {body}");
    assert_eq!(body["remaining_contribution"], 80_000_000_000_000u64);
    assert_eq!(body["remaining_spots"], 8);
    assert_eq!(body["remaining_min_contribution"], 10_000_000_000_000u64);

    // one atomic unit below the reserved minimum
    let uri = format!(
        "/validate?pubkey_ed25519={pubkey}&{query}&stake=30000&fee=1000&res_addr={OPERATOR}&res_stake=9999.999999999"
    );
    let (_, body) = get(&h.app, &uri).await;
    assert_eq!(body["error"]["code"], "insufficient_res_stake");
    assert_eq!(body["error"]["index"], 1);
}

#[tokio::test]
async fn test_validate_multi_operator_minimum() {
    let h = harness();
    let (pubkey, query) = signed_registration_query(Some(CONTRACT));
    let uri = format!("/validate?pubkey_ed25519={pubkey}&{query}&stake=29999.999999999&fee=0");

    let (_, body) = get(&h.app, &uri).await;
    assert_eq!(body["error"]["code"], "insufficient_op_stake");
    assert_eq!(body["error"]["minimum"], 30_000_000_000_000u64);
}

#[tokio::test]
async fn test_validate_unknown_param() {
    let h = harness();
    let (pubkey, query) = signed_registration_query(None);
    let uri = format!("/validate?pubkey_ed25519={pubkey}&{query}&stake=120000&bogus=1");

    let (_, body) = get(&h.app, &uri).await;
    assert_eq!(body["error"]["code"], "bad_request");
    assert_eq!(body["error"]["field"], "bogus");
}

#[tokio::test]
async fn test_liquidatable_listing_from_snapshot() {
    let h = harness();
    let (status, body) = get(&h.app, "/nodes/liquidatable").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["nodes"].as_array().unwrap().len(), 0);

    publish_active_validator(&h.index, &"ab".repeat(32), true);
    let (_, body) = get(&h.app, "/nodes/liquidatable").await;
    assert_eq!(body["nodes"].as_array().unwrap().len(), 1);
    assert_eq!(body["network"]["height"], 1234);
}
