//! HTTP endpoints.
//!
//! Every response carries a `network` block (chain info from the current
//! validator snapshot plus the staking constants) and a unix timestamp
//! `t`. Validation failures render through [`ApiError`] as an `error`
//! dict with a short machine code.
//!
//! | Endpoint | Method | Description |
//! |----------|--------|-------------|
//! | `/info` | GET | Network info and staking constants only |
//! | `/nodes/{wallet}` | GET | Nodes and contracts funded by a wallet |
//! | `/nodes/open` | GET | Contracts still open for contributions |
//! | `/nodes/liquidatable` | GET | Liquidatable validators |
//! | `/nodes/removable` | GET | Removable validators |
//! | `/store/{pubkey}` | GET/POST | Validate and store a registration |
//! | `/registrations/{id}` | GET | Stored registrations by pubkey or operator |
//! | `/validate` | GET | Full registration validation, nothing stored |

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tracing::info;

use portal_common::config::Config;
use portal_common::currency::parse_amount;
use portal_common::eth::{self, EthAddress, EthAddressError};
use portal_common::wallet::Wallet;
use portal_indexer::{canonical_wallet, SharedIndex};
use portal_registry::allocation::{self, AllocationError, StakeRequirement};
use portal_registry::material::ValidatorKeyMaterial;
use portal_registry::signature::{validate_key_material, Ed25519Backend};
use portal_store::{RegistrationStore, StoredRegistration};

use crate::error::{ApiError, ErrorContext};
use crate::params::{decode_bytes, parse_int_field, ParamError, QueryParams};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn RegistrationStore>,
    pub index: Arc<SharedIndex>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn RegistrationStore>, index: Arc<SharedIndex>) -> Self {
        Self { config: Arc::new(config), store, index }
    }

    fn requirement(&self) -> StakeRequirement {
        StakeRequirement {
            max_stake: self.config.staking.max_stake,
            max_stakers: self.config.staking.max_stakers,
        }
    }

    fn error_ctx(&self) -> ErrorContext {
        ErrorContext {
            token: self.config.token.clone(),
            decimals: self.config.staking.decimals,
            max_stake: self.config.staking.max_stake,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/info", get(network_info))
        .route("/nodes/open", get(open_nodes))
        .route("/nodes/liquidatable", get(liquidatable_nodes))
        .route("/nodes/removable", get(removable_nodes))
        .route("/nodes/:wallet", get(nodes_for_wallet))
        .route("/store/:pubkey", get(store_registration).post(store_registration))
        .route("/registrations/:id", get(load_registrations))
        .route("/validate", get(validate_registration))
        .with_state(state)
}

// ════════════════════════════════════════════════════════════════════════════
// RESPONSE ENVELOPE
// ════════════════════════════════════════════════════════════════════════════

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Wraps a response body with the `network` block and timestamp.
fn envelope(state: &AppState, mut body: Value) -> Json<Value> {
    let snapshot = state.index.validators();
    let mut network = serde_json::to_value(&snapshot.info).unwrap_or_else(|_| json!({}));
    network["staking_requirement"] = json!(state.config.staking.max_stake);
    network["min_operator_stake"] = json!(state.requirement().min_operator_stake());
    network["max_stakers"] = json!(state.config.staking.max_stakers);

    body["network"] = network;
    body["t"] = json!(unix_now());
    Json(body)
}

fn ok(state: &AppState, body: Value) -> Response {
    envelope(state, body).into_response()
}

fn fail(state: &AppState, err: ApiError) -> Response {
    envelope(state, json!({ "error": err.render(&state.error_ctx()) })).into_response()
}

fn not_found(state: &AppState) -> Response {
    (StatusCode::NOT_FOUND, envelope(state, json!({ "error": "not found" }))).into_response()
}

fn storage_failure(state: &AppState, e: impl std::fmt::Display) -> Response {
    tracing::error!("storage failure: {e}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        envelope(state, json!({ "error": "internal storage failure" })),
    )
        .into_response()
}

// ════════════════════════════════════════════════════════════════════════════
// SHARED DECODING
// ════════════════════════════════════════════════════════════════════════════

/// 64 hex digits into 32 raw bytes; anything else is a routing miss.
fn parse_hex64(text: &str) -> Option<[u8; 32]> {
    if text.len() != 64 || !text.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let mut out = [0u8; 32];
    hex::decode_to_slice(text, &mut out).ok()?;
    Some(out)
}

fn decode_eth(field: &str, value: &str) -> Result<EthAddress, ParamError> {
    eth::parse_address(value).map_err(|e| match e {
        EthAddressError::BadFormat(_) => ParamError::invalid(field, "not an ETH address"),
        EthAddressError::BadChecksum(_) => ParamError::invalid(field, "ETH address checksum failed"),
    })
}

/// Maps a query parse failure onto the error code the field belongs to.
fn map_param_error(e: ParamError) -> ApiError {
    let detail = e.to_string();
    let field = e.field().to_string();
    match &e {
        ParamError::Missing { .. } | ParamError::Unknown { .. } | ParamError::Multiple { .. } => {
            ApiError::BadRequest { field: Some(field), detail: Some(detail) }
        }
        ParamError::Invalid { .. } => {
            if field.starts_with("pubkey_") || field.starts_with("sig_") {
                ApiError::Signature { field: Some(field), detail: Some(detail) }
            } else {
                match field.as_str() {
                    "operator" => ApiError::InvalidOperatorAddress { detail: Some(detail) },
                    "stake" => ApiError::InvalidOperatorStake,
                    "contract" => ApiError::InvalidContractAddress { detail: None },
                    _ => ApiError::BadRequest { field: Some(field), detail: Some(detail) },
                }
            }
        }
    }
}

/// Decodes the common registration key-material fields. The primary
/// pubkey arrives separately (path for `/store`, query for `/validate`).
fn decode_material(
    primary_pubkey: Vec<u8>,
    params: &QueryParams,
) -> Result<ValidatorKeyMaterial, ParamError> {
    let secondary_pubkey = decode_bytes("pubkey_bls", params.one("pubkey_bls").unwrap_or(""), 64)?;
    let primary_signature = decode_bytes("sig_ed25519", params.one("sig_ed25519").unwrap_or(""), 64)?;
    let secondary_signature = decode_bytes("sig_bls", params.one("sig_bls").unwrap_or(""), 128)?;
    let operator = decode_eth("operator", params.one("operator").unwrap_or(""))?;
    let contract = params
        .one("contract")
        .map(|v| decode_eth("contract", v))
        .transpose()?;

    Ok(ValidatorKeyMaterial {
        primary_pubkey,
        secondary_pubkey,
        primary_signature,
        secondary_signature,
        operator: operator.to_vec(),
        contract: contract.map(|a| a.to_vec()),
    })
}

/// Checksummed rendering of a stored 20-byte address field.
fn checksum_bytes(bytes: &[u8]) -> String {
    match <EthAddress>::try_from(bytes) {
        Ok(addr) => eth::to_checksum(&addr),
        Err(_) => format!("0x{}", hex::encode(bytes)),
    }
}

fn material_json(material: &ValidatorKeyMaterial) -> Value {
    let mut out = json!({
        "type": material.kind().as_str(),
        "pubkey_ed25519": hex::encode(&material.primary_pubkey),
        "pubkey_bls": hex::encode(&material.secondary_pubkey),
        "sig_ed25519": hex::encode(&material.primary_signature),
        "sig_bls": hex::encode(&material.secondary_signature),
        "operator": checksum_bytes(&material.operator),
    });
    if let Some(contract) = &material.contract {
        out["contract"] = json!(checksum_bytes(contract));
    }
    out
}

fn registration_json(record: &StoredRegistration) -> Value {
    let mut out = material_json(&record.material);
    out["timestamp"] = json!(record.timestamp);
    out
}

// ════════════════════════════════════════════════════════════════════════════
// HANDLERS
// ════════════════════════════════════════════════════════════════════════════

/// Do-nothing endpoint returning just the envelope fields.
async fn network_info(State(state): State<AppState>) -> Response {
    ok(&state, json!({}))
}

async fn nodes_for_wallet(
    State(state): State<AppState>,
    Path(wallet): Path<String>,
) -> Response {
    let Some(wallet) = Wallet::parse(&wallet, state.config.network) else {
        return not_found(&state);
    };
    let canonical = wallet.canonical();

    let validators = state.index.validators();
    let mut sns = Vec::new();
    let mut nodes = Vec::new();
    for record in validators.validators_for_wallet(&canonical) {
        sns.push(serde_json::to_value(record).unwrap_or_else(|_| json!({})));

        let balance = record
            .chain
            .contributors
            .iter()
            .find(|c| canonical_wallet(&c.address) == canonical)
            .map(|c| c.amount)
            .unwrap_or(0);
        let node_state = if !record.chain.active && record.chain.funded {
            "Decommissioned"
        } else {
            "Running"
        };
        nodes.push(json!({
            "balance": balance,
            "contributors": record.chain.contributors,
            "last_uptime_proof": record.chain.last_uptime_proof,
            "operator_address": record.chain.operator_address,
            "operator_fee": record.chain.portions_for_operator,
            "requested_unlock_height": record.chain.requested_unlock_height,
            "service_node_pubkey": record.chain.pubkey_ed25519,
            "state": node_state,
        }));
    }

    let contracts_snapshot = state.index.contracts();
    let mut contracts = Vec::new();
    for record in contracts_snapshot.contracts_for_wallet(&canonical) {
        contracts.push(json!({
            "contract_address": record.address,
            "details": serde_json::to_value(record).unwrap_or_else(|_| json!({})),
        }));
        if record.finalized {
            continue;
        }
        let node_state = if record.cancelled { "Cancelled" } else { "Awaiting Contributors" };
        let balance = record
            .contributions
            .iter()
            .find(|c| c.address == canonical)
            .map(|c| c.amount)
            .unwrap_or(0);
        nodes.push(json!({
            "balance": balance,
            "contributors": record.contributions,
            "last_uptime_proof": 0,
            "operator_address": record.contributions.first().map(|c| c.address.clone()).unwrap_or_default(),
            "operator_fee": record.fee,
            "requested_unlock_height": 0,
            "service_node_pubkey": record.service_node_pubkey,
            "state": node_state,
        }));
    }

    ok(&state, json!({ "service_nodes": sns, "contracts": contracts, "nodes": nodes }))
}

async fn open_nodes(State(state): State<AppState>) -> Response {
    let snapshot = state.index.contracts();
    let nodes: Vec<Value> = snapshot
        .open_contracts()
        .into_iter()
        .map(|record| {
            let mut value = serde_json::to_value(record).unwrap_or_else(|_| json!({}));
            value["contract"] = json!(record.address);
            value
        })
        .collect();
    ok(&state, json!({ "nodes": nodes }))
}

async fn liquidatable_nodes(State(state): State<AppState>) -> Response {
    let snapshot = state.index.validators();
    let nodes: Vec<Value> = snapshot
        .validators
        .iter()
        .filter(|r| r.chain.is_liquidatable)
        .map(|r| serde_json::to_value(r).unwrap_or_else(|_| json!({})))
        .collect();
    ok(&state, json!({ "nodes": nodes }))
}

async fn removable_nodes(State(state): State<AppState>) -> Response {
    let snapshot = state.index.validators();
    let nodes: Vec<Value> = snapshot
        .validators
        .iter()
        .filter(|r| r.chain.is_removable)
        .map(|r| serde_json::to_value(r).unwrap_or_else(|_| json!({})))
        .collect();
    ok(&state, json!({ "nodes": nodes }))
}

/// Stores (or replaces) the pubkeys and signatures needed to submit a
/// node registration on-chain. With a `contract` parameter the record is
/// a multi-contributor contract registration, otherwise solo; one of
/// each may be stored per node pubkey.
async fn store_registration(
    State(state): State<AppState>,
    Path(pubkey): Path<String>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Response {
    let Some(primary) = parse_hex64(&pubkey) else {
        return not_found(&state);
    };

    let spec = &["pubkey_bls", "sig_ed25519", "sig_bls", "-contract", "operator"];
    let material = QueryParams::parse(&pairs, spec)
        .and_then(|params| decode_material(primary.to_vec(), &params));
    let material = match material {
        Ok(m) => m,
        Err(e) => return fail(&state, map_param_error(e)),
    };

    if let Err(e) = validate_key_material(
        &material,
        &Ed25519Backend,
        state.config.require_secondary_signature,
    ) {
        return fail(&state, ApiError::Signature { field: None, detail: Some(e.to_string()) });
    }

    if let Err(e) = state.store.upsert(&material, unix_now()) {
        return storage_failure(&state, e);
    }
    info!(
        pubkey = %hex::encode(primary),
        kind = material.kind().as_str(),
        "stored registration"
    );

    ok(&state, json!({ "success": true, "registration": material_json(&material) }))
}

/// Stored registrations for a node pubkey (404 when none) or, given an
/// operator wallet address, all of that operator's registrations with
/// already-active nodes suppressed.
async fn load_registrations(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    if let Some(pubkey) = parse_hex64(&id) {
        let records = match state.store.load_by_pubkey(&pubkey) {
            Ok(r) => r,
            Err(e) => return storage_failure(&state, e),
        };
        if records.is_empty() {
            return not_found(&state);
        }
        let regs: Vec<Value> = records.iter().map(registration_json).collect();
        return ok(&state, json!({ "registrations": regs }));
    }

    let Ok(operator) = eth::parse_address(&id) else {
        return not_found(&state);
    };
    let records = match state.store.load_by_operator(&operator) {
        Ok(r) => r,
        Err(e) => return storage_failure(&state, e),
    };

    let snapshot = state.index.validators();
    let regs: Vec<Value> = records
        .iter()
        .filter(|r| !snapshot.is_active_pubkey(&hex::encode(&r.material.primary_pubkey)))
        .map(registration_json)
        .collect();
    ok(&state, json!({ "registrations": regs }))
}

/// Validates a full registration (keys, signatures, fee, stakes and
/// reserved spots) without storing anything.
async fn validate_registration(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Response {
    let spec = &[
        "pubkey_ed25519",
        "pubkey_bls",
        "sig_ed25519",
        "sig_bls",
        "-contract",
        "operator",
        "stake",
        "-res_addr[]",
        "-res_stake[]",
        "-fee",
    ];
    let params = match QueryParams::parse(&pairs, spec) {
        Ok(p) => p,
        Err(e) => return fail(&state, map_param_error(e)),
    };

    let decoded = decode_bytes("pubkey_ed25519", params.one("pubkey_ed25519").unwrap_or(""), 32)
        .and_then(|primary| decode_material(primary, &params));
    let material = match decoded {
        Ok(m) => m,
        Err(e) => return fail(&state, map_param_error(e)),
    };

    let decimals = state.config.staking.decimals;
    let operator_stake = match params
        .one("stake")
        .ok_or(())
        .and_then(|v| parse_amount(v, decimals).map_err(|_| ()))
    {
        Ok(v) => v,
        Err(()) => return fail(&state, ApiError::InvalidOperatorStake),
    };

    if let Err(e) = validate_key_material(
        &material,
        &Ed25519Backend,
        state.config.require_secondary_signature,
    ) {
        return fail(&state, ApiError::Signature { field: None, detail: Some(e.to_string()) });
    }

    let solo = material.contract.is_none();

    if solo && !params.many("res_addr").is_empty() {
        return fail(
            &state,
            ApiError::InvalidContractAddress {
                detail: Some(
                    "the contract address is required for multi-contributor registrations"
                        .to_string(),
                ),
            },
        );
    }

    if solo {
        if params.contains("fee") {
            return fail(
                &state,
                ApiError::InvalidFee {
                    detail: Some("fee is not applicable to a solo node registration".to_string()),
                },
            );
        }
    } else {
        match params.one("fee") {
            None => {
                return fail(
                    &state,
                    ApiError::InvalidFee {
                        detail: Some(
                            "fee is required for a multi-contribution registration".to_string(),
                        ),
                    },
                )
            }
            Some(fee) => {
                if parse_int_field("fee", fee, 0, 10000).is_err() {
                    return fail(
                        &state,
                        ApiError::InvalidFee {
                            detail: Some(
                                "fee must be an integer between 0 and 10000 (= 100.00%)"
                                    .to_string(),
                            ),
                        },
                    );
                }
            }
        }
    }

    let res_addrs = params.many("res_addr");
    let res_stakes = params.many("res_stake");
    if res_addrs.len() != res_stakes.len() {
        return fail(
            &state,
            ApiError::BadRequest {
                field: Some("res_addr".to_string()),
                detail: Some("mismatched reserved address/stake lists".to_string()),
            },
        );
    }

    let mut reserved_wallets = Vec::with_capacity(res_addrs.len());
    let mut reserved_stakes = Vec::with_capacity(res_addrs.len());
    for (i, (addr, stake)) in res_addrs.iter().zip(res_stakes).enumerate() {
        let wallet = match eth::parse_address(addr) {
            Ok(w) => w,
            Err(_) => {
                return fail(
                    &state,
                    ApiError::InvalidReservedAddress { index: i + 1, address: addr.clone() },
                )
            }
        };
        let amount = match parse_amount(stake, decimals) {
            Ok(a) => a,
            Err(_) => {
                return fail(
                    &state,
                    ApiError::InvalidReservedStake {
                        index: i + 1,
                        address: eth::to_checksum(&wallet),
                    },
                )
            }
        };
        reserved_wallets.push(wallet);
        reserved_stakes.push(amount);
    }

    let report = match allocation::validate_registration(
        operator_stake,
        &reserved_stakes,
        solo,
        &state.requirement(),
    ) {
        Ok(report) => report,
        Err(e) => {
            let api_err = match e {
                AllocationError::WrongTotal { total, required } => {
                    ApiError::WrongOperatorStake { stake: total, required }
                }
                AllocationError::InsufficientOperatorStake { amount, minimum } => {
                    ApiError::InsufficientOperatorStake { stake: amount, minimum }
                }
                AllocationError::TotalTooLarge { total, maximum } => {
                    ApiError::TooMuch { total, maximum }
                }
                AllocationError::TooManyStakers { max, .. } => {
                    ApiError::TooMany { max_contributors: max - 1 }
                }
                AllocationError::DeficitAtIndex { index, minimum, .. } => {
                    ApiError::InsufficientReservedStake {
                        index: index + 1,
                        address: eth::to_checksum(&reserved_wallets[index]),
                        minimum,
                    }
                }
                other => ApiError::BadRequest { field: None, detail: Some(other.to_string()) },
            };
            return fail(&state, api_err);
        }
    };

    let mut body = json!({ "success": true, "sig_secondary_verified": false });
    if let Some(remaining) = report.remaining {
        body["remaining_contribution"] = json!(remaining.stake);
        body["remaining_spots"] = json!(remaining.spots);
        body["remaining_min_contribution"] = json!(remaining.min_contribution);
    }
    ok(&state, body)
}
