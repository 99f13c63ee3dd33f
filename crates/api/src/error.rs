//! Client-facing error codes.
//!
//! Every registration-validation failure renders as a dict of the form
//! `{"code": "...", "error": "English text", ...extras}` so clients can
//! branch on the short code and show the text. Amounts inside the text
//! go through the currency codec; raw atomic values ride along as
//! structured extras.

use serde_json::{json, Value};

use portal_common::currency::{format_amount, AtomicAmount};

/// What the formatting layer needs to render amounts.
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub token: String,
    pub decimals: u32,
    pub max_stake: AtomicAmount,
}

/// Closed set of validation failures the API can report.
///
/// `index` fields are 1-based here: they count contributors the way the
/// texts present them, not list positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    BadRequest { field: Option<String>, detail: Option<String> },
    InvalidOperatorAddress { detail: Option<String> },
    InvalidOperatorStake,
    WrongOperatorStake { stake: AtomicAmount, required: AtomicAmount },
    InsufficientOperatorStake { stake: AtomicAmount, minimum: AtomicAmount },
    InvalidContractAddress { detail: Option<String> },
    InvalidReservedAddress { index: usize, address: String },
    InvalidReservedStake { index: usize, address: String },
    InsufficientReservedStake { index: usize, address: String, minimum: AtomicAmount },
    TooMuch { total: AtomicAmount, maximum: AtomicAmount },
    TooMany { max_contributors: usize },
    InvalidFee { detail: Option<String> },
    Signature { field: Option<String>, detail: Option<String> },
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest { .. } => "bad_request",
            ApiError::InvalidOperatorAddress { .. } => "invalid_op_addr",
            ApiError::InvalidOperatorStake => "invalid_op_stake",
            ApiError::WrongOperatorStake { .. } => "wrong_op_stake",
            ApiError::InsufficientOperatorStake { .. } => "insufficient_op_stake",
            ApiError::InvalidContractAddress { .. } => "invalid_contract_addr",
            ApiError::InvalidReservedAddress { .. } => "invalid_res_addr",
            ApiError::InvalidReservedStake { .. } => "invalid_res_stake",
            ApiError::InsufficientReservedStake { .. } => "insufficient_res_stake",
            ApiError::TooMuch { .. } => "too_much",
            ApiError::TooMany { .. } => "too_many",
            ApiError::InvalidFee { .. } => "invalid_fee",
            ApiError::Signature { .. } => "signature",
        }
    }

    /// Renders the `{"code", "error", ...}` dict.
    pub fn render(&self, ctx: &ErrorContext) -> Value {
        let amt = |units: AtomicAmount| format_amount(units, ctx.decimals);
        let mut detail: Option<&str> = None;

        let (message, mut extras) = match self {
            ApiError::BadRequest { field, detail: d } => {
                detail = d.as_deref();
                let mut extras = json!({});
                if let Some(field) = field {
                    extras["field"] = json!(field);
                }
                ("Invalid request parameters".to_string(), extras)
            }
            ApiError::InvalidOperatorAddress { detail: d } => {
                detail = d.as_deref();
                ("Invalid operator address".to_string(), json!({}))
            }
            ApiError::InvalidOperatorStake => {
                ("Invalid/unparseable operator stake".to_string(), json!({}))
            }
            ApiError::WrongOperatorStake { stake, required } => (
                format!(
                    "Invalid operator stake: exactly {} {} is required for a solo node",
                    amt(*required),
                    ctx.token
                ),
                json!({ "stake": stake, "required": required }),
            ),
            ApiError::InsufficientOperatorStake { stake, minimum } => {
                let percent = minimum * 100 / ctx.max_stake;
                (
                    format!(
                        "Insufficient operator stake: at least {} ({}%) is required",
                        amt(*minimum),
                        percent
                    ),
                    json!({ "stake": stake, "minimum": minimum }),
                )
            }
            ApiError::InvalidContractAddress { detail: d } => {
                detail = d.as_deref();
                ("Invalid contract address".to_string(), json!({}))
            }
            ApiError::InvalidReservedAddress { index, address } => (
                format!("Invalid reserved contributor address {index}: {address}"),
                json!({ "index": index, "address": address }),
            ),
            ApiError::InvalidReservedStake { index, address } => (
                format!(
                    "Invalid/unparseable reserved contributor amount for contributor {index} ({address})"
                ),
                json!({ "index": index, "address": address }),
            ),
            ApiError::InsufficientReservedStake { index, address, minimum } => (
                format!(
                    "Insufficient reserved contributor stake: contributor {index} ({address}) must contribute at least {}",
                    amt(*minimum)
                ),
                json!({ "index": index, "address": address, "minimum": minimum }),
            ),
            ApiError::TooMuch { total, maximum } => (
                format!(
                    "Total node reserved contributions are too large: {} exceeds the maximum stake {}",
                    amt(*total),
                    amt(*maximum)
                ),
                json!({ "total": total, "maximum": maximum }),
            ),
            ApiError::TooMany { max_contributors } => (
                format!(
                    "Too many reserved contributors: only {max_contributors} contributor spots are possible"
                ),
                json!({ "max_contributors": max_contributors }),
            ),
            ApiError::InvalidFee { detail: d } => {
                detail = d.as_deref();
                ("Invalid fee".to_string(), json!({}))
            }
            ApiError::Signature { field, detail: d } => {
                detail = d.as_deref();
                let mut extras = json!({});
                if let Some(field) = field {
                    extras["field"] = json!(field);
                }
                ("Invalid service node registration pubkeys/signatures".to_string(), extras)
            }
        };

        extras["code"] = json!(self.code());
        extras["error"] = match detail {
            Some(d) => {
                extras["detail"] = json!(d);
                json!(format!("{message}: {d}"))
            }
            None => json!(message),
        };
        extras
    }
}
