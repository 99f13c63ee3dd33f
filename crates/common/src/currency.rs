//! Lossless fixed-point currency codec.
//!
//! Amounts are counted in an atomic integer unit ([`AtomicAmount`]) and
//! rendered with a fixed number of decimal places. All conversions are
//! exact integer arithmetic; no floating-point value ever represents an
//! amount, so `parse_amount(&format_amount(x, d), d) == x` for every
//! representable `x`.

use thiserror::Error;

/// Smallest currency unit. All stake arithmetic happens on this type.
pub type AtomicAmount = u64;

/// Decimal places used by the network's display denomination.
pub const DEFAULT_DECIMALS: u32 = 9;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CurrencyError {
    /// The text contains anything outside digits and a single `.`.
    #[error("invalid currency amount: {0:?}")]
    InvalidCurrency(String),

    /// The parsed value does not fit in the atomic unit range.
    #[error("currency amount out of range: {0:?}")]
    OutOfRange(String),
}

/// Formats an atomic amount to `decimals` decimal places.
///
/// The whole part is an integer division by `10^decimals`; a nonzero
/// remainder is rendered as `.` plus the remainder zero-padded to
/// `decimals` digits with trailing zeros stripped. A zero remainder
/// emits no fractional part at all.
pub fn format_amount(units: AtomicAmount, decimals: u32) -> String {
    let base = 10u64.pow(decimals);
    let whole = units / base;
    let frac = units % base;
    if frac == 0 {
        return whole.to_string();
    }
    let mut frac = format!("{frac:0width$}", width = decimals as usize);
    while frac.ends_with('0') {
        frac.pop();
    }
    format!("{whole}.{frac}")
}

/// Losslessly parses a currency value such as `1.23` into an atomic
/// amount such as `1_230_000_000`.
///
/// Accepts `digits` or `digits.digits` with at most one decimal point.
/// A fractional part longer than `decimals` digits is truncated (not
/// rounded); a shorter one is right-padded with zeros.
pub fn parse_amount(text: &str, decimals: u32) -> Result<AtomicAmount, CurrencyError> {
    let invalid = || CurrencyError::InvalidCurrency(text.to_string());

    let mut pieces = text.split('.');
    let whole_part = pieces.next().ok_or_else(invalid)?;
    let frac_part = pieces.next();
    if pieces.next().is_some() {
        return Err(invalid());
    }
    if whole_part.is_empty() || !whole_part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    if let Some(f) = frac_part {
        if f.is_empty() || !f.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
    }

    let out_of_range = || CurrencyError::OutOfRange(text.to_string());
    let whole: AtomicAmount = whole_part.parse().map_err(|_| out_of_range())?;

    let frac: AtomicAmount = match frac_part {
        None => 0,
        Some(f) => {
            let mut digits = f.to_string();
            digits.truncate(decimals as usize);
            while digits.len() < decimals as usize {
                digits.push('0');
            }
            if digits.is_empty() {
                0
            } else {
                digits.parse().map_err(|_| out_of_range())?
            }
        }
    };

    let base = 10u64.pow(decimals);
    whole
        .checked_mul(base)
        .and_then(|v| v.checked_add(frac))
        .ok_or_else(out_of_range)
}
