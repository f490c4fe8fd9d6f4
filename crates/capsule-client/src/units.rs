//! SUI / MIST conversions

use crate::{CapsuleError, Result};

/// MIST per SUI
pub const MIST_PER_SUI: u64 = 1_000_000_000;

const DECIMALS: usize = 9;

/// Parse a decimal SUI amount such as `"1.5"` into MIST
pub fn parse_sui_amount(input: &str) -> Result<u64> {
    let text = input.trim();
    let invalid = || CapsuleError::InvalidInput(format!("invalid token amount: {input:?}"));

    let (whole, fraction) = match text.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (text, ""),
    };

    if whole.is_empty() && fraction.is_empty() {
        return Err(invalid());
    }
    if !whole.bytes().all(|b| b.is_ascii_digit()) || !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    if fraction.len() > DECIMALS {
        return Err(CapsuleError::InvalidInput(format!(
            "token amount {input:?} has more than {DECIMALS} decimal places"
        )));
    }

    let whole: u64 = if whole.is_empty() { 0 } else { whole.parse().map_err(|_| invalid())? };
    let fraction: u64 = if fraction.is_empty() {
        0
    } else {
        format!("{fraction:0<DECIMALS$}").parse().map_err(|_| invalid())?
    };

    whole
        .checked_mul(MIST_PER_SUI)
        .and_then(|mist| mist.checked_add(fraction))
        .ok_or_else(|| CapsuleError::InvalidInput(format!("token amount {input:?} overflows")))
}

/// Render MIST as a decimal SUI amount without trailing zeros
pub fn format_sui_amount(mist: u64) -> String {
    let whole = mist / MIST_PER_SUI;
    let fraction = mist % MIST_PER_SUI;
    if fraction == 0 {
        return whole.to_string();
    }
    let digits = format!("{fraction:0>DECIMALS$}");
    format!("{whole}.{}", digits.trim_end_matches('0'))
}
