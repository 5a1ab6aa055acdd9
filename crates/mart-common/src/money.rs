//! Integer money helpers

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Monetary amount in paise (1/100 rupee). All storage and arithmetic
/// stays in this unit.
pub type Paise = i64;

/// Fallback GST state code when a state string carries no parseable code.
pub const DEFAULT_STATE_CODE: &str = "09";

/// GST on an amount at a percent rate, rounded half-up to whole paise.
///
/// The only place decimal arithmetic is allowed; the result is integer
/// paise again.
pub fn gst_on(amount: Paise, rate_percent: Decimal) -> Paise {
    let gst = Decimal::from(amount) * rate_percent / Decimal::from(100);
    gst.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .unwrap_or(0)
}

/// Split a GST amount into (CGST, SGST) halves that always sum back to
/// the input, odd paise going to SGST.
pub fn split_gst(gst: Paise) -> (Paise, Paise) {
    let cgst = gst / 2;
    (cgst, gst - cgst)
}

/// Extract the two-digit GST state code from a registered-state string.
///
/// Takes the first run of two consecutive digits ("09 - Uttar Pradesh",
/// "UP/09", "09"); anything unparseable falls back to
/// [`DEFAULT_STATE_CODE`].
pub fn state_code(state: &str) -> String {
    let bytes = state.as_bytes();
    for window in bytes.windows(2) {
        if window[0].is_ascii_digit() && window[1].is_ascii_digit() {
            return String::from_utf8_lossy(window).into_owned();
        }
    }
    DEFAULT_STATE_CODE.to_string()
}

/// Mask a bank reference down to its last four characters.
pub fn mask_account(account: &str) -> String {
    let chars: Vec<char> = account.chars().collect();
    if chars.len() <= 4 {
        return account.to_string();
    }
    let visible: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}", "*".repeat(chars.len() - 4), visible)
}
