//! Fixed-point money helpers.
//!
//! Amounts are `i64` minor units (two decimal places). Fractional results are
//! rounded half-up to a whole minor unit before they touch the ledger.

/// Number of decimal places carried by a minor unit.
pub const DECIMALS: u32 = 2;

/// Residual escrow amounts below 0.009 currency units count as rounding slack.
/// Expressed in thousandths of a currency unit.
pub const DUST_THRESHOLD_MILLIS: i64 = 9;

/// Share of the wage paid to a worker that was still in progress when the task
/// was dismissed, as numerator/denominator (0.3).
pub const IN_PROGRESS_SHARE: (i64, i64) = (3, 10);

/// `amount * numerator / denominator`, rounded half-up to a whole minor unit.
///
/// Returns `None` on overflow or a non-positive denominator. Negative inputs
/// round away from zero on the half, mirroring positive values.
pub fn mul_ratio_round_half_up(amount: i64, numerator: i64, denominator: i64) -> Option<i64> {
    if denominator <= 0 {
        return None;
    }
    let scaled = (amount as i128).checked_mul(numerator as i128)?;
    let denominator = denominator as i128;
    let quotient = scaled / denominator;
    let remainder = scaled % denominator;
    let rounded = if remainder.abs() * 2 >= denominator {
        quotient + scaled.signum()
    } else {
        quotient
    };
    i64::try_from(rounded).ok()
}

/// True when `amount` (minor units) is smaller in magnitude than the dust threshold.
pub fn is_dust(amount: i64) -> bool {
    let millis_per_minor = 10_i128.pow(3 - DECIMALS);
    (amount as i128).abs() * millis_per_minor < DUST_THRESHOLD_MILLIS as i128
}

/// Renders minor units as a decimal string, e.g. `12345` -> `"123.45"`.
pub fn format_minor(amount: i64) -> String {
    let scale = 10_i64.pow(DECIMALS);
    let sign = if amount < 0 { "-" } else { "" };
    let abs = amount.unsigned_abs();
    format!(
        "{sign}{}.{:0width$}",
        abs / scale as u64,
        abs % scale as u64,
        width = DECIMALS as usize
    )
}
