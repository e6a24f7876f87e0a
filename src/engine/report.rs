// Velopool Engine: Report Assembler

use crate::atoms::constants::{NOTIONAL_TOKEN, NOTIONAL_UNITS};
use crate::engine::format::{format_percent, format_price, format_truncated};

/// Build the pool report. Pure: identical inputs give identical output.
/// Balances are display amounts and are truncated, not rounded.
pub fn assemble(
    pool_name: &str,
    sdai_balance: f64,
    usdc_balance: f64,
    slippage_percent: f64,
    expected_price: f64,
) -> String {
    format!(
        "{}\n- Slippage (for {} {}): {}\n- Venue Price (USDC/sDAI): {}",
        assemble_without_quote(pool_name, sdai_balance, usdc_balance),
        NOTIONAL_UNITS,
        NOTIONAL_TOKEN,
        format_percent(slippage_percent),
        format_price(expected_price),
    )
}

/// The balance-only form, used when a failed quote should be left out.
pub fn assemble_without_quote(pool_name: &str, sdai_balance: f64, usdc_balance: f64) -> String {
    format!(
        "**{}**\n- sDAI balance: {}\n- USDC balance: {}",
        pool_name,
        format_truncated(sdai_balance),
        format_truncated(usdc_balance),
    )
}
