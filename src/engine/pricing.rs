// Velopool Engine: Price Oracle (Velodrome Slipstream)
//
// The oracle asks a swap-simulation engine for the slippage and expected
// price of a fixed notional trade. The production engine reads the pool's
// spot price from slot0 and simulates the trade through Slipstream's
// QuoterV2, both as plain eth_calls.

use crate::atoms::error::{EngineError, EngineResult};
use crate::engine::evm::abi::{decode_uint_word, encode_quote_exact_input_single, encode_slot0};
use crate::engine::evm::{Address, RpcClient};
use crate::engine::types::{Pool, Quote, Token};
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use log::debug;
use num::{BigInt, BigUint, ToPrimitive, Zero};
use std::sync::Arc;

/// Extra venue information returned by the engine. The oracle does not
/// surface it in the report.
#[derive(Debug, Clone, PartialEq)]
pub struct VenueDetail {
    /// Simulated output, raw base units of the counterpart token.
    pub amount_out: BigUint,
    /// Pre-trade price, trade token per counterpart token.
    pub spot_price: f64,
    pub trade_token_is_token0: bool,
}

/// A swap simulator keyed by token symbol.
/// `amount` is in the trade token's raw base units (100 USDC = 100_000_000).
/// Returns `(slippage_percent, expected_price, detail)`.
#[async_trait]
pub trait SlippageEngine: Send + Sync {
    async fn get_slippage(
        &self,
        token_symbol: &str,
        amount: &BigUint,
    ) -> EngineResult<(f64, f64, VenueDetail)>;
}

/// Convert display units into raw base units: `units × 10^decimals`.
pub fn notional_raw(units: u64, decimals: u8) -> BigUint {
    BigUint::from(units) * BigUint::from(10u8).pow(u32::from(decimals))
}

// ── Price Oracle ───────────────────────────────────────────────────────────

pub struct PriceOracle<E> {
    engine: E,
}

impl<E: SlippageEngine> PriceOracle<E> {
    pub fn new(engine: E) -> Self {
        PriceOracle { engine }
    }

    /// Quote a trade of `notional_units` display units of `trade_token`.
    pub async fn get_quote(&self, trade_token: &Token, notional_units: u64) -> EngineResult<Quote> {
        let amount = notional_raw(notional_units, trade_token.decimals);
        let (slippage_percent, expected_price, detail) =
            self.engine.get_slippage(&trade_token.symbol, &amount).await?;
        debug!("[pricing] venue detail for {} {}: {:?}", notional_units, trade_token.symbol, detail);
        Ok(Quote { expected_price, slippage_percent })
    }
}

// ── Price math ─────────────────────────────────────────────────────────────

/// `10^exp` as a BigDecimal, for any sign of `exp`.
fn pow10(exp: i64) -> BigDecimal {
    BigDecimal::new(BigInt::from(1u8), -exp)
}

fn to_decimal(v: &BigUint) -> BigDecimal {
    BigDecimal::from(BigInt::from(v.clone()))
}

/// Spot price of the counterpart token in units of the trade token, from a
/// Q64.96 `sqrtPriceX96` (token1 per token0, raw units).
pub(crate) fn spot_price(
    sqrt_price_x96: &BigUint,
    trade_token_is_token0: bool,
    decimals_in: u8,
    decimals_out: u8,
) -> Result<BigDecimal, String> {
    if sqrt_price_x96.is_zero() {
        return Err("Pool reports sqrtPriceX96 = 0 (uninitialised)".into());
    }
    let price_x192 = to_decimal(&(sqrt_price_x96 * sqrt_price_x96));
    let q192 = to_decimal(&(BigUint::from(1u8) << 192usize));
    // raw trade-token units per raw counterpart unit
    let in_per_out_raw = if trade_token_is_token0 { q192 / price_x192 } else { price_x192 / q192 };
    Ok(in_per_out_raw * pow10(i64::from(decimals_out) - i64::from(decimals_in)))
}

/// Realised price of the simulated trade, trade token per counterpart token.
pub(crate) fn execution_price(
    amount_in: &BigUint,
    amount_out: &BigUint,
    decimals_in: u8,
    decimals_out: u8,
) -> Result<BigDecimal, String> {
    if amount_out.is_zero() {
        return Err("Quoter returned zero output".into());
    }
    Ok(to_decimal(amount_in) / to_decimal(amount_out)
        * pow10(i64::from(decimals_out) - i64::from(decimals_in)))
}

/// Price impact in percent: positive when the trade pays more than spot.
pub(crate) fn slippage_percent(expected: &BigDecimal, spot: &BigDecimal) -> BigDecimal {
    (expected.clone() - spot.clone()) / spot.clone() * BigDecimal::from(100)
}

fn to_f64(v: &BigDecimal, what: &str) -> EngineResult<f64> {
    v.to_f64().ok_or_else(|| EngineError::Quote(format!("{} not representable as f64", what)))
}

// ── Slipstream engine ──────────────────────────────────────────────────────

pub struct SlipstreamEngine {
    rpc: Arc<RpcClient>,
    pool: Pool,
    quoter: Address,
}

impl SlipstreamEngine {
    pub fn new(rpc: Arc<RpcClient>, pool: Pool, quoter: Address) -> Self {
        SlipstreamEngine { rpc, pool, quoter }
    }
}

#[async_trait]
impl SlippageEngine for SlipstreamEngine {
    async fn get_slippage(
        &self,
        token_symbol: &str,
        amount: &BigUint,
    ) -> EngineResult<(f64, f64, VenueDetail)> {
        let token_in = self
            .pool
            .token_by_symbol(token_symbol)
            .ok_or_else(|| EngineError::Quote(format!("{} is not a token of {}", token_symbol, self.pool.name)))?;
        let token_out = self
            .pool
            .counterpart(token_in)
            .ok_or_else(|| EngineError::Quote(format!("No counterpart for {}", token_symbol)))?;
        let trade_token_is_token0 = token_in.address < token_out.address;

        let slot0 = self.rpc.eth_call(&encode_slot0(&self.pool.address)).await?;
        let sqrt_price_x96 = decode_uint_word(&slot0, 0).map_err(EngineError::Decode)?;

        let quote_call = encode_quote_exact_input_single(
            &self.quoter,
            &token_in.address,
            &token_out.address,
            amount,
            self.pool.tick_spacing,
        )
        .map_err(EngineError::Quote)?;
        let quoted = self.rpc.eth_call(&quote_call).await?;
        // (amountOut, sqrtPriceX96After, initializedTicksCrossed, gasEstimate)
        let amount_out = decode_uint_word(&quoted, 0).map_err(EngineError::Decode)?;

        let spot = spot_price(&sqrt_price_x96, trade_token_is_token0, token_in.decimals, token_out.decimals)
            .map_err(EngineError::Quote)?;
        let expected = execution_price(amount, &amount_out, token_in.decimals, token_out.decimals)
            .map_err(EngineError::Quote)?;
        let slippage = slippage_percent(&expected, &spot);

        let detail = VenueDetail {
            amount_out,
            spot_price: to_f64(&spot, "spot price")?,
            trade_token_is_token0,
        };
        Ok((to_f64(&slippage, "slippage")?, to_f64(&expected, "expected price")?, detail))
    }
}
