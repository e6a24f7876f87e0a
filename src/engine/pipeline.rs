// Velopool Engine: Report Pipeline
//
// One report cycle: both balance reads, then the quote, then assembly and
// delivery. Steps run strictly one after another. A balance failure aborts
// the cycle before anything is assembled. A quote failure degrades the report
// according to `QuoteFailurePolicy`. A delivery failure is only logged.

use crate::atoms::constants::NOTIONAL_UNITS;
use crate::atoms::error::EngineResult;
use crate::engine::balance::get_balance;
use crate::engine::config::QuoteFailurePolicy;
use crate::engine::evm::{Address, RpcClient};
use crate::engine::pricing::{PriceOracle, SlippageEngine};
use crate::engine::report::{assemble, assemble_without_quote};
use crate::engine::types::{Balance, Pool, Quote, Token};
use async_trait::async_trait;
use log::{info, warn};

// ── Seams ──────────────────────────────────────────────────────────────────

#[async_trait]
pub trait BalanceSource: Send + Sync {
    async fn balance_of(&self, token: &Token, holder: &Address) -> EngineResult<Balance>;
}

#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn quote(&self, trade_token: &Token, notional_units: u64) -> EngineResult<Quote>;
}

/// Outbound text delivery to a single pre-configured destination.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, text: &str) -> EngineResult<()>;
}

#[async_trait]
impl BalanceSource for RpcClient {
    async fn balance_of(&self, token: &Token, holder: &Address) -> EngineResult<Balance> {
        get_balance(self, &token.address, holder, token.decimals).await
    }
}

#[async_trait]
impl<E: SlippageEngine> QuoteSource for PriceOracle<E> {
    async fn quote(&self, trade_token: &Token, notional_units: u64) -> EngineResult<Quote> {
        self.get_quote(trade_token, notional_units).await
    }
}

// ── Cycle ──────────────────────────────────────────────────────────────────

/// What a completed cycle produced.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub text: String,
    /// False when the quote failed and the report was degraded.
    pub quote_ok: bool,
    pub delivered: bool,
}

pub async fn run_cycle(
    pool: &Pool,
    balances: &dyn BalanceSource,
    quotes: &dyn QuoteSource,
    notifier: &dyn Notifier,
    policy: QuoteFailurePolicy,
) -> EngineResult<CycleReport> {
    // Reserves are held by the pool contract itself.
    let sdai = balances.balance_of(&pool.base, &pool.address).await?;
    let usdc = balances.balance_of(&pool.quote, &pool.address).await?;
    let sdai_display = sdai.to_display_f64()?;
    let usdc_display = usdc.to_display_f64()?;

    let (text, quote_ok) = match quotes.quote(&pool.quote, NOTIONAL_UNITS).await {
        Ok(q) => (assemble(&pool.name, sdai_display, usdc_display, q.slippage_percent, q.expected_price), true),
        Err(e) => {
            warn!("[pipeline] Failed to get slippage quote: {}", e);
            let text = match policy {
                QuoteFailurePolicy::SendZeroed => {
                    let q = Quote::zeroed();
                    assemble(&pool.name, sdai_display, usdc_display, q.slippage_percent, q.expected_price)
                }
                QuoteFailurePolicy::OmitQuote => assemble_without_quote(&pool.name, sdai_display, usdc_display),
            };
            (text, false)
        }
    };

    let delivered = match notifier.notify(&text).await {
        Ok(()) => {
            info!("[pipeline] Message sent successfully");
            true
        }
        Err(e) => {
            warn!("[pipeline] Failed to send message: {}", e);
            false
        }
    };

    Ok(CycleReport { text, quote_ok, delivered })
}
