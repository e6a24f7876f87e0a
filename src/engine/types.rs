// Velopool Engine: Domain Types

use crate::atoms::constants::{
    POOL_ADDRESS, POOL_NAME, POOL_TICK_SPACING, SDAI_ADDRESS, SDAI_DECIMALS, USDC_ADDRESS,
    USDC_DECIMALS,
};
use crate::atoms::error::{EngineError, EngineResult};
use crate::engine::evm::Address;
use bigdecimal::BigDecimal;
use num::{BigInt, BigUint, ToPrimitive, Zero};

// ── Token / Pool ───────────────────────────────────────────────────────────

/// Immutable ERC-20 descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub symbol: String,
    pub address: Address,
    /// Decimal exponent used to turn raw integer amounts into display units.
    pub decimals: u8,
}

impl Token {
    pub fn new(symbol: impl Into<String>, address: Address, decimals: u8) -> Self {
        Token { symbol: symbol.into(), address, decimals }
    }
}

/// One concentrated-liquidity pool and its two reserve assets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pool {
    pub name: String,
    pub address: Address,
    /// Reported first (sDAI).
    pub base: Token,
    /// Reported second, and the token the slippage notional is denominated in (USDC).
    pub quote: Token,
    pub tick_spacing: i32,
}

impl Pool {
    /// The Velodrome Slipstream CL1-USDC/sDAI pool on Optimism.
    pub fn velodrome_usdc_sdai() -> EngineResult<Self> {
        let parse = |s: &str| s.parse::<Address>().map_err(EngineError::Config);
        Ok(Pool {
            name: POOL_NAME.to_string(),
            address: parse(POOL_ADDRESS)?,
            base: Token::new("sDAI", parse(SDAI_ADDRESS)?, SDAI_DECIMALS),
            quote: Token::new("USDC", parse(USDC_ADDRESS)?, USDC_DECIMALS),
            tick_spacing: POOL_TICK_SPACING,
        })
    }

    pub fn token_by_symbol(&self, symbol: &str) -> Option<&Token> {
        [&self.base, &self.quote]
            .into_iter()
            .find(|t| t.symbol.eq_ignore_ascii_case(symbol))
    }

    /// The pool's other reserve asset.
    pub fn counterpart(&self, token: &Token) -> Option<&Token> {
        if token == &self.base {
            Some(&self.quote)
        } else if token == &self.quote {
            Some(&self.base)
        } else {
            None
        }
    }
}

// ── Balance ────────────────────────────────────────────────────────────────

/// A token reserve: raw base units plus the exponent that scales them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Balance {
    raw: BigUint,
    decimals: u8,
}

impl Balance {
    pub fn new(raw: BigUint, decimals: u8) -> Self {
        Balance { raw, decimals }
    }

    pub fn zero(decimals: u8) -> Self {
        Balance { raw: BigUint::zero(), decimals }
    }

    pub fn raw(&self) -> &BigUint {
        &self.raw
    }

    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    /// Exact display amount, `raw / 10^decimals`.
    pub fn amount(&self) -> BigDecimal {
        BigDecimal::new(BigInt::from(self.raw.clone()), i64::from(self.decimals))
    }

    /// Lossy conversion for report rendering only. Never use the result for
    /// anything value-bearing.
    pub fn to_display_f64(&self) -> EngineResult<f64> {
        self.amount()
            .to_f64()
            .ok_or_else(|| EngineError::Decode(format!("Balance {} not representable as f64", self.amount())))
    }
}

// ── Quote ──────────────────────────────────────────────────────────────────

/// Slippage and expected execution price for the fixed notional trade.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Quote {
    pub expected_price: f64,
    pub slippage_percent: f64,
}

impl Quote {
    /// Zero-valued quote, used when the pricing engine fails and the report
    /// is sent anyway.
    pub fn zeroed() -> Self {
        Quote::default()
    }
}
