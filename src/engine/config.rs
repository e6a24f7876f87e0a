// Velopool Engine: Process Configuration
//
// Everything is read once at startup from flags or the environment and
// frozen into `ReporterSettings`, which is then shared read-only.

use crate::atoms::constants::{
    DISCORD_API, DISCORD_GATEWAY_URL, OPTIMISM_CHAIN_ID, SLIPSTREAM_QUOTER_V2,
};
use crate::atoms::error::{EngineError, EngineResult};
use crate::engine::evm::Address;
use crate::engine::types::Pool;
use clap::{Parser, ValueEnum};
use std::fmt;

/// What to do with the quote lines when the pricing engine fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum QuoteFailurePolicy {
    /// Send the report with a zero-valued quote (0.0000% / 0.0000).
    #[default]
    #[value(name = "zeroed")]
    SendZeroed,
    /// Send the report without the slippage and price lines.
    #[value(name = "omit")]
    OmitQuote,
}

#[derive(Parser, Clone)]
#[command(name = "velopool-reporter", version, about = "Post a Velodrome CL1-USDC/sDAI pool report to Discord")]
pub struct ReporterConfig {
    /// Optimism JSON-RPC endpoint
    #[arg(long, env = "OPT_RPC_ENDPOINT")]
    pub rpc_url: String,

    /// Discord bot token
    #[arg(long, env = "BOT_TOKEN", hide_env_values = true)]
    pub bot_token: String,

    /// Destination channel ID
    #[arg(long, env = "CHANNEL_ID")]
    pub channel_id: String,

    /// Chain ID the RPC endpoint must report
    #[arg(long, env = "OPT_CHAIN_ID", default_value_t = OPTIMISM_CHAIN_ID)]
    pub chain_id: u64,

    /// Slipstream QuoterV2 contract
    #[arg(long, env = "SLIPSTREAM_QUOTER", default_value = SLIPSTREAM_QUOTER_V2)]
    pub quoter: String,

    /// Behaviour when the price quote cannot be fetched
    #[arg(long, env = "QUOTE_FAILURE_POLICY", value_enum, default_value_t = QuoteFailurePolicy::SendZeroed)]
    pub on_quote_failure: QuoteFailurePolicy,

    #[arg(long, env = "DISCORD_API", default_value = DISCORD_API, hide = true)]
    pub discord_api: String,

    #[arg(long, env = "DISCORD_GATEWAY", default_value = DISCORD_GATEWAY_URL, hide = true)]
    pub discord_gateway: String,
}

/// Validated, immutable process configuration.
#[derive(Clone)]
pub struct ReporterSettings {
    pub rpc_url: String,
    pub bot_token: String,
    pub channel_id: String,
    pub chain_id: u64,
    pub quoter: Address,
    pub quote_failure: QuoteFailurePolicy,
    pub discord_api: String,
    pub discord_gateway: String,
    pub pool: Pool,
}

impl fmt::Debug for ReporterSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReporterSettings")
            .field("rpc_url", &redact_url(&self.rpc_url))
            .field("bot_token", &"<redacted>")
            .field("channel_id", &self.channel_id)
            .field("chain_id", &self.chain_id)
            .field("quoter", &self.quoter)
            .field("quote_failure", &self.quote_failure)
            .field("pool", &self.pool.name)
            .finish()
    }
}

/// Hosted RPC URLs often embed an API key in the path; keep only scheme and host.
pub(crate) fn redact_url(raw: &str) -> String {
    match url::Url::parse(raw) {
        Ok(u) => format!("{}://{}", u.scheme(), u.host_str().unwrap_or("?")),
        Err(_) => "<invalid>".into(),
    }
}

impl ReporterConfig {
    pub fn into_settings(self) -> EngineResult<ReporterSettings> {
        let rpc = url::Url::parse(self.rpc_url.trim())
            .map_err(|e| EngineError::Config(format!("OPT_RPC_ENDPOINT is not a valid URL: {}", e)))?;
        if !matches!(rpc.scheme(), "http" | "https") {
            return Err(EngineError::Config(format!(
                "OPT_RPC_ENDPOINT must be http(s), got '{}'",
                rpc.scheme()
            )));
        }

        let bot_token = self.bot_token.trim().to_string();
        if bot_token.is_empty() {
            return Err(EngineError::Config("BOT_TOKEN is empty".into()));
        }

        let channel_id = self.channel_id.trim().to_string();
        if channel_id.is_empty() || !channel_id.chars().all(|c| c.is_ascii_digit()) {
            return Err(EngineError::Config(format!("CHANNEL_ID must be a numeric snowflake, got '{}'", channel_id)));
        }

        let quoter = self
            .quoter
            .parse::<Address>()
            .map_err(|e| EngineError::Config(format!("SLIPSTREAM_QUOTER: {}", e)))?;

        Ok(ReporterSettings {
            rpc_url: rpc.to_string(),
            bot_token,
            channel_id,
            chain_id: self.chain_id,
            quoter,
            quote_failure: self.on_quote_failure,
            discord_api: self.discord_api.trim_end_matches('/').to_string(),
            discord_gateway: self.discord_gateway,
            pool: Pool::velodrome_usdc_sdai()?,
        })
    }
}
