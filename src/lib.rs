// Velopool Reporter
//
// Reads the Velodrome CL1-USDC/sDAI pool reserves and a Slipstream quote on
// Optimism, and posts one report to a Discord channel once the bot session
// becomes ready.

pub mod atoms;
pub mod engine;

use crate::atoms::error::{EngineError, EngineResult};
use crate::engine::config::ReporterSettings;
use crate::engine::discord::{self, DiscordNotifier, MAX_RECONNECT_ATTEMPTS};
use crate::engine::evm::RpcClient;
use crate::engine::pipeline::run_cycle;
use crate::engine::pricing::{PriceOracle, SlipstreamEngine};
use crate::engine::trigger::ReadyTrigger;
use log::{error, info, warn};
use std::sync::Arc;

/// Startup checks, then the gateway session loop. Returns only on a fatal
/// error or after the reconnect budget is exhausted.
pub async fn run(settings: Arc<ReporterSettings>) -> EngineResult<()> {
    let rpc = Arc::new(RpcClient::new(settings.rpc_url.clone()));

    let chain_id = rpc
        .eth_chain_id()
        .await
        .map_err(|e| EngineError::Config(format!("RPC endpoint unreachable: {}", e)))?;
    if chain_id != settings.chain_id {
        return Err(EngineError::Config(format!(
            "RPC endpoint is on chain {}, expected {}",
            chain_id, settings.chain_id
        )));
    }
    info!("[rpc] Connected to chain {}", chain_id);

    let http = reqwest::Client::new();
    let bot_name = discord::verify_token(&http, &settings.discord_api, &settings.bot_token).await?;
    info!("[discord] Bot token valid for {}", bot_name);

    let oracle = Arc::new(PriceOracle::new(SlipstreamEngine::new(
        rpc.clone(),
        settings.pool.clone(),
        settings.quoter,
    )));
    let notifier = Arc::new(DiscordNotifier::new(
        http,
        settings.discord_api.clone(),
        settings.bot_token.clone(),
        settings.channel_id.clone(),
    ));

    let on_ready = {
        let settings = settings.clone();
        move || {
            let settings = settings.clone();
            let rpc = rpc.clone();
            let oracle = oracle.clone();
            let notifier = notifier.clone();
            tokio::spawn(async move {
                let res = run_cycle(
                    &settings.pool,
                    rpc.as_ref(),
                    oracle.as_ref(),
                    notifier.as_ref(),
                    settings.quote_failure,
                )
                .await;
                match res {
                    Ok(report) if report.delivered => info!("[pipeline] Report cycle complete"),
                    Ok(_) => warn!("[pipeline] Report cycle finished without delivery"),
                    Err(e) => error!("[pipeline] Report cycle aborted: {}", e),
                }
            });
        }
    };

    let trigger = ReadyTrigger::new();
    let mut attempt: u32 = 0;
    loop {
        match discord::run_gateway(&settings.discord_gateway, &settings.bot_token, &trigger, &on_ready).await {
            Ok(end) if end.was_ready => attempt = 0,
            Ok(_) => {}
            Err(e) if discord::is_fatal(&e) => return Err(e),
            Err(e) => warn!("[discord] Gateway session failed: {}", e),
        }

        if attempt >= MAX_RECONNECT_ATTEMPTS {
            return Err(EngineError::channel(
                "discord",
                format!("giving up after {} reconnect attempts", MAX_RECONNECT_ATTEMPTS),
            ));
        }
        let delay = discord::reconnect_delay(attempt).await;
        attempt += 1;
        info!("[discord] Reconnecting (attempt {}) after {:?}", attempt, delay);
    }
}
