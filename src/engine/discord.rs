// Velopool Engine: Discord Bridge
//
// Connects to Discord through the Gateway WebSocket for session readiness,
// and posts the report through the REST API. The bot never reads messages;
// it only needs the GUILDS intent.
//
// Setup: discord.com/developers → New Application → Bot → Copy Token,
// then invite the bot to a server with "Send Messages" on the target channel.

use crate::atoms::error::{EngineError, EngineResult};
use crate::engine::pipeline::Notifier;
use crate::engine::trigger::ReadyTrigger;
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use log::{debug, info, warn};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};

/// Maximum consecutive reconnect attempts before giving up entirely.
pub const MAX_RECONNECT_ATTEMPTS: u32 = 8;

/// Initial reconnect delay in milliseconds (doubles each attempt).
const INITIAL_RECONNECT_DELAY_MS: u64 = 1_000;

/// Reconnect delay cap in milliseconds (5 minutes).
const MAX_RECONNECT_DELAY_MS: u64 = 300_000;

/// Floor for the heartbeat period advertised in Hello.
const MIN_HEARTBEAT_INTERVAL_MS: u64 = 1_000;

/// GUILDS (1<<0) is enough to receive READY; no message intents are requested.
const GATEWAY_INTENTS: u64 = 1 << 0;

// ── Discord API Types ──────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub(crate) struct GatewayPayload {
    op: u8,
    d: Option<serde_json::Value>,
    s: Option<u64>,    // sequence number
    t: Option<String>, // event name
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct DiscordUser {
    id: String,
    username: String,
}

#[derive(Debug, Deserialize)]
struct ReadyEvent {
    user: DiscordUser,
}

/// What a gateway payload means for the session loop.
#[derive(Debug, PartialEq)]
pub(crate) enum GatewayEvent {
    Hello { heartbeat_interval: u64 },
    Ready { username: String, id: String },
    OtherDispatch,
    HeartbeatRequest,
    HeartbeatAck,
    Reconnect,
    InvalidSession { resumable: bool },
    Unknown(u8),
}

pub(crate) fn classify(payload: &GatewayPayload) -> GatewayEvent {
    match payload.op {
        0 => match payload.t.as_deref() {
            Some("READY") => {
                match payload.d.clone().map(serde_json::from_value::<ReadyEvent>) {
                    Some(Ok(ready)) => GatewayEvent::Ready { username: ready.user.username, id: ready.user.id },
                    _ => GatewayEvent::OtherDispatch,
                }
            }
            _ => GatewayEvent::OtherDispatch,
        },
        1 => GatewayEvent::HeartbeatRequest,
        7 => GatewayEvent::Reconnect,
        9 => GatewayEvent::InvalidSession {
            resumable: payload.d.as_ref().and_then(|d| d.as_bool()).unwrap_or(false),
        },
        10 => GatewayEvent::Hello {
            heartbeat_interval: payload
                .d
                .as_ref()
                .and_then(|d| d["heartbeat_interval"].as_u64())
                .unwrap_or(41250)
                .max(MIN_HEARTBEAT_INTERVAL_MS),
        },
        11 => GatewayEvent::HeartbeatAck,
        other => GatewayEvent::Unknown(other),
    }
}

/// Map a gateway close code to an outcome. Codes that need operator action
/// are errors; everything else ends the session so it can be re-established.
// Close codes: https://discord.com/developers/docs/topics/opcodes-and-status-codes
pub(crate) fn close_outcome(code: u16, reason: &str) -> EngineResult<()> {
    match code {
        4004 => Err(EngineError::Auth("Invalid bot token (gateway close 4004)".into())),
        4010..=4014 => Err(EngineError::Config(format!(
            "Gateway rejected the identify payload (close {}): {}",
            code, reason
        ))),
        _ => Ok(()),
    }
}

/// Errors that no amount of reconnecting will fix.
pub fn is_fatal(err: &EngineError) -> bool {
    matches!(err, EngineError::Auth(_) | EngineError::Config(_))
}

// ── Gateway Session ────────────────────────────────────────────────────

/// How a gateway session ended without a fatal error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionEnd {
    pub was_ready: bool,
}

fn ws_err(e: impl std::fmt::Display) -> EngineError {
    EngineError::channel("discord", e.to_string())
}

/// Run one gateway session until it drops. `on_ready` is invoked on the first
/// READY of the process only, as decided by `trigger`.
pub async fn run_gateway(
    gateway_url: &str,
    token: &str,
    trigger: &ReadyTrigger,
    on_ready: &(dyn Fn() + Send + Sync),
) -> EngineResult<SessionEnd> {
    let (ws_stream, _) = connect_async(gateway_url).await.map_err(ws_err)?;
    let (write, mut read) = ws_stream.split();

    // Read Hello (op 10) to get heartbeat interval
    let hello = read.next().await.ok_or("Gateway closed before Hello")?.map_err(ws_err)?;
    let hello_payload: GatewayPayload = serde_json::from_str(hello.to_text().map_err(ws_err)?)?;
    let heartbeat_interval = match classify(&hello_payload) {
        GatewayEvent::Hello { heartbeat_interval } => heartbeat_interval,
        _ => return Err(format!("Expected Hello (op 10), got op {}", hello_payload.op).into()),
    };
    info!("[discord] Connected to gateway, heartbeat_interval={}ms", heartbeat_interval);

    let write = Arc::new(tokio::sync::Mutex::new(write));
    let sequence: Arc<std::sync::Mutex<Option<u64>>> = Arc::new(std::sync::Mutex::new(None));

    let identify = json!({
        "op": 2,
        "d": {
            "token": token,
            "intents": GATEWAY_INTENTS,
            "properties": {
                "os": std::env::consts::OS,
                "browser": "velopool",
                "device": "velopool"
            }
        }
    });
    write.lock().await.send(WsMessage::Text(identify.to_string())).await.map_err(ws_err)?;

    // Heartbeat task
    let hb_write = write.clone();
    let hb_sequence = sequence.clone();
    let heartbeat_task = tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_millis(heartbeat_interval)).await;
            let seq = hb_sequence.lock().map(|s| *s).unwrap_or(None);
            let hb = json!({ "op": 1, "d": seq });
            if let Err(e) = hb_write.lock().await.send(WsMessage::Text(hb.to_string())).await {
                warn!("[discord] Heartbeat send failed: {}", e);
                break;
            }
        }
    });

    let mut was_ready = false;
    let outcome = loop {
        let msg = match read.next().await {
            Some(Ok(m)) => m,
            Some(Err(e)) => {
                warn!("[discord] WS read error: {}", e);
                break Ok(());
            }
            None => {
                warn!("[discord] Gateway stream ended");
                break Ok(());
            }
        };

        let text = match msg {
            WsMessage::Text(t) => t,
            WsMessage::Close(frame) => {
                let (code, reason) = frame
                    .map(|f| (u16::from(f.code), f.reason.to_string()))
                    .unwrap_or((0, String::new()));
                warn!("[discord] Gateway closed: code={} reason={}", code, reason);
                break close_outcome(code, &reason);
            }
            _ => continue,
        };

        let payload: GatewayPayload = match serde_json::from_str(&text) {
            Ok(p) => p,
            Err(_) => continue,
        };
        if let Some(s) = payload.s {
            if let Ok(mut seq) = sequence.lock() {
                *seq = Some(s);
            }
        }

        match classify(&payload) {
            GatewayEvent::Ready { username, id } => {
                was_ready = true;
                let first = trigger.connect();
                info!("[discord] Ready as {} ({}), trigger {:?}", username, id, trigger.state());
                if first {
                    on_ready();
                } else {
                    info!("[discord] Session re-established; report already dispatched");
                }
            }
            GatewayEvent::HeartbeatRequest => {
                let seq = sequence.lock().map(|s| *s).unwrap_or(None);
                let hb = json!({ "op": 1, "d": seq });
                if let Err(e) = write.lock().await.send(WsMessage::Text(hb.to_string())).await {
                    warn!("[discord] Heartbeat send failed: {}", e);
                    break Ok(());
                }
            }
            GatewayEvent::Reconnect => {
                info!("[discord] Gateway requested reconnect");
                break Ok(());
            }
            GatewayEvent::InvalidSession { resumable } => {
                warn!("[discord] Invalid session (resumable={})", resumable);
                break Ok(());
            }
            GatewayEvent::HeartbeatAck => debug!("[discord] Heartbeat ACK"),
            GatewayEvent::Hello { .. } | GatewayEvent::OtherDispatch | GatewayEvent::Unknown(_) => {}
        }
    };

    heartbeat_task.abort();
    outcome.map(|()| SessionEnd { was_ready })
}

// ── Reconnect backoff ──────────────────────────────────────────────────

/// Exponential backoff for `attempt` (0-based), before jitter.
pub(crate) fn reconnect_backoff_ms(attempt: u32) -> u64 {
    (INITIAL_RECONNECT_DELAY_MS * 2u64.pow(attempt.min(12))).min(MAX_RECONNECT_DELAY_MS)
}

/// Sleep with exponential backoff and ±25% jitter. Returns the delay slept.
pub async fn reconnect_delay(attempt: u32) -> Duration {
    let delay = Duration::from_millis(apply_jitter(reconnect_backoff_ms(attempt)));
    tokio::time::sleep(delay).await;
    delay
}

/// Apply ±25% jitter to prevent thundering-herd effects.
fn apply_jitter(base_ms: u64) -> u64 {
    let jitter_range = (base_ms / 4) as i64;
    if jitter_range == 0 {
        return base_ms.max(100);
    }
    let offset = (rand_jitter() % (2 * jitter_range + 1)) - jitter_range;
    (base_ms as i64 + offset).max(100) as u64
}

/// Jitter source from system clock nanos.
fn rand_jitter() -> i64 {
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    i64::from(nanos)
}

// ── Discord REST API ───────────────────────────────────────────────────

/// Check the bot token before opening the gateway. Returns the bot username.
pub async fn verify_token(client: &reqwest::Client, api_base: &str, token: &str) -> EngineResult<String> {
    let resp = client
        .get(format!("{}/users/@me", api_base))
        .header("Authorization", format!("Bot {}", token))
        .send()
        .await?;

    let status = resp.status();
    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(EngineError::Auth("Discord rejected the bot token (401)".into()));
    }
    if !status.is_success() {
        return Err(EngineError::channel("discord", format!("users/@me failed: {}", status)));
    }
    let user: DiscordUser = resp.json().await?;
    Ok(user.username)
}

/// Posts plain-text messages to one channel.
pub struct DiscordNotifier {
    http: reqwest::Client,
    api_base: String,
    token: String,
    channel_id: String,
}

impl DiscordNotifier {
    pub fn new(http: reqwest::Client, api_base: impl Into<String>, token: impl Into<String>, channel_id: impl Into<String>) -> Self {
        DiscordNotifier {
            http,
            api_base: api_base.into(),
            token: token.into(),
            channel_id: channel_id.into(),
        }
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn notify(&self, text: &str) -> EngineResult<()> {
        let url = format!("{}/channels/{}/messages", self.api_base, self.channel_id);
        let resp = self
            .http
            .post(&url)
            .header("Authorization", format!("Bot {}", self.token))
            .json(&json!({ "content": text }))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(EngineError::channel(
                "discord",
                format!("sendMessage {} failed: {} {}", self.channel_id, status, body),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::net::TcpListener;
    use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
    use tokio_tungstenite::tungstenite::protocol::CloseFrame;

    fn payload(raw: &str) -> GatewayPayload {
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn classify_hello() {
        let p = payload(r#"{"op":10,"d":{"heartbeat_interval":45000},"s":null,"t":null}"#);
        assert_eq!(classify(&p), GatewayEvent::Hello { heartbeat_interval: 45000 });
    }

    #[test]
    fn classify_hello_clamps_zero_interval() {
        let p = payload(r#"{"op":10,"d":{"heartbeat_interval":0}}"#);
        assert_eq!(classify(&p), GatewayEvent::Hello { heartbeat_interval: MIN_HEARTBEAT_INTERVAL_MS });
    }

    #[test]
    fn classify_ready() {
        let p = payload(
            r#"{"op":0,"s":1,"t":"READY","d":{"v":10,"session_id":"abc","resume_gateway_url":"wss://x","user":{"id":"42","username":"velopool","bot":true}}}"#,
        );
        assert_eq!(classify(&p), GatewayEvent::Ready { username: "velopool".into(), id: "42".into() });
    }

    #[test]
    fn classify_malformed_ready_is_ignored() {
        let p = payload(r#"{"op":0,"s":1,"t":"READY","d":{"nope":true}}"#);
        assert_eq!(classify(&p), GatewayEvent::OtherDispatch);
    }

    #[test]
    fn classify_control_opcodes() {
        assert_eq!(classify(&payload(r#"{"op":11}"#)), GatewayEvent::HeartbeatAck);
        assert_eq!(classify(&payload(r#"{"op":1,"d":null}"#)), GatewayEvent::HeartbeatRequest);
        assert_eq!(classify(&payload(r#"{"op":7,"d":null}"#)), GatewayEvent::Reconnect);
        assert_eq!(classify(&payload(r#"{"op":9,"d":true}"#)), GatewayEvent::InvalidSession { resumable: true });
        assert_eq!(classify(&payload(r#"{"op":0,"t":"GUILD_CREATE","d":{}}"#)), GatewayEvent::OtherDispatch);
        assert_eq!(classify(&payload(r#"{"op":42}"#)), GatewayEvent::Unknown(42));
    }

    #[test]
    fn close_codes() {
        assert!(matches!(close_outcome(4004, ""), Err(EngineError::Auth(_))));
        assert!(matches!(close_outcome(4014, "Disallowed intent(s)"), Err(EngineError::Config(_))));
        assert!(close_outcome(1000, "").is_ok());
        assert!(close_outcome(4000, "unknown error").is_ok());
        assert!(is_fatal(&close_outcome(4004, "").unwrap_err()));
        assert!(!is_fatal(&EngineError::channel("discord", "reset")));
    }

    #[test]
    fn backoff_grows_and_caps() {
        assert_eq!(reconnect_backoff_ms(0), 1_000);
        assert_eq!(reconnect_backoff_ms(3), 8_000);
        assert_eq!(reconnect_backoff_ms(20), 300_000);
        for _ in 0..50 {
            let j = apply_jitter(8_000);
            assert!((6_000..=10_000).contains(&j));
        }
        assert_eq!(apply_jitter(200), 200);
    }

    #[tokio::test]
    async fn notifier_posts_content() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/channels/123/messages")
            .match_header("authorization", "Bot tok")
            .match_body(Matcher::Json(json!({ "content": "**pool**\n- sDAI balance: 1" })))
            .with_status(200)
            .with_body(r#"{"id":"1"}"#)
            .create_async()
            .await;

        let notifier = DiscordNotifier::new(reqwest::Client::new(), server.url(), "tok", "123");
        notifier.notify("**pool**\n- sDAI balance: 1").await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn notifier_reports_http_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/channels/123/messages")
            .with_status(403)
            .with_body(r#"{"message":"Missing Access","code":50001}"#)
            .create_async()
            .await;

        let notifier = DiscordNotifier::new(reqwest::Client::new(), server.url(), "tok", "123");
        let err = notifier.notify("hi").await.unwrap_err();
        assert!(err.to_string().contains("Missing Access"));
    }

    #[tokio::test]
    async fn verify_token_outcomes() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/users/@me")
            .match_header("authorization", "Bot good")
            .with_body(r#"{"id":"42","username":"velopool","bot":true}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/users/@me")
            .match_header("authorization", "Bot bad")
            .with_status(401)
            .create_async()
            .await;

        let http = reqwest::Client::new();
        assert_eq!(verify_token(&http, &server.url(), "good").await.unwrap(), "velopool");
        assert!(matches!(verify_token(&http, &server.url(), "bad").await, Err(EngineError::Auth(_))));
    }

    // ── Local gateway ──

    /// Accept one connection per script: send Hello, read Identify, then play
    /// the script. Returns the Identify payloads in connection order.
    async fn fake_gateway(listener: TcpListener, scripts: Vec<Vec<WsMessage>>) -> Vec<serde_json::Value> {
        let mut sessions = Vec::new();
        for script in scripts {
            let (tcp, _) = listener.accept().await.unwrap();
            sessions.push(tokio::spawn(async move {
                let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
                let hello = json!({ "op": 10, "d": { "heartbeat_interval": 45000 } });
                ws.send(WsMessage::Text(hello.to_string())).await.unwrap();
                let identify: serde_json::Value = match ws.next().await {
                    Some(Ok(WsMessage::Text(t))) => serde_json::from_str(&t).unwrap(),
                    other => panic!("expected identify, got {:?}", other),
                };
                for msg in script {
                    ws.send(msg).await.unwrap();
                }
                while let Some(Ok(_)) = ws.next().await {}
                identify
            }));
        }
        let mut identifies = Vec::new();
        for session in sessions {
            identifies.push(session.await.unwrap());
        }
        identifies
    }

    fn ready_then_reconnect() -> Vec<WsMessage> {
        let ready = json!({
            "op": 0, "s": 1, "t": "READY",
            "d": { "user": { "id": "42", "username": "velopool" } }
        });
        vec![
            WsMessage::Text(ready.to_string()),
            WsMessage::Text(json!({ "op": 7, "d": null }).to_string()),
        ]
    }

    #[tokio::test]
    async fn ready_fires_once_across_sessions() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}", listener.local_addr().unwrap());
        let server = tokio::spawn(fake_gateway(listener, vec![ready_then_reconnect(), ready_then_reconnect()]));

        let trigger = ReadyTrigger::new();
        let fired = AtomicUsize::new(0);
        let on_ready = || {
            fired.fetch_add(1, Ordering::SeqCst);
        };

        let first = run_gateway(&url, "tok", &trigger, &on_ready).await.unwrap();
        let second = run_gateway(&url, "tok", &trigger, &on_ready).await.unwrap();

        assert!(first.was_ready);
        assert!(second.was_ready);
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        let identifies = server.await.unwrap();
        assert_eq!(identifies.len(), 2);
        for identify in identifies {
            assert_eq!(identify["op"], 2);
            assert_eq!(identify["d"]["token"], "tok");
            assert_eq!(identify["d"]["intents"], 1);
        }
    }

    #[tokio::test]
    async fn invalid_token_close_is_fatal() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}", listener.local_addr().unwrap());
        let close = WsMessage::Close(Some(CloseFrame {
            code: CloseCode::from(4004),
            reason: "Authentication failed.".into(),
        }));
        let server = tokio::spawn(fake_gateway(listener, vec![vec![close]]));

        let trigger = ReadyTrigger::new();
        let fired = AtomicUsize::new(0);
        let on_ready = || {
            fired.fetch_add(1, Ordering::SeqCst);
        };

        let err = run_gateway(&url, "bad", &trigger, &on_ready).await.unwrap_err();
        assert!(is_fatal(&err));
        assert!(matches!(err, EngineError::Auth(_)));
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        server.await.unwrap();
    }
}
