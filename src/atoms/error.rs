// ── Velopool Atoms: Error Types ────────────────────────────────────────────
// Single canonical error enum for the reporter, built with `thiserror`.
//
// Design rules:
//   • Variants are coarse-grained by domain (RPC, Decode, Channel…).
//   • The `#[from]` attribute wires std/external error conversions automatically.
//   • No variant carries secret material (bot tokens, RPC keys) in its message.

use thiserror::Error;

// ── Primary error enum ─────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum EngineError {
    /// JSON serialization / deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP / network failure (reqwest layer).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The node answered with a JSON-RPC error object, or a malformed envelope.
    #[error("RPC error: {method}: {message}")]
    Rpc { method: String, message: String },

    /// Contract return data or hex payload could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),

    /// The pricing engine could not produce a quote.
    #[error("Quote error: {0}")]
    Quote(String),

    /// Channel / bridge failure.
    #[error("Channel error: {channel}: {message}")]
    Channel { channel: String, message: String },

    /// Process configuration is invalid or missing.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Authentication / authorization failure.
    #[error("Auth error: {0}")]
    Auth(String),

    /// Catch-all for errors that do not yet have a dedicated variant.
    #[error("{0}")]
    Other(String),
}

// ── Convenience constructors ───────────────────────────────────────────────

impl EngineError {
    /// Create an RPC error with method name and message.
    pub fn rpc(method: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rpc { method: method.into(), message: message.into() }
    }

    /// Create a channel error with name and message.
    pub fn channel(channel: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Channel { channel: channel.into(), message: message.into() }
    }
}

// ── String → EngineError ───────────────────────────────────────────────────
// Allows `?` on helpers that return `Result<T, String>`.

impl From<String> for EngineError {
    fn from(s: String) -> Self {
        EngineError::Other(s)
    }
}

impl From<&str> for EngineError {
    fn from(s: &str) -> Self {
        EngineError::Other(s.to_string())
    }
}

// ── Convenience alias ──────────────────────────────────────────────────────

/// All engine operations should return this type.
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rpc_error_display() {
        let e = EngineError::rpc("eth_call", "execution reverted");
        assert_eq!(e.to_string(), "RPC error: eth_call: execution reverted");
    }

    #[test]
    fn json_failure_converts_to_serialization() {
        let e: EngineError = serde_json::from_str::<u8>("nope").unwrap_err().into();
        assert!(matches!(e, EngineError::Serialization(_)));
    }

    #[test]
    fn string_converts_to_other() {
        let e: EngineError = "boom".into();
        assert!(matches!(e, EngineError::Other(ref m) if m == "boom"));
    }
}
