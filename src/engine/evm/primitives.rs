// Velopool Engine: EVM Primitives
// Core hex, keccak and address utilities.

use std::fmt;
use std::str::FromStr;

/// Keccak-256 hash (Ethereum's hash function)
pub(crate) fn keccak256(data: &[u8]) -> [u8; 32] {
    use tiny_keccak::{Hasher, Keccak};
    let mut hasher = Keccak::v256();
    let mut output = [0u8; 32];
    hasher.update(data);
    hasher.finalize(&mut output);
    output
}

/// Hex-encode bytes with 0x prefix
pub(crate) fn hex_encode(data: &[u8]) -> String {
    format!("0x{}", data.iter().map(|b| format!("{:02x}", b)).collect::<String>())
}

/// Hex-decode a 0x-prefixed string.
/// `"0x"` decodes to an empty vec. Odd-length minimal hex ("0x1a3") is
/// left-padded to even length.
pub(crate) fn hex_decode(s: &str) -> Result<Vec<u8>, String> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    if s.is_empty() {
        return Ok(Vec::new());
    }
    let padded;
    let hex_str = if s.len() % 2 != 0 {
        padded = format!("0{}", s);
        &padded
    } else {
        s
    };
    (0..hex_str.len())
        .step_by(2)
        .map(|i| {
            hex_str
                .get(i..i + 2)
                .ok_or_else(|| format!("Hex decode: non-ASCII input '{}'", s))
                .and_then(|pair| u8::from_str_radix(pair, 16).map_err(|e| format!("Hex decode: {}", e)))
        })
        .collect()
}

/// EIP-55 mixed-case checksum address
pub(crate) fn eip55_checksum(addr_bytes: &[u8]) -> String {
    let hex_addr: String = addr_bytes.iter().map(|b| format!("{:02x}", b)).collect();
    let hash = keccak256(hex_addr.as_bytes());
    let mut checksummed = String::with_capacity(42);
    checksummed.push_str("0x");
    for (i, c) in hex_addr.chars().enumerate() {
        let hash_nibble = if i % 2 == 0 { hash[i / 2] >> 4 } else { hash[i / 2] & 0x0f };
        if hash_nibble >= 8 {
            checksummed.push(c.to_ascii_uppercase());
        } else {
            checksummed.push(c);
        }
    }
    checksummed
}

// ── Address ────────────────────────────────────────────────────────────────

/// 20-byte EVM account or contract address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address([u8; 20]);

impl Address {
    pub const fn new(bytes: [u8; 20]) -> Self {
        Address(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl FromStr for Address {
    type Err = String;

    fn from_str(addr: &str) -> Result<Self, Self::Err> {
        let addr = addr.trim();
        if !addr.starts_with("0x") {
            return Err(format!("Address must be 0x-prefixed: '{}'", addr));
        }
        let bytes = hex_decode(addr)?;
        if bytes.len() != 20 {
            return Err(format!("Invalid address length: {} bytes (expected 20). Address: '{}'", bytes.len(), addr));
        }
        let mut arr = [0u8; 20];
        arr.copy_from_slice(&bytes);
        Ok(Address(arr))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&eip55_checksum(&self.0))
    }
}
