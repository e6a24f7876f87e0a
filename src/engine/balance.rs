// Velopool Engine: Balance Oracle
// Reads an ERC-20 balance with a raw eth_call and rescales it by the
// token's decimals. No contract bindings, no caching.

use crate::atoms::error::EngineResult;
use crate::engine::evm::{encode_balance_call, Address, RpcClient};
use crate::engine::types::Balance;
use log::debug;
use num::BigUint;

/// Decode `balanceOf` return data as one big-endian unsigned integer.
/// Empty return data is a zero balance, not an error.
pub fn decode_balance(data: &[u8], decimals: u8) -> Balance {
    if data.is_empty() {
        return Balance::zero(decimals);
    }
    Balance::new(BigUint::from_bytes_be(data), decimals)
}

/// Fetch `holder`'s balance of `token` at the latest block.
pub async fn get_balance(
    rpc: &RpcClient,
    token: &Address,
    holder: &Address,
    decimals: u8,
) -> EngineResult<Balance> {
    let call = encode_balance_call(token, holder);
    let data = rpc.eth_call(&call).await?;
    let balance = decode_balance(&data, decimals);
    debug!("[balance] {} holds {} of {}", holder, balance.amount(), token);
    Ok(balance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use std::str::FromStr;

    fn word(raw: &BigUint) -> Vec<u8> {
        let bytes = raw.to_bytes_be();
        let mut out = vec![0u8; 32 - bytes.len()];
        out.extend_from_slice(&bytes);
        out
    }

    #[test]
    fn empty_payload_is_zero() {
        let bal = decode_balance(&[], 18);
        assert_eq!(bal, Balance::zero(18));
        assert_eq!(bal.to_display_f64().unwrap(), 0.0);
    }

    #[test]
    fn decodes_sdai_reserve() {
        let raw = BigUint::from_str("1000000000000000000000000").unwrap();
        let bal = decode_balance(&word(&raw), 18);
        assert_eq!(bal.to_display_f64().unwrap(), 1_000_000.0);
    }

    #[test]
    fn decodes_usdc_reserve() {
        let raw = BigUint::from(950_000u64 * 1_000_000);
        let bal = decode_balance(&word(&raw), 6);
        assert_eq!(bal.to_display_f64().unwrap(), 950_000.0);
    }

    #[test]
    fn decodes_full_width_word() {
        let max = decode_balance(&[0xFF; 32], 18);
        assert_eq!(max.raw().bits(), 256);
        assert!(max.to_display_f64().unwrap() > 1e58);
    }

    #[tokio::test]
    async fn get_balance_round_trip_through_rpc() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/")
            .match_body(Matcher::Regex("0x70a08231".into()))
            .with_body(r#"{"jsonrpc":"2.0","id":1,"result":"0x00000000000000000000000000000000000000000000000000000000dd40c600"}"#)
            .create_async()
            .await;

        let rpc = RpcClient::new(server.url());
        let token = Address::new([0x0b; 20]);
        let holder = Address::new([0x13; 20]);
        let bal = get_balance(&rpc, &token, &holder, 6).await.unwrap();
        // 0xdd40c600 = 3_712_009_728 raw = 3712.009728 USDC
        assert_eq!(bal.raw(), &BigUint::from(3_712_009_728u64));
        assert!((bal.to_display_f64().unwrap() - 3712.009728).abs() < 1e-9);
    }

    #[tokio::test]
    async fn get_balance_empty_result_is_zero() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/")
            .with_body(r#"{"jsonrpc":"2.0","id":1,"result":"0x"}"#)
            .create_async()
            .await;

        let rpc = RpcClient::new(server.url());
        let bal = get_balance(&rpc, &Address::new([1; 20]), &Address::new([2; 20]), 18).await.unwrap();
        assert_eq!(bal, Balance::zero(18));
    }

    #[tokio::test]
    async fn get_balance_propagates_transport_error() {
        let mut server = mockito::Server::new_async().await;
        server.mock("POST", "/").with_status(500).create_async().await;

        let rpc = RpcClient::new(server.url());
        assert!(get_balance(&rpc, &Address::new([1; 20]), &Address::new([2; 20]), 6).await.is_err());
    }
}
