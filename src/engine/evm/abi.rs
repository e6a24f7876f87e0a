// Velopool Engine: EVM ABI Encoding
// Hand-built calldata for the handful of read-only calls the reporter makes:
// ERC-20 balanceOf, Slipstream pool slot0, and the Slipstream QuoterV2 quote.

use super::primitives::{keccak256, Address};
use num::BigUint;

/// A read-only contract invocation: target contract plus ABI-encoded calldata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractCall {
    pub to: Address,
    pub data: Vec<u8>,
}

/// Compute 4-byte function selector from signature
pub(crate) fn function_selector(sig: &str) -> [u8; 4] {
    let hash = keccak256(sig.as_bytes());
    let mut sel = [0u8; 4];
    sel.copy_from_slice(&hash[..4]);
    sel
}

/// ABI-encode an address (left-padded to 32 bytes)
pub(crate) fn abi_encode_address(addr: &Address) -> [u8; 32] {
    let mut encoded = [0u8; 32];
    encoded[12..].copy_from_slice(addr.as_bytes());
    encoded
}

/// ABI-encode a uint256. Fails if the value does not fit in 256 bits.
pub(crate) fn abi_encode_uint256(val: &BigUint) -> Result<[u8; 32], String> {
    let bytes = val.to_bytes_be();
    if bytes.len() > 32 {
        return Err(format!("Value does not fit in uint256 ({} bytes)", bytes.len()));
    }
    let mut encoded = [0u8; 32];
    encoded[32 - bytes.len()..].copy_from_slice(&bytes);
    Ok(encoded)
}

/// ABI-encode a signed int24 as a sign-extended 32-byte word
pub(crate) fn abi_encode_int24(val: i32) -> [u8; 32] {
    let mut encoded = if val < 0 { [0xFFu8; 32] } else { [0u8; 32] };
    encoded[28..].copy_from_slice(&val.to_be_bytes());
    encoded
}

/// Decode the `index`-th 32-byte word of return data as an unsigned integer
pub(crate) fn decode_uint_word(data: &[u8], index: usize) -> Result<BigUint, String> {
    let start = index * 32;
    let word = data.get(start..start + 32).ok_or_else(|| {
        format!("Return data too short: {} bytes, need word {}", data.len(), index)
    })?;
    Ok(BigUint::from_bytes_be(word))
}

/// Encode ERC-20 `balanceOf(address)` for `holder` against the `token` contract.
/// The calldata is always 36 bytes: selector plus one padded address.
pub fn encode_balance_call(token: &Address, holder: &Address) -> ContractCall {
    let mut data = function_selector("balanceOf(address)").to_vec();
    data.extend_from_slice(&abi_encode_address(holder));
    ContractCall { to: *token, data }
}

/// Encode Slipstream / Uniswap V3 style `slot0()`
pub(crate) fn encode_slot0(pool: &Address) -> ContractCall {
    ContractCall { to: *pool, data: function_selector("slot0()").to_vec() }
}

/// Encode Slipstream QuoterV2.quoteExactInputSingle
/// quoteExactInputSingle((address,address,uint256,int24,uint160))
/// Slipstream keys pools by tick spacing rather than fee tier.
pub(crate) fn encode_quote_exact_input_single(
    quoter: &Address,
    token_in: &Address,
    token_out: &Address,
    amount_in: &BigUint,
    tick_spacing: i32,
) -> Result<ContractCall, String> {
    let mut data = function_selector("quoteExactInputSingle((address,address,uint256,int24,uint160))").to_vec();

    // Static struct, encoded inline
    data.extend_from_slice(&abi_encode_address(token_in));
    data.extend_from_slice(&abi_encode_address(token_out));
    data.extend_from_slice(&abi_encode_uint256(amount_in)?);
    data.extend_from_slice(&abi_encode_int24(tick_spacing));
    data.extend_from_slice(&[0u8; 32]); // sqrtPriceLimitX96 = 0 (no limit)
    Ok(ContractCall { to: *quoter, data })
}
