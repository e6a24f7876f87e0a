// Velopool Engine: EVM access
//
// Split into focused submodules:
//   primitives: keccak256, hex encode/decode, Address
//   abi:        calldata builders for balanceOf, slot0 and the Slipstream quoter
//   rpc:        JSON-RPC client (eth_call, eth_chainId)

pub mod abi;
pub mod primitives;
pub mod rpc;

pub use abi::{encode_balance_call, ContractCall};
pub use primitives::Address;
pub use rpc::RpcClient;
