// Velopool Constants
// Pool, token and contract addresses on Optimism, plus reporting defaults.

/// Velodrome Slipstream CL1-USDC/sDAI pool
pub const POOL_ADDRESS: &str = "0x131525f3FA23d65DC2B1EB8B6483a28c43B06916";
pub const POOL_NAME: &str = "Velodrome CL1-USDC/sDAI pool";
/// CL1 pools use a tick spacing of 1
pub const POOL_TICK_SPACING: i32 = 1;

pub const USDC_ADDRESS: &str = "0x0b2C639c533813f4Aa9D7837CAf62653d097Ff85";
pub const USDC_DECIMALS: u8 = 6;

pub const SDAI_ADDRESS: &str = "0x2218a117083f5B482B0bB821d27056Ba9c04b1D3";
pub const SDAI_DECIMALS: u8 = 18;

/// Slipstream QuoterV2 on Optimism
pub const SLIPSTREAM_QUOTER_V2: &str = "0x89D8218ed5fF1e46d8dcd33fb0bbeE8A4a1e3Eb5";

pub const OPTIMISM_CHAIN_ID: u64 = 10;

/// Trade size used for the slippage simulation, in display units of the trade token
pub const NOTIONAL_UNITS: u64 = 100;
pub const NOTIONAL_TOKEN: &str = "USDC";

pub const DISCORD_GATEWAY_URL: &str = "wss://gateway.discord.gg/?v=10&encoding=json";
pub const DISCORD_API: &str = "https://discord.com/api/v10";
