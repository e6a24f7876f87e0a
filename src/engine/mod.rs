// Velopool Engine
//
// evm and types hold the chain-facing primitives; balance, pricing, format
// and report turn chain state into a message; pipeline sequences one cycle;
// discord, trigger and config wire it to the outside world.

pub mod balance;
pub mod config;
pub mod discord;
pub mod evm;
pub mod format;
pub mod pipeline;
pub mod pricing;
pub mod report;
pub mod trigger;
pub mod types;
