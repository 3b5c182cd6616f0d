#![deny(unreachable_pub)]

// Core modules
mod consts;
mod errors;
mod helpers;
mod prelude;
mod req;

// Shared utilities
pub mod serde_utils;
pub mod types;

// Feature modules
pub mod feed;
pub mod info;
mod meta;
pub mod pnl;
pub mod registry;
pub mod ws;

// Re-exports
pub use consts::{FALLBACK_COINS, LOCAL_API_URL, MAINNET_API_URL, TESTNET_API_URL};
pub use errors::Error;
pub use feed::{MidTable, TradeFeed};
pub use helpers::BaseUrl;
pub use info::{InfoClient, InfoRequest};
pub use meta::{AssetContext, AssetMeta, Meta};
pub use pnl::{
    compute_realized_pnl, summarize_fills, AssetPnlSummary, Fill, PortfolioPnlSummary, Side,
};
pub use registry::MarketRegistry;
pub use types::*;
pub use ws::{ConnectionState, StreamConfig, StreamManager, Subscription};
