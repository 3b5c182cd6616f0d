pub const MAINNET_API_URL: &str = "https://api.hyperliquid.xyz";
pub const TESTNET_API_URL: &str = "https://api.hyperliquid-testnet.xyz";
pub const LOCAL_API_URL: &str = "http://localhost:3001";

/// Markets subscribed when the registry has not been populated yet, so the
/// feed is never completely silent while metadata is still loading.
pub const FALLBACK_COINS: &[&str] = &["BTC", "ETH", "SOL", "HYPE"];
