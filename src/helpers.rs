use rust_decimal::Decimal;

use crate::consts::{LOCAL_API_URL, MAINNET_API_URL, TESTNET_API_URL};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BaseUrl {
    Localhost,
    Testnet,
    Mainnet,
}

impl BaseUrl {
    pub fn get_url(&self) -> String {
        match self {
            BaseUrl::Localhost => LOCAL_API_URL.to_string(),
            BaseUrl::Testnet => TESTNET_API_URL.to_string(),
            BaseUrl::Mainnet => MAINNET_API_URL.to_string(),
        }
    }

    /// Streaming endpoint derived from the http(s) url.
    pub fn get_ws_url(&self) -> String {
        format!("ws{}/ws", &self.get_url()[4..])
    }
}

/// Parse a venue decimal string, normalizing unparseable input to zero.
pub(crate) fn decimal_or_zero(s: &str) -> Decimal {
    s.parse().unwrap_or(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_ws_url_derivation() {
        assert_eq!(BaseUrl::Mainnet.get_ws_url(), "wss://api.hyperliquid.xyz/ws");
        assert_eq!(BaseUrl::Localhost.get_ws_url(), "ws://localhost:3001/ws");
    }

    #[test]
    fn test_decimal_or_zero() {
        assert_eq!(decimal_or_zero("65000.5"), dec!(65000.5));
        assert_eq!(decimal_or_zero("-1.25"), dec!(-1.25));
        assert_eq!(decimal_or_zero("garbage"), Decimal::ZERO);
        assert_eq!(decimal_or_zero(""), Decimal::ZERO);
    }
}
