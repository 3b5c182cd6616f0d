//! Known-market registry.
//!
//! Explicit owned state in place of ambient tables: the host populates it
//! from the venue `meta` response and hands references to whoever needs the
//! market universe.

use crate::{
    consts::FALLBACK_COINS,
    meta::{AssetMeta, Meta},
};

#[derive(Clone, Debug, Default)]
pub struct MarketRegistry {
    universe: Vec<AssetMeta>,
}

impl MarketRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_meta(meta: Meta) -> Self {
        Self {
            universe: meta.universe,
        }
    }

    /// Replace the universe with a fresh `meta` response.
    pub fn update(&mut self, meta: Meta) {
        self.universe = meta.universe;
    }

    pub fn is_empty(&self) -> bool {
        self.universe.is_empty()
    }

    pub fn len(&self) -> usize {
        self.universe.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AssetMeta> {
        self.universe.iter()
    }

    pub fn get(&self, coin: &str) -> Option<&AssetMeta> {
        self.universe.iter().find(|asset| asset.name == coin)
    }

    /// Tradable coins, delisted markets filtered out.
    pub fn coins(&self) -> Vec<String> {
        self.universe
            .iter()
            .filter(|asset| !asset.is_delisted.unwrap_or(false))
            .map(|asset| asset.name.clone())
            .collect()
    }

    /// Coins to subscribe at startup: the known universe when populated,
    /// the fixed fallback set otherwise.
    pub fn coins_or_fallback(&self) -> Vec<String> {
        if self.universe.is_empty() {
            FALLBACK_COINS.iter().map(|coin| coin.to_string()).collect()
        } else {
            self.coins()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(name: &str, delisted: bool) -> AssetMeta {
        AssetMeta {
            name: name.to_string(),
            sz_decimals: 4,
            max_leverage: 10,
            only_isolated: None,
            is_delisted: delisted.then_some(true),
        }
    }

    #[test]
    fn test_empty_registry_falls_back() {
        let registry = MarketRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.coins_or_fallback(), FALLBACK_COINS);
    }

    #[test]
    fn test_populated_registry_uses_universe() {
        let registry = MarketRegistry::from_meta(Meta {
            universe: vec![asset("XAU", false), asset("SPX", false)],
        });
        assert_eq!(registry.coins_or_fallback(), vec!["XAU", "SPX"]);
        assert!(registry.get("SPX").is_some());
        assert!(registry.get("BTC").is_none());
    }

    #[test]
    fn test_delisted_markets_are_filtered() {
        let registry = MarketRegistry::from_meta(Meta {
            universe: vec![asset("XAU", false), asset("OLD", true)],
        });
        assert_eq!(registry.coins(), vec!["XAU"]);
        assert_eq!(registry.len(), 2);
    }
}
