//! In-memory session window over the live feed.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::types::Trade;

/// Bounded trade-feed window with duplicate suppression.
///
/// Reconnects can replay trades the session already saw; the window keys
/// duplicates by trade id, with FIFO eviction on both the window and the
/// seen-id set so memory stays bounded for the life of the session.
#[derive(Debug)]
pub struct TradeFeed {
    window: VecDeque<Trade>,
    capacity: usize,
    seen: HashSet<u64>,
    seen_order: VecDeque<u64>,
    seen_capacity: usize,
}

impl TradeFeed {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self::with_dedup_capacity(capacity, capacity.saturating_mul(8).max(1024))
    }

    pub fn with_dedup_capacity(capacity: usize, seen_capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let seen_capacity = seen_capacity.max(capacity);
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
            seen: HashSet::with_capacity(seen_capacity),
            seen_order: VecDeque::with_capacity(seen_capacity),
            seen_capacity,
        }
    }

    /// Append a trade to the window.
    ///
    /// Returns `false` for a duplicate trade id (reconnect overlap).
    pub fn push(&mut self, trade: Trade) -> bool {
        if self.seen.contains(&trade.tid) {
            return false;
        }
        if self.seen.len() >= self.seen_capacity {
            if let Some(old_tid) = self.seen_order.pop_front() {
                self.seen.remove(&old_tid);
            }
        }
        self.seen.insert(trade.tid);
        self.seen_order.push_back(trade.tid);

        if self.window.len() >= self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(trade);
        true
    }

    /// Append a batch; returns how many were new.
    pub fn extend<I: IntoIterator<Item = Trade>>(&mut self, trades: I) -> usize {
        let mut added = 0;
        for trade in trades {
            if self.push(trade) {
                added += 1;
            }
        }
        added
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    /// Window contents, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Trade> {
        self.window.iter()
    }

    pub fn latest(&self) -> Option<&Trade> {
        self.window.back()
    }
}

/// Latest known price per market, fed by REST mids and live trade prints.
#[derive(Debug, Default)]
pub struct MidTable {
    mids: HashMap<String, String>,
}

impl MidTable {
    /// Merge a mids mapping (REST `allMids` or a stream update).
    pub fn apply<I: IntoIterator<Item = (String, String)>>(&mut self, mids: I) {
        for (coin, px) in mids {
            self.mids.insert(coin, px);
        }
    }

    /// Fold one trade print into the table as the freshest price.
    pub fn apply_trade(&mut self, trade: &Trade) {
        self.mids.insert(trade.coin.clone(), trade.px.clone());
    }

    pub fn mid(&self, coin: &str) -> Option<&str> {
        self.mids.get(coin).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.mids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trade(coin: &str, tid: u64, px: &str) -> Trade {
        Trade {
            coin: coin.to_string(),
            side: "B".to_string(),
            px: px.to_string(),
            sz: "1.0".to_string(),
            time: tid,
            hash: "0x0".to_string(),
            tid,
            users: ("0xa".to_string(), "0xb".to_string()),
        }
    }

    #[test]
    fn test_duplicate_tid_rejected() {
        let mut feed = TradeFeed::new(8);
        assert!(feed.push(trade("BTC", 1, "10")));
        assert!(!feed.push(trade("BTC", 1, "10")));
        assert_eq!(feed.len(), 1);
    }

    #[test]
    fn test_window_evicts_oldest() {
        let mut feed = TradeFeed::new(2);
        feed.push(trade("BTC", 1, "10"));
        feed.push(trade("BTC", 2, "11"));
        feed.push(trade("BTC", 3, "12"));
        assert_eq!(feed.len(), 2);
        let tids: Vec<u64> = feed.iter().map(|t| t.tid).collect();
        assert_eq!(tids, vec![2, 3]);
        assert_eq!(feed.latest().map(|t| t.tid), Some(3));
    }

    #[test]
    fn test_extend_counts_new_only() {
        let mut feed = TradeFeed::new(8);
        feed.push(trade("BTC", 1, "10"));
        let added = feed.extend(vec![trade("BTC", 1, "10"), trade("BTC", 2, "11")]);
        assert_eq!(added, 1);
        assert_eq!(feed.len(), 2);
    }

    #[test]
    fn test_seen_set_eviction_is_bounded() {
        let mut feed = TradeFeed::with_dedup_capacity(2, 2);
        feed.push(trade("BTC", 1, "10"));
        feed.push(trade("BTC", 2, "11"));
        feed.push(trade("BTC", 3, "12"));
        // tid 1 was evicted from the seen set, so it is admitted again.
        assert!(feed.push(trade("BTC", 1, "10")));
    }

    #[test]
    fn test_mid_table_tracks_freshest_price() {
        let mut mids = MidTable::default();
        mids.apply(vec![("BTC".to_string(), "64000".to_string())]);
        assert_eq!(mids.mid("BTC"), Some("64000"));
        mids.apply_trade(&trade("BTC", 9, "65000"));
        assert_eq!(mids.mid("BTC"), Some("65000"));
        assert_eq!(mids.mid("ETH"), None);
    }
}
