//! Realized-PNL computation over a wallet's fill history.
//!
//! Matching is FIFO: every buy opens a lot in arrival order, every sell
//! consumes from the oldest open lot first. Only matched (buy, sell)
//! quantity realizes PNL; open lots and unmatched sell remainders
//! contribute nothing. Volume and trade counts accumulate for every fill
//! independent of matching.

use std::collections::{BTreeMap, VecDeque};

use rust_decimal::Decimal;
use serde::Serialize;

use crate::{helpers::decimal_or_zero, types::UserFill};

/// Fill side.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Side {
    Buy,
    Sell,
}

/// One executed trade leg, normalized for matching.
#[derive(Clone, Debug, PartialEq)]
pub struct Fill {
    pub coin: String,
    pub px: Decimal,
    pub sz: Decimal,
    pub side: Side,
    pub time: u64,
}

impl From<&UserFill> for Fill {
    fn from(raw: &UserFill) -> Self {
        Fill {
            coin: raw.coin.clone(),
            px: decimal_or_zero(&raw.px),
            sz: decimal_or_zero(&raw.sz),
            side: if raw.side == "B" { Side::Buy } else { Side::Sell },
            time: raw.time,
        }
    }
}

/// An open buy quantity awaiting FIFO consumption by later sells.
#[derive(Clone, Debug)]
struct Lot {
    px: Decimal,
    remaining: Decimal,
}

/// Realized PNL, volume and trade count for a single asset.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AssetPnlSummary {
    pub coin: String,
    pub realized_pnl: Decimal,
    pub volume: Decimal,
    pub trade_count: u64,
}

/// Aggregate over all per-asset summaries. Totals are exact sums of the
/// per-asset rows; `assets` is sorted by coin.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct PortfolioPnlSummary {
    pub total_realized_pnl: Decimal,
    pub total_volume: Decimal,
    pub total_trades: u64,
    pub assets: Vec<AssetPnlSummary>,
}

/// Compute the realized-PNL breakdown for a sequence of fills.
///
/// Fills are stably sorted by execution time ascending before matching, so
/// callers may pass API order verbatim. Output is a pure function of the
/// input: identical fills yield an identical summary.
pub fn compute_realized_pnl(fills: &[Fill]) -> PortfolioPnlSummary {
    let mut ordered: Vec<&Fill> = fills.iter().collect();
    ordered.sort_by_key(|fill| fill.time);

    let mut by_coin: BTreeMap<&str, Vec<&Fill>> = BTreeMap::new();
    for fill in ordered {
        by_coin.entry(fill.coin.as_str()).or_default().push(fill);
    }

    let assets: Vec<AssetPnlSummary> = by_coin
        .into_iter()
        .map(|(coin, fills)| asset_summary(coin, &fills))
        .collect();

    let mut summary = PortfolioPnlSummary {
        assets,
        ..Default::default()
    };
    for asset in &summary.assets {
        summary.total_realized_pnl += asset.realized_pnl;
        summary.total_volume += asset.volume;
        summary.total_trades += asset.trade_count;
    }
    summary
}

/// Convenience over raw venue fill records.
pub fn summarize_fills(fills: &[UserFill]) -> PortfolioPnlSummary {
    let fills: Vec<Fill> = fills.iter().map(Fill::from).collect();
    compute_realized_pnl(&fills)
}

fn asset_summary(coin: &str, fills: &[&Fill]) -> AssetPnlSummary {
    let mut volume = Decimal::ZERO;
    let mut trade_count = 0u64;
    let mut lots: VecDeque<Lot> = VecDeque::new();
    let mut sells: Vec<&Fill> = Vec::new();

    for fill in fills {
        volume += fill.px * fill.sz;
        trade_count += 1;
        if fill.sz <= Decimal::ZERO {
            // Counted above, never matched.
            continue;
        }
        match fill.side {
            Side::Buy => lots.push_back(Lot {
                px: fill.px,
                remaining: fill.sz,
            }),
            Side::Sell => sells.push(fill),
        }
    }

    let mut realized = Decimal::ZERO;
    for sell in sells {
        let mut unmatched = sell.sz;
        while unmatched > Decimal::ZERO {
            let Some(front) = lots.front_mut() else {
                // Short position or missing history: the remainder realizes
                // nothing.
                break;
            };
            let matched = unmatched.min(front.remaining);
            realized += (sell.px - front.px) * matched;
            unmatched -= matched;
            front.remaining -= matched;
            if front.remaining.is_zero() {
                lots.pop_front();
            }
        }
    }

    AssetPnlSummary {
        coin: coin.to_string(),
        realized_pnl: realized,
        volume,
        trade_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn fill(coin: &str, px: Decimal, sz: Decimal, side: Side, time: u64) -> Fill {
        Fill {
            coin: coin.to_string(),
            px,
            sz,
            side,
            time,
        }
    }

    #[test]
    fn test_empty_input_is_all_zero() {
        let summary = compute_realized_pnl(&[]);
        assert_eq!(summary.total_realized_pnl, Decimal::ZERO);
        assert_eq!(summary.total_volume, Decimal::ZERO);
        assert_eq!(summary.total_trades, 0);
        assert!(summary.assets.is_empty());
    }

    #[test]
    fn test_only_buys_realize_nothing() {
        let fills = vec![
            fill("BTC", dec!(10), dec!(1), Side::Buy, 1),
            fill("BTC", dec!(20), dec!(2), Side::Buy, 2),
        ];
        let summary = compute_realized_pnl(&fills);
        assert_eq!(summary.total_realized_pnl, Decimal::ZERO);
        assert_eq!(summary.total_volume, dec!(50));
        assert_eq!(summary.total_trades, 2);
    }

    #[test]
    fn test_only_sells_realize_nothing() {
        let fills = vec![
            fill("BTC", dec!(10), dec!(1), Side::Sell, 1),
            fill("BTC", dec!(20), dec!(2), Side::Sell, 2),
        ];
        let summary = compute_realized_pnl(&fills);
        assert_eq!(summary.total_realized_pnl, Decimal::ZERO);
        assert_eq!(summary.total_volume, dec!(50));
        assert_eq!(summary.total_trades, 2);
    }

    #[test]
    fn test_fifo_matches_oldest_first() {
        // Buys at 10 then 20, one sell of 2 at 15: oldest-first matching
        // nets to zero, where best-price-first would not.
        let fills = vec![
            fill("BTC", dec!(10), dec!(1), Side::Buy, 1),
            fill("BTC", dec!(20), dec!(1), Side::Buy, 2),
            fill("BTC", dec!(15), dec!(2), Side::Sell, 3),
        ];
        let summary = compute_realized_pnl(&fills);
        assert_eq!(summary.total_realized_pnl, Decimal::ZERO);
    }

    #[test]
    fn test_partial_match_leaves_open_lot() {
        let fills = vec![
            fill("BTC", dec!(10), dec!(5), Side::Buy, 1),
            fill("BTC", dec!(12), dec!(2), Side::Sell, 2),
        ];
        let summary = compute_realized_pnl(&fills);
        assert_eq!(summary.total_realized_pnl, dec!(4));
        assert_eq!(summary.total_volume, dec!(74));
        assert_eq!(summary.total_trades, 2);
    }

    #[test]
    fn test_sell_consumes_across_lots() {
        let fills = vec![
            fill("BTC", dec!(10), dec!(1), Side::Buy, 1),
            fill("BTC", dec!(11), dec!(1), Side::Buy, 2),
            fill("BTC", dec!(14), dec!(1.5), Side::Sell, 3),
        ];
        // (14-10)*1 + (14-11)*0.5 = 5.5
        let summary = compute_realized_pnl(&fills);
        assert_eq!(summary.total_realized_pnl, dec!(5.5));
    }

    #[test]
    fn test_unmatched_sell_remainder_realizes_nothing() {
        let fills = vec![
            fill("BTC", dec!(10), dec!(1), Side::Buy, 1),
            fill("BTC", dec!(12), dec!(3), Side::Sell, 2),
        ];
        let summary = compute_realized_pnl(&fills);
        assert_eq!(summary.total_realized_pnl, dec!(2));
        assert_eq!(summary.total_trades, 2);
    }

    #[test]
    fn test_queue_is_built_from_all_buys_before_matching() {
        // Partition semantics: the sell matches even though its buy arrives
        // later in the sequence.
        let fills = vec![
            fill("BTC", dec!(12), dec!(1), Side::Sell, 1),
            fill("BTC", dec!(10), dec!(1), Side::Buy, 2),
        ];
        let summary = compute_realized_pnl(&fills);
        assert_eq!(summary.total_realized_pnl, dec!(2));
    }

    #[test]
    fn test_multi_asset_totals_are_sums_of_rows() {
        let fills = vec![
            fill("BTC", dec!(10), dec!(1), Side::Buy, 1),
            fill("ETH", dec!(100), dec!(2), Side::Buy, 2),
            fill("BTC", dec!(15), dec!(1), Side::Sell, 3),
        ];
        let summary = compute_realized_pnl(&fills);
        assert_eq!(summary.assets.len(), 2);
        assert_eq!(summary.assets[0].coin, "BTC");
        assert_eq!(summary.assets[0].realized_pnl, dec!(5));
        assert_eq!(summary.assets[0].trade_count, 2);
        assert_eq!(summary.assets[1].coin, "ETH");
        assert_eq!(summary.assets[1].realized_pnl, Decimal::ZERO);
        assert_eq!(summary.total_realized_pnl, dec!(5));
        assert_eq!(summary.total_volume, dec!(225));
        assert_eq!(summary.total_trades, 3);
    }

    #[test]
    fn test_out_of_order_input_is_sorted_by_time() {
        let fills = vec![
            fill("BTC", dec!(15), dec!(2), Side::Sell, 3),
            fill("BTC", dec!(20), dec!(1), Side::Buy, 2),
            fill("BTC", dec!(10), dec!(1), Side::Buy, 1),
        ];
        // After the time sort this is the oldest-first FIFO case again.
        let summary = compute_realized_pnl(&fills);
        assert_eq!(summary.total_realized_pnl, Decimal::ZERO);
    }

    #[test]
    fn test_zero_size_fill_counts_but_never_matches() {
        let fills = vec![
            fill("BTC", dec!(10), dec!(0), Side::Buy, 1),
            fill("BTC", dec!(12), dec!(1), Side::Sell, 2),
        ];
        let summary = compute_realized_pnl(&fills);
        // The zero-size buy opens no lot, so the sell finds nothing.
        assert_eq!(summary.total_realized_pnl, Decimal::ZERO);
        assert_eq!(summary.total_trades, 2);
        assert_eq!(summary.total_volume, dec!(12));
    }

    #[test]
    fn test_idempotent_over_identical_input() {
        let fills = vec![
            fill("BTC", dec!(10), dec!(1), Side::Buy, 1),
            fill("BTC", dec!(11.5), dec!(0.4), Side::Sell, 2),
            fill("ETH", dec!(100), dec!(2), Side::Buy, 3),
        ];
        assert_eq!(compute_realized_pnl(&fills), compute_realized_pnl(&fills));
    }

    fn raw_fill(coin: &str, side: &str, px: &str, sz: &str, time: u64) -> UserFill {
        UserFill {
            coin: coin.to_string(),
            side: side.to_string(),
            px: px.to_string(),
            sz: sz.to_string(),
            time,
            hash: "0x0".to_string(),
            start_position: "0.0".to_string(),
            dir: String::new(),
            closed_pnl: "0.0".to_string(),
            oid: 1,
            crossed: true,
            fee: "0.0".to_string(),
            fee_token: "USDC".to_string(),
            tid: time,
            cloid: None,
        }
    }

    #[test]
    fn test_raw_records_normalize_sides_and_numbers() {
        let raw = vec![
            raw_fill("BTC", "B", "10", "1", 1),
            raw_fill("BTC", "A", "15", "1", 2),
        ];
        let summary = summarize_fills(&raw);
        assert_eq!(summary.total_realized_pnl, dec!(5));
    }

    #[test]
    fn test_unparseable_numbers_contribute_zero() {
        let raw = vec![
            raw_fill("BTC", "B", "not-a-number", "1", 1),
            raw_fill("BTC", "A", "15", "bogus", 2),
        ];
        let summary = summarize_fills(&raw);
        // px -> 0 still opens a lot of size 1; sz -> 0 never matches.
        assert_eq!(summary.total_realized_pnl, Decimal::ZERO);
        assert_eq!(summary.total_volume, Decimal::ZERO);
        assert_eq!(summary.total_trades, 2);
    }
}
