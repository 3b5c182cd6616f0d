//! Inbound frame classification for the venue stream.

use serde::Deserialize;

use crate::{
    serde_utils::one_or_many,
    types::{AllMidsData, L2BookData, Trade},
};

/// One decoded inbound frame, keyed by the `channel` discriminant.
///
/// Categories outside this closed set land in `Unknown` and are dropped by
/// the dispatcher without error.
#[derive(Deserialize, Clone, Debug)]
#[serde(tag = "channel")]
#[serde(rename_all = "camelCase")]
pub enum InboundMessage {
    Trades(TradesMsg),
    AllMids(AllMidsMsg),
    L2Book(L2BookMsg),
    SubscriptionResponse,
    Pong,
    #[serde(other)]
    Unknown,
}

/// Trade batch. The venue sends a lone record or an array; both normalize
/// to a flat sequence, so batch boundaries are not preserved.
#[derive(Deserialize, Clone, Debug)]
pub struct TradesMsg {
    #[serde(deserialize_with = "one_or_many")]
    pub data: Vec<Trade>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct AllMidsMsg {
    pub data: AllMidsData,
}

#[derive(Deserialize, Clone, Debug)]
pub struct L2BookMsg {
    pub data: L2BookData,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trade_json(tid: u64) -> String {
        format!(
            r#"{{"coin":"BTC","side":"B","px":"65000.0","sz":"0.1","time":{tid},"hash":"0xa","tid":{tid},"users":["0x1","0x2"]}}"#
        )
    }

    #[test]
    fn test_trade_batch_preserves_order() {
        let raw = format!(
            r#"{{"channel":"trades","data":[{},{},{}]}}"#,
            trade_json(1),
            trade_json(2),
            trade_json(3)
        );
        let message: InboundMessage = serde_json::from_str(&raw).unwrap();
        match message {
            InboundMessage::Trades(batch) => {
                let tids: Vec<u64> = batch.data.iter().map(|t| t.tid).collect();
                assert_eq!(tids, vec![1, 2, 3]);
            }
            other => panic!("expected trades, got {other:?}"),
        }
    }

    #[test]
    fn test_single_trade_normalizes_to_batch_of_one() {
        let raw = format!(r#"{{"channel":"trades","data":{}}}"#, trade_json(9));
        let message: InboundMessage = serde_json::from_str(&raw).unwrap();
        match message {
            InboundMessage::Trades(batch) => {
                assert_eq!(batch.data.len(), 1);
                assert_eq!(batch.data[0].tid, 9);
            }
            other => panic!("expected trades, got {other:?}"),
        }
    }

    #[test]
    fn test_subscription_ack_ignores_payload() {
        let raw = r#"{"channel":"subscriptionResponse","data":{"method":"subscribe","subscription":{"type":"trades","coin":"BTC"}}}"#;
        let message: InboundMessage = serde_json::from_str(raw).unwrap();
        assert!(matches!(message, InboundMessage::SubscriptionResponse));
    }

    #[test]
    fn test_all_mids_payload() {
        let raw = r#"{"channel":"allMids","data":{"mids":{"BTC":"65000.0","ETH":"3000.0"}}}"#;
        let message: InboundMessage = serde_json::from_str(raw).unwrap();
        match message {
            InboundMessage::AllMids(msg) => {
                assert_eq!(msg.data.mids.len(), 2);
                assert_eq!(msg.data.mids["BTC"], "65000.0");
            }
            other => panic!("expected allMids, got {other:?}"),
        }
    }

    #[test]
    fn test_unrecognized_channel_is_unknown() {
        let raw = r#"{"channel":"notification","data":{"notification":"hello"}}"#;
        let message: InboundMessage = serde_json::from_str(raw).unwrap();
        assert!(matches!(message, InboundMessage::Unknown));
    }

    #[test]
    fn test_pong() {
        let message: InboundMessage = serde_json::from_str(r#"{"channel":"pong"}"#).unwrap();
        assert!(matches!(message, InboundMessage::Pong));
    }

    #[test]
    fn test_malformed_payload_is_an_error() {
        assert!(serde_json::from_str::<InboundMessage>(r#"{"data": 1}"#).is_err());
        assert!(serde_json::from_str::<InboundMessage>("not json").is_err());
    }
}
