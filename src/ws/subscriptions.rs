//! Subscription identity and desired-set bookkeeping.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Persistent interest in one streaming channel.
///
/// Identity is structural: the derived `Eq`/`Hash` make the desired set
/// treat repeated subscribe calls for the same channel+coin as one entry.
/// Serializes to the venue wire form, e.g. `{"type":"trades","coin":"BTC"}`.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq, Hash)]
#[serde(tag = "type")]
#[serde(rename_all = "camelCase")]
pub enum Subscription {
    /// All mid prices for the namespace.
    AllMids,
    /// Trade feed for one market.
    Trades { coin: String },
    /// L2 order book updates for one market.
    L2Book { coin: String },
}

/// Outbound subscribe/unsubscribe frame.
#[derive(Serialize)]
pub(crate) struct SubscriptionSendData<'a> {
    pub(crate) method: &'static str,
    pub(crate) subscription: &'a Subscription,
}

/// The desired-subscription set: what the session should be subscribed to,
/// independent of whether a transport is currently open.
#[derive(Debug, Default)]
pub(crate) struct SubscriptionBook {
    desired: HashSet<Subscription>,
}

impl SubscriptionBook {
    /// Returns `true` when the subscription is structurally new.
    pub(crate) fn insert(&mut self, subscription: Subscription) -> bool {
        self.desired.insert(subscription)
    }

    /// Returns `true` when the subscription was present.
    pub(crate) fn remove(&mut self, subscription: &Subscription) -> bool {
        self.desired.remove(subscription)
    }

    /// Entries to replay after a (re)connect, each exactly once.
    pub(crate) fn replay(&self) -> Vec<Subscription> {
        self.desired.iter().cloned().collect()
    }
}
