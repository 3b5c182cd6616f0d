//! Common shared types.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Order book price level with quantity and order count.
#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct OrderBookLevel {
    /// Price at this level
    pub px: String,
    /// Total size at this level
    pub sz: String,
    /// Number of orders at this level
    pub n: u64,
}

/// Payload of a mid-price update: latest mid per coin.
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct AllMidsData {
    pub mids: HashMap<String, String>,
}
