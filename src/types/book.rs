//! Order book types.

use serde::{Deserialize, Serialize};

use crate::types::OrderBookLevel;

/// L2 book snapshot: bid levels then ask levels.
#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct L2BookData {
    pub coin: String,
    pub levels: Vec<Vec<OrderBookLevel>>,
    pub time: u64,
}
