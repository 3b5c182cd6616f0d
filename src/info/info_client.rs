use std::collections::HashMap;

use alloy::primitives::Address;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::{
    meta::{AssetContext, Meta},
    prelude::*,
    req::HttpClient,
    types::UserFill,
    BaseUrl, Error,
};

/// Request body for the `/info` endpoint, discriminated by `type`.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(tag = "type")]
#[serde(rename_all = "camelCase")]
pub enum InfoRequest {
    /// Market universe/metadata. Use `dex` to scope to a HIP-3 namespace.
    #[serde(rename_all = "camelCase")]
    Meta {
        #[serde(skip_serializing_if = "Option::is_none")]
        dex: Option<String>,
    },
    /// Metadata plus live asset contexts (funding, OI, premium, volume).
    #[serde(rename_all = "camelCase")]
    MetaAndAssetCtxs {
        #[serde(skip_serializing_if = "Option::is_none")]
        dex: Option<String>,
    },
    /// Current mid prices, coin -> price string.
    #[serde(rename_all = "camelCase")]
    AllMids {
        #[serde(skip_serializing_if = "Option::is_none")]
        dex: Option<String>,
    },
    /// A wallet's fill history.
    UserFills { user: Address },
    /// Wallet account/positions snapshot.
    #[serde(rename = "clearinghouseState")]
    #[serde(rename_all = "camelCase")]
    UserState {
        user: Address,
        #[serde(skip_serializing_if = "Option::is_none")]
        dex: Option<String>,
    },
}

#[derive(Debug)]
pub struct InfoClient {
    pub(crate) http_client: HttpClient,
}

impl InfoClient {
    pub fn new(client: Option<Client>, base_url: Option<BaseUrl>) -> InfoClient {
        let client = client.unwrap_or_default();
        let base_url = base_url.unwrap_or(BaseUrl::Mainnet).get_url();

        InfoClient {
            http_client: HttpClient { client, base_url },
        }
    }

    async fn send_info_request<T: for<'a> Deserialize<'a>>(
        &self,
        info_request: InfoRequest,
    ) -> Result<T> {
        let data =
            serde_json::to_string(&info_request).map_err(|e| Error::JsonParse(e.to_string()))?;

        let return_data = self.http_client.post("/info", data).await?;
        serde_json::from_str(&return_data).map_err(|e| Error::JsonParse(e.to_string()))
    }

    /// Market universe for the namespace. `dex: None` queries validator perps.
    pub async fn meta(&self, dex: Option<&str>) -> Result<Meta> {
        let input = InfoRequest::Meta {
            dex: dex.map(String::from),
        };
        self.send_info_request(input).await
    }

    /// Metadata plus live asset contexts; the arrays are parallel by index.
    pub async fn meta_and_asset_contexts(
        &self,
        dex: Option<&str>,
    ) -> Result<(Meta, Vec<AssetContext>)> {
        let input = InfoRequest::MetaAndAssetCtxs {
            dex: dex.map(String::from),
        };
        self.send_info_request(input).await
    }

    /// Current mid prices for the namespace.
    pub async fn all_mids(&self, dex: Option<&str>) -> Result<HashMap<String, String>> {
        let input = InfoRequest::AllMids {
            dex: dex.map(String::from),
        };
        self.send_info_request(input).await
    }

    /// A wallet's raw fill history, API order (execution time ascending).
    pub async fn user_fills(&self, address: Address) -> Result<Vec<UserFill>> {
        let input = InfoRequest::UserFills { user: address };
        self.send_info_request(input).await
    }

    /// Wallet account/positions snapshot, passed through undecoded.
    pub async fn clearinghouse_state(
        &self,
        address: Address,
        dex: Option<&str>,
    ) -> Result<serde_json::Value> {
        let input = InfoRequest::UserState {
            user: address,
            dex: dex.map(String::from),
        };
        self.send_info_request(input).await
    }
}
