//! Terminal dashboard over the venue data core: market analytics, a live
//! trade feed, and realized-PNL lookup for a wallet.

use std::sync::{Arc, Mutex};

use alloy::primitives::Address;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use hyperdash::{
    pnl, BaseUrl, InfoClient, MarketRegistry, MidTable, StreamManager, TradeFeed,
};

#[derive(Parser, Debug)]
#[command(
    name = "dashboard",
    about = "Live trade feed and wallet PNL for Hyperliquid HIP-3 markets"
)]
struct Args {
    /// Wallet address to compute realized PNL for
    #[arg(long)]
    wallet: Option<String>,

    /// HIP-3 dex namespace to scope metadata and mids to
    #[arg(long)]
    dex: Option<String>,

    /// Use the testnet API endpoints
    #[arg(long)]
    testnet: bool,

    /// Trade feed window size
    #[arg(long, default_value_t = 512)]
    window: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let base_url = if args.testnet {
        BaseUrl::Testnet
    } else {
        BaseUrl::Mainnet
    };
    let info_client = InfoClient::new(None, Some(base_url));
    let dex = args.dex.as_deref();

    // Market universe plus live analytics context; the arrays are parallel.
    let (meta, contexts) = info_client.meta_and_asset_contexts(dex).await?;
    let registry = MarketRegistry::from_meta(meta);
    info!(markets = registry.len(), "market registry loaded");
    for (asset, ctx) in registry.iter().zip(contexts.iter()) {
        info!(
            coin = %asset.name,
            funding = %ctx.funding,
            open_interest = %ctx.open_interest,
            day_volume = %ctx.day_ntl_vlm,
            mark = %ctx.mark_px,
            "market context"
        );
    }

    if let Some(wallet) = &args.wallet {
        let user: Address = wallet
            .parse()
            .map_err(|_| hyperdash::Error::InvalidAddress(wallet.clone()))?;
        let fills = info_client.user_fills(user).await?;
        let summary = pnl::summarize_fills(&fills);
        info!(
            wallet = %user,
            realized_pnl = %summary.total_realized_pnl,
            volume = %summary.total_volume,
            trades = summary.total_trades,
            "wallet summary"
        );
        for asset in &summary.assets {
            info!(
                coin = %asset.coin,
                realized_pnl = %asset.realized_pnl,
                volume = %asset.volume,
                trades = asset.trade_count,
                "asset pnl"
            );
        }
    }

    let feed = Arc::new(Mutex::new(TradeFeed::new(args.window)));
    let mids = Arc::new(Mutex::new(MidTable::default()));
    let initial_mids = info_client.all_mids(dex).await?;
    if let Ok(mut table) = mids.lock() {
        table.apply(initial_mids);
    }

    let manager = StreamManager::new(base_url.get_ws_url());
    {
        let feed = Arc::clone(&feed);
        let mids = Arc::clone(&mids);
        manager
            .on_trade(move |trade| {
                let fresh = feed
                    .lock()
                    .map(|mut window| window.push(trade.clone()))
                    .unwrap_or(false);
                if fresh {
                    if let Ok(mut table) = mids.lock() {
                        table.apply_trade(trade);
                    }
                    info!(
                        coin = %trade.coin,
                        px = %trade.px,
                        sz = %trade.sz,
                        side = %trade.side,
                        "trade"
                    );
                }
            })
            .await;
        manager
            .on_error(|err| warn!(%err, "stream error"))
            .await;
    }

    manager.connect().await?;
    manager.subscribe_all_known_markets(&registry).await?;

    info!("streaming; ctrl-c to exit");
    tokio::signal::ctrl_c().await?;
    manager.disconnect().await;

    if let Ok(window) = feed.lock() {
        info!(trades = window.len(), "session window at exit");
    }
    Ok(())
}
