//! Streaming session core.
//!
//! One logical connection to the venue: desired subscriptions are persisted
//! across transport failures and replayed on every reconnect, inbound
//! frames are classified and fanned out to registered listeners in arrival
//! order, and unexpected closures trigger bounded exponential-backoff
//! reconnection.

use std::sync::{
    atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering},
    Arc,
};
use std::time::Duration;

use futures_util::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use serde::Serialize;
use tokio::{net::TcpStream, spawn, sync::Mutex, time};
use tokio_tungstenite::{connect_async, tungstenite::protocol, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use crate::{
    prelude::*,
    registry::MarketRegistry,
    types::Trade,
    ws::{
        backoff::BackoffPolicy,
        message_types::InboundMessage,
        subscriptions::{Subscription, SubscriptionBook, SubscriptionSendData},
    },
    Error,
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, protocol::Message>;
type WsSource = SplitStream<WsStream>;

/// Where the session currently is in its lifecycle.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum ConnectionState {
    Disconnected = 0,
    Connecting = 1,
    Connected = 2,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => ConnectionState::Connecting,
            2 => ConnectionState::Connected,
            _ => ConnectionState::Disconnected,
        }
    }
}

/// Lock-free state cell; connection attempts gate on the
/// Disconnected -> Connecting transition so parallel transports can never
/// open.
struct StateCell(AtomicU8);

impl StateCell {
    fn new() -> Self {
        Self(AtomicU8::new(ConnectionState::Disconnected as u8))
    }

    fn get(&self) -> ConnectionState {
        ConnectionState::from_u8(self.0.load(Ordering::SeqCst))
    }

    fn set(&self, next: ConnectionState) {
        self.0.store(next as u8, Ordering::SeqCst);
    }

    fn swap(&self, next: ConnectionState) -> ConnectionState {
        ConnectionState::from_u8(self.0.swap(next as u8, Ordering::SeqCst))
    }

    /// Claim the right to open a transport. Fails when a session is already
    /// connecting or connected.
    fn begin_connect(&self) -> bool {
        self.0
            .compare_exchange(
                ConnectionState::Disconnected as u8,
                ConnectionState::Connecting as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
    }
}

/// Connection lifecycle configuration.
#[derive(Clone, Debug)]
pub struct StreamConfig {
    /// First reconnect delay; later attempts double it.
    pub base_delay: Duration,
    /// Consecutive failed reconnects tolerated before going terminal.
    pub max_attempts: u32,
    /// Application-level ping cadence while connected.
    pub ping_interval: Duration,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            max_attempts: 5,
            ping_interval: Duration::from_secs(30),
        }
    }
}

#[derive(Serialize)]
struct Ping {
    method: &'static str,
}

type ConnectListener = Box<dyn Fn() + Send + Sync>;
type DisconnectListener = Box<dyn Fn() + Send + Sync>;
type TradeListener = Box<dyn Fn(&Trade) + Send + Sync>;
type ErrorListener = Box<dyn Fn(&Error) + Send + Sync>;

#[derive(Default)]
struct Listeners {
    connect: Vec<ConnectListener>,
    disconnect: Vec<DisconnectListener>,
    trade: Vec<TradeListener>,
    error: Vec<ErrorListener>,
}

struct Shared {
    url: String,
    config: StreamConfig,
    state: StateCell,
    book: Mutex<SubscriptionBook>,
    listeners: Mutex<Listeners>,
    writer: Mutex<Option<WsSink>>,
    backoff: Mutex<BackoffPolicy>,
    /// Bumped on every transport open and every explicit disconnect; stale
    /// reader tasks, ping loops and retry timers check it before acting, so
    /// at most one of each is ever live.
    epoch: AtomicU64,
    user_closed: AtomicBool,
}

/// Manages one logical streaming session to the venue.
pub struct StreamManager {
    shared: Arc<Shared>,
}

impl StreamManager {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_config(url, StreamConfig::default())
    }

    pub fn with_config(url: impl Into<String>, config: StreamConfig) -> Self {
        let backoff = BackoffPolicy::new(config.base_delay, config.max_attempts);
        Self {
            shared: Arc::new(Shared {
                url: url.into(),
                config,
                state: StateCell::new(),
                book: Mutex::new(SubscriptionBook::default()),
                listeners: Mutex::new(Listeners::default()),
                writer: Mutex::new(None),
                backoff: Mutex::new(backoff),
                epoch: AtomicU64::new(0),
                user_closed: AtomicBool::new(false),
            }),
        }
    }

    /// Current lifecycle state.
    pub fn status(&self) -> ConnectionState {
        self.shared.state.get()
    }

    /// Open the streaming session.
    ///
    /// No-op when a session is already connecting or connected. On success
    /// the desired subscriptions have been replayed and `on_connect`
    /// listeners have run. An explicit call restores the full retry budget,
    /// including after the reconnect loop has gone terminal.
    pub async fn connect(&self) -> Result<()> {
        if !self.shared.state.begin_connect() {
            debug!("connect ignored: session already active");
            return Ok(());
        }
        self.shared.user_closed.store(false, Ordering::SeqCst);
        self.shared.backoff.lock().await.reset();

        let epoch = self.shared.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        match Shared::open_session(&self.shared, epoch).await {
            Ok(()) => Ok(()),
            Err(err) => {
                self.shared.teardown_if_current(epoch).await;
                Err(err)
            }
        }
    }

    /// Close the session without forgetting its subscriptions.
    ///
    /// Unlike an exhausted retry budget this is a caller decision, so no
    /// reconnect timer survives it; a later `connect()` resumes the same
    /// subscription set.
    pub async fn disconnect(&self) {
        self.shared.user_closed.store(true, Ordering::SeqCst);
        self.shared.epoch.fetch_add(1, Ordering::SeqCst);

        let previous = self.shared.state.swap(ConnectionState::Disconnected);
        if let Some(mut sink) = self.shared.writer.lock().await.take() {
            let _ = sink.send(protocol::Message::Close(None)).await;
        }
        if previous != ConnectionState::Disconnected {
            info!("stream closed");
            self.shared.notify_disconnect().await;
        }
    }

    /// Register interest in a channel.
    ///
    /// The subscription is persisted first and sent immediately only when
    /// the transport is already open, so a subscribe racing the connection
    /// handshake is never dropped: the replay pass picks it up instead.
    /// Idempotent for repeated identical subscriptions.
    pub async fn subscribe(&self, subscription: Subscription) -> Result<()> {
        let (newly_added, connected) = {
            let mut book = self.shared.book.lock().await;
            let newly_added = book.insert(subscription.clone());
            (
                newly_added,
                self.shared.state.get() == ConnectionState::Connected,
            )
        };
        if !newly_added {
            debug!(?subscription, "duplicate subscribe ignored");
            return Ok(());
        }
        if connected {
            if let Err(err) = self
                .shared
                .send_subscription("subscribe", &subscription)
                .await
            {
                // The desired set already holds the entry; replay covers it
                // once the transport comes back.
                warn!(%err, ?subscription, "subscribe send failed, will replay on reconnect");
            }
        }
        Ok(())
    }

    /// Drop interest in a channel. No-op when not currently subscribed.
    pub async fn unsubscribe(&self, subscription: Subscription) -> Result<()> {
        let (removed, connected) = {
            let mut book = self.shared.book.lock().await;
            let removed = book.remove(&subscription);
            (
                removed,
                self.shared.state.get() == ConnectionState::Connected,
            )
        };
        if !removed {
            return Ok(());
        }
        if connected {
            if let Err(err) = self
                .shared
                .send_subscription("unsubscribe", &subscription)
                .await
            {
                warn!(%err, ?subscription, "unsubscribe send failed");
            }
        }
        Ok(())
    }

    /// Subscribe to the trades channel for every market the registry knows.
    ///
    /// An unpopulated registry falls back to a fixed set of well-known
    /// markets so the feed is never silent while metadata is still loading.
    pub async fn subscribe_all_known_markets(&self, registry: &MarketRegistry) -> Result<()> {
        for coin in registry.coins_or_fallback() {
            self.subscribe(Subscription::Trades { coin }).await?;
        }
        Ok(())
    }

    pub async fn on_connect(&self, listener: impl Fn() + Send + Sync + 'static) {
        self.shared
            .listeners
            .lock()
            .await
            .connect
            .push(Box::new(listener));
    }

    pub async fn on_disconnect(&self, listener: impl Fn() + Send + Sync + 'static) {
        self.shared
            .listeners
            .lock()
            .await
            .disconnect
            .push(Box::new(listener));
    }

    pub async fn on_trade(&self, listener: impl Fn(&Trade) + Send + Sync + 'static) {
        self.shared
            .listeners
            .lock()
            .await
            .trade
            .push(Box::new(listener));
    }

    pub async fn on_error(&self, listener: impl Fn(&Error) + Send + Sync + 'static) {
        self.shared
            .listeners
            .lock()
            .await
            .error
            .push(Box::new(listener));
    }
}

impl Drop for StreamManager {
    fn drop(&mut self) {
        // Invalidate background tasks; they exit at their next wakeup.
        self.shared.user_closed.store(true, Ordering::SeqCst);
        self.shared.epoch.fetch_add(1, Ordering::SeqCst);
    }
}

impl Shared {
    /// Open a transport for `epoch`, replay the desired set, notify
    /// listeners and start the per-session tasks.
    // Returns a boxed future (rather than being a plain `async fn`) so the
    // opaque return type does not feed the read_loop -> retry_loop ->
    // open_session -> spawn(read_loop) `Send` auto-trait cycle; the concrete
    // `dyn Future + Send` boundary lets the compiler resolve each task's
    // `Send`-ness. Behavior is identical to the equivalent async fn.
    fn open_session<'a>(
        shared: &'a Arc<Shared>,
        epoch: u64,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let ws = connect_async(&shared.url)
                .await
                .map_err(|e| Error::Websocket(e.to_string()))?
                .0;
            let (sink, source) = ws.split();
            *shared.writer.lock().await = Some(sink);

            // Holding the book lock across the Connected flip keeps this replay
            // and a racing subscribe() from both sending the same entry.
            let replay = {
                let book = shared.book.lock().await;
                if shared.epoch.load(Ordering::SeqCst) != epoch {
                    return Err(Error::Websocket("connection superseded".to_string()));
                }
                shared.state.set(ConnectionState::Connected);
                book.replay()
            };
            shared.backoff.lock().await.reset();

            for subscription in &replay {
                shared.send_subscription("subscribe", subscription).await?;
            }
            info!(subscriptions = replay.len(), url = %shared.url, "stream connected");
            shared.notify_connect().await;

            spawn(Shared::read_loop(Arc::clone(shared), source, epoch));
            spawn(Shared::ping_loop(Arc::clone(shared), epoch));
            Ok(())
        })
    }

    /// Reset to Disconnected unless a newer session owns the state.
    async fn teardown_if_current(&self, epoch: u64) {
        if self.epoch.load(Ordering::SeqCst) == epoch {
            *self.writer.lock().await = None;
            self.state.set(ConnectionState::Disconnected);
        }
    }

    async fn send_subscription(&self, method: &'static str, subscription: &Subscription) -> Result<()> {
        let frame = serde_json::to_string(&SubscriptionSendData {
            method,
            subscription,
        })
        .map_err(|e| Error::JsonParse(e.to_string()))?;

        let mut writer = self.writer.lock().await;
        let Some(sink) = writer.as_mut() else {
            return Err(Error::WsSend("transport not open".to_string()));
        };
        sink.send(protocol::Message::Text(frame))
            .await
            .map_err(|e| Error::WsSend(e.to_string()))
    }

    async fn read_loop(shared: Arc<Shared>, mut source: WsSource, epoch: u64) {
        while let Some(frame) = source.next().await {
            if shared.epoch.load(Ordering::SeqCst) != epoch {
                return;
            }
            match frame {
                Ok(frame) => shared.handle_frame(frame).await,
                Err(err) => {
                    // Reported, but the state machine moves on the closure
                    // that follows, not on the error itself.
                    let err = Error::Websocket(err.to_string());
                    warn!(%err, "stream read error");
                    shared.notify_error(&err).await;
                    break;
                }
            }
        }
        shared.handle_closure(epoch).await;
    }

    async fn handle_frame(&self, frame: protocol::Message) {
        let text = match frame {
            protocol::Message::Text(text) => text,
            protocol::Message::Ping(_) | protocol::Message::Pong(_) => return,
            protocol::Message::Close(_) => return,
            other => {
                debug!(?other, "ignoring non-text frame");
                return;
            }
        };
        let message = match serde_json::from_str::<InboundMessage>(&text) {
            Ok(message) => message,
            Err(err) => {
                // Malformed payloads are swallowed with a diagnostic.
                debug!(%err, "undecodable stream payload");
                return;
            }
        };
        self.dispatch(message).await;
    }

    /// Fan one classified message out to its listener category. Runs on the
    /// single reader task, so dispatch order matches arrival order.
    async fn dispatch(&self, message: InboundMessage) {
        match message {
            InboundMessage::Trades(batch) => {
                let listeners = self.listeners.lock().await;
                for trade in &batch.data {
                    for listener in &listeners.trade {
                        listener(trade);
                    }
                }
            }
            InboundMessage::AllMids(msg) => {
                debug!(mids = msg.data.mids.len(), "mid-price update")
            }
            InboundMessage::L2Book(msg) => debug!(coin = %msg.data.coin, "book update"),
            InboundMessage::SubscriptionResponse => debug!("subscription acknowledged"),
            InboundMessage::Pong => debug!("pong"),
            InboundMessage::Unknown => {}
        }
    }

    /// The transport for `epoch` is gone. Decide between staying down
    /// (user-initiated or superseded) and entering the retry loop.
    async fn handle_closure(self: Arc<Shared>, epoch: u64) {
        if self.epoch.load(Ordering::SeqCst) != epoch {
            return;
        }
        *self.writer.lock().await = None;
        self.state.set(ConnectionState::Disconnected);
        self.notify_disconnect().await;

        if self.user_closed.load(Ordering::SeqCst) {
            return;
        }
        warn!("stream disconnected unexpectedly");
        self.retry_loop(epoch).await;
    }

    /// Bounded-backoff reconnection. Exactly one retry loop runs at a time;
    /// an explicit connect or disconnect invalidates it through the epoch.
    async fn retry_loop(self: Arc<Shared>, mut epoch: u64) {
        loop {
            let delay = {
                let mut backoff = self.backoff.lock().await;
                match backoff.next_delay() {
                    Some(delay) => {
                        info!(
                            attempt = backoff.attempts(),
                            delay_ms = delay.as_millis() as u64,
                            "reconnecting after backoff"
                        );
                        delay
                    }
                    None => {
                        error!("reconnect attempts exhausted, staying disconnected");
                        return;
                    }
                }
            };
            time::sleep(delay).await;

            if self.user_closed.load(Ordering::SeqCst)
                || self.epoch.load(Ordering::SeqCst) != epoch
            {
                return;
            }
            if !self.state.begin_connect() {
                // Someone else owns the lifecycle now.
                return;
            }
            epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
            match Shared::open_session(&self, epoch).await {
                Ok(()) => return,
                Err(err) => {
                    self.teardown_if_current(epoch).await;
                    warn!(%err, "reconnect attempt failed");
                    self.notify_error(&err).await;
                }
            }
        }
    }

    /// Application-level keepalive; the venue drops idle connections.
    async fn ping_loop(shared: Arc<Shared>, epoch: u64) {
        let mut ticker = time::interval(shared.config.ping_interval);
        ticker.tick().await; // first tick fires immediately
        loop {
            ticker.tick().await;
            if shared.epoch.load(Ordering::SeqCst) != epoch
                || shared.state.get() != ConnectionState::Connected
            {
                return;
            }
            let frame = match serde_json::to_string(&Ping { method: "ping" }) {
                Ok(frame) => frame,
                Err(err) => {
                    error!(%err, "ping serialization failed");
                    return;
                }
            };
            let mut writer = shared.writer.lock().await;
            let Some(sink) = writer.as_mut() else { return };
            if let Err(err) = sink.send(protocol::Message::Text(frame)).await {
                debug!(%err, "ping send failed");
                return;
            }
        }
    }

    async fn notify_connect(&self) {
        let listeners = self.listeners.lock().await;
        for listener in &listeners.connect {
            listener();
        }
    }

    async fn notify_disconnect(&self) {
        let listeners = self.listeners.lock().await;
        for listener in &listeners.disconnect {
            listener();
        }
    }

    async fn notify_error(&self, err: &Error) {
        let listeners = self.listeners.lock().await;
        for listener in &listeners.error {
            listener(err);
        }
    }
}
