pub mod codec;

use crate::core::config::ReconnectConfig;
use crate::core::kernel::{WsCodec, WsSession};
use crate::core::types::ServerEvent;
use crate::display;
use std::marker::PhantomData;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{self, Instant};
use tracing::{error, info, warn};

/// Lifecycle state of one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Connecting,
    Open,
    Backoff,
    GaveUp,
}

enum OpenOutcome {
    Disconnected,
    Shutdown,
}

/// One credential's autonomous connection lifecycle:
/// connect -> open (keepalive + message dispatch) -> backoff -> retry,
/// ending in `GaveUp` once the retry budget is exhausted.
///
/// Generic over the session so tests can drive the state machine through a
/// scripted transport.
pub struct Connection<C, S>
where
    C: WsCodec<Message = ServerEvent>,
    S: WsSession<C>,
{
    index: usize,
    session: S,
    state: ConnectionState,
    reconnect_attempts: u32,
    reconnect: ReconnectConfig,
    ping_interval: Duration,
    _codec: PhantomData<C>,
}

impl<C, S> Connection<C, S>
where
    C: WsCodec<Message = ServerEvent>,
    S: WsSession<C>,
{
    /// # Arguments
    /// * `index` - 1-based account index, used only for log correlation
    pub fn new(
        index: usize,
        session: S,
        reconnect: ReconnectConfig,
        ping_interval: Duration,
    ) -> Self {
        Self {
            index,
            session,
            state: ConnectionState::Idle,
            reconnect_attempts: 0,
            reconnect,
            ping_interval,
            _codec: PhantomData,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Drive the connection until shutdown is requested or the retry budget
    /// runs out. Fire-and-forget: outcomes surface only through logs.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let prefix = display::account_prefix(self.index);
        loop {
            self.state = ConnectionState::Connecting;
            let result = tokio::select! {
                result = self.session.connect() => result,
                _ = shutdown.changed() => {
                    // A pending handshake still holds a transport; close it.
                    self.close_for_shutdown().await;
                    return;
                }
            };

            match result {
                Ok(()) => {
                    self.state = ConnectionState::Open;
                    self.reconnect_attempts = 0;
                    info!("{} > Connected to WebSocket server", prefix);
                    if matches!(self.drive_open(&mut shutdown).await, OpenOutcome::Shutdown) {
                        self.close_for_shutdown().await;
                        return;
                    }
                }
                Err(e) => error!("{} > Connection error: {}", prefix, e),
            }

            match self.next_backoff() {
                Some(delay) => {
                    self.state = ConnectionState::Backoff;
                    warn!("{} > Reconnecting in {} seconds...", prefix, delay.as_secs());
                    tokio::select! {
                        () = time::sleep(delay) => {}
                        _ = shutdown.changed() => return,
                    }
                }
                None => {
                    self.state = ConnectionState::GaveUp;
                    error!(
                        "{} > Max reconnection attempts reached. Check connection.",
                        prefix
                    );
                    // Inert until the orchestrator tears the fleet down.
                    let _ = shutdown.changed().await;
                    return;
                }
            }
        }
    }

    /// Steady state: interleave keepalive ticks and inbound messages until
    /// the transport drops or shutdown is requested. Events for this
    /// connection are handled strictly in arrival order; nothing here races
    /// with its own close handling.
    async fn drive_open(&mut self, shutdown: &mut watch::Receiver<bool>) -> OpenOutcome {
        let prefix = display::account_prefix(self.index);
        // The interval lives only inside the open state, so dropping it on
        // any exit path is the timer stop, and stopping twice is impossible.
        let mut keepalive =
            time::interval_at(Instant::now() + self.ping_interval, self.ping_interval);

        loop {
            tokio::select! {
                _ = shutdown.changed() => return OpenOutcome::Shutdown,
                _ = keepalive.tick() => self.emit_keepalive(&prefix).await,
                message = self.session.next_message() => match message {
                    Some(Ok(event)) => info!("{}", display::event_line(self.index, &event)),
                    Some(Err(e)) if !e.is_transport_fatal() => {
                        error!("{} > Error parsing message: {}", prefix, e);
                    }
                    Some(Err(e)) => {
                        error!("{} > WebSocket error: {}", prefix, e);
                        return OpenOutcome::Disconnected;
                    }
                    None => {
                        warn!("{} > Connection closed", prefix);
                        return OpenOutcome::Disconnected;
                    }
                },
            }
        }
    }

    async fn emit_keepalive(&mut self, prefix: &str) {
        // Skip silently when the transport is not open at tick time.
        if !self.session.is_connected() {
            return;
        }
        match self.session.send_keepalive().await {
            Ok(()) => info!("{} > Ping sent at {}", prefix, display::now_clock()),
            // The read side observes the disconnect and enters backoff.
            Err(e) => error!("{} > Failed to send ping: {}", prefix, e),
        }
    }

    /// Consume one reconnect attempt; `None` once the budget is exhausted.
    fn next_backoff(&mut self) -> Option<Duration> {
        if self.reconnect_attempts >= self.reconnect.max_attempts {
            return None;
        }
        self.reconnect_attempts += 1;
        Some(self.reconnect.delay_for(self.reconnect_attempts))
    }

    async fn close_for_shutdown(&mut self) {
        warn!(
            "{} > Closing connection",
            display::account_prefix(self.index)
        );
        let _ = self.session.close().await;
        self.state = ConnectionState::Idle;
    }
}
