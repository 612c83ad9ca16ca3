use crate::connection::codec::PulseCodec;
use crate::connection::Connection;
use crate::core::config::AppConfig;
use crate::core::kernel::{TungsteniteWs, WsCodec, WsSession};
use crate::core::types::ServerEvent;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::warn;

/// The full set of concurrently managed connections for one process run.
///
/// Membership is fixed at startup: one connection per credential, indexed
/// 1..N in credential order. Each connection runs as its own task; the fleet
/// only holds the join handles and the shutdown channel.
pub struct Fleet {
    handles: Vec<JoinHandle<()>>,
    shutdown: watch::Sender<bool>,
}

impl Fleet {
    /// Start one real WebSocket connection per credential.
    ///
    /// Startup is fully concurrent: every connection is spawned immediately,
    /// with no waiting for any of them to reach the open state.
    pub fn start(credentials: Vec<String>, config: &AppConfig) -> Self {
        let ws = config.ws.clone();
        let reconnect = config.reconnect.clone();
        Self::start_with(credentials, move |index, token| {
            let session = TungsteniteWs::new(
                ws.session_url(&token),
                format!("account-{index:02}"),
                PulseCodec,
                &ws,
            );
            Connection::new(index, session, reconnect.clone(), ws.ping_interval())
        })
    }

    /// Start the fleet with a caller-supplied connection factory.
    ///
    /// The factory receives the 1-based account index and the credential.
    pub fn start_with<C, S, F>(credentials: Vec<String>, mut make: F) -> Self
    where
        C: WsCodec<Message = ServerEvent>,
        S: WsSession<C> + 'static,
        F: FnMut(usize, String) -> Connection<C, S>,
    {
        let (shutdown, _) = watch::channel(false);
        let handles = credentials
            .into_iter()
            .enumerate()
            .map(|(rank, token)| {
                let connection = make(rank + 1, token);
                let rx = shutdown.subscribe();
                tokio::spawn(connection.run(rx))
            })
            .collect();
        Self { handles, shutdown }
    }

    /// Number of connections in the fleet.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Request graceful shutdown and wait for every connection to wind down.
    ///
    /// Each connection holding an open or pending transport stops its
    /// keepalive timer and sends a transport close, logging the closure;
    /// backed-off and given-up connections simply exit.
    pub async fn shutdown(self) {
        warn!("Terminating all connections...");
        let _ = self.shutdown.send(true);
        for handle in self.handles {
            let _ = handle.await;
        }
    }
}
