use async_trait::async_trait;
use chrono::TimeZone;
use pulsefleet::connection::codec::PulseCodec;
use pulsefleet::connection::Connection;
use pulsefleet::core::config::ReconnectConfig;
use pulsefleet::core::errors::ClientError;
use pulsefleet::core::kernel::WsSession;
use pulsefleet::core::types::{PointsReport, ServerEvent};
use pulsefleet::Fleet;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{sleep, Instant};

/// Scripted transport behavior, one item per inbound read.
enum MockFrame {
    Event(ServerEvent),
    ParseError,
    TransportError,
    Closed,
}

#[derive(Default)]
struct MockState {
    /// Outcome per connect call; once exhausted, connects succeed.
    connect_failures: VecDeque<bool>,
    frames: VecDeque<MockFrame>,
    connect_times: Vec<Instant>,
    keepalives: usize,
    closes: usize,
    connected: bool,
    /// Force `is_connected` to report false (socket died under us)
    report_closed: bool,
}

#[derive(Clone, Default)]
struct MockHandle(Arc<Mutex<MockState>>);

impl MockHandle {
    fn session(&self) -> MockSession {
        MockSession(self.clone())
    }

    fn script_connects(&self, failures: &[bool]) {
        self.0.lock().unwrap().connect_failures = failures.iter().copied().collect();
    }

    fn script_frames(&self, frames: Vec<MockFrame>) {
        self.0.lock().unwrap().frames = frames.into_iter().collect();
    }

    fn set_report_closed(&self, closed: bool) {
        self.0.lock().unwrap().report_closed = closed;
    }

    fn connect_calls(&self) -> usize {
        self.0.lock().unwrap().connect_times.len()
    }

    fn connect_offsets(&self, start: Instant) -> Vec<u64> {
        self.0
            .lock()
            .unwrap()
            .connect_times
            .iter()
            .map(|t| t.duration_since(start).as_secs())
            .collect()
    }

    fn keepalives(&self) -> usize {
        self.0.lock().unwrap().keepalives
    }

    fn closes(&self) -> usize {
        self.0.lock().unwrap().closes
    }
}

struct MockSession(MockHandle);

#[async_trait]
impl WsSession<PulseCodec> for MockSession {
    async fn connect(&mut self) -> Result<(), ClientError> {
        let mut state = self.0 .0.lock().unwrap();
        state.connect_times.push(Instant::now());
        let fail = state.connect_failures.pop_front().unwrap_or(false);
        if fail {
            state.connected = false;
            Err(ClientError::NetworkError("connection refused".to_string()))
        } else {
            state.connected = true;
            Ok(())
        }
    }

    async fn send_keepalive(&mut self) -> Result<(), ClientError> {
        let mut state = self.0 .0.lock().unwrap();
        if !state.connected {
            return Err(ClientError::NetworkError("not connected".to_string()));
        }
        state.keepalives += 1;
        Ok(())
    }

    async fn next_message(&mut self) -> Option<Result<ServerEvent, ClientError>> {
        let frame = self.0 .0.lock().unwrap().frames.pop_front();
        match frame {
            None => futures::future::pending().await,
            Some(MockFrame::Event(event)) => Some(Ok(event)),
            Some(MockFrame::ParseError) => Some(Err(ClientError::DeserializationError(
                "bad frame".to_string(),
            ))),
            Some(MockFrame::TransportError) => {
                self.0 .0.lock().unwrap().connected = false;
                Some(Err(ClientError::NetworkError("reset by peer".to_string())))
            }
            Some(MockFrame::Closed) => {
                self.0 .0.lock().unwrap().connected = false;
                None
            }
        }
    }

    async fn close(&mut self) -> Result<(), ClientError> {
        let mut state = self.0 .0.lock().unwrap();
        state.closes += 1;
        state.connected = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        let state = self.0 .0.lock().unwrap();
        state.connected && !state.report_closed
    }
}

fn pulse_event() -> ServerEvent {
    ServerEvent::Pulse(PointsReport {
        date: chrono::Utc
            .timestamp_millis_opt(1_700_000_000_000)
            .single()
            .unwrap(),
        points_today: 5.0,
        points_total: 50.0,
    })
}

fn spawn_connection(
    handle: &MockHandle,
) -> (watch::Sender<bool>, tokio::task::JoinHandle<()>) {
    let connection = Connection::new(
        1,
        handle.session(),
        ReconnectConfig::default(),
        Duration::from_secs(10),
    );
    let (tx, rx) = watch::channel(false);
    (tx, tokio::spawn(connection.run(rx)))
}

#[tokio::test(start_paused = true)]
async fn backoff_schedule_matches_capped_doubling_then_gives_up() {
    let handle = MockHandle::default();
    handle.script_connects(&[true, true, true, true, true, true]);
    let start = Instant::now();
    let (tx, task) = spawn_connection(&handle);

    // Retries land at +2s, +4s, +8s, +16s, +30s after the initial attempt.
    sleep(Duration::from_secs(61)).await;
    assert_eq!(handle.connect_offsets(start), vec![0, 2, 6, 14, 30, 60]);

    // Exhausted: no further attempts, no timers, fully inert.
    sleep(Duration::from_secs(120)).await;
    assert_eq!(handle.connect_calls(), 6);
    assert_eq!(handle.keepalives(), 0);

    tx.send(true).unwrap();
    task.await.unwrap();
    // Nothing was ever open, so shutdown issues no close request.
    assert_eq!(handle.closes(), 0);
}

#[tokio::test(start_paused = true)]
async fn successful_open_resets_the_retry_budget() {
    let handle = MockHandle::default();
    // Fail once, connect, lose the socket, then reconnect cleanly.
    handle.script_connects(&[true, false]);
    handle.script_frames(vec![MockFrame::Closed]);
    let start = Instant::now();
    let (tx, task) = spawn_connection(&handle);

    sleep(Duration::from_secs(5)).await;
    // The post-close backoff is 2s again, not 4s: the successful open at +2s
    // reset the attempt counter.
    assert_eq!(handle.connect_offsets(start), vec![0, 2, 4]);

    tx.send(true).unwrap();
    task.await.unwrap();
    assert_eq!(handle.closes(), 1);
}

#[tokio::test(start_paused = true)]
async fn keepalive_ticks_every_ten_seconds_while_open() {
    let handle = MockHandle::default();
    let (tx, task) = spawn_connection(&handle);

    sleep(Duration::from_secs(35)).await;
    assert_eq!(handle.keepalives(), 3);

    // Transport no longer reports open: ticks are skipped silently.
    handle.set_report_closed(true);
    sleep(Duration::from_secs(30)).await;
    assert_eq!(handle.keepalives(), 3);

    tx.send(true).unwrap();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn parse_failure_does_not_trigger_reconnect() {
    let handle = MockHandle::default();
    handle.script_frames(vec![
        MockFrame::ParseError,
        MockFrame::Event(pulse_event()),
        MockFrame::ParseError,
    ]);
    let (tx, task) = spawn_connection(&handle);

    sleep(Duration::from_secs(15)).await;
    // Still on the original connect; parse errors never touch the transport.
    assert_eq!(handle.connect_calls(), 1);

    tx.send(true).unwrap();
    task.await.unwrap();
    assert_eq!(handle.closes(), 1);
}

#[tokio::test(start_paused = true)]
async fn transport_error_enters_backoff() {
    let handle = MockHandle::default();
    handle.script_frames(vec![MockFrame::TransportError]);
    let start = Instant::now();
    let (tx, task) = spawn_connection(&handle);

    sleep(Duration::from_secs(3)).await;
    // Initial connect plus one retry 2s after the error.
    assert_eq!(handle.connect_offsets(start), vec![0, 2]);

    tx.send(true).unwrap();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn fleet_starts_one_connection_per_credential_in_order() {
    let recorded = Arc::new(Mutex::new(Vec::new()));
    let handles = Arc::new(Mutex::new(Vec::new()));

    let fleet = {
        let recorded = Arc::clone(&recorded);
        let handles = Arc::clone(&handles);
        Fleet::start_with(
            vec!["tok-a".to_string(), "tok-b".to_string(), "tok-c".to_string()],
            move |index, token| {
                recorded.lock().unwrap().push((index, token));
                let handle = MockHandle::default();
                let session = handle.session();
                handles.lock().unwrap().push(handle);
                Connection::new(
                    index,
                    session,
                    ReconnectConfig::default(),
                    Duration::from_secs(10),
                )
            },
        )
    };

    assert_eq!(fleet.len(), 3);
    assert_eq!(
        *recorded.lock().unwrap(),
        vec![
            (1, "tok-a".to_string()),
            (2, "tok-b".to_string()),
            (3, "tok-c".to_string()),
        ]
    );

    sleep(Duration::from_secs(1)).await;
    fleet.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn empty_fleet_starts_nothing_and_shuts_down_cleanly() {
    let fleet = Fleet::start_with(Vec::new(), |index, _token| {
        Connection::<PulseCodec, MockSession>::new(
            index,
            MockHandle::default().session(),
            ReconnectConfig::default(),
            Duration::from_secs(10),
        )
    });
    assert!(fleet.is_empty());
    fleet.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn shutdown_closes_exactly_the_open_connections() {
    // Connection 1 opens and stays open; 2 and 3 burn through their retry
    // budgets and give up.
    let handles: Vec<MockHandle> = (0..3).map(|_| MockHandle::default()).collect();
    handles[1].script_connects(&[true; 6]);
    handles[2].script_connects(&[true; 6]);

    let fleet = {
        let handles = handles.clone();
        Fleet::start_with(
            vec!["a".to_string(), "b".to_string(), "c".to_string()],
            move |index, _token| {
                Connection::new(
                    index,
                    handles[index - 1].session(),
                    ReconnectConfig::default(),
                    Duration::from_secs(10),
                )
            },
        )
    };

    // Long enough for 2 and 3 to reach the terminal state.
    sleep(Duration::from_secs(61)).await;

    fleet.shutdown().await;

    assert_eq!(handles[0].closes(), 1);
    assert_eq!(handles[1].closes(), 0);
    assert_eq!(handles[2].closes(), 0);
    // The open connection kept its single keepalive timer running the whole
    // time: one tick per 10s, none after shutdown.
    assert_eq!(handles[0].keepalives(), 6);
}
