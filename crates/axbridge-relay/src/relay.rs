use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use axbridge_frame::{FrameConfig, FrameReader, FrameWriter};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::context::{ConnectionContext, ConnectionState, ConnectionStatus};
use crate::error::{RelayError, Result};
use crate::heartbeat;
use crate::message::{Command, Inbound};
use crate::pending::{Delivery, PendingTable};

/// Default deadline for a command round trip.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

const READER_THREAD_NAME: &str = "axbridge-reader";

/// Callback for inbound messages that answer no pending request.
pub type EventHandler = Arc<dyn Fn(Value) + Send + Sync>;

type BoxedReader = FrameReader<Box<dyn Read + Send>>;
type BoxedWriter = FrameWriter<Box<dyn Write + Send>>;

/// Relay behavior configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Deadline used by [`Relay::request`].
    pub default_timeout: Duration,
    /// Frame limits applied in both directions.
    pub frame: FrameConfig,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            default_timeout: DEFAULT_COMMAND_TIMEOUT,
            frame: FrameConfig::default(),
        }
    }
}

/// One native-messaging connection shared by any number of callers.
///
/// A single reader thread owns the inbound stream and routes each message:
/// pings are answered inline, responses wake the caller waiting on their id,
/// everything else goes to the event handler. Writes from callers and from
/// the reader are serialized through one mutex so frames never interleave.
pub struct Relay {
    context: ConnectionContext,
    pending: PendingTable,
    writer: Mutex<BoxedWriter>,
    reader: Mutex<Option<BoxedReader>>,
    event_handler: Option<EventHandler>,
    config: RelayConfig,
    started: AtomicBool,
}

impl Relay {
    /// Create a relay over an inbound and an outbound byte stream.
    pub fn new<R, W>(reader: R, writer: W) -> Self
    where
        R: Read + Send + 'static,
        W: Write + Send + 'static,
    {
        Self::with_config(reader, writer, RelayConfig::default())
    }

    /// Create a relay with explicit configuration.
    pub fn with_config<R, W>(reader: R, writer: W, config: RelayConfig) -> Self
    where
        R: Read + Send + 'static,
        W: Write + Send + 'static,
    {
        let reader: Box<dyn Read + Send> = Box::new(reader);
        let writer: Box<dyn Write + Send> = Box::new(writer);
        Self {
            context: ConnectionContext::new(),
            pending: PendingTable::new(),
            writer: Mutex::new(FrameWriter::with_config(writer, config.frame.clone())),
            reader: Mutex::new(Some(FrameReader::with_config(reader, config.frame.clone()))),
            event_handler: None,
            config,
            started: AtomicBool::new(false),
        }
    }

    /// A relay with no extension behind it.
    ///
    /// It is never started, so every command reports not connected.
    pub fn detached(config: RelayConfig) -> Self {
        Self::with_config(io::empty(), io::sink(), config)
    }

    /// Route unmatched inbound messages to `handler`.
    pub fn with_event_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(Value) + Send + Sync + 'static,
    {
        self.event_handler = Some(Arc::new(handler));
        self
    }

    /// Spawn the reader thread and wait until it is reading.
    ///
    /// Can be called once per relay. A relay stopped before it was started
    /// stays stopped and returns [`RelayError::NotConnected`].
    pub fn start(self: &Arc<Self>) -> Result<JoinHandle<()>> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(RelayError::AlreadyStarted);
        }
        let reader = self
            .reader
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(RelayError::AlreadyStarted)?;

        if self.context.transition(ConnectionState::Connecting).is_none() {
            return Err(RelayError::NotConnected);
        }

        let (ready_tx, ready_rx) = mpsc::channel();
        let relay = Arc::clone(self);
        let handle = thread::Builder::new()
            .name(READER_THREAD_NAME.to_string())
            .spawn(move || relay.run(reader, ready_tx))
            .map_err(|err| {
                self.context.transition(ConnectionState::Disconnected);
                RelayError::Spawn(err)
            })?;

        // The thread signals once it is connected; a closed channel means it
        // already exited, which the state reflects.
        let _ = ready_rx.recv();
        Ok(handle)
    }

    /// Operator stop. Terminal: the relay never reconnects.
    ///
    /// Waiting callers wake with [`RelayError::ConnectionLost`]. A reader
    /// blocked on the inbound stream exits at its next message or EOF.
    pub fn stop(&self) {
        if let Some(previous) = self.context.transition(ConnectionState::Stopped) {
            tracing::info!(previous = %previous, "relay stopped");
        }
        self.pending.close_all();
    }

    pub fn state(&self) -> ConnectionState {
        self.context.state()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    pub fn context(&self) -> &ConnectionContext {
        &self.context
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn has_pending(&self, id: &str) -> bool {
        self.pending.contains(id)
    }

    /// Snapshot of state and counters.
    pub fn status(&self) -> ConnectionStatus {
        self.context.snapshot(self.pending.len())
    }

    /// [`Relay::send_command`] with the configured default timeout.
    pub fn request(&self, action: &str, params: Value) -> Result<Value> {
        self.send_command(action, params, self.config.default_timeout)
    }

    /// Send one command and block until its response, a timeout, or a
    /// disconnect.
    ///
    /// The response is returned without its `id` field. `Null` params are
    /// sent as `{}`.
    pub fn send_command(&self, action: &str, params: Value, timeout: Duration) -> Result<Value> {
        if !self.is_connected() {
            return Err(RelayError::NotConnected);
        }

        let id = self.context.next_request_id();
        let params = match params {
            Value::Null => Value::Object(Map::new()),
            other => other,
        };
        let pending = self.pending.register(id.clone());

        // The reader marks the connection down before waking waiters, so a
        // registration that raced a disconnect is caught here.
        if !self.is_connected() {
            return Err(RelayError::NotConnected);
        }

        let command = Command {
            id: &id,
            action,
            params: &params,
        };
        self.write(&command)?;
        tracing::debug!(id = %id, action, "command sent");

        match pending.wait(timeout) {
            Ok(mut message) => {
                message.remove("id");
                tracing::debug!(id = %id, action, "response received");
                Ok(Value::Object(message))
            }
            Err(err) => {
                tracing::warn!(id = %id, action, error = %err, "command failed");
                Err(err)
            }
        }
    }

    fn write<M: Serialize + ?Sized>(&self, message: &M) -> Result<()> {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writer.write_message(message)?;
        Ok(())
    }

    fn run(self: Arc<Self>, mut reader: BoxedReader, ready: mpsc::Sender<()>) {
        self.context.transition(ConnectionState::Connected);
        let _ = ready.send(());
        tracing::info!("reader started");

        loop {
            match reader.read_message() {
                Ok(message) => {
                    self.context.record_message();
                    if self.context.state() == ConnectionState::Stopped {
                        break;
                    }
                    self.dispatch(message);
                }
                Err(err) if err.is_eof() => {
                    tracing::info!("extension closed the connection");
                    break;
                }
                Err(err) => {
                    tracing::error!(error = %err, "protocol error on inbound stream");
                    break;
                }
            }
        }

        self.context.transition(ConnectionState::Disconnected);
        self.pending.close_all();
        tracing::info!(state = %self.context.state(), "reader exited");
    }

    fn dispatch(&self, message: Value) {
        let inbound = Inbound::classify(message);
        tracing::trace!(kind = inbound.kind(), "inbound message");

        match inbound {
            Inbound::Ping { timestamp } => {
                let pong = heartbeat::answer_ping(&self.context, timestamp);
                if let Err(err) = self.write(&pong) {
                    tracing::warn!(error = %err, "failed to answer heartbeat");
                }
            }
            Inbound::Pong(_) => {
                tracing::debug!("ignoring pong from extension");
            }
            Inbound::Response { id, message } => match self.pending.deliver(&id, message) {
                Delivery::Delivered => {}
                Delivery::Duplicate => {
                    tracing::warn!(id = %id, "duplicate response dropped");
                }
                Delivery::Unmatched(message) => {
                    tracing::warn!(id = %id, "late response for unknown or expired request");
                    self.emit(Value::Object(message));
                }
            },
            Inbound::Event(event) => {
                tracing::debug!("unsolicited message from extension");
                self.emit(event);
            }
        }
    }

    fn emit(&self, message: Value) {
        match &self.event_handler {
            Some(handler) => handler(message),
            None => tracing::debug!("no event handler, message dropped"),
        }
    }
}

impl std::fmt::Debug for Relay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Relay")
            .field("state", &self.context.state())
            .field("pending", &self.pending.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::net::Shutdown;
    use std::os::unix::net::UnixStream;
    use std::sync::atomic::AtomicUsize;
    use std::time::Instant;

    use serde_json::json;

    use super::*;

    struct Extension {
        reader: FrameReader<UnixStream>,
        writer: FrameWriter<UnixStream>,
        stream: UnixStream,
    }

    impl Extension {
        fn read(&mut self) -> Value {
            self.reader.read_message().unwrap()
        }

        fn write(&mut self, value: Value) {
            self.writer.write_message(&value).unwrap();
        }

        fn close(&self) {
            self.stream.shutdown(Shutdown::Both).unwrap();
        }
    }

    fn build(relay_fn: impl FnOnce(Relay) -> Relay) -> (Arc<Relay>, Extension, JoinHandle<()>) {
        let (host, ext) = UnixStream::pair().unwrap();
        let host_reader = host.try_clone().unwrap();
        let relay = Arc::new(relay_fn(Relay::new(host_reader, host)));
        let handle = relay.start().unwrap();
        let extension = Extension {
            reader: FrameReader::new(ext.try_clone().unwrap()),
            writer: FrameWriter::new(ext.try_clone().unwrap()),
            stream: ext,
        };
        (relay, extension, handle)
    }

    fn connected() -> (Arc<Relay>, Extension, JoinHandle<()>) {
        build(|relay| relay)
    }

    #[derive(Clone, Default)]
    struct CountingWriter(Arc<AtomicUsize>);

    impl Write for CountingWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.fetch_add(buf.len(), Ordering::SeqCst);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn start_returns_once_connected() {
        let (relay, ext, handle) = connected();
        assert_eq!(relay.state(), ConnectionState::Connected);
        assert!(relay.status().running);
        ext.close();
        handle.join().unwrap();
    }

    #[test]
    fn click_round_trip_strips_id() {
        let (relay, mut ext, handle) = connected();

        let peer = thread::spawn(move || {
            let command = ext.read();
            assert_eq!(command["id"], "1");
            assert_eq!(command["action"], "EXECUTE_ACTION");
            assert_eq!(command["params"], json!({"type": "click", "refId": 42}));
            ext.write(json!({"id": "1", "status": "ok"}));
            ext
        });

        let response = relay
            .send_command(
                "EXECUTE_ACTION",
                json!({"type": "click", "refId": 42}),
                Duration::from_secs(5),
            )
            .unwrap();
        assert_eq!(response, json!({"status": "ok"}));
        assert_eq!(relay.pending_count(), 0);

        let ext = peer.join().unwrap();
        ext.close();
        handle.join().unwrap();
    }

    #[test]
    fn null_params_are_sent_as_empty_object() {
        let (relay, mut ext, handle) = connected();
        let peer = thread::spawn(move || {
            let command = ext.read();
            assert_eq!(command["params"], json!({}));
            ext.write(json!({"id": command["id"], "tree": []}));
            ext
        });

        let response = relay.request("GET_AX_TREE", Value::Null).unwrap();
        assert_eq!(response, json!({"tree": []}));
        peer.join().unwrap().close();
        handle.join().unwrap();
    }

    #[test]
    fn concurrent_commands_answered_in_reverse_order() {
        const CALLERS: usize = 8;
        let (relay, mut ext, handle) = connected();

        let peer = thread::spawn(move || {
            let mut commands: Vec<Value> = (0..CALLERS).map(|_| ext.read()).collect();
            commands.reverse();
            for command in commands {
                let n = command["params"]["n"].clone();
                ext.write(json!({"id": command["id"], "n": n}));
            }
            ext
        });

        let callers: Vec<_> = (0..CALLERS)
            .map(|n| {
                let relay = Arc::clone(&relay);
                thread::spawn(move || {
                    let response = relay
                        .send_command("ECHO", json!({"n": n}), Duration::from_secs(5))
                        .unwrap();
                    assert_eq!(response, json!({"n": n}));
                })
            })
            .collect();

        for caller in callers {
            caller.join().unwrap();
        }
        assert_eq!(relay.pending_count(), 0);
        assert_eq!(relay.status().request_counter, CALLERS as u64);

        peer.join().unwrap().close();
        handle.join().unwrap();
    }

    #[test]
    fn timeout_cleans_up_pending_entry() {
        let (relay, ext, handle) = connected();

        let started = Instant::now();
        let err = relay
            .send_command("GET_AX_TREE", json!({}), Duration::from_millis(100))
            .unwrap_err();
        let elapsed = started.elapsed();

        assert!(matches!(err, RelayError::Timeout(_)));
        assert_eq!(err.to_string(), "Timeout waiting for extension response");
        assert!(elapsed >= Duration::from_millis(100));
        assert!(elapsed < Duration::from_secs(5));
        assert!(!relay.has_pending("1"));
        assert_eq!(relay.pending_count(), 0);
        assert!(relay.is_connected());

        ext.close();
        handle.join().unwrap();
    }

    #[test]
    fn late_response_goes_to_event_handler() {
        let (events_tx, events_rx) = mpsc::channel();
        let events_tx = Mutex::new(events_tx);
        let (relay, mut ext, handle) = build(move |relay| {
            relay.with_event_handler(move |event| {
                let _ = events_tx.lock().unwrap().send(event);
            })
        });

        let err = relay
            .send_command("GET_PAGE_TEXT", json!({}), Duration::from_millis(50))
            .unwrap_err();
        assert!(matches!(err, RelayError::Timeout(_)));

        let command = ext.read();
        ext.write(json!({"id": command["id"], "text": "late"}));

        let event = events_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(event, json!({"id": "1", "text": "late"}));
        assert_eq!(relay.pending_count(), 0);

        ext.close();
        handle.join().unwrap();
    }

    #[test]
    fn unsolicited_event_goes_to_event_handler() {
        let (events_tx, events_rx) = mpsc::channel();
        let events_tx = Mutex::new(events_tx);
        let (relay, mut ext, handle) = build(move |relay| {
            relay.with_event_handler(move |event| {
                let _ = events_tx.lock().unwrap().send(event);
            })
        });

        ext.write(json!({"action": "TAB_CHANGED", "url": "https://example.com"}));
        let event = events_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(event["action"], "TAB_CHANGED");
        assert_eq!(relay.pending_count(), 0);

        ext.close();
        handle.join().unwrap();
    }

    #[test]
    fn ping_is_answered_inline() {
        let (relay, mut ext, handle) = connected();

        ext.write(json!({"action": "PING", "timestamp": 123}));
        let first = ext.read();
        ext.write(json!({"action": "PING", "timestamp": 456}));
        let second = ext.read();

        assert_eq!(first["action"], "PONG");
        assert_eq!(first["timestamp"], 123);
        assert_eq!(first["heartbeat_count"], 1);
        assert!(first["server_time"].is_string());
        assert_eq!(second["timestamp"], 456);
        assert_eq!(second["heartbeat_count"], 2);

        let status = relay.status();
        assert_eq!(status.heartbeat_count, 2);
        assert_eq!(status.message_count, 2);
        assert_eq!(status.pending_requests, 0);
        assert!(status.last_heartbeat_time.is_some());

        ext.close();
        handle.join().unwrap();
    }

    #[test]
    fn ping_does_not_disturb_waiting_caller() {
        let (relay, mut ext, handle) = connected();

        let peer = thread::spawn(move || {
            let command = ext.read();
            ext.write(json!({"action": "PING", "timestamp": 1}));
            let pong = ext.read();
            assert_eq!(pong["action"], "PONG");
            ext.write(json!({"id": command["id"], "done": true}));
            ext
        });

        let response = relay
            .send_command("GET_AX_TREE", json!({}), Duration::from_secs(5))
            .unwrap();
        assert_eq!(response, json!({"done": true}));

        peer.join().unwrap().close();
        handle.join().unwrap();
    }

    #[test]
    fn eof_disconnects_and_later_commands_do_not_write() {
        let written = CountingWriter::default();
        let relay = Arc::new(Relay::new(Cursor::new(Vec::new()), written.clone()));
        let handle = relay.start().unwrap();
        handle.join().unwrap();

        assert_eq!(relay.state(), ConnectionState::Disconnected);
        let err = relay
            .send_command("GET_AX_TREE", json!({}), Duration::from_secs(1))
            .unwrap_err();
        assert!(matches!(err, RelayError::NotConnected));
        assert_eq!(written.0.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn oversized_frame_is_protocol_error() {
        let mut bytes = (2 * 1024 * 1024u32).to_le_bytes().to_vec();
        bytes.extend_from_slice(b"{}");
        let relay = Arc::new(Relay::new(Cursor::new(bytes), io::sink()));
        relay.start().unwrap().join().unwrap();
        assert_eq!(relay.state(), ConnectionState::Disconnected);
        assert_eq!(relay.status().message_count, 0);
    }

    #[test]
    fn invalid_json_is_protocol_error() {
        let payload = b"not json";
        let mut bytes = (payload.len() as u32).to_le_bytes().to_vec();
        bytes.extend_from_slice(payload);
        let relay = Arc::new(Relay::new(Cursor::new(bytes), io::sink()));
        relay.start().unwrap().join().unwrap();
        assert_eq!(relay.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn disconnect_wakes_waiting_caller() {
        let (relay, mut ext, handle) = connected();

        let peer = thread::spawn(move || {
            let _command = ext.read();
            ext.close();
        });

        let started = Instant::now();
        let err = relay
            .send_command("GET_AX_TREE", json!({}), Duration::from_secs(10))
            .unwrap_err();
        assert!(matches!(err, RelayError::ConnectionLost));
        assert!(started.elapsed() < Duration::from_secs(10));

        peer.join().unwrap();
        handle.join().unwrap();
        assert_eq!(relay.state(), ConnectionState::Disconnected);
        assert_eq!(relay.pending_count(), 0);
    }

    #[test]
    fn stop_is_terminal() {
        let (relay, ext, handle) = connected();
        relay.stop();
        assert_eq!(relay.state(), ConnectionState::Stopped);

        let err = relay
            .send_command("GET_AX_TREE", json!({}), Duration::from_secs(1))
            .unwrap_err();
        assert!(matches!(err, RelayError::NotConnected));

        ext.close();
        handle.join().unwrap();
        assert_eq!(relay.state(), ConnectionState::Stopped);
        assert!(!relay.status().running);
    }

    #[test]
    fn unstarted_and_detached_relays_are_not_connected() {
        let relay = Relay::detached(RelayConfig::default());
        assert_eq!(relay.state(), ConnectionState::Disconnected);
        let err = relay.request("GET_AX_TREE", json!({})).unwrap_err();
        assert!(matches!(err, RelayError::NotConnected));
        assert_eq!(relay.status().request_counter, 0);
    }

    #[test]
    fn start_twice_is_rejected() {
        let (relay, ext, handle) = connected();
        assert!(matches!(relay.start(), Err(RelayError::AlreadyStarted)));
        ext.close();
        handle.join().unwrap();
    }

    #[test]
    fn outbound_frame_limit_applies() {
        let (host, ext) = UnixStream::pair().unwrap();
        let config = RelayConfig {
            default_timeout: Duration::from_secs(1),
            frame: FrameConfig {
                max_payload_size: 64,
            },
        };
        let relay = Arc::new(Relay::with_config(host.try_clone().unwrap(), host, config));
        let handle = relay.start().unwrap();

        let err = relay
            .request("GET_PAGE_TEXT", json!({"selector": "x".repeat(128)}))
            .unwrap_err();
        assert!(matches!(err, RelayError::Frame(_)));
        assert_eq!(relay.pending_count(), 0);

        ext.shutdown(Shutdown::Both).unwrap();
        handle.join().unwrap();
    }
}
