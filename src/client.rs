//! Client builder and connection session.
//!
//! [`NatsClient`] owns the connection lifecycle:
//! 1. Scan the candidate server list (configured URLs, then peers the last
//!    seen server advertised) and open a TCP transport to the first that
//!    answers with INFO inside the handshake deadline
//! 2. Authenticate with a CONNECT frame when the server requires it
//! 3. Run the read loop: reassemble inbound chunks into frames and dispatch
//!    them to the event bus and the message channel
//! 4. Tear down on `disconnect`, or retry in a bounded loop on
//!    `retry_connection`
//!
//! # Example
//!
//! ```ignore
//! use natslink::{NatsClient, NatsEvent};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = NatsClient::builder()
//!         .url("nats://127.0.0.1:4222")
//!         .build();
//!
//!     client.events().subscribe(&[NatsEvent::Connected], |_, _| {
//!         println!("connected");
//!     });
//!
//!     client.connect().await?;
//!     client.subscribe("updates", "1").await?;
//!     Ok(())
//! }
//! ```

use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use tokio::io::AsyncReadExt;
use tokio::net::tcp::OwnedReadHalf;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use url::Url;

use crate::config::ClientConfig;
use crate::error::{NatsError, Result};
use crate::events::{EventBus, NatsEvent};
use crate::protocol::{reassemble, wire, ConnectOptions, Operation, PendingFrame};
use crate::server::{extract_credentials, parse_server_url, ServerInfo};
use crate::transport::TcpTransport;
use crate::writer::{spawn_writer_task, WriterHandle};

/// How long a connect attempt waits for the server's INFO frame.
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(3);

/// Read buffer size for the read loop.
const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Connection lifecycle state. Written only by the session methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No transport; the initial and terminal state.
    Disconnected,
    /// A connect attempt is scanning candidates.
    Connecting,
    /// Handshake (and auth, when required) completed.
    Connected,
}

/// Builder for configuring and creating a [`NatsClient`].
pub struct ClientBuilder {
    urls: Vec<String>,
    config: ClientConfig,
}

impl ClientBuilder {
    /// Create a builder with no servers and default configuration.
    pub fn new() -> Self {
        Self {
            urls: Vec::new(),
            config: ClientConfig::default(),
        }
    }

    /// Add a candidate server URL. Candidates are tried in insertion order.
    pub fn url(mut self, url: &str) -> Self {
        self.urls.push(url.to_string());
        self
    }

    /// Enable or disable the retry pass of `retry_connection`.
    pub fn auto_retry(mut self, enabled: bool) -> Self {
        self.config.auto_retry = enabled;
        self
    }

    /// Maximum connect attempts per retry pass.
    pub fn auto_retry_max(mut self, max: u32) -> Self {
        self.config.auto_retry_max = max;
        self
    }

    /// Delay between failed retry attempts.
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.config.retry_delay = delay;
        self
    }

    /// Request +OK acknowledgments from the server.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.config.verbose = verbose;
        self
    }

    /// Request strict subject validation from the server.
    pub fn pedantic(mut self, pedantic: bool) -> Self {
        self.config.pedantic = pedantic;
        self
    }

    /// Client name advertised in the CONNECT payload.
    pub fn name(mut self, name: &str) -> Self {
        self.config.name = name.to_string();
        self
    }

    /// Build the client. No I/O happens until `connect`.
    pub fn build(self) -> NatsClient {
        NatsClient::new(self.urls, self.config)
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Transport-side tasks of one established (or in-handshake) connection.
struct ActiveConnection {
    writer: WriterHandle,
    reader_task: JoinHandle<()>,
    writer_task: JoinHandle<Result<()>>,
}

impl ActiveConnection {
    /// Best-effort teardown: abort both tasks and wait for them to finish.
    /// Dropping the task-owned halves closes the socket.
    async fn shutdown(self) {
        self.reader_task.abort();
        self.writer_task.abort();
        drop(self.writer);
        let _ = self.reader_task.await;
        let _ = self.writer_task.await;
    }
}

/// A pub/sub protocol client session.
pub struct NatsClient {
    config: ClientConfig,
    urls: Vec<String>,
    state: ConnectionState,
    server_info: Arc<Mutex<Option<ServerInfo>>>,
    connected_url: Option<Url>,
    events: Arc<EventBus>,
    connection: Option<ActiveConnection>,
    message_tx: UnboundedSender<String>,
    message_rx: Option<UnboundedReceiver<String>>,
}

impl NatsClient {
    /// Create a client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Create a client over the given candidate URLs.
    pub fn new(urls: Vec<String>, config: ClientConfig) -> Self {
        let (message_tx, message_rx) = mpsc::unbounded_channel();
        Self {
            config,
            urls,
            state: ConnectionState::Disconnected,
            server_info: Arc::new(Mutex::new(None)),
            connected_url: None,
            events: Arc::new(EventBus::new()),
            connection: None,
            message_tx,
            message_rx: Some(message_rx),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// URL of the server this session is connected to, once connected.
    pub fn connected_url(&self) -> Option<&Url> {
        self.connected_url.as_ref()
    }

    /// Last INFO payload received from the server.
    pub fn server_info(&self) -> Option<ServerInfo> {
        self.server_info.lock().expect("server info poisoned").clone()
    }

    /// The session's event bus, for lifecycle listeners.
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Take the inbound MSG stream: complete frames (header and payload
    /// joined by a newline), in arrival order, for the subscription router
    /// layered on top of this session. Yields the receiver once.
    pub fn messages(&mut self) -> Option<UnboundedReceiver<String>> {
        self.message_rx.take()
    }

    /// Connect to the first reachable candidate server.
    ///
    /// No-op when already connected. Candidates are the configured URLs
    /// followed by any peer URLs the last seen server advertised; each gets
    /// a transport open plus a [`HANDSHAKE_TIMEOUT`] wait for INFO before
    /// the scan moves on. When every candidate fails, the last recorded
    /// error is returned and the session stays disconnected.
    pub async fn connect(&mut self) -> Result<()> {
        if self.state == ConnectionState::Connected {
            return Ok(());
        }
        self.state = ConnectionState::Connecting;

        // A previous failed session may still hold transport tasks.
        if let Some(stale) = self.connection.take() {
            stale.shutdown().await;
        }

        let mut candidates = self.urls.clone();
        if let Some(info) = self.server_info.lock().expect("server info poisoned").as_ref()
        {
            candidates.extend(info.connect_urls.iter().cloned());
        }

        let mut last_error: Option<NatsError> = None;
        let mut connected: Option<Url> = None;
        for candidate in candidates {
            match self.open_stream(&candidate).await {
                Ok(url) => {
                    connected = Some(url);
                    break;
                }
                Err(error) => {
                    tracing::warn!("connect to {} failed: {}", candidate, error);
                    last_error = Some(error);
                }
            }
        }

        let Some(url) = connected else {
            self.state = ConnectionState::Disconnected;
            return Err(last_error.unwrap_or_else(|| {
                NatsError::InvalidServerUrl("no server urls configured".to_string())
            }));
        };
        self.connected_url = Some(url);

        let auth_required = self
            .server_info
            .lock()
            .expect("server info poisoned")
            .as_ref()
            .is_some_and(|info| info.auth_required);
        if auth_required {
            if let Err(error) = self.authenticate().await {
                if let Some(connection) = self.connection.take() {
                    connection.shutdown().await;
                }
                self.state = ConnectionState::Disconnected;
                return Err(error);
            }
        }

        self.state = ConnectionState::Connected;
        self.events.fire(NatsEvent::Connected, None);
        Ok(())
    }

    /// Tear the session down.
    ///
    /// Best-effort and idempotent: transport teardown errors are swallowed,
    /// the state always ends `Disconnected` and the `disconnected` event
    /// always fires.
    pub async fn disconnect(&mut self) {
        if let Some(connection) = self.connection.take() {
            connection.shutdown().await;
        }
        self.state = ConnectionState::Disconnected;
        self.events.fire(NatsEvent::Disconnected, None);
    }

    /// Bounded reconnect pass.
    ///
    /// Fires `reconnecting`, then (when `auto_retry` is enabled) attempts
    /// `connect` up to `auto_retry_max` times with `retry_delay` sleeps
    /// after each failure, returning on the first success. Exhaustion falls
    /// through to a full `disconnect` rather than leaving the session
    /// half-open.
    pub async fn retry_connection(&mut self) {
        self.events.fire(NatsEvent::Reconnecting, None);

        if self.config.auto_retry {
            let mut attempts = 0;
            while attempts < self.config.auto_retry_max {
                match self.connect().await {
                    Ok(()) => return,
                    Err(error) => {
                        tracing::warn!("reconnect attempt {} failed: {}", attempts + 1, error);
                    }
                }
                attempts += 1;
                tokio::time::sleep(self.config.retry_delay).await;
            }
        }

        self.disconnect().await;
    }

    /// Publish a payload to a subject.
    pub async fn publish(&self, subject: &str, payload: &str) -> Result<()> {
        self.send_frame(wire::publish(subject, payload)).await
    }

    /// Subscribe to a subject under a subscription id. Routing of the
    /// delivered MSG frames is up to the consumer of [`Self::messages`].
    pub async fn subscribe(&self, subject: &str, sid: &str) -> Result<()> {
        self.send_frame(wire::subscribe(subject, sid)).await
    }

    /// Drop a subscription by id.
    pub async fn unsubscribe(&self, sid: &str) -> Result<()> {
        self.send_frame(wire::unsubscribe(sid)).await
    }

    /// Queue an encoded frame on the writer task.
    async fn send_frame(&self, frame: String) -> Result<()> {
        let Some(connection) = &self.connection else {
            return Err(NatsError::ConnectionClosed);
        };
        connection.writer.send(Bytes::from(frame)).await
    }

    /// One candidate attempt: open the transport, spawn the I/O tasks and
    /// wait for the handshake to resolve.
    async fn open_stream(&mut self, candidate: &str) -> Result<Url> {
        let url = parse_server_url(candidate)?;
        let (host, port) = match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => (host.to_string(), port),
            _ => return Err(NatsError::InvalidServerUrl(candidate.to_string())),
        };

        let transport = TcpTransport::open(&host, port).await?;
        let (read_half, write_half) = transport.into_split();
        let (writer, writer_task) = spawn_writer_task(write_half);

        // Handshake rendezvous: a one-shot listener feeds the first INFO or
        // error event into a channel this call waits on.
        let (handshake_tx, mut handshake_rx) = mpsc::unbounded_channel();
        let listener = self.events.subscribe_with(
            &[NatsEvent::Informed, NatsEvent::Error],
            true,
            move |event, payload| {
                let _ = handshake_tx.send((event, payload.map(str::to_string)));
            },
        );

        let reader_task = tokio::spawn(read_loop(
            read_half,
            Arc::clone(&self.events),
            Arc::clone(&self.server_info),
            writer.clone(),
            self.message_tx.clone(),
        ));

        let connection = ActiveConnection {
            writer,
            reader_task,
            writer_task,
        };

        match tokio::time::timeout(HANDSHAKE_TIMEOUT, handshake_rx.recv()).await {
            Ok(Some((NatsEvent::Informed, _))) => {
                self.connection = Some(connection);
                Ok(url)
            }
            Ok(Some((_, message))) => {
                connection.shutdown().await;
                Err(NatsError::ServerRejected(message.unwrap_or_else(|| {
                    "server returned an error while trying to connect".to_string()
                })))
            }
            Ok(None) | Err(_) => {
                // The one-shot listener never fired; clear it.
                self.events.unsubscribe(listener);
                connection.shutdown().await;
                Err(NatsError::HandshakeTimeout(HANDSHAKE_TIMEOUT))
            }
        }
    }

    /// Send the CONNECT frame carrying credentials from the connected URL.
    async fn authenticate(&self) -> Result<()> {
        let url = self
            .connected_url
            .as_ref()
            .ok_or(NatsError::AuthConfigurationMissing)?;
        let credentials =
            extract_credentials(url).ok_or(NatsError::AuthConfigurationMissing)?;
        let ssl_required = self
            .server_info
            .lock()
            .expect("server info poisoned")
            .as_ref()
            .is_some_and(|info| info.tls_required);

        let options = ConnectOptions {
            verbose: self.config.verbose,
            pedantic: self.config.pedantic,
            ssl_required,
            name: self.config.name.clone(),
            lang: self.config.lang.clone(),
            version: self.config.version.clone(),
            credentials: Some(credentials),
        };

        self.send_frame(wire::connect(&options)).await
    }
}

/// Read loop: transport chunks in, frames dispatched.
///
/// Runs until the socket closes or errors; either way the failure is fired
/// as an `error` event, which also unblocks a handshake still waiting in
/// `connect`.
async fn read_loop(
    mut reader: OwnedReadHalf,
    events: Arc<EventBus>,
    server_info: Arc<Mutex<Option<ServerInfo>>>,
    writer: WriterHandle,
    messages: UnboundedSender<String>,
) {
    let mut carry: Option<PendingFrame> = None;
    let mut buf = vec![0u8; READ_BUFFER_SIZE];

    loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) => {
                events.fire(NatsEvent::Error, Some("connection closed by server"));
                return;
            }
            Ok(n) => n,
            Err(error) => {
                let message = error.to_string();
                events.fire(NatsEvent::Error, Some(&message));
                return;
            }
        };

        let chunk = String::from_utf8_lossy(&buf[..n]);
        let (frames, next_carry) = reassemble(&chunk, carry.take());
        carry = next_carry;

        for frame in frames {
            dispatch_frame(&frame, &events, &server_info, &writer, &messages).await;
        }
    }
}

/// Route one complete frame.
async fn dispatch_frame(
    frame: &str,
    events: &EventBus,
    server_info: &Mutex<Option<ServerInfo>>,
    writer: &WriterHandle,
    messages: &UnboundedSender<String>,
) {
    match Operation::classify(frame) {
        Some(Operation::Info) => {
            let payload = frame[Operation::Info.token().len()..].trim();
            match ServerInfo::parse(payload) {
                Ok(info) => {
                    *server_info.lock().expect("server info poisoned") = Some(info);
                    events.fire(NatsEvent::Informed, Some(payload));
                }
                Err(error) => {
                    tracing::warn!("discarding unparseable INFO payload: {}", error);
                }
            }
        }
        Some(Operation::Err) => {
            let message = frame[Operation::Err.token().len()..].trim();
            events.fire(NatsEvent::Error, Some(message));
        }
        Some(Operation::Ping) => {
            if writer.send(Bytes::from(wire::pong())).await.is_err() {
                tracing::debug!("dropping PONG reply: writer task is gone");
            }
        }
        Some(Operation::Message) => {
            if messages.send(frame.to_string()).is_err() {
                tracing::debug!("dropping MSG frame: no consumer attached");
            }
        }
        Some(Operation::Pong) | Some(Operation::Ok) => {
            tracing::trace!("control frame: {}", frame);
        }
        Some(other) => {
            tracing::debug!("unexpected {} frame from server", other.token());
        }
        // The reassembler only emits classified frames.
        None => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let client = NatsClient::builder().build();
        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert!(client.connected_url().is_none());
        assert!(client.server_info().is_none());
    }

    #[test]
    fn test_builder_chaining() {
        let client = NatsClient::builder()
            .url("nats://a:4222")
            .url("nats://b:4222")
            .auto_retry(true)
            .auto_retry_max(5)
            .retry_delay(Duration::from_millis(20))
            .verbose(true)
            .pedantic(true)
            .name("tester")
            .build();

        assert_eq!(client.urls, vec!["nats://a:4222", "nats://b:4222"]);
        assert!(client.config.auto_retry);
        assert_eq!(client.config.auto_retry_max, 5);
        assert_eq!(client.config.retry_delay, Duration::from_millis(20));
        assert!(client.config.verbose);
        assert!(client.config.pedantic);
        assert_eq!(client.config.name, "tester");
    }

    #[test]
    fn test_message_stream_taken_once() {
        let mut client = NatsClient::builder().build();
        assert!(client.messages().is_some());
        assert!(client.messages().is_none());
    }

    #[tokio::test]
    async fn test_connect_with_no_urls_fails() {
        let mut client = NatsClient::builder().build();
        let result = client.connect().await;
        assert!(matches!(result, Err(NatsError::InvalidServerUrl(_))));
        assert_eq!(client.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_connect_with_malformed_url_fails() {
        let mut client = NatsClient::builder().url("not a url").build();
        let result = client.connect().await;
        assert!(matches!(result, Err(NatsError::InvalidServerUrl(_))));
        assert_eq!(client.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        let mut client = NatsClient::builder().build();
        client.disconnect().await;
        client.disconnect().await;
        assert_eq!(client.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_send_frame_without_connection_errors() {
        let client = NatsClient::builder().build();
        let result = client.publish("updates", "hi").await;
        assert!(matches!(result, Err(NatsError::ConnectionClosed)));
    }
}
