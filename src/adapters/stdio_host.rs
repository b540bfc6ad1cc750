//! Newline-delimited JSON bridge to the native host process.
//!
//! Requests go to the host's stdin, one JSON object per line:
//! `{"request_id": "...", "command": "download_model", "payload": {"model": "m3"}}`.
//!
//! The host answers on stdout with either a response correlated by
//! `request_id` (`{"request_id": "...", "ok": true, "payload": ...}` or
//! `{"request_id": "...", "ok": false, "error": "..."}`) or an unsolicited
//! event (`{"event": "download:progress", "payload": {...}}`).

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tokio::process::{Child, Command};
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::{DomainError, HostConfig, HostEvent, ModelDescriptor, ModelStatus, Settings};
use crate::ports::HostClient;

type Reply = Result<Value, DomainError>;
type HostWriter = BufWriter<Box<dyn AsyncWrite + Send + Unpin>>;

#[derive(Debug, Serialize)]
struct RequestEnvelope<'a> {
    request_id: &'a str,
    command: &'a str,
    payload: Value,
}

#[derive(Debug, Deserialize)]
struct ResponseEnvelope {
    request_id: String,
    ok: bool,
    #[serde(default)]
    payload: Value,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EventEnvelope {
    event: String,
    #[serde(default)]
    payload: Value,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Incoming {
    Response(ResponseEnvelope),
    Event(EventEnvelope),
}

/// Requests waiting for their response.
#[derive(Default)]
struct Pending {
    waiters: HashMap<String, oneshot::Sender<Reply>>,
    /// Set once the host output ended; no new request can be answered.
    closed: bool,
}

impl Pending {
    fn close(&mut self) {
        self.closed = true;
        for (request_id, waiter) in self.waiters.drain() {
            debug!(request_id = %request_id, "Failing request, host connection closed");
            let _ = waiter.send(Err(DomainError::HostTransport(
                "host connection closed".to_string(),
            )));
        }
    }
}

/// [`HostClient`] speaking JSON lines over a pair of byte streams.
pub struct StdioHostClient {
    writer: tokio::sync::Mutex<HostWriter>,
    pending: Arc<Mutex<Pending>>,
    events: broadcast::Sender<HostEvent>,
    timeout: Duration,
    reader: JoinHandle<()>,
    _child: Option<Mutex<Child>>,
}

impl StdioHostClient {
    /// Start the host executable and connect to its stdin and stdout.
    ///
    /// The host's stderr is inherited so its diagnostics end up next to ours.
    pub fn spawn(config: &HostConfig) -> Result<Self, DomainError> {
        info!(program = %config.program, args = ?config.args, "Starting host process");

        let mut child = Command::new(&config.program)
            .args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                DomainError::HostTransport(format!("failed to start {}: {}", config.program, e))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| DomainError::HostTransport("host stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DomainError::HostTransport("host stdout unavailable".to_string()))?;

        let mut client = Self::from_streams(stdout, stdin, config);
        client._child = Some(Mutex::new(child));
        Ok(client)
    }

    /// Connect over already open streams. Must be called inside a Tokio runtime.
    pub fn from_streams<R, W>(reader: R, writer: W, config: &HostConfig) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let pending = Arc::new(Mutex::new(Pending::default()));

        let reader = tokio::spawn(read_loop(reader, Arc::clone(&pending), events.clone()));
        let writer: Box<dyn AsyncWrite + Send + Unpin> = Box::new(writer);

        Self {
            writer: tokio::sync::Mutex::new(BufWriter::new(writer)),
            pending,
            events,
            timeout: Duration::from_millis(config.request_timeout_ms),
            reader,
            _child: None,
        }
    }

    /// Send one command and wait for its correlated response.
    async fn request(&self, command: &str, payload: Value) -> Reply {
        let request_id = Uuid::new_v4().to_string();
        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock();
            if pending.closed {
                return Err(DomainError::HostTransport(
                    "host connection closed".to_string(),
                ));
            }
            pending.waiters.insert(request_id.clone(), tx);
        }

        let line = serde_json::to_string(&RequestEnvelope {
            request_id: &request_id,
            command,
            payload,
        })?;
        debug!(request_id = %request_id, command, "Sending host request");

        if let Err(e) = self.write_line(&line).await {
            self.pending.lock().waiters.remove(&request_id);
            return Err(e);
        }

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(_)) => Err(DomainError::HostTransport(
                "host connection closed".to_string(),
            )),
            Err(_) => {
                self.pending.lock().waiters.remove(&request_id);
                warn!(request_id = %request_id, command, "Host request timed out");
                Err(DomainError::HostTimeout {
                    command: command.to_string(),
                    timeout_ms: self.timeout.as_millis() as u64,
                })
            }
        }
    }

    /// Send a command and decode its response payload.
    async fn call<T: DeserializeOwned>(&self, command: &str, payload: Value) -> Result<T, DomainError> {
        let value = self.request(command, payload).await?;
        serde_json::from_value(value)
            .map_err(|e| DomainError::Protocol(format!("bad {} response: {}", command, e)))
    }

    async fn write_line(&self, line: &str) -> Result<(), DomainError> {
        let mut writer = self.writer.lock().await;
        let result = async {
            writer.write_all(line.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await
        }
        .await;
        result.map_err(|e| DomainError::HostTransport(format!("failed to write to host: {}", e)))
    }
}

impl Drop for StdioHostClient {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

#[async_trait]
impl HostClient for StdioHostClient {
    async fn get_settings(&self) -> Result<Settings, DomainError> {
        self.call("get_settings", Value::Null).await
    }

    async fn update_settings(&self, settings: &Settings) -> Result<(), DomainError> {
        self.request("update_settings", json!({ "settings": settings }))
            .await
            .map(|_| ())
    }

    async fn list_models(&self) -> Result<Vec<ModelDescriptor>, DomainError> {
        self.call("list_models", Value::Null).await
    }

    async fn check_model_status(&self, model: &str) -> Result<ModelStatus, DomainError> {
        self.call("check_model_status", json!({ "model": model })).await
    }

    async fn download_model(&self, model: &str) -> Result<(), DomainError> {
        self.request("download_model", json!({ "model": model }))
            .await
            .map(|_| ())
    }

    async fn delete_model(&self, model: &str) -> Result<(), DomainError> {
        self.request("delete_model", json!({ "model": model }))
            .await
            .map(|_| ())
    }

    fn subscribe(&self) -> broadcast::Receiver<HostEvent> {
        self.events.subscribe()
    }
}

/// Read host output until EOF, routing responses and events.
async fn read_loop<R>(reader: R, pending: Arc<Mutex<Pending>>, events: broadcast::Sender<HostEvent>)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => handle_line(line.trim(), &pending, &events),
            Ok(None) => {
                info!("Host output closed");
                break;
            }
            Err(e) => {
                warn!(error = %e, "Failed to read from host");
                break;
            }
        }
    }
    pending.lock().close();
}

fn handle_line(line: &str, pending: &Mutex<Pending>, events: &broadcast::Sender<HostEvent>) {
    if line.is_empty() {
        return;
    }

    let incoming: Incoming = match serde_json::from_str(line) {
        Ok(incoming) => incoming,
        Err(e) => {
            warn!(error = %e, raw_line = %line, "Ignoring unparseable host output");
            return;
        }
    };

    match incoming {
        Incoming::Response(response) => {
            let Some(waiter) = pending.lock().waiters.remove(&response.request_id) else {
                debug!(request_id = %response.request_id, "Response for unknown or expired request");
                return;
            };
            let reply = if response.ok {
                Ok(response.payload)
            } else {
                Err(DomainError::Host(
                    response
                        .error
                        .unwrap_or_else(|| "host reported an error".to_string()),
                ))
            };
            let _ = waiter.send(reply);
        }
        Incoming::Event(envelope) => match HostEvent::from_wire(&envelope.event, envelope.payload) {
            Ok(Some(event)) => {
                // No subscribers yet is fine.
                let _ = events.send(event);
            }
            Ok(None) => debug!(event = %envelope.event, "Ignoring unhandled host event"),
            Err(e) => warn!(event = %envelope.event, error = %e, "Malformed host event payload"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::events::DOWNLOAD_PROGRESS;
    use tokio::io::{DuplexStream, ReadHalf, WriteHalf};

    /// The host side of a duplex pipe.
    struct FakeHost {
        lines: tokio::io::Lines<BufReader<ReadHalf<DuplexStream>>>,
        writer: WriteHalf<DuplexStream>,
    }

    impl FakeHost {
        async fn next_request(&mut self) -> Value {
            let line = self.lines.next_line().await.unwrap().unwrap();
            serde_json::from_str(&line).unwrap()
        }

        async fn send(&mut self, value: Value) {
            let mut line = value.to_string();
            line.push('\n');
            self.writer.write_all(line.as_bytes()).await.unwrap();
            self.writer.flush().await.unwrap();
        }
    }

    fn connect(timeout_ms: u64) -> (StdioHostClient, FakeHost) {
        let (client_end, host_end) = tokio::io::duplex(64 * 1024);
        let (client_read, client_write) = tokio::io::split(client_end);
        let (host_read, host_write) = tokio::io::split(host_end);
        let config = HostConfig {
            request_timeout_ms: timeout_ms,
            ..HostConfig::default()
        };
        let client = StdioHostClient::from_streams(client_read, client_write, &config);
        let host = FakeHost {
            lines: BufReader::new(host_read).lines(),
            writer: host_write,
        };
        (client, host)
    }

    #[tokio::test]
    async fn test_get_settings_roundtrip() {
        let (client, mut host) = connect(1_000);
        let expected = Settings {
            language: "nl".to_string(),
            ..Settings::default()
        };

        let responder = {
            let expected = expected.clone();
            tokio::spawn(async move {
                let request = host.next_request().await;
                assert_eq!(request["command"], "get_settings");
                host.send(json!({
                    "request_id": request["request_id"],
                    "ok": true,
                    "payload": expected,
                }))
                .await;
                host
            })
        };

        let settings = client.get_settings().await.unwrap();
        assert_eq!(settings, expected);
        responder.await.unwrap();
    }

    #[tokio::test]
    async fn test_command_arguments_on_the_wire() {
        let (client, mut host) = connect(1_000);

        let responder = tokio::spawn(async move {
            let request = host.next_request().await;
            assert_eq!(request["command"], "download_model");
            assert_eq!(request["payload"], json!({ "model": "m3" }));
            host.send(json!({ "request_id": request["request_id"], "ok": true }))
                .await;

            let request = host.next_request().await;
            assert_eq!(request["command"], "update_settings");
            assert_eq!(request["payload"]["settings"]["language"], "auto");
            host.send(json!({ "request_id": request["request_id"], "ok": true }))
                .await;
            host
        });

        client.download_model("m3").await.unwrap();
        client.update_settings(&Settings::default()).await.unwrap();
        responder.await.unwrap();
    }

    #[tokio::test]
    async fn test_host_error_is_surfaced() {
        let (client, mut host) = connect(1_000);

        let responder = tokio::spawn(async move {
            let request = host.next_request().await;
            host.send(json!({
                "request_id": request["request_id"],
                "ok": false,
                "error": "model m9 is not in the catalog",
            }))
            .await;
            host
        });

        let err = client.delete_model("m9").await.unwrap_err();
        assert!(matches!(err, DomainError::Host(_)));
        assert_eq!(err.to_string(), "model m9 is not in the catalog");
        responder.await.unwrap();
    }

    #[tokio::test]
    async fn test_responses_are_matched_by_request_id() {
        let (client, mut host) = connect(1_000);

        let responder = tokio::spawn(async move {
            let first = host.next_request().await;
            let second = host.next_request().await;
            // Answer in reverse order.
            for request in [second, first] {
                let installed = request["payload"]["model"] == "m2";
                host.send(json!({
                    "request_id": request["request_id"],
                    "ok": true,
                    "payload": { "installed": installed, "bytes_on_disk": 0 },
                }))
                .await;
            }
            host
        });

        let (m1, m2) = tokio::join!(
            client.check_model_status("m1"),
            client.check_model_status("m2")
        );
        assert!(!m1.unwrap().installed);
        assert!(m2.unwrap().installed);
        responder.await.unwrap();
    }

    #[tokio::test]
    async fn test_events_are_broadcast() {
        let (client, mut host) = connect(1_000);
        let mut events = client.subscribe();

        host.send(json!({ "event": "recording:started", "payload": {} }))
            .await;
        host.send(json!({
            "event": DOWNLOAD_PROGRESS,
            "payload": { "model": "m3", "file": "a.bin", "downloaded": 40, "total": 100, "percent": 40.0 },
        }))
        .await;

        let event = tokio::time::timeout(Duration::from_secs(1), events.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.name(), DOWNLOAD_PROGRESS);
        assert_eq!(event.model_key(), Some("m3"));
    }

    #[tokio::test]
    async fn test_garbage_line_does_not_break_the_connection() {
        let (client, mut host) = connect(1_000);

        let responder = tokio::spawn(async move {
            let request = host.next_request().await;
            host.writer.write_all(b"not json\n").await.unwrap();
            host.send(json!({ "request_id": request["request_id"], "ok": true, "payload": [] }))
                .await;
            host
        });

        assert!(client.list_models().await.unwrap().is_empty());
        responder.await.unwrap();
    }

    #[tokio::test]
    async fn test_bad_payload_is_protocol_error() {
        let (client, mut host) = connect(1_000);

        let responder = tokio::spawn(async move {
            let request = host.next_request().await;
            host.send(json!({ "request_id": request["request_id"], "ok": true, "payload": "nope" }))
                .await;
            host
        });

        assert!(matches!(
            client.list_models().await,
            Err(DomainError::Protocol(_))
        ));
        responder.await.unwrap();
    }

    #[tokio::test]
    async fn test_request_times_out() {
        let (client, _host) = connect(50);

        let err = client.get_settings().await.unwrap_err();
        assert!(matches!(
            err,
            DomainError::HostTimeout { ref command, timeout_ms: 50 } if command == "get_settings"
        ));
    }

    #[tokio::test]
    async fn test_host_exit_fails_pending_requests() {
        let (client, mut host) = connect(5_000);

        let responder = tokio::spawn(async move {
            host.next_request().await;
            drop(host);
        });

        let err = client.list_models().await.unwrap_err();
        assert!(matches!(err, DomainError::HostTransport(_)));
        responder.await.unwrap();

        // Later requests fail fast.
        assert!(matches!(
            client.get_settings().await,
            Err(DomainError::HostTransport(_))
        ));
    }
}
