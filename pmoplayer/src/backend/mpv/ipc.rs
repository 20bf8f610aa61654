//! Client side of mpv's JSON IPC protocol.
//!
//! Requests are newline-terminated JSON objects carrying a `request_id`;
//! replies echo it back with an `error` field (`"success"` on success).
//! Anything with an `event` key is an asynchronous event and is forwarded to
//! the events channel untouched.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::errors::PlayerError;

type Reply = Result<Value, PlayerError>;
type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<Reply>>>>;
type Reader = Box<dyn AsyncRead + Send + Unpin>;
type Writer = Box<dyn AsyncWrite + Send + Unpin>;

pub struct MpvIpc {
    writer: tokio::sync::Mutex<Writer>,
    pending: PendingMap,
    closed: Arc<AtomicBool>,
    next_id: AtomicU64,
    reader: Mutex<Option<JoinHandle<()>>>,
    timeout: Duration,
}

impl MpvIpc {
    /// Takes over a connected stream: a Unix socket, a named pipe, or an
    /// in-memory duplex in tests.
    pub fn from_stream<S>(stream: S, timeout: Duration) -> (Self, mpsc::UnboundedReceiver<Value>)
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (read_half, write_half) = tokio::io::split(stream);
        let read_half: Reader = Box::new(read_half);
        let write_half: Writer = Box::new(write_half);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let closed = Arc::new(AtomicBool::new(false));

        let reader = tokio::spawn(read_loop(
            read_half,
            pending.clone(),
            closed.clone(),
            events_tx,
        ));

        let ipc = Self {
            writer: tokio::sync::Mutex::new(write_half),
            pending,
            closed,
            next_id: AtomicU64::new(1),
            reader: Mutex::new(Some(reader)),
            timeout,
        };
        (ipc, events_rx)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Sends one command and waits for its reply.
    pub async fn request(&self, command: Vec<Value>) -> Result<Value, PlayerError> {
        if self.is_closed() {
            return Err(PlayerError::ipc("connection closed"));
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id, tx);

        // Le lecteur marque `closed` avant de vider la table: si on l'a
        // raté, personne ne répondra
        if self.is_closed() {
            self.pending.lock().remove(&id);
            return Err(PlayerError::ipc("connection closed"));
        }

        let mut line = serde_json::to_vec(&json!({ "command": command, "request_id": id }))?;
        line.push(b'\n');
        trace!(id, "mpv <- {}", String::from_utf8_lossy(&line).trim_end());

        let written = {
            let mut writer = self.writer.lock().await;
            match writer.write_all(&line).await {
                Ok(()) => writer.flush().await,
                Err(e) => Err(e),
            }
        };
        if let Err(e) = written {
            self.pending.lock().remove(&id);
            return Err(PlayerError::Io(e));
        }

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(_)) => Err(PlayerError::ipc("connection closed")),
            Err(_) => {
                self.pending.lock().remove(&id);
                Err(PlayerError::Timeout(format!("mpv reply to {}", command_name(&command))))
            }
        }
    }

    pub async fn command<I, S>(&self, args: I) -> Result<Value, PlayerError>
    where
        I: IntoIterator<Item = S>,
        S: Into<Value>,
    {
        self.request(args.into_iter().map(Into::into).collect()).await
    }

    pub async fn get_property(&self, name: &str) -> Result<Value, PlayerError> {
        self.request(vec![json!("get_property"), json!(name)]).await
    }

    pub async fn get_property_string(&self, name: &str) -> Result<Value, PlayerError> {
        self.request(vec![json!("get_property_string"), json!(name)])
            .await
    }

    pub async fn set_property(&self, name: &str, value: Value) -> Result<(), PlayerError> {
        self.request(vec![json!("set_property"), json!(name), value])
            .await
            .map(|_| ())
    }

    pub async fn observe_property(&self, id: u64, name: &str) -> Result<(), PlayerError> {
        self.request(vec![json!("observe_property"), json!(id), json!(name)])
            .await
            .map(|_| ())
    }

    /// Closes the write side and stops the reader. Pending requests fail.
    pub async fn shutdown(&self) {
        {
            let mut writer = self.writer.lock().await;
            let _ = writer.shutdown().await;
        }
        let reader = self.reader.lock().take();
        if let Some(reader) = reader {
            reader.abort();
        }
        fail_pending(&self.pending, &self.closed);
    }
}

impl Drop for MpvIpc {
    fn drop(&mut self) {
        if let Some(reader) = self.reader.lock().take() {
            reader.abort();
        }
    }
}

async fn read_loop(
    read_half: Reader,
    pending: PendingMap,
    closed: Arc<AtomicBool>,
    events: mpsc::UnboundedSender<Value>,
) {
    let mut lines = BufReader::new(read_half).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                debug!("mpv IPC connection closed by peer");
                break;
            }
            Err(e) => {
                warn!(error = %e, "mpv IPC read failed");
                break;
            }
        };

        if line.trim().is_empty() {
            continue;
        }
        trace!("mpv -> {}", line);

        let message: Value = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "Ignoring malformed mpv IPC message");
                continue;
            }
        };

        if message.get("event").is_some() {
            // Personne n'écoute plus: on continue quand même à servir les réponses
            let _ = events.send(message);
            continue;
        }

        let Some(id) = message.get("request_id").and_then(Value::as_u64) else {
            debug!("mpv message without request_id or event: {}", line);
            continue;
        };

        let waiter = pending.lock().remove(&id);
        if let Some(waiter) = waiter {
            let _ = waiter.send(parse_reply(message));
        }
    }

    fail_pending(&pending, &closed);
}

fn fail_pending(pending: &PendingMap, closed: &AtomicBool) {
    closed.store(true, Ordering::SeqCst);
    let drained: Vec<_> = pending.lock().drain().collect();
    for (_, waiter) in drained {
        let _ = waiter.send(Err(PlayerError::ipc("connection closed")));
    }
}

fn parse_reply(mut message: Value) -> Reply {
    let status = message
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("success")
        .to_string();
    if status == "success" {
        Ok(message
            .get_mut("data")
            .map(Value::take)
            .unwrap_or(Value::Null))
    } else {
        Err(PlayerError::Ipc(status))
    }
}

fn command_name(command: &[Value]) -> String {
    command
        .first()
        .and_then(Value::as_str)
        .unwrap_or("command")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reply() {
        let ok = parse_reply(json!({"data": 12.5, "error": "success", "request_id": 3}));
        assert_eq!(ok.unwrap(), json!(12.5));

        let empty = parse_reply(json!({"error": "success", "request_id": 4}));
        assert_eq!(empty.unwrap(), Value::Null);

        let err = parse_reply(json!({"error": "property unavailable", "request_id": 5}));
        assert!(matches!(err, Err(PlayerError::Ipc(ref m)) if m == "property unavailable"));
    }

    #[tokio::test]
    async fn test_request_reply_and_events() {
        let (client, server) = tokio::io::duplex(4096);
        let (ipc, mut events) = MpvIpc::from_stream(client, Duration::from_secs(1));

        let peer = tokio::spawn(async move {
            let (read_half, mut write_half) = tokio::io::split(server);
            let mut lines = BufReader::new(read_half).lines();
            let line = lines.next_line().await.unwrap().unwrap();
            let request: Value = serde_json::from_str(&line).unwrap();
            assert_eq!(request["command"], json!(["get_property", "volume"]));
            let id = request["request_id"].as_u64().unwrap();

            // Un événement intercalé avant la réponse
            write_half
                .write_all(b"{\"event\":\"property-change\",\"id\":1,\"name\":\"pause\",\"data\":true}\n")
                .await
                .unwrap();
            let reply = format!("{{\"data\":55.0,\"error\":\"success\",\"request_id\":{}}}\n", id);
            write_half.write_all(reply.as_bytes()).await.unwrap();
            write_half
        });

        let volume = ipc.get_property("volume").await.unwrap();
        assert_eq!(volume, json!(55.0));

        let event = events.recv().await.unwrap();
        assert_eq!(event["name"], "pause");

        drop(peer.await.unwrap());
    }

    #[tokio::test]
    async fn test_peer_close_fails_pending_requests() {
        let (client, server) = tokio::io::duplex(4096);
        let (ipc, _events) = MpvIpc::from_stream(client, Duration::from_secs(5));

        tokio::spawn(async move {
            let mut lines = BufReader::new(server).lines();
            let _ = lines.next_line().await;
            // on ferme sans répondre
        });

        let err = ipc.get_property("duration").await.unwrap_err();
        assert!(matches!(err, PlayerError::Ipc(_)));
        assert!(ipc.is_closed());
    }

    #[tokio::test]
    async fn test_request_times_out() {
        let (client, server) = tokio::io::duplex(4096);
        let (ipc, _events) = MpvIpc::from_stream(client, Duration::from_millis(50));

        let err = ipc.get_property("duration").await.unwrap_err();
        assert!(matches!(err, PlayerError::Timeout(_)));
        drop(server);
    }
}
