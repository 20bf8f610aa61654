//! mpv adapter against a scripted IPC peer.

#![cfg(unix)]

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixListener;
use tokio::time::timeout;

use pmoplayer::{
    BackendKind, CoreOptions, Media, MpvFactory, MpvOptions, PlayerCore, SubtitleTrack,
};

const WAIT: Duration = Duration::from_secs(2);

type Log = Arc<Mutex<Vec<Value>>>;

struct FakeMpv {
    _dir: tempfile::TempDir,
    socket: PathBuf,
    log: Log,
}

impl FakeMpv {
    fn start(fail_load: bool) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let socket = dir.path().join("mpv.sock");
        let listener = UnixListener::bind(&socket).unwrap();
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        tokio::spawn(serve(listener, log.clone(), fail_load));
        Self {
            _dir: dir,
            socket,
            log,
        }
    }

    fn commands(&self) -> Vec<Value> {
        self.log.lock().unwrap().clone()
    }

    fn received(&self, command: Value) -> bool {
        self.commands().contains(&command)
    }

    fn player(&self) -> PlayerCore {
        let options = MpvOptions {
            attach_socket: Some(self.socket.clone()),
            connect_timeout: Duration::from_secs(1),
            request_timeout: Duration::from_secs(1),
            ..MpvOptions::default()
        };
        let factory = MpvFactory::new(BackendKind::Native, options);
        PlayerCore::new(Arc::new(factory), CoreOptions::default())
    }
}

fn track_list() -> Value {
    json!([
        {"id": 1, "type": "video", "selected": true},
        {"id": 1, "type": "audio", "lang": "eng", "selected": true},
        {"id": 1, "type": "sub", "lang": "eng", "selected": true}
    ])
}

fn ok(id: &Value, data: Value) -> Value {
    json!({"data": data, "error": "success", "request_id": id})
}

fn err(id: &Value, message: &str) -> Value {
    json!({"error": message, "request_id": id})
}

async fn serve(listener: UnixListener, log: Log, fail_load: bool) {
    let Ok((stream, _)) = listener.accept().await else {
        return;
    };
    let (read_half, mut write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();

    while let Ok(Some(line)) = lines.next_line().await {
        let request: Value = serde_json::from_str(&line).unwrap();
        let id = request["request_id"].clone();
        let command = request["command"].as_array().cloned().unwrap_or_default();
        log.lock().unwrap().push(Value::Array(command.clone()));

        let name = command.first().and_then(Value::as_str).unwrap_or("");
        let arg = |i: usize| command.get(i).cloned().unwrap_or(Value::Null);

        let mut out = Vec::new();
        match name {
            "set_property" if arg(1) == json!("pause") => {
                out.push(ok(&id, Value::Null));
                out.push(json!({"event": "property-change", "id": 1, "name": "pause", "data": arg(2)}));
            }
            "loadfile" => {
                out.push(ok(&id, Value::Null));
                out.push(json!({"event": "start-file", "playlist_entry_id": 1}));
                if fail_load {
                    out.push(json!({"event": "end-file", "reason": "error",
                                    "file_error": "loading failed"}));
                } else {
                    out.push(json!({"event": "file-loaded"}));
                    out.push(json!({"event": "property-change", "id": 5, "name": "duration", "data": 120.0}));
                }
            }
            "get_property" => match arg(1).as_str() {
                Some("duration") => out.push(ok(&id, json!(120.0))),
                Some("track-list") => out.push(ok(&id, track_list())),
                _ => out.push(err(&id, "property unavailable")),
            },
            "get_property_string" => match arg(1).as_str() {
                Some("audio-delay") => out.push(ok(&id, json!("0.500000"))),
                _ => out.push(err(&id, "property not found")),
            },
            "set" if arg(1) == json!("bogus") => out.push(err(&id, "property not found")),
            _ => out.push(ok(&id, Value::Null)),
        }

        for message in out {
            let mut bytes = serde_json::to_vec(&message).unwrap();
            bytes.push(b'\n');
            if write_half.write_all(&bytes).await.is_err() {
                return;
            }
        }
    }
}

#[tokio::test]
async fn test_open_and_autoplay_over_ipc() {
    let mpv = FakeMpv::start(false);
    let player = mpv.player();
    let mut playing = player.streams().playing();

    player
        .open(Media::new("https://media.example/a.mkv"), true)
        .await
        .unwrap();

    assert!(timeout(WAIT, playing.recv()).await.unwrap().unwrap());
    let state = player.state();
    assert_eq!(state.duration, Duration::from_secs(120));
    // auto + no + une piste réelle
    assert_eq!(state.tracks.audio.len(), 3);
    assert_eq!(state.tracks.subtitle.len(), 3);

    assert!(mpv.received(json!(["request_log_messages", "warn"])));
    assert!(mpv.received(json!(["observe_property", 1, "pause"])));
    assert!(mpv.received(json!(["loadfile", "https://media.example/a.mkv", "replace"])));
    assert!(mpv.received(json!(["set_property", "volume", 100.0])));
    assert!(mpv.received(json!(["set_property", "pause", false])));

    player.dispose().await;
}

#[tokio::test]
async fn test_seek_and_subtitles_commands() {
    let mpv = FakeMpv::start(false);
    let player = mpv.player();
    player
        .open(Media::new("https://media.example/a.mkv"), false)
        .await
        .unwrap();

    player.seek(Duration::from_secs(90)).await.unwrap();
    player
        .select_subtitle_track(SubtitleTrack::disabled())
        .await
        .unwrap();

    assert!(mpv.received(json!(["seek", 90.0, "absolute"])));
    assert!(mpv.received(json!(["set", "sid", "no"])));
    assert_eq!(player.state().position, Duration::from_secs(90));
    assert!(player.state().track.subtitle.is_disabled());

    player.dispose().await;
}

#[tokio::test]
async fn test_property_passthrough() {
    let mpv = FakeMpv::start(false);
    let player = mpv.player();
    player
        .open(Media::new("https://media.example/a.mkv"), false)
        .await
        .unwrap();

    assert_eq!(
        player.get_property("audio-delay").await.unwrap().as_deref(),
        Some("0.500000")
    );
    assert_eq!(player.get_property("no-such-thing").await.unwrap(), None);

    player.set_property("audio-delay", "0.500").await.unwrap();
    // Un refus du moteur n'est pas une erreur pour l'appelant
    player.set_property("bogus", "1").await.unwrap();
    player.command(["cycle", "mute"]).await.unwrap();

    assert!(mpv.received(json!(["set", "audio-delay", "0.500"])));
    assert!(mpv.received(json!(["cycle", "mute"])));

    player.dispose().await;
}

#[tokio::test]
async fn test_load_error_lands_on_error_stream() {
    let mpv = FakeMpv::start(true);
    let player = mpv.player();
    let mut errors = player.streams().error();

    player
        .open(Media::new("https://media.example/missing.mkv"), true)
        .await
        .unwrap();

    let message = timeout(WAIT, errors.recv()).await.unwrap().unwrap();
    assert!(message.contains("loading failed"), "{}", message);
    assert!(!player.state().playing);

    player.dispose().await;
}

#[tokio::test]
async fn test_attached_engine_is_stopped_not_quit() {
    let mpv = FakeMpv::start(false);
    let player = mpv.player();
    player
        .open(Media::new("https://media.example/a.mkv"), false)
        .await
        .unwrap();

    player.dispose().await;

    assert!(mpv.received(json!(["stop"])));
    assert!(!mpv.received(json!(["quit"])));
}
