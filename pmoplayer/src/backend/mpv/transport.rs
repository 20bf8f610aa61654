//! Where mpv listens for IPC, per platform.
//!
//! `--input-ipc-server` takes a Unix socket path on Unix and a named pipe
//! name on Windows. The rest of the adapter only sees an [`IpcStream`].

use std::io;
use std::path::{Path, PathBuf};

use uuid::Uuid;

#[cfg(unix)]
pub type IpcStream = tokio::net::UnixStream;

#[cfg(windows)]
pub type IpcStream = tokio::net::windows::named_pipe::NamedPipeClient;

/// Named pipe for one spawned engine.
#[cfg_attr(not(windows), allow(dead_code))]
pub(crate) fn pipe_name(id: &Uuid) -> String {
    format!(r"\\.\pipe\pmoplayer-mpv-{}", id)
}

/// Socket file for one spawned engine, created in `dir`.
#[cfg_attr(not(unix), allow(dead_code))]
pub(crate) fn socket_path(dir: &Path, id: &Uuid) -> PathBuf {
    dir.join(format!("pmoplayer-mpv-{}.sock", id))
}

/// Fresh endpoint for a private engine. `socket_dir` only matters on Unix.
#[cfg(unix)]
pub(crate) fn private_endpoint(socket_dir: Option<&Path>) -> PathBuf {
    let dir = socket_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(std::env::temp_dir);
    socket_path(&dir, &Uuid::new_v4())
}

#[cfg(windows)]
pub(crate) fn private_endpoint(_socket_dir: Option<&Path>) -> PathBuf {
    PathBuf::from(pipe_name(&Uuid::new_v4()))
}

#[cfg(unix)]
pub(crate) async fn connect(endpoint: &Path) -> io::Result<IpcStream> {
    tokio::net::UnixStream::connect(endpoint).await
}

#[cfg(windows)]
pub(crate) async fn connect(endpoint: &Path) -> io::Result<IpcStream> {
    tokio::net::windows::named_pipe::ClientOptions::new().open(endpoint)
}

/// Removes what the engine left behind. Pipes vanish with their server.
#[cfg(unix)]
pub(crate) async fn cleanup(endpoint: &Path) {
    let _ = tokio::fs::remove_file(endpoint).await;
}

#[cfg(windows)]
pub(crate) async fn cleanup(_endpoint: &Path) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipe_name() {
        let id = Uuid::parse_str("67e55044-10b1-426f-9247-bb680e5fe0c8").unwrap();
        assert_eq!(
            pipe_name(&id),
            r"\\.\pipe\pmoplayer-mpv-67e55044-10b1-426f-9247-bb680e5fe0c8"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_socket_path() {
        let id = Uuid::parse_str("67e55044-10b1-426f-9247-bb680e5fe0c8").unwrap();
        assert_eq!(
            socket_path(Path::new("/run/user/1000"), &id),
            PathBuf::from("/run/user/1000/pmoplayer-mpv-67e55044-10b1-426f-9247-bb680e5fe0c8.sock")
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_private_endpoints_are_unique() {
        let dir = Path::new("/tmp");
        let a = private_endpoint(Some(dir));
        let b = private_endpoint(Some(dir));
        assert_ne!(a, b);
        assert!(a.starts_with(dir));
    }
}
