//! Control socket between CLI commands and the running popout
//!
//! Each CLI invocation connects, sends one `ControlRequest` and waits for
//! the projector's `ControlResponse`. Frames are a u32 little-endian length
//! followed by that many bytes of JSON.

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};

use crate::constants::ipc::{MAX_MESSAGE_SIZE, SOCKET_PATH};

mod handler;
mod messages;
pub use handler::spawn_ipc_listener;
pub use messages::{ControlRequest, ControlResponse};

/// Socket under XDG_RUNTIME_DIR, or the cache dir when that is unset
pub fn default_socket_path() -> Result<PathBuf> {
    if let Ok(runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
        return Ok(PathBuf::from(runtime_dir).join(SOCKET_PATH));
    }

    let cache = dirs::cache_dir()
        .context("Failed to determine cache directory (no XDG_RUNTIME_DIR or HOME)")?;
    Ok(cache.join(SOCKET_PATH))
}

/// One CLI connection to the popout
pub struct ControlClient {
    pub(crate) stream: UnixStream,
}

impl ControlClient {
    pub fn connect() -> Result<Self> {
        let path = default_socket_path()?;
        Self::connect_to(&path)
    }

    pub fn connect_to(path: &Path) -> Result<Self> {
        let stream = UnixStream::connect(path)
            .context(format!("Failed to connect to popout at {} (is `popout` running?)", path.display()))?;
        Ok(Self { stream })
    }

    pub fn send_request(&mut self, req: &ControlRequest) -> Result<()> {
        write_message(&mut self.stream, req)
    }

    /// Blocks until the projector answers
    pub fn recv_response(&mut self) -> Result<ControlResponse> {
        read_message(&mut self.stream)
    }

    /// One request, one response
    pub fn request(&mut self, req: ControlRequest) -> Result<ControlResponse> {
        self.send_request(&req)?;
        self.recv_response()
    }
}

/// Listening end, owned by the popout process
pub struct ControlServer {
    listener: UnixListener,
    socket_path: PathBuf,
}

impl ControlServer {
    pub fn bind() -> Result<Self> {
        let socket_path = default_socket_path()?;
        Self::bind_to(socket_path)
    }

    /// Refuses to start while another popout answers on the socket
    pub fn bind_to(socket_path: PathBuf) -> Result<Self> {
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent)
                .context(format!("Failed to create socket directory: {}", parent.display()))?;
        }

        // A previous popout that crashed leaves its socket behind
        if socket_path.exists() {
            if UnixStream::connect(&socket_path).is_ok() {
                return Err(anyhow!("A popout is already running on {}", socket_path.display()));
            }
            std::fs::remove_file(&socket_path)
                .context(format!("Failed to remove stale socket: {}", socket_path.display()))?;
        }

        let listener = UnixListener::bind(&socket_path)
            .context(format!("Failed to bind socket at {}", socket_path.display()))?;

        // Only the owning user may drive the projector
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&socket_path, std::fs::Permissions::from_mode(0o700))
                .context("Failed to set socket permissions")?;
        }

        Ok(Self {
            listener,
            socket_path,
        })
    }

    pub fn accept(&self) -> Result<UnixStream> {
        let (stream, _addr) = self.listener.accept()
            .context("Failed to accept IPC connection")?;
        Ok(stream)
    }

    pub fn path(&self) -> &Path {
        &self.socket_path
    }
}

impl Drop for ControlServer {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.socket_path);
    }
}

/// One frame: length, then JSON
pub(crate) fn write_message<W: Write, T: Serialize>(stream: &mut W, msg: &T) -> Result<()> {
    let json = serde_json::to_vec(msg).context("Failed to serialize message to JSON")?;
    if json.len() > MAX_MESSAGE_SIZE {
        return Err(anyhow!("Message too large: {} bytes (max: {})", json.len(), MAX_MESSAGE_SIZE));
    }

    let len = json.len() as u32;
    stream
        .write_all(&len.to_le_bytes())
        .context("Failed to write message length")?;

    stream
        .write_all(&json)
        .context("Failed to write message payload")?;

    stream.flush().context("Failed to flush stream")?;

    Ok(())
}

/// Frames over the size cap are refused before anything is allocated
pub(crate) fn read_message<R: Read, T: for<'de> Deserialize<'de>>(stream: &mut R) -> Result<T> {
    let mut len_buf = [0u8; 4];
    stream
        .read_exact(&mut len_buf)
        .context("Failed to read message length")?;
    let len = u32::from_le_bytes(len_buf) as usize;

    if len > MAX_MESSAGE_SIZE {
        return Err(anyhow!("Message too large: {} bytes (max: {})", len, MAX_MESSAGE_SIZE));
    }

    let mut json_buf = vec![0u8; len];
    stream
        .read_exact(&mut json_buf)
        .context("Failed to read message payload")?;

    serde_json::from_slice(&json_buf).context("Failed to deserialize message from JSON")
}
