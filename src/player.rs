use anyhow::{Context, Result, anyhow};
use std::process::Stdio;
use tokio::{
  io::AsyncBufReadExt,
  io::BufReader as TokioBufReader,
  process::{Child as TokioChild, Command},
  sync::mpsc,
  task::JoinHandle,
};
use tracing::info;

use crate::catalog::ShortItem;

/// The player overlay: closed, or open on exactly one item.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Selection {
  #[default]
  Closed,
  Open(ShortItem),
}

impl Selection {
  /// Open on `item`, replacing any current selection.
  pub fn select(&mut self, item: ShortItem) {
    *self = Selection::Open(item);
  }

  /// Close the overlay. Returns whether it was open.
  pub fn close(&mut self) -> bool {
    matches!(std::mem::take(self), Selection::Open(_))
  }

  pub fn current(&self) -> Option<&ShortItem> {
    match self {
      Selection::Open(item) => Some(item),
      Selection::Closed => None,
    }
  }

  pub fn is_open(&self) -> bool {
    matches!(self, Selection::Open(_))
  }
}

/// Plays one video at a time in an external mpv window.
pub struct VideoPlayer {
  current_process: Option<TokioChild>,
  monitor_handle: Option<JoinHandle<()>>,
  status_rx: Option<mpsc::Receiver<String>>,
  last_status: Option<String>,
  ipc_socket_path: Option<String>,
  pub paused: bool,
}

impl VideoPlayer {
  pub fn new() -> Self {
    Self {
      current_process: None,
      monitor_handle: None,
      status_rx: None,
      last_status: None,
      ipc_socket_path: None,
      paused: false,
    }
  }

  pub fn is_playing(&self) -> bool {
    self.current_process.is_some()
  }

  pub fn check_status(&mut self) {
    if let Some(rx) = &mut self.status_rx {
      while let Ok(status) = rx.try_recv() {
        self.last_status = Some(status);
      }
    }
  }

  pub fn last_status(&self) -> Option<&str> {
    self.last_status.as_deref()
  }

  /// Start playing `item`, stopping whatever was playing before.
  pub async fn play(&mut self, item: &ShortItem) -> Result<()> {
    self.stop().await.context("Failed to stop previous playback")?;
    if item.video_url.trim().is_empty() {
      return Err(anyhow!("'{}' has no video URL", item.title));
    }

    let socket_path = std::env::temp_dir().join(format!("shortflix-mpv-{}.sock", std::process::id()));
    let socket_path_str = socket_path.to_str().context("Temp dir path is not valid UTF-8")?.to_string();
    // Remove stale socket if it exists from a previous crash.
    let _ = std::fs::remove_file(&socket_path);

    let mut cmd = Command::new("mpv");
    cmd.args([
      "--force-window=yes",
      "--keep-open=no",
      &format!("--title={}", item.title),
      "--term-status-msg=Time: ${time-pos} / ${duration} | ${pause} ${percent-pos}%",
      &format!("--input-ipc-server={}", socket_path_str),
      "--",
      &item.video_url,
    ]);
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    // stderr is never drained, so it must not be piped.
    cmd.stderr(Stdio::null());
    cmd.kill_on_drop(true);

    let mut child = cmd.spawn().map_err(|e| {
      if e.kind() == std::io::ErrorKind::NotFound {
        anyhow!("mpv not found. Install it with: brew install mpv (macOS) or apt install mpv (Linux)")
      } else {
        anyhow!(e).context("Failed to spawn mpv process")
      }
    })?;

    let stdout = child.stdout.take().context("Failed to get mpv stdout")?;
    let (tx, rx) = mpsc::channel::<String>(10);
    self.status_rx = Some(rx);

    let monitor_handle = tokio::spawn(async move {
      let mut lines = TokioBufReader::new(stdout).lines();
      while let Ok(Some(line)) = lines.next_line().await {
        if tx.send(line).await.is_err() {
          break;
        }
      }
    });

    info!(id = %item.id, url = %item.video_url, "player: started mpv");
    self.current_process = Some(child);
    self.monitor_handle = Some(monitor_handle);
    self.ipc_socket_path = Some(socket_path_str);
    self.paused = false;
    Ok(())
  }

  pub async fn toggle_pause(&mut self) -> Result<()> {
    let Some(ref socket_path) = self.ipc_socket_path else {
      return Ok(());
    };
    let stream = tokio::net::UnixStream::connect(socket_path).await.context("Failed to connect to mpv IPC socket")?;
    stream.writable().await.context("mpv IPC socket not writable")?;
    let cmd = b"{\"command\":[\"cycle\",\"pause\"]}\n";
    let written = stream.try_write(cmd).context("Failed to send pause command to mpv")?;
    if written < cmd.len() {
      return Err(anyhow!("Partial write to mpv IPC socket: wrote {} of {} bytes", written, cmd.len()));
    }
    self.paused = !self.paused;
    Ok(())
  }

  pub async fn stop(&mut self) -> Result<()> {
    if let Some(handle) = self.monitor_handle.take() {
      handle.abort();
      let _ = handle.await;
    }
    self.status_rx = None;
    self.last_status = None;

    if let Some(mut child) = self.current_process.take() {
      // mpv may already have exited if the user closed its window.
      if child.try_wait().ok().flatten().is_none() {
        child.kill().await.context("Failed to kill mpv process")?;
      }
      let _ = child.wait().await;
      info!("player: stopped mpv");
    }
    self.paused = false;

    if let Some(path) = self.ipc_socket_path.take() {
      let _ = std::fs::remove_file(&path);
    }
    Ok(())
  }
}
