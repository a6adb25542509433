use anyhow::{Context, Result, anyhow};
use image::DynamicImage;
use std::process::Stdio;
use tokio::process::Command;

use crate::constants::constants;

/// ffmpeg arguments that decode a single frame of `video_url` as PNG on stdout.
fn poster_args(video_url: &str, seek_secs: f64, width: u32) -> Vec<String> {
  vec![
    "-hide_banner".into(),
    "-loglevel".into(),
    "error".into(),
    "-ss".into(),
    format!("{:.2}", seek_secs),
    "-i".into(),
    video_url.into(),
    "-frames:v".into(),
    "1".into(),
    "-an".into(),
    "-vf".into(),
    format!("scale={}:-2", width),
    "-f".into(),
    "image2pipe".into(),
    "-vcodec".into(),
    "png".into(),
    "-".into(),
  ]
}

/// Grab a poster frame near the start of the video with ffmpeg.
pub async fn extract_poster(video_url: &str) -> Result<DynamicImage> {
  if video_url.trim().is_empty() {
    return Err(anyhow!("Item has no video URL"));
  }
  let c = constants();
  let output = Command::new("ffmpeg")
    .args(poster_args(video_url, c.poster_seek_secs, c.poster_width))
    .stdin(Stdio::null())
    .stdout(Stdio::piped())
    .stderr(Stdio::piped())
    .kill_on_drop(true)
    .output()
    .await
    .map_err(|e| {
      if e.kind() == std::io::ErrorKind::NotFound {
        anyhow!("ffmpeg not found. Install it with: brew install ffmpeg (macOS) or apt install ffmpeg (Linux)")
      } else {
        anyhow!(e).context("Failed to execute ffmpeg for poster frame")
      }
    })?;

  if !output.status.success() || output.stdout.is_empty() {
    return Err(anyhow!("ffmpeg poster extraction failed: {}", String::from_utf8_lossy(&output.stderr).trim()));
  }

  image::load_from_memory(&output.stdout).with_context(|| format!("Failed to decode poster frame for {}", video_url))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn poster_args_single_png_frame() {
    let args = poster_args("https://cdn.example/a.mp4", 0.5, 480);
    let joined = args.join(" ");
    assert!(joined.contains("-ss 0.50 -i https://cdn.example/a.mp4"));
    assert!(joined.contains("-frames:v 1"));
    assert!(joined.contains("scale=480:-2"));
    assert_eq!(args.last().map(String::as_str), Some("-"));
  }

  #[tokio::test]
  async fn empty_url_is_rejected_without_spawning() {
    assert!(extract_poster("  ").await.is_err());
  }
}
