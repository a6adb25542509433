use anyhow::{Context, Result, anyhow};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tokio::sync::oneshot;
use tracing::{info, warn};

use crate::constants::constants;

/// Canonical item identifier.
///
/// The catalog endpoint may send ids as JSON strings or numbers; both are
/// coerced to their textual form here so the rest of the app (and the like
/// store) compares a single key type.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ShortId(String);

impl ShortId {
  pub fn new(id: impl Into<String>) -> Self {
    Self(id.into())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for ShortId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for ShortId {
  fn from(s: &str) -> Self {
    Self(s.to_string())
  }
}

impl From<u64> for ShortId {
  fn from(n: u64) -> Self {
    Self(n.to_string())
  }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
  Text(String),
  Number(serde_json::Number),
}

impl<'de> Deserialize<'de> for ShortId {
  fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    Ok(match RawId::deserialize(deserializer)? {
      RawId::Text(s) => ShortId(s),
      RawId::Number(n) => ShortId(n.to_string()),
    })
  }
}

/// A single catalog entry.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ShortItem {
  pub id: ShortId,
  #[serde(default)]
  pub title: String,
  #[serde(default, rename = "videoUrl")]
  pub video_url: String,
  #[serde(default)]
  pub tags: Vec<String>,
}

/// Decode a catalog response body.
///
/// The body must be a JSON array. Entries that cannot be read as a
/// `ShortItem` (not an object, missing or mistyped id) are skipped, as are
/// repeated ids after their first occurrence.
pub fn decode_catalog(body: &str) -> Result<Vec<ShortItem>> {
  let value: serde_json::Value = serde_json::from_str(body).context("Catalog response is not valid JSON")?;
  let serde_json::Value::Array(entries) = value else {
    return Err(anyhow!("Catalog response is not a JSON array"));
  };

  let mut seen = HashSet::new();
  let mut items = Vec::with_capacity(entries.len());
  for (idx, entry) in entries.into_iter().enumerate() {
    match serde_json::from_value::<ShortItem>(entry) {
      Ok(item) if seen.insert(item.id.clone()) => items.push(item),
      Ok(item) => warn!(index = idx, id = %item.id, "catalog: duplicate id skipped"),
      Err(e) => warn!(index = idx, err = %e, "catalog: malformed entry skipped"),
    }
  }
  Ok(items)
}

/// Build the catalog URL from an API base such as `http://localhost:3000`.
pub fn catalog_url(api_base: &str) -> String {
  format!("{}{}", api_base.trim_end_matches('/'), constants().catalog_path)
}

pub async fn fetch_catalog(client: &Client, url: &str) -> Result<Vec<ShortItem>> {
  let response = client.get(url).send().await.with_context(|| format!("Failed to reach catalog endpoint {}", url))?;
  let status = response.status();
  if !status.is_success() {
    return Err(anyhow!("Catalog endpoint returned {}", status));
  }
  let body = response.text().await.context("Failed to read catalog response body")?;
  decode_catalog(&body)
}

/// One-shot catalog loader.
///
/// `start` spawns the fetch at most once per loader; `poll` hands back the
/// catalog exactly once when the fetch settles. Failures settle as an empty
/// catalog.
pub struct CatalogLoader {
  rx: Option<oneshot::Receiver<Result<Vec<ShortItem>>>>,
  started: bool,
  loading: bool,
}

impl Default for CatalogLoader {
  fn default() -> Self {
    Self::new()
  }
}

impl CatalogLoader {
  pub fn new() -> Self {
    Self { rx: None, started: false, loading: true }
  }

  /// A loader whose fetch has already settled.
  #[cfg(test)]
  pub(crate) fn settled() -> Self {
    Self { rx: None, started: true, loading: false }
  }

  pub fn is_loading(&self) -> bool {
    self.loading
  }

  pub fn start(&mut self, client: Client, url: String) {
    if self.started {
      return;
    }
    self.started = true;
    info!(url = %url, "catalog: load started");

    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
      let _ = tx.send(fetch_catalog(&client, &url).await);
    });
    self.rx = Some(rx);
  }

  pub fn poll(&mut self) -> Option<Vec<ShortItem>> {
    let mut rx = self.rx.take()?;
    let items = match rx.try_recv() {
      Ok(Ok(items)) => {
        info!(count = items.len(), "catalog: loaded");
        items
      }
      Ok(Err(e)) => {
        warn!(err = %format!("{:#}", e), "catalog: load failed, showing empty catalog");
        Vec::new()
      }
      Err(oneshot::error::TryRecvError::Empty) => {
        self.rx = Some(rx);
        return None;
      }
      Err(oneshot::error::TryRecvError::Closed) => {
        warn!("catalog: load task ended without a result");
        Vec::new()
      }
    };
    self.loading = false;
    Some(items)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::time::Duration;
  use tokio::io::{AsyncReadExt, AsyncWriteExt};
  use tokio::net::TcpListener;

  // --- decode_catalog ---

  #[test]
  fn decode_numeric_and_string_ids() {
    let body = r#"[
      {"id": 1, "title": "Cat Fun", "videoUrl": "https://cdn/1.mp4", "tags": ["cats", "funny"]},
      {"id": "abc", "title": "Dog Run", "videoUrl": "https://cdn/2.mp4", "tags": ["dogs"]}
    ]"#;
    let items = decode_catalog(body).unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].id, ShortId::from(1u64));
    assert_eq!(items[0].id.as_str(), "1");
    assert_eq!(items[0].video_url, "https://cdn/1.mp4");
    assert_eq!(items[1].id.as_str(), "abc");
    assert_eq!(items[1].tags, vec!["dogs".to_string()]);
  }

  #[test]
  fn decode_missing_fields_default_to_empty() {
    let items = decode_catalog(r#"[{"id": 7}]"#).unwrap();
    assert_eq!(items[0].title, "");
    assert_eq!(items[0].video_url, "");
    assert!(items[0].tags.is_empty());
  }

  #[test]
  fn decode_skips_malformed_entries() {
    let body = r#"[{"title": "no id"}, 42, {"id": true}, {"id": 3, "title": "ok"}, {"id": 4, "tags": "oops"}]"#;
    let items = decode_catalog(body).unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id.as_str(), "3");
  }

  #[test]
  fn decode_keeps_first_of_duplicate_ids() {
    let items = decode_catalog(r#"[{"id": 1, "title": "a"}, {"id": "1", "title": "b"}]"#).unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].title, "a");
  }

  #[test]
  fn decode_rejects_non_array() {
    assert!(decode_catalog(r#"{"items": []}"#).is_err());
    assert!(decode_catalog("not json").is_err());
  }

  #[test]
  fn catalog_url_joins_base() {
    assert_eq!(catalog_url("http://localhost:3000"), "http://localhost:3000/api/shorts");
    assert_eq!(catalog_url("http://localhost:3000/"), "http://localhost:3000/api/shorts");
  }

  // --- CatalogLoader ---

  /// Serve exactly one HTTP response on an ephemeral port and return the base URL.
  async fn serve_once(status_line: &'static str, body: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
      let (mut socket, _) = listener.accept().await.unwrap();
      let mut buf = [0u8; 4096];
      let _ = socket.read(&mut buf).await;
      let response = format!(
        "{}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status_line,
        body.len(),
        body
      );
      let _ = socket.write_all(response.as_bytes()).await;
      let _ = socket.shutdown().await;
    });
    format!("http://{}", addr)
  }

  async fn settle(loader: &mut CatalogLoader) -> Vec<ShortItem> {
    for _ in 0..200 {
      if let Some(items) = loader.poll() {
        return items;
      }
      tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("catalog loader never settled");
  }

  #[tokio::test]
  async fn loader_delivers_catalog_once() {
    let base = serve_once("HTTP/1.1 200 OK", r#"[{"id": 1, "title": "Cat Fun", "tags": ["cats"]}]"#).await;
    let mut loader = CatalogLoader::new();
    assert!(loader.is_loading());
    loader.start(Client::new(), catalog_url(&base));

    let items = settle(&mut loader).await;
    assert_eq!(items.len(), 1);
    assert!(!loader.is_loading());
    assert!(loader.poll().is_none());
  }

  #[tokio::test]
  async fn loader_degrades_http_error_to_empty() {
    let base = serve_once("HTTP/1.1 500 Internal Server Error", "boom").await;
    let mut loader = CatalogLoader::new();
    loader.start(Client::new(), catalog_url(&base));

    assert!(settle(&mut loader).await.is_empty());
    assert!(!loader.is_loading());
  }

  #[tokio::test]
  async fn loader_degrades_unreachable_endpoint_to_empty() {
    // Bind then drop to get a port nothing listens on.
    let addr = TcpListener::bind("127.0.0.1:0").await.unwrap().local_addr().unwrap();
    let mut loader = CatalogLoader::new();
    loader.start(Client::new(), format!("http://{}/api/shorts", addr));

    assert!(settle(&mut loader).await.is_empty());
    assert!(!loader.is_loading());
  }

  #[tokio::test]
  async fn loader_start_is_idempotent() {
    let base = serve_once("HTTP/1.1 200 OK", "[]").await;
    let mut loader = CatalogLoader::new();
    loader.start(Client::new(), catalog_url(&base));
    // A second start would hit a listener that no longer accepts; it must be ignored.
    loader.start(Client::new(), catalog_url(&base));
    assert!(settle(&mut loader).await.is_empty());
    assert!(!loader.is_loading());
  }
}
