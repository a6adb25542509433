use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::{Arc, Mutex as StdMutex};
use tracing::{debug, warn};

use crate::catalog::ShortId;
use crate::constants::constants;

/// Durable key-value storage for the like mapping.
pub trait LikeStorage {
  fn read(&self, key: &str) -> Result<Option<String>>;
  fn write(&mut self, key: &str, value: &str) -> Result<()>;
}

/// JSON object of key → string value kept in a single file.
///
/// Writes go to a sibling temp file that is renamed over the target, so a
/// reader sees either the previous contents or the new ones.
pub struct FileStorage {
  path: PathBuf,
}

impl FileStorage {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }

  /// `likes.json` in the platform data directory.
  pub fn default_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "shortflix").map(|dirs| dirs.data_dir().join(&constants().likes_file))
  }

  fn read_all(&self) -> Result<HashMap<String, String>> {
    let content = match std::fs::read_to_string(&self.path) {
      Ok(content) => content,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
      Err(e) => return Err(anyhow!(e).context(format!("Failed to read {}", self.path.display()))),
    };
    serde_json::from_str(&content).with_context(|| format!("Malformed storage file {}", self.path.display()))
  }
}

impl LikeStorage for FileStorage {
  fn read(&self, key: &str) -> Result<Option<String>> {
    Ok(self.read_all()?.remove(key))
  }

  fn write(&mut self, key: &str, value: &str) -> Result<()> {
    // A corrupt file is replaced rather than blocking every future write.
    let mut entries = self.read_all().unwrap_or_default();
    entries.insert(key.to_string(), value.to_string());

    if let Some(dir) = self.path.parent() {
      std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    let content = serde_json::to_string_pretty(&entries).context("Failed to encode storage file")?;
    let tmp = self.path.with_extension("json.tmp");
    std::fs::write(&tmp, content).with_context(|| format!("Failed to write {}", tmp.display()))?;
    std::fs::rename(&tmp, &self.path)
      .with_context(|| format!("Failed to replace {} with {}", self.path.display(), tmp.display()))?;
    Ok(())
  }
}

/// Session-only storage. Clones share the same entries.
#[derive(Clone, Default)]
pub struct MemoryStorage {
  entries: Arc<StdMutex<HashMap<String, String>>>,
}

impl LikeStorage for MemoryStorage {
  fn read(&self, key: &str) -> Result<Option<String>> {
    let entries = self.entries.lock().map_err(|_| anyhow!("Memory storage lock poisoned"))?;
    Ok(entries.get(key).cloned())
  }

  fn write(&mut self, key: &str, value: &str) -> Result<()> {
    let mut entries = self.entries.lock().map_err(|_| anyhow!("Memory storage lock poisoned"))?;
    entries.insert(key.to_string(), value.to_string());
    Ok(())
  }
}

/// Per-item liked flags, written through to storage on every toggle.
pub struct LikeStore {
  likes: BTreeMap<ShortId, bool>,
  storage: Box<dyn LikeStorage>,
  key: String,
}

impl LikeStore {
  /// Load the persisted mapping under `key`. Missing, unreadable or
  /// malformed data yields an empty store.
  pub fn rehydrate(storage: Box<dyn LikeStorage>, key: &str) -> Self {
    let likes = match storage.read(key) {
      Ok(Some(raw)) => decode_likes(&raw).unwrap_or_else(|e| {
        warn!(err = %format!("{:#}", e), "likes: ignoring malformed stored likes");
        BTreeMap::new()
      }),
      Ok(None) => BTreeMap::new(),
      Err(e) => {
        warn!(err = %format!("{:#}", e), "likes: storage read failed");
        BTreeMap::new()
      }
    };
    debug!(count = likes.len(), "likes: rehydrated");
    Self { likes, storage, key: key.to_string() }
  }

  pub fn is_liked(&self, id: &ShortId) -> bool {
    self.likes.get(id).copied().unwrap_or(false)
  }

  pub fn entries(&self) -> &BTreeMap<ShortId, bool> {
    &self.likes
  }

  /// Flip the flag for `id` and persist. Returns the new flag.
  ///
  /// The in-memory flag is flipped even if the write fails.
  pub fn toggle(&mut self, id: &ShortId) -> Result<bool> {
    let liked = !self.is_liked(id);
    self.likes.insert(id.clone(), liked);
    debug!(id = %id, liked, "likes: toggled");
    self.persist()?;
    Ok(liked)
  }

  pub fn persist(&mut self) -> Result<()> {
    let encoded = serde_json::to_string(&self.likes).context("Failed to encode likes")?;
    self.storage.write(&self.key, &encoded).context("Failed to persist likes")
  }
}

/// Decode a stored JSON object of id → bool. Keys are always strings in
/// JSON, so numeric ids from older stores land on the same `ShortId` the
/// catalog produces. Non-boolean values are dropped.
fn decode_likes(raw: &str) -> Result<BTreeMap<ShortId, bool>> {
  let value: serde_json::Value = serde_json::from_str(raw).context("Stored likes are not valid JSON")?;
  let serde_json::Value::Object(map) = value else {
    return Err(anyhow!("Stored likes are not a JSON object"));
  };
  Ok(map.into_iter().filter_map(|(k, v)| v.as_bool().map(|liked| (ShortId::new(k), liked))).collect())
}
