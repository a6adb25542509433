use anyhow::Result;
use image::DynamicImage;
use reqwest::Client;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::catalog::{CatalogLoader, ShortId, ShortItem, catalog_url};
use crate::config::Config;
use crate::display::DisplayMode;
use crate::filter::{Filter, all_tags};
use crate::grid::{self, Move};
use crate::likes::LikeStore;
use crate::player::{Selection, VideoPlayer};
use crate::preview::extract_poster;
use crate::theme::THEMES;

// --- Types ---

pub type PosterResult = (ShortId, Result<DynamicImage>);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
  /// Navigating the card grid.
  Grid,
  /// Editing the search query.
  Search,
  /// Navigating the tag bar.
  Tags,
}

/// Poster frame for the open overlay.
#[derive(Default)]
pub struct PosterState {
  pub image: Option<(ShortId, DynamicImage)>,
  /// Poster resized for the last overlay area: (id, cols, rows, image).
  pub resized: Option<(ShortId, u16, u16, DynamicImage)>,
  pub failed: bool,
  rx: Option<oneshot::Receiver<PosterResult>>,
}

impl PosterState {
  fn clear(&mut self) {
    *self = Self::default();
  }
}

/// Startup inputs resolved from CLI, prefs and storage.
pub struct AppSettings {
  pub api_base: String,
  pub theme_index: usize,
  pub display_mode: DisplayMode,
  pub likes: LikeStore,
}

pub struct App {
  pub mode: AppMode,
  pub theme_index: usize,
  pub display_mode: DisplayMode,
  pub api_base: String,
  http_client: Client,
  loader: CatalogLoader,
  /// Full catalog as last fetched. Replaced wholesale, never patched.
  pub catalog: Vec<ShortItem>,
  /// Distinct catalog tags in first-appearance order.
  pub tags: Vec<String>,
  pub filter: Filter,
  /// Indices into `catalog` of the visible cards.
  pub visible: Vec<usize>,
  /// Focused card, as an index into `visible`.
  pub cursor: usize,
  pub grid_columns: usize,
  pub grid_scroll: usize,
  /// Focused tag chip: 0 is "All", `i + 1` is `tags[i]`.
  pub tag_cursor: usize,
  pub search_cursor: usize,
  pub search_scroll: usize,
  pub likes: LikeStore,
  pub selection: Selection,
  pub player: VideoPlayer,
  pub poster: PosterState,
  pub last_error: Option<String>,
  pub should_quit: bool,
  error_time: Option<Instant>,
}

impl App {
  pub fn new(settings: AppSettings) -> Self {
    Self {
      mode: AppMode::Grid,
      theme_index: settings.theme_index.min(THEMES.len() - 1),
      display_mode: settings.display_mode,
      api_base: settings.api_base,
      http_client: Client::new(),
      loader: CatalogLoader::new(),
      catalog: Vec::new(),
      tags: Vec::new(),
      filter: Filter::default(),
      visible: Vec::new(),
      cursor: 0,
      grid_columns: 1,
      grid_scroll: 0,
      tag_cursor: 0,
      search_cursor: 0,
      search_scroll: 0,
      likes: settings.likes,
      selection: Selection::default(),
      player: VideoPlayer::new(),
      poster: PosterState::default(),
      last_error: None,
      should_quit: false,
      error_time: None,
    }
  }

  pub fn theme(&self) -> &'static crate::theme::Theme {
    &THEMES[self.theme_index]
  }

  pub fn next_theme(&mut self) {
    self.theme_index = (self.theme_index + 1) % THEMES.len();
    debug!(theme = self.theme().name, "theme changed");
    let mut config = Config::load();
    config.theme_name = Some(self.theme().name.to_string());
    config.save();
  }

  /// Set an error message with auto-dismiss tracking.
  pub fn set_error(&mut self, msg: String) {
    self.last_error = Some(msg);
    self.error_time = Some(Instant::now());
  }

  pub fn clear_error(&mut self) {
    self.last_error = None;
    self.error_time = None;
  }

  /// Clear stale error messages after 5 seconds.
  pub fn expire_error(&mut self) {
    if let Some(t) = self.error_time
      && t.elapsed() >= Duration::from_secs(5)
    {
      self.clear_error();
    }
  }

  // --- Catalog ---

  pub fn is_loading(&self) -> bool {
    self.loader.is_loading()
  }

  /// Kick off the one catalog fetch for this session.
  pub fn start_loading(&mut self) {
    self.loader.start(self.http_client.clone(), catalog_url(&self.api_base));
  }

  pub fn set_catalog(&mut self, items: Vec<ShortItem>) {
    self.tags = all_tags(&items);
    self.catalog = items;
    self.tag_cursor = self.tag_cursor.min(self.tags.len());
    self.recompute_filter();
  }

  /// Rebuild `visible` from the catalog and filter, keeping the cursor in range.
  pub fn recompute_filter(&mut self) {
    self.visible = self.filter.visible_indices(&self.catalog);
    self.cursor = self.cursor.min(self.visible.len().saturating_sub(1));
  }

  pub fn focused_item(&self) -> Option<&ShortItem> {
    self.visible.get(self.cursor).and_then(|&i| self.catalog.get(i))
  }

  pub fn move_cursor(&mut self, mv: Move) {
    self.cursor = grid::step(self.cursor, self.visible.len(), self.grid_columns, mv);
  }

  // --- Tags ---

  pub fn move_tag_cursor(&mut self, forward: bool) {
    let count = self.tags.len() + 1;
    self.tag_cursor = if forward { (self.tag_cursor + 1) % count } else { (self.tag_cursor + count - 1) % count };
  }

  /// Activate the focused chip: "All" clears the tag, a tag toggles.
  pub fn activate_tag(&mut self) {
    match self.tag_cursor.checked_sub(1).and_then(|i| self.tags.get(i)) {
      Some(tag) => {
        let tag = tag.clone();
        self.filter.toggle_tag(&tag);
      }
      None => self.filter.clear_tag(),
    }
    debug!(tag = ?self.filter.selected_tag, "tag filter changed");
    self.recompute_filter();
  }

  pub fn clear_filters(&mut self) {
    self.filter = Filter::default();
    self.search_cursor = 0;
    self.search_scroll = 0;
    self.tag_cursor = 0;
    self.recompute_filter();
  }

  // --- Likes ---

  pub fn is_liked(&self, id: &ShortId) -> bool {
    self.likes.is_liked(id)
  }

  pub fn toggle_like(&mut self, id: &ShortId) {
    if let Err(e) = self.likes.toggle(id) {
      warn!(id = %id, err = %format!("{:#}", e), "likes: persist failed");
      self.set_error(format!("Could not save like: {:#}", e));
    }
  }

  /// Like the focused card. Never opens the player.
  pub fn toggle_like_focused(&mut self) {
    if let Some(id) = self.focused_item().map(|item| item.id.clone()) {
      self.toggle_like(&id);
    }
  }

  /// Like the item open in the player overlay.
  pub fn toggle_like_selected(&mut self) {
    if let Some(id) = self.selection.current().map(|item| item.id.clone()) {
      self.toggle_like(&id);
    }
  }

  // --- Player ---

  pub async fn open_focused(&mut self) {
    if let Some(item) = self.focused_item().cloned() {
      self.open(item).await;
    }
  }

  /// Open the overlay on `item`, replacing any open item, and start playback.
  pub async fn open(&mut self, item: ShortItem) {
    info!(id = %item.id, title = %item.title, "player: open");
    self.clear_error();
    self.poster.clear();
    self.trigger_poster(&item);
    self.selection.select(item.clone());
    if let Err(e) = self.player.play(&item).await {
      warn!(id = %item.id, err = %format!("{:#}", e), "player: playback failed");
      self.set_error(format!("Playback error: {:#}", e));
    }
  }

  pub async fn close_overlay(&mut self) {
    if !self.selection.close() {
      return;
    }
    info!("player: close");
    self.poster.clear();
    if let Err(e) = self.player.stop().await {
      self.set_error(format!("Failed to stop playback: {:#}", e));
    }
  }

  pub async fn toggle_pause(&mut self) {
    if self.player.is_playing()
      && let Err(e) = self.player.toggle_pause().await
    {
      self.set_error(format!("Pause error: {:#}", e));
    }
  }

  fn trigger_poster(&mut self, item: &ShortItem) {
    let id = item.id.clone();
    let url = item.video_url.clone();
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
      let result = extract_poster(&url).await;
      let _ = tx.send((id, result));
    });
    self.poster.rx = Some(rx);
  }

  /// Accept a poster only if its item is still the one on screen.
  pub fn apply_poster(&mut self, (id, result): PosterResult) {
    if self.selection.current().map(|item| &item.id) != Some(&id) {
      debug!(id = %id, "poster: discarded for closed item");
      return;
    }
    match result {
      Ok(image) => self.poster.image = Some((id, image)),
      Err(e) => {
        debug!(id = %id, err = %format!("{:#}", e), "poster: extraction failed");
        self.poster.failed = true;
      }
    }
  }

  // --- Polling ---

  pub fn check_pending(&mut self) {
    if let Some(items) = self.loader.poll() {
      self.set_catalog(items);
    }

    if let Some(mut rx) = self.poster.rx.take() {
      match rx.try_recv() {
        Ok(result) => self.apply_poster(result),
        Err(oneshot::error::TryRecvError::Empty) => self.poster.rx = Some(rx),
        Err(oneshot::error::TryRecvError::Closed) => self.poster.failed = true,
      }
    }

    self.player.check_status();
  }

  pub async fn shutdown(&mut self) -> Result<()> {
    self.selection.close();
    self.player.stop().await
  }
}

#[cfg(test)]
pub(crate) mod tests {
  use super::*;
  use crate::likes::{LikeStorage, MemoryStorage};

  pub(crate) fn item(id: u64, title: &str, tags: &[&str]) -> ShortItem {
    ShortItem {
      id: ShortId::from(id),
      title: title.to_string(),
      video_url: format!("https://cdn.example/{}.mp4", id),
      tags: tags.iter().map(|t| t.to_string()).collect(),
    }
  }

  pub(crate) fn test_app() -> (App, MemoryStorage) {
    let storage = MemoryStorage::default();
    let likes = LikeStore::rehydrate(Box::new(storage.clone()), "shortflix:likes");
    let app = App::new(AppSettings {
      api_base: "http://127.0.0.1:9".to_string(),
      theme_index: 0,
      display_mode: DisplayMode::Ascii,
      likes,
    });
    (app, storage)
  }

  pub(crate) fn scenario_app() -> App {
    let (mut app, _) = test_app();
    app.loader = CatalogLoader::settled();
    app.set_catalog(vec![item(1, "Cat Fun", &["cats", "funny"]), item(2, "Dog Run", &["dogs"])]);
    app
  }

  fn visible_ids(app: &App) -> Vec<String> {
    app.visible.iter().map(|&i| app.catalog[i].id.to_string()).collect()
  }

  #[test]
  fn new_app_is_loading_with_empty_catalog() {
    let (app, _) = test_app();
    assert!(app.is_loading());
    assert!(app.catalog.is_empty());
    assert!(!app.selection.is_open());
  }

  #[test]
  fn set_catalog_shows_everything_and_collects_tags() {
    let app = scenario_app();
    assert_eq!(visible_ids(&app), vec!["1", "2"]);
    assert_eq!(app.tags, vec!["cats", "funny", "dogs"]);
  }

  #[test]
  fn query_narrows_and_clamps_cursor() {
    let mut app = scenario_app();
    app.cursor = 1;
    app.filter.query = "cat".to_string();
    app.recompute_filter();
    assert_eq!(visible_ids(&app), vec!["1"]);
    assert_eq!(app.cursor, 0);
  }

  #[test]
  fn tag_chip_toggles_and_all_clears() {
    let mut app = scenario_app();
    app.tag_cursor = 3; // "dogs"
    app.activate_tag();
    assert_eq!(app.filter.selected_tag.as_deref(), Some("dogs"));
    assert_eq!(visible_ids(&app), vec!["2"]);

    app.activate_tag();
    assert_eq!(app.filter.selected_tag, None);
    assert_eq!(visible_ids(&app), vec!["1", "2"]);

    app.tag_cursor = 1;
    app.activate_tag();
    app.tag_cursor = 0;
    app.activate_tag();
    assert_eq!(app.filter.selected_tag, None);
  }

  #[test]
  fn tag_cursor_wraps_including_all_chip() {
    let mut app = scenario_app();
    app.move_tag_cursor(false);
    assert_eq!(app.tag_cursor, 3);
    app.move_tag_cursor(true);
    assert_eq!(app.tag_cursor, 0);
  }

  #[test]
  fn liking_focused_card_does_not_open_player() {
    let (mut app, storage) = test_app();
    app.set_catalog(vec![item(1, "Cat Fun", &["cats"])]);
    app.toggle_like_focused();
    assert!(app.is_liked(&ShortId::from(1u64)));
    assert!(!app.selection.is_open());
    assert_eq!(storage.read("shortflix:likes").unwrap().as_deref(), Some(r#"{"1":true}"#));
  }

  #[test]
  fn like_on_empty_grid_is_ignored() {
    let (mut app, storage) = test_app();
    app.set_catalog(Vec::new());
    app.toggle_like_focused();
    assert!(storage.read("shortflix:likes").unwrap().is_none());
  }

  #[test]
  fn catalog_replacement_keeps_filter() {
    let mut app = scenario_app();
    app.filter.query = "run".to_string();
    app.recompute_filter();
    app.set_catalog(vec![item(9, "Morning Run", &[]), item(10, "Nap", &[])]);
    assert_eq!(visible_ids(&app), vec!["9"]);
  }

  #[test]
  fn clear_filters_resets_everything() {
    let mut app = scenario_app();
    app.filter.query = "zzz".to_string();
    app.filter.selected_tag = Some("cats".to_string());
    app.recompute_filter();
    assert!(app.visible.is_empty());
    app.clear_filters();
    assert_eq!(visible_ids(&app), vec!["1", "2"]);
  }

  #[test]
  fn poster_for_closed_item_is_discarded() {
    let mut app = scenario_app();
    app.selection.select(item(2, "Dog Run", &["dogs"]));
    app.apply_poster((ShortId::from(1u64), Ok(DynamicImage::new_rgb8(4, 4))));
    assert!(app.poster.image.is_none());
    app.apply_poster((ShortId::from(2u64), Ok(DynamicImage::new_rgb8(4, 4))));
    assert!(app.poster.image.is_some());
  }

  #[test]
  fn failed_poster_marks_placeholder() {
    let mut app = scenario_app();
    app.selection.select(item(1, "Cat Fun", &[]));
    app.apply_poster((ShortId::from(1u64), Err(anyhow::anyhow!("no ffmpeg"))));
    assert!(app.poster.failed);
  }

  #[tokio::test]
  async fn failed_fetch_settles_to_empty_catalog() {
    let (mut app, _) = test_app();
    let addr = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap().local_addr().unwrap();
    app.api_base = format!("http://{}", addr);
    app.start_loading();
    for _ in 0..200 {
      app.check_pending();
      if !app.is_loading() {
        break;
      }
      tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(!app.is_loading());
    assert!(app.catalog.is_empty());
    assert!(app.visible.is_empty());
  }

  #[tokio::test]
  async fn close_overlay_when_closed_is_a_no_op() {
    let mut app = scenario_app();
    app.close_overlay().await;
    assert!(!app.selection.is_open());
    assert!(app.last_error.is_none());
  }
}
