use ratatui::crossterm::event::{self, KeyCode, KeyModifiers};

use crate::app::{App, AppMode};
use crate::grid::Move;

// --- Helpers ---

/// Convert a char index to a byte offset within the string.
pub fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
  s.char_indices().nth(char_idx).map_or(s.len(), |(i, _)| i)
}

// --- Event Handling ---

pub async fn handle_key_event(app: &mut App, key: event::KeyEvent) {
  if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
    app.should_quit = true;
    return;
  }

  if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('t') {
    app.next_theme();
    return;
  }

  // The overlay captures every other key while it is open.
  if app.selection.is_open() {
    handle_overlay_key(app, key).await;
    return;
  }

  match app.mode {
    AppMode::Grid => handle_grid_key(app, key).await,
    AppMode::Search => handle_search_key(app, key),
    AppMode::Tags => handle_tags_key(app, key),
  }
}

async fn handle_overlay_key(app: &mut App, key: event::KeyEvent) {
  match key.code {
    KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('x') => app.close_overlay().await,
    KeyCode::Char(' ') | KeyCode::Char('p') => app.toggle_pause().await,
    KeyCode::Char('f') => app.toggle_like_selected(),
    _ => {}
  }
}

async fn handle_grid_key(app: &mut App, key: event::KeyEvent) {
  match key.code {
    KeyCode::Enter => app.open_focused().await,
    KeyCode::Char(' ') | KeyCode::Char('f') => app.toggle_like_focused(),
    KeyCode::Left | KeyCode::Char('h') => app.move_cursor(Move::Left),
    KeyCode::Right | KeyCode::Char('l') => app.move_cursor(Move::Right),
    KeyCode::Up | KeyCode::Char('k') => app.move_cursor(Move::Up),
    KeyCode::Down | KeyCode::Char('j') => app.move_cursor(Move::Down),
    KeyCode::Home | KeyCode::Char('g') => app.move_cursor(Move::First),
    KeyCode::End | KeyCode::Char('G') => app.move_cursor(Move::Last),
    KeyCode::Char('/') => {
      app.clear_error();
      app.search_cursor = app.filter.query.chars().count();
      app.mode = AppMode::Search;
    }
    KeyCode::Char('t') | KeyCode::Tab => app.mode = AppMode::Tags,
    KeyCode::Char('a') => {
      app.filter.clear_tag();
      app.tag_cursor = 0;
      app.recompute_filter();
    }
    KeyCode::Esc => {
      if app.filter.is_active() {
        app.clear_filters();
      } else {
        app.should_quit = true;
      }
    }
    KeyCode::Char('q') => app.should_quit = true,
    _ => {}
  }
}

fn handle_search_key(app: &mut App, key: event::KeyEvent) {
  match key.code {
    KeyCode::Char(c) if key.modifiers.difference(KeyModifiers::SHIFT).is_empty() => {
      let byte_idx = char_to_byte_index(&app.filter.query, app.search_cursor);
      app.filter.query.insert(byte_idx, c);
      app.search_cursor += 1;
      app.recompute_filter();
    }
    KeyCode::Backspace => {
      if app.search_cursor > 0 {
        app.search_cursor -= 1;
        let byte_idx = char_to_byte_index(&app.filter.query, app.search_cursor);
        app.filter.query.remove(byte_idx);
        app.recompute_filter();
      }
    }
    KeyCode::Delete => {
      if app.search_cursor < app.filter.query.chars().count() {
        let byte_idx = char_to_byte_index(&app.filter.query, app.search_cursor);
        app.filter.query.remove(byte_idx);
        app.recompute_filter();
      }
    }
    KeyCode::Left => {
      app.search_cursor = app.search_cursor.saturating_sub(1);
    }
    KeyCode::Right => {
      if app.search_cursor < app.filter.query.chars().count() {
        app.search_cursor += 1;
      }
    }
    KeyCode::Home => {
      app.search_cursor = 0;
    }
    KeyCode::End => {
      app.search_cursor = app.filter.query.chars().count();
    }
    KeyCode::Enter | KeyCode::Down | KeyCode::Tab => {
      // Keep the query and go back to the cards.
      app.mode = AppMode::Grid;
    }
    KeyCode::Esc => {
      app.filter.query.clear();
      app.search_cursor = 0;
      app.search_scroll = 0;
      app.recompute_filter();
      app.mode = AppMode::Grid;
    }
    _ => {}
  }
}

fn handle_tags_key(app: &mut App, key: event::KeyEvent) {
  match key.code {
    KeyCode::Left | KeyCode::Char('h') => app.move_tag_cursor(false),
    KeyCode::Right | KeyCode::Char('l') => app.move_tag_cursor(true),
    KeyCode::Enter | KeyCode::Char(' ') => app.activate_tag(),
    KeyCode::Char('/') => {
      app.search_cursor = app.filter.query.chars().count();
      app.mode = AppMode::Search;
    }
    KeyCode::Esc | KeyCode::Down | KeyCode::Tab | KeyCode::Char('j') => app.mode = AppMode::Grid,
    _ => {}
  }
}
