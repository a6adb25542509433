use ratatui::{
  Frame,
  layout::{Alignment, Constraint, Flex, Layout, Rect},
  style::{Modifier, Style, Stylize},
  text::{Line, Span},
  widgets::{Block, BorderType, Clear, Padding, Paragraph},
};

use crate::app::{App, AppMode};
use crate::catalog::ShortItem;
use crate::constants::constants;
use crate::graphics::{PosterWidget, fit_to_cells};
use crate::grid;
use crate::theme::Theme;

// --- Helpers ---

/// Compute the display width of the first `n` chars (accounting for double-width CJK).
pub fn display_width(s: &str, n: usize) -> usize {
  use unicode_width::UnicodeWidthChar;
  s.chars().take(n).map(|c| c.width().unwrap_or(0)).sum()
}

/// Truncate a string to `max_width` characters, appending "…" if truncated.
fn truncate_str(s: &str, max_width: usize) -> String {
  if s.chars().count() <= max_width {
    s.to_string()
  } else {
    let truncated: String = s.chars().take(max_width.saturating_sub(1)).collect();
    format!("{}…", truncated)
  }
}

fn like_label(liked: bool) -> &'static str {
  if liked { "★ Liked" } else { "☆ Like" }
}

// --- UI Rendering ---

pub fn ui(frame: &mut Frame, app: &mut App) {
  let theme = app.theme();

  frame.render_widget(Block::default().style(Style::default().bg(theme.bg)), frame.area());

  let [header_area, search_area, tags_area, main_area, status_area, footer_area] = Layout::vertical([
    Constraint::Length(1),
    Constraint::Length(3),
    Constraint::Length(1),
    Constraint::Min(3),
    Constraint::Length(1),
    Constraint::Length(1),
  ])
  .areas(frame.area());

  render_header(frame, app, header_area);
  render_search(frame, app, search_area);
  render_tags(frame, app, tags_area);
  render_grid(frame, app, main_area);
  render_status(frame, app, status_area);
  render_footer(frame, app, footer_area);

  if app.selection.is_open() {
    render_overlay(frame, app, main_area.union(tags_area));
  }
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let left = Line::from(vec![
    Span::styled(" ▶ shortflix ", Style::default().fg(theme.accent).add_modifier(Modifier::BOLD)),
    Span::styled("Click a card to play. Likes saved locally.", Style::default().fg(theme.muted)),
  ]);
  frame.render_widget(left, area);

  let counter = if app.is_loading() {
    "loading… ".to_string()
  } else {
    let liked = app.catalog.iter().filter(|item| app.likes.is_liked(&item.id)).count();
    format!("{} of {} shorts · {} liked ", app.visible.len(), app.catalog.len(), liked)
  };
  let width = counter.chars().count() as u16;
  let right = Line::from(Span::styled(counter, Style::default().fg(theme.muted)));
  let right_area = Rect { x: area.x + area.width.saturating_sub(width), width: width.min(area.width), ..area };
  frame.render_widget(right, right_area);
}

fn render_search(frame: &mut Frame, app: &mut App, area: Rect) {
  let theme = app.theme();
  let editing = app.mode == AppMode::Search && !app.selection.is_open();
  let border_color = if editing { theme.accent } else { theme.border };
  let block = Block::bordered()
    .title(" Search title or tags ")
    .title_style(Style::default().fg(border_color))
    .border_type(BorderType::Rounded)
    .border_style(Style::default().fg(border_color))
    .padding(Padding::horizontal(1));

  let inner_w = area.width.saturating_sub(4) as usize;
  let query = &app.filter.query;
  let cursor_col = display_width(query, app.search_cursor);

  if cursor_col < app.search_scroll {
    app.search_scroll = cursor_col;
  } else if inner_w > 0 && cursor_col >= app.search_scroll + inner_w {
    app.search_scroll = cursor_col.saturating_sub(inner_w) + 1;
  }

  let paragraph = if query.is_empty() && !editing {
    Paragraph::new("Press / to search…").style(Style::default().fg(theme.muted))
  } else {
    let visible: String = query
      .chars()
      .scan(0usize, |col, c| {
        let w = unicode_width::UnicodeWidthChar::width(c).unwrap_or(0);
        let start = *col;
        *col += w;
        Some((start, *col, c))
      })
      .skip_while(|(_, end, _)| *end <= app.search_scroll)
      .take_while(|(start, _, _)| *start < app.search_scroll + inner_w)
      .map(|(_, _, c)| c)
      .collect();
    Paragraph::new(visible).style(Style::default().fg(theme.fg))
  };
  frame.render_widget(paragraph.block(block), area);

  if editing {
    let cursor_x = area.x + 2 + cursor_col.saturating_sub(app.search_scroll) as u16;
    frame.set_cursor_position((cursor_x, area.y + 1));
  }
}

fn render_tags(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let focused = (app.mode == AppMode::Tags).then_some(app.tag_cursor);

  let chips: Vec<(String, Style)> = std::iter::once(("All", app.filter.selected_tag.is_none()))
    .chain(app.tags.iter().map(|t| (t.as_str(), app.filter.selected_tag.as_deref() == Some(t.as_str()))))
    .enumerate()
    .map(|(i, (label, active))| {
      let mut style = if active {
        Style::default().fg(theme.accent_fg).bg(theme.accent)
      } else {
        Style::default().fg(theme.fg).bg(theme.chip_bg)
      };
      if focused == Some(i) {
        style = style.add_modifier(Modifier::BOLD | Modifier::UNDERLINED);
      }
      (format!(" {} ", label), style)
    })
    .collect();

  // Scroll so the focused chip is on screen.
  let width = area.width as usize;
  let focus = focused.unwrap_or(0).min(chips.len().saturating_sub(1));
  let mut start = 0;
  while start < focus {
    let used: usize = chips[start..=focus].iter().map(|(label, _)| display_width(label, usize::MAX) + 1).sum();
    if used <= width.saturating_sub(1) {
      break;
    }
    start += 1;
  }

  let mut spans = vec![Span::raw(" ")];
  if start > 0 {
    spans[0] = Span::styled("‹", Style::default().fg(theme.muted));
  }
  for (label, style) in chips.into_iter().skip(start) {
    spans.push(Span::styled(label, style));
    spans.push(Span::raw(" "));
  }
  frame.render_widget(Line::from(spans), area);
}

fn render_grid(frame: &mut Frame, app: &mut App, area: Rect) {
  let theme = app.theme();
  let c = constants();

  if app.is_loading() || app.visible.is_empty() {
    let message = if app.is_loading() { "Loading shorts…" } else { "No videos found." };
    let paragraph = Paragraph::new(vec![Line::from(""), Line::from(message)])
      .alignment(Alignment::Center)
      .style(Style::default().fg(theme.muted));
    frame.render_widget(paragraph, area);
    return;
  }

  let columns = grid::columns_for(area.width, c.card_min_width);
  let rows_on_screen = usize::from((area.height / c.card_height).max(1));
  app.grid_columns = columns;
  app.grid_scroll = grid::scroll_to(app.grid_scroll, app.cursor, columns, rows_on_screen);

  let row_areas = Layout::vertical(vec![Constraint::Length(c.card_height); rows_on_screen]).split(area);
  let first = app.grid_scroll * columns;

  for (row_idx, row_area) in row_areas.iter().enumerate() {
    let col_areas = Layout::horizontal(vec![Constraint::Ratio(1, columns as u32); columns]).split(*row_area);
    for (col_idx, card_area) in col_areas.iter().enumerate() {
      let pos = first + row_idx * columns + col_idx;
      let Some(item) = app.visible.get(pos).and_then(|&i| app.catalog.get(i)) else {
        return;
      };
      let liked = app.is_liked(&item.id);
      let focused = pos == app.cursor && app.mode == AppMode::Grid;
      render_card(frame, theme, item, liked, focused, *card_area);
    }
  }
}

fn render_card(frame: &mut Frame, theme: &Theme, item: &ShortItem, liked: bool, focused: bool, area: Rect) {
  let border_color = if focused { theme.accent } else { theme.border };
  let bg = if focused { theme.highlight_bg } else { theme.card_bg };
  let block = Block::bordered()
    .border_type(BorderType::Rounded)
    .border_style(Style::default().fg(border_color))
    .style(Style::default().bg(bg));
  let inner_w = area.width.saturating_sub(2) as usize;

  let preview = Line::from(Span::styled(
    format!("{:^width$}", "▶", width = inner_w),
    Style::default().fg(theme.fg).bg(ratatui::style::Color::Black),
  ));

  let title_style = if focused {
    Style::default().fg(theme.highlight_fg).add_modifier(Modifier::BOLD)
  } else {
    Style::default().fg(theme.fg).add_modifier(Modifier::BOLD)
  };
  let title = Line::from(Span::styled(truncate_str(&item.title, inner_w), title_style));

  let mut tag_spans = Vec::new();
  let mut used = 0;
  for tag in &item.tags {
    let chip = format!(" {} ", tag);
    let w = display_width(&chip, usize::MAX);
    if used + w > inner_w {
      tag_spans.push(Span::styled("…", Style::default().fg(theme.muted)));
      break;
    }
    used += w + 1;
    tag_spans.push(Span::styled(chip, Style::default().fg(theme.muted).bg(theme.chip_bg)));
    tag_spans.push(Span::raw(" "));
  }

  let like = Line::from(Span::styled(
    like_label(liked),
    if liked { Style::default().fg(theme.liked) } else { Style::default().fg(theme.muted) },
  ));
  let note = Line::from(Span::styled(if liked { "You liked this" } else { "" }, Style::default().fg(theme.muted)));

  let paragraph = Paragraph::new(vec![preview, title, Line::from(tag_spans), like, note]).block(block);
  frame.render_widget(paragraph, area);
}

fn render_overlay(frame: &mut Frame, app: &mut App, area: Rect) {
  let theme = app.theme();
  let Some(item) = app.selection.current().cloned() else { return };

  let [popup] = Layout::horizontal([Constraint::Percentage(84)]).flex(Flex::Center).areas(area);
  let [popup] = Layout::vertical([Constraint::Percentage(92)]).flex(Flex::Center).areas(popup);
  frame.render_widget(Clear, popup);

  let title = Line::from(vec![
    Span::styled(" ▶ ", Style::default().fg(theme.accent).add_modifier(Modifier::BOLD)),
    Span::styled(
      truncate_str(&item.title, popup.width.saturating_sub(16) as usize),
      Style::default().fg(theme.fg).add_modifier(Modifier::BOLD),
    ),
    Span::raw(" "),
  ]);
  let block = Block::bordered()
    .title(title)
    .title_bottom(Line::from(Span::styled(" Esc Close ", Style::default().fg(theme.muted))).right_aligned())
    .border_type(BorderType::Rounded)
    .border_style(Style::default().fg(theme.accent))
    .style(Style::default().bg(theme.bg))
    .padding(Padding::horizontal(1));
  let inner = block.inner(popup);
  frame.render_widget(block, popup);

  let [poster_area, info_area] = Layout::vertical([Constraint::Min(3), Constraint::Length(5)]).areas(inner);
  render_poster(frame, app, &item, poster_area);

  let liked = app.is_liked(&item.id);
  let tag_spans: Vec<Span> = item
    .tags
    .iter()
    .flat_map(|t| [Span::styled(format!(" #{} ", t), Style::default().fg(theme.fg).bg(theme.chip_bg)), Span::raw(" ")])
    .collect();
  let playback = if app.player.is_playing() {
    if app.player.paused { "⏸ Paused" } else { "♪ Playing in mpv" }
  } else {
    "Not playing"
  };
  let lines = vec![
    Line::from(""),
    Line::from(tag_spans),
    Line::from(Span::styled(
      truncate_str(&item.video_url, info_area.width as usize),
      Style::default().fg(theme.accent).add_modifier(Modifier::UNDERLINED),
    )),
    Line::from(vec![
      Span::styled(like_label(liked), Style::default().fg(if liked { theme.liked } else { theme.muted })),
      Span::raw("   "),
      Span::styled(playback, Style::default().fg(theme.status)),
    ]),
  ];
  frame.render_widget(Paragraph::new(lines), info_area);
}

fn render_poster(frame: &mut Frame, app: &mut App, item: &ShortItem, area: Rect) {
  let theme = app.theme();
  frame.render_widget(Block::default().style(Style::default().bg(ratatui::style::Color::Black)), area);

  let Some((ref id, ref image)) = app.poster.image else {
    let message = if app.poster.failed { "▶" } else { "Loading preview…" };
    let y = area.y + area.height / 2;
    let line = Paragraph::new(message).alignment(Alignment::Center).fg(theme.muted);
    frame.render_widget(line, Rect { y, height: area.height.min(1), ..area });
    return;
  };

  let needs_resize = match &app.poster.resized {
    Some((rid, w, h, _)) => rid != id || *w != area.width || *h != area.height,
    None => true,
  };
  if needs_resize {
    let fitted = fit_to_cells(image, area.width, area.height, app.display_mode);
    app.poster.resized = Some((id.clone(), area.width, area.height, fitted));
  }
  if let Some((_, _, _, ref resized)) = app.poster.resized {
    frame.render_widget(PosterWidget { image: resized, display_mode: app.display_mode }, area);
  }
}

fn render_status(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let (text, style) = if let Some(err) = &app.last_error {
    (format!(" ⚠  {}", err), Style::default().fg(theme.error))
  } else if app.selection.is_open()
    && let Some(status) = app.player.last_status()
  {
    (format!(" ♪ {}", status), Style::default().fg(theme.status))
  } else if let Some(tag) = &app.filter.selected_tag {
    (format!(" Tag: {}", tag), Style::default().fg(theme.muted))
  } else {
    (" Ready".to_string(), Style::default().fg(theme.muted))
  };
  frame.render_widget(Paragraph::new(text).style(style), area);
}

fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let keys: Vec<(&str, &str)> = if app.selection.is_open() {
    let pause_label = if app.player.paused { "Resume" } else { "Pause" };
    vec![("Esc", "Close"), ("Space", pause_label), ("f", "Like"), ("^t", "Theme")]
  } else {
    match app.mode {
      AppMode::Grid => {
        let mut k = vec![("Enter", "Play"), ("f", "Like"), ("/", "Search"), ("t", "Tags")];
        if app.filter.is_active() {
          k.push(("Esc", "Clear"));
        } else {
          k.push(("q", "Quit"));
        }
        k.push(("^t", "Theme"));
        k
      }
      AppMode::Search => vec![("Enter", "Done"), ("Esc", "Clear")],
      AppMode::Tags => vec![("←/→", "Move"), ("Enter", "Toggle"), ("Esc", "Back")],
    }
  };

  let spans: Vec<Span> = keys
    .iter()
    .enumerate()
    .flat_map(|(i, (key, action))| {
      let mut s = vec![
        Span::styled(format!(" {} ", key), Style::default().fg(theme.key_fg).bg(theme.key_bg)),
        Span::styled(format!(" {} ", action), Style::default().fg(theme.muted)),
      ];
      if i < keys.len() - 1 {
        s.push(Span::raw("  "));
      }
      s
    })
    .collect();

  frame.render_widget(Line::from(spans), area);

  let theme_label = format!("{} ", theme.name);
  let right = Line::from(Span::styled(&theme_label, Style::default().fg(theme.muted)));
  let right_area =
    Rect { x: area.x + area.width.saturating_sub(theme_label.len() as u16), width: theme_label.len() as u16, ..area };
  frame.render_widget(right, right_area);
}
