//! Card grid geometry: how many columns fit, where the cursor moves, and
//! which rows are scrolled into view.

/// Number of card columns that fit in `width` cells, never less than one.
pub fn columns_for(width: u16, card_min_width: u16) -> usize {
  usize::from(width / card_min_width.max(1)).max(1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Move {
  Left,
  Right,
  Up,
  Down,
  First,
  Last,
}

/// Move a cursor over `len` cards laid out in `columns` columns.
///
/// Left/Right step through cards in reading order and stop at the ends.
/// Up/Down keep the column; Down from a partial last row lands on the last
/// card.
pub fn step(cursor: usize, len: usize, columns: usize, mv: Move) -> usize {
  if len == 0 {
    return 0;
  }
  let columns = columns.max(1);
  let cursor = cursor.min(len - 1);
  match mv {
    Move::Left => cursor.saturating_sub(1),
    Move::Right => (cursor + 1).min(len - 1),
    Move::Up => cursor.checked_sub(columns).unwrap_or(cursor),
    Move::Down => {
      let last_row = (len - 1) / columns;
      if cursor / columns == last_row { cursor } else { (cursor + columns).min(len - 1) }
    }
    Move::First => 0,
    Move::Last => len - 1,
  }
}

/// Adjust the first visible row so the row holding `cursor` stays on screen.
pub fn scroll_to(first_row: usize, cursor: usize, columns: usize, visible_rows: usize) -> usize {
  let row = cursor / columns.max(1);
  let visible_rows = visible_rows.max(1);
  if row < first_row {
    row
  } else if row >= first_row + visible_rows {
    row + 1 - visible_rows
  } else {
    first_row
  }
}
