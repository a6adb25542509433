use image::{DynamicImage, imageops::FilterType};
use ratatui::{
  buffer::Buffer,
  layout::Rect,
  style::{Color, Style},
  widgets::Widget,
};

use crate::display::DisplayMode;

// --- Poster Widget ---

/// Draws an already-sized poster frame centered in its area.
pub struct PosterWidget<'a> {
  pub image: &'a DynamicImage,
  pub display_mode: DisplayMode,
}

const ASCII_CHARS: [&str; 10] = [" ", ".", ":", "-", "=", "+", "*", "#", "%", "@"];

impl Widget for PosterWidget<'_> {
  fn render(self, area: Rect, buf: &mut Buffer) {
    if area.is_empty() {
      return;
    }
    match self.display_mode {
      DisplayMode::Direct => render_direct(self.image, area, buf),
      DisplayMode::Ascii => render_ascii(self.image, area, buf),
    }
  }
}

/// Resize `image` to fit `cols` x `rows` terminal cells, keeping aspect.
///
/// Terminal cells are roughly twice as tall as wide, so one cell covers one
/// pixel column and `rows_per_cell` pixel rows after halving the height.
pub fn fit_to_cells(image: &DynamicImage, cols: u16, rows: u16, mode: DisplayMode) -> DynamicImage {
  let max_w = u32::from(cols.max(1));
  let max_h = u32::from(rows.max(1)) * mode.rows_per_cell();
  let (w, h) = (image.width().max(1) as f32, image.height().max(1) as f32);
  // Pixel rows are squashed 2:1 relative to columns.
  let cell_aspect = mode.rows_per_cell() as f32 / 2.0;
  let scale = (max_w as f32 / w).min(max_h as f32 / (h * cell_aspect));
  let target_w = ((w * scale).round() as u32).clamp(1, max_w);
  let target_h = ((h * cell_aspect * scale).round() as u32).clamp(1, max_h);
  image.resize_exact(target_w, target_h, FilterType::Triangle)
}

fn cell(area_origin: u16, offset: u32, pos: u32) -> u16 {
  area_origin.saturating_add(offset.min(u16::MAX as u32) as u16).saturating_add(pos.min(u16::MAX as u32) as u16)
}

fn render_direct(image: &DynamicImage, area: Rect, buf: &mut Buffer) {
  let rgb = image.to_rgb8();
  let img_w = rgb.width().min(area.width as u32);
  let img_h = rgb.height();
  let cell_h = img_h.div_ceil(2);
  let offset_x = (area.width as u32).saturating_sub(img_w) / 2;
  let offset_y = (area.height as u32).saturating_sub(cell_h) / 2;

  for y in 0..cell_h.min(area.height as u32) {
    for x in 0..img_w {
      let upper = rgb.get_pixel(x, y * 2);
      let lower_y = y * 2 + 1;
      let fg = Color::Rgb(upper[0], upper[1], upper[2]);
      let bg = if lower_y < img_h {
        let lower = rgb.get_pixel(x, lower_y);
        Color::Rgb(lower[0], lower[1], lower[2])
      } else {
        Color::Reset
      };
      buf.set_string(cell(area.x, offset_x, x), cell(area.y, offset_y, y), "▀", Style::default().fg(fg).bg(bg));
    }
  }
}

fn render_ascii(image: &DynamicImage, area: Rect, buf: &mut Buffer) {
  let luma = image.to_luma8();
  let img_w = luma.width().min(area.width as u32);
  let img_h = luma.height().min(area.height as u32);
  let offset_x = (area.width as u32).saturating_sub(img_w) / 2;
  let offset_y = (area.height as u32).saturating_sub(img_h) / 2;

  for y in 0..img_h {
    for x in 0..img_w {
      let pixel = luma.get_pixel(x, y)[0];
      let idx = ((pixel as f32 / 255.0) * (ASCII_CHARS.len() - 1) as f32).round() as usize;
      let idx = idx.min(ASCII_CHARS.len() - 1);
      buf.set_string(cell(area.x, offset_x, x), cell(area.y, offset_y, y), ASCII_CHARS[idx], Style::default());
    }
  }
}
