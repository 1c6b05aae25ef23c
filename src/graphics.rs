use anyhow::{Context, Result};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use image::{DynamicImage, ImageFormat, imageops::FilterType};
use ratatui::{
  buffer::Buffer,
  layout::Rect,
  style::{Color, Style},
  widgets::Widget,
};
use std::io::{Cursor, Write};

use crate::display::DisplayMode;

// --- Cell-based preview ---

/// Draws a thumbnail into terminal cells. Kitty mode draws nothing here; the
/// image is sent out-of-band by [`kitty_render_image`] after the frame.
pub struct ThumbnailWidget<'a> {
  pub image: &'a DynamicImage,
  pub display_mode: DisplayMode,
}

const ASCII_RAMP: &[u8] = b" .:-=+*#%@";

/// Target pixel size for `area`: half-blocks pack two pixel rows per cell.
pub fn cell_pixels(area: Rect, mode: DisplayMode) -> (u32, u32) {
  let rows_per_cell = if mode == DisplayMode::Direct { 2 } else { 1 };
  (area.width.max(1) as u32, (area.height.max(1) as u32) * rows_per_cell)
}

/// Resize once per (image, area) so rendering stays cheap on every frame.
pub fn fit_to_area(image: &DynamicImage, area: Rect, mode: DisplayMode) -> DynamicImage {
  let (w, h) = cell_pixels(area, mode);
  // Cells are roughly twice as tall as wide; ASCII needs the width halved to keep aspect.
  let h = if mode == DisplayMode::Ascii { h * 2 } else { h };
  let fitted = image.resize(w, h, FilterType::Triangle);
  if mode == DisplayMode::Ascii {
    fitted.resize_exact(fitted.width(), (fitted.height() / 2).max(1), FilterType::Triangle)
  } else {
    fitted
  }
}

impl Widget for ThumbnailWidget<'_> {
  fn render(self, area: Rect, buf: &mut Buffer) {
    if area.is_empty() {
      return;
    }
    match self.display_mode {
      DisplayMode::Direct => paint_half_blocks(self.image, area, buf),
      DisplayMode::Ascii => paint_ascii(self.image, area, buf),
      DisplayMode::Kitty => {}
    }
  }
}

/// Top-left cell that centers a `cols` x `rows` block inside `area`.
fn centered_origin(area: Rect, cols: u32, rows: u32) -> (u16, u16) {
  let dx = (area.width as u32).saturating_sub(cols) / 2;
  let dy = (area.height as u32).saturating_sub(rows) / 2;
  (area.x.saturating_add(dx as u16), area.y.saturating_add(dy as u16))
}

fn paint_half_blocks(image: &DynamicImage, area: Rect, buf: &mut Buffer) {
  let rgb = image.to_rgb8();
  let cols = rgb.width().min(area.width as u32);
  let rows = rgb.height().div_ceil(2).min(area.height as u32);
  let (x0, y0) = centered_origin(area, cols, rows);

  for row in 0..rows {
    for col in 0..cols {
      let top = rgb.get_pixel(col, row * 2);
      let bottom = rgb.get_pixel_checked(col, row * 2 + 1).map(|p| Color::Rgb(p[0], p[1], p[2])).unwrap_or(Color::Reset);
      let style = Style::default().fg(Color::Rgb(top[0], top[1], top[2])).bg(bottom);
      buf.set_string(x0 + col as u16, y0 + row as u16, "▀", style);
    }
  }
}

fn paint_ascii(image: &DynamicImage, area: Rect, buf: &mut Buffer) {
  let luma = image.to_luma8();
  let cols = luma.width().min(area.width as u32);
  let rows = luma.height().min(area.height as u32);
  let (x0, y0) = centered_origin(area, cols, rows);
  let steps = ASCII_RAMP.len() - 1;

  for row in 0..rows {
    let line: String = (0..cols)
      .map(|col| {
        let level = luma.get_pixel(col, row)[0] as usize;
        ASCII_RAMP[(level * steps + 127) / 255] as char
      })
      .collect();
    buf.set_string(x0, y0 + row as u16, line, Style::default());
  }
}

// --- Kitty Graphics Protocol ---
//
//   First chunk:  \x1B_Ga=T,f=100,i=1,p=1,c=<cols>,r=<rows>,q=2,m=1;<base64>\x1B\\
//   Next chunks:  \x1B_Gm=1;<base64>\x1B\\   (m=0 on the last one)
//   Delete all:   \x1B_Ga=d,d=a,q=2\x1B\\
//
// The PNG is base64'd and split into 4096-byte payloads. Reusing image id 1
// and placement id 1 replaces the previous preview in place.

const KITTY_CHUNK_SIZE: usize = 4096;

/// Build the full escape stream for `png` scaled over a `cols` x `rows` cell box.
pub fn kitty_escape(png: &[u8], cols: u16, rows: u16) -> String {
  let payload = BASE64.encode(png);
  let chunks: Vec<&str> = payload
    .as_bytes()
    .chunks(KITTY_CHUNK_SIZE)
    // base64 output is ASCII, so every byte boundary is a char boundary.
    .map(|c| std::str::from_utf8(c).unwrap_or_default())
    .collect();

  let mut out = String::with_capacity(payload.len() + chunks.len() * 32);
  for (i, chunk) in chunks.iter().enumerate() {
    let more = u8::from(i + 1 < chunks.len());
    if i == 0 {
      out.push_str(&format!("\x1B_Ga=T,f=100,i=1,p=1,c={cols},r={rows},q=2,m={more};{chunk}\x1B\\"));
    } else {
      out.push_str(&format!("\x1B_Gm={more};{chunk}\x1B\\"));
    }
  }
  out
}

pub fn kitty_render_image(image: &DynamicImage, area: Rect) -> Result<()> {
  if area.is_empty() {
    return Ok(());
  }
  let mut png = Vec::new();
  image.write_to(&mut Cursor::new(&mut png), ImageFormat::Png).context("Failed to encode thumbnail as PNG for kitty")?;

  let mut stdout = std::io::stdout();
  write!(stdout, "\x1B[{};{}H{}", area.y + 1, area.x + 1, kitty_escape(&png, area.width, area.height))
    .context("Failed to write kitty image")?;
  stdout.flush().context("Failed to flush kitty image")?;
  Ok(())
}

pub fn kitty_delete_all() -> Result<()> {
  let mut stdout = std::io::stdout();
  write!(stdout, "\x1B_Ga=d,d=a,q=2\x1B\\").context("Failed to write kitty delete")?;
  stdout.flush().context("Failed to flush kitty delete")?;
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::{Rgb, RgbImage};

  #[test]
  fn kitty_single_chunk() {
    let esc = kitty_escape(b"png", 10, 4);
    assert_eq!(esc, "\x1B_Ga=T,f=100,i=1,p=1,c=10,r=4,q=2,m=0;cG5n\x1B\\");
  }

  #[test]
  fn kitty_multi_chunk_marks_continuation() {
    let data = vec![0u8; KITTY_CHUNK_SIZE]; // base64 grows it past one chunk
    let esc = kitty_escape(&data, 1, 1);
    assert!(esc.contains("m=1;"));
    assert!(esc.ends_with("\x1B\\"));
    assert_eq!(esc.matches("\x1B_G").count(), 2);
    assert!(esc.contains("\x1B_Gm=0;"));
  }

  #[test]
  fn half_blocks_fill_centered_cells() {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(2, 2, Rgb([255, 0, 0])));
    let area = Rect::new(0, 0, 4, 3);
    let mut buf = Buffer::empty(area);
    ThumbnailWidget { image: &img, display_mode: DisplayMode::Direct }.render(area, &mut buf);
    // 2x2 pixels -> 2 cols x 1 row, centered at (1, 1)
    assert_eq!(buf[(1, 1)].symbol(), "▀");
    assert_eq!(buf[(2, 1)].symbol(), "▀");
    assert_eq!(buf[(0, 0)].symbol(), " ");
  }

  #[test]
  fn ascii_maps_brightness() {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(1, 1, Rgb([255, 255, 255])));
    let area = Rect::new(0, 0, 1, 1);
    let mut buf = Buffer::empty(area);
    ThumbnailWidget { image: &img, display_mode: DisplayMode::Ascii }.render(area, &mut buf);
    assert_eq!(buf[(0, 0)].symbol(), "@");
  }

  #[test]
  fn fit_respects_cell_box() {
    let img = DynamicImage::ImageRgb8(RgbImage::new(1280, 720));
    let fitted = fit_to_area(&img, Rect::new(0, 0, 40, 20), DisplayMode::Direct);
    assert!(fitted.width() <= 40);
    assert!(fitted.height() <= 40);
  }
}
