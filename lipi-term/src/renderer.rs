//! Software renderer.
//!
//! Paints the terminal into a softbuffer surface with fontdue-rasterized
//! glyphs. Two paint paths mirror the two buffer modes: the alternate
//! screen draws the cell grid, the primary screen draws the history
//! window (finished lines plus the active line, honoring the scroll
//! offset). The renderer only reads terminal state.

use std::collections::HashMap;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use fontdue::{Font, FontSettings};
use softbuffer::{Context, Surface};
use unicode_width::UnicodeWidthChar;
use winit::window::Window;

use lipi_core::{default_256_palette, is_combining_mark, Attributes, CellFlags, Color, Rgb};

use crate::config::ColorScheme;
use crate::terminal::Terminal;

/// Cell dimensions in pixels
#[derive(Debug, Clone, Copy)]
pub struct CellSize {
    pub width: f32,
    pub height: f32,
    pub baseline: f32,
}

struct GlyphEntry {
    bitmap: Vec<u8>,
    width: usize,
    height: usize,
    xmin: i32,
    ymin: i32,
}

pub struct Renderer {
    #[allow(dead_code)]
    context: Context<Rc<Window>>,
    surface: Surface<Rc<Window>, Rc<Window>>,
    font: Font,
    glyph_cache: HashMap<char, GlyphEntry>,
    cell_size: CellSize,
    colors: ColorScheme,
    palette: [Rgb; 256],
    width: u32,
    height: u32,
}

/// Common monospace font locations probed when the config names none
const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSansMono.ttf",
    "/usr/share/fonts/TTF/DejaVuSansMono.ttf",
    "/usr/share/fonts/dejavu/DejaVuSansMono.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationMono-Regular.ttf",
    "/usr/share/fonts/liberation/LiberationMono-Regular.ttf",
    "/usr/share/fonts/noto/NotoSansMono-Regular.ttf",
];

fn load_font(configured: Option<&Path>) -> Result<Font, Box<dyn std::error::Error>> {
    let mut candidates: Vec<PathBuf> = Vec::new();
    if let Some(path) = configured {
        candidates.push(path.to_path_buf());
    }
    candidates.extend(FONT_CANDIDATES.iter().map(PathBuf::from));

    for path in &candidates {
        if let Ok(data) = std::fs::read(path) {
            match Font::from_bytes(data, FontSettings::default()) {
                Ok(font) => {
                    log::info!("loaded font {}", path.display());
                    return Ok(font);
                }
                Err(e) => log::warn!("unusable font {}: {}", path.display(), e),
            }
        }
    }
    Err("no usable monospace font found".into())
}

impl Renderer {
    pub fn new(
        window: Rc<Window>,
        font_size: f32,
        font_path: Option<&Path>,
        colors: ColorScheme,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let context = Context::new(window.clone())?;
        let surface = Surface::new(&context, window.clone())?;

        let font = load_font(font_path)?;

        let scale_factor = window.scale_factor() as f32;
        let scaled_font_size = font_size * scale_factor;

        let metrics = font.metrics('M', scaled_font_size);
        let cell_size = CellSize {
            width: metrics.advance_width.ceil(),
            height: (scaled_font_size * 1.4).ceil(),
            baseline: scaled_font_size,
        };

        let size = window.inner_size();
        Ok(Self {
            context,
            surface,
            font,
            glyph_cache: HashMap::new(),
            cell_size,
            colors,
            palette: default_256_palette(),
            width: size.width,
            height: size.height,
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    /// Terminal dimensions that fit the given pixel size
    pub fn calc_dimensions(&self, width: u32, height: u32) -> (usize, usize) {
        let cols = ((width as f32 / self.cell_size.width) as usize).max(2);
        let rows = ((height as f32 / self.cell_size.height) as usize).max(2);
        (rows, cols)
    }

    pub fn render(&mut self, term: &Terminal) -> Result<(), Box<dyn std::error::Error>> {
        if self.width == 0 || self.height == 0 {
            return Ok(());
        }
        self.surface.resize(
            NonZeroU32::new(self.width).unwrap(),
            NonZeroU32::new(self.height).unwrap(),
        )?;

        let bg = self.colors.background;
        let mut frame = Frame {
            width: self.width,
            height: self.height,
            pixels: Vec::new(),
        };
        frame.pixels = vec![pack_rgb(bg); (self.width * self.height) as usize];

        if term.alternate_active() {
            self.paint_grid(term, &mut frame);
        } else {
            self.paint_history(term, &mut frame);
        }

        let mut buffer = self.surface.buffer_mut()?;
        buffer.copy_from_slice(&frame.pixels);
        buffer.present()?;
        Ok(())
    }

    fn paint_grid(&mut self, term: &Terminal, frame: &mut Frame) {
        let screen = term.screen();
        let cell_w = self.cell_size.width;
        let cell_h = self.cell_size.height;

        for row in 0..screen.rows() {
            let Some(line) = screen.line(row) else { continue };
            for (col, cell) in line.cells().iter().enumerate() {
                let x = (col as f32 * cell_w) as i32;
                let y = (row as f32 * cell_h) as i32;

                let is_cursor =
                    screen.cursor_visible && screen.cursor.row == row && screen.cursor.col == col;
                let (fg, bg) = if is_cursor {
                    (self.colors.background, self.colors.cursor)
                } else {
                    self.cell_colors(&cell.attrs)
                };

                frame.fill_rect(x, y, cell_w as i32, cell_h as i32, bg);
                if let Some(c) = cell.content.chars().next() {
                    if c != ' ' {
                        self.draw_char(frame, c, x, y, fg);
                    }
                }
            }
        }
    }

    fn paint_history(&mut self, term: &Terminal, frame: &mut Frame) {
        let cell_w = self.cell_size.width;
        let cell_h = self.cell_size.height;
        let cols = term.screen().cols();
        let visible = ((self.height as f32 / cell_h) as usize).max(1);

        let history = term.history();
        let total = history.len() + 1;
        let offset = term.scroll_offset().min(history.len());
        let start = total.saturating_sub(visible + offset);

        let mut y_row = 0usize;
        let mut cursor_px: Option<(i32, i32)> = None;

        for index in start..total {
            if y_row >= visible {
                break;
            }
            let y = (y_row as f32 * cell_h) as i32;

            let line = if index < history.len() {
                history.line(index).expect("index in range")
            } else {
                history.active_line()
            };

            let mut col = 0usize;
            for segment in &line.segments {
                let (fg, bg) = self.cell_colors(&segment.attrs);
                for c in segment.content.chars() {
                    if is_combining_mark(c) {
                        continue;
                    }
                    let advance = c.width().unwrap_or(1).max(1);
                    if col + advance > cols {
                        break;
                    }
                    let x = (col as f32 * cell_w) as i32;
                    frame.fill_rect(x, y, (advance as f32 * cell_w) as i32, cell_h as i32, bg);
                    if c != ' ' {
                        self.draw_char(frame, c, x, y, fg);
                    }
                    col += advance;
                }
            }

            if index == history.len() {
                cursor_px = Some(((col as f32 * cell_w) as i32, y));
            }
            y_row += 1;
        }

        if let Some((x, y)) = cursor_px {
            if let Some((preedit, _)) = term.preedit() {
                self.draw_preedit(frame, preedit, x, y);
            } else if term.screen().cursor_visible && offset == 0 {
                frame.fill_rect(x, y, cell_w as i32, cell_h as i32, self.colors.cursor);
            }
        }
    }

    /// Composition text: dim background and an underline at the cursor
    fn draw_preedit(&mut self, frame: &mut Frame, text: &str, x: i32, y: i32) {
        let cell_w = self.cell_size.width;
        let cell_h = self.cell_size.height as i32;
        let fg = self.colors.foreground;
        let bg = (60, 60, 60);

        let mut cx = x;
        for c in text.chars() {
            if is_combining_mark(c) {
                continue;
            }
            let advance = (c.width().unwrap_or(1).max(1) as f32 * cell_w) as i32;
            frame.fill_rect(cx, y, advance, cell_h, bg);
            self.draw_char(frame, c, cx, y, fg);
            frame.fill_rect(cx, y + cell_h - 2, advance, 2, fg);
            cx += advance;
        }
    }

    fn draw_char(&mut self, frame: &mut Frame, c: char, x: i32, y: i32, color: (u8, u8, u8)) {
        let baseline = self.cell_size.baseline;
        if !self.glyph_cache.contains_key(&c) {
            let (metrics, bitmap) = self.font.rasterize(c, baseline);
            self.glyph_cache.insert(
                c,
                GlyphEntry {
                    bitmap,
                    width: metrics.width,
                    height: metrics.height,
                    xmin: metrics.xmin,
                    ymin: metrics.ymin,
                },
            );
        }
        let glyph = &self.glyph_cache[&c];
        frame.draw_glyph(glyph, x, y, baseline, color);
    }

    /// Foreground/background for a cell, honoring the reverse flag
    fn cell_colors(&self, attrs: &Attributes) -> ((u8, u8, u8), (u8, u8, u8)) {
        let fg = resolve_color(&self.colors, &self.palette, attrs.fg, true);
        let bg = resolve_color(&self.colors, &self.palette, attrs.bg, false);
        if attrs.flags.contains(CellFlags::REVERSE) {
            (bg, fg)
        } else {
            (fg, bg)
        }
    }
}

fn resolve_color(
    scheme: &ColorScheme,
    palette: &[Rgb; 256],
    color: Color,
    is_fg: bool,
) -> (u8, u8, u8) {
    match color {
        Color::Default => {
            if is_fg {
                scheme.foreground
            } else {
                scheme.background
            }
        }
        Color::Ansi(n) => scheme.ansi[(n as usize) & 0xF],
        Color::Indexed(n) => {
            if n < 16 {
                scheme.ansi[n as usize]
            } else {
                let rgb = palette[n as usize];
                (rgb.r, rgb.g, rgb.b)
            }
        }
        Color::Rgb(rgb) => (rgb.r, rgb.g, rgb.b),
    }
}

fn pack_rgb((r, g, b): (u8, u8, u8)) -> u32 {
    0xFF00_0000 | ((r as u32) << 16) | ((g as u32) << 8) | (b as u32)
}

/// One frame's pixel buffer with clipped primitive drawing
struct Frame {
    width: u32,
    height: u32,
    pixels: Vec<u32>,
}

impl Frame {
    fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: (u8, u8, u8)) {
        let pixel = pack_rgb(color);
        for dy in 0..h {
            let py = y + dy;
            if py < 0 || py >= self.height as i32 {
                continue;
            }
            for dx in 0..w {
                let px = x + dx;
                if px < 0 || px >= self.width as i32 {
                    continue;
                }
                self.pixels[(py as u32 * self.width + px as u32) as usize] = pixel;
            }
        }
    }

    fn draw_glyph(&mut self, glyph: &GlyphEntry, x: i32, y: i32, baseline: f32, color: (u8, u8, u8)) {
        if glyph.width == 0 || glyph.height == 0 {
            return;
        }
        let gx = x + glyph.xmin;
        let gy = y + (baseline as i32) - glyph.ymin - glyph.height as i32;

        for dy in 0..glyph.height {
            let py = gy + dy as i32;
            if py < 0 || py >= self.height as i32 {
                continue;
            }
            for dx in 0..glyph.width {
                let px = gx + dx as i32;
                if px < 0 || px >= self.width as i32 {
                    continue;
                }
                let alpha = glyph.bitmap[dy * glyph.width + dx] as u32;
                if alpha == 0 {
                    continue;
                }
                let idx = (py as u32 * self.width + px as u32) as usize;
                if alpha == 255 {
                    self.pixels[idx] = pack_rgb(color);
                } else {
                    let existing = self.pixels[idx];
                    let er = (existing >> 16) & 0xFF;
                    let eg = (existing >> 8) & 0xFF;
                    let eb = existing & 0xFF;
                    let ia = 255 - alpha;
                    let r = ((color.0 as u32 * alpha + er * ia) / 255) as u8;
                    let g = ((color.1 as u32 * alpha + eg * ia) / 255) as u8;
                    let b = ((color.2 as u32 * alpha + eb * ia) / 255) as u8;
                    self.pixels[idx] = pack_rgb((r, g, b));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_colors() {
        let scheme = ColorScheme::dark();
        let palette = default_256_palette();
        assert_eq!(
            resolve_color(&scheme, &palette, Color::Default, true),
            scheme.foreground
        );
        assert_eq!(
            resolve_color(&scheme, &palette, Color::Default, false),
            scheme.background
        );
        assert_eq!(
            resolve_color(&scheme, &palette, Color::Ansi(1), true),
            scheme.ansi[1]
        );
        assert_eq!(
            resolve_color(&scheme, &palette, Color::Indexed(3), true),
            scheme.ansi[3]
        );
        assert_eq!(
            resolve_color(&scheme, &palette, Color::Indexed(196), true),
            (255, 0, 0)
        );
        assert_eq!(
            resolve_color(&scheme, &palette, Color::Rgb(Rgb::new(9, 8, 7)), false),
            (9, 8, 7)
        );
    }

    #[test]
    fn test_pack_rgb() {
        assert_eq!(pack_rgb((0, 0, 0)), 0xFF000000);
        assert_eq!(pack_rgb((255, 128, 1)), 0xFFFF8001);
    }

    #[test]
    fn test_frame_fill_clips() {
        let mut frame = Frame {
            width: 4,
            height: 4,
            pixels: vec![0; 16],
        };
        frame.fill_rect(-2, -2, 10, 10, (255, 255, 255));
        assert!(frame.pixels.iter().all(|&p| p == 0xFFFFFFFF));
    }
}
