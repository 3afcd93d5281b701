//! Quantize an RGBA8 frame into a colored character grid.

use std::fmt::Write as _;

use glyph_math::{luminance, Vec3};

use crate::error::{check_buffer, RenderError, RenderResult};
use crate::pixel::PixelKind;

/// Characters from darkest to brightest.
pub const DEFAULT_RAMP: &str = " .:-=+*#%@";

/// Luminance-to-character ramp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsciiRamp {
    chars: Vec<char>,
}

impl Default for AsciiRamp {
    fn default() -> Self {
        Self {
            chars: DEFAULT_RAMP.chars().collect(),
        }
    }
}

impl AsciiRamp {
    pub fn new(ramp: &str) -> RenderResult<Self> {
        let chars: Vec<char> = ramp.chars().collect();
        if chars.is_empty() {
            return Err(RenderError::InvalidConfig {
                section: "glyph",
                reason: "ramp must contain at least one character".into(),
            });
        }
        Ok(Self { chars })
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// Character for a 0-1 luminance.
    pub fn char_for(&self, luminance: f32) -> char {
        let last = self.chars.len() - 1;
        let index = (luminance.clamp(0.0, 1.0) * last as f32).round() as usize;
        self.chars[index.min(last)]
    }
}

/// One character of the output grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlyphCell {
    pub ch: char,
    pub rgb: [u8; 3],
}

/// Character grid, row 0 at the top.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlyphGrid {
    pub cols: u32,
    pub rows: u32,
    pub cells: Vec<GlyphCell>,
}

impl GlyphGrid {
    /// Map a display-order RGBA8 buffer to characters.
    ///
    /// Alpha 0 gives a blank, 1 and 255 go through the ramp by luminance,
    /// 2..=254 is drawn as exactly that character in the verbatim color.
    pub fn from_rgba(buffer: &[u8], cols: u32, rows: u32, ramp: &AsciiRamp) -> RenderResult<Self> {
        check_buffer(buffer, cols, rows)?;
        let cells = buffer
            .chunks_exact(4)
            .take(cols as usize * rows as usize)
            .map(|px| {
                let rgb = [px[0], px[1], px[2]];
                let ch = match PixelKind::from_alpha(px[3]) {
                    PixelKind::Unset => ' ',
                    PixelKind::GlyphOverride(code) => char::from(code),
                    PixelKind::Shaded | PixelKind::Opaque => {
                        let color = Vec3::new(rgb[0] as f32, rgb[1] as f32, rgb[2] as f32) / 255.0;
                        ramp.char_for(luminance(color))
                    }
                };
                GlyphCell { ch, rgb }
            })
            .collect();
        Ok(Self { cols, rows, cells })
    }

    pub fn cell(&self, col: u32, row: u32) -> GlyphCell {
        self.cells[(row * self.cols + col) as usize]
    }

    pub fn row(&self, row: u32) -> &[GlyphCell] {
        let start = (row * self.cols) as usize;
        &self.cells[start..start + self.cols as usize]
    }

    /// Characters only, one line per row.
    pub fn to_plain(&self) -> String {
        let mut out = String::with_capacity(self.cells.len() + self.rows as usize);
        for row in 0..self.rows {
            out.extend(self.row(row).iter().map(|c| c.ch));
            out.push('\n');
        }
        out
    }

    /// 24-bit ANSI colored text, one line per row.
    pub fn to_ansi(&self) -> String {
        let mut out = String::with_capacity(self.cells.len() * 20);
        for row in 0..self.rows {
            let mut current: Option<[u8; 3]> = None;
            for cell in self.row(row) {
                if current != Some(cell.rgb) {
                    let [r, g, b] = cell.rgb;
                    let _ = write!(out, "\x1b[38;2;{r};{g};{b}m");
                    current = Some(cell.rgb);
                }
                out.push(cell.ch);
            }
            out.push_str("\x1b[0m\n");
        }
        out
    }
}
