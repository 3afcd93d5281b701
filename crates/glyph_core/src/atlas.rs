//! The shared RGBA8 texture atlas.
//!
//! Raw layout: headerless RGBA8, row-major, top-to-bottom, `(0, 0)` is the
//! top-left texel, `width * height * 4` bytes. Texels are addressed by
//! exact integer coordinates; there is no filtering.
//!
//! The alpha byte is overloaded:
//!
//! - `0`: no texture here, use the material color
//! - `32..=126`: a visible ASCII glyph; RGB is the glyph color
//! - anything else: an opaque textured texel (`1` in atlases written by the paint tool)

use std::path::Path;

use bytemuck::{Pod, Zeroable};
use glyph_math::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::{SceneError, SceneResult};

/// First visible ASCII code.
pub const GLYPH_MIN: u8 = 32;
/// Last visible ASCII code.
pub const GLYPH_MAX: u8 = 126;

/// One atlas texel.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct Texel {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

/// What a texel's alpha byte means.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TexelKind {
    Empty,
    Glyph(u8),
    Opaque,
}

impl Texel {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn kind(&self) -> TexelKind {
        match self.a {
            0 => TexelKind::Empty,
            GLYPH_MIN..=GLYPH_MAX => TexelKind::Glyph(self.a),
            _ => TexelKind::Opaque,
        }
    }

    /// Color as linear 0-1 RGB (bytes taken verbatim, no sRGB decode).
    pub fn rgb(&self) -> Vec3 {
        Vec3::new(self.r as f32, self.g as f32, self.b as f32) / 255.0
    }

    pub fn rgb_bytes(&self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }

    /// Alpha 0, 1 or a visible ASCII code; what the paint tool writes.
    pub fn is_strictly_valid(&self) -> bool {
        self.a == 0 || self.a == 1 || (GLYPH_MIN..=GLYPH_MAX).contains(&self.a)
    }
}

/// Texture atlas shared by all textured triangles and quads.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Atlas {
    pub width: u32,
    pub height: u32,
    /// RGBA8 bytes; `None` disables texturing
    pub pixels: Option<Vec<u8>>,
}

impl Atlas {
    /// A cleared atlas of the given size.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: Some(vec![0; width as usize * height as usize * 4]),
        }
    }

    /// 1x1 empty atlas, used when a scene provides none.
    pub fn fallback() -> Self {
        Self::new(1, 1)
    }

    /// Wrap raw RGBA8 bytes, checking the length.
    pub fn from_raw(width: u32, height: u32, bytes: Vec<u8>) -> SceneResult<Self> {
        let expected = width as usize * height as usize * 4;
        if bytes.len() != expected {
            return Err(SceneError::AtlasSize {
                width,
                height,
                expected,
                actual: bytes.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels: Some(bytes),
        })
    }

    /// Load a raw headerless atlas; dimensions are supplied out of band.
    pub fn load_raw(path: impl AsRef<Path>, width: u32, height: u32) -> SceneResult<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        let atlas = Self::from_raw(width, height, bytes)?;
        log::debug!(
            "Loaded raw atlas: {} ({}x{})",
            path.as_ref().display(),
            width,
            height
        );
        Ok(atlas)
    }

    /// Load an atlas from an image file. Channel bytes are kept verbatim.
    pub fn load_image(path: impl AsRef<Path>) -> SceneResult<Self> {
        let rgba = image::open(path.as_ref())?.to_rgba8();
        let (width, height) = rgba.dimensions();
        log::debug!(
            "Loaded atlas image: {} ({}x{})",
            path.as_ref().display(),
            width,
            height
        );
        Self::from_raw(width, height, rgba.into_raw())
    }

    /// Write the raw headerless bytes.
    pub fn save_raw(&self, path: impl AsRef<Path>) -> SceneResult<()> {
        std::fs::write(path, self.pixels.as_deref().unwrap_or_default())?;
        Ok(())
    }

    /// True when texel lookups can succeed.
    pub fn is_enabled(&self) -> bool {
        self.texels().is_some_and(|t| !t.is_empty())
    }

    /// Texels in row-major order, or `None` when disabled or malformed.
    pub fn texels(&self) -> Option<&[Texel]> {
        let bytes = self.pixels.as_deref()?;
        if bytes.len() != self.width as usize * self.height as usize * 4 {
            return None;
        }
        bytemuck::try_cast_slice(bytes).ok()
    }

    /// Exact texel lookup. Out-of-range coordinates return `None`.
    pub fn texel(&self, x: i64, y: i64) -> Option<Texel> {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return None;
        }
        let index = y as usize * self.width as usize + x as usize;
        self.texels()?.get(index).copied()
    }

    /// Per-texel result of the strict content rule, row-major. Empty when
    /// the atlas is disabled.
    pub fn valid_mask(&self) -> Vec<bool> {
        self.texels()
            .map(|texels| texels.iter().map(Texel::is_strictly_valid).collect())
            .unwrap_or_default()
    }

    pub fn invalid_count(&self) -> usize {
        self.valid_mask().iter().filter(|&&ok| !ok).count()
    }

    /// Strict content check: every alpha is 0, 1 or a visible ASCII code.
    /// Reports the first offending texel.
    pub fn validate(&self) -> SceneResult<()> {
        let Some(i) = self.valid_mask().iter().position(|&ok| !ok) else {
            return Ok(());
        };
        let width = self.width.max(1) as usize;
        let (x, y) = ((i % width) as u32, (i / width) as u32);
        Err(SceneError::InvalidAtlasTexel {
            x,
            y,
            alpha: self.texel(x as i64, y as i64).map_or(0, |t| t.a),
        })
    }

    /// Paint a solid texel (alpha 1).
    pub fn set_pixel(&mut self, x: u32, y: u32, rgb: [u8; 3]) {
        self.write(x, y, Texel::new(rgb[0], rgb[1], rgb[2], 1));
    }

    /// Paint a glyph texel.
    pub fn set_char(&mut self, x: u32, y: u32, ch: char, rgb: [u8; 3]) -> SceneResult<()> {
        let code = u8::try_from(u32::from(ch)).map_err(|_| SceneError::InvalidGlyph(ch))?;
        if !(GLYPH_MIN..=GLYPH_MAX).contains(&code) {
            return Err(SceneError::InvalidGlyph(ch));
        }
        self.write(x, y, Texel::new(rgb[0], rgb[1], rgb[2], code));
        Ok(())
    }

    /// Paint a row of glyphs starting at `(x, y)`, clipped at the right edge.
    pub fn write_text(&mut self, x: u32, y: u32, text: &str, rgb: [u8; 3]) -> SceneResult<()> {
        for (i, ch) in text.chars().enumerate() {
            let cx = x + i as u32;
            if cx >= self.width {
                break;
            }
            self.set_char(cx, y, ch, rgb)?;
        }
        Ok(())
    }

    /// Reset a texel to empty.
    pub fn clear(&mut self, x: u32, y: u32) {
        self.write(x, y, Texel::default());
    }

    fn write(&mut self, x: u32, y: u32, texel: Texel) {
        if x >= self.width || y >= self.height {
            return;
        }
        let len = self.width as usize * self.height as usize * 4;
        let bytes = self.pixels.get_or_insert_with(|| vec![0; len]);
        if bytes.len() != len {
            bytes.resize(len, 0);
        }
        let base = (y as usize * self.width as usize + x as usize) * 4;
        bytes[base..base + 4].copy_from_slice(bytemuck::bytes_of(&texel));
    }
}
