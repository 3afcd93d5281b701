//! PNG previews of a texture atlas.
//!
//! Each texel becomes a `scale × scale` block over a gray checkerboard:
//! solid texels are filled, glyph texels show their character in the texel
//! color, and texels that fail validation get a red hatch.

use std::path::Path;

use fontdue::{Font, FontSettings};
use image::{Rgba, RgbaImage};

use crate::atlas::{Atlas, TexelKind};
use crate::error::{SceneError, SceneResult};

const CHECKER_LIGHT: Rgba<u8> = Rgba([200, 200, 200, 255]);
const CHECKER_DARK: Rgba<u8> = Rgba([160, 160, 160, 255]);
const HATCH: Rgba<u8> = Rgba([255, 0, 0, 255]);

/// Default block size in preview pixels per texel.
pub const DEFAULT_PREVIEW_SCALE: u32 = 16;

/// Parse a TrueType/OpenType font for glyph drawing.
pub fn load_font(path: impl AsRef<Path>) -> SceneResult<Font> {
    let bytes = std::fs::read(path.as_ref())?;
    Font::from_bytes(bytes, FontSettings::default()).map_err(|reason| SceneError::Font {
        path: path.as_ref().display().to_string(),
        reason: reason.to_string(),
    })
}

impl Atlas {
    /// Render the preview image. Without a font, glyph texels are drawn as
    /// a centered square in the glyph color.
    pub fn preview_image(&self, scale: u32, font: Option<&Font>) -> RgbaImage {
        let scale = scale.max(1);
        let mut image = RgbaImage::new(self.width * scale, self.height * scale);

        let check = (scale / 2).max(4);
        for (x, y, px) in image.enumerate_pixels_mut() {
            *px = if (x / check + y / check) % 2 == 0 { CHECKER_LIGHT } else { CHECKER_DARK };
        }

        let valid = self.valid_mask();
        for y in 0..self.height {
            for x in 0..self.width {
                let Some(texel) = self.texel(x as i64, y as i64) else {
                    continue;
                };
                let [r, g, b] = texel.rgb_bytes();
                let color = Rgba([r, g, b, 255]);
                let cell = Cell {
                    x0: x * scale,
                    y0: y * scale,
                    scale,
                };
                let index = y as usize * self.width as usize + x as usize;
                if !valid.get(index).copied().unwrap_or(true) {
                    cell.hatch(&mut image);
                    continue;
                }
                match texel.kind() {
                    TexelKind::Empty => {}
                    TexelKind::Opaque => cell.fill(&mut image, color),
                    TexelKind::Glyph(code) => match font {
                        Some(font) => cell.glyph(&mut image, font, char::from(code), color),
                        None => cell.marker(&mut image, color),
                    },
                }
            }
        }
        image
    }

    /// Write the preview as a PNG, drawing glyphs with the font at
    /// `font_path` when given.
    pub fn export_preview(&self, path: impl AsRef<Path>, scale: u32, font_path: Option<&Path>) -> SceneResult<()> {
        let font = font_path.map(load_font).transpose()?;
        let image = self.preview_image(scale, font.as_ref());
        image.save(path.as_ref())?;
        log::debug!(
            "Exported atlas preview: {} ({}x{}, {} invalid texels)",
            path.as_ref().display(),
            image.width(),
            image.height(),
            self.invalid_count()
        );
        Ok(())
    }
}

/// One texel's block in the preview.
struct Cell {
    x0: u32,
    y0: u32,
    scale: u32,
}

impl Cell {
    fn paint(&self, image: &mut RgbaImage, mut inside: impl FnMut(u32, u32) -> Option<Rgba<u8>>) {
        for j in 0..self.scale {
            for i in 0..self.scale {
                if let Some(color) = inside(i, j) {
                    image.put_pixel(self.x0 + i, self.y0 + j, color);
                }
            }
        }
    }

    fn fill(&self, image: &mut RgbaImage, color: Rgba<u8>) {
        self.paint(image, |_, _| Some(color));
    }

    fn marker(&self, image: &mut RgbaImage, color: Rgba<u8>) {
        let lo = self.scale / 4;
        let hi = self.scale - lo;
        self.paint(image, |i, j| ((lo..hi).contains(&i) && (lo..hi).contains(&j)).then_some(color));
    }

    /// Red outline plus both diagonals.
    fn hatch(&self, image: &mut RgbaImage) {
        let w = (self.scale / 8).max(1) as i64;
        let last = self.scale as i64 - 1;
        self.paint(image, |i, j| {
            let (i, j) = (i as i64, j as i64);
            let border = i < w || j < w || i > last - w || j > last - w;
            let diagonal = (i - j).abs() < w || (i + j - last).abs() < w;
            (border || diagonal).then_some(HATCH)
        });
    }

    /// Coverage-blend the rasterized glyph, centered in the block.
    fn glyph(&self, image: &mut RgbaImage, font: &Font, ch: char, color: Rgba<u8>) {
        let (metrics, coverage) = font.rasterize(ch, self.scale as f32 * 0.75);
        if metrics.width == 0 || metrics.height == 0 {
            return;
        }
        let left = (self.scale as i64 - metrics.width as i64) / 2;
        let top = (self.scale as i64 - metrics.height as i64) / 2;
        for (k, &c) in coverage.iter().enumerate() {
            let i = left + (k % metrics.width) as i64;
            let j = top + (k / metrics.width) as i64;
            if c == 0 || i < 0 || j < 0 || i >= self.scale as i64 || j >= self.scale as i64 {
                continue;
            }
            let px = image.get_pixel_mut(self.x0 + i as u32, self.y0 + j as u32);
            let t = c as u32;
            for channel in 0..3 {
                let blended = color.0[channel] as u32 * t + px.0[channel] as u32 * (255 - t);
                px.0[channel] = (blended / 255) as u8;
            }
            px.0[3] = 255;
        }
    }
}
