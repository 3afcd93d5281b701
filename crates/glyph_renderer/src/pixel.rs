//! Pixel boundary types.
//!
//! Backends work with [`Pixel`] values carrying a [`PixelKind`] tag. The
//! alpha byte convention of the RGBA8 output is applied only when a frame
//! is flattened:
//!
//! | alpha | meaning |
//! |---|---|
//! | `0` | unset |
//! | `1` | shaded pixel from the path tracer |
//! | `2..=254` | literal ASCII code, draw exactly this character |
//! | `255` | opaque pixel from the ray tracer or rasterizer |

use glyph_core::{Texel, TexelKind};
use glyph_math::Vec3;

use crate::error::{check_buffer, RenderResult};

/// What the alpha byte of an output pixel says.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PixelKind {
    #[default]
    Unset,
    Shaded,
    Opaque,
    GlyphOverride(u8),
}

impl PixelKind {
    pub fn alpha(self) -> u8 {
        match self {
            PixelKind::Unset => 0,
            PixelKind::Shaded => 1,
            PixelKind::Opaque => 255,
            PixelKind::GlyphOverride(code) => code.clamp(2, 254),
        }
    }

    pub fn from_alpha(alpha: u8) -> Self {
        match alpha {
            0 => PixelKind::Unset,
            1 => PixelKind::Shaded,
            255 => PixelKind::Opaque,
            code => PixelKind::GlyphOverride(code),
        }
    }

    pub fn is_glyph(self) -> bool {
        matches!(self, PixelKind::GlyphOverride(_))
    }
}

/// Quantize a linear 0-1 channel to a byte.
#[inline]
pub fn quantize(c: f32) -> u8 {
    (c.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// One output pixel before flattening.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Pixel {
    pub color: Vec3,
    pub kind: PixelKind,
}

impl Pixel {
    pub fn shaded(color: Vec3) -> Self {
        Self {
            color,
            kind: PixelKind::Shaded,
        }
    }

    pub fn opaque(color: Vec3) -> Self {
        Self {
            color,
            kind: PixelKind::Opaque,
        }
    }

    /// Glyph pixel carrying the texel color verbatim.
    pub fn glyph(texel: Texel) -> Self {
        let code = match texel.kind() {
            TexelKind::Glyph(code) => code,
            _ => texel.a,
        };
        Self {
            color: texel.rgb(),
            kind: PixelKind::GlyphOverride(code),
        }
    }

    pub fn to_rgba8(&self) -> [u8; 4] {
        [
            quantize(self.color.x),
            quantize(self.color.y),
            quantize(self.color.z),
            self.kind.alpha(),
        ]
    }
}

/// Read-back options for a finished frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelRequest {
    /// `true` returns rows top to bottom (display order), `false` bottom
    /// to top (device order).
    pub flip_y: bool,
    /// Output width; defaults to the frame width. Extra columns are unset.
    pub width: Option<u32>,
    /// Output height; defaults to the frame height. Extra rows are unset.
    pub height: Option<u32>,
}

impl Default for PixelRequest {
    fn default() -> Self {
        Self {
            flip_y: true,
            width: None,
            height: None,
        }
    }
}

/// A frame of tagged pixels, row 0 at the top.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameBuffer {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<Pixel>,
}

impl FrameBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Pixel::default(); width as usize * height as usize],
        }
    }

    pub fn from_pixels(width: u32, height: u32, pixels: Vec<Pixel>) -> Self {
        debug_assert_eq!(pixels.len(), width as usize * height as usize);
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn get(&self, x: u32, y: u32) -> Pixel {
        self.pixels[(y * self.width + x) as usize]
    }

    pub fn set(&mut self, x: u32, y: u32, pixel: Pixel) {
        self.pixels[(y * self.width + x) as usize] = pixel;
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Flatten into a caller buffer of at least `width * height * 4` bytes.
    pub fn write_rgba(&self, out: &mut [u8]) {
        for (chunk, pixel) in out.chunks_exact_mut(4).zip(&self.pixels) {
            chunk.copy_from_slice(&pixel.to_rgba8());
        }
    }

    /// Convert to RGBA bytes in display order.
    pub fn to_rgba(&self) -> Vec<u8> {
        let mut bytes = vec![0; self.pixels.len() * 4];
        self.write_rgba(&mut bytes);
        bytes
    }

    /// Output size of `request` against this frame.
    pub fn request_size(&self, request: &PixelRequest) -> (u32, u32) {
        (request.width.unwrap_or(self.width), request.height.unwrap_or(self.height))
    }

    /// RGBA bytes laid out as requested.
    pub fn read_pixels(&self, request: &PixelRequest) -> Vec<u8> {
        let (width, height) = self.request_size(request);
        let mut bytes = vec![0u8; width as usize * height as usize * 4];
        self.fill_request(request, &mut bytes);
        bytes
    }

    /// Write the requested layout into `out`, which must hold at least
    /// `width * height * 4` bytes. Returns the bytes written.
    pub fn read_pixels_into(&self, request: &PixelRequest, out: &mut [u8]) -> RenderResult<usize> {
        let (width, height) = self.request_size(request);
        check_buffer(out, width, height)?;
        let len = width as usize * height as usize * 4;
        out[..len].fill(0);
        self.fill_request(request, &mut out[..len]);
        Ok(len)
    }

    fn fill_request(&self, request: &PixelRequest, bytes: &mut [u8]) {
        let (width, height) = self.request_size(request);
        for row in 0..height.min(self.height) {
            let src_row = if request.flip_y {
                row
            } else {
                self.height - 1 - row
            };
            for x in 0..width.min(self.width) {
                let base = (row as usize * width as usize + x as usize) * 4;
                bytes[base..base + 4].copy_from_slice(&self.get(x, src_row).to_rgba8());
            }
        }
    }
}
