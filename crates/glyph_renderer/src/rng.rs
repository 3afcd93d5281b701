//! Sine-hash pseudo random numbers.
//!
//! Cheap and fully deterministic: every pixel seeds its own generator from
//! its screen position (optionally nudged by time), so the image does not
//! depend on which thread renders which tile. Not suitable for anything
//! security related.

use rand::RngCore;

/// `fract(sin(x * 12.9898 + y * 78.233) * 43758.5453)`
#[inline]
pub fn sine_hash(x: f64, y: f64) -> f64 {
    let v = (x * 12.9898 + y * 78.233).sin() * 43758.5453;
    v - v.floor()
}

/// Per-pixel generator advanced once per draw.
#[derive(Clone, Debug)]
pub struct SineHashRng {
    x: f64,
    y: f64,
    counter: u32,
}

impl SineHashRng {
    /// Seed from a pixel position and a stream index (sample pass, frame).
    pub fn for_pixel(px: u32, py: u32, stream: u32) -> Self {
        Self::with_offset(px, py, stream, 0.0)
    }

    /// Like [`for_pixel`](Self::for_pixel) with an extra offset, used for
    /// temporal dithering by elapsed time.
    pub fn with_offset(px: u32, py: u32, stream: u32, offset: f32) -> Self {
        let fx = px as f64 + 0.5;
        let fy = py as f64 + 0.5;
        let scramble = sine_hash(stream as f64 * 0.618_033_988_75, offset as f64 * 1.732_050_8);
        Self {
            x: fx + scramble * 37.0 + stream as f64 * 1.414_213_56,
            y: fy + scramble * 91.0 + offset as f64 * 0.577_215_66,
            counter: 0,
        }
    }

    #[inline]
    fn next_unit(&mut self) -> f64 {
        self.counter = self.counter.wrapping_add(1);
        let k = self.counter as f64;
        sine_hash(self.x + k * 0.754_877_666, self.y + k * 0.569_840_29)
    }
}

impl RngCore for SineHashRng {
    fn next_u32(&mut self) -> u32 {
        (self.next_unit() * 4_294_967_296.0) as u32
    }

    fn next_u64(&mut self) -> u64 {
        ((self.next_u32() as u64) << 32) | self.next_u32() as u64
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(4) {
            let bytes = self.next_u32().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}
