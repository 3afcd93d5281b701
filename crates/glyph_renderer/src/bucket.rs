//! Tile ("bucket") scheduling.
//!
//! A frame is cut into square buckets that rayon renders in parallel.
//! Every pixel seeds its own random stream, so the output does not depend
//! on which worker picks up which bucket.

use rayon::prelude::*;

/// Bucket edge in cells. Character grids are small, so tiles are too.
pub const DEFAULT_BUCKET_SIZE: u32 = 16;

/// Rectangle of cells rendered as one work item. Edge buckets are clipped
/// to the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bucket {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Bucket {
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Cell coordinates in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        (self.y..self.y + self.height).flat_map(move |y| (self.x..self.x + self.width).map(move |x| (x, y)))
    }

    /// Squared distance from the bucket center to the image center, in
    /// doubled units so it stays integral.
    fn center_distance(&self, width: u32, height: u32) -> i64 {
        let dx = (2 * self.x + self.width) as i64 - width as i64;
        let dy = (2 * self.y + self.height) as i64 - height as i64;
        dx * dx + dy * dy
    }
}

/// Split `width × height` into buckets, nearest to the image center first.
pub fn generate_buckets(width: u32, height: u32, bucket_size: u32) -> Vec<Bucket> {
    let size = bucket_size.max(1);
    let mut buckets: Vec<Bucket> = (0..height)
        .step_by(size as usize)
        .flat_map(|y| {
            (0..width).step_by(size as usize).map(move |x| Bucket {
                x,
                y,
                width: size.min(width - x),
                height: size.min(height - y),
            })
        })
        .collect();
    // Stable sort keeps scanline order among equidistant buckets
    buckets.sort_by_key(|b| b.center_distance(width, height));
    buckets
}

/// Shade every cell of one bucket, row-major.
pub fn render_bucket<T, F>(bucket: &Bucket, shade: &F) -> Vec<T>
where
    F: Fn(u32, u32) -> T,
{
    bucket.cells().map(|(x, y)| shade(x, y)).collect()
}

/// Evaluate `shade` for every cell of a `width × height` frame in parallel
/// buckets. The result is row-major with row 0 at the top.
pub fn render_tiles<T, F>(width: u32, height: u32, bucket_size: u32, shade: F) -> Vec<T>
where
    T: Send + Clone + Default,
    F: Fn(u32, u32) -> T + Sync,
{
    let buckets = generate_buckets(width, height, bucket_size);
    let tiles: Vec<Vec<T>> = buckets.par_iter().map(|bucket| render_bucket(bucket, &shade)).collect();

    let mut frame = vec![T::default(); width as usize * height as usize];
    for (bucket, tile) in buckets.iter().zip(tiles) {
        for ((x, y), value) in bucket.cells().zip(tile) {
            frame[y as usize * width as usize + x as usize] = value;
        }
    }
    frame
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buckets_cover_frame_once() {
        let (w, h) = (100, 30);
        let buckets = generate_buckets(w, h, 16);
        assert_eq!(buckets.len(), 7 * 2);

        let mut seen = vec![0u8; (w * h) as usize];
        for (x, y) in buckets.iter().flat_map(|b| b.cells()) {
            seen[(y * w + x) as usize] += 1;
        }
        assert!(seen.iter().all(|&n| n == 1));
    }

    #[test]
    fn test_center_bucket_first() {
        let buckets = generate_buckets(48, 48, 16);
        assert_eq!(buckets.len(), 9);
        assert_eq!((buckets[0].x, buckets[0].y), (16, 16));
    }

    #[test]
    fn test_zero_bucket_size_is_clamped() {
        let buckets = generate_buckets(3, 2, 0);
        assert_eq!(buckets.len(), 6);
        assert!(buckets.iter().all(|b| b.pixel_count() == 1));
    }

    #[test]
    fn test_render_tiles_places_every_cell() {
        let (w, h) = (37, 19);
        let frame = render_tiles(w, h, 8, |x, y| y * 1000 + x);
        assert_eq!(frame.len(), (w * h) as usize);
        for y in 0..h {
            for x in 0..w {
                assert_eq!(frame[(y * w + x) as usize], y * 1000 + x);
            }
        }
    }
}
