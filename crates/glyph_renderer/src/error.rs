//! Renderer errors.
//!
//! Only setup and caller-contract problems are errors. A frame with
//! missing or odd scene data still renders, using defaults.

use glyph_core::SceneError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("unknown backend {name:?} (available: {available})")]
    UnknownBackend { name: String, available: String },

    #[error("invalid {section} config: {reason}")]
    InvalidConfig { section: &'static str, reason: String },

    #[error("output buffer too small: need {needed} bytes for {cols}x{rows}, got {actual}")]
    BufferSize {
        cols: u32,
        rows: u32,
        needed: usize,
        actual: usize,
    },

    #[error(transparent)]
    Scene(#[from] SceneError),

    #[error("settings IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("settings JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type RenderResult<T> = Result<T, RenderError>;

/// Check a caller-provided RGBA8 buffer against the frame size.
pub fn check_buffer(buffer: &[u8], cols: u32, rows: u32) -> RenderResult<()> {
    let needed = cols as usize * rows as usize * 4;
    if buffer.len() < needed {
        return Err(RenderError::BufferSize {
            cols,
            rows,
            needed,
            actual: buffer.len(),
        });
    }
    Ok(())
}
