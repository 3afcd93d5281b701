//! Errors raised while building, loading or validating scenes.

use thiserror::Error;

/// Errors that can occur while building or loading a scene.
#[derive(Error, Debug)]
pub enum SceneError {
    #[error("invalid vector for {field}: {reason}")]
    InvalidVector { field: &'static str, reason: String },

    #[error("non-finite value for {field}: {value}")]
    NonFinite { field: &'static str, value: f32 },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("unknown material: {0}")]
    UnknownMaterial(String),

    #[error("atlas size mismatch: expected {expected} bytes for {width}x{height}, got {actual}")]
    AtlasSize {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    #[error("invalid atlas texel at ({x}, {y}): alpha {alpha}")]
    InvalidAtlasTexel { x: u32, y: u32, alpha: u8 },

    #[error("not a visible ASCII glyph: {0:?}")]
    InvalidGlyph(char),

    #[error("cannot load font {path}: {reason}")]
    Font { path: String, reason: String },

    #[error("unsupported scene version {found} (newest supported is {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("scene JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("image decoding error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SceneResult<T> = Result<T, SceneError>;

/// Reject NaN and infinities.
pub fn check_finite(field: &'static str, value: f32) -> SceneResult<f32> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(SceneError::NonFinite { field, value })
    }
}
