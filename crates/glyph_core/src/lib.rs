//! Glyph Core - scene schema, builder and backend adapters for glyphray.
//!
//! This crate provides:
//!
//! - **Scene types**: `Scene`, `Material`, geometry primitives, lights and the texture `Atlas`
//! - **Authoring**: the validating `SceneBuilder` and a few ready-made `presets`
//! - **Adapters**: per-backend reshaping of the unified scene (`adapters`)
//! - **Previews**: PNG inspection images of the atlas (`preview`)
//!
//! # Example
//!
//! ```ignore
//! use glyph_core::{LegacyMaterial, SceneBuilder};
//!
//! let mut builder = SceneBuilder::new();
//! builder
//!     .add_sphere([0.0, 1.0, 0.0], 1.0, LegacyMaterial::White)?
//!     .add_point_light([0.0, 4.0, 0.0], [1.0, 1.0, 1.0], 8.0)?;
//! let scene = builder.to_unified();
//! ```

pub mod adapters;
pub mod atlas;
pub mod builder;
pub mod error;
pub mod geometry;
pub mod light;
pub mod material;
pub mod mesh;
pub mod presets;
pub mod preview;
pub mod scene;

// Re-export commonly used types
pub use adapters::{PathTracerScene, RasterScene, RasterVertex, RayTraceScene, Shade};
pub use atlas::{Atlas, Texel, TexelKind};
pub use builder::{Capacity, SceneBuilder, VecArg};
pub use error::{SceneError, SceneResult};
pub use geometry::{Plane, Quad, QuadDiagonal, Sphere, TexelUv, Triangle};
pub use light::{AreaLight, DirectionalLight, EnvLight, Lights, PointLight};
pub use material::{LegacyMaterial, Material, MaterialKind, MaterialRef, MaterialTable};
pub use mesh::Mesh;
pub use preview::{load_font, DEFAULT_PREVIEW_SCALE};
pub use scene::{Geometry, Scene, SCENE_VERSION};
