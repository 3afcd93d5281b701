//! Runtime-swappable backend facade.
//!
//! A [`Router`] owns exactly one live backend. Switching builds the new
//! backend first, disposes the old one, swaps them and replays the last
//! scene so the caller never has to re-send it.

use std::collections::BTreeMap;

use glyph_core::Scene;

use crate::backend::{Backend, FrameContext, FrameStatus, RenderArgs};
use crate::config::RenderSettings;
use crate::error::{RenderError, RenderResult};
use crate::path_tracer::PathTracer;
use crate::pixel::PixelRequest;
use crate::rasterizer::Rasterizer;
use crate::raytracer::RayTracer;

/// Builds a backend from the session settings.
pub type BackendFactory = Box<dyn Fn(&RenderSettings) -> RenderResult<Box<dyn Backend>> + Send + Sync>;

const ALIASES: &[(&str, &str)] = &[
    ("pt", PathTracer::NAME),
    ("path", PathTracer::NAME),
    ("pathtracer", PathTracer::NAME),
    ("rt", RayTracer::NAME),
    ("ray", RayTracer::NAME),
    ("raytracer", RayTracer::NAME),
    ("gl", Rasterizer::NAME),
    ("raster", Rasterizer::NAME),
    ("rasterizer", Rasterizer::NAME),
];

/// Trim, lowercase and resolve the built-in aliases.
pub fn canonical_name(name: &str) -> String {
    let name = name.trim().to_lowercase();
    ALIASES
        .iter()
        .find(|(alias, _)| *alias == name)
        .map_or(name, |(_, canonical)| canonical.to_string())
}

fn build_path_tracer(settings: &RenderSettings) -> RenderResult<Box<dyn Backend>> {
    Ok(Box::new(PathTracer::new(settings.path_tracer.clone())?))
}

fn build_raytracer(settings: &RenderSettings) -> RenderResult<Box<dyn Backend>> {
    Ok(Box::new(RayTracer::new(settings.raytracer.clone())?))
}

fn build_rasterizer(settings: &RenderSettings) -> RenderResult<Box<dyn Backend>> {
    Ok(Box::new(Rasterizer::new(settings.raster.clone())?))
}

fn known_names(factories: &BTreeMap<String, BackendFactory>) -> String {
    factories.keys().map(String::as_str).collect::<Vec<_>>().join(", ")
}

/// Owned rendering context.
pub struct Router {
    settings: RenderSettings,
    factories: BTreeMap<String, BackendFactory>,
    active: Box<dyn Backend>,
    active_name: String,
    scene: Option<Scene>,
}

impl Router {
    /// Register the built-in backends and start the one named in
    /// `settings.backend`.
    pub fn new(settings: RenderSettings) -> RenderResult<Self> {
        settings.validate()?;
        let mut factories: BTreeMap<String, BackendFactory> = BTreeMap::new();
        factories.insert(PathTracer::NAME.to_string(), Box::new(build_path_tracer));
        factories.insert(RayTracer::NAME.to_string(), Box::new(build_raytracer));
        factories.insert(Rasterizer::NAME.to_string(), Box::new(build_rasterizer));

        let active_name = canonical_name(&settings.backend);
        let factory = factories.get(&active_name).ok_or_else(|| RenderError::UnknownBackend {
            name: settings.backend.clone(),
            available: known_names(&factories),
        })?;
        let active = factory(&settings)?;
        log::info!("Starting with backend {}", active_name);

        Ok(Self {
            settings,
            factories,
            active,
            active_name,
            scene: None,
        })
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// Add or replace a backend factory under `name` (stored lowercased).
    pub fn register_backend<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&RenderSettings) -> RenderResult<Box<dyn Backend>> + Send + Sync + 'static,
    {
        let name = name.trim().to_lowercase();
        log::debug!("Registered backend {}", name);
        self.factories.insert(name, Box::new(factory));
    }

    /// Canonical name of the live backend.
    pub fn get_backend(&self) -> &str {
        &self.active_name
    }

    /// Registered backend names, sorted.
    pub fn list_backends(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    pub fn backend(&self) -> &dyn Backend {
        self.active.as_ref()
    }

    pub fn backend_mut(&mut self) -> &mut dyn Backend {
        self.active.as_mut()
    }

    /// Switch backends by name or alias. Selecting the live backend is a
    /// no-op. On error the current backend stays live.
    pub fn set_backend(&mut self, name: &str) -> RenderResult<()> {
        let canonical = canonical_name(name);
        if canonical == self.active_name {
            return Ok(());
        }
        let factory = self
            .factories
            .get(&canonical)
            .ok_or_else(|| RenderError::UnknownBackend {
                name: name.to_string(),
                available: known_names(&self.factories),
            })?;
        let mut next = factory(&self.settings)?;

        self.active.dispose();
        if let Some(scene) = &self.scene {
            next.set_scene(scene);
        }
        self.active = next;
        log::info!("Switched backend {} -> {}", self.active_name, canonical);
        self.active_name = canonical;
        Ok(())
    }

    /// Keep `scene` for later switches and hand it to the live backend.
    pub fn set_scene(&mut self, scene: Scene) {
        log::info!(
            "Installing scene with {} primitives on {}",
            scene.primitive_count(),
            self.active_name
        );
        self.active.set_scene(&scene);
        self.scene = Some(scene);
    }

    pub fn scene(&self) -> Option<&Scene> {
        self.scene.as_ref()
    }

    pub fn render_scene(&mut self, time: f32, buffer: &mut [u8], context: &FrameContext) -> RenderResult<FrameStatus> {
        self.active.render(time, buffer, context)
    }

    pub fn render_raw(&mut self, args: RenderArgs<'_>) -> RenderResult<FrameStatus> {
        self.active.render_raw(args)
    }

    pub fn get_pixels(&self, request: &PixelRequest) -> Vec<u8> {
        self.active.get_pixels(request)
    }

    pub fn read_pixels_into(&self, request: &PixelRequest, out: &mut [u8]) -> RenderResult<usize> {
        self.active.read_pixels_into(request, out)
    }

    /// Release the live backend's resources. The router keeps its scene,
    /// so `set_scene` or a backend switch brings rendering back.
    pub fn dispose_gpu(&mut self) {
        self.active.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PathTracerConfig, DEFAULT_PIXEL_ASPECT};
    use crate::pixel::{FrameBuffer, PixelKind};
    use glyph_core::{presets, LegacyMaterial, Material, SceneBuilder};
    use glyph_math::{CameraPose, Vec3, ViewFrame};

    fn quick_settings() -> RenderSettings {
        RenderSettings {
            path_tracer: PathTracerConfig::single_pass(1, 2),
            ..Default::default()
        }
    }

    struct Dummy(FrameBuffer);

    impl Backend for Dummy {
        fn name(&self) -> &'static str {
            "dummy"
        }
        fn set_scene(&mut self, _scene: &Scene) {}
        fn render(&mut self, _time: f32, buffer: &mut [u8], context: &FrameContext) -> RenderResult<FrameStatus> {
            crate::error::check_buffer(buffer, context.cols, context.rows)?;
            buffer.fill(9);
            Ok(FrameStatus::Rendered { traced: 0 })
        }
        fn frame(&self) -> &FrameBuffer {
            &self.0
        }
        fn dispose(&mut self) {}
    }

    #[test]
    fn test_aliases() {
        assert_eq!(canonical_name("PT"), "pathtrace");
        assert_eq!(canonical_name(" path "), "pathtrace");
        assert_eq!(canonical_name("ray"), "raytrace");
        assert_eq!(canonical_name("gl"), "raster");
        assert_eq!(canonical_name("rasterizer"), "raster");
        assert_eq!(canonical_name("raytrace"), "raytrace");
        assert_eq!(canonical_name("custom"), "custom");
    }

    #[test]
    fn test_unknown_backend_is_an_error() {
        let mut router = Router::new(quick_settings()).unwrap();
        let err = router.set_backend("vulkan").unwrap_err();
        match err {
            RenderError::UnknownBackend { name, available } => {
                assert_eq!(name, "vulkan");
                assert_eq!(available, "pathtrace, raster, raytrace");
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(router.get_backend(), "pathtrace");

        let settings = RenderSettings {
            backend: "nope".into(),
            ..Default::default()
        };
        assert!(matches!(Router::new(settings), Err(RenderError::UnknownBackend { .. })));
    }

    #[test]
    fn test_switch_replays_scene() {
        let mut router = Router::new(quick_settings()).unwrap();
        router.set_scene(presets::cornell_box().unwrap());
        let ctx = FrameContext::new(16, 8);
        let mut buffer = vec![0u8; 16 * 8 * 4];
        router.render_scene(0.0, &mut buffer, &ctx).unwrap();
        assert!(buffer.chunks_exact(4).all(|px| px[3] == PixelKind::Shaded.alpha()));

        router.set_backend("gl").unwrap();
        assert_eq!(router.get_backend(), "raster");
        assert_eq!(router.backend().name(), "raster");
        let status = router.render_scene(0.0, &mut buffer, &ctx).unwrap();
        assert_eq!(status, FrameStatus::Rendered { traced: 128 });
        assert!(buffer.chunks_exact(4).all(|px| px[3] == 255));

        let pixels = router.get_pixels(&PixelRequest::default());
        assert_eq!(pixels, buffer);
        let mut out = vec![0u8; buffer.len()];
        assert_eq!(router.read_pixels_into(&PixelRequest::default(), &mut out).unwrap(), buffer.len());
        assert_eq!(out, buffer);
    }

    #[test]
    fn test_no_scene_then_dispose() {
        let mut router = Router::new(quick_settings()).unwrap();
        let mut buffer = vec![5u8; 4 * 4 * 4];
        let ctx = FrameContext::new(4, 4);
        assert_eq!(router.render_scene(0.0, &mut buffer, &ctx).unwrap(), FrameStatus::NoScene);

        router.set_scene(presets::cornell_box().unwrap());
        router
            .render_raw(RenderArgs {
                time: 0.0,
                buffer: &mut buffer,
                context: ctx,
            })
            .unwrap();
        router.dispose_gpu();
        router.dispose_gpu();
        assert!(router.get_pixels(&PixelRequest::default()).is_empty());
        assert!(router.scene().is_some());

        let mut small = vec![0u8; 4];
        assert!(matches!(
            router.render_scene(0.0, &mut small, &ctx),
            Err(RenderError::BufferSize { .. })
        ));
    }

    #[test]
    fn test_register_custom_backend() {
        let mut router = Router::new(quick_settings()).unwrap();
        router.register_backend("Dummy", |_| Ok(Box::new(Dummy(FrameBuffer::new(2, 2))) as Box<dyn Backend>));
        assert_eq!(router.list_backends(), vec!["dummy", "pathtrace", "raster", "raytrace"]);
        router.set_backend("DUMMY").unwrap();
        let mut buffer = vec![0u8; 8];
        router.render_scene(0.0, &mut buffer, &FrameContext::new(2, 1)).unwrap();
        assert_eq!(buffer, vec![9; 8]);
        assert_eq!(router.get_pixels(&PixelRequest::default()), vec![0u8; 16]);
    }

    #[test]
    fn test_env_only_scene_on_every_backend() {
        let mut builder = SceneBuilder::new();
        builder
            .set_env_light([0.5, 0.5, 0.5], 1.0)
            .unwrap()
            .set_area_light([0.0, 100.0, 0.0], 0.1, false)
            .unwrap();
        let mut router = Router::new(quick_settings()).unwrap();
        router.set_scene(builder.to_unified());
        let ctx = FrameContext::new(12, 6);
        for backend in ["pathtrace", "raytrace", "raster"] {
            router.set_backend(backend).unwrap();
            let mut buffer = vec![0u8; 12 * 6 * 4];
            router.render_scene(0.0, &mut buffer, &ctx).unwrap();
            assert!(
                buffer.chunks_exact(4).all(|px| px[..3] == [128, 128, 128]),
                "{backend} is not flat"
            );
        }
    }

    #[test]
    fn test_emitter_position_agrees_across_backends() {
        let center = Vec3::new(-0.9, 0.4, -5.0);
        let pose = CameraPose::new(Vec3::new(0.0, 0.0, 0.0), 0.1, 0.05, 55f32.to_radians());
        let mut builder = SceneBuilder::new();
        builder
            .set_camera_pose(pose.position, pose.yaw, pose.pitch, pose.fov_y)
            .unwrap()
            .set_env_light([0.0, 0.0, 0.0], 0.0)
            .unwrap()
            .set_area_light([0.0, 100.0, 0.0], 0.01, false)
            .unwrap()
            .add_sphere(center, 0.5, Material::emissive("lamp", Vec3::splat(4.0)))
            .unwrap()
            .add_sphere([3.0, -2.0, -8.0], 0.5, LegacyMaterial::White)
            .unwrap();

        let (cols, rows) = (48, 24);
        let expected = ViewFrame::new(&pose, cols, rows, DEFAULT_PIXEL_ASPECT)
            .project(center)
            .unwrap();
        let mut router = Router::new(quick_settings()).unwrap();
        router.set_scene(builder.to_unified());
        for backend in ["pathtrace", "raytrace", "raster"] {
            router.set_backend(backend).unwrap();
            let mut buffer = vec![0u8; (cols * rows * 4) as usize];
            router.render_scene(0.0, &mut buffer, &FrameContext::new(cols, rows)).unwrap();
            let (mut sx, mut sy, mut n) = (0.0f32, 0.0f32, 0.0f32);
            for (i, px) in buffer.chunks_exact(4).enumerate() {
                if px[0] > 200 {
                    sx += (i as u32 % cols) as f32 + 0.5;
                    sy += (i as u32 / cols) as f32 + 0.5;
                    n += 1.0;
                }
            }
            assert!(n > 0.0, "{backend} drew nothing");
            assert!((sx / n - expected.x).abs() <= 1.0, "{backend} x {} vs {}", sx / n, expected.x);
            assert!((sy / n - expected.y).abs() <= 1.0, "{backend} y {} vs {}", sy / n, expected.y);
        }
    }
}
