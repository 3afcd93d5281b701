use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use glyph_core::{presets, Atlas, Scene, SceneResult, DEFAULT_PREVIEW_SCALE};
use glyph_renderer::{
    AsciiRamp, FrameContext, FrameStatus, GlyphGrid, PixelRequest, RenderSettings, Router,
};

/// Built-in scenes.
#[derive(Debug, Default, Clone, Copy, ValueEnum)]
enum Preset {
    #[default]
    Showcase,
    Cornell,
}

impl Preset {
    fn build(self) -> Result<Scene> {
        let scene = match self {
            Preset::Showcase => presets::showcase()?,
            Preset::Cornell => presets::cornell_box()?,
        };
        Ok(scene)
    }
}

/// Render a scene as colored ASCII art in the terminal.
#[derive(Parser, Debug)]
#[command(name = "glyph_viewer", version)]
struct Args {
    /// Backend name or alias (pt, rt, gl, ...); overrides the settings file
    #[arg(short, long)]
    backend: Option<String>,

    /// Character columns
    #[arg(long, default_value_t = 96)]
    cols: u32,

    /// Character rows
    #[arg(long, default_value_t = 36)]
    rows: u32,

    /// Frames to render; the path tracer refines a static view every frame
    #[arg(short, long, default_value_t = 1)]
    frames: u32,

    /// Start time in seconds
    #[arg(long, default_value_t = 0.0)]
    time: f32,

    /// Seconds between frames
    #[arg(long, default_value_t = 1.0 / 30.0)]
    dt: f32,

    /// Orbit the camera around the vertical axis (radians per second)
    #[arg(long, default_value_t = 0.0)]
    orbit: f32,

    /// Built-in scene, used when no scene file is given
    #[arg(long, value_enum, default_value_t)]
    preset: Preset,

    /// Scene JSON file
    #[arg(short, long)]
    scene: Option<PathBuf>,

    /// Render settings JSON file
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Texture atlas: a PNG, or raw RGBA8 bytes sized by --atlas-size
    #[arg(long)]
    atlas: Option<PathBuf>,

    /// Dimensions of a raw atlas file
    #[arg(long, value_name = "WxH", value_parser = parse_size)]
    atlas_size: Option<(u32, u32)>,

    /// Write a preview PNG of the scene atlas
    #[arg(long, value_name = "PNG")]
    atlas_preview: Option<PathBuf>,

    /// Font used to draw glyph texels in the atlas preview
    #[arg(long, value_name = "TTF")]
    font: Option<PathBuf>,

    /// Also save the last frame as a PNG
    #[arg(long)]
    png: Option<PathBuf>,

    /// Print characters without ANSI colors
    #[arg(long)]
    plain: bool,
}

fn load_settings(args: &Args) -> Result<RenderSettings> {
    let mut settings = match &args.settings {
        Some(path) => RenderSettings::from_json_file(path)
            .with_context(|| format!("reading settings {}", path.display()))?,
        None => RenderSettings::default(),
    };
    if let Some(backend) = &args.backend {
        settings.backend = backend.clone();
    }
    if args.plain {
        settings.glyph.color = false;
    }
    Ok(settings)
}

fn load_scene(args: &Args) -> Result<Scene> {
    match &args.scene {
        Some(path) => Scene::load_json(path).with_context(|| format!("loading scene {}", path.display())),
        None => args.preset.build(),
    }
}

fn parse_size(text: &str) -> Result<(u32, u32), String> {
    let (w, h) = text
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WxH, got {text:?}"))?;
    let parse = |v: &str| v.trim().parse::<u32>().map_err(|e| format!("{v:?}: {e}"));
    let size = (parse(w)?, parse(h)?);
    if size.0 == 0 || size.1 == 0 {
        return Err(format!("atlas size must be at least 1x1, got {text:?}"));
    }
    Ok(size)
}

fn read_atlas(path: &Path, size: Option<(u32, u32)>) -> SceneResult<Atlas> {
    let is_png = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("png"));
    match (is_png, size) {
        (true, _) => Atlas::load_image(path),
        (false, Some((width, height))) => Atlas::load_raw(path, width, height),
        (false, None) => Err(glyph_core::SceneError::InvalidValue {
            field: "atlas_size",
            reason: "raw atlas files need --atlas-size WxH".into(),
        }),
    }
}

/// An unreadable atlas downgrades to the 1x1 fallback instead of aborting.
fn load_atlas(path: &Path, size: Option<(u32, u32)>) -> Atlas {
    match read_atlas(path, size) {
        Ok(atlas) => {
            let invalid = atlas.invalid_count();
            if invalid > 0 {
                log::warn!("Atlas {} has {} invalid texels", path.display(), invalid);
            }
            atlas
        }
        Err(err) => {
            log::warn!("Cannot load atlas {}: {}; using fallback", path.display(), err);
            Atlas::fallback()
        }
    }
}

fn save_png(router: &Router, cols: u32, rows: u32, path: &Path) -> Result<()> {
    let rgba = router.get_pixels(&PixelRequest::default());
    let rgb: Vec<u8> = rgba.chunks_exact(4).flat_map(|px| [px[0], px[1], px[2]]).collect();
    let image = image::RgbImage::from_raw(cols, rows, rgb).context("frame size does not match the grid")?;
    image.save(path).with_context(|| format!("writing {}", path.display()))?;
    log::info!("Saved {}", path.display());
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args = Args::parse();
    anyhow::ensure!(args.cols > 0 && args.rows > 0, "grid must be at least 1x1");

    let settings = load_settings(&args)?;
    let ramp = AsciiRamp::new(&settings.glyph.ramp)?;
    let color = settings.glyph.color;
    let mut router = Router::new(settings)?;
    let mut scene = load_scene(&args)?;
    if let Some(path) = &args.atlas {
        scene.atlas = load_atlas(path, args.atlas_size);
    }
    if let Some(path) = &args.atlas_preview {
        scene
            .atlas
            .export_preview(path, DEFAULT_PREVIEW_SCALE, args.font.as_deref())
            .with_context(|| format!("writing atlas preview {}", path.display()))?;
        log::info!("Saved atlas preview {}", path.display());
    }
    let base_camera = scene.camera;
    router.set_scene(scene);

    let mut buffer = vec![0u8; args.cols as usize * args.rows as usize * 4];
    let mut stdout = std::io::stdout().lock();
    for frame in 0..args.frames {
        let time = args.time + frame as f32 * args.dt;
        let mut context = FrameContext::new(args.cols, args.rows);
        if args.orbit != 0.0 {
            let mut camera = base_camera;
            camera.yaw += args.orbit * (time - args.time);
            context = context.with_camera(camera);
        }

        match router.render_scene(time, &mut buffer, &context)? {
            FrameStatus::NoScene => anyhow::bail!("backend {} has no scene", router.get_backend()),
            FrameStatus::Rendered { traced } => log::debug!("Frame {}: {} cells traced", frame, traced),
        }

        let grid = GlyphGrid::from_rgba(&buffer, args.cols, args.rows, &ramp)?;
        if args.frames > 1 {
            // Redraw in place
            write!(stdout, "\x1b[H")?;
        }
        let text = if color { grid.to_ansi() } else { grid.to_plain() };
        stdout.write_all(text.as_bytes())?;
        stdout.flush()?;
    }

    if let Some(path) = &args.png {
        save_png(&router, args.cols, args.rows, path)?;
    }
    router.dispose_gpu();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("64x32"), Ok((64, 32)));
        assert_eq!(parse_size("8X8"), Ok((8, 8)));
        assert!(parse_size("64").is_err());
        assert!(parse_size("0x4").is_err());
        assert!(parse_size("ax4").is_err());
    }

    #[test]
    fn test_load_atlas_falls_back_on_error() {
        let missing = Path::new("/nonexistent/atlas.png");
        assert_eq!(load_atlas(missing, None), Atlas::fallback());

        // Raw files without a size cannot be interpreted
        let raw = std::env::temp_dir().join(format!("glyph_viewer_atlas_{}.rgba", std::process::id()));
        std::fs::write(&raw, [0u8; 16]).unwrap();
        assert_eq!(load_atlas(&raw, None), Atlas::fallback());
        let loaded = load_atlas(&raw, Some((2, 2)));
        std::fs::remove_file(&raw).ok();
        assert_eq!((loaded.width, loaded.height), (2, 2));
        assert!(loaded.is_enabled());
    }

    #[test]
    fn test_load_atlas_reads_png() {
        let mut atlas = Atlas::new(3, 1);
        atlas.set_char(1, 0, '@', [250, 10, 10]).unwrap();
        let bytes = atlas.pixels.clone().unwrap();
        let image = image::RgbaImage::from_raw(3, 1, bytes).unwrap();
        let path = std::env::temp_dir().join(format!("glyph_viewer_atlas_{}.png", std::process::id()));
        image.save(&path).unwrap();
        let loaded = load_atlas(&path, None);
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded, atlas);
    }
}
