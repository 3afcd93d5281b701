//! The contract every renderer implements.

use glyph_core::Scene;
use glyph_math::CameraPose;

use crate::error::RenderResult;
use crate::pixel::{FrameBuffer, PixelRequest};

/// Per-frame inputs that do not belong to the scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameContext {
    pub cols: u32,
    pub rows: u32,
    /// Camera for this frame; `None` uses the scene's camera
    pub camera: Option<CameraPose>,
}

impl FrameContext {
    pub fn new(cols: u32, rows: u32) -> Self {
        Self {
            cols,
            rows,
            camera: None,
        }
    }

    pub fn with_camera(mut self, camera: CameraPose) -> Self {
        self.camera = Some(camera);
        self
    }

    /// The frame camera, falling back to the scene's.
    pub fn camera_or(&self, scene_camera: &CameraPose) -> CameraPose {
        self.camera.unwrap_or(*scene_camera)
    }

    pub fn pixel_count(&self) -> usize {
        self.cols as usize * self.rows as usize
    }
}

/// What a render call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// A frame was produced; `traced` pixels received new samples
    Rendered { traced: usize },
    /// No scene is set; the output buffer was left untouched
    NoScene,
}

/// Bundled arguments for [`Backend::render_raw`].
#[derive(Debug)]
pub struct RenderArgs<'a> {
    pub time: f32,
    pub buffer: &'a mut [u8],
    pub context: FrameContext,
}

/// A renderer behind the router.
///
/// `render` takes `&mut self`, so at most one frame is in flight per
/// backend.
pub trait Backend: Send {
    /// Canonical backend name.
    fn name(&self) -> &'static str;

    /// Replace the scene snapshot used by later frames.
    fn set_scene(&mut self, scene: &Scene);

    /// Render one frame into `buffer` (RGBA8, display order). Writes
    /// nothing when no scene is set.
    fn render(&mut self, time: f32, buffer: &mut [u8], context: &FrameContext) -> RenderResult<FrameStatus>;

    /// Same as [`render`](Backend::render) with bundled arguments.
    fn render_raw(&mut self, args: RenderArgs<'_>) -> RenderResult<FrameStatus> {
        self.render(args.time, args.buffer, &args.context)
    }

    /// The last rendered frame. Empty before the first frame and after
    /// `dispose`.
    fn frame(&self) -> &FrameBuffer;

    /// The last frame as RGBA8 bytes laid out per `request`. Cells the
    /// frame does not cover, including all of them before the first
    /// frame, read as zero.
    fn get_pixels(&self, request: &PixelRequest) -> Vec<u8> {
        self.frame().read_pixels(request)
    }

    /// Like [`get_pixels`](Backend::get_pixels) but fills a caller buffer.
    /// Returns the number of bytes written.
    fn read_pixels_into(&self, request: &PixelRequest, out: &mut [u8]) -> RenderResult<usize> {
        self.frame().read_pixels_into(request, out)
    }

    /// Release frame buffers, accumulated state and the scene. Safe to
    /// call more than once.
    fn dispose(&mut self);
}
