//! The external GPU compositor boundary.
//!
//! The engine drives a texture/program pipeline it does not own: textures
//! are keyed by layer id, programs by filter id, and group scopes nest via
//! `begin_group`/`end_group`. Shader compilation and blending live entirely
//! on the other side of this trait.

use crate::{
    foundation::error::GlitchResult,
    layer::{
        LayerId,
        media::MediaSource,
        settings::{BlendMode, SettingValue},
    },
};

/// Placement and blend parameters for one draw, already scaled to the
/// output surface.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DrawParams {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// 0..1.
    pub opacity: f64,
    /// Rotation in radians around the draw's center.
    pub angle: f64,
    pub mode: BlendMode,
}

/// A read-back frame: straight RGBA8, row-major, tightly packed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FramePixels {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl FramePixels {
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}

/// The GPU compositing collaborator.
///
/// Single shared texture/program cache, mutated only by the compositor
/// driver; interactive preview and export reuse it sequentially, never
/// concurrently.
pub trait Compositor {
    /// Resize the output surface.
    fn set_size(&mut self, width: u32, height: u32);

    fn has_texture(&self, id: LayerId) -> bool;

    /// Upload a loaded media source as the texture for `id`.
    fn register_texture(&mut self, id: LayerId, source: &dyn MediaSource) -> GlitchResult<()>;

    /// Re-upload the current frame of an already registered source.
    /// Failures are transient (mid-seek video) and callers ignore them.
    fn update_texture(&mut self, id: LayerId, source: &dyn MediaSource) -> GlitchResult<()>;

    fn deregister_texture(&mut self, id: LayerId);

    fn has_program(&self, id: &str) -> bool;

    fn register_program(
        &mut self,
        id: &str,
        fragment_shader: &str,
        vertex_shader: &str,
    ) -> GlitchResult<()>;

    /// Stage a uniform value on a registered program.
    fn set_uniform(&mut self, id: &str, key: &str, value: &SettingValue);

    /// Run the program as a filter pass over the accumulated framebuffer.
    fn apply_program(&mut self, id: &str) -> GlitchResult<()>;

    /// Draw a registered texture into the current scope.
    fn draw_texture(&mut self, id: LayerId, params: &DrawParams) -> GlitchResult<()>;

    /// Open an offscreen compositing scope.
    fn begin_group(&mut self);

    /// Close the innermost scope and composite it as a single unit.
    fn end_group(&mut self, params: &DrawParams);

    /// Flush the composited result to the visible surface.
    fn render(&mut self);

    /// Read back the current output surface.
    fn read_pixels(&mut self) -> GlitchResult<FramePixels>;
}

/// Host frame scheduler: "run one callback next display refresh".
pub trait FrameScheduler {
    fn request_frame(&self);
}
