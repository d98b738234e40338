//! Layer compositing and parameter-automation engine for a glitch-effect
//! photo/video editor.
//!
//! The pipeline: a [`Project`] holds the layer stack, playhead and
//! automation data; [`render::driver`] walks the visible tree each tick and
//! drives an external [`Compositor`]; [`render::export`] reuses the same
//! walk for PNG/JPEG stills and fixed-framerate video recording.

#![forbid(unsafe_code)]

pub mod automation;
pub mod filters;
pub mod foundation;
pub mod layer;
pub mod project;
pub mod render;

pub use automation::clip::{AutomationClip, ClipEdge, MIN_CLIP_LEN};
pub use automation::curve::AutomationPoint;
pub use foundation::error::{GlitchError, GlitchResult};
pub use layer::media::{MediaSource, VideoSource};
pub use layer::settings::{BlendMode, Filter, FilterSetting, FilterSettingKind, SettingValue};
pub use layer::{Layer, LayerId, LayerKind};
pub use project::store::ProjectStore;
pub use project::{Placement, Project, RecordingSettings};
pub use render::compositor::{Compositor, DrawParams, FramePixels, FrameScheduler};
pub use render::export::{CancelToken, FrameEncoder, StillFormat};
