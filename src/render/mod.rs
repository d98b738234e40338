//! Frame production: the compositor boundary, the per-frame driver, and
//! the still/video export paths built on top of it.

pub mod compositor;
pub mod driver;
pub mod encode_ffmpeg;
pub mod export;

#[cfg(test)]
pub(crate) mod mock;
