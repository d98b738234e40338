//! Decoded-media collaborator traits.
//!
//! The engine never owns pixel data for sources; it holds shared handles to
//! externally decoded images and videos and polls their readiness each
//! frame. Hosts implement these traits over whatever their platform
//! provides (DOM elements, decoder wrappers, test fixtures).

/// A decoded image or video handle.
///
/// Loading is asynchronous on the host side; the driver polls
/// [`is_loaded`](MediaSource::is_loaded) every frame and skips layers whose
/// media is not ready yet rather than blocking.
pub trait MediaSource: Send + Sync {
    /// Has the media finished decoding enough to be drawn?
    fn is_loaded(&self) -> bool;

    /// Native pixel dimensions. Only meaningful once loaded.
    fn dimensions(&self) -> (u32, u32);

    /// Video playback surface, if this source is a video.
    fn as_video(&self) -> Option<&dyn VideoSource> {
        None
    }
}

/// Playback controls of a video-backed [`MediaSource`].
///
/// All methods take `&self`: handles are shared, implementations use
/// interior mutability the way a DOM video element does.
pub trait VideoSource {
    /// Current playback position in seconds.
    fn current_time(&self) -> f64;

    /// Total duration in seconds. Zero or non-finite means the media is
    /// corrupted and must be rejected at import time.
    fn duration(&self) -> f64;

    fn seek(&self, time: f64);

    fn play(&self);

    fn pause(&self);
}
