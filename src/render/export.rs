//! Still and video export.
//!
//! Both paths reuse the interactive render walk at full resolution and read
//! the frame back from the compositor. Video export steps a fixed-framerate
//! clock through the recording window, hands RGBA frames to a
//! [`FrameEncoder`], and emits one inclusive final frame at the exact window
//! end so the last timestamp lands on the window length.

use std::{
    io::Cursor,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use crate::{
    foundation::error::{GlitchError, GlitchResult},
    project::Project,
    render::{
        compositor::{Compositor, FramePixels, FrameScheduler},
        driver::render_frame,
    },
};

pub const USEC_PER_SEC: f64 = 1_000_000.0;

/// Every Nth encoded frame is a keyframe.
pub const KEYFRAME_INTERVAL: usize = 15;

/// Sink for encoded video frames. Timestamps are microseconds from the
/// start of the recording window.
pub trait FrameEncoder {
    fn encode(&mut self, frame: &FramePixels, timestamp_us: u64, key_frame: bool)
    -> GlitchResult<()>;

    /// Flush and return the finished container bytes.
    fn finalize(&mut self) -> GlitchResult<Vec<u8>>;
}

/// Cooperative cancellation flag, checked between frames.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StillFormat {
    Png,
    /// Quality in 1..=100.
    Jpeg { quality: u8 },
}

struct NoopScheduler;

impl FrameScheduler for NoopScheduler {
    fn request_frame(&self) {}
}

/// Render the current frame at `max_size` (zero for full resolution) and
/// encode it as a still image.
#[tracing::instrument(skip_all, fields(max_size, ?format))]
pub fn export_still(
    project: &mut Project,
    compositor: &mut dyn Compositor,
    max_size: u32,
    format: StillFormat,
) -> GlitchResult<Vec<u8>> {
    render_frame(project, compositor, max_size, &NoopScheduler)?;
    let pixels = compositor.read_pixels()?;
    encode_still(&pixels, format)
}

fn encode_still(pixels: &FramePixels, format: StillFormat) -> GlitchResult<Vec<u8>> {
    let image =
        image::RgbaImage::from_raw(pixels.width, pixels.height, pixels.data.clone())
            .ok_or_else(|| GlitchError::export("frame buffer does not match its dimensions"))?;

    let mut out = Cursor::new(Vec::new());
    match format {
        StillFormat::Png => image
            .write_to(&mut out, image::ImageFormat::Png)
            .map_err(|e| GlitchError::export(format!("png encode failed: {e}")))?,
        StillFormat::Jpeg { quality } => {
            // JPEG has no alpha channel.
            let rgb = image::DynamicImage::ImageRgba8(image).to_rgb8();
            let encoder =
                image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, quality);
            rgb.write_with_encoder(encoder)
                .map_err(|e| GlitchError::export(format!("jpeg encode failed: {e}")))?;
        }
    }
    Ok(out.into_inner())
}

/// Record the project's recording window through `encoder`.
///
/// Frames are rendered at full resolution on a fixed grid of
/// `1 / framerate` steps from the window start, plus one final frame at
/// exactly the window end. Returns `Ok(None)` when cancelled; nothing is
/// finalized in that case.
#[tracing::instrument(skip_all, fields(
    start = project.recording.start,
    duration = project.recording.duration,
    framerate = project.recording.framerate,
))]
pub fn record_video(
    project: &mut Project,
    compositor: &mut dyn Compositor,
    encoder: &mut dyn FrameEncoder,
    cancel: &CancelToken,
) -> GlitchResult<Option<Vec<u8>>> {
    let settings = project.recording;
    if settings.framerate == 0 {
        return Err(GlitchError::validation("recording framerate must be positive"));
    }
    if !(settings.duration > 0.0) {
        return Err(GlitchError::validation("recording duration must be positive"));
    }
    if settings.start < 0.0 {
        return Err(GlitchError::validation("recording start cannot be negative"));
    }
    let timeline_end = project.max_clip_end();
    if project.animated
        && timeline_end > 0.0
        && settings.start + settings.duration > timeline_end + 1e-9
    {
        return Err(GlitchError::validation(
            "recording window extends past the end of the timeline",
        ));
    }

    if project.playing {
        project.stop_playback();
    }

    let end = settings.start + settings.duration;
    let step = 1.0 / f64::from(settings.framerate);
    let mut frame_index = 0usize;

    loop {
        // The grid is recomputed from the index so rounding error cannot
        // accumulate across long recordings.
        let time = settings.start + frame_index as f64 * step;
        if time >= end {
            break;
        }
        if cancel.is_cancelled() {
            return Ok(None);
        }
        project.set_time(time);
        encode_frame(project, compositor, encoder, settings.start, frame_index)?;
        frame_index += 1;
    }

    if cancel.is_cancelled() {
        return Ok(None);
    }

    // Inclusive final frame at the exact window end.
    project.set_time(end);
    encode_frame(project, compositor, encoder, settings.start, frame_index)?;

    let bytes = encoder.finalize()?;
    tracing::info!(frames = frame_index + 1, bytes = bytes.len(), "recording finished");
    Ok(Some(bytes))
}

fn encode_frame(
    project: &mut Project,
    compositor: &mut dyn Compositor,
    encoder: &mut dyn FrameEncoder,
    window_start: f64,
    frame_index: usize,
) -> GlitchResult<()> {
    render_frame(project, compositor, 0, &NoopScheduler)?;
    let pixels = compositor.read_pixels()?;
    let timestamp = ((project.time - window_start) * USEC_PER_SEC).round() as u64;
    encoder.encode(&pixels, timestamp, frame_index % KEYFRAME_INTERVAL == 0)
}
