//! Time-range clips governing when a layer is active on the timeline.
//!
//! Each layer owns an ordered-by-start list of non-overlapping clips. Drag
//! edits go through [`reflow`], which enforces the invariants: clips never
//! overlap, never get shorter than one time unit, never start before zero,
//! and video-backed clips never escape their media window.

use uuid::Uuid;

/// Minimum clip length in time units.
pub const MIN_CLIP_LEN: f64 = 1.0;

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AutomationClip {
    pub id: Uuid,
    pub start: f64,
    pub end: f64,
    /// For video-backed clips: project time at which the media's t=0 sits.
    pub absolute_start: Option<f64>,
    /// For video-backed clips: the media's total duration.
    pub duration: Option<f64>,
}

impl AutomationClip {
    pub fn new(start: f64, end: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            start,
            end,
            absolute_start: None,
            duration: None,
        }
    }

    /// A clip spanning an entire piece of media, media-window attached.
    pub fn for_media(duration: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            start: 0.0,
            end: duration,
            absolute_start: Some(0.0),
            duration: Some(duration),
        }
    }

    pub fn has_absolute(&self) -> bool {
        self.absolute_start.is_some() && self.duration.is_some()
    }

    pub fn contains(&self, time: f64) -> bool {
        self.start <= time && time <= self.end
    }
}

/// Which part of the clip a drag grabs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClipEdge {
    Start,
    End,
    Whole,
}

/// Apply a drag of `delta` time units to `clips[index]`.
///
/// Neighbouring clips act as fences; a whole-clip move that hits a fence is
/// stopped there rather than compressed. Whole moves carry the media window
/// (`absolute_start`) along, edge drags only reveal more or less of it.
pub fn reflow(clips: &mut [AutomationClip], index: usize, delta: f64, edge: ClipEdge) {
    let clip = clips[index];
    let lo = if index > 0 { clips[index - 1].end } else { 0.0 }.max(0.0);
    let hi = clips
        .get(index + 1)
        .map_or(f64::INFINITY, |next| next.start);

    let mut next = clip;
    match edge {
        ClipEdge::Start => {
            let s = (clip.start + delta).max(lo).min(clip.end - MIN_CLIP_LEN);
            next.start = s;
        }
        ClipEdge::End => {
            let e = (clip.end + delta).min(hi).max(clip.start + MIN_CLIP_LEN);
            next.end = e;
        }
        ClipEdge::Whole => {
            let len = clip.end - clip.start;
            let s = (clip.start + delta).min((hi - len).max(lo)).max(lo);
            next.start = s;
            next.end = s + len;
            if let Some(abs) = next.absolute_start {
                next.absolute_start = Some(abs + (next.start - clip.start));
            }
        }
    }

    if let (Some(abs), Some(duration)) = (next.absolute_start, next.duration) {
        next.start = next.start.max(abs);
        next.end = next.end.min(abs + duration);
    }

    clips[index] = next;
}

/// Insert a new [`MIN_CLIP_LEN`]-long clip at `at`, keeping the list sorted
/// by start. Returns the index it landed at.
pub fn insert_clip(clips: &mut Vec<AutomationClip>, at: f64) -> usize {
    let idx = clips.partition_point(|c| c.end < at);
    clips.insert(idx, AutomationClip::new(at, at + MIN_CLIP_LEN));
    idx
}

/// Is any clip active at `time` (inclusive on both edges)?
pub fn any_active(clips: &[AutomationClip], time: f64) -> bool {
    clips.iter().any(|c| c.contains(time))
}
