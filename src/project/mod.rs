//! A project: the layer stack, the time cursor, playback state and all
//! automation data, plus the queries the compositor driver asks each frame.
//!
//! The project owns automation clips and points keyed by layer id; layers
//! hold no back-references. Render order is the reverse of `layers` order
//! (index 0 is topmost, drawn last).

pub mod signal;
pub mod store;

use std::{
    collections::BTreeMap,
    sync::Arc,
    time::{Duration, Instant},
};

use kurbo::Vec2;
use uuid::Uuid;

use crate::{
    automation::{
        clip::{AutomationClip, any_active},
        curve::{AutomationPoint, value_at},
    },
    foundation::error::{GlitchError, GlitchResult},
    layer::{
        Layer, LayerId, LayerKind,
        media::MediaSource,
        settings::{
            BlendMode, Filter, FilterSetting, FilterSettingKind, SettingValue, source_settings,
        },
    },
    project::signal::RenderSignal,
};

/// Layers with static opacity at or below this are skipped entirely.
pub const OPACITY_VISIBILITY_EPSILON: f64 = 0.01;

/// Delay before the follow-up render issued by [`Project::set_time`];
/// papers over asynchronous video-seek completion.
pub const SEEK_SETTLE_DELAY: Duration = Duration::from_millis(200);

/// User-configurable video export parameters.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RecordingSettings {
    /// Export window start, in project seconds.
    pub start: f64,
    /// Export window length, in seconds.
    pub duration: f64,
    pub framerate: u32,
    pub video_bitrate: u64,
}

impl Default for RecordingSettings {
    fn default() -> Self {
        Self {
            start: 0.0,
            duration: 10.0,
            framerate: 60,
            video_bitrate: 6_000_000,
        }
    }
}

/// Resolved placement/blend parameters of a source or group layer at the
/// current time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    pub offset: Vec2,
    pub opacity: f64,
    pub scale: f64,
    pub angle: f64,
    pub mode: BlendMode,
}

pub struct Project {
    pub id: Uuid,
    pub filename: String,
    /// Ordered stack; index 0 is topmost (drawn last).
    pub layers: Vec<Layer>,
    pub selected_layer: Option<LayerId>,
    /// Output dimensions in pixels; adopted from the first loaded source.
    pub width: u32,
    pub height: u32,
    /// When false, automation and clips are ignored entirely.
    pub animated: bool,
    /// Playhead position in seconds.
    pub time: f64,
    pub playing: bool,
    /// Per-layer clip lists, ordered by start.
    pub clips: BTreeMap<LayerId, Vec<AutomationClip>>,
    /// Per-layer, per-setting-key automation curves, ordered by x.
    pub points: BTreeMap<LayerId, BTreeMap<String, Vec<AutomationPoint>>>,
    /// Dismissible user-visible error from the last failed import.
    pub error: Option<String>,
    pub recording: RecordingSettings,
    pub signal: RenderSignal,
    /// Wall-clock instant of the previously completed frame; read and
    /// advanced only by the compositor driver.
    pub last_frame: Instant,
}

impl Project {
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            filename: filename.into(),
            layers: Vec::new(),
            selected_layer: None,
            width: 0,
            height: 0,
            animated: false,
            time: 0.0,
            playing: false,
            clips: BTreeMap::new(),
            points: BTreeMap::new(),
            error: None,
            recording: RecordingSettings::default(),
            signal: RenderSignal::new(),
            last_frame: Instant::now(),
        }
    }

    // ---- layer tree -----------------------------------------------------

    pub fn layer(&self, id: LayerId) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id == id)
    }

    pub fn layer_mut(&mut self, id: LayerId) -> Option<&mut Layer> {
        self.layers.iter_mut().find(|l| l.id == id)
    }

    /// Layers rendered in the root pass, in list order (topmost first).
    /// A layer with a dangling `parent_id` is orphaned: it appears in no
    /// pass at all.
    pub fn root_layers(&self) -> impl Iterator<Item = &Layer> {
        self.layers.iter().filter(|l| l.parent_id.is_none())
    }

    /// Children of a group, in list order (topmost first).
    pub fn children_of(&self, group: LayerId) -> impl Iterator<Item = &Layer> {
        self.layers.iter().filter(move |l| l.parent_id == Some(group))
    }

    /// Largest clip end across all layers; the current timeline length.
    pub fn max_clip_end(&self) -> f64 {
        self.clips
            .values()
            .flatten()
            .map(|c| c.end)
            .fold(0.0, f64::max)
    }

    /// Insert a layer at the top of the stack, select it, and give it a
    /// default clip spanning the current timeline.
    pub fn add_layer(&mut self, layer: Layer) -> LayerId {
        let id = layer.id;
        let end = self.max_clip_end();
        self.layers.insert(0, layer);
        self.selected_layer = Some(id);
        self.clips.insert(id, vec![AutomationClip::new(0.0, end)]);
        self.signal.request();
        id
    }

    /// Import a decoded media handle as a new source layer.
    ///
    /// Rejects corrupted videos (zero/unknown duration) without touching
    /// the layer stack; the error also lands in [`Project::error`] for the
    /// UI. The first loaded source decides the project dimensions. Video
    /// layers get a full-media clip carrying the media window.
    pub fn add_source_layer(
        &mut self,
        source: Arc<dyn MediaSource>,
        name: Option<&str>,
    ) -> GlitchResult<LayerId> {
        let video_duration = match source.as_video() {
            Some(video) => {
                let duration = video.duration();
                if !duration.is_finite() || duration <= 0.0 {
                    self.error = Some("Corrupted video file.".to_string());
                    return Err(GlitchError::resource(
                        "corrupted video: zero or unknown duration",
                    ));
                }
                Some(duration)
            }
            None => None,
        };

        if (self.width == 0 || self.height == 0) && source.is_loaded() {
            let (width, height) = source.dimensions();
            self.width = width;
            self.height = height;
        }

        let mut layer = Layer::source(source);
        layer.name = name.map(str::to_string);
        let id = self.add_layer(layer);

        if let Some(duration) = video_duration {
            self.clips.insert(id, vec![AutomationClip::for_media(duration)]);
        }

        Ok(id)
    }

    pub fn add_filter(&mut self, filter: Arc<Filter>) -> LayerId {
        self.add_layer(Layer::filter(filter))
    }

    pub fn add_group(&mut self) -> LayerId {
        self.add_layer(Layer::group())
    }

    /// Remove the selected layer and discard its automation data.
    /// Selection falls back to the last layer in the list.
    pub fn remove_selected(&mut self) {
        let Some(selected) = self.selected_layer else {
            return;
        };
        self.layers.retain(|l| l.id != selected);
        self.clips.remove(&selected);
        self.points.remove(&selected);
        self.selected_layer = self.layers.last().map(|l| l.id);
        self.signal.request();
    }

    /// Stable move of a layer within the stack. Parent/child relations are
    /// untouched; callers pairing a reorder with a re-parent do both.
    pub fn reorder(&mut self, from: usize, to: usize) -> GlitchResult<()> {
        if from >= self.layers.len() || to >= self.layers.len() {
            return Err(GlitchError::validation("reorder index out of bounds"));
        }
        let layer = self.layers.remove(from);
        self.layers.insert(to, layer);
        self.signal.request();
        Ok(())
    }

    /// Assign or clear a layer's group, enforcing one-level nesting: the
    /// parent must be a root-level group, and a group that already has
    /// children cannot itself be nested.
    pub fn set_parent(&mut self, layer: LayerId, parent: Option<LayerId>) -> GlitchResult<()> {
        if self.layer(layer).is_none() {
            return Err(GlitchError::validation("set_parent: no such layer"));
        }

        if let Some(parent_id) = parent {
            if parent_id == layer {
                return Err(GlitchError::validation("a layer cannot be its own parent"));
            }
            let Some(parent_layer) = self.layer(parent_id) else {
                return Err(GlitchError::validation("set_parent: no such group"));
            };
            if !parent_layer.is_group() {
                return Err(GlitchError::validation("parent must be a group layer"));
            }
            if parent_layer.parent_id.is_some() {
                return Err(GlitchError::validation(
                    "groups can only be nested one level deep",
                ));
            }
            let subject_is_parent = self.layers.iter().any(|l| l.parent_id == Some(layer));
            if subject_is_parent {
                return Err(GlitchError::validation(
                    "a group with children cannot be nested",
                ));
            }
        }

        if let Some(l) = self.layer_mut(layer) {
            l.parent_id = parent;
        }
        self.signal.request();
        Ok(())
    }

    // ---- automation access ----------------------------------------------

    pub fn clips_mut(&mut self, layer: LayerId) -> &mut Vec<AutomationClip> {
        self.clips.entry(layer).or_default()
    }

    pub fn points_mut(&mut self, layer: LayerId, key: &str) -> &mut Vec<AutomationPoint> {
        self.points
            .entry(layer)
            .or_default()
            .entry(key.to_string())
            .or_default()
    }

    fn points_for(&self, layer: LayerId, key: &str) -> Option<&[AutomationPoint]> {
        let points = self.points.get(&layer)?.get(key)?;
        (!points.is_empty()).then_some(points.as_slice())
    }

    // ---- time-resolved queries ------------------------------------------

    /// Resolve a setting's value at the current time: static value (or the
    /// declared default), overridden by automation when present. Offset
    /// parameters automate their X and Y channels independently through
    /// `<key>_x` / `<key>_y` point lists.
    pub fn resolve_setting(&self, layer: &Layer, setting: &FilterSetting) -> SettingValue {
        let value = layer
            .settings
            .get(&setting.key)
            .cloned()
            .unwrap_or_else(|| setting.default.clone());

        if !self.animated {
            return value;
        }

        if matches!(setting.kind, FilterSettingKind::Offset) {
            let mut offset = value.as_offset().unwrap_or(Vec2::ZERO);
            if let Some(points) = self.points_for(layer.id, &format!("{}_x", setting.key)) {
                offset.x = value_at(self.time, points);
            }
            if let Some(points) = self.points_for(layer.id, &format!("{}_y", setting.key)) {
                offset.y = value_at(self.time, points);
            }
            return SettingValue::Offset(offset);
        }

        if setting.is_automatable()
            && let Some(points) = self.points_for(layer.id, &setting.key)
        {
            let sampled = value_at(self.time, points);
            return match setting.kind {
                FilterSettingKind::Integer => SettingValue::Int(sampled.round() as i64),
                _ => SettingValue::Float(sampled),
            };
        }

        value
    }

    /// The resolved placement bundle shared by source and group draws.
    pub fn placement(&self, layer: &Layer) -> Placement {
        let mut placement = Placement {
            offset: Vec2::ZERO,
            opacity: 1.0,
            scale: 1.0,
            angle: 0.0,
            mode: BlendMode::Normal,
        };

        for setting in source_settings() {
            let value = self.resolve_setting(layer, setting);
            match setting.key.as_str() {
                "offset" => placement.offset = value.as_offset().unwrap_or(Vec2::ZERO),
                "opacity" => placement.opacity = value.as_f64().unwrap_or(1.0),
                "scale" => placement.scale = value.as_f64().unwrap_or(1.0),
                "angle" => placement.angle = value.as_f64().unwrap_or(0.0),
                "mode" => placement.mode = value.as_blend().unwrap_or(BlendMode::Normal),
                _ => {}
            }
        }

        placement
    }

    /// Combined visibility: the static flag, group emptiness, the static
    /// near-zero-opacity short-circuit, and time-gating.
    ///
    /// A layer with no clip entries is *not* time-gated and falls back to
    /// its static flag, even in animated mode.
    pub fn is_layer_visible(&self, layer: &Layer) -> bool {
        if layer.is_group() && self.children_of(layer.id).next().is_none() {
            return false;
        }

        if let Some(opacity) = layer.static_opacity()
            && opacity <= OPACITY_VISIBILITY_EPSILON
        {
            return false;
        }

        let clips = self.clips.get(&layer.id).filter(|c| !c.is_empty());
        let (true, Some(clips)) = (self.animated, clips) else {
            return layer.visible;
        };

        layer.visible && any_active(clips, self.time)
    }

    /// Map the playhead into a video source's native time.
    ///
    /// `None` means "do not drive this video at all": the layer is not a
    /// video, automation is off, the layer is hidden, or no clip is active
    /// at the current time. Callers must not seek or play on `None`.
    pub fn video_time(&self, layer: &Layer) -> Option<f64> {
        let source = layer.as_source()?;
        source.as_video()?;

        if !self.animated || !layer.visible {
            return None;
        }
        let clips = self.clips.get(&layer.id)?;

        for clip in clips {
            if clip.contains(self.time) {
                return Some(match clip.absolute_start {
                    Some(absolute_start) => self.time - absolute_start,
                    None => self.time,
                });
            }
        }

        None
    }

    // ---- playback -------------------------------------------------------

    /// Move the playhead, seek every driven video to match, and request an
    /// immediate render plus a deferred one for when seeks settle.
    pub fn set_time(&mut self, time: f64) {
        self.time = time;

        for layer in &self.layers {
            let Some(target) = self.video_time(layer) else {
                continue;
            };
            if let Some(video) = layer.as_source().and_then(|s| s.as_video()) {
                video.seek(target);
            }
        }

        self.signal.request();
        self.signal.request_after(SEEK_SETTLE_DELAY);
    }

    pub fn toggle_playback(&mut self) {
        if self.playing {
            self.stop_playback();
        } else {
            self.start_playback();
        }
    }

    pub fn start_playback(&mut self) {
        self.playing = true;
        self.last_frame = Instant::now();
        self.signal.request();
        self.for_each_video(|video| video.play());
    }

    pub fn stop_playback(&mut self) {
        self.playing = false;
        self.for_each_video(|video| video.pause());
    }

    fn for_each_video(&self, f: impl Fn(&dyn crate::layer::media::VideoSource)) {
        for layer in &self.layers {
            if let LayerKind::Source { source } = &layer.kind
                && let Some(video) = source.as_video()
            {
                f(video);
            }
        }
    }
}
