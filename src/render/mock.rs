//! Shared test doubles: fake media sources, an op-logging compositor, a
//! counting encoder and a counting frame scheduler.

use std::{
    collections::HashSet,
    sync::{
        Mutex,
        atomic::{AtomicBool, Ordering},
    },
};

use crate::{
    foundation::error::{GlitchError, GlitchResult},
    layer::{
        LayerId,
        media::{MediaSource, VideoSource},
        settings::SettingValue,
    },
    render::{
        compositor::{Compositor, DrawParams, FramePixels, FrameScheduler},
        export::FrameEncoder,
    },
};

pub(crate) struct FakeImage {
    loaded: AtomicBool,
    width: u32,
    height: u32,
}

impl FakeImage {
    pub(crate) fn loaded(width: u32, height: u32) -> Self {
        Self {
            loaded: AtomicBool::new(true),
            width,
            height,
        }
    }

    pub(crate) fn unloaded(width: u32, height: u32) -> Self {
        Self {
            loaded: AtomicBool::new(false),
            width,
            height,
        }
    }

    pub(crate) fn finish_loading(&self) {
        self.loaded.store(true, Ordering::SeqCst);
    }
}

impl MediaSource for FakeImage {
    fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

pub(crate) struct FakeVideo {
    width: u32,
    height: u32,
    duration: f64,
    current: Mutex<f64>,
    playing: AtomicBool,
    seeks: Mutex<Vec<f64>>,
}

impl FakeVideo {
    pub(crate) fn loaded(width: u32, height: u32, duration: f64) -> Self {
        Self {
            width,
            height,
            duration,
            current: Mutex::new(0.0),
            playing: AtomicBool::new(false),
            seeks: Mutex::new(Vec::new()),
        }
    }

    /// A video whose metadata never decoded: zero duration.
    pub(crate) fn corrupted() -> Self {
        Self::loaded(640, 480, 0.0)
    }

    pub(crate) fn set_current_time(&self, time: f64) {
        *self.current.lock().unwrap() = time;
    }

    pub(crate) fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    /// Every seek target issued so far, oldest first.
    pub(crate) fn seeks(&self) -> Vec<f64> {
        self.seeks.lock().unwrap().clone()
    }
}

impl MediaSource for FakeVideo {
    fn is_loaded(&self) -> bool {
        true
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn as_video(&self) -> Option<&dyn VideoSource> {
        Some(self)
    }
}

impl VideoSource for FakeVideo {
    fn current_time(&self) -> f64 {
        *self.current.lock().unwrap()
    }

    fn duration(&self) -> f64 {
        self.duration
    }

    fn seek(&self, time: f64) {
        self.seeks.lock().unwrap().push(time);
        *self.current.lock().unwrap() = time;
    }

    fn play(&self) {
        self.playing.store(true, Ordering::SeqCst);
    }

    fn pause(&self) {
        self.playing.store(false, Ordering::SeqCst);
    }
}

/// One compositor call, as observed by [`RecordingCompositor`].
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Op {
    SetSize(u32, u32),
    RegisterTexture(LayerId),
    UpdateTexture(LayerId),
    DeregisterTexture(LayerId),
    Draw(LayerId, DrawParams),
    RegisterProgram(String),
    Uniform(String, String, String),
    Apply(String),
    Begin,
    End(DrawParams),
    Render,
}

/// A compositor that records every call and nothing else.
#[derive(Default)]
pub(crate) struct RecordingCompositor {
    pub(crate) ops: Vec<Op>,
    pub(crate) fail_updates: bool,
    textures: HashSet<LayerId>,
    programs: HashSet<String>,
    size: (u32, u32),
}

impl RecordingCompositor {
    pub(crate) fn new() -> Self {
        Self::default()
    }
}

impl Compositor for RecordingCompositor {
    fn set_size(&mut self, width: u32, height: u32) {
        self.size = (width, height);
        self.ops.push(Op::SetSize(width, height));
    }

    fn has_texture(&self, id: LayerId) -> bool {
        self.textures.contains(&id)
    }

    fn register_texture(&mut self, id: LayerId, _source: &dyn MediaSource) -> GlitchResult<()> {
        self.textures.insert(id);
        self.ops.push(Op::RegisterTexture(id));
        Ok(())
    }

    fn update_texture(&mut self, id: LayerId, _source: &dyn MediaSource) -> GlitchResult<()> {
        self.ops.push(Op::UpdateTexture(id));
        if self.fail_updates {
            return Err(GlitchError::render("texture upload failed"));
        }
        Ok(())
    }

    fn deregister_texture(&mut self, id: LayerId) {
        self.textures.remove(&id);
        self.ops.push(Op::DeregisterTexture(id));
    }

    fn has_program(&self, id: &str) -> bool {
        self.programs.contains(id)
    }

    fn register_program(
        &mut self,
        id: &str,
        _fragment_shader: &str,
        _vertex_shader: &str,
    ) -> GlitchResult<()> {
        self.programs.insert(id.to_string());
        self.ops.push(Op::RegisterProgram(id.to_string()));
        Ok(())
    }

    fn set_uniform(&mut self, id: &str, key: &str, value: &SettingValue) {
        self.ops
            .push(Op::Uniform(id.to_string(), key.to_string(), format!("{value:?}")));
    }

    fn apply_program(&mut self, id: &str) -> GlitchResult<()> {
        self.ops.push(Op::Apply(id.to_string()));
        Ok(())
    }

    fn draw_texture(&mut self, id: LayerId, params: &DrawParams) -> GlitchResult<()> {
        self.ops.push(Op::Draw(id, *params));
        Ok(())
    }

    fn begin_group(&mut self) {
        self.ops.push(Op::Begin);
    }

    fn end_group(&mut self, params: &DrawParams) {
        self.ops.push(Op::End(*params));
    }

    fn render(&mut self) {
        self.ops.push(Op::Render);
    }

    fn read_pixels(&mut self) -> GlitchResult<FramePixels> {
        let (width, height) = self.size;
        Ok(FramePixels {
            width,
            height,
            data: vec![0; width as usize * height as usize * 4],
        })
    }
}

/// Encoder that keeps frame metadata instead of bytes.
#[derive(Default)]
pub(crate) struct CountingEncoder {
    pub(crate) timestamps: Vec<u64>,
    pub(crate) keyframes: Vec<bool>,
    pub(crate) finalized: bool,
}

impl CountingEncoder {
    pub(crate) fn new() -> Self {
        Self::default()
    }
}

impl FrameEncoder for CountingEncoder {
    fn encode(
        &mut self,
        frame: &FramePixels,
        timestamp_us: u64,
        key_frame: bool,
    ) -> GlitchResult<()> {
        assert_eq!(frame.data.len(), frame.expected_len());
        self.timestamps.push(timestamp_us);
        self.keyframes.push(key_frame);
        Ok(())
    }

    fn finalize(&mut self) -> GlitchResult<Vec<u8>> {
        self.finalized = true;
        Ok(vec![0u8; 4])
    }
}

/// Frame scheduler that only counts requests.
#[derive(Default)]
pub(crate) struct CountingScheduler {
    requests: std::cell::Cell<usize>,
}

impl CountingScheduler {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn requests(&self) -> usize {
        self.requests.get()
    }
}

impl FrameScheduler for CountingScheduler {
    fn request_frame(&self) {
        self.requests.set(self.requests.get() + 1);
    }
}
