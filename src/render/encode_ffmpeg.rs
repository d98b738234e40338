//! MP4 encoding through a system `ffmpeg` child process.
//!
//! Frames stream to ffmpeg's stdin as rawvideo RGBA and come back as a
//! finished yuv420p mp4. The system binary is used rather than native
//! FFmpeg bindings to avoid dev header/lib requirements.

use std::{
    path::{Path, PathBuf},
    process::{Child, ChildStdin, Command, Stdio},
};

use crate::{
    foundation::error::{GlitchError, GlitchResult},
    render::{compositor::FramePixels, export::FrameEncoder},
};

#[derive(Clone, Debug)]
pub struct EncodeConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    /// Target video bitrate in bits per second; ffmpeg's default when unset.
    pub bitrate: Option<u64>,
    pub out_path: PathBuf,
    pub overwrite: bool,
}

impl EncodeConfig {
    pub fn validate(&self) -> GlitchResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(GlitchError::validation(
                "encode width/height must be non-zero",
            ));
        }
        if self.fps == 0 {
            return Err(GlitchError::validation("encode fps must be non-zero"));
        }
        if !self.width.is_multiple_of(2) || !self.height.is_multiple_of(2) {
            // yuv420p output needs even dimensions.
            return Err(GlitchError::validation(
                "encode width/height must be even (required for yuv420p mp4 output)",
            ));
        }
        Ok(())
    }

    pub fn with_bitrate(mut self, bitrate: u64) -> Self {
        self.bitrate = Some(bitrate);
        self
    }
}

pub fn default_mp4_config(
    out_path: impl Into<PathBuf>,
    width: u32,
    height: u32,
    fps: u32,
) -> EncodeConfig {
    EncodeConfig {
        width,
        height,
        fps,
        bitrate: None,
        out_path: out_path.into(),
        overwrite: true,
    }
}

pub fn is_ffmpeg_on_path() -> bool {
    probe_program(Path::new("ffmpeg"))
}

fn probe_program(program: &Path) -> bool {
    Command::new(program)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

fn ensure_parent_dir(path: &Path) -> GlitchResult<()> {
    if let Some(parent) = path.parent() {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

pub struct FfmpegEncoder {
    cfg: EncodeConfig,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    scratch: Vec<u8>,
}

impl FfmpegEncoder {
    pub fn new(cfg: EncodeConfig) -> GlitchResult<Self> {
        Self::with_program("ffmpeg", cfg)
    }

    /// Same as [`FfmpegEncoder::new`] with an explicit ffmpeg binary path.
    pub fn with_program(program: impl Into<PathBuf>, cfg: EncodeConfig) -> GlitchResult<Self> {
        let program = program.into();
        cfg.validate()?;
        ensure_parent_dir(&cfg.out_path)?;

        if !cfg.overwrite && cfg.out_path.exists() {
            return Err(GlitchError::validation(format!(
                "output file '{}' already exists",
                cfg.out_path.display()
            )));
        }

        if !probe_program(&program) {
            return Err(GlitchError::export(
                "ffmpeg is required for MP4 encoding, but was not found on PATH",
            ));
        }

        let mut cmd = Command::new(&program);
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        if cfg.overwrite {
            cmd.arg("-y");
        } else {
            cmd.arg("-n");
        }

        cmd.args([
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "-s",
            &format!("{}x{}", cfg.width, cfg.height),
            "-r",
            &cfg.fps.to_string(),
            "-i",
            "pipe:0",
            "-an",
            "-c:v",
            "libx264",
            "-pix_fmt",
            "yuv420p",
            "-movflags",
            "+faststart",
        ]);
        if let Some(bitrate) = cfg.bitrate {
            cmd.args(["-b:v", &bitrate.to_string()]);
        }
        cmd.arg(&cfg.out_path);

        let mut child = cmd.spawn().map_err(|e| {
            GlitchError::export(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| GlitchError::export("failed to open ffmpeg stdin (unexpected)"))?;

        Ok(Self {
            scratch: vec![0u8; (cfg.width * cfg.height * 4) as usize],
            cfg,
            child: Some(child),
            stdin: Some(stdin),
        })
    }
}

impl FrameEncoder for FfmpegEncoder {
    // Timestamps and keyframe flags are implied by the fixed input
    // framerate; ffmpeg picks its own GOP structure.
    fn encode(
        &mut self,
        frame: &FramePixels,
        _timestamp_us: u64,
        _key_frame: bool,
    ) -> GlitchResult<()> {
        if frame.width != self.cfg.width || frame.height != self.cfg.height {
            return Err(GlitchError::validation(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, self.cfg.width, self.cfg.height
            )));
        }
        if frame.data.len() != self.scratch.len() {
            return Err(GlitchError::validation(
                "frame data size mismatch with width*height*4",
            ));
        }

        flatten_to_opaque_rgba8(&mut self.scratch, &frame.data)?;

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(GlitchError::export("ffmpeg encoder is already finalized"));
        };

        use std::io::Write as _;
        stdin.write_all(&self.scratch).map_err(|e| {
            GlitchError::export(format!("failed to write frame to ffmpeg stdin: {e}"))
        })?;

        Ok(())
    }

    fn finalize(&mut self) -> GlitchResult<Vec<u8>> {
        drop(self.stdin.take());

        let child = self
            .child
            .take()
            .ok_or_else(|| GlitchError::export("ffmpeg encoder is already finalized"))?;

        let output = child.wait_with_output().map_err(|e| {
            GlitchError::export(format!("failed to wait for ffmpeg to finish: {e}"))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GlitchError::export(format!(
                "ffmpeg exited with status {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        use anyhow::Context as _;
        let bytes = std::fs::read(&self.cfg.out_path).with_context(|| {
            format!("failed to read encoded output '{}'", self.cfg.out_path.display())
        })?;
        Ok(bytes)
    }
}

/// An encoder dropped without `finalize` was cancelled: kill and reap the
/// child, and remove the partial output so no usable file is left behind.
impl Drop for FfmpegEncoder {
    fn drop(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };
        drop(self.stdin.take());
        let _ = child.kill();
        let _ = child.wait();
        let _ = std::fs::remove_file(&self.cfg.out_path);
    }
}

/// Composite straight-alpha RGBA over opaque black, as mp4 has no alpha.
fn flatten_to_opaque_rgba8(dst: &mut [u8], src: &[u8]) -> GlitchResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(GlitchError::validation(
            "flatten_to_opaque_rgba8 expects equal-length rgba8 buffers",
        ));
    }

    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let a = s[3] as u16;
        if a == 255 {
            d.copy_from_slice(s);
            continue;
        }
        d[0] = mul_div255(s[0] as u16, a) as u8;
        d[1] = mul_div255(s[1] as u16, a) as u8;
        d[2] = mul_div255(s[2] as u16, a) as u8;
        d[3] = 255;
    }

    Ok(())
}

fn mul_div255(x: u16, y: u16) -> u16 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u16
}
