//! The per-frame compositor driver.
//!
//! Walks the visible layer tree back-to-front, resolves every parameter at
//! the project's current time, and issues texture/program calls against the
//! external [`Compositor`]. The same walk serves interactive preview and
//! offline export; only the clock differs. Wall-clock time is read here and
//! nowhere else.

use std::time::Instant;

use crate::{
    foundation::error::GlitchResult,
    layer::{LayerId, LayerKind},
    project::{Placement, Project},
    render::compositor::{Compositor, DrawParams, FrameScheduler},
};

/// Preview cap used by the interactive canvas.
pub const DEFAULT_PREVIEW_SIZE: u32 = 800;

/// Seek a video only when it drifts further than this from its target;
/// seeking every frame would stall decoding.
pub const VIDEO_SEEK_THRESHOLD_SECS: f64 = 1.0;

/// Output scale factor for a bounded preview; 1.0 when `max_size` is zero
/// (full-resolution export).
pub fn preview_scale(width: u32, height: u32, max_size: u32) -> f64 {
    if max_size == 0 || width == 0 || height == 0 {
        return 1.0;
    }
    let max = f64::from(max_size);
    (max / f64::from(width))
        .min(max / f64::from(height))
        .min(1.0)
}

/// Render one frame if a render was requested; returns whether one ran.
///
/// This is the host's per-refresh entry point: mutations raise the
/// project's [`RenderSignal`](crate::project::signal::RenderSignal) and the
/// next tick consumes it.
pub fn tick(
    project: &mut Project,
    compositor: &mut dyn Compositor,
    max_size: u32,
    scheduler: &dyn FrameScheduler,
) -> GlitchResult<bool> {
    if !project.signal.take(Instant::now()) {
        return Ok(false);
    }
    render_frame(project, compositor, max_size, scheduler)?;
    Ok(true)
}

/// Produce one composited frame and, when playing, advance the playhead by
/// the wall-clock delta and ask the host for another frame.
#[tracing::instrument(skip_all, fields(time = project.time, max_size))]
pub fn render_frame(
    project: &mut Project,
    compositor: &mut dyn Compositor,
    max_size: u32,
    scheduler: &dyn FrameScheduler,
) -> GlitchResult<()> {
    if project.width == 0 || project.height == 0 {
        return Ok(());
    }

    let scale = preview_scale(project.width, project.height, max_size);
    compositor.set_size(
        (f64::from(project.width) * scale).round() as u32,
        (f64::from(project.height) * scale).round() as u32,
    );

    let mut root: Vec<LayerId> = project.root_layers().map(|l| l.id).collect();
    root.reverse();
    render_layers(project, compositor, &root, scale)?;
    compositor.render();

    // Time advances only between completed frames, so every layer in a
    // frame observes one consistent playhead value.
    let now = Instant::now();
    if project.playing && project.animated {
        project.time += now.duration_since(project.last_frame).as_secs_f64();
        project.signal.request();
        scheduler.request_frame();
    }
    project.last_frame = now;

    Ok(())
}

/// Render a back-to-front slice of the layer stack into the current scope.
fn render_layers(
    project: &Project,
    compositor: &mut dyn Compositor,
    layers: &[LayerId],
    scale: f64,
) -> GlitchResult<()> {
    for &id in layers {
        let Some(layer) = project.layer(id) else {
            continue;
        };
        if !project.is_layer_visible(layer) {
            continue;
        }

        match &layer.kind {
            LayerKind::Filter { filter } => {
                if !compositor.has_program(&filter.id) {
                    compositor.register_program(
                        &filter.id,
                        &filter.fragment_shader,
                        &filter.vertex_shader,
                    )?;
                }
                for setting in &filter.settings {
                    let value = project.resolve_setting(layer, setting);
                    compositor.set_uniform(&filter.id, &setting.key, &value);
                }
                compositor.apply_program(&filter.id)?;
            }

            LayerKind::Source { source } => {
                if !compositor.has_texture(layer.id) {
                    if !source.is_loaded() {
                        tracing::trace!(layer = %layer.id, "source not decoded yet, skipping");
                        continue;
                    }
                    compositor.register_texture(layer.id, source.as_ref())?;
                }

                if let Some(video) = source.as_video() {
                    if let Some(target) = project.video_time(layer)
                        && (video.current_time() - target).abs() > VIDEO_SEEK_THRESHOLD_SECS
                    {
                        video.seek(target);
                    }
                    if !source.is_loaded() {
                        // Transient mid-seek state; try again next frame.
                        continue;
                    }
                    if let Err(err) = compositor.update_texture(layer.id, source.as_ref()) {
                        tracing::trace!(layer = %layer.id, %err, "ignoring texture update failure");
                    }
                }

                let (width, height) = source.dimensions();
                let params = draw_params(
                    project.placement(layer),
                    f64::from(width),
                    f64::from(height),
                    scale,
                );
                compositor.draw_texture(layer.id, &params)?;
            }

            LayerKind::Group { .. } => {
                let mut children: Vec<LayerId> =
                    project.children_of(layer.id).map(|l| l.id).collect();
                children.reverse();

                compositor.begin_group();
                render_layers(project, compositor, &children, scale)?;
                let params = draw_params(
                    project.placement(layer),
                    f64::from(project.width),
                    f64::from(project.height),
                    scale,
                );
                compositor.end_group(&params);
            }
        }
    }

    Ok(())
}

fn draw_params(placement: Placement, width: f64, height: f64, scale: f64) -> DrawParams {
    DrawParams {
        x: width * placement.offset.x * scale,
        y: height * placement.offset.y * scale,
        width: width * scale * placement.scale,
        height: height * scale * placement.scale,
        opacity: placement.opacity,
        angle: placement.angle,
        mode: placement.mode,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::settings::{Filter, FilterSetting, SettingValue};
    use crate::render::mock::{CountingScheduler, FakeImage, FakeVideo, Op, RecordingCompositor};
    use std::sync::Arc;

    fn project_with_image() -> (Project, LayerId) {
        let mut project = Project::new("p.png");
        let id = project
            .add_source_layer(Arc::new(FakeImage::loaded(100, 50)), None)
            .unwrap();
        (project, id)
    }

    #[test]
    fn preview_scale_caps_the_long_edge() {
        assert_eq!(preview_scale(1920, 1080, 0), 1.0);
        assert_eq!(preview_scale(400, 200, 800), 1.0);
        assert_eq!(preview_scale(1600, 800, 800), 0.5);
        assert_eq!(preview_scale(800, 1600, 800), 0.5);
    }

    #[test]
    fn layers_draw_back_to_front() {
        let (mut project, bottom) = project_with_image();
        let top = project
            .add_source_layer(Arc::new(FakeImage::loaded(10, 10)), None)
            .unwrap();

        let mut compositor = RecordingCompositor::new();
        render_frame(&mut project, &mut compositor, 0, &CountingScheduler::new()).unwrap();

        let draws: Vec<LayerId> = compositor
            .ops
            .iter()
            .filter_map(|op| match op {
                Op::Draw(id, _) => Some(*id),
                _ => None,
            })
            .collect();
        assert_eq!(draws, vec![bottom, top]);
        assert_eq!(compositor.ops.last(), Some(&Op::Render));
    }

    #[test]
    fn unloaded_sources_are_skipped_without_error() {
        let (mut project, _) = project_with_image();
        let pending = Arc::new(FakeImage::unloaded(10, 10));
        let id = project.add_source_layer(pending.clone(), None).unwrap();

        let mut compositor = RecordingCompositor::new();
        render_frame(&mut project, &mut compositor, 0, &CountingScheduler::new()).unwrap();
        assert!(!compositor.has_texture(id));

        // Once decoded, the texture registers lazily on the next frame.
        pending.finish_loading();
        render_frame(&mut project, &mut compositor, 0, &CountingScheduler::new()).unwrap();
        assert!(compositor.has_texture(id));
    }

    #[test]
    fn filter_programs_register_lazily_and_push_uniforms() {
        let (mut project, _) = project_with_image();
        let filter = Filter::new("warp", "Warp", "void main() {}")
            .with_settings(vec![FilterSetting::float("strength", "Strength", 0.4)]);
        project.add_filter(Arc::new(filter));

        let mut compositor = RecordingCompositor::new();
        let scheduler = CountingScheduler::new();
        render_frame(&mut project, &mut compositor, 0, &scheduler).unwrap();
        render_frame(&mut project, &mut compositor, 0, &scheduler).unwrap();

        let registers = compositor
            .ops
            .iter()
            .filter(|op| matches!(op, Op::RegisterProgram(id) if id == "warp"))
            .count();
        assert_eq!(registers, 1);
        assert!(compositor.ops.contains(&Op::Uniform(
            "warp".to_string(),
            "strength".to_string(),
            format!("{:?}", SettingValue::Float(0.4)),
        )));
        let applies = compositor
            .ops
            .iter()
            .filter(|op| matches!(op, Op::Apply(id) if id == "warp"))
            .count();
        assert_eq!(applies, 2);
    }

    #[test]
    fn groups_bracket_their_children_in_an_offscreen_scope() {
        let (mut project, source) = project_with_image();
        let group = project.add_group();
        project.set_parent(source, Some(group)).unwrap();

        let mut compositor = RecordingCompositor::new();
        render_frame(&mut project, &mut compositor, 0, &CountingScheduler::new()).unwrap();

        let begin = compositor.ops.iter().position(|op| op == &Op::Begin).unwrap();
        let draw = compositor
            .ops
            .iter()
            .position(|op| matches!(op, Op::Draw(id, _) if *id == source))
            .unwrap();
        let end = compositor
            .ops
            .iter()
            .position(|op| matches!(op, Op::End(_)))
            .unwrap();
        assert!(begin < draw && draw < end);
    }

    #[test]
    fn video_is_seeked_only_past_the_drift_threshold() {
        let mut project = Project::new("v.mp4");
        let video = Arc::new(FakeVideo::loaded(64, 64, 20.0));
        project.add_source_layer(video.clone(), None).unwrap();
        project.animated = true;

        let mut compositor = RecordingCompositor::new();
        let scheduler = CountingScheduler::new();

        // 0.4s of drift: tolerated.
        project.time = 5.0;
        video.set_current_time(4.6);
        render_frame(&mut project, &mut compositor, 0, &scheduler).unwrap();
        assert!(video.seeks().is_empty());

        // 1.5s of drift: corrected.
        video.set_current_time(3.5);
        render_frame(&mut project, &mut compositor, 0, &scheduler).unwrap();
        assert_eq!(video.seeks(), vec![5.0]);
    }

    #[test]
    fn failed_video_texture_updates_do_not_abort_the_frame() {
        let mut project = Project::new("v.mp4");
        let video = Arc::new(FakeVideo::loaded(64, 64, 20.0));
        let id = project.add_source_layer(video, None).unwrap();

        let mut compositor = RecordingCompositor::new();
        compositor.fail_updates = true;
        render_frame(&mut project, &mut compositor, 0, &CountingScheduler::new()).unwrap();

        let drew = compositor
            .ops
            .iter()
            .any(|op| matches!(op, Op::Draw(drawn, _) if *drawn == id));
        assert!(drew);
    }

    #[test]
    fn draw_params_scale_with_the_preview_factor() {
        let (mut project, id) = project_with_image();
        project
            .layer_mut(id)
            .unwrap()
            .settings
            .insert("scale".to_string(), SettingValue::Float(2.0));

        let mut compositor = RecordingCompositor::new();
        // 100x50 at max 50 => scale 0.5.
        render_frame(&mut project, &mut compositor, 50, &CountingScheduler::new()).unwrap();

        assert_eq!(compositor.ops[0], Op::SetSize(50, 25));
        let params = compositor
            .ops
            .iter()
            .find_map(|op| match op {
                Op::Draw(_, params) => Some(*params),
                _ => None,
            })
            .unwrap();
        assert_eq!(params.width, 100.0);
        assert_eq!(params.height, 50.0);
    }

    #[test]
    fn playback_advances_time_and_requests_the_next_frame() {
        let (mut project, _) = project_with_image();
        project.animated = true;
        project.start_playback();
        project.time = 1.0;

        let mut compositor = RecordingCompositor::new();
        let scheduler = CountingScheduler::new();
        std::thread::sleep(std::time::Duration::from_millis(5));
        render_frame(&mut project, &mut compositor, 0, &scheduler).unwrap();

        assert!(project.time > 1.0);
        assert_eq!(scheduler.requests(), 1);
        assert!(project.signal.is_pending());
    }

    #[test]
    fn tick_consumes_the_render_signal_once() {
        let (mut project, _) = project_with_image();
        let _ = project.signal.take(Instant::now());

        let mut compositor = RecordingCompositor::new();
        let scheduler = CountingScheduler::new();
        assert!(!tick(&mut project, &mut compositor, 0, &scheduler).unwrap());

        project.signal.request();
        assert!(tick(&mut project, &mut compositor, 0, &scheduler).unwrap());
        assert!(!tick(&mut project, &mut compositor, 0, &scheduler).unwrap());
    }

    #[test]
    fn paused_frames_do_not_advance_time() {
        let (mut project, _) = project_with_image();
        project.animated = true;
        project.time = 2.0;

        let mut compositor = RecordingCompositor::new();
        render_frame(&mut project, &mut compositor, 0, &CountingScheduler::new()).unwrap();
        assert_eq!(project.time, 2.0);
    }
}
