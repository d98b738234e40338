//! Multi-project session state: the open project list, the current
//! selection, and shared export preferences.
//!
//! The store owns its projects; the compositor's texture cache is shared
//! across all of them, so closing a project releases its textures here.

use uuid::Uuid;

use crate::{
    foundation::error::{GlitchError, GlitchResult},
    layer::LayerKind,
    project::Project,
    render::compositor::Compositor,
};

pub struct ProjectStore {
    pub projects: Vec<Project>,
    pub current_id: Option<Uuid>,
    /// Dismissible session-level error, e.g. a failed file open.
    pub error: Option<String>,
    /// A video recording is in flight; the UI locks editing meanwhile.
    pub recording: bool,
    /// Still-export resolution multiplier relative to project size.
    pub export_scale: f64,
    /// JPEG quality for still export, 1..=100.
    pub export_quality: u8,
}

impl Default for ProjectStore {
    fn default() -> Self {
        Self {
            projects: Vec::new(),
            current_id: None,
            error: None,
            recording: false,
            export_scale: 1.0,
            export_quality: 90,
        }
    }
}

impl ProjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a project and make it current.
    pub fn open_project(&mut self, project: Project) -> Uuid {
        let id = project.id;
        self.projects.push(project);
        self.current_id = Some(id);
        self.error = None;
        id
    }

    pub fn select(&mut self, id: Uuid) -> GlitchResult<()> {
        if !self.projects.iter().any(|p| p.id == id) {
            return Err(GlitchError::validation("select: no such project"));
        }
        self.current_id = Some(id);
        Ok(())
    }

    /// Close a project and release its textures from the shared compositor
    /// cache. If the closed project was current, the first remaining one
    /// becomes current.
    pub fn close_project(&mut self, id: Uuid, compositor: &mut dyn Compositor) {
        let Some(index) = self.projects.iter().position(|p| p.id == id) else {
            return;
        };
        let project = self.projects.remove(index);

        for layer in &project.layers {
            if matches!(layer.kind, LayerKind::Source { .. }) && compositor.has_texture(layer.id) {
                compositor.deregister_texture(layer.id);
            }
        }

        if self.current_id == Some(id) {
            self.current_id = self.projects.first().map(|p| p.id);
        }
    }

    pub fn current(&self) -> Option<&Project> {
        let id = self.current_id?;
        self.projects.iter().find(|p| p.id == id)
    }

    pub fn current_mut(&mut self) -> Option<&mut Project> {
        let id = self.current_id?;
        self.projects.iter_mut().find(|p| p.id == id)
    }
}
