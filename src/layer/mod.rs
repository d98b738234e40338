//! The layer stack's building blocks: a tagged union of source, filter and
//! group layers, each carrying a settings map keyed by parameter name.
//!
//! Render order is the reverse of list order: index 0 is the topmost layer
//! and is drawn last.

pub mod media;
pub mod settings;

use std::{collections::BTreeMap, fmt, sync::Arc};

use uuid::Uuid;

use crate::layer::{
    media::MediaSource,
    settings::{Filter, SettingValue, source_settings},
};

/// Stable identity of a layer for its whole lifetime. Doubles as the join
/// key into automation maps and as the compositor's texture handle.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct LayerId(pub Uuid);

impl LayerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for LayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// What a layer *is*; everything variant-specific lives here.
#[derive(Clone)]
pub enum LayerKind {
    /// An imported image or video. The media is referenced, never copied.
    Source { source: Arc<dyn MediaSource> },
    /// A shader pass compositing against the accumulated framebuffer.
    Filter { filter: Arc<Filter> },
    /// A local compositing scope: children render offscreen, then the
    /// group is drawn as a single unit with source-like placement settings.
    Group { collapsed: bool },
}

impl fmt::Debug for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Source { source } => f
                .debug_struct("Source")
                .field("loaded", &source.is_loaded())
                .finish(),
            Self::Filter { filter } => {
                f.debug_struct("Filter").field("id", &filter.id).finish()
            }
            Self::Group { collapsed } => f
                .debug_struct("Group")
                .field("collapsed", collapsed)
                .finish(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Layer {
    pub id: LayerId,
    pub name: Option<String>,
    /// User toggle, independent of time-based visibility.
    pub visible: bool,
    /// Group membership; must resolve to a root-level Group layer.
    pub parent_id: Option<LayerId>,
    /// Current static parameter values, keyed by setting key.
    pub settings: BTreeMap<String, SettingValue>,
    pub kind: LayerKind,
}

impl Layer {
    /// A source layer seeded with the shared placement defaults.
    pub fn source(source: Arc<dyn MediaSource>) -> Self {
        Self {
            id: LayerId::new(),
            name: None,
            visible: true,
            parent_id: None,
            settings: default_settings_of(source_settings().iter()),
            kind: LayerKind::Source { source },
        }
    }

    /// A filter layer seeded with the filter's declared defaults.
    pub fn filter(filter: Arc<Filter>) -> Self {
        Self {
            id: LayerId::new(),
            name: None,
            visible: true,
            parent_id: None,
            settings: default_settings_of(filter.settings.iter()),
            kind: LayerKind::Filter { filter },
        }
    }

    /// An empty group with source-like placement settings.
    pub fn group() -> Self {
        Self {
            id: LayerId::new(),
            name: None,
            visible: true,
            parent_id: None,
            settings: default_settings_of(source_settings().iter()),
            kind: LayerKind::Group { collapsed: false },
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self.kind, LayerKind::Group { .. })
    }

    pub fn as_source(&self) -> Option<&Arc<dyn MediaSource>> {
        match &self.kind {
            LayerKind::Source { source } => Some(source),
            _ => None,
        }
    }

    pub fn as_filter(&self) -> Option<&Arc<Filter>> {
        match &self.kind {
            LayerKind::Filter { filter } => Some(filter),
            _ => None,
        }
    }

    /// The static opacity setting, when one exists on this layer.
    pub fn static_opacity(&self) -> Option<f64> {
        self.settings.get("opacity").and_then(SettingValue::as_f64)
    }
}

fn default_settings_of<'a>(
    declared: impl Iterator<Item = &'a crate::layer::settings::FilterSetting>,
) -> BTreeMap<String, SettingValue> {
    declared
        .map(|s| (s.key.clone(), s.default.clone()))
        .collect()
}
