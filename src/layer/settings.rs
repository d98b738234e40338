//! Parameter descriptors and values shared by filter, source and group
//! layers.
//!
//! The descriptor table mirrors what a filter declares (key, kind, default,
//! range); the value side is a small sum type so every layer can carry a
//! heterogeneous `settings` map without stringly-typed payloads.

use kurbo::Vec2;

/// One blend-mode code understood by the external compositor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum BlendMode {
    Normal,
    Dissolve,
    Darken,
    Multiply,
    ColorBurn,
    LinearBurn,
    Lighten,
    Screen,
    ColorDodge,
    LinearDodge,
    Overlay,
    SoftLight,
    HardLight,
    VividLight,
    LinearLight,
    PinLight,
    HardMix,
    Difference,
    Exclusion,
    Subtract,
    Divide,
    Hue,
    Saturation,
    Color,
    Luminosity,
    DarkerColor,
    LighterColor,
}

/// A single parameter value on a layer.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum SettingValue {
    Float(f64),
    Int(i64),
    Bool(bool),
    Offset(Vec2),
    Select(i64),
    Blend(BlendMode),
}

impl SettingValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_offset(&self) -> Option<Vec2> {
        match self {
            Self::Offset(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_blend(&self) -> Option<BlendMode> {
        match self {
            Self::Blend(mode) => Some(*mode),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SelectOption {
    pub key: String,
    pub label: String,
    pub value: i64,
}

/// What kind of control a setting is, with per-kind metadata.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum FilterSettingKind {
    Offset,
    Float,
    Integer,
    Boolean,
    Angle,
    Color,
    Select { options: Vec<SelectOption> },
    BlendSelect,
}

/// Declared parameter on a filter (or the shared source-placement set).
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FilterSetting {
    pub key: String,
    pub name: String,
    pub description: Option<String>,
    pub kind: FilterSettingKind,
    pub default: SettingValue,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub step: Option<f64>,
    /// UI accent, e.g. `#ff0000` for a red-channel offset.
    pub color: Option<String>,
}

impl FilterSetting {
    pub fn float(key: &str, name: &str, default: f64) -> Self {
        Self {
            key: key.to_string(),
            name: name.to_string(),
            description: None,
            kind: FilterSettingKind::Float,
            default: SettingValue::Float(default),
            min: None,
            max: None,
            step: None,
            color: None,
        }
    }

    pub fn offset(key: &str, name: &str, default: Vec2) -> Self {
        Self {
            key: key.to_string(),
            name: name.to_string(),
            description: None,
            kind: FilterSettingKind::Offset,
            default: SettingValue::Offset(default),
            min: None,
            max: None,
            step: None,
            color: None,
        }
    }

    pub fn angle(key: &str, name: &str) -> Self {
        Self {
            key: key.to_string(),
            name: name.to_string(),
            description: None,
            kind: FilterSettingKind::Angle,
            default: SettingValue::Float(0.0),
            min: None,
            max: None,
            step: None,
            color: None,
        }
    }

    pub fn with_range(mut self, min: f64, max: f64, step: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self.step = Some(step);
        self
    }

    pub fn with_color(mut self, color: &str) -> Self {
        self.color = Some(color.to_string());
        self
    }

    /// Can this setting be driven by an automation curve?
    pub fn is_automatable(&self) -> bool {
        matches!(
            self.kind,
            FilterSettingKind::Offset
                | FilterSettingKind::Float
                | FilterSettingKind::Integer
                | FilterSettingKind::Angle
        )
    }
}

/// Immutable filter definition: identity, shader sources and declared
/// settings. Shared between every layer instantiating the filter.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Filter {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub fragment_shader: String,
    pub vertex_shader: String,
    pub settings: Vec<FilterSetting>,
}

impl Filter {
    pub fn new(id: &str, name: &str, fragment_shader: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: None,
            fragment_shader: fragment_shader.to_string(),
            vertex_shader: String::new(),
            settings: Vec::new(),
        }
    }

    pub fn with_settings(mut self, settings: Vec<FilterSetting>) -> Self {
        self.settings = settings;
        self
    }
}

/// The placement/blend settings every Source and Group layer carries:
/// offset, opacity, scale, rotation and blend mode.
pub fn source_settings() -> &'static [FilterSetting] {
    static SETTINGS: std::sync::LazyLock<Vec<FilterSetting>> =
        std::sync::LazyLock::new(build_source_settings);
    &SETTINGS
}

fn build_source_settings() -> Vec<FilterSetting> {
    vec![
        FilterSetting::offset("offset", "Offset", Vec2::ZERO),
        FilterSetting::float("opacity", "Opacity", 1.0).with_range(0.0, 1.0, 0.01),
        FilterSetting::float("scale", "Scale", 1.0).with_range(0.0, 5.0, 0.01),
        FilterSetting::angle("angle", "Rotation"),
        FilterSetting {
            key: "mode".to_string(),
            name: "Blend mode".to_string(),
            description: None,
            kind: FilterSettingKind::BlendSelect,
            default: SettingValue::Blend(BlendMode::Normal),
            min: None,
            max: None,
            step: None,
            color: None,
        },
    ]
}
