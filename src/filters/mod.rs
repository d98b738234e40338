//! The built-in filter gallery.
//!
//! Each filter is a fragment shader plus its declared settings. Uniform
//! names follow the setting keys; `iTexture` and `iResolution` are bound
//! by the compositor. Any pass-time value transforms are folded into the
//! shader body so the compositor can upload setting values verbatim.

use std::sync::{Arc, LazyLock};

use kurbo::Vec2;

use crate::layer::settings::{Filter, FilterSetting};

const FISHEYE_FRAGMENT: &str = r#"
uniform sampler2D iTexture;
uniform vec3 iResolution;

vec2 fisheye(vec2 coord, float str)
{
    vec2 neg1to1 = (coord - 0.5) * 2.0;

    vec2 offset;
    offset.x = pow(neg1to1.y, 2.0) * str * neg1to1.x;
    offset.y = pow(neg1to1.x, 2.0) * str * neg1to1.y;

    return coord + offset;
}

void main()
{
    vec2 p = gl_FragCoord.xy / iResolution.xy;
    p = fisheye(p, 0.1);
    gl_FragColor = texture2D(iTexture, p);
}
"#;

const RGB_OFFSET_FRAGMENT: &str = r#"
uniform sampler2D iTexture;
uniform vec3 iResolution;
uniform vec2 r_offset;
uniform vec2 g_offset;
uniform vec2 b_offset;

void main()
{
    vec2 uv = gl_FragCoord.xy / iResolution.xy;

    vec3 col;
    col.r = texture(iTexture, vec2(uv.x - r_offset.x, uv.y + r_offset.y)).r;
    col.g = texture(iTexture, vec2(uv.x - g_offset.x, uv.y + g_offset.y)).g;
    col.b = texture(iTexture, vec2(uv.x - b_offset.x, uv.y + b_offset.y)).b;

    gl_FragColor = vec4(col, 1.0);
}
"#;

const SCANLINES_FRAGMENT: &str = r#"
uniform sampler2D iTexture;
uniform vec3 iResolution;
uniform float intensity;
uniform float scale;

vec4 scanline(vec2 coord, vec4 screen)
{
    screen.rgb += sin(coord.y / (scale * 0.01) - 6.28) * intensity;
    return screen;
}

void main()
{
    vec2 p = gl_FragCoord.xy / iResolution.xy;
    gl_FragColor = texture2D(iTexture, p);
    gl_FragColor = scanline(p, gl_FragColor);
}
"#;

const VIGNETTE_FRAGMENT: &str = r#"
uniform sampler2D iTexture;
uniform vec3 iResolution;
uniform float intensity;

vec4 vignette(vec2 coord, vec4 screen)
{
    float str = intensity + 1.0;
    float dx = str * abs(coord.x - .5);
    float dy = str * abs(coord.y - .5);
    return screen * (1.0 - dx * dx - dy * dy);
}

void main()
{
    vec2 p = gl_FragCoord.xy / iResolution.xy;
    gl_FragColor = texture2D(iTexture, p);
    gl_FragColor = vignette(p, gl_FragColor);
}
"#;

/// A gallery section, as presented by the filter picker.
pub struct FilterCategory {
    pub id: &'static str,
    pub name: &'static str,
    pub filters: Vec<Arc<Filter>>,
}

fn fisheye() -> Arc<Filter> {
    Arc::new(Filter::new("fisheye", "Fisheye", FISHEYE_FRAGMENT))
}

fn rgb_offset() -> Arc<Filter> {
    Arc::new(
        Filter::new("rgb_offset", "RGB offset", RGB_OFFSET_FRAGMENT).with_settings(vec![
            FilterSetting::offset("r_offset", "Red offset", Vec2::ZERO).with_color("#ff0000"),
            FilterSetting::offset("g_offset", "Green offset", Vec2::new(-0.1, 0.0))
                .with_color("#00ff00"),
            FilterSetting::offset("b_offset", "Blue offset", Vec2::ZERO).with_color("#0000ff"),
        ]),
    )
}

fn scanlines() -> Arc<Filter> {
    Arc::new(
        Filter::new("scanlines", "Scanlines", SCANLINES_FRAGMENT).with_settings(vec![
            FilterSetting::float("intensity", "Intensity", 0.02).with_range(0.0, 1.0, 0.01),
            FilterSetting::float("scale", "Scale", 0.25).with_range(0.0, 1.0, 0.01),
        ]),
    )
}

fn vignette() -> Arc<Filter> {
    Arc::new(Filter::new("vignette", "Vignette", VIGNETTE_FRAGMENT).with_settings(vec![
        FilterSetting::float("intensity", "Intensity", 0.3).with_range(0.0, 1.0, 0.01),
    ]))
}

/// The built-in gallery, grouped for the picker.
pub fn builtin_categories() -> &'static [FilterCategory] {
    static CATEGORIES: LazyLock<Vec<FilterCategory>> = LazyLock::new(|| {
        vec![
            FilterCategory {
                id: "distort",
                name: "Distort",
                filters: vec![fisheye()],
            },
            FilterCategory {
                id: "color",
                name: "Color",
                filters: vec![rgb_offset()],
            },
            FilterCategory {
                id: "render",
                name: "Render",
                filters: vec![scanlines(), vignette()],
            },
        ]
    });
    &CATEGORIES
}

/// Look a built-in filter up by id.
pub fn builtin_filter(id: &str) -> Option<Arc<Filter>> {
    builtin_categories()
        .iter()
        .flat_map(|c| &c.filters)
        .find(|f| f.id == id)
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn gallery_ids_are_unique() {
        let mut seen = HashSet::new();
        for category in builtin_categories() {
            for filter in &category.filters {
                assert!(seen.insert(filter.id.clone()), "duplicate id {}", filter.id);
            }
        }
        assert_eq!(seen.len(), 4);
    }

    #[test]
    fn every_setting_declares_a_uniform() {
        for category in builtin_categories() {
            for filter in &category.filters {
                for setting in &filter.settings {
                    assert!(
                        filter.fragment_shader.contains(&setting.key),
                        "{} does not reference setting {}",
                        filter.id,
                        setting.key
                    );
                }
            }
        }
    }

    #[test]
    fn lookup_by_id() {
        let filter = builtin_filter("rgb_offset").unwrap();
        assert_eq!(filter.settings.len(), 3);
        assert!(filter.settings.iter().all(|s| s.is_automatable()));
        assert!(builtin_filter("nope").is_none());
    }
}
