//! Piecewise exponential-interpolation curves over time-keyed control points.
//!
//! A parameter's automation is a list of [`AutomationPoint`]s sorted by `x`
//! (time). Between two points the value follows `t^exponent`, where the
//! exponent is stored on the earlier point; outside the keyed range the
//! curve extrapolates flat.

use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AutomationPoint {
    pub id: Uuid,
    /// Time in seconds.
    pub x: f64,
    pub y: f64,
    /// Curve shape toward the next point, in `[0.1, 10]`. 1 is linear.
    pub exponent: f64,
}

impl AutomationPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            x,
            y,
            exponent: 1.0,
        }
    }
}

/// Evaluate the curve at time `x`. Empty lists evaluate to 0.
pub fn value_at(x: f64, points: &[AutomationPoint]) -> f64 {
    let Some(first) = points.first() else {
        return 0.0;
    };
    if x <= first.x {
        return first.y;
    }

    // Last point strictly before x; x > first.x guarantees it exists.
    let idx = points.partition_point(|p| p.x < x);
    let current = &points[idx - 1];

    let Some(next) = points.get(idx) else {
        return current.y;
    };

    value_between(
        x,
        current.x,
        current.y,
        next.x,
        next.y,
        current.exponent,
    )
}

/// Evaluate a single segment at `x`.
///
/// For `exponent < 1` the segment is computed with the start/end roles
/// swapped and the exponent inverted, so easing is symmetric around the
/// linear case regardless of which side of 1 the exponent falls on.
pub fn value_between(
    x: f64,
    start_x: f64,
    start_y: f64,
    end_x: f64,
    end_y: f64,
    exponent: f64,
) -> f64 {
    if start_x == x {
        return start_y;
    }
    if end_x == x {
        return end_y;
    }
    if end_y == start_y {
        // Equal endpoints short-circuit; no exponent blend needed.
        return start_y;
    }

    let (start_x, start_y, end_x, end_y, exponent) = if exponent < 1.0 {
        (end_x, end_y, start_x, start_y, 1.0 / exponent)
    } else {
        (start_x, start_y, end_x, end_y, exponent)
    };

    let fx = ((x - start_x) / (end_x - start_x)).abs();
    let fy = fx.powf(exponent);

    fy * (end_y - start_y) + start_y
}

/// Convert a pixel-drag delta into a new exponent on a symmetric scale:
/// exponents below 1 are mapped onto the negative half-axis via `-1/e`, the
/// delta is applied there, and the result is mapped back and clamped.
pub fn exponent_after_delta(exponent: f64, delta: f64) -> f64 {
    const MIN: f64 = 0.1;
    const MAX: f64 = 10.0;

    let mut e = if exponent < 1.0 {
        -1.0 / exponent + 1.0
    } else {
        exponent - 1.0
    };

    e += delta;

    e = if e < 0.0 { -1.0 / (e - 1.0) } else { e + 1.0 };

    e.clamp(MIN, MAX)
}

/// Insert a new point at `(x, y)` keeping the list sorted by `x`.
/// Returns the index it landed at.
pub fn insert_point(points: &mut Vec<AutomationPoint>, x: f64, y: f64) -> usize {
    let idx = points.partition_point(|p| p.x < x);
    points.insert(idx, AutomationPoint::new(x, y));
    idx
}

/// Move `points[index]` to `(new_x, new_y)`, clamping `new_x` between its
/// neighbours so the list stays sorted.
pub fn move_point(points: &mut [AutomationPoint], index: usize, new_x: f64, new_y: f64) {
    let mut x = new_x;
    if index > 0 {
        x = x.max(points[index - 1].x);
    }
    if let Some(next) = points.get(index + 1) {
        x = x.min(next.x);
    }

    points[index].x = x;
    points[index].y = new_y;
}
