//! Parameter automation: exponential interpolation curves and the
//! per-layer timeline clips that gate them.

pub mod clip;
pub mod curve;
