//! Discharge potentials of the elementary analytic elements.
//!
//! All functions return the potential per unit strength in a homogeneous
//! confined aquifer; positive strengths extract water.

use std::f64::consts::PI;

/// Point sink of unit discharge, with the radius clamped to `rw`.
pub fn well(x: f64, y: f64, xw: f64, yw: f64, rw: f64) -> f64 {
    let r = ((x - xw).powi(2) + (y - yw).powi(2)).sqrt().max(rw);
    r.ln() / (2.0 * PI)
}

/// Circular area of unit infiltration rate and radius `radius`.
///
/// Continuous in value and gradient across the rim.
pub fn circular_area_sink(x: f64, y: f64, xc: f64, yc: f64, radius: f64) -> f64 {
    let r2 = (x - xc).powi(2) + (y - yc).powi(2);
    let big_r2 = radius * radius;
    if r2 <= big_r2 {
        -r2 / 4.0 + big_r2 / 4.0 - big_r2 / 2.0 * radius.ln()
    } else {
        -big_r2 / 4.0 * r2.ln()
    }
}

/// Antiderivative of `ln(u² + v²) / 2` with respect to `u`.
fn line_kernel(u: f64, v: f64) -> f64 {
    let log_term = if u == 0.0 { 0.0 } else { u * (u * u + v * v).ln() };
    let atan_term = if v == 0.0 { 0.0 } else { 2.0 * v * (u / v).atan() };
    0.5 * (log_term - 2.0 * u + atan_term)
}

/// Straight line sink from `(x1, y1)` to `(x2, y2)` with unit strength per length.
pub fn line_sink(x: f64, y: f64, x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    let dx = x2 - x1;
    let dy = y2 - y1;
    let length = (dx * dx + dy * dy).sqrt();
    if length == 0.0 {
        return 0.0;
    }
    let (cos, sin) = (dx / length, dy / length);
    let xl = (x - x1) * cos + (y - y1) * sin;
    let yl = -(x - x1) * sin + (y - y1) * cos;
    (line_kernel(length - xl, yl) - line_kernel(-xl, yl)) / (2.0 * PI)
}
