//! Analog axis shaping: deadzone, sensitivity, half-axis combination.
//!
//! Magnitudes are normalized against the full axis range. Paired stick
//! axes use a radial magnitude so the deadzone forms a circle; lone analog
//! buttons use a linear magnitude. A deadzone of 0 bypasses shaping
//! entirely and passes raw hardware values through.

use axon_types::AXIS_RANGE;

const RANGE: f32 = AXIS_RANGE as f32;

/// Radial magnitude of a stick position, in units of the axis range.
///
/// Exceeds 1.0 in the corners of the square hardware range.
pub fn radial_magnitude(x: i16, y: i16) -> f32 {
    let xf = f32::from(x);
    let yf = f32::from(y);
    (xf * xf + yf * yf).sqrt() / RANGE
}

/// Linear magnitude of a single axis value.
pub fn linear_magnitude(value: i16) -> f32 {
    f32::from(value).abs() / RANGE
}

/// Apply deadzone and sensitivity shaping to one axis value.
///
/// `normal_mag` is the magnitude the deadzone is measured against, radial
/// for stick pairs and linear for analog buttons. Values at or below the
/// deadzone collapse to 0; the live band is rescaled so output ramps from
/// 0 at the deadzone edge to full scale at magnitude 1.
pub fn scale_axis(raw: i16, normal_mag: f32, deadzone: f32, sensitivity: f32) -> i16 {
    let mut value = f32::from(raw);

    if deadzone > 0.0 {
        if normal_mag <= deadzone {
            return 0;
        }
        value = value
            * (1.0 / normal_mag).max(1.0)
            * (((normal_mag - deadzone) / (1.0 - deadzone)).min(1.0));
    }

    if sensitivity != 1.0 {
        return (value * sensitivity).clamp(-RANGE, RANGE) as i16;
    }

    value as i16
}

/// Combine the two halves of a bind-driven axis into one signed value.
pub fn combine_halves(plus: i16, minus: i16) -> i16 {
    let value = i32::from(plus.unsigned_abs()) - i32::from(minus.unsigned_abs());
    value.clamp(-i32::from(AXIS_RANGE), i32::from(AXIS_RANGE)) as i16
}
