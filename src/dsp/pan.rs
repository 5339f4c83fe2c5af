//! # Equal-Power Panning
//!
//! Panning with plain linear gains (`left = 1 - p`, `right = p`) makes a
//! centred signal sound quieter than a hard-panned one, because perceived
//! loudness follows power, not amplitude. The equal-power law keeps
//! `left² + right² = 1` across the whole field:
//!
//! ```text
//! θ     = (width + 1) · π/4        width ∈ [-1, 1]  →  θ ∈ [0, π/2]
//! left  = cos θ
//! right = sin θ
//! ```
//!
//! At `width = 0` both sides get `cos(π/4) ≈ 0.707`.

use std::f32::consts::FRAC_PI_4;

/// Equal-power pan coefficients, recomputed only when the width changes.
#[derive(Debug, Clone, Copy)]
pub struct EqualPowerPan {
    width: f32,
    left: f32,
    right: f32,
}

impl Default for EqualPowerPan {
    fn default() -> Self {
        let mut pan = Self {
            width: f32::NAN,
            left: 0.0,
            right: 0.0,
        };
        pan.set_width(0.0);
        pan
    }
}

impl EqualPowerPan {
    /// Set the stereo width in `[-1, 1]` (values outside are clamped).
    #[inline]
    pub fn set_width(&mut self, width: f32) {
        if width == self.width || width.is_nan() {
            return;
        }
        self.width = width;
        let theta = FRAC_PI_4 * (width.clamp(-1.0, 1.0) + 1.0);
        self.left = theta.cos();
        self.right = theta.sin();
    }

    #[inline]
    pub fn left(&self) -> f32 {
        self.left
    }

    #[inline]
    pub fn right(&self) -> f32 {
        self.right
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_1_SQRT_2;

    #[test]
    fn test_centre_is_equal() {
        let pan = EqualPowerPan::default();
        assert!((pan.left() - FRAC_1_SQRT_2).abs() < 1e-6);
        assert!((pan.right() - FRAC_1_SQRT_2).abs() < 1e-6);
    }

    #[test]
    fn test_extremes() {
        let mut pan = EqualPowerPan::default();
        pan.set_width(-1.0);
        assert!((pan.left() - 1.0).abs() < 1e-6 && pan.right().abs() < 1e-6);

        pan.set_width(1.0);
        assert!(pan.left().abs() < 1e-6 && (pan.right() - 1.0).abs() < 1e-6);

        pan.set_width(7.0);
        assert!(pan.left().abs() < 1e-6 && (pan.right() - 1.0).abs() < 1e-6);
    }

    /// Total power stays constant across the field.
    #[test]
    fn test_constant_power() {
        let mut pan = EqualPowerPan::default();
        for i in -10..=10 {
            pan.set_width(i as f32 / 10.0);
            let power = pan.left().powi(2) + pan.right().powi(2);
            assert!((power - 1.0).abs() < 1e-5, "Power {power} at {i}");
        }
    }
}
