//! # Parameter Smoothing
//!
//! When a user moves a knob, the parameter value jumps instantly. In audio,
//! instant jumps create discontinuities that sound like clicks or "zipper
//! noise". A smoother turns each jump into a short ramp, producing one
//! interpolated value per sample.
//!
//! Two curves are supported:
//!
//! - **Linear**: the distance to the target is split into `N` equal steps,
//!   where `N` is the ramp duration in samples. Convergence time is exactly
//!   the ramp duration and the value never overshoots.
//! - **Exponential**: a one-pole lowpass on the value,
//!   `current += (target - current) * coeff`. It approaches the target
//!   asymptotically, which makes long glides (e.g. delay time) sound like
//!   a tape machine changing speed.
//!
//! ```text
//! linear        ___________        exponential    _____________
//!              /                                 /
//!             /                                 /
//!  __________/                       __________|
//! ```
//!
//! The smoother is owned by the audio thread. Targets coming from other
//! threads travel through atomic snapshots (see [`crate::shared`]) and are
//! handed to [`SmoothedParameter::set_target`] once per block.

/// The shape of a ramp towards a new target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Curve {
    /// Fixed per-sample increment, recomputed whenever the target changes.
    Linear,
    /// One-pole exponential approach with the ramp time as time constant.
    Exponential,
}

/// A value that ramps towards its target one sample at a time.
#[derive(Debug, Clone)]
pub struct SmoothedParameter {
    curve: Curve,
    current: f32,
    target: f32,

    /// Linear ramp: per-sample increment and how many increments remain.
    step: f32,
    steps_left: u32,

    /// Ramp duration in samples, set by `prepare()`.
    ramp_samples: u32,

    /// One-pole coefficient (exponential). `1.0` means "jump immediately".
    coefficient: f32,
}

impl SmoothedParameter {
    /// Create a smoother resting at `initial`.
    ///
    /// Until [`prepare()`](Self::prepare) is called the ramp length is zero,
    /// so every new target is applied immediately.
    pub fn new(curve: Curve, initial: f32) -> Self {
        Self {
            curve,
            current: initial,
            target: initial,
            step: 0.0,
            steps_left: 0,
            ramp_samples: 0,
            coefficient: 1.0,
        }
    }

    /// Shorthand for a linear smoother.
    pub fn linear(initial: f32) -> Self {
        Self::new(Curve::Linear, initial)
    }

    /// Shorthand for an exponential smoother.
    pub fn exponential(initial: f32) -> Self {
        Self::new(Curve::Exponential, initial)
    }

    /// Configure the ramp for a sample rate.
    ///
    /// Must be called before first use and whenever the sample rate
    /// changes. Any ramp in flight is finished immediately, since its step
    /// size belongs to the old sample rate.
    ///
    /// For [`Curve::Exponential`] `ramp_seconds` is the time constant: the
    /// value covers ~63% of the distance after `ramp_seconds`.
    pub fn prepare(&mut self, sample_rate: f32, ramp_seconds: f32) {
        let samples = (sample_rate * ramp_seconds).max(0.0);

        self.ramp_samples = if samples.is_finite() {
            samples.round() as u32
        } else {
            0
        };

        self.coefficient = if samples >= 1.0 && samples.is_finite() {
            1.0 - (-1.0 / samples).exp()
        } else {
            1.0
        };

        self.set_immediate(self.target);
    }

    /// Set a new value to ramp towards.
    ///
    /// Re-setting the current target is a no-op, so this can be called
    /// every block without restarting the ramp. Non-finite values are
    /// ignored.
    pub fn set_target(&mut self, target: f32) {
        if !target.is_finite() || target == self.target {
            return;
        }
        self.target = target;

        match self.curve {
            Curve::Linear if self.ramp_samples == 0 => self.current = target,
            Curve::Linear => {
                self.steps_left = self.ramp_samples;
                self.step = (target - self.current) / self.ramp_samples as f32;
            }
            Curve::Exponential => {}
        }
    }

    /// Jump straight to `value`, bypassing the ramp.
    ///
    /// Used on `reset()` (e.g. after loading a preset) where ramping from
    /// the previous state would be audible as a sweep.
    pub fn set_immediate(&mut self, value: f32) {
        if !value.is_finite() {
            return;
        }
        self.current = value;
        self.target = value;
        self.step = 0.0;
        self.steps_left = 0;
    }

    /// Advance one sample and return the new current value.
    ///
    /// Call exactly once per sample from the audio thread.
    #[inline]
    pub fn next(&mut self) -> f32 {
        match self.curve {
            Curve::Linear => {
                if self.steps_left > 0 {
                    self.steps_left -= 1;
                    // Land exactly on the target on the final step so that
                    // float rounding can't leave us a hair off (or past) it.
                    self.current = if self.steps_left == 0 {
                        self.target
                    } else {
                        self.current + self.step
                    };
                }
            }
            Curve::Exponential => {
                self.current += (self.target - self.current) * self.coefficient;
            }
        }
        self.current
    }

    /// The most recent value returned by [`next()`](Self::next).
    #[inline]
    pub fn value(&self) -> f32 {
        self.current
    }

    /// The value being ramped towards.
    #[inline]
    pub fn target(&self) -> f32 {
        self.target
    }
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// A 20ms ramp at 48 kHz takes exactly 960 samples.
    #[test]
    fn test_linear_ramp_duration() {
        let mut p = SmoothedParameter::linear(0.0);
        p.prepare(48000.0, 0.02);
        p.set_target(1.0);

        let mut value = 0.0;
        for _ in 0..959 {
            value = p.next();
        }
        assert!(value < 1.0, "Ramp finished one sample early");
        assert_eq!(p.next(), 1.0);
        assert_eq!(p.next(), 1.0);
    }

    /// Halfway through the ramp the value should be halfway there.
    #[test]
    fn test_linear_ramp_midpoint() {
        let mut p = SmoothedParameter::linear(0.0);
        p.prepare(1000.0, 0.1); // 100 steps
        p.set_target(10.0);

        let mut value = 0.0;
        for _ in 0..50 {
            value = p.next();
        }
        assert!((value - 5.0).abs() < 1e-4, "Expected 5.0, got {value}");
    }

    /// Setting the same target every block must not restart the ramp.
    #[test]
    fn test_repeated_target_does_not_restart() {
        let mut p = SmoothedParameter::linear(0.0);
        p.prepare(1000.0, 0.01); // 10 steps
        p.set_target(1.0);
        for _ in 0..5 {
            p.next();
            p.set_target(1.0);
        }
        for _ in 0..5 {
            p.next();
        }
        assert_eq!(p.value(), 1.0);
    }

    #[test]
    fn test_set_immediate_skips_ramp() {
        let mut p = SmoothedParameter::linear(0.0);
        p.prepare(48000.0, 0.02);
        p.set_target(1.0);
        p.next();
        p.set_immediate(0.25);

        assert_eq!(p.next(), 0.25);
        assert_eq!(p.target(), 0.25);
    }

    /// Without prepare() there is no ramp at all.
    #[test]
    fn test_unprepared_is_instant() {
        let mut p = SmoothedParameter::linear(0.0);
        p.set_target(3.0);
        assert_eq!(p.next(), 3.0);
    }

    /// The exponential curve covers ~63.2% of the distance in one time constant.
    #[test]
    fn test_exponential_time_constant() {
        let sample_rate = 44100.0;
        let mut p = SmoothedParameter::exponential(0.0);
        p.prepare(sample_rate, 0.01);
        p.set_target(1.0);

        let tau_samples = (0.01 * sample_rate) as usize;
        let mut value = 0.0;
        for _ in 0..tau_samples {
            value = p.next();
        }
        assert!((value - 0.632).abs() < 0.01, "Expected ~0.632, got {value}");
    }

    #[test]
    fn test_non_finite_target_ignored() {
        let mut p = SmoothedParameter::linear(0.5);
        p.set_target(f32::NAN);
        p.set_target(f32::INFINITY);
        assert_eq!(p.next(), 0.5);
    }

    /// Re-preparing (sample rate change) lands on the pending target.
    #[test]
    fn test_prepare_finishes_ramp() {
        let mut p = SmoothedParameter::linear(0.0);
        p.prepare(48000.0, 0.02);
        p.set_target(1.0);
        p.next();
        p.prepare(96000.0, 0.02);
        assert_eq!(p.value(), 1.0);
    }

    proptest! {
        /// For any sequence of targets, each step moves towards the latest
        /// target and never past it.
        #[test]
        fn linear_converges_monotonically(
            start in -100.0f32..100.0,
            targets in proptest::collection::vec((-100.0f32..100.0, 1usize..200), 1..8),
        ) {
            let mut p = SmoothedParameter::linear(start);
            p.prepare(48000.0, 0.002); // 96 steps

            for (target, samples) in targets {
                p.set_target(target);
                let mut prev = p.value();
                for _ in 0..samples {
                    let v = p.next();
                    let tol = 1e-2;
                    if prev <= target {
                        prop_assert!(v >= prev - tol && v <= target + tol,
                            "moved away from or past {target}: {prev} -> {v}");
                    } else {
                        prop_assert!(v <= prev + tol && v >= target - tol,
                            "moved away from or past {target}: {prev} -> {v}");
                    }
                    prev = v;
                }
            }
        }

        #[test]
        fn exponential_never_overshoots(start in -10.0f32..10.0, target in -10.0f32..10.0) {
            let mut p = SmoothedParameter::exponential(start);
            p.prepare(48000.0, 0.2);
            p.set_target(target);
            let lo = start.min(target) - 1e-4;
            let hi = start.max(target) + 1e-4;
            for _ in 0..10_000 {
                let v = p.next();
                prop_assert!(v >= lo && v <= hi, "{v} left [{lo}, {hi}]");
            }
        }
    }
}
