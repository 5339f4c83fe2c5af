//! # Feedback Filters
//!
//! Every repeat of the delay passes through the feedback path once more,
//! so whatever filtering happens there accumulates: with a low cut the
//! echoes get thinner each time round, with a high cut they get darker,
//! like a tape echo losing top end on every pass.
//!
//! The feedback path runs a highpass (low cut) followed by a lowpass
//! (high cut). Only the *feedback* is filtered; the first echo and the dry
//! signal are untouched.
//!
//! ## Topology-Preserving Transform SVF
//!
//! Each stage is a 2-pole (12 dB/oct) state-variable filter discretised
//! with the trapezoidal integrator ("TPT", Zavalishin, *The Art of VA Filter
//! Design*, ch. 3). Unlike direct-form biquads, its cutoff can be swept
//! every sample without blowing up, which matters here because the
//! cutoffs are smoothed parameters.
//!
//! ```text
//! g  = tan(π · fc / fs)
//! R2 = 1 / Q                      (Q = 1/√2, Butterworth)
//! h  = 1 / (1 + R2·g + g²)
//!
//! hp = h · (x − s1·(g + R2) − s2)
//! bp = g·hp + s1      s1 ← g·hp + bp
//! lp = g·bp + s2      s2 ← g·bp + lp
//! ```

use std::f32::consts::PI;

/// Lowest cutoff we accept, in Hz.
pub const MIN_CUTOFF_HZ: f32 = 20.0;

/// Highest cutoff we accept, in Hz (further limited to 49% of the sample rate).
pub const MAX_CUTOFF_HZ: f32 = 20000.0;

/// Number of independent channel states each filter keeps.
pub const MAX_CHANNELS: usize = 2;

/// Butterworth damping: `1 / Q` with `Q = 1/√2`.
const R2: f32 = std::f32::consts::SQRT_2;

/// Which response a [`StateVariableFilter`] produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterType {
    Highpass,
    Lowpass,
}

/// The recursive state of one SVF channel: its two integrators.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct SvfState {
    s1: f32,
    s2: f32,
}

impl SvfState {
    /// Keep the state finite and free of denormals.
    ///
    /// Denormals make some CPUs crawl; NaN or Inf would poison every
    /// following sample of the feedback loop forever.
    #[inline]
    fn sanitize(&mut self) {
        if !self.s1.is_finite() || !self.s2.is_finite() {
            *self = Self::default();
            return;
        }
        self.s1 = flush_denormal(self.s1);
        self.s2 = flush_denormal(self.s2);
    }
}

#[inline]
fn flush_denormal(x: f32) -> f32 {
    if x.abs() < 1e-20 {
        0.0
    } else {
        x
    }
}

/// A 2-pole TPT state-variable filter with one state per channel.
#[derive(Debug, Clone)]
pub struct StateVariableFilter {
    filter_type: FilterType,
    sample_rate: f32,

    /// Last cutoff passed to `set_cutoff_frequency`. NaN until first set,
    /// so the first call always computes coefficients.
    cutoff: f32,

    g: f32,
    h: f32,

    states: [SvfState; MAX_CHANNELS],
}

impl StateVariableFilter {
    pub fn new(filter_type: FilterType, sample_rate: f32) -> Self {
        let mut filter = Self {
            filter_type,
            sample_rate,
            cutoff: f32::NAN,
            g: 0.0,
            h: 1.0,
            states: [SvfState::default(); MAX_CHANNELS],
        };
        let initial = match filter_type {
            FilterType::Highpass => MIN_CUTOFF_HZ,
            FilterType::Lowpass => MAX_CUTOFF_HZ,
        };
        filter.set_cutoff_frequency(initial);
        filter
    }

    /// Change the sample rate, recomputing coefficients and clearing state.
    pub fn prepare(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        let cutoff = if self.cutoff.is_nan() {
            MIN_CUTOFF_HZ
        } else {
            self.cutoff
        };
        self.cutoff = f32::NAN;
        self.set_cutoff_frequency(cutoff);
        self.reset();
    }

    /// Set the cutoff in Hz.
    ///
    /// Cheap to call every sample: the `tan()` is only evaluated when the
    /// value differs from the previous call. Returns whether the
    /// coefficients were recomputed.
    #[inline]
    pub fn set_cutoff_frequency(&mut self, hz: f32) -> bool {
        if hz == self.cutoff || hz.is_nan() {
            return false;
        }
        self.cutoff = hz;

        let upper = (self.sample_rate * 0.49).clamp(MIN_CUTOFF_HZ, MAX_CUTOFF_HZ);
        let safe = hz.clamp(MIN_CUTOFF_HZ, upper);

        self.g = (PI * safe / self.sample_rate).tan();
        self.h = 1.0 / (1.0 + R2 * self.g + self.g * self.g);
        true
    }

    /// The most recently requested cutoff (before clamping).
    pub fn cutoff_frequency(&self) -> f32 {
        self.cutoff
    }

    /// Filter one sample on `channel`. Channels beyond [`MAX_CHANNELS`]
    /// pass through unchanged.
    #[inline]
    pub fn process_sample(&mut self, channel: usize, x: f32) -> f32 {
        let (g, h) = (self.g, self.h);
        let Some(state) = self.states.get_mut(channel) else {
            return x;
        };

        let hp = h * (x - state.s1 * (g + R2) - state.s2);
        let bp = g * hp + state.s1;
        state.s1 = g * hp + bp;
        let lp = g * bp + state.s2;
        state.s2 = g * bp + lp;
        state.sanitize();

        match self.filter_type {
            FilterType::Highpass => hp,
            FilterType::Lowpass => lp,
        }
    }

    /// Zero the state of every channel.
    pub fn reset(&mut self) {
        self.states = [SvfState::default(); MAX_CHANNELS];
    }
}

/// The feedback-path filter stage: highpass (low cut) into lowpass
/// (high cut), per channel.
#[derive(Debug, Clone)]
pub struct FeedbackFilter {
    low_cut: StateVariableFilter,
    high_cut: StateVariableFilter,
}

impl FeedbackFilter {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            low_cut: StateVariableFilter::new(FilterType::Highpass, sample_rate),
            high_cut: StateVariableFilter::new(FilterType::Lowpass, sample_rate),
        }
    }

    pub fn prepare(&mut self, sample_rate: f32) {
        self.low_cut.prepare(sample_rate);
        self.high_cut.prepare(sample_rate);
    }

    /// Update both cutoffs; coefficients are only recomputed for the
    /// stages whose cutoff actually changed.
    #[inline]
    pub fn set_cutoffs(&mut self, low_cut_hz: f32, high_cut_hz: f32) {
        self.low_cut.set_cutoff_frequency(low_cut_hz);
        self.high_cut.set_cutoff_frequency(high_cut_hz);
    }

    #[inline]
    pub fn process_sample(&mut self, channel: usize, x: f32) -> f32 {
        let y = self.low_cut.process_sample(channel, x);
        self.high_cut.process_sample(channel, y)
    }

    pub fn reset(&mut self) {
        self.low_cut.reset();
        self.high_cut.reset();
    }
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f32 = 48000.0;

    fn sine_peak(filter: &mut StateVariableFilter, freq: f32) -> f32 {
        let mut peak = 0.0_f32;
        for n in 0..(SR as usize) {
            let x = (2.0 * PI * freq * n as f32 / SR).sin();
            let y = filter.process_sample(0, x);
            // Skip the start-up transient.
            if n > SR as usize / 2 {
                peak = peak.max(y.abs());
            }
        }
        peak
    }

    /// A DC signal passes a lowpass unchanged.
    #[test]
    fn test_lowpass_passes_dc() {
        let mut lp = StateVariableFilter::new(FilterType::Lowpass, SR);
        lp.set_cutoff_frequency(200.0);

        let mut output = 0.0;
        for _ in 0..20000 {
            output = lp.process_sample(0, 1.0);
        }
        assert!((output - 1.0).abs() < 1e-4, "DC should pass, got {output}");
    }

    /// ...and is removed by a highpass.
    #[test]
    fn test_highpass_blocks_dc() {
        let mut hp = StateVariableFilter::new(FilterType::Highpass, SR);
        hp.set_cutoff_frequency(200.0);

        let mut output = 1.0;
        for _ in 0..20000 {
            output = hp.process_sample(0, 1.0);
        }
        assert!(output.abs() < 1e-4, "DC should be blocked, got {output}");
    }

    /// At the cutoff a Butterworth response is 3 dB down.
    #[test]
    fn test_lowpass_minus_3db_at_cutoff() {
        let mut lp = StateVariableFilter::new(FilterType::Lowpass, SR);
        lp.set_cutoff_frequency(1000.0);

        let peak = sine_peak(&mut lp, 1000.0);
        assert!(
            (peak - std::f32::consts::FRAC_1_SQRT_2).abs() < 0.02,
            "Expected ~0.707 at cutoff, got {peak}"
        );
    }

    #[test]
    fn test_lowpass_attenuates_high_freq() {
        let mut lp = StateVariableFilter::new(FilterType::Lowpass, SR);
        lp.set_cutoff_frequency(500.0);

        let peak = sine_peak(&mut lp, 10000.0);
        assert!(peak < 0.01, "Expected heavy attenuation, got {peak}");
    }

    /// Coefficients are only recomputed when the cutoff changes.
    #[test]
    fn test_cutoff_change_detection() {
        let mut lp = StateVariableFilter::new(FilterType::Lowpass, SR);
        assert!(lp.set_cutoff_frequency(1234.0));
        assert!(!lp.set_cutoff_frequency(1234.0));
        assert!(lp.set_cutoff_frequency(1235.0));
        assert!(!lp.set_cutoff_frequency(f32::NAN));
        assert_eq!(lp.cutoff_frequency(), 1235.0);
    }

    /// Channels keep independent state.
    #[test]
    fn test_channels_are_independent() {
        let mut lp = StateVariableFilter::new(FilterType::Lowpass, SR);
        lp.set_cutoff_frequency(100.0);

        lp.process_sample(0, 1.0);
        let right = lp.process_sample(1, 0.0);
        assert_eq!(right, 0.0, "Right channel picked up left's state");
    }

    #[test]
    fn test_reset_clears_state() {
        let mut filter = FeedbackFilter::new(SR);
        filter.set_cutoffs(100.0, 1000.0);
        for _ in 0..100 {
            filter.process_sample(0, 1.0);
        }
        filter.reset();
        assert_eq!(filter.process_sample(0, 0.0), 0.0);
    }

    /// A NaN input must not leave NaN behind in the state.
    #[test]
    fn test_state_recovers_from_nan() {
        let mut filter = FeedbackFilter::new(SR);
        filter.set_cutoffs(100.0, 5000.0);
        filter.process_sample(0, f32::NAN);

        let y = filter.process_sample(0, 0.0);
        assert!(y.is_finite(), "State still poisoned: {y}");
    }

    /// With the widest settings the cascade is nearly transparent in the
    /// midrange.
    #[test]
    fn test_open_cascade_passes_midrange() {
        let mut filter = FeedbackFilter::new(SR);
        filter.set_cutoffs(20.0, 20000.0);

        let mut peak = 0.0_f32;
        for n in 0..(SR as usize) {
            let x = (2.0 * PI * 1000.0 * n as f32 / SR).sin();
            let y = filter.process_sample(0, x);
            if n > SR as usize / 2 {
                peak = peak.max(y.abs());
            }
        }
        assert!((peak - 1.0).abs() < 0.02, "Expected ~1.0, got {peak}");
    }

    /// Output stays bounded for full-scale noise at every cutoff pairing.
    #[test]
    fn test_bounded_for_all_cutoffs() {
        let cutoffs = [20.0, 200.0, 2000.0, 20000.0];
        let mut seed = 0x1234_5678_u32;
        for low in cutoffs {
            for high in cutoffs {
                let mut filter = FeedbackFilter::new(SR);
                filter.set_cutoffs(low, high);
                for _ in 0..10000 {
                    seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                    let x = (seed >> 8) as f32 / (1u32 << 24) as f32 * 2.0 - 1.0;
                    let y = filter.process_sample(0, x);
                    assert!(y.is_finite() && y.abs() < 4.0, "low={low} high={high}: {y}");
                }
            }
        }
    }
}
