//! # Smoothed Controls
//!
//! The engine's view of the parameters: one [`SmoothedParameter`] per
//! continuous control, already converted to the units the DSP wants
//! (linear gain instead of dB, `0..1` instead of percent, and so on).
//!
//! [`Controls::update()`] hands the block's snapshot to the smoothers once
//! per block; [`Controls::next()`] advances every smoother by exactly one
//! sample and returns the values for that sample.
//!
//! The delay time is not smoothed here. How it follows its target is the
//! job of [`DelayTime`](crate::dsp::delay_time::DelayTime), which has its
//! own glide and jump strategies.

use nih_plug::util::db_to_gain;

use crate::config::EngineConfig;
use crate::dsp::filter::{MAX_CUTOFF_HZ, MIN_CUTOFF_HZ};
use crate::dsp::smoother::SmoothedParameter;
use crate::dsp::tempo::NoteLength;
use crate::params::{ParameterId, ParameterSnapshot};

/// The smoothed control values for one sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlValues {
    /// Output gain, linear.
    pub gain: f32,
    /// Wet amount, `0..1`.
    pub mix: f32,
    /// Feedback amount, `-1..1`.
    pub feedback: f32,
    /// Stereo width, `-1..1`.
    pub width: f32,
    pub low_cut_hz: f32,
    pub high_cut_hz: f32,
    /// `0` = effect engaged, `1` = fully bypassed.
    pub bypass: f32,
}

/// Snapshot values converted to DSP units and clamped.
struct Targets {
    gain: f32,
    mix: f32,
    feedback: f32,
    width: f32,
    low_cut_hz: f32,
    high_cut_hz: f32,
    bypass: f32,
    delay_time_ms: f32,
}

impl Targets {
    fn new(snapshot: &ParameterSnapshot, config: &EngineConfig) -> Self {
        let delay_time_ms = ParameterId::DelayTime
            .clamp(snapshot.delay_time_ms)
            .clamp(config.min_delay_ms, config.max_delay_ms);

        Self {
            gain: db_to_gain(ParameterId::Gain.clamp(snapshot.gain_db)),
            mix: ParameterId::Mix.clamp(snapshot.mix_percent) / 100.0,
            feedback: ParameterId::Feedback.clamp(snapshot.feedback_percent) / 100.0,
            width: ParameterId::Stereo.clamp(snapshot.stereo_percent) / 100.0,
            low_cut_hz: snapshot.low_cut_hz.clamp(MIN_CUTOFF_HZ, MAX_CUTOFF_HZ),
            high_cut_hz: snapshot.high_cut_hz.clamp(MIN_CUTOFF_HZ, MAX_CUTOFF_HZ),
            bypass: if snapshot.bypass { 1.0 } else { 0.0 },
            delay_time_ms,
        }
    }
}

/// Every per-sample control of one engine instance.
#[derive(Debug, Clone)]
pub struct Controls {
    gain: SmoothedParameter,
    mix: SmoothedParameter,
    feedback: SmoothedParameter,
    width: SmoothedParameter,
    low_cut: SmoothedParameter,
    high_cut: SmoothedParameter,
    bypass: SmoothedParameter,

    delay_time_ms: f32,
    tempo_sync: bool,
    delay_note: NoteLength,
}

impl Controls {
    /// Create controls resting at `snapshot`.
    pub fn new(snapshot: &ParameterSnapshot, config: &EngineConfig) -> Self {
        let t = Targets::new(snapshot, config);
        Self {
            gain: SmoothedParameter::linear(t.gain),
            mix: SmoothedParameter::linear(t.mix),
            feedback: SmoothedParameter::linear(t.feedback),
            width: SmoothedParameter::linear(t.width),
            low_cut: SmoothedParameter::linear(t.low_cut_hz),
            high_cut: SmoothedParameter::linear(t.high_cut_hz),
            bypass: SmoothedParameter::linear(t.bypass),
            delay_time_ms: t.delay_time_ms,
            tempo_sync: snapshot.tempo_sync,
            delay_note: snapshot.delay_note,
        }
    }

    /// Set the ramp length for every smoother at `sample_rate`.
    pub fn prepare(&mut self, sample_rate: f32, ramp_seconds: f32) {
        for smoother in self.smoothers_mut() {
            smoother.prepare(sample_rate, ramp_seconds);
        }
    }

    /// Jump every control straight to `snapshot`, no ramps.
    pub fn reset(&mut self, snapshot: &ParameterSnapshot, config: &EngineConfig) {
        let t = Targets::new(snapshot, config);
        self.gain.set_immediate(t.gain);
        self.mix.set_immediate(t.mix);
        self.feedback.set_immediate(t.feedback);
        self.width.set_immediate(t.width);
        self.low_cut.set_immediate(t.low_cut_hz);
        self.high_cut.set_immediate(t.high_cut_hz);
        self.bypass.set_immediate(t.bypass);
        self.delay_time_ms = t.delay_time_ms;
        self.tempo_sync = snapshot.tempo_sync;
        self.delay_note = snapshot.delay_note;
    }

    /// Pass the block's targets to the smoothers. Call once per block.
    ///
    /// With `ramp_cutoffs == false` the filter cutoffs jump to their new
    /// values instead of ramping.
    pub fn update(&mut self, snapshot: &ParameterSnapshot, config: &EngineConfig, ramp_cutoffs: bool) {
        let t = Targets::new(snapshot, config);
        self.gain.set_target(t.gain);
        self.mix.set_target(t.mix);
        self.feedback.set_target(t.feedback);
        self.width.set_target(t.width);
        self.bypass.set_target(t.bypass);

        if ramp_cutoffs {
            self.low_cut.set_target(t.low_cut_hz);
            self.high_cut.set_target(t.high_cut_hz);
        } else {
            self.low_cut.set_immediate(t.low_cut_hz);
            self.high_cut.set_immediate(t.high_cut_hz);
        }

        self.delay_time_ms = t.delay_time_ms;
        self.tempo_sync = snapshot.tempo_sync;
        self.delay_note = snapshot.delay_note;
    }

    /// Advance every smoother by one sample.
    #[inline]
    pub fn next(&mut self) -> ControlValues {
        ControlValues {
            gain: self.gain.next(),
            mix: self.mix.next(),
            feedback: self.feedback.next(),
            width: self.width.next(),
            low_cut_hz: self.low_cut.next(),
            high_cut_hz: self.high_cut.next(),
            bypass: self.bypass.next(),
        }
    }

    /// Manual delay time target in milliseconds, already clamped.
    pub fn delay_time_ms(&self) -> f32 {
        self.delay_time_ms
    }

    pub fn tempo_sync(&self) -> bool {
        self.tempo_sync
    }

    pub fn delay_note(&self) -> NoteLength {
        self.delay_note
    }

    /// The feedback amount being ramped towards.
    pub fn feedback_target(&self) -> f32 {
        self.feedback.target()
    }

    /// The stereo width being ramped towards.
    pub fn width_target(&self) -> f32 {
        self.width.target()
    }

    fn smoothers_mut(&mut self) -> [&mut SmoothedParameter; 7] {
        [
            &mut self.gain,
            &mut self.mix,
            &mut self.feedback,
            &mut self.width,
            &mut self.low_cut,
            &mut self.high_cut,
            &mut self.bypass,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f32 = 48000.0;

    fn prepared(snapshot: &ParameterSnapshot) -> Controls {
        let config = EngineConfig::default();
        let mut controls = Controls::new(snapshot, &config);
        controls.prepare(SR, config.ramp_seconds);
        controls
    }

    #[test]
    fn test_units_are_converted() {
        let snapshot = ParameterSnapshot {
            gain_db: -6.0,
            mix_percent: 50.0,
            feedback_percent: -25.0,
            stereo_percent: 100.0,
            ..Default::default()
        };
        let mut controls = prepared(&snapshot);
        let v = controls.next();

        assert!((v.gain - 0.501).abs() < 1e-3, "gain {}", v.gain);
        assert_eq!(v.mix, 0.5);
        assert_eq!(v.feedback, -0.25);
        assert_eq!(v.width, 1.0);
        assert_eq!(v.bypass, 0.0);
    }

    /// A new block target takes exactly the 20 ms ramp to arrive.
    #[test]
    fn test_update_ramps() {
        let config = EngineConfig::default();
        let mut controls = prepared(&ParameterSnapshot::default());

        let snapshot = ParameterSnapshot {
            mix_percent: 0.0,
            ..Default::default()
        };
        controls.update(&snapshot, &config, true);

        let first = controls.next().mix;
        assert!(first < 1.0 && first > 0.99, "first {first}");

        let mut last = first;
        for _ in 1..960 {
            last = controls.next().mix;
        }
        assert_eq!(last, 0.0);
    }

    #[test]
    fn test_cutoffs_jump_without_ramp() {
        let config = EngineConfig::default();
        let mut controls = prepared(&ParameterSnapshot::default());

        let snapshot = ParameterSnapshot {
            low_cut_hz: 500.0,
            high_cut_hz: 2000.0,
            ..Default::default()
        };
        controls.update(&snapshot, &config, false);
        let v = controls.next();
        assert_eq!(v.low_cut_hz, 500.0);
        assert_eq!(v.high_cut_hz, 2000.0);

        controls.update(&ParameterSnapshot::default(), &config, true);
        let v = controls.next();
        assert!(v.low_cut_hz < 500.0 && v.low_cut_hz > 20.0);
    }

    #[test]
    fn test_delay_time_clamped_to_config() {
        let config = EngineConfig {
            max_delay_ms: 1000.0,
            ..Default::default()
        };
        let snapshot = ParameterSnapshot {
            delay_time_ms: 4000.0,
            ..Default::default()
        };
        let controls = Controls::new(&snapshot, &config);
        assert_eq!(controls.delay_time_ms(), 1000.0);
    }

    #[test]
    fn test_reset_skips_ramp() {
        let config = EngineConfig::default();
        let mut controls = prepared(&ParameterSnapshot::default());
        let snapshot = ParameterSnapshot {
            bypass: true,
            feedback_percent: 80.0,
            ..Default::default()
        };
        controls.reset(&snapshot, &config);
        let v = controls.next();
        assert_eq!(v.bypass, 1.0);
        assert!((v.feedback - 0.8).abs() < 1e-6);
        assert!((controls.feedback_target() - 0.8).abs() < 1e-6);
    }
}
