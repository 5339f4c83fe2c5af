//! # Engine Configuration
//!
//! Everything about a [`DelayEngine`](crate::engine::DelayEngine) that is
//! fixed for its lifetime: the delay range (which sizes the buffers), the
//! fallback tempo, ramp times, and the three behaviours that have more than
//! one reasonable answer.
//!
//! The configuration is a plain value handed to the engine's constructor,
//! so two plugin instances can run with different settings side by side.

use thiserror::Error;

pub use crate::dsp::delay_time::DelayTimePolicy;
use crate::dsp::delay_time::DelayTimeTiming;

/// Longest `max_delay_ms` a configuration may ask for. At 192 kHz this is
/// about 46 MB of delay buffer per channel.
pub const MAX_DELAY_CEILING_MS: f32 = 60_000.0;

/// How the wet signal is blended with the dry signal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MixLaw {
    /// `dry + wet * mix`. The dry signal always stays at full level, so
    /// turning the mix up only ever *adds* echoes.
    #[default]
    Additive,
    /// `dry * (1 - mix) + wet * mix`. A classic crossfade; at 100% the dry
    /// signal is gone.
    Crossfade,
}

impl MixLaw {
    #[inline]
    pub fn mix(self, dry: f32, wet: f32, mix: f32) -> f32 {
        match self {
            MixLaw::Additive => dry + wet * mix,
            MixLaw::Crossfade => dry * (1.0 - mix) + wet * mix,
        }
    }
}

/// What the delay network does while the effect is bypassed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BypassBehavior {
    /// Keep writing the input and running the feedback loop, so the
    /// echoes are already "in flight" when the effect is re-engaged.
    #[default]
    KeepRunning,
    /// Stop the network once the bypass crossfade has finished; it resumes
    /// where it left off when the effect is re-engaged.
    Freeze,
}

/// A rejected [`EngineConfig`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("delay range must satisfy 0 < min <= max <= 60000 (got {min} ms..{max} ms)")]
    InvalidDelayRange { min: f32, max: f32 },

    #[error("default tempo must be a positive number of BPM (got {0})")]
    InvalidTempo(f64),

    #[error("{name} must be a finite, non-negative number of seconds (got {value})")]
    InvalidTime { name: &'static str, value: f32 },
}

/// Fixed settings for one engine instance.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Shortest delay time in milliseconds.
    pub min_delay_ms: f32,
    /// Longest delay time in milliseconds. Sizes the delay buffers.
    pub max_delay_ms: f32,
    /// Tempo used when the host doesn't report one.
    pub default_bpm: f64,
    /// Ramp length for gain, mix, feedback, width, cutoffs and bypass.
    pub ramp_seconds: f32,
    /// Time constant of the delay-time glide.
    pub glide_seconds: f32,
    /// Time constant of the fade used by [`DelayTimePolicy::Jump`].
    pub fade_seconds: f32,
    /// How long [`DelayTimePolicy::Jump`] waits before moving the tap.
    pub fade_hold_seconds: f32,
    pub delay_time_policy: DelayTimePolicy,
    pub mix_law: MixLaw,
    pub bypass_behavior: BypassBehavior,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: 5.0,
            max_delay_ms: 5000.0,
            default_bpm: 120.0,
            ramp_seconds: 0.02,
            glide_seconds: 0.2,
            fade_seconds: 0.05,
            fade_hold_seconds: 0.3,
            delay_time_policy: DelayTimePolicy::default(),
            mix_law: MixLaw::default(),
            bypass_behavior: BypassBehavior::default(),
        }
    }
}

impl EngineConfig {
    /// Check that the configuration describes a usable engine.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let (min, max) = (self.min_delay_ms, self.max_delay_ms);
        if !(min.is_finite()
            && max.is_finite()
            && min > 0.0
            && min <= max
            && max <= MAX_DELAY_CEILING_MS)
        {
            return Err(ConfigError::InvalidDelayRange { min, max });
        }

        if !(self.default_bpm.is_finite() && self.default_bpm > 0.0) {
            return Err(ConfigError::InvalidTempo(self.default_bpm));
        }

        for (name, value) in [
            ("ramp_seconds", self.ramp_seconds),
            ("glide_seconds", self.glide_seconds),
            ("fade_seconds", self.fade_seconds),
            ("fade_hold_seconds", self.fade_hold_seconds),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::InvalidTime { name, value });
            }
        }

        Ok(())
    }

    /// Number of samples the delay buffers must reach back at `sample_rate`.
    pub fn max_delay_samples(&self, sample_rate: f32) -> usize {
        (f64::from(self.max_delay_ms) / 1000.0 * f64::from(sample_rate)).ceil() as usize
    }

    pub(crate) fn delay_time_timing(&self) -> DelayTimeTiming {
        DelayTimeTiming {
            glide_seconds: self.glide_seconds,
            fade_seconds: self.fade_seconds,
            hold_seconds: self.fade_hold_seconds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert_eq!(EngineConfig::default().validate(), Ok(()));
    }

    #[test]
    fn test_rejects_bad_delay_range() {
        let config = EngineConfig {
            min_delay_ms: 100.0,
            max_delay_ms: 50.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidDelayRange { .. })
        ));

        let config = EngineConfig {
            min_delay_ms: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    /// A huge but finite maximum would ask for more buffer than any
    /// machine has.
    #[test]
    fn test_rejects_max_delay_above_ceiling() {
        let config = EngineConfig {
            max_delay_ms: 1.0e30,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidDelayRange {
                min: 5.0,
                max: 1.0e30
            })
        );

        let config = EngineConfig {
            max_delay_ms: MAX_DELAY_CEILING_MS,
            ..Default::default()
        };
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_rejects_bad_tempo_and_times() {
        let config = EngineConfig {
            default_bpm: 0.0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidTempo(0.0)));

        let config = EngineConfig {
            glide_seconds: -1.0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "glide_seconds must be a finite, non-negative number of seconds (got -1)"
        );
    }

    #[test]
    fn test_max_delay_samples() {
        let config = EngineConfig::default();
        assert_eq!(config.max_delay_samples(48000.0), 240_000);
        assert_eq!(config.max_delay_samples(44100.0), 220_500);
    }

    #[test]
    fn test_mix_laws() {
        assert_eq!(MixLaw::Additive.mix(1.0, 0.5, 1.0), 1.5);
        assert_eq!(MixLaw::Additive.mix(1.0, 0.5, 0.0), 1.0);
        assert_eq!(MixLaw::Crossfade.mix(1.0, 0.5, 1.0), 0.5);
        assert_eq!(MixLaw::Crossfade.mix(1.0, 0.5, 0.5), 0.75);
    }
}
