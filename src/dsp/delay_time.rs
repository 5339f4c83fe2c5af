//! # Changing the Delay Time Without Glitches
//!
//! Moving the read head of a delay line while audio is playing is never
//! free. There are two classic ways to deal with it:
//!
//! - **Glide**: slide the read head towards its new position with a slow
//!   one-pole smoother. The read head briefly moves faster or slower than
//!   the write head, so the echoes are pitch-shifted during the move, like
//!   a tape echo whose motor speed is changed. No gap in the sound.
//!
//! - **Jump**: fade the wet signal out, wait for the fade to finish, move
//!   the read head in one step, and fade back in. No pitch artefacts, but
//!   a short dip in the echoes.
//!
//! Which one sounds right depends on the material, so both are available
//! and the engine configuration picks one.

use super::smoother::SmoothedParameter;

/// How the delay time follows its target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DelayTimePolicy {
    /// Exponential glide towards the new time (tape-style pitch bend).
    #[default]
    Glide,
    /// Fade out, jump to the new time, fade back in.
    Jump,
}

/// Timing constants for [`DelayTime`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DelayTimeTiming {
    /// Glide time constant in seconds.
    pub glide_seconds: f32,
    /// Fade-out/in time constant in seconds.
    pub fade_seconds: f32,
    /// How long the tap waits before jumping, in seconds.
    pub hold_seconds: f32,
}

/// Where to read the delay line this sample, and how loud.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tap {
    /// Read offset in (fractional) samples.
    pub samples: f32,
    /// Gain to apply to the wet signal (fade envelope for `Jump`).
    pub gain: f32,
}

/// Resolves the per-sample read offset from a target delay time.
#[derive(Debug, Clone)]
pub struct DelayTime {
    policy: DelayTimePolicy,
    timing: DelayTimeTiming,
    sample_rate: f32,

    /// Glide: smoothed manual delay time in milliseconds.
    glide: SmoothedParameter,

    /// Jump: the offset currently being read, and the one waited for.
    current_samples: f32,
    target_samples: f32,
    fade: f32,
    fade_target: f32,
    fade_coeff: f32,
    /// Samples left before the tap jumps; 0 means "not waiting".
    wait_left: u32,
    hold_samples: u32,
}

impl DelayTime {
    pub fn new(policy: DelayTimePolicy, timing: DelayTimeTiming) -> Self {
        Self {
            policy,
            timing,
            sample_rate: 0.0,
            glide: SmoothedParameter::exponential(0.0),
            current_samples: 0.0,
            target_samples: 0.0,
            fade: 1.0,
            fade_target: 1.0,
            fade_coeff: 1.0,
            wait_left: 0,
            hold_samples: 1,
        }
    }

    /// Configure for a sample rate.
    pub fn prepare(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.glide.prepare(sample_rate, self.timing.glide_seconds);

        let fade_samples = self.timing.fade_seconds * sample_rate;
        self.fade_coeff = if fade_samples >= 1.0 {
            1.0 - (-1.0 / fade_samples).exp()
        } else {
            1.0
        };

        let hold_samples = (self.timing.hold_seconds * sample_rate).round();
        self.hold_samples = if hold_samples.is_finite() {
            (hold_samples as u32).max(1)
        } else {
            1
        };
    }

    /// Snap to `delay_ms` with no glide or fade in progress.
    pub fn reset(&mut self, delay_ms: f32) {
        self.glide.set_immediate(delay_ms);
        let samples = self.ms_to_samples(delay_ms);
        self.current_samples = samples;
        self.target_samples = samples;
        self.fade = 1.0;
        self.fade_target = 1.0;
        self.wait_left = 0;
    }

    /// Resolve this sample's tap.
    ///
    /// `synced` marks a tempo-derived target. Under `Glide` those are used
    /// as-is (note lengths change in steps, not sweeps) and re-seed the
    /// glide, so switching sync off glides away from the synced time.
    #[inline]
    pub fn next(&mut self, target_ms: f32, synced: bool) -> Tap {
        match self.policy {
            DelayTimePolicy::Glide => {
                let ms = if synced {
                    self.glide.set_immediate(target_ms);
                    target_ms
                } else {
                    self.glide.set_target(target_ms);
                    self.glide.next()
                };
                Tap {
                    samples: self.ms_to_samples(ms),
                    gain: 1.0,
                }
            }
            DelayTimePolicy::Jump => self.next_jump(self.ms_to_samples(target_ms)),
        }
    }

    fn next_jump(&mut self, target_samples: f32) -> Tap {
        if target_samples != self.target_samples {
            self.target_samples = target_samples;
            // Start (or restart) the hold and fade out.
            self.wait_left = self.hold_samples;
            self.fade_target = 0.0;
        }

        self.fade += (self.fade_target - self.fade) * self.fade_coeff;

        if self.wait_left > 0 {
            self.wait_left -= 1;
            if self.wait_left == 0 {
                self.current_samples = self.target_samples;
                self.fade_target = 1.0;
            }
        }

        Tap {
            samples: self.current_samples,
            gain: self.fade,
        }
    }

    #[inline]
    fn ms_to_samples(&self, ms: f32) -> f32 {
        ms / 1000.0 * self.sample_rate
    }
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────
