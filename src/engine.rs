//! # The Delay Engine
//!
//! Wires the DSP building blocks into a tempo-aware, filtered, ping-pong
//! feedback delay. The engine knows nothing about plugin formats: it is
//! handed a block of samples, a [`ParameterSnapshot`] and a
//! [`HostTimeline`], and processes the block in place.
//!
//! ## Signal Flow (stereo)
//!
//! ```text
//!  L ──┬──► (L+R)/2 ──┬── × panL ──(+)──► [Delay Line L] ──┬──► wetL
//!  R ──┤     mono     │             ▲                      │
//!      │              │             │   ┌──── fbR ◄────────┼─────────┐
//!      │              │             └───┘                  │         │
//!      │              └── × panR ──(+)──► [Delay Line R] ──┼─► wetR  │
//!      │                            ▲                      │    │    │
//!      │                            └──── fbL ◄── [HP→LP] ◄┘    │    │
//!      │                                          × feedback    │    │
//!      │                                      [HP→LP] ◄─────────┘────┘
//!      │
//!      └──► dry ──► mix(dry, wet) ──► × gain ──► bypass crossfade ──► out
//! ```
//!
//! Each line's feedback comes from the *other* line's output, so a repeat
//! bounces from one side to the other ("ping-pong"). The stereo width
//! control decides how the input is split between the two lines.
//!
//! ## Per-sample order
//!
//! 1. Advance every smoother (the pan law uses the freshly advanced width).
//! 2. Resolve the delay tap: the tempo-synced time computed once for the
//!    block, or the manual time through the glide/jump policy.
//! 3. Sum the input to mono.
//! 4. Write `mono·panL + fbR` into the left line and `mono·panR + fbL`
//!    into the right line.
//! 5. Read both lines at the tap.
//! 6. `fb = filter(wet · feedback)`, used by step 4 of the *next* sample.
//! 7. Mix dry and wet.
//! 8. Apply the output gain.
//! 9. Track the peak of each channel.
//!
//! The mono layouts run the same steps with a single line and no cross-feed.

use std::sync::Arc;

use nih_plug::{nih_debug_assert, nih_warn};

use crate::config::{BypassBehavior, ConfigError, EngineConfig};
use crate::controls::{ControlValues, Controls};
use crate::dsp::delay_line::DelayLine;
use crate::dsp::delay_time::{DelayTime, Tap};
use crate::dsp::filter::FeedbackFilter;
use crate::dsp::pan::EqualPowerPan;
use crate::dsp::safety;
use crate::dsp::tempo::{HostTimeline, TempoSync};
use crate::params::ParameterSnapshot;
use crate::shared::PeakMeters;

/// Feedback at or above this magnitude never decays: the tail is infinite.
pub const INFINITE_TAIL_FEEDBACK: f32 = 0.999;

/// Below this the repeats are inaudible after the first echo.
const NEGLIGIBLE_FEEDBACK: f32 = 0.001;

/// The channel configurations the engine can process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelLayout {
    MonoToMono,
    MonoToStereo,
    StereoToStereo,
}

impl ChannelLayout {
    /// Work out the layout from the number of input channels and the number
    /// of channels in the (in-place) buffer. Returns `None` for an empty
    /// buffer. Channels past the second are left alone.
    pub fn resolve(num_inputs: usize, num_channels: usize) -> Option<Self> {
        match (num_inputs, num_channels) {
            (_, 0) => None,
            (_, 1) => Some(Self::MonoToMono),
            (0 | 1, _) => Some(Self::MonoToStereo),
            _ => Some(Self::StereoToStereo),
        }
    }

    pub fn output_channels(self) -> usize {
        match self {
            Self::MonoToMono => 1,
            Self::MonoToStereo | Self::StereoToStereo => 2,
        }
    }
}

/// The complete delay effect for one plugin instance.
pub struct DelayEngine {
    config: EngineConfig,

    /// Set by [`prepare()`](Self::prepare). Zero until then.
    sample_rate: f32,
    max_block_size: usize,
    prepared: bool,

    controls: Controls,
    tempo: TempoSync,
    delay_time: DelayTime,

    /// Left and right delay lines. The mono layouts only use the first.
    lines: [DelayLine; 2],
    filter: FeedbackFilter,
    pan: EqualPowerPan,

    /// The last filtered feedback sample of each line. This *is* the
    /// feedback loop's state and persists across blocks.
    feedback: [f32; 2],

    /// Delay target of the most recent block, for the tail length.
    resolved_delay_ms: f32,

    meters: Arc<PeakMeters>,
}

impl Default for DelayEngine {
    fn default() -> Self {
        Self::from_valid_config(EngineConfig::default())
    }
}

impl DelayEngine {
    /// Build an engine. Nothing is allocated until [`prepare()`](Self::prepare).
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    fn from_valid_config(config: EngineConfig) -> Self {
        let controls = Controls::new(&ParameterSnapshot::default(), &config);
        let resolved_delay_ms = controls.delay_time_ms();

        Self {
            tempo: TempoSync::new(config.default_bpm, config.max_delay_ms),
            delay_time: DelayTime::new(config.delay_time_policy, config.delay_time_timing()),
            controls,
            sample_rate: 0.0,
            max_block_size: 0,
            prepared: false,
            lines: [DelayLine::default(), DelayLine::default()],
            // Placeholder rate, replaced in prepare().
            filter: FeedbackFilter::new(44100.0),
            pan: EqualPowerPan::default(),
            feedback: [0.0; 2],
            resolved_delay_ms,
            meters: Arc::new(PeakMeters::new()),
            config,
        }
    }

    /// Allocate the delay lines and configure everything for a sample rate.
    ///
    /// Not real-time safe: call it from the plugin's `initialize()`, never
    /// from the audio callback. An invalid sample rate leaves the engine
    /// unprepared, and an unprepared engine passes audio through untouched.
    pub fn prepare(&mut self, sample_rate: f32, max_block_size: usize) {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            nih_warn!(
                "Can't prepare the delay for a sample rate of {} Hz, passing audio through",
                sample_rate
            );
            self.prepared = false;
            return;
        }

        self.sample_rate = sample_rate;
        self.max_block_size = max_block_size;

        let max_delay_samples = self.config.max_delay_samples(sample_rate);
        for line in &mut self.lines {
            line.set_maximum_delay_in_samples(max_delay_samples);
        }

        self.filter.prepare(sample_rate);
        self.controls.prepare(sample_rate, self.config.ramp_seconds);
        self.delay_time.prepare(sample_rate);
        self.tempo.reset();

        self.prepared = true;
        self.clear_state();
    }

    /// Jump to `snapshot` without ramps and clear every echo.
    ///
    /// Called when playback stops or a preset is loaded, so stale audio
    /// doesn't come back on the next play.
    pub fn reset(&mut self, snapshot: &ParameterSnapshot) {
        self.controls.reset(snapshot, &self.config);
        self.clear_state();
    }

    fn clear_state(&mut self) {
        for line in &mut self.lines {
            line.reset();
        }
        self.filter.reset();
        self.feedback = [0.0; 2];

        let (delay_ms, _) = self.resolve_delay_ms();
        self.resolved_delay_ms = delay_ms;
        self.delay_time.reset(delay_ms);
        self.pan.set_width(self.controls.width_target());
        self.meters.store(0.0, 0.0);
    }

    /// Process one block in place.
    ///
    /// `channels` holds one slice per buffer channel, all the same length;
    /// `num_input_channels` tells the engine how many of them carry input
    /// (1 for the mono-in layouts). Real-time safe: no allocation, no
    /// locking, no logging in release builds.
    pub fn process_block(
        &mut self,
        channels: &mut [&mut [f32]],
        num_input_channels: usize,
        snapshot: &ParameterSnapshot,
        timeline: &HostTimeline,
    ) {
        let Some(layout) = ChannelLayout::resolve(num_input_channels, channels.len()) else {
            return;
        };

        nih_debug_assert!(self.prepared, "process_block() called before prepare()");
        if !self.prepared {
            return;
        }

        let num_outputs = layout.output_channels();
        let num_samples = channels[..num_outputs]
            .iter()
            .map(|channel| channel.len())
            .min()
            .unwrap_or(0);
        nih_debug_assert!(
            num_samples <= self.max_block_size,
            "Block of {} samples exceeds the prepared maximum of {}",
            num_samples,
            self.max_block_size
        );

        // Once per block: host tempo, new targets, and the delay time.
        let was_playing = self.tempo.is_playing();
        self.tempo.update(timeline);
        self.controls
            .update(snapshot, &self.config, layout != ChannelLayout::MonoToMono);

        // The transport just stopped: drop every echo still in flight so it
        // doesn't play back over the next start.
        if was_playing && !self.tempo.is_playing() {
            self.clear_state();
        }

        let (delay_ms, synced) = self.resolve_delay_ms();
        self.resolved_delay_ms = delay_ms;

        let (peak_left, peak_right) = match layout {
            ChannelLayout::StereoToStereo => {
                self.process_stereo(channels, num_samples, delay_ms, synced)
            }
            ChannelLayout::MonoToStereo | ChannelLayout::MonoToMono => {
                let peak = self.process_mono(channels, num_outputs, num_samples, delay_ms, synced);
                (peak, peak)
            }
        };
        self.meters.store(peak_left, peak_right);

        if cfg!(debug_assertions) {
            safety::protect_your_ears(&mut channels[..num_outputs]);
        }
    }

    fn process_stereo(
        &mut self,
        channels: &mut [&mut [f32]],
        num_samples: usize,
        delay_ms: f32,
        synced: bool,
    ) -> (f32, f32) {
        let mut peak = [0.0_f32; 2];

        for i in 0..num_samples {
            let (v, tap) = self.advance(delay_ms, synced);
            let dry = [channels[0][i], channels[1][i]];

            let processed = if self.is_frozen(&v) {
                dry
            } else {
                let mono = (dry[0] + dry[1]) * 0.5;

                // Cross-feed: each line hears the other line's repeats.
                self.lines[0].write(mono * self.pan.left() + self.feedback[1]);
                self.lines[1].write(mono * self.pan.right() + self.feedback[0]);

                let wet = [
                    self.lines[0].read(tap.samples) * tap.gain,
                    self.lines[1].read(tap.samples) * tap.gain,
                ];

                for (channel, &wet) in wet.iter().enumerate() {
                    self.feedback[channel] =
                        self.filter.process_sample(channel, wet * v.feedback);
                }

                [
                    self.config.mix_law.mix(dry[0], wet[0], v.mix) * v.gain,
                    self.config.mix_law.mix(dry[1], wet[1], v.mix) * v.gain,
                ]
            };

            for channel in 0..2 {
                let out = processed[channel] + (dry[channel] - processed[channel]) * v.bypass;
                channels[channel][i] = out;
                peak[channel] = peak[channel].max(out.abs());
            }
        }

        (peak[0], peak[1])
    }

    /// One delay line, no cross-feed, the same output on every channel.
    fn process_mono(
        &mut self,
        channels: &mut [&mut [f32]],
        num_outputs: usize,
        num_samples: usize,
        delay_ms: f32,
        synced: bool,
    ) -> f32 {
        let mut peak = 0.0_f32;

        for i in 0..num_samples {
            let (v, tap) = self.advance(delay_ms, synced);
            let dry = channels[0][i];

            let processed = if self.is_frozen(&v) {
                dry
            } else {
                self.lines[0].write(dry + self.feedback[0]);
                let wet = self.lines[0].read(tap.samples) * tap.gain;
                self.feedback[0] = self.filter.process_sample(0, wet * v.feedback);
                self.config.mix_law.mix(dry, wet, v.mix) * v.gain
            };

            let out = processed + (dry - processed) * v.bypass;
            for channel in channels[..num_outputs].iter_mut() {
                channel[i] = out;
            }
            peak = peak.max(out.abs());
        }

        peak
    }

    /// Steps 1 and 2: advance the controls and resolve this sample's tap.
    #[inline]
    fn advance(&mut self, delay_ms: f32, synced: bool) -> (ControlValues, Tap) {
        let v = self.controls.next();
        self.pan.set_width(v.width);
        self.filter.set_cutoffs(v.low_cut_hz, v.high_cut_hz);
        let tap = self.delay_time.next(delay_ms, synced);
        (v, tap)
    }

    /// Whether the network is stopped because the effect is fully bypassed.
    #[inline]
    fn is_frozen(&self, v: &ControlValues) -> bool {
        self.config.bypass_behavior == BypassBehavior::Freeze && v.bypass >= 1.0
    }

    /// The delay time to aim for, and whether it came from tempo sync.
    fn resolve_delay_ms(&self) -> (f32, bool) {
        if self.controls.tempo_sync() {
            let ms = self
                .tempo
                .milliseconds_for_note(self.controls.delay_note())
                .clamp(self.config.min_delay_ms, self.config.max_delay_ms);
            (ms, true)
        } else {
            (self.controls.delay_time_ms(), false)
        }
    }

    /// How many samples the echoes keep sounding after the input stops.
    ///
    /// Each repeat is the previous one times the feedback amount, so after
    /// `N` repeats the level is `feedback^N`. Solving `feedback^N = 0.001`
    /// (-60 dB) gives `N = -3 / log10(feedback)`, and each repeat lasts one
    /// delay period. `None` means the echoes never die out.
    pub fn tail_samples(&self) -> Option<u32> {
        let feedback = self.controls.feedback_target().abs();
        if feedback >= INFINITE_TAIL_FEEDBACK {
            return None;
        }

        let delay_samples = self.resolved_delay_ms / 1000.0 * self.sample_rate;
        let samples = if feedback > NEGLIGIBLE_FEEDBACK {
            let repeats = -3.0 / feedback.log10();
            repeats * delay_samples
        } else {
            delay_samples
        };

        Some(samples.ceil() as u32)
    }

    /// A handle to the peak meters, for reading from another thread.
    pub fn meters(&self) -> Arc<PeakMeters> {
        Arc::clone(&self.meters)
    }

    /// `(left, right)` peak of the most recent block.
    pub fn peak_levels(&self) -> (f32, f32) {
        (self.meters.left(), self.meters.right())
    }

    pub fn is_prepared(&self) -> bool {
        self.prepared
    }
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────
