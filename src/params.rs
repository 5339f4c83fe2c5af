//! # Plugin Parameters
//!
//! Parameters are the knobs and switches the user sees in the DAW. Each
//! has a **unique string ID** that the host uses to save and recall
//! presets (never change a published ID, or existing presets break), a
//! human-readable name, a range and a default.
//!
//! ## Who smooths what
//!
//! Unlike v1, these parameters carry no nih-plug smoothers. At the start
//! of every block the plugin copies their plain values into a
//! [`ParameterSnapshot`], and the engine's own smoothers ramp towards
//! those targets sample by sample. That keeps the engine independent of
//! the host API: anything that can produce a snapshot can drive it.
//!
//! ## How values reach the audio thread
//!
//! Every parameter has a callback that publishes its new value into a
//! shared [`ParameterTargets`]. nih-plug calls it whenever the value
//! changes (automation, the host's generic UI, preset recall), and the
//! audio thread reads all targets at once with
//! [`ParameterTargets::snapshot()`].
//!
//! ## Display and text entry
//!
//! The formatters mirror what a user expects to read and type: delay
//! times switch from milliseconds to seconds at 100 ms, cutoffs switch
//! to kHz at 1 kHz, and a bare small number typed into either field is
//! read in the larger unit ("2" is two seconds, "2.5" is 2.5 kHz).

use std::sync::Arc;

use nih_plug::prelude::*;

use crate::dsp::tempo::NoteLength;
use crate::shared::ParameterTargets;

/// Every parameter the engine understands, with its ID, range and default.
///
/// This is the single registry of parameter identities. The string IDs
/// match the `#[id = "..."]` attributes on [`PluginParams`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterId {
    Gain,
    DelayTime,
    Mix,
    Feedback,
    Stereo,
    LowCut,
    HighCut,
    TempoSync,
    DelayNote,
    Bypass,
}

impl ParameterId {
    pub const COUNT: usize = 10;

    pub const ALL: [ParameterId; Self::COUNT] = [
        ParameterId::Gain,
        ParameterId::DelayTime,
        ParameterId::Mix,
        ParameterId::Feedback,
        ParameterId::Stereo,
        ParameterId::LowCut,
        ParameterId::HighCut,
        ParameterId::TempoSync,
        ParameterId::DelayNote,
        ParameterId::Bypass,
    ];

    /// The stable ID the host stores in presets.
    pub const fn id(self) -> &'static str {
        match self {
            ParameterId::Gain => "gain",
            ParameterId::DelayTime => "delayTime",
            ParameterId::Mix => "mix",
            ParameterId::Feedback => "feedback",
            ParameterId::Stereo => "stereo",
            ParameterId::LowCut => "lowCut",
            ParameterId::HighCut => "highCut",
            ParameterId::TempoSync => "tempoSync",
            ParameterId::DelayNote => "delayNote",
            ParameterId::Bypass => "bypass",
        }
    }

    /// Inclusive `(min, max)` in the parameter's display unit.
    ///
    /// Booleans are `0..1`, the note selector is an index.
    pub const fn range(self) -> (f32, f32) {
        match self {
            ParameterId::Gain => (-12.0, 12.0),
            ParameterId::DelayTime => (5.0, 5000.0),
            ParameterId::Mix => (0.0, 100.0),
            ParameterId::Feedback => (-100.0, 100.0),
            ParameterId::Stereo => (-100.0, 100.0),
            ParameterId::LowCut | ParameterId::HighCut => (20.0, 20000.0),
            ParameterId::TempoSync | ParameterId::Bypass => (0.0, 1.0),
            ParameterId::DelayNote => (0.0, 15.0),
        }
    }

    pub const fn default_value(self) -> f32 {
        match self {
            ParameterId::Gain => 0.0,
            ParameterId::DelayTime => 100.0,
            ParameterId::Mix => 100.0,
            ParameterId::Feedback => 0.0,
            ParameterId::Stereo => 0.0,
            ParameterId::LowCut => 20.0,
            ParameterId::HighCut => 20000.0,
            ParameterId::TempoSync => 0.0,
            // 1/4
            ParameterId::DelayNote => 8.0,
            ParameterId::Bypass => 0.0,
        }
    }

    /// Clamp `value` into range. NaN becomes the default.
    pub fn clamp(self, value: f32) -> f32 {
        if value.is_nan() {
            return self.default_value();
        }
        let (min, max) = self.range();
        value.clamp(min, max)
    }

    /// Position in [`Self::ALL`].
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// The plain target value of every parameter, captured once per block.
///
/// Values are in display units (dB, ms, %, Hz) exactly as the user set
/// them; the engine converts and clamps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterSnapshot {
    pub gain_db: f32,
    pub delay_time_ms: f32,
    pub mix_percent: f32,
    pub feedback_percent: f32,
    pub stereo_percent: f32,
    pub low_cut_hz: f32,
    pub high_cut_hz: f32,
    pub tempo_sync: bool,
    pub delay_note: NoteLength,
    pub bypass: bool,
}

impl Default for ParameterSnapshot {
    fn default() -> Self {
        Self {
            gain_db: ParameterId::Gain.default_value(),
            delay_time_ms: ParameterId::DelayTime.default_value(),
            mix_percent: ParameterId::Mix.default_value(),
            feedback_percent: ParameterId::Feedback.default_value(),
            stereo_percent: ParameterId::Stereo.default_value(),
            low_cut_hz: ParameterId::LowCut.default_value(),
            high_cut_hz: ParameterId::HighCut.default_value(),
            tempo_sync: false,
            delay_note: NoteLength::default(),
            bypass: false,
        }
    }
}

impl ParameterSnapshot {
    /// Read the current (unsmoothed) values from the nih-plug parameters.
    pub fn from_params(params: &PluginParams) -> Self {
        Self {
            gain_db: params.gain.value(),
            delay_time_ms: params.delay_time.value(),
            mix_percent: params.mix.value(),
            feedback_percent: params.feedback.value(),
            stereo_percent: params.stereo.value(),
            low_cut_hz: params.low_cut.value(),
            high_cut_hz: params.high_cut.value(),
            tempo_sync: params.tempo_sync.value(),
            delay_note: params.delay_note.value(),
            bypass: params.bypass.value(),
        }
    }
}

/// All user-facing parameters of the plugin.
///
/// The `#[derive(Params)]` macro registers these with the host and
/// handles preset serialisation; the engine never sees the encoding.
#[derive(Params)]
pub struct PluginParams {
    /// **Output Gain**: final level trim, -12 to +12 dB.
    #[id = "gain"]
    pub gain: FloatParam,

    /// **Delay Time**: 5 ms to 5 s, used when tempo sync is off. Skewed so
    /// short slapback times get most of the knob travel.
    #[id = "delayTime"]
    pub delay_time: FloatParam,

    /// **Mix**: how much of the echo is added to the dry signal.
    #[id = "mix"]
    pub mix: FloatParam,

    /// **Feedback**: how much of each echo is fed back for another round.
    /// Negative values flip the polarity of every other repeat, which
    /// sounds hollower.
    #[id = "feedback"]
    pub feedback: FloatParam,

    /// **Stereo**: spreads the ping-pong repeats across the field.
    #[id = "stereo"]
    pub stereo: FloatParam,

    /// **Low Cut**: highpass on the feedback path.
    #[id = "lowCut"]
    pub low_cut: FloatParam,

    /// **High Cut**: lowpass on the feedback path.
    #[id = "highCut"]
    pub high_cut: FloatParam,

    #[id = "tempoSync"]
    pub tempo_sync: BoolParam,

    /// Note length used when tempo sync is on.
    #[id = "delayNote"]
    pub delay_note: EnumParam<NoteLength>,

    #[id = "bypass"]
    pub bypass: BoolParam,
}

// ─────────────────────────────────────────────────────────────────────
// Value formatting
// ─────────────────────────────────────────────────────────────────────

/// Delay time as text: two decimals below 10 ms, whole milliseconds
/// below 100 ms, seconds from there on.
pub fn v2s_delay_time() -> Arc<dyn Fn(f32) -> String + Send + Sync> {
    Arc::new(|ms| {
        if ms < 10.0 {
            format!("{ms:.2} ms")
        } else if ms < 100.0 {
            format!("{} ms", ms.trunc())
        } else {
            format!("{:.2} s", ms / 1000.0)
        }
    })
}

/// Parse a delay time. "ms" is milliseconds, "s" is seconds, and a bare
/// number shorter than the minimum delay time is taken as seconds.
pub fn s2v_delay_time() -> Arc<dyn Fn(&str) -> Option<f32> + Send + Sync> {
    Arc::new(|string| {
        let string = string.trim().to_ascii_lowercase();
        let (min_ms, _) = ParameterId::DelayTime.range();

        if let Some(number) = string.strip_suffix("ms") {
            return number.trim().parse().ok();
        }
        if let Some(number) = string.strip_suffix('s') {
            return number.trim().parse::<f32>().ok().map(|s| s * 1000.0);
        }

        let value: f32 = string.parse().ok()?;
        Some(if value < min_ms { value * 1000.0 } else { value })
    })
}

/// Parse a cutoff frequency. Anything below 10 is read as kHz.
pub fn s2v_cutoff() -> Arc<dyn Fn(&str) -> Option<f32> + Send + Sync> {
    let hz_then_khz = formatters::s2v_f32_hz_then_khz();
    Arc::new(move |string| {
        let hz = hz_then_khz(string)?;
        Some(if hz < 10.0 { hz * 1000.0 } else { hz })
    })
}

/// Parse a percentage, with or without the `%` sign.
pub fn s2v_percent() -> Arc<dyn Fn(&str) -> Option<f32> + Send + Sync> {
    Arc::new(|string| string.trim().trim_end_matches('%').trim().parse().ok())
}

// ─────────────────────────────────────────────────────────────────────
// Publishing to the audio thread
// ─────────────────────────────────────────────────────────────────────

fn publish_float(
    targets: &Arc<ParameterTargets>,
    id: ParameterId,
) -> Arc<dyn Fn(f32) + Send + Sync> {
    let targets = Arc::clone(targets);
    Arc::new(move |value| targets.set(id, value))
}

fn publish_bool(
    targets: &Arc<ParameterTargets>,
    id: ParameterId,
) -> Arc<dyn Fn(bool) + Send + Sync> {
    let targets = Arc::clone(targets);
    Arc::new(move |on| targets.set(id, if on { 1.0 } else { 0.0 }))
}

fn publish_note(targets: &Arc<ParameterTargets>) -> Arc<dyn Fn(NoteLength) + Send + Sync> {
    let targets = Arc::clone(targets);
    Arc::new(move |note| targets.set(ParameterId::DelayNote, note.index() as f32))
}

fn float_param(
    name: &str,
    id: ParameterId,
    range: FloatRange,
    targets: &Arc<ParameterTargets>,
) -> FloatParam {
    FloatParam::new(name, id.default_value(), range).with_callback(publish_float(targets, id))
}

fn percent_param(name: &str, id: ParameterId, targets: &Arc<ParameterTargets>) -> FloatParam {
    let (min, max) = id.range();
    float_param(name, id, FloatRange::Linear { min, max }, targets)
        .with_unit(" %")
        .with_step_size(1.0)
        .with_value_to_string(formatters::v2s_f32_rounded(0))
        .with_string_to_value(s2v_percent())
}

fn cutoff_param(name: &str, id: ParameterId, targets: &Arc<ParameterTargets>) -> FloatParam {
    let (min, max) = id.range();
    // Frequency perception is roughly logarithmic, hence the skew.
    float_param(
        name,
        id,
        FloatRange::Skewed {
            min,
            max,
            factor: FloatRange::skew_factor(-2.0),
        },
        targets,
    )
    .with_step_size(1.0)
    .with_value_to_string(formatters::v2s_f32_hz_then_khz(0))
    .with_string_to_value(s2v_cutoff())
}

impl Default for PluginParams {
    fn default() -> Self {
        Self::new(Arc::new(ParameterTargets::new()))
    }
}

impl PluginParams {
    /// Build the parameter tree. Every change is published to `targets`.
    pub fn new(targets: Arc<ParameterTargets>) -> Self {
        let (gain_min, gain_max) = ParameterId::Gain.range();
        let (delay_min, delay_max) = ParameterId::DelayTime.range();

        Self {
            gain: float_param(
                "Output Gain",
                ParameterId::Gain,
                FloatRange::Linear {
                    min: gain_min,
                    max: gain_max,
                },
                &targets,
            )
            .with_unit(" dB")
            .with_step_size(0.1)
            .with_value_to_string(formatters::v2s_f32_rounded(1)),

            delay_time: float_param(
                "Delay Time",
                ParameterId::DelayTime,
                FloatRange::Skewed {
                    min: delay_min,
                    max: delay_max,
                    factor: FloatRange::skew_factor(-2.0),
                },
                &targets,
            )
            .with_step_size(0.01)
            .with_value_to_string(v2s_delay_time())
            .with_string_to_value(s2v_delay_time()),

            mix: percent_param("Mix", ParameterId::Mix, &targets),
            feedback: percent_param("Feedback", ParameterId::Feedback, &targets),
            stereo: percent_param("Stereo", ParameterId::Stereo, &targets),

            low_cut: cutoff_param("Low Cut", ParameterId::LowCut, &targets),
            high_cut: cutoff_param("High Cut", ParameterId::HighCut, &targets),

            tempo_sync: BoolParam::new("Tempo Sync", false)
                .with_callback(publish_bool(&targets, ParameterId::TempoSync)),

            delay_note: EnumParam::new("Delay Note", NoteLength::default())
                .with_callback(publish_note(&targets)),

            bypass: BoolParam::new("Bypass", false)
                .make_bypass()
                .with_callback(publish_bool(&targets, ParameterId::Bypass)),
        }
    }
}
