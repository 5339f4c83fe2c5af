//! # Loveless Delay v2 — A Tempo-Synced Ping-Pong Delay
//!
//! The second Loveless delay, built with [nih-plug](https://github.com/robbert-vdh/nih-plug).
//! Outputs Audio Unit (AUv2), VST3, and CLAP formats from a single
//! codebase. Compared to v1 it adds tempo sync, a stereo ping-pong
//! feedback path with a width control, a highpass + lowpass pair on the
//! repeats, an output gain, and click-free bypass.
//!
//! ## Signal Flow
//!
//! ```text
//! Input ──┬─────────────────────────────────────────────────────────┐ dry
//!         │                                                         │
//!         └──► mono ──► [pan] ──►(+)──► [Delay Lines L/R] ──┬──► wet │
//!                                 ▲      (ping-pong)        │     │  │
//!                                 │                         │     ▼  ▼
//!                                 └── [Low Cut → High Cut] ◄┘   mix(dry, wet)
//!                                          × feedback              │
//!                                                              × gain ──► Output
//! ```
//!
//! ## Where things live
//!
//! - [`params`]: the parameters the host sees, and the per-block snapshot.
//! - [`engine`]: the delay itself, independent of any plugin API.
//! - [`controls`]: per-sample smoothing of every control.
//! - [`config`]: fixed settings of an engine instance.
//! - [`shared`]: lock-free values shared with other threads (parameter
//!   targets, meters).
//! - [`dsp`]: the building blocks (delay line, filters, tempo math, ...).

pub mod config;
pub mod controls;
pub mod dsp;
pub mod engine;
pub mod params;
pub mod shared;

use std::num::NonZeroU32;
use std::sync::Arc;

use nih_plug::prelude::*;

use dsp::tempo::HostTimeline;
use engine::DelayEngine;
use params::{ParameterSnapshot, PluginParams};
use shared::ParameterTargets;

/// The main plugin struct.
///
/// ## Why separate the engine from the plugin?
///
/// Everything nih-plug specific (parameters, layouts, transport) stays in
/// this file. The [`DelayEngine`] only sees plain numbers: a parameter
/// snapshot, the host tempo, and slices of samples. That keeps the DSP
/// testable without a host, and lets two plugin instances run engines
/// with different configurations side by side.
pub struct LovelessDelay {
    /// Shared with the host via `Arc` so the host can read and automate
    /// parameters from any thread.
    params: Arc<PluginParams>,

    /// The parameters' plain values, published by their callbacks and read
    /// by the audio thread once per block.
    targets: Arc<ParameterTargets>,

    /// Owned exclusively by the audio thread.
    engine: DelayEngine,

    /// How many of the buffer's channels carry input (1 for mono → stereo).
    num_input_channels: usize,
}

impl Default for LovelessDelay {
    fn default() -> Self {
        let targets = Arc::new(ParameterTargets::new());
        Self {
            params: Arc::new(PluginParams::new(Arc::clone(&targets))),
            targets,
            engine: DelayEngine::default(),
            num_input_channels: 2,
        }
    }
}

impl LovelessDelay {
    /// Peak meters for an editor or any other reader thread.
    pub fn meters(&self) -> Arc<shared::PeakMeters> {
        self.engine.meters()
    }
}

impl Plugin for LovelessDelay {
    const NAME: &'static str = "Loveless Delay v2";
    const VENDOR: &'static str = "Loveless Audio";
    const URL: &'static str = "";
    const EMAIL: &'static str = "steve.loveless@gmail.com";
    const VERSION: &'static str = env!("CARGO_PKG_VERSION");

    // Supported audio channel layouts. The host will pick the first
    // layout that matches the track configuration.
    //
    // Most DAW tracks are stereo, so that comes first. A mono source on a
    // stereo bus gets the mono → stereo layout; a mono track stays mono.
    const AUDIO_IO_LAYOUTS: &'static [AudioIOLayout] = &[
        // Stereo layout
        AudioIOLayout {
            main_input_channels: NonZeroU32::new(2),
            main_output_channels: NonZeroU32::new(2),
            aux_input_ports: &[],
            aux_output_ports: &[],
            names: PortNames::const_default(),
        },
        // Mono in, stereo out
        AudioIOLayout {
            main_input_channels: NonZeroU32::new(1),
            main_output_channels: NonZeroU32::new(2),
            aux_input_ports: &[],
            aux_output_ports: &[],
            names: PortNames::const_default(),
        },
        // Mono fallback
        AudioIOLayout {
            main_input_channels: NonZeroU32::new(1),
            main_output_channels: NonZeroU32::new(1),
            aux_input_ports: &[],
            aux_output_ports: &[],
            names: PortNames::const_default(),
        },
    ];

    const MIDI_INPUT: MidiConfig = MidiConfig::None;

    // Parameter changes land at the sample the host scheduled them. Each
    // sub-block gets its own snapshot, and the engine's smoothers ramp
    // from there.
    const SAMPLE_ACCURATE_AUTOMATION: bool = true;

    type SysExMessage = ();
    type BackgroundTask = ();

    fn params(&self) -> Arc<dyn Params> {
        self.params.clone()
    }

    /// Called when the plugin is first loaded, or when the audio
    /// configuration changes. This is where the delay buffers are
    /// allocated: their size depends on the sample rate, and allocating
    /// inside `process()` is not allowed.
    ///
    /// # Return value
    ///
    /// `false` tells the host we can't work with this configuration: a
    /// layout we never advertised, or a sample rate the engine rejects.
    fn initialize(
        &mut self,
        audio_io_layout: &AudioIOLayout,
        buffer_config: &BufferConfig,
        _context: &mut impl InitContext<Self>,
    ) -> bool {
        let num_inputs = audio_io_layout
            .main_input_channels
            .map(|c| c.get() as usize)
            .unwrap_or(0);
        let num_outputs = audio_io_layout
            .main_output_channels
            .map(|c| c.get() as usize)
            .unwrap_or(0);

        if engine::ChannelLayout::resolve(num_inputs, num_outputs).is_none() || num_outputs > 2 {
            nih_warn!("Unsupported layout: {} in, {} out", num_inputs, num_outputs);
            return false;
        }
        self.num_input_channels = num_inputs;

        self.engine
            .prepare(buffer_config.sample_rate, buffer_config.max_buffer_size as usize);
        if !self.engine.is_prepared() {
            return false;
        }
        self.reset();

        nih_log!(
            "Initialized at {} Hz, {} in / {} out, up to {} samples per block",
            buffer_config.sample_rate,
            num_inputs,
            num_outputs,
            buffer_config.max_buffer_size
        );

        true
    }

    /// Called when playback stops or the plugin is re-activated.
    ///
    /// Clears all echoes so stale audio doesn't bleed into the next
    /// playback, and snaps every control to its current value.
    fn reset(&mut self) {
        let snapshot = ParameterSnapshot::from_params(&self.params);
        self.targets.publish(&snapshot);
        self.engine.reset(&snapshot);
    }

    fn process(
        &mut self,
        buffer: &mut Buffer,
        _aux: &mut AuxiliaryBuffers,
        context: &mut impl ProcessContext<Self>,
    ) -> ProcessStatus {
        let snapshot = self.targets.snapshot();

        let transport = context.transport();
        let timeline = HostTimeline {
            tempo: transport.tempo,
            playing: transport.playing,
        };

        self.engine.process_block(
            buffer.as_slice(),
            self.num_input_channels,
            &snapshot,
            &timeline,
        );

        // Tell the host how long the echoes keep ringing so it keeps
        // calling process() after the input goes silent. With (almost)
        // 100% feedback they never stop.
        match self.engine.tail_samples() {
            Some(samples) => ProcessStatus::Tail(samples),
            None => ProcessStatus::KeepAlive,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────
// Plugin format trait implementations
// ─────────────────────────────────────────────────────────────────────

impl ClapPlugin for LovelessDelay {
    // A reverse-domain-notation ID, unique to this plugin.
    const CLAP_ID: &'static str = "com.loveless-audio.loveless-delay-v2";
    const CLAP_DESCRIPTION: Option<&'static str> =
        Some("A tempo-synced stereo ping-pong delay with filtered feedback");
    const CLAP_MANUAL_URL: Option<&'static str> = None;
    const CLAP_SUPPORT_URL: Option<&'static str> = None;
    const CLAP_FEATURES: &'static [ClapFeature] = &[
        ClapFeature::AudioEffect,
        ClapFeature::Stereo,
        ClapFeature::Mono,
        ClapFeature::Delay,
    ];
}

impl Vst3Plugin for LovelessDelay {
    // 16 ASCII bytes, distinct from v1 so both can be installed together.
    const VST3_CLASS_ID: [u8; 16] = *b"LvlssDelay__v002";

    const VST3_SUBCATEGORIES: &'static [Vst3SubCategory] =
        &[Vst3SubCategory::Fx, Vst3SubCategory::Delay, Vst3SubCategory::Stereo];
}

// ─────────────────────────────────────────────────────────────────────
// Export macros
// ─────────────────────────────────────────────────────────────────────
//
// nih_export_clap! exports the `clap_entry` symbol for CLAP hosts.
// nih_export_vst3! exports `GetPluginFactory` for VST3 hosts.

nih_export_clap!(LovelessDelay);
nih_export_vst3!(LovelessDelay);

// Wrap the CLAP plugin into AUv2 format for Logic Pro.
clap_wrapper::export_auv2!();

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layouts_resolve() {
        for layout in LovelessDelay::AUDIO_IO_LAYOUTS {
            let inputs = layout.main_input_channels.map(|c| c.get() as usize).unwrap_or(0);
            let outputs = layout.main_output_channels.map(|c| c.get() as usize).unwrap_or(0);
            assert!(
                engine::ChannelLayout::resolve(inputs, outputs).is_some(),
                "{inputs} in / {outputs} out has no engine layout"
            );
        }
    }

    /// The callbacks of the plugin's parameter tree feed the same targets
    /// the audio thread reads.
    #[test]
    fn test_params_publish_to_plugin_targets() {
        let plugin = LovelessDelay::default();
        assert_eq!(
            plugin.targets.snapshot(),
            ParameterSnapshot::from_params(&plugin.params)
        );

        let changed = ParameterSnapshot {
            feedback_percent: 60.0,
            ..Default::default()
        };
        plugin.targets.publish(&changed);
        assert_eq!(plugin.targets.snapshot().feedback_percent, 60.0);
    }

    #[test]
    fn test_default_plugin_meters_start_silent() {
        let plugin = LovelessDelay::default();
        let meters = plugin.meters();
        assert_eq!(meters.left(), 0.0);
        assert_eq!(meters.right(), 0.0);
    }
}
