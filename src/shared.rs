//! # Sharing Values Between Threads
//!
//! A plugin runs on (at least) two threads: the **audio thread**, which
//! must never wait on anything, and a **control thread** (the GUI, host
//! automation) that changes parameters and reads meters.
//!
//! A mutex is out of the question on the audio thread: if the GUI holds
//! the lock at the wrong moment, the audio callback misses its deadline
//! and the user hears a dropout. Instead every shared value here is a
//! single `f32` stored in an `AtomicU32` (the float's bit pattern). One
//! thread writes, the other reads, and a read can never see half a write.

use std::sync::atomic::{AtomicU32, Ordering};

use crate::dsp::tempo::NoteLength;
use crate::params::{ParameterId, ParameterSnapshot};

/// An `f32` that can be shared between threads without locking.
#[derive(Debug)]
pub struct AtomicF32 {
    bits: AtomicU32,
}

impl AtomicF32 {
    pub fn new(value: f32) -> Self {
        Self {
            bits: AtomicU32::new(value.to_bits()),
        }
    }

    #[inline]
    pub fn store(&self, value: f32) {
        self.bits.store(value.to_bits(), Ordering::Release);
    }

    #[inline]
    pub fn load(&self) -> f32 {
        f32::from_bits(self.bits.load(Ordering::Acquire))
    }
}

impl Default for AtomicF32 {
    fn default() -> Self {
        Self::new(0.0)
    }
}

/// Parameter targets written by a control thread and read by the audio
/// thread.
///
/// Each parameter is its own atomic, indexed by [`ParameterId`]. The
/// audio thread copies them all into a [`ParameterSnapshot`] once per
/// block. Two targets changed "together" may land in different blocks,
/// which the engine's smoothing makes inaudible.
#[derive(Debug)]
pub struct ParameterTargets {
    values: [AtomicF32; ParameterId::COUNT],
}

impl Default for ParameterTargets {
    fn default() -> Self {
        Self {
            values: ParameterId::ALL.map(|id| AtomicF32::new(id.default_value())),
        }
    }
}

impl ParameterTargets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a target, clamped to the parameter's range. Safe from any thread.
    pub fn set(&self, id: ParameterId, value: f32) {
        self.values[id.index()].store(id.clamp(value));
    }

    pub fn get(&self, id: ParameterId) -> f32 {
        self.values[id.index()].load()
    }

    /// Overwrite every target with the values in `snapshot`.
    pub fn publish(&self, snapshot: &ParameterSnapshot) {
        let flag = |on: bool| if on { 1.0 } else { 0.0 };

        self.set(ParameterId::Gain, snapshot.gain_db);
        self.set(ParameterId::DelayTime, snapshot.delay_time_ms);
        self.set(ParameterId::Mix, snapshot.mix_percent);
        self.set(ParameterId::Feedback, snapshot.feedback_percent);
        self.set(ParameterId::Stereo, snapshot.stereo_percent);
        self.set(ParameterId::LowCut, snapshot.low_cut_hz);
        self.set(ParameterId::HighCut, snapshot.high_cut_hz);
        self.set(ParameterId::TempoSync, flag(snapshot.tempo_sync));
        self.set(ParameterId::DelayNote, snapshot.delay_note.index() as f32);
        self.set(ParameterId::Bypass, flag(snapshot.bypass));
    }

    /// Capture all targets at once (audio thread, start of block).
    pub fn snapshot(&self) -> ParameterSnapshot {
        ParameterSnapshot {
            gain_db: self.get(ParameterId::Gain),
            delay_time_ms: self.get(ParameterId::DelayTime),
            mix_percent: self.get(ParameterId::Mix),
            feedback_percent: self.get(ParameterId::Feedback),
            stereo_percent: self.get(ParameterId::Stereo),
            low_cut_hz: self.get(ParameterId::LowCut),
            high_cut_hz: self.get(ParameterId::HighCut),
            tempo_sync: self.get(ParameterId::TempoSync) >= 0.5,
            delay_note: NoteLength::from_index(self.get(ParameterId::DelayNote).round() as usize),
            bypass: self.get(ParameterId::Bypass) >= 0.5,
        }
    }
}

/// Per-channel peak levels of the most recent block.
///
/// Written by the audio thread at the end of every block (continuously
/// overwritten, not reset on read); read by the GUI.
#[derive(Debug, Default)]
pub struct PeakMeters {
    left: AtomicF32,
    right: AtomicF32,
}

impl PeakMeters {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn store(&self, left: f32, right: f32) {
        self.left.store(left);
        self.right.store(right);
    }

    pub fn left(&self) -> f32 {
        self.left.load()
    }

    pub fn right(&self) -> f32 {
        self.right.load()
    }
}
