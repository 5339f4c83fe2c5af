//! # Tempo Sync
//!
//! Musicians rarely think of echoes in milliseconds. They think "an
//! eighth-note echo" or "a dotted quarter". Tempo sync converts such a
//! note length into a delay time using the host's current tempo:
//!
//! ```text
//! quarter_ms = 60000 / bpm
//! delay_ms   = quarter_ms * (length relative to a quarter note)
//! ```
//!
//! At 120 BPM a quarter note is 500 ms, an eighth 250 ms, and so on.
//! Triplets fit three notes in the space of two (× 2/3) and dotted notes
//! add half their own length (× 1.5).

use nih_plug::prelude::Enum;

/// The selectable note lengths, in parameter-index order.
#[derive(Enum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NoteLength {
    #[id = "1/32"]
    #[name = "1/32"]
    ThirtySecond,
    #[id = "1/32t"]
    #[name = "1/32 trip"]
    ThirtySecondTriplet,
    #[id = "1/16"]
    #[name = "1/16"]
    Sixteenth,
    #[id = "1/16t"]
    #[name = "1/16 trip"]
    SixteenthTriplet,
    #[id = "1/16d"]
    #[name = "1/16 dot"]
    SixteenthDotted,
    #[id = "1/8"]
    #[name = "1/8"]
    Eighth,
    #[id = "1/8t"]
    #[name = "1/8 trip"]
    EighthTriplet,
    #[id = "1/8d"]
    #[name = "1/8 dot"]
    EighthDotted,
    #[id = "1/4"]
    #[name = "1/4"]
    #[default]
    Quarter,
    #[id = "1/4t"]
    #[name = "1/4 trip"]
    QuarterTriplet,
    #[id = "1/4d"]
    #[name = "1/4 dot"]
    QuarterDotted,
    #[id = "1/2"]
    #[name = "1/2"]
    Half,
    #[id = "1/2t"]
    #[name = "1/2 trip"]
    HalfTriplet,
    #[id = "1/2d"]
    #[name = "1/2 dot"]
    HalfDotted,
    #[id = "1/1"]
    #[name = "1/1"]
    Whole,
    #[id = "1/1t"]
    #[name = "1/1 trip"]
    WholeTriplet,
}

impl NoteLength {
    pub const COUNT: usize = 16;

    const ALL: [NoteLength; Self::COUNT] = [
        NoteLength::ThirtySecond,
        NoteLength::ThirtySecondTriplet,
        NoteLength::Sixteenth,
        NoteLength::SixteenthTriplet,
        NoteLength::SixteenthDotted,
        NoteLength::Eighth,
        NoteLength::EighthTriplet,
        NoteLength::EighthDotted,
        NoteLength::Quarter,
        NoteLength::QuarterTriplet,
        NoteLength::QuarterDotted,
        NoteLength::Half,
        NoteLength::HalfTriplet,
        NoteLength::HalfDotted,
        NoteLength::Whole,
        NoteLength::WholeTriplet,
    ];

    /// Look up a note length by parameter index, saturating at the ends.
    pub fn from_index(index: usize) -> Self {
        Self::ALL[index.min(Self::COUNT - 1)]
    }

    /// Position in the parameter list.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Length in quarter notes (beats).
    pub fn beats(self) -> f64 {
        const TRIPLET: f64 = 2.0 / 3.0;
        const DOTTED: f64 = 1.5;

        match self {
            NoteLength::ThirtySecond => 0.125,
            NoteLength::ThirtySecondTriplet => 0.125 * TRIPLET,
            NoteLength::Sixteenth => 0.25,
            NoteLength::SixteenthTriplet => 0.25 * TRIPLET,
            NoteLength::SixteenthDotted => 0.25 * DOTTED,
            NoteLength::Eighth => 0.5,
            NoteLength::EighthTriplet => 0.5 * TRIPLET,
            NoteLength::EighthDotted => 0.5 * DOTTED,
            NoteLength::Quarter => 1.0,
            NoteLength::QuarterTriplet => TRIPLET,
            NoteLength::QuarterDotted => DOTTED,
            NoteLength::Half => 2.0,
            NoteLength::HalfTriplet => 2.0 * TRIPLET,
            NoteLength::HalfDotted => 2.0 * DOTTED,
            NoteLength::Whole => 4.0,
            NoteLength::WholeTriplet => 4.0 * TRIPLET,
        }
    }
}

/// What the host told us about musical time for the current block.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HostTimeline {
    /// Tempo in beats per minute, if the host reports one.
    pub tempo: Option<f64>,
    /// Whether the host transport is running.
    pub playing: bool,
}

/// Converts the host tempo and a note length into a delay time.
///
/// Rebuilt once per block by [`update()`](Self::update); the resulting
/// note table is shared by every sample of the block.
#[derive(Debug, Clone)]
pub struct TempoSync {
    bpm: f64,
    playing: bool,
    default_bpm: f64,
    max_delay_ms: f32,
    /// Milliseconds for every [`NoteLength`], already clamped.
    note_table: [f32; NoteLength::COUNT],
}

impl TempoSync {
    /// `default_bpm` is used whenever the host can't tell us the tempo.
    /// Every result is clamped to `max_delay_ms`.
    pub fn new(default_bpm: f64, max_delay_ms: f32) -> Self {
        let mut tempo = Self {
            bpm: default_bpm,
            playing: false,
            default_bpm,
            max_delay_ms,
            note_table: [0.0; NoteLength::COUNT],
        };
        tempo.rebuild_table();
        tempo
    }

    /// Forget the last host tempo and fall back to the default.
    pub fn reset(&mut self) {
        self.bpm = self.default_bpm;
        self.playing = false;
        self.rebuild_table();
    }

    /// Read the tempo from the host. Call once per block.
    ///
    /// Missing, zero, negative or non-finite tempos fall back to the
    /// default BPM rather than producing absurd delay times.
    pub fn update(&mut self, timeline: &HostTimeline) {
        self.playing = timeline.playing;

        let bpm = match timeline.tempo {
            Some(bpm) if bpm.is_finite() && bpm > 0.0 => bpm,
            _ => self.default_bpm,
        };

        if bpm != self.bpm {
            self.bpm = bpm;
            self.rebuild_table();
        }
    }

    /// The delay time in milliseconds for a note length at the current tempo.
    pub fn milliseconds_for_note(&self, note: NoteLength) -> f32 {
        self.note_table[note.index()]
    }

    /// The tempo currently in effect.
    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    /// Whether the host transport was running during the last update.
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    fn rebuild_table(&mut self) {
        let quarter_ms = 60_000.0 / self.bpm;
        for (slot, note) in self.note_table.iter_mut().zip(NoteLength::ALL) {
            let ms = (quarter_ms * note.beats()) as f32;
            *slot = ms.clamp(0.0, self.max_delay_ms);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn at_bpm(bpm: f64) -> TempoSync {
        let mut tempo = TempoSync::new(120.0, 5000.0);
        tempo.update(&HostTimeline {
            tempo: Some(bpm),
            playing: true,
        });
        tempo
    }

    #[test]
    fn test_note_lengths_at_120_bpm() {
        let tempo = at_bpm(120.0);

        let quarter = tempo.milliseconds_for_note(NoteLength::Quarter);
        assert!((quarter - 500.0).abs() < 1e-3, "Quarter: {quarter}");

        let dotted = tempo.milliseconds_for_note(NoteLength::QuarterDotted);
        assert!((dotted - 750.0).abs() < 1e-3, "Dotted quarter: {dotted}");

        let triplet = tempo.milliseconds_for_note(NoteLength::EighthTriplet);
        assert!((triplet - 166.666_67).abs() < 1e-2, "Triplet eighth: {triplet}");

        let whole = tempo.milliseconds_for_note(NoteLength::Whole);
        assert!((whole - 2000.0).abs() < 1e-3, "Whole: {whole}");
    }

    #[test]
    fn test_index_order_matches_enum() {
        for index in 0..NoteLength::COUNT {
            assert_eq!(NoteLength::from_index(index).index(), index);
        }
        assert_eq!(NoteLength::from_index(8), NoteLength::Quarter);
        assert_eq!(NoteLength::default(), NoteLength::Quarter);
        assert_eq!(NoteLength::from_index(99), NoteLength::WholeTriplet);
    }

    /// Without a host tempo we fall back to the default instead of failing.
    #[test]
    fn test_missing_tempo_uses_default() {
        let mut tempo = TempoSync::new(90.0, 5000.0);
        tempo.update(&HostTimeline::default());
        assert_eq!(tempo.bpm(), 90.0);

        for bad in [0.0, -10.0, f64::NAN, f64::INFINITY] {
            tempo.update(&HostTimeline {
                tempo: Some(bad),
                playing: false,
            });
            assert_eq!(tempo.bpm(), 90.0, "Tempo {bad} should fall back");
        }
    }

    /// Very slow tempos saturate at the maximum delay time.
    #[test]
    fn test_clamped_to_max_delay() {
        let tempo = at_bpm(20.0); // whole note = 12 s
        assert_eq!(tempo.milliseconds_for_note(NoteLength::Whole), 5000.0);
        assert_eq!(tempo.milliseconds_for_note(NoteLength::WholeTriplet), 5000.0);
    }

    #[test]
    fn test_update_tracks_transport() {
        let mut tempo = TempoSync::new(120.0, 5000.0);
        assert!(!tempo.is_playing());
        tempo.update(&HostTimeline {
            tempo: Some(140.0),
            playing: true,
        });
        assert!(tempo.is_playing());

        tempo.reset();
        assert!(!tempo.is_playing());
        assert_eq!(tempo.bpm(), 120.0);
    }
}
