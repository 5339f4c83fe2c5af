//! # Protect Your Ears
//!
//! A bug in a feedback loop can turn a delay into a very loud oscillator.
//! In debug builds the engine scans every output block and silences it if
//! anything looks wrong, logging why. This is a development aid only:
//! release builds skip the scan entirely.

use nih_plug::nih_debug_assert_failure;

/// Anything louder than this (about +6 dBFS) counts as a runaway signal.
pub const MAX_SAFE_LEVEL: f32 = 2.0;

/// What was wrong with a block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Hazard {
    NonFinite,
    TooLoud(f32),
}

/// Find the first hazardous sample in `channels`, if any.
pub fn scan(channels: &[&mut [f32]]) -> Option<Hazard> {
    for channel in channels {
        for &sample in channel.iter() {
            if !sample.is_finite() {
                return Some(Hazard::NonFinite);
            }
            if sample.abs() > MAX_SAFE_LEVEL {
                return Some(Hazard::TooLoud(sample));
            }
        }
    }
    None
}

/// Silence the whole block if it contains a hazard, and report it.
///
/// nih-plug turns the report into a panic under `cargo test` and into a
/// log line in a debug plugin build.
pub fn protect_your_ears(channels: &mut [&mut [f32]]) -> Option<Hazard> {
    let hazard = scan(channels)?;

    for channel in channels.iter_mut() {
        channel.fill(0.0);
    }

    match hazard {
        Hazard::NonFinite => nih_debug_assert_failure!("Non-finite sample in output, silencing"),
        Hazard::TooLoud(x) => nih_debug_assert_failure!("Output sample {} is too loud, silencing", x),
    }
    Some(hazard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_block_untouched() {
        let mut left = [0.1, -0.5, 1.0];
        let mut right = [0.0, 0.2, -1.9];
        let mut channels: [&mut [f32]; 2] = [&mut left, &mut right];

        assert_eq!(protect_your_ears(&mut channels), None);
        assert_eq!(left, [0.1, -0.5, 1.0]);
    }

    #[test]
    fn test_nan_detected() {
        let mut left = [0.1, f32::NAN, 0.3];
        let mut right = [0.5, 0.5, 0.5];
        let channels: [&mut [f32]; 2] = [&mut left, &mut right];

        assert_eq!(scan(&channels), Some(Hazard::NonFinite));
    }

    #[test]
    #[cfg_attr(debug_assertions, ignore = "the hazard report panics in debug test builds")]
    fn test_hazard_silences_block() {
        let mut left = [0.1, f32::INFINITY, 0.3];
        let mut right = [0.5, 0.5, 0.5];
        let mut channels: [&mut [f32]; 2] = [&mut left, &mut right];

        assert_eq!(protect_your_ears(&mut channels), Some(Hazard::NonFinite));
        assert_eq!(right, [0.0; 3]);
    }

    #[test]
    fn test_loud_sample_detected() {
        let mut mono = [0.0, 3.5];
        let channels: [&mut [f32]; 1] = [&mut mono];
        assert_eq!(scan(&channels), Some(Hazard::TooLoud(3.5)));
    }
}
