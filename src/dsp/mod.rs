//! # DSP (Digital Signal Processing) Primitives
//!
//! The building blocks the [`DelayEngine`](crate::engine::DelayEngine)
//! wires together:
//!
//! - **`smoother`**: per-sample ramps so parameter changes never click.
//! - **`tempo`**: host tempo + note length → delay time in milliseconds.
//! - **`delay_line`**: a ring buffer with fractional (interpolated) reads.
//! - **`delay_time`**: the glide and jump strategies for moving the tap.
//! - **`filter`**: the highpass → lowpass stage that shapes the repeats.
//! - **`pan`**: the equal-power pan law used for stereo width.
//! - **`safety`**: a debug-only output scan that mutes runaway signals.

pub mod delay_line;
pub mod delay_time;
pub mod filter;
pub mod pan;
pub mod safety;
pub mod smoother;
pub mod tempo;
