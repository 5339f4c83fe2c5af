//! # Fractional Delay Line (Ring Buffer)
//!
//! A delay line stores audio samples and lets you read them back after a
//! specified time delay. Imagine a circular tape loop: a write head records
//! incoming audio and a read head plays it back from a position further
//! behind on the tape. The distance between the two heads is the delay.
//!
//! In code, the "tape" is a `Vec<f32>` and the write head is an index that
//! always points at the most recently written sample:
//!
//! ```text
//!            read(3.0)          write cursor
//!                ▼                   ▼
//!   ┌────┬────┬────┬────┬────┬────┬────┬────┐
//!   │    │    │ x3 │ x2 │ x1 │    │ x0 │    │   ...wraps around
//!   └────┴────┴────┴────┴────┴────┴────┴────┘
//! ```
//!
//! `read(0.0)` therefore returns the sample just written, and `read(d)`
//! returns the sample written `d` calls to `write()` ago.
//!
//! ## Linear Interpolation
//!
//! When the delay isn't a whole number of samples (e.g. 441.3 samples for
//! 10.007 ms at 44.1 kHz) we blend the two neighbouring samples:
//!
//! ```text
//! result = a + frac * (b - a)
//! ```
//!
//! where `a` is the sample `floor(d)` back and `b` the one after it. This
//! lets the delay time sweep smoothly without "zipper" artefacts.

/// A circular buffer of past samples with fractional read access.
///
/// The buffer is allocated in [`set_maximum_delay_in_samples()`] during
/// `prepare`, so no memory allocation ever happens during audio
/// processing.
///
/// [`set_maximum_delay_in_samples()`]: Self::set_maximum_delay_in_samples
#[derive(Debug, Clone, Default)]
pub struct DelayLine {
    /// The circular buffer storing audio samples.
    buffer: Vec<f32>,

    /// Index of the most recently written sample.
    write_pos: usize,
}

impl DelayLine {
    /// Create a delay line that can delay by up to `max_delay` samples.
    pub fn new(max_delay: usize) -> Self {
        let mut dl = Self::default();
        dl.set_maximum_delay_in_samples(max_delay);
        dl
    }

    /// (Re)allocate the buffer so that delays of up to `max_delay` samples
    /// can be read.
    ///
    /// One extra slot holds the current sample, so the capacity is
    /// `max_delay + 1`. The buffer is cleared. Never call this from the
    /// audio thread: it may allocate.
    pub fn set_maximum_delay_in_samples(&mut self, max_delay: usize) {
        let capacity = max_delay.saturating_add(1);
        self.buffer.clear();
        self.buffer.resize(capacity, 0.0);
        self.reset();
    }

    /// Number of samples the buffer holds.
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Fill the buffer with silence and rewind the cursor.
    ///
    /// Called on plugin `reset()` so stale audio doesn't bleed into the
    /// next playback.
    pub fn reset(&mut self) {
        self.buffer.fill(0.0);
        // The first write lands on index 0.
        self.write_pos = self.buffer.len().saturating_sub(1);
    }

    /// Advance the cursor and store `sample` there.
    #[inline]
    pub fn write(&mut self, sample: f32) {
        let len = self.buffer.len();
        if len == 0 {
            return;
        }
        self.write_pos += 1;
        if self.write_pos >= len {
            self.write_pos = 0;
        }
        self.buffer[self.write_pos] = sample;
    }

    /// Read the sample written `delay_samples` writes ago, interpolating
    /// linearly for fractional delays.
    ///
    /// The delay is clamped to `[0, capacity - 1]`, so the read never
    /// reaches memory that has already been overwritten. NaN reads as 0.
    #[inline]
    pub fn read(&self, delay_samples: f32) -> f32 {
        let len = self.buffer.len();
        if len == 0 {
            return 0.0;
        }

        let max = (len - 1) as f32;
        let delay = if delay_samples.is_nan() {
            0.0
        } else {
            delay_samples.clamp(0.0, max)
        };

        // For delay = 441.3: delay_int = 441, frac = 0.3
        let delay_int = delay as usize;
        let frac = delay - delay_int as f32;

        // `+ len` keeps the subtraction from going below zero.
        let index_a = (self.write_pos + len - delay_int) % len;
        let index_b = if index_a == 0 { len - 1 } else { index_a - 1 };

        let a = self.buffer[index_a];
        let b = self.buffer[index_b];
        a + frac * (b - a)
    }
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────
