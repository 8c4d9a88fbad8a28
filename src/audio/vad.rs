//! Amplitude-threshold Voice Activity Detection (VAD).
//!
//! [`VadDetector`] regroups incoming mono frames into fixed-size analysis
//! windows and classifies each window by its mean absolute amplitude.  The
//! capture session turns the resulting voiced/unvoiced sequence into
//! recording start/stop transitions.
//!
//! ## Algorithm
//!
//! A window is *voiced* when `mean(|s|)` over its samples is strictly greater
//! than the configured threshold.  Device buffers rarely line up with the
//! window size, so leftover samples are carried into the next call.

// ---------------------------------------------------------------------------
// AnalysedWindow
// ---------------------------------------------------------------------------

/// One fixed-size window of audio together with its VAD decision.
#[derive(Debug, Clone)]
pub struct AnalysedWindow {
    pub samples: Vec<f32>,
    /// Mean absolute amplitude of `samples`.
    pub level: f32,
    /// `level > threshold`.
    pub voiced: bool,
}

// ---------------------------------------------------------------------------
// VadDetector
// ---------------------------------------------------------------------------

/// Energy-based speech detector operating on fixed-size windows.
///
/// # Example
///
/// ```rust
/// use loan_voice::audio::VadDetector;
///
/// let mut vad = VadDetector::new(0.02, 4);
///
/// let windows = vad.feed(&[0.0, 0.0, 0.0, 0.0, 0.5, 0.5]);
/// assert_eq!(windows.len(), 1);      // two samples are carried over
/// assert!(!windows[0].voiced);
///
/// let windows = vad.feed(&[0.5, 0.5]);
/// assert!(windows[0].voiced);
/// ```
#[derive(Debug, Clone)]
pub struct VadDetector {
    threshold: f32,
    window: usize,
    pending: Vec<f32>,
}

impl VadDetector {
    /// Create a detector with the given mean-absolute-amplitude threshold and
    /// window size in samples.
    ///
    /// # Panics
    ///
    /// Panics if `window == 0`.
    pub fn new(threshold: f32, window: usize) -> Self {
        assert!(window > 0, "window must be > 0");
        Self {
            threshold,
            window,
            pending: Vec::with_capacity(window),
        }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn window_size(&self) -> usize {
        self.window
    }

    /// Mean absolute amplitude; `0.0` for an empty slice.
    pub fn mean_abs_amplitude(samples: &[f32]) -> f32 {
        if samples.is_empty() {
            return 0.0;
        }
        samples.iter().map(|s| s.abs()).sum::<f32>() / samples.len() as f32
    }

    /// Returns `true` when `samples` is loud enough to count as speech.
    pub fn is_voice(&self, samples: &[f32]) -> bool {
        Self::mean_abs_amplitude(samples) > self.threshold
    }

    /// Append `samples` and return every window completed by them, in order.
    pub fn feed(&mut self, samples: &[f32]) -> Vec<AnalysedWindow> {
        self.pending.extend_from_slice(samples);

        let complete = self.pending.len() / self.window;
        if complete == 0 {
            return Vec::new();
        }

        let rest = self.pending.split_off(complete * self.window);
        let ready = std::mem::replace(&mut self.pending, rest);

        ready
            .chunks(self.window)
            .map(|chunk| {
                let level = Self::mean_abs_amplitude(chunk);
                AnalysedWindow {
                    samples: chunk.to_vec(),
                    level,
                    voiced: level > self.threshold,
                }
            })
            .collect()
    }

    /// Take the carried-over partial window, leaving the detector empty.
    pub fn take_pending(&mut self) -> Vec<f32> {
        std::mem::take(&mut self.pending)
    }

    /// Discard any carried-over samples.
    pub fn reset(&mut self) {
        self.pending.clear();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
