//! Optional observability hook and running statistics
//!
//! Nothing here affects limiting. Hosts that want per-block diagnostics
//! (gain trajectory, safety-clip activity) install a [`BlockObserver`].

/// Summary of one emitted block
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockReport {
    /// Zero-based emission index since the last reset
    pub sequence: u64,
    /// Applied scale factor (smallest per-sample gain for the per-sample strategy)
    pub gain: f64,
    /// Largest raw block peak in the window the decision was made from
    pub window_peak: f64,
    /// Samples the safety clipper modified
    pub clipped_samples: usize,
    /// Emitted by `flush()` rather than `push()`
    pub flushing: bool,
}

/// Sink for per-block reports
///
/// Implemented for any `FnMut(&BlockReport) + Send` closure.
pub trait BlockObserver: Send {
    fn on_block(&mut self, report: &BlockReport);
}

impl<F> BlockObserver for F
where
    F: FnMut(&BlockReport) + Send,
{
    fn on_block(&mut self, report: &BlockReport) {
        self(report);
    }
}

/// Running counters since the last reset
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LimiterStats {
    /// Blocks accepted by `push()`
    pub blocks_in: u64,
    /// Blocks emitted by `push()` and `flush()`
    pub blocks_out: u64,
    /// Samples modified by the safety clipper
    pub clipped_samples: u64,
    /// Smallest gain applied so far (1.0 = no reduction)
    pub min_gain: f64,
}

impl LimiterStats {
    /// Smallest gain expressed in dB (0.0 = no reduction)
    pub fn max_gain_reduction_db(&self) -> f64 {
        20.0 * self.min_gain.log10()
    }
}

impl Default for LimiterStats {
    fn default() -> Self {
        Self {
            blocks_in: 0,
            blocks_out: 0,
            clipped_samples: 0,
            min_gain: 1.0,
        }
    }
}
