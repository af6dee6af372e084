//! Streaming lookahead limiter
//!
//! Holds the last `lookahead_depth` pushed blocks in a ring together with
//! each block's raw peak envelope. Once the ring is full, every push emits
//! the oldest block, limited with knowledge of all blocks behind it.
//!
//! ```text
//!   push ──► [ B(n-3) | B(n-2) | B(n-1) | B(n) ] ──► limit oldest ──► emit
//!              oldest                      newest
//! ```
//!
//! Output rate equals input rate after warm-up, with a constant delay of
//! `lookahead_depth - 1` blocks. [`LookaheadLimiter::flush`] drains the
//! remaining blocks at end of stream using a shrinking window.
//!
//! # Real-Time Safety
//! - Ring, peak cache, output and per-sample scratch are allocated in `new()`
//! - No allocations in `push()` or `flush()`
//! - Not `Sync`: one owner drives an instance; separate instances are independent

use tracing::{debug, trace};

use crate::error::{LimiterError, Result};
use crate::observer::{BlockObserver, BlockReport, LimiterStats};
use crate::sample::{block_peak, first_non_finite, IqSample};
use crate::settings::LimiterSettings;
use crate::window::{
    apply_block_scale, apply_per_sample_gain, block_scale, forward_max, window_peak,
    SlidingScratch,
};

const SILENCE: IqSample = IqSample::new(0.0, 0.0);

/// Lifecycle phase of a [`LookaheadLimiter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Fewer than `lookahead_depth` blocks admitted; pushes emit nothing
    Filling,
    /// Ring full; one block out per block in
    Steady,
    /// `flush()` called; pushes are refused until `reset()`
    Flushing,
}

/// Lookahead envelope limiter for a stream of fixed-size I/Q blocks
///
/// # Example
///
/// ```
/// use cessb_limiter::{IqSample, LimiterSettings, LookaheadLimiter};
///
/// let settings = LimiterSettings::default()
///     .with_block_size(4)
///     .with_lookahead_depth(2)
///     .with_target(1.0)
///     .with_hard_clip_ceiling(None);
/// let mut limiter = LookaheadLimiter::new(settings)?;
///
/// let quiet = [IqSample::new(0.1, 0.0); 4];
/// let loud = [IqSample::new(2.0, 0.0); 4];
///
/// assert!(limiter.push(&quiet)?.is_none()); // warming up
/// let out = limiter.push(&loud)?.unwrap();  // quiet block, pre-attenuated
/// assert!((out[0].re - 0.05).abs() < 1e-12);
///
/// while let Some(block) = limiter.flush() {
///     assert!(block.iter().all(|s| s.norm() <= 1.0 + 1e-12));
/// }
/// # Ok::<(), cessb_limiter::LimiterError>(())
/// ```
pub struct LookaheadLimiter {
    settings: LimiterSettings,
    /// `lookahead_depth` slots of `block_size` samples each
    ring: Vec<IqSample>,
    /// Raw peak envelope per slot, set once when the block is admitted
    peaks: Vec<f64>,
    /// Slot the next pushed block is written to
    write: usize,
    /// Blocks currently held (oldest is `resident` slots behind `write`)
    resident: usize,
    /// Blocks admitted since reset
    admitted: u64,
    phase: Phase,
    output: Vec<IqSample>,
    scratch: SlidingScratch,
    stats: LimiterStats,
    observer: Option<Box<dyn BlockObserver>>,
}

impl LookaheadLimiter {
    /// Create a limiter, refusing invalid settings
    pub fn new(settings: LimiterSettings) -> Result<Self> {
        settings.validate()?;

        let window_len = settings.window_len();
        let scratch = match settings.effective_span() {
            Some(span) => SlidingScratch::try_new(window_len, span)?,
            None => SlidingScratch::try_new(0, 1)?,
        };

        debug!(
            "Created lookahead limiter: block_size={}, depth={}, target={}, ceiling={}, strategy={:?}, clipper={:?}",
            settings.block_size,
            settings.lookahead_depth,
            settings.target,
            settings.ceiling(),
            settings.strategy,
            settings.clipper
        );

        Ok(Self {
            ring: vec![SILENCE; window_len],
            peaks: vec![0.0; settings.lookahead_depth],
            write: 0,
            resident: 0,
            admitted: 0,
            phase: Phase::Filling,
            output: vec![SILENCE; settings.block_size],
            scratch,
            stats: LimiterStats::default(),
            observer: None,
            settings,
        })
    }

    /// Return to `Filling` with an all-zero ring, keeping allocations and observer
    pub fn reset(&mut self) {
        self.ring.fill(SILENCE);
        self.peaks.fill(0.0);
        self.output.fill(SILENCE);
        self.write = 0;
        self.resident = 0;
        self.admitted = 0;
        self.phase = Phase::Filling;
        self.stats = LimiterStats::default();
        debug!("Lookahead limiter reset");
    }

    /// Admit one block; emit the limited oldest block once the ring is full
    ///
    /// Returns `Ok(None)` while filling. The returned slice borrows an internal
    /// buffer that is overwritten by the next `push()` or `flush()`.
    ///
    /// A block of the wrong length, a block holding NaN or infinite components,
    /// or any push after `flush()`, is rejected without touching state.
    pub fn push(&mut self, block: &[IqSample]) -> Result<Option<&[IqSample]>> {
        if self.phase == Phase::Flushing {
            return Err(LimiterError::Flushed);
        }
        let block_size = self.settings.block_size;
        if block.len() != block_size {
            return Err(LimiterError::BlockLength {
                expected: block_size,
                actual: block.len(),
            });
        }
        if let Some(index) = first_non_finite(block) {
            return Err(LimiterError::NonFiniteSample { index });
        }

        let slot = self.write;
        self.ring[slot * block_size..(slot + 1) * block_size].copy_from_slice(block);
        self.peaks[slot] = block_peak(block);
        self.write = (slot + 1) % self.settings.lookahead_depth;
        self.resident += 1;
        self.admitted += 1;
        self.stats.blocks_in += 1;

        if self.resident < self.settings.lookahead_depth {
            return Ok(None);
        }

        self.phase = Phase::Steady;
        self.emit_oldest(false);
        Ok(Some(self.output.as_slice()))
    }

    /// Drain one resident block, limited against the blocks still behind it
    ///
    /// Returns `None` once the ring is empty; safe to call repeatedly. After the
    /// first call the instance refuses pushes until [`reset`](Self::reset).
    pub fn flush(&mut self) -> Option<&[IqSample]> {
        if self.phase != Phase::Flushing {
            debug!(
                "Flushing lookahead limiter with {} resident blocks",
                self.resident
            );
            self.phase = Phase::Flushing;
        }
        if self.resident == 0 {
            return None;
        }

        self.emit_oldest(true);
        if self.resident == 0 {
            debug!(
                "Lookahead limiter drained: {} blocks in, {} blocks out",
                self.stats.blocks_in, self.stats.blocks_out
            );
        }
        Some(self.output.as_slice())
    }

    /// Limit the oldest resident block into `output` and release its slot
    fn emit_oldest(&mut self, flushing: bool) {
        let depth = self.settings.lookahead_depth;
        let block_size = self.settings.block_size;
        let target = self.settings.target;
        let ceiling = self.settings.ceiling();
        let clipper = self.settings.clipper;

        let oldest = (self.write + depth - self.resident) % depth;
        let slot_of = |offset: usize| (oldest + offset) % depth;
        let largest = window_peak((0..self.resident).map(|i| self.peaks[slot_of(i)]));
        let input = &self.ring[oldest * block_size..(oldest + 1) * block_size];

        let (gain, clipped) = match self.settings.effective_span() {
            None => {
                let scale = block_scale(largest, target);
                let clipped = apply_block_scale(input, &mut self.output, scale, clipper, ceiling);
                (scale, clipped)
            }
            Some(span) => {
                let scratch = &mut self.scratch;
                scratch.envelope.clear();
                for i in 0..self.resident {
                    let slot = slot_of(i);
                    scratch.envelope.extend(
                        self.ring[slot * block_size..(slot + 1) * block_size]
                            .iter()
                            .map(|s| s.norm()),
                    );
                }
                scratch.forward.clear();
                scratch.forward.resize(block_size, 0.0);
                forward_max(
                    &scratch.envelope,
                    span,
                    &mut scratch.forward,
                    &mut scratch.deque,
                );
                let (clipped, min_gain) = apply_per_sample_gain(
                    input,
                    &scratch.forward,
                    &mut self.output,
                    target,
                    clipper,
                    ceiling,
                );
                (min_gain, clipped)
            }
        };

        self.resident -= 1;

        let report = BlockReport {
            sequence: self.stats.blocks_out,
            gain,
            window_peak: largest,
            clipped_samples: clipped,
            flushing,
        };
        self.stats.blocks_out += 1;
        self.stats.clipped_samples += clipped as u64;
        self.stats.min_gain = self.stats.min_gain.min(gain);

        trace!(
            "Emitted block {}: gain={:.6}, window_peak={:.6}, clipped={}, flushing={}",
            report.sequence,
            gain,
            largest,
            clipped,
            flushing
        );
        if let Some(observer) = self.observer.as_mut() {
            observer.on_block(&report);
        }
    }

    /// Install a per-block observer, replacing any previous one
    pub fn set_observer<O>(&mut self, observer: O)
    where
        O: BlockObserver + 'static,
    {
        self.observer = Some(Box::new(observer));
    }

    /// Remove the observer
    pub fn clear_observer(&mut self) {
        self.observer = None;
    }

    /// Get settings
    pub fn settings(&self) -> &LimiterSettings {
        &self.settings
    }

    /// Current lifecycle phase
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// True once `flush()` has emitted every resident block
    pub fn is_drained(&self) -> bool {
        self.phase == Phase::Flushing && self.resident == 0
    }

    /// Blocks currently held in the ring
    pub fn resident_blocks(&self) -> usize {
        self.resident
    }

    /// Blocks admitted since the last reset
    pub fn admitted_blocks(&self) -> u64 {
        self.admitted
    }

    /// Emission delay in blocks
    pub fn latency_blocks(&self) -> usize {
        self.settings.lookahead_depth - 1
    }

    /// Emission delay in samples
    pub fn latency_samples(&self) -> usize {
        self.settings.latency_samples()
    }

    /// Running counters since the last reset
    pub fn stats(&self) -> LimiterStats {
        self.stats
    }
}
