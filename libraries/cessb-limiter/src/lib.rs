//! Lookahead envelope limiting for complex baseband (I/Q) signals
//!
//! Bounds the instantaneous envelope `sqrt(i² + q²)` of a signal ahead of a
//! power amplifier or modulator stage. Instead of clipping every overshoot,
//! the limiter looks a few blocks ahead and lowers the gain smoothly before a
//! peak arrives, keeping clipping as a rare safety net.
//!
//! This crate provides:
//! - [`LookaheadLimiter`]: streaming push/flush limiter over fixed-size blocks
//! - Block-uniform or per-sample gain derivation ([`GainStrategy`])
//! - Hard (phase-preserving) or soft (saturating) safety clippers ([`ClipperKind`])
//! - [`limit_window`] / [`limit_samples`]: offline per-sample limiting of a
//!   complete signal
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌──────────────────┐     ┌───────────────┐     ┌─────────┐
//! │ I/Q blocks  │ ──► │ Lookahead ring   │ ──► │ Window gain   │ ──► │ Safety  │ ──► out
//! └─────────────┘     │ + peak cache     │     │ (block/sample)│     │ clipper │
//!                     └──────────────────┘     └───────────────┘     └─────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use cessb_limiter::{IqSample, LimiterSettings, LookaheadLimiter};
//!
//! let mut limiter = LookaheadLimiter::new(LimiterSettings::default())?;
//! let block = vec![IqSample::new(12.0, 3.0); cessb_limiter::DEFAULT_BLOCK_SIZE];
//!
//! let mut emitted = Vec::new();
//! for _ in 0..8 {
//!     if let Some(out) = limiter.push(&block)? {
//!         emitted.extend_from_slice(out);
//!     }
//! }
//! while let Some(out) = limiter.flush() {
//!     emitted.extend_from_slice(out);
//! }
//!
//! assert_eq!(emitted.len(), 8 * block.len());
//! assert!(emitted.iter().all(|s| s.norm() <= cessb_limiter::DEFAULT_HARD_CLIP_CEILING));
//! # Ok::<(), cessb_limiter::LimiterError>(())
//! ```

mod clipper;
mod error;
mod lookahead;
mod observer;
mod sample;
mod settings;
mod window;

#[cfg(feature = "test-utils")]
pub mod test_utils;

pub use clipper::{hard_clip, soft_clip, ClipperKind};
pub use error::{LimiterError, Result};
pub use lookahead::{LookaheadLimiter, Phase};
pub use observer::{BlockObserver, BlockReport, LimiterStats};
pub use sample::{block_peak, envelope, from_interleaved, to_interleaved, IqSample};
pub use settings::{GainStrategy, LimiterSettings};
pub use window::{
    apply_block_scale, apply_per_sample_gain, block_scale, forward_max, limit_samples,
    limit_window, window_peak,
};

/// Samples per block
pub const DEFAULT_BLOCK_SIZE: usize = 2048;

/// Blocks held for lookahead (minimum 1)
pub const DEFAULT_LOOKAHEAD_DEPTH: usize = 4;

/// Envelope the smooth gain scales peaks down to
pub const DEFAULT_TARGET_PEAK: f64 = 10.0;

/// Safety-net ceiling, slightly above the target
pub const DEFAULT_HARD_CLIP_CEILING: f64 = 10.5;
