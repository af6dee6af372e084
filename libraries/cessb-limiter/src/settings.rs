//! Limiter configuration

use crate::clipper::ClipperKind;
use crate::error::{LimiterError, Result};
use crate::{
    DEFAULT_BLOCK_SIZE, DEFAULT_HARD_CLIP_CEILING, DEFAULT_LOOKAHEAD_DEPTH, DEFAULT_TARGET_PEAK,
};

/// How the gain for the oldest block is derived from the lookahead window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum GainStrategy {
    /// One scale factor for the whole block, from the largest peak in the window
    #[default]
    BlockUniform,
    /// Per-sample gain from the forward maximum over the next `span` samples
    ///
    /// A span of 0 is treated as 1; spans longer than the resident window are
    /// clamped to it.
    PerSample {
        /// Forward lookahead in samples
        span: usize,
    },
}

/// Limiter settings
///
/// Immutable once a limiter is constructed from them.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LimiterSettings {
    /// Samples per block pushed and emitted
    pub block_size: usize,
    /// Blocks held for lookahead (emission delay is `lookahead_depth - 1` blocks)
    pub lookahead_depth: usize,
    /// Target envelope the smooth gain scales peaks down to
    pub target: f64,
    /// Optional safety-net ceiling, strictly above `target`
    pub hard_clip_ceiling: Option<f64>,
    /// Final-stage clipper
    pub clipper: ClipperKind,
    /// Gain derivation
    pub strategy: GainStrategy,
}

impl LimiterSettings {
    /// Per-sample sliding gain with a soft clip at the target
    pub fn per_sample(span: usize) -> Self {
        Self {
            hard_clip_ceiling: None,
            clipper: ClipperKind::Soft,
            strategy: GainStrategy::PerSample { span },
            ..Self::default()
        }
    }

    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    pub fn with_lookahead_depth(mut self, lookahead_depth: usize) -> Self {
        self.lookahead_depth = lookahead_depth;
        self
    }

    pub fn with_target(mut self, target: f64) -> Self {
        self.target = target;
        self
    }

    pub fn with_hard_clip_ceiling(mut self, ceiling: Option<f64>) -> Self {
        self.hard_clip_ceiling = ceiling;
        self
    }

    pub fn with_clipper(mut self, clipper: ClipperKind) -> Self {
        self.clipper = clipper;
        self
    }

    pub fn with_strategy(mut self, strategy: GainStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Envelope no emitted sample may exceed
    pub fn ceiling(&self) -> f64 {
        self.hard_clip_ceiling.unwrap_or(self.target)
    }

    /// Emission delay in samples
    pub fn latency_samples(&self) -> usize {
        self.lookahead_depth.saturating_sub(1) * self.block_size
    }

    /// Samples resident when the window is full
    pub(crate) fn window_len(&self) -> usize {
        self.lookahead_depth * self.block_size
    }

    /// Per-sample span clamped to `[1, window_len]`, `None` for block-uniform
    pub(crate) fn effective_span(&self) -> Option<usize> {
        match self.strategy {
            GainStrategy::BlockUniform => None,
            GainStrategy::PerSample { span } => Some(span.clamp(1, self.window_len().max(1))),
        }
    }

    /// Validate settings
    pub fn validate(&self) -> Result<()> {
        if !self.target.is_finite() || self.target <= 0.0 {
            return Err(LimiterError::InvalidTarget(self.target));
        }
        if self.block_size == 0 {
            return Err(LimiterError::InvalidBlockSize(self.block_size));
        }
        if self.lookahead_depth == 0 {
            return Err(LimiterError::InvalidLookaheadDepth(self.lookahead_depth));
        }
        if let Some(ceiling) = self.hard_clip_ceiling {
            if !ceiling.is_finite() || ceiling <= self.target {
                return Err(LimiterError::InvalidCeiling {
                    ceiling,
                    target: self.target,
                });
            }
        }
        self.block_size
            .checked_mul(self.lookahead_depth)
            .ok_or(LimiterError::InvalidBlockSize(self.block_size))?;
        Ok(())
    }
}

impl Default for LimiterSettings {
    /// Tuned block-uniform settings with a hard safety clip just above target
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            lookahead_depth: DEFAULT_LOOKAHEAD_DEPTH,
            target: DEFAULT_TARGET_PEAK,
            hard_clip_ceiling: Some(DEFAULT_HARD_CLIP_CEILING),
            clipper: ClipperKind::Hard,
            strategy: GainStrategy::BlockUniform,
        }
    }
}
