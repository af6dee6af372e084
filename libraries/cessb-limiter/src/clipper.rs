//! Safety-net clippers applied to scaled samples before emission
//!
//! - **Hard**: rescales a sample whose envelope exceeds the ceiling back onto
//!   the ceiling, preserving phase.
//! - **Soft**: compresses each component beyond the threshold with
//!   `threshold + excess / (1 + excess²)`, sign preserved. Smooth, so it adds
//!   far less high-order harmonic content than a hard cut.

use crate::sample::IqSample;

/// Final-stage clipper selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ClipperKind {
    /// Magnitude-preserving rescale onto the ceiling
    #[default]
    Hard,
    /// Per-component smooth saturation
    Soft,
}

impl ClipperKind {
    /// Parse from string (for settings persistence)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "hard" => Some(Self::Hard),
            "soft" | "saturating" => Some(Self::Soft),
            _ => None,
        }
    }

    /// Convert to string for settings persistence
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hard => "hard",
            Self::Soft => "soft",
        }
    }

    /// Clip one sample against `ceiling`
    ///
    /// Returns the clipped sample and whether it was modified.
    #[inline]
    pub fn apply(self, sample: IqSample, ceiling: f64) -> (IqSample, bool) {
        match self {
            Self::Hard => hard_clip(sample, ceiling),
            Self::Soft => {
                let re = soft_clip(sample.re, ceiling);
                let im = soft_clip(sample.im, ceiling);
                let clipped = re != sample.re || im != sample.im;
                (IqSample::new(re, im), clipped)
            }
        }
    }
}

/// Rescale `sample` onto `ceiling` if its envelope exceeds it
#[inline]
pub fn hard_clip(sample: IqSample, ceiling: f64) -> (IqSample, bool) {
    let magnitude = sample.norm();
    if magnitude > ceiling {
        (sample * (ceiling / magnitude), true)
    } else {
        (sample, false)
    }
}

/// Smoothly saturate a single component beyond `threshold`
///
/// Values in `[-threshold, threshold]` pass unchanged.
#[inline]
pub fn soft_clip(x: f64, threshold: f64) -> f64 {
    let magnitude = x.abs();
    if magnitude <= threshold {
        return x;
    }
    let excess = magnitude - threshold;
    (threshold + excess / (1.0 + excess * excess)).copysign(x)
}
