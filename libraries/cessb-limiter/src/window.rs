//! Window limiting algorithm
//!
//! Stateless math shared by the streaming limiter and the batch entry points.
//!
//! Two gain derivations are provided:
//!
//! - **Block-uniform**: one factor `target / largest_peak` for the whole oldest
//!   block. Relative sample-to-sample amplitude inside the block is untouched,
//!   so no intermodulation from a time-varying gain; reaction resolution is one
//!   block.
//! - **Per-sample**: each sample `k` is scaled by `limit / max(envelope[k..k+span])`.
//!   The forward maximum is computed with a monotonic deque, so the whole pass
//!   is O(n) regardless of span.
//!
//! Both paths finish with a [`ClipperKind`] safety net against the ceiling.

use std::collections::VecDeque;

use crate::clipper::ClipperKind;
use crate::error::{LimiterError, Result};
use crate::sample::{first_non_finite, IqSample};

/// Scale factor that brings `largest` down to `target`
///
/// Exactly 1.0 when `largest <= target`: the limiter never scales up, and a
/// near-zero peak never reaches the division.
#[inline]
pub fn block_scale(largest: f64, target: f64) -> f64 {
    if largest > target {
        target / largest
    } else {
        1.0
    }
}

/// Largest of a set of cached block peaks (0.0 when empty)
#[inline]
pub fn window_peak(peaks: impl IntoIterator<Item = f64>) -> f64 {
    peaks.into_iter().fold(0.0_f64, f64::max)
}

/// Scale `input` by `scale` into `output`, then clip against `ceiling`
///
/// Returns how many samples the clipper touched.
pub fn apply_block_scale(
    input: &[IqSample],
    output: &mut [IqSample],
    scale: f64,
    clipper: ClipperKind,
    ceiling: f64,
) -> usize {
    let mut clipped = 0;
    for (out, &sample) in output.iter_mut().zip(input) {
        let (limited, was_clipped) = clipper.apply(sample * scale, ceiling);
        *out = limited;
        clipped += usize::from(was_clipped);
    }
    clipped
}

/// Forward-looking sliding maximum
///
/// For each `k < out.len()`, writes `max(env[k..min(k + span, env.len())])`
/// into `out[k]`. `span` of 0 is treated as 1. `deque` is scratch; it never
/// holds more than `span` indices, so reserving that much up front keeps this
/// allocation-free.
pub fn forward_max(env: &[f64], span: usize, out: &mut [f64], deque: &mut VecDeque<usize>) {
    let span = span.max(1);
    let count = out.len().min(env.len());
    deque.clear();

    let mut next = 0;
    for k in 0..count {
        while deque.front().is_some_and(|&f| f < k) {
            deque.pop_front();
        }
        let end = (k + span).min(env.len());
        while next < end {
            while deque.back().is_some_and(|&b| env[b] <= env[next]) {
                deque.pop_back();
            }
            deque.push_back(next);
            next += 1;
        }
        out[k] = deque.front().map_or(0.0, |&f| env[f]);
    }
}

/// Apply per-sample gains derived from `forward` maxima, then clip
///
/// `forward[k]` is the forward envelope maximum for `input[k]`. Returns the
/// clipped-sample count and the smallest gain applied.
pub fn apply_per_sample_gain(
    input: &[IqSample],
    forward: &[f64],
    output: &mut [IqSample],
    limit: f64,
    clipper: ClipperKind,
    ceiling: f64,
) -> (usize, f64) {
    let mut clipped = 0;
    let mut min_gain = 1.0_f64;
    for ((out, &sample), &max_env) in output.iter_mut().zip(input).zip(forward) {
        let gain = block_scale(max_env, limit);
        min_gain = min_gain.min(gain);
        let (limited, was_clipped) = clipper.apply(sample * gain, ceiling);
        *out = limited;
        clipped += usize::from(was_clipped);
    }
    (clipped, min_gain)
}

/// Scratch buffers for the per-sample path
#[derive(Debug)]
pub(crate) struct SlidingScratch {
    pub(crate) envelope: Vec<f64>,
    pub(crate) forward: Vec<f64>,
    pub(crate) deque: VecDeque<usize>,
}

impl SlidingScratch {
    /// Reserve scratch for `len` samples and a forward span of `span`
    ///
    /// Fails instead of aborting when memory is unavailable.
    pub(crate) fn try_new(len: usize, span: usize) -> Result<Self> {
        let mut envelope = Vec::new();
        envelope.try_reserve_exact(len)?;
        let mut forward = Vec::new();
        forward.try_reserve_exact(len)?;
        let mut deque = VecDeque::new();
        deque.try_reserve_exact(span.clamp(1, len.max(1)))?;
        Ok(Self {
            envelope,
            forward,
            deque,
        })
    }
}

fn validate_limit(limit: f64) -> Result<()> {
    if !limit.is_finite() || limit <= 0.0 {
        return Err(LimiterError::InvalidTarget(limit));
    }
    Ok(())
}

/// Per-sample limiting of a complete complex signal, in place
///
/// Offline counterpart of the streaming per-sample strategy: every sample sees
/// the next `span` samples of the signal (fewer near the end). On error the
/// buffer is left untouched.
pub fn limit_samples(
    samples: &mut [IqSample],
    limit: f64,
    span: usize,
    clipper: ClipperKind,
) -> Result<()> {
    let len = samples.len();
    limit_samples_reserving(samples, limit, span, clipper, len)
}

/// `limit_samples` with an explicit scratch reservation size
fn limit_samples_reserving(
    samples: &mut [IqSample],
    limit: f64,
    span: usize,
    clipper: ClipperKind,
    reserve: usize,
) -> Result<()> {
    validate_limit(limit)?;
    if let Some(index) = first_non_finite(samples) {
        return Err(LimiterError::NonFiniteSample { index });
    }
    if samples.is_empty() {
        return Ok(());
    }

    // nothing below writes to `samples` until the reservation has succeeded
    let mut scratch = SlidingScratch::try_new(reserve, span)?;
    scratch
        .envelope
        .extend(samples.iter().map(|s| s.norm()));
    scratch.forward.resize(samples.len(), 0.0);
    forward_max(
        &scratch.envelope,
        span,
        &mut scratch.forward,
        &mut scratch.deque,
    );

    for (sample, &max_env) in samples.iter_mut().zip(&scratch.forward) {
        let gain = block_scale(max_env, limit);
        *sample = clipper.apply(*sample * gain, limit).0;
    }
    Ok(())
}

/// Per-sample limiting of interleaved `(i, q)` pairs, in place, with soft clip
///
/// `samples` holds `len / 2` pairs laid out `[i0, q0, i1, q1, ...]`. Each pair is
/// scaled by `limit / max_env` where `max_env` is the largest envelope among the
/// next `span` pairs (clamped to the end of the buffer), then each component is
/// soft-clipped at `limit`. On error the buffer is left untouched.
pub fn limit_window(samples: &mut [f64], limit: f64, span: usize) -> Result<()> {
    let pairs = samples.len() / 2;
    limit_window_reserving(samples, limit, span, pairs)
}

/// `limit_window` with an explicit scratch reservation size
fn limit_window_reserving(
    samples: &mut [f64],
    limit: f64,
    span: usize,
    reserve: usize,
) -> Result<()> {
    validate_limit(limit)?;
    if samples.len() % 2 != 0 {
        return Err(LimiterError::InterleavedLength(samples.len()));
    }
    if let Some(index) = samples
        .chunks_exact(2)
        .position(|p| !p[0].is_finite() || !p[1].is_finite())
    {
        return Err(LimiterError::NonFiniteSample { index });
    }
    let pairs = samples.len() / 2;
    if pairs == 0 {
        return Ok(());
    }

    // nothing below writes to `samples` until the reservation has succeeded
    let mut scratch = SlidingScratch::try_new(reserve, span)?;
    scratch
        .envelope
        .extend(samples.chunks_exact(2).map(|p| p[0].hypot(p[1])));
    scratch.forward.resize(pairs, 0.0);
    forward_max(
        &scratch.envelope,
        span,
        &mut scratch.forward,
        &mut scratch.deque,
    );

    for (pair, &max_env) in samples.chunks_exact_mut(2).zip(&scratch.forward) {
        let gain = block_scale(max_env, limit);
        let (limited, _) = ClipperKind::Soft.apply(IqSample::new(pair[0], pair[1]) * gain, limit);
        pair[0] = limited.re;
        pair[1] = limited.im;
    }
    Ok(())
}
