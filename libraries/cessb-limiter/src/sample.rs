//! I/Q sample representation and envelope helpers

use num_complex::Complex64;

/// One in-phase/quadrature pair (`re` = i, `im` = q), double precision
pub type IqSample = Complex64;

/// Instantaneous envelope `sqrt(i² + q²)` of a sample
#[inline]
pub fn envelope(sample: IqSample) -> f64 {
    sample.norm()
}

/// Largest envelope found in a block (0.0 for an empty block)
///
/// Uses `norm()` (hypot) so components near `f64::MAX` do not overflow.
pub fn block_peak(block: &[IqSample]) -> f64 {
    block.iter().map(|s| s.norm()).fold(0.0_f64, f64::max)
}

/// Index of the first sample with a NaN or infinite component
pub fn first_non_finite(samples: &[IqSample]) -> Option<usize> {
    samples.iter().position(|s| !s.re.is_finite() || !s.im.is_finite())
}

/// Convert interleaved `[i0, q0, i1, q1, ...]` pairs into complex samples
///
/// A trailing unpaired value is ignored.
pub fn from_interleaved(pairs: &[f64]) -> Vec<IqSample> {
    pairs
        .chunks_exact(2)
        .map(|pair| IqSample::new(pair[0], pair[1]))
        .collect()
}

/// Flatten complex samples into interleaved `[i0, q0, i1, q1, ...]`
pub fn to_interleaved(samples: &[IqSample]) -> Vec<f64> {
    samples.iter().flat_map(|s| [s.re, s.im]).collect()
}
