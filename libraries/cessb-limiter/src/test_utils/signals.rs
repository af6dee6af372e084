//! Test signal generation for I/Q limiter testing
//!
//! All generators are deterministic; noise uses a seeded RNG so repeated runs
//! produce identical signals.

use std::f64::consts::PI;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::sample::IqSample;

/// Generate a complex tone `amplitude * e^(j·2π·f·t)`
///
/// Constant envelope equal to `amplitude`.
///
/// # Arguments
/// * `frequency` - Tone frequency in Hz (negative for a lower-sideband tone)
/// * `sample_rate` - Sample rate in Hz
/// * `num_samples` - Length in samples
/// * `amplitude` - Envelope
pub fn generate_iq_tone(
    frequency: f64,
    sample_rate: u32,
    num_samples: usize,
    amplitude: f64,
) -> Vec<IqSample> {
    (0..num_samples)
        .map(|n| {
            let phase = 2.0 * PI * frequency * n as f64 / f64::from(sample_rate);
            IqSample::from_polar(amplitude, phase)
        })
        .collect()
}

/// Generate a two-tone signal (classic SSB peak-envelope test)
///
/// Envelope beats between 0 and `2 * amplitude`.
pub fn generate_two_tone(
    freq_a: f64,
    freq_b: f64,
    sample_rate: u32,
    num_samples: usize,
    amplitude: f64,
) -> Vec<IqSample> {
    let a = generate_iq_tone(freq_a, sample_rate, num_samples, amplitude);
    let b = generate_iq_tone(freq_b, sample_rate, num_samples, amplitude);
    a.into_iter().zip(b).map(|(x, y)| x + y).collect()
}

/// Generate an impulse train over silence
///
/// Every `period`-th sample (starting at 0) is `(amplitude, 0)`.
pub fn generate_impulse_train(num_samples: usize, period: usize, amplitude: f64) -> Vec<IqSample> {
    let period = period.max(1);
    (0..num_samples)
        .map(|n| {
            if n % period == 0 {
                IqSample::new(amplitude, 0.0)
            } else {
                IqSample::new(0.0, 0.0)
            }
        })
        .collect()
}

/// Generate uniform complex noise with components in `[-amplitude, amplitude]`
pub fn generate_iq_noise(num_samples: usize, amplitude: f64, seed: u64) -> Vec<IqSample> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..num_samples)
        .map(|_| {
            IqSample::new(
                rng.gen_range(-amplitude..=amplitude),
                rng.gen_range(-amplitude..=amplitude),
            )
        })
        .collect()
}

/// Quiet tone with one full-scale burst of `burst_len` samples at `burst_start`
pub fn generate_burst(
    num_samples: usize,
    quiet_amplitude: f64,
    burst_start: usize,
    burst_len: usize,
    burst_amplitude: f64,
) -> Vec<IqSample> {
    let mut signal = generate_iq_tone(1000.0, 48000, num_samples, quiet_amplitude);
    let end = (burst_start + burst_len).min(num_samples);
    for (n, sample) in signal.iter_mut().enumerate().take(end).skip(burst_start) {
        *sample = IqSample::from_polar(burst_amplitude, n as f64 * 0.1);
    }
    signal
}

/// Largest envelope in a signal
pub fn peak_envelope(samples: &[IqSample]) -> f64 {
    crate::sample::block_peak(samples)
}
