//! Streaming behaviour of the lookahead limiter
//!
//! Covers the warm-up latency, steady-state emission, end-of-stream drain and
//! instance reuse, using small hand-checkable blocks.

use cessb_limiter::{
    BlockReport, ClipperKind, GainStrategy, IqSample, LimiterError, LimiterSettings,
    LookaheadLimiter, Phase,
};
use std::sync::{Arc, Mutex};

// ============================================================================
// TEST UTILITIES
// ============================================================================

fn settings(block_size: usize, depth: usize, target: f64) -> LimiterSettings {
    LimiterSettings::default()
        .with_block_size(block_size)
        .with_lookahead_depth(depth)
        .with_target(target)
        .with_hard_clip_ceiling(None)
}

fn block(pairs: &[(f64, f64)]) -> Vec<IqSample> {
    pairs.iter().map(|&(i, q)| IqSample::new(i, q)).collect()
}

fn assert_block_eq(actual: &[IqSample], expected: &[IqSample]) {
    assert_eq!(actual.len(), expected.len());
    for (n, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert!(
            (a - e).norm() < 1e-12,
            "Sample {} differs: got {}, expected {}",
            n,
            a,
            e
        );
    }
}

/// Push every block, then flush; collect everything emitted in order
fn run_stream(limiter: &mut LookaheadLimiter, blocks: &[Vec<IqSample>]) -> Vec<IqSample> {
    let mut out = Vec::new();
    for b in blocks {
        if let Some(emitted) = limiter.push(b).unwrap() {
            out.extend_from_slice(emitted);
        }
    }
    while let Some(emitted) = limiter.flush() {
        out.extend_from_slice(emitted);
    }
    out
}

// ============================================================================
// REFERENCE SCENARIO
// ============================================================================

#[test]
fn test_two_block_scenario() {
    let mut limiter = LookaheadLimiter::new(settings(4, 2, 1.0)).unwrap();

    let a = block(&[(0.1, 0.0), (0.2, 0.0), (0.3, 0.0), (0.4, 0.0)]);
    let b = block(&[(2.0, 0.0), (0.0, 0.0), (0.0, 0.0), (0.0, 0.0)]);

    assert!(limiter.push(&a).unwrap().is_none());

    let out = limiter.push(&b).unwrap().expect("second push emits");
    assert_block_eq(
        out,
        &block(&[(0.05, 0.0), (0.1, 0.0), (0.15, 0.0), (0.2, 0.0)]),
    );

    let out = limiter.flush().expect("flush emits the last block");
    assert_block_eq(out, &block(&[(1.0, 0.0), (0.0, 0.0), (0.0, 0.0), (0.0, 0.0)]));

    assert!(limiter.flush().is_none());
    assert!(limiter.flush().is_none());
}

// ============================================================================
// WARM-UP AND LATENCY
// ============================================================================

#[test]
fn test_warm_up_returns_none_for_depth_minus_one_pushes() {
    for depth in 1..=6 {
        let mut limiter = LookaheadLimiter::new(settings(8, depth, 1.0)).unwrap();
        let quiet = vec![IqSample::new(0.1, 0.1); 8];

        for n in 1..depth {
            assert!(
                limiter.push(&quiet).unwrap().is_none(),
                "depth {}: push {} should still be filling",
                depth,
                n
            );
            assert_eq!(limiter.phase(), Phase::Filling);
        }
        assert!(
            limiter.push(&quiet).unwrap().is_some(),
            "depth {}: push {} should emit",
            depth,
            depth
        );
        assert_eq!(limiter.phase(), Phase::Steady);
        assert_eq!(limiter.latency_blocks(), depth - 1);
    }
}

#[test]
fn test_steady_state_one_out_per_in() {
    let mut limiter = LookaheadLimiter::new(settings(16, 3, 1.0)).unwrap();
    let quiet = vec![IqSample::new(0.2, -0.1); 16];

    limiter.push(&quiet).unwrap();
    limiter.push(&quiet).unwrap();
    for _ in 0..50 {
        assert!(limiter.push(&quiet).unwrap().is_some());
        assert_eq!(limiter.resident_blocks(), 2);
    }
    assert_eq!(limiter.stats().blocks_in, 52);
    assert_eq!(limiter.stats().blocks_out, 50);
}

#[test]
fn test_peak_attenuates_blocks_ahead_of_it() {
    // depth 3: a peak is visible while the two blocks before it are emitted
    let mut limiter = LookaheadLimiter::new(settings(2, 3, 1.0)).unwrap();
    let quiet = block(&[(0.5, 0.0), (0.5, 0.0)]);
    let loud = block(&[(4.0, 0.0), (0.0, 0.0)]);

    let stream = vec![
        quiet.clone(),
        quiet.clone(),
        quiet.clone(),
        loud,
        quiet.clone(),
        quiet.clone(),
        quiet,
    ];
    let out = run_stream(&mut limiter, &stream);
    let firsts: Vec<f64> = out.chunks(2).map(|b| b[0].re).collect();

    let expected = [0.5, 0.125, 0.125, 1.0, 0.5, 0.5, 0.5];
    for (n, (got, want)) in firsts.iter().zip(expected).enumerate() {
        assert!(
            (got - want).abs() < 1e-12,
            "Block {}: got {}, expected {}",
            n,
            got,
            want
        );
    }
}

// ============================================================================
// FLUSH CONSERVATION
// ============================================================================

#[test]
fn test_flush_conserves_every_sample_in_order() {
    for depth in [1, 2, 4, 7] {
        for count in [0, 1, 3, 10] {
            let mut limiter = LookaheadLimiter::new(settings(5, depth, 100.0)).unwrap();
            let blocks: Vec<Vec<IqSample>> = (0..count)
                .map(|b| {
                    (0..5)
                        .map(|s| IqSample::new(f64::from(b * 5 + s), -f64::from(s)))
                        .collect()
                })
                .collect();

            let out = run_stream(&mut limiter, &blocks);
            let input: Vec<IqSample> = blocks.concat();
            assert_eq!(out, input, "depth {}, {} blocks", depth, count);
            assert!(limiter.is_drained());
        }
    }
}

#[test]
fn test_flush_uses_shrinking_window() {
    let mut limiter = LookaheadLimiter::new(settings(1, 3, 1.0)).unwrap();
    limiter.push(&block(&[(0.5, 0.0)])).unwrap();
    limiter.push(&block(&[(0.8, 0.0)])).unwrap();

    // window {0.5, 0.8}: no reduction
    assert_eq!(limiter.flush().unwrap()[0].re, 0.5);
    // window {0.8}
    assert_eq!(limiter.flush().unwrap()[0].re, 0.8);
    assert!(limiter.flush().is_none());
}

// ============================================================================
// CONTRACT VIOLATIONS
// ============================================================================

#[test]
fn test_wrong_block_length_is_rejected() {
    let mut limiter = LookaheadLimiter::new(settings(4, 2, 1.0)).unwrap();
    let err = limiter.push(&[IqSample::new(0.0, 0.0); 5]).unwrap_err();
    assert!(matches!(
        err,
        LimiterError::BlockLength {
            expected: 4,
            actual: 5
        }
    ));
    assert_eq!(limiter.resident_blocks(), 0);
    assert_eq!(limiter.phase(), Phase::Filling);

    assert!(limiter.push(&[]).is_err());
}

#[test]
fn test_non_finite_block_is_rejected() {
    let mut limiter = LookaheadLimiter::new(settings(2, 2, 1.0)).unwrap();
    limiter.push(&block(&[(0.5, 0.0), (0.5, 0.0)])).unwrap();

    let err = limiter
        .push(&block(&[(f64::INFINITY, 0.0), (0.5, 0.0)]))
        .unwrap_err();
    assert_eq!(err, LimiterError::NonFiniteSample { index: 0 });
    assert_eq!(limiter.resident_blocks(), 1);

    // the rejected block never reached the window
    let out = limiter.push(&block(&[(0.2, 0.0), (0.2, 0.0)])).unwrap().unwrap();
    assert_block_eq(out, &block(&[(0.5, 0.0), (0.5, 0.0)]));
}

#[test]
fn test_huge_finite_peak_is_scaled() {
    let mut limiter = LookaheadLimiter::new(settings(2, 2, 1.0)).unwrap();
    limiter.push(&block(&[(1e180, 0.0), (0.0, 0.0)])).unwrap();
    let out = limiter
        .push(&block(&[(0.0, 0.0), (0.0, 5e179)]))
        .unwrap()
        .unwrap();
    assert_block_eq(out, &block(&[(1.0, 0.0), (0.0, 0.0)]));

    let out = limiter.flush().unwrap();
    assert_block_eq(out, &block(&[(0.0, 0.0), (0.0, 1.0)]));
}

#[test]
fn test_push_after_flush_is_rejected() {
    let mut limiter = LookaheadLimiter::new(settings(2, 2, 1.0)).unwrap();
    assert!(limiter.flush().is_none());
    assert!(matches!(
        limiter.push(&[IqSample::new(0.0, 0.0); 2]),
        Err(LimiterError::Flushed)
    ));
}

// ============================================================================
// REUSE
// ============================================================================

#[test]
fn test_reset_reuses_instance_across_streams() {
    let blocks: Vec<Vec<IqSample>> = (0..6)
        .map(|b| vec![IqSample::new(0.3 * f64::from(b), 0.2); 4])
        .collect();

    let mut limiter = LookaheadLimiter::new(settings(4, 3, 1.0)).unwrap();
    let first = run_stream(&mut limiter, &blocks);
    limiter.reset();
    let second = run_stream(&mut limiter, &blocks);

    let mut fresh = LookaheadLimiter::new(settings(4, 3, 1.0)).unwrap();
    let third = run_stream(&mut fresh, &blocks);

    assert_eq!(first, second);
    assert_eq!(first, third);
}

#[test]
fn test_independent_instances_do_not_interact() {
    let loud = vec![IqSample::new(9.0, 0.0); 4];
    let quiet = vec![IqSample::new(0.1, 0.0); 4];

    let mut a = LookaheadLimiter::new(settings(4, 2, 1.0)).unwrap();
    let mut b = LookaheadLimiter::new(settings(4, 2, 1.0)).unwrap();

    a.push(&loud).unwrap();
    b.push(&quiet).unwrap();
    a.push(&loud).unwrap();
    let out = b.push(&quiet).unwrap().unwrap();
    assert_eq!(out, &quiet[..]);
}

#[test]
fn test_instances_run_on_separate_threads() {
    let handles: Vec<_> = (0..4)
        .map(|t| {
            std::thread::spawn(move || {
                let mut limiter = LookaheadLimiter::new(settings(32, 3, 1.0)).unwrap();
                let blocks: Vec<Vec<IqSample>> = (0..20)
                    .map(|b| vec![IqSample::new(f64::from(t + b) * 0.1, 0.0); 32])
                    .collect();
                run_stream(&mut limiter, &blocks)
            })
        })
        .collect();

    for handle in handles {
        let out = handle.join().unwrap();
        assert_eq!(out.len(), 20 * 32);
        assert!(out.iter().all(|s| s.norm() <= 1.0 + 1e-12));
    }
}

// ============================================================================
// STRATEGY AND CLIPPER COMBINATIONS
// ============================================================================

#[test]
fn test_all_configurations_respect_ceiling() {
    let strategies = [
        GainStrategy::BlockUniform,
        GainStrategy::PerSample { span: 0 },
        GainStrategy::PerSample { span: 3 },
        GainStrategy::PerSample { span: 1000 },
    ];
    let ceilings = [None, Some(1.05)];
    let blocks: Vec<Vec<IqSample>> = (0..9)
        .map(|b| {
            (0..8)
                .map(|s| {
                    let v = f64::from((b * 8 + s) % 11) * 0.7;
                    IqSample::new(v, -v * 0.5)
                })
                .collect()
        })
        .collect();

    for strategy in strategies {
        for clipper in [ClipperKind::Hard, ClipperKind::Soft] {
            for ceiling in ceilings {
                let config = settings(8, 3, 1.0)
                    .with_strategy(strategy)
                    .with_clipper(clipper)
                    .with_hard_clip_ceiling(ceiling);
                let mut limiter = LookaheadLimiter::new(config).unwrap();
                let out = run_stream(&mut limiter, &blocks);
                let limit = config.ceiling();
                assert_eq!(out.len(), 9 * 8);
                for (n, s) in out.iter().enumerate() {
                    assert!(
                        s.norm() <= limit + 1e-9,
                        "{:?}/{:?}/{:?}: sample {} has envelope {}",
                        strategy,
                        clipper,
                        ceiling,
                        n,
                        s.norm()
                    );
                }
            }
        }
    }
}

// ============================================================================
// OBSERVER
// ============================================================================

#[test]
fn test_observer_can_be_removed() {
    let reports: Arc<Mutex<Vec<BlockReport>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&reports);

    let mut limiter = LookaheadLimiter::new(settings(2, 1, 1.0)).unwrap();
    limiter.set_observer(move |r: &BlockReport| sink.lock().unwrap().push(*r));

    limiter.push(&block(&[(3.0, 0.0), (0.0, 0.0)])).unwrap();
    limiter.push(&block(&[(0.5, 0.0), (0.0, 0.0)])).unwrap();
    limiter.clear_observer();
    limiter.push(&block(&[(2.0, 0.0), (0.0, 0.0)])).unwrap();

    let reports = reports.lock().unwrap();
    assert_eq!(reports.len(), 2);
    assert!((reports[0].gain - 1.0 / 3.0).abs() < 1e-12);
    assert_eq!(reports[1].gain, 1.0);

    // emission and stats carry on without an observer
    assert_eq!(limiter.stats().blocks_out, 3);
}
