//! Test utilities for limiter testing
//!
//! Deterministic I/Q test signals for verifying limiting behaviour.

pub mod signals;

pub use signals::*;
