//! Shared test utilities for the dose-eval workspace.
//!
//! This crate provides common testing infrastructure including:
//! - Grid and contour fixtures
//! - Dose field generators
//! - Approximate float and error-kind assertions
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! Then import in your tests:
//!
//! ```ignore
//! use test_utils::{assert_approx_eq, fixtures};
//! ```

pub mod fixtures;
pub mod generators;

// Re-export commonly used items at the crate root
pub use fixtures::*;
pub use generators::*;

/// Macro for approximate floating-point equality assertions.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_approx_eq;
///
/// assert_approx_eq!(1.0001_f64, 1.0_f64, 0.001_f64); // passes
/// assert_approx_eq!(1.1_f32, 1.0_f32, 0.001_f32);    // fails
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: f64 = $left as f64;
        let right: f64 = $right as f64;
        let epsilon: f64 = $epsilon as f64;
        let diff = (left - right).abs();
        if !(diff <= epsilon) {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`,\n right: `{:?}`,\n  diff: `{:?}` > epsilon `{:?}`",
                left, right, diff, epsilon
            );
        }
    }};
    ($left:expr, $right:expr) => {
        $crate::assert_approx_eq!($left, $right, 1e-9)
    };
}

/// Assert that a `DoseEvalResult` failed with the given `ErrorKind`.
///
/// # Usage
///
/// ```ignore
/// use dose_common::ErrorKind;
/// use test_utils::assert_err_kind;
///
/// assert_err_kind!(stats.vx(2.1), ErrorKind::DataUnavailable);
/// ```
#[macro_export]
macro_rules! assert_err_kind {
    ($result:expr, $kind:expr) => {{
        match $result {
            Ok(_) => panic!("expected {:?} error, got Ok", $kind),
            Err(e) => assert_eq!(e.kind(), $kind, "unexpected error: {}", e),
        }
    }};
}
