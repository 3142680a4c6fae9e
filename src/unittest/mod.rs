//! Unit test result module
//!
//! Provides:
//! - Testsuite/testcase tree with bottom-up aggregation
//! - JUnit XML conversion

mod junit;
mod model;

pub use junit::*;
pub use model::*;
