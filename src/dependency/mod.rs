//! Dependency metadata module
//!
//! Provides:
//! - Distribution / version specifier / license model
//! - `pyproject.toml` scanning

mod model;
mod pyproject;

pub use model::*;
pub use pyproject::*;
