//! Documentation coverage module
//!
//! Provides:
//! - Package/module documentation coverage tree with explicit aggregation
//! - docstr-coverage JSON result conversion

mod docstr;
mod model;

pub use docstr::*;
pub use model::*;
