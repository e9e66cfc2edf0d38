//! Analysis modules.
//!
//! Statistics are computed over an injected, read-only dataset.

pub mod aggregator;

pub use aggregator::*;
