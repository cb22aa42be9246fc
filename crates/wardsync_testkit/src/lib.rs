//! # Wardsync Testkit
//!
//! Test utilities for Wardsync.
//!
//! This crate provides:
//! - A sample ward dataset and an engine harness wired to in-memory stores
//! - A status sink that records every broadcast
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust
//! use wardsync_engine::{SyncOutcome, SyncRequest};
//! use wardsync_testkit::prelude::*;
//!
//! let harness = TestHarness::new(ward_snapshot());
//! let (outcome, report) = harness.sync(&SyncRequest::full());
//! assert_eq!(outcome, SyncOutcome::Completed);
//! assert!(report.num_inserts > 0);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod recording;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::recording::*;
}

pub use fixtures::*;
pub use generators::*;
pub use recording::*;
