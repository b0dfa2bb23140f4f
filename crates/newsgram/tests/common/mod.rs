//! Shared test utilities for newsgram integration tests.
//!
//! This module provides:
//! - `TestHarness` for running jobs against an isolated service
//! - Builder patterns for creating test configurations programmatically

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::TestHarness;
