//! Shared test utilities for subsign integration tests.
//!
//! This module provides:
//! - `TestHarness` for isolated pipeline runs over a temp object store
//! - Seed builders for portal records
//! - Fakes for the external services with failure injection

pub mod builders;
pub mod fakes;
pub mod harness;

pub use builders::*;
pub use fakes::*;
pub use harness::TestHarness;
