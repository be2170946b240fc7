//! Shared test utilities for ingestchain integration tests.
//!
//! This module provides:
//! - `TestHarness` for isolated runs inside a temporary directory
//! - Stub collaborators and steps with deterministic behaviour

#![allow(unused_imports)]

pub mod harness;
pub mod stubs;

pub use harness::TestHarness;
pub use stubs::*;
