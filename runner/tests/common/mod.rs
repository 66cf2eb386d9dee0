//! Common test utilities and infrastructure
//!
//! Shared fixtures, helpers and builders used across the runner test suites.

#![allow(dead_code)]

pub mod fixtures;
pub mod helpers;

pub use fixtures::TestFixtures;
pub use helpers::{EventLog, SuiteBuilder, TestHelpers};
