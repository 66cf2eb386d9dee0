//! Shared types for the test execution engine
//!
//! Contains the value model exchanged by tests and assertions, the outcome
//! records handed to reporters, and common logging/error plumbing.

pub mod errors;
pub mod logging;
pub mod messages;
pub mod types;

pub use errors::*;
pub use types::*;

pub use messages::{
    AssertionCounts, FailureKind, FailureRecord, SuiteResult, UnitKind, UnitOutcome, UnitStatus,
};
