//! Outcome records produced by the engine
//!
//! These are the engine's outbound messages, consumed by reporters:
//! - `outcome`: per-unit records and the failure taxonomy
//! - `suite`: the aggregate `SuiteResult`

pub mod outcome;
pub mod suite;

pub use outcome::{AssertionCounts, FailureKind, FailureRecord, UnitKind, UnitOutcome, UnitStatus};
pub use suite::SuiteResult;
