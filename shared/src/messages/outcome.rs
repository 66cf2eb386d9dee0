//! Per-unit outcome records

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a recorded failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// A failed assertion; the unit kept running
    Assertion,
    /// `plan(n)` was called but a different number of assertions ran
    PlanMismatch,
    /// `plan` was called more than once
    PlanAlreadySet,
    /// `end()` was called more than once in a callback unit
    MultipleCallbackEnd,
    /// A callback unit never called `end()` before its deadline
    CallbackNeverCalled,
    /// `end()` was called with an error
    CallbackError,
    /// A hook failed
    HookFailure,
    /// The implementation returned an error or panicked
    Uncaught,
    /// The unit did not settle before its deadline
    Timeout,
    /// A `failing` unit passed
    ExpectedFailureButPassed,
    /// An asynchronous assertion was created but never awaited
    UnawaitedAssertion,
    /// The test finished without running any assertions
    NoAssertions,
    /// The declaration was rejected at registration
    Registration,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::Assertion => "assertion failure",
            FailureKind::PlanMismatch => "plan mismatch",
            FailureKind::PlanAlreadySet => "plan already set",
            FailureKind::MultipleCallbackEnd => "multiple callback end",
            FailureKind::CallbackNeverCalled => "callback never called",
            FailureKind::CallbackError => "callback error",
            FailureKind::HookFailure => "hook failure",
            FailureKind::Uncaught => "uncaught error",
            FailureKind::Timeout => "timeout",
            FailureKind::ExpectedFailureButPassed => "expected failure but passed",
            FailureKind::UnawaitedAssertion => "unawaited assertion",
            FailureKind::NoAssertions => "no assertions",
            FailureKind::Registration => "registration error",
        };
        f.write_str(name)
    }
}

/// One recorded failure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub kind: FailureKind,
    /// Assertion (or engine check) that produced the failure
    pub assertion: String,
    pub message: String,
    pub actual: Option<String>,
    pub expected: Option<String>,
    pub diff: Option<String>,
}

impl FailureRecord {
    pub fn new(kind: FailureKind, assertion: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            assertion: assertion.into(),
            message: message.into(),
            actual: None,
            expected: None,
            diff: None,
        }
    }

    pub fn assertion(assertion: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(FailureKind::Assertion, assertion, message)
    }

    pub fn with_actual(mut self, actual: impl Into<String>) -> Self {
        self.actual = Some(actual.into());
        self
    }

    pub fn with_expected(mut self, expected: impl Into<String>) -> Self {
        self.expected = Some(expected.into());
        self
    }

    pub fn with_diff(mut self, diff: Option<String>) -> Self {
        self.diff = diff;
        self
    }
}

impl fmt::Display for FailureRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.assertion, self.message)
    }
}

/// Final status of a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitStatus {
    Passed,
    Failed,
    Skipped,
    Todo,
}

/// What kind of unit produced an outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "phase", rename_all = "snake_case")]
pub enum UnitKind {
    Test,
    Hook(String),
}

/// Assertion tallies for one unit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionCounts {
    pub passed: usize,
    pub failed: usize,
    pub planned: Option<usize>,
}

impl AssertionCounts {
    pub fn total(&self) -> usize {
        self.passed + self.failed
    }
}

/// Outcome record for one settled unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitOutcome {
    pub title: String,
    pub unit: UnitKind,
    pub status: UnitStatus,
    pub assertions: AssertionCounts,
    pub failures: Vec<FailureRecord>,
    pub logs: Vec<String>,
    pub duration_ms: u64,
}

impl UnitOutcome {
    /// Outcome for a test that was declared but not executed
    pub fn not_executed(title: impl Into<String>, status: UnitStatus) -> Self {
        Self {
            title: title.into(),
            unit: UnitKind::Test,
            status,
            assertions: AssertionCounts::default(),
            failures: Vec::new(),
            logs: Vec::new(),
            duration_ms: 0,
        }
    }

    pub fn is_test(&self) -> bool {
        self.unit == UnitKind::Test
    }

    pub fn failed(&self) -> bool {
        self.status == UnitStatus::Failed
    }
}
