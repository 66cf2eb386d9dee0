//! Collaborator seams, with mockall annotations for testing
//!
//! The engine treats deep equality, snapshot persistence and outcome
//! reporting as external capabilities. Each is a trait here so the runner can
//! be wired with real services in production and mocks in tests.

use shared::{SuiteResult, UnitOutcome, Value};
use std::fmt;

/// Result of a structural comparison
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparison {
    pub equal: bool,
    /// Human-readable difference, present when the values differ
    pub diff: Option<String>,
}

impl Comparison {
    pub fn equal() -> Self {
        Self {
            equal: true,
            diff: None,
        }
    }

    pub fn different(diff: impl Into<String>) -> Self {
        Self {
            equal: false,
            diff: Some(diff.into()),
        }
    }
}

/// Deep-equality capability used by `deep_equal`, `like` and snapshots
#[mockall::automock]
pub trait Comparator: Send + Sync {
    /// Compare two values structurally
    fn compare(&self, actual: &Value, expected: &Value) -> Comparison;
}

/// Which snapshot of a unit a key refers to
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SnapshotSlot {
    /// Positional index among the unit's snapshots without an explicit id
    Index(usize),
    /// Explicit id given at the call site
    Id(String),
}

/// Key of one recorded snapshot: the owning unit's title plus its slot
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SnapshotKey {
    pub unit: String,
    pub slot: SnapshotSlot,
}

impl SnapshotKey {
    pub fn indexed(unit: impl Into<String>, index: usize) -> Self {
        Self {
            unit: unit.into(),
            slot: SnapshotSlot::Index(index),
        }
    }

    pub fn with_id(unit: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            unit: unit.into(),
            slot: SnapshotSlot::Id(id.into()),
        }
    }
}

impl fmt::Display for SnapshotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.slot {
            SnapshotSlot::Index(index) => write!(f, "{} [#{}]", self.unit, index),
            SnapshotSlot::Id(id) => write!(f, "{} [{}]", self.unit, id),
        }
    }
}

/// Key-value store of recorded snapshots
#[mockall::automock]
pub trait SnapshotStore: Send + Sync {
    /// Previously recorded snapshot for this key, if any
    fn get(&self, key: &SnapshotKey) -> Option<Value>;

    /// Record (or overwrite) the snapshot for this key
    fn set(&self, key: SnapshotKey, value: Value);
}

/// Consumer of outcome records, typically a reporter
#[mockall::automock]
#[async_trait::async_trait]
pub trait OutcomeSink: Send + Sync {
    /// Called once per settled unit, tests and hooks alike
    async fn unit_settled(&self, outcome: &UnitOutcome);

    /// Called once after every unit of the suite has settled
    async fn suite_settled(&self, result: &SuiteResult);
}
