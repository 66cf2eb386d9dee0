//! Aggregate result of one suite run

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::outcome::{FailureKind, FailureRecord, UnitOutcome, UnitStatus};
use crate::types::RunId;

/// Aggregate over every unit of a suite run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteResult {
    pub run_id: RunId,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Test outcomes in settlement order
    pub tests: Vec<UnitOutcome>,
    /// Hook executions in settlement order
    pub hooks: Vec<UnitOutcome>,
    /// Declarations rejected at registration, as failure records
    pub registration_errors: Vec<FailureRecord>,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub todo: usize,
    pub passed_assertions: usize,
    pub failed_assertions: usize,
    /// Runnable tests that never started (fail-fast or a failed `before` hook)
    pub not_run: usize,
}

impl SuiteResult {
    pub fn new(run_id: RunId) -> Self {
        Self {
            run_id,
            started_at: Utc::now(),
            finished_at: None,
            tests: Vec::new(),
            hooks: Vec::new(),
            registration_errors: Vec::new(),
            passed: 0,
            failed: 0,
            skipped: 0,
            todo: 0,
            passed_assertions: 0,
            failed_assertions: 0,
            not_run: 0,
        }
    }

    /// Fold a settled test outcome into the tallies
    pub fn record_test(&mut self, outcome: UnitOutcome) {
        match outcome.status {
            UnitStatus::Passed => self.passed += 1,
            UnitStatus::Failed => self.failed += 1,
            UnitStatus::Skipped => self.skipped += 1,
            UnitStatus::Todo => self.todo += 1,
        }
        self.count_assertions(&outcome);
        self.tests.push(outcome);
    }

    /// Fold a settled hook outcome into the tallies
    pub fn record_hook(&mut self, outcome: UnitOutcome) {
        self.count_assertions(&outcome);
        self.hooks.push(outcome);
    }

    pub fn record_registration_error(&mut self, message: impl Into<String>) {
        self.registration_errors.push(FailureRecord::new(
            FailureKind::Registration,
            "register",
            message,
        ));
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn hook_failures(&self) -> usize {
        self.hooks.iter().filter(|h| h.failed()).count()
    }

    /// Every failure in the run, paired with the title of the unit that produced it
    pub fn failures(&self) -> Vec<(String, FailureRecord)> {
        let registration = self
            .registration_errors
            .iter()
            .map(|record| ("[registration]".to_string(), record.clone()));
        let units = self
            .hooks
            .iter()
            .chain(self.tests.iter())
            .flat_map(|outcome| {
                outcome
                    .failures
                    .iter()
                    .map(move |record| (outcome.title.clone(), record.clone()))
            });
        registration.chain(units).collect()
    }

    pub fn test(&self, title: &str) -> Option<&UnitOutcome> {
        self.tests.iter().find(|t| t.title == title)
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.hook_failures() == 0 && self.registration_errors.is_empty()
    }

    fn count_assertions(&mut self, outcome: &UnitOutcome) {
        self.passed_assertions += outcome.assertions.passed;
        self.failed_assertions += outcome.assertions.failed;
    }
}
