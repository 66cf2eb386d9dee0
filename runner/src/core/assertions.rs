//! Assertion engine
//!
//! Every assertion records into the per-unit [`AssertionOutcome`] and returns.
//! Failures never unwind the unit body: they accumulate, and the unit's
//! status is decided when the scheduler finalizes it.

use parking_lot::Mutex;
use regex::Regex;
use shared::{unit_warn, AssertionCounts, FailureKind, FailureRecord, Value};
use std::sync::Arc;
use std::time::Duration;

use crate::traits::{Comparator, Comparison, SnapshotKey, SnapshotStore};

/// Collaborators an assertion engine evaluates against
#[derive(Clone)]
pub(crate) struct AssertionServices {
    pub(crate) comparator: Arc<dyn Comparator>,
    pub(crate) snapshots: Arc<dyn SnapshotStore>,
    pub(crate) update_snapshots: bool,
    pub(crate) assertion_timeout: Duration,
}

/// Accumulated assertion state of one unit
#[derive(Debug, Clone, Default)]
pub struct AssertionOutcome {
    pub passed: usize,
    pub failed: usize,
    pub planned: Option<usize>,
    pub failures: Vec<FailureRecord>,
    pub logs: Vec<String>,
    pending: usize,
    snapshot_index: usize,
    finished: bool,
}

impl AssertionOutcome {
    pub fn counts(&self) -> AssertionCounts {
        AssertionCounts {
            passed: self.passed,
            failed: self.failed,
            planned: self.planned,
        }
    }

    pub fn recorded(&self) -> usize {
        self.passed + self.failed
    }
}

pub(crate) struct UnitState {
    pub(crate) title: String,
    outcome: Mutex<AssertionOutcome>,
    pub(crate) services: AssertionServices,
    /// Hooks share titles across slots, so only tests may snapshot
    snapshots_enabled: bool,
}

/// Assertion methods bound to one unit's outcome
///
/// Obtained from [`ExecutionContext::assert`](super::context::ExecutionContext::assert);
/// [`Assertions::skip`] yields a view whose assertions are no-ops.
#[derive(Clone)]
pub struct Assertions {
    pub(crate) state: Arc<UnitState>,
    skipped: bool,
    message: Option<String>,
}

impl Assertions {
    pub(crate) fn new(title: String, services: AssertionServices) -> Self {
        Self::build(title, services, true)
    }

    /// Engine for a hook body; `snapshot` records a failure instead of a key
    pub(crate) fn for_hook(title: String, services: AssertionServices) -> Self {
        Self::build(title, services, false)
    }

    fn build(title: String, services: AssertionServices, snapshots_enabled: bool) -> Self {
        Self {
            state: Arc::new(UnitState {
                title,
                outcome: Mutex::new(AssertionOutcome::default()),
                services,
                snapshots_enabled,
            }),
            skipped: false,
            message: None,
        }
    }

    /// View whose assertions perform no comparison and leave counters untouched
    pub fn skip(&self) -> Assertions {
        Assertions {
            skipped: true,
            ..self.clone()
        }
    }

    /// View whose failures carry a custom message
    pub fn with_message(&self, message: impl Into<String>) -> Assertions {
        Assertions {
            message: Some(message.into()),
            ..self.clone()
        }
    }

    pub fn is_skipped(&self) -> bool {
        self.skipped
    }

    /// Append a value to the unit's log; a no-op on a skipped view
    pub fn log(&self, value: impl Into<Value>) {
        if self.skipped {
            return;
        }
        let line = match value.into() {
            Value::String(s) => s,
            other => other.to_string(),
        };
        self.state.outcome.lock().logs.push(line);
    }

    /// Declare the expected number of assertions
    pub fn plan(&self, count: usize) {
        if self.skipped {
            return;
        }
        let mut outcome = self.state.outcome.lock();
        if outcome.finished {
            drop(outcome);
            self.warn_late("plan");
            return;
        }
        match outcome.planned {
            None => outcome.planned = Some(count),
            Some(existing) => outcome.failures.push(FailureRecord::new(
                FailureKind::PlanAlreadySet,
                "plan",
                format!("plan({count}) called after plan({existing}) was already set"),
            )),
        }
    }

    /// Whether no failure has been recorded so far
    pub fn passed(&self) -> bool {
        self.state.outcome.lock().failures.is_empty()
    }

    /// Snapshot of the accumulated outcome
    pub fn outcome(&self) -> AssertionOutcome {
        self.state.outcome.lock().clone()
    }

    pub fn pass(&self) -> bool {
        self.check("pass", true, || unreachable_failure("pass"))
    }

    pub fn fail(&self) -> bool {
        self.check("fail", false, || {
            FailureRecord::assertion("fail", "Test failed via fail()")
        })
    }

    /// Identity comparison: `NaN` is itself, `0` is not `-0`
    pub fn is(&self, actual: impl Into<Value>, expected: impl Into<Value>) -> bool {
        let (actual, expected) = (actual.into(), expected.into());
        self.check("is", actual.same_value(&expected), || {
            FailureRecord::assertion("is", "Values are not the same")
                .with_actual(actual.render())
                .with_expected(expected.render())
        })
    }

    pub fn not(&self, actual: impl Into<Value>, expected: impl Into<Value>) -> bool {
        let (actual, expected) = (actual.into(), expected.into());
        self.check("not", !actual.same_value(&expected), || {
            FailureRecord::assertion("not", "Value is the same as the other").with_actual(actual.render())
        })
    }

    pub fn deep_equal(&self, actual: impl Into<Value>, expected: impl Into<Value>) -> bool {
        if self.skipped {
            return true;
        }
        let (actual, expected) = (actual.into(), expected.into());
        let comparison = self.state.services.comparator.compare(&actual, &expected);
        self.check("deep_equal", comparison.equal, || {
            FailureRecord::assertion("deep_equal", "Values are not deeply equal")
                .with_actual(actual.render())
                .with_expected(expected.render())
                .with_diff(comparison.diff.clone())
        })
    }

    pub fn not_deep_equal(&self, actual: impl Into<Value>, expected: impl Into<Value>) -> bool {
        if self.skipped {
            return true;
        }
        let (actual, expected) = (actual.into(), expected.into());
        let comparison = self.state.services.comparator.compare(&actual, &expected);
        self.check("not_deep_equal", !comparison.equal, || {
            FailureRecord::assertion("not_deep_equal", "Values are deeply equal").with_actual(actual.render())
        })
    }

    /// Partial structural match: object selectors only constrain the keys they name
    pub fn like(&self, actual: impl Into<Value>, selector: impl Into<Value>) -> bool {
        if self.skipped {
            return true;
        }
        let (actual, selector) = (actual.into(), selector.into());
        if selector.as_object().is_none() {
            return self.check("like", false, || {
                FailureRecord::assertion("like", "selector must be an object")
                    .with_expected(selector.render())
            });
        }
        let comparison = self.like_matches(&actual, &selector);
        self.check("like", comparison.equal, || {
            FailureRecord::assertion("like", "Value is not like the selector")
                .with_actual(actual.render())
                .with_expected(selector.render())
                .with_diff(comparison.diff.clone())
        })
    }

    pub fn truthy(&self, actual: impl Into<Value>) -> bool {
        let actual = actual.into();
        self.check("truthy", actual.is_truthy(), || {
            FailureRecord::assertion("truthy", "Value is not truthy").with_actual(actual.render())
        })
    }

    pub fn falsy(&self, actual: impl Into<Value>) -> bool {
        let actual = actual.into();
        self.check("falsy", !actual.is_truthy(), || {
            FailureRecord::assertion("falsy", "Value is not falsy").with_actual(actual.render())
        })
    }

    /// Strict boolean `true`, no coercion
    pub fn is_true(&self, actual: impl Into<Value>) -> bool {
        let actual = actual.into();
        self.check("true", matches!(actual, Value::Bool(true)), || {
            FailureRecord::assertion("true", "Value is not `true`").with_actual(actual.render())
        })
    }

    /// Strict boolean `false`, no coercion
    pub fn is_false(&self, actual: impl Into<Value>) -> bool {
        let actual = actual.into();
        self.check("false", matches!(actual, Value::Bool(false)), || {
            FailureRecord::assertion("false", "Value is not `false`").with_actual(actual.render())
        })
    }

    pub fn regex(&self, actual: impl Into<Value>, pattern: &Regex) -> bool {
        self.match_pattern("regex", actual.into(), pattern, true)
    }

    pub fn not_regex(&self, actual: impl Into<Value>, pattern: &Regex) -> bool {
        self.match_pattern("not_regex", actual.into(), pattern, false)
    }

    /// Compare against the next positional snapshot of this unit
    pub fn snapshot(&self, value: impl Into<Value>) -> bool {
        let index = {
            let mut outcome = self.state.outcome.lock();
            let index = outcome.snapshot_index;
            outcome.snapshot_index += 1;
            index
        };
        if self.skipped {
            return true;
        }
        if !self.state.snapshots_enabled {
            return self.reject_hook_snapshot();
        }
        let key = SnapshotKey::indexed(self.state.title.clone(), index);
        self.compare_snapshot(key, value.into())
    }

    /// Compare against the snapshot recorded under an explicit id
    pub fn snapshot_with_id(&self, value: impl Into<Value>, id: impl Into<String>) -> bool {
        if self.skipped {
            return true;
        }
        if !self.state.snapshots_enabled {
            return self.reject_hook_snapshot();
        }
        let key = SnapshotKey::with_id(self.state.title.clone(), id);
        self.compare_snapshot(key, value.into())
    }

    fn reject_hook_snapshot(&self) -> bool {
        self.check("snapshot", false, || {
            FailureRecord::assertion("snapshot", "snapshot() can only be used in tests")
        })
    }

    fn compare_snapshot(&self, key: SnapshotKey, value: Value) -> bool {
        let services = &self.state.services;
        let prior = if services.update_snapshots {
            None
        } else {
            services.snapshots.get(&key)
        };
        let Some(expected) = prior else {
            services.snapshots.set(key, value);
            return self.check("snapshot", true, || unreachable_failure("snapshot"));
        };
        let comparison = services.comparator.compare(&value, &expected);
        self.check("snapshot", comparison.equal, || {
            FailureRecord::assertion("snapshot", format!("Did not match snapshot {key}"))
                .with_actual(value.render())
                .with_expected(expected.render())
                .with_diff(comparison.diff.clone())
        })
    }

    fn match_pattern(&self, name: &'static str, actual: Value, pattern: &Regex, expect_match: bool) -> bool {
        if self.skipped {
            return true;
        }
        let Some(text) = actual.as_str() else {
            return self.check(name, false, || {
                FailureRecord::assertion(name, format!("{name} must be used with a string"))
                    .with_actual(actual.render())
            });
        };
        let matched = pattern.is_match(text);
        self.check(name, matched == expect_match, || {
            let message = if expect_match {
                "Value must match expression"
            } else {
                "Value must not match expression"
            };
            FailureRecord::assertion(name, message)
                .with_actual(actual.render())
                .with_expected(pattern.as_str())
        })
    }

    fn like_matches(&self, actual: &Value, selector: &Value) -> Comparison {
        let (Some(selector_map), Some(actual_map)) = (selector.as_object(), actual.as_object()) else {
            return self.state.services.comparator.compare(actual, selector);
        };
        for (key, expected) in selector_map.iter() {
            let Some(found) = actual_map.get(key) else {
                return Comparison::different(format!("missing key `{key}`"));
            };
            let nested = self.like_matches(found, expected);
            if !nested.equal {
                let detail = nested.diff.unwrap_or_default();
                return Comparison::different(format!("at `{key}`:\n{detail}"));
            }
        }
        Comparison::equal()
    }

    /// Record the outcome of a check; the failure is built only when needed
    pub(crate) fn check<F>(&self, name: &str, ok: bool, failure: F) -> bool
    where
        F: FnOnce() -> FailureRecord,
    {
        if self.skipped {
            return true;
        }
        let mut outcome = self.state.outcome.lock();
        if outcome.finished {
            drop(outcome);
            self.warn_late(name);
            return ok;
        }
        if ok {
            outcome.passed += 1;
        } else {
            let mut record = failure();
            if let Some(message) = &self.message {
                record.message = message.clone();
            }
            outcome.failed += 1;
            outcome.failures.push(record);
        }
        ok
    }

    /// Record a failure that is not an assertion result (engine-level)
    pub(crate) fn record_engine_failure(&self, record: FailureRecord) {
        let mut outcome = self.state.outcome.lock();
        if outcome.finished {
            drop(outcome);
            self.warn_late(&record.assertion);
            return;
        }
        outcome.failures.push(record);
    }

    pub(crate) fn begin_pending(&self) {
        self.state.outcome.lock().pending += 1;
    }

    pub(crate) fn end_pending(&self) {
        let mut outcome = self.state.outcome.lock();
        outcome.pending = outcome.pending.saturating_sub(1);
    }

    /// Close the outcome: later assertions are ignored, plan and pending
    /// assertions are checked, and the final state is returned
    pub(crate) fn finalize(&self) -> AssertionOutcome {
        let mut outcome = self.state.outcome.lock();
        if outcome.finished {
            return outcome.clone();
        }
        outcome.finished = true;
        if outcome.pending > 0 {
            let pending = outcome.pending;
            outcome.failures.push(FailureRecord::new(
                FailureKind::UnawaitedAssertion,
                "throws",
                format!("{pending} asynchronous assertion(s) were never awaited"),
            ));
        }
        if let Some(planned) = outcome.planned {
            let recorded = outcome.recorded();
            if planned != recorded {
                outcome.failures.push(
                    FailureRecord::new(
                        FailureKind::PlanMismatch,
                        "plan",
                        format!("Planned for {planned} assertions, but got {recorded}"),
                    )
                    .with_actual(recorded.to_string())
                    .with_expected(planned.to_string()),
                );
            }
        }
        outcome.clone()
    }

    pub(crate) fn assertion_timeout(&self) -> Duration {
        self.state.services.assertion_timeout
    }

    fn warn_late(&self, name: &str) {
        unit_warn!(
            self.state.title,
            "⚠️ `{}` called after the unit finished; ignored",
            name
        );
    }
}

fn unreachable_failure(name: &str) -> FailureRecord {
    FailureRecord::assertion(name, "unconditional assertion")
}
