//! Scheduler
//!
//! Drives an [`ExecutionPlan`] on the current task:
//!
//! 1. `before` hooks, in order; the first failure is fatal to the suite
//! 2. tests: serial tests one at a time, the rest through a bounded
//!    concurrent pool, each bracketed by its `beforeEach`/`afterEach` hooks
//! 3. `after` hooks (skipped after a fatal `before`), then `after.always`
//!
//! Every settled unit is handed to the [`OutcomeSink`] as it settles and folded
//! into the [`SuiteResult`] once all lanes have drained.

use futures_util::stream::{self, StreamExt};
use futures_util::FutureExt;
use shared::logging::{log_suite_finish, log_suite_start};
use shared::{
    unit_debug, unit_error, unit_info, ErrorValue, FailureKind, FailureRecord, SuiteResult, UnitKind, UnitOutcome,
    UnitStatus, Value,
};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use super::context::{ContextFactory, ExecutionContext};
use super::declaration::{DeclarationKind, HookPhase};
use super::registry::{ExecutionPlan, HookBinding};
use super::resolver::{ExecutionUnit, ExpectedOutcome};
use crate::config::RunnerConfig;
use crate::traits::OutcomeSink;

/// Scheduling knobs taken from [`RunnerConfig`]
#[derive(Debug, Clone, Copy)]
pub struct SchedulerSettings {
    pub concurrency: usize,
    pub timeout: Duration,
    pub fail_fast: bool,
    pub fail_without_assertions: bool,
}

impl From<&RunnerConfig> for SchedulerSettings {
    fn from(config: &RunnerConfig) -> Self {
        Self {
            concurrency: config.concurrency.max(1),
            timeout: config.timeout,
            fail_fast: config.fail_fast,
            fail_without_assertions: config.fail_without_assertions,
        }
    }
}

/// How a unit body came to rest
enum Completion {
    Returned,
    Threw(Value),
    Ended,
    EndedWithError(Value),
    TimedOut,
}

/// Outcomes produced for one planned test
struct TestReport {
    test: UnitOutcome,
    hooks: Vec<UnitOutcome>,
}

pub struct Scheduler {
    settings: SchedulerSettings,
    factory: ContextFactory,
    sink: Arc<dyn OutcomeSink>,
}

impl Scheduler {
    pub(crate) fn new(settings: SchedulerSettings, factory: ContextFactory, sink: Arc<dyn OutcomeSink>) -> Self {
        Self {
            settings,
            factory,
            sink,
        }
    }

    /// Run the whole plan, folding every outcome into `result`
    pub async fn run(&self, plan: &ExecutionPlan, mut result: SuiteResult) -> SuiteResult {
        let run_id = result.run_id;
        log_suite_start(
            &run_id,
            &format!(
                "{} runnable, {} skipped, {} todo, {} hooks",
                plan.tests.len(),
                plan.skipped.len(),
                plan.todo.len(),
                plan.hooks.len()
            ),
        );

        for title in &plan.skipped {
            self.settle_not_executed(&mut result, title, UnitStatus::Skipped).await;
        }
        for title in &plan.todo {
            self.settle_not_executed(&mut result, title, UnitStatus::Todo).await;
        }

        let (baseline, fatal) = self.run_before_hooks(plan, &mut result).await;

        if fatal {
            result.not_run += plan.tests.len();
        } else {
            let stopped = AtomicBool::new(false);
            let not_run = AtomicUsize::new(0);
            let (serial, concurrent): (Vec<&ExecutionUnit>, Vec<&ExecutionUnit>) =
                plan.tests.iter().partition(|unit| unit.modifiers.serial);

            let (baseline, stopped, not_run_ref) = (&baseline, &stopped, &not_run);

            let serial_lane = async move {
                let mut reports = Vec::new();
                for unit in serial {
                    reports.push(self.run_test(plan, unit, baseline, stopped, not_run_ref).await);
                }
                reports
            };
            let concurrent_lane = stream::iter(concurrent)
                .map(move |unit| self.run_test(plan, unit, baseline, stopped, not_run_ref))
                .buffer_unordered(self.settings.concurrency)
                .collect::<Vec<_>>();

            let (serial_reports, concurrent_reports) = futures_util::join!(serial_lane, concurrent_lane);
            for report in serial_reports.into_iter().chain(concurrent_reports).flatten() {
                for hook in report.hooks {
                    result.record_hook(hook);
                }
                result.record_test(report.test);
            }
            result.not_run += not_run.load(Ordering::SeqCst);
        }

        self.run_after_hooks(plan, &baseline, fatal, &mut result).await;

        result.finish();
        log_suite_finish(
            &run_id,
            &format!(
                "{} passed, {} failed, {} skipped, {} todo, {} not run",
                result.passed, result.failed, result.skipped, result.todo, result.not_run
            ),
        );
        self.sink.suite_settled(&result).await;
        result
    }

    async fn settle_not_executed(&self, result: &mut SuiteResult, title: &str, status: UnitStatus) {
        let outcome = UnitOutcome::not_executed(title, status);
        self.sink.unit_settled(&outcome).await;
        result.record_test(outcome);
    }

    /// Returns the `context` baseline produced by the chain and whether it failed
    async fn run_before_hooks(&self, plan: &ExecutionPlan, result: &mut SuiteResult) -> (Value, bool) {
        let mut baseline = Value::Undefined;
        for binding in plan.hooks(HookPhase::Before) {
            let t = self.factory.create(&binding.unit, baseline.clone());
            let outcome = self.settle_hook(binding, &t).await;
            let failed = outcome.failed();
            result.record_hook(outcome);
            if failed {
                unit_error!(binding.unit.title, "💥 before hook failed; no tests will run");
                return (baseline, true);
            }
            baseline = t.context();
        }
        (baseline, false)
    }

    async fn run_after_hooks(&self, plan: &ExecutionPlan, baseline: &Value, fatal: bool, result: &mut SuiteResult) {
        if !fatal {
            for binding in plan.hooks(HookPhase::After) {
                let t = self.factory.create(&binding.unit, baseline.clone());
                let outcome = self.settle_hook(binding, &t).await;
                let failed = outcome.failed();
                result.record_hook(outcome);
                if failed {
                    break;
                }
            }
        }
        for binding in plan.hooks(HookPhase::AfterAlways) {
            let t = self.factory.create(&binding.unit, baseline.clone());
            let outcome = self.settle_hook(binding, &t).await;
            result.record_hook(outcome);
        }
    }

    /// One test bracketed by its per-test hooks; `None` when fail-fast stopped it
    async fn run_test(
        &self,
        plan: &ExecutionPlan,
        unit: &ExecutionUnit,
        baseline: &Value,
        stopped: &AtomicBool,
        not_run: &AtomicUsize,
    ) -> Option<TestReport> {
        if stopped.load(Ordering::SeqCst) {
            unit_debug!(unit.title, "⏭️ not started after an earlier failure");
            not_run.fetch_add(1, Ordering::SeqCst);
            return None;
        }

        let t = self.factory.create(unit, baseline.clone());
        let mut hooks = Vec::new();
        let mut setup_failure = None;

        for binding in plan.hooks(HookPhase::BeforeEach) {
            let hook = self.per_test_context(binding, unit, &t);
            let outcome = self.settle_hook(binding, &hook).await;
            let failed = outcome.failed();
            hooks.push(outcome);
            if failed {
                setup_failure = Some(FailureRecord::new(
                    FailureKind::HookFailure,
                    HookPhase::BeforeEach.to_string(),
                    format!("{} failed", hook.title()),
                ));
                break;
            }
            t.set_context(hook.context());
        }

        let test = match setup_failure {
            Some(failure) => {
                t.assert().finalize();
                UnitOutcome {
                    status: UnitStatus::Failed,
                    failures: vec![failure],
                    ..UnitOutcome::not_executed(unit.title.clone(), UnitStatus::Failed)
                }
            }
            None => {
                let outcome = self.execute(unit, &t).await;
                self.judge_test(unit, outcome)
            }
        };
        unit_info!(unit.title, "{} {:?}", status_icon(test.status), test.status);
        self.sink.unit_settled(&test).await;
        if test.failed() && self.settings.fail_fast {
            stopped.store(true, Ordering::SeqCst);
        }

        let mut after_each_failed = false;
        for binding in plan.hooks(HookPhase::AfterEach) {
            if after_each_failed {
                break;
            }
            let hook = self.per_test_context(binding, unit, &t);
            let outcome = self.settle_hook(binding, &hook).await;
            after_each_failed = outcome.failed();
            hooks.push(outcome);
            t.set_context(hook.context());
        }
        for binding in plan.hooks(HookPhase::AfterEachAlways) {
            let hook = self.per_test_context(binding, unit, &t);
            hooks.push(self.settle_hook(binding, &hook).await);
            t.set_context(hook.context());
        }

        Some(TestReport { test, hooks })
    }

    fn per_test_context(&self, binding: &HookBinding, test: &ExecutionUnit, t: &ExecutionContext) -> ExecutionContext {
        let title = format!("{} for \"{}\"", binding.unit.title, test.title);
        self.factory.create_titled(title, &binding.unit, t.context())
    }

    async fn settle_hook(&self, binding: &HookBinding, t: &ExecutionContext) -> UnitOutcome {
        let outcome = self.execute(&binding.unit, t).await;
        if outcome.failed() {
            unit_info!(t.title(), "❌ hook failed");
        }
        self.sink.unit_settled(&outcome).await;
        outcome
    }

    /// Run a body to completion under the unit deadline, then its teardowns
    async fn execute(&self, unit: &ExecutionUnit, t: &ExecutionContext) -> UnitOutcome {
        unit_debug!(t.title(), "▶️ running");
        let started = Instant::now();
        let body = unit.invoke(t.clone());
        let end_signal = t.take_end_signal();

        let completion = async {
            match AssertUnwindSafe(body).catch_unwind().await {
                Ok(Ok(())) => {}
                Ok(Err(thrown)) => return Completion::Threw(thrown),
                Err(panic) => return Completion::Threw(panic_value(panic)),
            }
            let Some(signal) = end_signal else {
                return Completion::Returned;
            };
            match signal.await {
                Ok(None) => Completion::Ended,
                Ok(Some(error)) => Completion::EndedWithError(error),
                Err(_) => Completion::TimedOut,
            }
        };
        let completion = tokio::time::timeout(self.settings.timeout, completion)
            .await
            .unwrap_or(Completion::TimedOut);

        for teardown in t.take_teardowns() {
            let failure = match AssertUnwindSafe(teardown()).catch_unwind().await {
                Ok(Ok(())) => continue,
                Ok(Err(thrown)) => thrown,
                Err(panic) => panic_value(panic),
            };
            t.assert().record_engine_failure(
                FailureRecord::new(FailureKind::Uncaught, "teardown", format!("Teardown failed: {failure}"))
                    .with_actual(failure.render()),
            );
        }

        let mut outcome = t.assert().finalize();
        match completion {
            Completion::Returned | Completion::Ended => {}
            Completion::Threw(thrown) => outcome.failures.push(
                FailureRecord::new(FailureKind::Uncaught, "", format!("Uncaught exception: {thrown}"))
                    .with_actual(thrown.render()),
            ),
            Completion::EndedWithError(error) => outcome.failures.push(
                FailureRecord::new(FailureKind::CallbackError, "end", format!("Callback ended with error: {error}"))
                    .with_actual(error.render()),
            ),
            Completion::TimedOut => {
                outcome.passed = 0;
                outcome.failed = 0;
                outcome.failures.retain(|failure| !discarded_on_timeout(failure.kind));
                outcome.failures.push(if t.is_callback() {
                    FailureRecord::new(
                        FailureKind::CallbackNeverCalled,
                        "end",
                        format!("end() was not called within {:?}", self.settings.timeout),
                    )
                } else {
                    FailureRecord::new(
                        FailureKind::Timeout,
                        "",
                        format!("Timed out after {:?}", self.settings.timeout),
                    )
                });
            }
        }

        let status = if outcome.failures.is_empty() {
            UnitStatus::Passed
        } else {
            UnitStatus::Failed
        };
        UnitOutcome {
            title: t.title().to_string(),
            unit: match unit.kind {
                DeclarationKind::Test => UnitKind::Test,
                DeclarationKind::Hook(phase) => UnitKind::Hook(phase.to_string()),
            },
            status,
            assertions: outcome.counts(),
            failures: outcome.failures,
            logs: outcome.logs,
            duration_ms: whole_millis(started.elapsed()),
        }
    }

    /// Test-only rules applied to a body outcome: empty tests and `failing` inversion
    fn judge_test(&self, unit: &ExecutionUnit, mut outcome: UnitOutcome) -> UnitOutcome {
        if self.settings.fail_without_assertions
            && outcome.assertions.planned.is_none()
            && outcome.assertions.total() == 0
            && outcome.failures.is_empty()
        {
            outcome.failures.push(FailureRecord::new(
                FailureKind::NoAssertions,
                "",
                "Test finished without running any assertions",
            ));
            outcome.status = UnitStatus::Failed;
        }

        if unit.expected != ExpectedOutcome::Failing {
            return outcome;
        }
        match outcome.status {
            UnitStatus::Failed => {
                let reason = outcome
                    .failures
                    .first()
                    .map(|failure| failure.message.clone())
                    .unwrap_or_default();
                outcome.logs.push(format!("expected failure: {reason}"));
                outcome.failures.clear();
                outcome.status = UnitStatus::Passed;
            }
            _ => {
                outcome.failures.push(FailureRecord::new(
                    FailureKind::ExpectedFailureButPassed,
                    "",
                    "Test was expected to fail, but succeeded; remove `failing` if it is fixed",
                ));
                outcome.status = UnitStatus::Failed;
            }
        }
        outcome
    }
}

/// Milliseconds, saturating at `u64::MAX`
fn whole_millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

/// Records derived from a timed-out unit's partial state
fn discarded_on_timeout(kind: FailureKind) -> bool {
    matches!(
        kind,
        FailureKind::Assertion | FailureKind::PlanMismatch | FailureKind::UnawaitedAssertion
    )
}

fn panic_value(panic: Box<dyn Any + Send>) -> Value {
    let message = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string());
    ErrorValue::plain(message).with_name("Panic").into_value()
}

fn status_icon(status: UnitStatus) -> &'static str {
    match status {
        UnitStatus::Passed => "✅",
        UnitStatus::Failed => "❌",
        UnitStatus::Skipped => "⏭️",
        UnitStatus::Todo => "📝",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_millis_saturates() {
        assert_eq!(whole_millis(Duration::from_micros(2_500)), 2);
        assert_eq!(whole_millis(Duration::MAX), u64::MAX);
    }

    #[test]
    fn test_timeout_keeps_engine_failures_only() {
        assert!(discarded_on_timeout(FailureKind::Assertion));
        assert!(discarded_on_timeout(FailureKind::UnawaitedAssertion));
        assert!(discarded_on_timeout(FailureKind::PlanMismatch));
        assert!(!discarded_on_timeout(FailureKind::MultipleCallbackEnd));
        assert!(!discarded_on_timeout(FailureKind::Uncaught));
    }
}
