//! Unit-level behaviour observed through full runs
//!
//! Callback units, `failing` inversion, teardowns, macros and the mocked
//! collaborator seams.

use assert_matches::assert_matches;
use runner::{
    Comparison, Declaration, Expectation, Implementation, Macro, MemorySnapshotStore, MockComparator,
    RegistrationError, Runner, RunnerConfig, ThrowsSource, TracingOutcomeSink,
};
use shared::{FailureKind, UnitStatus, Value};
use std::sync::Arc;

mod common;
use common::{EventLog, SuiteBuilder, TestFixtures, TestHelpers};

#[tokio::test]
async fn test_callback_unit_completes_on_end() {
    let result = SuiteBuilder::new()
        .declare(Declaration::test("later").cb().implementation(Implementation::sync(|t, _| {
            let t = t.clone();
            tokio::spawn(async move {
                tokio::task::yield_now().await;
                t.pass();
                t.end(None);
            });
            Ok(())
        })))
        .run()
        .await;

    TestHelpers::assert_status(&result, "later", UnitStatus::Passed);
    assert_eq!(result.passed_assertions, 1);
}

#[tokio::test]
async fn test_callback_end_twice_fails() {
    let result = SuiteBuilder::new()
        .declare(Declaration::test("twice").cb().implementation(Implementation::sync(|t, _| {
            t.pass();
            t.end(None);
            t.end(None);
            Ok(())
        })))
        .run()
        .await;

    TestHelpers::assert_status(&result, "twice", UnitStatus::Failed);
    assert_eq!(TestHelpers::failure_kinds(&result, "twice"), vec![FailureKind::MultipleCallbackEnd]);
}

#[tokio::test]
async fn test_callback_end_with_error_fails() {
    let result = SuiteBuilder::new()
        .declare(Declaration::test("errored").cb().implementation(Implementation::sync(|t, _| {
            t.end(Some(TestFixtures::type_error("callback said no")));
            Ok(())
        })))
        .run()
        .await;

    assert_eq!(TestHelpers::failure_kinds(&result, "errored"), vec![FailureKind::CallbackError]);
}

#[tokio::test(start_paused = true)]
async fn test_callback_never_called() {
    let result = SuiteBuilder::new()
        .declare(Declaration::test("forgotten").cb().implementation(Implementation::sync(|t, _| {
            t.pass();
            t.pass();
            Ok(())
        })))
        .declare(Declaration::test("fine").implementation(TestFixtures::passing(1)))
        .run()
        .await;

    let outcome = result.test("forgotten").unwrap();
    assert_eq!(outcome.status, UnitStatus::Failed);
    assert_eq!(outcome.assertions.passed, 0);
    assert_eq!(TestHelpers::failure_kinds(&result, "forgotten"), vec![FailureKind::CallbackNeverCalled]);
    assert_eq!(result.passed_assertions, 1);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_discards_partial_assertion_state() {
    let config = RunnerConfig::builder()
        .timeout(TestFixtures::UNIT_TIMEOUT)
        .assertion_timeout(TestFixtures::UNIT_TIMEOUT * 5)
        .build();
    let result = SuiteBuilder::new()
        .with_config(config)
        .declare(Declaration::test("stuck").implementation(Implementation::new(|t, _| async move {
            t.plan(3);
            t.pass();
            t.not_throws(ThrowsSource::promise(std::future::pending::<Result<Value, Value>>()))
                .await;
            Ok(())
        })))
        .run()
        .await;

    let outcome = result.test("stuck").unwrap();
    assert_eq!(TestHelpers::failure_kinds(&result, "stuck"), vec![FailureKind::Timeout]);
    assert_eq!(outcome.assertions.total(), 0);
    assert_eq!(result.passed_assertions, 0);
}

#[tokio::test]
async fn test_failing_inverts_outcomes() {
    let result = SuiteBuilder::new()
        .declare(Declaration::test("known bug").failing().implementation(TestFixtures::failing_assertion()))
        .declare(Declaration::test("fixed bug").failing().implementation(TestFixtures::passing(1)))
        .declare(Declaration::test("throws").failing().implementation(TestFixtures::throwing("still broken")))
        .run()
        .await;

    TestHelpers::assert_status(&result, "known bug", UnitStatus::Passed);
    TestHelpers::assert_status(&result, "throws", UnitStatus::Passed);
    TestHelpers::assert_status(&result, "fixed bug", UnitStatus::Failed);
    assert_eq!(
        TestHelpers::failure_kinds(&result, "fixed bug"),
        vec![FailureKind::ExpectedFailureButPassed]
    );
    assert!(result.test("known bug").unwrap().failures.is_empty());
    assert!(result.test("known bug").unwrap().logs[0].starts_with("expected failure"));
}

#[tokio::test]
async fn test_plan_mismatch_fails_at_finalization() {
    let result = SuiteBuilder::new()
        .declare(Declaration::test("over").implementation(Implementation::sync(|t, _| {
            t.plan(1);
            t.pass();
            t.pass();
            Ok(())
        })))
        .declare(Declaration::test("mixed").implementation(Implementation::sync(|t, _| {
            t.plan(2);
            t.pass();
            t.fail();
            Ok(())
        })))
        .run()
        .await;

    assert_eq!(TestHelpers::failure_kinds(&result, "over"), vec![FailureKind::PlanMismatch]);
    assert_eq!(TestHelpers::failure_kinds(&result, "mixed"), vec![FailureKind::Assertion]);
}

#[tokio::test]
async fn test_uncaught_errors_and_panics() {
    let result = SuiteBuilder::new()
        .declare(Declaration::test("throws").implementation(TestFixtures::throwing("boom")))
        .declare(Declaration::test("panics").implementation(Implementation::sync(|t, _| {
            t.pass();
            panic!("kaboom");
        })))
        .run()
        .await;

    assert_eq!(TestHelpers::failure_kinds(&result, "throws"), vec![FailureKind::Uncaught]);
    let panicked = result.test("panics").unwrap();
    assert_eq!(panicked.failures[0].kind, FailureKind::Uncaught);
    assert!(panicked.failures[0].message.contains("kaboom"));
    assert_eq!(panicked.assertions.passed, 1);
}

#[tokio::test]
async fn test_unawaited_async_assertion_fails_unit() {
    let result = SuiteBuilder::new()
        .declare(Declaration::test("forgot await").implementation(Implementation::sync(|t, _| {
            let pending = t.throws(
                ThrowsSource::promise(async { Err::<Value, _>(TestFixtures::type_error("x")) }),
                Expectation::Any,
            );
            drop(pending);
            Ok(())
        })))
        .run()
        .await;

    assert_eq!(
        TestHelpers::failure_kinds(&result, "forgot await"),
        vec![FailureKind::UnawaitedAssertion]
    );
}

#[tokio::test]
async fn test_fail_without_assertions() {
    let config = RunnerConfig::builder().fail_without_assertions(true).build();
    let result = SuiteBuilder::new()
        .with_config(config)
        .declare(Declaration::test("empty").implementation(TestFixtures::noop()))
        .declare(Declaration::test("planned empty").implementation(Implementation::sync(|t, _| {
            t.plan(0);
            Ok(())
        })))
        .run()
        .await;

    assert_eq!(TestHelpers::failure_kinds(&result, "empty"), vec![FailureKind::NoAssertions]);
    TestHelpers::assert_status(&result, "planned empty", UnitStatus::Passed);
}

#[tokio::test]
async fn test_teardowns_run_in_reverse_and_can_fail() {
    let log = EventLog::new();
    let teardown_log = log.clone();

    let result = SuiteBuilder::new()
        .declare(Declaration::test("resources").implementation(Implementation::sync(move |t, _| {
            for name in ["db", "cache"] {
                let log = teardown_log.clone();
                t.teardown(move || async move {
                    log.push(format!("close:{name}"));
                    Ok(())
                });
            }
            t.teardown(|| async { Err(Value::from("leaked handle")) });
            t.pass();
            Ok(())
        })))
        .run()
        .await;

    assert_eq!(log.events(), vec!["close:cache", "close:db"]);
    let outcome = result.test("resources").unwrap();
    assert_eq!(outcome.status, UnitStatus::Failed);
    assert!(outcome.failures[0].message.contains("leaked handle"));
}

#[tokio::test]
async fn test_macros_expand_into_titled_units() {
    let sum = Macro::new(Implementation::sync(|t, args| {
        let total: f64 = args[..2].iter().filter_map(Value::as_number).sum();
        t.is(total, args[2].clone());
        Ok(())
    }))
    .with_title(|_, args| Some(format!("{} + {} = {}", args[0], args[1], args[2])));

    let result = SuiteBuilder::new()
        .declare(Declaration::untitled_test().using(sum.clone()).args([1, 2, 3]))
        .declare(Declaration::untitled_test().using(sum.clone()).args([2, 2, 5]))
        .declare(Declaration::test("explicit").using(sum).args([3, 3, 6]))
        .run()
        .await;

    TestHelpers::assert_status(&result, "1 + 2 = 3", UnitStatus::Passed);
    TestHelpers::assert_status(&result, "2 + 2 = 5", UnitStatus::Failed);
    TestHelpers::assert_status(&result, "explicit", UnitStatus::Passed);
    assert!(result.test("explicit 3 + 3 = 6").is_none());
}

#[tokio::test]
async fn test_macro_array_rejections_are_per_element() {
    let mut runner = Runner::new(TestFixtures::config());
    runner
        .register(Declaration::test("taken").implementation(TestFixtures::passing(1)))
        .unwrap();
    let rejected = runner.register(Declaration::untitled_test().macros(vec![
        Macro::new(TestFixtures::passing(1)).with_title(|_, _| Some("taken (a)".to_string())),
        Macro::new(TestFixtures::passing(1)).with_title(|_, _| Some("taken".to_string())),
    ]));
    assert_matches!(rejected, Err(RegistrationError::PartiallyRegistered { registered: 1, .. }));

    let result = runner.run().await.unwrap();
    TestHelpers::assert_counts(&result, 2, 0, 0, 0);
    assert!(result.test("taken (a)").is_some());
    assert_eq!(result.registration_errors.len(), 1);
}

#[tokio::test]
async fn test_deep_equal_uses_injected_comparator() {
    let mut comparator = MockComparator::new();
    comparator
        .expect_compare()
        .times(1)
        .returning(|_, _| Comparison::different("custom diff"));

    let mut runner = Runner::with_services(
        TestFixtures::config(),
        Arc::new(comparator),
        Arc::new(MemorySnapshotStore::new()),
        Arc::new(TracingOutcomeSink::new()),
    );
    runner
        .register(Declaration::test("compared").implementation(Implementation::sync(|t, _| {
            t.deep_equal(1, 1);
            Ok(())
        })))
        .unwrap();

    let result = runner.run().await.unwrap();
    let failure = &result.test("compared").unwrap().failures[0];
    assert_eq!(failure.assertion, "deep_equal");
    assert_eq!(failure.diff.as_deref(), Some("custom diff"));
}

#[tokio::test]
async fn test_invalid_configuration_is_rejected() {
    let config = RunnerConfig::builder().concurrency(0).build();
    let runner = Runner::new(config);
    assert!(runner.run().await.is_err());
}

#[tokio::test]
async fn test_todo_and_skip_are_reported_without_running() {
    let log = EventLog::new();
    let result = SuiteBuilder::new()
        .declare(Declaration::todo("write me"))
        .declare(Declaration::test("parked").skip().implementation(log.marker()))
        .run()
        .await;

    assert!(log.events().is_empty());
    TestHelpers::assert_counts(&result, 0, 0, 1, 1);
    let todo = result.test("write me").unwrap();
    assert_eq!(todo.status, UnitStatus::Todo);
    assert_eq!(todo.assertions.total(), 0);
}
