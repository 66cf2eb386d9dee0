//! Test helpers and builder patterns for runner tests

use parking_lot::Mutex;
use runner::{Declaration, Implementation, MemorySnapshotStore, Runner, RunnerConfig, StructuralComparator};
use runner::{OutcomeSink, TracingOutcomeSink};
use shared::{FailureKind, SuiteResult, UnitStatus};
use std::sync::Arc;

use super::fixtures::TestFixtures;

/// Ordered record of what ran, shared between unit bodies
#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    pub fn position(&self, event: &str) -> usize {
        self.events()
            .iter()
            .position(|e| e == event)
            .unwrap_or_else(|| panic!("event {event:?} not recorded in {:?}", self.events()))
    }

    pub fn count(&self, event: &str) -> usize {
        self.events().iter().filter(|e| e.as_str() == event).count()
    }

    /// Body recording `start:<title>` and `end:<title>` around a scheduler yield
    pub fn recorder(&self) -> Implementation {
        let log = self.clone();
        Implementation::new(move |t, _| {
            let log = log.clone();
            async move {
                log.push(format!("start:{}", t.title()));
                tokio::task::yield_now().await;
                t.pass();
                log.push(format!("end:{}", t.title()));
                Ok(())
            }
        })
    }

    /// Body recording only its title
    pub fn marker(&self) -> Implementation {
        let log = self.clone();
        Implementation::sync(move |t, _| {
            log.push(t.title().to_string());
            Ok(())
        })
    }
}

/// Builder for suites with sensible defaults
pub struct SuiteBuilder<O: OutcomeSink + 'static = TracingOutcomeSink> {
    config: RunnerConfig,
    snapshots: Arc<MemorySnapshotStore>,
    sink: Arc<O>,
    declarations: Vec<Declaration>,
}

impl SuiteBuilder {
    pub fn new() -> Self {
        Self {
            config: TestFixtures::config(),
            snapshots: Arc::new(MemorySnapshotStore::new()),
            sink: Arc::new(TracingOutcomeSink::new()),
            declarations: Vec::new(),
        }
    }
}

impl<O: OutcomeSink + 'static> SuiteBuilder<O> {
    pub fn with_config(mut self, config: RunnerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_snapshots(mut self, snapshots: Arc<MemorySnapshotStore>) -> Self {
        self.snapshots = snapshots;
        self
    }

    pub fn with_sink<P: OutcomeSink + 'static>(self, sink: P) -> SuiteBuilder<P> {
        SuiteBuilder {
            config: self.config,
            snapshots: self.snapshots,
            sink: Arc::new(sink),
            declarations: self.declarations,
        }
    }

    pub fn declare(mut self, declaration: Declaration) -> Self {
        self.declarations.push(declaration);
        self
    }

    pub fn build(self) -> Runner<StructuralComparator, MemorySnapshotStore, O> {
        let mut runner = Runner::with_services(
            self.config,
            Arc::new(StructuralComparator::new()),
            self.snapshots,
            self.sink,
        );
        runner.register_all(self.declarations);
        runner
    }

    pub async fn run(self) -> SuiteResult {
        self.build().run().await.expect("suite should run")
    }
}

/// Assertion helpers for suite results
pub struct TestHelpers;

impl TestHelpers {
    pub fn assert_counts(result: &SuiteResult, passed: usize, failed: usize, skipped: usize, todo: usize) {
        assert_eq!(
            (result.passed, result.failed, result.skipped, result.todo),
            (passed, failed, skipped, todo),
            "unexpected tallies; failures: {:?}",
            result.failures()
        );
    }

    pub fn assert_status(result: &SuiteResult, title: &str, status: UnitStatus) {
        let outcome = result
            .test(title)
            .unwrap_or_else(|| panic!("no outcome for {title:?}"));
        assert_eq!(outcome.status, status, "failures of {title:?}: {:?}", outcome.failures);
    }

    /// Failure kinds recorded for one test, in order
    pub fn failure_kinds(result: &SuiteResult, title: &str) -> Vec<FailureKind> {
        result
            .test(title)
            .map(|outcome| outcome.failures.iter().map(|f| f.kind).collect())
            .unwrap_or_default()
    }

    pub fn hook_titles(result: &SuiteResult) -> Vec<String> {
        result.hooks.iter().map(|h| h.title.clone()).collect()
    }
}
