//! Runner facade
//!
//! Owns one suite's [`DeclarationRegistry`] and the injected collaborators,
//! and runs the suite through the [`Scheduler`]. Production code uses
//! [`Runner::new`]; tests inject mocks through [`Runner::with_services`].

use shared::logging::{init_tracing, log_error};
use shared::{RunId, SuiteResult};
use std::sync::Arc;

use crate::config::RunnerConfig;
use crate::core::assertions::AssertionServices;
use crate::core::{ContextFactory, Declaration, DeclarationRegistry, ExecutionPlan, Scheduler, TitleFilter};
use crate::error::{RegistrationError, RegistryResult, RunnerResult};
use crate::services::{MemorySnapshotStore, StructuralComparator, TracingOutcomeSink};
use crate::traits::{Comparator, OutcomeSink, SnapshotStore};

/// A suite of declarations plus the services it runs against
pub struct Runner<C = StructuralComparator, S = MemorySnapshotStore, O = TracingOutcomeSink>
where
    C: Comparator + 'static,
    S: SnapshotStore + 'static,
    O: OutcomeSink + 'static,
{
    config: RunnerConfig,
    registry: DeclarationRegistry,
    comparator: Arc<C>,
    snapshots: Arc<S>,
    sink: Arc<O>,
}

impl Runner {
    /// Runner with the structural comparator, an in-memory snapshot store and tracing output
    pub fn new(config: RunnerConfig) -> Self {
        Self::with_services(
            config,
            Arc::new(StructuralComparator::new()),
            Arc::new(MemorySnapshotStore::new()),
            Arc::new(TracingOutcomeSink::new()),
        )
    }

    /// Load configuration from `RUNNER_*` variables and install tracing at its log level
    pub fn from_env() -> RunnerResult<Self> {
        let config = RunnerConfig::from_env()?;
        init_tracing(Some(&config.log_level));
        Ok(Self::new(config))
    }
}

impl<C, S, O> Runner<C, S, O>
where
    C: Comparator + 'static,
    S: SnapshotStore + 'static,
    O: OutcomeSink + 'static,
{
    /// Create a runner with injected dependencies
    pub fn with_services(config: RunnerConfig, comparator: Arc<C>, snapshots: Arc<S>, sink: Arc<O>) -> Self {
        Self {
            config,
            registry: DeclarationRegistry::new(),
            comparator,
            snapshots,
            sink,
        }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub fn registry(&self) -> &DeclarationRegistry {
        &self.registry
    }

    pub fn snapshots(&self) -> &Arc<S> {
        &self.snapshots
    }

    /// Register a test or hook declaration
    pub fn register(&mut self, declaration: Declaration) -> RegistryResult<usize> {
        self.registry.register(declaration)
    }

    /// Register several declarations, collecting every rejection
    pub fn register_all<I>(&mut self, declarations: I) -> Vec<RegistrationError>
    where
        I: IntoIterator<Item = Declaration>,
    {
        declarations
            .into_iter()
            .filter_map(|declaration| self.registry.register(declaration).err())
            .collect()
    }

    /// Plan the run, honouring `.only` and the configured match patterns
    pub fn plan(&self) -> RunnerResult<ExecutionPlan> {
        let filter = TitleFilter::new(&self.config.match_patterns)?;
        Ok(self.registry.build_plan_with(&filter))
    }

    /// Run every planned unit once and return the aggregated result
    pub async fn run(&self) -> RunnerResult<SuiteResult> {
        let run_id = RunId::new();
        if let Err(error) = self.config.validate() {
            log_error(&run_id, "configuration", &error);
            return Err(error.into());
        }
        let plan = self.plan()?;

        let mut result = SuiteResult::new(run_id);
        for rejection in self.registry.rejections() {
            result.record_registration_error(rejection.to_string());
        }

        let services = AssertionServices {
            comparator: self.comparator.clone(),
            snapshots: self.snapshots.clone(),
            update_snapshots: self.config.update_snapshots,
            assertion_timeout: self.config.assertion_timeout,
        };
        let scheduler = Scheduler::new(
            (&self.config).into(),
            ContextFactory::new(services),
            self.sink.clone(),
        );
        Ok(scheduler.run(&plan, result).await)
    }
}
