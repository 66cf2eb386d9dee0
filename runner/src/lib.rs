//! Test execution engine
//!
//! Declares tests and hooks, resolves macros into uniquely titled units,
//! runs them against fresh execution contexts with a non-fail-fast assertion
//! engine, and aggregates every outcome into a [`SuiteResult`](shared::SuiteResult).
//!
//! ```no_run
//! use runner::{Declaration, Implementation, Runner, RunnerConfig};
//!
//! # async fn demo() -> runner::RunnerResult<()> {
//! let mut suite = Runner::new(RunnerConfig::default());
//! suite
//!     .register(Declaration::test("adds").implementation(Implementation::sync(|t, _| {
//!         t.is(1 + 1, 2);
//!         Ok(())
//!     })))
//!     .ok();
//! let result = suite.run().await?;
//! assert!(result.is_success());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod runner;
pub mod services;
pub mod traits;

// Re-export commonly used types
pub use config::{RunnerConfig, RunnerConfigBuilder};
pub use crate::core::{
    Assertions, Declaration, DeclarationRegistry, ErrorExpectation, ExecutionContext, ExecutionPlan, Expectation,
    HookPhase, Implementation, Macro, Returned, ThrowsSource,
};
pub use error::{RegistrationError, RegistryResult, RunnerError, RunnerResult};
pub use runner::Runner;
pub use services::{ChannelOutcomeSink, JsonSnapshotStore, MemorySnapshotStore, StructuralComparator, TracingOutcomeSink};
pub use traits::{Comparator, Comparison, OutcomeSink, SnapshotKey, SnapshotStore};
pub use traits::{MockComparator, MockOutcomeSink, MockSnapshotStore};
