//! Core engine logic
//!
//! Declarations, macro resolution, assertion evaluation, execution contexts
//! and scheduling. Nothing here performs I/O; collaborators are reached
//! through the traits in [`crate::traits`].

pub mod assertions;
pub mod context;
pub mod declaration;
pub mod filter;
pub mod registry;
pub mod resolver;
pub mod scheduler;
pub mod throws;

pub use assertions::{AssertionOutcome, Assertions};
pub use context::{ContextFactory, ExecutionContext};
pub use declaration::{Body, Declaration, DeclarationKind, HookPhase, Implementation, Macro, Modifiers, UnitFuture};
pub use filter::TitleFilter;
pub use registry::{DeclarationRegistry, ExecutionPlan, HookBinding};
pub use resolver::{ExecutionUnit, ExpectedOutcome, MacroResolver, TitleLedger, ANONYMOUS_TITLE};
pub use scheduler::{Scheduler, SchedulerSettings};
pub use throws::{
    ErrorExpectation, Expectation, MessageMatch, PendingAssertion, Returned, Settlement, ThrowsSource,
};
