//! Execution contexts
//!
//! An [`ExecutionContext`] is built fresh for every unit invocation. It
//! dereferences to the unit's [`Assertions`], carries the `context` value
//! threaded through the hook chain and, for `cb` units, owns the single-fire
//! completion latch signalled by [`ExecutionContext::end`].

use futures_util::FutureExt;
use parking_lot::Mutex;
use shared::{unit_warn, FailureKind, FailureRecord, Value};
use std::future::Future;
use std::ops::Deref;
use std::sync::Arc;
use tokio::sync::oneshot;

use super::assertions::{AssertionServices, Assertions};
use super::declaration::UnitFuture;
use super::resolver::ExecutionUnit;

/// Completion value sent through the latch: `Some` when `end` carried an error
pub(crate) type EndSignal = oneshot::Receiver<Option<Value>>;

type Teardown = Box<dyn FnOnce() -> UnitFuture + Send>;

struct EndLatch {
    sender: Mutex<Option<oneshot::Sender<Option<Value>>>>,
    receiver: Mutex<Option<EndSignal>>,
}

impl EndLatch {
    fn new() -> Self {
        let (sender, receiver) = oneshot::channel();
        Self {
            sender: Mutex::new(Some(sender)),
            receiver: Mutex::new(Some(receiver)),
        }
    }
}

struct ContextInner {
    title: String,
    assertions: Assertions,
    context: Mutex<Value>,
    end: Option<EndLatch>,
    teardowns: Mutex<Vec<Teardown>>,
}

/// Per-invocation handle passed to every test and hook body
#[derive(Clone)]
pub struct ExecutionContext {
    inner: Arc<ContextInner>,
}

impl ExecutionContext {
    fn new(title: String, unit: &ExecutionUnit, inherited: Value, services: AssertionServices) -> Self {
        let assertions = if unit.is_test() {
            Assertions::new(title.clone(), services)
        } else {
            Assertions::for_hook(title.clone(), services)
        };
        Self {
            inner: Arc::new(ContextInner {
                assertions,
                title,
                context: Mutex::new(inherited),
                end: unit.modifiers.cb.then(EndLatch::new),
                teardowns: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Resolved title of the running unit
    pub fn title(&self) -> &str {
        &self.inner.title
    }

    /// Assertion engine bound to this unit
    pub fn assert(&self) -> &Assertions {
        &self.inner.assertions
    }

    /// Current `context` value
    pub fn context(&self) -> Value {
        self.inner.context.lock().clone()
    }

    /// Replace the `context` value handed to later units in the chain
    pub fn set_context(&self, value: impl Into<Value>) {
        *self.inner.context.lock() = value.into();
    }

    /// Whether this context belongs to a `cb` unit
    pub fn is_callback(&self) -> bool {
        self.inner.end.is_some()
    }

    /// Signal completion of a `cb` unit, optionally with an error.
    ///
    /// Only the first call completes the unit; later calls are recorded as
    /// `MultipleCallbackEnd`.
    pub fn end(&self, error: Option<Value>) {
        let Some(latch) = &self.inner.end else {
            self.inner.assertions.record_engine_failure(FailureRecord::new(
                FailureKind::Uncaught,
                "end",
                "end() is only available in cb units",
            ));
            return;
        };
        match latch.sender.lock().take() {
            Some(sender) => {
                if sender.send(error).is_err() {
                    unit_warn!(self.inner.title, "⚠️ end() called after the unit settled");
                }
            }
            None => self.inner.assertions.record_engine_failure(FailureRecord::new(
                FailureKind::MultipleCallbackEnd,
                "end",
                "end() called more than once",
            )),
        }
    }

    /// Register a callback run after the body settles; last registered runs first
    pub fn teardown<F, Fut>(&self, f: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), Value>> + Send + 'static,
    {
        self.inner.teardowns.lock().push(Box::new(move || f().boxed()));
    }

    pub(crate) fn take_end_signal(&self) -> Option<EndSignal> {
        self.inner.end.as_ref().and_then(|latch| latch.receiver.lock().take())
    }

    pub(crate) fn take_teardowns(&self) -> Vec<Teardown> {
        let mut teardowns = std::mem::take(&mut *self.inner.teardowns.lock());
        teardowns.reverse();
        teardowns
    }
}

impl Deref for ExecutionContext {
    type Target = Assertions;

    fn deref(&self) -> &Assertions {
        &self.inner.assertions
    }
}

/// Builds contexts wired to the suite's collaborators
#[derive(Clone)]
pub struct ContextFactory {
    services: AssertionServices,
}

impl ContextFactory {
    pub(crate) fn new(services: AssertionServices) -> Self {
        Self { services }
    }

    /// Fresh context for a unit, seeded with the inherited `context` value
    pub fn create(&self, unit: &ExecutionUnit, inherited: Value) -> ExecutionContext {
        self.create_titled(unit.title.clone(), unit, inherited)
    }

    /// Fresh context under a different title, used for per-test hook instances
    pub(crate) fn create_titled(&self, title: String, unit: &ExecutionUnit, inherited: Value) -> ExecutionContext {
        ExecutionContext::new(title, unit, inherited, self.services.clone())
    }
}
