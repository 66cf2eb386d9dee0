//! `throws` / `not_throws`
//!
//! Both assertions take one tagged [`ThrowsSource`]: a callable that may throw
//! synchronously (or return a promise/observable), a promise-like future, or
//! an observable-like stream. Synchronous outcomes are recorded before the
//! call returns; asynchronous ones are recorded when the returned
//! [`PendingAssertion`] settles.

use futures_util::future::BoxFuture;
use futures_util::stream::BoxStream;
use futures_util::{FutureExt, StreamExt};
use regex::Regex;
use shared::{ErrorValue, FailureRecord, Value};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use super::assertions::Assertions;
use futures_util::Stream;

/// Result of a promise-like source: `Err` is the rejection reason
pub type Settlement = Result<Value, Value>;

/// What a callable source produced when it did not throw
pub enum Returned {
    Value(Value),
    Promise(BoxFuture<'static, Settlement>),
    Observable(BoxStream<'static, Settlement>),
}

impl Returned {
    pub fn promise<F, T>(future: F) -> Self
    where
        F: Future<Output = Result<T, Value>> + Send + 'static,
        T: Into<Value>,
    {
        Returned::Promise(future.map(|r| r.map(Into::into)).boxed())
    }

    pub fn observable<S, T>(stream: S) -> Self
    where
        S: Stream<Item = Result<T, Value>> + Send + 'static,
        T: Into<Value>,
    {
        Returned::Observable(stream.map(|r| r.map(Into::into)).boxed())
    }
}

type Callable = Box<dyn FnOnce() -> Result<Returned, Value> + Send>;

/// Input accepted by `throws` and `not_throws`
pub enum ThrowsSource {
    Callable(Callable),
    Promise(BoxFuture<'static, Settlement>),
    Observable(BoxStream<'static, Settlement>),
}

impl ThrowsSource {
    /// A zero-argument function that may throw synchronously
    pub fn sync<F, T>(f: F) -> Self
    where
        F: FnOnce() -> Result<T, Value> + Send + 'static,
        T: Into<Value>,
    {
        ThrowsSource::Callable(Box::new(move || f().map(|v| Returned::Value(v.into()))))
    }

    /// A function that may throw or return a promise/observable
    pub fn callable<F>(f: F) -> Self
    where
        F: FnOnce() -> Result<Returned, Value> + Send + 'static,
    {
        ThrowsSource::Callable(Box::new(f))
    }

    /// A promise-like value
    pub fn promise<F, T>(future: F) -> Self
    where
        F: Future<Output = Result<T, Value>> + Send + 'static,
        T: Into<Value>,
    {
        ThrowsSource::Promise(future.map(|r| r.map(Into::into)).boxed())
    }

    /// An observable-like value: it errors on its first `Err` item
    pub fn observable<S, T>(stream: S) -> Self
    where
        S: Stream<Item = Result<T, Value>> + Send + 'static,
        T: Into<Value>,
    {
        ThrowsSource::Observable(stream.map(|r| r.map(Into::into)).boxed())
    }
}

/// How an error message must look
#[derive(Debug, Clone)]
pub enum MessageMatch {
    Exact(String),
    Pattern(Regex),
}

impl MessageMatch {
    fn matches(&self, message: &str) -> bool {
        match self {
            MessageMatch::Exact(expected) => expected == message,
            MessageMatch::Pattern(pattern) => pattern.is_match(message),
        }
    }
}

impl fmt::Display for MessageMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageMatch::Exact(expected) => write!(f, "{expected:?}"),
            MessageMatch::Pattern(pattern) => write!(f, "/{}/", pattern.as_str()),
        }
    }
}

/// Structured expectation; every provided field must hold
#[derive(Debug, Clone, Default)]
pub struct ErrorExpectation {
    pub instance_of: Option<String>,
    /// Strict identity against a specific error value
    pub is: Option<Value>,
    pub message: Option<MessageMatch>,
    pub name: Option<String>,
}

impl ErrorExpectation {
    pub fn instance_of(mut self, constructor: impl Into<String>) -> Self {
        self.instance_of = Some(constructor.into());
        self
    }

    pub fn is(mut self, error: impl Into<Value>) -> Self {
        self.is = Some(error.into());
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(MessageMatch::Exact(message.into()));
        self
    }

    pub fn message_matching(mut self, pattern: Regex) -> Self {
        self.message = Some(MessageMatch::Pattern(pattern));
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Optional expectation about the thrown error
#[derive(Debug, Clone, Default)]
pub enum Expectation {
    #[default]
    Any,
    /// Constructor name, checked through the error's lineage
    InstanceOf(String),
    /// Pattern checked against the error message
    MessagePattern(Regex),
    /// Exact error message
    Message(String),
    Structured(ErrorExpectation),
}

impl Expectation {
    fn into_structured(self) -> ErrorExpectation {
        match self {
            Expectation::Any => ErrorExpectation::default(),
            Expectation::InstanceOf(constructor) => ErrorExpectation::default().instance_of(constructor),
            Expectation::MessagePattern(pattern) => ErrorExpectation::default().message_matching(pattern),
            Expectation::Message(message) => ErrorExpectation::default().message(message),
            Expectation::Structured(structured) => structured,
        }
    }
}

impl From<ErrorExpectation> for Expectation {
    fn from(structured: ErrorExpectation) -> Self {
        Expectation::Structured(structured)
    }
}

/// Result of `throws`/`not_throws`; already settled for synchronous sources
#[must_use = "asynchronous assertions must be awaited"]
pub struct PendingAssertion<T> {
    inner: BoxFuture<'static, T>,
    settled: bool,
}

impl<T: Send + 'static> PendingAssertion<T> {
    fn ready(value: T) -> Self {
        Self {
            inner: futures_util::future::ready(value).boxed(),
            settled: true,
        }
    }

    fn waiting<F>(future: F) -> Self
    where
        F: Future<Output = T> + Send + 'static,
    {
        Self {
            inner: future.boxed(),
            settled: false,
        }
    }

    /// Whether the outcome was recorded synchronously
    pub fn is_settled(&self) -> bool {
        self.settled
    }
}

impl<T> Future for PendingAssertion<T> {
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        self.get_mut().inner.poll_unpin(cx)
    }
}

enum Observed {
    Threw(Value),
    Settled(Value),
    TimedOut,
}

impl Assertions {
    /// Assert that the source throws, rejects or errors.
    ///
    /// Resolves to the thrown value when the assertion passes, `None` otherwise.
    pub fn throws(&self, source: ThrowsSource, expectation: impl Into<Expectation>) -> PendingAssertion<Option<Value>> {
        if self.is_skipped() {
            return PendingAssertion::ready(None);
        }
        let expectation = expectation.into().into_structured();
        match source {
            ThrowsSource::Callable(f) => match f() {
                Err(thrown) => PendingAssertion::ready(self.check_thrown(thrown, &expectation)),
                Ok(Returned::Value(value)) => {
                    self.check("throws", false, || {
                        FailureRecord::assertion("throws", "Function returned without throwing")
                            .with_actual(value.render())
                    });
                    PendingAssertion::ready(None)
                }
                Ok(Returned::Promise(promise)) => self.await_throws(promise, expectation),
                Ok(Returned::Observable(stream)) => self.await_throws(first_error(stream), expectation),
            },
            ThrowsSource::Promise(promise) => self.await_throws(promise, expectation),
            ThrowsSource::Observable(stream) => self.await_throws(first_error(stream), expectation),
        }
    }

    /// Assert that the source neither throws, rejects nor errors
    pub fn not_throws(&self, source: ThrowsSource) -> PendingAssertion<()> {
        if self.is_skipped() {
            return PendingAssertion::ready(());
        }
        match source {
            ThrowsSource::Callable(f) => match f() {
                Err(thrown) => {
                    self.record_unexpected_throw("Function threw", &thrown);
                    PendingAssertion::ready(())
                }
                Ok(Returned::Value(_)) => {
                    self.check("not_throws", true, || FailureRecord::assertion("not_throws", ""));
                    PendingAssertion::ready(())
                }
                Ok(Returned::Promise(promise)) => self.await_not_throws(promise),
                Ok(Returned::Observable(stream)) => self.await_not_throws(first_error(stream)),
            },
            ThrowsSource::Promise(promise) => self.await_not_throws(promise),
            ThrowsSource::Observable(stream) => self.await_not_throws(first_error(stream)),
        }
    }

    fn await_throws<F>(&self, source: F, expectation: ErrorExpectation) -> PendingAssertion<Option<Value>>
    where
        F: Future<Output = Settlement> + Send + 'static,
    {
        let assertions = self.clone();
        self.begin_pending();
        PendingAssertion::waiting(async move {
            let result = match observe(source, assertions.assertion_timeout()).await {
                Observed::Threw(reason) => assertions.check_thrown(reason, &expectation),
                Observed::Settled(value) => {
                    assertions.check("throws", false, || {
                        FailureRecord::assertion("throws", "Promise resolved instead of rejecting")
                            .with_actual(value.render())
                    });
                    None
                }
                Observed::TimedOut => {
                    assertions.record_timeout("throws");
                    None
                }
            };
            assertions.end_pending();
            result
        })
    }

    fn await_not_throws<F>(&self, source: F) -> PendingAssertion<()>
    where
        F: Future<Output = Settlement> + Send + 'static,
    {
        let assertions = self.clone();
        self.begin_pending();
        PendingAssertion::waiting(async move {
            match observe(source, assertions.assertion_timeout()).await {
                Observed::Threw(reason) => assertions.record_unexpected_throw("Promise rejected", &reason),
                Observed::Settled(_) => {
                    assertions.check("not_throws", true, || FailureRecord::assertion("not_throws", ""));
                }
                Observed::TimedOut => assertions.record_timeout("not_throws"),
            }
            assertions.end_pending();
        })
    }

    fn check_thrown(&self, thrown: Value, expectation: &ErrorExpectation) -> Option<Value> {
        let Some(error) = thrown.as_error() else {
            self.check("throws", false, || {
                FailureRecord::assertion("throws", "Thrown value must be an error-like value")
                    .with_actual(thrown.render())
            });
            return None;
        };

        let mismatch = expectation_mismatch(&thrown, error, expectation);

        match mismatch {
            Some((message, expected)) => {
                self.check("throws", false, || {
                    FailureRecord::assertion("throws", message)
                        .with_actual(thrown.render())
                        .with_expected(expected)
                });
                None
            }
            None => {
                self.check("throws", true, || FailureRecord::assertion("throws", ""));
                Some(thrown)
            }
        }
    }

    fn record_unexpected_throw(&self, what: &str, thrown: &Value) {
        self.check("not_throws", false, || {
            FailureRecord::assertion("not_throws", format!("{what}: {thrown}")).with_actual(thrown.render())
        });
    }

    fn record_timeout(&self, name: &'static str) {
        let timeout = self.assertion_timeout();
        self.check(name, false, || {
            FailureRecord::assertion(name, format!("Source did not settle within {timeout:?}"))
        });
    }
}

/// First expectation field that does not hold, as (message, expected rendering)
fn expectation_mismatch(
    thrown: &Value,
    error: &ErrorValue,
    expectation: &ErrorExpectation,
) -> Option<(String, String)> {
    if let Some(constructor) = &expectation.instance_of {
        if !error.is_instance_of(constructor) {
            return Some((format!("Expected instance of {constructor}"), constructor.clone()));
        }
    }
    if let Some(expected) = &expectation.is {
        if !thrown.same_value(expected) {
            return Some(("Expected the very same error value".to_string(), expected.render()));
        }
    }
    if let Some(message) = &expectation.message {
        if !message.matches(&error.message) {
            return Some(("Error message does not match".to_string(), message.to_string()));
        }
    }
    if let Some(name) = &expectation.name {
        if &error.name != name {
            return Some(("Error name does not match".to_string(), format!("{name:?}")));
        }
    }
    None
}

async fn observe<F>(source: F, timeout: std::time::Duration) -> Observed
where
    F: Future<Output = Settlement>,
{
    match tokio::time::timeout(timeout, source).await {
        Ok(Err(reason)) => Observed::Threw(reason),
        Ok(Ok(value)) => Observed::Settled(value),
        Err(_) => Observed::TimedOut,
    }
}

/// Drive an observable until its first error or its completion
fn first_error(mut stream: BoxStream<'static, Settlement>) -> BoxFuture<'static, Settlement> {
    async move {
        while let Some(item) = stream.next().await {
            if let Err(error) = item {
                return Err(error);
            }
        }
        Ok(Value::Undefined)
    }
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::assertions::AssertionServices;
    use crate::services::{MemorySnapshotStore, StructuralComparator};
    use futures_util::stream;
    use shared::FailureKind;
    use std::sync::Arc;
    use std::time::Duration;

    fn assertions() -> Assertions {
        Assertions::new(
            "throws unit".to_string(),
            AssertionServices {
                comparator: Arc::new(StructuralComparator::new()),
                snapshots: Arc::new(MemorySnapshotStore::new()),
                update_snapshots: false,
                assertion_timeout: Duration::from_millis(50),
            },
        )
    }

    fn type_error(message: &str) -> Value {
        ErrorValue::new("TypeError", message).into_value()
    }

    #[tokio::test]
    async fn test_sync_throw_with_structured_expectation() {
        let t = assertions();
        let expectation = ErrorExpectation::default().instance_of("TypeError").message("x");
        let thrown = t
            .throws(ThrowsSource::sync(|| Err::<Value, _>(type_error("x"))), expectation)
            .await;
        assert!(thrown.is_some());

        let wrong_name = ErrorExpectation::default().name("RangeError");
        let thrown = t
            .throws(ThrowsSource::sync(|| Err::<Value, _>(type_error("x"))), wrong_name)
            .await;
        assert!(thrown.is_none());

        let outcome = t.finalize();
        assert_eq!(outcome.passed, 1);
        assert_eq!(outcome.failed, 1);
        assert_eq!(outcome.failures[0].message, "Error name does not match");
    }

    #[test]
    fn test_sync_outcomes_are_recorded_without_awaiting() {
        let t = assertions();
        let pending = t.not_throws(ThrowsSource::sync(|| Err::<Value, _>(type_error("boom"))));
        assert!(pending.is_settled());
        drop(pending);

        let pending = t.throws(ThrowsSource::sync(|| Ok::<_, Value>(Value::from(1))), Expectation::Any);
        assert!(pending.is_settled());
        drop(pending);

        let outcome = t.finalize();
        assert_eq!(outcome.failed, 2);
        assert!(outcome.failures[0].message.contains("boom"));
        assert_eq!(outcome.failures[1].message, "Function returned without throwing");
        assert!(outcome.failures.iter().all(|f| f.kind == FailureKind::Assertion));
    }

    #[tokio::test]
    async fn test_non_error_throw_fails() {
        let t = assertions();
        let thrown = t
            .throws(ThrowsSource::sync(|| Err::<Value, _>(Value::from("just a string"))), Expectation::Any)
            .await;
        assert!(thrown.is_none());
        assert_eq!(t.finalize().failures[0].message, "Thrown value must be an error-like value");
    }

    #[tokio::test]
    async fn test_expectation_shapes() {
        let t = assertions();
        let derived = || {
            Err::<Value, _>(
                ErrorValue::new("ValidationError", "field missing")
                    .with_ancestors(["TypeError"])
                    .into_value(),
            )
        };

        assert!(t.throws(ThrowsSource::sync(derived), Expectation::InstanceOf("TypeError".into())).await.is_some());
        assert!(t
            .throws(ThrowsSource::sync(derived), Expectation::MessagePattern(Regex::new("missing$").unwrap()))
            .await
            .is_some());
        assert!(t.throws(ThrowsSource::sync(derived), Expectation::Message("field missing".into())).await.is_some());
        assert!(t.throws(ThrowsSource::sync(derived), Expectation::Message("field".into())).await.is_none());
        assert!(t.throws(ThrowsSource::sync(derived), Expectation::InstanceOf("RangeError".into())).await.is_none());

        let outcome = t.finalize();
        assert_eq!(outcome.passed, 3);
        assert_eq!(outcome.failed, 2);
    }

    #[tokio::test]
    async fn test_identity_expectation() {
        let t = assertions();
        let original = type_error("same");
        let thrown = original.clone();
        let expectation = ErrorExpectation::default().is(original.clone());
        assert!(t.throws(ThrowsSource::sync(move || Err::<Value, _>(thrown)), expectation).await.is_some());

        let lookalike = type_error("same");
        let expectation = ErrorExpectation::default().is(original);
        assert!(t.throws(ThrowsSource::sync(move || Err::<Value, _>(lookalike)), expectation).await.is_none());
    }

    #[tokio::test]
    async fn test_rejecting_promise() {
        let t = assertions();
        let pending = t.throws(
            ThrowsSource::promise(async { Err::<Value, _>(type_error("later")) }),
            Expectation::InstanceOf("TypeError".into()),
        );
        assert!(!pending.is_settled());
        assert_eq!(t.outcome().recorded(), 0);
        assert!(pending.await.is_some());
        assert_eq!(t.outcome().passed, 1);
    }

    #[tokio::test]
    async fn test_callable_returning_promise_or_observable() {
        let t = assertions();
        let from_promise = t
            .throws(
                ThrowsSource::callable(|| Ok(Returned::promise(async { Err::<Value, _>(type_error("p")) }))),
                Expectation::Any,
            )
            .await;
        assert!(from_promise.is_some());

        let from_observable = t
            .throws(
                ThrowsSource::callable(|| {
                    Ok(Returned::observable(stream::iter(vec![Ok(Value::from(1)), Err(type_error("o"))])))
                }),
                Expectation::Message("o".into()),
            )
            .await;
        assert!(from_observable.is_some());
    }

    #[tokio::test]
    async fn test_not_throws_on_rejecting_promise_reports_reason() {
        let t = assertions();
        let pending = t.not_throws(ThrowsSource::promise(async {
            tokio::task::yield_now().await;
            Err::<Value, _>(type_error("rejected reason"))
        }));
        assert!(!pending.is_settled());
        pending.await;

        let outcome = t.finalize();
        assert_eq!(outcome.failed, 1);
        assert!(outcome.failures[0].message.contains("rejected reason"));
    }

    #[tokio::test]
    async fn test_observables() {
        let t = assertions();
        t.not_throws(ThrowsSource::observable(stream::iter(vec![Ok::<_, Value>(1), Ok(2)]))).await;
        let thrown = t
            .throws(
                ThrowsSource::observable(stream::iter(vec![Ok::<Value, _>(Value::from(1)), Err(type_error("stream"))])),
                Expectation::Any,
            )
            .await;
        assert!(thrown.is_some());

        let missing = t
            .throws(ThrowsSource::observable(stream::iter(vec![Ok::<_, Value>(1)])), Expectation::Any)
            .await;
        assert!(missing.is_none());

        let outcome = t.finalize();
        assert_eq!(outcome.passed, 2);
        assert_eq!(outcome.failed, 1);
    }

    #[tokio::test]
    async fn test_unawaited_assertion_fails_unit() {
        let t = assertions();
        let pending = t.throws(ThrowsSource::promise(async { Err::<Value, _>(type_error("x")) }), Expectation::Any);
        drop(pending);

        let outcome = t.finalize();
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].kind, FailureKind::UnawaitedAssertion);
    }

    #[tokio::test(start_paused = true)]
    async fn test_async_source_is_bounded_by_timeout() {
        let t = assertions();
        let thrown = t
            .throws(
                ThrowsSource::promise(futures_util::future::pending::<Result<Value, Value>>()),
                Expectation::Any,
            )
            .await;
        assert!(thrown.is_none());

        let outcome = t.finalize();
        assert_eq!(outcome.failed, 1);
        assert!(outcome.failures[0].message.starts_with("Source did not settle"));
    }

    #[test]
    fn test_skipped_view_ignores_sources() {
        let t = assertions();
        let pending = t.skip().throws(ThrowsSource::sync(|| Ok::<_, Value>(1)), Expectation::Any);
        assert!(pending.is_settled());
        drop(pending);
        assert_eq!(t.finalize().recorded(), 0);
    }
}
