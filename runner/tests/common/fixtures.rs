//! Test fixtures and data for runner tests

use runner::{Implementation, RunnerConfig};
use shared::{ErrorValue, Value};
use std::time::Duration;

/// Standard test data and fixtures
pub struct TestFixtures;

impl TestFixtures {
    /// Unit deadline used by tests that exercise timeouts under paused time
    pub const UNIT_TIMEOUT: Duration = Duration::from_secs(1);
    pub const ASSERTION_TIMEOUT: Duration = Duration::from_millis(500);
    pub const CONCURRENCY: usize = 4;

    /// Configuration with short deadlines and a fixed concurrency ceiling
    pub fn config() -> RunnerConfig {
        RunnerConfig::builder()
            .concurrency(Self::CONCURRENCY)
            .timeout(Self::UNIT_TIMEOUT)
            .assertion_timeout(Self::ASSERTION_TIMEOUT)
            .build()
    }

    pub fn type_error(message: &str) -> Value {
        ErrorValue::new("TypeError", message).into_value()
    }

    pub fn range_error(message: &str) -> Value {
        ErrorValue::new("RangeError", message).into_value()
    }

    /// Body that records a fixed number of passing assertions
    pub fn passing(assertions: usize) -> Implementation {
        Implementation::sync(move |t, _| {
            for _ in 0..assertions {
                t.pass();
            }
            Ok(())
        })
    }

    /// Body with one failing assertion
    pub fn failing_assertion() -> Implementation {
        Implementation::sync(|t, _| {
            t.is(1, 2);
            Ok(())
        })
    }

    /// Body that throws instead of returning
    pub fn throwing(message: &'static str) -> Implementation {
        Implementation::sync(move |_, _| Err(ErrorValue::plain(message).into_value()))
    }

    pub fn noop() -> Implementation {
        Implementation::sync(|_, _| Ok(()))
    }
}
