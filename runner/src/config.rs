//! Runner configuration
//!
//! Built with [`RunnerConfig::builder`] or loaded from `RUNNER_*` environment
//! variables (a `.env` file is honoured) via [`RunnerConfig::from_env`].

use shared::{SharedError, SharedResult};
use std::time::Duration;

pub const ENV_CONCURRENCY: &str = "RUNNER_CONCURRENCY";
pub const ENV_TIMEOUT_MS: &str = "RUNNER_TIMEOUT_MS";
pub const ENV_ASSERTION_TIMEOUT_MS: &str = "RUNNER_ASSERTION_TIMEOUT_MS";
pub const ENV_FAIL_FAST: &str = "RUNNER_FAIL_FAST";
pub const ENV_FAIL_WITHOUT_ASSERTIONS: &str = "RUNNER_FAIL_WITHOUT_ASSERTIONS";
pub const ENV_UPDATE_SNAPSHOTS: &str = "RUNNER_UPDATE_SNAPSHOTS";
pub const ENV_MATCH: &str = "RUNNER_MATCH";
pub const ENV_LOG_LEVEL: &str = "RUNNER_LOG_LEVEL";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_ASSERTION_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq)]
pub struct RunnerConfig {
    /// Maximum number of concurrent (non-serial) tests in flight
    pub concurrency: usize,
    /// Deadline for each unit, including `end()` of callback units
    pub timeout: Duration,
    /// Deadline for asynchronous `throws`/`not_throws` sources
    pub assertion_timeout: Duration,
    /// Stop starting new tests after the first failure
    pub fail_fast: bool,
    /// Fail tests that finish without an assertion and without a plan
    pub fail_without_assertions: bool,
    /// Overwrite snapshots instead of comparing against them
    pub update_snapshots: bool,
    /// Title patterns (`*` wildcard, `!` negation) selecting tests to run
    pub match_patterns: Vec<String>,
    pub log_level: String,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            timeout: DEFAULT_TIMEOUT,
            assertion_timeout: DEFAULT_ASSERTION_TIMEOUT,
            fail_fast: false,
            fail_without_assertions: false,
            update_snapshots: false,
            match_patterns: Vec::new(),
            log_level: "info".to_string(),
        }
    }
}

fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

impl RunnerConfig {
    pub fn builder() -> RunnerConfigBuilder {
        RunnerConfigBuilder::new()
    }

    /// Load configuration from the process environment.
    ///
    /// A `.env` file is loaded first; variables already set take precedence.
    pub fn from_env() -> SharedResult<Self> {
        let _ = dotenv::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> SharedResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_CONCURRENCY) {
            config.concurrency = parse_number(ENV_CONCURRENCY, &raw)? as usize;
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_MS) {
            config.timeout = Duration::from_millis(parse_number(ENV_TIMEOUT_MS, &raw)?);
        }
        if let Some(raw) = lookup(ENV_ASSERTION_TIMEOUT_MS) {
            config.assertion_timeout =
                Duration::from_millis(parse_number(ENV_ASSERTION_TIMEOUT_MS, &raw)?);
        }
        if let Some(raw) = lookup(ENV_FAIL_FAST) {
            config.fail_fast = parse_flag(ENV_FAIL_FAST, &raw)?;
        }
        if let Some(raw) = lookup(ENV_FAIL_WITHOUT_ASSERTIONS) {
            config.fail_without_assertions = parse_flag(ENV_FAIL_WITHOUT_ASSERTIONS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_UPDATE_SNAPSHOTS) {
            config.update_snapshots = parse_flag(ENV_UPDATE_SNAPSHOTS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_MATCH) {
            config.match_patterns = raw
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(raw) = lookup(ENV_LOG_LEVEL) {
            config.log_level = raw;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject values the scheduler cannot work with
    pub fn validate(&self) -> SharedResult<()> {
        if self.concurrency == 0 {
            return Err(SharedError::invalid_config("concurrency", "0"));
        }
        if self.timeout.is_zero() {
            return Err(SharedError::invalid_config("timeout", "0"));
        }
        if self.assertion_timeout.is_zero() {
            return Err(SharedError::invalid_config("assertion_timeout", "0"));
        }
        Ok(())
    }
}

fn parse_number(field: &str, raw: &str) -> SharedResult<u64> {
    raw.trim()
        .parse::<u64>()
        .map_err(|_| SharedError::invalid_config(field, raw))
}

fn parse_flag(field: &str, raw: &str) -> SharedResult<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(SharedError::invalid_config(field, raw)),
    }
}

pub struct RunnerConfigBuilder {
    config: RunnerConfig,
}

impl RunnerConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: RunnerConfig::default(),
        }
    }

    /// Set the concurrency ceiling for non-serial tests
    pub fn concurrency(mut self, limit: usize) -> Self {
        self.config.concurrency = limit;
        self
    }

    /// Set the per-unit deadline
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the deadline for asynchronous throws/not_throws sources
    pub fn assertion_timeout(mut self, timeout: Duration) -> Self {
        self.config.assertion_timeout = timeout;
        self
    }

    pub fn fail_fast(mut self, enabled: bool) -> Self {
        self.config.fail_fast = enabled;
        self
    }

    pub fn fail_without_assertions(mut self, enabled: bool) -> Self {
        self.config.fail_without_assertions = enabled;
        self
    }

    pub fn update_snapshots(mut self, enabled: bool) -> Self {
        self.config.update_snapshots = enabled;
        self
    }

    /// Add a title match pattern
    pub fn match_pattern<S: Into<String>>(mut self, pattern: S) -> Self {
        self.config.match_patterns.push(pattern.into());
        self
    }

    /// Set log level (trace, debug, info, warn, error)
    pub fn log_level<S: Into<String>>(mut self, level: S) -> Self {
        self.config.log_level = level.into();
        self
    }

    /// Build the configuration
    pub fn build(self) -> RunnerConfig {
        self.config
    }
}

impl Default for RunnerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
