//! Outcome sinks

use async_trait::async_trait;
use shared::{unit_debug, unit_warn, SuiteResult, UnitOutcome, UnitStatus};
use tokio::sync::mpsc;
use tracing::info;

use crate::traits::OutcomeSink;

/// Logs every outcome through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingOutcomeSink;

impl TracingOutcomeSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl OutcomeSink for TracingOutcomeSink {
    async fn unit_settled(&self, outcome: &UnitOutcome) {
        match outcome.status {
            UnitStatus::Failed => {
                for failure in &outcome.failures {
                    unit_warn!(outcome.title, "❌ {}", failure);
                }
            }
            status => {
                unit_debug!(
                    outcome.title,
                    "{:?} with {} assertions in {}ms",
                    status,
                    outcome.assertions.total(),
                    outcome.duration_ms
                );
            }
        }
    }

    async fn suite_settled(&self, result: &SuiteResult) {
        info!(
            run = %result.run_id,
            passed = result.passed,
            failed = result.failed,
            skipped = result.skipped,
            todo = result.todo,
            "📊 {} assertions passed, {} failed",
            result.passed_assertions,
            result.failed_assertions
        );
    }
}

/// Events forwarded by [`ChannelOutcomeSink`]
#[derive(Debug, Clone)]
pub enum SinkEvent {
    Unit(UnitOutcome),
    Suite(Box<SuiteResult>),
}

/// Forwards outcomes to an external reporter over a channel
#[derive(Debug, Clone)]
pub struct ChannelOutcomeSink {
    tx: mpsc::UnboundedSender<SinkEvent>,
}

impl ChannelOutcomeSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SinkEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn forward(&self, event: SinkEvent) {
        if self.tx.send(event).is_err() {
            unit_debug!("sink", "receiver dropped; outcome discarded");
        }
    }
}

#[async_trait]
impl OutcomeSink for ChannelOutcomeSink {
    async fn unit_settled(&self, outcome: &UnitOutcome) {
        self.forward(SinkEvent::Unit(outcome.clone()));
    }

    async fn suite_settled(&self, result: &SuiteResult) {
        self.forward(SinkEvent::Suite(Box::new(result.clone())));
    }
}
