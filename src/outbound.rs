//! Outbound message buffer
//!
//! Each finished scenario contributes two messages: the scenario itself with
//! masked headers, then its report row. The batch is handed to a
//! [`MessagePublisher`] once the run is over.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::reporting::ReportRow;
use crate::scenario::Scenario;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Scenario,
    Report,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub kind: MessageKind,
    /// Serialized JSON
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct OutboundBuffer {
    messages: Vec<OutboundMessage>,
}

impl OutboundBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `scenario`. Callers pass an already redacted copy.
    pub fn push_scenario(&mut self, scenario: &Scenario) {
        self.push(MessageKind::Scenario, scenario);
    }

    pub fn push_report(&mut self, row: &ReportRow) {
        self.push(MessageKind::Report, row);
    }

    fn push<T: Serialize>(&mut self, kind: MessageKind, value: &T) {
        match serde_json::to_vec(value) {
            Ok(payload) => self.messages.push(OutboundMessage { kind, payload }),
            Err(e) => log::error!("Failed to serialize outbound {:?} message: {}", kind, e),
        }
    }

    pub fn messages(&self) -> &[OutboundMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Delivers a finished batch to an external consumer
#[async_trait]
pub trait MessagePublisher: Send + Sync {
    async fn publish(&self, batch: OutboundBuffer) -> Result<()>;
}

/// Publisher that only logs what would have been delivered
#[derive(Debug, Clone, Default)]
pub struct LogPublisher {
    brokers: String,
    topic: String,
}

impl LogPublisher {
    pub fn new(brokers: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            brokers: brokers.into(),
            topic: topic.into(),
        }
    }
}

#[async_trait]
impl MessagePublisher for LogPublisher {
    async fn publish(&self, batch: OutboundBuffer) -> Result<()> {
        let reports = batch
            .messages()
            .iter()
            .filter(|m| m.kind == MessageKind::Report)
            .count();
        log::info!(
            "Outbound batch of {} message(s) ({} report(s)) for topic '{}' on '{}'",
            batch.len(),
            reports,
            self.topic,
            self.brokers
        );
        Ok(())
    }
}
