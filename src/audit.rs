//! Audit trail for workflow mutations. Same best-effort contract as
//! notifications: recorded after commit, failures logged and dropped.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::Result;

#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub actor: Uuid,
    pub entity: AuditEntity,
    pub action: &'static str,
    pub before: Option<Value>,
    pub after: Option<Value>,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditEntity {
    Challenge(Uuid),
    Submission(Uuid),
}

impl AuditEntry {
    pub fn new(actor: Uuid, entity: AuditEntity, action: &'static str) -> Self {
        Self {
            actor,
            entity,
            action,
            before: None,
            after: None,
            at: Utc::now(),
        }
    }

    pub fn before(mut self, snapshot: Value) -> Self {
        self.before = Some(snapshot);
        self
    }

    pub fn after(mut self, snapshot: Value) -> Self {
        self.after = Some(snapshot);
        self
    }
}

#[async_trait]
pub trait AuditSink: Send + Sync {
    fn name(&self) -> &str;
    async fn record(&self, entry: &AuditEntry) -> Result<()>;
}

pub struct AuditLog {
    sinks: RwLock<Vec<Arc<dyn AuditSink>>>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self {
            sinks: RwLock::new(Vec::new()),
        }
    }

    pub async fn register(&self, sink: Arc<dyn AuditSink>) {
        let mut sinks = self.sinks.write().await;
        tracing::info!("Registered audit sink: {}", sink.name());
        sinks.push(sink);
    }

    pub async fn record(&self, entry: AuditEntry) {
        let sinks = self.sinks.read().await;
        for sink in sinks.iter() {
            if let Err(e) = sink.record(&entry).await {
                tracing::error!(
                    "Audit sink {} failed to record {}: {:?}",
                    sink.name(),
                    entry.action,
                    e
                );
            }
        }
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Log-backed audit sink, the default when nothing durable is wired in.
pub struct LogAuditSink;

#[async_trait]
impl AuditSink for LogAuditSink {
    fn name(&self) -> &str {
        "log"
    }

    async fn record(&self, entry: &AuditEntry) -> Result<()> {
        tracing::info!(
            "audit: actor={} action={} entity={:?} before={} after={}",
            entry.actor,
            entry.action,
            entry.entity,
            entry
                .before
                .as_ref()
                .map(|v| v.to_string())
                .unwrap_or_else(|| "-".into()),
            entry
                .after
                .as_ref()
                .map(|v| v.to_string())
                .unwrap_or_else(|| "-".into()),
        );
        Ok(())
    }
}
