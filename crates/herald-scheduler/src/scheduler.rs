//! The poll cycle: fetch events, find the ones whose lead time has arrived,
//! and send each reminder once.
//!
//! ```text
//! run_cycle(now)
//!   ├── purge SentCache (retention window)
//!   ├── RecordSource::fetch_records(table)     ── error aborts the cycle
//!   └── per row, isolated:
//!         incomplete?       → SkippedIncomplete
//!         unparseable start → SkippedUnparseable
//!         hours ∉ thresholds → NotDue
//!         key cached?       → DueAndAlreadySent
//!         deliver (timeout) → DueAndSent | DueAndDeliveryFailed
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use herald_config::HeraldConfig;
use herald_sheets::{FetchError, RecordSource};
use herald_sms::{DeliveryError, DeliveryReceipt, DeliveryTransport};
use herald_types::EventRecord;

use crate::cache::{NotificationKey, SentCache};
use crate::message;
use crate::resolver::{EventTimeResolver, hours_until};

/// What happened to one record in one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordOutcome {
    /// Label, start time, or phone missing.
    SkippedIncomplete,
    /// Start time did not parse.
    SkippedUnparseable,
    /// No lead time matches the current hour.
    NotDue,
    DueAndSent,
    DueAndAlreadySent,
    /// Transport failed or timed out; retried next cycle.
    DueAndDeliveryFailed,
}

/// Per-record line of a [`CycleReport`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordReport {
    /// Zero-based data row index in the fetched table.
    pub row: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hours_until: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<u32>,
    pub outcome: RecordOutcome,
    /// Gateway message ID on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RecordReport {
    fn new(row: usize, event: &EventRecord, outcome: RecordOutcome) -> Self {
        Self {
            row,
            label: event.label.clone(),
            hours_until: None,
            threshold: None,
            outcome,
            message_id: None,
            error: None,
        }
    }
}

/// Count of records per outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleSummary {
    pub skipped_incomplete: usize,
    pub skipped_unparseable: usize,
    pub not_due: usize,
    pub sent: usize,
    pub already_sent: usize,
    pub failed: usize,
}

/// Result of one full cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    pub table: String,
    /// Cache entries evicted before evaluation.
    pub purged: usize,
    pub records: Vec<RecordReport>,
}

impl CycleReport {
    pub fn summary(&self) -> CycleSummary {
        let mut summary = CycleSummary::default();
        for record in &self.records {
            let slot = match record.outcome {
                RecordOutcome::SkippedIncomplete => &mut summary.skipped_incomplete,
                RecordOutcome::SkippedUnparseable => &mut summary.skipped_unparseable,
                RecordOutcome::NotDue => &mut summary.not_due,
                RecordOutcome::DueAndSent => &mut summary.sent,
                RecordOutcome::DueAndAlreadySent => &mut summary.already_sent,
                RecordOutcome::DueAndDeliveryFailed => &mut summary.failed,
            };
            *slot += 1;
        }
        summary
    }

    /// Outcomes in row order.
    pub fn outcomes(&self) -> Vec<RecordOutcome> {
        self.records.iter().map(|r| r.outcome).collect()
    }
}

/// Tunables for a [`NotificationScheduler`].
#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    pub table: String,
    /// Lead times in whole hours.
    pub thresholds: Vec<u32>,
    pub resolver: EventTimeResolver,
    /// `None` disables deduplication entirely.
    pub dedup_retention: Option<chrono::Duration>,
    pub delivery_timeout: Duration,
}

impl SchedulerSettings {
    /// Derive settings from a validated configuration.
    pub fn from_config(config: &HeraldConfig) -> Result<Self, herald_config::ConfigError> {
        let tz = config.timezone()?;
        Ok(Self {
            table: config.source.table.clone(),
            thresholds: config.scheduler.thresholds.clone(),
            resolver: EventTimeResolver::new(tz, config.scheduler.calendar),
            dedup_retention: config
                .dedup
                .enabled
                .then(|| chrono::Duration::hours(i64::from(config.dedup.retention_hours))),
            delivery_timeout: Duration::from_secs(config.delivery.timeout_secs),
        })
    }
}

/// Decides, per poll, which reminders are due and sends each at most once.
///
/// Owns its [`SentCache`]; `run_cycle` takes `&mut self`, so two cycles of the
/// same scheduler can never interleave.
pub struct NotificationScheduler {
    source: Arc<dyn RecordSource>,
    transport: Arc<dyn DeliveryTransport>,
    settings: SchedulerSettings,
    cache: Option<SentCache>,
}

impl NotificationScheduler {
    pub fn new(
        source: Arc<dyn RecordSource>,
        transport: Arc<dyn DeliveryTransport>,
        settings: SchedulerSettings,
    ) -> Self {
        let cache = settings.dedup_retention.map(SentCache::new);
        Self {
            source,
            transport,
            settings,
            cache,
        }
    }

    pub fn settings(&self) -> &SchedulerSettings {
        &self.settings
    }

    /// The dedup cache, if deduplication is enabled.
    pub fn cache(&self) -> Option<&SentCache> {
        self.cache.as_ref()
    }

    /// Run one full cycle as of `now`.
    ///
    /// Only a fetch failure is returned as an error; every per-record problem
    /// is captured in the report.
    pub async fn run_cycle(&mut self, now: DateTime<Utc>) -> Result<CycleReport, FetchError> {
        let purged = self.cache.as_mut().map_or(0, |c| c.purge(now));
        if purged > 0 {
            debug!(purged, "Evicted expired sent-notification entries");
        }

        let rows = self.source.fetch_records(&self.settings.table).await?;
        info!(
            source = self.source.source_type(),
            table = %self.settings.table,
            rows = rows.len(),
            "Checking events for notifications"
        );

        let mut records = Vec::with_capacity(rows.len());
        for (row, cells) in rows.iter().enumerate() {
            let event = EventRecord::from_row(cells);
            records.push(self.evaluate(row, &event, now).await);
        }

        Ok(CycleReport {
            started_at: now,
            table: self.settings.table.clone(),
            purged,
            records,
        })
    }

    async fn evaluate(&mut self, row: usize, event: &EventRecord, now: DateTime<Utc>) -> RecordReport {
        let Some((label, start, phone)) = event.required() else {
            debug!(
                row,
                label = event.display_label(),
                has_label = event.label.is_some(),
                has_start = event.start.is_some(),
                has_phone = event.phone.is_some(),
                "Incomplete event, skipping"
            );
            return RecordReport::new(row, event, RecordOutcome::SkippedIncomplete);
        };

        let Some(start_at) = self.settings.resolver.parse(start) else {
            warn!(row, label, start, "Could not parse event start time");
            return RecordReport::new(row, event, RecordOutcome::SkippedUnparseable);
        };

        let hours = hours_until(start_at, now);
        debug!(row, label, start, hours, "Hours until event");

        let mut report = RecordReport::new(row, event, RecordOutcome::NotDue);
        report.hours_until = Some(hours);

        let Some(threshold) = self.matching_threshold(hours) else {
            return report;
        };
        report.threshold = Some(threshold);

        let key = NotificationKey::new(label, start, threshold);
        if self.cache.as_ref().is_some_and(|c| c.contains(&key)) {
            info!(label, threshold, "Notification already sent");
            report.outcome = RecordOutcome::DueAndAlreadySent;
            return report;
        }

        let body = message::compose(event, threshold);
        match self.deliver(phone, &body).await {
            Ok(receipt) => {
                info!(label, threshold, message_id = %receipt.id, to = %receipt.to, "Notification sent");
                if let Some(cache) = self.cache.as_mut() {
                    cache.insert(key, now);
                }
                report.outcome = RecordOutcome::DueAndSent;
                report.message_id = Some(receipt.id);
            }
            Err(e) => {
                warn!(label, threshold, "Failed to send notification: {e}");
                report.outcome = RecordOutcome::DueAndDeliveryFailed;
                report.error = Some(e.to_string());
            }
        }
        report
    }

    fn matching_threshold(&self, hours: i64) -> Option<u32> {
        self.settings
            .thresholds
            .iter()
            .copied()
            .find(|&t| i64::from(t) == hours)
    }

    async fn deliver(&self, phone: &str, body: &str) -> Result<DeliveryReceipt, DeliveryError> {
        let timeout = self.settings.delivery_timeout;
        match tokio::time::timeout(timeout, self.transport.deliver(phone, body)).await {
            Ok(result) => result,
            Err(_) => Err(DeliveryError::Timeout(timeout.as_secs())),
        }
    }
}
