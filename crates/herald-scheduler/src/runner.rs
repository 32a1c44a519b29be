//! Scheduler loop: run one cycle, wait, run the next.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::scheduler::{CycleReport, NotificationScheduler};

/// Latest cycle outcome, readable while the loop runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedulerStatus {
    /// Completed cycles, including ones that failed to fetch.
    pub cycles: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_cycle_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_report: Option<CycleReport>,
    /// Fetch error of the most recent cycle, cleared by the next success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

pub type SharedStatus = Arc<RwLock<SchedulerStatus>>;

/// Run the scheduler until `cancel` fires.
///
/// The first cycle starts immediately. Each later cycle starts `interval`
/// after the previous one finished, so cycles never overlap. No error stops
/// the loop; fetch failures are logged and recorded in `status`.
pub async fn run_scheduler(
    mut scheduler: NotificationScheduler,
    interval: Duration,
    status: SharedStatus,
    cancel: CancellationToken,
) {
    info!(
        interval_secs = interval.as_secs(),
        thresholds = ?scheduler.settings().thresholds,
        "Notification scheduler started"
    );

    loop {
        if cancel.is_cancelled() {
            break;
        }

        let now = Utc::now();
        let result = scheduler.run_cycle(now).await;

        {
            let mut status = status.write().await;
            status.cycles += 1;
            status.last_cycle_at = Some(now);
            match result {
                Ok(report) => {
                    let summary = report.summary();
                    info!(
                        records = report.records.len(),
                        sent = summary.sent,
                        already_sent = summary.already_sent,
                        failed = summary.failed,
                        skipped = summary.skipped_incomplete + summary.skipped_unparseable,
                        "Notification cycle finished"
                    );
                    status.last_report = Some(report);
                    status.last_error = None;
                }
                Err(e) => {
                    warn!("Notification cycle aborted: {e}");
                    status.last_error = Some(e.to_string());
                }
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(interval) => {},
        }
    }

    info!("Notification scheduler stopped");
}

#[cfg(test)]
mod tests {
    use herald_config::CalendarPolicy;
    use herald_sheets::{FetchError, RecordSource};
    use herald_sms::DryRunTransport;
    use herald_types::Row;

    use super::*;
    use crate::resolver::EventTimeResolver;
    use crate::scheduler::SchedulerSettings;

    struct CountingSource {
        fail: bool,
    }

    #[async_trait::async_trait]
    impl RecordSource for CountingSource {
        fn source_type(&self) -> &str {
            "counting"
        }

        async fn fetch_records(&self, table: &str) -> Result<Vec<Row>, FetchError> {
            if self.fail {
                return Err(FetchError::TableNotFound {
                    table: table.to_string(),
                    available: vec![],
                });
            }
            Ok(vec![])
        }
    }

    fn scheduler(fail: bool) -> NotificationScheduler {
        NotificationScheduler::new(
            Arc::new(CountingSource { fail }),
            Arc::new(DryRunTransport::new("57")),
            SchedulerSettings {
                table: "Hoja3".into(),
                thresholds: vec![48, 24, 1],
                resolver: EventTimeResolver::new(
                    chrono_tz::America::Bogota,
                    CalendarPolicy::Lenient,
                ),
                dedup_retention: Some(chrono::Duration::hours(24)),
                delivery_timeout: Duration::from_secs(10),
            },
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_runs_immediately_then_every_interval() {
        let status = SharedStatus::default();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_scheduler(
            scheduler(false),
            Duration::from_secs(300),
            status.clone(),
            cancel.clone(),
        ));

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(status.read().await.cycles, 1);

        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(status.read().await.cycles, 2);

        cancel.cancel();
        handle.await.unwrap();
        let status = status.read().await;
        assert!(status.last_report.is_some());
        assert!(status.last_error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_errors_do_not_stop_loop() {
        let status = SharedStatus::default();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_scheduler(
            scheduler(true),
            Duration::from_secs(60),
            status.clone(),
            cancel.clone(),
        ));

        tokio::time::sleep(Duration::from_secs(150)).await;
        cancel.cancel();
        handle.await.unwrap();

        let status = status.read().await;
        assert_eq!(status.cycles, 3);
        assert!(status.last_report.is_none());
        assert!(status.last_error.as_deref().unwrap().contains("Hoja3"));
    }

    #[tokio::test]
    async fn test_cancelled_before_start_runs_nothing() {
        let status = SharedStatus::default();
        let cancel = CancellationToken::new();
        cancel.cancel();

        tokio::time::timeout(
            Duration::from_secs(2),
            run_scheduler(scheduler(false), Duration::from_secs(300), status.clone(), cancel),
        )
        .await
        .expect("scheduler loop should exit promptly on cancel");
        assert_eq!(status.read().await.cycles, 0);
    }
}
