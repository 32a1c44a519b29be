//! herald-scheduler: event reminder scheduling and deduplication.
//!
//! Polls an event table on a fixed period and sends an SMS reminder when an
//! event reaches one of the configured lead times (48h, 24h and 1h by default).
//! Each (event, lead time) pair is sent at most once per process lifetime,
//! within the cache retention window.
//!
//! ## Architecture
//! ```text
//! run_scheduler (loop: cycle → sleep → cycle)
//!   └── NotificationScheduler::run_cycle(now)
//!         ├── RecordSource        (herald-sheets)
//!         ├── EventTimeResolver   (start string → instant, hours until)
//!         ├── SentCache           (NotificationKey → sent at)
//!         ├── message::compose    (SMS body)
//!         └── DeliveryTransport   (herald-sms)
//! ```

pub mod cache;
pub mod message;
pub mod resolver;
pub mod runner;
pub mod scheduler;

pub use cache::{NotificationKey, SentCache};
pub use resolver::{EventTimeResolver, format_start, hours_until};
pub use runner::{SchedulerStatus, SharedStatus, run_scheduler};
pub use scheduler::{
    CycleReport, CycleSummary, NotificationScheduler, RecordOutcome, RecordReport,
    SchedulerSettings,
};
