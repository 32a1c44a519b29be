use chrono::{DateTime, Duration, Utc};
use tracing::info;

use herald_config::HeraldConfig;
use herald_scheduler::message::compose;
use herald_scheduler::{NotificationScheduler, SchedulerSettings};
use herald_types::EventRecord;

use crate::wiring::{build_source, build_transport};

/// Run one cycle as of `at` (or now) and print the report.
pub async fn run_check(
    config: HeraldConfig,
    at: Option<String>,
    dry_run: bool,
) -> anyhow::Result<()> {
    let settings = SchedulerSettings::from_config(&config)?;
    let now = match at {
        Some(raw) => settings
            .resolver
            .parse(&raw)
            .ok_or_else(|| anyhow::anyhow!("--at must look like \"DD/MM/YYYY HH:MM\", got {raw:?}"))?,
        None => Utc::now(),
    };

    let mut scheduler = NotificationScheduler::new(
        build_source(&config)?,
        build_transport(&config, dry_run)?,
        settings,
    );
    let report = scheduler.run_cycle(now).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Send a sample reminder through the configured gateway.
pub async fn run_send_test(
    config: HeraldConfig,
    phone: String,
    lead_hours: u32,
) -> anyhow::Result<()> {
    let tz = config.timezone()?;
    let transport = build_transport(&config, false)?;
    let event = sample_event(Utc::now(), tz, lead_hours);
    let body = compose(&event, lead_hours);
    info!(transport = transport.transport_type(), "Sending test message");

    let receipt = transport.deliver(&phone, &body).await?;
    println!("Sent {} to {}", receipt.id, receipt.to);
    Ok(())
}

fn sample_event(now: DateTime<Utc>, tz: chrono_tz::Tz, lead_hours: u32) -> EventRecord {
    let start = (now + Duration::hours(i64::from(lead_hours))).with_timezone(&tz);
    EventRecord {
        label: Some("Prueba de herald".into()),
        start: Some(start.format("%d/%m/%Y %H:%M").to_string()),
        location: Some("Mensaje de prueba".into()),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_sample_event_starts_at_lead_time() {
        let now = Utc.with_ymd_and_hms(2024, 12, 24, 15, 0, 0).unwrap();
        let event = sample_event(now, chrono_tz::America::Bogota, 24);
        assert_eq!(event.start.as_deref(), Some("25/12/2024 10:00"));
        assert!(compose(&event, 24).contains("comenzará mañana (25/12/2024 a las 10:00)"));
    }
}
