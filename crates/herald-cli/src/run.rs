use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use herald_config::HeraldConfig;
use herald_scheduler::{NotificationScheduler, SchedulerSettings, SharedStatus, run_scheduler};
use herald_server::ServerState;

use crate::wiring::{build_source, build_transport};

/// Run the scheduler (and optionally the server) until Ctrl-C.
pub async fn run(
    config: HeraldConfig,
    with_server: bool,
    port: Option<u16>,
    dry_run: bool,
) -> anyhow::Result<()> {
    let source = build_source(&config)?;
    let transport = build_transport(&config, dry_run)?;
    let settings = SchedulerSettings::from_config(&config)?;
    info!(
        source = source.source_type(),
        transport = transport.transport_type(),
        table = %settings.table,
        timezone = %settings.resolver.timezone(),
        "Starting herald"
    );

    let cancel = CancellationToken::new();
    let status = SharedStatus::default();
    let scheduler = NotificationScheduler::new(source, transport.clone(), settings);
    let interval = Duration::from_secs(config.scheduler.interval_secs);
    let scheduler_handle = tokio::spawn(run_scheduler(
        scheduler,
        interval,
        status.clone(),
        cancel.clone(),
    ));

    let server_handle = if with_server {
        let state = Arc::new(ServerState {
            transport,
            status,
            environment: config.server.environment.clone(),
            sms_configured: config.sms.is_configured() && !dry_run,
        });
        let host = config.server.host.clone();
        let port = port.unwrap_or(config.server.port);
        let cancel = cancel.clone();
        Some(tokio::spawn(async move {
            if let Err(e) = herald_server::start_server(state, &host, port, cancel.clone()).await {
                error!("Notification server failed: {e}");
                cancel.cancel();
            }
        }))
    } else {
        None
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("Shutting down"),
        _ = cancel.cancelled() => {},
    }
    cancel.cancel();

    scheduler_handle.await?;
    if let Some(handle) = server_handle {
        handle.await?;
    }
    Ok(())
}
