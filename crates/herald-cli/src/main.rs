mod check;
mod run;
mod wiring;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "herald", about = "Event reminder SMS dispatcher")]
struct Cli {
    /// Config file (defaults to ~/.herald/config.json5)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the reminder scheduler and the notification server
    Run {
        /// Only run the scheduler
        #[arg(long)]
        no_server: bool,

        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,

        /// Log messages instead of sending them
        #[arg(long)]
        dry_run: bool,
    },
    /// Run a single cycle and print its report as JSON
    Check {
        /// Evaluate as of this local time ("DD/MM/YYYY HH:MM") instead of now
        #[arg(long)]
        at: Option<String>,

        /// Log messages instead of sending them
        #[arg(long)]
        dry_run: bool,
    },
    /// Send a sample reminder to a phone number
    SendTest {
        /// Recipient phone number
        #[arg(long)]
        phone: String,

        /// Lead time announced in the message
        #[arg(long, default_value_t = 24)]
        lead_hours: u32,
    },
    /// Show the effective configuration
    Health,
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = herald_config::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Run {
            no_server,
            port,
            dry_run,
        } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(run::run(config, !no_server, port, dry_run))?;
        }
        Commands::Check { at, dry_run } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(check::run_check(config, at, dry_run))?;
        }
        Commands::SendTest { phone, lead_hours } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(check::run_send_test(config, phone, lead_hours))?;
        }
        Commands::Health => {
            println!("herald is healthy");
            println!("  environment: {}", config.server.environment);
            println!("  source: {:?} (table {})", config.source.kind, config.source.table);
            println!("  sms configured: {}", config.sms.is_configured());
            println!("  thresholds: {:?}", config.scheduler.thresholds);
            println!(
                "  poll interval: {}s, timezone: {}",
                config.scheduler.interval_secs, config.scheduler.timezone
            );
            println!("  server: {}:{}", config.server.host, config.server.port);
        }
    }

    Ok(())
}
