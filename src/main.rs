//! rhmi-alerts - verify the RHMI alerting pipeline end to end

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing::{error, info};

use rhmi_alerts::alerts::AlertState;
use rhmi_alerts::client::create_client;
use rhmi_alerts::config::ScenarioConfig;
use rhmi_alerts::scenario::AlertScenario;
use rhmi_alerts::telemetry::{init_tracing, LogFormat};

/// Verify that RHMI alerts fire, reach Alertmanager, and clear
#[derive(Parser, Debug)]
#[command(name = "rhmi-alerts", version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args, Debug)]
struct GlobalArgs {
    /// Path to kubeconfig (defaults to KUBECONFIG, then ~/.kube/config, then in-cluster)
    #[arg(long, global = true)]
    kubeconfig: Option<PathBuf>,

    /// Scenario configuration file; unset fields keep their defaults
    #[arg(short = 'c', long = "config", env = "RHMI_ALERTS_CONFIG", global = true)]
    config_file: Option<PathBuf>,

    /// Log output format (text or json)
    #[arg(long, default_value = "text", global = true)]
    log_format: LogFormat,

    /// Seconds between alert polls
    #[arg(long, global = true)]
    poll_interval_secs: Option<u64>,

    /// Seconds to wait for each alert state transition
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the full scenario (default)
    ///
    /// Checks no alert is active, scales the Fuse operator and UI to zero,
    /// waits for the alerts to go pending then firing, confirms Alertmanager
    /// lists them, restores the workloads, waits for the alerts to clear,
    /// and audits the Alertmanager configuration.
    Run,

    /// Only check that no tracked alert is active
    Precheck,

    /// Only check that Alertmanager lists every tracked alert
    Crosscheck,

    /// Wait until every tracked alert is in the given state
    Wait {
        /// none, pending or firing
        state: AlertState,
    },

    /// Only audit the Alertmanager configuration against its secrets
    Audit,
}

fn load_config(args: &GlobalArgs) -> anyhow::Result<ScenarioConfig> {
    let mut config = match &args.config_file {
        Some(path) => ScenarioConfig::from_file(path)?,
        None => ScenarioConfig::default(),
    };
    if let Some(secs) = args.poll_interval_secs {
        config.poll_interval_secs = secs;
    }
    if let Some(secs) = args.timeout_secs {
        config.state_timeout_secs = secs;
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // aws-lc-rs must be the process-wide provider before any TLS connection
    if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
        eprintln!("Failed to install crypto provider: {:?}", e);
        std::process::exit(1);
    }

    let cli = Cli::parse();
    init_tracing(cli.global.log_format)?;

    let config = load_config(&cli.global)?;
    let client = create_client(cli.global.kubeconfig.as_deref()).await?;
    let scenario = AlertScenario::from_client(client, config);

    let result = match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => scenario.run().await.map(|report| println!("{report}")),
        Commands::Precheck => scenario.precheck().await.map(|snapshot| print!("{snapshot}")),
        Commands::Crosscheck => scenario.crosscheck().await,
        Commands::Wait { state } => scenario.wait_for(state).await.map(|snapshot| print!("{snapshot}")),
        Commands::Audit => scenario.audit().await,
    };

    match result {
        Ok(()) => {
            info!("Done");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Alert verification failed");
            Err(e.into())
        }
    }
}
