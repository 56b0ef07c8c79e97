//! Main entry point for the supervisor binary

use anyhow::Context;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;
use tokio::signal;

use shared::logging;
use supervisor::{
    services::{HttpHealthProber, RealProcessManager},
    CheckState, GroupStartReport, NodeRegistry, StartPhase, StatusSnapshot, Supervisor, SupervisorConfig, GROUP_PRIORITY,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Command {
    /// Start a node group (or all groups) and keep running until Ctrl+C
    Start,
    /// Stop every node started by this supervisor instance
    Stop,
    /// Probe every node once and print a status table
    Status,
    /// Print the status table periodically until Ctrl+C
    Monitor,
    /// Print a JSON status report to stdout
    Report,
}

/// Supervisor for a fleet of local node processes
#[derive(Parser)]
#[command(name = "supervisor")]
#[command(about = "Starts, stops and monitors node processes with dependency-aware ordering")]
pub struct Args {
    /// What to do
    #[arg(value_enum)]
    pub command: Command,

    /// Node group to start, or "all" for every group in priority order
    #[arg(short, long, default_value = "all", value_parser = parse_group)]
    pub group: String,

    /// Monitor interval in seconds
    #[arg(short, long, default_value = "30")]
    pub interval: u64,

    /// Project root containing nodes/, logs/ and config/
    #[arg(long, env = "SUPERVISOR_ROOT", default_value = ".")]
    pub root: PathBuf,

    /// Node configuration file (defaults to <root>/config/unified_config.json)
    #[arg(long, env = "SUPERVISOR_CONFIG")]
    pub config: Option<PathBuf>,

    /// Host used for health probes
    #[arg(long)]
    pub host: Option<String>,

    /// Interpreter that runs each node's entry point ("none" to execute it directly)
    #[arg(long)]
    pub interpreter: Option<String>,

    /// Entry point file inside each node directory
    #[arg(long)]
    pub entrypoint: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

fn parse_group(value: &str) -> Result<String, String> {
    if value == "all" || GROUP_PRIORITY.contains(&value) {
        Ok(value.to_string())
    } else {
        Err(format!("expected \"all\" or one of: {}", GROUP_PRIORITY.join(", ")))
    }
}

impl Args {
    fn to_config(&self) -> SupervisorConfig {
        let mut config = SupervisorConfig::new(&self.root);
        if let Some(path) = &self.config {
            config = config.with_config_file(path);
        }
        if let Some(host) = &self.host {
            config = config.with_host(host);
        }
        if let Some(entrypoint) = &self.entrypoint {
            config = config.with_entrypoint(entrypoint);
        }
        if let Some(interpreter) = &self.interpreter {
            let interpreter = (interpreter != "none").then(|| interpreter.clone());
            config = config.with_interpreter(interpreter);
        }
        config
    }
}

const RULE_WIDTH: usize = 80;

fn print_group_report(report: &GroupStartReport) {
    println!("{}", "=".repeat(RULE_WIDTH));
    println!("Node group {} started", report.group.to_uppercase());
    println!("{}", "=".repeat(RULE_WIDTH));
    println!("✅ Healthy: {}/{}\n", report.healthy_count, report.total_count);
}

fn print_snapshot(snapshot: &StatusSnapshot) {
    println!(
        "\n[{}] Node status check",
        snapshot.checked_at.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M:%S")
    );
    println!("{}", "-".repeat(RULE_WIDTH));

    for row in &snapshot.rows {
        let node = &row.descriptor;
        let label = format!("Node_{:>6} {:<25} (:{})", node.id, node.name, node.port);
        match row.state {
            CheckState::Healthy => println!("✅ {label}"),
            CheckState::Unhealthy => match &row.detail {
                Some(detail) => println!("❌ {label} - Unhealthy ({detail})"),
                None => println!("❌ {label} - Unhealthy"),
            },
            CheckState::NotRunning => println!("○ {label} - Not running"),
        }
    }

    println!("{}", "-".repeat(RULE_WIDTH));
    println!(
        "Healthy: {} | Unhealthy: {} | Not running: {}",
        snapshot.counts.healthy, snapshot.counts.unhealthy, snapshot.counts.not_running
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    logging::init_tracing(Some(&args.log_level));

    let config = args.to_config();
    let registry = NodeRegistry::load_or_default(&config.config_file);
    let processes = RealProcessManager::new(&config);
    let prober = HttpHealthProber::new(config.host.clone()).context("creating health prober")?;

    let mut supervisor = Supervisor::new(registry, processes, prober, &config);

    // Set up graceful shutdown
    let shutdown_sender = supervisor.get_shutdown_sender();
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                logging::log_shutdown("Received Ctrl+C signal");
                let _ = shutdown_sender.send(()).await;
            }
            Err(err) => {
                logging::log_error("Signal handling", &err);
            }
        }
    });

    match args.command {
        Command::Start => {
            let group = (args.group != "all").then_some(args.group.as_str());
            let phase = supervisor
                .start_until_shutdown(group)
                .await
                .with_context(|| format!("starting group {}", args.group))?;

            match phase {
                StartPhase::Completed(reports) => {
                    reports.iter().for_each(print_group_report);

                    println!("Supervisor running, press Ctrl+C to stop\n");
                    supervisor
                        .run_until_shutdown()
                        .await
                        .context("stopping nodes")?;
                    logging::log_success("All nodes stopped");
                }
                StartPhase::Interrupted(outcomes) => {
                    println!("Startup interrupted, stopped {} node(s)", outcomes.len());
                }
            }
        }
        Command::Stop => {
            let outcomes = supervisor.stop_all().await.context("stopping nodes")?;
            if outcomes.is_empty() {
                println!("No nodes are tracked by this supervisor instance; nothing to stop");
            } else {
                println!("✅ Stopped {} node(s)", outcomes.len());
            }
        }
        Command::Status => {
            let snapshot = supervisor.check_all().await;
            print_snapshot(&snapshot);
        }
        Command::Monitor => {
            println!("{}", "=".repeat(RULE_WIDTH));
            println!("Monitoring node status every {} s, press Ctrl+C to stop", args.interval);
            println!("{}", "=".repeat(RULE_WIDTH));
            supervisor
                .monitor(Duration::from_secs(args.interval), print_snapshot)
                .await;
        }
        Command::Report => {
            let report = supervisor.generate_report().await;
            let json = serde_json::to_string_pretty(&report).context("serializing report")?;
            println!("{json}");
        }
    }

    Ok(())
}
