//! scalectl — drive a ScaleGrid scaling manager from the command line.
//!
//! # Usage
//!
//! ```text
//! scalectl decide --cpu 85 --memory 50 --instances 2
//! scalectl route --strategy ip_hash --instances a,b,c --client-ip 10.0.0.7
//! scalectl replay --samples trace.json --config scaling.json --report comprehensive
//! ```
//!
//! Results are printed as JSON on stdout; logs go to stderr.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "scalectl",
    about = "ScaleGrid — autoscaling decisions and load distribution",
    version,
    propagate_version = true,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one scaling tick and print the decision
    Decide {
        /// CPU utilization, percent
        #[arg(long)]
        cpu: f64,
        /// Memory utilization, percent
        #[arg(long)]
        memory: f64,
        /// Current instance count (default: configured minimum)
        #[arg(long)]
        instances: Option<u32>,
        /// Scaling config file (JSON or TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Route requests across a pool of instances
    Route {
        /// round_robin, least_connections, weighted_round_robin,
        /// ip_hash, least_response_time, or consistent_hash
        #[arg(short, long, default_value = "round_robin")]
        strategy: String,
        /// Comma-separated instance ids
        #[arg(short, long, value_delimiter = ',')]
        instances: Vec<String>,
        #[arg(long)]
        client_ip: Option<String>,
        #[arg(long)]
        request_id: Option<String>,
        /// Number of requests to route
        #[arg(short = 'n', long, default_value = "1")]
        count: usize,
    },
    /// Replay a JSON trace of samples through the scaling loop
    Replay {
        /// JSON array of `{"cpu": .., "memory": ..}` or full metrics objects
        #[arg(long)]
        samples: PathBuf,
        /// Scaling config file (JSON or TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Delay between ticks in milliseconds
        #[arg(long, default_value = "0")]
        interval_ms: u64,
        /// Report to print afterwards: summary, performance, comprehensive
        #[arg(long, default_value = "comprehensive")]
        report: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,scalegrid=debug".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Decide {
            cpu,
            memory,
            instances,
            config,
        } => commands::decide::decide(cpu, memory, instances, config.as_deref()),
        Commands::Route {
            strategy,
            instances,
            client_ip,
            request_id,
            count,
        } => commands::route::route(&strategy, &instances, client_ip, request_id, count),
        Commands::Replay {
            samples,
            config,
            interval_ms,
            report,
        } => commands::replay::replay(&samples, config.as_deref(), interval_ms, &report).await,
    }
}
