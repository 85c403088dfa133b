//! CLI for the Sparki robot.

#![allow(clippy::print_stderr, clippy::missing_docs_in_private_items)]

mod commands;

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use sparki::Adaptor;
use sparki::serial::DEFAULT_BAUD_RATE;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sparki", version, about = "Drive a Sparki robot over its serial link")]
struct Cli {
    /// Serial port the robot is attached to (e.g., /dev/ttyACM0).
    #[arg(short, long, env = "SPARKI_PORT")]
    port: String,

    /// Serial baud rate.
    #[arg(long, default_value_t = DEFAULT_BAUD_RATE)]
    baud: u32,

    /// Seconds to wait for the firmware to answer the handshake.
    #[arg(long, default_value_t = 5.0)]
    timeout: f64,

    /// Increase log verbosity (-v debug, -vv wire frames).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: commands::Command,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    if let Err(e) = cli.dispatch().await {
        eprintln!("sparki: {e:#}");
        std::process::exit(1);
    }
}

/// Installs the log subscriber. `RUST_LOG` wins over `-v`.
fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "sparki=info",
        1 => "sparki=debug,sparki_proto=debug",
        _ => "sparki=trace,sparki_proto=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

impl Cli {
    async fn dispatch(self) -> Result<()> {
        let timeout = Duration::try_from_secs_f64(self.timeout)
            .with_context(|| format!("invalid handshake timeout {}", self.timeout))?;
        let mut robot = Adaptor::new(&self.port)
            .baud_rate(self.baud)
            .handshake_timeout(timeout);

        robot
            .connect()
            .await
            .with_context(|| format!("failed to connect to {}", self.port))?;

        // The robot is halted even when the command fails.
        let outcome = self.command.run(&mut robot).await;
        let halted = robot.finalize().await.context("failed to halt robot");
        outcome?;
        halted
    }
}
