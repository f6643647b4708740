//! Command line tool to drive one or more Nexus21 lifts at once

use anyhow::Context;
use clap::{Parser, Subcommand};
use futures::future::join_all;
use nexus21_cover::{format_mac, LiftConfig, LiftCover, Orientation};
use nexus21_ipmodule::{StatusResponse, TimeoutConfig, TransitionConfig};
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about = "Nexus21 TV lift control", long_about = None)]
struct Opt {
    /// IP address or host name of an IP Module. Repeat for several lifts.
    #[arg(long = "host", required = true)]
    hosts: Vec<String>,
    /// Transition timeout in seconds
    #[arg(short, long, default_value_t = 30)]
    timeout: u64,
    /// Status poll interval in milliseconds while a lift moves
    #[arg(short, long, default_value_t = 1000)]
    poll_interval: u64,
    /// HTTP request timeout in milliseconds
    #[arg(long, default_value_t = 10000)]
    request_timeout: u64,
    /// Treat DOWN as open (lift mounted in the ceiling)
    #[arg(long, default_value_t = false)]
    ceiling: bool,
    #[command(subcommand)]
    action: Action,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Action {
    /// Print the current status
    Status,
    /// Open the cover and wait until it stops
    Open,
    /// Close the cover and wait until it stops
    Close,
    /// Recall a stored memory position
    Memory {
        #[arg(value_parser = clap::value_parser!(u8).range(1..=3))]
        slot: u8,
    },
}

fn print_status(host: &str, status: &StatusResponse) {
    println!(
        "{}: status={} vertical={:?} horizontal={:?}{}",
        host,
        status.status(),
        status.vertical(),
        status.horizontal(),
        status.description().map(|d| format!(" ({})", d)).unwrap_or_default()
    );
}

async fn run(cover: &LiftCover, action: Action) -> anyhow::Result<()> {
    match action {
        Action::Status => {
            let status = cover.update().await?;
            print_status(cover.host(), &status);
        }
        Action::Open | Action::Close => {
            let outcome = match action {
                Action::Open => cover.open_cover().await?,
                _ => cover.close_cover().await?,
            };
            match outcome {
                Some(elapsed) => info!(host = %cover.host(), ?elapsed, state = ?cover.state(), "Done"),
                None => info!(host = %cover.host(), state = ?cover.state(), "Nothing to do"),
            }
        }
        Action::Memory { slot } => {
            cover
                .client()
                .move_to_memory(slot)
                .await
                .with_context(|| format!("recalling MEM{} on {}", slot, cover.host()))?;
            info!(host = %cover.host(), slot, "Memory position recalled");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let opt = Opt::parse();

    let timeouts = TimeoutConfig {
        request_ms: opt.request_timeout,
        ..TimeoutConfig::default()
    };
    // One pool shared by every lift
    let http_client = reqwest::Client::builder()
        .timeout(timeouts.request_timeout())
        .connect_timeout(timeouts.connect_timeout())
        .pool_idle_timeout(timeouts.pool_idle_timeout())
        .build()
        .context("creating HTTP client")?;

    let mut covers = Vec::with_capacity(opt.hosts.len());
    for (index, host) in opt.hosts.iter().enumerate() {
        // The tool has no real MAC address to offer; derive a stable placeholder
        let mac = format_mac(&format!("{:012x}", index))?;
        let mut config = LiftConfig::new(host.clone(), host.clone(), &mac)?;
        config.timeouts = timeouts.clone();
        config.transition =
            TransitionConfig::new(Duration::from_secs(opt.timeout), Duration::from_millis(opt.poll_interval));
        if opt.ceiling {
            config.orientation = Orientation::Ceiling;
        }
        covers.push(LiftCover::from_config(config, Some(http_client.clone()))?);
    }

    let results = join_all(covers.iter().map(|cover| run(cover, opt.action))).await;

    let mut failures = 0;
    for (cover, result) in covers.iter().zip(results) {
        if let Err(e) = result {
            error!(host = %cover.host(), "{:#}", e);
            failures += 1;
        }
    }
    if failures > 0 {
        anyhow::bail!("{} of {} lifts failed", failures, covers.len());
    }
    Ok(())
}
