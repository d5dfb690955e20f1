// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! `simple-ntpd`: an NTPv4 server daemon.
//!
//! Run with:
//!   simple-ntpd --config /etc/simple-ntpd/simple-ntpd.yaml
//!   simple-ntpd --listen 127.0.0.1 --port 1123 --stratum 3 --foreground
//!   simple-ntpd --config simple-ntpd.ini test-config
//!
//! Set RUST_LOG=ntp_server=debug to see per-request decisions.

mod config;
mod logging;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use ntp_server::protocol::Stratum;
use ntp_server::server::{NtpServer, NtpServerBuilder};
use ntp_server::server_common::{IpNet, RateLimitConfig, ServerMetrics};
use tracing::{error, info, warn};

use crate::config::{LogDestination, LogLevel, NtpdConfig};

#[derive(Debug, Parser)]
#[command(name = "simple-ntpd", about = "Simple NTPv4 server daemon")]
struct Cli {
    /// Configuration file (.ini/.conf, .json, .yaml/.yml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short = 'V', long)]
    verbose: bool,

    /// Stay attached and always log to the console
    #[arg(short, long)]
    foreground: bool,

    /// Listen on a specific address
    #[arg(long, value_name = "ADDR")]
    listen: Option<String>,

    /// Listen on a specific port
    #[arg(long, value_name = "PORT")]
    port: Option<u16>,

    /// Stratum level to advertise
    #[arg(long, value_name = "LEVEL", value_parser = clap::value_parser!(u8).range(1..=15))]
    stratum: Option<u8>,

    /// Reference identifier (up to four ASCII characters)
    #[arg(long, value_name = "ID")]
    reference_id: Option<String>,

    /// Number of worker tasks
    #[arg(long, value_name = "N")]
    workers: Option<usize>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Subcommand)]
enum Command {
    /// Start the NTP server (default)
    #[default]
    Start,
    /// Load and validate the configuration, print a summary, and exit
    TestConfig,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    match cli.command.unwrap_or_default() {
        Command::Start => start(config),
        Command::TestConfig => test_config(&config),
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<NtpdConfig> {
    let mut config = match &cli.config {
        Some(path) => NtpdConfig::load(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => NtpdConfig::default(),
    };
    apply_overrides(&mut config, cli);
    Ok(config)
}

/// Command-line options win over file settings.
fn apply_overrides(config: &mut NtpdConfig, cli: &Cli) {
    if let Some(listen) = &cli.listen {
        config.network.listen_address = listen.clone();
    }
    if let Some(port) = cli.port {
        config.network.listen_port = port;
    }
    if let Some(stratum) = cli.stratum {
        config.server.stratum = stratum;
    }
    if let Some(reference_id) = &cli.reference_id {
        config.server.reference_id = reference_id.clone();
    }
    if let Some(workers) = cli.workers {
        config.performance.worker_threads = workers;
    }
    if cli.verbose {
        config.logging.level = LogLevel::Debug;
    }
    if cli.foreground && config.logging.destination == LogDestination::File {
        config.logging.destination = LogDestination::Both;
    }
}

fn test_config(config: &NtpdConfig) -> anyhow::Result<()> {
    config.validate()?;
    println!("Configuration is valid");
    println!("{config}");
    Ok(())
}

fn start(config: NtpdConfig) -> anyhow::Result<()> {
    config.validate()?;
    logging::init(&config.logging)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.performance.worker_threads)
        .enable_all()
        .build()
        .context("failed to start the tokio runtime")?;
    runtime.block_on(serve(config))
}

async fn serve(config: NtpdConfig) -> anyhow::Result<()> {
    if config.security.enable_authentication {
        warn!("enable_authentication is set but not supported; serving unauthenticated");
    }
    if config.security.restrict_queries && config.security.allowed_clients.is_empty() {
        warn!("restrict_queries is set with an empty allowed_clients list; no restriction applied");
    }

    let metrics = Arc::new(ServerMetrics::new());
    let server = server_builder(&config, metrics.clone())?
        .build()
        .await
        .context("failed to start the NTP server")?;

    info!(
        addr = %server.local_addr()?,
        stratum = config.server.stratum,
        reference_id = %config.server.reference_id,
        workers = config.performance.worker_threads,
        "simple-ntpd started"
    );

    let stats_task = config.performance.enable_statistics.then(|| {
        tokio::spawn(log_statistics(
            metrics.clone(),
            Duration::from_secs(config.performance.stats_interval_secs),
        ))
    });

    server.run_until(shutdown_signal()).await?;

    if let Some(task) = stats_task {
        task.abort();
    }
    info!(stats = %metrics.snapshot(), "simple-ntpd stopped");
    Ok(())
}

fn server_builder(
    config: &NtpdConfig,
    metrics: Arc<ServerMetrics>,
) -> anyhow::Result<NtpServerBuilder> {
    let mut builder = NtpServer::builder()
        .listen(config.listen_socket_addr()?.to_string())
        .stratum(Stratum(config.server.stratum))
        .reference_id(&config.server.reference_id)
        .poll(config.server.poll)
        .precision(config.server.precision)
        .leap_indicator(config.server.leap_indicator.into())
        .workers(config.performance.worker_threads)
        .max_clients(config.performance.max_clients)
        .metrics(metrics);

    if config.security.restrict_queries {
        for entry in &config.security.allowed_clients {
            builder = builder.allow(entry.parse::<IpNet>()?);
        }
    }
    for entry in &config.security.denied_clients {
        builder = builder.deny(entry.parse::<IpNet>()?);
    }
    if config.security.rate_limit > 0 {
        builder = builder.rate_limit(RateLimitConfig {
            max_requests_per_window: config.security.rate_limit,
            window_duration: Duration::from_secs(60),
            min_interval: Duration::ZERO,
        });
    }
    Ok(builder)
}

async fn log_statistics(metrics: Arc<ServerMetrics>, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    // The first tick completes immediately.
    ticker.tick().await;
    loop {
        ticker.tick().await;
        info!(stats = %metrics.snapshot(), "server statistics");
    }
}

/// Completes on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl-C"),
        _ = terminate => info!("received SIGTERM"),
    }
}
