//! cliprdr-replay - Clipboard channel replay tool
//!
//! Runs the client-side clipboard channel against a scripted server: the
//! server announces capabilities and readiness, a UI task advertises plain
//! text and HTML, and the server answers with its own format list.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lamco_cliprdr::channel::{ChannelPump, EventBridge, MemoryTransport};
use lamco_cliprdr::cliprdr::{CliprdrSession, FormatEntry, FormatList, InboundEvent, OutboundEvent};
use lamco_cliprdr::config::{Config, LogFormat, LoggingConfig};
use lamco_cliprdr::replay::ScriptedServer;
use lamco_cliprdr::utils::format_user_error;

/// Command-line arguments for cliprdr-replay
#[derive(Parser, Debug)]
#[command(name = "cliprdr-replay")]
#[command(version, about = "Replay a clipboard redirection session", long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short, long, env = "CLIPRDR_CONFIG")]
    pub config: Option<String>,

    /// Split server PDUs into chunks of this many bytes
    #[arg(long, env = "CLIPRDR_CHUNK_SIZE")]
    pub chunk_size: Option<usize>,

    /// Give up if the exchange has not finished after this many milliseconds
    #[arg(long, default_value = "5000")]
    pub timeout_ms: u64,

    /// Print channel statistics as JSON when done
    #[arg(long)]
    pub stats: bool,

    /// Verbose logging (can be specified multiple times)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Log format (json|pretty|compact)
    #[arg(long)]
    pub log_format: Option<LogFormat>,

    /// Write logs to file (in addition to stdout)
    #[arg(long)]
    pub log_file: Option<std::path::PathBuf>,
}

#[derive(Debug, Default)]
struct UiSummary {
    synced: bool,
    remote_formats: Option<FormatList>,
    events: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", format_user_error(&e));
            return Err(e);
        }
    };

    // Initialize logging
    init_logging(args.verbose, &config.logging)?;

    info!("════════════════════════════════════════════════════════");
    info!("  cliprdr-replay v{}", env!("CARGO_PKG_VERSION"));
    info!("  Built: {}", env!("BUILD_DATE"));
    info!("  Commit: {}", env!("GIT_HASH"));
    info!("════════════════════════════════════════════════════════");
    debug!("Config: {:?}", config);

    if let Err(e) = run(config, &args).await {
        eprintln!("{}", format_user_error(&e));
        return Err(e);
    }

    Ok(())
}

fn load_config(args: &Args) -> Result<Config> {
    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default_config()?,
    };

    // Override config with CLI args
    let config = config.with_overrides(args.chunk_size, args.log_format, args.log_file.clone());
    config.validate()?;
    Ok(config)
}

async fn run(config: Config, args: &Args) -> Result<()> {
    let bridge = Arc::new(EventBridge::new(config.channel.event_queue_capacity));
    let (transport, peer) = MemoryTransport::pair();
    let mut pump = ChannelPump::new(
        transport,
        CliprdrSession::new(config.to_session_config()),
        Arc::clone(&bridge),
        config.to_pump_config(),
    );
    let mut server = ScriptedServer::new(peer, config.channel.chunk_size);

    let ui = tokio::spawn(run_ui(Arc::clone(&bridge)));
    server.start();

    let deadline = tokio::time::Instant::now() + Duration::from_millis(args.timeout_ms);
    while !server.is_finished() {
        if tokio::time::Instant::now() >= deadline {
            anyhow::bail!("Replay timed out in phase {}", pump.phase());
        }

        let report = pump.drive().context("Clipboard channel failed")?;
        for e in &report.errors {
            warn!("Channel error: {}", e);
        }
        for outcome in &report.outcomes {
            info!("Format list {:x?} answered with {:?}", outcome.list.ids(), outcome.status);
        }

        server.step().context("Client wrote an undecodable PDU")?;

        if report.is_idle() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        } else {
            tokio::task::yield_now().await;
        }
    }

    let stats = pump.stats().clone();
    pump.close();

    let summary = ui.await.context("UI task failed")?;
    info!(
        "Replay finished: synced={}, {} UI events, server formats {:x?}",
        summary.synced,
        summary.events,
        summary.remote_formats.as_ref().map(FormatList::ids).unwrap_or_default()
    );

    if args.stats {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    }

    Ok(())
}

async fn run_ui(bridge: Arc<EventBridge>) -> UiSummary {
    let mut summary = UiSummary::default();

    while let Some(event) = bridge.next_inbound().await {
        summary.events += 1;

        match event {
            InboundEvent::SyncReady => {
                info!("UI: clipboard ready, advertising text and HTML");
                summary.synced = true;

                let list = FormatList::new(vec![FormatEntry::text(), FormatEntry::html()]);
                let (tx, rx) = oneshot::channel();
                let queued = bridge.push_outbound_with_callback(OutboundEvent::SendFormatList(list), move |result| {
                    let _ = tx.send(result);
                });
                if let Err(e) = queued {
                    warn!("UI: could not queue format list: {}", e);
                    continue;
                }

                match rx.await {
                    Ok(Ok(())) => info!("UI: format list sent"),
                    Ok(Err(e)) => warn!("UI: format list not sent: {}", e),
                    Err(_) => warn!("UI: format list request dropped"),
                }
            }
            InboundEvent::RemoteFormatList(list) => {
                for entry in list.iter() {
                    info!("UI: server format {:#06x} {}", entry.id(), entry.name().unwrap_or(""));
                }
                summary.remote_formats = Some(list);
            }
            InboundEvent::FormatListRejected(list) => {
                warn!("UI: server rejected formats {:x?}", list.ids());
            }
            InboundEvent::DataRequest { format_id } => {
                info!("UI: no data to offer for format {:#06x}", format_id);
                if let Err(e) = bridge.push_outbound(OutboundEvent::SendDataResponse { data: None }) {
                    warn!("UI: could not answer data request: {}", e);
                }
            }
            InboundEvent::DataResponse { format_id, data } => {
                info!(
                    "UI: format {:#06x} data: {} bytes",
                    format_id,
                    data.as_ref().map_or(0, |d| d.len())
                );
            }
        }
    }

    summary
}

fn init_logging(verbose: u8, logging: &LoggingConfig) -> Result<()> {
    use std::fs::File;

    let log_level = match verbose {
        0 => logging.level.to_lowercase(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "lamco_cliprdr={level},cliprdr_replay={level},warn",
            level = log_level
        ))
    });

    // If log file is specified, write to both stdout and file
    if let Some(log_file_path) = &logging.log_file {
        let file = File::create(log_file_path)
            .with_context(|| format!("Failed to create log file: {}", log_file_path.display()))?;

        match logging.format {
            LogFormat::Json => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stdout))
                    .with(
                        tracing_subscriber::fmt::layer()
                            .json()
                            .with_writer(file)
                            .with_ansi(false),
                    )
                    .init();
            }
            LogFormat::Compact => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(tracing_subscriber::fmt::layer().compact().with_writer(std::io::stdout))
                    .with(
                        tracing_subscriber::fmt::layer()
                            .compact()
                            .with_writer(file)
                            .with_ansi(false),
                    )
                    .init();
            }
            LogFormat::Pretty => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stdout))
                    .with(tracing_subscriber::fmt::layer().with_writer(file).with_ansi(false))
                    .init();
            }
        }
        info!("Logging to file: {}", log_file_path.display());
    } else {
        // Stdout only
        match logging.format {
            LogFormat::Json => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(tracing_subscriber::fmt::layer().json())
                    .init();
            }
            LogFormat::Compact => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(tracing_subscriber::fmt::layer().compact())
                    .init();
            }
            LogFormat::Pretty => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(tracing_subscriber::fmt::layer().pretty())
                    .init();
            }
        }
    }

    Ok(())
}
