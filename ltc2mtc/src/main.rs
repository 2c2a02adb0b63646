//! ltc2mtc - Main entry point
//!
//! Reads LTC from an audio input and emits MTC on a MIDI output until
//! interrupted.

use std::process::ExitCode;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ltc2mtc::audio::AudioInput;
use ltc2mtc::cli::Args;
use ltc2mtc::config::Settings;
use ltc2mtc::engine::Engine;
use ltc2mtc::midi::MidiOutput;
use ltc2mtc::SharedRunState;
use ltc2mtc_common::config::TomlConfig;

/// Run-state poll period
const POLL_INTERVAL: Duration = Duration::from_millis(250);

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let toml = match TomlConfig::load_or_default(args.config.as_deref()) {
        Ok(toml) => toml,
        Err(e) => {
            eprintln!("ltc2mtc: {}", e);
            return ExitCode::FAILURE;
        }
    };

    init_tracing(&toml.logging.level);

    if args.list_ports {
        return match list_ports() {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!("{:#}", e);
                ExitCode::FAILURE
            }
        };
    }

    match run(&args, &toml).await {
        Ok(()) => {
            println!("bye.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// `RUST_LOG` if set, else `ltc2mtc=<level>` from the config file
fn init_tracing(level: &str) {
    let fallback = if level.contains('=') {
        level.to_string()
    } else {
        format!("ltc2mtc={}", level)
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn list_ports() -> Result<()> {
    let devices = AudioInput::list_devices().context("Failed to list audio devices")?;
    println!("Audio input devices:");
    for device in devices {
        println!("  {}", device);
    }

    let ports = MidiOutput::list_ports().context("Failed to list MIDI ports")?;
    println!("MIDI output ports:");
    for port in ports {
        println!("  {}", port);
    }
    Ok(())
}

async fn run(args: &Args, toml: &TomlConfig) -> Result<()> {
    let settings = Settings::resolve(args, toml).context("Invalid configuration")?;

    info!("Starting ltc2mtc {}", env!("CARGO_PKG_VERSION"));

    let mut engine = Engine::start(&settings).context("Failed to start translator")?;

    let monitor_shutdown = engine
        .diagnostics()
        .spawn_monitoring_task(tokio::runtime::Handle::current());

    let run_state = engine.run_state();
    tokio::spawn(shutdown_signal(Arc::clone(&run_state)));

    let mut poll = tokio::time::interval(POLL_INTERVAL);
    while !run_state.is_exit() {
        poll.tick().await;
    }

    engine.shutdown();
    monitor_shutdown.store(true, Ordering::Relaxed);
    Ok(())
}

/// Request exit on Ctrl+C, SIGTERM or SIGHUP
async fn shutdown_signal(run_state: Arc<SharedRunState>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use signal::unix::{signal, SignalKind};

        match (signal(SignalKind::terminate()), signal(SignalKind::hangup())) {
            (Ok(mut term), Ok(mut hup)) => {
                tokio::select! {
                    _ = term.recv() => {},
                    _ = hup.recv() => {},
                }
            }
            (Err(e), _) | (_, Err(e)) => {
                warn!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }

    run_state.request_exit();
}
