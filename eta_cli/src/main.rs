mod cli;
mod error_fmt;
mod track;
mod validate;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use eta_core::error::EtaError;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};
use crate::track::TrackOverrides;

fn main() {
    if let Err(e) = color_eyre::install() {
        eprintln!("warning: could not install error reporter: {e}");
    }
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(err) = run(cli) {
        tracing::debug!(error = %err, "eta failed");
        if JSON_MODE.get().copied().unwrap_or(false) {
            println!("{}", format_error_json(&err));
        } else {
            eprintln!("{}", humanize(&err));
        }
        std::process::exit(exit_code_for_error(&err));
    }
}

fn load_config(path: Option<&Path>) -> eyre::Result<eta_config::Config> {
    match path {
        Some(p) => eta_config::load_file(p)
            .map_err(|e| eyre::Report::new(EtaError::Config(format!("{e}")))),
        None => Ok(eta_config::Config::default()),
    }
}

/// RUST_LOG wins; then --log-level; then [logging].level; then "info".
fn init_tracing(cli: &Cli, logging: &eta_config::Logging) -> eyre::Result<()> {
    let level = cli
        .log_level
        .clone()
        .or_else(|| logging.level.clone())
        .unwrap_or_else(|| "info".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));

    let console = if cli.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .boxed()
    };

    let file = match logging.file.as_deref() {
        Some(path) => {
            let path = Path::new(path);
            let dir = path
                .parent()
                .filter(|d| !d.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| eyre::eyre!("logging.file must name a file"))?;
            let appender = match logging.rotation.as_deref() {
                Some("daily") => tracing_appender::rolling::daily(dir, name),
                Some("hourly") => tracing_appender::rolling::hourly(dir, name),
                _ => tracing_appender::rolling::never(dir, name),
            };
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(guard);
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(writer)
                    .boxed(),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()
        .map_err(|e| eyre::eyre!("init logging: {e}"))
}

fn install_ctrlc() -> Arc<AtomicBool> {
    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = shutdown.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
    }) {
        tracing::warn!(error = %e, "could not install Ctrl-C handler");
    }
    shutdown
}

fn run(cli: Cli) -> eyre::Result<()> {
    let cfg = load_config(cli.config.as_deref())?;
    init_tracing(&cli, &cfg.logging)?;
    tracing::debug!(config = ?cli.config, "configuration loaded");

    match cli.cmd {
        Commands::Track {
            duration,
            use_mock,
            fixation,
            velocity,
            dont_screen_nans,
            save_data,
            push_stream,
            data_rate,
            data_dir,
        } => {
            let overrides = TrackOverrides {
                duration,
                use_mock,
                fixation,
                velocity,
                dont_screen_nans,
                save_data,
                push_stream,
                data_rate,
                data_dir,
            };
            let shutdown = install_ctrlc();
            track::run_track(&cfg, &overrides, &shutdown, cli.json)?;
        }
        Commands::Validate { gaze, targets, csv } => {
            validate::run_validate(&gaze, &targets, csv.as_deref(), cli.json)?;
        }
        Commands::SelfCheck => {
            track::self_check(&cfg, cli.json)?;
        }
    }
    Ok(())
}
