//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "eta", version, about = "Eye-tracker gaze pipeline")]
pub struct Cli {
    /// Path to config TOML (typed); built-in defaults when omitted
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log and report as JSON lines instead of pretty text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); overrides [logging].level
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Capture gaze data until Ctrl-C or the configured duration
    Track {
        /// Stop after this many seconds
        #[arg(long, value_name = "SECONDS")]
        duration: Option<f64>,
        /// Use the synthetic mock tracker
        #[arg(long, action = ArgAction::SetTrue)]
        use_mock: bool,
        /// Classify fixations on every sample
        #[arg(long, action = ArgAction::SetTrue)]
        fixation: bool,
        /// Fixation velocity threshold (normalized units per second)
        #[arg(long, value_name = "V")]
        velocity: Option<f64>,
        /// Keep NaN for missing values instead of zero-filling and clamping
        #[arg(long, action = ArgAction::SetTrue)]
        dont_screen_nans: bool,
        /// Keep every record and write the session log on exit
        #[arg(long, action = ArgAction::SetTrue)]
        save_data: bool,
        /// Publish 22-channel frames on the outbound stream
        #[arg(long, action = ArgAction::SetTrue)]
        push_stream: bool,
        /// Sampling rate in Hz
        #[arg(long, value_name = "HZ")]
        data_rate: Option<u32>,
        /// Directory for the session log (overrides [output].data_dir)
        #[arg(long, value_name = "DIR")]
        data_dir: Option<PathBuf>,
    },
    /// Accuracy and precision per validation target
    Validate {
        /// Gaze log written by `track --save-data`
        #[arg(long, value_name = "FILE")]
        gaze: PathBuf,
        /// Target schedule of the validation run
        #[arg(long, value_name = "FILE")]
        targets: PathBuf,
        /// Also write the table as CSV
        #[arg(long, value_name = "FILE")]
        csv: Option<PathBuf>,
    },
    /// Check the configuration and report tracker readiness
    SelfCheck,
}
