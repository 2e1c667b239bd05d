//! Nyan Daemon - Headless Progress Host
//!
//! Runs the activity controller outside an editor. Host events arrive as
//! JSON lines on stdin, and the status-bar indicator is drawn on stderr.
//!
//! # Usage
//!
//! ```bash
//! # Listen for host events on stdin
//! some-build-watcher | nyan-daemon listen
//!
//! # Wrap a command in a progress context
//! nyan-daemon run -- cargo build --release
//!
//! # Play the demo sequence
//! nyan-daemon --speed fast demo
//!
//! # Verbose logging
//! RUST_LOG=debug nyan-daemon listen
//! ```
//!
//! # Signals
//!
//! - `SIGTERM` / `SIGINT`: stop every context and exit
//! - `SIGHUP`: reload the configuration file

mod listen;
mod run;
mod sink;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use nyan_core::{
    load_config_from_path, AnimationSpeed, ConfigOverrides, LoadedConfig, NyanHost,
    SharedSettings,
};

use sink::StderrSink;

/// Nyan Daemon - headless Nyan Progress host
#[derive(Parser, Debug)]
#[command(name = "nyan-daemon")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short = 'c', long, env = "NYAN_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Animation speed (slow, normal, fast)
    #[arg(short = 's', long, value_name = "SPEED")]
    speed: Option<String>,

    /// Show a static frame instead of animating
    #[arg(long)]
    reduced_motion: bool,

    /// Hide the indicator line
    #[arg(long)]
    no_status_bar: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, env = "NYAN_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Clone, Debug, PartialEq, Eq)]
enum Commands {
    /// Read JSON-lines host events from stdin (default)
    Listen,

    /// Run a program inside a progress context
    Run {
        /// Program to run
        program: String,

        /// Arguments passed to the program
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Play the demo sequence
    Demo,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        let mut overrides = ConfigOverrides::new();
        if let Some(ref speed) = self.speed {
            overrides = overrides.with_animation_speed(AnimationSpeed::parse(speed));
        }
        if self.reduced_motion {
            overrides = overrides.with_reduced_motion(true);
        }
        if self.no_status_bar {
            overrides = overrides.with_status_bar(false);
        }
        overrides
    }

    /// Load the file and environment, then apply CLI overrides
    fn load_config(&self) -> Result<LoadedConfig> {
        let path = self
            .config
            .clone()
            .or_else(nyan_core::default_config_path);
        let mut loaded = load_config_from_path(path).context("Failed to load configuration")?;
        self.overrides().apply(&mut loaded);
        Ok(loaded)
    }
}

/// Initialize logging with the specified level
fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("nyan_daemon={level},nyan_core={level}"))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    let loaded = args.load_config()?;
    info!(
        source = %loaded.source,
        speed = %loaded.snapshot.animation_speed,
        "Configuration loaded"
    );

    let settings = SharedSettings::new(loaded.snapshot);
    let host = NyanHost::activate(Arc::new(settings.clone()), Arc::new(StderrSink::new()));

    let command = args.command.clone().unwrap_or(Commands::Listen);
    let code = match command {
        Commands::Listen => {
            listen::run(&host, &settings, || args.load_config()).await?;
            0
        }
        Commands::Run {
            program,
            args: program_args,
        } => run::run(&host.api(), &program, &program_args).await?,
        Commands::Demo => {
            host.api().demo().await?;
            0
        }
    };

    host.deactivate();
    sink::finish_line();

    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults_to_listen() {
        let args = Args::try_parse_from(["nyan-daemon"]).unwrap();
        assert_eq!(args.command, None);
        assert!(!args.reduced_motion);
    }

    #[test]
    fn test_run_keeps_program_flags() {
        let args =
            Args::try_parse_from(["nyan-daemon", "run", "--", "cargo", "build", "--release"])
                .unwrap();
        assert_eq!(
            args.command,
            Some(Commands::Run {
                program: "cargo".into(),
                args: vec!["build".into(), "--release".into()],
            })
        );
    }

    #[test]
    fn test_overrides_from_flags() {
        let args = Args::try_parse_from([
            "nyan-daemon",
            "--speed",
            "fast",
            "--reduced-motion",
            "--no-status-bar",
            "demo",
        ])
        .unwrap();
        let mut loaded = LoadedConfig::default();
        args.overrides().apply(&mut loaded);
        assert_eq!(loaded.snapshot.animation_speed, AnimationSpeed::Fast);
        assert!(loaded.snapshot.reduced_motion);
        assert!(!loaded.snapshot.enable_status_bar);
    }
}
