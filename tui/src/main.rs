//! Nyan TUI Entry Point
//!
//! Usage:
//!   nyan-tui [OPTIONS]
//!
//! Options:
//!   -c, --config <FILE>   Configuration file
//!   -s, --speed <SPEED>   Animation speed (slow, normal, fast)
//!   --reduced-motion      Hold the sprite still
//!   --log-file <FILE>     Write logs here (nothing is logged otherwise)

use std::fs::File;
use std::io;
use std::panic;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context;
use clap::Parser;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

use nyan_core::{
    detect_reduced_motion, load_config_from_path, AnimationSpeed, ConfigOverrides,
    SharedSettings,
};
use nyan_tui::App;

/// Nyan TUI - the rainbow cat that flies while you work
#[derive(Parser, Debug)]
#[command(name = "nyan-tui")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short = 'c', long, env = "NYAN_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Animation speed (slow, normal, fast)
    #[arg(short = 's', long, value_name = "SPEED")]
    speed: Option<String>,

    /// Show a static frame instead of animating
    #[arg(long)]
    reduced_motion: bool,

    /// Log file; the terminal is busy drawing the panel
    #[arg(long, env = "NYAN_TUI_LOG", value_name = "FILE")]
    log_file: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, env = "NYAN_LOG_LEVEL", default_value = "info")]
    log_level: String,
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
        overrides
    }
}

fn init_logging(path: &Path, level: &str) -> anyhow::Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create log file {}", path.display()))?;
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("nyan_tui={level},nyan_core={level}"))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    if let Some(ref path) = args.log_file {
        init_logging(path, &args.log_level)?;
    }

    // Check if we have a TTY before attempting initialization
    use std::io::IsTerminal;

    if !io::stdin().is_terminal() || !io::stdout().is_terminal() {
        eprintln!("nyan-tui requires a terminal (TTY)");
        eprintln!("For pipes and scripts use nyan-daemon instead.");
        std::process::exit(1);
    }

    let path = args.config.clone().or_else(nyan_core::default_config_path);
    let mut loaded = load_config_from_path(path).context("Failed to load configuration")?;
    args.overrides().apply(&mut loaded);
    tracing::info!(source = %loaded.source, "Configuration loaded");

    // Set up panic hook to restore terminal
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    let mut app = App::new(SharedSettings::new(loaded.snapshot), detect_reduced_motion())?;

    // Initialize terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let result = app.run(&mut terminal).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    app.shutdown().await;
    result
}
