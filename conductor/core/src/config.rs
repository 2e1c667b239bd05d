//! Settings and Config Snapshots
//!
//! The controller never caches settings: every decision point takes a fresh
//! [`ConfigSnapshot`] from a [`Settings`] implementation. This module provides
//! the snapshot type, a shared in-memory store, and TOML file loading.
//!
//! # Configuration Priority
//!
//! Values are loaded with the following priority (highest first):
//! 1. CLI arguments (via [`ConfigOverrides`])
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! [indicator]
//! enable_status_bar = true
//! animation_speed = "fast"
//! reduced_motion = false
//!
//! [tracking]
//! track_tasks = true
//! track_debug_sessions = false
//! auto_reveal_on_task = true
//! ```

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    Read {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    Parse(#[from] toml::de::Error),
}

// =============================================================================
// Snapshot Types
// =============================================================================

/// Animation speed setting
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnimationSpeed {
    /// Half speed
    Slow,
    /// Baseline speed
    #[default]
    Normal,
    /// Nearly double speed
    Fast,
}

impl AnimationSpeed {
    /// Parse a speed name. Unrecognized values fall back to `Normal`.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "slow" => Self::Slow,
            "fast" => Self::Fast,
            _ => Self::Normal,
        }
    }

    /// Multiplier applied to the status-bar frame period
    #[must_use]
    pub fn multiplier(self) -> f64 {
        match self {
            Self::Slow => 0.5,
            Self::Normal => 1.0,
            Self::Fast => 1.8,
        }
    }

    /// Panel sprite velocity in pixels per millisecond
    #[must_use]
    pub fn px_per_ms(self) -> f64 {
        match self {
            Self::Slow => 0.14,
            Self::Normal => 0.22,
            Self::Fast => 0.32,
        }
    }

    /// Setting value as written in configuration
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Slow => "slow",
            Self::Normal => "normal",
            Self::Fast => "fast",
        }
    }
}

impl fmt::Display for AnimationSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Lenient on purpose: the panel may receive speeds from a newer host.
impl<'de> Deserialize<'de> for AnimationSpeed {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

/// One read of the external settings
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigSnapshot {
    /// Show the status-bar indicator
    pub enable_status_bar: bool,
    /// Indicator and panel animation speed
    pub animation_speed: AnimationSpeed,
    /// Replace animation with a static frame
    pub reduced_motion: bool,
    /// Begin a context for every host task
    pub track_tasks: bool,
    /// Begin a context for every top-level debug session
    pub track_debug_sessions: bool,
    /// Allow task/debug contexts to reveal the panel
    pub auto_reveal_on_task: bool,
}

impl Default for ConfigSnapshot {
    fn default() -> Self {
        Self {
            enable_status_bar: true,
            animation_speed: AnimationSpeed::Normal,
            reduced_motion: false,
            track_tasks: true,
            track_debug_sessions: true,
            auto_reveal_on_task: true,
        }
    }
}

impl ConfigSnapshot {
    /// Keys whose values differ between `self` and `other`
    #[must_use]
    pub fn changed_keys(&self, other: &Self) -> Vec<SettingKey> {
        let mut keys = Vec::new();
        if self.enable_status_bar != other.enable_status_bar {
            keys.push(SettingKey::EnableStatusBar);
        }
        if self.animation_speed != other.animation_speed {
            keys.push(SettingKey::AnimationSpeed);
        }
        if self.reduced_motion != other.reduced_motion {
            keys.push(SettingKey::ReducedMotion);
        }
        if self.track_tasks != other.track_tasks {
            keys.push(SettingKey::TrackTasks);
        }
        if self.track_debug_sessions != other.track_debug_sessions {
            keys.push(SettingKey::TrackDebugSessions);
        }
        if self.auto_reveal_on_task != other.auto_reveal_on_task {
            keys.push(SettingKey::AutoRevealOnTask);
        }
        keys
    }

    /// Reduced motion as configured or as detected from the environment
    #[must_use]
    pub fn effective_reduced_motion(&self) -> bool {
        self.reduced_motion || detect_reduced_motion()
    }
}

/// Names of the individual settings
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SettingKey {
    /// `nyanProgress.enableStatusBar`
    EnableStatusBar,
    /// `nyanProgress.animationSpeed`
    AnimationSpeed,
    /// `nyanProgress.reducedMotion`
    ReducedMotion,
    /// `nyanProgress.trackTasks`
    TrackTasks,
    /// `nyanProgress.trackDebugSessions`
    TrackDebugSessions,
    /// `nyanProgress.autoRevealOnTask`
    AutoRevealOnTask,
}

impl SettingKey {
    /// Fully qualified external key
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::EnableStatusBar => "nyanProgress.enableStatusBar",
            Self::AnimationSpeed => "nyanProgress.animationSpeed",
            Self::ReducedMotion => "nyanProgress.reducedMotion",
            Self::TrackTasks => "nyanProgress.trackTasks",
            Self::TrackDebugSessions => "nyanProgress.trackDebugSessions",
            Self::AutoRevealOnTask => "nyanProgress.autoRevealOnTask",
        }
    }

    /// Whether a change to this key affects running animations
    #[must_use]
    pub fn affects_motion(self) -> bool {
        matches!(self, Self::AnimationSpeed | Self::ReducedMotion)
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

// =============================================================================
// Settings Sources
// =============================================================================

/// Source of fresh configuration snapshots
pub trait Settings: Send + Sync {
    /// Read the current settings
    fn snapshot(&self) -> ConfigSnapshot;
}

/// Shared, replaceable settings store
///
/// Clones share the same underlying snapshot.
#[derive(Clone, Debug, Default)]
pub struct SharedSettings {
    inner: Arc<RwLock<ConfigSnapshot>>,
}

impl SharedSettings {
    /// Create a store holding `snapshot`
    #[must_use]
    pub fn new(snapshot: ConfigSnapshot) -> Self {
        Self {
            inner: Arc::new(RwLock::new(snapshot)),
        }
    }

    /// Replace the stored snapshot, returning the keys that changed
    pub fn replace(&self, snapshot: ConfigSnapshot) -> Vec<SettingKey> {
        let mut inner = self.inner.write();
        let changed = inner.changed_keys(&snapshot);
        *inner = snapshot;
        if !changed.is_empty() {
            tracing::debug!(changed = ?changed, "Settings updated");
        }
        changed
    }

    /// Apply an in-place edit, returning the keys that changed
    pub fn update(&self, edit: impl FnOnce(&mut ConfigSnapshot)) -> Vec<SettingKey> {
        let mut next = self.snapshot();
        edit(&mut next);
        self.replace(next)
    }
}

impl Settings for SharedSettings {
    fn snapshot(&self) -> ConfigSnapshot {
        *self.inner.read()
    }
}

// =============================================================================
// Reduced-Motion Detection
// =============================================================================

/// Whether the environment asks for reduced motion
///
/// Reads `REDUCE_MOTION`; see [`parse_reduce_motion`].
#[must_use]
pub fn detect_reduced_motion() -> bool {
    std::env::var("REDUCE_MOTION")
        .map(|value| parse_reduce_motion(&value))
        .unwrap_or(false)
}

/// Parse a `REDUCE_MOTION` value
#[must_use]
pub fn parse_reduce_motion(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "2" | "true" | "yes" | "reduced" | "none" | "static" | "off"
    )
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where the loaded configuration came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// `[indicator]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorToml {
    /// Show the status-bar indicator
    pub enable_status_bar: Option<bool>,
    /// `slow`, `normal` or `fast`
    pub animation_speed: Option<String>,
    /// Replace animation with a static frame
    pub reduced_motion: Option<bool>,
}

/// `[tracking]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingToml {
    /// Begin a context for every host task
    pub track_tasks: Option<bool>,
    /// Begin a context for every top-level debug session
    pub track_debug_sessions: Option<bool>,
    /// Allow task/debug contexts to reveal the panel
    pub auto_reveal_on_task: Option<bool>,
}

/// Root of the TOML configuration file
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NyanToml {
    /// Indicator settings
    pub indicator: IndicatorToml,
    /// Host event tracking settings
    pub tracking: TrackingToml,
}

/// Result of configuration loading
#[derive(Clone, Debug)]
pub struct LoadedConfig {
    /// Effective settings
    pub snapshot: ConfigSnapshot,
    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,
    /// Highest-priority source that contributed a value
    pub source: ConfigSource,
}

impl Default for LoadedConfig {
    fn default() -> Self {
        Self {
            snapshot: ConfigSnapshot::default(),
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/nyan-progress/config.toml`.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("nyan-progress").join("config.toml"))
}

/// Load configuration from the default path, then the environment
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be read or parsed.
pub fn load_config() -> Result<LoadedConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path, then the environment
///
/// A missing file is not an error; defaults are used.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<LoadedConfig, ConfigError> {
    let mut config = LoadedConfig::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::Read {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: NyanToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config.snapshot, &toml_config);
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(
                path = %config_path.display(),
                "Loaded configuration from file"
            );
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    apply_env_config(&mut config);

    Ok(config)
}

fn apply_toml_config(snapshot: &mut ConfigSnapshot, toml: &NyanToml) {
    if let Some(enabled) = toml.indicator.enable_status_bar {
        snapshot.enable_status_bar = enabled;
    }
    if let Some(ref speed) = toml.indicator.animation_speed {
        snapshot.animation_speed = AnimationSpeed::parse(speed);
    }
    if let Some(reduced) = toml.indicator.reduced_motion {
        snapshot.reduced_motion = reduced;
    }
    if let Some(track) = toml.tracking.track_tasks {
        snapshot.track_tasks = track;
    }
    if let Some(track) = toml.tracking.track_debug_sessions {
        snapshot.track_debug_sessions = track;
    }
    if let Some(reveal) = toml.tracking.auto_reveal_on_task {
        snapshot.auto_reveal_on_task = reveal;
    }
}

fn env_flag(name: &str) -> Option<bool> {
    std::env::var(name)
        .ok()
        .map(|v| v != "0" && v.to_lowercase() != "false")
}

fn apply_env_config(config: &mut LoadedConfig) {
    let snapshot = &mut config.snapshot;
    let mut touched = false;

    if let Some(enabled) = env_flag("NYAN_ENABLE_STATUS_BAR") {
        snapshot.enable_status_bar = enabled;
        touched = true;
    }
    if let Ok(speed) = std::env::var("NYAN_ANIMATION_SPEED") {
        snapshot.animation_speed = AnimationSpeed::parse(&speed);
        touched = true;
    }
    if let Some(reduced) = env_flag("NYAN_REDUCED_MOTION") {
        snapshot.reduced_motion = reduced;
        touched = true;
    }
    if let Some(track) = env_flag("NYAN_TRACK_TASKS") {
        snapshot.track_tasks = track;
        touched = true;
    }
    if let Some(track) = env_flag("NYAN_TRACK_DEBUG_SESSIONS") {
        snapshot.track_debug_sessions = track;
        touched = true;
    }
    if let Some(reveal) = env_flag("NYAN_AUTO_REVEAL") {
        snapshot.auto_reveal_on_task = reveal;
        touched = true;
    }

    if touched {
        config.source = ConfigSource::Env;
    }
}

// =============================================================================
// CLI Overrides
// =============================================================================

/// Overrides supplied on the command line
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Override `enable_status_bar`
    pub enable_status_bar: Option<bool>,
    /// Override `animation_speed`
    pub animation_speed: Option<AnimationSpeed>,
    /// Override `reduced_motion`
    pub reduced_motion: Option<bool>,
}

impl ConfigOverrides {
    /// Create empty overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the animation speed
    #[must_use]
    pub fn with_animation_speed(mut self, speed: AnimationSpeed) -> Self {
        self.animation_speed = Some(speed);
        self
    }

    /// Override reduced motion
    #[must_use]
    pub fn with_reduced_motion(mut self, reduced: bool) -> Self {
        self.reduced_motion = Some(reduced);
        self
    }

    /// Override status-bar visibility
    #[must_use]
    pub fn with_status_bar(mut self, enabled: bool) -> Self {
        self.enable_status_bar = Some(enabled);
        self
    }

    /// Apply the overrides to a loaded configuration
    pub fn apply(&self, config: &mut LoadedConfig) {
        let mut touched = false;
        if let Some(enabled) = self.enable_status_bar {
            config.snapshot.enable_status_bar = enabled;
            touched = true;
        }
        if let Some(speed) = self.animation_speed {
            config.snapshot.animation_speed = speed;
            touched = true;
        }
        if let Some(reduced) = self.reduced_motion {
            config.snapshot.reduced_motion = reduced;
            touched = true;
        }
        if touched {
            config.source = ConfigSource::Cli;
        }
    }
}
