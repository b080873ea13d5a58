//! Configuration management for prosecheck
//!
//! This module provides configuration structures for harness runs, including
//! the target application, browser launch settings, timing and settle delays,
//! manual-inspection holds and evidence storage.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{CheckError, Result};

/// Directory (relative to the project root) holding config and artifacts
pub const CONFIG_DIR: &str = ".prosecheck";

/// Harness configuration
///
/// Loaded from `.prosecheck/config.toml` in the project root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Application URL to open before navigating to a document
    #[serde(default = "default_target_url")]
    pub target_url: String,

    /// Editor surface settings
    #[serde(default)]
    pub editor: EditorConfig,

    /// Browser launch settings
    #[serde(default)]
    pub browser: BrowserSettings,

    /// Timeouts and settle delays
    #[serde(default)]
    pub timing: TimingConfig,

    /// Manual-inspection holds
    #[serde(default)]
    pub hold: HoldConfig,

    /// Evidence storage
    #[serde(default)]
    pub artifacts: ArtifactConfig,
}

/// Editor surface settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditorConfig {
    /// Class carried by the editable root element
    #[serde(default = "default_root_class")]
    pub root_class: String,
}

/// Browser launch settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserSettings {
    /// Run without a visible window
    #[serde(default = "default_headless")]
    pub headless: bool,

    #[serde(default = "default_window_width")]
    pub window_width: u32,

    #[serde(default = "default_window_height")]
    pub window_height: u32,

    /// Navigation timeout in seconds
    #[serde(default = "default_navigation_timeout")]
    pub timeout_seconds: u64,

    /// Attach to an already running browser through its DevTools websocket URL
    #[serde(default)]
    pub debugger_url: Option<String>,
}

/// Timeouts and settle delays, all in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Overall budget for resolving one control
    #[serde(default = "default_resolve_timeout")]
    pub resolve_timeout_ms: u64,

    /// Budget for a single locator strategy
    #[serde(default = "default_per_strategy_timeout")]
    pub per_strategy_timeout_ms: u64,

    /// Polling interval for visibility and stability probes
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Wait after page loads and navigation clicks
    #[serde(default = "default_page_settle")]
    pub page_settle_ms: u64,

    /// Wait after select-all
    #[serde(default = "default_select_all_settle")]
    pub select_all_settle_ms: u64,

    /// Wait after deleting the selection
    #[serde(default = "default_clear_settle")]
    pub clear_settle_ms: u64,

    /// Wait after typing list content
    #[serde(default = "default_typing_settle")]
    pub typing_settle_ms: u64,

    /// Wait after invoking a conversion control
    #[serde(default = "default_conversion_settle")]
    pub conversion_settle_ms: u64,

    /// Wait for a floating menu to appear after selecting text
    #[serde(default = "default_selection_settle")]
    pub selection_settle_ms: u64,
}

/// Manual-inspection holds, in seconds; zero disables a hold
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoldConfig {
    /// Hold after an unexpected fault, before the run ends
    #[serde(default = "default_fault_hold")]
    pub on_fault_secs: u64,

    /// Hold when navigation cannot reach an editor
    #[serde(default = "default_missing_editor_hold")]
    pub missing_editor_secs: u64,

    /// Hold after all cases finished
    #[serde(default)]
    pub after_run_secs: u64,
}

/// Evidence storage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactConfig {
    /// Base directory; artifacts land in `<dir>/artifacts/<run-id>/`
    #[serde(default = "default_artifact_dir")]
    pub dir: PathBuf,
}

// Default value providers
fn default_target_url() -> String {
    "http://localhost:3001".to_string()
}

fn default_root_class() -> String {
    "ProseMirror".to_string()
}

fn default_headless() -> bool {
    true
}

fn default_window_width() -> u32 {
    1920
}

fn default_window_height() -> u32 {
    1080
}

fn default_navigation_timeout() -> u64 {
    15
}

fn default_resolve_timeout() -> u64 {
    8_000
}

fn default_per_strategy_timeout() -> u64 {
    1_000
}

fn default_poll_interval() -> u64 {
    50
}

fn default_page_settle() -> u64 {
    2_000
}

fn default_select_all_settle() -> u64 {
    100
}

fn default_clear_settle() -> u64 {
    200
}

fn default_typing_settle() -> u64 {
    500
}

fn default_conversion_settle() -> u64 {
    500
}

fn default_selection_settle() -> u64 {
    1_000
}

fn default_fault_hold() -> u64 {
    60
}

fn default_missing_editor_hold() -> u64 {
    120
}

fn default_artifact_dir() -> PathBuf {
    PathBuf::from(CONFIG_DIR)
}

impl HarnessConfig {
    /// Load configuration from `.prosecheck/config.toml` or use defaults
    pub fn load_or_default(project_root: &Path) -> Result<Self> {
        let config_path = project_root.join(CONFIG_DIR).join("config.toml");

        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from an explicit file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| {
            CheckError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    /// Write default configuration to `.prosecheck/config.toml`
    pub fn write_default(project_root: &Path) -> Result<PathBuf> {
        let config_dir = project_root.join(CONFIG_DIR);
        std::fs::create_dir_all(&config_dir)?;

        let config_path = config_dir.join("config.toml");
        let content = toml::to_string_pretty(&Self::default())
            .map_err(|e| CheckError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(&config_path, content)?;
        Ok(config_path)
    }

    /// CSS class selector for the editor root
    pub fn editor_selector(&self) -> String {
        format!(".{}", self.editor.root_class)
    }
}

impl TimingConfig {
    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_millis(self.resolve_timeout_ms)
    }

    pub fn per_strategy_timeout(&self) -> Duration {
        Duration::from_millis(self.per_strategy_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn page_settle(&self) -> Duration {
        Duration::from_millis(self.page_settle_ms)
    }

    pub fn select_all_settle(&self) -> Duration {
        Duration::from_millis(self.select_all_settle_ms)
    }

    pub fn clear_settle(&self) -> Duration {
        Duration::from_millis(self.clear_settle_ms)
    }

    pub fn typing_settle(&self) -> Duration {
        Duration::from_millis(self.typing_settle_ms)
    }

    pub fn conversion_settle(&self) -> Duration {
        Duration::from_millis(self.conversion_settle_ms)
    }

    pub fn selection_settle(&self) -> Duration {
        Duration::from_millis(self.selection_settle_ms)
    }

    /// All waits collapsed to zero, for in-process sessions
    pub fn immediate() -> Self {
        Self {
            resolve_timeout_ms: 200,
            per_strategy_timeout_ms: 20,
            poll_interval_ms: 5,
            page_settle_ms: 0,
            select_all_settle_ms: 0,
            clear_settle_ms: 0,
            typing_settle_ms: 0,
            conversion_settle_ms: 0,
            selection_settle_ms: 0,
        }
    }
}

impl HoldConfig {
    pub fn on_fault(&self) -> Duration {
        Duration::from_secs(self.on_fault_secs)
    }

    pub fn missing_editor(&self) -> Duration {
        Duration::from_secs(self.missing_editor_secs)
    }

    pub fn after_run(&self) -> Duration {
        Duration::from_secs(self.after_run_secs)
    }

    /// No holds at all
    pub fn none() -> Self {
        Self {
            on_fault_secs: 0,
            missing_editor_secs: 0,
            after_run_secs: 0,
        }
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            target_url: default_target_url(),
            editor: EditorConfig::default(),
            browser: BrowserSettings::default(),
            timing: TimingConfig::default(),
            hold: HoldConfig::default(),
            artifacts: ArtifactConfig::default(),
        }
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            root_class: default_root_class(),
        }
    }
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: default_headless(),
            window_width: default_window_width(),
            window_height: default_window_height(),
            timeout_seconds: default_navigation_timeout(),
            debugger_url: None,
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            resolve_timeout_ms: default_resolve_timeout(),
            per_strategy_timeout_ms: default_per_strategy_timeout(),
            poll_interval_ms: default_poll_interval(),
            page_settle_ms: default_page_settle(),
            select_all_settle_ms: default_select_all_settle(),
            clear_settle_ms: default_clear_settle(),
            typing_settle_ms: default_typing_settle(),
            conversion_settle_ms: default_conversion_settle(),
            selection_settle_ms: default_selection_settle(),
        }
    }
}

impl Default for HoldConfig {
    fn default() -> Self {
        Self {
            on_fault_secs: default_fault_hold(),
            missing_editor_secs: default_missing_editor_hold(),
            after_run_secs: 0,
        }
    }
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            dir: default_artifact_dir(),
        }
    }
}
