//! Daemon settings file handling.
//!
//! Settings are loaded from a TOML file found via a priority chain:
//! the platform config directory, then `~/.config/autotile/config.toml`,
//! then `./config.toml`. A missing file yields defaults; a malformed one
//! is an error so typos do not silently revert the daemon to defaults.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use autotile_core::{AutotileConfig, InsertPosition, Rect};

/// Top-level settings file contents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub screens: Vec<ScreenDecl>,
    pub layout: LayoutSettings,
    pub behavior: BehaviorSettings,
}

/// A screen declared in the settings file, with its usable geometry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenDecl {
    pub name: String,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub enabled: bool,
}

impl Default for ScreenDecl {
    fn default() -> Self {
        Self {
            name: String::new(),
            x: 0,
            y: 0,
            width: 0,
            height: 0,
            enabled: true,
        }
    }
}

impl ScreenDecl {
    pub fn geometry(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

/// Layout parameters mapped onto [`AutotileConfig`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutSettings {
    pub algorithm: String,
    pub split_ratio: f64,
    pub master_count: usize,
    pub inner_gap: i32,
    pub outer_gap: i32,
    pub insert_position: InsertPosition,
    pub smart_gaps: bool,
    pub respect_minimum_size: bool,
    pub monocle_hide_others: bool,
    pub monocle_show_tabs: bool,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        let config = AutotileConfig::default();
        Self {
            algorithm: config.algorithm_id,
            split_ratio: config.split_ratio,
            master_count: config.master_count,
            inner_gap: config.inner_gap,
            outer_gap: config.outer_gap,
            insert_position: config.insert_position,
            smart_gaps: config.smart_gaps,
            respect_minimum_size: config.respect_minimum_size,
            monocle_hide_others: config.monocle_hide_others,
            monocle_show_tabs: config.monocle_show_tabs,
        }
    }
}

/// Behavioral switches that do not affect zone geometry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorSettings {
    pub focus_new_windows: bool,
    pub focus_follows_mouse: bool,
    pub log_level: String,
}

impl Default for BehaviorSettings {
    fn default() -> Self {
        let config = AutotileConfig::default();
        Self {
            focus_new_windows: config.focus_new_windows,
            focus_follows_mouse: config.focus_follows_mouse,
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Candidate config file locations, highest priority first.
pub fn config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(dirs) = directories::ProjectDirs::from("", "", "autotile") {
        paths.push(dirs.config_dir().join("config.toml"));
    }
    if let Some(base) = directories::BaseDirs::new() {
        paths.push(base.home_dir().join(".config/autotile/config.toml"));
    }
    paths.push(PathBuf::from("config.toml"));
    paths
}

impl Settings {
    /// Load settings from the first config file found, or defaults when
    /// none exists.
    pub fn load() -> Result<Self> {
        for path in config_paths() {
            if path.is_file() {
                info!("Loading settings from {}", path.display());
                return Self::load_from(&path);
            }
            debug!("No settings file at {}", path.display());
        }
        info!("No settings file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading settings file {}", path.display()))?;
        let settings: Settings = toml::from_str(&text)
            .with_context(|| format!("parsing settings file {}", path.display()))?;
        Ok(settings)
    }

    /// Non-fatal problems in the loaded settings, as (field, message)
    /// pairs. The daemon logs these and continues with clamped values.
    pub fn validate(&self) -> Vec<(String, String)> {
        let mut warnings = Vec::new();
        let probe = self.to_config();
        if (probe.split_ratio - self.layout.split_ratio).abs() > f64::EPSILON {
            warnings.push((
                "layout.split_ratio".to_string(),
                format!(
                    "{} is out of range, clamped to {}",
                    self.layout.split_ratio, probe.split_ratio
                ),
            ));
        }
        if probe.master_count != self.layout.master_count {
            warnings.push((
                "layout.master_count".to_string(),
                format!(
                    "{} is out of range, clamped to {}",
                    self.layout.master_count, probe.master_count
                ),
            ));
        }
        if probe.inner_gap != self.layout.inner_gap {
            warnings.push((
                "layout.inner_gap".to_string(),
                format!(
                    "{} is out of range, clamped to {}",
                    self.layout.inner_gap, probe.inner_gap
                ),
            ));
        }
        if probe.outer_gap != self.layout.outer_gap {
            warnings.push((
                "layout.outer_gap".to_string(),
                format!(
                    "{} is out of range, clamped to {}",
                    self.layout.outer_gap, probe.outer_gap
                ),
            ));
        }
        for screen in &self.screens {
            if screen.name.is_empty() {
                warnings.push((
                    "screens.name".to_string(),
                    "screen declared without a name, ignored".to_string(),
                ));
            } else if screen.enabled && (screen.width <= 0 || screen.height <= 0) {
                warnings.push((
                    format!("screens.{}", screen.name),
                    "enabled screen has a degenerate geometry".to_string(),
                ));
            }
        }
        warnings
    }

    /// Build the engine configuration, clamping out-of-range values
    /// through the config setters.
    pub fn to_config(&self) -> AutotileConfig {
        let mut config = AutotileConfig::default();
        config.set_algorithm_id(self.layout.algorithm.clone());
        config.set_split_ratio(self.layout.split_ratio);
        config.set_master_count(self.layout.master_count);
        config.set_inner_gap(self.layout.inner_gap);
        config.set_outer_gap(self.layout.outer_gap);
        config.set_insert_position(self.layout.insert_position);
        config.smart_gaps = self.layout.smart_gaps;
        config.respect_minimum_size = self.layout.respect_minimum_size;
        config.monocle_hide_others = self.layout.monocle_hide_others;
        config.monocle_show_tabs = self.layout.monocle_show_tabs;
        config.focus_new_windows = self.behavior.focus_new_windows;
        config.focus_follows_mouse = self.behavior.focus_follows_mouse;
        config
    }

    /// Names of the screens that should be tiled, in declaration order.
    pub fn enabled_screens(&self) -> Vec<String> {
        self.screens
            .iter()
            .filter(|s| s.enabled && !s.name.is_empty())
            .map(|s| s.name.clone())
            .collect()
    }

    /// Declared geometries keyed by screen name, including disabled
    /// screens so they can be enabled later over IPC.
    pub fn screen_geometries(&self) -> Vec<(String, Rect)> {
        self.screens
            .iter()
            .filter(|s| !s.name.is_empty())
            .map(|s| (s.name.clone(), s.geometry()))
            .collect()
    }
}
