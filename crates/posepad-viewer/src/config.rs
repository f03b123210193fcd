//! Configuration loading and validation

use anyhow::Result;
use posepad_core::{GraphName, GraphNameError};
use posepad_overlay::{GestureConfig, ViewContext};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub layer: LayerConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub gesture: GestureSettings,
    #[serde(default)]
    pub viewer: ViewerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerConfig {
    /// Topic poses are published on, resolved against the viewer node
    #[serde(default = "default_topic")]
    pub topic: String,
    /// Physical pixels per density-independent pixel
    #[serde(default = "default_density")]
    pub density: f64,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            topic: default_topic(),
            density: default_density(),
        }
    }
}

fn default_topic() -> String {
    "goal".to_string()
}

fn default_density() -> f64 {
    1.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraConfig {
    /// Frame published poses are expressed in
    #[serde(default = "default_fixed_frame")]
    pub fixed_frame: String,
    #[serde(default = "default_zoom")]
    pub zoom: f64,
    /// World position at the center of the window, in meters
    #[serde(default)]
    pub position: [f64; 2],
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fixed_frame: default_fixed_frame(),
            zoom: default_zoom(),
            position: [0.0, 0.0],
        }
    }
}

fn default_fixed_frame() -> String {
    "map".to_string()
}

fn default_zoom() -> f64 {
    1.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GestureSettings {
    #[serde(default = "default_tap_timeout")]
    pub tap_timeout_ms: u64,
    #[serde(default = "default_long_press_timeout")]
    pub long_press_timeout_ms: u64,
    /// Touch slop in pixels; derived from the layer density when unset
    #[serde(default)]
    pub touch_slop: Option<f64>,
}

impl Default for GestureSettings {
    fn default() -> Self {
        Self {
            tap_timeout_ms: default_tap_timeout(),
            long_press_timeout_ms: default_long_press_timeout(),
            touch_slop: None,
        }
    }
}

fn default_tap_timeout() -> u64 {
    100
}

fn default_long_press_timeout() -> u64 {
    500
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewerConfig {
    #[serde(default = "default_title")]
    pub title: String,
    /// Name of the node the overlay publishes from
    #[serde(default = "default_node_name")]
    pub node_name: String,
    #[serde(default = "default_show_grid")]
    pub show_grid: bool,
    /// Grid spacing in meters
    #[serde(default = "default_grid_spacing")]
    pub grid_spacing: f64,
    /// Number of published poses kept in the status panel
    #[serde(default = "default_history")]
    pub history: usize,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            node_name: default_node_name(),
            show_grid: default_show_grid(),
            grid_spacing: default_grid_spacing(),
            history: default_history(),
        }
    }
}

fn default_title() -> String {
    "Posepad".to_string()
}

fn default_node_name() -> String {
    "/posepad_viewer".to_string()
}

fn default_show_grid() -> bool {
    true
}

fn default_grid_spacing() -> f64 {
    1.0
}

fn default_history() -> usize {
    20
}

impl Config {
    pub fn topic(&self) -> Result<GraphName, GraphNameError> {
        GraphName::new(&self.layer.topic)
    }

    pub fn fixed_frame(&self) -> Result<GraphName, GraphNameError> {
        GraphName::new(&self.camera.fixed_frame)
    }

    pub fn node_name(&self) -> Result<GraphName, GraphNameError> {
        GraphName::new(&self.viewer.node_name)
    }

    pub fn view_context(&self) -> ViewContext {
        ViewContext {
            density: self.layer.density,
        }
    }

    /// Gesture thresholds with configured overrides applied
    pub fn gesture_config(&self) -> GestureConfig {
        let derived = GestureConfig::for_context(&self.view_context());
        GestureConfig {
            tap_timeout: Duration::from_millis(self.gesture.tap_timeout_ms),
            long_press_timeout: Duration::from_millis(self.gesture.long_press_timeout_ms),
            touch_slop: self.gesture.touch_slop.unwrap_or(derived.touch_slop),
        }
    }
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    } else {
        info!(
            path = %path.display(),
            "Configuration file not found, using defaults"
        );
        Ok(Config::default())
    }
}

/// Save default configuration to file
pub fn save_default_config(path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(&Config::default())?;
    std::fs::write(path, content)?;
    Ok(())
}
