//! Pipeline Configuration
//!
//! Stage toggles (explanation / rendering) and plot settings. Defaults come
//! from `constants`; `from_env` overlays the `BIRTH_TRAUMA_*` variables.

use serde::{Deserialize, Serialize};

use crate::constants;

/// Plot geometry and text settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderConfig {
    pub width: u32,
    pub height: u32,
    /// Horizontal padding, pixels
    pub margin: f64,
    pub font_family: String,
    pub font_size: f64,
    pub decimals: usize,
    pub min_label_fraction: f64,
    /// Fixed label rotation; `None` rotates only on overlap
    pub text_rotation: Option<f64>,
    pub auto_rotation: f64,
    pub title: Option<String>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: constants::DEFAULT_PLOT_WIDTH,
            height: constants::DEFAULT_PLOT_HEIGHT,
            margin: 40.0,
            font_family: constants::DEFAULT_FONT_FAMILY.to_string(),
            font_size: constants::DEFAULT_FONT_SIZE,
            decimals: 2,
            min_label_fraction: constants::DEFAULT_MIN_LABEL_FRACTION,
            text_rotation: None,
            auto_rotation: constants::DEFAULT_AUTO_ROTATION,
            title: None,
        }
    }
}

/// Which backend draws the force plot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RenderMode {
    Off,
    Svg,
    /// External converter, e.g. `rsvg-convert -f png -o {output} {input}`.
    /// `media_type` names what the converter writes (PNG when unset).
    Raster {
        command: String,
        #[serde(default)]
        media_type: Option<String>,
    },
}

impl RenderMode {
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        match value.to_lowercase().as_str() {
            "" | "svg" => RenderMode::Svg,
            "off" | "none" | "0" | "false" => RenderMode::Off,
            _ => RenderMode::Raster { command: value.to_string(), media_type: None },
        }
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self, RenderMode::Off)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub explain: bool,
    pub render: RenderMode,
    pub plot: RenderConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            explain: true,
            render: RenderMode::Svg,
            plot: RenderConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Self {
        Self {
            explain: constants::is_explain_enabled(),
            render: RenderMode::parse(&constants::get_render_mode()),
            plot: RenderConfig::default(),
        }
    }

    /// Score only, no explanation or plot
    pub fn prediction_only() -> Self {
        Self {
            explain: false,
            render: RenderMode::Off,
            ..Self::default()
        }
    }
}
