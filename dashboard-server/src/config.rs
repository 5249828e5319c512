//! Configuration module

use std::env;

use birth_trauma_core::constants;
use birth_trauma_core::{PipelineConfig, RenderMode};

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,

    /// Model artifact (LightGBM dump JSON or linear JSON)
    pub model_path: String,

    /// Expected SHA-256 of the artifact; load fails on mismatch
    pub model_sha256: Option<String>,

    /// External SVG → PNG converter, `{input}`/`{output}` placeholders
    pub raster_command: Option<String>,

    /// Content type of the converter's output (PNG when unset)
    pub raster_media_type: Option<String>,

    /// Environment (development, production)
    pub environment: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),

            model_path: env::var("MODEL_PATH")
                .unwrap_or_else(|_| constants::get_model_path()),

            model_sha256: env::var("MODEL_SHA256")
                .ok()
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .or_else(constants::get_model_sha256),

            raster_command: env::var("RASTER_COMMAND")
                .ok()
                .filter(|s| !s.trim().is_empty()),

            raster_media_type: env::var("RASTER_MEDIA_TYPE")
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),

            environment: env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
        }
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Stage settings for the assessment pipeline
    pub fn pipeline_config(&self) -> PipelineConfig {
        let mut config = PipelineConfig::from_env();
        if let Some(command) = &self.raster_command {
            config.render = RenderMode::Raster {
                command: command.clone(),
                media_type: self.raster_media_type.clone(),
            };
        }
        config
    }
}
