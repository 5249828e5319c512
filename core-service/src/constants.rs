//! Central Configuration Constants
//!
//! Single source of truth for all configuration defaults.

/// Default model artifact location
pub const DEFAULT_MODEL_PATH: &str = "models/birth_trauma_lgbm.json";

/// Outcome name shown next to the score
pub const OUTCOME_NAME: &str = "分娩心理创伤";

/// Labels below this share of the total effect are not drawn
pub const DEFAULT_MIN_LABEL_FRACTION: f64 = 0.05;

/// Label rotation (degrees) used when horizontal labels collide
pub const DEFAULT_AUTO_ROTATION: f64 = 30.0;

pub const DEFAULT_PLOT_WIDTH: u32 = 1200;
pub const DEFAULT_PLOT_HEIGHT: u32 = 320;
pub const DEFAULT_FONT_SIZE: f64 = 12.0;

/// CJK-capable first, generic fallback last
pub const DEFAULT_FONT_FAMILY: &str = "SimHei, 'Noto Sans CJK SC', 'Microsoft YaHei', sans-serif";

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// App name
pub const APP_NAME: &str = "Birth-Trauma";

// ============================================
// Helper functions to read from env with fallback
// ============================================

/// Get model path from environment or use default
pub fn get_model_path() -> String {
    std::env::var("BIRTH_TRAUMA_MODEL_PATH")
        .unwrap_or_else(|_| DEFAULT_MODEL_PATH.to_string())
}

/// Expected SHA-256 of the model artifact, if pinned
pub fn get_model_sha256() -> Option<String> {
    std::env::var("BIRTH_TRAUMA_MODEL_SHA256")
        .ok()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
}

/// Check if explanations are enabled
pub fn is_explain_enabled() -> bool {
    std::env::var("BIRTH_TRAUMA_EXPLAIN")
        .map(|v| parse_flag(&v))
        .unwrap_or(true)
}

/// Render mode: `svg` (default), `off`, or a raster converter command line
pub fn get_render_mode() -> String {
    std::env::var("BIRTH_TRAUMA_RENDER")
        .unwrap_or_else(|_| "svg".to_string())
}

pub(crate) fn parse_flag(value: &str) -> bool {
    !matches!(value.trim().to_lowercase().as_str(), "0" | "false" | "off" | "no")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("1"));
        assert!(parse_flag("true"));
        assert!(parse_flag("anything"));
        assert!(!parse_flag("0"));
        assert!(!parse_flag(" FALSE "));
        assert!(!parse_flag("off"));
    }
}
