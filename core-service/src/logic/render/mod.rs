//! Render Module - force plot of one explanation
//!
//! Layout (`force_plot`) is computed once, then handed to a `RenderBackend`
//! which turns it into image bytes.

pub mod force_plot;
pub mod raster;
pub mod svg;

use serde::Serialize;
use thiserror::Error;

use crate::logic::explain::Explanation;

pub use crate::logic::config::RenderConfig;
pub use force_plot::{Direction, ForcePlot, ForceSegment};
pub use raster::RasterBackend;
pub use svg::SvgBackend;

// ============================================================================
// ERROR HANDLING
// ============================================================================

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("{labels} labels for {attributions} attributions")]
    LabelMismatch { labels: usize, attributions: usize },

    #[error("explanation contains non-finite values")]
    NonFinite,

    #[error("render I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("converter '{program}' failed ({status}): {stderr}")]
    Converter { program: String, status: String, stderr: String },

    #[error("failed to write image: {0}")]
    Format(#[from] std::fmt::Error),
}

// ============================================================================
// BACKEND
// ============================================================================

pub trait RenderBackend: Send + Sync {
    fn name(&self) -> &str;
    fn media_type(&self) -> &str;
    fn draw(&self, plot: &ForcePlot, config: &RenderConfig) -> Result<Vec<u8>, RenderError>;
}

/// Rendered force plot: layout data plus the encoded image
#[derive(Debug, Clone, Serialize)]
pub struct VisualArtifact {
    pub plot: ForcePlot,
    pub backend: String,
    pub media_type: String,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

impl VisualArtifact {
    /// Image as text when the media type is SVG
    pub fn as_svg(&self) -> Option<&str> {
        if self.media_type == "image/svg+xml" {
            std::str::from_utf8(&self.bytes).ok()
        } else {
            None
        }
    }
}

/// Lay out and draw in one step
pub fn render(
    explanation: &Explanation,
    labels: &[String],
    backend: &dyn RenderBackend,
    config: &RenderConfig,
) -> Result<VisualArtifact, RenderError> {
    let plot = ForcePlot::build(explanation, labels, config)?;
    let bytes = backend.draw(&plot, config)?;
    log::debug!(
        "Rendered force plot: {} segments, {} bytes via {}",
        plot.segments().count(),
        bytes.len(),
        backend.name()
    );
    Ok(VisualArtifact {
        plot,
        backend: backend.name().to_string(),
        media_type: backend.media_type().to_string(),
        bytes,
    })
}
