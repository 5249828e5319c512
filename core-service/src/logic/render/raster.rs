//! Raster backend - rasterizes the SVG through an external converter
//!
//! The converter runs inside a private scratch directory that is removed on
//! every exit path (success, converter failure, I/O error). Nothing is left in
//! the working directory.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tempfile::TempDir;

use super::svg::to_svg;
use super::{ForcePlot, RenderBackend, RenderConfig, RenderError};

const INPUT_FILE: &str = "force_plot.svg";
const OUTPUT_FILE: &str = "force_plot.out";

#[derive(Debug, Clone)]
pub struct RasterBackend {
    program: String,
    /// `{input}` / `{output}` are replaced with scratch file paths
    args: Vec<String>,
    media_type: String,
    scratch_root: Option<PathBuf>,
}

impl RasterBackend {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            media_type: "image/png".to_string(),
            scratch_root: None,
        }
    }

    /// Parse `"rsvg-convert -f png -o {output} {input}"`
    pub fn from_command_line(command: &str) -> Option<Self> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self::new(program, parts.collect()))
    }

    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = media_type.into();
        self
    }

    /// Create scratch directories under `root` instead of the system temp dir
    pub fn with_scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(root.into());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn scratch_dir(&self) -> std::io::Result<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("force-plot-");
        match &self.scratch_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
    }

    fn expand_args(&self, input: &Path, output: &Path) -> Vec<String> {
        let input = input.to_string_lossy();
        let output = output.to_string_lossy();
        self.args
            .iter()
            .map(|a| a.replace("{input}", &input).replace("{output}", &output))
            .collect()
    }

    fn convert(&self, dir: &Path, svg: &str) -> Result<Vec<u8>, RenderError> {
        let input = dir.join(INPUT_FILE);
        let output = dir.join(OUTPUT_FILE);
        std::fs::write(&input, svg)?;

        let result = Command::new(&self.program)
            .args(self.expand_args(&input, &output))
            .current_dir(dir)
            .stdin(Stdio::null())
            .output()?;

        if !result.status.success() {
            return Err(RenderError::Converter {
                program: self.program.clone(),
                status: result.status.to_string(),
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }

        let bytes = std::fs::read(&output)?;
        if bytes.is_empty() {
            return Err(RenderError::Converter {
                program: self.program.clone(),
                status: result.status.to_string(),
                stderr: "converter produced an empty file".to_string(),
            });
        }
        Ok(bytes)
    }
}

impl RenderBackend for RasterBackend {
    fn name(&self) -> &str {
        "raster"
    }

    fn media_type(&self) -> &str {
        &self.media_type
    }

    fn draw(&self, plot: &ForcePlot, config: &RenderConfig) -> Result<Vec<u8>, RenderError> {
        let svg = to_svg(plot, config)?;
        let dir = self.scratch_dir()?;
        log::debug!("Rasterizing force plot with '{}' in {}", self.program, dir.path().display());

        let result = self.convert(dir.path(), &svg);

        // TempDir also cleans up on drop; close() surfaces the error
        if let Err(e) = dir.close() {
            log::warn!("Failed to remove render scratch directory: {}", e);
        }
        result
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::logic::explain::Explanation;

    fn sample_plot(config: &RenderConfig) -> ForcePlot {
        let e = Explanation { baseline: 0.2, attributions: vec![0.1, -0.05], prediction: 0.25 };
        ForcePlot::build(&e, &["X1=18".to_string(), "X2=60".to_string()], config).unwrap()
    }

    fn sh(script: &str) -> Vec<String> {
        vec!["-c".to_string(), script.to_string()]
    }

    fn leftovers(root: &Path) -> usize {
        std::fs::read_dir(root).unwrap().count()
    }

    #[test]
    fn test_converter_output_is_returned() {
        let root = TempDir::new().unwrap();
        let backend = RasterBackend::new("sh", sh("cp {input} {output}")).with_scratch_root(root.path());
        let config = RenderConfig::default();

        let bytes = backend.draw(&sample_plot(&config), &config).unwrap();
        assert!(String::from_utf8(bytes).unwrap().starts_with("<svg"));
        assert_eq!(leftovers(root.path()), 0);
    }

    #[test]
    fn test_scratch_removed_when_converter_fails() {
        let root = TempDir::new().unwrap();
        let backend = RasterBackend::new("sh", sh("echo boom >&2; exit 3")).with_scratch_root(root.path());
        let config = RenderConfig::default();

        let err = backend.draw(&sample_plot(&config), &config).unwrap_err();
        match err {
            RenderError::Converter { stderr, .. } => assert_eq!(stderr, "boom"),
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(leftovers(root.path()), 0);
    }

    #[test]
    fn test_scratch_removed_when_output_missing() {
        let root = TempDir::new().unwrap();
        let backend = RasterBackend::new("sh", sh("true")).with_scratch_root(root.path());
        let config = RenderConfig::default();

        assert!(matches!(
            backend.draw(&sample_plot(&config), &config).unwrap_err(),
            RenderError::Io(_)
        ));
        assert_eq!(leftovers(root.path()), 0);
    }

    #[test]
    fn test_missing_program_is_io_error() {
        let root = TempDir::new().unwrap();
        let backend = RasterBackend::new("definitely-not-a-real-converter-xyz", vec![]).with_scratch_root(root.path());
        let config = RenderConfig::default();

        assert!(matches!(
            backend.draw(&sample_plot(&config), &config).unwrap_err(),
            RenderError::Io(_)
        ));
        assert_eq!(leftovers(root.path()), 0);
    }

    #[test]
    fn test_command_line_parsing() {
        let backend = RasterBackend::from_command_line("rsvg-convert -f png -o {output} {input}").unwrap();
        assert_eq!(backend.program(), "rsvg-convert");
        assert_eq!(
            backend.expand_args(Path::new("/t/in.svg"), Path::new("/t/out.png")),
            vec!["-f", "png", "-o", "/t/out.png", "/t/in.svg"]
        );
        assert!(RasterBackend::from_command_line("   ").is_none());
    }
}
