//! SVG backend - draws a ForcePlot as a standalone SVG document

use std::fmt::Write;

use super::force_plot::{Direction, ForcePlot, ForceSegment};
use super::{RenderBackend, RenderConfig, RenderError};

const POSITIVE_COLOR: &str = "#ff0d57";
const NEGATIVE_COLOR: &str = "#1e88e5";
const AXIS_COLOR: &str = "#888888";

/// Arrow notch depth in pixels
const NOTCH_PX: f64 = 6.0;
const BAR_HEIGHT_PX: f64 = 28.0;

#[derive(Debug, Clone, Default)]
pub struct SvgBackend;

impl SvgBackend {
    pub fn new() -> Self {
        Self
    }
}

impl RenderBackend for SvgBackend {
    fn name(&self) -> &str {
        "svg"
    }

    fn media_type(&self) -> &str {
        "image/svg+xml"
    }

    fn draw(&self, plot: &ForcePlot, config: &RenderConfig) -> Result<Vec<u8>, RenderError> {
        Ok(to_svg(plot, config)?.into_bytes())
    }
}

/// Build the SVG text
pub fn to_svg(plot: &ForcePlot, config: &RenderConfig) -> Result<String, RenderError> {
    let width = config.width as f64;
    let height = config.height as f64;
    let title_y = config.font_size * 2.0;
    let axis_y = title_y + config.font_size * 2.5;
    let bar_top = axis_y + config.font_size * 2.5;
    let label_y = bar_top + BAR_HEIGHT_PX + config.font_size * 1.5;

    let mut out = String::with_capacity(8 * 1024);
    writeln!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" font-family="{font}" font-size="{fs}">"#,
        w = config.width,
        h = config.height,
        font = escape(&config.font_family),
        fs = config.font_size,
    )?;
    writeln!(out, r#"<rect width="{}" height="{}" fill="white"/>"#, width, height)?;

    if let Some(title) = &config.title {
        writeln!(
            out,
            r#"<text x="{}" y="{:.1}" text-anchor="middle" font-size="{}" font-weight="bold">{}</text>"#,
            width / 2.0,
            title_y,
            config.font_size * 1.2,
            escape(title)
        )?;
    }

    // Legend
    writeln!(
        out,
        r#"<text x="{:.1}" y="{:.1}" fill="{}" text-anchor="end">higher &#8594;</text>"#,
        width / 2.0 - 10.0,
        title_y + config.font_size * 1.2,
        POSITIVE_COLOR
    )?;
    writeln!(
        out,
        r#"<text x="{:.1}" y="{:.1}" fill="{}">&#8592; lower</text>"#,
        width / 2.0 + 10.0,
        title_y + config.font_size * 1.2,
        NEGATIVE_COLOR
    )?;

    // Axis
    writeln!(
        out,
        r#"<line x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="{}"/>"#,
        config.margin,
        axis_y,
        width - config.margin,
        axis_y,
        AXIS_COLOR
    )?;
    for tick in ticks(plot.x_min, plot.x_max, 6) {
        let x = plot.to_px(tick, config);
        writeln!(
            out,
            r#"<line x1="{x:.1}" y1="{:.1}" x2="{x:.1}" y2="{:.1}" stroke="{}"/><text x="{x:.1}" y="{:.1}" text-anchor="middle" fill="{}">{}</text>"#,
            axis_y - 3.0,
            axis_y + 3.0,
            AXIS_COLOR,
            axis_y - 6.0,
            AXIS_COLOR,
            format_number(tick, config.decimals),
            x = x,
        )?;
    }

    for segment in plot.segments() {
        write_segment(&mut out, plot, segment, config, bar_top)?;
    }

    // Base value and f(x) markers
    let base_x = plot.to_px(plot.baseline, config);
    writeln!(
        out,
        r#"<line x1="{x:.1}" y1="{:.1}" x2="{x:.1}" y2="{:.1}" stroke="{}" stroke-dasharray="3,3"/><text x="{x:.1}" y="{:.1}" text-anchor="middle" fill="{}">base value {}</text>"#,
        axis_y,
        bar_top + BAR_HEIGHT_PX,
        AXIS_COLOR,
        axis_y + config.font_size * 1.4,
        AXIS_COLOR,
        format_number(plot.baseline, config.decimals),
        x = base_x,
    )?;
    let out_x = plot.to_px(plot.output, config);
    writeln!(
        out,
        r#"<text x="{:.1}" y="{:.1}" text-anchor="middle" font-weight="bold">f(x) = {}</text>"#,
        out_x,
        bar_top - 4.0,
        format_number(plot.output, config.decimals)
    )?;

    for segment in plot.segments().filter(|s| s.show_label) {
        write_label(&mut out, plot, segment, config, label_y)?;
    }

    writeln!(out, "</svg>")?;
    Ok(out)
}

fn write_segment(
    out: &mut String,
    plot: &ForcePlot,
    segment: &ForceSegment,
    config: &RenderConfig,
    top: f64,
) -> Result<(), RenderError> {
    let x0 = plot.to_px(segment.start, config);
    let x1 = plot.to_px(segment.end, config);
    let mid = top + BAR_HEIGHT_PX / 2.0;
    let bottom = top + BAR_HEIGHT_PX;
    let notch = NOTCH_PX.min((x1 - x0) / 2.0);

    // Chevron pointing towards f(x): red points right, blue points left
    let (points, color) = match segment.direction {
        Direction::Positive => (
            format!(
                "{:.2},{top:.1} {:.2},{top:.1} {:.2},{mid:.1} {:.2},{bottom:.1} {:.2},{bottom:.1} {:.2},{mid:.1}",
                x0,
                x1 - notch,
                x1,
                x1 - notch,
                x0,
                x0 + notch,
                top = top,
                mid = mid,
                bottom = bottom,
            ),
            POSITIVE_COLOR,
        ),
        Direction::Negative => (
            format!(
                "{:.2},{top:.1} {:.2},{top:.1} {:.2},{mid:.1} {:.2},{bottom:.1} {:.2},{bottom:.1} {:.2},{mid:.1}",
                x0 + notch,
                x1,
                x1 - notch,
                x1,
                x0 + notch,
                x0,
                top = top,
                mid = mid,
                bottom = bottom,
            ),
            NEGATIVE_COLOR,
        ),
    };
    writeln!(
        out,
        r#"<polygon points="{}" fill="{}" stroke="white" stroke-width="1"><title>{} ({:+.4})</title></polygon>"#,
        points,
        color,
        escape(&segment.label),
        segment.attribution
    )?;
    Ok(())
}

fn write_label(
    out: &mut String,
    plot: &ForcePlot,
    segment: &ForceSegment,
    config: &RenderConfig,
    y: f64,
) -> Result<(), RenderError> {
    let x = plot.to_px(segment.center(), config);
    let color = match segment.direction {
        Direction::Positive => POSITIVE_COLOR,
        Direction::Negative => NEGATIVE_COLOR,
    };
    if plot.label_rotation == 0.0 {
        writeln!(
            out,
            r#"<text x="{:.1}" y="{:.1}" text-anchor="middle" fill="{}">{}</text>"#,
            x,
            y,
            color,
            escape(&segment.label)
        )?;
    } else {
        writeln!(
            out,
            r#"<text x="{x:.1}" y="{y:.1}" text-anchor="end" fill="{}" transform="rotate(-{r} {x:.1} {y:.1})">{}</text>"#,
            color,
            escape(&segment.label),
            x = x,
            y = y,
            r = plot.label_rotation,
        )?;
    }
    Ok(())
}

/// Evenly spaced tick values on a 1/2/5 grid
fn ticks(min: f64, max: f64, target: usize) -> Vec<f64> {
    let span = max - min;
    if span <= 0.0 || !span.is_finite() {
        return vec![min];
    }
    let raw_step = span / target.max(1) as f64;
    let magnitude = 10f64.powf(raw_step.log10().floor());
    let step = [1.0, 2.0, 5.0, 10.0]
        .iter()
        .map(|m| m * magnitude)
        .find(|s| *s >= raw_step)
        .unwrap_or(10.0 * magnitude);

    let mut out = Vec::new();
    let mut t = (min / step).ceil() * step;
    while t <= max + step * 1e-9 {
        out.push(if t.abs() < step * 1e-9 { 0.0 } else { t });
        t += step;
    }
    out
}

fn format_number(v: f64, decimals: usize) -> String {
    format!("{:.*}", decimals, v)
}

/// Escape text for XML/HTML content and attribute values
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

// ============================================================================
// TESTS
// ============================================================================
