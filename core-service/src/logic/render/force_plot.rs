//! Force Plot Layout
//!
//! Backend-agnostic geometry: where each feature's arrow starts and ends,
//! which ones get a label, and whether labels need rotating.
//!
//! Positive effects stack leftwards from f(x), negative ones rightwards, the
//! strongest of each next to f(x). The left edge of the red run and the right
//! edge of the blue run then bracket the base value.

use serde::{Deserialize, Serialize};

use super::{RenderConfig, RenderError};
use crate::logic::explain::Explanation;

/// Gap kept between neighbouring labels, in pixels
const LABEL_GAP_PX: f64 = 6.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Pushes the prediction higher (drawn red)
    Positive,
    /// Pushes the prediction lower (drawn blue)
    Negative,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForceSegment {
    pub feature_index: usize,
    /// `X{i}=value`
    pub label: String,
    pub attribution: f64,
    /// Data coordinates, `start < end`
    pub start: f64,
    pub end: f64,
    pub direction: Direction,
    /// Too narrow segments are drawn without text
    pub show_label: bool,
}

impl ForceSegment {
    pub fn width(&self) -> f64 {
        self.end - self.start
    }

    pub fn center(&self) -> f64 {
        (self.start + self.end) / 2.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForcePlot {
    pub baseline: f64,
    /// baseline + Σ attributions
    pub output: f64,
    /// Strongest first (nearest `output`)
    pub positive: Vec<ForceSegment>,
    /// Strongest first (nearest `output`)
    pub negative: Vec<ForceSegment>,
    /// Degrees; 0 means horizontal labels
    pub label_rotation: f64,
    /// Visible data range
    pub x_min: f64,
    pub x_max: f64,
}

impl ForcePlot {
    pub fn build(explanation: &Explanation, labels: &[String], config: &RenderConfig) -> Result<Self, RenderError> {
        if labels.len() != explanation.attributions.len() {
            return Err(RenderError::LabelMismatch {
                labels: labels.len(),
                attributions: explanation.attributions.len(),
            });
        }
        if !explanation.baseline.is_finite() || explanation.attributions.iter().any(|a| !a.is_finite()) {
            return Err(RenderError::NonFinite);
        }

        let baseline = explanation.baseline;
        let output = baseline + explanation.attributions.iter().sum::<f64>();

        let mut pos: Vec<(usize, f64)> = Vec::new();
        let mut neg: Vec<(usize, f64)> = Vec::new();
        for (i, &a) in explanation.attributions.iter().enumerate() {
            if a > 0.0 {
                pos.push((i, a));
            } else if a < 0.0 {
                neg.push((i, a));
            }
        }
        // strongest first, ties in schema order
        pos.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal).then(a.0.cmp(&b.0)));
        neg.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal).then(a.0.cmp(&b.0)));

        let total_effect: f64 = explanation.attributions.iter().map(|a| a.abs()).sum();
        let label_floor = config.min_label_fraction * total_effect;

        let mut cursor = output;
        let positive: Vec<ForceSegment> = pos
            .into_iter()
            .map(|(i, a)| {
                let seg = ForceSegment {
                    feature_index: i,
                    label: labels[i].clone(),
                    attribution: a,
                    start: cursor - a,
                    end: cursor,
                    direction: Direction::Positive,
                    show_label: a >= label_floor,
                };
                cursor -= a;
                seg
            })
            .collect();

        let mut cursor = output;
        let negative: Vec<ForceSegment> = neg
            .into_iter()
            .map(|(i, a)| {
                let seg = ForceSegment {
                    feature_index: i,
                    label: labels[i].clone(),
                    attribution: a,
                    start: cursor,
                    end: cursor - a,
                    direction: Direction::Negative,
                    show_label: -a >= label_floor,
                };
                cursor -= a;
                seg
            })
            .collect();

        let left = positive.last().map(|s| s.start).unwrap_or(output).min(baseline);
        let right = negative.last().map(|s| s.end).unwrap_or(output).max(baseline);
        let pad = ((right - left) * 0.05).max(1e-3);

        let mut plot = ForcePlot {
            baseline,
            output,
            positive,
            negative,
            label_rotation: 0.0,
            x_min: left - pad,
            x_max: right + pad,
        };
        plot.label_rotation = match config.text_rotation {
            Some(r) => r,
            None if plot.labels_overlap(config) => config.auto_rotation,
            None => 0.0,
        };
        Ok(plot)
    }

    /// Positive segments, then negative, each strongest first
    pub fn segments(&self) -> impl Iterator<Item = &ForceSegment> {
        self.positive.iter().chain(self.negative.iter())
    }

    /// Σ |attribution|
    pub fn total_effect(&self) -> f64 {
        self.segments().map(|s| s.width()).sum()
    }

    /// Map a data coordinate to a pixel column
    pub fn to_px(&self, x: f64, config: &RenderConfig) -> f64 {
        let inner = config.width as f64 - 2.0 * config.margin;
        let span = (self.x_max - self.x_min).max(f64::EPSILON);
        config.margin + (x - self.x_min) / span * inner
    }

    /// Estimated text width in pixels
    pub fn label_width_px(label: &str, config: &RenderConfig) -> f64 {
        label
            .chars()
            .map(|c| if c.is_ascii() { 0.6 } else { 1.0 })
            .sum::<f64>()
            * config.font_size
    }

    /// Whether horizontal labels would collide anywhere along the axis
    pub fn labels_overlap(&self, config: &RenderConfig) -> bool {
        let mut spans: Vec<(f64, f64)> = self
            .segments()
            .filter(|s| s.show_label)
            .map(|s| {
                let c = self.to_px(s.center(), config);
                let half = Self::label_width_px(&s.label, config) / 2.0;
                (c - half, c + half)
            })
            .collect();
        spans.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        spans.windows(2).any(|w| w[0].1 + LABEL_GAP_PX > w[1].0)
    }
}

// ============================================================================
// TESTS
// ============================================================================
