//! Birth Trauma Core - schema, prediction, attribution and force plot
//!
//! Tầng logic dùng chung cho dashboard: không phụ thuộc HTTP hay UI.

pub mod constants;
pub mod logic;

pub use logic::config::{PipelineConfig, RenderConfig, RenderMode};
pub use logic::pipeline::{Assessment, DegradedStage, Pipeline, Stage};
