//! Logic Module - Business Logic & Engines
//!
//! Luồng xử lý: features → model → explain → render, ghép lại trong `pipeline`.
//!
//! - `features/` - 32-variable schema, normalization, FeatureVector
//! - `model/` - artifact loading and inference (tree ensemble, linear)
//! - `explain/` - TreeSHAP attributions
//! - `render/` - force plot layout and backends (SVG, raster)

pub mod config;
pub mod pipeline;

// Stage modules
pub mod explain;
pub mod features;
pub mod model;
pub mod render;

#[cfg(test)]
pub(crate) mod testutil;
