//! Schema and glossary handlers

use axum::Json;
use birth_trauma_core::logic::features::{glossary as glossary_entries, layout_hash, schema as feature_schema, FeatureSpec, GlossaryEntry, SCHEMA_VERSION};
use serde::Serialize;

#[derive(Serialize)]
pub struct SchemaResponse {
    version: u8,
    layout_hash: u32,
    features: &'static [FeatureSpec],
}

/// The 32 input variables, in model order
pub async fn schema() -> Json<SchemaResponse> {
    Json(SchemaResponse {
        version: SCHEMA_VERSION,
        layout_hash: layout_hash(),
        features: feature_schema(),
    })
}

/// Code → Chinese name → English gloss
pub async fn glossary() -> Json<Vec<GlossaryEntry>> {
    Json(glossary_entries())
}
