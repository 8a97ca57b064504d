//! Domain model for the extraction pipeline
//!
//! # Components
//!
//! - `RunStatus`, `PipelineStep`, `EntityState`: progress tracking for runs and entities
//! - `LeaderRecord`, `AssetRecord`: normalized extraction output

mod records;
mod status;

pub use records::{bounded_coordinate, AssetRecord, AssetStatus, ExtractedRecord, LeaderRecord};
pub use status::{EntityState, PipelineStep, RunStatus};

use std::collections::HashSet;

/// Normalizes a company name for identity comparisons
///
/// Trims, lower-cases and collapses inner whitespace, so "  BHP  Group" and
/// "bhp group" name the same entity.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Splits raw comma-separated input into trimmed, non-empty names
///
/// Names that normalize to one already seen are dropped, keeping the first
/// spelling, so each company is processed once per run.
pub fn parse_entity_names(input: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    input
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .filter(|name| seen.insert(normalize_name(name)))
        .map(String::from)
        .collect()
}
