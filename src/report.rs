//! Run and entity reports for the command line
//!
//! This module turns what the storage layer knows about runs and entities
//! into plain-text summaries on stdout.

use crate::model::{EntityState, PipelineStep, RunStatus};
use crate::storage::{EntityDetail, EntitySummary, RunDetail, Storage};
use crate::Result;
use std::collections::HashMap;

/// Progress summary for one run
#[derive(Debug, Clone)]
pub struct RunStatistics {
    pub run_id: i64,
    pub status: RunStatus,
    pub error_summary: Option<String>,
    pub created_at: String,
    pub completed_at: Option<String>,

    /// Total number of companies in the run
    pub total: u64,

    /// Count of companies by coarse state
    pub by_state: HashMap<EntityState, u64>,

    /// Companies that failed, with the recorded message
    pub failures: Vec<(String, String)>,

    /// Stored entity ids of completed companies, in input order
    pub stored: Vec<(String, i64)>,

    /// Companies still short of a terminal step, with their current step
    pub in_flight: Vec<(String, PipelineStep)>,
}

/// Summarizes a run from its stored detail
pub fn run_statistics(detail: &RunDetail) -> RunStatistics {
    let mut by_state = HashMap::new();
    let mut failures = Vec::new();
    let mut stored = Vec::new();
    let mut in_flight = Vec::new();

    for entity in &detail.entities {
        *by_state.entry(entity.status).or_insert(0) += 1;

        match entity.step {
            PipelineStep::Failed => failures.push((
                entity.entity_name.clone(),
                entity.error_message.clone().unwrap_or_default(),
            )),
            PipelineStep::Complete => {
                if let Some(id) = entity.entity_id {
                    stored.push((entity.entity_name.clone(), id));
                }
            }
            step => in_flight.push((entity.entity_name.clone(), step)),
        }
    }

    RunStatistics {
        run_id: detail.run.id,
        status: detail.run.status,
        error_summary: detail.run.error_summary.clone(),
        created_at: detail.run.created_at.clone(),
        completed_at: detail.run.completed_at.clone(),
        total: detail.entities.len() as u64,
        by_state,
        failures,
        stored,
        in_flight,
    }
}

/// Loads a run from storage and summarizes it
pub fn load_run_statistics(storage: &dyn Storage, run_id: i64) -> Result<RunStatistics> {
    let detail = storage.get_run(run_id)?;
    Ok(run_statistics(&detail))
}

/// Prints a run summary to stdout
pub fn print_run_statistics(stats: &RunStatistics) {
    println!("=== Run {} ===\n", stats.run_id);

    println!("Overview:");
    println!("  Status: {}", stats.status);
    println!("  Started: {}", stats.created_at);
    if let Some(completed) = &stats.completed_at {
        println!("  Completed: {}", completed);
    }
    println!("  Companies: {}", stats.total);
    if let Some(summary) = &stats.error_summary {
        println!("  Errors: {}", summary);
    }
    println!();

    println!("Companies by State:");
    let mut state_counts: Vec<_> = stats.by_state.iter().collect();
    state_counts.sort_by(|a, b| b.1.cmp(a.1));

    for (state, count) in state_counts {
        let percentage = if stats.total > 0 {
            (*count as f64 / stats.total as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", state, count, percentage);
    }
    println!();

    if !stats.stored.is_empty() {
        println!("Stored ({}):", stats.stored.len());
        for (name, id) in &stats.stored {
            println!("  - {} (entity {})", name, id);
        }
        println!();
    }

    if !stats.failures.is_empty() {
        println!("Failed ({}):", stats.failures.len());
        for (name, message) in &stats.failures {
            println!("  - {}: {}", name, message);
        }
        println!();
    }

    if !stats.in_flight.is_empty() {
        println!("In Progress ({}):", stats.in_flight.len());
        for (name, step) in &stats.in_flight {
            println!("  - {} ({})", name, step);
        }
        println!();
    }
}

/// Prints one entity with its leaders and assets
pub fn print_entity_detail(detail: &EntityDetail) {
    let entity = &detail.entity;
    println!("=== {} (entity {}) ===\n", entity.name, entity.id);

    if let Some(url) = &entity.website_url {
        println!("Website: {}", url);
    }
    println!("Updated: {}\n", entity.updated_at);

    println!("Leaders ({}):", detail.leaders.len());
    for stored in &detail.leaders {
        let leader = &stored.leader;
        match &leader.title {
            Some(title) => println!("  - {}, {}", leader.name, title),
            None => println!("  - {}", leader.name),
        }
        if !leader.expertise_tags.is_empty() {
            println!("    Expertise: {}", leader.expertise_tags.join(", "));
        }
    }
    println!();

    println!("Assets ({}):", detail.assets.len());
    for stored in &detail.assets {
        let asset = &stored.asset;
        let location: Vec<&str> = [&asset.town, &asset.state_province, &asset.country]
            .into_iter()
            .filter_map(|part| part.as_deref())
            .collect();

        println!("  - {} [{}]", asset.name, asset.status);
        if !asset.commodities.is_empty() {
            println!("    Commodities: {}", asset.commodities.join(", "));
        }
        if !location.is_empty() {
            println!("    Location: {}", location.join(", "));
        }
        if let (Some(lat), Some(lon)) = (asset.latitude, asset.longitude) {
            println!("    Coordinates: {:.4}, {:.4}", lat, lon);
        }
    }
}

/// Prints every stored entity with child counts
pub fn print_entity_list(entities: &[EntitySummary]) {
    println!("=== Entities ({}) ===\n", entities.len());

    for entity in entities {
        println!(
            "  [{}] {} - {} leader(s), {} asset(s){}",
            entity.id,
            entity.name,
            entity.leader_count,
            entity.asset_count,
            entity
                .website_url
                .as_ref()
                .map(|url| format!(" ({})", url))
                .unwrap_or_default()
        );
    }
}
