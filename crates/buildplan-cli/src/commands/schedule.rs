//! Schedule command.

use anyhow::{Context, Result};
use buildplan_core::trigger::{ScheduleTrigger, Trigger};
use buildplan_resolver::TemplateResolver;
use chrono::{DateTime, Utc};
use std::path::Path;

use super::load;

pub fn show(path: &Path, variant: &str, after: DateTime<Utc>, count: usize) -> Result<()> {
    let project = load(path)?;
    let definition = project.require_variant(variant)?;
    let merged = TemplateResolver::new(&project)
        .merge(definition)
        .with_context(|| format!("Failed to merge variant {}", variant))?;

    let schedules: Vec<&ScheduleTrigger> = merged
        .triggers
        .iter()
        .filter_map(|t| match t {
            Trigger::Schedule(schedule) => Some(schedule),
            Trigger::Vcs { .. } => None,
        })
        .collect();

    if schedules.is_empty() {
        println!("{} has no scheduled triggers", variant);
        return Ok(());
    }

    for schedule in schedules {
        println!("{} ({})", schedule, schedule.branch_filter.to_string().replace('\n', " "));
        for at in upcoming(schedule, after, count) {
            println!("  {}", at.to_rfc3339());
        }
    }
    Ok(())
}

fn upcoming(schedule: &ScheduleTrigger, after: DateTime<Utc>, count: usize) -> Vec<DateTime<Utc>> {
    std::iter::successors(schedule.next_after(after), |prev| schedule.next_after(*prev))
        .take(count)
        .collect()
}
