//! Resolve command.

use anyhow::{Context, Result};
use buildplan_core::template::StepRunner;
use buildplan_core::trigger::Trigger;
use buildplan_core::variant::ResolvedVariant;
use buildplan_resolver::ProjectResolver;
use std::collections::HashMap;
use std::path::Path;

use super::{OutputFormat, load};

pub fn run(
    path: &Path,
    env: HashMap<String, String>,
    variant: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let project = load(path)?;
    let resolver = ProjectResolver::new(&project, env);

    let runs = match variant {
        Some(id) => resolver
            .resolve_id(id)
            .with_context(|| format!("Failed to resolve variant {}", id))?,
        None => resolver
            .resolve_all()
            .context("Failed to resolve project")?,
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&runs)?),
        OutputFormat::Text => {
            for run in &runs {
                print!("{}", render(run));
            }
        }
    }
    Ok(())
}

pub fn render(run: &ResolvedVariant) -> String {
    let mut out = format!("{}  {}\n", run.id, run.name);
    if !run.description.is_empty() {
        out.push_str(&format!("  {}\n", run.description));
    }
    out.push_str(&format!(
        "  vcs root:     {} ({} @ {})\n",
        run.vcs_root.id, run.vcs_root.url, run.vcs_root.branch
    ));
    if let Some(template) = &run.template {
        out.push_str(&format!("  template:     {}\n", template));
    }
    if !run.axis_values.is_empty() {
        let axes: Vec<String> = run
            .axis_values
            .iter()
            .map(|av| format!("{}={}", av.axis, av.value))
            .collect();
        out.push_str(&format!("  matrix:       {}\n", axes.join(", ")));
    }

    out.push_str("  params:\n");
    for param in &run.params {
        out.push_str(&format!("    {} = {}\n", param.name, param.value));
    }

    out.push_str("  steps:\n");
    for step in &run.steps {
        let detail = match &step.runner {
            StepRunner::Gradle {
                tasks,
                gradle_params,
                ..
            } => match gradle_params {
                Some(extra) => format!("{} {}", tasks, extra),
                None => tasks.clone(),
            },
            StepRunner::Script { content } => content.clone(),
        };
        out.push_str(&format!(
            "    [{}] {}: {}\n",
            step.runner.kind(),
            step.name,
            detail
        ));
    }

    if !run.triggers.is_empty() {
        out.push_str("  triggers:\n");
        for trigger in &run.triggers {
            let description = match trigger {
                Trigger::Vcs { .. } => "on VCS change".to_string(),
                Trigger::Schedule(schedule) => schedule.to_string(),
            };
            let filter = trigger.branch_filter().to_string().replace('\n', " ");
            out.push_str(&format!("    {} [{}]\n", description, filter));
        }
    }

    if !run.artifact_rules.is_empty() {
        out.push_str("  artifacts:\n");
        for rule in &run.artifact_rules {
            out.push_str(&format!("    {}\n", rule));
        }
    }

    if !run.requirements.is_empty() {
        out.push_str("  requirements:\n");
        for requirement in &run.requirements {
            out.push_str(&format!("    {}\n", requirement));
        }
    }

    out.push_str(&format!("  fingerprint:  {}\n\n", run.fingerprint));
    out
}
