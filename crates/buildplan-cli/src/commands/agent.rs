//! Agent compatibility command.

use anyhow::{Context, Result};
use buildplan_config::load_agents;
use buildplan_core::requirement::AgentCapabilities;
use buildplan_resolver::{ProjectResolver, RequirementValidator, Verdict};
use serde_json::json;
use std::collections::HashMap;
use std::path::Path;

use super::{OutputFormat, load};

/// Check every run of a variant against the given agents.
///
/// Fails if no run is compatible with any agent.
pub fn check(
    path: &Path,
    env: HashMap<String, String>,
    variant: &str,
    capabilities: Vec<(String, String)>,
    agents_file: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    let project = load(path)?;
    let runs = ProjectResolver::new(&project, env)
        .resolve_id(variant)
        .with_context(|| format!("Failed to resolve variant {}", variant))?;

    let mut agents = match agents_file {
        Some(file) => load_agents(file)
            .with_context(|| format!("Failed to load agents: {}", file.display()))?,
        None => Vec::new(),
    };
    if !capabilities.is_empty() {
        let mut agent = AgentCapabilities::new("command-line");
        for (key, value) in capabilities {
            agent.set(key, value);
        }
        agents.push(agent);
    }
    if agents.is_empty() {
        anyhow::bail!("No agents given; pass --capability KEY=VALUE or --agents FILE");
    }

    let mut report = Vec::new();
    let mut any_pass = false;
    for run in &runs {
        let validator = RequirementValidator::for_run(run)
            .with_context(|| format!("Invalid requirements in {}", run.id))?;
        for agent in &agents {
            let verdict = validator.validate(agent)?;
            any_pass |= verdict.is_pass();
            match format {
                OutputFormat::Json => report.push(json!({
                    "run": run.id,
                    "agent": agent.name,
                    "result": verdict,
                })),
                OutputFormat::Text => {
                    println!("{}", describe(run.id.as_str(), &agent.name, &verdict));
                }
            }
        }
    }

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    if !any_pass {
        anyhow::bail!("No run of {} is compatible with the given agents", variant);
    }
    Ok(())
}

fn describe(run: &str, agent: &str, verdict: &Verdict) -> String {
    match verdict {
        Verdict::Pass => format!("✓ {} can run on {}", run, agent),
        Verdict::Fail {
            requirement,
            actual,
        } => format!(
            "✗ {} cannot run on {}: requires {} (agent has {})",
            run,
            agent,
            requirement,
            actual.as_deref().unwrap_or("nothing")
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use buildplan_core::requirement::Requirement;

    #[test]
    fn test_describe_failure() {
        let verdict = Verdict::Fail {
            requirement: Requirement::contains("os.name", "Linux"),
            actual: Some("Windows".to_string()),
        };
        assert_eq!(
            describe("JavaBuild_java_17", "win-1", &verdict),
            "✗ JavaBuild_java_17 cannot run on win-1: requires os.name contains \"Linux\" (agent has Windows)"
        );
    }

    #[test]
    fn test_describe_pass() {
        assert_eq!(
            describe("Javadoc", "linux-1", &Verdict::Pass),
            "✓ Javadoc can run on linux-1"
        );
    }
}
