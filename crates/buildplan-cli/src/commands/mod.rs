//! CLI command implementations.

pub mod agent;
pub mod resolve;
pub mod schedule;

use anyhow::{Context, Result};
use buildplan_config::load_project;
use buildplan_core::Project;
use buildplan_resolver::ProjectResolver;
use clap::ValueEnum;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Variables visible to `${env.*}` placeholders.
pub fn environment(clean: bool, overrides: &[(String, String)]) -> HashMap<String, String> {
    let mut env: HashMap<String, String> = if clean {
        HashMap::new()
    } else {
        std::env::vars().collect()
    };
    env.extend(overrides.iter().cloned());
    env
}

pub fn load(path: &Path) -> Result<Project> {
    let project = load_project(path)
        .with_context(|| format!("Failed to load configuration: {}", path.display()))?;
    debug!(
        path = %path.display(),
        variants = project.variants().len(),
        "loaded project"
    );
    Ok(project)
}

pub fn validate(path: &Path, env: HashMap<String, String>) -> Result<()> {
    let project = load(path)?;
    let resolutions = ProjectResolver::new(&project, env).resolve_each();

    let mut failed = 0;
    for resolution in &resolutions {
        match &resolution.result {
            Ok(runs) => println!("✓ {} ({} runs)", resolution.variant, runs.len()),
            Err(e) => {
                failed += 1;
                println!("✗ {}: {}", resolution.variant, e);
            }
        }
    }

    if failed > 0 {
        anyhow::bail!(
            "{} of {} variants failed to resolve",
            failed,
            resolutions.len()
        );
    }
    println!("Configuration is valid");
    Ok(())
}

pub fn list(path: &Path) -> Result<()> {
    let project = load(path)?;

    if let Some(version) = &project.version {
        println!("Project version {}", version);
    }

    println!("VCS roots:");
    for root in project.vcs_roots() {
        println!(
            "  {} - {} ({}, {}, checkout {})",
            root.id, root.name, root.url, root.branch, root.checkout_mode
        );
    }

    println!("Templates:");
    for template in project.templates() {
        println!(
            "  {} - {} ({} params, {} steps)",
            template.id,
            template.name,
            template.params.len(),
            template.steps.len()
        );
    }

    println!("Variants:");
    for variant in project.variants() {
        let template = variant
            .template
            .as_ref()
            .map(|t| format!(" from {}", t))
            .unwrap_or_default();
        println!(
            "  {} - {}{} ({} runs)",
            variant.id,
            variant.name,
            template,
            variant.matrix.len()
        );
    }

    Ok(())
}
