//! Template merging.

use buildplan_core::requirement::Requirement;
use buildplan_core::template::{ArtifactRule, BuildStep, Parameter};
use buildplan_core::trigger::Trigger;
use buildplan_core::variant::{BuildVariant, Matrix};
use buildplan_core::vcs::VcsRoot;
use buildplan_core::{EntityId, Error, Project, Result};
use tracing::debug;

/// A variant with its template folded in, before placeholder substitution.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedVariant {
    pub id: EntityId,
    pub template: Option<EntityId>,
    pub name: String,
    pub description: String,
    pub vcs_root: VcsRoot,
    pub params: Vec<Parameter>,
    pub steps: Vec<BuildStep>,
    pub triggers: Vec<Trigger>,
    pub artifact_rules: Vec<ArtifactRule>,
    pub requirements: Vec<Requirement>,
    pub matrix: Matrix,
}

/// Merges templates into the variants of one project.
pub struct TemplateResolver<'p> {
    project: &'p Project,
}

impl<'p> TemplateResolver<'p> {
    pub fn new(project: &'p Project) -> Self {
        Self { project }
    }

    /// Merge a variant with its template and bind its VCS root.
    pub fn merge(&self, variant: &BuildVariant) -> Result<MergedVariant> {
        let vcs_root = self
            .project
            .vcs_root(variant.vcs_root.as_str())
            .ok_or_else(|| {
                Error::configuration(format!(
                    "variant '{}' references unknown VCS root '{}'",
                    variant.id, variant.vcs_root
                ))
            })?;

        let template = match &variant.template {
            Some(id) => Some(self.project.template(id.as_str()).ok_or_else(|| {
                Error::configuration(format!(
                    "variant '{}' references unknown template '{}'",
                    variant.id, id
                ))
            })?),
            None => None,
        };

        debug!(
            variant = %variant.id,
            template = ?variant.template.as_ref().map(|t| t.as_str()),
            "merging variant"
        );

        let (params, steps, triggers, artifact_rules) = match template {
            Some(t) => (
                merge_params(&t.params, &variant.params),
                merge_steps(&t.steps, &variant.steps),
                t.triggers.iter().chain(&variant.triggers).cloned().collect(),
                merge_artifact_rules(&t.artifact_rules, &variant.artifact_rules),
            ),
            None => (
                variant.params.clone(),
                variant.steps.clone(),
                variant.triggers.clone(),
                variant.artifact_rules.clone(),
            ),
        };

        Ok(MergedVariant {
            id: variant.id.clone(),
            template: variant.template.clone(),
            name: variant.name.clone(),
            description: match (variant.description.is_empty(), template) {
                (true, Some(t)) => t.description.clone(),
                _ => variant.description.clone(),
            },
            vcs_root: vcs_root.clone(),
            params,
            steps,
            triggers,
            artifact_rules,
            requirements: variant.requirements.clone(),
            matrix: variant.matrix.clone(),
        })
    }
}

/// Apply `overrides` key-wise to `defaults`.
///
/// Overridden keys keep the default's position; new keys are appended in
/// override order.
pub fn merge_params(defaults: &[Parameter], overrides: &[Parameter]) -> Vec<Parameter> {
    let mut merged = defaults.to_vec();
    for param in overrides {
        match merged.iter_mut().find(|p| p.name == param.name) {
            Some(existing) => existing.value = param.value.clone(),
            None => merged.push(param.clone()),
        }
    }
    merged
}

/// Variant steps replace same-named template steps in place; the rest are
/// appended.
pub fn merge_steps(template: &[BuildStep], variant: &[BuildStep]) -> Vec<BuildStep> {
    let mut merged = template.to_vec();
    for step in variant {
        match merged.iter_mut().find(|s| s.name == step.name) {
            Some(existing) => *existing = step.clone(),
            None => merged.push(step.clone()),
        }
    }
    merged
}

/// Variant rules replace template rules with the same source; the rest are
/// appended.
pub fn merge_artifact_rules(template: &[ArtifactRule], variant: &[ArtifactRule]) -> Vec<ArtifactRule> {
    let mut merged = template.to_vec();
    for rule in variant {
        match merged.iter_mut().find(|r| r.source == rule.source) {
            Some(existing) => *existing = rule.clone(),
            None => merged.push(rule.clone()),
        }
    }
    merged
}
