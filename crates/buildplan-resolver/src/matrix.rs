//! Matrix expansion.

use buildplan_config::SubstitutionContextBuilder;
use buildplan_core::requirement::Requirement;
use buildplan_core::template::{ArtifactRule, BuildStep, Parameter};
use buildplan_core::variant::{AxisValue, Combinations, ResolvedVariant, run_id};
use buildplan_core::Result;
use std::collections::HashMap;

use crate::merge::MergedVariant;

/// Expands a merged variant into one resolved run per matrix combination.
pub struct MatrixExpander<'a> {
    variant: &'a MergedVariant,
    env: &'a HashMap<String, String>,
}

impl<'a> MatrixExpander<'a> {
    pub fn new(variant: &'a MergedVariant, env: &'a HashMap<String, String>) -> Self {
        Self { variant, env }
    }

    /// Number of runs the expansion yields.
    pub fn len(&self) -> usize {
        self.variant.matrix.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lazily resolve each combination, in declared axis and value order.
    ///
    /// Each call starts a fresh, identical sequence.
    pub fn iter(&self) -> Expansion<'a> {
        Expansion {
            variant: self.variant,
            env: self.env,
            combinations: self.variant.matrix.combinations(),
        }
    }

    /// Resolve one combination of axis values.
    pub fn resolve(&self, combination: &[AxisValue]) -> Result<ResolvedVariant> {
        resolve_combination(self.variant, self.env, combination)
    }
}

impl<'a> IntoIterator for &MatrixExpander<'a> {
    type Item = Result<ResolvedVariant>;
    type IntoIter = Expansion<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Lazy sequence of resolved runs.
pub struct Expansion<'a> {
    variant: &'a MergedVariant,
    env: &'a HashMap<String, String>,
    combinations: Combinations<'a>,
}

impl Iterator for Expansion<'_> {
    type Item = Result<ResolvedVariant>;

    fn next(&mut self) -> Option<Self::Item> {
        let combination = self.combinations.next()?;
        Some(resolve_combination(self.variant, self.env, &combination))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.combinations.size_hint()
    }
}

impl ExactSizeIterator for Expansion<'_> {}

fn resolve_combination(
    variant: &MergedVariant,
    env: &HashMap<String, String>,
    combination: &[AxisValue],
) -> Result<ResolvedVariant> {
    let mut ctx = SubstitutionContextBuilder::new().with_envs(env).build();
    ctx.set_axes(combination);
    for param in &variant.params {
        ctx.set_param(&param.name, param.value.clone());
    }
    let mut sub = ctx.substituter();

    // Axis values override parameters of the same name and are exposed as
    // parameters themselves.
    let mut params = Vec::with_capacity(variant.params.len() + combination.len());
    for param in &variant.params {
        params.push(Parameter::new(param.name.clone(), sub.resolve(&param.name)?));
    }
    for av in combination {
        if !params.iter().any(|p| p.name == av.axis) {
            params.push(Parameter::new(av.axis.clone(), av.value.clone()));
        }
    }

    let steps = variant
        .steps
        .iter()
        .map(|step| -> Result<BuildStep> {
            Ok(BuildStep {
                name: sub.substitute(&step.name)?,
                runner: step.runner.try_map_strings(|s| sub.substitute(s))?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let artifact_rules = variant
        .artifact_rules
        .iter()
        .map(|rule| -> Result<ArtifactRule> {
            Ok(ArtifactRule {
                include: rule.include,
                source: sub.substitute(&rule.source)?,
                target: sub.substitute_opt(&rule.target)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let requirements = variant
        .requirements
        .iter()
        .map(|req| -> Result<Requirement> {
            let requirement = Requirement {
                key: sub.substitute(&req.key)?,
                operator: req.operator,
                value: sub.substitute_opt(&req.value)?,
            };
            // Patterns may only become well-formed after substitution.
            requirement.check()?;
            Ok(requirement)
        })
        .collect::<Result<Vec<_>>>()?;

    ResolvedVariant {
        id: run_id(&variant.id, combination),
        variant: variant.id.clone(),
        template: variant.template.clone(),
        name: sub.substitute(&variant.name)?,
        description: sub.substitute(&variant.description)?,
        axis_values: combination.to_vec(),
        vcs_root: variant.vcs_root.clone(),
        params,
        steps,
        triggers: variant.triggers.clone(),
        artifact_rules,
        requirements,
        fingerprint: String::new(),
    }
    .sealed()
}
