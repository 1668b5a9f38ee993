//! Project configuration parsing.

use buildplan_core::requirement::{Requirement, RequirementOperator};
use buildplan_core::template::{
    ArtifactRule, BuildStep, Parameter, StepRunner, Template, parse_artifact_rules,
};
use buildplan_core::trigger::{ScheduleTrigger, Trigger};
use buildplan_core::variant::{BuildVariant, Matrix, MatrixAxis};
use buildplan_core::vcs::{BranchFilter, CheckoutMode, VcsRoot};
use buildplan_core::{EntityId, Project};
use chrono::Weekday;
use kdl::{KdlDocument, KdlNode};
use std::collections::HashSet;
use std::path::Path;
use url::Url;

use crate::nodes::{
    all_string_args, child_string, children, first_string_arg, reject_floats, string_arg_at,
    string_prop, u32_prop,
};
use crate::{ConfigError, ConfigResult};

/// Parse a project configuration from KDL text.
pub fn parse_project(kdl: &str) -> ConfigResult<Project> {
    let doc: KdlDocument = kdl.parse()?;
    reject_floats(&doc)?;
    let mut project = Project::new();

    for node in doc.nodes() {
        match node.name().value() {
            "project" => {
                project.version = string_prop(node, "version").or_else(|| first_string_arg(node));
            }
            "vcs-root" => {
                project.add_vcs_root(parse_vcs_root(node)?)?;
            }
            "template" => {
                project.add_template(parse_template(node)?)?;
            }
            "variant" | "build-type" => {
                project.add_variant(parse_variant(node)?)?;
            }
            _ => {} // Ignore unknown nodes
        }
    }

    Ok(project)
}

/// Read and parse a project configuration file.
pub fn load_project(path: impl AsRef<Path>) -> ConfigResult<Project> {
    let content = std::fs::read_to_string(path)?;
    parse_project(&content)
}

fn parse_id(node: &KdlNode, kind: &str) -> ConfigResult<EntityId> {
    let raw = first_string_arg(node)
        .ok_or_else(|| ConfigError::MissingField(format!("{} id", kind)))?;
    EntityId::new(raw).map_err(|e| ConfigError::invalid(format!("{} id", kind), e))
}

fn parse_vcs_root(node: &KdlNode) -> ConfigResult<VcsRoot> {
    let id = parse_id(node, "vcs-root")?;

    let raw_url = child_string(node, "url")
        .ok_or_else(|| ConfigError::MissingField(format!("url for vcs-root '{}'", id)))?;
    let url = Url::parse(&raw_url)
        .map_err(|e| ConfigError::invalid(format!("url of vcs-root '{}'", id), e))?;

    let branch_filter = match child_string(node, "branch-filter") {
        Some(raw) => raw
            .parse::<BranchFilter>()
            .map_err(|e| ConfigError::invalid(format!("branch-filter of vcs-root '{}'", id), e))?,
        None => BranchFilter::all(),
    };

    let checkout_mode = match child_string(node, "checkout-mode") {
        Some(raw) => raw
            .parse::<CheckoutMode>()
            .map_err(|e| ConfigError::invalid(format!("checkout-mode of vcs-root '{}'", id), e))?,
        None => CheckoutMode::default(),
    };

    Ok(VcsRoot {
        name: child_string(node, "name").unwrap_or_else(|| id.to_string()),
        branch: child_string(node, "branch").unwrap_or_else(|| "refs/heads/main".to_string()),
        id,
        url,
        branch_filter,
        checkout_mode,
    })
}

fn parse_template(node: &KdlNode) -> ConfigResult<Template> {
    let id = parse_id(node, "template")?;
    let owner = format!("template '{}'", id);

    let mut params = Vec::new();
    let mut steps = Vec::new();
    let mut triggers = Vec::new();
    let mut artifact_rules = Vec::new();

    for child in children(node) {
        match child.name().value() {
            "params" => parse_params(child, &owner, &mut params)?,
            "steps" => parse_steps(child, &owner, &mut steps)?,
            "triggers" => parse_triggers(child, &owner, &mut triggers)?,
            "artifacts" => parse_artifacts(child, &owner, &mut artifact_rules)?,
            _ => {}
        }
    }

    Ok(Template {
        name: child_string(node, "name").unwrap_or_else(|| id.to_string()),
        description: child_string(node, "description").unwrap_or_default(),
        id,
        params,
        steps,
        triggers,
        artifact_rules,
    })
}

fn parse_variant(node: &KdlNode) -> ConfigResult<BuildVariant> {
    let id = parse_id(node, "variant")?;
    let owner = format!("variant '{}'", id);

    let template = child_string(node, "template")
        .map(|raw| {
            EntityId::new(raw).map_err(|e| ConfigError::invalid(format!("template of {}", owner), e))
        })
        .transpose()?;

    let vcs_root = child_string(node, "vcs-root")
        .ok_or_else(|| ConfigError::MissingField(format!("vcs-root for {}", owner)))
        .and_then(|raw| {
            EntityId::new(raw).map_err(|e| ConfigError::invalid(format!("vcs-root of {}", owner), e))
        })?;

    let mut params = Vec::new();
    let mut requirements = Vec::new();
    let mut steps = Vec::new();
    let mut triggers = Vec::new();
    let mut artifact_rules = Vec::new();
    let mut axes = Vec::new();

    for child in children(node) {
        match child.name().value() {
            "params" => parse_params(child, &owner, &mut params)?,
            "requirements" => parse_requirements(child, &owner, &mut requirements)?,
            "steps" => parse_steps(child, &owner, &mut steps)?,
            "triggers" => parse_triggers(child, &owner, &mut triggers)?,
            "artifacts" => parse_artifacts(child, &owner, &mut artifact_rules)?,
            "matrix" => parse_matrix(child, &owner, &mut axes)?,
            _ => {}
        }
    }

    Ok(BuildVariant {
        name: child_string(node, "name").unwrap_or_else(|| id.to_string()),
        description: child_string(node, "description").unwrap_or_default(),
        id,
        template,
        vcs_root,
        params,
        requirements,
        steps,
        triggers,
        artifact_rules,
        matrix: Matrix::new(axes)?,
    })
}

fn parse_params(node: &KdlNode, owner: &str, params: &mut Vec<Parameter>) -> ConfigResult<()> {
    for child in children(node) {
        if child.name().value() != "param" {
            continue;
        }
        let name = first_string_arg(child)
            .ok_or_else(|| ConfigError::MissingField(format!("parameter name in {}", owner)))?;
        let value = string_arg_at(child, 1).ok_or_else(|| {
            ConfigError::MissingField(format!("value of parameter '{}' in {}", name, owner))
        })?;
        if params.iter().any(|p: &Parameter| p.name == name) {
            return Err(ConfigError::Duplicate(format!(
                "parameter '{}' in {}",
                name, owner
            )));
        }
        params.push(Parameter::new(name, value));
    }
    Ok(())
}

fn parse_steps(node: &KdlNode, owner: &str, steps: &mut Vec<BuildStep>) -> ConfigResult<()> {
    for child in children(node) {
        let kind = child.name().value();
        let name = first_string_arg(child)
            .ok_or_else(|| ConfigError::MissingField(format!("{} step name in {}", kind, owner)))?;

        let runner = match kind {
            "gradle" => StepRunner::Gradle {
                tasks: child_string(child, "tasks").ok_or_else(|| {
                    ConfigError::MissingField(format!("tasks for step '{}' in {}", name, owner))
                })?,
                wrapper_path: child_string(child, "wrapper-path"),
                build_file: child_string(child, "build-file"),
                gradle_params: child_string(child, "gradle-params"),
            },
            "script" => StepRunner::Script {
                content: string_arg_at(child, 1)
                    .or_else(|| child_string(child, "content"))
                    .ok_or_else(|| {
                        ConfigError::MissingField(format!(
                            "content for step '{}' in {}",
                            name, owner
                        ))
                    })?,
            },
            other => {
                return Err(ConfigError::invalid(
                    "step type",
                    format!("unknown step type '{}' in {}", other, owner),
                ));
            }
        };

        if steps.iter().any(|s: &BuildStep| s.name == name) {
            return Err(ConfigError::Duplicate(format!("step '{}' in {}", name, owner)));
        }
        steps.push(BuildStep { name, runner });
    }
    Ok(())
}

fn parse_triggers(node: &KdlNode, owner: &str, triggers: &mut Vec<Trigger>) -> ConfigResult<()> {
    for child in children(node) {
        let branch_filter = match string_prop(child, "branch-filter") {
            Some(raw) => raw.parse::<BranchFilter>().map_err(|e| {
                ConfigError::invalid(format!("trigger branch-filter in {}", owner), e)
            })?,
            None => BranchFilter::all(),
        };

        let trigger = match child.name().value() {
            "vcs" => Trigger::Vcs { branch_filter },
            "schedule" => {
                let hour = u32_prop(child, "hour")?.ok_or_else(|| {
                    ConfigError::MissingField(format!("schedule hour in {}", owner))
                })?;
                let minute = u32_prop(child, "minute")?.unwrap_or(0);
                let weekday = string_prop(child, "weekday")
                    .map(|raw| {
                        raw.parse::<Weekday>().map_err(|_| {
                            ConfigError::invalid(
                                format!("schedule weekday in {}", owner),
                                format!("unknown weekday '{}'", raw),
                            )
                        })
                    })
                    .transpose()?;
                Trigger::Schedule(ScheduleTrigger::new(hour, minute, weekday, branch_filter)?)
            }
            other => {
                return Err(ConfigError::invalid(
                    "trigger type",
                    format!("unknown trigger type '{}' in {}", other, owner),
                ));
            }
        };
        triggers.push(trigger);
    }
    Ok(())
}

fn parse_artifacts(node: &KdlNode, owner: &str, rules: &mut Vec<ArtifactRule>) -> ConfigResult<()> {
    let mut texts = all_string_args(node);
    texts.extend(
        children(node)
            .iter()
            .filter(|n| n.name().value() == "rule")
            .filter_map(first_string_arg),
    );
    for text in texts {
        let parsed = parse_artifact_rules(&text)
            .map_err(|e| ConfigError::invalid(format!("artifact rules in {}", owner), e))?;
        rules.extend(parsed);
    }
    Ok(())
}

fn parse_requirements(
    node: &KdlNode,
    owner: &str,
    requirements: &mut Vec<Requirement>,
) -> ConfigResult<()> {
    for child in children(node) {
        let operator: RequirementOperator = child
            .name()
            .value()
            .parse()
            .map_err(|e| ConfigError::invalid(format!("requirement in {}", owner), e))?;
        let key = first_string_arg(child).ok_or_else(|| {
            ConfigError::MissingField(format!("{} requirement key in {}", operator, owner))
        })?;
        requirements.push(Requirement::new(key, operator, string_arg_at(child, 1)));
    }
    Ok(())
}

fn parse_matrix(node: &KdlNode, owner: &str, axes: &mut Vec<MatrixAxis>) -> ConfigResult<()> {
    let mut seen: HashSet<String> = axes.iter().map(|a| a.name.clone()).collect();
    for child in children(node) {
        if child.name().value() != "axis" {
            continue;
        }
        let mut args = all_string_args(child).into_iter();
        let name = args
            .next()
            .ok_or_else(|| ConfigError::MissingField(format!("matrix axis name in {}", owner)))?;
        if !seen.insert(name.clone()) {
            return Err(ConfigError::Duplicate(format!(
                "matrix axis '{}' in {}",
                name, owner
            )));
        }
        axes.push(MatrixAxis::new(name, args));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEMO: &str = include_str!("../../../demos/spring-framework.kdl");

    #[test]
    fn test_parse_demo_project() {
        let project = parse_project(DEMO).unwrap();
        assert_eq!(project.version.as_deref(), Some("2024.12"));
        assert_eq!(project.vcs_roots().len(), 1);
        assert_eq!(project.templates().len(), 1);
        assert_eq!(project.variants().len(), 2);

        let root = project.vcs_root("SpringFrameworkVcs").unwrap();
        assert_eq!(root.name, "Spring Framework");
        assert_eq!(root.branch, "refs/heads/main");
        assert!(root.branch_filter.matches("anything"));

        let template = project.template("GradleBuildTemplate").unwrap();
        assert_eq!(template.params.len(), 3);
        assert_eq!(template.params[2], Parameter::new("version", "7.0.0-SNAPSHOT"));
        assert_eq!(template.triggers.len(), 2);
        assert_eq!(template.artifact_rules.len(), 3);
        assert!(matches!(
            &template.steps[0].runner,
            StepRunner::Gradle { tasks, .. } if tasks == "check antora"
        ));

        let variant = project.variant("JavaBuild").unwrap();
        assert_eq!(variant.matrix.len(), 3);
        assert_eq!(variant.requirements.len(), 2);
        assert_eq!(variant.template.as_ref().map(|t| t.as_str()), Some("GradleBuildTemplate"));
    }

    #[test]
    fn test_parse_simple_variant() {
        let kdl = r#"
            vcs-root "Main" {
                url "https://example.com/repo.git"
            }

            variant "Build" {
                vcs-root "Main"
                steps {
                    script "Hello" "echo hello"
                }
            }
        "#;

        let project = parse_project(kdl).unwrap();
        let variant = project.variant("Build").unwrap();
        assert_eq!(variant.name, "Build");
        assert!(variant.template.is_none());
        assert!(variant.matrix.is_empty());
        assert_eq!(
            variant.steps[0].runner,
            StepRunner::Script {
                content: "echo hello".to_string()
            }
        );
        let root = project.vcs_root("Main").unwrap();
        assert_eq!(root.checkout_mode, CheckoutMode::Auto);
    }

    #[test]
    fn test_integer_axis_values() {
        let kdl = r#"
            variant "Build" {
                vcs-root "Main"
                matrix {
                    axis "java" 17 21
                }
            }
        "#;

        let project = parse_project(kdl).unwrap();
        let axis = project.variant("Build").unwrap().matrix.axis("java").unwrap();
        assert_eq!(axis.values, vec!["17", "21"]);
    }

    #[test]
    fn test_missing_vcs_root() {
        let kdl = r#"
            variant "Build" {
                name "No root"
            }
        "#;

        let result = parse_project(kdl);
        assert!(matches!(result.unwrap_err(), ConfigError::MissingField(_)));
    }

    #[test]
    fn test_invalid_url() {
        let kdl = r#"
            vcs-root "Main" {
                url "not a url"
            }
        "#;

        let result = parse_project(kdl);
        assert!(matches!(result.unwrap_err(), ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_duplicate_variant() {
        let kdl = r#"
            variant "Build" { vcs-root "Main"; }
            variant "Build" { vcs-root "Main"; }
        "#;

        let result = parse_project(kdl);
        assert!(matches!(result.unwrap_err(), ConfigError::Model(_)));
    }

    #[test]
    fn test_duplicate_parameter() {
        let kdl = r#"
            template "T" {
                params {
                    param "version" "1"
                    param "version" "2"
                }
            }
        "#;

        let result = parse_project(kdl);
        assert!(matches!(result.unwrap_err(), ConfigError::Duplicate(_)));
    }

    #[test]
    fn test_empty_axis_rejected() {
        let kdl = r#"
            variant "Build" {
                vcs-root "Main"
                matrix {
                    axis "java"
                }
            }
        "#;

        let result = parse_project(kdl);
        assert!(matches!(result.unwrap_err(), ConfigError::Model(_)));
    }

    #[test]
    fn test_schedule_out_of_range() {
        let kdl = r#"
            template "T" {
                triggers {
                    schedule hour=25
                }
            }
        "#;

        assert!(parse_project(kdl).is_err());
    }

    #[test]
    fn test_unknown_requirement_operator() {
        let kdl = r#"
            variant "Build" {
                vcs-root "Main"
                requirements {
                    resembles "os.name" "Linux"
                }
            }
        "#;

        let result = parse_project(kdl);
        assert!(matches!(result.unwrap_err(), ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_invalid_kdl() {
        assert!(matches!(
            parse_project("variant \"Build\" {").unwrap_err(),
            ConfigError::Parse(_)
        ));
    }

    #[test]
    fn test_unquoted_decimal_rejected() {
        let kdl = r#"
            variant "Build" {
                vcs-root "Main"
                matrix {
                    axis "kotlin" 1.10 "2.0"
                }
            }
        "#;

        match parse_project(kdl).unwrap_err() {
            ConfigError::InvalidValue { field, message } => {
                assert_eq!(field, "axis");
                assert!(message.contains("quoted"));
            }
            other => panic!("unexpected error {:?}", other),
        }

        let quoted = kdl.replace("1.10", "\"1.10\"");
        let project = parse_project(&quoted).unwrap();
        let axis = project.variant("Build").unwrap().matrix.axis("kotlin").unwrap();
        assert_eq!(axis.values, ["1.10", "2.0"]);
    }
}
