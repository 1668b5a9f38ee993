//! Templates, parameters, build steps and artifact rules.

use serde::{Deserialize, Serialize};

use crate::trigger::Trigger;
use crate::{EntityId, Error, Result};

/// A reusable bundle of build configuration. Never executed directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    /// Unique identifier.
    pub id: EntityId,
    /// Display name.
    pub name: String,
    pub description: String,
    /// Default parameters, in declaration order.
    pub params: Vec<Parameter>,
    /// Build steps, in execution order.
    pub steps: Vec<BuildStep>,
    pub triggers: Vec<Trigger>,
    /// Artifact publishing rules.
    pub artifact_rules: Vec<ArtifactRule>,
}

/// A string-typed build parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub value: String,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A step in a build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStep {
    /// Step name, unique within a build.
    pub name: String,
    /// What the step runs.
    pub runner: StepRunner,
}

/// What a build step does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepRunner {
    /// Run Gradle tasks through the wrapper.
    Gradle {
        tasks: String,
        wrapper_path: Option<String>,
        build_file: Option<String>,
        gradle_params: Option<String>,
    },
    /// Run an inline shell script.
    Script { content: String },
}

impl StepRunner {
    pub fn kind(&self) -> &'static str {
        match self {
            StepRunner::Gradle { .. } => "gradle",
            StepRunner::Script { .. } => "script",
        }
    }

    /// Apply `f` to every string field of the runner.
    pub fn try_map_strings<F>(&self, mut f: F) -> Result<Self>
    where
        F: FnMut(&str) -> Result<String>,
    {
        Ok(match self {
            StepRunner::Gradle {
                tasks,
                wrapper_path,
                build_file,
                gradle_params,
            } => {
                let tasks = f(tasks)?;
                let wrapper_path = map_optional(wrapper_path, &mut f)?;
                let build_file = map_optional(build_file, &mut f)?;
                let gradle_params = map_optional(gradle_params, &mut f)?;
                StepRunner::Gradle {
                    tasks,
                    wrapper_path,
                    build_file,
                    gradle_params,
                }
            }
            StepRunner::Script { content } => StepRunner::Script {
                content: f(content)?,
            },
        })
    }
}

fn map_optional<F>(value: &Option<String>, f: &mut F) -> Result<Option<String>>
where
    F: FnMut(&str) -> Result<String>,
{
    value.as_deref().map(f).transpose()
}

/// Which files a build publishes, and where.
///
/// Textual form: `+:build/libs/** => artifacts`. Rules without a `+:` or
/// `-:` prefix are includes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRule {
    pub include: bool,
    pub source: String,
    pub target: Option<String>,
}

impl std::str::FromStr for ArtifactRule {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (include, rest) = if let Some(r) = s.strip_prefix("+:") {
            (true, r)
        } else if let Some(r) = s.strip_prefix("-:") {
            (false, r)
        } else {
            (true, s)
        };

        let (source, target) = match rest.split_once("=>") {
            Some((source, target)) => {
                let target = target.trim();
                if target.is_empty() {
                    return Err(Error::configuration(format!(
                        "artifact rule '{}' has an empty target",
                        s
                    )));
                }
                (source.trim(), Some(target.to_string()))
            }
            None => (rest.trim(), None),
        };

        if source.is_empty() {
            return Err(Error::configuration(format!(
                "artifact rule '{}' has an empty source",
                s
            )));
        }

        Ok(Self {
            include,
            source: source.to_string(),
            target,
        })
    }
}

impl std::fmt::Display for ArtifactRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.include { '+' } else { '-' };
        match &self.target {
            Some(target) => write!(f, "{}:{} => {}", sign, self.source, target),
            None => write!(f, "{}:{}", sign, self.source),
        }
    }
}

/// Parse a block of artifact rules, one per non-empty line.
pub fn parse_artifact_rules(text: &str) -> Result<Vec<ArtifactRule>> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::parse)
        .collect()
}
