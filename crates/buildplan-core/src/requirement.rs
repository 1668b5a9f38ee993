//! Agent requirement predicates and capabilities.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{Error, Result};

/// A condition an agent's capabilities must satisfy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    /// Capability key (e.g., "teamcity.agent.jvm.os.name").
    pub key: String,
    pub operator: RequirementOperator,
    /// Operand; absent for `exists` / `does-not-exist`.
    pub value: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequirementOperator {
    Contains,
    DoesNotContain,
    Equals,
    DoesNotEqual,
    StartsWith,
    EndsWith,
    Matches,
    Exists,
    DoesNotExist,
}

impl RequirementOperator {
    pub const ALL: [RequirementOperator; 9] = [
        RequirementOperator::Contains,
        RequirementOperator::DoesNotContain,
        RequirementOperator::Equals,
        RequirementOperator::DoesNotEqual,
        RequirementOperator::StartsWith,
        RequirementOperator::EndsWith,
        RequirementOperator::Matches,
        RequirementOperator::Exists,
        RequirementOperator::DoesNotExist,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RequirementOperator::Contains => "contains",
            RequirementOperator::DoesNotContain => "does-not-contain",
            RequirementOperator::Equals => "equals",
            RequirementOperator::DoesNotEqual => "does-not-equal",
            RequirementOperator::StartsWith => "starts-with",
            RequirementOperator::EndsWith => "ends-with",
            RequirementOperator::Matches => "matches",
            RequirementOperator::Exists => "exists",
            RequirementOperator::DoesNotExist => "does-not-exist",
        }
    }

    /// Whether the operator compares against a value.
    pub fn takes_value(&self) -> bool {
        !matches!(
            self,
            RequirementOperator::Exists | RequirementOperator::DoesNotExist
        )
    }
}

impl std::fmt::Display for RequirementOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RequirementOperator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.to_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|op| op.as_str() == normalized)
            .ok_or_else(|| Error::Validation(format!("unknown requirement operator: {}", s)))
    }
}

impl Requirement {
    pub fn new(
        key: impl Into<String>,
        operator: RequirementOperator,
        value: Option<String>,
    ) -> Self {
        Self {
            key: key.into(),
            operator,
            value,
        }
    }

    pub fn contains(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(key, RequirementOperator::Contains, Some(value.into()))
    }

    pub fn equals(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(key, RequirementOperator::Equals, Some(value.into()))
    }

    /// Check that the predicate is well formed.
    pub fn check(&self) -> Result<()> {
        if self.key.trim().is_empty() {
            return Err(Error::Validation(format!(
                "{} requirement has an empty key",
                self.operator
            )));
        }
        match (&self.value, self.operator.takes_value()) {
            (None, true) => Err(Error::Validation(format!(
                "requirement '{} {}' is missing a value",
                self.key, self.operator
            ))),
            (Some(_), false) => Err(Error::Validation(format!(
                "requirement '{} {}' does not take a value",
                self.key, self.operator
            ))),
            (Some(pattern), true) if self.operator == RequirementOperator::Matches => {
                Regex::new(pattern).map(|_| ()).map_err(|e| {
                    Error::Validation(format!(
                        "requirement '{} matches' has an invalid pattern: {}",
                        self.key, e
                    ))
                })
            }
            _ => Ok(()),
        }
    }

    /// Evaluate the predicate against an agent.
    pub fn evaluate(&self, agent: &AgentCapabilities) -> Result<bool> {
        self.check()?;
        let actual = agent.get(&self.key);
        let expected = self.value.as_deref().unwrap_or_default();

        Ok(match self.operator {
            RequirementOperator::Exists => actual.is_some(),
            RequirementOperator::DoesNotExist => actual.is_none(),
            RequirementOperator::Contains => actual.is_some_and(|a| a.contains(expected)),
            RequirementOperator::DoesNotContain => !actual.is_some_and(|a| a.contains(expected)),
            RequirementOperator::Equals => actual == Some(expected),
            RequirementOperator::DoesNotEqual => actual != Some(expected),
            RequirementOperator::StartsWith => actual.is_some_and(|a| a.starts_with(expected)),
            RequirementOperator::EndsWith => actual.is_some_and(|a| a.ends_with(expected)),
            RequirementOperator::Matches => {
                let re = Regex::new(expected)
                    .map_err(|e| Error::Validation(format!("invalid pattern: {}", e)))?;
                actual.is_some_and(|a| re.is_match(a))
            }
        })
    }
}

impl std::fmt::Display for Requirement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{} {} \"{}\"", self.key, self.operator, value),
            None => write!(f, "{} {}", self.key, self.operator),
        }
    }
}

/// Capabilities reported by one execution agent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentCapabilities {
    pub name: String,
    pub capabilities: BTreeMap<String, String>,
}

impl AgentCapabilities {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            capabilities: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.capabilities.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.capabilities.get(key).map(String::as_str)
    }
}
