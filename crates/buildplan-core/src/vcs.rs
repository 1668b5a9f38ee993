//! VCS roots and branch filters.

use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{EntityId, Error, Result};

/// A named reference to a source repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VcsRoot {
    /// Unique identifier.
    pub id: EntityId,
    /// Display name (e.g., "Spring Framework").
    pub name: String,
    /// Repository URL.
    pub url: Url,
    /// Default branch reference (e.g., "refs/heads/main").
    pub branch: String,
    /// Which branches the root monitors.
    pub branch_filter: BranchFilter,
    /// Where sources are checked out.
    pub checkout_mode: CheckoutMode,
}

/// Where the CI engine checks out sources.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckoutMode {
    #[default]
    Auto,
    OnAgent,
    OnServer,
    Manual,
}

impl std::fmt::Display for CheckoutMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckoutMode::Auto => write!(f, "auto"),
            CheckoutMode::OnAgent => write!(f, "on-agent"),
            CheckoutMode::OnServer => write!(f, "on-server"),
            CheckoutMode::Manual => write!(f, "manual"),
        }
    }
}

impl std::str::FromStr for CheckoutMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "auto" => Ok(CheckoutMode::Auto),
            "on-agent" => Ok(CheckoutMode::OnAgent),
            "on-server" => Ok(CheckoutMode::OnServer),
            "manual" => Ok(CheckoutMode::Manual),
            _ => Err(Error::configuration(format!("unknown checkout mode: {}", s))),
        }
    }
}

/// A single `+:pattern` or `-:pattern` rule, compiled when parsed.
#[derive(Debug, Clone)]
pub struct BranchRule {
    include: bool,
    pattern: String,
    // None for the bare `*` pattern.
    regex: Option<Regex>,
}

impl BranchRule {
    pub fn new(include: bool, pattern: impl Into<String>) -> Result<Self> {
        let pattern = pattern.into();
        let regex = if pattern == "*" {
            None
        } else {
            let re = glob_regex(&pattern).map_err(|e| {
                Error::configuration(format!("invalid branch pattern '{}': {}", pattern, e))
            })?;
            Some(re)
        };
        Ok(Self {
            include,
            pattern,
            regex,
        })
    }

    pub fn include(&self) -> bool {
        self.include
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn matches(&self, branch: &str) -> bool {
        self.regex.as_ref().is_none_or(|re| re.is_match(branch))
    }
}

impl PartialEq for BranchRule {
    fn eq(&self, other: &Self) -> bool {
        self.include == other.include && self.pattern == other.pattern
    }
}

impl Eq for BranchRule {}

impl std::fmt::Display for BranchRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.include { '+' } else { '-' };
        write!(f, "{}:{}", sign, self.pattern)
    }
}

/// Branch selection rules.
///
/// Rules are separated by whitespace or newlines. `*` matches any sequence of
/// characters. The last matching rule decides; unmatched branches are
/// excluded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct BranchFilter {
    rules: Vec<BranchRule>,
}

impl BranchFilter {
    /// A filter accepting every branch (`+:*`).
    pub fn all() -> Self {
        Self {
            rules: vec![BranchRule {
                include: true,
                pattern: "*".to_string(),
                regex: None,
            }],
        }
    }

    pub fn rules(&self) -> &[BranchRule] {
        &self.rules
    }

    pub fn matches(&self, branch: &str) -> bool {
        self.rules
            .iter()
            .rev()
            .find(|rule| rule.matches(branch))
            .is_some_and(|rule| rule.include)
    }
}

impl Default for BranchFilter {
    fn default() -> Self {
        Self::all()
    }
}

impl std::str::FromStr for BranchFilter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut rules = Vec::new();
        for token in s.split_whitespace() {
            let (include, pattern) = if let Some(p) = token.strip_prefix("+:") {
                (true, p)
            } else if let Some(p) = token.strip_prefix("-:") {
                (false, p)
            } else {
                return Err(Error::configuration(format!(
                    "branch filter rule '{}' must start with '+:' or '-:'",
                    token
                )));
            };
            if pattern.is_empty() {
                return Err(Error::configuration(format!(
                    "branch filter rule '{}' has an empty pattern",
                    token
                )));
            }
            rules.push(BranchRule::new(include, pattern)?);
        }
        if rules.is_empty() {
            return Err(Error::configuration("branch filter has no rules"));
        }
        Ok(Self { rules })
    }
}

impl std::fmt::Display for BranchFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let rules: Vec<String> = self.rules.iter().map(|r| r.to_string()).collect();
        write!(f, "{}", rules.join("\n"))
    }
}

impl From<BranchFilter> for String {
    fn from(filter: BranchFilter) -> Self {
        filter.to_string()
    }
}

impl TryFrom<String> for BranchFilter {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

fn glob_regex(pattern: &str) -> std::result::Result<Regex, regex::Error> {
    let body: Vec<String> = pattern.split('*').map(regex::escape).collect();
    Regex::new(&format!("^{}$", body.join(".*")))
}
