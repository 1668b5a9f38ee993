//! Agent requirement validation.
//!
//! This only simulates agent matching so configurations can be checked
//! before hand-off; it never schedules anything.

use buildplan_core::Result;
use buildplan_core::requirement::{AgentCapabilities, Requirement};
use buildplan_core::variant::ResolvedVariant;
use serde::Serialize;
use tracing::debug;

/// Outcome of matching requirements against one agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    Pass,
    Fail {
        /// The first requirement the agent does not satisfy.
        requirement: Requirement,
        /// The agent's value for the requirement key, if any.
        actual: Option<String>,
    },
}

impl Verdict {
    pub fn is_pass(&self) -> bool {
        matches!(self, Verdict::Pass)
    }
}

/// Checks a set of well-formed requirement predicates against agents.
#[derive(Debug, Clone)]
pub struct RequirementValidator<'a> {
    requirements: &'a [Requirement],
}

impl<'a> RequirementValidator<'a> {
    /// Fails with a validation error if any predicate is malformed.
    pub fn new(requirements: &'a [Requirement]) -> Result<Self> {
        for requirement in requirements {
            requirement.check()?;
        }
        Ok(Self { requirements })
    }

    pub fn for_run(run: &'a ResolvedVariant) -> Result<Self> {
        Self::new(&run.requirements)
    }

    /// Evaluate predicates in declaration order, stopping at the first failure.
    pub fn validate(&self, agent: &AgentCapabilities) -> Result<Verdict> {
        for requirement in self.requirements {
            if !requirement.evaluate(agent)? {
                debug!(agent = %agent.name, requirement = %requirement, "requirement not met");
                return Ok(Verdict::Fail {
                    requirement: requirement.clone(),
                    actual: agent.get(&requirement.key).map(str::to_string),
                });
            }
        }
        Ok(Verdict::Pass)
    }

    /// Agents satisfying every requirement, in input order.
    pub fn compatible<'b>(&self, agents: &'b [AgentCapabilities]) -> Result<Vec<&'b AgentCapabilities>> {
        let mut compatible = Vec::new();
        for agent in agents {
            if self.validate(agent)?.is_pass() {
                compatible.push(agent);
            }
        }
        Ok(compatible)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use buildplan_core::Error;
    use buildplan_core::requirement::RequirementOperator;

    #[test]
    fn test_linux_requirement_fails_on_windows() {
        let requirements = vec![
            Requirement::contains("os.name", "Linux"),
            Requirement::contains("jvm.version", "17"),
        ];
        let agent = AgentCapabilities::new("win-1")
            .with("os.name", "Windows")
            .with("jvm.version", "17.0.9");

        let verdict = RequirementValidator::new(&requirements)
            .unwrap()
            .validate(&agent)
            .unwrap();
        assert_eq!(
            verdict,
            Verdict::Fail {
                requirement: Requirement::contains("os.name", "Linux"),
                actual: Some("Windows".to_string()),
            }
        );
    }

    #[test]
    fn test_reports_first_failure_in_order() {
        let requirements = vec![
            Requirement::contains("os.name", "Linux"),
            Requirement::contains("jvm.version", "21"),
            Requirement::new("docker", RequirementOperator::Exists, None),
        ];
        let agent = AgentCapabilities::new("linux-17")
            .with("os.name", "Linux")
            .with("jvm.version", "17.0.9");

        let verdict = RequirementValidator::new(&requirements)
            .unwrap()
            .validate(&agent)
            .unwrap();
        match verdict {
            Verdict::Fail { requirement, actual } => {
                assert_eq!(requirement.key, "jvm.version");
                assert_eq!(actual.as_deref(), Some("17.0.9"));
            }
            Verdict::Pass => panic!("expected failure"),
        }
    }

    #[test]
    fn test_pass_and_compatible_agents() {
        let requirements = vec![Requirement::contains("os.name", "Linux")];
        let agents = vec![
            AgentCapabilities::new("a").with("os.name", "Linux"),
            AgentCapabilities::new("b").with("os.name", "Windows"),
            AgentCapabilities::new("c").with("os.name", "GNU/Linux"),
        ];
        let validator = RequirementValidator::new(&requirements).unwrap();
        assert!(validator.validate(&agents[0]).unwrap().is_pass());

        let names: Vec<&str> = validator
            .compatible(&agents)
            .unwrap()
            .iter()
            .map(|a| a.name.as_str())
            .collect();
        assert_eq!(names, ["a", "c"]);
    }

    #[test]
    fn test_no_requirements_always_pass() {
        let validator = RequirementValidator::new(&[]).unwrap();
        assert!(validator.validate(&AgentCapabilities::default()).unwrap().is_pass());
    }

    #[test]
    fn test_malformed_predicate_rejected_up_front() {
        let requirements = vec![
            Requirement::contains("os.name", "Linux"),
            Requirement::new("jvm.version", RequirementOperator::Matches, Some("[".into())),
        ];
        assert!(matches!(
            RequirementValidator::new(&requirements),
            Err(Error::Validation(_))
        ));
    }
}
