//! Whole-project resolution.

use buildplan_core::variant::{BuildVariant, ResolvedVariant};
use buildplan_core::{EntityId, Error, Project, Result};
use std::collections::{HashMap, HashSet};
use tracing::{info, warn};

use crate::matrix::MatrixExpander;
use crate::merge::TemplateResolver;

/// Outcome of resolving one variant: all of its runs, or the error that
/// failed it.
#[derive(Debug)]
pub struct VariantResolution {
    pub variant: EntityId,
    pub result: Result<Vec<ResolvedVariant>>,
}

/// Resolves the variants of a project against an environment.
pub struct ProjectResolver<'p> {
    project: &'p Project,
    env: HashMap<String, String>,
}

impl<'p> ProjectResolver<'p> {
    pub fn new(project: &'p Project, env: HashMap<String, String>) -> Self {
        Self { project, env }
    }

    /// Resolve every run of one variant. Any failing run fails the variant.
    pub fn resolve(&self, variant: &BuildVariant) -> Result<Vec<ResolvedVariant>> {
        let merged = TemplateResolver::new(self.project).merge(variant)?;
        let runs = MatrixExpander::new(&merged, &self.env)
            .iter()
            .collect::<Result<Vec<_>>>()?;
        claim_ids(&mut HashSet::new(), &runs)?;
        info!(variant = %variant.id, runs = runs.len(), "resolved variant");
        Ok(runs)
    }

    /// Resolve a variant by identifier.
    pub fn resolve_id(&self, id: &str) -> Result<Vec<ResolvedVariant>> {
        self.resolve(self.project.require_variant(id)?)
    }

    /// Resolve every variant independently.
    ///
    /// A variant whose run ids repeat those of an earlier variant fails.
    pub fn resolve_each(&self) -> Vec<VariantResolution> {
        let mut seen = HashSet::new();
        self.project
            .variants()
            .iter()
            .map(|variant| {
                let result = self
                    .resolve(variant)
                    .and_then(|runs| claim_ids(&mut seen, &runs).map(|()| runs));
                if let Err(e) = &result {
                    warn!(variant = %variant.id, error = %e, "variant failed to resolve");
                }
                VariantResolution {
                    variant: variant.id.clone(),
                    result,
                }
            })
            .collect()
    }

    /// Resolve every variant, failing on the first variant that does not
    /// resolve.
    pub fn resolve_all(&self) -> Result<Vec<ResolvedVariant>> {
        let mut seen = HashSet::new();
        let mut runs = Vec::new();
        for variant in self.project.variants() {
            let resolved = self.resolve(variant)?;
            claim_ids(&mut seen, &resolved)?;
            runs.extend(resolved);
        }
        Ok(runs)
    }
}

/// Record run ids, rejecting any already taken. Sanitizing axis values can
/// map distinct combinations onto one id.
fn claim_ids(seen: &mut HashSet<String>, runs: &[ResolvedVariant]) -> Result<()> {
    for run in runs {
        if !seen.insert(run.id.to_string()) {
            return Err(Error::configuration(format!(
                "duplicate run id '{}' (from variant '{}')",
                run.id, run.variant
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use buildplan_config::parse_project;
    use buildplan_core::Error;
    use buildplan_core::requirement::AgentCapabilities;

    use crate::validator::{RequirementValidator, Verdict};

    const DEMO: &str = include_str!("../../../demos/spring-framework.kdl");

    fn env() -> HashMap<String, String> {
        ["17", "21", "23"]
            .iter()
            .map(|v| (format!("JDK_{}", v), format!("/usr/lib/jvm/jdk-{}", v)))
            .collect()
    }

    #[test]
    fn test_resolve_demo_project() {
        let project = parse_project(DEMO).unwrap();
        let runs = ProjectResolver::new(&project, env()).resolve_all().unwrap();

        let ids: Vec<&str> = runs.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(
            ids,
            ["JavaBuild_java_17", "JavaBuild_java_21", "JavaBuild_java_23", "Javadoc"]
        );

        let java21 = &runs[1];
        assert_eq!(java21.name, "Java 21 Build");
        assert_eq!(java21.description, "Build with Java 21");
        assert_eq!(java21.param("env.JAVA_HOME"), Some("/usr/lib/jvm/jdk-21"));
        assert_eq!(java21.param("kotlinVersion"), Some("2.1.20"));
        assert_eq!(java21.param("version"), Some("7.0.0-SNAPSHOT"));
        assert_eq!(java21.vcs_root.id.as_str(), "SpringFrameworkVcs");
        assert_eq!(java21.triggers.len(), 2);
        assert_eq!(java21.artifact_rules.len(), 3);

        let javadoc = &runs[3];
        assert!(javadoc.template.is_none());
        assert_eq!(javadoc.steps.len(), 1);
        assert_eq!(javadoc.param("env.JAVA_HOME"), Some("/usr/lib/jvm/jdk-21"));
    }

    #[test]
    fn test_version_override() {
        let kdl = DEMO.replace(
            r#"param "env.JAVA_HOME" "${env.JDK_${java}}""#,
            r#"param "env.JAVA_HOME" "${env.JDK_${java}}"
        param "version" "8.0.0""#,
        );
        let project = parse_project(&kdl).unwrap();
        let runs = ProjectResolver::new(&project, env()).resolve_id("JavaBuild").unwrap();

        for run in &runs {
            assert_eq!(run.param("version"), Some("8.0.0"));
            assert_eq!(run.param("kotlinVersion"), Some("2.1.20"));
        }
    }

    #[test]
    fn test_unknown_template_fails_whole_variant() {
        let kdl = DEMO.replace(
            r#"template "GradleBuildTemplate"
    vcs-root"#,
            r#"template "MavenBuildTemplate"
    vcs-root"#,
        );
        let project = parse_project(&kdl).unwrap();
        let resolver = ProjectResolver::new(&project, env());

        assert!(matches!(
            resolver.resolve_id("JavaBuild"),
            Err(Error::Configuration(_))
        ));
        assert!(resolver.resolve_all().is_err());

        let each = resolver.resolve_each();
        assert_eq!(each.len(), 2);
        assert!(each[0].result.is_err());
        assert_eq!(each[1].result.as_ref().map(|r| r.len()).ok(), Some(1));
    }

    #[test]
    fn test_unknown_variant() {
        let project = parse_project(DEMO).unwrap();
        assert!(matches!(
            ProjectResolver::new(&project, env()).resolve_id("Nope"),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_runs_against_agents() {
        let project = parse_project(DEMO).unwrap();
        let runs = ProjectResolver::new(&project, env()).resolve_id("JavaBuild").unwrap();

        let agent = AgentCapabilities::new("linux-21")
            .with("teamcity.agent.jvm.os.name", "Linux")
            .with("teamcity.agent.jvm.version", "21.0.2");

        let verdicts: Vec<Verdict> = runs
            .iter()
            .map(|run| RequirementValidator::for_run(run).unwrap().validate(&agent).unwrap())
            .collect();
        assert!(!verdicts[0].is_pass());
        assert!(verdicts[1].is_pass());
        assert!(!verdicts[2].is_pass());
    }

    #[test]
    fn test_malformed_requirement_fails_resolution() {
        let kdl = DEMO.replace(
            r#"exists "env.JDK_21""#,
            r#"exists "env.JDK_21"
        matches "teamcity.agent.jvm.os.name" "(""#,
        );
        let project = parse_project(&kdl).unwrap();
        let resolver = ProjectResolver::new(&project, env());

        assert!(matches!(resolver.resolve_all(), Err(Error::Validation(_))));
        assert!(matches!(resolver.resolve_id("Javadoc"), Err(Error::Validation(_))));
        assert!(resolver.resolve_id("JavaBuild").is_ok());
    }

    #[test]
    fn test_requirement_missing_value_fails_resolution() {
        let kdl = DEMO.replace(
            r#"exists "env.JDK_21""#,
            r#"equals "teamcity.agent.jvm.version""#,
        );
        let project = parse_project(&kdl).unwrap();
        assert!(matches!(
            ProjectResolver::new(&project, env()).resolve_id("Javadoc"),
            Err(Error::Validation(_))
        ));
    }

    const COLLIDING: &str = r#"
        vcs-root "Main" {
            url "https://example.com/repo.git"
        }
        variant "Build" {
            vcs-root "Main"
            matrix {
                axis "v" "1.0" "2.0"
            }
        }
        variant "Build_v_1_0" {
            vcs-root "Main"
        }
    "#;

    #[test]
    fn test_run_ids_collide_across_variants() {
        let project = parse_project(COLLIDING).unwrap();
        let resolver = ProjectResolver::new(&project, env());

        assert_eq!(resolver.resolve_id("Build").unwrap().len(), 2);
        assert!(matches!(
            resolver.resolve_all(),
            Err(Error::Configuration(ref m)) if m.contains("Build_v_1_0")
        ));

        let each = resolver.resolve_each();
        assert!(each[0].result.is_ok());
        assert!(matches!(each[1].result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_run_ids_collide_within_variant() {
        let kdl = COLLIDING.replace(r#""1.0" "2.0""#, r#""1.0" "1_0""#);
        let project = parse_project(&kdl).unwrap();
        assert!(matches!(
            ProjectResolver::new(&project, env()).resolve_id("Build"),
            Err(Error::Configuration(_))
        ));
    }
}
