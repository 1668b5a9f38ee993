//! Agent capability files.
//!
//! ```kdl
//! agent "linux-1" {
//!     capability "teamcity.agent.jvm.os.name" "Linux"
//!     capability "teamcity.agent.jvm.version" "21.0.2"
//! }
//! ```

use buildplan_core::requirement::AgentCapabilities;
use kdl::{KdlDocument, KdlNode};
use std::path::Path;

use crate::nodes::{children, first_string_arg, reject_floats, string_arg_at};
use crate::{ConfigError, ConfigResult};

/// Parse every `agent` node of a KDL document.
pub fn parse_agents(kdl: &str) -> ConfigResult<Vec<AgentCapabilities>> {
    let doc: KdlDocument = kdl.parse()?;
    reject_floats(&doc)?;
    let mut agents: Vec<AgentCapabilities> = Vec::new();

    for node in doc.nodes().iter().filter(|n| n.name().value() == "agent") {
        let agent = parse_agent(node)?;
        if agents.iter().any(|a| a.name == agent.name) {
            return Err(ConfigError::Duplicate(format!("agent '{}'", agent.name)));
        }
        agents.push(agent);
    }

    Ok(agents)
}

/// Read and parse an agent capability file.
pub fn load_agents(path: impl AsRef<Path>) -> ConfigResult<Vec<AgentCapabilities>> {
    let content = std::fs::read_to_string(path)?;
    parse_agents(&content)
}

fn parse_agent(node: &KdlNode) -> ConfigResult<AgentCapabilities> {
    let name = first_string_arg(node)
        .ok_or_else(|| ConfigError::MissingField("agent name".to_string()))?;
    let mut agent = AgentCapabilities::new(name);

    for child in children(node) {
        if child.name().value() != "capability" {
            continue;
        }
        let key = first_string_arg(child).ok_or_else(|| {
            ConfigError::MissingField(format!("capability key of agent '{}'", agent.name))
        })?;
        let value = string_arg_at(child, 1).ok_or_else(|| {
            ConfigError::MissingField(format!("value of capability '{}'", key))
        })?;
        agent.set(key, value);
    }

    Ok(agent)
}
