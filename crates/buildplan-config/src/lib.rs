//! KDL configuration parsing for buildplan.
//!
//! This crate handles parsing of:
//! - Project definitions (buildplan.kdl): VCS roots, templates, variants
//! - Agent capability files
//! - Placeholder substitution

pub mod agent;
pub mod error;
mod nodes;
pub mod placeholder;
pub mod project;

pub use agent::{load_agents, parse_agents};
pub use error::{ConfigError, ConfigResult};
pub use placeholder::{SubstitutionContext, SubstitutionContextBuilder, Substituter};
pub use project::{load_project, parse_project};
