//! Core domain types for buildplan.
//!
//! This crate contains:
//! - Entity identifiers and common error kinds
//! - VCS roots and branch filters
//! - Templates, build steps and artifact rules
//! - Build variants, matrix axes and resolved run descriptors
//! - Triggers and agent requirements
//! - The project registry tying them together

pub mod error;
pub mod id;
pub mod project;
pub mod requirement;
pub mod template;
pub mod trigger;
pub mod variant;
pub mod vcs;

pub use error::{Error, Result};
pub use id::EntityId;
pub use project::Project;
