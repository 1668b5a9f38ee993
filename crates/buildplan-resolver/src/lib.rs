//! Resolution of buildplan projects.
//!
//! Merges templates into build variants, expands matrix axes into concrete
//! runs, substitutes placeholders, and checks agent requirements. Every
//! operation is a pure function of its inputs.

pub mod matrix;
pub mod merge;
pub mod resolver;
pub mod validator;

pub use matrix::{Expansion, MatrixExpander};
pub use merge::{MergedVariant, TemplateResolver};
pub use resolver::{ProjectResolver, VariantResolution};
pub use validator::{RequirementValidator, Verdict};
