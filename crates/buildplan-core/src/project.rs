//! The project registry: every VCS root, template and variant of a
//! configuration source.

use serde::{Deserialize, Serialize};

use crate::template::Template;
use crate::variant::BuildVariant;
use crate::vcs::VcsRoot;
use crate::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Project {
    /// Configuration format version (e.g., "2024.12").
    pub version: Option<String>,
    vcs_roots: Vec<VcsRoot>,
    templates: Vec<Template>,
    variants: Vec<BuildVariant>,
}

impl Project {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_vcs_root(&mut self, root: VcsRoot) -> Result<()> {
        if self.vcs_root(root.id.as_str()).is_some() {
            return Err(Error::configuration(format!(
                "duplicate VCS root '{}'",
                root.id
            )));
        }
        self.vcs_roots.push(root);
        Ok(())
    }

    pub fn add_template(&mut self, template: Template) -> Result<()> {
        if self.template(template.id.as_str()).is_some() {
            return Err(Error::configuration(format!(
                "duplicate template '{}'",
                template.id
            )));
        }
        self.templates.push(template);
        Ok(())
    }

    pub fn add_variant(&mut self, variant: BuildVariant) -> Result<()> {
        if self.variant(variant.id.as_str()).is_some() {
            return Err(Error::configuration(format!(
                "duplicate build variant '{}'",
                variant.id
            )));
        }
        self.variants.push(variant);
        Ok(())
    }

    pub fn vcs_roots(&self) -> &[VcsRoot] {
        &self.vcs_roots
    }

    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    pub fn variants(&self) -> &[BuildVariant] {
        &self.variants
    }

    pub fn vcs_root(&self, id: &str) -> Option<&VcsRoot> {
        self.vcs_roots.iter().find(|r| r.id.as_str() == id)
    }

    pub fn template(&self, id: &str) -> Option<&Template> {
        self.templates.iter().find(|t| t.id.as_str() == id)
    }

    pub fn variant(&self, id: &str) -> Option<&BuildVariant> {
        self.variants.iter().find(|v| v.id.as_str() == id)
    }

    /// Look up a variant, failing with a configuration error if it is absent.
    pub fn require_variant(&self, id: &str) -> Result<&BuildVariant> {
        self.variant(id)
            .ok_or_else(|| Error::configuration(format!("unknown build variant '{}'", id)))
    }
}
