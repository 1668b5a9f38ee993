//! Build variants, matrix axes and resolved run descriptors.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;

use crate::requirement::Requirement;
use crate::template::{ArtifactRule, BuildStep, Parameter};
use crate::trigger::Trigger;
use crate::vcs::VcsRoot;
use crate::{EntityId, Error, Result};

/// A concrete build definition, optionally derived from a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildVariant {
    /// Unique identifier.
    pub id: EntityId,
    /// Display name; may contain placeholders.
    pub name: String,
    pub description: String,
    /// Template to merge defaults from.
    pub template: Option<EntityId>,
    /// VCS root to build from.
    pub vcs_root: EntityId,
    /// Parameter overrides, in declaration order.
    pub params: Vec<Parameter>,
    /// Agent requirements.
    pub requirements: Vec<Requirement>,
    /// Inline steps, merged after the template's.
    pub steps: Vec<BuildStep>,
    pub triggers: Vec<Trigger>,
    pub artifact_rules: Vec<ArtifactRule>,
    /// Matrix axes; empty means a single run.
    pub matrix: Matrix,
}

/// A named dimension of discrete values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixAxis {
    pub name: String,
    pub values: Vec<String>,
}

impl MatrixAxis {
    pub fn new<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

/// One axis bound to one of its values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisValue {
    pub axis: String,
    pub value: String,
}

/// Ordered matrix axes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<MatrixAxis>", into = "Vec<MatrixAxis>")]
pub struct Matrix {
    axes: Vec<MatrixAxis>,
}

impl Matrix {
    pub fn new(axes: Vec<MatrixAxis>) -> Result<Self> {
        let mut names = HashSet::new();
        for axis in &axes {
            if axis.name.is_empty() || axis.name.contains(['$', '{', '}']) {
                return Err(Error::configuration(format!(
                    "invalid matrix axis name '{}'",
                    axis.name
                )));
            }
            if !names.insert(axis.name.as_str()) {
                return Err(Error::configuration(format!(
                    "duplicate matrix axis '{}'",
                    axis.name
                )));
            }
            if axis.values.is_empty() {
                return Err(Error::configuration(format!(
                    "matrix axis '{}' has no values",
                    axis.name
                )));
            }
            let mut values = HashSet::new();
            for value in &axis.values {
                if !values.insert(value.as_str()) {
                    return Err(Error::configuration(format!(
                        "matrix axis '{}' lists value '{}' twice",
                        axis.name, value
                    )));
                }
            }
        }
        let combinations = axes
            .iter()
            .try_fold(1usize, |n, axis| n.checked_mul(axis.values.len()));
        if combinations.is_none() {
            return Err(Error::configuration(format!(
                "matrix of {} axes has too many combinations",
                axes.len()
            )));
        }
        Ok(Self { axes })
    }

    pub fn axes(&self) -> &[MatrixAxis] {
        &self.axes
    }

    pub fn is_empty(&self) -> bool {
        self.axes.is_empty()
    }

    pub fn axis(&self, name: &str) -> Option<&MatrixAxis> {
        self.axes.iter().find(|a| a.name == name)
    }

    /// Number of combinations. A matrix without axes has exactly one.
    ///
    /// Construction guarantees the product fits in `usize`.
    pub fn len(&self) -> usize {
        self.axes.iter().map(|a| a.values.len()).product()
    }

    /// Iterate the Cartesian product of axis values.
    ///
    /// The first declared axis varies slowest. Every call starts over.
    pub fn combinations(&self) -> Combinations<'_> {
        Combinations {
            axes: &self.axes,
            indices: vec![0; self.axes.len()],
            remaining: self.len(),
        }
    }
}

impl TryFrom<Vec<MatrixAxis>> for Matrix {
    type Error = Error;

    fn try_from(axes: Vec<MatrixAxis>) -> Result<Self> {
        Self::new(axes)
    }
}

impl From<Matrix> for Vec<MatrixAxis> {
    fn from(matrix: Matrix) -> Self {
        matrix.axes
    }
}

/// Lazy iterator over matrix combinations.
#[derive(Debug, Clone)]
pub struct Combinations<'a> {
    axes: &'a [MatrixAxis],
    indices: Vec<usize>,
    remaining: usize,
}

impl Iterator for Combinations<'_> {
    type Item = Vec<AxisValue>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let combination = self
            .axes
            .iter()
            .zip(&self.indices)
            .map(|(axis, &i)| AxisValue {
                axis: axis.name.clone(),
                value: axis.values[i].clone(),
            })
            .collect();

        // Odometer step: the last axis turns fastest.
        for (pos, axis) in self.axes.iter().enumerate().rev() {
            self.indices[pos] += 1;
            if self.indices[pos] < axis.values.len() {
                break;
            }
            self.indices[pos] = 0;
        }

        Some(combination)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Combinations<'_> {}

/// Identifier of the run produced for one matrix combination.
pub fn run_id(variant: &EntityId, combination: &[AxisValue]) -> EntityId {
    if combination.is_empty() {
        return variant.clone();
    }
    let mut raw = variant.to_string();
    for av in combination {
        raw.push('_');
        raw.push_str(&av.axis);
        raw.push('_');
        raw.push_str(&av.value);
    }
    EntityId::sanitized(&raw)
}

/// A fully merged, expanded and substituted build, ready for a CI engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedVariant {
    /// Run identifier (variant id plus axis values).
    pub id: EntityId,
    /// Variant this run was expanded from.
    pub variant: EntityId,
    pub template: Option<EntityId>,
    pub name: String,
    pub description: String,
    pub axis_values: Vec<AxisValue>,
    pub vcs_root: VcsRoot,
    pub params: Vec<Parameter>,
    pub steps: Vec<BuildStep>,
    pub triggers: Vec<Trigger>,
    pub artifact_rules: Vec<ArtifactRule>,
    pub requirements: Vec<Requirement>,
    /// SHA-256 of the descriptor with this field empty.
    pub fingerprint: String,
}

impl ResolvedVariant {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.value.as_str())
    }

    pub fn axis_value(&self, axis: &str) -> Option<&str> {
        self.axis_values
            .iter()
            .find(|av| av.axis == axis)
            .map(|av| av.value.as_str())
    }

    /// Compute the content fingerprint.
    pub fn compute_fingerprint(&self) -> Result<String> {
        let mut unsealed = self.clone();
        unsealed.fingerprint.clear();
        let bytes = serde_json::to_vec(&unsealed)
            .map_err(|e| Error::configuration(format!("cannot serialize '{}': {}", self.id, e)))?;
        Ok(hex::encode(Sha256::digest(&bytes)))
    }

    /// Store the content fingerprint.
    pub fn sealed(mut self) -> Result<Self> {
        self.fingerprint = self.compute_fingerprint()?;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(combination: &[AxisValue]) -> Vec<&str> {
        combination.iter().map(|av| av.value.as_str()).collect()
    }

    #[test]
    fn test_empty_matrix_yields_one_combination() {
        let matrix = Matrix::default();
        assert_eq!(matrix.len(), 1);
        let all: Vec<_> = matrix.combinations().collect();
        assert_eq!(all, vec![Vec::<AxisValue>::new()]);
    }

    #[test]
    fn test_cartesian_order() {
        let matrix = Matrix::new(vec![
            MatrixAxis::new("java", ["17", "21"]),
            MatrixAxis::new("os", ["linux", "windows", "mac"]),
        ])
        .unwrap();
        let all: Vec<_> = matrix.combinations().collect();
        assert_eq!(all.len(), 6);
        assert_eq!(values(&all[0]), ["17", "linux"]);
        assert_eq!(values(&all[1]), ["17", "windows"]);
        assert_eq!(values(&all[2]), ["17", "mac"]);
        assert_eq!(values(&all[3]), ["21", "linux"]);
        assert_eq!(values(&all[5]), ["21", "mac"]);
    }

    #[test]
    fn test_combinations_restart() {
        let matrix = Matrix::new(vec![MatrixAxis::new("java", ["17", "21", "23"])]).unwrap();
        let first: Vec<_> = matrix.combinations().collect();
        let second: Vec<_> = matrix.combinations().collect();
        assert_eq!(first, second);
        assert_eq!(matrix.combinations().len(), 3);
    }

    #[test]
    fn test_invalid_matrices() {
        assert!(Matrix::new(vec![MatrixAxis::new("java", Vec::<String>::new())]).is_err());
        assert!(Matrix::new(vec![MatrixAxis::new("java", ["17", "17"])]).is_err());
        assert!(
            Matrix::new(vec![
                MatrixAxis::new("java", ["17"]),
                MatrixAxis::new("java", ["21"]),
            ])
            .is_err()
        );
        assert!(Matrix::new(vec![MatrixAxis::new("${x}", ["1"])]).is_err());
    }

    #[test]
    fn test_oversized_matrix_rejected() {
        let axes: Vec<MatrixAxis> = (0..20)
            .map(|i| MatrixAxis::new(format!("a{}", i), (0..10).map(|v| v.to_string())))
            .collect();
        let err = Matrix::new(axes).unwrap_err();
        assert!(matches!(err, Error::Configuration(ref m) if m.contains("too many")));

        let small: Vec<MatrixAxis> = (0..3)
            .map(|i| MatrixAxis::new(format!("a{}", i), (0..10).map(|v| v.to_string())))
            .collect();
        assert_eq!(Matrix::new(small).unwrap().len(), 1000);
    }

    #[test]
    fn test_run_id() {
        let id = EntityId::new("JavaBuild").unwrap();
        assert_eq!(run_id(&id, &[]), id);
        let combo = vec![AxisValue {
            axis: "rust".to_string(),
            value: "1.70".to_string(),
        }];
        assert_eq!(run_id(&id, &combo).as_str(), "JavaBuild_rust_1_70");
    }
}
