//! Entity identifiers.

use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::Error;

const MAX_ID_LEN: usize = 225;

/// Identifier of a VCS root, template or build variant.
///
/// Starts with an ASCII letter and continues with ASCII letters, digits or
/// underscores.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display)]
#[serde(try_from = "String", into = "String")]
#[display("{_0}")]
pub struct EntityId(String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Result<Self, Error> {
        let id = id.into();
        validate(&id)?;
        Ok(Self(id))
    }

    /// Build an identifier from arbitrary text, mapping every character that
    /// is not allowed in an identifier to `_`.
    pub fn sanitized(raw: &str) -> Self {
        let mut id: String = raw
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .take(MAX_ID_LEN)
            .collect();
        if !id.starts_with(|c: char| c.is_ascii_alphabetic()) {
            id.insert(0, 'X');
            id.truncate(MAX_ID_LEN);
        }
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn validate(id: &str) -> Result<(), Error> {
    let mut chars = id.chars();
    match chars.next() {
        None => return Err(Error::configuration("identifier must not be empty")),
        Some(first) if !first.is_ascii_alphabetic() => {
            return Err(Error::configuration(format!(
                "identifier '{}' must start with a letter",
                id
            )));
        }
        Some(_) => {}
    }
    if let Some(bad) = chars.find(|c| !c.is_ascii_alphanumeric() && *c != '_') {
        return Err(Error::configuration(format!(
            "identifier '{}' contains invalid character '{}'",
            id, bad
        )));
    }
    if id.len() > MAX_ID_LEN {
        return Err(Error::configuration(format!(
            "identifier '{}' is longer than {} characters",
            id, MAX_ID_LEN
        )));
    }
    Ok(())
}

impl TryFrom<String> for EntityId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<EntityId> for String {
    fn from(id: EntityId) -> Self {
        id.0
    }
}

impl std::str::FromStr for EntityId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for EntityId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_ids() {
        assert!(EntityId::new("SpringFrameworkVcs").is_ok());
        assert!(EntityId::new("Java17_Build").is_ok());
    }

    #[test]
    fn test_invalid_ids() {
        assert!(EntityId::new("").is_err());
        assert!(EntityId::new("17Build").is_err());
        assert!(EntityId::new("java-build").is_err());
        assert!(EntityId::new("a".repeat(226)).is_err());
    }

    #[test]
    fn test_sanitized() {
        assert_eq!(EntityId::sanitized("Build_rust_1.70").as_str(), "Build_rust_1_70");
        assert_eq!(EntityId::sanitized("1.70").as_str(), "X1_70");
    }

    #[test]
    fn test_serde_rejects_invalid() {
        let parsed: Result<EntityId, _> = serde_json::from_str("\"not valid\"");
        assert!(parsed.is_err());
        let parsed: EntityId = serde_json::from_str("\"Valid\"").unwrap();
        assert_eq!(parsed.to_string(), "Valid");
    }
}
