//! Generated test identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Prefix of every generated test identifier.
const TEST_ID_PREFIX: &str = "Test_";

/// A unique token correlating a run, its remote artifact and its ingestion
/// record.
///
/// The identifier doubles as the artifact file name, both remotely and in
/// the staging directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TestId(String);

impl TestId {
    /// Generates a fresh identifier of the form `Test_<uuid>`.
    #[must_use]
    pub fn generate() -> Self {
        Self(format!("{TEST_ID_PREFIX}{}", Uuid::new_v4()))
    }

    /// Wraps an existing identifier, e.g. a staged file name.
    pub fn from_existing(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the identifier as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TestId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn generated_ids_are_prefixed_and_unique() {
        let ids: HashSet<_> = (0..64).map(|_| TestId::generate()).collect();
        assert_eq!(ids.len(), 64);
        assert!(ids.iter().all(|id| id.as_str().starts_with("Test_")));
    }
}
