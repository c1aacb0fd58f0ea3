use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Opaque identifier of the user or session that created a mapping.
///
/// The core performs no credential validation; an empty id stands for an
/// anonymous creator.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The owner of mappings created without an identity.
    pub fn anonymous() -> Self {
        Self(String::new())
    }

    pub fn is_anonymous(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for OwnerId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl Display for OwnerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_anonymous() {
            return f.write_str("<anonymous>");
        }
        f.write_str(&self.0)
    }
}
