//! Identity of a tag binding.

use std::fmt;

use crate::error::CoreError;
use crate::validation::{validate_repository_path, validate_tag_name};

/// The `(namespace, repository, tag_name)` triple a tag row is keyed on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TagKey {
    pub namespace: String,
    pub repository: String,
    pub tag_name: String,
}

impl TagKey {
    pub fn new(
        namespace: impl Into<String>,
        repository: impl Into<String>,
        tag_name: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            repository: repository.into(),
            tag_name: tag_name.into(),
        }
    }

    /// Check every component against the naming rules.
    pub fn validate(&self) -> Result<(), CoreError> {
        validate_repository_path("namespace", &self.namespace)?;
        validate_repository_path("repository", &self.repository)?;
        validate_tag_name(&self.tag_name)
    }

    /// String fed to `hashtextextended` for the per-key advisory lock.
    ///
    /// Components are joined with `:`, which validation forbids in all three,
    /// so distinct valid keys never collapse to the same string.
    pub fn lock_key(&self) -> String {
        format!("{}:{}:{}", self.namespace, self.repository, self.tag_name)
    }
}

impl fmt::Display for TagKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}:{}", self.namespace, self.repository, self.tag_name)
    }
}
