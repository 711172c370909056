//! Canonical object identifiers.
//!
//! Storage keys and catalog file references name the same object in two
//! different encodings:
//!
//! - storage: `<root>/.../time-bucket=<id>/<writer>+<partition>+<file>.orc`
//! - catalog: `<partition>+<file>+<suffix...>`
//!
//! Both are reduced to `<partition>+<file>`.

use std::fmt;

use thiserror::Error;

/// Separator between identifier components.
pub const COMPONENT_DELIMITER: char = '+';

/// Normalized key of one storage object.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Identifier(String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    #[error("'{raw}' has {found} '+'-separated components, expected at least {expected}")]
    TooFewComponents {
        raw: String,
        expected: usize,
        found: usize,
    },

    #[error("storage key '{key}' does not end with '{extension}'")]
    MissingExtension { key: String, extension: String },
}

impl Identifier {
    /// Normalize a storage object key.
    ///
    /// The last path segment loses `extension` and must carry at least three
    /// components; the second and third form the identifier.
    pub fn from_storage_key(key: &str, extension: &str) -> Result<Self, IdentifierError> {
        let file_name = key.rsplit('/').next().unwrap_or(key);
        let stem = file_name
            .strip_suffix(extension)
            .ok_or_else(|| IdentifierError::MissingExtension {
                key: key.to_string(),
                extension: extension.to_string(),
            })?;

        Self::from_components(stem, 1)
    }

    /// Normalize a catalog file reference; the first two components form the identifier.
    pub fn from_catalog_reference(raw: &str) -> Result<Self, IdentifierError> {
        Self::from_components(raw, 0)
    }

    fn from_components(raw: &str, skip: usize) -> Result<Self, IdentifierError> {
        let components: Vec<&str> = raw.split(COMPONENT_DELIMITER).collect();
        match components.get(skip..skip + 2) {
            Some([partition, file]) => Ok(Self(format!("{partition}{COMPONENT_DELIMITER}{file}"))),
            _ => Err(IdentifierError::TooFewComponents {
                raw: raw.to_string(),
                expected: skip + 2,
                found: components.len(),
            }),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
