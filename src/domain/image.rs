// Copyright (c) 2025 - Cowboy AI, Inc.
//! Container Image Value Objects

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::ConfigurationError;

/// The floating tag, repointed on every publish
pub const LATEST_TAG: &str = "latest";

/// Image tag
///
/// Invariants (registry tag grammar):
/// - 1-128 characters
/// - ASCII letters, digits, `_`, `.` and `-`
/// - First character is a letter, digit or `_`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ImageTag(String);

impl ImageTag {
    pub const MAX_LENGTH: usize = 128;

    pub fn new(tag: impl Into<String>) -> Result<Self, ConfigurationError> {
        let tag = tag.into();

        let first_ok = tag
            .chars()
            .next()
            .map(|c| c.is_ascii_alphanumeric() || c == '_')
            .unwrap_or(false);
        let rest_ok = tag
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'));

        if !first_ok || !rest_ok || tag.len() > Self::MAX_LENGTH {
            return Err(ConfigurationError::InvalidImageTag(tag));
        }

        Ok(Self(tag))
    }

    /// The floating `latest` tag
    pub fn latest() -> Self {
        Self(LATEST_TAG.to_string())
    }

    pub fn is_latest(&self) -> bool {
        self.0 == LATEST_TAG
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for ImageTag {
    type Error = ConfigurationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ImageTag> for String {
    fn from(tag: ImageTag) -> Self {
        tag.0
    }
}

/// Reference to an image: repository plus tag
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageRef {
    pub repository: String,
    pub tag: ImageTag,
}

impl ImageRef {
    pub fn new(repository: impl Into<String>, tag: ImageTag) -> Self {
        Self {
            repository: repository.into(),
            tag,
        }
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.repository, self.tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_tags() {
        assert!(ImageTag::new("latest").unwrap().is_latest());
        assert!(ImageTag::new("1.9.0").is_ok());
        assert!(ImageTag::new("v1.9.0-unprivileged").is_ok());
        assert!(ImageTag::new("_internal").is_ok());
    }

    #[test]
    fn test_invalid_tags() {
        assert!(ImageTag::new("").is_err());
        assert!(ImageTag::new(".hidden").is_err());
        assert!(ImageTag::new("-dash").is_err());
        assert!(ImageTag::new("1.9.0:extra").is_err());
        assert!(ImageTag::new("a".repeat(129)).is_err());
    }

    #[test]
    fn test_image_ref_display() {
        let image = ImageRef::new("qdrant/qdrant", ImageTag::new("1.9.0").unwrap());
        assert_eq!(image.to_string(), "qdrant/qdrant:1.9.0");
        assert_eq!(
            ImageRef::new("qdrant/qdrant", ImageTag::latest()).to_string(),
            "qdrant/qdrant:latest"
        );
    }
}
