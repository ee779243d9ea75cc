// Copyright (c) 2025 - Cowboy AI, Inc.
//! Resource Naming Scheme
//!
//! Derives identifiers of the form
//!
//! ```text
//! {prefix}-{environment}-{region}-{arch}-{kind}[-{ordinal}]-{digest}
//! ```
//!
//! The digest is a BLAKE3 hash of the untruncated inputs, so two distinct
//! (unit, kind) pairs never share an identifier even when hyphenated tokens
//! would concatenate to the same readable text.
//!
//! When an identifier exceeds the kind's length limit the readable part is
//! compacted in steps, keeping the first form that fits:
//!
//! 1. `{prefix}-{environment}-{region}-{arch}-{kind}`
//! 2. `{environment}-{region}-{arch}-{kind}`
//! 3. `{environment}-{region-short}-{arch}-{kind}` (`ap-southeast-2` becomes `as2`)
//! 4. `{environment}-{region-short}-{kind}`
//! 5. form 4 with characters dropped from the front
//!
//! The environment survives every step short of the last; the digest always does.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::resource_kind::ResourceKind;
use super::unit::DeploymentUnit;
use crate::errors::ConfigurationError;

/// Hex characters of the digest suffix
pub const DIGEST_LENGTH: usize = 8;

/// Maximum length of a single naming token
pub const MAX_TOKEN_LENGTH: usize = 63;

/// Check a token is safe to embed in identifiers
///
/// # Invariants
/// - Non-empty, at most [`MAX_TOKEN_LENGTH`] characters
/// - Lowercase ASCII letters, digits and `-` only
/// - Does not start or end with `-`
pub fn validate_token(field: &'static str, value: &str) -> Result<(), ConfigurationError> {
    let invalid = |reason: String| ConfigurationError::InvalidToken {
        field,
        value: value.to_string(),
        reason,
    };

    if value.is_empty() {
        return Err(invalid("must not be empty".to_string()));
    }

    if value.len() > MAX_TOKEN_LENGTH {
        return Err(invalid(format!(
            "exceeds {} characters",
            MAX_TOKEN_LENGTH
        )));
    }

    if let Some(ch) = value
        .chars()
        .find(|ch| !(ch.is_ascii_lowercase() || ch.is_ascii_digit() || *ch == '-'))
    {
        return Err(invalid(format!("character {:?} is not allowed", ch)));
    }

    if value.starts_with('-') || value.ends_with('-') {
        return Err(invalid("must not start or end with '-'".to_string()));
    }

    Ok(())
}

/// Deterministic resource identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceIdentifier(String);

impl ResourceIdentifier {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The trailing digest that discriminates this identifier
    pub fn digest(&self) -> &str {
        &self.0[self.0.len().saturating_sub(DIGEST_LENGTH)..]
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ResourceIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for ResourceIdentifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Naming scheme for one application
///
/// Pure and read-only; shared freely between units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingScheme {
    app_name: String,
}

impl NamingScheme {
    pub fn new(app_name: impl Into<String>) -> Result<Self, ConfigurationError> {
        let app_name = app_name.into();
        validate_token("app name", &app_name)?;
        Ok(Self { app_name })
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    /// Name the single resource of `kind` in `unit`
    pub fn name(
        &self,
        unit: &DeploymentUnit,
        kind: ResourceKind,
    ) -> Result<ResourceIdentifier, ConfigurationError> {
        compose(&self.app_name, unit, kind, None)
    }

    /// Name the `ordinal`-th resource of a repeated kind (per-zone subnets,
    /// mount targets)
    pub fn name_nth(
        &self,
        unit: &DeploymentUnit,
        kind: ResourceKind,
        ordinal: usize,
    ) -> Result<ResourceIdentifier, ConfigurationError> {
        compose(&self.app_name, unit, kind, Some(ordinal))
    }

    /// Name a resource with a different descriptive prefix
    ///
    /// Used for the image repository, which is named after the registry base
    /// name rather than the application.
    pub fn name_with_prefix(
        &self,
        prefix: &str,
        unit: &DeploymentUnit,
        kind: ResourceKind,
    ) -> Result<ResourceIdentifier, ConfigurationError> {
        validate_token("name prefix", prefix)?;
        compose(prefix, unit, kind, None)
    }
}

fn compose(
    prefix: &str,
    unit: &DeploymentUnit,
    kind: ResourceKind,
    ordinal: Option<usize>,
) -> Result<ResourceIdentifier, ConfigurationError> {
    let platform = unit.validate()?;
    let env = unit.environment();
    let region = unit.region();
    let arch = platform.slug();
    let tag = kind.tag();

    let digest = digest(&[
        prefix,
        region,
        env,
        platform.token(),
        tag,
        &ordinal.map(|n| n.to_string()).unwrap_or_default(),
    ]);

    let max = kind.max_identifier_len();
    let budget = max.saturating_sub(DIGEST_LENGTH + 1);

    let suffix = ordinal.map(|n| format!("-{}", n)).unwrap_or_default();
    let region_short = abbreviate_region(region);
    let candidates = [
        format!("{}-{}-{}-{}-{}{}", prefix, env, region, arch, tag, suffix),
        format!("{}-{}-{}-{}{}", env, region, arch, tag, suffix),
        format!("{}-{}-{}-{}{}", env, region_short, arch, tag, suffix),
        format!("{}-{}-{}{}", env, region_short, tag, suffix),
    ];

    let readable = match candidates.iter().find(|c| c.len() <= budget) {
        Some(fits) => fits.as_str(),
        None => {
            // Keep the tail: unit fields and kind discriminate
            let last = &candidates[candidates.len() - 1];
            last[last.len().saturating_sub(budget)..].trim_start_matches('-')
        }
    };

    if readable.is_empty() {
        return Err(ConfigurationError::IdentifierTooLong { kind, max });
    }

    Ok(ResourceIdentifier(format!("{}-{}", readable, digest)))
}

/// `us-east-1` to `ue1`: initials of alphabetic segments, numbers whole
fn abbreviate_region(region: &str) -> String {
    region
        .split('-')
        .filter_map(|segment| {
            if segment.chars().all(|c| c.is_ascii_digit()) {
                Some(segment)
            } else {
                segment.get(..1)
            }
        })
        .collect()
}

fn digest(parts: &[&str]) -> String {
    let mut hasher = blake3::Hasher::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update(&[0x1f]);
    }
    let hex = hasher.finalize().to_hex();
    hex.as_str()[..DIGEST_LENGTH].to_string()
}
