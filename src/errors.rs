// Copyright (c) 2025 - Cowboy AI, Inc.
//! Error types for topology composition
//!
//! Errors are resolved at deployment-unit granularity: a failing unit is
//! reported with its axis triple and the sub-builder that rejected it, while
//! the remaining units keep being planned and emitted.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::domain::{Axis, DeploymentUnit, ResourceIdentifier, ResourceKind};
use crate::state_machine::TransitionError;

/// Invalid or missing configuration
///
/// Always fatal for the affected unit (or for the whole run when an axis list
/// itself is unusable) and always reported before any graph is built.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("No {axis} configured")]
    EmptyAxis { axis: Axis },

    #[error("Unrecognized platform token: {0:?} (expected LINUX_AMD64 or LINUX_ARM64)")]
    UnrecognizedPlatform(String),

    #[error("Invalid {field} {value:?}: {reason}")]
    InvalidToken {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("Required setting {0} is not set")]
    Missing(&'static str),

    #[error("{field} must be an absolute path: {value:?}")]
    RelativePath { field: &'static str, value: String },

    #[error("Invalid port: {0:?}")]
    InvalidPort(String),

    #[error("Invalid image tag: {0:?}")]
    InvalidImageTag(String),

    #[error("Invalid address block: {0}")]
    InvalidAddressBlock(String),

    #[error("Identifier for {kind} cannot fit within {max} characters")]
    IdentifierTooLong { kind: ResourceKind, max: usize },

    #[error("Unsupported task size: {cpu} CPU units with {memory_mib} MiB")]
    InvalidTaskSize { cpu: u32, memory_mib: u32 },

    #[error("Invalid setting {key}: {reason}")]
    InvalidSetting { key: &'static str, reason: String },
}

/// Sub-builder (or composition step) a failure is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Naming,
    Registry,
    Network,
    Storage,
    Compute,
    Rollout,
    Assembly,
    Emission,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Naming => "naming",
            Self::Registry => "registry",
            Self::Network => "network",
            Self::Storage => "storage",
            Self::Compute => "compute",
            Self::Rollout => "rollout",
            Self::Assembly => "assembly",
            Self::Emission => "emission",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised while building or emitting a resource graph
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TopologyError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// A sub-builder ran before the graph it depends on existed
    #[error("Ordering violation in {stage}: {reason}")]
    OrderingViolation { stage: Stage, reason: String },

    /// Two resources resolved to the same identifier
    #[error("Identifier collision on {identifier}: {first} and {second}")]
    IdentifierCollision {
        identifier: ResourceIdentifier,
        first: ResourceKind,
        second: ResourceKind,
    },

    /// A cross-spec invariant does not hold for a built graph
    #[error("Invariant violated in {stage}: {reason}")]
    Invariant { stage: Stage, reason: String },

    /// Unit lifecycle transition rejected
    #[error("Lifecycle error: {0}")]
    Lifecycle(#[from] TransitionError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl TopologyError {
    pub(crate) fn ordering(stage: Stage, reason: impl Into<String>) -> Self {
        Self::OrderingViolation {
            stage,
            reason: reason.into(),
        }
    }

    pub(crate) fn invariant(stage: Stage, reason: impl Into<String>) -> Self {
        Self::Invariant {
            stage,
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for TopologyError {
    fn from(err: serde_json::Error) -> Self {
        TopologyError::Serialization(err.to_string())
    }
}

/// Result type for topology operations
pub type TopologyResult<T> = Result<T, TopologyError>;

/// Failure of a single deployment unit
///
/// Carries the axis combination and the stage that failed so the
/// configuration can be corrected and the whole composition rerun.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Unit {unit} failed in {stage}: {source}")]
pub struct UnitError {
    pub unit: DeploymentUnit,
    pub stage: Stage,
    #[source]
    pub source: TopologyError,
}

impl UnitError {
    pub fn new(unit: DeploymentUnit, stage: Stage, source: impl Into<TopologyError>) -> Self {
        Self {
            unit,
            stage,
            source: source.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_error_names_the_triple_and_stage() {
        let unit = DeploymentUnit::new("us-east-1", "prod", "LINUX_MIPS");
        let err = UnitError::new(
            unit,
            Stage::Compute,
            ConfigurationError::UnrecognizedPlatform("LINUX_MIPS".to_string()),
        );

        let message = err.to_string();
        assert!(message.contains("us-east-1/prod/LINUX_MIPS"));
        assert!(message.contains("compute"));
        assert!(message.contains("LINUX_MIPS"));
    }

    #[test]
    fn test_serde_error_conversion() {
        let err: TopologyError = serde_json::from_str::<u32>("not json").unwrap_err().into();
        assert!(matches!(err, TopologyError::Serialization(_)));
    }
}
