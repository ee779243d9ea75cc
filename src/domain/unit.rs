// Copyright (c) 2025 - Cowboy AI, Inc.
//! Deployment Unit Value Object
//!
//! One (region, environment, platform) combination. Every unit owns a fully
//! independent resource graph; nothing is shared between units.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::naming::validate_token;
use super::platform::Platform;
use crate::errors::ConfigurationError;

/// Deployment matrix axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    Region,
    Environment,
    Platform,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Region => write!(f, "regions"),
            Self::Environment => write!(f, "environments"),
            Self::Platform => write!(f, "platforms"),
        }
    }
}

/// Deployment unit
///
/// Units produced by [`EnvironmentMatrix`](crate::matrix::EnvironmentMatrix)
/// carry the canonical platform token. Units built by hand are validated
/// lazily: the naming scheme rejects unsafe region/environment tokens and the
/// compute builder rejects unknown platforms.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeploymentUnit {
    region: String,
    environment: String,
    platform: String,
}

impl DeploymentUnit {
    pub fn new(
        region: impl Into<String>,
        environment: impl Into<String>,
        platform: impl Into<String>,
    ) -> Self {
        Self {
            region: region.into(),
            environment: environment.into(),
            platform: platform.into(),
        }
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Raw platform token
    pub fn platform_token(&self) -> &str {
        &self.platform
    }

    /// Parsed platform
    pub fn platform(&self) -> Result<Platform, ConfigurationError> {
        Platform::parse(&self.platform)
    }

    /// Check every axis value is usable in resource identifiers
    pub fn validate(&self) -> Result<Platform, ConfigurationError> {
        validate_token("region", &self.region)?;
        validate_token("environment", &self.environment)?;
        self.platform()
    }
}

impl fmt::Display for DeploymentUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.region, self.environment, self.platform)
    }
}
