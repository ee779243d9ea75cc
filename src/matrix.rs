// Copyright (c) 2025 - Cowboy AI, Inc.
//! Environment Matrix
//!
//! Expands regions × environments × platforms into deployment units,
//! region-major, then environment, then platform. Duplicate tokens keep
//! their first occurrence, so the result never holds two equal units.

use std::collections::HashSet;

use crate::domain::{Axis, DeploymentUnit, Platform};
use crate::errors::ConfigurationError;

/// Cross-product of the deployment axes
pub struct EnvironmentMatrix;

impl EnvironmentMatrix {
    /// Expand the axes into units
    ///
    /// # Errors
    /// - `EmptyAxis` if any list is empty
    /// - `UnrecognizedPlatform` for a platform token outside the supported set
    pub fn expand<R, E, P>(
        regions: &[R],
        environments: &[E],
        platforms: &[P],
    ) -> Result<Vec<DeploymentUnit>, ConfigurationError>
    where
        R: AsRef<str>,
        E: AsRef<str>,
        P: AsRef<str>,
    {
        let regions = distinct(regions, Axis::Region)?;
        let environments = distinct(environments, Axis::Environment)?;

        if platforms.is_empty() {
            return Err(ConfigurationError::EmptyAxis {
                axis: Axis::Platform,
            });
        }
        let mut seen = HashSet::new();
        let mut canonical = Vec::with_capacity(platforms.len());
        for token in platforms {
            let platform = Platform::parse(token.as_ref())?;
            if seen.insert(platform) {
                canonical.push(platform);
            }
        }

        let mut units =
            Vec::with_capacity(regions.len() * environments.len() * canonical.len());
        for region in &regions {
            for environment in &environments {
                for platform in &canonical {
                    units.push(DeploymentUnit::new(*region, *environment, platform.token()));
                }
            }
        }

        Ok(units)
    }
}

fn distinct<T: AsRef<str>>(values: &[T], axis: Axis) -> Result<Vec<&str>, ConfigurationError> {
    if values.is_empty() {
        return Err(ConfigurationError::EmptyAxis { axis });
    }
    let mut seen = HashSet::new();
    Ok(values
        .iter()
        .map(AsRef::as_ref)
        .filter(|value| seen.insert(*value))
        .collect())
}
