// Copyright (c) 2025 - Cowboy AI, Inc.
//! Topology Configuration
//!
//! One explicit, immutable configuration value handed to
//! [`TopologyComposer`](crate::composer::TopologyComposer). It is validated once
//! when the composer is constructed and never re-read during a run.
//!
//! # Environment
//!
//! [`TopologyConfig::from_env`] reads the same variables the deployment
//! tooling has always used:
//!
//! | Variable              | Meaning                                        |
//! |-----------------------|------------------------------------------------|
//! | `CDK_DEPLOY_REGIONS`  | comma-separated regions (else `CDK_DEFAULT_REGION`) |
//! | `ENVIRONMENTS`        | comma-separated environments (default `dev`)   |
//! | `PLATFORMS`           | comma-separated platform tokens                |
//! | `APP_NAME`            | application name, identifier prefix            |
//! | `ECR_REPOSITORY_NAME` | registry base name                             |
//! | `IMAGE_VERSION`       | image tag (default `latest`)                   |
//! | `APP_ROOT_FILE_PATH`  | container mount path                           |
//! | `EFS_ROOT_FILE_PATH`  | storage access point root (default `/`)        |
//! | `PORT`                | service port                                   |
//! | `SOURCE_IMAGE`        | public source repository (default `qdrant/qdrant`) |
//! | `PROMOTE_IMAGE`       | `true`/`false`, copy into a private registry   |

use serde::{Deserialize, Serialize};

use crate::domain::naming::validate_token;
use crate::domain::{AddressBlock, ImageTag, LATEST_TAG};
use crate::errors::ConfigurationError;
use crate::graph::compute::{validate_task_size, DEFAULT_TASK_CPU, DEFAULT_TASK_MEMORY_MIB};
use crate::graph::network::{
    DEFAULT_ADDRESS_BLOCK, DEFAULT_AVAILABILITY_ZONES, DEFAULT_SUBNET_MASK, MAX_AVAILABILITY_ZONES,
};
use crate::graph::registry::{
    RegistryEncryption, DEFAULT_MAX_IMAGE_COUNT, DEFAULT_MAX_UNTAGGED_AGE_DAYS,
    DEFAULT_SOURCE_IMAGE,
};
use crate::graph::rollout::{
    TrafficShift, DEFAULT_DEPLOYMENT_TIMEOUT_MINUTES, DEFAULT_DEREGISTRATION_DELAY_SECS,
    DEFAULT_LISTENER_PORT, DEFAULT_TERMINATION_WAIT_MINUTES, DEFAULT_TEST_LISTENER_PORT,
};
use crate::graph::storage::{DEFAULT_INFREQUENT_ACCESS_AFTER_DAYS, STORAGE_PROTOCOL_PORT};

/// Longest drain window accepted by the load balancer
pub const MAX_DEREGISTRATION_DELAY_SECS: u64 = 3600;

/// Longest wait or timeout accepted by the deployment controller (two days)
pub const MAX_DEPLOYMENT_WAIT_MINUTES: u32 = 2880;

/// Complete topology configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopologyConfig {
    /// Region tokens, in deployment order
    pub regions: Vec<String>,

    /// Environment tokens, in deployment order
    pub environments: Vec<String>,

    /// Platform tokens (`LINUX_AMD64`, `LINUX_ARM64`)
    pub platforms: Vec<String>,

    /// Application name, descriptive prefix of every identifier
    pub app_name: String,

    /// Base name of the private image repositories
    pub registry_base_name: String,

    /// Image version to deploy
    #[serde(default = "default_image_version")]
    pub image_version: String,

    /// Absolute path the shared volume is mounted at inside the container
    pub application_root_path: String,

    /// Port the service listens on
    pub service_port: u16,

    #[serde(default)]
    pub registry: RegistrySettings,

    #[serde(default)]
    pub network: NetworkSettings,

    #[serde(default)]
    pub storage: StorageSettings,

    #[serde(default)]
    pub compute: ComputeSettings,

    #[serde(default)]
    pub rollout: RolloutPolicy,
}

fn default_image_version() -> String {
    LATEST_TAG.to_string()
}

/// Image registry settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrySettings {
    /// Public repository images are promoted from
    pub source_image: String,

    /// Copy the image into a private per-unit repository; when false the
    /// compute tier pulls from the source repository directly
    pub promote: bool,

    pub encryption: RegistryEncryption,

    /// Days an untagged image is kept
    pub max_untagged_age_days: u32,

    /// Images kept regardless of tag
    pub max_image_count: u32,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            source_image: DEFAULT_SOURCE_IMAGE.to_string(),
            promote: true,
            encryption: RegistryEncryption::default(),
            max_untagged_age_days: DEFAULT_MAX_UNTAGGED_AGE_DAYS,
            max_image_count: DEFAULT_MAX_IMAGE_COUNT,
        }
    }
}

/// Network settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkSettings {
    pub address_block: AddressBlock,
    pub availability_zones: u8,
    pub subnet_mask: u8,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            address_block: DEFAULT_ADDRESS_BLOCK,
            availability_zones: DEFAULT_AVAILABILITY_ZONES,
            subnet_mask: DEFAULT_SUBNET_MASK,
        }
    }
}

/// Shared storage settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Root directory exposed through the access point
    pub root_path: String,

    /// Keep the volume when the unit is torn down
    pub retain_on_teardown: bool,

    /// Days before files move to the infrequent-access class
    pub infrequent_access_after_days: u32,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            root_path: "/".to_string(),
            retain_on_teardown: true,
            infrequent_access_after_days: DEFAULT_INFREQUENT_ACCESS_AFTER_DAYS,
        }
    }
}

/// Task sizing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComputeSettings {
    /// CPU units (1024 = one vCPU)
    pub cpu: u32,
    pub memory_mib: u32,
    pub desired_count: u32,
}

impl Default for ComputeSettings {
    fn default() -> Self {
        Self {
            cpu: DEFAULT_TASK_CPU,
            memory_mib: DEFAULT_TASK_MEMORY_MIB,
            desired_count: 1,
        }
    }
}

/// Rollout policy of the load-balanced front end
///
/// Releases are blue/green: the replacement task set registers into the
/// idle target group, is reachable on the test listener, then production
/// traffic shifts over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RolloutPolicy {
    pub listener_port: u16,

    /// Listener serving the replacement task set before traffic shifts
    pub test_listener_port: u16,

    /// Drain window before a replaced task leaves rotation
    pub deregistration_delay_secs: u64,

    pub health_check_path: String,

    pub traffic_shift: TrafficShift,

    /// Minutes the original task set survives after a successful shift
    pub termination_wait_minutes: u32,

    pub deployment_timeout_minutes: u32,
}

impl Default for RolloutPolicy {
    fn default() -> Self {
        Self {
            listener_port: DEFAULT_LISTENER_PORT,
            test_listener_port: DEFAULT_TEST_LISTENER_PORT,
            deregistration_delay_secs: DEFAULT_DEREGISTRATION_DELAY_SECS,
            health_check_path: "/".to_string(),
            traffic_shift: TrafficShift::default(),
            termination_wait_minutes: DEFAULT_TERMINATION_WAIT_MINUTES,
            deployment_timeout_minutes: DEFAULT_DEPLOYMENT_TIMEOUT_MINUTES,
        }
    }
}

impl TopologyConfig {
    /// Create a configuration with empty axes and default tuning
    pub fn new(
        app_name: impl Into<String>,
        registry_base_name: impl Into<String>,
        application_root_path: impl Into<String>,
        service_port: u16,
    ) -> Self {
        Self {
            regions: Vec::new(),
            environments: Vec::new(),
            platforms: Vec::new(),
            app_name: app_name.into(),
            registry_base_name: registry_base_name.into(),
            image_version: default_image_version(),
            application_root_path: application_root_path.into(),
            service_port,
            registry: RegistrySettings::default(),
            network: NetworkSettings::default(),
            storage: StorageSettings::default(),
            compute: ComputeSettings::default(),
            rollout: RolloutPolicy::default(),
        }
    }

    pub fn with_regions<I, S>(mut self, regions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.regions = regions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_environments<I, S>(mut self, environments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.environments = environments.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_platforms<I, S>(mut self, platforms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.platforms = platforms.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_image_version(mut self, image_version: impl Into<String>) -> Self {
        self.image_version = image_version.into();
        self
    }

    /// Parsed image tag
    pub fn image_tag(&self) -> Result<ImageTag, ConfigurationError> {
        ImageTag::new(self.image_version.clone())
    }

    /// Validate every scalar setting
    ///
    /// Axis lists are checked by the environment matrix, so an empty list is
    /// reported when units are planned rather than here.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        validate_token("app name", &self.app_name)?;
        validate_token("registry base name", &self.registry_base_name)?;
        self.image_tag()?;

        if !self.application_root_path.starts_with('/') {
            return Err(ConfigurationError::RelativePath {
                field: "application root path",
                value: self.application_root_path.clone(),
            });
        }

        if !self.storage.root_path.starts_with('/') {
            return Err(ConfigurationError::RelativePath {
                field: "storage root path",
                value: self.storage.root_path.clone(),
            });
        }

        if self.service_port == 0 {
            return Err(ConfigurationError::InvalidPort(self.service_port.to_string()));
        }

        // The storage boundary admits the service port from the whole network
        if self.service_port == STORAGE_PROTOCOL_PORT {
            return Err(ConfigurationError::InvalidSetting {
                key: "service_port",
                reason: format!("{} is reserved for shared volume mounts", STORAGE_PROTOCOL_PORT),
            });
        }

        for port in [self.rollout.listener_port, self.rollout.test_listener_port] {
            if port == 0 {
                return Err(ConfigurationError::InvalidPort(port.to_string()));
            }
        }

        if self.rollout.test_listener_port == self.rollout.listener_port {
            return Err(ConfigurationError::InvalidSetting {
                key: "rollout.test_listener_port",
                reason: "must differ from listener_port".to_string(),
            });
        }

        if self.registry.source_image.trim().is_empty() {
            return Err(ConfigurationError::Missing("source image"));
        }

        if self.registry.max_image_count == 0 {
            return Err(ConfigurationError::InvalidSetting {
                key: "registry.max_image_count",
                reason: "must keep at least one image".to_string(),
            });
        }

        validate_task_size(self.compute.cpu, self.compute.memory_mib)?;

        if self.compute.desired_count == 0 {
            return Err(ConfigurationError::InvalidSetting {
                key: "compute.desired_count",
                reason: "must run at least one task".to_string(),
            });
        }

        let zones = self.network.availability_zones;
        if !(1..=MAX_AVAILABILITY_ZONES).contains(&zones) {
            return Err(ConfigurationError::InvalidSetting {
                key: "network.availability_zones",
                reason: format!("{} is outside 1-{}", zones, MAX_AVAILABILITY_ZONES),
            });
        }

        let block = &self.network.address_block;
        let available = block.subnet_count(self.network.subnet_mask);
        if self.network.subnet_mask > 28 || available < 2 * u64::from(zones) {
            return Err(ConfigurationError::InvalidSetting {
                key: "network.subnet_mask",
                reason: format!(
                    "{} cannot hold {} /{} subnets",
                    block,
                    2 * zones,
                    self.network.subnet_mask
                ),
            });
        }

        if self.rollout.deregistration_delay_secs > MAX_DEREGISTRATION_DELAY_SECS {
            return Err(ConfigurationError::InvalidSetting {
                key: "rollout.deregistration_delay_secs",
                reason: format!("must not exceed {}", MAX_DEREGISTRATION_DELAY_SECS),
            });
        }

        if self.rollout.termination_wait_minutes > MAX_DEPLOYMENT_WAIT_MINUTES {
            return Err(ConfigurationError::InvalidSetting {
                key: "rollout.termination_wait_minutes",
                reason: format!("must not exceed {}", MAX_DEPLOYMENT_WAIT_MINUTES),
            });
        }

        if !(1..=MAX_DEPLOYMENT_WAIT_MINUTES).contains(&self.rollout.deployment_timeout_minutes) {
            return Err(ConfigurationError::InvalidSetting {
                key: "rollout.deployment_timeout_minutes",
                reason: format!("must be between 1 and {}", MAX_DEPLOYMENT_WAIT_MINUTES),
            });
        }

        self.rollout.traffic_shift.validate()?;

        Ok(())
    }

    /// Load configuration from a key lookup
    ///
    /// Required keys mirror the deployment tooling: `APP_NAME`,
    /// `ECR_REPOSITORY_NAME`, `APP_ROOT_FILE_PATH` and `PORT`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigurationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let require = |key: &'static str| get(key).ok_or(ConfigurationError::Missing(key));

        let app_name = require("APP_NAME")?;
        let registry_base_name = require("ECR_REPOSITORY_NAME")?;
        let application_root_path = require("APP_ROOT_FILE_PATH")?;

        let port = require("PORT")?;
        let service_port = port
            .trim()
            .parse::<u16>()
            .map_err(|_| ConfigurationError::InvalidPort(port.clone()))?;

        let regions = get("CDK_DEPLOY_REGIONS")
            .map(|value| split_list(&value))
            .or_else(|| get("CDK_DEFAULT_REGION").map(|region| vec![region.trim().to_string()]))
            .unwrap_or_default();

        let environments = get("ENVIRONMENTS")
            .map(|value| split_list(&value))
            .unwrap_or_else(|| vec!["dev".to_string()]);

        let platforms = get("PLATFORMS")
            .map(|value| split_list(&value))
            .unwrap_or_default();

        let mut config = Self::new(app_name, registry_base_name, application_root_path, service_port)
            .with_regions(regions)
            .with_environments(environments)
            .with_platforms(platforms);

        if let Some(version) = get("IMAGE_VERSION") {
            config.image_version = version.trim().to_string();
        }

        if let Some(root) = get("EFS_ROOT_FILE_PATH") {
            config.storage.root_path = root;
        }

        if let Some(source) = get("SOURCE_IMAGE") {
            config.registry.source_image = source;
        }

        if let Some(promote) = get("PROMOTE_IMAGE") {
            config.registry.promote = match promote.trim() {
                "true" | "1" | "yes" => true,
                "false" | "0" | "no" => false,
                other => {
                    return Err(ConfigurationError::InvalidSetting {
                        key: "PROMOTE_IMAGE",
                        reason: format!("{:?} is not a boolean", other),
                    })
                }
            };
        }

        Ok(config)
    }

    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigurationError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config() -> TopologyConfig {
        TopologyConfig::new("qdrant", "qdrant-images", "/qdrant/storage", 6333)
            .with_regions(["us-east-1"])
            .with_environments(["dev"])
            .with_platforms(["LINUX_AMD64"])
    }

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = config();
        assert!(config.validate().is_ok());
        assert_eq!(config.image_version, "latest");
        assert_eq!(config.rollout.deregistration_delay_secs, 30);
        assert_eq!(config.network.availability_zones, 3);
        assert_eq!(config.rollout.test_listener_port, 9002);
        assert_eq!(config.rollout.traffic_shift, TrafficShift::AllAtOnce);
    }

    #[test]
    fn test_relative_paths_rejected() {
        let mut config = config();
        config.application_root_path = "qdrant/storage".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::RelativePath { .. })
        ));

        let mut config = self::config();
        config.storage.root_path = "data".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_scalars_rejected() {
        let mut zero_port = config();
        zero_port.service_port = 0;
        assert!(matches!(
            zero_port.validate(),
            Err(ConfigurationError::InvalidPort(_))
        ));

        assert!(config().with_image_version("bad tag").validate().is_err());

        let mut odd_size = config();
        odd_size.compute.memory_mib = 3000;
        assert!(matches!(
            odd_size.validate(),
            Err(ConfigurationError::InvalidTaskSize { .. })
        ));

        let mut crowded = config();
        crowded.network.address_block = AddressBlock::new("10.0.0.0/24").unwrap();
        assert!(crowded.validate().is_err());

        let mut long_drain = config();
        long_drain.rollout.deregistration_delay_secs = 7200;
        assert!(long_drain.validate().is_err());

        let mut shared_listener = config();
        shared_listener.rollout.test_listener_port = shared_listener.rollout.listener_port;
        assert!(matches!(
            shared_listener.validate(),
            Err(ConfigurationError::InvalidSetting { key: "rollout.test_listener_port", .. })
        ));

        let mut eager_shift = config();
        eager_shift.rollout.traffic_shift = TrafficShift::Canary {
            percent: 100,
            interval_minutes: 5,
        };
        assert!(eager_shift.validate().is_err());
    }

    #[test]
    fn test_storage_protocol_port_is_not_a_service_port() {
        let config = TopologyConfig::new("qdrant", "qdrant-images", "/qdrant/storage", 2049)
            .with_regions(["us-east-1"])
            .with_environments(["dev"])
            .with_platforms(["LINUX_AMD64"]);

        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::InvalidSetting { key: "service_port", .. })
        ));
    }

    #[test]
    fn test_from_lookup() {
        let config = TopologyConfig::from_lookup(lookup(&[
            ("APP_NAME", "qdrant"),
            ("ECR_REPOSITORY_NAME", "qdrant-images"),
            ("APP_ROOT_FILE_PATH", "/qdrant/storage"),
            ("PORT", "6333"),
            ("CDK_DEPLOY_REGIONS", "eu-west-1, us-east-1"),
            ("ENVIRONMENTS", "dev,prod"),
            ("PLATFORMS", "linux/amd64,linux/arm64"),
            ("IMAGE_VERSION", "1.9.0"),
            ("EFS_ROOT_FILE_PATH", "/data"),
            ("PROMOTE_IMAGE", "false"),
        ]))
        .unwrap();

        assert_eq!(config.regions, vec!["eu-west-1", "us-east-1"]);
        assert_eq!(config.environments, vec!["dev", "prod"]);
        assert_eq!(config.platforms, vec!["linux/amd64", "linux/arm64"]);
        assert_eq!(config.image_version, "1.9.0");
        assert_eq!(config.storage.root_path, "/data");
        assert_eq!(config.service_port, 6333);
        assert!(!config.registry.promote);
    }

    #[test]
    fn test_from_lookup_defaults() {
        let config = TopologyConfig::from_lookup(lookup(&[
            ("APP_NAME", "qdrant"),
            ("ECR_REPOSITORY_NAME", "qdrant-images"),
            ("APP_ROOT_FILE_PATH", "/qdrant/storage"),
            ("PORT", "6333"),
            ("CDK_DEFAULT_REGION", "us-west-2"),
        ]))
        .unwrap();

        assert_eq!(config.regions, vec!["us-west-2"]);
        assert_eq!(config.environments, vec!["dev"]);
        assert!(config.platforms.is_empty());
        assert_eq!(config.image_version, "latest");
        assert!(config.registry.promote);
    }

    #[test]
    fn test_from_lookup_missing_and_invalid() {
        assert_eq!(
            TopologyConfig::from_lookup(lookup(&[("APP_NAME", "qdrant")])),
            Err(ConfigurationError::Missing("ECR_REPOSITORY_NAME"))
        );

        assert!(matches!(
            TopologyConfig::from_lookup(lookup(&[
                ("APP_NAME", "qdrant"),
                ("ECR_REPOSITORY_NAME", "qdrant-images"),
                ("APP_ROOT_FILE_PATH", "/qdrant/storage"),
                ("PORT", "http"),
            ])),
            Err(ConfigurationError::InvalidPort(_))
        ));
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: TopologyConfig = serde_json::from_str(
            r#"{
                "regions": ["us-east-1"],
                "environments": ["prod"],
                "platforms": ["LINUX_ARM64"],
                "app_name": "qdrant",
                "registry_base_name": "qdrant-images",
                "application_root_path": "/qdrant/storage",
                "service_port": 6333,
                "network": { "availability_zones": 2 }
            }"#,
        )
        .unwrap();

        assert_eq!(config.image_version, "latest");
        assert_eq!(config.network.availability_zones, 2);
        assert_eq!(config.network.subnet_mask, 24);
        assert!(config.validate().is_ok());
    }
}
