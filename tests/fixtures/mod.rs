// Copyright (c) 2025 - Cowboy AI, Inc.
//! Test Fixtures for qdrant-topology
//!
//! Provides deterministic configurations for composition tests.
//!
//! # Design Principles
//! - Every configuration starts from [`base_config`]
//! - Axis values are fixed constants so runs are reproducible
//! - Tests adjust one field at a time on top of a fixture

#![allow(dead_code)]

use std::collections::HashMap;

use qdrant_topology::{DeploymentUnit, TopologyComposer, TopologyConfig};

pub const APP_NAME: &str = "qdrant";
pub const REGISTRY_BASE_NAME: &str = "qdrant-images";
pub const APP_ROOT_PATH: &str = "/qdrant/storage";
pub const SERVICE_PORT: u16 = 6333;
pub const PINNED_VERSION: &str = "1.9.0";

/// Configuration with default tuning and empty axes
pub fn base_config() -> TopologyConfig {
    TopologyConfig::new(APP_NAME, REGISTRY_BASE_NAME, APP_ROOT_PATH, SERVICE_PORT)
}

/// One region, one environment, one platform, pinned version
pub fn single_unit_config() -> TopologyConfig {
    base_config()
        .with_regions(["us-east-1"])
        .with_environments(["prod"])
        .with_platforms(["LINUX_AMD64"])
        .with_image_version(PINNED_VERSION)
}

/// Two regions, two environments, both platforms
pub fn full_matrix_config() -> TopologyConfig {
    base_config()
        .with_regions(["eu-west-1", "us-east-1"])
        .with_environments(["dev", "prod"])
        .with_platforms(["LINUX_AMD64", "LINUX_ARM64"])
        .with_image_version(PINNED_VERSION)
}

pub fn composer(config: TopologyConfig) -> TopologyComposer {
    TopologyComposer::new(config).expect("fixture configuration is valid")
}

pub fn prod_amd64_unit() -> DeploymentUnit {
    DeploymentUnit::new("us-east-1", "prod", "LINUX_AMD64")
}

/// Environment lookup mirroring the deployment tooling's variables
pub fn env_lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key: &str| vars.get(key).cloned()
}

pub const REQUIRED_ENV: [(&str, &str); 4] = [
    ("APP_NAME", APP_NAME),
    ("ECR_REPOSITORY_NAME", REGISTRY_BASE_NAME),
    ("APP_ROOT_FILE_PATH", APP_ROOT_PATH),
    ("PORT", "6333"),
];
