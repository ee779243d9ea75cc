// Copyright (c) 2025 - Cowboy AI, Inc.
//! Access Boundaries and Role Scoping
//!
//! Roles carry explicit grants naming the exact resource identifier they
//! apply to. There are no wildcard grants: a role can only act on resources
//! of its own unit.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::domain::{AddressBlock, ResourceIdentifier};

/// Service allowed to assume a role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServicePrincipal {
    /// Network flow-audit delivery
    FlowLogs,
    /// Container tasks
    ContainerTasks,
}

/// Provider-neutral permission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// Create streams and put events into a log sink
    LogWrite,
    /// Pull image layers from a repository
    ImagePull,
    /// Mount a shared volume
    StorageMount,
    /// Read from a mounted volume
    StorageRead,
    /// Write to a mounted volume
    StorageWrite,
    /// Describe volume and mount targets
    StorageDescribe,
}

/// Permissions on one resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    pub resource: ResourceIdentifier,
    pub permissions: BTreeSet<Permission>,
}

/// Least-privilege role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSpec {
    pub id: ResourceIdentifier,
    pub assumed_by: ServicePrincipal,
    pub grants: Vec<Grant>,
}

impl RoleSpec {
    pub fn new(id: ResourceIdentifier, assumed_by: ServicePrincipal) -> Self {
        Self {
            id,
            assumed_by,
            grants: Vec::new(),
        }
    }

    /// Add permissions on `resource`, merging with an existing grant
    pub fn grant<I>(mut self, resource: &ResourceIdentifier, permissions: I) -> Self
    where
        I: IntoIterator<Item = Permission>,
    {
        match self.grants.iter_mut().find(|g| &g.resource == resource) {
            Some(existing) => existing.permissions.extend(permissions),
            None => self.grants.push(Grant {
                resource: resource.clone(),
                permissions: permissions.into_iter().collect(),
            }),
        }
        self
    }

    /// Resources this role can act on
    pub fn scope(&self) -> BTreeSet<&ResourceIdentifier> {
        self.grants.iter().map(|g| &g.resource).collect()
    }

    pub fn permits(&self, resource: &ResourceIdentifier, permission: Permission) -> bool {
        self.grants
            .iter()
            .any(|g| &g.resource == resource && g.permissions.contains(&permission))
    }
}

/// Origin of inbound traffic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "value")]
pub enum TrafficSource {
    /// Members of the same security group
    SameGroup,
    /// Any address inside the block
    Block(AddressBlock),
    /// Members of another security group in the same unit
    Group(ResourceIdentifier),
    /// The public internet
    Anywhere,
}

/// Single inbound TCP rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngressRule {
    pub port: u16,
    pub source: TrafficSource,
    pub description: String,
}

impl IngressRule {
    pub fn new(port: u16, source: TrafficSource, description: impl Into<String>) -> Self {
        Self {
            port,
            source,
            description: description.into(),
        }
    }
}

/// Security group (access boundary) inside one network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityGroupSpec {
    pub id: ResourceIdentifier,
    pub network_id: ResourceIdentifier,
    pub ingress: Vec<IngressRule>,
    pub allow_all_outbound: bool,
}

impl SecurityGroupSpec {
    /// Check whether traffic from `source` may reach `port`
    pub fn admits(&self, port: u16, source: &TrafficSource) -> bool {
        self.ingress
            .iter()
            .any(|rule| rule.port == port && &rule.source == source)
    }
}
