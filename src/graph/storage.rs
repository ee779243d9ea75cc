// Copyright (c) 2025 - Cowboy AI, Inc.
//! Storage Graph
//!
//! Shared persistent volume bound to one network's private tier.
//!
//! # Access Boundary
//!
//! Exactly two inbound flows are admitted:
//! 1. the storage protocol port from members of the same group
//! 2. the service port from the network's own address block
//!
//! Anonymous mounts are denied: the volume policy allows mounting only
//! through a mount target of the volume.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::access::{IngressRule, Permission, SecurityGroupSpec, TrafficSource};
use super::network::NetworkSpec;
use super::{BuildContext, GraphFragment, ResourceNode};
use crate::domain::{DeploymentUnit, ResourceIdentifier, ResourceKind, Tier};
use crate::errors::{Stage, TopologyError, TopologyResult};

/// Network file-system protocol port
pub const STORAGE_PROTOCOL_PORT: u16 = 2049;

pub const DEFAULT_INFREQUENT_ACCESS_AFTER_DAYS: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceMode {
    GeneralPurpose,
    MaxIo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThroughputMode {
    Bursting,
    Elastic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerformanceTier {
    pub mode: PerformanceMode,
    pub throughput: ThroughputMode,
}

/// What happens to the data over time and on teardown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionLifecycle {
    pub infrequent_access_after_days: u32,
    pub retain_on_teardown: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountTargetSpec {
    pub id: ResourceIdentifier,
    pub subnet: ResourceIdentifier,
    pub security_group: ResourceIdentifier,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessPointSpec {
    pub id: ResourceIdentifier,
    pub root_path: String,
}

/// Volume policy statement
///
/// Allows the listed actions only when the client connects through a mount
/// target; everything else, including anonymous access, is denied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountPolicySpec {
    pub id: ResourceIdentifier,
    pub allowed: BTreeSet<Permission>,
    pub require_mount_target: bool,
    pub allow_anonymous: bool,
}

/// Storage spec of one unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageSpec {
    pub volume_id: ResourceIdentifier,
    pub network_id: ResourceIdentifier,
    pub encryption_at_rest: bool,
    pub access_boundary: SecurityGroupSpec,
    pub performance_tier: PerformanceTier,
    pub retention_lifecycle: RetentionLifecycle,
    pub mount_targets: Vec<MountTargetSpec>,
    pub access_point: AccessPointSpec,
    pub policy: MountPolicySpec,
}

impl GraphFragment for StorageSpec {
    fn tier(&self) -> Tier {
        Tier::Storage
    }

    fn nodes(&self) -> Vec<ResourceNode> {
        let boundary = &self.access_boundary;
        let mut nodes = vec![
            ResourceNode::new(&boundary.id, ResourceKind::StorageSecurityGroup)
                .after(&boundary.network_id),
            ResourceNode::new(&self.volume_id, ResourceKind::FileSystem).after(&self.network_id),
            ResourceNode::new(&self.policy.id, ResourceKind::FileSystemPolicy)
                .after(&self.volume_id),
        ];

        nodes.extend(self.mount_targets.iter().map(|target| {
            ResourceNode::new(&target.id, ResourceKind::MountTarget)
                .after(&self.volume_id)
                .after(&target.subnet)
                .after(&target.security_group)
        }));

        nodes.push(
            ResourceNode::new(&self.access_point.id, ResourceKind::AccessPoint)
                .after(&self.volume_id),
        );

        nodes
    }
}

/// Storage builder
pub struct StorageGraph;

impl StorageGraph {
    pub fn build(
        ctx: &BuildContext<'_>,
        unit: &DeploymentUnit,
        network: &NetworkSpec,
    ) -> TopologyResult<StorageSpec> {
        if &network.unit != unit {
            return Err(TopologyError::ordering(
                Stage::Storage,
                format!("network graph belongs to unit {}", network.unit),
            ));
        }

        let settings = &ctx.config.storage;
        let naming = ctx.naming;

        let group_id = naming.name(unit, ResourceKind::StorageSecurityGroup)?;
        let access_boundary = SecurityGroupSpec {
            id: group_id.clone(),
            network_id: network.vpc_id.clone(),
            ingress: vec![
                IngressRule::new(
                    STORAGE_PROTOCOL_PORT,
                    TrafficSource::SameGroup,
                    "shared volume mounts",
                ),
                IngressRule::new(
                    ctx.config.service_port,
                    TrafficSource::Block(network.address_block),
                    "service traffic from inside the network",
                ),
            ],
            allow_all_outbound: true,
        };

        let mount_targets = network
            .private_subnets
            .iter()
            .enumerate()
            .map(|(ordinal, subnet)| -> TopologyResult<MountTargetSpec> {
                Ok(MountTargetSpec {
                    id: naming.name_nth(unit, ResourceKind::MountTarget, ordinal)?,
                    subnet: subnet.id.clone(),
                    security_group: group_id.clone(),
                })
            })
            .collect::<TopologyResult<Vec<_>>>()?;

        Ok(StorageSpec {
            volume_id: naming.name(unit, ResourceKind::FileSystem)?,
            network_id: network.vpc_id.clone(),
            encryption_at_rest: true,
            access_boundary,
            performance_tier: PerformanceTier {
                mode: PerformanceMode::GeneralPurpose,
                throughput: ThroughputMode::Bursting,
            },
            retention_lifecycle: RetentionLifecycle {
                infrequent_access_after_days: settings.infrequent_access_after_days,
                retain_on_teardown: settings.retain_on_teardown,
            },
            mount_targets,
            access_point: AccessPointSpec {
                id: naming.name(unit, ResourceKind::AccessPoint)?,
                root_path: settings.root_path.clone(),
            },
            policy: MountPolicySpec {
                id: naming.name(unit, ResourceKind::FileSystemPolicy)?,
                allowed: [
                    Permission::StorageMount,
                    Permission::StorageRead,
                    Permission::StorageWrite,
                ]
                .into_iter()
                .collect(),
                require_mount_target: true,
                allow_anonymous: false,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TopologyConfig;
    use crate::domain::NamingScheme;
    use crate::graph::network::NetworkGraph;

    fn setup() -> (TopologyConfig, NamingScheme, DeploymentUnit) {
        (
            TopologyConfig::new("qdrant", "qdrant-images", "/qdrant/storage", 6333),
            NamingScheme::new("qdrant").unwrap(),
            DeploymentUnit::new("us-east-1", "prod", "LINUX_AMD64"),
        )
    }

    #[test]
    fn test_storage_bound_to_private_tier() {
        let (config, naming, unit) = setup();
        let ctx = BuildContext::new(&config, &naming);
        let network = NetworkGraph::build(&ctx, &unit).unwrap();
        let storage = StorageGraph::build(&ctx, &unit, &network).unwrap();

        assert!(storage.encryption_at_rest);
        assert_eq!(storage.network_id, network.vpc_id);
        assert_eq!(storage.mount_targets.len(), network.private_subnets.len());
        for target in &storage.mount_targets {
            assert!(network.is_private_subnet(&target.subnet));
        }
    }

    #[test]
    fn test_access_boundary_admits_exactly_two_flows() {
        let (config, naming, unit) = setup();
        let ctx = BuildContext::new(&config, &naming);
        let network = NetworkGraph::build(&ctx, &unit).unwrap();
        let storage = StorageGraph::build(&ctx, &unit, &network).unwrap();

        let boundary = &storage.access_boundary;
        assert_eq!(boundary.ingress.len(), 2);
        assert!(boundary.admits(STORAGE_PROTOCOL_PORT, &TrafficSource::SameGroup));
        assert!(boundary.admits(6333, &TrafficSource::Block(network.address_block)));
        assert!(!boundary.admits(STORAGE_PROTOCOL_PORT, &TrafficSource::Anywhere));
    }

    #[test]
    fn test_policy_denies_anonymous_mounts() {
        let (config, naming, unit) = setup();
        let ctx = BuildContext::new(&config, &naming);
        let network = NetworkGraph::build(&ctx, &unit).unwrap();
        let storage = StorageGraph::build(&ctx, &unit, &network).unwrap();

        assert!(storage.policy.require_mount_target);
        assert!(!storage.policy.allow_anonymous);
        assert!(storage.retention_lifecycle.retain_on_teardown);
        assert_eq!(storage.retention_lifecycle.infrequent_access_after_days, 30);
        assert_eq!(storage.access_point.root_path, "/");
    }

    #[test]
    fn test_foreign_network_is_rejected() {
        let (config, naming, unit) = setup();
        let ctx = BuildContext::new(&config, &naming);
        let other = DeploymentUnit::new("us-east-1", "dev", "LINUX_AMD64");
        let network = NetworkGraph::build(&ctx, &other).unwrap();

        assert!(matches!(
            StorageGraph::build(&ctx, &unit, &network),
            Err(TopologyError::OrderingViolation { stage: Stage::Storage, .. })
        ));
    }
}
