// Copyright (c) 2025 - Cowboy AI, Inc.
//! Network Graph
//!
//! An isolated network per unit:
//!
//! - one public and one private subnet per availability zone, carved in order
//!   from the address block (public first)
//! - an internet gateway routing the public tier
//! - a single NAT gateway in the first public subnet, shared by the private tier
//! - flow audit logging of all traffic, always on
//!
//! The private tier has no direct inbound path. No network is ever peered
//! with another unit's network.

use serde::{Deserialize, Serialize};

use super::access::{Permission, RoleSpec, ServicePrincipal};
use super::{BuildContext, GraphFragment, ResourceNode};
use crate::domain::{AddressBlock, DeploymentUnit, ResourceIdentifier, ResourceKind, Tier};
use crate::errors::{Stage, TopologyError, TopologyResult};

pub const DEFAULT_ADDRESS_BLOCK: AddressBlock = AddressBlock::PRIVATE_DEFAULT;
pub const DEFAULT_AVAILABILITY_ZONES: u8 = 3;

/// Zones a unit may span; zone letters run `a` through `f`
pub const MAX_AVAILABILITY_ZONES: u8 = 6;
pub const DEFAULT_SUBNET_MASK: u8 = 24;

/// Days flow records are kept in the log sink
pub const FLOW_LOG_RETENTION_DAYS: u32 = 30;

/// Subnet tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubnetTier {
    Public,
    PrivateWithEgress,
}

/// Default route of a subnet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "via", content = "target")]
pub enum DefaultRoute {
    InternetGateway(ResourceIdentifier),
    NatGateway(ResourceIdentifier),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubnetSpec {
    pub id: ResourceIdentifier,
    pub tier: SubnetTier,
    pub availability_zone: String,
    pub address_block: AddressBlock,
    pub map_public_ip: bool,
    pub default_route: DefaultRoute,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NatGatewaySpec {
    pub id: ResourceIdentifier,
    pub subnet: ResourceIdentifier,
}

/// Traffic captured by the flow log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrafficType {
    All,
    Accept,
    Reject,
}

/// Flow audit logging of the whole network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditLogSpec {
    pub role: RoleSpec,
    pub log_group: ResourceIdentifier,
    pub retention_days: u32,
    pub log_stream: ResourceIdentifier,
    pub flow_log: ResourceIdentifier,
    pub traffic_type: TrafficType,
}

/// Network spec of one unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkSpec {
    pub unit: DeploymentUnit,
    pub vpc_id: ResourceIdentifier,
    pub address_block: AddressBlock,
    pub availability_zone_count: u8,
    pub internet_gateway: ResourceIdentifier,
    pub public_subnets: Vec<SubnetSpec>,
    pub private_subnets: Vec<SubnetSpec>,
    pub nat_gateway: NatGatewaySpec,
    pub audit_log: AuditLogSpec,
}

impl NetworkSpec {
    pub fn subnet_tiers(&self) -> [SubnetTier; 2] {
        [SubnetTier::Public, SubnetTier::PrivateWithEgress]
    }

    pub fn public_subnet_ids(&self) -> Vec<&ResourceIdentifier> {
        self.public_subnets.iter().map(|s| &s.id).collect()
    }

    pub fn private_subnet_ids(&self) -> Vec<&ResourceIdentifier> {
        self.private_subnets.iter().map(|s| &s.id).collect()
    }

    pub fn is_private_subnet(&self, id: &ResourceIdentifier) -> bool {
        self.private_subnets.iter().any(|s| &s.id == id)
    }

    pub fn is_public_subnet(&self, id: &ResourceIdentifier) -> bool {
        self.public_subnets.iter().any(|s| &s.id == id)
    }
}

impl GraphFragment for NetworkSpec {
    fn tier(&self) -> Tier {
        Tier::Network
    }

    fn nodes(&self) -> Vec<ResourceNode> {
        let mut nodes = vec![
            ResourceNode::new(&self.vpc_id, ResourceKind::Vpc),
            ResourceNode::new(&self.internet_gateway, ResourceKind::InternetGateway)
                .after(&self.vpc_id),
        ];

        nodes.extend(self.public_subnets.iter().map(|subnet| {
            ResourceNode::new(&subnet.id, ResourceKind::PublicSubnet)
                .after(&self.vpc_id)
                .after(&self.internet_gateway)
        }));

        nodes.push(
            ResourceNode::new(&self.nat_gateway.id, ResourceKind::NatGateway)
                .after(&self.nat_gateway.subnet),
        );

        nodes.extend(self.private_subnets.iter().map(|subnet| {
            ResourceNode::new(&subnet.id, ResourceKind::PrivateSubnet)
                .after(&self.vpc_id)
                .after(&self.nat_gateway.id)
        }));

        let audit = &self.audit_log;
        nodes.push(ResourceNode::new(&audit.log_group, ResourceKind::FlowLogGroup));
        nodes.push(
            ResourceNode::new(&audit.log_stream, ResourceKind::FlowLogStream)
                .after(&audit.log_group),
        );
        nodes.push(
            ResourceNode::new(&audit.role.id, ResourceKind::FlowLogRole).after(&audit.log_group),
        );
        nodes.push(
            ResourceNode::new(&audit.flow_log, ResourceKind::FlowLog)
                .after(&self.vpc_id)
                .after(&audit.role.id)
                .after(&audit.log_group)
                .after(&audit.log_stream),
        );

        nodes
    }
}

/// Network builder
pub struct NetworkGraph;

impl NetworkGraph {
    pub fn build(ctx: &BuildContext<'_>, unit: &DeploymentUnit) -> TopologyResult<NetworkSpec> {
        let settings = &ctx.config.network;
        let naming = ctx.naming;
        let zones = settings.availability_zones;

        if !(1..=MAX_AVAILABILITY_ZONES).contains(&zones) {
            return Err(TopologyError::invariant(
                Stage::Network,
                format!("{} availability zones is outside 1-{}", zones, MAX_AVAILABILITY_ZONES),
            ));
        }

        let vpc_id = naming.name(unit, ResourceKind::Vpc)?;
        let internet_gateway = naming.name(unit, ResourceKind::InternetGateway)?;
        let nat_id = naming.name(unit, ResourceKind::NatGateway)?;

        let mut public_subnets = Vec::with_capacity(usize::from(zones));
        for zone in 0..zones {
            public_subnets.push(SubnetSpec {
                id: naming.name_nth(unit, ResourceKind::PublicSubnet, usize::from(zone))?,
                tier: SubnetTier::Public,
                availability_zone: availability_zone(unit, zone),
                address_block: settings
                    .address_block
                    .subnet(settings.subnet_mask, u32::from(zone))?,
                map_public_ip: true,
                default_route: DefaultRoute::InternetGateway(internet_gateway.clone()),
            });
        }

        let mut private_subnets = Vec::with_capacity(usize::from(zones));
        for zone in 0..zones {
            private_subnets.push(SubnetSpec {
                id: naming.name_nth(unit, ResourceKind::PrivateSubnet, usize::from(zone))?,
                tier: SubnetTier::PrivateWithEgress,
                availability_zone: availability_zone(unit, zone),
                address_block: settings
                    .address_block
                    .subnet(settings.subnet_mask, u32::from(zones) + u32::from(zone))?,
                map_public_ip: false,
                default_route: DefaultRoute::NatGateway(nat_id.clone()),
            });
        }

        let nat_gateway = NatGatewaySpec {
            id: nat_id,
            subnet: public_subnets[0].id.clone(),
        };

        let log_group = naming.name(unit, ResourceKind::FlowLogGroup)?;
        let role = RoleSpec::new(
            naming.name(unit, ResourceKind::FlowLogRole)?,
            ServicePrincipal::FlowLogs,
        )
        .grant(&log_group, [Permission::LogWrite]);

        let audit_log = AuditLogSpec {
            role,
            log_stream: naming.name(unit, ResourceKind::FlowLogStream)?,
            flow_log: naming.name(unit, ResourceKind::FlowLog)?,
            log_group,
            retention_days: FLOW_LOG_RETENTION_DAYS,
            traffic_type: TrafficType::All,
        };

        Ok(NetworkSpec {
            unit: unit.clone(),
            vpc_id,
            address_block: settings.address_block,
            availability_zone_count: zones,
            internet_gateway,
            public_subnets,
            private_subnets,
            nat_gateway,
            audit_log,
        })
    }
}

/// Zone names follow the region's letter suffix convention
fn availability_zone(unit: &DeploymentUnit, zone: u8) -> String {
    format!("{}{}", unit.region(), char::from(b'a' + zone))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TopologyConfig;
    use crate::domain::NamingScheme;

    fn build(config: &TopologyConfig) -> NetworkSpec {
        let naming = NamingScheme::new(&config.app_name).unwrap();
        let unit = DeploymentUnit::new("eu-west-1", "dev", "LINUX_ARM64");
        NetworkGraph::build(&BuildContext::new(config, &naming), &unit).unwrap()
    }

    fn config() -> TopologyConfig {
        TopologyConfig::new("qdrant", "qdrant-images", "/qdrant/storage", 6333)
    }

    #[test]
    fn test_default_layout() {
        let spec = build(&config());
        assert_eq!(spec.address_block.as_cidr(), "10.0.0.0/16");
        assert_eq!(spec.availability_zone_count, 3);
        assert_eq!(spec.public_subnets.len(), 3);
        assert_eq!(spec.private_subnets.len(), 3);

        let blocks: Vec<String> = spec
            .public_subnets
            .iter()
            .chain(&spec.private_subnets)
            .map(|s| s.address_block.as_cidr())
            .collect();
        assert_eq!(
            blocks,
            vec![
                "10.0.0.0/24",
                "10.0.1.0/24",
                "10.0.2.0/24",
                "10.0.3.0/24",
                "10.0.4.0/24",
                "10.0.5.0/24"
            ]
        );
        assert_eq!(spec.public_subnets[1].availability_zone, "eu-west-1b");
    }

    #[test]
    fn test_single_shared_nat_egress() {
        let spec = build(&config());
        assert_eq!(spec.nat_gateway.subnet, spec.public_subnets[0].id);
        for subnet in &spec.private_subnets {
            assert!(!subnet.map_public_ip);
            assert_eq!(
                subnet.default_route,
                DefaultRoute::NatGateway(spec.nat_gateway.id.clone())
            );
        }

        let nats = spec
            .nodes()
            .iter()
            .filter(|n| n.kind == ResourceKind::NatGateway)
            .count();
        assert_eq!(nats, 1);
    }

    #[test]
    fn test_audit_log_dependencies_precede_binding() {
        let spec = build(&config());
        let audit = &spec.audit_log;
        assert_eq!(audit.traffic_type, TrafficType::All);

        let nodes = spec.nodes();
        let flow_log = nodes
            .iter()
            .find(|n| n.kind == ResourceKind::FlowLog)
            .unwrap();
        assert!(flow_log.depends_on.contains(&audit.log_group));
        assert!(flow_log.depends_on.contains(&audit.log_stream));
        assert!(flow_log.depends_on.contains(&audit.role.id));
    }

    #[test]
    fn test_flow_log_role_is_scoped_to_its_sink() {
        let spec = build(&config());
        let role = &spec.audit_log.role;
        assert_eq!(role.assumed_by, ServicePrincipal::FlowLogs);
        assert_eq!(role.grants.len(), 1);
        assert!(role.permits(&spec.audit_log.log_group, Permission::LogWrite));
    }

    #[test]
    fn test_zone_count_is_configurable() {
        let mut config = config();
        config.network.availability_zones = 2;
        let spec = build(&config);
        assert_eq!(spec.private_subnets.len(), 2);
        assert_eq!(spec.private_subnets[0].address_block.as_cidr(), "10.0.2.0/24");
    }

    #[test]
    fn test_zone_count_is_bounded() {
        for zones in [0, 7, 200] {
            let mut config = config();
            config.network.availability_zones = zones;
            let naming = NamingScheme::new(&config.app_name).unwrap();
            let unit = DeploymentUnit::new("eu-west-1", "dev", "LINUX_ARM64");

            assert!(matches!(
                NetworkGraph::build(&BuildContext::new(&config, &naming), &unit),
                Err(TopologyError::Invariant { stage: Stage::Network, .. })
            ));
        }
    }
}
