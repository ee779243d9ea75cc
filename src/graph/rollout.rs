// Copyright (c) 2025 - Cowboy AI, Inc.
//! Rollout Graph
//!
//! Public load-balanced front end for one compute graph. Releases are
//! blue/green: two target groups health-routed to the container port, a
//! production listener and a test listener, and a deployment group that
//! shifts traffic from the live group to the replacement and rolls back on
//! failure. Also declares the two unit exports (endpoint address and URL).

use serde::{Deserialize, Serialize};
use std::fmt;

use super::access::{IngressRule, SecurityGroupSpec, TrafficSource};
use super::compute::ComputeSpec;
use super::network::NetworkSpec;
use super::{BuildContext, GraphFragment, ResourceNode};
use crate::domain::{DeploymentUnit, ResourceIdentifier, ResourceKind, Tier};
use crate::errors::{ConfigurationError, Stage, TopologyError, TopologyResult};

pub const DEFAULT_LISTENER_PORT: u16 = 80;

/// Port the replacement task set is reachable on before the shift
pub const DEFAULT_TEST_LISTENER_PORT: u16 = 9002;

pub const DEFAULT_TERMINATION_WAIT_MINUTES: u32 = 10;

pub const DEFAULT_DEPLOYMENT_TIMEOUT_MINUTES: u32 = 60;

/// Seconds a replaced task keeps draining before it leaves rotation
pub const DEFAULT_DEREGISTRATION_DELAY_SECS: u64 = 30;

/// Attribute of the load balancer holding its public address
pub const ENDPOINT_ATTRIBUTE: &str = "DNSName";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadBalancerSpec {
    pub id: ResourceIdentifier,
    pub internet_facing: bool,
    pub subnets: Vec<ResourceIdentifier>,
    pub security_group: SecurityGroupSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheck {
    pub path: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetGroupSpec {
    pub id: ResourceIdentifier,
    pub network_id: ResourceIdentifier,
    pub port: u16,
    pub health_check: HealthCheck,
    pub deregistration_delay_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListenerSpec {
    pub id: ResourceIdentifier,
    pub port: u16,
    pub open: bool,
    pub default_target_group: ResourceIdentifier,
}

/// Registration of the service's container port into the target group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceBindingSpec {
    pub id: ResourceIdentifier,
    pub service: ResourceIdentifier,
    pub container: ResourceIdentifier,
    pub container_port: u16,
    pub target_group: ResourceIdentifier,
}

/// How production traffic moves to the replacement task set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum TrafficShift {
    #[default]
    AllAtOnce,
    /// `percent` first, the remainder after `interval_minutes`
    Canary { percent: u8, interval_minutes: u32 },
    /// `percent` more every `interval_minutes`
    Linear { percent: u8, interval_minutes: u32 },
}

impl TrafficShift {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        match *self {
            Self::AllAtOnce => Ok(()),
            Self::Canary { percent, interval_minutes } | Self::Linear { percent, interval_minutes } => {
                if !(1..=99).contains(&percent) {
                    return Err(ConfigurationError::InvalidSetting {
                        key: "rollout.traffic_shift.percent",
                        reason: format!("{} is not between 1 and 99", percent),
                    });
                }
                if interval_minutes == 0 {
                    return Err(ConfigurationError::InvalidSetting {
                        key: "rollout.traffic_shift.interval_minutes",
                        reason: "must be at least one minute".to_string(),
                    });
                }
                Ok(())
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoRollback {
    pub on_failure: bool,
    pub on_stop: bool,
}

/// Blue/green deployment group of the service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlueGreenSpec {
    pub application_id: ResourceIdentifier,
    pub deployment_group_id: ResourceIdentifier,
    pub service: ResourceIdentifier,
    /// Target group serving production traffic at creation
    pub blue_target_group: ResourceIdentifier,
    /// Target group the replacement task set registers into
    pub green_target_group: ResourceIdentifier,
    pub production_listener: ResourceIdentifier,
    pub test_listener: ResourceIdentifier,
    pub traffic_shift: TrafficShift,
    pub termination_wait_minutes: u32,
    pub deployment_timeout_minutes: u32,
    pub auto_rollback: AutoRollback,
}

impl BlueGreenSpec {
    pub fn target_groups(&self) -> [&ResourceIdentifier; 2] {
        [&self.blue_target_group, &self.green_target_group]
    }
}

/// Reference to an attribute only known after provisioning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeRef {
    pub resource: ResourceIdentifier,
    pub attribute: String,
}

impl fmt::Display for AttributeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${{{}.{}}}", self.resource, self.attribute)
    }
}

/// Value of an export
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum OutputValue {
    Attribute(AttributeRef),
    Url {
        scheme: String,
        host: AttributeRef,
        port: u16,
    },
}

impl OutputValue {
    /// Render with resolved attribute values
    ///
    /// Returns `None` while the referenced attribute is still unknown.
    pub fn render<F>(&self, resolve: F) -> Option<String>
    where
        F: Fn(&AttributeRef) -> Option<String>,
    {
        match self {
            Self::Attribute(attr) => resolve(attr),
            Self::Url { scheme, host, port } => {
                resolve(host).map(|host| format!("{}://{}:{}", scheme, host, port))
            }
        }
    }

    /// Placeholder form, e.g. `http://${alb.DNSName}:80`
    pub fn template(&self) -> String {
        match self {
            Self::Attribute(attr) => attr.to_string(),
            Self::Url { scheme, host, port } => format!("{}://{}:{}", scheme, host, port),
        }
    }
}

/// Named unit export
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputSpec {
    pub id: ResourceIdentifier,
    pub kind: ResourceKind,
    pub value: OutputValue,
}

/// Rollout spec of one unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolloutSpec {
    pub load_balancer: LoadBalancerSpec,
    /// Blue target group, live at creation
    pub target_group: TargetGroupSpec,
    pub green_target_group: TargetGroupSpec,
    pub listener: ListenerSpec,
    pub test_listener: ListenerSpec,
    pub service_binding: ServiceBindingSpec,
    pub deployment: BlueGreenSpec,
    pub exports: Vec<OutputSpec>,
}

impl RolloutSpec {
    pub fn listener_port(&self) -> u16 {
        self.listener.port
    }

    pub fn test_listener_port(&self) -> u16 {
        self.test_listener.port
    }

    /// Health-check port of the blue target group
    pub fn health_check_target_port(&self) -> u16 {
        self.target_group.health_check.port
    }

    pub fn target_groups(&self) -> [&TargetGroupSpec; 2] {
        [&self.target_group, &self.green_target_group]
    }

    pub fn deregistration_delay_secs(&self) -> u64 {
        self.target_group.deregistration_delay_secs
    }

    pub fn publicly_reachable(&self) -> bool {
        self.load_balancer.internet_facing && self.listener.open
    }

    pub fn endpoint(&self) -> Option<&OutputSpec> {
        self.exports
            .iter()
            .find(|o| o.kind == ResourceKind::EndpointExport)
    }

    pub fn url(&self) -> Option<&OutputSpec> {
        self.exports.iter().find(|o| o.kind == ResourceKind::UrlExport)
    }
}

impl GraphFragment for RolloutSpec {
    fn tier(&self) -> Tier {
        Tier::Rollout
    }

    fn nodes(&self) -> Vec<ResourceNode> {
        let lb = &self.load_balancer;
        let binding = &self.service_binding;
        let deployment = &self.deployment;

        let mut nodes = vec![
            ResourceNode::new(&lb.security_group.id, ResourceKind::LoadBalancerSecurityGroup)
                .after(&lb.security_group.network_id),
            ResourceNode::new(&lb.id, ResourceKind::LoadBalancer)
                .after_all(&lb.subnets)
                .after(&lb.security_group.id),
        ];

        nodes.extend(self.target_groups().into_iter().map(|tg| {
            ResourceNode::new(&tg.id, ResourceKind::TargetGroup).after(&tg.network_id)
        }));

        nodes.extend([
            ResourceNode::new(&self.listener.id, ResourceKind::Listener)
                .after(&lb.id)
                .after(&self.listener.default_target_group),
            ResourceNode::new(&self.test_listener.id, ResourceKind::TestListener)
                .after(&lb.id)
                .after(&self.test_listener.default_target_group),
            ResourceNode::new(&binding.id, ResourceKind::ServiceBinding)
                .after(&binding.service)
                .after(&binding.target_group)
                .after(&self.listener.id),
            ResourceNode::new(&deployment.application_id, ResourceKind::DeploymentApplication),
            ResourceNode::new(&deployment.deployment_group_id, ResourceKind::DeploymentGroup)
                .after(&deployment.application_id)
                .after(&deployment.service)
                .after_all(deployment.target_groups())
                .after(&deployment.production_listener)
                .after(&deployment.test_listener)
                .after(&binding.id),
        ]);

        nodes
    }

    fn exports(&self) -> Vec<(ResourceIdentifier, ResourceKind)> {
        self.exports.iter().map(|o| (o.id.clone(), o.kind)).collect()
    }
}

/// Rollout builder
pub struct RolloutGraph;

impl RolloutGraph {
    pub fn build(
        ctx: &BuildContext<'_>,
        unit: &DeploymentUnit,
        network: &NetworkSpec,
        compute: &ComputeSpec,
    ) -> TopologyResult<RolloutSpec> {
        if &network.unit != unit {
            return Err(TopologyError::ordering(
                Stage::Rollout,
                format!("network graph belongs to unit {}", network.unit),
            ));
        }

        if !compute
            .service
            .subnets
            .iter()
            .all(|subnet| network.is_private_subnet(subnet))
        {
            return Err(TopologyError::ordering(
                Stage::Rollout,
                format!("compute graph {} runs outside network {}", compute.cluster_id, network.vpc_id),
            ));
        }

        let policy = &ctx.config.rollout;
        let naming = ctx.naming;
        let container_port = compute.container_port();

        let load_balancer = LoadBalancerSpec {
            id: naming.name(unit, ResourceKind::LoadBalancer)?,
            internet_facing: true,
            subnets: network.public_subnets.iter().map(|s| s.id.clone()).collect(),
            security_group: SecurityGroupSpec {
                id: naming.name(unit, ResourceKind::LoadBalancerSecurityGroup)?,
                network_id: network.vpc_id.clone(),
                ingress: vec![
                    IngressRule::new(policy.listener_port, TrafficSource::Anywhere, "public listener"),
                    IngressRule::new(
                        policy.test_listener_port,
                        TrafficSource::Anywhere,
                        "test listener for the replacement task set",
                    ),
                ],
                allow_all_outbound: true,
            },
        };

        let target_group_at = |ordinal| -> TopologyResult<TargetGroupSpec> {
            Ok(TargetGroupSpec {
                id: naming.name_nth(unit, ResourceKind::TargetGroup, ordinal)?,
                network_id: network.vpc_id.clone(),
                port: container_port,
                health_check: HealthCheck {
                    path: policy.health_check_path.clone(),
                    port: container_port,
                },
                deregistration_delay_secs: policy.deregistration_delay_secs,
            })
        };
        let target_group = target_group_at(0)?;
        let green_target_group = target_group_at(1)?;

        let listener = ListenerSpec {
            id: naming.name(unit, ResourceKind::Listener)?,
            port: policy.listener_port,
            open: true,
            default_target_group: target_group.id.clone(),
        };

        let test_listener = ListenerSpec {
            id: naming.name(unit, ResourceKind::TestListener)?,
            port: policy.test_listener_port,
            open: true,
            default_target_group: green_target_group.id.clone(),
        };

        let service_binding = ServiceBindingSpec {
            id: naming.name(unit, ResourceKind::ServiceBinding)?,
            service: compute.service.id.clone(),
            container: compute.container.name.clone(),
            container_port,
            target_group: target_group.id.clone(),
        };

        let endpoint = AttributeRef {
            resource: load_balancer.id.clone(),
            attribute: ENDPOINT_ATTRIBUTE.to_string(),
        };

        let exports = vec![
            OutputSpec {
                id: naming.name(unit, ResourceKind::EndpointExport)?,
                kind: ResourceKind::EndpointExport,
                value: OutputValue::Attribute(endpoint.clone()),
            },
            OutputSpec {
                id: naming.name(unit, ResourceKind::UrlExport)?,
                kind: ResourceKind::UrlExport,
                value: OutputValue::Url {
                    scheme: "http".to_string(),
                    host: endpoint,
                    port: policy.listener_port,
                },
            },
        ];

        let deployment = BlueGreenSpec {
            application_id: naming.name(unit, ResourceKind::DeploymentApplication)?,
            deployment_group_id: naming.name(unit, ResourceKind::DeploymentGroup)?,
            service: compute.service.id.clone(),
            blue_target_group: target_group.id.clone(),
            green_target_group: green_target_group.id.clone(),
            production_listener: listener.id.clone(),
            test_listener: test_listener.id.clone(),
            traffic_shift: policy.traffic_shift,
            termination_wait_minutes: policy.termination_wait_minutes,
            deployment_timeout_minutes: policy.deployment_timeout_minutes,
            auto_rollback: AutoRollback {
                on_failure: true,
                on_stop: true,
            },
        };

        Ok(RolloutSpec {
            load_balancer,
            target_group,
            green_target_group,
            listener,
            test_listener,
            service_binding,
            deployment,
            exports,
        })
    }
}
