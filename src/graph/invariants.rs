// Copyright (c) 2025 - Cowboy AI, Inc.
//! Pure Validation Functions - Cross-Spec Invariants
//!
//! Checks that hold between the tier specs of one unit. Each builder already
//! produces a consistent spec; these functions guard the seams where specs
//! built separately are combined into one [`ResourceGraph`](super::ResourceGraph).
//!
//! # Design Principles
//!
//! - **Pure Functions**: No I/O, no mutations, deterministic
//! - **Explicit Errors**: Every failure names the stage and resources involved

use std::collections::HashMap;

use super::access::TrafficSource;
use super::compute::ComputeSpec;
use super::network::NetworkSpec;
use super::registry::RegistrySpec;
use super::rollout::RolloutSpec;
use super::storage::{StorageSpec, STORAGE_PROTOCOL_PORT};
use crate::domain::{DeploymentUnit, ResourceIdentifier, ResourceKind};
use crate::errors::{Stage, TopologyError, TopologyResult};

/// Validate no two resources share an identifier
///
/// # Rules
/// - Every identifier appears once
/// - A collision reports both resource kinds
pub fn validate_unique_identifiers<'a, I>(identifiers: I) -> TopologyResult<()>
where
    I: IntoIterator<Item = (&'a ResourceIdentifier, ResourceKind)>,
{
    let mut seen: HashMap<&ResourceIdentifier, ResourceKind> = HashMap::new();
    for (id, kind) in identifiers {
        if let Some(first) = seen.insert(id, kind) {
            return Err(TopologyError::IdentifierCollision {
                identifier: id.clone(),
                first,
                second: kind,
            });
        }
    }
    Ok(())
}

/// Validate the network graph was built for this unit
pub fn validate_unit_binding(unit: &DeploymentUnit, network: &NetworkSpec) -> TopologyResult<()> {
    if &network.unit != unit {
        return Err(TopologyError::invariant(
            Stage::Assembly,
            format!("network graph of {} assembled into {}", network.unit, unit),
        ));
    }
    Ok(())
}

/// Validate storage is owned by the network
///
/// # Rules
/// - The volume and its access boundary live in the unit's network
/// - Every mount target sits in a private subnet of that network
/// - Encryption at rest is on
/// - The storage protocol port is admitted only from the group itself
pub fn validate_storage_ownership(
    network: &NetworkSpec,
    storage: &StorageSpec,
) -> TopologyResult<()> {
    if storage.network_id != network.vpc_id
        || storage.access_boundary.network_id != network.vpc_id
    {
        return Err(TopologyError::invariant(
            Stage::Storage,
            format!("volume {} is not owned by network {}", storage.volume_id, network.vpc_id),
        ));
    }

    if let Some(target) = storage
        .mount_targets
        .iter()
        .find(|t| !network.is_private_subnet(&t.subnet))
    {
        return Err(TopologyError::invariant(
            Stage::Storage,
            format!("mount target {} is outside the private tier", target.id),
        ));
    }

    if !storage.encryption_at_rest {
        return Err(TopologyError::invariant(
            Stage::Storage,
            format!("volume {} is not encrypted at rest", storage.volume_id),
        ));
    }

    if let Some(rule) = storage.access_boundary.ingress.iter().find(|rule| {
        rule.port == STORAGE_PROTOCOL_PORT
            && matches!(rule.source, TrafficSource::Block(_) | TrafficSource::Anywhere)
    }) {
        return Err(TopologyError::invariant(
            Stage::Storage,
            format!(
                "boundary {} admits port {} from {:?}",
                storage.access_boundary.id, rule.port, rule.source
            ),
        ));
    }

    Ok(())
}

/// Validate the container image resolves
///
/// # Rules
/// - With a registry, the image is one of its published target tags
/// - Without one, the image waits on no promotion step
pub fn validate_image_resolution(
    compute: &ComputeSpec,
    registry: Option<&RegistrySpec>,
) -> TopologyResult<()> {
    let image = compute.container_image();
    match registry {
        Some(registry) if !registry.publishes(image) => Err(TopologyError::invariant(
            Stage::Compute,
            format!(
                "image {} is not published by repository {}",
                image, registry.repository_name
            ),
        )),
        None if !compute.image_dependencies.is_empty() => Err(TopologyError::invariant(
            Stage::Compute,
            format!("image {} waits on a promotion that does not exist", image),
        )),
        _ => Ok(()),
    }
}

/// Validate compute roles are scoped to this unit's resources
///
/// # Rules
/// - Grants name only the unit's volume, access point or repository
/// - The container mounts the unit's own volume
pub fn validate_role_scope(
    compute: &ComputeSpec,
    storage: &StorageSpec,
    registry: Option<&RegistrySpec>,
) -> TopologyResult<()> {
    let allowed = |id: &ResourceIdentifier| {
        id == &storage.volume_id
            || id == &storage.access_point.id
            || registry.map_or(false, |r| id == &r.repository_name)
    };

    for role in [&compute.roles.execution_role, &compute.roles.task_role] {
        if let Some(foreign) = role.scope().into_iter().find(|id| !allowed(*id)) {
            return Err(TopologyError::invariant(
                Stage::Compute,
                format!("role {} is granted access to foreign resource {}", role.id, foreign),
            ));
        }
    }

    if compute.container.mount.volume_id != storage.volume_id {
        return Err(TopologyError::invariant(
            Stage::Compute,
            format!(
                "container mounts {} instead of {}",
                compute.container.mount.volume_id, storage.volume_id
            ),
        ));
    }

    Ok(())
}

/// Validate the rollout fronts this compute graph
///
/// # Rules
/// - Both target groups health-route to the container port
/// - The binding and the deployment group manage this unit's service
/// - The deployment group shifts between this rollout's target groups
/// - The load balancer sits in the public tier
pub fn validate_rollout_target(
    network: &NetworkSpec,
    compute: &ComputeSpec,
    rollout: &RolloutSpec,
) -> TopologyResult<()> {
    let container_port = compute.container_port();
    if let Some(tg) = rollout
        .target_groups()
        .into_iter()
        .find(|tg| tg.health_check.port != container_port)
    {
        return Err(TopologyError::invariant(
            Stage::Rollout,
            format!(
                "target group {} health-checks port {} but the container listens on {}",
                tg.id, tg.health_check.port, container_port
            ),
        ));
    }

    if rollout.service_binding.container_port != container_port {
        return Err(TopologyError::invariant(
            Stage::Rollout,
            format!(
                "binding {} registers port {} but the container listens on {}",
                rollout.service_binding.id, rollout.service_binding.container_port, container_port
            ),
        ));
    }

    for (owner, service) in [
        (&rollout.service_binding.id, &rollout.service_binding.service),
        (&rollout.deployment.deployment_group_id, &rollout.deployment.service),
    ] {
        if service != &compute.service.id {
            return Err(TopologyError::invariant(
                Stage::Rollout,
                format!("{} manages {} instead of {}", owner, service, compute.service.id),
            ));
        }
    }

    let deployment = &rollout.deployment;
    if deployment.blue_target_group != rollout.target_group.id
        || deployment.green_target_group != rollout.green_target_group.id
        || deployment.blue_target_group == deployment.green_target_group
    {
        return Err(TopologyError::invariant(
            Stage::Rollout,
            format!(
                "deployment group {} does not shift between {} and {}",
                deployment.deployment_group_id, rollout.target_group.id, rollout.green_target_group.id
            ),
        ));
    }

    if !rollout
        .load_balancer
        .subnets
        .iter()
        .all(|s| network.is_public_subnet(s))
    {
        return Err(TopologyError::invariant(
            Stage::Rollout,
            format!("load balancer {} is outside the public tier", rollout.load_balancer.id),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TopologyConfig;
    use crate::domain::NamingScheme;
    use crate::graph::access::{IngressRule, Permission};
    use crate::graph::{BuildContext, ComputeGraph, NetworkGraph, RegistryGraph, RolloutGraph, StorageGraph};

    struct Specs {
        registry: RegistrySpec,
        network: NetworkSpec,
        storage: StorageSpec,
        compute: ComputeSpec,
        rollout: RolloutSpec,
    }

    fn specs(environment: &str) -> Specs {
        let config = TopologyConfig::new("qdrant", "qdrant-images", "/qdrant/storage", 6333)
            .with_image_version("1.9.0");
        let naming = NamingScheme::new("qdrant").unwrap();
        let ctx = BuildContext::new(&config, &naming);
        let unit = DeploymentUnit::new("us-east-1", environment, "LINUX_AMD64");

        let registry = RegistryGraph::build(&ctx, &unit).unwrap();
        let network = NetworkGraph::build(&ctx, &unit).unwrap();
        let storage = StorageGraph::build(&ctx, &unit, &network).unwrap();
        let compute = ComputeGraph::build(&ctx, &unit, Some(&registry), &network, &storage).unwrap();
        let rollout = RolloutGraph::build(&ctx, &unit, &network, &compute).unwrap();
        Specs {
            registry,
            network,
            storage,
            compute,
            rollout,
        }
    }

    #[test]
    fn test_consistent_specs_pass() {
        let s = specs("prod");
        assert!(validate_storage_ownership(&s.network, &s.storage).is_ok());
        assert!(validate_image_resolution(&s.compute, Some(&s.registry)).is_ok());
        assert!(validate_role_scope(&s.compute, &s.storage, Some(&s.registry)).is_ok());
        assert!(validate_rollout_target(&s.network, &s.compute, &s.rollout).is_ok());
    }

    #[test]
    fn test_collision_reports_both_kinds() {
        let s = specs("prod");
        let id = &s.network.vpc_id;
        match validate_unique_identifiers([(id, ResourceKind::Vpc), (id, ResourceKind::Cluster)]) {
            Err(TopologyError::IdentifierCollision { first, second, .. }) => {
                assert_eq!(first, ResourceKind::Vpc);
                assert_eq!(second, ResourceKind::Cluster);
            }
            other => panic!("expected collision, got {:?}", other),
        }
    }

    #[test]
    fn test_storage_from_another_unit_is_rejected() {
        let prod = specs("prod");
        let dev = specs("dev");
        assert!(validate_storage_ownership(&prod.network, &dev.storage).is_err());
    }

    #[test]
    fn test_foreign_grant_is_rejected() {
        let prod = specs("prod");
        let dev = specs("dev");

        let mut compute = prod.compute.clone();
        compute.roles.task_role = compute
            .roles
            .task_role
            .grant(&dev.storage.volume_id, [Permission::StorageWrite]);

        assert!(matches!(
            validate_role_scope(&compute, &prod.storage, Some(&prod.registry)),
            Err(TopologyError::Invariant { stage: Stage::Compute, .. })
        ));
    }

    #[test]
    fn test_storage_port_open_to_network_is_rejected() {
        let s = specs("prod");
        let mut storage = s.storage.clone();
        storage.access_boundary.ingress.push(IngressRule::new(
            STORAGE_PROTOCOL_PORT,
            TrafficSource::Block(s.network.address_block),
            "mounts from anywhere in the network",
        ));

        assert!(matches!(
            validate_storage_ownership(&s.network, &storage),
            Err(TopologyError::Invariant { stage: Stage::Storage, .. })
        ));
    }

    #[test]
    fn test_unpublished_image_is_rejected() {
        let prod = specs("prod");
        let dev = specs("dev");
        assert!(validate_image_resolution(&prod.compute, Some(&dev.registry)).is_err());
        assert!(validate_image_resolution(&prod.compute, None).is_err());
    }

    #[test]
    fn test_green_target_group_must_route_to_container() {
        let mut s = specs("prod");
        s.rollout.green_target_group.health_check.port = 8080;

        assert!(matches!(
            validate_rollout_target(&s.network, &s.compute, &s.rollout),
            Err(TopologyError::Invariant { stage: Stage::Rollout, .. })
        ));
    }

    #[test]
    fn test_rollout_for_other_compute_is_rejected() {
        let prod = specs("prod");
        let dev = specs("dev");
        assert!(validate_rollout_target(&prod.network, &prod.compute, &dev.rollout).is_err());
    }
}
