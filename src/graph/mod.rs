// Copyright (c) 2025 - Cowboy AI, Inc.
//! Resource Dependency Graph
//!
//! Each tier builder produces an immutable spec that contributes
//! [`ResourceNode`]s with explicit intra-unit dependency edges. A
//! [`ResourceGraph`] combines the five specs of one unit, checks the
//! cross-spec invariants and computes the creation order.
//!
//! # Ordering
//!
//! ```text
//! Registry ──────────────────────┐
//!                                ▼
//! Network ──► Storage ──► Compute ──► Rollout
//! ```
//!
//! The creation order is a topological sort of the node edges, tier-major,
//! ties broken by insertion order. Teardown is the exact reverse.

pub mod access;
pub mod assembly;
pub mod compute;
pub mod invariants;
pub mod network;
pub mod registry;
pub mod rollout;
pub mod storage;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use crate::config::TopologyConfig;
use crate::domain::{DeploymentUnit, NamingScheme, ResourceIdentifier, ResourceKind, Tier};
use crate::errors::{Stage, TopologyError, TopologyResult};

pub use access::{Grant, IngressRule, Permission, RoleSpec, SecurityGroupSpec, ServicePrincipal, TrafficSource};
pub use assembly::UnitAssembly;
pub use compute::{ComputeGraph, ComputeSpec};
pub use network::{NetworkGraph, NetworkSpec};
pub use registry::{RegistryGraph, RegistrySpec};
pub use rollout::{BlueGreenSpec, OutputSpec, OutputValue, RolloutGraph, RolloutSpec, TrafficShift};
pub use storage::{StorageGraph, StorageSpec};

/// One provisionable resource and the resources it needs first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceNode {
    pub id: ResourceIdentifier,
    pub kind: ResourceKind,
    pub depends_on: Vec<ResourceIdentifier>,
}

impl ResourceNode {
    pub fn new(id: &ResourceIdentifier, kind: ResourceKind) -> Self {
        Self {
            id: id.clone(),
            kind,
            depends_on: Vec::new(),
        }
    }

    pub fn after(mut self, dependency: &ResourceIdentifier) -> Self {
        if !self.depends_on.contains(dependency) {
            self.depends_on.push(dependency.clone());
        }
        self
    }

    pub fn after_all<'a, I>(self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = &'a ResourceIdentifier>,
    {
        dependencies.into_iter().fold(self, Self::after)
    }

    pub fn tier(&self) -> Tier {
        self.kind.tier()
    }
}

/// A tier spec that contributes nodes to a unit's graph
pub trait GraphFragment {
    /// Tier every node of this fragment belongs to
    fn tier(&self) -> Tier;

    /// Nodes in declaration order
    fn nodes(&self) -> Vec<ResourceNode>;

    /// Named values that are not provisioned resources
    fn exports(&self) -> Vec<(ResourceIdentifier, ResourceKind)> {
        Vec::new()
    }
}

/// Read-only inputs shared by every builder of a run
#[derive(Debug, Clone, Copy)]
pub struct BuildContext<'a> {
    pub config: &'a TopologyConfig,
    pub naming: &'a NamingScheme,
}

impl<'a> BuildContext<'a> {
    pub fn new(config: &'a TopologyConfig, naming: &'a NamingScheme) -> Self {
        Self { config, naming }
    }
}

/// Complete, validated resource graph of one deployment unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceGraph {
    pub unit: DeploymentUnit,
    pub registry: Option<RegistrySpec>,
    pub network: NetworkSpec,
    pub storage: StorageSpec,
    pub compute: ComputeSpec,
    pub rollout: RolloutSpec,
    creation_order: Vec<ResourceNode>,
}

impl ResourceGraph {
    /// Combine the tier specs of one unit
    ///
    /// # Errors
    /// - `IdentifierCollision` if two resources share an identifier
    /// - `OrderingViolation` on a dangling edge, an edge into a later tier,
    ///   or a cycle
    /// - `Invariant` if the specs are not bound to each other
    pub fn new(
        unit: DeploymentUnit,
        registry: Option<RegistrySpec>,
        network: NetworkSpec,
        storage: StorageSpec,
        compute: ComputeSpec,
        rollout: RolloutSpec,
    ) -> TopologyResult<Self> {
        invariants::validate_unit_binding(&unit, &network)?;
        invariants::validate_storage_ownership(&network, &storage)?;
        invariants::validate_image_resolution(&compute, registry.as_ref())?;
        invariants::validate_role_scope(&compute, &storage, registry.as_ref())?;
        invariants::validate_rollout_target(&network, &compute, &rollout)?;

        let mut nodes = Vec::new();
        if let Some(registry) = &registry {
            nodes.extend(registry.nodes());
        }
        nodes.extend(network.nodes());
        nodes.extend(storage.nodes());
        nodes.extend(compute.nodes());
        nodes.extend(rollout.nodes());

        invariants::validate_unique_identifiers(
            nodes
                .iter()
                .map(|n| (&n.id, n.kind))
                .chain(rollout.exports().iter().map(|(id, kind)| (id, *kind))),
        )?;

        let creation_order = creation_order(nodes)?;

        Ok(Self {
            unit,
            registry,
            network,
            storage,
            compute,
            rollout,
            creation_order,
        })
    }

    /// Nodes in the order they must be created
    pub fn creation_order(&self) -> &[ResourceNode] {
        &self.creation_order
    }

    /// Nodes in the order they must be destroyed
    pub fn teardown_order(&self) -> Vec<&ResourceNode> {
        self.creation_order.iter().rev().collect()
    }

    /// Every identifier the unit owns, exports included
    pub fn identifiers(&self) -> Vec<(&ResourceIdentifier, ResourceKind)> {
        self.creation_order
            .iter()
            .map(|n| (&n.id, n.kind))
            .chain(self.rollout.exports.iter().map(|o| (&o.id, o.kind)))
            .collect()
    }

    pub fn exports(&self) -> &[OutputSpec] {
        &self.rollout.exports
    }

    pub fn node(&self, id: &ResourceIdentifier) -> Option<&ResourceNode> {
        self.creation_order.iter().find(|n| &n.id == id)
    }
}

/// Kahn's algorithm over the node edges, tier-major
fn creation_order(nodes: Vec<ResourceNode>) -> TopologyResult<Vec<ResourceNode>> {
    let index: HashMap<&ResourceIdentifier, usize> =
        nodes.iter().enumerate().map(|(i, n)| (&n.id, i)).collect();

    let mut pending = vec![0usize; nodes.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];

    for (i, node) in nodes.iter().enumerate() {
        for dependency in &node.depends_on {
            let Some(&d) = index.get(dependency) else {
                return Err(TopologyError::ordering(
                    Stage::Assembly,
                    format!("{} {} depends on missing {}", node.kind, node.id, dependency),
                ));
            };

            if nodes[d].tier() > node.tier() {
                return Err(TopologyError::ordering(
                    Stage::Assembly,
                    format!(
                        "{} ({}) depends on {} ({}) from a later tier",
                        node.kind,
                        node.tier(),
                        nodes[d].kind,
                        nodes[d].tier()
                    ),
                ));
            }

            pending[i] += 1;
            dependents[d].push(i);
        }
    }

    let mut ready: BTreeSet<(Tier, usize)> = nodes
        .iter()
        .enumerate()
        .filter(|(i, _)| pending[*i] == 0)
        .map(|(i, n)| (n.tier(), i))
        .collect();

    let mut order = Vec::with_capacity(nodes.len());
    while let Some((_, i)) = ready.pop_first() {
        order.push(i);
        for &dependent in &dependents[i] {
            pending[dependent] -= 1;
            if pending[dependent] == 0 {
                ready.insert((nodes[dependent].tier(), dependent));
            }
        }
    }

    if order.len() != nodes.len() {
        let stuck: Vec<String> = nodes
            .iter()
            .enumerate()
            .filter(|(i, _)| pending[*i] > 0)
            .map(|(_, n)| n.id.to_string())
            .collect();
        return Err(TopologyError::ordering(
            Stage::Assembly,
            format!("dependency cycle between {}", stuck.join(", ")),
        ));
    }

    let mut slots: Vec<Option<ResourceNode>> = nodes.into_iter().map(Some).collect();
    Ok(order
        .into_iter()
        .filter_map(|i| slots[i].take())
        .collect())
}
