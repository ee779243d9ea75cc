// Copyright (c) 2025 - Cowboy AI, Inc.
//! Provisioning Plan
//!
//! Pure conversion of a [`ResourceGraph`] into the description handed to the
//! external orchestrator: ordered creation steps, ordered teardown steps,
//! the unit exports and the tags applied to every resource of the unit.
//!
//! ```text
//! ResourceGraph ──emit()──► ProvisioningPlan ──to_json()──► orchestrator
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::{DeploymentUnit, ResourceIdentifier, ResourceKind, Tier};
use crate::graph::{OutputValue, ResourceGraph, ResourceNode};
use crate::errors::TopologyResult;

/// What a step does to its resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepAction {
    Create,
    Destroy,
}

/// One ordered step of a plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedStep {
    pub sequence: usize,
    pub action: StepAction,
    pub resource: ResourceIdentifier,
    pub kind: ResourceKind,
    pub tier: Tier,
    pub depends_on: Vec<ResourceIdentifier>,
    /// Key the orchestrator uses to skip work already done
    pub idempotency_key: String,
    /// Left in place on teardown
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub retain: bool,
}

/// Export with its placeholder rendering
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedOutput {
    pub name: ResourceIdentifier,
    pub kind: ResourceKind,
    pub template: String,
    pub value: OutputValue,
}

/// Serializable description of one unit's provisioning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisioningPlan {
    pub unit: DeploymentUnit,
    pub creation: Vec<PlannedStep>,
    pub teardown: Vec<PlannedStep>,
    pub outputs: Vec<PlannedOutput>,
    /// Applied to every resource the plan creates
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    pub graph: ResourceGraph,
}

impl ProvisioningPlan {
    pub fn to_json(&self) -> TopologyResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> TopologyResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Creation steps belonging to one tier
    pub fn creation_in(&self, tier: Tier) -> impl Iterator<Item = &PlannedStep> {
        self.creation.iter().filter(move |step| step.tier == tier)
    }
}

/// Emit the plan for a built graph
pub fn emit(graph: &ResourceGraph) -> ProvisioningPlan {
    let retained = retained_resources(graph);
    let step = |sequence: usize, action: StepAction, node: &ResourceNode| PlannedStep {
        sequence,
        action,
        resource: node.id.clone(),
        kind: node.kind,
        tier: node.tier(),
        depends_on: node.depends_on.clone(),
        idempotency_key: idempotency_key(graph, node),
        retain: action == StepAction::Destroy && retained.contains(&node.id),
    };

    let creation = graph
        .creation_order()
        .iter()
        .enumerate()
        .map(|(i, node)| step(i, StepAction::Create, node))
        .collect();

    let teardown = graph
        .teardown_order()
        .into_iter()
        .enumerate()
        .map(|(i, node)| step(i, StepAction::Destroy, node))
        .collect();

    let outputs = graph
        .exports()
        .iter()
        .map(|output| PlannedOutput {
            name: output.id.clone(),
            kind: output.kind,
            template: output.value.template(),
            value: output.value.clone(),
        })
        .collect();

    ProvisioningPlan {
        unit: graph.unit.clone(),
        creation,
        teardown,
        outputs,
        tags: unit_tags(&graph.unit),
        graph: graph.clone(),
    }
}

/// Tags identifying the unit a resource belongs to
pub fn unit_tags(unit: &DeploymentUnit) -> BTreeMap<String, String> {
    [
        ("environment", unit.environment()),
        ("region", unit.region()),
        ("platform", unit.platform_token()),
    ]
    .into_iter()
    .map(|(key, value)| (key.to_string(), value.to_string()))
    .collect()
}

fn retained_resources(graph: &ResourceGraph) -> Vec<ResourceIdentifier> {
    if graph.storage.retention_lifecycle.retain_on_teardown {
        vec![graph.storage.volume_id.clone()]
    } else {
        Vec::new()
    }
}

fn idempotency_key(graph: &ResourceGraph, node: &ResourceNode) -> String {
    graph
        .registry
        .iter()
        .flat_map(|registry| registry.promotion.iter())
        .find(|step| step.id == node.id)
        .map(|step| step.idempotency_key.clone())
        .unwrap_or_else(|| node.id.to_string())
}
