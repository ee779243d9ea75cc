// Copyright (c) 2025 - Cowboy AI, Inc.
//! Unit Assembly
//!
//! Staging value for one unit. Each `build_*` step reads the specs produced
//! by earlier steps; invoking a step before its prerequisites exist is an
//! ordering violation, never a silent default.
//!
//! ```text
//! build_registry ─────────────────────┐ (when images are promoted)
//!                                     ▼
//! build_network ─► build_storage ─► build_compute ─► build_rollout ─► finish
//! ```

use tracing::debug;

use super::{
    BuildContext, ComputeGraph, ComputeSpec, NetworkGraph, NetworkSpec, RegistryGraph,
    RegistrySpec, ResourceGraph, RolloutGraph, RolloutSpec, StorageGraph, StorageSpec,
};
use crate::domain::DeploymentUnit;
use crate::errors::{Stage, TopologyError, TopologyResult, UnitError};

/// Partially built resource graph of one unit
#[derive(Debug, Clone)]
pub struct UnitAssembly {
    unit: DeploymentUnit,
    registry: Option<RegistrySpec>,
    network: Option<NetworkSpec>,
    storage: Option<StorageSpec>,
    compute: Option<ComputeSpec>,
    rollout: Option<RolloutSpec>,
}

impl UnitAssembly {
    pub fn new(unit: DeploymentUnit) -> Self {
        Self {
            unit,
            registry: None,
            network: None,
            storage: None,
            compute: None,
            rollout: None,
        }
    }

    pub fn unit(&self) -> &DeploymentUnit {
        &self.unit
    }

    pub fn registry(&self) -> Option<&RegistrySpec> {
        self.registry.as_ref()
    }

    pub fn network(&self) -> Option<&NetworkSpec> {
        self.network.as_ref()
    }

    pub fn storage(&self) -> Option<&StorageSpec> {
        self.storage.as_ref()
    }

    pub fn compute(&self) -> Option<&ComputeSpec> {
        self.compute.as_ref()
    }

    pub fn rollout(&self) -> Option<&RolloutSpec> {
        self.rollout.as_ref()
    }

    pub fn build_registry(&mut self, ctx: &BuildContext<'_>) -> TopologyResult<&RegistrySpec> {
        if self.compute.is_some() {
            return Err(TopologyError::ordering(
                Stage::Registry,
                "registry built after the compute graph that pulls from it",
            ));
        }
        let spec = RegistryGraph::build(ctx, &self.unit)?;
        Ok(&*self.registry.insert(spec))
    }

    pub fn build_network(&mut self, ctx: &BuildContext<'_>) -> TopologyResult<&NetworkSpec> {
        if self.storage.is_some() {
            return Err(TopologyError::ordering(
                Stage::Network,
                "network rebuilt after storage was bound to it",
            ));
        }
        let spec = NetworkGraph::build(ctx, &self.unit)?;
        Ok(&*self.network.insert(spec))
    }

    pub fn build_storage(&mut self, ctx: &BuildContext<'_>) -> TopologyResult<&StorageSpec> {
        let network = self.network.as_ref().ok_or_else(|| {
            TopologyError::ordering(Stage::Storage, "storage built before its network graph")
        })?;
        let spec = StorageGraph::build(ctx, &self.unit, network)?;
        Ok(&*self.storage.insert(spec))
    }

    pub fn build_compute(&mut self, ctx: &BuildContext<'_>) -> TopologyResult<&ComputeSpec> {
        let (Some(network), Some(storage)) = (self.network.as_ref(), self.storage.as_ref()) else {
            return Err(TopologyError::ordering(
                Stage::Compute,
                "compute built before its network and storage graphs",
            ));
        };

        if ctx.config.registry.promote && self.registry.is_none() {
            return Err(TopologyError::ordering(
                Stage::Compute,
                "compute built before the registry it pulls from",
            ));
        }

        let spec = ComputeGraph::build(ctx, &self.unit, self.registry.as_ref(), network, storage)?;
        Ok(&*self.compute.insert(spec))
    }

    pub fn build_rollout(&mut self, ctx: &BuildContext<'_>) -> TopologyResult<&RolloutSpec> {
        let (Some(network), Some(compute)) = (self.network.as_ref(), self.compute.as_ref()) else {
            return Err(TopologyError::ordering(
                Stage::Rollout,
                "rollout built before its compute graph",
            ));
        };
        let spec = RolloutGraph::build(ctx, &self.unit, network, compute)?;
        Ok(&*self.rollout.insert(spec))
    }

    /// Combine the built specs into a validated graph
    pub fn finish(self) -> TopologyResult<ResourceGraph> {
        let missing = |what: &str| {
            TopologyError::ordering(Stage::Assembly, format!("{} graph was never built", what))
        };

        let network = self.network.ok_or_else(|| missing("network"))?;
        let storage = self.storage.ok_or_else(|| missing("storage"))?;
        let compute = self.compute.ok_or_else(|| missing("compute"))?;
        let rollout = self.rollout.ok_or_else(|| missing("rollout"))?;

        ResourceGraph::new(self.unit, self.registry, network, storage, compute, rollout)
    }

    /// Run every step in dependency order
    ///
    /// The unit's axis values are checked first so a unit with unsafe tokens
    /// fails before any spec is built.
    pub fn build_all(unit: DeploymentUnit, ctx: &BuildContext<'_>) -> Result<ResourceGraph, UnitError> {
        if let Err(err) = unit.validate() {
            return Err(UnitError::new(unit, Stage::Naming, err));
        }

        let failed_in = |stage: Stage| {
            let unit = unit.clone();
            move |err: TopologyError| UnitError::new(unit, stage, err)
        };

        let mut assembly = Self::new(unit.clone());
        if ctx.config.registry.promote {
            assembly.build_registry(ctx).map_err(failed_in(Stage::Registry))?;
        }
        assembly.build_network(ctx).map_err(failed_in(Stage::Network))?;
        assembly.build_storage(ctx).map_err(failed_in(Stage::Storage))?;
        assembly.build_compute(ctx).map_err(failed_in(Stage::Compute))?;
        assembly.build_rollout(ctx).map_err(failed_in(Stage::Rollout))?;

        debug!(unit = %unit, "all tiers built");

        assembly.finish().map_err(failed_in(Stage::Assembly))
    }
}
