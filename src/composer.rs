// Copyright (c) 2025 - Cowboy AI, Inc.
//! Topology Composer
//!
//! Entry point of a composition run: validates the configuration, expands
//! the environment matrix and drives every deployment unit through its
//! lifecycle.
//!
//! ```text
//! TopologyConfig
//!     ↓ validate
//! EnvironmentMatrix::expand
//!     ↓ per unit
//! UnitAssembly::build_all → cross-unit identifier check → emit
//!     ↓
//! Composition (one outcome per unit)
//! ```
//!
//! # Failure Isolation
//!
//! Configuration errors abort the run before any unit is planned. Once the
//! matrix is expanded, a failing unit only fails itself; every other unit
//! still builds and emits.

use std::collections::HashMap;
use tracing::{debug, info, info_span, warn};
use uuid::Uuid;

use crate::config::TopologyConfig;
use crate::domain::{DeploymentUnit, NamingScheme, ResourceIdentifier, ResourceKind};
use crate::emission::{emit, ProvisioningPlan};
use crate::errors::{ConfigurationError, Stage, TopologyError, UnitError};
use crate::graph::{BuildContext, ResourceGraph, UnitAssembly};
use crate::matrix::EnvironmentMatrix;
use crate::state_machine::{LifecycleCommand, UnitLifecycle, UnitState};

/// Emitted plan of one unit with its serialized form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmittedUnit {
    pub plan: ProvisioningPlan,
    /// Pretty JSON handed to the orchestrator
    pub document: String,
}

/// Outcome of one unit in a composition run
#[derive(Debug, Clone)]
pub struct UnitOutcome {
    pub unit: DeploymentUnit,
    pub lifecycle: UnitLifecycle,
    pub result: Result<EmittedUnit, UnitError>,
}

impl UnitOutcome {
    pub fn state(&self) -> UnitState {
        self.lifecycle.state()
    }
}

/// Result of a composition run
#[derive(Debug, Clone)]
pub struct Composition {
    pub run_id: Uuid,
    pub outcomes: Vec<UnitOutcome>,
}

impl Composition {
    pub fn emitted(&self) -> impl Iterator<Item = &EmittedUnit> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = &UnitError> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().err())
    }

    /// Plans of every emitted unit, in matrix order
    pub fn plans(&self) -> Vec<ProvisioningPlan> {
        self.emitted().map(|e| e.plan.clone()).collect()
    }

    pub fn outcome(&self, unit: &DeploymentUnit) -> Option<&UnitOutcome> {
        self.outcomes.iter().find(|o| &o.unit == unit)
    }

    /// True when every unit emitted
    pub fn is_complete(&self) -> bool {
        self.outcomes.iter().all(|o| o.result.is_ok())
    }
}

/// Composes the resource graphs of every deployment unit
#[derive(Debug, Clone)]
pub struct TopologyComposer {
    config: TopologyConfig,
    naming: NamingScheme,
}

impl TopologyComposer {
    /// Validate the configuration and prepare the naming scheme
    pub fn new(config: TopologyConfig) -> Result<Self, ConfigurationError> {
        config.validate()?;
        let naming = NamingScheme::new(&config.app_name)?;
        Ok(Self { config, naming })
    }

    pub fn config(&self) -> &TopologyConfig {
        &self.config
    }

    pub fn naming(&self) -> &NamingScheme {
        &self.naming
    }

    /// Expand the configured axes
    pub fn plan_units(&self) -> Result<Vec<DeploymentUnit>, ConfigurationError> {
        EnvironmentMatrix::expand(
            &self.config.regions,
            &self.config.environments,
            &self.config.platforms,
        )
    }

    /// Build the graph of a single unit
    pub fn build_unit(&self, unit: DeploymentUnit) -> Result<ResourceGraph, UnitError> {
        UnitAssembly::build_all(unit, &BuildContext::new(&self.config, &self.naming))
    }

    /// Run the whole composition
    ///
    /// # Errors
    /// Only configuration errors are returned here. Unit failures are
    /// reported per unit in the [`Composition`].
    pub fn compose(&self) -> Result<Composition, ConfigurationError> {
        let units = self.plan_units()?;
        let run_id = Uuid::now_v7();

        let span = info_span!("compose", %run_id, app = %self.config.app_name);
        let _guard = span.enter();
        info!(units = units.len(), "composing topology");

        let mut owners = IdentifierOwners::default();
        let mut outcomes = Vec::with_capacity(units.len());

        for unit in units {
            let _unit_span = info_span!("unit", %unit).entered();
            let mut lifecycle = UnitLifecycle::new(unit.clone());

            let result = self.run_unit(&unit, &mut lifecycle, &mut owners);
            match &result {
                Ok(emitted) => info!(
                    steps = emitted.plan.creation.len(),
                    "unit emitted"
                ),
                Err(err) => {
                    warn!(stage = %err.stage, error = %err.source, "unit failed");
                    if let Err(transition) =
                        lifecycle.apply(LifecycleCommand::Fail { stage: err.stage })
                    {
                        debug!(error = %transition, "lifecycle already terminal");
                    }
                }
            }

            outcomes.push(UnitOutcome {
                unit,
                lifecycle,
                result,
            });
        }

        let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
        info!(
            emitted = outcomes.len() - failed,
            failed, "composition finished"
        );

        Ok(Composition { run_id, outcomes })
    }

    fn run_unit(
        &self,
        unit: &DeploymentUnit,
        lifecycle: &mut UnitLifecycle,
        owners: &mut IdentifierOwners,
    ) -> Result<EmittedUnit, UnitError> {
        let failed_in =
            |stage: Stage| move |err: TopologyError| UnitError::new(unit.clone(), stage, err);

        let graph = self.build_unit(unit.clone())?;
        owners
            .claim(&graph)
            .map_err(failed_in(Stage::Assembly))?;
        lifecycle
            .apply(LifecycleCommand::BuildGraph)
            .map_err(|err| failed_in(Stage::Assembly)(err.into()))?;

        let plan = emit(&graph);
        let document = plan.to_json().map_err(failed_in(Stage::Emission))?;
        lifecycle
            .apply(LifecycleCommand::Emit)
            .map_err(|err| failed_in(Stage::Emission)(err.into()))?;

        Ok(EmittedUnit { plan, document })
    }
}

/// Identifiers claimed by earlier units of the same run
#[derive(Debug, Default)]
struct IdentifierOwners {
    owners: HashMap<ResourceIdentifier, ResourceKind>,
}

impl IdentifierOwners {
    /// Claim every identifier of `graph`, or none of them
    fn claim(&mut self, graph: &ResourceGraph) -> Result<(), TopologyError> {
        let identifiers = graph.identifiers();

        if let Some((identifier, kind, first)) = identifiers.iter().find_map(|(id, kind)| {
            self.owners
                .get(*id)
                .map(|first| ((*id).clone(), *kind, *first))
        }) {
            return Err(TopologyError::IdentifierCollision {
                identifier,
                first,
                second: kind,
            });
        }

        self.owners
            .extend(identifiers.into_iter().map(|(id, kind)| (id.clone(), kind)));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn config() -> TopologyConfig {
        TopologyConfig::new("qdrant", "qdrant-images", "/qdrant/storage", 6333)
            .with_regions(["us-east-1"])
            .with_environments(["dev", "prod"])
            .with_platforms(["LINUX_AMD64"])
            .with_image_version("1.9.0")
    }

    #[test]
    fn test_compose_emits_every_unit() {
        let composition = TopologyComposer::new(config()).unwrap().compose().unwrap();

        assert!(composition.is_complete());
        assert_eq!(composition.outcomes.len(), 2);
        for outcome in &composition.outcomes {
            assert_eq!(outcome.state(), UnitState::Emitted);
            assert_eq!(outcome.lifecycle.history().len(), 2);
        }
        assert_eq!(composition.plans().len(), 2);
    }

    #[test]
    fn test_empty_axis_fails_before_planning() {
        let mut config = config();
        config.environments.clear();
        let composer = TopologyComposer::new(config).unwrap();

        assert!(matches!(
            composer.compose(),
            Err(ConfigurationError::EmptyAxis { .. })
        ));
    }

    #[test]
    fn test_invalid_config_is_rejected_up_front() {
        let config = TopologyConfig::new("qdrant", "qdrant-images", "relative/path", 6333);
        assert!(matches!(
            TopologyComposer::new(config),
            Err(ConfigurationError::RelativePath { .. })
        ));
    }

    #[test]
    fn test_bad_unit_fails_alone() {
        let config = config().with_environments(["dev", "Prod"]);
        let composition = TopologyComposer::new(config).unwrap().compose().unwrap();

        let states: Vec<UnitState> = composition.outcomes.iter().map(|o| o.state()).collect();
        assert_eq!(states, vec![UnitState::Emitted, UnitState::Failed]);

        let failure = composition.failures().next().unwrap();
        assert_eq!(failure.stage, Stage::Naming);
        assert_eq!(failure.unit.environment(), "Prod");
        assert_eq!(
            composition.outcomes[1].lifecycle.failed_stage(),
            Some(Stage::Naming)
        );
    }

    #[test]
    fn test_reclaiming_a_graph_collides() {
        let composer = TopologyComposer::new(config()).unwrap();
        let graph = composer
            .build_unit(DeploymentUnit::new("us-east-1", "dev", "LINUX_AMD64"))
            .unwrap();

        let mut owners = IdentifierOwners::default();
        owners.claim(&graph).unwrap();
        assert!(matches!(
            owners.claim(&graph),
            Err(TopologyError::IdentifierCollision { .. })
        ));
    }

    #[test]
    fn test_documents_parse_back_to_plans() {
        let composition = TopologyComposer::new(config()).unwrap().compose().unwrap();
        for emitted in composition.emitted() {
            assert_eq!(
                ProvisioningPlan::from_json(&emitted.document).unwrap(),
                emitted.plan
            );
        }
    }
}
