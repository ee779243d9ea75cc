// Copyright (c) 2025 - Cowboy AI, Inc.
//! Deployment Unit Lifecycle State Machine
//!
//! Uses the generic StateMachine trait from parent module.
//!
//! # States
//!
//! - Planned: Unit produced by the environment matrix
//! - GraphBuilt: Every tier spec built and validated
//! - Emitted: Graph serialized for the orchestrator (terminal)
//! - Failed: A builder rejected the unit (terminal)
//!
//! # Inputs
//!
//! - BuildGraph: Planned → GraphBuilt
//! - Emit: GraphBuilt → Emitted
//! - Fail: Planned | GraphBuilt → Failed
//!
//! A failed unit never affects the lifecycle of any other unit.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{StateMachine, StateMachineWithHistory, Transition, TransitionError, TransitionResult};
use crate::domain::DeploymentUnit;
use crate::errors::Stage;

/// Lifecycle state of one unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitState {
    Planned,
    GraphBuilt,
    Emitted,
    Failed,
}

impl fmt::Display for UnitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Planned => write!(f, "Planned"),
            Self::GraphBuilt => write!(f, "GraphBuilt"),
            Self::Emitted => write!(f, "Emitted"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

/// Lifecycle command (FSM input)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "command")]
pub enum LifecycleCommand {
    /// All tier builders succeeded
    BuildGraph,

    /// The graph was serialized
    Emit,

    /// A stage rejected the unit
    Fail { stage: Stage },
}

impl StateMachine for UnitState {
    type Input = LifecycleCommand;
    type Output = ();

    fn transition(&self, input: &Self::Input) -> TransitionResult<(Self, Self::Output)> {
        use LifecycleCommand::*;
        use UnitState::*;

        match (self, input) {
            (Planned, BuildGraph) => Ok((GraphBuilt, ())),
            (GraphBuilt, Emit) => Ok((Emitted, ())),
            (Planned | GraphBuilt, Fail { .. }) => Ok((Failed, ())),

            (Planned, Emit) => Err(TransitionError::PreconditionFailed(
                "a unit is emitted only after its graph is built".to_string(),
            )),

            (GraphBuilt, BuildGraph) => Err(TransitionError::InvalidTransition {
                from: GraphBuilt.to_string(),
                to: GraphBuilt.to_string(),
            }),

            (Emitted | Failed, _) => Err(TransitionError::InvalidTransition {
                from: self.to_string(),
                to: "any state".to_string(),
            }),
        }
    }

    fn is_terminal(&self) -> bool {
        matches!(self, Self::Emitted | Self::Failed)
    }
}

/// Lifecycle of one unit within a composition run
#[derive(Debug, Clone)]
pub struct UnitLifecycle {
    unit: DeploymentUnit,
    machine: StateMachineWithHistory<UnitState>,
    failed_stage: Option<Stage>,
}

impl UnitLifecycle {
    pub fn new(unit: DeploymentUnit) -> Self {
        Self {
            unit,
            machine: StateMachineWithHistory::new(UnitState::Planned),
            failed_stage: None,
        }
    }

    pub fn unit(&self) -> &DeploymentUnit {
        &self.unit
    }

    pub fn state(&self) -> UnitState {
        *self.machine.current_state()
    }

    /// Stage that failed the unit, if it failed
    pub fn failed_stage(&self) -> Option<Stage> {
        self.failed_stage
    }

    pub fn history(&self) -> &[Transition<UnitState, LifecycleCommand>] {
        self.machine.get_history()
    }

    pub fn apply(&mut self, command: LifecycleCommand) -> TransitionResult<UnitState> {
        self.machine.transition_with_history(command, Utc::now())?;
        if let LifecycleCommand::Fail { stage } = command {
            self.failed_stage = Some(stage);
        }
        Ok(self.state())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lifecycle() -> UnitLifecycle {
        UnitLifecycle::new(DeploymentUnit::new("us-east-1", "prod", "LINUX_AMD64"))
    }

    #[test]
    fn test_happy_path() {
        let mut lifecycle = lifecycle();
        assert_eq!(lifecycle.state(), UnitState::Planned);

        assert_eq!(
            lifecycle.apply(LifecycleCommand::BuildGraph).unwrap(),
            UnitState::GraphBuilt
        );
        assert_eq!(lifecycle.apply(LifecycleCommand::Emit).unwrap(), UnitState::Emitted);

        assert!(lifecycle.state().is_terminal());
        assert_eq!(lifecycle.history().len(), 2);
        assert_eq!(lifecycle.failed_stage(), None);
    }

    #[test]
    fn test_failure_records_stage() {
        let mut lifecycle = lifecycle();
        lifecycle
            .apply(LifecycleCommand::Fail {
                stage: Stage::Compute,
            })
            .unwrap();

        assert_eq!(lifecycle.state(), UnitState::Failed);
        assert_eq!(lifecycle.failed_stage(), Some(Stage::Compute));
    }

    #[test]
    fn test_emit_requires_built_graph() {
        assert!(matches!(
            UnitState::Planned.transition(&LifecycleCommand::Emit),
            Err(TransitionError::PreconditionFailed(_))
        ));
    }

    #[test]
    fn test_terminal_states_reject_everything() {
        for state in [UnitState::Emitted, UnitState::Failed] {
            assert!(state.is_terminal());
            for command in [
                LifecycleCommand::BuildGraph,
                LifecycleCommand::Emit,
                LifecycleCommand::Fail {
                    stage: Stage::Emission,
                },
            ] {
                assert!(!state.can_transition(&command));
            }
        }
    }

    #[test]
    fn test_rebuild_is_rejected() {
        let mut lifecycle = lifecycle();
        lifecycle.apply(LifecycleCommand::BuildGraph).unwrap();
        assert!(lifecycle.apply(LifecycleCommand::BuildGraph).is_err());
        assert_eq!(lifecycle.state(), UnitState::GraphBuilt);
    }
}
