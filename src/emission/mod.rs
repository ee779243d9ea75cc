// Copyright (c) 2025 - Cowboy AI, Inc.
//! Graph Emission
//!
//! - [`plan`] - pure conversion of a resource graph into a provisioning plan
//! - [`executor`] - async seam to the external orchestrator

pub mod executor;
pub mod plan;

pub use executor::{
    destroy_all, execute_all, DryRunExecutor, ExecutionReport, ExecutorError, PlanExecutor,
    RecordedStep, RecordingExecutor,
};
pub use plan::{emit, unit_tags, PlannedOutput, PlannedStep, ProvisioningPlan, StepAction};
