// Copyright (c) 2025 - Cowboy AI, Inc.
//! Plan Executors
//!
//! The seam between pure topology construction and the external
//! orchestrator that actually provisions resources.
//!
//! ```text
//! Pure Composition              Executor
//! ────────────────             ──────────
//!
//! TopologyConfig               ProvisioningPlan
//!      │                              │
//!      ▼                              ▼
//! ┌─────────────┐   Plans      ┌──────────────┐
//! │  compose()  │ ──────────>  │   apply()    │
//! │ (pure func) │              │ (async I/O)  │
//! └─────────────┘              └──────────────┘
//! ```
//!
//! Units are independent, so [`execute_all`] and [`destroy_all`] hand every
//! plan to the executor concurrently and return one result per unit.

use async_trait::async_trait;
use futures::future::join_all;
use std::collections::{BTreeMap, HashSet};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::plan::{PlannedStep, ProvisioningPlan, StepAction};
use crate::domain::{DeploymentUnit, ResourceIdentifier};

/// Trait for executing provisioning plans
///
/// Implementations must make `apply` idempotent per step idempotency key:
/// applying the same plan twice performs each step at most once.
#[async_trait]
pub trait PlanExecutor: Send + Sync {
    /// Create every resource in creation order
    async fn apply(&self, plan: &ProvisioningPlan) -> Result<ExecutionReport, ExecutorError>;

    /// Destroy every resource in teardown order
    async fn destroy(&self, plan: &ProvisioningPlan) -> Result<ExecutionReport, ExecutorError>;
}

/// Errors that can occur during plan execution
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecutorError {
    /// Executor refused the whole plan
    #[error("Plan for {unit} rejected: {reason}")]
    Rejected { unit: DeploymentUnit, reason: String },

    /// One step failed
    #[error("Step {resource} failed: {reason}")]
    StepFailed {
        resource: ResourceIdentifier,
        reason: String,
    },

    /// Execution failed
    #[error("Execution failed: {0}")]
    ExecutionFailed(String),
}

/// Result of running a plan
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExecutionReport {
    pub unit: Option<DeploymentUnit>,
    /// Steps performed, in order
    pub performed: Vec<ResourceIdentifier>,
    /// Steps skipped as already done or retained
    pub skipped: Vec<ResourceIdentifier>,
    /// Rendered exports by name
    pub outputs: BTreeMap<String, String>,
}

impl ExecutionReport {
    fn for_unit(unit: &DeploymentUnit) -> Self {
        Self {
            unit: Some(unit.clone()),
            ..Self::default()
        }
    }
}

/// Dry-run executor - logs every step but performs nothing
///
/// Outputs are reported as their placeholder templates.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunExecutor;

impl DryRunExecutor {
    pub fn new() -> Self {
        Self
    }

    fn log_steps(&self, plan: &ProvisioningPlan, steps: &[PlannedStep]) -> ExecutionReport {
        let mut report = ExecutionReport::for_unit(&plan.unit);
        for step in steps {
            if step.retain {
                debug!(unit = %plan.unit, resource = %step.resource, "retain");
                report.skipped.push(step.resource.clone());
                continue;
            }
            debug!(
                unit = %plan.unit,
                sequence = step.sequence,
                action = ?step.action,
                kind = %step.kind,
                resource = %step.resource,
                "dry-run step"
            );
            report.performed.push(step.resource.clone());
        }
        report
    }
}

#[async_trait]
impl PlanExecutor for DryRunExecutor {
    async fn apply(&self, plan: &ProvisioningPlan) -> Result<ExecutionReport, ExecutorError> {
        let mut report = self.log_steps(plan, &plan.creation);
        for output in &plan.outputs {
            report
                .outputs
                .insert(output.name.to_string(), output.template.clone());
        }
        info!(
            unit = %plan.unit,
            steps = report.performed.len(),
            tags = ?plan.tags,
            "dry-run apply"
        );
        Ok(report)
    }

    async fn destroy(&self, plan: &ProvisioningPlan) -> Result<ExecutionReport, ExecutorError> {
        let report = self.log_steps(plan, &plan.teardown);
        info!(unit = %plan.unit, steps = report.performed.len(), "dry-run destroy");
        Ok(report)
    }
}

/// Step seen by a [`RecordingExecutor`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedStep {
    pub unit: DeploymentUnit,
    pub action: StepAction,
    pub resource: ResourceIdentifier,
}

#[derive(Debug, Default)]
struct RecordingState {
    steps: Vec<RecordedStep>,
    applied_keys: HashSet<String>,
}

/// Recording executor - records performed steps in memory
///
/// Honors idempotency keys across calls, so re-applying a plan records
/// nothing new. Useful for tests of the orchestration contract.
#[derive(Debug, Default)]
pub struct RecordingExecutor {
    state: Mutex<RecordingState>,
    failing_units: HashSet<DeploymentUnit>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every plan for `unit`
    pub fn failing_on(mut self, unit: DeploymentUnit) -> Self {
        self.failing_units.insert(unit);
        self
    }

    pub async fn steps(&self) -> Vec<RecordedStep> {
        self.state.lock().await.steps.clone()
    }

    pub async fn steps_for(&self, unit: &DeploymentUnit) -> Vec<RecordedStep> {
        self.state
            .lock()
            .await
            .steps
            .iter()
            .filter(|step| &step.unit == unit)
            .cloned()
            .collect()
    }

    fn check(&self, plan: &ProvisioningPlan) -> Result<(), ExecutorError> {
        if self.failing_units.contains(&plan.unit) {
            warn!(unit = %plan.unit, "plan rejected");
            return Err(ExecutorError::Rejected {
                unit: plan.unit.clone(),
                reason: "configured to fail".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PlanExecutor for RecordingExecutor {
    async fn apply(&self, plan: &ProvisioningPlan) -> Result<ExecutionReport, ExecutorError> {
        self.check(plan)?;

        let mut state = self.state.lock().await;
        let mut report = ExecutionReport::for_unit(&plan.unit);

        for step in &plan.creation {
            if !state.applied_keys.insert(step.idempotency_key.clone()) {
                report.skipped.push(step.resource.clone());
                continue;
            }
            state.steps.push(RecordedStep {
                unit: plan.unit.clone(),
                action: StepAction::Create,
                resource: step.resource.clone(),
            });
            report.performed.push(step.resource.clone());
        }

        for output in &plan.outputs {
            report
                .outputs
                .insert(output.name.to_string(), output.template.clone());
        }

        Ok(report)
    }

    async fn destroy(&self, plan: &ProvisioningPlan) -> Result<ExecutionReport, ExecutorError> {
        self.check(plan)?;

        let mut state = self.state.lock().await;
        let mut report = ExecutionReport::for_unit(&plan.unit);

        for step in &plan.teardown {
            if step.retain || !state.applied_keys.remove(&step.idempotency_key) {
                report.skipped.push(step.resource.clone());
                continue;
            }
            state.steps.push(RecordedStep {
                unit: plan.unit.clone(),
                action: StepAction::Destroy,
                resource: step.resource.clone(),
            });
            report.performed.push(step.resource.clone());
        }

        Ok(report)
    }
}

/// Apply every plan concurrently, one result per plan in input order
pub async fn execute_all<E>(
    executor: &E,
    plans: &[ProvisioningPlan],
) -> Vec<Result<ExecutionReport, ExecutorError>>
where
    E: PlanExecutor + ?Sized,
{
    join_all(plans.iter().map(|plan| executor.apply(plan))).await
}

/// Destroy every plan concurrently, one result per plan in input order
pub async fn destroy_all<E>(
    executor: &E,
    plans: &[ProvisioningPlan],
) -> Vec<Result<ExecutionReport, ExecutorError>>
where
    E: PlanExecutor + ?Sized,
{
    join_all(plans.iter().map(|plan| executor.destroy(plan))).await
}
