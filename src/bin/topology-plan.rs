// Copyright (c) 2025 - Cowboy AI, Inc.
//! Topology Plan
//!
//! Loads the topology configuration from the process environment, composes
//! every deployment unit and prints each emitted plan as JSON. Every plan is
//! then walked by the dry-run executor; nothing is provisioned.
//!
//! Run with: cargo run --bin topology-plan
//!
//! Required environment:
//! - APP_NAME, ECR_REPOSITORY_NAME, APP_ROOT_FILE_PATH, PORT
//! - CDK_DEPLOY_REGIONS (or CDK_DEFAULT_REGION), PLATFORMS
//!
//! Log verbosity follows RUST_LOG (default: info).

use anyhow::{bail, Context, Result};
use qdrant_topology::emission::{execute_all, DryRunExecutor};
use qdrant_topology::{TopologyComposer, TopologyConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing on stderr so stdout carries only the plans
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let config = TopologyConfig::from_env().context("loading topology configuration")?;
    info!(
        app = %config.app_name,
        regions = ?config.regions,
        environments = ?config.environments,
        platforms = ?config.platforms,
        version = %config.image_version,
        "configuration loaded"
    );

    let composer = TopologyComposer::new(config).context("validating topology configuration")?;
    let composition = composer.compose().context("planning deployment units")?;

    for emitted in composition.emitted() {
        println!("{}", emitted.document);
    }

    let plans = composition.plans();
    let executor = DryRunExecutor::new();
    for result in execute_all(&executor, &plans).await {
        match result {
            Ok(report) => info!(
                performed = report.performed.len(),
                retained = report.skipped.len(),
                "dry run complete"
            ),
            Err(err) => error!(error = %err, "dry run failed"),
        }
    }

    let failures: Vec<_> = composition.failures().collect();
    for failure in &failures {
        error!(unit = %failure.unit, stage = %failure.stage, error = %failure.source, "unit failed");
    }
    if !failures.is_empty() {
        bail!(
            "{} of {} deployment units failed",
            failures.len(),
            composition.outcomes.len()
        );
    }

    info!(run_id = %composition.run_id, units = plans.len(), "topology planned");
    Ok(())
}
