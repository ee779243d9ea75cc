// Copyright (c) 2025 - Cowboy AI, Inc.
//! Deployment topology for containerized Qdrant workloads
//!
//! Builds, for every (region, environment, platform) combination, a complete
//! and independent resource-dependency graph: image registry, network,
//! persistent file storage, container compute and load-balanced rollout.
//! Graphs are pure data; provisioning is left to an external orchestrator
//! behind the [`emission::PlanExecutor`] seam.
//!
//! # Example
//!
//! ```rust,no_run
//! use qdrant_topology::{TopologyComposer, TopologyConfig};
//!
//! let config = TopologyConfig::new("qdrant", "qdrant-images", "/qdrant/storage", 6333)
//!     .with_regions(["us-east-1"])
//!     .with_environments(["dev", "prod"])
//!     .with_platforms(["LINUX_AMD64", "LINUX_ARM64"]);
//!
//! let composition = TopologyComposer::new(config)?.compose()?;
//! for emitted in composition.emitted() {
//!     println!("{}", emitted.document);
//! }
//! # Ok::<(), qdrant_topology::ConfigurationError>(())
//! ```

pub mod composer;
pub mod config;
pub mod domain;
pub mod emission;
pub mod errors;
pub mod graph;
pub mod matrix;
pub mod state_machine;

// Re-export commonly used types
pub use composer::{Composition, EmittedUnit, TopologyComposer, UnitOutcome};
pub use config::TopologyConfig;
pub use domain::{DeploymentUnit, NamingScheme, Platform, ResourceIdentifier, ResourceKind, Tier};
pub use emission::{emit, ProvisioningPlan};
pub use errors::{ConfigurationError, Stage, TopologyError, TopologyResult, UnitError};
pub use graph::{ResourceGraph, UnitAssembly};
pub use matrix::EnvironmentMatrix;
