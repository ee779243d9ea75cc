// Copyright (c) 2025 - Cowboy AI, Inc.
//! Topology Domain Models
//!
//! Value objects shared by every graph builder.
//!
//! # Value Objects with Invariants
//!
//! - [`DeploymentUnit`] - One (region, environment, platform) combination
//! - [`Platform`] - Supported platform tokens and their CPU architecture
//! - [`ResourceKind`] / [`Tier`] - Resource taxonomy and creation tiers
//! - [`ResourceIdentifier`] - Deterministic, length-bounded identifiers
//! - [`AddressBlock`] - IPv4 CIDR block with subnet carving
//! - [`ImageTag`] / [`ImageRef`] - Container image references
//!
//! # Naming
//!
//! [`NamingScheme`] is the only source of identifiers. It is a pure function
//! of its inputs and therefore shared between units without coordination.

pub mod image;
pub mod naming;
pub mod network;
pub mod platform;
pub mod resource_kind;
pub mod unit;

// Re-export value objects
pub use image::{ImageRef, ImageTag, LATEST_TAG};
pub use naming::{NamingScheme, ResourceIdentifier};
pub use network::AddressBlock;
pub use platform::{CpuArchitecture, OperatingSystemFamily, Platform};
pub use resource_kind::{ResourceKind, Tier};
pub use unit::{Axis, DeploymentUnit};
