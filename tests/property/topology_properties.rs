// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for Topology Construction

use std::collections::HashSet;

use proptest::prelude::*;
use qdrant_topology::domain::ImageTag;
use qdrant_topology::graph::registry::target_tags;
use qdrant_topology::{
    ConfigurationError, EnvironmentMatrix, NamingScheme, Platform, ResourceKind,
    TopologyComposer, TopologyConfig,
};

// ============================================================================
// Strategies
// ============================================================================

/// Identifier-safe token: lowercase, digits, inner dashes
fn token() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,10}[a-z0-9]"
}

fn distinct_tokens(max: usize) -> impl Strategy<Value = Vec<String>> {
    prop::collection::hash_set(token(), 1..=max).prop_map(|set| {
        let mut tokens: Vec<String> = set.into_iter().collect();
        tokens.sort();
        tokens
    })
}

fn platforms() -> impl Strategy<Value = Vec<&'static str>> {
    prop::sample::subsequence(vec!["LINUX_AMD64", "LINUX_ARM64"], 1..=2)
}

fn pinned_version() -> impl Strategy<Value = String> {
    "[a-z0-9_][a-z0-9_.-]{0,20}".prop_filter("pinned", |v| v != "latest")
}

fn unsupported_platform() -> impl Strategy<Value = String> {
    "[A-Z0-9_/]{1,16}".prop_filter("unsupported", |token| Platform::parse(token).is_err())
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    /// Expansion yields |R| × |E| × |P| distinct units
    #[test]
    fn prop_matrix_cardinality(
        regions in distinct_tokens(4),
        environments in distinct_tokens(4),
        platforms in platforms(),
    ) {
        let units = EnvironmentMatrix::expand(&regions, &environments, &platforms).unwrap();

        prop_assert_eq!(units.len(), regions.len() * environments.len() * platforms.len());
        let distinct: HashSet<_> = units.iter().collect();
        prop_assert_eq!(distinct.len(), units.len());
    }

    /// Re-running expansion returns the same units in the same order
    #[test]
    fn prop_matrix_is_deterministic(
        regions in distinct_tokens(3),
        environments in distinct_tokens(3),
        platforms in platforms(),
    ) {
        let first = EnvironmentMatrix::expand(&regions, &environments, &platforms).unwrap();
        let second = EnvironmentMatrix::expand(&regions, &environments, &platforms).unwrap();
        prop_assert_eq!(first, second);
    }

    /// Names are deterministic and injective over (unit, kind) pairs
    #[test]
    fn prop_naming_is_injective(
        app in token(),
        regions in distinct_tokens(3),
        environments in distinct_tokens(3),
        platforms in platforms(),
    ) {
        let naming = NamingScheme::new(app).unwrap();
        let units = EnvironmentMatrix::expand(&regions, &environments, &platforms).unwrap();

        let mut seen = HashSet::new();
        for unit in &units {
            for kind in ResourceKind::ALL {
                let id = naming.name(unit, kind).unwrap();
                prop_assert_eq!(&id, &naming.name(unit, kind).unwrap());
                prop_assert!(id.len() <= kind.max_identifier_len());
                prop_assert!(seen.insert(id), "duplicate identifier for {} {:?}", unit, kind);
            }
        }
    }

    /// A pinned version publishes itself and latest
    #[test]
    fn prop_pinned_version_publishes_both_tags(version in pinned_version()) {
        let tag = ImageTag::new(version).unwrap();
        prop_assert_eq!(target_tags(&tag), vec![tag, ImageTag::latest()]);
    }

    /// Unsupported platform tokens never default to an architecture
    #[test]
    fn prop_unsupported_platform_is_rejected(platform in unsupported_platform()) {
        let result = EnvironmentMatrix::expand(&["us-east-1"], &["dev"], &[platform.as_str()]);
        prop_assert_eq!(result, Err(ConfigurationError::UnrecognizedPlatform(platform)));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// Units of one composition never share an identifier
    #[test]
    fn prop_composed_units_are_independent(
        regions in distinct_tokens(2),
        environments in distinct_tokens(2),
        platforms in platforms(),
    ) {
        let config = TopologyConfig::new("qdrant", "qdrant-images", "/qdrant/storage", 6333)
            .with_regions(regions)
            .with_environments(environments)
            .with_platforms(platforms);
        let composition = TopologyComposer::new(config).unwrap().compose().unwrap();

        prop_assert!(composition.is_complete());
        let mut seen = HashSet::new();
        for emitted in composition.emitted() {
            for (id, _) in emitted.plan.graph.identifiers() {
                prop_assert!(seen.insert(id.clone()));
            }
        }
    }
}

#[test]
fn test_latest_publishes_only_latest() {
    assert_eq!(target_tags(&ImageTag::latest()), vec![ImageTag::latest()]);
}
