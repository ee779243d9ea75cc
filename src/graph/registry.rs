// Copyright (c) 2025 - Cowboy AI, Inc.
//! Image Registry Graph
//!
//! A private, unit-scoped image repository plus the promotion step that
//! copies the public source image into it.
//!
//! # Tag Policy
//!
//! - Requested version `latest`: publish only `latest`
//! - Any pinned version: publish the pinned version and `latest`
//!
//! Every copy carries the destination reference as its idempotency key, so a
//! rerun with identical inputs never publishes a tag twice.

use serde::{Deserialize, Serialize};

use super::{BuildContext, GraphFragment, ResourceNode};
use crate::domain::{DeploymentUnit, ImageRef, ImageTag, ResourceIdentifier, ResourceKind, Tier};
use crate::errors::TopologyResult;

/// Public repository images are promoted from
pub const DEFAULT_SOURCE_IMAGE: &str = "qdrant/qdrant";

/// Untagged images older than this are expired
pub const DEFAULT_MAX_UNTAGGED_AGE_DAYS: u32 = 7;

/// Retained images regardless of tag
pub const DEFAULT_MAX_IMAGE_COUNT: u32 = 4;

/// Encryption requested for the repository
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistryEncryption {
    /// Service-managed AES-256
    #[default]
    Aes256,
    /// Customer-managed key, one per unit
    Kms,
}

/// Encryption applied to the repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum RepositoryEncryption {
    Aes256,
    Kms {
        key_id: ResourceIdentifier,
        rotation_enabled: bool,
    },
}

/// Which images a retention rule selects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagStatus {
    Untagged,
    Any,
}

/// Expiry condition of a retention rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "value")]
pub enum RetentionCondition {
    /// Pushed more than this many days ago
    SincePushedDays(u32),
    /// Beyond the most recent `n` images
    CountMoreThan(u32),
}

/// Repository lifecycle rule; lower priority is evaluated first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionRule {
    pub priority: u32,
    pub tag_status: TagStatus,
    pub condition: RetentionCondition,
}

/// One copy of the source image into the repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromotionStep {
    pub id: ResourceIdentifier,
    pub source: ImageRef,
    pub destination: ImageRef,
    /// Destination reference; the executor skips a key it has already applied
    pub idempotency_key: String,
}

/// Registry spec of one unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySpec {
    pub repository_name: ResourceIdentifier,
    pub encryption: RepositoryEncryption,
    pub retention_rules: Vec<RetentionRule>,
    pub source_image: ImageRef,
    pub target_tags: Vec<ImageTag>,
    pub promotion: Vec<PromotionStep>,
}

impl RegistrySpec {
    /// Reference to `tag` inside this repository
    pub fn image(&self, tag: &ImageTag) -> ImageRef {
        ImageRef::new(self.repository_name.as_str(), tag.clone())
    }

    /// Whether `image` is published by this registry's promotion
    pub fn publishes(&self, image: &ImageRef) -> bool {
        image.repository == self.repository_name.as_str() && self.target_tags.contains(&image.tag)
    }

    pub fn key_id(&self) -> Option<&ResourceIdentifier> {
        match &self.encryption {
            RepositoryEncryption::Kms { key_id, .. } => Some(key_id),
            RepositoryEncryption::Aes256 => None,
        }
    }
}

impl GraphFragment for RegistrySpec {
    fn tier(&self) -> Tier {
        Tier::Registry
    }

    fn nodes(&self) -> Vec<ResourceNode> {
        let mut nodes = Vec::new();

        let mut repository = ResourceNode::new(&self.repository_name, ResourceKind::Repository);
        if let Some(key_id) = self.key_id() {
            nodes.push(ResourceNode::new(key_id, ResourceKind::EncryptionKey));
            repository = repository.after(key_id);
        }
        nodes.push(repository);

        nodes.extend(self.promotion.iter().map(|step| {
            ResourceNode::new(&step.id, ResourceKind::ImagePromotion).after(&self.repository_name)
        }));

        nodes
    }
}

/// Tags published for a requested version
pub fn target_tags(version: &ImageTag) -> Vec<ImageTag> {
    if version.is_latest() {
        vec![ImageTag::latest()]
    } else {
        vec![version.clone(), ImageTag::latest()]
    }
}

/// Retention rules in priority order
pub fn retention_rules(max_untagged_age_days: u32, max_image_count: u32) -> Vec<RetentionRule> {
    vec![
        RetentionRule {
            priority: 1,
            tag_status: TagStatus::Untagged,
            condition: RetentionCondition::SincePushedDays(max_untagged_age_days),
        },
        RetentionRule {
            priority: 2,
            tag_status: TagStatus::Any,
            condition: RetentionCondition::CountMoreThan(max_image_count),
        },
    ]
}

/// Registry builder
pub struct RegistryGraph;

impl RegistryGraph {
    pub fn build(ctx: &BuildContext<'_>, unit: &DeploymentUnit) -> TopologyResult<RegistrySpec> {
        let settings = &ctx.config.registry;
        let version = ctx.config.image_tag()?;

        let repository_name =
            ctx.naming
                .name_with_prefix(&ctx.config.registry_base_name, unit, ResourceKind::Repository)?;

        let encryption = match settings.encryption {
            RegistryEncryption::Aes256 => RepositoryEncryption::Aes256,
            RegistryEncryption::Kms => RepositoryEncryption::Kms {
                key_id: ctx.naming.name(unit, ResourceKind::EncryptionKey)?,
                rotation_enabled: true,
            },
        };

        let source_image = ImageRef::new(settings.source_image.as_str(), version.clone());
        let tags = target_tags(&version);

        let promotion = tags
            .iter()
            .enumerate()
            .map(|(ordinal, tag)| -> TopologyResult<PromotionStep> {
                let destination = ImageRef::new(repository_name.as_str(), tag.clone());
                Ok(PromotionStep {
                    id: ctx.naming.name_nth(unit, ResourceKind::ImagePromotion, ordinal)?,
                    source: source_image.clone(),
                    idempotency_key: destination.to_string(),
                    destination,
                })
            })
            .collect::<TopologyResult<Vec<_>>>()?;

        Ok(RegistrySpec {
            repository_name,
            encryption,
            retention_rules: retention_rules(
                settings.max_untagged_age_days,
                settings.max_image_count,
            ),
            source_image,
            target_tags: tags,
            promotion,
        })
    }
}
