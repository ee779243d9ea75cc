// Copyright (c) 2025 - Cowboy AI, Inc.
//! Resource Kind Taxonomy
//!
//! The closed set of resources a deployment unit can contain. Each kind knows
//! its tier in the creation order, the short tag used in its identifier, and
//! the identifier length limit of the target platform.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Tier of a resource within a unit's creation order
///
/// Declaration order is the creation order; teardown runs in reverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Registry,
    Network,
    Storage,
    Compute,
    Rollout,
}

impl Tier {
    /// Tiers in creation order
    pub const CREATION_ORDER: [Tier; 5] = [
        Tier::Registry,
        Tier::Network,
        Tier::Storage,
        Tier::Compute,
        Tier::Rollout,
    ];

    /// Tiers in teardown order
    pub fn teardown_order() -> [Tier; 5] {
        let mut order = Self::CREATION_ORDER;
        order.reverse();
        order
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Registry => write!(f, "Registry"),
            Self::Network => write!(f, "Network"),
            Self::Storage => write!(f, "Storage"),
            Self::Compute => write!(f, "Compute"),
            Self::Rollout => write!(f, "Rollout"),
        }
    }
}

/// Infrastructure resource kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    // Registry
    /// Customer-managed key encrypting the repository
    EncryptionKey,
    /// Private image repository
    Repository,
    /// Copy of the source image into the repository
    ImagePromotion,

    // Network
    /// Isolated virtual network
    Vpc,
    /// Internet gateway for the public tier
    InternetGateway,
    /// Public subnet (one per availability zone)
    PublicSubnet,
    /// Private subnet with egress (one per availability zone)
    PrivateSubnet,
    /// Shared NAT egress point
    NatGateway,
    /// Role the flow-audit service writes with
    FlowLogRole,
    /// Log sink receiving flow records
    FlowLogGroup,
    /// Log stream inside the sink
    FlowLogStream,
    /// Flow-audit binding on the network
    FlowLog,

    // Storage
    /// Access boundary of the shared volume
    StorageSecurityGroup,
    /// Shared persistent volume
    FileSystem,
    /// Volume policy denying anonymous mounts
    FileSystemPolicy,
    /// Mount target (one per private subnet)
    MountTarget,
    /// Access point rooted at the storage root path
    AccessPoint,

    // Compute
    /// Container cluster
    Cluster,
    /// Role used to start tasks
    ExecutionRole,
    /// Role assumed by the running container
    TaskRole,
    /// Task definition family
    TaskDefinition,
    /// The service container
    Container,
    /// Long-running service
    Service,

    // Rollout
    /// Access boundary of the load balancer
    LoadBalancerSecurityGroup,
    /// Public load balancer
    LoadBalancer,
    /// Target group routing to the container port
    TargetGroup,
    /// Listener accepting client traffic
    Listener,
    /// Listener serving the replacement task set before traffic shifts
    TestListener,
    /// Registration of the service into the target group
    ServiceBinding,
    /// Deployment application owning the blue/green deployment group
    DeploymentApplication,
    /// Blue/green deployment group shifting traffic between target groups
    DeploymentGroup,
    /// Export of the endpoint address
    EndpointExport,
    /// Export of the outward-facing URL
    UrlExport,
}

impl ResourceKind {
    /// Every kind, grouped by tier in creation order
    pub const ALL: [ResourceKind; 33] = [
        Self::EncryptionKey,
        Self::Repository,
        Self::ImagePromotion,
        Self::Vpc,
        Self::InternetGateway,
        Self::PublicSubnet,
        Self::PrivateSubnet,
        Self::NatGateway,
        Self::FlowLogRole,
        Self::FlowLogGroup,
        Self::FlowLogStream,
        Self::FlowLog,
        Self::StorageSecurityGroup,
        Self::FileSystem,
        Self::FileSystemPolicy,
        Self::MountTarget,
        Self::AccessPoint,
        Self::Cluster,
        Self::ExecutionRole,
        Self::TaskRole,
        Self::TaskDefinition,
        Self::Container,
        Self::Service,
        Self::LoadBalancerSecurityGroup,
        Self::LoadBalancer,
        Self::TargetGroup,
        Self::Listener,
        Self::TestListener,
        Self::ServiceBinding,
        Self::DeploymentApplication,
        Self::DeploymentGroup,
        Self::EndpointExport,
        Self::UrlExport,
    ];

    /// Short tag embedded in identifiers
    pub fn tag(&self) -> &'static str {
        match self {
            Self::EncryptionKey => "key",
            Self::Repository => "repo",
            Self::ImagePromotion => "promote",
            Self::Vpc => "vpc",
            Self::InternetGateway => "igw",
            Self::PublicSubnet => "public",
            Self::PrivateSubnet => "private",
            Self::NatGateway => "nat",
            Self::FlowLogRole => "flowlog-role",
            Self::FlowLogGroup => "flowlog-group",
            Self::FlowLogStream => "flowlog-stream",
            Self::FlowLog => "flowlog",
            Self::StorageSecurityGroup => "fs-sg",
            Self::FileSystem => "fs",
            Self::FileSystemPolicy => "fs-policy",
            Self::MountTarget => "mount",
            Self::AccessPoint => "ap",
            Self::Cluster => "cluster",
            Self::ExecutionRole => "exec-role",
            Self::TaskRole => "task-role",
            Self::TaskDefinition => "task",
            Self::Container => "container",
            Self::Service => "service",
            Self::LoadBalancerSecurityGroup => "alb-sg",
            Self::LoadBalancer => "alb",
            Self::TargetGroup => "tg",
            Self::Listener => "listener",
            Self::TestListener => "test-listener",
            Self::ServiceBinding => "binding",
            Self::DeploymentApplication => "deploy-app",
            Self::DeploymentGroup => "deploy-group",
            Self::EndpointExport => "endpoint",
            Self::UrlExport => "url",
        }
    }

    /// Maximum identifier length accepted by the target platform
    pub fn max_identifier_len(&self) -> usize {
        match self {
            // Load balancer and target group names
            Self::LoadBalancer | Self::TargetGroup => 32,
            // Role names
            Self::FlowLogRole | Self::ExecutionRole | Self::TaskRole => 64,
            // Log group and stream names
            Self::FlowLogGroup | Self::FlowLogStream => 512,
            Self::EncryptionKey | Self::Repository | Self::FileSystem => 256,
            Self::DeploymentApplication | Self::DeploymentGroup => 100,
            _ => 255,
        }
    }

    pub fn tier(&self) -> Tier {
        match self {
            Self::EncryptionKey | Self::Repository | Self::ImagePromotion => Tier::Registry,

            Self::Vpc
            | Self::InternetGateway
            | Self::PublicSubnet
            | Self::PrivateSubnet
            | Self::NatGateway
            | Self::FlowLogRole
            | Self::FlowLogGroup
            | Self::FlowLogStream
            | Self::FlowLog => Tier::Network,

            Self::StorageSecurityGroup
            | Self::FileSystem
            | Self::FileSystemPolicy
            | Self::MountTarget
            | Self::AccessPoint => Tier::Storage,

            Self::Cluster
            | Self::ExecutionRole
            | Self::TaskRole
            | Self::TaskDefinition
            | Self::Container
            | Self::Service => Tier::Compute,

            Self::LoadBalancerSecurityGroup
            | Self::LoadBalancer
            | Self::TargetGroup
            | Self::Listener
            | Self::TestListener
            | Self::ServiceBinding
            | Self::DeploymentApplication
            | Self::DeploymentGroup
            | Self::EndpointExport
            | Self::UrlExport => Tier::Rollout,
        }
    }

    /// Get human-readable display name
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::EncryptionKey => "Encryption Key",
            Self::Repository => "Image Repository",
            Self::ImagePromotion => "Image Promotion",
            Self::Vpc => "Network",
            Self::InternetGateway => "Internet Gateway",
            Self::PublicSubnet => "Public Subnet",
            Self::PrivateSubnet => "Private Subnet",
            Self::NatGateway => "NAT Gateway",
            Self::FlowLogRole => "Flow Log Role",
            Self::FlowLogGroup => "Flow Log Group",
            Self::FlowLogStream => "Flow Log Stream",
            Self::FlowLog => "Flow Log",
            Self::StorageSecurityGroup => "Storage Security Group",
            Self::FileSystem => "File System",
            Self::FileSystemPolicy => "File System Policy",
            Self::MountTarget => "Mount Target",
            Self::AccessPoint => "Access Point",
            Self::Cluster => "Cluster",
            Self::ExecutionRole => "Execution Role",
            Self::TaskRole => "Task Role",
            Self::TaskDefinition => "Task Definition",
            Self::Container => "Container",
            Self::Service => "Service",
            Self::LoadBalancerSecurityGroup => "Load Balancer Security Group",
            Self::LoadBalancer => "Load Balancer",
            Self::TargetGroup => "Target Group",
            Self::Listener => "Listener",
            Self::TestListener => "Test Listener",
            Self::ServiceBinding => "Service Binding",
            Self::DeploymentApplication => "Deployment Application",
            Self::DeploymentGroup => "Deployment Group",
            Self::EndpointExport => "Endpoint Export",
            Self::UrlExport => "URL Export",
        }
    }

    /// Exports are named but are not nodes of the dependency graph
    pub fn is_export(&self) -> bool {
        matches!(self, Self::EndpointExport | Self::UrlExport)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}
