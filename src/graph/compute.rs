// Copyright (c) 2025 - Cowboy AI, Inc.
//! Compute Graph
//!
//! Cluster, task definition and the single service container. The container
//! mounts the unit's shared volume and exposes one port. Roles are scoped to
//! exactly the volume (and repository) of the same unit.

use serde::{Deserialize, Serialize};

use super::access::{Permission, RoleSpec, ServicePrincipal};
use super::network::NetworkSpec;
use super::registry::RegistrySpec;
use super::storage::StorageSpec;
use super::{BuildContext, GraphFragment, ResourceNode};
use crate::domain::{
    CpuArchitecture, DeploymentUnit, ImageRef, OperatingSystemFamily, ResourceIdentifier,
    ResourceKind, Tier,
};
use crate::errors::{ConfigurationError, Stage, TopologyError, TopologyResult};

pub const DEFAULT_TASK_CPU: u32 = 2048;
pub const DEFAULT_TASK_MEMORY_MIB: u32 = 4096;

/// Oldest serverless platform version able to mount network file systems
pub const PLATFORM_VERSION: &str = "1.4.0";

/// Check a CPU / memory pair against the serverless task size table
pub fn validate_task_size(cpu: u32, memory_mib: u32) -> Result<(), ConfigurationError> {
    let supported = match cpu {
        256 => matches!(memory_mib, 512 | 1024 | 2048),
        512 => (1024..=4096).contains(&memory_mib) && memory_mib % 1024 == 0,
        1024 => (2048..=8192).contains(&memory_mib) && memory_mib % 1024 == 0,
        2048 => (4096..=16384).contains(&memory_mib) && memory_mib % 1024 == 0,
        4096 => (8192..=30720).contains(&memory_mib) && memory_mib % 1024 == 0,
        8192 => (16384..=61440).contains(&memory_mib) && memory_mib % 4096 == 0,
        16384 => (32768..=122880).contains(&memory_mib) && memory_mib % 8192 == 0,
        _ => false,
    };

    if supported {
        Ok(())
    } else {
        Err(ConfigurationError::InvalidTaskSize { cpu, memory_mib })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimePlatform {
    pub operating_system: OperatingSystemFamily,
    pub architecture: CpuArchitecture,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    Tcp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortMapping {
    pub container_port: u16,
    pub protocol: Protocol,
}

/// Shared volume mounted into the container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeMount {
    pub volume_id: ResourceIdentifier,
    pub access_point: ResourceIdentifier,
    pub container_path: String,
    pub read_only: bool,
    pub transit_encryption: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSpec {
    pub name: ResourceIdentifier,
    pub image: ImageRef,
    pub port_mapping: PortMapping,
    pub mount: VolumeMount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputeRoles {
    /// Used by the platform to start the task
    pub execution_role: RoleSpec,
    /// Assumed by the running container
    pub task_role: RoleSpec,
}

/// Long-running service placement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSpec {
    pub id: ResourceIdentifier,
    pub desired_count: u32,
    pub subnets: Vec<ResourceIdentifier>,
    pub security_groups: Vec<ResourceIdentifier>,
    pub assign_public_ip: bool,
    pub platform_version: String,
}

/// Compute spec of one unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputeSpec {
    pub cluster_id: ResourceIdentifier,
    pub container_insights: bool,
    pub task_definition_id: ResourceIdentifier,
    pub task_cpu: u32,
    pub task_memory_mib: u32,
    pub runtime_platform: RuntimePlatform,
    pub container: ContainerSpec,
    pub roles: ComputeRoles,
    pub service: ServiceSpec,
    /// Promotion steps that must finish before the service starts
    pub image_dependencies: Vec<ResourceIdentifier>,
}

impl ComputeSpec {
    pub fn architecture(&self) -> CpuArchitecture {
        self.runtime_platform.architecture
    }

    pub fn container_port(&self) -> u16 {
        self.container.port_mapping.container_port
    }

    pub fn container_image(&self) -> &ImageRef {
        &self.container.image
    }

    pub fn mount_path(&self) -> &str {
        &self.container.mount.container_path
    }
}

impl GraphFragment for ComputeSpec {
    fn tier(&self) -> Tier {
        Tier::Compute
    }

    fn nodes(&self) -> Vec<ResourceNode> {
        let execution = &self.roles.execution_role;
        let task = &self.roles.task_role;
        let mount = &self.container.mount;

        vec![
            ResourceNode::new(&self.cluster_id, ResourceKind::Cluster),
            ResourceNode::new(&execution.id, ResourceKind::ExecutionRole)
                .after_all(execution.scope()),
            ResourceNode::new(&task.id, ResourceKind::TaskRole).after_all(task.scope()),
            ResourceNode::new(&self.task_definition_id, ResourceKind::TaskDefinition)
                .after(&execution.id)
                .after(&task.id)
                .after(&mount.volume_id)
                .after(&mount.access_point),
            ResourceNode::new(&self.container.name, ResourceKind::Container)
                .after(&self.task_definition_id)
                .after_all(&self.image_dependencies),
            ResourceNode::new(&self.service.id, ResourceKind::Service)
                .after(&self.cluster_id)
                .after(&self.container.name)
                .after_all(&self.service.subnets)
                .after_all(&self.service.security_groups),
        ]
    }
}

/// Compute builder
pub struct ComputeGraph;

impl ComputeGraph {
    /// Build the compute tier on top of a unit's network and storage
    ///
    /// The image resolves to the registry's pinned target tag when a registry
    /// is given, otherwise to the external source image at the same version.
    pub fn build(
        ctx: &BuildContext<'_>,
        unit: &DeploymentUnit,
        registry: Option<&RegistrySpec>,
        network: &NetworkSpec,
        storage: &StorageSpec,
    ) -> TopologyResult<ComputeSpec> {
        // No fallback architecture: an unknown platform fails the unit
        let platform = unit.platform()?;

        if &network.unit != unit {
            return Err(TopologyError::ordering(
                Stage::Compute,
                format!("network graph belongs to unit {}", network.unit),
            ));
        }

        if storage.network_id != network.vpc_id {
            return Err(TopologyError::ordering(
                Stage::Compute,
                format!(
                    "storage graph {} is bound to network {}, not {}",
                    storage.volume_id, storage.network_id, network.vpc_id
                ),
            ));
        }

        let config = ctx.config;
        let naming = ctx.naming;
        let version = config.image_tag()?;

        let (image, image_dependencies) = match registry {
            Some(registry) => (
                registry.image(&version),
                registry.promotion.iter().map(|step| step.id.clone()).collect(),
            ),
            None => (
                ImageRef::new(config.registry.source_image.as_str(), version),
                Vec::new(),
            ),
        };

        let mut execution_role = RoleSpec::new(
            naming.name(unit, ResourceKind::ExecutionRole)?,
            ServicePrincipal::ContainerTasks,
        )
        .grant(&storage.volume_id, [Permission::StorageDescribe]);
        if let Some(registry) = registry {
            execution_role = execution_role.grant(&registry.repository_name, [Permission::ImagePull]);
        }

        let task_role = RoleSpec::new(
            naming.name(unit, ResourceKind::TaskRole)?,
            ServicePrincipal::ContainerTasks,
        )
        .grant(
            &storage.volume_id,
            [
                Permission::StorageMount,
                Permission::StorageRead,
                Permission::StorageWrite,
            ],
        );

        let container = ContainerSpec {
            name: naming.name(unit, ResourceKind::Container)?,
            image,
            port_mapping: PortMapping {
                container_port: config.service_port,
                protocol: Protocol::Tcp,
            },
            mount: VolumeMount {
                volume_id: storage.volume_id.clone(),
                access_point: storage.access_point.id.clone(),
                container_path: config.application_root_path.clone(),
                read_only: false,
                transit_encryption: true,
            },
        };

        let service = ServiceSpec {
            id: naming.name(unit, ResourceKind::Service)?,
            desired_count: config.compute.desired_count,
            subnets: network
                .private_subnets
                .iter()
                .map(|s| s.id.clone())
                .collect(),
            security_groups: vec![storage.access_boundary.id.clone()],
            assign_public_ip: false,
            platform_version: PLATFORM_VERSION.to_string(),
        };

        Ok(ComputeSpec {
            cluster_id: naming.name(unit, ResourceKind::Cluster)?,
            container_insights: true,
            task_definition_id: naming.name(unit, ResourceKind::TaskDefinition)?,
            task_cpu: config.compute.cpu,
            task_memory_mib: config.compute.memory_mib,
            runtime_platform: RuntimePlatform {
                operating_system: platform.operating_system(),
                architecture: platform.architecture(),
            },
            container,
            roles: ComputeRoles {
                execution_role,
                task_role,
            },
            service,
            image_dependencies,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TopologyConfig;
    use crate::domain::NamingScheme;
    use crate::graph::network::NetworkGraph;
    use crate::graph::registry::RegistryGraph;
    use crate::graph::storage::StorageGraph;
    use test_case::test_case;

    struct Fixture {
        config: TopologyConfig,
        naming: NamingScheme,
    }

    impl Fixture {
        fn new(version: &str) -> Self {
            Self {
                config: TopologyConfig::new("qdrant", "qdrant-images", "/qdrant/storage", 6333)
                    .with_image_version(version),
                naming: NamingScheme::new("qdrant").unwrap(),
            }
        }

        fn build(&self, unit: &DeploymentUnit, promote: bool) -> TopologyResult<ComputeSpec> {
            let ctx = BuildContext::new(&self.config, &self.naming);
            let registry = if promote {
                Some(RegistryGraph::build(&ctx, unit)?)
            } else {
                None
            };
            let network = NetworkGraph::build(&ctx, unit)?;
            let storage = StorageGraph::build(&ctx, unit, &network)?;
            ComputeGraph::build(&ctx, unit, registry.as_ref(), &network, &storage)
        }
    }

    #[test_case("LINUX_AMD64", CpuArchitecture::X86_64 ; "amd64")]
    #[test_case("LINUX_ARM64", CpuArchitecture::Arm64 ; "arm64")]
    fn test_platform_selects_architecture(platform: &str, expected: CpuArchitecture) {
        let unit = DeploymentUnit::new("us-east-1", "prod", platform);
        let spec = Fixture::new("latest").build(&unit, true).unwrap();
        assert_eq!(spec.architecture(), expected);
        assert_eq!(spec.runtime_platform.operating_system, OperatingSystemFamily::Linux);
    }

    #[test]
    fn test_unknown_platform_is_configuration_error() {
        let fixture = Fixture::new("latest");
        let ctx = BuildContext::new(&fixture.config, &fixture.naming);
        let good = DeploymentUnit::new("us-east-1", "prod", "LINUX_AMD64");
        let network = NetworkGraph::build(&ctx, &good).unwrap();
        let storage = StorageGraph::build(&ctx, &good, &network).unwrap();

        let bad = DeploymentUnit::new("us-east-1", "prod", "LINUX_MIPS");
        assert!(matches!(
            ComputeGraph::build(&ctx, &bad, None, &network, &storage),
            Err(TopologyError::Configuration(
                ConfigurationError::UnrecognizedPlatform(_)
            ))
        ));
    }

    #[test]
    fn test_image_prefers_promoted_repository() {
        let unit = DeploymentUnit::new("us-east-1", "prod", "LINUX_AMD64");
        let fixture = Fixture::new("1.9.0");

        let promoted = fixture.build(&unit, true).unwrap();
        assert!(promoted
            .container_image()
            .repository
            .starts_with("qdrant-images-prod-us-east-1-amd64-repo-"));
        assert_eq!(promoted.container_image().tag.as_str(), "1.9.0");
        assert_eq!(promoted.image_dependencies.len(), 2);

        let direct = fixture.build(&unit, false).unwrap();
        assert_eq!(direct.container_image().to_string(), "qdrant/qdrant:1.9.0");
        assert!(direct.image_dependencies.is_empty());
    }

    #[test]
    fn test_roles_scoped_to_unit_volume() {
        let unit = DeploymentUnit::new("us-east-1", "prod", "LINUX_AMD64");
        let spec = Fixture::new("latest").build(&unit, true).unwrap();
        let volume = &spec.container.mount.volume_id;

        let task = &spec.roles.task_role;
        assert_eq!(task.scope().into_iter().collect::<Vec<_>>(), vec![volume]);
        assert!(task.permits(volume, Permission::StorageMount));
        assert!(task.permits(volume, Permission::StorageWrite));
        assert!(!task.permits(volume, Permission::ImagePull));

        let execution = &spec.roles.execution_role;
        assert_eq!(execution.scope().len(), 2);
        assert!(execution.permits(volume, Permission::StorageDescribe));
    }

    #[test]
    fn test_container_and_service_placement() {
        let unit = DeploymentUnit::new("us-east-1", "prod", "LINUX_AMD64");
        let spec = Fixture::new("latest").build(&unit, true).unwrap();

        assert_eq!(spec.container_port(), 6333);
        assert_eq!(spec.mount_path(), "/qdrant/storage");
        assert_eq!(spec.task_cpu, 2048);
        assert_eq!(spec.task_memory_mib, 4096);
        assert_eq!(spec.service.desired_count, 1);
        assert_eq!(spec.service.platform_version, "1.4.0");
        assert!(!spec.service.assign_public_ip);
        assert_eq!(spec.service.subnets.len(), 3);
    }

    #[test_case(256, 512, true)]
    #[test_case(2048, 4096, true)]
    #[test_case(2048, 16384, true)]
    #[test_case(4096, 8192, true)]
    #[test_case(8192, 20480, true)]
    #[test_case(2048, 2048, false)]
    #[test_case(1024, 1536, false)]
    #[test_case(8192, 18432, false)]
    #[test_case(3000, 4096, false)]
    fn test_task_size_table(cpu: u32, memory_mib: u32, supported: bool) {
        assert_eq!(validate_task_size(cpu, memory_mib).is_ok(), supported);
    }
}
