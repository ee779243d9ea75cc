// Copyright (c) 2025 - Cowboy AI, Inc.
//! Platform Axis Value Objects
//!
//! Maps the platform tokens accepted on the deployment matrix to the CPU
//! architecture the compute tier is scheduled on. Unknown tokens are rejected
//! outright; there is no fallback architecture.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::ConfigurationError;

/// Supported deployment platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Platform {
    #[serde(rename = "LINUX_AMD64")]
    LinuxAmd64,
    #[serde(rename = "LINUX_ARM64")]
    LinuxArm64,
}

impl Platform {
    /// Every supported platform, in canonical order
    pub const ALL: [Platform; 2] = [Platform::LinuxAmd64, Platform::LinuxArm64];

    /// Parse a platform token
    ///
    /// Accepts the canonical tokens (`LINUX_AMD64`, `LINUX_ARM64`) and the
    /// image-platform spelling used by container tooling (`linux/amd64`,
    /// `linux/arm64`).
    pub fn parse(token: &str) -> Result<Self, ConfigurationError> {
        match token {
            "LINUX_AMD64" | "linux/amd64" => Ok(Self::LinuxAmd64),
            "LINUX_ARM64" | "linux/arm64" => Ok(Self::LinuxArm64),
            other => Err(ConfigurationError::UnrecognizedPlatform(other.to_string())),
        }
    }

    /// Canonical token
    pub fn token(&self) -> &'static str {
        match self {
            Self::LinuxAmd64 => "LINUX_AMD64",
            Self::LinuxArm64 => "LINUX_ARM64",
        }
    }

    /// Short, identifier-safe form used in resource names
    pub fn slug(&self) -> &'static str {
        match self {
            Self::LinuxAmd64 => "amd64",
            Self::LinuxArm64 => "arm64",
        }
    }

    pub fn architecture(&self) -> CpuArchitecture {
        match self {
            Self::LinuxAmd64 => CpuArchitecture::X86_64,
            Self::LinuxArm64 => CpuArchitecture::Arm64,
        }
    }

    pub fn operating_system(&self) -> OperatingSystemFamily {
        OperatingSystemFamily::Linux
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for Platform {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// CPU architecture of the task runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CpuArchitecture {
    #[serde(rename = "X86_64")]
    X86_64,
    #[serde(rename = "ARM64")]
    Arm64,
}

impl CpuArchitecture {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::X86_64 => "X86_64",
            Self::Arm64 => "ARM64",
        }
    }
}

impl fmt::Display for CpuArchitecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operating system family of the task runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperatingSystemFamily {
    Linux,
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("LINUX_AMD64", CpuArchitecture::X86_64 ; "canonical amd64")]
    #[test_case("LINUX_ARM64", CpuArchitecture::Arm64 ; "canonical arm64")]
    #[test_case("linux/amd64", CpuArchitecture::X86_64 ; "image platform amd64")]
    #[test_case("linux/arm64", CpuArchitecture::Arm64 ; "image platform arm64")]
    fn test_platform_architecture(token: &str, expected: CpuArchitecture) {
        assert_eq!(Platform::parse(token).unwrap().architecture(), expected);
    }

    #[test_case("LINUX_MIPS" ; "unknown architecture")]
    #[test_case("linux_amd64" ; "wrong case")]
    #[test_case("arm" ; "legacy shorthand")]
    #[test_case("" ; "empty")]
    fn test_unrecognized_platform(token: &str) {
        assert_eq!(
            Platform::parse(token),
            Err(ConfigurationError::UnrecognizedPlatform(token.to_string()))
        );
    }

    #[test]
    fn test_platform_tokens_round_trip() {
        for platform in Platform::ALL {
            assert_eq!(platform.token().parse::<Platform>().unwrap(), platform);
        }
        assert_eq!(Platform::LinuxArm64.slug(), "arm64");
        assert_eq!(format!("{}", Platform::LinuxAmd64), "LINUX_AMD64");
    }
}
