// Copyright (c) 2025 - Cowboy AI, Inc.
//! Address Block Value Object with Validation Invariants

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use crate::errors::ConfigurationError;

/// IPv4 network block in CIDR notation
///
/// Invariants:
/// - Valid IPv4 network address
/// - Prefix length 0-32
/// - Host bits of the network address are zero
///
/// # Examples
///
/// ```rust
/// use qdrant_topology::domain::AddressBlock;
///
/// let block = AddressBlock::new("10.0.0.0/16").unwrap();
/// assert_eq!(block.subnet(24, 3).unwrap().as_cidr(), "10.0.3.0/24");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AddressBlock {
    network: Ipv4Addr,
    prefix_length: u8,
}

impl AddressBlock {
    /// `10.0.0.0/16`
    pub const PRIVATE_DEFAULT: AddressBlock = AddressBlock {
        network: Ipv4Addr::new(10, 0, 0, 0),
        prefix_length: 16,
    };

    /// Create an address block from CIDR notation
    pub fn new(cidr: impl AsRef<str>) -> Result<Self, ConfigurationError> {
        let cidr = cidr.as_ref();
        let invalid = |reason: &str| {
            ConfigurationError::InvalidAddressBlock(format!("{} ({})", cidr, reason))
        };

        let (addr_str, prefix_str) = cidr
            .split_once('/')
            .ok_or_else(|| invalid("missing prefix length"))?;

        let network =
            Ipv4Addr::from_str(addr_str).map_err(|_| invalid("not an IPv4 address"))?;

        let prefix_length = prefix_str
            .parse::<u8>()
            .map_err(|_| invalid("prefix length is not a number"))?;

        Self::from_parts(network, prefix_length)
    }

    /// Create from separate network address and prefix
    pub fn from_parts(network: Ipv4Addr, prefix_length: u8) -> Result<Self, ConfigurationError> {
        if prefix_length > 32 {
            return Err(ConfigurationError::InvalidAddressBlock(format!(
                "{}/{} (prefix length must be 0-32)",
                network, prefix_length
            )));
        }

        // Invariant: host bits are zero
        if u32::from(network) & !Self::mask(prefix_length) != 0 {
            return Err(ConfigurationError::InvalidAddressBlock(format!(
                "{}/{} (host bits set)",
                network, prefix_length
            )));
        }

        Ok(Self {
            network,
            prefix_length,
        })
    }

    fn mask(prefix_length: u8) -> u32 {
        if prefix_length == 0 {
            0
        } else {
            u32::MAX << (32 - u32::from(prefix_length))
        }
    }

    pub fn network(&self) -> Ipv4Addr {
        self.network
    }

    pub fn prefix_length(&self) -> u8 {
        self.prefix_length
    }

    /// Number of addresses in the block
    pub fn size(&self) -> u64 {
        1u64 << (32 - u32::from(self.prefix_length))
    }

    /// Number of `prefix_length` subnets that fit in this block
    pub fn subnet_count(&self, prefix_length: u8) -> u64 {
        if prefix_length < self.prefix_length || prefix_length > 32 {
            0
        } else {
            1u64 << (prefix_length - self.prefix_length)
        }
    }

    /// The `index`-th subnet of the given prefix length
    pub fn subnet(&self, prefix_length: u8, index: u32) -> Result<Self, ConfigurationError> {
        if u64::from(index) >= self.subnet_count(prefix_length) {
            return Err(ConfigurationError::InvalidAddressBlock(format!(
                "{} has no /{} subnet #{}",
                self, prefix_length, index
            )));
        }

        let step = 1u64 << (32 - u32::from(prefix_length));
        let base = u64::from(u32::from(self.network)) + u64::from(index) * step;
        let network = u32::try_from(base).map_err(|_| {
            ConfigurationError::InvalidAddressBlock(format!("{} overflows", self))
        })?;

        Self::from_parts(Ipv4Addr::from(network), prefix_length)
    }

    /// Check whether `other` lies entirely inside this block
    pub fn contains(&self, other: &AddressBlock) -> bool {
        other.prefix_length >= self.prefix_length
            && u32::from(other.network) & Self::mask(self.prefix_length)
                == u32::from(self.network)
    }

    /// Get as CIDR notation string
    pub fn as_cidr(&self) -> String {
        format!("{}/{}", self.network, self.prefix_length)
    }
}

impl fmt::Display for AddressBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_cidr())
    }
}

impl FromStr for AddressBlock {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for AddressBlock {
    type Error = ConfigurationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AddressBlock> for String {
    fn from(block: AddressBlock) -> Self {
        block.as_cidr()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_block() {
        let block = AddressBlock::new("10.0.0.0/16").unwrap();
        assert_eq!(block.network().to_string(), "10.0.0.0");
        assert_eq!(block.prefix_length(), 16);
        assert_eq!(block.size(), 65_536);
        assert_eq!(block.as_cidr(), "10.0.0.0/16");
        assert_eq!(block, AddressBlock::PRIVATE_DEFAULT);
    }

    #[test]
    fn test_invalid_blocks() {
        assert!(AddressBlock::new("10.0.0.0").is_err()); // No prefix
        assert!(AddressBlock::new("10.0.0.0/33").is_err()); // Prefix too long
        assert!(AddressBlock::new("10.0.0.1/16").is_err()); // Host bits set
        assert!(AddressBlock::new("999.0.0.0/8").is_err()); // Bad address
        assert!(AddressBlock::new("2001:db8::/32").is_err()); // IPv6
    }

    #[test]
    fn test_subnet_carving() {
        let block = AddressBlock::new("10.0.0.0/16").unwrap();
        assert_eq!(block.subnet_count(24), 256);
        assert_eq!(block.subnet(24, 0).unwrap().as_cidr(), "10.0.0.0/24");
        assert_eq!(block.subnet(24, 5).unwrap().as_cidr(), "10.0.5.0/24");
        assert!(block.subnet(24, 256).is_err());
        assert!(block.subnet(8, 0).is_err());
    }

    #[test]
    fn test_contains() {
        let block = AddressBlock::new("10.0.0.0/16").unwrap();
        assert!(block.contains(&AddressBlock::new("10.0.42.0/24").unwrap()));
        assert!(!block.contains(&AddressBlock::new("10.1.0.0/24").unwrap()));
        assert!(!block.contains(&AddressBlock::new("10.0.0.0/8").unwrap()));
    }

    #[test]
    fn test_serde_as_cidr_string() {
        let block = AddressBlock::new("10.0.0.0/16").unwrap();
        let json = serde_json::to_string(&block).unwrap();
        assert_eq!(json, "\"10.0.0.0/16\"");
        let parsed: AddressBlock = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, block);
        assert!(serde_json::from_str::<AddressBlock>("\"10.0.0.1/16\"").is_err());
    }
}
