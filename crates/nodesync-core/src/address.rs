//! Address and address-set types
//!
//! An address is a plain [`IpAddr`]: immutable, compared only by value.
//! An [`AddressSet`] is a mathematical set of addresses that remembers the
//! order in which members were first seen, so renderers produce stable
//! output for a given observation.

use std::net::IpAddr;

use crate::error::{Error, Result};

/// Unordered collection of member addresses
///
/// Duplicates collapse on construction (the first occurrence wins), and
/// equality ignores order. Iteration follows first-seen order so that
/// rendering is deterministic for a given input.
///
/// # Example
///
/// ```rust
/// use nodesync_core::AddressSet;
/// use std::net::IpAddr;
///
/// let a: AddressSet = ["10.0.0.1", "10.0.0.2"]
///     .iter()
///     .map(|s| s.parse::<IpAddr>().unwrap())
///     .collect();
/// let b: AddressSet = ["10.0.0.2", "10.0.0.1", "10.0.0.2"]
///     .iter()
///     .map(|s| s.parse::<IpAddr>().unwrap())
///     .collect();
///
/// assert_eq!(a, b);
/// assert_eq!(b.len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct AddressSet {
    members: Vec<IpAddr>,
}

impl AddressSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from any collection of addresses, collapsing duplicates
    pub fn from_addresses(addresses: impl IntoIterator<Item = IpAddr>) -> Self {
        let mut set = Self::new();
        for address in addresses {
            set.insert(address);
        }
        set
    }

    /// Insert an address, returning `false` if it was already present
    pub fn insert(&mut self, address: IpAddr) -> bool {
        if self.contains(&address) {
            return false;
        }
        self.members.push(address);
        true
    }

    /// Number of distinct addresses
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the set has no members
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Whether `address` is a member
    pub fn contains(&self, address: &IpAddr) -> bool {
        self.members.iter().any(|member| member == address)
    }

    /// Iterate members in first-seen order
    pub fn iter(&self) -> std::slice::Iter<'_, IpAddr> {
        self.members.iter()
    }

    /// Members as a slice, in first-seen order
    pub fn as_slice(&self) -> &[IpAddr] {
        &self.members
    }
}

impl PartialEq for AddressSet {
    fn eq(&self, other: &Self) -> bool {
        !crate::diff::changed(self, other)
    }
}

impl Eq for AddressSet {}

impl FromIterator<IpAddr> for AddressSet {
    fn from_iter<I: IntoIterator<Item = IpAddr>>(iter: I) -> Self {
        Self::from_addresses(iter)
    }
}

impl<'a> IntoIterator for &'a AddressSet {
    type Item = &'a IpAddr;
    type IntoIter = std::slice::Iter<'a, IpAddr>;

    fn into_iter(self) -> Self::IntoIter {
        self.members.iter()
    }
}

impl std::fmt::Display for AddressSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("{")?;
        for (i, address) in self.members.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", address)?;
        }
        f.write_str("}")
    }
}

/// Parse an address as published by an inventory member
///
/// Accepts a bare address or CIDR notation (the prefix length is dropped),
/// with surrounding whitespace ignored.
///
/// # Returns
///
/// - `Ok(IpAddr)`: The parsed address
/// - `Err(Error::InvalidInput)`: If the value is not an address
pub fn parse_address(raw: &str) -> Result<IpAddr> {
    let trimmed = raw.trim();
    let host = trimmed.split('/').next().unwrap_or(trimmed);

    host.parse::<IpAddr>()
        .map_err(|e| Error::invalid_input(format!("'{}' is not an IP address: {}", raw, e)))
}
