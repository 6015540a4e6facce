//! Address set comparison
//!
//! [`changed`] decides whether a reconciliation cycle has work to do.
//! [`diff`] explains what moved, for logs and events.

use std::net::IpAddr;

use crate::address::AddressSet;

/// Whether `current` differs from `previous` as a set
///
/// Cardinality is checked first; when it matches, every member of
/// `current` must appear in `previous`. Because [`AddressSet`] holds no
/// duplicates this is full set equality, so the result is symmetric.
/// Two empty sets are unchanged.
///
/// The membership scan is pairwise (O(n·m)); cluster sizes are tens to
/// low hundreds of members.
pub fn changed(previous: &AddressSet, current: &AddressSet) -> bool {
    if previous.len() != current.len() {
        return true;
    }

    let matches = current
        .iter()
        .filter(|candidate| previous.iter().any(|known| known == *candidate))
        .count();

    matches != current.len()
}

/// Members that joined and left between two observations
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressDiff {
    /// Present in `current` but not in `previous`
    pub added: Vec<IpAddr>,
    /// Present in `previous` but not in `current`
    pub removed: Vec<IpAddr>,
}

impl AddressDiff {
    /// Whether nothing joined or left
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Compute which addresses were added and removed
pub fn diff(previous: &AddressSet, current: &AddressSet) -> AddressDiff {
    AddressDiff {
        added: current
            .iter()
            .filter(|address| !previous.contains(address))
            .copied()
            .collect(),
        removed: previous
            .iter()
            .filter(|address| !current.contains(address))
            .copied()
            .collect(),
    }
}
