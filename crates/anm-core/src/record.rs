// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Overlay record types: nodes, edges, and interface slots.
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ident::{InterfaceId, NodeId};
use crate::value::{AttrValue, Attrs};

/// Kind of an interface slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterfaceType {
    /// A port that terminates a link.
    Physical,
    /// A virtual loopback address holder.
    Loopback,
}

impl InterfaceType {
    /// Canonical lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Physical => "physical",
            Self::Loopback => "loopback",
        }
    }
}

impl fmt::Display for InterfaceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InterfaceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "physical" => Ok(Self::Physical),
            "loopback" => Ok(Self::Loopback),
            other => Err(format!("unknown interface type: {other}")),
        }
    }
}

impl From<InterfaceType> for AttrValue {
    fn from(value: InterfaceType) -> Self {
        Self::Str(value.as_str().to_owned())
    }
}

/// Attributes of one interface slot on one node in one overlay.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceRecord {
    /// Free-text description (`"r1 to r2"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Slot kind. Overlays other than `phy` usually leave this unset and defer
    /// to the physical record.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<InterfaceType>,
    /// Any further attributes set by consumers (addresses, costs, ...).
    #[serde(default, flatten)]
    pub attrs: Attrs,
}

impl InterfaceRecord {
    /// Record for the reserved loopback slot.
    #[must_use]
    pub fn loopback_zero() -> Self {
        Self {
            description: Some("loopback".to_owned()),
            kind: Some(InterfaceType::Loopback),
            attrs: Attrs::new(),
        }
    }

    /// Record carrying only `description` and `kind`.
    #[must_use]
    pub fn new(description: Option<String>, kind: InterfaceType) -> Self {
        Self {
            description,
            kind: Some(kind),
            attrs: Attrs::new(),
        }
    }

    /// Returns `true` if nothing at all is recorded for this slot.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.description.is_none() && self.kind.is_none() && self.attrs.is_empty()
    }
}

/// Interface slots of one node in one overlay.
pub type InterfaceTable = BTreeMap<InterfaceId, InterfaceRecord>;

/// Edge-to-interface binding: which slot on each endpoint the edge occupies.
pub type InterfaceBinding = BTreeMap<NodeId, InterfaceId>;

/// Returns a fresh table holding only the reserved loopback slot.
#[must_use]
pub fn default_interface_table() -> InterfaceTable {
    let mut table = InterfaceTable::new();
    table.insert(InterfaceId::LOOPBACK_ZERO, InterfaceRecord::loopback_zero());
    table
}

/// Returns the lowest unused positive slot number in `table`.
///
/// Slot `0` is never returned; it belongs to the primary loopback.
#[must_use]
pub fn next_interface_id(table: &InterfaceTable) -> InterfaceId {
    let mut candidate = 1u32;
    for id in table.keys().map(|id| id.0).filter(|id| *id >= 1) {
        match id.cmp(&candidate) {
            std::cmp::Ordering::Equal => candidate += 1,
            std::cmp::Ordering::Greater => break,
            std::cmp::Ordering::Less => {}
        }
    }
    InterfaceId(candidate)
}

/// Materialised record for a node in one overlay.
///
/// The node identifier is not embedded here; the store supplies it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Free-form attributes.
    #[serde(default)]
    pub attrs: Attrs,
    /// Interface table; `None` until the overlay initialises interfaces for
    /// this node.
    #[serde(default, rename = "_interfaces", skip_serializing_if = "Option::is_none")]
    pub interfaces: Option<InterfaceTable>,
}

impl NodeRecord {
    /// Returns `true` if the node has at least one interface slot recorded.
    #[must_use]
    pub fn has_interfaces(&self) -> bool {
        self.interfaces.as_ref().is_some_and(|t| !t.is_empty())
    }
}

/// Materialised record for an edge in one overlay.
///
/// Endpoints are supplied by the store key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeRecord {
    /// Free-form attributes.
    #[serde(default)]
    pub attrs: Attrs,
    /// Slot bound on each endpoint. Empty until allocation (or explicit
    /// interface endpoints) binds the edge.
    #[serde(default, rename = "_interfaces")]
    pub interfaces: InterfaceBinding,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_interface_id_fills_the_lowest_gap() {
        let mut table = default_interface_table();
        assert_eq!(next_interface_id(&table), InterfaceId(1));
        table.insert(InterfaceId(1), InterfaceRecord::default());
        table.insert(InterfaceId(3), InterfaceRecord::default());
        assert_eq!(next_interface_id(&table), InterfaceId(2));
        table.insert(InterfaceId(2), InterfaceRecord::default());
        assert_eq!(next_interface_id(&table), InterfaceId(4));
    }

    #[test]
    fn next_interface_id_ignores_a_missing_loopback() {
        let table = InterfaceTable::new();
        assert_eq!(next_interface_id(&table), InterfaceId(1));
    }

    #[test]
    fn interface_type_parses_its_own_names() {
        for kind in [InterfaceType::Physical, InterfaceType::Loopback] {
            assert_eq!(kind.as_str().parse::<InterfaceType>(), Ok(kind));
        }
        assert!("tunnel".parse::<InterfaceType>().is_err());
    }
}
