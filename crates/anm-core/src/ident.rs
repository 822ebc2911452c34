// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Identifier types for overlays, nodes, and interfaces.
use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Name of the physical overlay. Interface numbering is authoritative here.
pub const PHY: &str = "phy";
/// Name of the overlay seeded from the external topology.
pub const INPUT: &str = "input";
/// Name of the overlay carrying layout attributes for renderers.
pub const GRAPHICS: &str = "graphics";

/// Opaque node identifier, stable across every overlay that includes the node.
///
/// Node ids are assigned once (usually from the topology source) and reused
/// verbatim; overlays never mint their own ids for an existing device.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for NodeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&NodeId> for NodeId {
    fn from(value: &NodeId) -> Self {
        value.clone()
    }
}

/// Registry key of an overlay (`phy`, `input`, `ospf`, ...).
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OverlayId(pub String);

impl OverlayId {
    /// Returns the overlay name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` for the physical overlay.
    #[must_use]
    pub fn is_phy(&self) -> bool {
        self.0 == PHY
    }
}

impl fmt::Display for OverlayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OverlayId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for OverlayId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&OverlayId> for OverlayId {
    fn from(value: &OverlayId) -> Self {
        value.clone()
    }
}

impl Borrow<str> for OverlayId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for OverlayId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for OverlayId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Per-node interface slot number. Id `0` is reserved for the primary loopback.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InterfaceId(pub u32);

impl InterfaceId {
    /// The reserved primary loopback slot.
    pub const LOOPBACK_ZERO: Self = Self(0);

    /// Returns `true` for the reserved loopback slot.
    #[must_use]
    pub const fn is_loopback_zero(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for InterfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for InterfaceId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn overlay_id_compares_against_plain_names() {
        let phy = OverlayId::from(PHY);
        assert!(phy.is_phy());
        assert_eq!(phy, "phy");
        assert!(!OverlayId::from(INPUT).is_phy());
    }

    #[test]
    fn ids_serialize_transparently() {
        let json = serde_json::to_string(&NodeId::from("r1")).unwrap();
        assert_eq!(json, "\"r1\"");
        let json = serde_json::to_string(&InterfaceId(3)).unwrap();
        assert_eq!(json, "3");
    }
}
