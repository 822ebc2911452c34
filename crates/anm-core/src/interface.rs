// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Interface views: `(overlay, node, interface)` identity values.
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::Serialize;
use tracing::{debug, warn};

use crate::anm::{AbstractNetworkModel, AnmError};
use crate::edge::OverlayEdge;
use crate::filter::AttrSource;
use crate::ident::{InterfaceId, NodeId, OverlayId, PHY};
use crate::node::OverlayNode;
use crate::record::{InterfaceRecord, InterfaceType};
use crate::value::AttrValue;

/// An interface slot as seen from one overlay.
///
/// Comparisons go through [`interface_identity`], which ignores the overlay:
/// `phy`'s `r1:1` and `ospf`'s `r1:1` are the same interface.
#[derive(Clone, Debug)]
pub struct OverlayInterface {
    overlay: OverlayId,
    node: NodeId,
    id: InterfaceId,
}

/// Identity of an interface view for equality, hashing and ordering.
#[must_use]
pub fn interface_identity(iface: &OverlayInterface) -> (&NodeId, InterfaceId) {
    (&iface.node, iface.id)
}

impl PartialEq for OverlayInterface {
    fn eq(&self, other: &Self) -> bool {
        interface_identity(self) == interface_identity(other)
    }
}

impl Eq for OverlayInterface {}

impl Hash for OverlayInterface {
    fn hash<H: Hasher>(&self, state: &mut H) {
        interface_identity(self).hash(state);
    }
}

impl PartialOrd for OverlayInterface {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OverlayInterface {
    fn cmp(&self, other: &Self) -> Ordering {
        interface_identity(self).cmp(&interface_identity(other))
    }
}

impl fmt::Display for OverlayInterface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.node, self.id)
    }
}

/// Serializable rendering of one interface slot.
#[derive(Debug, Clone, Serialize)]
pub struct InterfaceDump<'a> {
    /// Overlay the slot was read from.
    pub overlay: &'a OverlayId,
    /// Owning node.
    pub node: &'a NodeId,
    /// Slot number.
    pub id: InterfaceId,
    /// Local record.
    #[serde(flatten)]
    pub record: &'a InterfaceRecord,
}

impl OverlayInterface {
    /// Builds a view; the slot need not exist.
    pub fn new(overlay: impl Into<OverlayId>, node: impl Into<NodeId>, id: InterfaceId) -> Self {
        Self {
            overlay: overlay.into(),
            node: node.into(),
            id,
        }
    }

    /// Slot number.
    #[must_use]
    pub fn id(&self) -> InterfaceId {
        self.id
    }

    /// Owning node id.
    #[must_use]
    pub fn node_id(&self) -> &NodeId {
        &self.node
    }

    /// Overlay this view reads from.
    #[must_use]
    pub fn overlay_id(&self) -> &OverlayId {
        &self.overlay
    }

    /// Owning node view in the same overlay.
    #[must_use]
    pub fn node(&self) -> OverlayNode {
        OverlayNode::new(self.overlay.clone(), self.node.clone())
    }

    pub(crate) fn record<'a>(&self, anm: &'a AbstractNetworkModel) -> Option<&'a InterfaceRecord> {
        anm.store(&self.overlay)
            .and_then(|store| store.node(&self.node))
            .and_then(|node| node.interfaces.as_ref())
            .and_then(|table| table.get(&self.id))
    }

    fn phy_record<'a>(&self, anm: &'a AbstractNetworkModel) -> Option<&'a InterfaceRecord> {
        anm.store_by_name(PHY)
            .and_then(|store| store.node(&self.node))
            .and_then(|node| node.interfaces.as_ref())
            .and_then(|table| table.get(&self.id))
    }

    /// Returns `true` if the slot is recorded in this overlay.
    #[must_use]
    pub fn exists(&self, anm: &AbstractNetworkModel) -> bool {
        self.record(anm).is_some()
    }

    /// Slot kind.
    ///
    /// Slot `0` is always a loopback. Outside `phy` an explicit local kind wins,
    /// otherwise the `phy` counterpart decides.
    #[must_use]
    pub fn kind(&self, anm: &AbstractNetworkModel) -> Option<InterfaceType> {
        if self.id.is_loopback_zero() {
            return Some(InterfaceType::Loopback);
        }
        let local = self.record(anm).and_then(|r| r.kind);
        if self.overlay.is_phy() {
            local
        } else {
            local.or_else(|| self.phy_record(anm).and_then(|r| r.kind))
        }
    }

    /// Description, read locally and then from `phy`.
    #[must_use]
    pub fn description<'a>(&self, anm: &'a AbstractNetworkModel) -> Option<&'a str> {
        self.record(anm)
            .and_then(|r| r.description.as_deref())
            .or_else(|| self.phy_record(anm).and_then(|r| r.description.as_deref()))
    }

    /// Attribute `key`. `description` and `type` resolve through
    /// [`description`](Self::description) and [`kind`](Self::kind).
    #[must_use]
    pub fn get(&self, anm: &AbstractNetworkModel, key: &str) -> Option<AttrValue> {
        if !self.exists(anm) && self.phy_record(anm).is_none() {
            warn!(overlay = %self.overlay, interface = %self, "interface not found");
            return None;
        }
        self.lookup(anm, key)
    }

    fn lookup(&self, anm: &AbstractNetworkModel, key: &str) -> Option<AttrValue> {
        match key {
            "description" => self.description(anm).map(AttrValue::from),
            "type" => self.kind(anm).map(AttrValue::from),
            _ => self.record(anm).and_then(|r| r.attrs.get(key)).cloned(),
        }
    }

    /// Sets attribute `key` on this overlay's record of the slot.
    ///
    /// A slot that is visible through `phy` but not yet recorded locally is
    /// created on first write.
    pub fn set(
        &self,
        anm: &mut AbstractNetworkModel,
        key: &str,
        value: impl Into<AttrValue>,
    ) -> Result<(), AnmError> {
        let value = value.into();
        let visible = self.node().interface_ids(anm).contains(&self.id);
        let record = anm
            .store_mut(&self.overlay)
            .and_then(|store| store.node_mut(&self.node))
            .and_then(|node| {
                let table = node.interfaces.as_mut()?;
                if visible {
                    Some(table.entry(self.id).or_default())
                } else {
                    table.get_mut(&self.id)
                }
            });
        let Some(record) = record else {
            warn!(overlay = %self.overlay, interface = %self, "interface not found");
            return Err(AnmError::InterfaceNotFound {
                overlay: self.overlay.clone(),
                node: self.node.clone(),
                interface: self.id,
            });
        };
        match key {
            "description" => record.description = Some(value.to_string()),
            "type" => match value.as_str().map(str::parse::<InterfaceType>) {
                Some(Ok(kind)) => record.kind = Some(kind),
                _ => warn!(interface = %self, %value, "ignoring unknown interface type"),
            },
            _ => {
                record.attrs.insert(key.to_owned(), value);
            }
        }
        Ok(())
    }

    /// Slot kind is `loopback`.
    #[must_use]
    pub fn is_loopback(&self, anm: &AbstractNetworkModel) -> bool {
        self.kind(anm) == Some(InterfaceType::Loopback)
    }

    /// Slot kind is `physical`.
    #[must_use]
    pub fn is_physical(&self, anm: &AbstractNetworkModel) -> bool {
        self.kind(anm) == Some(InterfaceType::Physical)
    }

    /// The reserved primary loopback.
    #[must_use]
    pub fn is_loopback_zero(&self) -> bool {
        self.id.is_loopback_zero()
    }

    /// Edges of the owning node bound to this slot.
    #[must_use]
    pub fn edges(&self, anm: &AbstractNetworkModel) -> Vec<OverlayEdge> {
        self.node()
            .edges(anm)
            .into_iter()
            .filter(|edge| {
                edge.binding(anm)
                    .and_then(|b| b.get(&self.node))
                    .is_some_and(|id| *id == self.id)
            })
            .collect()
    }

    /// Far-end interfaces of [`edges`](Self::edges).
    #[must_use]
    pub fn neighbors(&self, anm: &AbstractNetworkModel) -> Vec<Self> {
        self.edges(anm)
            .iter()
            .filter_map(|edge| edge.dst_int(anm))
            .collect()
    }

    /// At least one edge is bound to this slot.
    #[must_use]
    pub fn is_bound(&self, anm: &AbstractNetworkModel) -> bool {
        !self.edges(anm).is_empty()
    }

    /// The same slot in overlay `name`.
    ///
    /// `None` when the overlay is unknown (logged as a warning) or the node
    /// is not part of it.
    #[must_use]
    pub fn in_overlay(&self, anm: &AbstractNetworkModel, name: &str) -> Option<Self> {
        let Some(store) = anm.store_by_name(name) else {
            warn!(overlay = name, interface = %self, "overlay not found");
            return None;
        };
        if !store.contains_node(&self.node) {
            debug!(overlay = name, node = %self.node, "node not in overlay");
            return None;
        }
        Some(Self::new(name, self.node.clone(), self.id))
    }

    /// The same slot in `phy`.
    #[must_use]
    pub fn phy(&self, anm: &AbstractNetworkModel) -> Option<Self> {
        self.in_overlay(anm, PHY)
    }

    /// Local record of this slot, for debug output.
    #[must_use]
    pub fn dump<'a>(&'a self, anm: &'a AbstractNetworkModel) -> Option<InterfaceDump<'a>> {
        self.record(anm).map(|record| InterfaceDump {
            overlay: &self.overlay,
            node: &self.node,
            id: self.id,
            record,
        })
    }
}

impl AttrSource for OverlayInterface {
    fn attr(&self, anm: &AbstractNetworkModel, key: &str) -> Option<AttrValue> {
        self.lookup(anm, key)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use std::collections::HashSet;

    use super::*;
    use crate::overlay::{OverlayBase, OverlayGraphMut};

    fn model() -> AbstractNetworkModel {
        let mut anm = AbstractNetworkModel::new();
        {
            let mut phy = anm.overlay_mut(PHY).unwrap();
            for id in ["r1", "r2", "r3"] {
                phy.add_node(id);
            }
            phy.add_edge("r1", "r2");
            phy.add_edge("r2", "r3");
            phy.allocate_interfaces();
        }
        let nodes = anm.overlay(PHY).map(|g| g.nodes()).unwrap();
        let edges = anm.overlay(PHY).map(|g| g.edges()).unwrap();
        let mut ospf: OverlayGraphMut<'_> = anm.add_overlay("ospf");
        ospf.add_nodes_from(nodes);
        ospf.add_edges_from(edges);
        anm
    }

    #[test]
    fn identity_ignores_the_overlay() {
        let a = OverlayInterface::new(PHY, "r1", InterfaceId(1));
        let b = OverlayInterface::new("ospf", "r1", InterfaceId(1));
        assert_eq!(a, b);
        let set: HashSet<OverlayInterface> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn kind_and_description_defer_to_phy() {
        let anm = model();
        let lo = OverlayInterface::new("ospf", "r2", InterfaceId::LOOPBACK_ZERO);
        assert!(lo.is_loopback(&anm));
        assert!(lo.is_loopback_zero());
        let eth = OverlayInterface::new("ospf", "r2", InterfaceId(2));
        assert!(eth.is_physical(&anm));
        assert_eq!(eth.description(&anm), Some("r2 to r3"));
        assert_eq!(eth.get(&anm, "type"), Some(AttrValue::from("physical")));
    }

    #[test]
    fn edges_and_neighbors_follow_the_binding() {
        let anm = model();
        let r2_1 = OverlayInterface::new("ospf", "r2", InterfaceId(1));
        let edges = r2_1.edges(&anm);
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].dst_id().as_str(), "r1");
        assert_eq!(
            r2_1.neighbors(&anm),
            vec![OverlayInterface::new("ospf", "r1", InterfaceId(1))]
        );
        assert!(r2_1.is_bound(&anm));
        let lo = OverlayInterface::new("ospf", "r2", InterfaceId::LOOPBACK_ZERO);
        assert!(!lo.is_bound(&anm));
    }

    #[test]
    fn set_writes_only_the_local_record() {
        let mut anm = model();
        let eth = OverlayInterface::new("ospf", "r1", InterfaceId(1));
        assert!(eth.set(&mut anm, "cost", 10).is_ok());
        assert_eq!(eth.get(&anm, "cost"), Some(AttrValue::from(10)));
        let phy = eth.phy(&anm);
        assert!(phy.is_some_and(|p| p.get(&anm, "cost").is_none()));
    }

    #[test]
    fn missing_slots_are_reported() {
        let mut anm = model();
        let ghost = OverlayInterface::new(PHY, "r1", InterfaceId(9));
        assert_eq!(ghost.get(&anm, "description"), None);
        assert!(matches!(
            ghost.set(&mut anm, "cost", 1),
            Err(AnmError::InterfaceNotFound { .. })
        ));
        assert!(ghost.in_overlay(&anm, "bgp").is_none());
    }
}
