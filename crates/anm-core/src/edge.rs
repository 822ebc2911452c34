// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Edge views: `(overlay, src, dst)` identity values.
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::Serialize;
use tracing::{debug, warn};

use crate::anm::{AbstractNetworkModel, AnmError};
use crate::filter::AttrSource;
use crate::ident::{InterfaceId, NodeId, OverlayId};
use crate::interface::OverlayInterface;
use crate::node::OverlayNode;
use crate::record::{EdgeRecord, InterfaceBinding};
use crate::value::AttrValue;

/// An edge as seen from one overlay.
///
/// Equality, hashing and ordering use `(src, dst)` only. The parallel-edge
/// `index` selects a record on multi-edge overlays and is ignored by
/// comparisons.
#[derive(Clone, Debug)]
pub struct OverlayEdge {
    overlay: OverlayId,
    src: NodeId,
    dst: NodeId,
    index: usize,
}

impl PartialEq for OverlayEdge {
    fn eq(&self, other: &Self) -> bool {
        self.src == other.src && self.dst == other.dst
    }
}

impl Eq for OverlayEdge {}

impl Hash for OverlayEdge {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.src.hash(state);
        self.dst.hash(state);
    }
}

impl PartialOrd for OverlayEdge {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OverlayEdge {
    fn cmp(&self, other: &Self) -> Ordering {
        (&self.src, &self.dst).cmp(&(&other.src, &other.dst))
    }
}

impl fmt::Display for OverlayEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ({}, {})", self.overlay, self.src, self.dst)
    }
}

/// Serializable rendering of one edge in one overlay.
#[derive(Debug, Clone, Serialize)]
pub struct EdgeDump<'a> {
    /// Overlay the edge was read from.
    pub overlay: &'a OverlayId,
    /// Source node.
    pub src: &'a NodeId,
    /// Destination node.
    pub dst: &'a NodeId,
    /// Attributes and binding.
    #[serde(flatten)]
    pub record: &'a EdgeRecord,
}

impl OverlayEdge {
    /// Builds a view on the first record of `(src, dst)`.
    pub fn new(overlay: impl Into<OverlayId>, src: impl Into<NodeId>, dst: impl Into<NodeId>) -> Self {
        Self::with_index(overlay, src, dst, 0)
    }

    /// Builds a view on the `index`-th parallel record of `(src, dst)`.
    pub fn with_index(
        overlay: impl Into<OverlayId>,
        src: impl Into<NodeId>,
        dst: impl Into<NodeId>,
        index: usize,
    ) -> Self {
        Self {
            overlay: overlay.into(),
            src: src.into(),
            dst: dst.into(),
            index,
        }
    }

    /// Overlay this view reads from.
    #[must_use]
    pub fn overlay_id(&self) -> &OverlayId {
        &self.overlay
    }

    /// Source node id.
    #[must_use]
    pub fn src_id(&self) -> &NodeId {
        &self.src
    }

    /// Destination node id.
    #[must_use]
    pub fn dst_id(&self) -> &NodeId {
        &self.dst
    }

    /// Parallel-edge index.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Source node view.
    #[must_use]
    pub fn src(&self) -> OverlayNode {
        OverlayNode::new(self.overlay.clone(), self.src.clone())
    }

    /// Destination node view.
    #[must_use]
    pub fn dst(&self) -> OverlayNode {
        OverlayNode::new(self.overlay.clone(), self.dst.clone())
    }

    pub(crate) fn record<'a>(&self, anm: &'a AbstractNetworkModel) -> Option<&'a EdgeRecord> {
        anm.store(&self.overlay)
            .and_then(|store| store.edge(&self.src, &self.dst, self.index))
    }

    fn not_found(&self) -> AnmError {
        AnmError::EdgeNotFound {
            overlay: self.overlay.clone(),
            src: self.src.clone(),
            dst: self.dst.clone(),
        }
    }

    /// Returns `true` if the edge exists in this view's overlay.
    #[must_use]
    pub fn exists(&self, anm: &AbstractNetworkModel) -> bool {
        self.record(anm).is_some()
    }

    /// The same edge in overlay `name`, or `None` when it is not there.
    #[must_use]
    pub fn in_overlay(&self, anm: &AbstractNetworkModel, name: &str) -> Option<Self> {
        let store = anm.store_by_name(name)?;
        if !store.has_edge(&self.src, &self.dst) {
            return None;
        }
        let index = if store.edge(&self.src, &self.dst, self.index).is_some() {
            self.index
        } else {
            0
        };
        Some(Self::with_index(name, self.src.clone(), self.dst.clone(), index))
    }

    /// Attribute `key` of this edge.
    #[must_use]
    pub fn get<'a>(&self, anm: &'a AbstractNetworkModel, key: &str) -> Option<&'a AttrValue> {
        let value = self.record(anm).and_then(|r| r.attrs.get(key));
        if value.is_none() {
            debug!(edge = %self, key, "attribute not set");
        }
        value
    }

    /// Sets attribute `key` of this edge.
    pub fn set(
        &self,
        anm: &mut AbstractNetworkModel,
        key: &str,
        value: impl Into<AttrValue>,
    ) -> Result<(), AnmError> {
        let record = anm
            .store_mut(&self.overlay)
            .and_then(|store| store.edge_mut(&self.src, &self.dst, self.index))
            .ok_or_else(|| self.not_found())?;
        record.attrs.insert(key.to_owned(), value.into());
        Ok(())
    }

    /// Interface binding of this edge.
    #[must_use]
    pub fn binding<'a>(&self, anm: &'a AbstractNetworkModel) -> Option<&'a InterfaceBinding> {
        self.record(anm).map(|r| &r.interfaces)
    }

    fn bound_interface(&self, anm: &AbstractNetworkModel, node: &NodeId) -> Option<OverlayInterface> {
        let id = self.binding(anm)?.get(node)?;
        Some(OverlayInterface::new(self.overlay.clone(), node.clone(), *id))
    }

    /// Interface on the source node this edge is bound to.
    #[must_use]
    pub fn src_int(&self, anm: &AbstractNetworkModel) -> Option<OverlayInterface> {
        self.bound_interface(anm, &self.src)
    }

    /// Interface on the destination node this edge is bound to.
    #[must_use]
    pub fn dst_int(&self, anm: &AbstractNetworkModel) -> Option<OverlayInterface> {
        self.bound_interface(anm, &self.dst)
    }

    /// Every interface this edge is bound to, ascending by node id.
    #[must_use]
    pub fn interfaces(&self, anm: &AbstractNetworkModel) -> Vec<OverlayInterface> {
        self.binding(anm)
            .map(|binding| {
                binding
                    .iter()
                    .map(|(node, id)| OverlayInterface::new(self.overlay.clone(), node.clone(), *id))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Binds `node`'s end of this edge to slot `id`.
    ///
    /// The slot is not required to exist yet; a dangling binding is logged.
    pub fn bind_interface(
        &self,
        anm: &mut AbstractNetworkModel,
        node: &NodeId,
        id: InterfaceId,
    ) -> Result<(), AnmError> {
        let known = OverlayNode::new(self.overlay.clone(), node.clone())
            .interface_ids(anm)
            .contains(&id);
        if !known {
            warn!(edge = %self, node = %node, interface = %id, "binding to unknown interface");
        }
        let record = anm
            .store_mut(&self.overlay)
            .and_then(|store| store.edge_mut(&self.src, &self.dst, self.index))
            .ok_or_else(|| self.not_found())?;
        record.interfaces.insert(node.clone(), id);
        Ok(())
    }

    /// Copies edge attribute `key` onto both bound interfaces.
    ///
    /// Does nothing when the attribute is unset; unbound ends are skipped.
    pub fn apply_to_interfaces(&self, anm: &mut AbstractNetworkModel, key: &str) -> Result<(), AnmError> {
        let Some(value) = self.get(anm, key).cloned() else {
            return Ok(());
        };
        for iface in [self.src_int(anm), self.dst_int(anm)].into_iter().flatten() {
            iface.set(anm, key, value.clone())?;
        }
        Ok(())
    }

    fn endpoint_attrs(&self, anm: &AbstractNetworkModel, key: &str) -> (Option<AttrValue>, Option<AttrValue>) {
        (self.src().attr(anm, key), self.dst().attr(anm, key))
    }

    /// Both endpoints carry the same value for every key.
    #[must_use]
    pub fn attr_equal(&self, anm: &AbstractNetworkModel, keys: &[&str]) -> bool {
        keys.iter().all(|key| {
            let (a, b) = self.endpoint_attrs(anm, key);
            a == b
        })
    }

    /// Both endpoints carry a truthy value for every key.
    #[must_use]
    pub fn attr_both(&self, anm: &AbstractNetworkModel, keys: &[&str]) -> bool {
        keys.iter().all(|key| {
            let (a, b) = self.endpoint_attrs(anm, key);
            a.is_some_and(|v| v.is_truthy()) && b.is_some_and(|v| v.is_truthy())
        })
    }

    /// At least one endpoint carries a truthy value for every key.
    #[must_use]
    pub fn attr_any(&self, anm: &AbstractNetworkModel, keys: &[&str]) -> bool {
        keys.iter().all(|key| {
            let (a, b) = self.endpoint_attrs(anm, key);
            a.is_some_and(|v| v.is_truthy()) || b.is_some_and(|v| v.is_truthy())
        })
    }

    /// Record of this edge, for debug output.
    #[must_use]
    pub fn dump<'a>(&'a self, anm: &'a AbstractNetworkModel) -> Option<EdgeDump<'a>> {
        self.record(anm).map(|record| EdgeDump {
            overlay: &self.overlay,
            src: &self.src,
            dst: &self.dst,
            record,
        })
    }
}

impl AttrSource for OverlayEdge {
    fn attr(&self, anm: &AbstractNetworkModel, key: &str) -> Option<AttrValue> {
        self.record(anm).and_then(|r| r.attrs.get(key)).cloned()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::ident::PHY;
    use crate::overlay::{EdgeOptions, NodeOptions};
    use crate::value::attrs;

    fn model() -> AbstractNetworkModel {
        let mut anm = AbstractNetworkModel::new();
        {
            let mut phy = anm.overlay_mut(PHY).unwrap();
            phy.add_node_with("r1", &NodeOptions::new().attrs(attrs([("asn", 1)])));
            phy.add_node_with("r2", &NodeOptions::new().attrs(attrs([("asn", 1)])));
            phy.add_node_with("r3", &NodeOptions::new().attrs(attrs([("asn", 2)])));
            phy.add_edge_with("r1", "r2", &EdgeOptions::new().attrs(attrs([("cost", 5)])));
            phy.add_edge("r2", "r3");
            phy.allocate_interfaces();
        }
        anm
    }

    #[test]
    fn equality_ignores_overlay_and_index() {
        let a = OverlayEdge::new(PHY, "r1", "r2");
        let b = OverlayEdge::with_index("ospf", "r1", "r2", 3);
        assert_eq!(a, b);
        assert!(OverlayEdge::new(PHY, "r1", "r2") < OverlayEdge::new(PHY, "r1", "r3"));
    }

    #[test]
    fn bound_interfaces_resolve_per_endpoint() {
        let anm = model();
        let edge = OverlayEdge::new(PHY, "r2", "r3");
        assert!(edge.exists(&anm));
        let src = edge.src_int(&anm).map(|i| i.id());
        let dst = edge.dst_int(&anm).map(|i| i.id());
        assert_eq!(src, Some(InterfaceId(2)));
        assert_eq!(dst, Some(InterfaceId(1)));
        assert_eq!(edge.interfaces(&anm).len(), 2);
    }

    #[test]
    fn endpoint_attribute_predicates() {
        let anm = model();
        let same_as = OverlayEdge::new(PHY, "r1", "r2");
        let cross_as = OverlayEdge::new(PHY, "r2", "r3");
        assert!(same_as.attr_equal(&anm, &["asn"]));
        assert!(!cross_as.attr_equal(&anm, &["asn"]));
        assert!(cross_as.attr_both(&anm, &["asn"]));
        assert!(!cross_as.attr_any(&anm, &["ibgp"]));
    }

    #[test]
    fn apply_to_interfaces_copies_the_edge_attribute() {
        let mut anm = model();
        let edge = OverlayEdge::new(PHY, "r1", "r2");
        assert!(edge.apply_to_interfaces(&mut anm, "cost").is_ok());
        for iface in edge.interfaces(&anm) {
            assert_eq!(iface.get(&anm, "cost"), Some(AttrValue::from(5)));
        }
    }

    #[test]
    fn set_on_missing_edge_is_an_error() {
        let mut anm = model();
        let edge = OverlayEdge::new(PHY, "r1", "r3");
        assert!(matches!(
            edge.set(&mut anm, "cost", 1),
            Err(AnmError::EdgeNotFound { .. })
        ));
        assert!(edge.in_overlay(&anm, PHY).is_none());
    }
}
