// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Node views: `(overlay, node)` identity values.
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::Serialize;
use tracing::{debug, warn};

use crate::anm::{AbstractNetworkModel, AnmError};
use crate::edge::OverlayEdge;
use crate::filter::{filter_items, AttrSource, Filter};
use crate::ident::{InterfaceId, NodeId, OverlayId, INPUT, PHY};
use crate::interface::OverlayInterface;
use crate::natural::{natural_key, NaturalKey};
use crate::overlay::NodeOptions;
use crate::record::{
    default_interface_table, next_interface_id, InterfaceRecord, InterfaceType, NodeRecord,
};
use crate::value::{AttrValue, Attrs};

/// Attribute whose absence is common enough that it is not logged.
const DEVICE_TYPE: &str = "device_type";

/// A node as seen from one overlay.
///
/// The view holds ids only. Equality and hashing use the node id, so the same
/// device compares equal across overlays; use [`OverlayNode::overlay_id`]
/// when the layer matters.
#[derive(Clone, Debug)]
pub struct OverlayNode {
    overlay: OverlayId,
    id: NodeId,
}

impl PartialEq for OverlayNode {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for OverlayNode {}

impl Hash for OverlayNode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for OverlayNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.id, f)
    }
}

/// Sort key of a node: ASN (with `phy` fallback) first, then the natural
/// order of its id. Nodes without an ASN sort first.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct NodeOrderKey {
    asn: Option<AttrValue>,
    natural: NaturalKey,
}

/// Serializable rendering of one node in one overlay.
#[derive(Debug, Clone, Serialize)]
pub struct NodeDump<'a> {
    /// Overlay the node was read from.
    pub overlay: &'a OverlayId,
    /// Node id.
    pub id: &'a NodeId,
    /// Attributes and interface table.
    #[serde(flatten)]
    pub record: &'a NodeRecord,
}

impl OverlayNode {
    /// Builds a view; the node need not exist.
    pub fn new(overlay: impl Into<OverlayId>, id: impl Into<NodeId>) -> Self {
        Self {
            overlay: overlay.into(),
            id: id.into(),
        }
    }

    /// Node id, shared by every overlay.
    #[must_use]
    pub fn id(&self) -> &NodeId {
        &self.id
    }

    /// Overlay this view reads from.
    #[must_use]
    pub fn overlay_id(&self) -> &OverlayId {
        &self.overlay
    }

    /// Returns `true` if the node exists in this view's overlay.
    #[must_use]
    pub fn exists(&self, anm: &AbstractNetworkModel) -> bool {
        self.record(anm).is_some()
    }

    /// The same node in overlay `name`, or `None` when it is not there.
    #[must_use]
    pub fn in_overlay(&self, anm: &AbstractNetworkModel, name: &str) -> Option<Self> {
        let view = Self::new(name, self.id.clone());
        view.exists(anm).then_some(view)
    }

    /// The same node in `phy`, or `None` when it is not there.
    #[must_use]
    pub fn phy(&self, anm: &AbstractNetworkModel) -> Option<Self> {
        self.in_overlay(anm, PHY)
    }

    pub(crate) fn record<'a>(&self, anm: &'a AbstractNetworkModel) -> Option<&'a NodeRecord> {
        anm.store(&self.overlay).and_then(|store| store.node(&self.id))
    }

    fn phy_record<'a>(&self, anm: &'a AbstractNetworkModel) -> Option<&'a NodeRecord> {
        anm.store_by_name(PHY).and_then(|store| store.node(&self.id))
    }

    /// Attribute `key` in this overlay only.
    #[must_use]
    pub fn get<'a>(&self, anm: &'a AbstractNetworkModel, key: &str) -> Option<&'a AttrValue> {
        let value = self.record(anm).and_then(|r| r.attrs.get(key));
        if value.is_none() && key != DEVICE_TYPE {
            debug!(overlay = %self.overlay, node = %self.id, key, "attribute not set");
        }
        value
    }

    /// Attribute `key` in this overlay, else in `phy`.
    #[must_use]
    pub fn get_with_fallback<'a>(
        &self,
        anm: &'a AbstractNetworkModel,
        key: &str,
    ) -> Option<&'a AttrValue> {
        self.record(anm)
            .and_then(|r| r.attrs.get(key))
            .or_else(|| self.phy_record(anm).and_then(|r| r.attrs.get(key)))
    }

    /// Sets attribute `key` in this overlay, adding the node if needed.
    pub fn set(
        &self,
        anm: &mut AbstractNetworkModel,
        key: &str,
        value: impl Into<AttrValue>,
    ) -> Result<(), AnmError> {
        let value = value.into();
        let store = anm
            .store_mut(&self.overlay)
            .ok_or_else(|| AnmError::OverlayNotFound(self.overlay.clone()))?;
        if let Some(record) = store.node_mut(&self.id) {
            record.attrs.insert(key.to_owned(), value);
            return Ok(());
        }
        let mut extra = Attrs::new();
        extra.insert(key.to_owned(), value);
        anm.overlay_mut(self.overlay.as_str())?
            .add_node_with(self.id.clone(), &NodeOptions::new().attrs(extra));
        Ok(())
    }

    /// ASN of the node, read locally and then from `phy`.
    #[must_use]
    pub fn asn<'a>(&self, anm: &'a AbstractNetworkModel) -> Option<&'a AttrValue> {
        let asn = self.get_with_fallback(anm, "asn");
        if asn.is_none() && self.phy_record(anm).is_none() {
            if self.overlay.as_str() == INPUT {
                debug!(node = %self.id, "node not in phy");
            } else {
                warn!(node = %self.id, "node not in phy");
            }
        }
        asn
    }

    /// Sets the ASN on this node and on its `phy` counterpart, if any.
    pub fn set_asn(
        &self,
        anm: &mut AbstractNetworkModel,
        value: impl Into<AttrValue>,
    ) -> Result<(), AnmError> {
        let value = value.into();
        if let Some(record) = anm
            .store_mut(&OverlayId::from(PHY))
            .and_then(|store| store.node_mut(&self.id))
        {
            record.attrs.insert("asn".to_owned(), value.clone());
            if self.overlay.is_phy() {
                return Ok(());
            }
        }
        self.set(anm, "asn", value)
    }

    /// Display label, derived from `phy` attributes.
    #[must_use]
    pub fn label(&self, anm: &AbstractNetworkModel) -> String {
        anm.node_label(self)
    }

    /// Key implementing the node ordering.
    #[must_use]
    pub fn order_key(&self, anm: &AbstractNetworkModel) -> NodeOrderKey {
        NodeOrderKey {
            asn: self.get_with_fallback(anm, "asn").cloned(),
            natural: natural_key(self.id.as_str()),
        }
    }

    fn device_type_is(&self, anm: &AbstractNetworkModel, kind: &str) -> bool {
        let local = self.record(anm).and_then(|r| r.attrs.get(DEVICE_TYPE));
        let phy = self.phy_record(anm).and_then(|r| r.attrs.get(DEVICE_TYPE));
        [local, phy]
            .into_iter()
            .flatten()
            .any(|v| v.as_str() == Some(kind))
    }

    /// `device_type` is `router` here or in `phy`.
    #[must_use]
    pub fn is_router(&self, anm: &AbstractNetworkModel) -> bool {
        self.device_type_is(anm, "router")
    }

    /// `device_type` is `switch` here or in `phy`.
    #[must_use]
    pub fn is_switch(&self, anm: &AbstractNetworkModel) -> bool {
        self.device_type_is(anm, "switch")
    }

    /// `device_type` is `server` here or in `phy`.
    #[must_use]
    pub fn is_server(&self, anm: &AbstractNetworkModel) -> bool {
        self.device_type_is(anm, "server")
    }

    /// Routers and servers.
    #[must_use]
    pub fn is_l3device(&self, anm: &AbstractNetworkModel) -> bool {
        self.is_router(anm) || self.is_server(anm)
    }

    /// Number of edge ends at this node in this overlay.
    #[must_use]
    pub fn degree(&self, anm: &AbstractNetworkModel) -> usize {
        anm.store(&self.overlay)
            .map_or(0, |store| store.degree(&self.id))
    }

    /// Adjacent nodes matching `filter`, ascending by id.
    #[must_use]
    pub fn neighbors(&self, anm: &AbstractNetworkModel, filter: &Filter) -> Vec<Self> {
        let Some(store) = anm.store(&self.overlay) else {
            return Vec::new();
        };
        let neighbors = store
            .neighbors(&self.id)
            .into_iter()
            .map(|id| Self::new(self.overlay.clone(), id));
        filter_items(anm, neighbors, filter)
    }

    /// Edges leaving this node, oriented `(self, other)`.
    #[must_use]
    pub fn edges(&self, anm: &AbstractNetworkModel) -> Vec<OverlayEdge> {
        let Some(store) = anm.store(&self.overlay) else {
            return Vec::new();
        };
        store
            .edges_from(&self.id)
            .into_iter()
            .map(|(other, index)| {
                OverlayEdge::with_index(self.overlay.clone(), self.id.clone(), other, index)
            })
            .collect()
    }

    /// Far-end interfaces of this node's bound edges.
    #[must_use]
    pub fn neighbor_interfaces(&self, anm: &AbstractNetworkModel) -> Vec<OverlayInterface> {
        self.edges(anm)
            .iter()
            .filter_map(|edge| edge.dst_int(anm))
            .collect()
    }

    /// Interface ids visible from this overlay.
    ///
    /// Outside `phy`, a node that also exists in `phy` shows the `phy` id set.
    #[must_use]
    pub fn interface_ids(&self, anm: &AbstractNetworkModel) -> Vec<InterfaceId> {
        let source = if self.overlay.is_phy() {
            self.record(anm)
        } else {
            self.phy_record(anm).or_else(|| self.record(anm))
        };
        source
            .and_then(|r| r.interfaces.as_ref())
            .map(|table| table.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Every interface of this node.
    #[must_use]
    pub fn interfaces(&self, anm: &AbstractNetworkModel) -> Vec<OverlayInterface> {
        self.interface_ids(anm)
            .into_iter()
            .map(|id| OverlayInterface::new(self.overlay.clone(), self.id.clone(), id))
            .collect()
    }

    /// Interfaces matching `filter`.
    #[must_use]
    pub fn interfaces_matching(
        &self,
        anm: &AbstractNetworkModel,
        filter: &Filter,
    ) -> Vec<OverlayInterface> {
        filter_items(anm, self.interfaces(anm), filter)
    }

    /// Interfaces whose type is `physical`.
    #[must_use]
    pub fn physical_interfaces(&self, anm: &AbstractNetworkModel) -> Vec<OverlayInterface> {
        self.interfaces(anm)
            .into_iter()
            .filter(|i| i.is_physical(anm))
            .collect()
    }

    /// Interfaces whose type is `loopback`, including slot `0`.
    #[must_use]
    pub fn loopback_interfaces(&self, anm: &AbstractNetworkModel) -> Vec<OverlayInterface> {
        self.interfaces(anm)
            .into_iter()
            .filter(|i| i.is_loopback(anm))
            .collect()
    }

    /// The primary loopback.
    #[must_use]
    pub fn loopback_zero(&self) -> OverlayInterface {
        OverlayInterface::new(
            self.overlay.clone(),
            self.id.clone(),
            InterfaceId::LOOPBACK_ZERO,
        )
    }

    /// Interface `id`, or `None` (with a warning) when the node has no such
    /// slot.
    #[must_use]
    pub fn interface(&self, anm: &AbstractNetworkModel, id: InterfaceId) -> Option<OverlayInterface> {
        if self.interface_ids(anm).contains(&id) {
            return Some(OverlayInterface::new(
                self.overlay.clone(),
                self.id.clone(),
                id,
            ));
        }
        warn!(overlay = %self.overlay, node = %self.id, interface = %id, "interface not found");
        None
    }

    /// Adds a physical interface.
    pub fn add_interface(
        &self,
        anm: &mut AbstractNetworkModel,
        description: Option<&str>,
        attrs: Attrs,
    ) -> Result<OverlayInterface, AnmError> {
        self.push_interface(anm, InterfaceType::Physical, description, attrs)
    }

    /// Adds a secondary loopback interface.
    pub fn add_loopback(
        &self,
        anm: &mut AbstractNetworkModel,
        description: Option<&str>,
        attrs: Attrs,
    ) -> Result<OverlayInterface, AnmError> {
        self.push_interface(anm, InterfaceType::Loopback, description, attrs)
    }

    /// Allocates the next slot. When the node also lives in `phy` (and this is
    /// not `phy`), the id is taken from the `phy` table and the `phy` record is
    /// created as well so both layers stay aligned.
    fn push_interface(
        &self,
        anm: &mut AbstractNetworkModel,
        kind: InterfaceType,
        description: Option<&str>,
        attrs: Attrs,
    ) -> Result<OverlayInterface, AnmError> {
        if !self.exists(anm) {
            return Err(AnmError::NodeNotFound {
                overlay: self.overlay.clone(),
                node: self.id.clone(),
            });
        }
        let description = description.map(str::to_owned);
        let phy_backed = !self.overlay.is_phy() && self.phy_record(anm).is_some();
        let (id, record) = if phy_backed {
            let phy = anm
                .store_mut(&OverlayId::from(PHY))
                .and_then(|store| store.node_mut(&self.id))
                .ok_or_else(|| AnmError::OverlayNotFound(OverlayId::from(PHY)))?;
            let table = phy.interfaces.get_or_insert_with(default_interface_table);
            let id = next_interface_id(table);
            table.insert(id, InterfaceRecord::new(description.clone(), kind));
            let record = InterfaceRecord {
                description,
                kind: None,
                attrs,
            };
            (id, record)
        } else {
            let table = self
                .record(anm)
                .and_then(|r| r.interfaces.clone())
                .unwrap_or_else(default_interface_table);
            let id = next_interface_id(&table);
            let record = InterfaceRecord {
                description,
                kind: Some(kind),
                attrs,
            };
            (id, record)
        };
        let store = anm
            .store_mut(&self.overlay)
            .ok_or_else(|| AnmError::OverlayNotFound(self.overlay.clone()))?;
        store
            .node_mut(&self.id)
            .ok_or_else(|| AnmError::NodeNotFound {
                overlay: self.overlay.clone(),
                node: self.id.clone(),
            })?
            .interfaces
            .get_or_insert_with(default_interface_table)
            .insert(id, record);
        Ok(OverlayInterface::new(self.overlay.clone(), self.id.clone(), id))
    }

    /// Record of this node, for debug output.
    #[must_use]
    pub fn dump<'a>(&'a self, anm: &'a AbstractNetworkModel) -> Option<NodeDump<'a>> {
        self.record(anm).map(|record| NodeDump {
            overlay: &self.overlay,
            id: &self.id,
            record,
        })
    }
}

impl AttrSource for OverlayNode {
    fn attr(&self, anm: &AbstractNetworkModel, key: &str) -> Option<AttrValue> {
        if key == "asn" {
            return self.get_with_fallback(anm, key).cloned();
        }
        self.record(anm).and_then(|r| r.attrs.get(key)).cloned()
    }
}
