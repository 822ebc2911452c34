// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The model registry: every overlay of one network, keyed by name.
//!
//! [`AbstractNetworkModel`] exclusively owns one [`OverlayStore`] per overlay.
//! Everything else in the crate (graph views, node/edge/interface views) is a
//! lookup into this registry and never holds data of its own.

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::{info, warn};

use crate::config::AnmConfig;
use crate::filter::{filter_items, Filter};
use crate::graph::OverlayStore;
use crate::ident::{InterfaceId, NodeId, OverlayId, GRAPHICS, INPUT, PHY};
use crate::node::OverlayNode;
use crate::overlay::{NodeOptions, OverlayBase, OverlayGraph, OverlayGraphMut};
use crate::persist::StoreError;
use crate::topology::TopologyGraph;

/// Errors surfaced by the model registry.
#[derive(Debug, Error)]
pub enum AnmError {
    /// No overlay is registered under this name.
    #[error("overlay {0} not found")]
    OverlayNotFound(OverlayId),
    /// The node is not part of the overlay it was addressed through.
    #[error("node {node} not found in overlay {overlay}")]
    NodeNotFound {
        /// Overlay searched.
        overlay: OverlayId,
        /// Missing node.
        node: NodeId,
    },
    /// No edge `(src, dst)` exists in the overlay.
    #[error("edge ({src}, {dst}) not found in overlay {overlay}")]
    EdgeNotFound {
        /// Overlay searched.
        overlay: OverlayId,
        /// Source endpoint.
        src: NodeId,
        /// Destination endpoint.
        dst: NodeId,
    },
    /// The node has no such interface slot.
    #[error("interface {interface} not found on node {node} in overlay {overlay}")]
    InterfaceNotFound {
        /// Overlay searched.
        overlay: OverlayId,
        /// Owning node.
        node: NodeId,
        /// Missing slot.
        interface: InterfaceId,
    },
    /// Snapshot encoding or storage failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Creation options for [`AbstractNetworkModel::add_overlay_with`].
#[derive(Debug, Clone, Default)]
pub struct OverlayOptions {
    directed: bool,
    multi_edge: bool,
    graph: Option<TopologyGraph>,
    nodes: Vec<OverlayNode>,
    retain: Vec<String>,
}

impl OverlayOptions {
    /// Default options: undirected, simple graph, empty.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps `(a, b)` and `(b, a)` as distinct edges.
    #[must_use]
    pub fn directed(mut self, directed: bool) -> Self {
        self.directed = directed;
        self
    }

    /// Keeps parallel edges apart instead of merging them.
    #[must_use]
    pub fn multi_edge(mut self, multi_edge: bool) -> Self {
        self.multi_edge = multi_edge;
        self
    }

    /// Seeds the overlay from an external topology.
    #[must_use]
    pub fn from_graph(mut self, graph: TopologyGraph) -> Self {
        self.graph = Some(graph);
        self
    }

    /// Copies these nodes (usually from another overlay) into the new one.
    #[must_use]
    pub fn nodes<I: IntoIterator<Item = OverlayNode>>(mut self, nodes: I) -> Self {
        self.nodes = nodes.into_iter().collect();
        self
    }

    /// Attributes retained when copying [`nodes`](Self::nodes).
    #[must_use]
    pub fn retain<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.retain = keys.into_iter().map(Into::into).collect();
        self
    }
}

/// Multi-overlay network model.
///
/// A fresh model already holds the `phy` and `graphics` overlays. Overlays are
/// never deleted; re-adding a name replaces its graph.
#[derive(Debug, Clone)]
pub struct AbstractNetworkModel {
    pub(crate) overlays: BTreeMap<OverlayId, OverlayStore>,
    pub(crate) config: AnmConfig,
}

impl Default for AbstractNetworkModel {
    fn default() -> Self {
        Self::new()
    }
}

impl AbstractNetworkModel {
    /// Creates a model with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(AnmConfig::default())
    }

    /// Creates a model with the given settings.
    #[must_use]
    pub fn with_config(config: AnmConfig) -> Self {
        let mut anm = Self {
            overlays: BTreeMap::new(),
            config,
        };
        anm.add_overlay(PHY);
        anm.add_overlay(GRAPHICS);
        anm
    }

    /// Current settings.
    #[must_use]
    pub fn config(&self) -> &AnmConfig {
        &self.config
    }

    /// Changes how node labels are derived from `phy` attributes.
    pub fn set_node_label<I, S>(&mut self, separator: &str, attrs: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.label_separator = separator.to_owned();
        self.config.label_attrs = attrs.into_iter().map(Into::into).collect();
    }

    /// Returns `true` if an overlay named `name` is registered.
    #[must_use]
    pub fn has_overlay(&self, name: &str) -> bool {
        self.overlays.contains_key(name)
    }

    /// Registered overlay names, ascending.
    pub fn overlays(&self) -> impl Iterator<Item = &OverlayId> {
        self.overlays.keys()
    }

    /// Read access to overlay `name`.
    pub fn overlay(&self, name: &str) -> Result<OverlayGraph<'_>, AnmError> {
        self.overlays
            .get(name)
            .map(|store| OverlayGraph::new(self, store))
            .ok_or_else(|| AnmError::OverlayNotFound(OverlayId::from(name)))
    }

    /// Write access to overlay `name`.
    pub fn overlay_mut(&mut self, name: &str) -> Result<OverlayGraphMut<'_>, AnmError> {
        if !self.has_overlay(name) {
            return Err(AnmError::OverlayNotFound(OverlayId::from(name)));
        }
        Ok(OverlayGraphMut::new(self, OverlayId::from(name)))
    }

    /// Shorthand for `overlay("phy")`.
    pub fn phy(&self) -> Result<OverlayGraph<'_>, AnmError> {
        self.overlay(PHY)
    }

    /// Registers an empty undirected overlay.
    pub fn add_overlay(&mut self, name: &str) -> OverlayGraphMut<'_> {
        self.add_overlay_with(name, OverlayOptions::default())
    }

    /// Registers an overlay.
    ///
    /// Interface allocation runs immediately, so the overlay is consistent
    /// with `phy` before any node is added. Nodes passed through
    /// [`OverlayOptions::nodes`] are added afterwards.
    pub fn add_overlay_with(&mut self, name: &str, options: OverlayOptions) -> OverlayGraphMut<'_> {
        let id = OverlayId::from(name);
        let OverlayOptions {
            directed,
            multi_edge,
            graph,
            nodes,
            retain,
        } = options;
        let store = match graph {
            Some(graph) => graph.into_store(id.clone(), directed),
            None => OverlayStore::new(id.clone(), directed, multi_edge),
        };
        if self.overlays.insert(id.clone(), store).is_some() {
            warn!(overlay = %id, "replacing existing overlay");
        }
        let mut overlay = OverlayGraphMut::new(self, id);
        overlay.allocate_interfaces();
        if !nodes.is_empty() {
            overlay.add_nodes_from_with(nodes, &NodeOptions::new().retain(retain));
        }
        overlay
    }

    /// Seeds `input` from an external topology (forced undirected) and copies
    /// its nodes into `graphics` with the configured layout attributes.
    pub fn initialise_graph(&mut self, graph: TopologyGraph) -> OverlayGraphMut<'_> {
        let nodes = self
            .add_overlay_with(INPUT, OverlayOptions::new().from_graph(graph))
            .node_views();
        let retain = self.config.graphics_retain.clone();
        match self.overlay_mut(GRAPHICS) {
            Ok(mut graphics) => {
                graphics.add_nodes_from_with(nodes, &NodeOptions::new().retain(retain));
            }
            Err(err) => info!(%err, "skipping graphics seeding"),
        }
        OverlayGraphMut::new(self, OverlayId::from(INPUT))
    }

    /// Label of `node`: the configured `phy` attributes joined by the
    /// separator, or the raw node id when none of them is set on `phy`.
    #[must_use]
    pub fn node_label(&self, node: &OverlayNode) -> String {
        self.label_for_id(node.id())
    }

    pub(crate) fn label_for_id(&self, id: &NodeId) -> String {
        let Some(record) = self.overlays.get(PHY).and_then(|phy| phy.node(id)) else {
            return id.to_string();
        };
        let parts: Vec<String> = self
            .config
            .label_attrs
            .iter()
            .filter_map(|key| record.attrs.get(key))
            .filter(|value| !value.is_null())
            .map(ToString::to_string)
            .collect();
        if parts.is_empty() {
            id.to_string()
        } else {
            parts.join(&self.config.label_separator)
        }
    }

    /// Physical devices matching `filter`.
    #[must_use]
    pub fn devices(&self, filter: &Filter) -> Vec<OverlayNode> {
        match self.phy() {
            Ok(phy) => filter_items(self, phy.nodes(), filter),
            Err(_) => Vec::new(),
        }
    }

    pub(crate) fn store(&self, id: &OverlayId) -> Option<&OverlayStore> {
        self.overlays.get(id)
    }

    pub(crate) fn store_by_name(&self, name: &str) -> Option<&OverlayStore> {
        self.overlays.get(name)
    }

    pub(crate) fn store_mut(&mut self, id: &OverlayId) -> Option<&mut OverlayStore> {
        self.overlays.get_mut(id)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]
    use super::*;
    use crate::value::attrs;

    #[test]
    fn fresh_model_holds_phy_and_graphics() {
        let anm = AbstractNetworkModel::new();
        let names: Vec<&str> = anm.overlays().map(OverlayId::as_str).collect();
        assert_eq!(names, vec![GRAPHICS, PHY]);
        assert!(anm.has_overlay(PHY));
        assert!(!anm.has_overlay("ospf"));
    }

    #[test]
    fn unknown_overlay_is_an_error() {
        let anm = AbstractNetworkModel::new();
        match anm.overlay("bgp") {
            Err(AnmError::OverlayNotFound(id)) => assert_eq!(id, "bgp"),
            other => panic!("expected OverlayNotFound, got {:?}", other.map(|g| g.name().to_owned())),
        }
    }

    #[test]
    fn node_label_joins_configured_attributes() {
        let mut anm = AbstractNetworkModel::new();
        {
            let mut phy = anm.overlay_mut(PHY).unwrap();
            phy.add_node_with(
                "r1",
                &NodeOptions::new().attrs(attrs([("label", "core"), ("asn", "65001")])),
            );
            phy.add_node("r2");
        }
        let r1 = OverlayNode::new(PHY, "r1");
        assert_eq!(anm.node_label(&r1), "core");

        anm.set_node_label("-", ["asn", "label"]);
        assert_eq!(anm.node_label(&r1), "65001-core");

        // nothing configured is set on r2, and r3 is not in phy at all
        assert_eq!(anm.node_label(&OverlayNode::new(PHY, "r2")), "r2");
        assert_eq!(anm.node_label(&OverlayNode::new("ospf", "r3")), "r3");
    }
}
