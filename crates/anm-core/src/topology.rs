// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! External topology input.
//!
//! A [`TopologyGraph`] is the hand-off format from whatever reads the
//! network description (GraphML, YAML, a database) into the model. The core
//! does no file parsing beyond deserialising this value.
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::graph::OverlayStore;
use crate::ident::{InterfaceId, NodeId, OverlayId};
use crate::persist::StoreError;
use crate::record::{EdgeRecord, InterfaceBinding, InterfaceRecord, InterfaceTable, NodeRecord};
use crate::value::{AttrValue, Attrs};

/// A node of the external topology.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyNode {
    /// Node id, reused by every overlay.
    pub id: NodeId,
    /// Attributes.
    #[serde(default)]
    pub attrs: Attrs,
    /// Interfaces already known to the source, if any.
    #[serde(default, rename = "_interfaces", skip_serializing_if = "Option::is_none")]
    pub interfaces: Option<InterfaceTable>,
}

/// An edge of the external topology.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyEdge {
    /// Source node id.
    pub src: NodeId,
    /// Destination node id.
    pub dst: NodeId,
    /// Attributes.
    #[serde(default)]
    pub attrs: Attrs,
    /// Interface binding already known to the source, if any.
    #[serde(default, rename = "_interfaces", skip_serializing_if = "InterfaceBinding::is_empty")]
    pub interfaces: InterfaceBinding,
}

/// Graph handed to [`AbstractNetworkModel::initialise_graph`](crate::AbstractNetworkModel::initialise_graph)
/// or [`OverlayOptions::from_graph`](crate::OverlayOptions::from_graph).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyGraph {
    /// Whether edges are directed.
    #[serde(default)]
    pub directed: bool,
    /// Whether parallel edges are kept apart.
    #[serde(default)]
    pub multi_edge: bool,
    /// Graph-level attributes.
    #[serde(default)]
    pub data: Attrs,
    /// Nodes.
    #[serde(default)]
    pub nodes: Vec<TopologyNode>,
    /// Edges.
    #[serde(default)]
    pub edges: Vec<TopologyEdge>,
}

impl TopologyGraph {
    /// An empty undirected topology.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a topology from JSON.
    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Marks the topology as directed.
    #[must_use]
    pub fn directed(mut self, directed: bool) -> Self {
        self.directed = directed;
        self
    }

    /// Marks the topology as a multigraph.
    #[must_use]
    pub fn multi_edge(mut self, multi_edge: bool) -> Self {
        self.multi_edge = multi_edge;
        self
    }

    /// Sets a graph-level attribute.
    #[must_use]
    pub fn with_data(mut self, key: &str, value: impl Into<AttrValue>) -> Self {
        self.data.insert(key.to_owned(), value.into());
        self
    }

    /// Adds a node.
    #[must_use]
    pub fn node(mut self, id: impl Into<NodeId>, attrs: Attrs) -> Self {
        self.nodes.push(TopologyNode {
            id: id.into(),
            attrs,
            interfaces: None,
        });
        self
    }

    /// Adds a node with a pre-numbered interface table.
    #[must_use]
    pub fn node_with_interfaces(
        mut self,
        id: impl Into<NodeId>,
        attrs: Attrs,
        interfaces: InterfaceTable,
    ) -> Self {
        self.nodes.push(TopologyNode {
            id: id.into(),
            attrs,
            interfaces: Some(interfaces),
        });
        self
    }

    /// Adds an edge.
    #[must_use]
    pub fn edge(mut self, src: impl Into<NodeId>, dst: impl Into<NodeId>, attrs: Attrs) -> Self {
        self.edges.push(TopologyEdge {
            src: src.into(),
            dst: dst.into(),
            attrs,
            interfaces: InterfaceBinding::new(),
        });
        self
    }

    /// Adds an edge already bound to interfaces.
    #[must_use]
    pub fn edge_with_binding(
        mut self,
        src: impl Into<NodeId>,
        dst: impl Into<NodeId>,
        attrs: Attrs,
        interfaces: InterfaceBinding,
    ) -> Self {
        self.edges.push(TopologyEdge {
            src: src.into(),
            dst: dst.into(),
            attrs,
            interfaces,
        });
        self
    }

    /// Builds overlay storage from this topology.
    ///
    /// A directed topology loaded into an undirected overlay is converted.
    /// Edge endpoints missing from the node list are added without attributes.
    pub(crate) fn into_store(self, name: OverlayId, directed: bool) -> OverlayStore {
        if self.directed && !directed {
            info!(overlay = %name, "converting directed topology to undirected");
        }
        let mut store = OverlayStore::new(name, self.directed && directed, self.multi_edge);
        store.graph_data = self.data;
        for node in self.nodes {
            let interfaces = node.interfaces.filter(|t| !t.is_empty()).map(|mut table| {
                table
                    .entry(InterfaceId::LOOPBACK_ZERO)
                    .or_insert_with(InterfaceRecord::loopback_zero);
                table
            });
            let record = store.upsert_node(node.id);
            record.attrs.extend(node.attrs);
            if interfaces.is_some() {
                record.interfaces = interfaces;
            }
        }
        for edge in self.edges {
            for end in [&edge.src, &edge.dst] {
                if !store.contains_node(end) {
                    debug!(node = %end, "adding edge endpoint missing from node list");
                    store.nodes.insert(end.clone(), NodeRecord::default());
                }
            }
            store.insert_edge(
                &edge.src,
                &edge.dst,
                EdgeRecord {
                    attrs: edge.attrs,
                    interfaces: edge.interfaces,
                },
            );
        }
        store
    }
}
