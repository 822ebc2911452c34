// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Overlay graph views: read queries, subgraphs, and mutation.
//!
//! [`OverlayGraph`] and [`OverlaySubgraph`] share their queries through
//! [`OverlayBase`]; the only difference is which nodes are visible.
//! [`OverlayGraphMut`] owns the write path, including interface allocation
//! (see `allocate.rs`).
use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, instrument, warn};

use crate::anm::{AbstractNetworkModel, AnmError};
use crate::edge::OverlayEdge;
use crate::filter::{filter_items, AttrSource, Filter};
use crate::graph::OverlayStore;
use crate::ident::{InterfaceId, NodeId, OverlayId};
use crate::interface::OverlayInterface;
use crate::node::OverlayNode;
use crate::persist::{OverlaySnapshot, StoreError};
use crate::record::{EdgeRecord, InterfaceBinding};
use crate::value::{AttrValue, Attrs};

/// A node handed to a mutation: a bare id, or a view carrying attributes that
/// can be retained.
#[derive(Clone, Debug)]
pub enum NodeSource {
    /// Bare node id.
    Id(NodeId),
    /// View of a node in some overlay.
    Node(OverlayNode),
}

impl NodeSource {
    /// Node id.
    #[must_use]
    pub fn id(&self) -> &NodeId {
        match self {
            Self::Id(id) => id,
            Self::Node(node) => node.id(),
        }
    }

    /// Source view, when one was given.
    #[must_use]
    pub fn view(&self) -> Option<&OverlayNode> {
        match self {
            Self::Id(_) => None,
            Self::Node(node) => Some(node),
        }
    }
}

impl From<&str> for NodeSource {
    fn from(value: &str) -> Self {
        Self::Id(NodeId::from(value))
    }
}

impl From<String> for NodeSource {
    fn from(value: String) -> Self {
        Self::Id(NodeId::from(value))
    }
}

impl From<NodeId> for NodeSource {
    fn from(value: NodeId) -> Self {
        Self::Id(value)
    }
}

impl From<&NodeId> for NodeSource {
    fn from(value: &NodeId) -> Self {
        Self::Id(value.clone())
    }
}

impl From<OverlayNode> for NodeSource {
    fn from(value: OverlayNode) -> Self {
        Self::Node(value)
    }
}

impl From<&OverlayNode> for NodeSource {
    fn from(value: &OverlayNode) -> Self {
        Self::Node(value.clone())
    }
}

/// One end of an edge handed to [`OverlayGraphMut::add_edge_with`].
#[derive(Clone, Debug)]
pub enum EdgeEndpoint {
    /// A node; the edge stays unbound.
    Node(NodeSource),
    /// An interface; the edge is bound when the other end is one too.
    Interface(OverlayInterface),
}

impl EdgeEndpoint {
    /// Node id of this end.
    #[must_use]
    pub fn node_id(&self) -> &NodeId {
        match self {
            Self::Node(node) => node.id(),
            Self::Interface(iface) => iface.node_id(),
        }
    }

    fn bound(&self) -> Option<(NodeId, InterfaceId)> {
        match self {
            Self::Node(_) => None,
            Self::Interface(iface) => Some((iface.node_id().clone(), iface.id())),
        }
    }
}

impl From<&str> for EdgeEndpoint {
    fn from(value: &str) -> Self {
        Self::Node(value.into())
    }
}

impl From<String> for EdgeEndpoint {
    fn from(value: String) -> Self {
        Self::Node(value.into())
    }
}

impl From<NodeId> for EdgeEndpoint {
    fn from(value: NodeId) -> Self {
        Self::Node(value.into())
    }
}

impl From<&NodeId> for EdgeEndpoint {
    fn from(value: &NodeId) -> Self {
        Self::Node(value.into())
    }
}

impl From<OverlayNode> for EdgeEndpoint {
    fn from(value: OverlayNode) -> Self {
        Self::Node(value.into())
    }
}

impl From<&OverlayNode> for EdgeEndpoint {
    fn from(value: &OverlayNode) -> Self {
        Self::Node(value.into())
    }
}

impl From<OverlayInterface> for EdgeEndpoint {
    fn from(value: OverlayInterface) -> Self {
        Self::Interface(value)
    }
}

impl From<&OverlayInterface> for EdgeEndpoint {
    fn from(value: &OverlayInterface) -> Self {
        Self::Interface(value.clone())
    }
}

/// An edge handed to [`OverlayGraphMut::add_edges_from_with`].
#[derive(Clone, Debug)]
pub enum EdgeSource {
    /// View of an edge in some overlay; its binding is copied.
    Edge(OverlayEdge),
    /// A pair of endpoints.
    Pair(EdgeEndpoint, EdgeEndpoint),
}

impl From<OverlayEdge> for EdgeSource {
    fn from(value: OverlayEdge) -> Self {
        Self::Edge(value)
    }
}

impl From<&OverlayEdge> for EdgeSource {
    fn from(value: &OverlayEdge) -> Self {
        Self::Edge(value.clone())
    }
}

impl<A, B> From<(A, B)> for EdgeSource
where
    A: Into<EdgeEndpoint>,
    B: Into<EdgeEndpoint>,
{
    fn from((src, dst): (A, B)) -> Self {
        Self::Pair(src.into(), dst.into())
    }
}

/// Options for node insertion.
#[derive(Debug, Clone, Default)]
pub struct NodeOptions {
    retain: Vec<String>,
    update: bool,
    attrs: Attrs,
}

impl NodeOptions {
    /// No retention, no extra attributes, existing nodes skipped.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attributes copied from source views.
    #[must_use]
    pub fn retain<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.retain = keys.into_iter().map(Into::into).collect();
        self
    }

    /// Re-apply data to nodes that already exist in bulk inserts.
    #[must_use]
    pub fn update(mut self, update: bool) -> Self {
        self.update = update;
        self
    }

    /// Attributes set on every inserted node.
    #[must_use]
    pub fn attrs(mut self, attrs: Attrs) -> Self {
        self.attrs = attrs;
        self
    }
}

/// Options for edge insertion.
#[derive(Debug, Clone, Default)]
pub struct EdgeOptions {
    retain: Vec<String>,
    bidirectional: bool,
    attrs: Attrs,
}

impl EdgeOptions {
    /// No retention, one direction, no extra attributes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attributes copied from source edge views.
    #[must_use]
    pub fn retain<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.retain = keys.into_iter().map(Into::into).collect();
        self
    }

    /// Also insert `(dst, src)` for every `(src, dst)`.
    #[must_use]
    pub fn bidirectional(mut self, bidirectional: bool) -> Self {
        self.bidirectional = bidirectional;
        self
    }

    /// Attributes set on every inserted edge.
    #[must_use]
    pub fn attrs(mut self, attrs: Attrs) -> Self {
        self.attrs = attrs;
        self
    }
}

/// Read queries shared by whole overlays and subgraphs.
pub trait OverlayBase<'a> {
    /// The owning model.
    fn anm(&self) -> &'a AbstractNetworkModel;
    /// Backing storage.
    fn store(&self) -> &'a OverlayStore;
    /// Whether node `id` is visible through this view.
    fn includes(&self, id: &NodeId) -> bool;
    /// Display name of the view.
    fn name(&self) -> &str;

    /// Registry key of the backing overlay.
    fn overlay_id(&self) -> &'a OverlayId {
        self.store().name()
    }

    /// Visible node ids, ascending.
    fn node_ids(&self) -> Vec<&'a NodeId> {
        self.store()
            .iter_nodes()
            .map(|(id, _)| id)
            .filter(|id| self.includes(id))
            .collect()
    }

    /// Number of visible nodes.
    fn len(&self) -> usize {
        self.node_ids().len()
    }

    /// Returns `true` when no node is visible.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if node `id` is visible and stored.
    fn contains(&self, id: &NodeId) -> bool {
        self.includes(id) && self.store().contains_node(id)
    }

    /// Visible nodes, ascending by id.
    fn nodes(&self) -> Vec<OverlayNode> {
        let overlay = self.overlay_id();
        self.node_ids()
            .into_iter()
            .map(|id| OverlayNode::new(overlay.clone(), id.clone()))
            .collect()
    }

    /// Visible nodes matching `filter`.
    fn nodes_matching(&self, filter: &Filter) -> Vec<OverlayNode> {
        filter_items(self.anm(), self.nodes(), filter)
    }

    /// Nodes with `device_type == "router"` that also match `filter`.
    fn routers(&self, filter: &Filter) -> Vec<OverlayNode> {
        self.nodes_matching(&filter.clone().equals("device_type", "router"))
    }

    /// Looks a node up by id, then by label.
    fn node(&self, key: &str) -> Option<OverlayNode> {
        let id = NodeId::from(key);
        if self.contains(&id) {
            return Some(OverlayNode::new(self.overlay_id().clone(), id));
        }
        let anm = self.anm();
        let found = self
            .nodes()
            .into_iter()
            .find(|node| anm.node_label(node) == key);
        if found.is_none() {
            warn!(overlay = %self.overlay_id(), key, "node not found");
        }
        found
    }

    /// Unchecked view on node `id` in this overlay.
    fn device(&self, id: &str) -> OverlayNode {
        OverlayNode::new(self.overlay_id().clone(), id)
    }

    /// Edge `(src, dst)` when both ends are visible and the edge exists.
    fn edge(&self, src: &str, dst: &str) -> Option<OverlayEdge> {
        let (src, dst) = (NodeId::from(src), NodeId::from(dst));
        self.has_edge(&src, &dst)
            .then(|| OverlayEdge::new(self.overlay_id().clone(), src, dst))
    }

    /// Returns `true` if edge `(src, dst)` is visible.
    fn has_edge(&self, src: &NodeId, dst: &NodeId) -> bool {
        self.includes(src) && self.includes(dst) && self.store().has_edge(src, dst)
    }

    /// Every visible edge, ascending by stored `(src, dst)`.
    fn edges(&self) -> Vec<OverlayEdge> {
        self.edges_matching(None, None, &Filter::new())
    }

    /// Visible edges, optionally restricted by endpoint and attributes.
    ///
    /// With `src`, edges are listed per source node in the given order and
    /// oriented away from it; an undirected edge between two listed sources
    /// appears once. With `dst`, only edges ending in one of those nodes are
    /// kept.
    fn edges_matching(
        &self,
        src: Option<&[OverlayNode]>,
        dst: Option<&[OverlayNode]>,
        filter: &Filter,
    ) -> Vec<OverlayEdge> {
        let store = self.store();
        let overlay = store.name();
        let candidates: Vec<OverlayEdge> = match src {
            Some(sources) => {
                let mut seen = BTreeSet::new();
                let mut out = Vec::new();
                for node in sources.iter().filter(|n| self.contains(n.id())) {
                    for (other, index) in store.edges_from(node.id()) {
                        if !self.includes(&other) {
                            continue;
                        }
                        if !store.is_directed() {
                            if let Some(key) = store.resolve_edge(node.id(), &other) {
                                if !seen.insert((key, index)) {
                                    continue;
                                }
                            }
                        }
                        out.push(OverlayEdge::with_index(
                            overlay.clone(),
                            node.id().clone(),
                            other,
                            index,
                        ));
                    }
                }
                out
            }
            None => store
                .iter_edges()
                .filter(|(key, _, _)| self.includes(&key.src) && self.includes(&key.dst))
                .map(|(key, index, _)| {
                    OverlayEdge::with_index(overlay.clone(), key.src.clone(), key.dst.clone(), index)
                })
                .collect(),
        };
        let dst_ids: Option<BTreeSet<&NodeId>> = dst.map(|d| d.iter().map(OverlayNode::id).collect());
        let candidates = candidates
            .into_iter()
            .filter(|edge| dst_ids.as_ref().is_none_or(|ids| ids.contains(edge.dst_id())));
        filter_items(self.anm(), candidates, filter)
    }

    /// Keeps the items of `items` matching `filter`.
    fn filter<T: AttrSource>(&self, items: Vec<T>, filter: &Filter) -> Vec<T> {
        filter_items(self.anm(), items, filter)
    }

    /// Groups `nodes` (default: every visible node) by attribute `attr`.
    ///
    /// Groups are keyed by value, unset first; members of a group follow node
    /// order.
    fn groupby(
        &self,
        attr: &str,
        nodes: Option<&[OverlayNode]>,
    ) -> BTreeMap<Option<AttrValue>, Vec<OverlayNode>> {
        let anm = self.anm();
        let mut nodes = nodes.map_or_else(|| self.nodes(), <[OverlayNode]>::to_vec);
        nodes.sort_by_cached_key(|node| node.order_key(anm));
        let mut groups: BTreeMap<Option<AttrValue>, Vec<OverlayNode>> = BTreeMap::new();
        for node in nodes {
            groups.entry(node.attr(anm, attr)).or_default().push(node);
        }
        groups
    }

    /// Number of visible edge ends at `node`.
    fn degree(&self, node: &OverlayNode) -> usize {
        self.store().degree_where(node.id(), |id| self.includes(id))
    }

    /// Visible neighbours of `node`, ascending by id.
    fn neighbors(&self, node: &OverlayNode) -> Vec<OverlayNode> {
        let overlay = self.overlay_id();
        self.store()
            .neighbors(node.id())
            .into_iter()
            .filter(|id| self.includes(id))
            .map(|id| OverlayNode::new(overlay.clone(), id))
            .collect()
    }

    /// Overlay-scoped attribute `key`.
    fn data(&self, key: &str) -> Option<&'a AttrValue> {
        self.store().graph_data().get(key)
    }

    /// `iface` rebound to this overlay.
    fn interface(&self, iface: &OverlayInterface) -> OverlayInterface {
        OverlayInterface::new(self.overlay_id().clone(), iface.node_id().clone(), iface.id())
    }

    /// Label of `node`, as derived by the model.
    fn node_label(&self, node: &OverlayNode) -> String {
        self.anm().node_label(node)
    }

    /// JSON rendering of the visible nodes and edges.
    fn dump(&self) -> Result<String, AnmError> {
        let snapshot = OverlaySnapshot::capture(self.store(), |id| self.includes(id));
        serde_json::to_string_pretty(&snapshot).map_err(|err| AnmError::Store(StoreError::from(err)))
    }
}

/// Read-only view of one overlay.
#[derive(Clone, Copy, Debug)]
pub struct OverlayGraph<'a> {
    anm: &'a AbstractNetworkModel,
    store: &'a OverlayStore,
}

impl<'a> OverlayGraph<'a> {
    pub(crate) fn new(anm: &'a AbstractNetworkModel, store: &'a OverlayStore) -> Self {
        Self { anm, store }
    }

    /// Whether the overlay is directed.
    #[must_use]
    pub fn is_directed(&self) -> bool {
        self.store.is_directed()
    }

    /// Whether the overlay keeps parallel edges.
    #[must_use]
    pub fn is_multi_edge(&self) -> bool {
        self.store.is_multi_edge()
    }

    /// Another overlay of the same model.
    pub fn overlay(&self, name: &str) -> Result<Self, AnmError> {
        self.anm.overlay(name)
    }

    /// View restricted to `nodes`, sharing this overlay's storage.
    ///
    /// Nodes absent from the overlay are ignored.
    #[must_use]
    pub fn subgraph<I>(&self, nodes: I, name: Option<&str>) -> OverlaySubgraph<'a>
    where
        I: IntoIterator<Item = OverlayNode>,
    {
        let members = nodes
            .into_iter()
            .map(|node| node.id().clone())
            .filter(|id| self.store.contains_node(id))
            .collect();
        OverlaySubgraph {
            anm: self.anm,
            store: self.store,
            members,
            name: name.map(str::to_owned),
        }
    }
}

impl<'a> OverlayBase<'a> for OverlayGraph<'a> {
    fn anm(&self) -> &'a AbstractNetworkModel {
        self.anm
    }

    fn store(&self) -> &'a OverlayStore {
        self.store
    }

    fn includes(&self, _id: &NodeId) -> bool {
        true
    }

    fn name(&self) -> &str {
        self.store.name().as_str()
    }
}

/// A node subset of one overlay; edges are visible when both ends are members.
#[derive(Clone, Debug)]
pub struct OverlaySubgraph<'a> {
    anm: &'a AbstractNetworkModel,
    store: &'a OverlayStore,
    members: BTreeSet<NodeId>,
    name: Option<String>,
}

impl<'a> OverlayBase<'a> for OverlaySubgraph<'a> {
    fn anm(&self) -> &'a AbstractNetworkModel {
        self.anm
    }

    fn store(&self) -> &'a OverlayStore {
        self.store
    }

    fn includes(&self, id: &NodeId) -> bool {
        self.members.contains(id)
    }

    fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("subgraph")
    }
}

/// Write access to one overlay.
///
/// Holds the model mutably; drop it (or let it go out of scope) before
/// reading through views again.
#[derive(Debug)]
pub struct OverlayGraphMut<'a> {
    pub(crate) anm: &'a mut AbstractNetworkModel,
    pub(crate) id: OverlayId,
}

impl<'a> OverlayGraphMut<'a> {
    pub(crate) fn new(anm: &'a mut AbstractNetworkModel, id: OverlayId) -> Self {
        Self { anm, id }
    }

    /// Registry key of the overlay.
    #[must_use]
    pub fn overlay_id(&self) -> &OverlayId {
        &self.id
    }

    /// The owning model, read-only.
    #[must_use]
    pub fn anm(&self) -> &AbstractNetworkModel {
        self.anm
    }

    /// Read view of the same overlay.
    pub fn as_graph(&self) -> Result<OverlayGraph<'_>, AnmError> {
        self.anm.overlay(self.id.as_str())
    }

    /// Every node of the overlay.
    #[must_use]
    pub fn node_views(&self) -> Vec<OverlayNode> {
        self.as_graph().map(|g| g.nodes()).unwrap_or_default()
    }

    pub(crate) fn store_ref(&self) -> Option<&OverlayStore> {
        self.anm.store(&self.id)
    }

    pub(crate) fn store_mut(&mut self) -> Option<&mut OverlayStore> {
        self.anm.store_mut(&self.id)
    }

    fn retained(&self, view: Option<&OverlayNode>, retain: &[String]) -> Attrs {
        let anm: &AbstractNetworkModel = self.anm;
        let mut data = Attrs::new();
        if let Some(view) = view {
            for key in retain {
                if let Some(value) = view.attr(anm, key) {
                    data.insert(key.clone(), value);
                }
            }
        }
        data
    }

    /// Adds or merges one node and (re)initialises its interfaces.
    pub fn add_node(&mut self, node: impl Into<NodeSource>) -> OverlayNode {
        self.add_node_with(node, &NodeOptions::default())
    }

    /// [`add_node`](Self::add_node) with retention and extra attributes.
    ///
    /// Extra attributes override retained ones.
    pub fn add_node_with(&mut self, node: impl Into<NodeSource>, options: &NodeOptions) -> OverlayNode {
        let source = node.into();
        let mut data = self.retained(source.view(), &options.retain);
        data.extend(options.attrs.clone());
        let id = source.id().clone();
        if let Some(store) = self.store_mut() {
            store.upsert_node(id.clone()).attrs.extend(data);
        }
        self.init_interfaces(&[source]);
        OverlayNode::new(self.id.clone(), id)
    }

    /// Adds every node of `nodes` that is not yet present.
    pub fn add_nodes_from<I, N>(&mut self, nodes: I) -> usize
    where
        I: IntoIterator<Item = N>,
        N: Into<NodeSource>,
    {
        self.add_nodes_from_with(nodes, &NodeOptions::default())
    }

    /// Bulk insert with retention.
    ///
    /// Existing nodes are skipped unless [`NodeOptions::update`] is set.
    /// Retained attributes override the extra ones. Afterwards every node of
    /// the overlay without a `label` gets its id as label. Returns the
    /// number of nodes written.
    #[instrument(level = "debug", skip_all, fields(overlay = %self.id))]
    pub fn add_nodes_from_with<I, N>(&mut self, nodes: I, options: &NodeOptions) -> usize
    where
        I: IntoIterator<Item = N>,
        N: Into<NodeSource>,
    {
        let mut sources: Vec<NodeSource> = nodes.into_iter().map(Into::into).collect();
        if !options.update {
            if let Some(store) = self.store_ref() {
                sources.retain(|source| !store.contains_node(source.id()));
            }
        }
        let prepared: Vec<(NodeId, Attrs)> = sources
            .iter()
            .map(|source| {
                let mut data = options.attrs.clone();
                data.extend(self.retained(source.view(), &options.retain));
                (source.id().clone(), data)
            })
            .collect();
        if let Some(store) = self.store_mut() {
            for (id, data) in prepared {
                store.upsert_node(id).attrs.extend(data);
            }
            for (id, record) in &mut store.nodes {
                record
                    .attrs
                    .entry("label".to_owned())
                    .or_insert_with(|| AttrValue::from(id.as_str()));
            }
        }
        self.init_interfaces(&sources);
        debug!(count = sources.len(), "added nodes");
        sources.len()
    }

    /// Removes a node and its edges from this overlay only.
    pub fn remove_node(&mut self, node: impl Into<NodeSource>) -> bool {
        let source = node.into();
        self.store_mut()
            .is_some_and(|store| store.remove_node(source.id()))
    }

    /// Adds `(src, dst)` when both nodes exist.
    pub fn add_edge(
        &mut self,
        src: impl Into<EdgeEndpoint>,
        dst: impl Into<EdgeEndpoint>,
    ) -> Option<OverlayEdge> {
        self.add_edge_with(src, dst, &EdgeOptions::default())
    }

    /// [`add_edge`](Self::add_edge) with extra attributes.
    pub fn add_edge_with(
        &mut self,
        src: impl Into<EdgeEndpoint>,
        dst: impl Into<EdgeEndpoint>,
        options: &EdgeOptions,
    ) -> Option<OverlayEdge> {
        let (src, dst, record) = self.prepare_edge(EdgeSource::Pair(src.into(), dst.into()), options);
        self.insert_prepared(src, dst, record, options.bidirectional)
    }

    /// Adds every edge of `edges` whose endpoints both exist.
    pub fn add_edges_from<I, E>(&mut self, edges: I) -> usize
    where
        I: IntoIterator<Item = E>,
        E: Into<EdgeSource>,
    {
        self.add_edges_from_with(edges, &EdgeOptions::default())
    }

    /// Bulk edge insert.
    ///
    /// Edge views copy their retained attributes and their binding. A pair of
    /// interface endpoints binds both ends; a pair with only one interface
    /// stays unbound. Edges with a missing endpoint are dropped.
    /// Returns the number of edges inserted.
    #[instrument(level = "debug", skip_all, fields(overlay = %self.id))]
    pub fn add_edges_from_with<I, E>(&mut self, edges: I, options: &EdgeOptions) -> usize
    where
        I: IntoIterator<Item = E>,
        E: Into<EdgeSource>,
    {
        let prepared: Vec<_> = edges
            .into_iter()
            .map(|edge| self.prepare_edge(edge.into(), options))
            .collect();
        let total = prepared.len();
        let inserted = prepared
            .into_iter()
            .filter_map(|(src, dst, record)| self.insert_prepared(src, dst, record, options.bidirectional))
            .count();
        if inserted < total {
            debug!(dropped = total - inserted, "skipped edges with missing endpoints");
        }
        inserted
    }

    fn prepare_edge(&self, source: EdgeSource, options: &EdgeOptions) -> (NodeId, NodeId, EdgeRecord) {
        let anm: &AbstractNetworkModel = self.anm;
        let mut record = EdgeRecord {
            attrs: options.attrs.clone(),
            interfaces: InterfaceBinding::new(),
        };
        match source {
            EdgeSource::Edge(edge) => {
                for key in &options.retain {
                    if let Some(value) = edge.attr(anm, key) {
                        record.attrs.insert(key.clone(), value);
                    }
                }
                if let Some(binding) = edge.binding(anm) {
                    record.interfaces.clone_from(binding);
                }
                (edge.src_id().clone(), edge.dst_id().clone(), record)
            }
            EdgeSource::Pair(src, dst) => {
                if let (Some(src_if), Some(dst_if)) = (src.bound(), dst.bound()) {
                    record.interfaces.extend([src_if, dst_if]);
                }
                (src.node_id().clone(), dst.node_id().clone(), record)
            }
        }
    }

    fn insert_prepared(
        &mut self,
        src: NodeId,
        dst: NodeId,
        record: EdgeRecord,
        bidirectional: bool,
    ) -> Option<OverlayEdge> {
        let overlay = self.id.clone();
        let store = self.store_mut()?;
        let reverse = bidirectional.then(|| record.clone());
        if !store.insert_edge(&src, &dst, record) {
            return None;
        }
        let index = if store.is_multi_edge() {
            store.parallel_count(&src, &dst).saturating_sub(1)
        } else {
            0
        };
        if let Some(reverse) = reverse {
            store.insert_edge(&dst, &src, reverse);
        }
        Some(OverlayEdge::with_index(overlay, src, dst, index))
    }

    /// Removes edge `(src, dst)` (every parallel record).
    pub fn remove_edge(&mut self, src: &NodeId, dst: &NodeId) -> bool {
        self.store_mut()
            .is_some_and(|store| store.remove_edge(src, dst))
    }

    /// Removes every edge in `edges`; returns how many existed.
    pub fn remove_edges_from<I>(&mut self, edges: I) -> usize
    where
        I: IntoIterator<Item = OverlayEdge>,
    {
        edges
            .into_iter()
            .filter(|edge| self.remove_edge(edge.src_id(), edge.dst_id()))
            .count()
    }

    /// Sets `attrs` on every existing node of `nodes`.
    pub fn update<I, N>(&mut self, nodes: I, attrs: &Attrs)
    where
        I: IntoIterator<Item = N>,
        N: Into<NodeSource>,
    {
        let Some(store) = self.store_mut() else {
            return;
        };
        for node in nodes {
            let source = node.into();
            match store.node_mut(source.id()) {
                Some(record) => record.attrs.extend(attrs.clone()),
                None => debug!(node = %source.id(), "update skipped missing node"),
            }
        }
    }

    /// Sets `attrs` on every existing edge of `edges`.
    pub fn update_edges<I>(&mut self, edges: I, attrs: &Attrs)
    where
        I: IntoIterator<Item = OverlayEdge>,
    {
        let Some(store) = self.store_mut() else {
            return;
        };
        for edge in edges {
            if let Some(record) = store.edge_mut(edge.src_id(), edge.dst_id(), edge.index()) {
                record.attrs.extend(attrs.clone());
            }
        }
    }

    /// Sets overlay-scoped attribute `key`.
    pub fn set_data(&mut self, key: &str, value: impl Into<AttrValue>) {
        if let Some(store) = self.store_mut() {
            store.graph_data.insert(key.to_owned(), value.into());
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::ident::PHY;
    use crate::value::attrs;

    fn model() -> AbstractNetworkModel {
        let mut anm = AbstractNetworkModel::new();
        {
            let mut phy = anm.overlay_mut(PHY).unwrap();
            for (id, asn, kind) in [
                ("r1", 1, "router"),
                ("r2", 1, "router"),
                ("r11", 1, "router"),
                ("sw1", 1, "switch"),
                ("r3", 2, "router"),
            ] {
                phy.add_node_with(
                    id,
                    &NodeOptions::new().attrs(attrs([
                        ("asn", AttrValue::from(asn)),
                        ("device_type", AttrValue::from(kind)),
                    ])),
                );
            }
            phy.add_edges_from([("r1", "r2"), ("r2", "r11"), ("r11", "r3"), ("r1", "sw1")]);
            phy.allocate_interfaces();
        }
        anm
    }

    #[test]
    fn node_lookup_by_id_then_label() {
        let mut anm = model();
        {
            let mut phy = anm.overlay_mut(PHY).unwrap();
            phy.update(["r3"], &attrs([("label", "edge-3")]));
        }
        let phy = anm.phy().unwrap();
        assert_eq!(phy.node("r1").map(|n| n.id().clone()), Some(NodeId::from("r1")));
        assert_eq!(phy.node("edge-3").map(|n| n.id().clone()), Some(NodeId::from("r3")));
        assert!(phy.node("nowhere").is_none());
    }

    #[test]
    fn groupby_orders_keys_and_members() {
        let anm = model();
        let phy = anm.phy().unwrap();
        let groups = phy.groupby("asn", None);
        let keys: Vec<Option<AttrValue>> = groups.keys().cloned().collect();
        assert_eq!(keys, vec![Some(AttrValue::from(1)), Some(AttrValue::from(2))]);
        let as1: Vec<&str> = groups[&Some(AttrValue::from(1))]
            .iter()
            .map(|n| n.id().as_str())
            .collect();
        assert_eq!(as1, vec!["r1", "r2", "r11", "sw1"]);
    }

    #[test]
    fn routers_and_filters() {
        let anm = model();
        let phy = anm.phy().unwrap();
        assert_eq!(phy.routers(&Filter::new()).len(), 4);
        let as2 = phy.routers(&Filter::new().equals("asn", 2));
        assert_eq!(as2, vec![OverlayNode::new(PHY, "r3")]);
        assert_eq!(anm.devices(&Filter::new().equals("device_type", "switch")).len(), 1);
    }

    #[test]
    fn edges_from_sources_are_oriented_and_deduplicated() {
        let anm = model();
        let phy = anm.phy().unwrap();
        let r1 = OverlayNode::new(PHY, "r1");
        let r2 = OverlayNode::new(PHY, "r2");
        let from_r2 = phy.edges_matching(Some(&[r2.clone()]), None, &Filter::new());
        assert!(from_r2.iter().all(|e| e.src_id().as_str() == "r2"));
        assert_eq!(from_r2.len(), 2);

        // r1-r2 is listed once, from r1
        let both = phy.edges_matching(Some(&[r1.clone(), r2]), None, &Filter::new());
        assert_eq!(both.len(), 3);

        let to_r1 = phy.edges_matching(None, Some(&[r1]), &Filter::new());
        assert!(to_r1.is_empty(), "stored orientation never ends in r1");
    }

    #[test]
    fn subgraph_hides_outside_nodes_and_edges() {
        let anm = model();
        let phy = anm.phy().unwrap();
        let members = phy.nodes_matching(&Filter::new().equals("asn", 1));
        let sub = phy.subgraph(members, Some("as1"));
        assert_eq!(sub.name(), "as1");
        assert_eq!(sub.len(), 4);
        assert!(!sub.contains(&NodeId::from("r3")));
        assert_eq!(sub.edges().len(), 3);
        let r11 = OverlayNode::new(PHY, "r11");
        assert_eq!(sub.degree(&r11), 1);
        assert_eq!(phy.degree(&r11), 2);
        assert_eq!(phy.subgraph(Vec::new(), None).name(), "subgraph");
    }

    #[test]
    fn edges_need_both_endpoints() {
        let mut anm = AbstractNetworkModel::new();
        let mut phy = anm.overlay_mut(PHY).unwrap();
        phy.add_nodes_from(["a", "b"]);
        let added = phy.add_edges_from([("a", "b"), ("a", "ghost")]);
        assert_eq!(added, 1);
        assert!(phy.add_edge("ghost", "b").is_none());
        let graph = phy.as_graph().unwrap();
        assert!(graph.has_edge(&NodeId::from("b"), &NodeId::from("a")));
    }

    fn pair() -> AbstractNetworkModel {
        let mut anm = AbstractNetworkModel::new();
        {
            let mut phy = anm.overlay_mut(PHY).unwrap();
            phy.add_nodes_from(["a", "b"]);
            phy.add_edge("a", "b");
            phy.allocate_interfaces();
        }
        let nodes = anm.phy().unwrap().nodes();
        anm.add_overlay_with("ospf", crate::anm::OverlayOptions::new().nodes(nodes));
        anm
    }

    #[test]
    fn interface_endpoints_bind_the_edge() {
        let mut anm = pair();
        let mut ospf = anm.overlay_mut("ospf").unwrap();
        let a1 = OverlayInterface::new("ospf", "a", InterfaceId(1));
        let b1 = OverlayInterface::new("ospf", "b", InterfaceId(1));
        let edge = ospf.add_edge(&a1, b1).unwrap();
        let expected = InterfaceBinding::from([
            (NodeId::from("a"), InterfaceId(1)),
            (NodeId::from("b"), InterfaceId(1)),
        ]);
        assert_eq!(edge.binding(ospf.anm()), Some(&expected));
        assert_eq!(edge.src_int(ospf.anm()).map(|i| i.id()), Some(InterfaceId(1)));
    }

    #[test]
    fn one_interface_endpoint_leaves_the_edge_unbound() {
        let mut anm = pair();
        let mut ospf = anm.overlay_mut("ospf").unwrap();
        let a1 = OverlayInterface::new("ospf", "a", InterfaceId(1));
        let edge = ospf.add_edge(a1, "b").unwrap();
        assert!(edge.binding(ospf.anm()).is_none_or(InterfaceBinding::is_empty));
        assert!(edge.src_int(ospf.anm()).is_none());
    }

    #[test]
    fn remove_node_touches_one_overlay() {
        let mut anm = pair();
        {
            let mut ospf = anm.overlay_mut("ospf").unwrap();
            ospf.add_edge("a", "b");
            assert!(ospf.remove_node("a"));
            assert!(!ospf.remove_node("a"));
        }
        let ospf = anm.overlay("ospf").unwrap();
        assert!(!ospf.contains(&NodeId::from("a")));
        assert!(ospf.edges().is_empty());
        let phy = anm.phy().unwrap();
        assert!(phy.contains(&NodeId::from("a")));
        assert!(phy.edge("a", "b").is_some());
    }

    #[test]
    fn bulk_add_skips_existing_nodes_unless_updating() {
        let mut anm = AbstractNetworkModel::new();
        let mut phy = anm.overlay_mut(PHY).unwrap();
        phy.add_nodes_from(["a"]);
        let opts = NodeOptions::new().attrs(attrs([("role", "core")]));
        assert_eq!(phy.add_nodes_from_with(["a", "b"], &opts), 1);
        assert_eq!(phy.add_nodes_from_with(["a"], &opts.clone().update(true)), 1);
        let anm = phy.anm();
        let a = OverlayNode::new(PHY, "a");
        assert_eq!(a.get(anm, "role"), Some(&AttrValue::from("core")));
        assert_eq!(a.get(anm, "label"), Some(&AttrValue::from("a")));
    }

    #[test]
    fn directed_copy_with_bidirectional_edges() {
        let mut anm = model();
        let nodes = anm.phy().map(|g| g.nodes()).unwrap();
        let edges = anm.phy().map(|g| g.edges()).unwrap();
        let mut bgp = anm.add_overlay_with(
            "bgp",
            crate::anm::OverlayOptions::new().directed(true).nodes(nodes).retain(["asn"]),
        );
        let added = bgp.add_edges_from_with(edges, &EdgeOptions::new().bidirectional(true));
        assert_eq!(added, 4);
        let graph = bgp.as_graph().unwrap();
        assert!(graph.is_directed());
        assert!(graph.has_edge(&NodeId::from("r2"), &NodeId::from("r1")));
        assert!(graph.has_edge(&NodeId::from("r1"), &NodeId::from("r2")));
        assert_eq!(graph.edges().len(), 8);
    }

    #[test]
    fn graph_data_round_trips() {
        let mut anm = model();
        {
            let mut phy = anm.overlay_mut(PHY).unwrap();
            phy.set_data("infrastructure", "10.0.0.0/8");
        }
        let data = anm.phy().unwrap().data("infrastructure").cloned();
        assert_eq!(data, Some(AttrValue::from("10.0.0.0/8")));
    }
}
