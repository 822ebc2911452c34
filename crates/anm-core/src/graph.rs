// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! In-memory graph storage for a single overlay.
use std::collections::{BTreeMap, BTreeSet};

use crate::ident::{NodeId, OverlayId};
use crate::record::{EdgeRecord, NodeRecord};
use crate::value::Attrs;

/// Storage key of an edge: endpoints in the orientation they were first
/// inserted with.
///
/// Undirected overlays store each link once; lookups by either orientation
/// resolve to the stored key through [`OverlayStore::resolve_edge`].
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct EdgeKey {
    /// Source endpoint.
    pub src: NodeId,
    /// Destination endpoint.
    pub dst: NodeId,
}

impl EdgeKey {
    /// Builds a key from its endpoints.
    #[must_use]
    pub fn new(src: NodeId, dst: NodeId) -> Self {
        Self { src, dst }
    }

    /// The same link seen from the other endpoint.
    #[must_use]
    pub fn reversed(&self) -> Self {
        Self {
            src: self.dst.clone(),
            dst: self.src.clone(),
        }
    }
}

/// Graph storage for one overlay.
///
/// Determinism contract: every map is a `BTreeMap`, so node iteration is in
/// ascending `NodeId` order and edge iteration is ascending by
/// `(src, dst)` and then by parallel-edge index.
#[derive(Debug, Clone)]
pub struct OverlayStore {
    /// Registry name of this overlay.
    pub(crate) name: OverlayId,
    /// Whether `(a, b)` and `(b, a)` are distinct edges.
    pub(crate) directed: bool,
    /// Whether parallel edges between the same endpoints are kept apart.
    pub(crate) multi_edge: bool,
    /// Overlay-scoped attributes, not tied to any node.
    pub(crate) graph_data: Attrs,
    /// Node records keyed by id.
    pub(crate) nodes: BTreeMap<NodeId, NodeRecord>,
    /// Edge records keyed by stored orientation. Non-multi overlays hold at
    /// most one record per key.
    pub(crate) edges: BTreeMap<EdgeKey, Vec<EdgeRecord>>,
    /// Incident edge keys per node (both directions).
    pub(crate) incident: BTreeMap<NodeId, BTreeSet<EdgeKey>>,
}

impl OverlayStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new(name: OverlayId, directed: bool, multi_edge: bool) -> Self {
        Self {
            name,
            directed,
            multi_edge,
            graph_data: Attrs::new(),
            nodes: BTreeMap::new(),
            edges: BTreeMap::new(),
            incident: BTreeMap::new(),
        }
    }

    /// Registry name of this overlay.
    #[must_use]
    pub fn name(&self) -> &OverlayId {
        &self.name
    }

    /// Whether this overlay is directed.
    #[must_use]
    pub fn is_directed(&self) -> bool {
        self.directed
    }

    /// Whether this overlay keeps parallel edges.
    #[must_use]
    pub fn is_multi_edge(&self) -> bool {
        self.multi_edge
    }

    /// Overlay-scoped attributes.
    #[must_use]
    pub fn graph_data(&self) -> &Attrs {
        &self.graph_data
    }

    /// Number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edge records (parallel edges counted individually).
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.values().map(Vec::len).sum()
    }

    /// Returns `true` if `id` is a node of this overlay.
    #[must_use]
    pub fn contains_node(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Iterate over all nodes in ascending id order.
    pub fn iter_nodes(&self) -> impl Iterator<Item = (&NodeId, &NodeRecord)> {
        self.nodes.iter()
    }

    /// Returns a shared reference to a node when it exists.
    #[must_use]
    pub fn node(&self, id: &NodeId) -> Option<&NodeRecord> {
        self.nodes.get(id)
    }

    /// Returns a mutable reference to a node when it exists.
    pub fn node_mut(&mut self, id: &NodeId) -> Option<&mut NodeRecord> {
        self.nodes.get_mut(id)
    }

    /// Returns the node record, inserting an empty one if missing.
    pub fn upsert_node(&mut self, id: NodeId) -> &mut NodeRecord {
        self.nodes.entry(id).or_default()
    }

    /// Deletes a node and every edge touching it.
    ///
    /// Returns `true` if the node existed.
    pub fn remove_node(&mut self, id: &NodeId) -> bool {
        if self.nodes.remove(id).is_none() {
            return false;
        }
        if let Some(keys) = self.incident.remove(id) {
            for key in keys {
                self.edges.remove(&key);
                let other = if key.src == *id { &key.dst } else { &key.src };
                let bucket_is_empty = self.incident.get_mut(other).is_some_and(|set| {
                    set.remove(&key);
                    set.is_empty()
                });
                if bucket_is_empty {
                    self.incident.remove(other);
                }
            }
        }
        true
    }

    /// Resolves `(src, dst)` to the stored key.
    ///
    /// Undirected overlays also match the reverse orientation.
    #[must_use]
    pub fn resolve_edge(&self, src: &NodeId, dst: &NodeId) -> Option<EdgeKey> {
        let key = EdgeKey::new(src.clone(), dst.clone());
        if self.edges.contains_key(&key) {
            return Some(key);
        }
        if self.directed {
            return None;
        }
        let rev = key.reversed();
        self.edges.contains_key(&rev).then_some(rev)
    }

    /// Returns `true` if an edge `(src, dst)` exists.
    #[must_use]
    pub fn has_edge(&self, src: &NodeId, dst: &NodeId) -> bool {
        self.resolve_edge(src, dst).is_some()
    }

    /// Returns the `index`-th parallel record of `(src, dst)`.
    #[must_use]
    pub fn edge(&self, src: &NodeId, dst: &NodeId, index: usize) -> Option<&EdgeRecord> {
        let key = self.resolve_edge(src, dst)?;
        self.edges.get(&key).and_then(|records| records.get(index))
    }

    /// Mutable form of [`OverlayStore::edge`].
    pub fn edge_mut(&mut self, src: &NodeId, dst: &NodeId, index: usize) -> Option<&mut EdgeRecord> {
        let key = self.resolve_edge(src, dst)?;
        self.edges
            .get_mut(&key)
            .and_then(|records| records.get_mut(index))
    }

    /// Inserts an edge between two existing nodes.
    ///
    /// Returns `false` (and stores nothing) when either endpoint is missing.
    /// On a non-multi overlay an existing edge is updated in place: attributes
    /// are merged and the binding is replaced when the new one is non-empty.
    pub fn insert_edge(&mut self, src: &NodeId, dst: &NodeId, record: EdgeRecord) -> bool {
        if !self.contains_node(src) || !self.contains_node(dst) {
            return false;
        }
        let key = self
            .resolve_edge(src, dst)
            .unwrap_or_else(|| EdgeKey::new(src.clone(), dst.clone()));
        let multi = self.multi_edge;
        let records = self.edges.entry(key.clone()).or_default();
        match records.first_mut() {
            Some(existing) if !multi => {
                existing.attrs.extend(record.attrs);
                if !record.interfaces.is_empty() {
                    existing.interfaces = record.interfaces;
                }
            }
            _ => records.push(record),
        }
        self.incident
            .entry(key.src.clone())
            .or_default()
            .insert(key.clone());
        self.incident.entry(key.dst.clone()).or_default().insert(key);
        true
    }

    /// Removes every record of the edge `(src, dst)`.
    ///
    /// Returns `true` if an edge was removed.
    pub fn remove_edge(&mut self, src: &NodeId, dst: &NodeId) -> bool {
        let Some(key) = self.resolve_edge(src, dst) else {
            return false;
        };
        self.edges.remove(&key);
        for end in [&key.src, &key.dst] {
            let bucket_is_empty = self.incident.get_mut(end).is_some_and(|set| {
                set.remove(&key);
                set.is_empty()
            });
            if bucket_is_empty {
                self.incident.remove(end);
            }
        }
        true
    }

    /// Iterate over every edge record as `(key, parallel index, record)`.
    pub fn iter_edges(&self) -> impl Iterator<Item = (&EdgeKey, usize, &EdgeRecord)> {
        self.edges
            .iter()
            .flat_map(|(key, records)| records.iter().enumerate().map(move |(i, r)| (key, i, r)))
    }

    /// Edges leaving `node`, oriented `(node, other)`.
    ///
    /// Directed overlays yield out-edges only; undirected overlays yield every
    /// incident edge. Each entry is `(other, parallel index)`, ordered by the
    /// stored key.
    pub fn edges_from(&self, node: &NodeId) -> Vec<(NodeId, usize)> {
        let Some(keys) = self.incident.get(node) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for key in keys {
            let other = if key.src == *node {
                key.dst.clone()
            } else if !self.directed {
                key.src.clone()
            } else {
                continue;
            };
            let count = self.edges.get(key).map_or(0, Vec::len);
            out.extend((0..count).map(|i| (other.clone(), i)));
        }
        out
    }

    /// Number of edge ends at `node`; a self-loop counts twice.
    #[must_use]
    pub fn degree(&self, node: &NodeId) -> usize {
        self.degree_where(node, |_| true)
    }

    /// [`degree`](Self::degree) restricted to edges whose far end satisfies
    /// `keep`.
    pub fn degree_where(&self, node: &NodeId, keep: impl Fn(&NodeId) -> bool) -> usize {
        self.incident.get(node).map_or(0, |keys| {
            keys.iter()
                .filter(|key| keep(&key.src) && keep(&key.dst))
                .map(|key| {
                    let count = self.edges.get(key).map_or(0, Vec::len);
                    if key.src == key.dst {
                        2 * count
                    } else {
                        count
                    }
                })
                .sum()
        })
    }

    /// Number of parallel records stored for `(src, dst)`.
    #[must_use]
    pub fn parallel_count(&self, src: &NodeId, dst: &NodeId) -> usize {
        self.resolve_edge(src, dst)
            .and_then(|key| self.edges.get(&key))
            .map_or(0, Vec::len)
    }

    /// Neighbours reachable over an edge from `node`, ascending and distinct.
    #[must_use]
    pub fn neighbors(&self, node: &NodeId) -> Vec<NodeId> {
        let set: BTreeSet<NodeId> = self.edges_from(node).into_iter().map(|(n, _)| n).collect();
        set.into_iter().collect()
    }
}
