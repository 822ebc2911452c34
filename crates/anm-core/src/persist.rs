// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Snapshots and the storage port for whole models.
//!
//! A snapshot holds every overlay's nodes, edges, attributes, interface tables
//! and bindings, stamped with [`SNAPSHOT_FORMAT`]. Encoding is JSON; where the
//! bytes live is the business of a [`ModelStore`] implementation, addressed
//! through [`StoreKey`].

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::anm::{AbstractNetworkModel, AnmError};
use crate::config::AnmConfig;
use crate::graph::OverlayStore;
use crate::ident::{NodeId, OverlayId};
use crate::record::{EdgeRecord, InterfaceBinding, NodeRecord};
use crate::value::Attrs;

/// Layout version written into every [`AnmSnapshot`].
pub const SNAPSHOT_FORMAT: u32 = 1;

/// Storage port for raw snapshot blobs (keyed by [`StoreKey::path`]).
pub trait ModelStore {
    /// Load a raw blob. Returns `NotFound` when missing.
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, StoreError>;
    /// Persist a raw blob.
    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), StoreError>;
}

/// Logical name of a stored blob.
///
/// Models and settings live in separate namespaces, so a model and a settings
/// blob may share a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StoreKey<'a> {
    /// A full model snapshot.
    Model(&'a str),
    /// Model settings.
    Config(&'a str),
}

impl StoreKey<'_> {
    /// Raw key handed to the [`ModelStore`]: `models/<name>` or `config/<name>`.
    pub fn path(&self) -> String {
        match self {
            Self::Model(name) => format!("models/{name}"),
            Self::Config(name) => format!("config/{name}"),
        }
    }
}

impl fmt::Display for StoreKey<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Error type for snapshot and storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Key not present in store.
    #[error("not found")]
    NotFound,
    /// I/O error while reading/writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Serialization/deserialization failure.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
    /// Snapshot written with a layout this build does not read.
    #[error("unsupported snapshot format {found} (expected {expected})")]
    UnsupportedFormat {
        /// Format stamped in the snapshot (0 when absent).
        found: u32,
        /// Format this build reads and writes.
        expected: u32,
    },
    /// Catch-all error variant.
    #[error("other: {0}")]
    Other(String),
}

/// One stored edge record with its endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeSnapshot {
    /// Source endpoint, as stored.
    pub src: NodeId,
    /// Destination endpoint, as stored.
    pub dst: NodeId,
    /// Attributes.
    #[serde(default)]
    pub attrs: Attrs,
    /// Interface binding.
    #[serde(default, rename = "_interfaces")]
    pub interfaces: InterfaceBinding,
}

/// Full state of one overlay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlaySnapshot {
    /// Whether edges are directed.
    #[serde(default)]
    pub directed: bool,
    /// Whether parallel edges are kept apart.
    #[serde(default)]
    pub multi_edge: bool,
    /// Overlay-scoped attributes.
    #[serde(default)]
    pub graph_data: Attrs,
    /// Node records keyed by id.
    #[serde(default)]
    pub nodes: BTreeMap<NodeId, NodeRecord>,
    /// Edge records in storage order (parallel edges in index order).
    #[serde(default)]
    pub edges: Vec<EdgeSnapshot>,
}

impl OverlaySnapshot {
    /// Captures the nodes accepted by `keep` and the edges between them.
    pub(crate) fn capture(store: &OverlayStore, keep: impl Fn(&NodeId) -> bool) -> Self {
        let nodes = store
            .iter_nodes()
            .filter(|(id, _)| keep(id))
            .map(|(id, record)| (id.clone(), record.clone()))
            .collect();
        let edges = store
            .iter_edges()
            .filter(|(key, _, _)| keep(&key.src) && keep(&key.dst))
            .map(|(key, _, record)| EdgeSnapshot {
                src: key.src.clone(),
                dst: key.dst.clone(),
                attrs: record.attrs.clone(),
                interfaces: record.interfaces.clone(),
            })
            .collect();
        Self {
            directed: store.is_directed(),
            multi_edge: store.is_multi_edge(),
            graph_data: store.graph_data().clone(),
            nodes,
            edges,
        }
    }

    fn into_store(self, name: OverlayId) -> OverlayStore {
        let mut store = OverlayStore::new(name, self.directed, self.multi_edge);
        store.graph_data = self.graph_data;
        store.nodes = self.nodes;
        for edge in self.edges {
            for (node, slot) in &edge.interfaces {
                let endpoint = *node == edge.src || *node == edge.dst;
                let known = store
                    .node(node)
                    .and_then(|r| r.interfaces.as_ref())
                    .is_some_and(|t| t.contains_key(slot));
                if !endpoint || !known {
                    warn!(
                        overlay = %store.name(),
                        src = %edge.src,
                        dst = %edge.dst,
                        node = %node,
                        interface = %slot,
                        "edge binding refers to an unknown interface"
                    );
                }
            }
            let (src, dst) = (edge.src, edge.dst);
            let record = EdgeRecord {
                attrs: edge.attrs,
                interfaces: edge.interfaces,
            };
            if !store.insert_edge(&src, &dst, record) {
                warn!(overlay = %store.name(), %src, %dst, "dropping edge with missing endpoint");
            }
        }
        store
    }
}

/// Full state of a model: settings plus every overlay keyed by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnmSnapshot {
    /// Layout version; see [`SNAPSHOT_FORMAT`].
    #[serde(default)]
    pub format: u32,
    /// Model settings.
    #[serde(default)]
    pub config: AnmConfig,
    /// Overlays keyed by name.
    #[serde(default)]
    pub overlays: BTreeMap<OverlayId, OverlaySnapshot>,
}

impl Default for AnmSnapshot {
    fn default() -> Self {
        Self {
            format: SNAPSHOT_FORMAT,
            config: AnmConfig::default(),
            overlays: BTreeMap::new(),
        }
    }
}

impl AbstractNetworkModel {
    /// Captures every overlay.
    #[must_use]
    pub fn snapshot(&self) -> AnmSnapshot {
        AnmSnapshot {
            format: SNAPSHOT_FORMAT,
            config: self.config.clone(),
            overlays: self
                .overlays
                .iter()
                .map(|(id, store)| (id.clone(), OverlaySnapshot::capture(store, |_| true)))
                .collect(),
        }
    }

    /// Rebuilds a model from a snapshot.
    ///
    /// Fails with [`StoreError::UnsupportedFormat`] unless the snapshot carries
    /// [`SNAPSHOT_FORMAT`]. Only the overlays in the snapshot are registered.
    /// Edge bindings that do not match a slot in the endpoint's table are
    /// logged and kept.
    pub fn restore(snapshot: AnmSnapshot) -> Result<Self, StoreError> {
        if snapshot.format != SNAPSHOT_FORMAT {
            return Err(StoreError::UnsupportedFormat {
                found: snapshot.format,
                expected: SNAPSHOT_FORMAT,
            });
        }
        let overlays = snapshot
            .overlays
            .into_iter()
            .map(|(id, overlay)| {
                let store = overlay.into_store(id.clone());
                (id, store)
            })
            .collect();
        Ok(Self {
            overlays,
            config: snapshot.config,
        })
    }

    /// Pretty JSON rendering of every overlay.
    pub fn dump(&self) -> Result<String, AnmError> {
        serde_json::to_string_pretty(&self.snapshot()).map_err(|err| AnmError::Store(err.into()))
    }
}

/// Thin service that encodes models and settings and delegates storage to a
/// [`ModelStore`].
pub struct ModelService<S> {
    store: S,
}

impl<S> ModelService<S> {
    /// Create a new service using the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Consume the service and return the inner store.
    pub fn into_inner(self) -> S {
        self.store
    }
}

impl<S> ModelService<S>
where
    S: ModelStore,
{
    fn fetch(&self, key: StoreKey<'_>) -> Result<Option<Vec<u8>>, StoreError> {
        match self.store.load_raw(&key.path()) {
            Ok(bytes) if bytes.is_empty() => Ok(None),
            Ok(bytes) => Ok(Some(bytes)),
            Err(StoreError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Persist the full state of `anm` as model `name`.
    pub fn save_model(&self, name: &str, anm: &AbstractNetworkModel) -> Result<(), StoreError> {
        let key = StoreKey::Model(name);
        let data = serde_json::to_vec_pretty(&anm.snapshot())?;
        self.store.save_raw(&key.path(), &data)?;
        debug!(%key, len = data.len(), "model saved");
        Ok(())
    }

    /// Load model `name`. Returns `Ok(None)` if missing.
    pub fn load_model(&self, name: &str) -> Result<Option<AbstractNetworkModel>, StoreError> {
        let Some(bytes) = self.fetch(StoreKey::Model(name))? else {
            return Ok(None);
        };
        let snapshot: AnmSnapshot = serde_json::from_slice(&bytes)?;
        AbstractNetworkModel::restore(snapshot).map(Some)
    }

    /// Persist model settings as `name`.
    pub fn save_config(&self, name: &str, config: &AnmConfig) -> Result<(), StoreError> {
        let data = serde_json::to_vec_pretty(config)?;
        self.store.save_raw(&StoreKey::Config(name).path(), &data)
    }

    /// Load model settings `name`. Returns `Ok(None)` if missing.
    pub fn load_config(&self, name: &str) -> Result<Option<AnmConfig>, StoreError> {
        self.fetch(StoreKey::Config(name))?
            .map(|bytes| serde_json::from_slice(&bytes).map_err(StoreError::from))
            .transpose()
    }
}
