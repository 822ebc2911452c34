// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! anm-core: the Abstract Network Model.
//!
//! One network, many named overlays (`input`, `phy`, `graphics`, and whatever
//! protocol layers a compiler adds). Every overlay shares node identity with
//! the others, so attributes can fall back to the physical layer and interface
//! numbering stays aligned across layers. Interface allocation on `phy` is
//! deterministic: the same topology always yields the same numbering.
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
#![allow(
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::missing_const_for_fn,
    clippy::redundant_pub_crate,
    clippy::module_name_repetitions,
    clippy::use_self
)]

mod allocate;
mod anm;
mod config;
mod edge;
mod filter;
mod graph;
mod ident;
mod interface;
mod natural;
mod node;
mod overlay;
mod persist;
mod record;
mod topology;
mod value;

/// Model registry, overlay registration options, and its error type.
pub use anm::{AbstractNetworkModel, AnmError, OverlayOptions};
/// Model-wide settings.
pub use config::AnmConfig;
/// Edge views.
pub use edge::{EdgeDump, OverlayEdge};
/// Attribute filters shared by node, edge and interface queries.
pub use filter::{filter_items, AttrSource, Filter};
/// Per-overlay storage.
pub use graph::{EdgeKey, OverlayStore};
/// Identifiers and the well-known overlay names.
pub use ident::{InterfaceId, NodeId, OverlayId, GRAPHICS, INPUT, PHY};
/// Interface views and the overlay-agnostic identity used for equality.
pub use interface::{interface_identity, InterfaceDump, OverlayInterface};
/// Natural ("human") ordering of identifiers.
pub use natural::{natural_key, NaturalKey};
/// Node views.
pub use node::{NodeDump, NodeOrderKey, OverlayNode};
/// Graph views and mutation.
pub use overlay::{
    EdgeEndpoint, EdgeOptions, EdgeSource, NodeOptions, NodeSource, OverlayBase, OverlayGraph,
    OverlayGraphMut, OverlaySubgraph,
};
/// Snapshots and the storage port.
pub use persist::{
    AnmSnapshot, EdgeSnapshot, ModelService, ModelStore, OverlaySnapshot, StoreError, StoreKey,
    SNAPSHOT_FORMAT,
};
/// Stored records.
pub use record::{
    default_interface_table, next_interface_id, EdgeRecord, InterfaceBinding, InterfaceRecord,
    InterfaceTable, InterfaceType, NodeRecord,
};
/// External topology input.
pub use topology::{TopologyEdge, TopologyGraph, TopologyNode};
/// Attribute values.
pub use value::{attrs, AttrValue, Attrs};
