// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Interface initialisation and edge-to-interface allocation.
//!
//! `phy` is the only overlay that numbers interfaces. Every other overlay
//! mirrors the `phy` id set for the nodes it shares with `phy`, so an
//! interface id means the same port in every layer.
use std::collections::BTreeMap;

use tracing::{debug, info, instrument};

use crate::graph::{EdgeKey, OverlayStore};
use crate::ident::{InterfaceId, NodeId, INPUT, PHY};
use crate::overlay::{NodeSource, OverlayGraphMut};
use crate::record::{
    default_interface_table, next_interface_id, InterfaceBinding, InterfaceRecord, InterfaceTable,
    InterfaceType,
};

/// `table` with the reserved loopback slot guaranteed present.
fn with_loopback_zero(mut table: InterfaceTable) -> InterfaceTable {
    table
        .entry(InterfaceId::LOOPBACK_ZERO)
        .or_insert_with(InterfaceRecord::loopback_zero);
    table
}

/// Copies the id set of `phy` with description and kind, keeping any local
/// attributes already recorded for the same slot.
fn mirror_table(phy: &InterfaceTable, local: Option<&InterfaceTable>) -> InterfaceTable {
    phy.iter()
        .map(|(id, source)| {
            let mut record = local
                .and_then(|table| table.get(id))
                .cloned()
                .unwrap_or_default();
            record.description.clone_from(&source.description);
            record.kind = source.kind;
            (*id, record)
        })
        .collect()
}

fn non_empty_table(store: &OverlayStore, id: &NodeId) -> Option<InterfaceTable> {
    store
        .node(id)
        .and_then(|record| record.interfaces.as_ref())
        .filter(|table| !table.is_empty())
        .cloned()
}

/// Every node has a table and every edge binds both ends to recorded slots.
fn is_fully_allocated(store: &OverlayStore) -> bool {
    let tables_ok = store.iter_nodes().all(|(_, record)| record.has_interfaces());
    tables_ok
        && store.iter_edges().all(|(key, _, record)| {
            [&key.src, &key.dst].into_iter().all(|end| {
                record.interfaces.get(end).is_some_and(|iface| {
                    store
                        .node(end)
                        .and_then(|node| node.interfaces.as_ref())
                        .is_some_and(|table| table.contains_key(iface))
                })
            })
        })
}

/// Node tables and edge bindings `input` holds for every `phy` node and edge,
/// or `None` if any of them is missing or empty, or if a binding names a slot
/// the copied table of that endpoint lacks.
fn input_allocation(
    phy: &OverlayStore,
    input: &OverlayStore,
) -> Option<(BTreeMap<NodeId, InterfaceTable>, Vec<(EdgeKey, usize, InterfaceBinding)>)> {
    if phy.node_count() == 0 || phy.edge_count() == 0 {
        return None;
    }
    let tables = phy
        .iter_nodes()
        .map(|(id, _)| non_empty_table(input, id).map(|t| (id.clone(), with_loopback_zero(t))))
        .collect::<Option<BTreeMap<_, _>>>()?;
    let bindings = phy
        .iter_edges()
        .map(|(key, index, _)| {
            input
                .edge(&key.src, &key.dst, index)
                .or_else(|| input.edge(&key.src, &key.dst, 0))
                .map(|record| record.interfaces.clone())
                .filter(|binding| !binding.is_empty())
                .map(|binding| (key.clone(), index, binding))
        })
        .collect::<Option<Vec<_>>>()?;
    let resolves = bindings.iter().all(|(key, _, binding)| {
        [&key.src, &key.dst].into_iter().all(|end| {
            binding
                .get(end)
                .is_some_and(|slot| tables.get(end).is_some_and(|t| t.contains_key(slot)))
        })
    });
    if !resolves {
        debug!("input bindings refer to unknown interfaces");
        return None;
    }
    Some((tables, bindings))
}

impl OverlayGraphMut<'_> {
    /// Initialises interface tables for freshly added nodes.
    ///
    /// In order of precedence:
    /// 1. `phy` nodes carried over from `input` reuse the `input` table.
    /// 2. Nodes known to `phy` with a table: `phy` keeps its own table, other
    ///    overlays mirror it.
    /// 3. Anything else keeps an existing table or gets the loopback default.
    pub(crate) fn init_interfaces(&mut self, sources: &[NodeSource]) {
        let is_phy = self.id.is_phy();
        let planned: Vec<(NodeId, Option<InterfaceTable>)> = {
            let anm = &*self.anm;
            let (Some(store), phy) = (anm.store(&self.id), anm.store_by_name(PHY)) else {
                return;
            };
            sources
                .iter()
                .filter(|source| store.contains_node(source.id()))
                .map(|source| {
                    let id = source.id();
                    let local = store.node(id).and_then(|r| r.interfaces.as_ref());
                    let from_input = source
                        .view()
                        .filter(|view| is_phy && view.overlay_id().as_str() == INPUT)
                        .and_then(|view| anm.store(view.overlay_id()))
                        .and_then(|input| non_empty_table(input, id));
                    let phy_table = phy.and_then(|phy| non_empty_table(phy, id));
                    let table = match (from_input, phy_table) {
                        (Some(input), _) => Some(with_loopback_zero(input)),
                        (None, Some(_)) if is_phy => None,
                        (None, Some(phy)) => Some(mirror_table(&phy, local)),
                        (None, None) if local.is_some_and(|t| !t.is_empty()) => None,
                        (None, None) => Some(default_interface_table()),
                    };
                    (id.clone(), table)
                })
                .collect()
        };
        let Some(store) = self.store_mut() else {
            return;
        };
        for (id, table) in planned {
            if let (Some(table), Some(record)) = (table, store.node_mut(&id)) {
                record.interfaces = Some(table);
            }
        }
    }

    /// Binds every edge of this overlay to interface slots.
    ///
    /// On `phy`: a complete allocation is left untouched; otherwise a complete
    /// allocation recorded on `input` is copied; otherwise ids are allocated
    /// from scratch, edges ascending by `(src, dst)`. Other overlays mirror
    /// `phy`. Running it twice changes nothing.
    #[instrument(level = "debug", skip(self), fields(overlay = %self.id))]
    pub fn allocate_interfaces(&mut self) {
        if !self.id.is_phy() {
            self.mirror_from_phy();
            return;
        }
        let Some(phy) = self.store_ref() else {
            return;
        };
        if is_fully_allocated(phy) {
            debug!("interfaces already allocated");
            return;
        }
        let copied = self
            .anm
            .store_by_name(INPUT)
            .and_then(|input| input_allocation(phy, input));
        match copied {
            Some((tables, bindings)) => self.copy_allocation(tables, bindings),
            None => {
                info!("automatically assigning interfaces");
                self.allocate_fresh();
            }
        }
    }

    fn copy_allocation(
        &mut self,
        tables: BTreeMap<NodeId, InterfaceTable>,
        bindings: Vec<(EdgeKey, usize, InterfaceBinding)>,
    ) {
        let Some(store) = self.store_mut() else {
            return;
        };
        for (id, table) in tables {
            if let Some(record) = store.node_mut(&id) {
                record.interfaces = Some(table);
            }
        }
        for (key, index, binding) in bindings {
            if let Some(record) = store.edge_mut(&key.src, &key.dst, index) {
                record.interfaces = binding;
            }
        }
        debug!("copied interface allocation from input");
    }

    fn allocate_fresh(&mut self) {
        let plan: Vec<(EdgeKey, usize, String, String)> = {
            let anm = &*self.anm;
            let Some(store) = anm.store(&self.id) else {
                return;
            };
            store
                .iter_edges()
                .map(|(key, index, _)| {
                    let src = anm.label_for_id(&key.src);
                    let dst = anm.label_for_id(&key.dst);
                    (key.clone(), index, format!("{src} to {dst}"), format!("{dst} to {src}"))
                })
                .collect()
        };
        let Some(store) = self.store_mut() else {
            return;
        };
        for record in store.nodes.values_mut() {
            record.interfaces = Some(default_interface_table());
        }
        for (key, index, src_desc, dst_desc) in plan {
            let src_if = allocate_slot(store, &key.src, src_desc);
            let dst_if = allocate_slot(store, &key.dst, dst_desc);
            if let (Some(src_if), Some(dst_if), Some(record)) =
                (src_if, dst_if, store.edge_mut(&key.src, &key.dst, index))
            {
                record.interfaces = InterfaceBinding::from([(key.src, src_if), (key.dst, dst_if)]);
            }
        }
    }

    fn mirror_from_phy(&mut self) {
        type Plan = (
            Vec<(NodeId, InterfaceTable)>,
            Vec<(EdgeKey, usize, InterfaceBinding)>,
        );
        let (tables, bindings): Plan = {
            let anm = &*self.anm;
            let Some(store) = anm.store(&self.id) else {
                return;
            };
            let phy = anm.store_by_name(PHY);
            let tables = store
                .iter_nodes()
                .filter_map(|(id, record)| {
                    let local = record.interfaces.as_ref();
                    match phy.and_then(|phy| non_empty_table(phy, id)) {
                        Some(phy_table) => Some((id.clone(), mirror_table(&phy_table, local))),
                        None if record.has_interfaces() => None,
                        None => Some((id.clone(), default_interface_table())),
                    }
                })
                .collect();
            let bindings = store
                .iter_edges()
                .filter_map(|(key, index, _)| {
                    let phy = phy?;
                    let binding = phy
                        .edge(&key.src, &key.dst, index)
                        .or_else(|| phy.edge(&key.src, &key.dst, 0))
                        .map(|record| &record.interfaces)
                        .filter(|binding| !binding.is_empty())?;
                    Some((key.clone(), index, binding.clone()))
                })
                .collect();
            (tables, bindings)
        };
        let Some(store) = self.store_mut() else {
            return;
        };
        for (id, table) in tables {
            if let Some(record) = store.node_mut(&id) {
                record.interfaces = Some(table);
            }
        }
        for (key, index, binding) in bindings {
            if let Some(record) = store.edge_mut(&key.src, &key.dst, index) {
                record.interfaces = binding;
            }
        }
    }
}

/// Takes the lowest free slot on `node` for a new physical interface.
fn allocate_slot(
    store: &mut OverlayStore,
    node: &NodeId,
    description: String,
) -> Option<InterfaceId> {
    let table = store
        .node_mut(node)?
        .interfaces
        .get_or_insert_with(default_interface_table);
    let id = next_interface_id(table);
    table.insert(id, InterfaceRecord::new(Some(description), InterfaceType::Physical));
    Some(id)
}
