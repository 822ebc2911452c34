// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(dead_code, clippy::unwrap_used)]

use anm_core::{
    attrs, AbstractNetworkModel, AttrValue, InterfaceId, NodeId, NodeOptions, OverlayOptions,
    OverlayBase, PHY,
};

/// Builds a model whose `phy` overlay holds `nodes` as AS 1 routers joined by
/// `edges`, with interfaces allocated.
pub fn router_model(nodes: &[&str], edges: &[(&str, &str)]) -> AbstractNetworkModel {
    let mut anm = AbstractNetworkModel::new();
    {
        let mut phy = anm.overlay_mut(PHY).unwrap();
        let opts = NodeOptions::new().attrs(attrs([
            ("asn", AttrValue::from(1)),
            ("device_type", AttrValue::from("router")),
        ]));
        for id in nodes {
            phy.add_node_with(*id, &opts);
        }
        phy.add_edges_from(edges.iter().copied());
        phy.allocate_interfaces();
    }
    anm
}

/// The three-router line `r1 - r2 - r3`.
pub fn line3() -> AbstractNetworkModel {
    router_model(&["r1", "r2", "r3"], &[("r1", "r2"), ("r2", "r3")])
}

/// Registers overlay `name` carrying every `phy` node.
pub fn add_mirror(anm: &mut AbstractNetworkModel, name: &str) {
    let nodes = anm.phy().map(|g| g.nodes()).unwrap();
    anm.add_overlay_with(name, OverlayOptions::new().nodes(nodes).retain(["asn"]));
}

/// Interface ids recorded in `overlay`'s own table for `node`, ascending.
pub fn table_ids(anm: &AbstractNetworkModel, overlay: &str, node: &str) -> Vec<u32> {
    anm.snapshot()
        .overlays
        .get(overlay)
        .and_then(|o| o.nodes.get(&NodeId::from(node)))
        .and_then(|r| r.interfaces.as_ref())
        .map(|t| t.keys().map(|id: &InterfaceId| id.0).collect())
        .unwrap()
}

/// `(id, description)` of every interface `node` has in `overlay`.
pub fn descriptions(anm: &AbstractNetworkModel, overlay: &str, node: &str) -> Vec<(u32, String)> {
    let view = anm.overlay(overlay).unwrap().node(node).unwrap();
    view.interfaces(anm)
        .into_iter()
        .map(|iface| {
            let desc = iface.description(anm).unwrap().to_owned();
            (iface.id().0, desc)
        })
        .collect()
}
