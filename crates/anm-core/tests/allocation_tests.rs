// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Interface allocation on `phy` and mirroring into other overlays.

mod common;

use anm_core::{
    attrs, default_interface_table, AbstractNetworkModel, Attrs, InterfaceBinding, InterfaceId,
    InterfaceRecord, InterfaceType, NodeId, OverlayBase, TopologyGraph, INPUT, PHY,
};
use common::{add_mirror, descriptions, line3, router_model, table_ids};

#[test]
fn line_of_three_routers_numbers_ports_from_one() {
    let anm = line3();
    assert_eq!(
        descriptions(&anm, PHY, "r2"),
        vec![
            (0, "loopback".to_owned()),
            (1, "r2 to r1".to_owned()),
            (2, "r2 to r3".to_owned()),
        ]
    );
    assert_eq!(
        descriptions(&anm, PHY, "r1"),
        vec![(0, "loopback".to_owned()), (1, "r1 to r2".to_owned())]
    );
    assert_eq!(
        descriptions(&anm, PHY, "r3"),
        vec![(0, "loopback".to_owned()), (1, "r3 to r2".to_owned())]
    );
}

#[test]
fn edges_are_bound_to_the_ports_they_created() {
    let anm = line3();
    let phy = anm.phy().unwrap();
    let edge = phy.edge("r2", "r3").expect("edge r2-r3");
    let ends: Vec<(String, u32)> = edge
        .interfaces(&anm)
        .into_iter()
        .map(|i| (i.node_id().to_string(), i.id().0))
        .collect();
    assert_eq!(ends, vec![("r2".to_owned(), 2), ("r3".to_owned(), 1)]);
}

#[test]
fn allocating_twice_changes_nothing() {
    let mut anm = line3();
    let before = anm.dump().unwrap();
    anm.overlay_mut(PHY).unwrap().allocate_interfaces();
    assert_eq!(anm.dump().unwrap(), before);
}

#[test]
fn every_node_keeps_its_loopback() {
    let mut anm = router_model(&["a", "b", "c", "d"], &[("a", "b"), ("b", "c"), ("c", "a")]);
    add_mirror(&mut anm, "ospf");
    {
        let mut ospf = anm.overlay_mut("ospf").unwrap();
        ospf.add_node("lonely");
    }
    for overlay in [PHY, "ospf"] {
        let g = anm.overlay(overlay).unwrap();
        for node in g.nodes() {
            assert!(
                node.interface_ids(&anm).contains(&InterfaceId(0)),
                "{node} lacks a loopback"
            );
        }
    }
    assert_eq!(table_ids(&anm, "ospf", "lonely"), vec![0]);
}

#[test]
fn overlays_mirror_phy_interface_ids() {
    let mut anm = router_model(&["r1", "r2", "r3", "r4"], &[("r1", "r2"), ("r1", "r3"), ("r1", "r4")]);
    add_mirror(&mut anm, "ospf");
    for id in ["r1", "r2", "r3", "r4"] {
        assert_eq!(table_ids(&anm, "ospf", id), table_ids(&anm, PHY, id), "node {id}");
    }
    assert_eq!(table_ids(&anm, "ospf", "r1"), vec![0, 1, 2, 3]);
}

#[test]
fn mirrored_edges_reuse_phy_bindings() {
    let mut anm = line3();
    add_mirror(&mut anm, "ibgp");
    {
        let mut ibgp = anm.overlay_mut("ibgp").unwrap();
        ibgp.add_edges_from([("r1", "r2")]);
        ibgp.allocate_interfaces();
    }
    let ibgp = anm.overlay("ibgp").unwrap();
    let edge = ibgp.edge("r1", "r2").unwrap();
    assert_eq!(edge.src_int(&anm).map(|i| i.id()), Some(InterfaceId(1)));
    assert_eq!(
        edge.src_int(&anm).and_then(|i| i.description(&anm).map(str::to_owned)),
        Some("r1 to r2".to_owned())
    );
}

#[test]
fn phy_copies_a_complete_input_allocation() {
    let mut r1 = default_interface_table();
    r1.insert(
        InterfaceId(7),
        InterfaceRecord::new(Some("ge-0/0/7".into()), InterfaceType::Physical),
    );
    let mut r2 = default_interface_table();
    r2.insert(
        InterfaceId(3),
        InterfaceRecord::new(Some("ge-0/0/3".into()), InterfaceType::Physical),
    );
    let binding: InterfaceBinding = [
        (NodeId::from("r1"), InterfaceId(7)),
        (NodeId::from("r2"), InterfaceId(3)),
    ]
    .into_iter()
    .collect();
    let topology = TopologyGraph::new()
        .node_with_interfaces("r1", attrs([("device_type", "router")]), r1)
        .node_with_interfaces("r2", attrs([("device_type", "router")]), r2)
        .edge_with_binding("r1", "r2", Attrs::new(), binding);

    let mut anm = AbstractNetworkModel::new();
    anm.initialise_graph(topology);
    let input_nodes = anm.overlay(INPUT).unwrap().nodes();
    let input_edges = anm.overlay(INPUT).unwrap().edges();
    {
        let mut phy = anm.overlay_mut(PHY).unwrap();
        phy.add_nodes_from(input_nodes);
        phy.add_edges_from(input_edges);
        phy.allocate_interfaces();
    }
    assert_eq!(table_ids(&anm, PHY, "r1"), vec![0, 7]);
    assert_eq!(table_ids(&anm, PHY, "r2"), vec![0, 3]);
    let edge = anm.phy().unwrap().edge("r1", "r2").unwrap();
    assert_eq!(edge.dst_int(&anm).map(|i| i.id()), Some(InterfaceId(3)));
}

fn copy_input_into_phy(topology: TopologyGraph) -> AbstractNetworkModel {
    let mut anm = AbstractNetworkModel::new();
    anm.initialise_graph(topology);
    let input_nodes = anm.overlay(INPUT).unwrap().nodes();
    let input_edges = anm.overlay(INPUT).unwrap().edges();
    {
        let mut phy = anm.overlay_mut(PHY).unwrap();
        phy.add_nodes_from(input_nodes);
        phy.add_edges_from(input_edges);
        phy.allocate_interfaces();
    }
    anm
}

#[test]
fn input_bindings_without_tables_are_reallocated() {
    let binding: InterfaceBinding = [
        (NodeId::from("r1"), InterfaceId(7)),
        (NodeId::from("r2"), InterfaceId(3)),
    ]
    .into_iter()
    .collect();
    let topology = TopologyGraph::new()
        .node("r1", attrs([("device_type", "router")]))
        .node("r2", attrs([("device_type", "router")]))
        .edge_with_binding("r1", "r2", Attrs::new(), binding);
    let anm = copy_input_into_phy(topology);

    assert_eq!(table_ids(&anm, PHY, "r1"), vec![0, 1]);
    assert_eq!(table_ids(&anm, PHY, "r2"), vec![0, 1]);
    assert_eq!(
        descriptions(&anm, PHY, "r1"),
        vec![(0, "loopback".to_owned()), (1, "r1 to r2".to_owned())]
    );
    let edge = anm.phy().unwrap().edge("r1", "r2").unwrap();
    assert_eq!(edge.src_int(&anm).map(|i| i.id()), Some(InterfaceId(1)));
    assert_eq!(edge.dst_int(&anm).map(|i| i.id()), Some(InterfaceId(1)));
    for node in anm.phy().unwrap().nodes() {
        assert_eq!(node.interface_ids(&anm).len(), node.degree(&anm) + 1, "{node}");
    }
}

#[test]
fn input_binding_to_a_missing_slot_is_reallocated() {
    let mut r1 = default_interface_table();
    r1.insert(
        InterfaceId(7),
        InterfaceRecord::new(Some("ge-0/0/7".into()), InterfaceType::Physical),
    );
    let binding: InterfaceBinding = [
        (NodeId::from("r1"), InterfaceId(7)),
        (NodeId::from("r2"), InterfaceId(9)),
    ]
    .into_iter()
    .collect();
    let topology = TopologyGraph::new()
        .node_with_interfaces("r1", Attrs::new(), r1)
        .node_with_interfaces("r2", Attrs::new(), default_interface_table())
        .edge_with_binding("r1", "r2", Attrs::new(), binding);
    let anm = copy_input_into_phy(topology);

    assert_eq!(table_ids(&anm, PHY, "r1"), vec![0, 1]);
    assert_eq!(table_ids(&anm, PHY, "r2"), vec![0, 1]);
    let edge = anm.phy().unwrap().edge("r1", "r2").unwrap();
    assert_eq!(edge.dst_int(&anm).map(|i| i.id()), Some(InterfaceId(1)));
}

#[test]
fn stored_orientation_names_the_ports() {
    let anm = router_model(&["r1", "r2"], &[("r2", "r1")]);
    assert_eq!(
        descriptions(&anm, PHY, "r1"),
        vec![(0, "loopback".to_owned()), (1, "r1 to r2".to_owned())]
    );
    let edge = anm.phy().unwrap().edge("r1", "r2").unwrap();
    assert_eq!(edge.src_id().as_str(), "r2");
    assert_eq!(edge.src_int(&anm).map(|i| i.id()), Some(InterfaceId(1)));
}

#[test]
fn degree_matches_port_count() {
    let anm = router_model(
        &["hub", "s1", "s2", "s3", "s4"],
        &[("hub", "s1"), ("hub", "s2"), ("hub", "s3"), ("hub", "s4"), ("s1", "s2")],
    );
    let phy = anm.phy().unwrap();
    for node in phy.nodes() {
        assert_eq!(node.interface_ids(&anm).len(), node.degree(&anm) + 1, "{node}");
    }
}
