// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Snapshot round trips and debug dumps.

mod common;

use anm_core::{
    attrs, AbstractNetworkModel, AnmSnapshot, EdgeOptions, InterfaceId, OverlayBase, OverlayOptions,
    PHY,
};
use common::{add_mirror, line3};

fn layered() -> AbstractNetworkModel {
    let mut anm = line3();
    add_mirror(&mut anm, "ospf");
    {
        let mut ospf = anm.overlay_mut("ospf").unwrap();
        ospf.add_edges_from_with(
            [("r1", "r2"), ("r2", "r3")],
            &EdgeOptions::new().attrs(attrs([("area", 0)])),
        );
        ospf.allocate_interfaces();
        ospf.set_data("process", 10);
    }
    anm.add_overlay_with("bgp", OverlayOptions::new().directed(true).multi_edge(true));
    let r1 = anm.overlay("ospf").unwrap().node("r1").unwrap();
    let lo = r1.add_loopback(&mut anm, Some("lo1"), attrs([("vrf", "mgmt")])).unwrap();
    assert_eq!(lo.id(), InterfaceId(2));
    anm
}

#[test]
fn snapshot_survives_json() {
    let anm = layered();
    let json = serde_json::to_string(&anm.snapshot()).unwrap();
    let decoded: AnmSnapshot = serde_json::from_str(&json).unwrap();
    assert_eq!(decoded, anm.snapshot());
    let restored = AbstractNetworkModel::restore(decoded).unwrap();
    assert_eq!(restored.dump().unwrap(), anm.dump().unwrap());
}

#[test]
fn restored_model_answers_the_same_queries() {
    let restored = AbstractNetworkModel::restore(layered().snapshot()).unwrap();
    let names: Vec<String> = restored.overlays().map(ToString::to_string).collect();
    assert_eq!(names, vec!["bgp", "graphics", "ospf", "phy"]);

    let bgp = restored.overlay("bgp").unwrap();
    assert!(bgp.is_directed());
    assert!(bgp.is_multi_edge());

    let ospf = restored.overlay("ospf").unwrap();
    assert_eq!(ospf.data("process").and_then(|v| v.as_int()), Some(10));
    let edge = ospf.edge("r3", "r2").unwrap();
    assert_eq!(edge.get(&restored, "area").and_then(|v| v.as_int()), Some(0));
    assert_eq!(edge.dst_int(&restored).map(|i| i.id()), Some(InterfaceId(2)));

    let r1 = ospf.node("r1").unwrap();
    let lo = r1.interface(&restored, InterfaceId(2)).unwrap();
    assert!(lo.is_loopback(&restored));
    assert_eq!(
        lo.get(&restored, "vrf").and_then(|v| v.as_str().map(str::to_owned)),
        Some("mgmt".to_owned())
    );
}

#[test]
fn overlay_dump_lists_visible_nodes_only() {
    let anm = line3();
    let phy = anm.overlay(PHY).unwrap();
    let members = ["r1", "r2"].into_iter().filter_map(|id| phy.node(id));
    let sub = phy.subgraph(members, Some("core"));
    let dump = sub.dump().unwrap();
    assert!(dump.contains("\"r1\""));
    assert!(!dump.contains("\"r3\""));
}
