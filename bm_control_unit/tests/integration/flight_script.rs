//! Flight script pushing MET, altitude and velocity to displays.

use super::harness::{Node, SYSTEM};

const LAUNCH: &str = r#"{
    "script": "launch", "type": "flight",
    "blocks": [
        { "name": "burn", "run_time": 10, "controls": { "engine": "on" },
          "flight": { "final_altitude": 100, "final_velocity": 2000, "met_state": "run" } },
        { "name": "coast", "run_time": 5,
          "flight": { "alt": "glide", "final_velocity": 2000 } }
    ],
    "display_map": { "met": "met", "alt": "alt", "vel": "vel" }
}"#;

const BROKEN: &str = r#"{
    "script": "broken", "type": "flight",
    "blocks": [ { "run_time": 4, "flight": { "final_altitude": 10 } } ]
}"#;

fn node() -> Node {
    Node::start(
        &format!(
            r#"{{ {SYSTEM},
                "controls": [ {{ "id": "engine", "pins": 5 }} ],
                "displays": [
                    {{ "id": "met", "type": "seg7x4", "address": "0x70", "idle": "blank" }},
                    {{ "id": "alt", "type": "seg7x4", "address": "0x71", "idle": "blank" }},
                    {{ "id": "vel", "type": "bigseg7x4", "address": "0x72", "idle": "blank" }}
                ],
                "scripts": {{ "dir": "scripts", "scan_dir": true }} }}"#
        ),
        &[("launch.json", LAUNCH), ("broken.json", BROKEN)],
    )
}

fn text(node: &Node, address: u8) -> String {
    node.board.display(address).unwrap().text
}

#[test]
fn rate_less_flight_block_is_dropped_at_load() {
    let node = node();
    assert_eq!(node.runner.assembly().router().names(), vec!["launch"]);
}

#[test]
fn trajectory_on_displays() {
    let mut node = node();
    node.at(0);
    assert!(node.board.display(0x70).unwrap().is_blank());

    node.send("script/set", "launch");
    node.at(1000);
    assert!(node.pin(5));
    assert_eq!(text(&node, 0x70), "00:00");

    node.run_until(11_000, 1000);
    assert_eq!(text(&node, 0x70), "00:10");
    assert_eq!(text(&node, 0x71), " 100");
    assert_eq!(text(&node, 0x72), "2000");

    node.run_until(16_000, 1000);
    assert_eq!(text(&node, 0x70), "00:15");
    assert_eq!(text(&node, 0x71), " 150");

    node.run_until(17_000, 1000);
    assert_eq!(node.runner.assembly().router().active(), None);
    assert!(!node.pin(5));
    for address in [0x70, 0x71, 0x72] {
        assert!(node.board.display(address).unwrap().is_blank());
    }
}

#[test]
fn compiled_table_matches_burn_plan() {
    let node = node();
    let script = node.runner.assembly().router().get("launch").unwrap();
    let table = script.flight().unwrap();
    assert_eq!(table.len(), script.total_run_time() as usize + 1);
    let t10 = &table.ticks()[10];
    assert_eq!((t10.met, t10.altitude, t10.velocity), (10, 100.0, 2000.0));
    assert_eq!(table.ticks()[15].altitude, 150.0);
    assert_eq!(table.ticks()[15].velocity, 2000.0);
}
