//! Shutdown leaves the layout dark and the broker told.

use bm_common::hal::types::PinId;

use super::harness::Node;

const SHOW: &str = r#"{
    "script": "show", "type": "flight",
    "blocks": [
        { "run_time": 30, "controls": { "lamp": "on" },
          "flight": { "final_altitude": 10, "final_velocity": 100, "met_state": "run" } }
    ],
    "display_map": { "met": "met" }
}"#;

fn node() -> Node {
    Node::start(
        r#"{
            "system": {
                "id": "test", "mqtt": { "broker": "localhost" }, "i2c": true,
                "indicators": { "sysrun": 20 }
            },
            "controls": [
                { "id": "lamp", "pins": 5 },
                { "id": "beacon", "type": "flasher", "pins": [6, 7] }
            ],
            "displays": [ { "id": "met", "type": "seg7x4", "address": "0x70", "idle": "blank" } ],
            "scripts": { "dir": "scripts", "scan_dir": true }
        }"#,
        &[("show.json", SHOW)],
    )
}

fn busy() -> Node {
    let mut node = node();
    node.at(0);
    node.send("controls/beacon/set", "ON");
    node.send("script/set", "show");
    node.at(100);
    node.run_until(3_100, 100);
    assert!(node.pin(5));
    assert!(node.pin(20));
    assert!(!node.board.display(0x70).unwrap().is_blank());
    node
}

#[test]
fn cleanup_turns_everything_off() {
    let mut node = busy();
    node.runner.cleanup();

    assert!(node.board.high_lines().is_empty());
    assert!(node.board.display(0x70).unwrap().is_blank());
    assert_eq!(node.board.claimed(), 0);
    assert_eq!(node.payloads("controls/lamp/status").last().unwrap(), "OFF");
    assert_eq!(node.payloads("controls/beacon/status").last().unwrap(), "OFF");
    assert_eq!(node.payloads("script/active").last().unwrap(), "Inactive");

    let offline = node.broker.published_on("brickmaster/test/connectivity");
    let last = offline.last().unwrap();
    assert_eq!(last.payload, "offline");
    assert!(last.retain);
    assert_eq!(node.broker.disconnects(), 1);
    assert!(!node.broker.has_session());
}

#[test]
fn cleanup_runs_once() {
    let mut node = busy();
    node.runner.cleanup();
    let published = node.broker.published().len();
    node.runner.cleanup();
    assert_eq!(node.broker.published().len(), published);
    assert_eq!(node.broker.disconnects(), 1);
}

#[test]
fn dropping_the_runner_cleans_up() {
    let Node {
        runner,
        board,
        broker,
        ..
    } = busy();
    drop(runner);
    assert!(board.high_lines().is_empty());
    assert_eq!(
        broker.published_on("brickmaster/test/connectivity").last().unwrap().payload,
        "offline"
    );
}

#[test]
fn a_stuck_output_does_not_keep_the_rest_on() {
    let mut node = Node::start(
        r#"{
            "system": { "id": "test", "mqtt": { "broker": "localhost" }, "i2c": true },
            "controls": [
                { "id": "stuck", "pins": 4 },
                { "id": "lamp", "pins": 5 }
            ],
            "displays": [ { "id": "met", "type": "seg7x4", "address": "0x70", "idle": "blank" } ],
            "scripts": { "dir": "scripts", "scan_dir": true }
        }"#,
        &[("show.json", SHOW)],
    );
    node.at(0);
    node.send("script/set", "show");
    node.at(100);
    node.run_until(3_100, 100);
    assert!(node.pin(5));
    assert!(!node.board.display(0x70).unwrap().is_blank());

    node.board.fail_writes(PinId::onboard(4));
    node.runner.cleanup();

    assert!(!node.pin(5));
    assert!(node.board.display(0x70).unwrap().is_blank());
    assert_eq!(node.payloads("controls/lamp/status").last().unwrap(), "OFF");
    assert_eq!(node.payloads("connectivity").last().unwrap(), "offline");
}
