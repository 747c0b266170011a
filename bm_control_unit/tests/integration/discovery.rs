//! Discovery burst, forced window and one-shot system topics.

use super::harness::{Node, PREFIX};

const CONFIG: &str = r#"{
    "system": {
        "id": "test", "name": "Test Brick", "mqtt": { "broker": "localhost" },
        "ha": { "area": "Den", "meminfo": "split-all" }
    },
    "controls": [
        { "id": "lamp", "pins": 5, "name": "Porch Lamp", "icon": "mdi:lightbulb" },
        { "id": "beacon", "type": "flasher", "pins": [6, 7] }
    ],
    "scripts": { "dir": "scripts", "scan_dir": true }
}"#;

const SHOW: &str = r#"{ "script": "show", "blocks": [ { "run_time": 2 } ] }"#;

fn discovery_count(node: &Node) -> usize {
    node.broker
        .published()
        .iter()
        .filter(|p| p.topic.starts_with("homeassistant/"))
        .count()
}

#[test]
fn burst_on_connect() {
    let mut node = Node::start(CONFIG, &[("show.json", SHOW)]);
    node.at(0);
    let published = node.broker.published();
    let burst: Vec<_> = published
        .iter()
        .filter(|p| p.topic.starts_with("homeassistant/"))
        .collect();
    // connectivity + 4 memory sensors + 2 switches + selector
    assert_eq!(burst.len(), 8);
    assert!(burst.iter().all(|p| p.retain));

    let select = burst
        .iter()
        .find(|p| p.topic == "homeassistant/select/bm2_test/script_select/config")
        .unwrap();
    let payload: serde_json::Value = serde_json::from_str(&select.payload).unwrap();
    assert_eq!(payload["options"], serde_json::json!(["Inactive", "Abort", "show"]));
    assert_eq!(payload["device"]["suggested_area"], "Den");
    assert_eq!(payload["availability"][0]["topic"], format!("{PREFIX}/connectivity"));

    let lamp = burst
        .iter()
        .find(|p| p.topic == "homeassistant/switch/bm2_test/lamp/config")
        .unwrap();
    let payload: serde_json::Value = serde_json::from_str(&lamp.payload).unwrap();
    assert_eq!(payload["name"], "Porch Lamp");
    assert_eq!(payload["command_topic"], format!("{PREFIX}/controls/lamp/set"));
}

#[test]
fn everything_forced_for_fifteen_seconds() {
    let mut node = Node::start(CONFIG, &[]);
    node.at(0);
    node.run_until(15_000, 1000);
    assert_eq!(node.payloads("controls/lamp/status").len(), 16);
    node.run_until(16_000, 1000);
    assert_eq!(node.payloads("controls/lamp/status").len(), 16);
    node.run_until(20_000, 1000);
    assert_eq!(node.payloads("controls/lamp/status").len(), 16);
}

#[test]
fn one_shot_system_topics() {
    let mut node = Node::start(CONFIG, &[]);
    node.at(0);
    assert_eq!(node.payloads("system/board_id"), vec!["Simulated Board"]);
    let pins: serde_json::Value =
        serde_json::from_str(&node.payloads("system/pins")[0]).unwrap();
    assert_eq!(pins[0]["pin"], "GPIO5");
    assert_eq!(pins[0]["owner"], "lamp");
    assert_eq!(pins.as_array().unwrap().len(), 3);
}

#[test]
fn meminfo_every_publish_time() {
    let mut node = Node::start(CONFIG, &[]);
    node.at(0);
    node.run_until(31_000, 1000);
    let samples = node.payloads("meminfo");
    assert_eq!(samples.len(), 3);
    let first: serde_json::Value = serde_json::from_str(&samples[0]).unwrap();
    assert_eq!(first["pct_avail"], 50.0);
    assert_eq!(first["mem_total"], 1024 * 1024);
}

#[test]
fn no_discovery_without_ha() {
    let mut node = Node::start(
        r#"{ "system": { "id": "test", "mqtt": { "broker": "localhost" } },
             "controls": [ { "id": "lamp", "pins": 5 } ] }"#,
        &[],
    );
    node.at(0);
    assert_eq!(discovery_count(&node), 0);
    assert_eq!(node.payloads("connectivity"), vec!["online"]);
}
