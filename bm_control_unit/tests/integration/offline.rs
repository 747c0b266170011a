//! The node keeps running without a broker.

use bm_mqtt::ConnectionState;

use super::harness::Node;

const CONFIG: &str = r#"{
    "system": {
        "id": "test", "mqtt": { "broker": "localhost" },
        "indicators": { "sysrun": 20, "neton": 21, "netoff": 22 }
    },
    "controls": [ { "id": "lamp", "pins": 5 } ],
    "scripts": { "dir": "scripts", "scan_dir": true }
}"#;

const BLINK: &str = r#"{
    "script": "blink",
    "blocks": [ { "run_time": 3, "controls": { "lamp": "on" } } ]
}"#;

fn offline_node() -> Node {
    let node = Node::start(CONFIG, &[("blink.json", BLINK)]);
    node.broker.set_online(false);
    node
}

#[test]
fn indicators_show_missing_broker() {
    let mut node = offline_node();
    node.at(0);
    assert_eq!(node.runner.adapter().state(), ConnectionState::Disconnected);
    assert!(node.pin(20));
    assert!(!node.pin(21));
    assert!(node.pin(22));
}

#[test]
fn reconnect_attempts_back_off() {
    let mut node = offline_node();
    node.at(0);
    node.run_until(30_000, 1000);
    // Attempts at 0, 5, 15 and 30 s.
    assert_eq!(node.broker.attempts(), 4);
    node.run_until(49_000, 1000);
    assert_eq!(node.broker.attempts(), 4);

    node.broker.set_online(true);
    node.run_until(50_000, 1000);
    assert_eq!(node.broker.attempts(), 5);
    assert!(node.runner.adapter().is_connected());
    assert!(node.pin(21));
    assert!(!node.pin(22));
    assert_eq!(node.payloads("connectivity"), vec!["online"]);
}

#[test]
fn nothing_published_while_offline() {
    let mut node = offline_node();
    node.at(0);
    node.run_until(10_000, 1000);
    assert!(node.broker.published().is_empty());
    assert!(!node.runner.adapter().is_polling());
}
