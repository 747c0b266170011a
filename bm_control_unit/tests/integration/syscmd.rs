//! `syscmd` topic: rediscover, restart, dumpconfig.

use bm_mqtt::ConnectionState;

use super::harness::{Node, PREFIX};

const CONFIG: &str = r#"{
    "system": {
        "id": "test", "mqtt": { "broker": "localhost" },
        "ha": {}
    },
    "controls": [ { "id": "lamp", "pins": 5 } ]
}"#;

fn discovery_count(node: &Node) -> usize {
    node.broker
        .published()
        .iter()
        .filter(|p| p.topic.starts_with("homeassistant/"))
        .count()
}

#[test]
fn rediscover_resends_burst_and_reopens_window() {
    let mut node = Node::start(CONFIG, &[]);
    node.at(0);
    let burst = discovery_count(&node);
    assert_eq!(burst, 4);

    node.run_until(30_000, 1000);
    let status_before = node.payloads("controls/lamp/status").len();
    node.send("syscmd", "rediscover");
    node.run_until(31_000, 1000);
    assert_eq!(discovery_count(&node), 2 * burst);
    // Unchanged status is forced again inside the new window.
    assert_eq!(node.payloads("controls/lamp/status").len(), status_before + 1);
}

#[test]
fn restart_rebuilds_and_reconnects() {
    let mut node = Node::start(CONFIG, &[]);
    node.at(0);
    node.send("controls/lamp/set", "ON");
    node.at(100);
    assert!(node.pin(5));

    node.send("syscmd", "restart");
    node.at(200);
    assert!(!node.pin(5));
    assert_eq!(node.runner.adapter().state(), ConnectionState::Disconnected);
    assert_eq!(node.broker.disconnects(), 1);

    node.at(300);
    assert!(node.runner.adapter().is_connected());
    assert_eq!(node.runner.adapter().sessions(), 2);
    let connectivity = node.payloads("connectivity");
    let offline = connectivity.iter().rposition(|p| p == "offline").unwrap();
    let after = &connectivity[offline + 1..];
    assert!(!after.is_empty() && after.iter().all(|p| p == "online"));
    assert_eq!(node.payloads("system/board_id").len(), 1);
    assert!(
        node.broker
            .subscriptions()
            .contains(&format!("{PREFIX}/controls/lamp/set"))
    );

    node.send("controls/lamp/set", "ON");
    node.at(400);
    assert!(node.pin(5));
}

#[test]
fn dumpconfig_and_unknown_are_harmless() {
    let mut node = Node::start(CONFIG, &[]);
    node.at(0);
    let published = node.broker.published().len();
    node.send("syscmd", "dumpconfig");
    node.at(100);
    node.send("syscmd", "selfdestruct");
    node.at(200);
    assert!(node.runner.adapter().is_connected());
    assert_eq!(node.runner.adapter().sessions(), 1);
    // Only the forced window republications, no extra discovery.
    assert_eq!(discovery_count(&node), 4);
    assert!(node.broker.published().len() > published);
}
