//! Single control round trip over the broker.

use super::harness::{Node, SYSTEM};

fn lamp_node() -> Node {
    Node::start(
        &format!(r#"{{ {SYSTEM}, "controls": [ {{ "id": "lamp", "pins": 5 }} ] }}"#),
        &[],
    )
}

#[test]
fn status_published_once_per_change() {
    let mut node = lamp_node();
    node.at(0);
    assert!(node.runner.adapter().is_connected());
    assert_eq!(node.payloads("controls/lamp/status"), vec!["OFF"]);

    node.send("controls/lamp/set", "on");
    node.at(100);
    assert!(node.pin(5));
    assert_eq!(node.payloads("controls/lamp/status"), vec!["OFF", "ON"]);

    node.send("controls/lamp/set", "on");
    node.at(200);
    node.at(1200);
    assert!(node.pin(5));
    assert_eq!(node.payloads("controls/lamp/status"), vec!["OFF", "ON"]);

    node.send("controls/lamp/set", "off");
    node.at(1300);
    assert!(!node.pin(5));
    assert_eq!(node.payloads("controls/lamp/status"), vec!["OFF", "ON", "OFF"]);
}

#[test]
fn status_is_retained() {
    let mut node = lamp_node();
    node.at(0);
    let published = node.broker.published_on("brickmaster/test/controls/lamp/status");
    assert!(published.iter().all(|p| p.retain));
}

#[test]
fn malformed_commands_are_dropped() {
    let mut node = lamp_node();
    node.at(0);
    node.send("controls/lamp/set", "blink");
    node.send("controls/ghost/set", "on");
    node.at(100);
    assert!(!node.pin(5));
    assert_eq!(node.payloads("controls/lamp/status"), vec!["OFF"]);
}

#[test]
fn active_low_inverts_the_line() {
    let mut node = Node::start(
        &format!(r#"{{ {SYSTEM}, "controls": [ {{ "id": "lamp", "pins": "D5", "active_low": true }} ] }}"#),
        &[],
    );
    node.at(0);
    assert!(node.pin(5));
    node.send("controls/lamp/set", "ON");
    node.at(100);
    assert!(!node.pin(5));
}

#[test]
fn split_pins_stay_complementary() {
    let mut node = Node::start(
        &format!(r#"{{ {SYSTEM}, "controls": [ {{ "id": "relay", "pins": {{ "on": 12, "off": 13 }} }} ] }}"#),
        &[],
    );
    node.at(0);
    assert!(!node.pin(12) && node.pin(13));
    node.send("controls/relay/set", "on");
    node.at(100);
    assert!(node.pin(12) && !node.pin(13));
}
