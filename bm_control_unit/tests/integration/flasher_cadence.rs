//! Flasher dwell and gap timing.

use super::harness::{Node, SYSTEM};

fn beacon_node() -> Node {
    Node::start(
        &format!(
            r#"{{ {SYSTEM}, "controls": [
                {{ "id": "beacon", "type": "flasher", "pins": [6, 7, 8],
                   "loiter_time": 1000, "switch_time": 200 }}
            ] }}"#
        ),
        &[],
    )
}

fn lit(node: &Node) -> [bool; 3] {
    [node.pin(6), node.pin(7), node.pin(8)]
}

#[test]
fn rotation_with_dwell_and_gap() {
    let mut node = beacon_node();
    node.at(0);
    node.send("controls/beacon/set", "on");
    node.at(0);
    assert_eq!(lit(&node), [true, false, false]);
    assert_eq!(node.runner.poll_timeout().as_millis(), 50);

    node.run_until(1010, 10);
    assert_eq!(lit(&node), [false, false, false]);

    node.run_until(1210, 10);
    assert_eq!(lit(&node), [false, true, false]);

    node.run_until(3650, 10);
    assert_eq!(lit(&node), [true, false, false]);

    node.send("controls/beacon/set", "off");
    node.tick();
    assert_eq!(lit(&node), [false, false, false]);
    assert_eq!(node.runner.poll_timeout().as_secs(), 1);
}

#[test]
fn at_most_one_element_lit() {
    let mut node = beacon_node();
    node.at(0);
    node.send("controls/beacon/set", "on");
    node.at(0);
    while node.now_ms() < 8000 {
        node.run_until(node.now_ms() + 10, 10);
        assert!(lit(&node).iter().filter(|on| **on).count() <= 1);
    }
}

#[test]
fn sub_state_topics() {
    let mut node = beacon_node();
    node.at(0);
    node.send("controls/beacon/set", "on");
    node.at(0);
    node.run_until(1300, 100);
    assert_eq!(node.payloads("controls/beacon/status"), vec!["OFF", "ON"]);
    assert_eq!(node.payloads("controls/beacon/seq_pos"), vec!["0", "1"]);
    assert_eq!(node.payloads("controls/beacon/loiter_time"), vec!["1000"]);
    assert_eq!(node.payloads("controls/beacon/switch_time"), vec!["200"]);
    let sub = node.broker.published_on("brickmaster/test/controls/beacon/seq_pos");
    assert!(sub.iter().all(|p| !p.retain));
}
