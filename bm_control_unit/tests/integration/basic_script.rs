//! Basic script blocks, separator second and selector state.

use super::harness::{Node, SYSTEM};

const SHOW: &str = r#"{
    "script": "show", "type": "basic", "run": "once",
    "blocks": [
        { "name": "first", "run_time": 3, "controls": { "a": "on", "b": "off" } },
        { "name": "second", "run_time": 2, "controls": { "a": "off", "b": "on" } }
    ]
}"#;

fn node() -> Node {
    Node::start(
        &format!(
            r#"{{ {SYSTEM},
                "controls": [ {{ "id": "a", "pins": 5 }}, {{ "id": "b", "pins": 6 }} ],
                "scripts": {{ "dir": "scripts", "scan_dir": true }} }}"#
        ),
        &[("show.json", SHOW)],
    )
}

#[test]
fn blocks_run_then_idle() {
    let mut node = node();
    node.at(0);
    assert_eq!(node.payloads("script/active"), vec!["Inactive"]);

    node.send("script/set", "show");
    node.at(1000);
    assert!(node.pin(5));
    assert!(!node.pin(6));
    assert_eq!(node.payloads("scripts/show/state"), vec!["idle", "running"]);

    node.run_until(5000, 1000);
    assert!(!node.pin(5));
    assert!(node.pin(6));

    node.run_until(8000, 1000);
    assert_eq!(node.runner.assembly().router().active(), None);
    assert!(!node.pin(5) && !node.pin(6));
    assert_eq!(node.payloads("script/active"), vec!["Inactive", "show", "Inactive"]);
    assert_eq!(node.payloads("scripts/show/state"), vec!["idle", "running", "idle"]);
}

#[test]
fn abort_stops_mid_block() {
    let mut node = node();
    node.at(0);
    node.send("script/set", "show");
    node.at(1000);
    assert!(node.pin(5));
    node.send("script/set", "Abort");
    node.at(2000);
    assert!(!node.pin(5));
    assert_eq!(node.runner.assembly().router().active_label(), "Inactive");
}

#[test]
fn unknown_script_is_ignored() {
    let mut node = node();
    node.at(0);
    node.send("script/set", "encore");
    node.at(1000);
    assert_eq!(node.runner.assembly().router().active(), None);
    assert_eq!(node.payloads("script/active"), vec!["Inactive"]);
}

#[test]
fn repeat_runs_every_loop() {
    let looped = r#"{
        "script": "blink", "run": "repeat", "loops": 2,
        "blocks": [ { "run_time": 1, "controls": { "a": "on" } }, { "run_time": 1 } ]
    }"#;
    let mut node = Node::start(
        &format!(
            r#"{{ {SYSTEM},
                "controls": [ {{ "id": "a", "pins": 5 }} ],
                "scripts": {{ "dir": "scripts", "files": ["blink.json"] }} }}"#
        ),
        &[("blink.json", looped)],
    );
    node.at(0);
    node.send("script/set", "blink");
    node.at(1000);
    assert!(node.pin(5));
    // Loop 1 ends at +3 s (1 + separator + 1); loop 2 lights `a` again.
    node.run_until(4000, 1000);
    assert!(node.pin(5));
    assert_eq!(node.runner.assembly().router().get("blink").unwrap().current_loop(), 2);
    node.run_until(8000, 1000);
    assert_eq!(node.runner.assembly().router().active(), None);
}

#[test]
fn restore_puts_controls_back() {
    let dim = r#"{
        "script": "dim", "at_completion": "restore",
        "blocks": [ { "run_time": 2, "controls": { "b": "on" } } ]
    }"#;
    let mut node = Node::start(
        &format!(
            r#"{{ {SYSTEM},
                "controls": [ {{ "id": "a", "pins": 5 }}, {{ "id": "b", "pins": 6 }} ],
                "scripts": {{ "dir": "scripts", "files": ["dim.json"] }} }}"#
        ),
        &[("dim.json", dim)],
    );
    node.at(0);
    node.send("controls/a/set", "ON");
    node.at(500);
    assert!(node.pin(5));

    node.send("script/set", "dim");
    node.at(1000);
    assert!(!node.pin(5));
    assert!(node.pin(6));

    node.run_until(6000, 1000);
    assert_eq!(node.runner.assembly().router().active(), None);
    assert!(node.pin(5));
    assert!(!node.pin(6));
    let a = node.payloads("controls/a/status");
    assert!(a.contains(&"OFF".to_string()));
    assert_eq!(a.last().unwrap(), "ON");
    assert_eq!(node.payloads("controls/b/status").last().unwrap(), "OFF");
}
