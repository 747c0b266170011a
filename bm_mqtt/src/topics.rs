//! Topic builders and inbound topic routing.
//!
//! Every node topic lives under `P = brickmaster/<system id>`.

use bm_common::consts::TOPIC_PREFIX;

/// Flasher sub-state fields published under `P/controls/<id>/…`.
pub const FLASHER_FIELDS: [&str; 3] = ["seq_pos", "loiter_time", "switch_time"];

/// Topic namespace of one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    base: String,
}

/// What an inbound topic addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundTopic {
    /// `P/controls/<id>/set`
    ControlSet(String),
    /// `P/script/set`
    ScriptSet,
    /// `P/syscmd`
    Syscmd,
}

impl Topics {
    /// Namespace for `system_id`.
    pub fn new(system_id: &str) -> Self {
        Self {
            base: format!("{TOPIC_PREFIX}/{system_id}"),
        }
    }

    /// `P`.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// `P/connectivity`
    pub fn connectivity(&self) -> String {
        format!("{}/connectivity", self.base)
    }

    /// `P/controls/<id>/set`
    pub fn control_set(&self, id: &str) -> String {
        format!("{}/controls/{id}/set", self.base)
    }

    /// `P/controls/<id>/status`
    pub fn control_status(&self, id: &str) -> String {
        format!("{}/controls/{id}/status", self.base)
    }

    /// `P/controls/<id>/<field>`
    pub fn control_field(&self, id: &str, field: &str) -> String {
        format!("{}/controls/{id}/{field}", self.base)
    }

    /// `P/script/set`
    pub fn script_set(&self) -> String {
        format!("{}/script/set", self.base)
    }

    /// `P/script/active`
    pub fn script_active(&self) -> String {
        format!("{}/script/active", self.base)
    }

    /// `P/scripts/<name>/state`
    pub fn script_state(&self, name: &str) -> String {
        format!("{}/scripts/{name}/state", self.base)
    }

    /// `P/syscmd`
    pub fn syscmd(&self) -> String {
        format!("{}/syscmd", self.base)
    }

    /// `P/meminfo`
    pub fn meminfo(&self) -> String {
        format!("{}/meminfo", self.base)
    }

    /// `P/system/board_id`
    pub fn board_id(&self) -> String {
        format!("{}/system/board_id", self.base)
    }

    /// `P/system/pins`
    pub fn pins(&self) -> String {
        format!("{}/system/pins", self.base)
    }

    /// Classify an inbound topic. Foreign topics give `None`.
    pub fn route(&self, topic: &str) -> Option<InboundTopic> {
        let rest = topic.strip_prefix(self.base.as_str())?.strip_prefix('/')?;
        match rest {
            "script/set" => Some(InboundTopic::ScriptSet),
            "syscmd" => Some(InboundTopic::Syscmd),
            _ => {
                let id = rest.strip_prefix("controls/")?.strip_suffix("/set")?;
                (!id.is_empty() && !id.contains('/')).then(|| InboundTopic::ControlSet(id.to_string()))
            }
        }
    }
}
