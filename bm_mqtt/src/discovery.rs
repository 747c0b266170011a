//! Home Assistant discovery payloads.
//!
//! One retained, forced message per entity under
//! `<ha_base>/<component>/bm2_<system id>/<object>/config`:
//!
//! | component       | object                         | count            |
//! |-----------------|--------------------------------|------------------|
//! | `binary_sensor` | `connectivity`                 | 1                |
//! | `sensor`        | `mem_*`                        | 1, 1, 2 or 4     |
//! | `switch`        | control id                     | one per control  |
//! | `select`        | `script_select`                | 1                |

use bm_common::config::{HaConfig, MemInfoFormat};
use bm_common::consts::{
    DISCOVERY_NODE_PREFIX, MANUFACTURER, MODEL, PAYLOAD_OFFLINE, PAYLOAD_ONLINE, SCRIPT_ABORT,
    SCRIPT_INACTIVE,
};
use serde::Serialize;
use serde_json::Value;

use crate::message::OutboundMessage;
use crate::topics::Topics;

/// Shared device block.
#[derive(Debug, Clone, Serialize)]
pub struct HaDeviceInfo {
    /// Device identifiers.
    pub identifiers: Vec<String>,
    /// Friendly name.
    pub name: String,
    /// Manufacturer.
    pub manufacturer: &'static str,
    /// Model.
    pub model: &'static str,
    /// Suggested area.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_area: Option<String>,
    /// Software version.
    pub sw_version: &'static str,
}

/// Availability block pointing at the connectivity topic.
#[derive(Debug, Clone, Serialize)]
pub struct HaAvailability {
    /// Connectivity topic.
    pub topic: String,
    /// Online payload.
    pub payload_available: &'static str,
    /// Offline payload.
    pub payload_not_available: &'static str,
}

/// One entity's config payload.
#[derive(Debug, Clone, Serialize)]
pub struct HaEntity {
    /// Entity name.
    pub name: String,
    /// Stable unique id `bm2_<system>_<object>`.
    pub unique_id: String,
    /// Topic the state is read from.
    pub state_topic: String,
    /// Topic commands are written to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_topic: Option<String>,
    /// HA device class.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_class: Option<&'static str>,
    /// Icon.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Unit of measurement.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_of_measurement: Option<&'static str>,
    /// Template extracting the value from a JSON state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_template: Option<String>,
    /// Payload meaning on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload_on: Option<&'static str>,
    /// Payload meaning off.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload_off: Option<&'static str>,
    /// Select options.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    /// Availability.
    pub availability: Vec<HaAvailability>,
    /// Device.
    pub device: HaDeviceInfo,
}

/// A control as announced to the UI.
#[derive(Debug, Clone)]
pub struct ControlEntity {
    /// Control id.
    pub id: String,
    /// Friendly name.
    pub name: String,
    /// Icon.
    pub icon: String,
}

/// Everything the generator needs.
#[derive(Debug, Clone)]
pub struct DiscoveryContext<'a> {
    /// System id.
    pub system_id: &'a str,
    /// Friendly system name.
    pub friendly_name: &'a str,
    /// HA settings.
    pub ha: &'a HaConfig,
    /// Node topics.
    pub topics: &'a Topics,
    /// Announced controls.
    pub controls: &'a [ControlEntity],
    /// Loaded script names.
    pub scripts: &'a [String],
}

/// Memory sensors for a layout: (object, label, json key, unit, device class).
fn mem_sensors(
    format: MemInfoFormat,
) -> &'static [(&'static str, &'static str, &'static str, &'static str, Option<&'static str>)] {
    const AVAIL_PCT: (&str, &str, &str, &str, Option<&str>) =
        ("mem_pct_avail", "Memory Available", "pct_avail", "%", None);
    const USED_PCT: (&str, &str, &str, &str, Option<&str>) =
        ("mem_pct_used", "Memory Used", "pct_used", "%", None);
    const AVAIL_B: (&str, &str, &str, &str, Option<&str>) =
        ("mem_avail", "Memory Free", "mem_avail", "B", Some("data_size"));
    const TOTAL_B: (&str, &str, &str, &str, Option<&str>) =
        ("mem_total", "Memory Total", "mem_total", "B", Some("data_size"));
    match format {
        MemInfoFormat::Unified => &[AVAIL_PCT],
        MemInfoFormat::UnifiedUsed => &[USED_PCT],
        MemInfoFormat::SplitPct => &[USED_PCT, AVAIL_PCT],
        MemInfoFormat::SplitAll => &[AVAIL_B, TOTAL_B, USED_PCT, AVAIL_PCT],
    }
}

/// Number of memory sensors announced for a layout.
pub fn mem_sensor_count(format: MemInfoFormat) -> usize {
    mem_sensors(format).len()
}

/// Selector options: `Inactive`, `Abort`, then sorted script names.
pub fn script_options(scripts: &[String]) -> Vec<String> {
    let mut names = scripts.to_vec();
    names.sort();
    names.dedup();
    let mut options = vec![SCRIPT_INACTIVE.to_string(), SCRIPT_ABORT.to_string()];
    options.extend(names);
    options
}

/// Build the whole discovery burst.
pub fn discovery_messages(ctx: &DiscoveryContext<'_>) -> Vec<OutboundMessage> {
    let node = format!("{DISCOVERY_NODE_PREFIX}{}", ctx.system_id);
    let device = HaDeviceInfo {
        identifiers: vec![node.clone()],
        name: ctx.friendly_name.to_string(),
        manufacturer: MANUFACTURER,
        model: MODEL,
        suggested_area: ctx.ha.area.clone(),
        sw_version: env!("CARGO_PKG_VERSION"),
    };
    let availability = vec![HaAvailability {
        topic: ctx.topics.connectivity(),
        payload_available: PAYLOAD_ONLINE,
        payload_not_available: PAYLOAD_OFFLINE,
    }];
    let entity = |object: &str, name: String, state_topic: String| HaEntity {
        name,
        unique_id: format!("{node}_{object}"),
        state_topic,
        command_topic: None,
        device_class: None,
        icon: None,
        unit_of_measurement: None,
        value_template: None,
        payload_on: None,
        payload_off: None,
        options: None,
        availability: availability.clone(),
        device: device.clone(),
    };
    let config_topic =
        |component: &str, object: &str| format!("{}/{component}/{node}/{object}/config", ctx.ha.base);

    let mut out = Vec::new();
    let mut push = |topic: String, payload: HaEntity| {
        let value = serde_json::to_value(payload).unwrap_or(Value::Null);
        out.push(OutboundMessage::new(topic, value).retained().forced());
    };

    push(
        config_topic("binary_sensor", "connectivity"),
        HaEntity {
            device_class: Some("connectivity"),
            payload_on: Some(PAYLOAD_ONLINE),
            payload_off: Some(PAYLOAD_OFFLINE),
            ..entity(
                "connectivity",
                format!("{} Connectivity", ctx.friendly_name),
                ctx.topics.connectivity(),
            )
        },
    );

    for &(object, label, key, unit, class) in mem_sensors(ctx.ha.meminfo) {
        push(
            config_topic("sensor", object),
            HaEntity {
                unit_of_measurement: Some(unit),
                device_class: class,
                value_template: Some(format!("{{{{ value_json.{key} }}}}")),
                icon: Some("mdi:memory".to_string()),
                ..entity(object, format!("{} {label}", ctx.friendly_name), ctx.topics.meminfo())
            },
        );
    }

    for control in ctx.controls {
        push(
            config_topic("switch", &control.id),
            HaEntity {
                command_topic: Some(ctx.topics.control_set(&control.id)),
                icon: Some(control.icon.clone()),
                payload_on: Some("ON"),
                payload_off: Some("OFF"),
                ..entity(
                    &control.id,
                    control.name.clone(),
                    ctx.topics.control_status(&control.id),
                )
            },
        );
    }

    push(
        config_topic("select", "script_select"),
        HaEntity {
            command_topic: Some(ctx.topics.script_set()),
            icon: Some("mdi:script-text-play".to_string()),
            options: Some(script_options(ctx.scripts)),
            ..entity(
                "script_select",
                format!("{} Script", ctx.friendly_name),
                ctx.topics.script_active(),
            )
        },
    );

    out
}
