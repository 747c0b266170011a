//! Main loop.
//!
//! One iteration drains inbound MQTT traffic into control and script
//! callbacks, ticks flashers, runs the active script (or the idle display
//! views), refreshes the status pins and finally flushes the outbound
//! state through the adapter. Everything runs on the calling thread.

use std::sync::Arc;
use std::time::Duration;

use bm_common::config::BrickConfig;
use bm_common::consts::{
    DISCOVERY_NODE_PREFIX, FLASHER_POLL_TIMEOUT, MQTT_KEEP_ALIVE_S, MQTT_POLL_TIMEOUT,
    PAYLOAD_ONLINE,
};
use bm_common::hal::driver::{GpioDriver, HalError};
use bm_common::io::config::{ControlConfig, ControlType, PinName, PinRef};
use bm_common::io::registry::PinClaims;
use bm_common::platform::{Clock, Platform};
use bm_hal::{PinHandle, PinMap, PinRequest};
use bm_mqtt::{
    ConnectOptions, ControlEntity, DiscoveryContext, InboundMessage, InboundTopic, MqttAdapter,
    MqttTransport, OutboundMessage, Topics, discovery_messages,
};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::config::load_scripts;
use crate::control::{Control, ControlInfo, Controls, FlasherControl, NullControl, SingleControl};
use crate::display::{Display, Displays};
use crate::error::CoreError;
use crate::script::ScriptRouter;
use crate::signals::{SignalAction, Signals, action_for};

// ─── Status pins ────────────────────────────────────────────────────

/// The `system.indicators` outputs. Unset pins are `Null` controls.
#[derive(Debug)]
pub struct StatusPins {
    sysrun: Control,
    neton: Control,
    netoff: Control,
}

impl StatusPins {
    fn claim(
        config: &BrickConfig,
        driver: &mut dyn GpioDriver,
        map: &PinMap,
        claims: &mut PinClaims,
    ) -> Result<Self, CoreError> {
        let pins = &config.system.indicators;
        let mut claim = |id: &str, pin: &Option<PinName>| -> Result<Control, CoreError> {
            let Some(name) = pin else {
                return Ok(Control::Null(NullControl::new(id)));
            };
            let pin = PinRef::Single(name.clone());
            let handle = PinHandle::claim(
                &mut *driver,
                map,
                claims,
                PinRequest {
                    pin: &pin,
                    expander: None,
                    active_low: false,
                    owner: id,
                },
            )?;
            let info = ControlInfo {
                id: id.to_string(),
                name: id.to_string(),
                icon: String::new(),
                publish_time: config.system.publish_time,
            };
            Ok(Control::Single(SingleControl::new(info, handle)))
        };
        Ok(Self {
            sysrun: claim("sysrun", &pins.sysrun)?,
            neton: claim("neton", &pins.neton)?,
            netoff: claim("netoff", &pins.netoff)?,
        })
    }

    /// Drive `sysrun` from `running` and the network pair from `connected`.
    pub fn update(&mut self, running: bool, connected: bool, now: Duration) -> Result<(), HalError> {
        self.sysrun.set_on(running, now)?;
        self.neton.set_on(connected, now)?;
        self.netoff.set_on(!connected, now)
    }

    /// All three pins, in `sysrun`, `neton`, `netoff` order.
    pub fn iter(&self) -> impl Iterator<Item = &Control> {
        [&self.sysrun, &self.neton, &self.netoff].into_iter()
    }

    /// Drive all three off, attempting each even if an earlier one fails.
    fn off(&mut self, now: Duration) -> Result<(), HalError> {
        let mut outcome = Teardown::default();
        for (name, pin) in [
            ("sysrun", &mut self.sysrun),
            ("neton", &mut self.neton),
            ("netoff", &mut self.netoff),
        ] {
            outcome.record(name, pin.shutdown(now));
        }
        outcome.finish()
    }
}

// ─── Assembly ───────────────────────────────────────────────────────

/// Hardware-facing runtime built from one configuration.
#[derive(Debug)]
pub struct Assembly {
    claims: PinClaims,
    controls: Controls,
    status_pins: StatusPins,
    displays: Displays,
    router: ScriptRouter,
}

impl Assembly {
    /// Initialise the driver and build pins, controls, displays and scripts
    /// in that order.
    ///
    /// # Errors
    /// Driver initialisation, pin resolution and pin claim failures are fatal.
    pub fn build(
        config: &BrickConfig,
        driver: &mut dyn GpioDriver,
        map: &PinMap,
        display_step: Duration,
    ) -> Result<Self, CoreError> {
        driver.init(config.system.i2c)?;
        info!("GPIO driver '{}' v{} ready", driver.name(), driver.version());

        let mut claims = PinClaims::new();
        let mut controls = Controls::new();
        for control in &config.controls {
            controls.push(build_control(control, driver, map, &mut claims)?);
        }
        let status_pins = StatusPins::claim(config, driver, map, &mut claims)?;
        info!("{} control(s), {} pin(s) claimed", controls.len(), claims.len());

        let mut displays = Displays::new();
        for entry in &config.displays {
            if !config.system.i2c {
                error!("CRITICAL: display '{}' needs system.i2c, skipping", entry.id);
                continue;
            }
            displays.push(Display::open(entry, driver, display_step)?);
        }

        let router = ScriptRouter::new(load_scripts(config, &controls.ids()));

        Ok(Self {
            claims,
            controls,
            status_pins,
            displays,
            router,
        })
    }

    /// User controls.
    pub fn controls(&self) -> &Controls {
        &self.controls
    }

    /// Status pins.
    pub fn status_pins(&self) -> &StatusPins {
        &self.status_pins
    }

    /// Displays.
    pub fn displays(&self) -> &Displays {
        &self.displays
    }

    /// Script router.
    pub fn router(&self) -> &ScriptRouter {
        &self.router
    }

    /// Claimed lines.
    pub fn claims(&self) -> &PinClaims {
        &self.claims
    }

    /// Topics the node subscribes to: control commands, selector, syscmd.
    pub fn subscriptions(&self, topics: &Topics) -> Vec<String> {
        let mut out: Vec<String> = self
            .controls
            .iter()
            .filter_map(|c| c.topics(topics).into_iter().next())
            .collect();
        out.push(topics.script_set());
        out.push(topics.syscmd());
        out
    }

    /// Stop scripts, drive every output off and blank every display.
    ///
    /// A failing output does not stop the rest from being switched off;
    /// the first error is returned once everything has been attempted.
    pub fn teardown(&mut self, now: Duration) -> Result<(), HalError> {
        let mut outcome = Teardown::default();
        outcome.record(
            "scripts",
            self.router
                .stop_all(now, &mut self.controls, &mut self.displays),
        );
        for control in self.controls.iter_mut() {
            let id = control.id().to_string();
            outcome.record(&id, control.shutdown(now));
        }
        outcome.record("status pins", self.status_pins.off(now));
        for display in self.displays.iter_mut() {
            let id = display.id().to_string();
            outcome.record(&id, display.off());
        }
        outcome.finish()
    }
}

/// First failure of a best-effort shutdown sequence.
#[derive(Default)]
struct Teardown {
    first: Option<HalError>,
}

impl Teardown {
    fn record(&mut self, what: &str, result: Result<(), HalError>) {
        if let Err(e) = result {
            error!("CRITICAL: could not switch off '{what}': {e}");
            self.first.get_or_insert(e);
        }
    }

    fn finish(self) -> Result<(), HalError> {
        self.first.map_or(Ok(()), Err)
    }
}

fn build_control(
    config: &ControlConfig,
    driver: &mut dyn GpioDriver,
    map: &PinMap,
    claims: &mut PinClaims,
) -> Result<Control, CoreError> {
    let expander = config.expander_address()?;
    let info = ControlInfo {
        id: config.id.clone(),
        name: config.friendly_name().to_string(),
        icon: config.icon.clone(),
        publish_time: config.publish_time.unwrap_or_default(),
    };
    let mut claim = |pin: &PinRef| {
        PinHandle::claim(
            &mut *driver,
            map,
            claims,
            PinRequest {
                pin,
                expander,
                active_low: config.active_low,
                owner: &config.id,
            },
        )
    };
    let control = match config.control_type {
        ControlType::Single => {
            let refs = config.pins.refs();
            let [pin] = refs.as_slice() else {
                return Err(HalError::ConfigError(format!(
                    "single control '{}' needs exactly one output",
                    config.id
                ))
                .into());
            };
            Control::Single(SingleControl::new(info, claim(pin)?))
        }
        ControlType::Flasher => {
            let handles = config
                .pins
                .refs()
                .into_iter()
                .map(|pin| claim(pin))
                .collect::<Result<Vec<_>, _>>()?;
            Control::Flasher(FlasherControl::new(
                info,
                handles,
                config.loiter_time,
                config.switch_time,
            )?)
        }
    };
    debug!("control '{}' built", config.id);
    Ok(control)
}

// ─── Cycle Runner ───────────────────────────────────────────────────

/// Injected collaborators of a runner.
pub struct RunnerDeps {
    /// GPIO/display backend, not yet initialised.
    pub driver: Box<dyn GpioDriver>,
    /// MQTT transport.
    pub transport: Box<dyn MqttTransport>,
    /// Host queries.
    pub platform: Box<dyn Platform>,
    /// Monotonic time.
    pub clock: Arc<dyn Clock>,
    /// Pause between display self-test frames.
    pub display_step: Duration,
}

/// Why `run` returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// A signal asked for shutdown; carries the exit code.
    Signal(i32),
}

/// Owns the whole node.
pub struct CycleRunner {
    config: BrickConfig,
    driver: Box<dyn GpioDriver>,
    pin_map: PinMap,
    assembly: Assembly,
    adapter: MqttAdapter,
    platform: Box<dyn Platform>,
    clock: Arc<dyn Clock>,
    display_step: Duration,
    last_meminfo: Option<Duration>,
    restart_requested: bool,
    cleaned: bool,
}

impl std::fmt::Debug for CycleRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CycleRunner")
            .field("system", &self.config.system.id)
            .field("driver", &self.driver.name())
            .field("mqtt", &self.adapter.state())
            .field("active_script", &self.assembly.router.active())
            .finish()
    }
}

impl CycleRunner {
    /// Assemble the node: hardware first, then the MQTT adapter.
    ///
    /// # Errors
    /// Any fatal assembly error; nothing is left claimed.
    pub fn new(config: BrickConfig, deps: RunnerDeps) -> Result<Self, CoreError> {
        let RunnerDeps {
            mut driver,
            transport,
            platform,
            clock,
            display_step,
        } = deps;
        let pin_map = PinMap::default();

        let assembly = match Assembly::build(&config, driver.as_mut(), &pin_map, display_step) {
            Ok(assembly) => assembly,
            Err(e) => {
                if let Err(shutdown) = driver.shutdown() {
                    warn!("driver shutdown after failed assembly: {shutdown}");
                }
                return Err(e);
            }
        };

        let node_id = platform
            .system_id(&config.system.interface)
            .unwrap_or_else(|| config.system.id.clone());
        let topics = Topics::new(&config.system.id);
        let options = connect_options(&config, format!("{DISCOVERY_NODE_PREFIX}{node_id}"));
        let mut adapter = MqttAdapter::new(transport, options, topics.clone());
        adapter.set_subscriptions(assembly.subscriptions(&topics))?;

        info!(
            "Node '{}' ({}) assembled: {} controls, {} displays, {} scripts",
            config.system.friendly_name(),
            config.system.id,
            assembly.controls.len(),
            assembly.displays.len(),
            assembly.router.names().len()
        );

        Ok(Self {
            config,
            driver,
            pin_map,
            assembly,
            adapter,
            platform,
            clock,
            display_step,
            last_meminfo: None,
            restart_requested: false,
            cleaned: false,
        })
    }

    /// Effective configuration.
    pub fn config(&self) -> &BrickConfig {
        &self.config
    }

    /// Hardware runtime.
    pub fn assembly(&self) -> &Assembly {
        &self.assembly
    }

    /// MQTT adapter.
    pub fn adapter(&self) -> &MqttAdapter {
        &self.adapter
    }

    /// Network wait for the next iteration: short while a flasher animates.
    pub fn poll_timeout(&self) -> Duration {
        if self.assembly.controls.iter().any(Control::is_animating) {
            FLASHER_POLL_TIMEOUT
        } else {
            MQTT_POLL_TIMEOUT
        }
    }

    /// Loop until a terminating signal or a fatal error. Cleans up on both.
    ///
    /// # Errors
    /// The fatal error that stopped the loop.
    pub fn run(&mut self, signals: &Signals) -> Result<ExitReason, CoreError> {
        info!("Entering main loop");
        loop {
            if let Some(sig) = signals.take() {
                match action_for(sig) {
                    SignalAction::Continue => info!("{sig}: reload not supported"),
                    SignalAction::Exit(code) => {
                        info!("Received {sig}, shutting down");
                        self.cleanup();
                        return Ok(ExitReason::Signal(code));
                    }
                }
            }
            if let Err(e) = self.tick() {
                error!("CRITICAL: main loop stopped: {e}");
                self.cleanup();
                return Err(e);
            }
            if !self.adapter.is_polling() {
                std::thread::sleep(self.poll_timeout());
            }
        }
    }

    /// One loop iteration.
    ///
    /// # Errors
    /// Hardware failures and fatal broker errors.
    pub fn tick(&mut self) -> Result<(), CoreError> {
        let timeout = self.poll_timeout();
        let polled = self.adapter.poll(self.clock.now(), timeout)?;
        let now = self.clock.now();

        if polled.connected_now {
            self.announce(now, polled.first_connect)?;
        }
        for msg in polled.inbound {
            self.route(&msg, now)?;
        }
        if self.restart_requested {
            self.restart_requested = false;
            return self.restart();
        }

        let Assembly {
            controls,
            displays,
            router,
            status_pins,
            ..
        } = &mut self.assembly;
        for control in controls.iter_mut() {
            control.tick(now)?;
        }
        if !router.execute(now, controls, displays)? {
            let wall = chrono::Local::now().naive_local();
            for display in displays.iter_mut() {
                display.show_idle(wall)?;
            }
        }
        status_pins.update(true, self.adapter.is_connected(), now)?;

        let mut outbound = self.state_messages();
        if let Some(meminfo) = self.sample_meminfo(now) {
            outbound.push(meminfo);
        }
        self.adapter.flush(&outbound, now)?;
        Ok(())
    }

    // ─── Inbound ────────────────────────────────────────────────────

    fn route(&mut self, msg: &InboundMessage, now: Duration) -> Result<(), CoreError> {
        let payload = msg.text();
        let Some(target) = self.adapter.topics().route(&msg.topic) else {
            debug!("ignoring message on {}", msg.topic);
            return Ok(());
        };
        let assembly = &mut self.assembly;
        match target {
            InboundTopic::ControlSet(id) => match assembly.controls.get_mut(&id) {
                Some(control) => control.callback(&payload, now)?,
                None => warn!("command for unknown control '{id}'"),
            },
            InboundTopic::ScriptSet => {
                assembly
                    .router
                    .select(&payload, now, &mut assembly.controls, &mut assembly.displays)?;
            }
            InboundTopic::Syscmd => self.syscmd(&payload, now)?,
        }
        Ok(())
    }

    fn syscmd(&mut self, payload: &str, now: Duration) -> Result<(), CoreError> {
        match payload.trim().to_ascii_lowercase().as_str() {
            "rediscover" => {
                info!("syscmd: rediscover");
                self.discover(now)?;
            }
            "restart" => {
                info!("syscmd: restart");
                self.restart_requested = true;
            }
            "dumpconfig" => info!("syscmd: dumpconfig\n{}", self.config.to_json_pretty()),
            other => warn!("syscmd: ignoring unknown command '{other}'"),
        }
        Ok(())
    }

    // ─── Outbound ───────────────────────────────────────────────────

    fn announce(&mut self, now: Duration, first: bool) -> Result<(), CoreError> {
        self.discover(now)?;
        if first {
            let topics = self.adapter.topics();
            let pins = serde_json::to_value(self.assembly.claims.entries()).unwrap_or(Value::Null);
            let once = [
                OutboundMessage::new(topics.board_id(), self.platform.board_id()),
                OutboundMessage::new(topics.pins(), pins),
            ];
            self.adapter.flush(&once, now)?;
        }
        Ok(())
    }

    fn discover(&mut self, now: Duration) -> Result<(), CoreError> {
        let Some(ha) = &self.config.system.ha else {
            return Ok(());
        };
        let controls: Vec<ControlEntity> = self
            .assembly
            .controls
            .iter()
            .map(|c| {
                let info = c.info();
                ControlEntity {
                    id: info.id.clone(),
                    name: info.name.clone(),
                    icon: info.icon.clone(),
                }
            })
            .collect();
        let scripts = self.assembly.router.names();
        let messages = discovery_messages(&DiscoveryContext {
            system_id: &self.config.system.id,
            friendly_name: self.config.system.friendly_name(),
            ha,
            topics: self.adapter.topics(),
            controls: &controls,
            scripts: &scripts,
        });
        let sent = self.adapter.flush(&messages, now)?;
        info!("Discovery: {sent}/{} config message(s) sent", messages.len());
        self.adapter.start_discovery_window(now);
        Ok(())
    }

    /// Connectivity, control, flasher and script state for this iteration.
    fn state_messages(&self) -> Vec<OutboundMessage> {
        let topics = self.adapter.topics();
        let mut out = vec![OutboundMessage::new(topics.connectivity(), PAYLOAD_ONLINE).retained()];
        for control in self.assembly.controls.iter() {
            out.extend(control.outbound(topics));
        }
        out.push(OutboundMessage::new(
            topics.script_active(),
            self.assembly.router.active_label(),
        ));
        for script in self.assembly.router.iter() {
            out.push(OutboundMessage::new(
                topics.script_state(script.name()),
                script.status().as_str(),
            ));
        }
        out
    }

    fn sample_meminfo(&mut self, now: Duration) -> Option<OutboundMessage> {
        if !self.adapter.is_connected() {
            return None;
        }
        let period = Duration::from_secs(self.config.system.publish_time);
        if self
            .last_meminfo
            .is_some_and(|last| now.saturating_sub(last) < period)
        {
            return None;
        }
        self.last_meminfo = Some(now);
        Some(OutboundMessage::new(
            self.adapter.topics().meminfo(),
            self.platform.mem_info().to_json(),
        )
        .forced())
    }

    // ─── Lifecycle ──────────────────────────────────────────────────

    /// Tear down and re-assemble from the same configuration, then
    /// reconnect.
    fn restart(&mut self) -> Result<(), CoreError> {
        let now = self.clock.now();
        info!("Restarting node '{}'", self.config.system.id);
        self.assembly.teardown(now)?;
        self.driver.shutdown()?;
        self.assembly = Assembly::build(
            &self.config,
            self.driver.as_mut(),
            &self.pin_map,
            self.display_step,
        )?;
        self.adapter.shutdown(now);
        self.adapter.resume();
        let subscriptions = self.assembly.subscriptions(self.adapter.topics());
        self.adapter.set_subscriptions(subscriptions)?;
        self.last_meminfo = None;
        Ok(())
    }

    /// Drive every output off, blank displays, publish the final state,
    /// disconnect and release the driver. Runs once.
    pub fn cleanup(&mut self) {
        if self.cleaned {
            return;
        }
        self.cleaned = true;
        let now = self.clock.now();
        info!("Cleaning up");
        if let Err(e) = self.assembly.teardown(now) {
            error!("CRITICAL: teardown failed: {e}");
        }
        let last = self.state_messages();
        if let Err(e) = self.adapter.flush(&last, now) {
            warn!("final state not published: {e}");
        }
        self.adapter.shutdown(now);
        if let Err(e) = self.driver.shutdown() {
            error!("CRITICAL: driver shutdown failed: {e}");
        }
    }
}

impl Drop for CycleRunner {
    fn drop(&mut self) {
        self.cleanup();
    }
}

fn connect_options(config: &BrickConfig, client_id: String) -> ConnectOptions {
    let mqtt = &config.system.mqtt;
    let credentials = mqtt
        .user
        .as_ref()
        .map(|user| (user.clone(), mqtt.key.clone().unwrap_or_default()));
    ConnectOptions {
        client_id,
        host: mqtt.broker.clone(),
        port: mqtt.port,
        credentials,
        keep_alive: Duration::from_secs(MQTT_KEEP_ALIVE_S),
        last_will: (String::new(), String::new()),
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use bm_common::platform::ManualClock;
    use bm_hal::{FixedPlatform, SimBoard, SimulationDriver};
    use bm_mqtt::MemoryTransport;

    fn config(json: &str) -> BrickConfig {
        let mut config = BrickConfig::from_json_str(json, ".".into()).unwrap();
        crate::config::apply_control_defaults(&mut config);
        config
    }

    fn runner(json: &str) -> (CycleRunner, SimBoard, MemoryTransport) {
        let board = SimBoard::new();
        let transport = MemoryTransport::new();
        transport.set_online(true);
        let deps = RunnerDeps {
            driver: Box::new(SimulationDriver::with_board(board.clone())),
            transport: Box::new(transport.clone()),
            platform: Box::new(FixedPlatform::default()),
            clock: Arc::new(ManualClock::new()),
            display_step: Duration::ZERO,
        };
        (CycleRunner::new(config(json), deps).unwrap(), board, transport)
    }

    #[test]
    fn status_pins_follow_connection() {
        let (mut r, board, transport) = runner(
            r#"{
                "system": { "id": "b1", "mqtt": { "broker": "x" },
                            "indicators": { "sysrun": 20, "neton": 21, "netoff": 22 } },
                "controls": []
            }"#,
        );
        r.tick().unwrap();
        assert!(board.onboard(20));
        assert!(board.onboard(21));
        assert!(!board.onboard(22));

        transport.drop_session();
        r.tick().unwrap();
        r.tick().unwrap();
        assert!(!board.onboard(21));
        assert!(board.onboard(22));
    }

    #[test]
    fn duplicate_pin_is_fatal() {
        let board = SimBoard::new();
        let deps = RunnerDeps {
            driver: Box::new(SimulationDriver::with_board(board.clone())),
            transport: Box::new(MemoryTransport::new()),
            platform: Box::new(FixedPlatform::default()),
            clock: Arc::new(ManualClock::new()),
            display_step: Duration::ZERO,
        };
        let cfg = config(
            r#"{
                "system": { "id": "b1", "mqtt": { "broker": "x" }, "indicators": { "sysrun": 5 } },
                "controls": [ { "id": "lamp", "pins": 5 } ]
            }"#,
        );
        let err = CycleRunner::new(cfg, deps).unwrap_err();
        assert!(matches!(err, CoreError::Hal(HalError::DuplicatePin { .. })));
        assert_eq!(board.claimed(), 0);
    }

    #[test]
    fn subscriptions_cover_commands() {
        let (r, _, _) = runner(
            r#"{
                "system": { "id": "b1", "mqtt": { "broker": "x" } },
                "controls": [ { "id": "lamp", "pins": 5 } ]
            }"#,
        );
        assert_eq!(
            r.adapter().subscriptions(),
            &[
                "brickmaster/b1/controls/lamp/set".to_string(),
                "brickmaster/b1/script/set".to_string(),
                "brickmaster/b1/syscmd".to_string(),
            ]
        );
    }

    #[test]
    fn client_id_prefers_platform_id() {
        let board = SimBoard::new();
        let transport = MemoryTransport::new();
        let deps = RunnerDeps {
            driver: Box::new(SimulationDriver::with_board(board)),
            transport: Box::new(transport),
            platform: Box::new(FixedPlatform {
                system_id: Some("b827eb123456".into()),
                ..Default::default()
            }),
            clock: Arc::new(ManualClock::new()),
            display_step: Duration::ZERO,
        };
        let cfg = config(r#"{ "system": { "id": "b1", "mqtt": { "broker": "x" } }, "controls": [] }"#);
        let r = CycleRunner::new(cfg, deps).unwrap();
        assert_eq!(r.adapter().options().client_id, "bm2_b827eb123456");
        assert_eq!(r.adapter().options().last_will.1, "offline");
    }
}
