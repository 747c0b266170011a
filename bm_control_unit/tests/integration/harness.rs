//! Simulated node for end-to-end tests.

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use bm_common::platform::{ManualClock, MemInfo};
use bm_control_unit::config::{ConfigSource, load_config};
use bm_control_unit::cycle::{CycleRunner, RunnerDeps};
use bm_hal::{FixedPlatform, SimBoard, SimulationDriver};
use bm_mqtt::MemoryTransport;
use tempfile::TempDir;

/// Topic prefix of the `test` node.
pub const PREFIX: &str = "brickmaster/test";

/// `system` section shared by the tests.
pub const SYSTEM: &str = r#""system": { "id": "test", "name": "Test Brick", "mqtt": { "broker": "localhost" }, "i2c": true }"#;

pub struct Node {
    pub runner: CycleRunner,
    pub board: SimBoard,
    pub broker: MemoryTransport,
    pub clock: ManualClock,
    _dir: TempDir,
}

impl Node {
    /// Write `config` and `scripts` into a temp dir and assemble the node.
    ///
    /// Scripts land in `scripts/`; point the config at them with
    /// `"scripts": { "dir": "scripts", "scan_dir": true }`.
    pub fn start(config: &str, scripts: &[(&str, &str)]) -> Self {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("scripts")).unwrap();
        for (file, body) in scripts {
            fs::write(dir.path().join("scripts").join(file), body).unwrap();
        }
        let path = dir.path().join("config.json");
        fs::write(&path, config).unwrap();
        let config = load_config(&ConfigSource::File(path)).unwrap();

        let board = SimBoard::new();
        let broker = MemoryTransport::new();
        broker.set_online(true);
        let clock = ManualClock::new();
        let deps = RunnerDeps {
            driver: Box::new(SimulationDriver::with_board(board.clone())),
            transport: Box::new(broker.clone()),
            platform: Box::new(FixedPlatform {
                system_id: None,
                board_id: "Simulated Board".into(),
                mem: MemInfo {
                    avail: Some(512 * 1024),
                    total: Some(1024 * 1024),
                },
            }),
            clock: Arc::new(clock.clone()),
            display_step: Duration::ZERO,
        };
        let runner = CycleRunner::new(config, deps).unwrap();
        Self {
            runner,
            board,
            broker,
            clock,
            _dir: dir,
        }
    }

    /// Current clock reading [ms].
    pub fn now_ms(&self) -> u64 {
        use bm_common::platform::Clock;
        self.clock.now().as_millis() as u64
    }

    pub fn tick(&mut self) {
        self.runner.tick().unwrap();
    }

    /// Jump to `ms` and run one iteration.
    pub fn at(&mut self, ms: u64) {
        self.clock.set(Duration::from_millis(ms));
        self.tick();
    }

    /// Step the clock by `step_ms` and tick until `until_ms` is reached.
    pub fn run_until(&mut self, until_ms: u64, step_ms: u64) {
        while self.now_ms() < until_ms {
            self.clock.advance(Duration::from_millis(step_ms));
            self.tick();
        }
    }

    /// Inject a broker message on `PREFIX/<suffix>`.
    pub fn send(&self, suffix: &str, payload: &str) {
        self.broker.inject(&format!("{PREFIX}/{suffix}"), payload);
    }

    /// Payloads published on `PREFIX/<suffix>`, oldest first.
    pub fn payloads(&self, suffix: &str) -> Vec<String> {
        self.broker
            .published_on(&format!("{PREFIX}/{suffix}"))
            .into_iter()
            .map(|p| p.payload)
            .collect()
    }

    /// Level of on-board line `line`.
    pub fn pin(&self, line: u16) -> bool {
        self.board.onboard(line)
    }
}
