//! # BrickMaster
//!
//! MQTT control node for toy-brick layouts.
//!
//! Loads the node configuration from a file (`--config`) or a URL
//! (`--netconfig`), takes the PID file, assembles pins, controls,
//! displays and scripts on the selected GPIO driver, and runs the main
//! loop until a signal arrives.

use bm_common::config::{BrickConfig, SystemConfig};
use bm_common::platform::SystemClock;
use bm_control_unit::config::{ConfigSource, load_config};
use bm_control_unit::cycle::{CycleRunner, ExitReason, RunnerDeps};
use bm_control_unit::error::CoreError;
use bm_control_unit::pidfile::PidFile;
use bm_control_unit::signals::Signals;
use bm_hal::{DriverRegistry, LinuxPlatform};
use bm_mqtt::RumqttcTransport;
use clap::{ArgGroup, Parser};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Level, error, info};
use tracing_subscriber::EnvFilter;

/// Pause between display self-test frames.
const DISPLAY_STEP: Duration = Duration::from_millis(100);

/// BrickMaster control node
#[derive(Parser, Debug)]
#[command(name = "brickmaster")]
#[command(author = "BrickMaster developers")]
#[command(version)]
#[command(about = "MQTT control node for lights, displays and scripts")]
#[command(group(ArgGroup::new("source").required(true).args(["config", "netconfig"])))]
struct Args {
    /// Path to the JSON configuration file.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// URL of the JSON configuration.
    #[arg(long, value_name = "URL")]
    netconfig: Option<String>,

    /// Print the effective configuration and exit.
    #[arg(long)]
    dumpconfig: bool,

    /// Directory for the PID file (default: system temp dir).
    #[arg(long, value_name = "DIR")]
    rundir: Option<PathBuf>,

    /// Initialise everything, clean up and exit 0.
    #[arg(long)]
    test: bool,

    /// Use the simulation driver (same as `--driver simulation`).
    #[arg(long)]
    simulate: bool,

    /// GPIO driver name.
    #[arg(long, default_value = "sysfs")]
    driver: String,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

impl Args {
    fn source(&self) -> ConfigSource {
        match (&self.config, &self.netconfig) {
            (Some(path), _) => ConfigSource::File(path.clone()),
            (None, Some(url)) => ConfigSource::Net(url.clone()),
            // Unreachable: clap requires one of the group.
            (None, None) => ConfigSource::File(PathBuf::from("config.json")),
        }
    }

    fn driver_name(&self) -> &str {
        if self.simulate { "simulation" } else { &self.driver }
    }
}

fn main() {
    let args = Args::parse();
    let loaded = load_config(&args.source());
    setup_tracing(&args, loaded.as_ref().ok().map(|c| &c.system));

    info!("BrickMaster v{} starting...", env!("CARGO_PKG_VERSION"));

    let code = match loaded {
        Ok(config) => match run(&args, config) {
            Ok(code) => code,
            Err(e) => {
                error!("FATAL: {e}");
                1
            }
        },
        Err(e) => {
            error!("FATAL: {}", CoreError::from(e));
            1
        }
    };

    info!("BrickMaster shutdown complete (exit {code})");
    process::exit(code);
}

fn run(args: &Args, config: BrickConfig) -> Result<i32, CoreError> {
    if args.dumpconfig {
        println!("{}", config.to_json_pretty());
        return Ok(0);
    }

    let rundir = args.rundir.clone().unwrap_or_else(std::env::temp_dir);
    let pid = PidFile::acquire(&rundir)?;
    info!("PID file {}", pid.path().display());

    let signals = Signals::install()?;
    let driver = DriverRegistry::with_builtin().create_driver(args.driver_name())?;
    let deps = RunnerDeps {
        driver,
        transport: Box::new(RumqttcTransport::new()),
        platform: Box::new(LinuxPlatform::new()),
        clock: Arc::new(SystemClock::new()),
        display_step: DISPLAY_STEP,
    };
    let mut runner = CycleRunner::new(config, deps)?;

    if args.test {
        info!("--test: initialisation OK");
        runner.cleanup();
        return Ok(0);
    }

    let ExitReason::Signal(code) = runner.run(&signals)?;
    Ok(code)
}

/// Setup tracing subscriber from the config level and CLI flags.
fn setup_tracing(args: &Args, system: Option<&SystemConfig>) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        system.map_or(Level::INFO, |s| s.log_level.as_tracing())
    };

    let mut filter = EnvFilter::from_default_env().add_directive(level.into());
    if system.is_some_and(|s| s.mqtt.log)
        && let Ok(directive) = "rumqttc=debug".parse()
    {
        filter = filter.add_directive(directive);
    }

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bm_common::config::ConfigError;

    #[test]
    fn config_and_netconfig_are_exclusive() {
        assert!(Args::try_parse_from(["brickmaster"]).is_err());
        assert!(
            Args::try_parse_from(["brickmaster", "--config", "a.json", "--netconfig", "http://x/"])
                .is_err()
        );
        let args = Args::try_parse_from(["brickmaster", "--netconfig", "http://x/c.json"]).unwrap();
        assert_eq!(args.source(), ConfigSource::Net("http://x/c.json".into()));
    }

    #[test]
    fn simulate_overrides_driver() {
        let args = Args::try_parse_from(["brickmaster", "--config", "a.json", "--simulate"]).unwrap();
        assert_eq!(args.driver_name(), "simulation");
        let args = Args::try_parse_from(["brickmaster", "--config", "a.json"]).unwrap();
        assert_eq!(args.driver_name(), "sysfs");
    }

    #[test]
    fn fatal_config_maps_to_core_error() {
        let err = CoreError::from(ConfigError::FileNotFound("x".into()));
        assert!(err.to_string().contains("not found"));
    }
}
