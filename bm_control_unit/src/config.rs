//! Runtime configuration sources and script loading.
//!
//! The document itself is parsed and validated by `bm_common::config`.
//! This module picks the source (local file or URL), applies the
//! control-level defaults that depend on `system`, and loads script files.

use std::path::PathBuf;
use std::time::Duration;

use bm_common::config::{BrickConfig, ConfigError};
use tracing::{error, info, warn};

use crate::script::Script;

/// Timeout of a `--netconfig` fetch.
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

// ─── Sources ────────────────────────────────────────────────────────

/// Where the configuration document comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Local JSON file.
    File(PathBuf),
    /// HTTP(S) URL returning the same JSON document.
    Net(String),
}

/// Load, validate and complete the configuration.
///
/// A network document resolves relative script paths against the current
/// directory.
///
/// # Errors
/// Any `ConfigError` from reading, fetching or validating.
pub fn load_config(source: &ConfigSource) -> Result<BrickConfig, ConfigError> {
    let mut config = match source {
        ConfigSource::File(path) => BrickConfig::load(path)?,
        ConfigSource::Net(url) => {
            let body = fetch(url)?;
            BrickConfig::from_json_str(&body, PathBuf::from("."))?
        }
    };
    apply_control_defaults(&mut config);
    Ok(config)
}

fn fetch(url: &str) -> Result<String, ConfigError> {
    info!("Fetching configuration from {url}");
    let client = reqwest::blocking::Client::builder()
        .timeout(FETCH_TIMEOUT)
        .build()
        .map_err(|e| ConfigError::FetchError(e.to_string()))?;
    client
        .get(url)
        .send()
        .and_then(reqwest::blocking::Response::error_for_status)
        .and_then(reqwest::blocking::Response::text)
        .map_err(|e| ConfigError::FetchError(format!("{url}: {e}")))
}

/// Controls without their own `publish_time` inherit `system.publish_time`.
pub fn apply_control_defaults(config: &mut BrickConfig) {
    let inherited = config.system.publish_time;
    for control in &mut config.controls {
        control.publish_time.get_or_insert(inherited);
    }
}

// ─── Scripts ────────────────────────────────────────────────────────

/// Load every configured script against the known control ids.
///
/// A script that fails to load is dropped with a critical log line.
pub fn load_scripts(config: &BrickConfig, control_ids: &[String]) -> Vec<Script> {
    let paths = config.scripts.script_paths(&config.base_dir);
    let mut scripts = Vec::with_capacity(paths.len());
    for path in paths {
        match Script::load(&path, control_ids) {
            Ok(script) => {
                warn_unknown_displays(config, &script);
                scripts.push(script);
            }
            Err(e) => error!("CRITICAL: dropping script {}: {e}", path.display()),
        }
    }
    info!("{} script(s) loaded", scripts.len());
    scripts
}

fn warn_unknown_displays(config: &BrickConfig, script: &Script) {
    let map = script.display_map();
    for id in [&map.met, &map.alt, &map.vel].into_iter().flatten() {
        if !config.displays.iter().any(|d| &d.id == id) {
            warn!("script '{}': display_map names unknown display '{id}'", script.name());
        }
    }
}
