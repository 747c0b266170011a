//! Host platform probes.
//!
//! - `LinuxPlatform` - sysfs/procfs/`sysinfo(2)` backed
//! - `FixedPlatform` - canned answers for tests and simulation

use bm_common::platform::{MemInfo, Platform};
use std::fs;
use std::path::PathBuf;
use tracing::debug;

/// Linux implementation of [`Platform`].
#[derive(Debug, Clone)]
pub struct LinuxPlatform {
    net_root: PathBuf,
    model_path: PathBuf,
}

impl LinuxPlatform {
    /// Probe the running system.
    pub fn new() -> Self {
        Self {
            net_root: PathBuf::from("/sys/class/net"),
            model_path: PathBuf::from("/proc/device-tree/model"),
        }
    }

    /// Probe files under other roots.
    pub fn with_paths(net_root: impl Into<PathBuf>, model_path: impl Into<PathBuf>) -> Self {
        Self {
            net_root: net_root.into(),
            model_path: model_path.into(),
        }
    }
}

impl Default for LinuxPlatform {
    fn default() -> Self {
        Self::new()
    }
}

/// `aa:bb:cc:dd:ee:ff` → `aabbccddeeff`.
pub fn mac_to_id(mac: &str) -> Option<String> {
    let id: String = mac
        .trim()
        .chars()
        .filter(|c| *c != ':')
        .map(|c| c.to_ascii_lowercase())
        .collect();
    (id.len() == 12 && id.chars().all(|c| c.is_ascii_hexdigit()) && id != "000000000000")
        .then_some(id)
}

impl Platform for LinuxPlatform {
    fn system_id(&self, interface: &str) -> Option<String> {
        let path = self.net_root.join(interface).join("address");
        match fs::read_to_string(&path) {
            Ok(mac) => mac_to_id(&mac),
            Err(e) => {
                debug!("No MAC for {interface}: {e}");
                None
            }
        }
    }

    fn board_id(&self) -> String {
        fs::read_to_string(&self.model_path)
            .map(|m| m.trim_end_matches('\0').trim().to_string())
            .ok()
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| format!("Linux {}", std::env::consts::ARCH))
    }

    fn mem_info(&self) -> MemInfo {
        // SAFETY: sysinfo only writes into the zeroed struct we own.
        let mut info: libc::sysinfo = unsafe { std::mem::zeroed() };
        if unsafe { libc::sysinfo(&mut info) } != 0 {
            return MemInfo::default();
        }
        let unit = u64::from(info.mem_unit.max(1));
        let avail = (info.freeram as u64 + info.bufferram as u64) * unit;
        MemInfo {
            avail: Some(avail),
            total: Some(info.totalram as u64 * unit),
        }
    }
}

/// Platform with fixed answers.
#[derive(Debug, Clone, Default)]
pub struct FixedPlatform {
    /// Returned by `system_id`.
    pub system_id: Option<String>,
    /// Returned by `board_id`.
    pub board_id: String,
    /// Returned by `mem_info`.
    pub mem: MemInfo,
}

impl Platform for FixedPlatform {
    fn system_id(&self, _interface: &str) -> Option<String> {
        self.system_id.clone()
    }

    fn board_id(&self) -> String {
        self.board_id.clone()
    }

    fn mem_info(&self) -> MemInfo {
        self.mem
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn mac_parsing() {
        assert_eq!(mac_to_id("B8:27:EB:12:34:56\n").as_deref(), Some("b827eb123456"));
        assert_eq!(mac_to_id("00:00:00:00:00:00"), None);
        assert_eq!(mac_to_id("garbage"), None);
    }

    #[test]
    fn reads_mac_and_model_from_files() {
        let dir = TempDir::new().unwrap();
        let net = dir.path().join("net");
        fs::create_dir_all(net.join("wlan0")).unwrap();
        fs::write(net.join("wlan0/address"), "dc:a6:32:01:02:03\n").unwrap();
        let model = dir.path().join("model");
        fs::write(&model, "Raspberry Pi 4 Model B Rev 1.4\0").unwrap();

        let p = LinuxPlatform::with_paths(&net, &model);
        assert_eq!(p.system_id("wlan0").as_deref(), Some("dca632010203"));
        assert_eq!(p.system_id("eth0"), None);
        assert_eq!(p.board_id(), "Raspberry Pi 4 Model B Rev 1.4");
    }

    #[test]
    fn mem_info_reports_totals() {
        let m = LinuxPlatform::new().mem_info();
        if let (Some(avail), Some(total)) = (m.avail, m.total) {
            assert!(total > 0);
            assert!(avail <= total);
        }
    }
}
