//! Platform interface.
//!
//! The core reaches the host only through these traits: a monotonic
//! clock, the MAC-derived system id, a board id and a memory probe.
//! Pins, I²C and MQTT live behind their own traits in `hal` and `bm_mqtt`.

use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Monotonic time source.
pub trait Clock {
    /// Time since an arbitrary fixed origin.
    fn now(&self) -> Duration;
}

/// `Instant`-backed clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Clock whose origin is now.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Hand-driven clock for tests. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    millis: Arc<AtomicU64>,
}

impl ManualClock {
    /// Clock at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Jump to an absolute time.
    pub fn set(&self, at: Duration) {
        self.millis.store(at.as_millis() as u64, Ordering::SeqCst);
    }

    /// Move forward.
    pub fn advance(&self, by: Duration) {
        self.millis.fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_millis(self.millis.load(Ordering::SeqCst))
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> Duration {
        (**self).now()
    }
}

/// One memory sample. `None` means the platform cannot report it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemInfo {
    /// Available bytes.
    pub avail: Option<u64>,
    /// Total bytes.
    pub total: Option<u64>,
}

impl MemInfo {
    /// Percent available, one decimal.
    pub fn pct_avail(&self) -> Option<f64> {
        match (self.avail, self.total) {
            (Some(a), Some(t)) if t > 0 => Some(((a as f64 / t as f64) * 1000.0).round() / 10.0),
            _ => None,
        }
    }

    /// Percent used, one decimal.
    pub fn pct_used(&self) -> Option<f64> {
        self.pct_avail().map(|p| ((100.0 - p) * 10.0).round() / 10.0)
    }

    /// The `meminfo` payload. Unknown values are the string `"Unknown"`.
    pub fn to_json(&self) -> Value {
        fn or_unknown<T: Into<Value>>(v: Option<T>) -> Value {
            v.map(Into::into).unwrap_or_else(|| Value::from("Unknown"))
        }
        json!({
            "mem_avail": or_unknown(self.avail),
            "mem_total": or_unknown(self.total),
            "pct_used": or_unknown(self.pct_used()),
            "pct_avail": or_unknown(self.pct_avail()),
        })
    }
}

/// Host queries.
pub trait Platform {
    /// System id derived from the MAC address of `interface`, if readable.
    fn system_id(&self, interface: &str) -> Option<String>;

    /// Board description.
    fn board_id(&self) -> String;

    /// Current memory sample.
    fn mem_info(&self) -> MemInfo;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_shared_between_clones() {
        let clock = ManualClock::new();
        let other = clock.clone();
        clock.advance(Duration::from_millis(1500));
        assert_eq!(other.now(), Duration::from_millis(1500));
        other.set(Duration::from_secs(10));
        assert_eq!(clock.now(), Duration::from_secs(10));
    }

    #[test]
    fn meminfo_percentages() {
        let m = MemInfo {
            avail: Some(250),
            total: Some(1000),
        };
        assert_eq!(m.pct_avail(), Some(25.0));
        assert_eq!(m.pct_used(), Some(75.0));
        let v = m.to_json();
        assert_eq!(v["mem_avail"], 250);
        assert_eq!(v["pct_used"], 75.0);
    }

    #[test]
    fn meminfo_unknown() {
        let v = MemInfo::default().to_json();
        assert_eq!(v["mem_total"], "Unknown");
        assert_eq!(v["pct_avail"], "Unknown");
    }
}
