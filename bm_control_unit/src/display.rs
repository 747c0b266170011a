//! 4-digit 7-segment display wrapper.

use bm_common::hal::config::{DisplayConfig, IdleMode};
use bm_common::hal::driver::{GpioDriver, HalError, SegmentDriver};
use bm_common::hal::types::{DisplayKind, Indicators};
use chrono::{NaiveDateTime, Timelike, Datelike};
use std::time::Duration;
use tracing::{debug, info};

/// Which wall-clock field to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateField {
    /// `HH:MM`
    Time,
    /// `MM.DD`
    Date,
}

/// One display and its idle behaviour.
pub struct Display {
    id: String,
    kind: DisplayKind,
    address: u8,
    idle: IdleMode,
    clock_hours: u8,
    brightness: f32,
    segments: Box<dyn SegmentDriver>,
    shown: Option<(String, Indicators)>,
}

impl std::fmt::Debug for Display {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Display")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("address", &format_args!("0x{:02x}", self.address))
            .field("idle", &self.idle)
            .finish()
    }
}

impl Display {
    /// Open the display, set brightness and run the digit sweep.
    ///
    /// `step` is the pause between sweep frames.
    pub fn open(
        config: &DisplayConfig,
        driver: &mut dyn GpioDriver,
        step: Duration,
    ) -> Result<Self, HalError> {
        let address = config
            .i2c_address()
            .map_err(|e| HalError::ConfigError(e.to_string()))?;
        let segments = driver.open_display(config.kind, address)?;
        let mut opened = Self {
            id: config.id.clone(),
            kind: config.kind,
            address,
            idle: config.idle.show(),
            clock_hours: config.idle.clock_hours(),
            brightness: config.idle.brightness(),
            segments,
            shown: None,
        };
        opened.segments.set_brightness(opened.brightness)?;
        opened.self_test(step)?;
        info!(
            "Display '{}' ({:?}) at 0x{:02x}, idle {:?}",
            opened.id, opened.kind, address, opened.idle
        );
        Ok(opened)
    }

    /// Display id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Device class.
    pub fn kind(&self) -> DisplayKind {
        self.kind
    }

    /// Bus address.
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Last text written, if any.
    pub fn shown(&self) -> Option<&str> {
        self.shown.as_ref().map(|(text, _)| text.as_str())
    }

    /// Sweep 0–9 on all digits, dots lit on even digits, then blank.
    fn self_test(&mut self, step: Duration) -> Result<(), HalError> {
        for digit in 0..=9u8 {
            let text: String = std::iter::repeat_n(char::from(b'0' + digit), 4).collect();
            self.segments.write_text(&text)?;
            let dots = if digit % 2 == 0 {
                Indicators::DOTS
            } else {
                Indicators::empty()
            };
            self.segments.set_indicators(dots)?;
            if !step.is_zero() {
                std::thread::sleep(step);
            }
        }
        debug!("Display '{}' self-test done", self.id);
        self.off()
    }

    fn render(&mut self, text: &str, indicators: Indicators) -> Result<(), HalError> {
        if self
            .shown
            .as_ref()
            .is_some_and(|(t, i)| t == text && *i == indicators)
        {
            return Ok(());
        }
        self.segments.write_text(text)?;
        self.segments.set_indicators(indicators)?;
        self.shown = Some((text.to_string(), indicators));
        Ok(())
    }

    /// Write up to four characters.
    pub fn show(&mut self, text: &str) -> Result<(), HalError> {
        self.render(text, Indicators::empty())
    }

    /// Render `HH:MM` or `MM.DD` from `at`.
    ///
    /// On a 12-hour clock the big variant lights its AM/PM indicator
    /// in the afternoon.
    pub fn show_datetime(
        &mut self,
        field: DateField,
        clock_hours: u8,
        at: NaiveDateTime,
    ) -> Result<(), HalError> {
        let mut indicators = Indicators::empty();
        let text = match field {
            DateField::Time => {
                let hour = if clock_hours == 12 {
                    let (pm, h12) = at.hour12();
                    if pm && self.kind.has_ampm() {
                        indicators |= Indicators::AMPM;
                    }
                    h12
                } else {
                    at.hour()
                };
                format!("{hour:02}:{:02}", at.minute())
            }
            DateField::Date => format!("{:02}.{:02}", at.month(), at.day()),
        };
        self.render(&text, indicators)
    }

    /// Idle view: time, date or blank.
    pub fn show_idle(&mut self, at: NaiveDateTime) -> Result<(), HalError> {
        match self.idle {
            IdleMode::Time => self.show_datetime(DateField::Time, self.clock_hours, at),
            IdleMode::Date => self.show_datetime(DateField::Date, self.clock_hours, at),
            IdleMode::Blank => self.off(),
        }
    }

    /// Clear all segments and indicators.
    pub fn off(&mut self) -> Result<(), HalError> {
        if self
            .shown
            .as_ref()
            .is_some_and(|(t, i)| t.is_empty() && i.is_empty())
        {
            return Ok(());
        }
        self.segments.clear()?;
        self.shown = Some((String::new(), Indicators::empty()));
        Ok(())
    }
}

/// Owning container of displays, in config order.
#[derive(Debug, Default)]
pub struct Displays {
    items: Vec<Display>,
}

impl Displays {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a display.
    pub fn push(&mut self, display: Display) {
        self.items.push(display);
    }

    /// Look up by id, mutably.
    pub fn get_mut(&mut self, id: &str) -> Option<&mut Display> {
        self.items.iter_mut().find(|d| d.id == id)
    }

    /// Look up by id.
    pub fn get(&self, id: &str) -> Option<&Display> {
        self.items.iter().find(|d| d.id == id)
    }

    /// All displays, mutably.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Display> {
        self.items.iter_mut()
    }

    /// Number of displays.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
