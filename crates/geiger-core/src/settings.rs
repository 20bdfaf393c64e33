//! User settings and their persistence
//!
//! Thresholds are stored as [`MilliUnits`], thousandths of the displayed
//! unit (µSv/h for the current threshold, mSv for the cumulative one). On
//! disk the settings are a single format byte followed by the `postcard`
//! encoding of [`Settings`].

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::alarm::AlarmConfig;
use crate::error::SettingsError;

/// Format byte written in front of every encoded [`Settings`]
pub const SETTINGS_FORMAT_VERSION: u8 = 1;

/// Upper bound of an encoded [`Settings`], format byte included
pub const SETTINGS_MAX_BYTES: usize = 32;

/// Fixed-point value with three decimals.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct MilliUnits(pub u32);

impl MilliUnits {
    pub const SCALE: u32 = 1000;

    /// Convert from a float, rounding to the nearest thousandth.
    ///
    /// Negative and non-finite inputs become zero; the upper end saturates.
    pub fn from_f32(value: f32) -> Self {
        if !value.is_finite() || value <= 0.0 {
            return Self(0);
        }
        let scaled = libm::roundf(value * Self::SCALE as f32);
        if scaled >= u32::MAX as f32 {
            Self(u32::MAX)
        } else {
            Self(scaled as u32)
        }
    }

    pub fn as_f32(self) -> f32 {
        self.0 as f32 / Self::SCALE as f32
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    /// Dose-rate alarm threshold, µSv/h
    pub current_alarm_threshold: MilliUnits,
    /// Cumulative dose alarm threshold, mSv
    pub cumulative_alarm_threshold: MilliUnits,
    pub alarm_enabled: bool,
    pub auto_connect_on_startup: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            current_alarm_threshold: MilliUnits(5_000),
            cumulative_alarm_threshold: MilliUnits(1_000),
            alarm_enabled: false,
            auto_connect_on_startup: false,
        }
    }
}

impl Settings {
    /// Thresholds in the form the alarm evaluator consumes.
    pub fn alarm_config(&self) -> AlarmConfig {
        AlarmConfig {
            current_threshold: self.current_alarm_threshold.as_f32(),
            cumulative_threshold: self.cumulative_alarm_threshold.as_f32(),
            enabled: self.alarm_enabled,
        }
    }

    /// Encode into `buf`, returning the used prefix.
    pub fn to_bytes<'a>(&self, buf: &'a mut [u8]) -> Result<&'a [u8], SettingsError> {
        let (version, body) = buf.split_first_mut().ok_or(SettingsError::Encode)?;
        *version = SETTINGS_FORMAT_VERSION;
        let used = postcard::to_slice(self, body)
            .map_err(|_| SettingsError::Encode)?
            .len();
        Ok(&buf[..used + 1])
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SettingsError> {
        match bytes.split_first() {
            Some((&SETTINGS_FORMAT_VERSION, body)) => {
                postcard::from_bytes(body).map_err(|_| SettingsError::Decode)
            }
            Some((&version, _)) => Err(SettingsError::UnsupportedVersion(version)),
            None => Err(SettingsError::Decode),
        }
    }
}

/// A single edit made from the settings screen or the web dashboard.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SettingsChange {
    CurrentThreshold(f32),
    CumulativeThreshold(f32),
    AlarmEnabled(bool),
    AutoConnect(bool),
}

impl SettingsChange {
    /// Apply to `settings`. Returns `true` when the alarm configuration changed.
    pub fn apply(self, settings: &mut Settings) -> bool {
        let before = settings.alarm_config();
        match self {
            Self::CurrentThreshold(value) => {
                settings.current_alarm_threshold = MilliUnits::from_f32(value);
            }
            Self::CumulativeThreshold(value) => {
                settings.cumulative_alarm_threshold = MilliUnits::from_f32(value);
            }
            Self::AlarmEnabled(enabled) => settings.alarm_enabled = enabled,
            Self::AutoConnect(enabled) => settings.auto_connect_on_startup = enabled,
        }
        settings.alarm_config() != before
    }
}

/// Persistent home of the [`Settings`].
pub trait SettingsStore {
    /// `Ok(None)` when nothing has been saved yet.
    fn load(&mut self) -> Result<Option<Settings>, SettingsError>;

    fn save(&mut self, settings: &Settings) -> Result<(), SettingsError>;

    /// Load the stored settings, falling back to defaults on any failure.
    fn load_or_default(&mut self) -> Settings {
        match self.load() {
            Ok(Some(settings)) => {
                info!("Loaded settings: {:?}", settings);
                settings
            }
            Ok(None) => {
                info!("No stored settings, using defaults");
                Settings::default()
            }
            Err(e) => {
                warn!("Failed to load settings ({}), using defaults", e);
                Settings::default()
            }
        }
    }
}

/// Store that keeps the encoded settings in RAM.
///
/// Goes through the same byte encoding as the SD card store.
#[derive(Debug, Clone, Default)]
pub struct MemorySettingsStore {
    bytes: heapless::Vec<u8, SETTINGS_MAX_BYTES>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw stored bytes, empty until the first save.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Replace the stored bytes as-is.
    pub fn set_bytes(&mut self, bytes: &[u8]) -> Result<(), SettingsError> {
        self.bytes = heapless::Vec::from_slice(bytes)
            .map_err(|_| SettingsError::Storage("settings too large"))?;
        Ok(())
    }
}

impl SettingsStore for MemorySettingsStore {
    fn load(&mut self) -> Result<Option<Settings>, SettingsError> {
        if self.bytes.is_empty() {
            return Ok(None);
        }
        Settings::from_bytes(&self.bytes).map(Some)
    }

    fn save(&mut self, settings: &Settings) -> Result<(), SettingsError> {
        let mut buf = [0u8; SETTINGS_MAX_BYTES];
        let encoded = settings.to_bytes(&mut buf)?;
        self.set_bytes(encoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_milli_units_conversion() {
        assert_eq!(MilliUnits::from_f32(5.0), MilliUnits(5000));
        assert_eq!(MilliUnits::from_f32(0.1234), MilliUnits(123));
        assert_eq!(MilliUnits::from_f32(-1.0), MilliUnits(0));
        assert_eq!(MilliUnits::from_f32(f32::NAN), MilliUnits(0));
        assert!((MilliUnits(2500).as_f32() - 2.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_defaults_match_device() {
        let config = Settings::default().alarm_config();

        assert_eq!(config.current_threshold, 5.0);
        assert_eq!(config.cumulative_threshold, 1.0);
        assert!(!config.enabled);
    }

    #[test]
    fn test_store_keeps_saved_settings() {
        let mut store = MemorySettingsStore::new();
        let settings = Settings {
            current_alarm_threshold: MilliUnits(750),
            cumulative_alarm_threshold: MilliUnits(20_000),
            alarm_enabled: true,
            auto_connect_on_startup: true,
        };

        store.save(&settings).unwrap();

        assert_eq!(store.bytes()[0], SETTINGS_FORMAT_VERSION);
        assert_eq!(store.load().unwrap(), Some(settings));
    }

    #[test]
    fn test_empty_store_loads_defaults() {
        let mut store = MemorySettingsStore::new();

        assert_eq!(store.load().unwrap(), None);
        assert_eq!(store.load_or_default(), Settings::default());
    }

    #[test]
    fn test_unknown_version_is_rejected() {
        let mut store = MemorySettingsStore::new();
        store.set_bytes(&[9, 1, 2, 3]).unwrap();

        assert_eq!(store.load(), Err(SettingsError::UnsupportedVersion(9)));
        assert_eq!(store.load_or_default(), Settings::default());
    }

    #[test]
    fn test_truncated_bytes_fail_to_decode() {
        let mut buf = [0u8; SETTINGS_MAX_BYTES];
        let encoded = Settings::default().to_bytes(&mut buf).unwrap();
        let truncated = &encoded[..encoded.len() - 2];

        assert_eq!(Settings::from_bytes(truncated), Err(SettingsError::Decode));
        assert_eq!(Settings::from_bytes(&[]), Err(SettingsError::Decode));
    }

    #[test]
    fn test_encode_into_tiny_buffer_fails() {
        let mut buf = [0u8; 2];

        assert_eq!(
            Settings::default().to_bytes(&mut buf),
            Err(SettingsError::Encode)
        );
    }

    #[test]
    fn test_change_reports_alarm_updates() {
        let mut settings = Settings::default();

        assert!(SettingsChange::AlarmEnabled(true).apply(&mut settings));
        assert!(SettingsChange::CurrentThreshold(0.5).apply(&mut settings));
        assert!(!SettingsChange::AutoConnect(true).apply(&mut settings));
        assert!(!SettingsChange::CurrentThreshold(0.5).apply(&mut settings));

        assert_eq!(settings.current_alarm_threshold, MilliUnits(500));
        assert!(settings.auto_connect_on_startup);
    }
}
