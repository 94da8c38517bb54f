// SPDX-License-Identifier: GPL-3.0-only

//! Client-visible camera settings and their persistence.
//!
//! [`CameraSettings`] is the single source of truth for desired camera
//! behavior. Out-of-range input is clamped on the way in, never stored
//! raw. The record lives behind a [`SettingsStore`] so the foreground and
//! the reconciliation side read and write it through one synchronized
//! owner with copy-out reads.

use crate::backends::camera::types::AwbMode;
use crate::constants::{EXPOSURE_RANGE_S, FOCUS_RANGE_MM};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Client-visible exposure mode. `Auto` resolves to the device's normal
/// AE program; `Custom` selects fully manual exposure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExposureMode {
    #[default]
    Auto,
    Normal,
    Short,
    Long,
    Custom,
}

impl ExposureMode {
    /// Parse a stored mode string, defaulting to `Auto` on unknown input
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "auto" => ExposureMode::Auto,
            "normal" => ExposureMode::Normal,
            "short" => ExposureMode::Short,
            "long" => ExposureMode::Long,
            "custom" => ExposureMode::Custom,
            _ => ExposureMode::Auto,
        }
    }

    /// Stored string form, the inverse of [`ExposureMode::parse`]
    pub fn as_str(&self) -> &'static str {
        match self {
            ExposureMode::Auto => "auto",
            ExposureMode::Normal => "normal",
            ExposureMode::Short => "short",
            ExposureMode::Long => "long",
            ExposureMode::Custom => "custom",
        }
    }
}

/// Clamp a requested focus distance into the valid range
pub fn clamp_focus_mm(value: i64) -> u32 {
    let (min, max) = FOCUS_RANGE_MM;
    value.clamp(i64::from(min), i64::from(max)) as u32
}

/// Clamp a requested exposure time into the valid range.
///
/// Non-finite input falls back to the minimum rather than poisoning the
/// record.
pub fn clamp_exposure_s(value: f64) -> f64 {
    let (min, max) = EXPOSURE_RANGE_S;
    if !value.is_finite() {
        return min;
    }
    value.clamp(min, max)
}

/// The settings record mutated by user intents and by device feedback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraSettings {
    pub brightness: f32,
    pub contrast: f32,
    pub saturation: f32,
    pub sharpness: f32,
    pub awb_mode: AwbMode,
    pub exposure_mode: ExposureMode,
    /// Manual focus distance in millimeters
    pub focus_mm: u32,
    /// Manual exposure time in seconds
    pub exposure_s: f64,
    /// Mechanical accessory lens offset, never applied to the device
    pub lens1_pos: i32,
    /// Mechanical accessory lens offset, never applied to the device
    pub lens2_pos: i32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            brightness: 0.0,
            contrast: 1.0,
            saturation: 1.0,
            sharpness: 1.0,
            awb_mode: AwbMode::Auto,
            exposure_mode: ExposureMode::Auto,
            focus_mm: 1000,
            exposure_s: 3.0,
            lens1_pos: 0,
            lens2_pos: 0,
        }
    }
}

impl CameraSettings {
    /// Set the focus distance, clamping into the valid range
    pub fn set_focus_mm(&mut self, value: i64) {
        self.focus_mm = clamp_focus_mm(value);
    }

    /// Set the exposure time, clamping into the valid range
    pub fn set_exposure_s(&mut self, value: f64) {
        self.exposure_s = clamp_exposure_s(value);
    }

    /// Set a tone control; negative input clamps to zero
    pub fn set_contrast(&mut self, value: f32) {
        self.contrast = value.max(0.0);
    }

    pub fn set_saturation(&mut self, value: f32) {
        self.saturation = value.max(0.0);
    }

    pub fn set_sharpness(&mut self, value: f32) {
        self.sharpness = value.max(0.0);
    }
}

/// Shared owner of the settings record.
///
/// Reads are copy-out snapshots; writes go through a closure holding the
/// lock, so no raw shared mutable field ever crosses the producer and
/// foreground boundary.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    inner: Arc<Mutex<CameraSettings>>,
}

impl SettingsStore {
    pub fn new(settings: CameraSettings) -> Self {
        Self {
            inner: Arc::new(Mutex::new(settings)),
        }
    }

    /// Copy-out read of the whole record
    pub fn snapshot(&self) -> CameraSettings {
        self.inner.lock().unwrap().clone()
    }

    /// Mutate the record under the lock
    pub fn update<R>(&self, f: impl FnOnce(&mut CameraSettings) -> R) -> R {
        let mut guard = self.inner.lock().unwrap();
        f(&mut guard)
    }
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self::new(CameraSettings::default())
    }
}

/// Flat key-value preference store, no schema versioning.
///
/// The session reads every settings field through this on startup and
/// writes every field back on shutdown.
pub trait PreferenceStore: Send + Sync {
    fn get_f64(&self, key: &str, default: f64) -> f64;
    fn get_i64(&self, key: &str, default: i64) -> i64;
    fn get_str(&self, key: &str, default: &str) -> String;
    fn set_f64(&self, key: &str, value: f64);
    fn set_i64(&self, key: &str, value: i64);
    fn set_str(&self, key: &str, value: &str);
}

/// JSON-file backed preference store.
///
/// Each `set` writes through to disk; a write failure is logged, not
/// propagated, since losing a preference must never take the session
/// down.
pub struct JsonPreferenceStore {
    path: PathBuf,
    values: Mutex<BTreeMap<String, Value>>,
}

impl JsonPreferenceStore {
    /// Open or create a store at the given path
    pub fn open(path: PathBuf) -> Self {
        let values = match std::fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str::<BTreeMap<String, Value>>(&text) {
                Ok(map) => map,
                Err(err) => {
                    warn!(path = %path.display(), %err, "Malformed preference file, starting empty");
                    BTreeMap::new()
                }
            },
            Err(_) => BTreeMap::new(),
        };
        debug!(path = %path.display(), entries = values.len(), "Opened preference store");
        Self {
            path,
            values: Mutex::new(values),
        }
    }

    /// Open the store at the default per-user location
    pub fn open_default() -> Self {
        let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::open(base.join("spectrocam").join("settings.json"))
    }

    fn persist(&self, values: &BTreeMap<String, Value>) {
        if let Some(parent) = self.path.parent() {
            if let Err(err) = std::fs::create_dir_all(parent) {
                warn!(path = %self.path.display(), %err, "Failed to create preference directory");
                return;
            }
        }
        match serde_json::to_string_pretty(values) {
            Ok(text) => {
                if let Err(err) = std::fs::write(&self.path, text) {
                    warn!(path = %self.path.display(), %err, "Failed to write preferences");
                }
            }
            Err(err) => warn!(%err, "Failed to serialize preferences"),
        }
    }

    fn set_value(&self, key: &str, value: Value) {
        let mut values = self.values.lock().unwrap();
        values.insert(key.to_string(), value);
        self.persist(&values);
    }
}

impl PreferenceStore for JsonPreferenceStore {
    fn get_f64(&self, key: &str, default: f64) -> f64 {
        self.values
            .lock()
            .unwrap()
            .get(key)
            .and_then(Value::as_f64)
            .unwrap_or(default)
    }

    fn get_i64(&self, key: &str, default: i64) -> i64 {
        self.values
            .lock()
            .unwrap()
            .get(key)
            .and_then(Value::as_i64)
            .unwrap_or(default)
    }

    fn get_str(&self, key: &str, default: &str) -> String {
        self.values
            .lock()
            .unwrap()
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| default.to_string())
    }

    fn set_f64(&self, key: &str, value: f64) {
        self.set_value(key, Value::from(value));
    }

    fn set_i64(&self, key: &str, value: i64) {
        self.set_value(key, Value::from(value));
    }

    fn set_str(&self, key: &str, value: &str) {
        self.set_value(key, Value::from(value));
    }
}

/// In-memory preference store for tests
#[derive(Default)]
pub struct MemoryPreferenceStore {
    values: Mutex<BTreeMap<String, Value>>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn get_f64(&self, key: &str, default: f64) -> f64 {
        self.values
            .lock()
            .unwrap()
            .get(key)
            .and_then(Value::as_f64)
            .unwrap_or(default)
    }

    fn get_i64(&self, key: &str, default: i64) -> i64 {
        self.values
            .lock()
            .unwrap()
            .get(key)
            .and_then(Value::as_i64)
            .unwrap_or(default)
    }

    fn get_str(&self, key: &str, default: &str) -> String {
        self.values
            .lock()
            .unwrap()
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| default.to_string())
    }

    fn set_f64(&self, key: &str, value: f64) {
        self.values.lock().unwrap().insert(key.to_string(), Value::from(value));
    }

    fn set_i64(&self, key: &str, value: i64) {
        self.values.lock().unwrap().insert(key.to_string(), Value::from(value));
    }

    fn set_str(&self, key: &str, value: &str) {
        self.values.lock().unwrap().insert(key.to_string(), Value::from(value));
    }
}

/// Load every settings field from the store, clamping numeric fields and
/// defaulting unknown enum strings
pub fn load_settings(store: &dyn PreferenceStore) -> CameraSettings {
    let defaults = CameraSettings::default();
    let mut settings = CameraSettings {
        brightness: store.get_f64("brightness", f64::from(defaults.brightness)) as f32,
        awb_mode: AwbMode::parse(&store.get_str("awb_mode", defaults.awb_mode.as_str())),
        exposure_mode: ExposureMode::parse(
            &store.get_str("exposure_mode", defaults.exposure_mode.as_str()),
        ),
        lens1_pos: store.get_i64("lens1_pos", i64::from(defaults.lens1_pos)) as i32,
        lens2_pos: store.get_i64("lens2_pos", i64::from(defaults.lens2_pos)) as i32,
        ..defaults.clone()
    };
    settings.set_contrast(store.get_f64("contrast", f64::from(defaults.contrast)) as f32);
    settings.set_saturation(store.get_f64("saturation", f64::from(defaults.saturation)) as f32);
    settings.set_sharpness(store.get_f64("sharpness", f64::from(defaults.sharpness)) as f32);
    settings.set_focus_mm(store.get_i64("focus", i64::from(defaults.focus_mm)));
    settings.set_exposure_s(store.get_f64("exposure", defaults.exposure_s));
    debug!(?settings, "Loaded settings from preference store");
    settings
}

/// Write every settings field back to the store
pub fn save_settings(store: &dyn PreferenceStore, settings: &CameraSettings) {
    store.set_f64("brightness", f64::from(settings.brightness));
    store.set_f64("contrast", f64::from(settings.contrast));
    store.set_f64("saturation", f64::from(settings.saturation));
    store.set_f64("sharpness", f64::from(settings.sharpness));
    store.set_str("awb_mode", settings.awb_mode.as_str());
    store.set_str("exposure_mode", settings.exposure_mode.as_str());
    store.set_i64("focus", i64::from(settings.focus_mm));
    store.set_f64("exposure", settings.exposure_s);
    store.set_i64("lens1_pos", i64::from(settings.lens1_pos));
    store.set_i64("lens2_pos", i64::from(settings.lens2_pos));
    debug!("Saved settings to preference store");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = CameraSettings::default();
        assert_eq!(settings.brightness, 0.0);
        assert_eq!(settings.contrast, 1.0);
        assert_eq!(settings.focus_mm, 1000);
        assert_eq!(settings.exposure_s, 3.0);
        assert_eq!(settings.awb_mode, AwbMode::Auto);
        assert_eq!(settings.exposure_mode, ExposureMode::Auto);
        assert_eq!(settings.lens1_pos, 0);
        assert_eq!(settings.lens2_pos, 0);
    }

    #[test]
    fn test_focus_clamping() {
        let mut settings = CameraSettings::default();
        settings.set_focus_mm(5);
        assert_eq!(settings.focus_mm, 10);
        settings.set_focus_mm(20_000);
        assert_eq!(settings.focus_mm, 10_000);
        settings.set_focus_mm(5000);
        assert_eq!(settings.focus_mm, 5000);
        settings.set_focus_mm(-3);
        assert_eq!(settings.focus_mm, 10);
    }

    #[test]
    fn test_exposure_clamping() {
        let mut settings = CameraSettings::default();
        settings.set_exposure_s(45.0);
        assert_eq!(settings.exposure_s, 30.0);
        settings.set_exposure_s(0.01);
        assert_eq!(settings.exposure_s, 0.1);
        settings.set_exposure_s(f64::NAN);
        assert_eq!(settings.exposure_s, 0.1);
        settings.set_exposure_s(2.5);
        assert_eq!(settings.exposure_s, 2.5);
    }

    #[test]
    fn test_tone_controls_clamp_to_zero() {
        let mut settings = CameraSettings::default();
        settings.set_contrast(-1.0);
        assert_eq!(settings.contrast, 0.0);
        settings.set_saturation(1.4);
        assert_eq!(settings.saturation, 1.4);
    }

    #[test]
    fn test_exposure_mode_parse() {
        assert_eq!(ExposureMode::parse("custom"), ExposureMode::Custom);
        assert_eq!(ExposureMode::parse(" Long "), ExposureMode::Long);
        assert_eq!(ExposureMode::parse("bogus"), ExposureMode::Auto);
    }

    #[test]
    fn test_store_round_trip() {
        let store = MemoryPreferenceStore::new();
        let mut settings = CameraSettings::default();
        settings.awb_mode = AwbMode::Daylight;
        settings.exposure_mode = ExposureMode::Custom;
        settings.set_focus_mm(5000);
        settings.set_exposure_s(2.5);
        settings.lens1_pos = 42;
        save_settings(&store, &settings);

        let loaded = load_settings(&store);
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_load_clamps_out_of_range_stored_values() {
        let store = MemoryPreferenceStore::new();
        store.set_i64("focus", 99_999);
        store.set_f64("exposure", 120.0);
        store.set_str("awb_mode", "moonlight");

        let loaded = load_settings(&store);
        assert_eq!(loaded.focus_mm, 10_000);
        assert_eq!(loaded.exposure_s, 30.0);
        assert_eq!(loaded.awb_mode, AwbMode::Auto);
    }

    #[test]
    fn test_settings_store_snapshot_is_copy_out() {
        let store = SettingsStore::default();
        let mut snap = store.snapshot();
        snap.set_focus_mm(5000);
        // Mutating the snapshot must not leak back into the store
        assert_eq!(store.snapshot().focus_mm, 1000);
        store.update(|s| s.set_focus_mm(5000));
        assert_eq!(store.snapshot().focus_mm, 5000);
    }
}
