// SPDX-License-Identifier: GPL-3.0-only

//! Shared types for the camera device abstraction

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Auto white balance mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AwbMode {
    #[default]
    Auto,
    Incandescent,
    Tungsten,
    Fluorescent,
    Indoor,
    Daylight,
    Cloudy,
    Custom,
}

impl AwbMode {
    /// Parse a stored mode string. Unknown or malformed input falls back
    /// to `Auto`, matching the behavior of the settings store.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "auto" => AwbMode::Auto,
            "incandescent" => AwbMode::Incandescent,
            "tungsten" => AwbMode::Tungsten,
            "fluorescent" => AwbMode::Fluorescent,
            "indoor" => AwbMode::Indoor,
            "daylight" => AwbMode::Daylight,
            "cloudy" => AwbMode::Cloudy,
            "custom" => AwbMode::Custom,
            _ => AwbMode::Auto,
        }
    }

    /// Stored string form, the inverse of [`AwbMode::parse`]
    pub fn as_str(&self) -> &'static str {
        match self {
            AwbMode::Auto => "auto",
            AwbMode::Incandescent => "incandescent",
            AwbMode::Tungsten => "tungsten",
            AwbMode::Fluorescent => "fluorescent",
            AwbMode::Indoor => "indoor",
            AwbMode::Daylight => "daylight",
            AwbMode::Cloudy => "cloudy",
            AwbMode::Custom => "custom",
        }
    }
}

impl std::fmt::Display for AwbMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Native auto-exposure program selection.
///
/// The client-visible exposure mode includes an `auto` value; it resolves
/// to `Normal` here, so this enum carries only the device vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AeExposureMode {
    #[default]
    Normal,
    Short,
    Long,
    Custom,
}

/// Autofocus mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AfMode {
    /// Autofocus disabled, lens position commanded manually
    #[default]
    Manual,
    /// Single-shot autofocus
    Auto,
    /// Continuous autofocus
    Continuous,
}

/// Noise reduction mode carried across preview/capture transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NoiseReductionMode {
    #[default]
    Off,
    Fast,
    HighQuality,
}

/// Sensor output transform (mirroring), carried from the preview
/// configuration into still captures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Transform {
    pub hflip: bool,
    pub vflip: bool,
}

/// A batch of controls for one device control-set call.
///
/// Every control is optional; only present fields are sent. This replaces
/// stringly-keyed control dictionaries with a vocabulary checked at
/// compile time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ControlSet {
    pub ae_enable: Option<bool>,
    pub ae_exposure_mode: Option<AeExposureMode>,
    /// Manual exposure time in microseconds; effective only with AE disabled
    pub exposure_time_us: Option<i64>,
    pub af_mode: Option<AfMode>,
    /// Device-native focus unit, inversely related to focal distance
    pub lens_position: Option<f32>,
    pub awb_mode: Option<AwbMode>,
    pub brightness: Option<f32>,
    pub contrast: Option<f32>,
    pub saturation: Option<f32>,
    pub sharpness: Option<f32>,
    pub noise_reduction: Option<NoiseReductionMode>,
}

impl ControlSet {
    /// True when no control is present
    pub fn is_empty(&self) -> bool {
        *self == ControlSet::default()
    }

    /// Overlay the present fields of `other` onto this set
    pub fn merge(&mut self, other: &ControlSet) {
        if other.ae_enable.is_some() {
            self.ae_enable = other.ae_enable;
        }
        if other.ae_exposure_mode.is_some() {
            self.ae_exposure_mode = other.ae_exposure_mode;
        }
        if other.exposure_time_us.is_some() {
            self.exposure_time_us = other.exposure_time_us;
        }
        if other.af_mode.is_some() {
            self.af_mode = other.af_mode;
        }
        if other.lens_position.is_some() {
            self.lens_position = other.lens_position;
        }
        if other.awb_mode.is_some() {
            self.awb_mode = other.awb_mode;
        }
        if other.brightness.is_some() {
            self.brightness = other.brightness;
        }
        if other.contrast.is_some() {
            self.contrast = other.contrast;
        }
        if other.saturation.is_some() {
            self.saturation = other.saturation;
        }
        if other.sharpness.is_some() {
            self.sharpness = other.sharpness;
        }
        if other.noise_reduction.is_some() {
            self.noise_reduction = other.noise_reduction;
        }
    }
}

/// Channel order of an interleaved 3-channel frame as produced by the
/// device, relative to the RGB display format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelOrder {
    Rgb,
    Bgr,
}

/// A transient pixel buffer produced once per acquisition cycle.
///
/// Ownership moves to the frame sink on delivery; the producer never
/// retains it past one cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameBuffer {
    pub width: u32,
    pub height: u32,
    /// Interleaved channel count
    pub channels: u8,
    /// Row stride in bytes
    pub stride: u32,
    pub data: Vec<u8>,
}

impl FrameBuffer {
    /// Swap the first and third channel of every pixel in place.
    ///
    /// No-op unless the buffer uses an interleaved 3-channel layout.
    pub fn swap_channels_rb(&mut self) {
        if self.channels != 3 {
            return;
        }
        for px in self.data.chunks_exact_mut(3) {
            px.swap(0, 2);
        }
    }
}

/// A discrete hardware-supported combination of resolution and bit depth
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorMode {
    pub width: u32,
    pub height: u32,
    pub bit_depth: u8,
}

impl SensorMode {
    pub fn pixel_area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

/// Preview stream configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewConfig {
    pub width: u32,
    pub height: u32,
    /// Frame queueing; disabled for preview to minimize latency
    pub queue: bool,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            width: crate::constants::PREVIEW_WIDTH,
            height: crate::constants::PREVIEW_HEIGHT,
            queue: false,
        }
    }
}

/// Still-capture configuration targeting a selected sensor resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StillConfig {
    pub width: u32,
    pub height: u32,
    /// Small pool to avoid stalling the one-shot request
    pub buffer_count: u32,
    pub transform: Transform,
    /// Request the unprocessed sensor stream alongside the main image
    pub enable_raw: bool,
}

/// One completed still-capture request: the normalized image plus the
/// unprocessed sensor buffer. Dropping it releases the request.
#[derive(Debug, Clone)]
pub struct StillRequest {
    pub image: FrameBuffer,
    pub raw: Vec<u8>,
}

/// The subset of the settings record the device confirmed it applied,
/// derived from the effective control values reported back by the device
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AppliedState {
    pub focus_mm: Option<u32>,
    pub exposure_s: Option<f64>,
}

impl AppliedState {
    pub fn is_empty(&self) -> bool {
        self.focus_mm.is_none() && self.exposure_s.is_none()
    }
}

/// Controls the outgoing acquisition loop had applied, handed to a still
/// capture so transform and noise-reduction carry over
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CarriedState {
    pub controls: ControlSet,
    pub transform: Transform,
}

/// Artifact pair produced by one still capture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StillCaptureResult {
    pub image_path: PathBuf,
    pub raw_path: PathBuf,
    /// Shared timestamp token both artifact names derive from
    pub timestamp: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_awb_parse_known_modes() {
        assert_eq!(AwbMode::parse("daylight"), AwbMode::Daylight);
        assert_eq!(AwbMode::parse("  Cloudy "), AwbMode::Cloudy);
        assert_eq!(AwbMode::parse("TUNGSTEN"), AwbMode::Tungsten);
    }

    #[test]
    fn test_awb_parse_unknown_defaults_to_auto() {
        assert_eq!(AwbMode::parse("sunset"), AwbMode::Auto);
        assert_eq!(AwbMode::parse(""), AwbMode::Auto);
    }

    #[test]
    fn test_awb_round_trip() {
        for mode in [
            AwbMode::Auto,
            AwbMode::Incandescent,
            AwbMode::Tungsten,
            AwbMode::Fluorescent,
            AwbMode::Indoor,
            AwbMode::Daylight,
            AwbMode::Cloudy,
            AwbMode::Custom,
        ] {
            assert_eq!(AwbMode::parse(mode.as_str()), mode);
        }
    }

    #[test]
    fn test_control_set_merge_overlays_present_fields() {
        let mut base = ControlSet {
            awb_mode: Some(AwbMode::Auto),
            brightness: Some(0.0),
            ..Default::default()
        };
        let update = ControlSet {
            awb_mode: Some(AwbMode::Daylight),
            exposure_time_us: Some(2_500_000),
            ..Default::default()
        };
        base.merge(&update);
        assert_eq!(base.awb_mode, Some(AwbMode::Daylight));
        assert_eq!(base.exposure_time_us, Some(2_500_000));
        assert_eq!(base.brightness, Some(0.0));
    }

    #[test]
    fn test_control_set_merge_keeps_absent_fields() {
        let mut base = ControlSet {
            lens_position: Some(1.0),
            ..Default::default()
        };
        base.merge(&ControlSet::default());
        assert_eq!(base.lens_position, Some(1.0));
    }

    #[test]
    fn test_swap_channels_rb() {
        let mut frame = FrameBuffer {
            width: 2,
            height: 1,
            channels: 3,
            stride: 6,
            data: vec![1, 2, 3, 4, 5, 6],
        };
        frame.swap_channels_rb();
        assert_eq!(frame.data, vec![3, 2, 1, 6, 5, 4]);
    }

    #[test]
    fn test_swap_channels_rb_ignores_non_rgb_layouts() {
        let mut frame = FrameBuffer {
            width: 1,
            height: 1,
            channels: 4,
            stride: 4,
            data: vec![1, 2, 3, 4],
        };
        frame.swap_channels_rb();
        assert_eq!(frame.data, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_sensor_mode_pixel_area() {
        let mode = SensorMode {
            width: 4056,
            height: 3040,
            bit_depth: 12,
        };
        assert_eq!(mode.pixel_area(), 4056 * 3040);
    }
}
