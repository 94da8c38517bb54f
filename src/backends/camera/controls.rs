// SPDX-License-Identifier: GPL-3.0-only

//! Device capability adapter
//!
//! Pure translation between the semantic settings record (millimeters,
//! seconds, normalized ranges) and the device control vocabulary. No
//! state is held beyond the device reference passed per call.
//!
//! Focus uses a harmonic mapping: `lens_position = 1000 / distance_mm`.
//! Equal millimeter steps near the close end therefore move the lens far
//! more than near the far end. Range enforcement (10–10000 mm) happens in
//! the settings record before any call lands here.

use super::types::{AeExposureMode, AfMode, AppliedState, CarriedState, ControlSet,
    NoiseReductionMode};
use super::CameraDevice;
use crate::config::{CameraSettings, ExposureMode};
use crate::errors::{CameraError, CameraResult};
use tracing::{debug, warn};

/// Resolve the client-visible exposure mode to the device program.
/// `Auto` has no native counterpart and resolves to `Normal`.
pub fn resolve_exposure_mode(mode: ExposureMode) -> AeExposureMode {
    match mode {
        ExposureMode::Auto | ExposureMode::Normal => AeExposureMode::Normal,
        ExposureMode::Short => AeExposureMode::Short,
        ExposureMode::Long => AeExposureMode::Long,
        ExposureMode::Custom => AeExposureMode::Custom,
    }
}

/// Whether the mode selects fully manual exposure
pub fn is_manual_exposure(mode: ExposureMode) -> bool {
    resolve_exposure_mode(mode) == AeExposureMode::Custom
}

/// Convert a focus distance to the device lens position.
///
/// The distance must already be range-enforced; zero would divide.
pub fn lens_position_for(distance_mm: u32) -> f32 {
    debug_assert!(distance_mm > 0, "focus distance must be range-enforced first");
    1000.0 / distance_mm as f32
}

/// Invert [`lens_position_for`], recovering whole millimeters
pub fn focus_mm_from_lens_position(position: f32) -> u32 {
    (1000.0 / position).round() as u32
}

/// Convert manual exposure seconds to the device microsecond unit
pub fn exposure_micros(seconds: f64) -> i64 {
    (seconds * 1_000_000.0).round() as i64
}

/// Invert [`exposure_micros`]
pub fn exposure_seconds(micros: i64) -> f64 {
    micros as f64 / 1_000_000.0
}

/// Derive the confirmed-applied snapshot from the effective controls a
/// device reported back
fn applied_from_effective(effective: &ControlSet) -> AppliedState {
    AppliedState {
        focus_mm: effective.lens_position.map(focus_mm_from_lens_position),
        exposure_s: effective.exposure_time_us.map(exposure_seconds),
    }
}

/// Apply the full settings record in one control-set call.
///
/// Exposure is commanded manually (AE disabled) only when the exposure
/// mode resolves to `Custom`; otherwise AE is enabled and the snapshot
/// carries no exposure. Any device-rejected control fails the whole
/// batch; the caller treats that as non-fatal and the device retains its
/// prior state.
pub fn apply_full(
    device: &mut dyn CameraDevice,
    settings: &CameraSettings,
) -> CameraResult<AppliedState> {
    if !device.is_started() {
        return Err(CameraError::DeviceNotReady);
    }

    let manual = is_manual_exposure(settings.exposure_mode);
    let mut controls = ControlSet {
        awb_mode: Some(settings.awb_mode),
        ae_exposure_mode: Some(resolve_exposure_mode(settings.exposure_mode)),
        brightness: Some(settings.brightness),
        contrast: Some(settings.contrast),
        saturation: Some(settings.saturation),
        sharpness: Some(settings.sharpness),
        af_mode: Some(AfMode::Manual),
        lens_position: Some(lens_position_for(settings.focus_mm)),
        ..Default::default()
    };
    if manual {
        controls.ae_enable = Some(false);
        controls.exposure_time_us = Some(exposure_micros(settings.exposure_s));
    } else {
        controls.ae_enable = Some(true);
    }

    debug!(?controls, "Applying full settings");
    let effective = device.set_controls(&controls)?;
    Ok(applied_from_effective(&effective))
}

/// Apply only the supplied focus and/or exposure keys.
///
/// Returns `Ok(None)` when the device is not started or nothing was
/// supplied; callers treat that as a no-op, not an error. Used for
/// low-latency incremental updates without resending unrelated controls.
pub fn apply_partial(
    device: &mut dyn CameraDevice,
    focus_mm: Option<u32>,
    exposure_s: Option<f64>,
) -> CameraResult<Option<AppliedState>> {
    if !device.is_started() {
        return Ok(None);
    }

    let mut controls = ControlSet::default();
    if let Some(focus) = focus_mm {
        controls.af_mode = Some(AfMode::Manual);
        controls.lens_position = Some(lens_position_for(focus));
    }
    if let Some(exposure) = exposure_s {
        controls.exposure_time_us = Some(exposure_micros(exposure));
        controls.ae_enable = Some(false);
    }
    if controls.is_empty() {
        return Ok(None);
    }

    debug!(?controls, "Applying partial settings");
    let effective = device.set_controls(&controls)?;
    Ok(Some(applied_from_effective(&effective)))
}

/// Single-field manual focus; false on any device error, never throws
pub fn set_focus(device: &mut dyn CameraDevice, distance_mm: u32) -> bool {
    let controls = ControlSet {
        af_mode: Some(AfMode::Manual),
        lens_position: Some(lens_position_for(distance_mm)),
        ..Default::default()
    };
    match device.set_controls(&controls) {
        Ok(_) => {
            debug!(distance_mm, "Set focus");
            true
        }
        Err(err) => {
            warn!(distance_mm, %err, "Focus error");
            false
        }
    }
}

/// Restore the basic image controls before streaming starts: white
/// balance, exposure program, and tone controls — no focus or exposure
/// time, which arrive with the deferred full apply.
pub fn restore_basic(
    device: &mut dyn CameraDevice,
    settings: &CameraSettings,
) -> CameraResult<()> {
    let controls = ControlSet {
        awb_mode: Some(settings.awb_mode),
        ae_exposure_mode: Some(resolve_exposure_mode(settings.exposure_mode)),
        brightness: Some(settings.brightness),
        contrast: Some(settings.contrast),
        saturation: Some(settings.saturation),
        sharpness: Some(settings.sharpness),
        ..Default::default()
    };
    debug!(?controls, "Restoring persisted settings");
    device.set_controls(&controls)?;
    Ok(())
}

/// Build the merged control batch for a still capture: manual exposure
/// and focus from the settings snapshot, tone controls from the record,
/// and noise reduction carried from the outgoing preview (default off).
pub fn build_still_controls(
    settings: &CameraSettings,
    carried: Option<&CarriedState>,
) -> ControlSet {
    ControlSet {
        exposure_time_us: Some(exposure_micros(settings.exposure_s)),
        ae_enable: Some(false),
        af_mode: Some(AfMode::Manual),
        lens_position: Some(lens_position_for(settings.focus_mm)),
        awb_mode: Some(settings.awb_mode),
        brightness: Some(settings.brightness),
        contrast: Some(settings.contrast),
        saturation: Some(settings.saturation),
        sharpness: Some(settings.sharpness),
        noise_reduction: Some(
            carried
                .and_then(|c| c.controls.noise_reduction)
                .unwrap_or(NoiseReductionMode::Off),
        ),
        ..Default::default()
    }
}
