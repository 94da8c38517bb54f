// SPDX-License-Identifier: GPL-3.0-only

//! One-shot still capture
//!
//! Runs only while the session controller holds the device slot in the
//! suspended-for-capture state. The operation opens its own, independent
//! device instance rather than reusing the preview handle, so no state
//! leaks over from the streaming configuration.
//!
//! Failures never propagate past this boundary as panics; the caller
//! always receives a result and always restores preview afterward.

use crate::backends::camera::controls::build_still_controls;
use crate::backends::camera::types::{CarriedState, SensorMode, StillCaptureResult, StillConfig};
use crate::backends::camera::{CameraDevice, DeviceFactory};
use crate::config::CameraSettings;
use crate::constants::{CAPTURE_SETTLE, DEFAULT_STILL_RESOLUTION, MIN_STILL_BIT_DEPTH,
    STILL_BUFFER_COUNT, TIMESTAMP_FORMAT};
use crate::errors::{CameraError, CameraResult};
use crate::storage;
use std::path::Path;
use std::thread;
use tracing::{info, warn};

/// Choose the capture resolution from the reported sensor modes: keep
/// modes of at least 10-bit depth, fall back to the unfiltered list when
/// none qualify, and take the largest pixel area.
pub fn select_capture_resolution(modes: &[SensorMode]) -> Option<(u32, u32)> {
    let deep: Vec<&SensorMode> = modes
        .iter()
        .filter(|m| m.bit_depth >= MIN_STILL_BIT_DEPTH)
        .collect();
    let candidates: Vec<&SensorMode> = if deep.is_empty() {
        modes.iter().collect()
    } else {
        deep
    };
    candidates
        .into_iter()
        .max_by_key(|m| m.pixel_area())
        .map(|m| (m.width, m.height))
}

/// Capture one still and persist both artifacts.
///
/// Cleanup runs on success and failure alike: the in-flight request is
/// released (dropped) first, then the device is stopped if started, then
/// closed — three independent steps, a failure of one never skips the
/// next.
pub fn take_still(
    factory: &DeviceFactory,
    settings: &CameraSettings,
    carried: Option<&CarriedState>,
    results_dir: &Path,
) -> CameraResult<StillCaptureResult> {
    let mut device = factory().map_err(as_capture_error)?;

    let result = perform(device.as_mut(), settings, carried, results_dir);

    if let Err(err) = device.stop() {
        warn!(%err, "Error stopping capture device");
    }
    device.close();

    result.map_err(as_capture_error)
}

fn perform(
    device: &mut dyn CameraDevice,
    settings: &CameraSettings,
    carried: Option<&CarriedState>,
    results_dir: &Path,
) -> CameraResult<StillCaptureResult> {
    storage::ensure_results_dir(results_dir)?;

    let (width, height) = match device.sensor_modes() {
        Ok(modes) => select_capture_resolution(&modes).unwrap_or(DEFAULT_STILL_RESOLUTION),
        Err(err) => {
            warn!(%err, "Could not determine capture resolution, using default");
            DEFAULT_STILL_RESOLUTION
        }
    };
    info!(width, height, "Selected capture resolution");

    let config = StillConfig {
        width,
        height,
        buffer_count: STILL_BUFFER_COUNT,
        transform: carried.map(|c| c.transform).unwrap_or_default(),
        enable_raw: true,
    };
    device.configure_still(&config)?;

    let controls = build_still_controls(settings, carried);
    device.set_controls(&controls)?;

    device.start()?;
    // Let the sensor converge to the commanded exposure
    thread::sleep(CAPTURE_SETTLE);

    let timestamp = chrono::Local::now().format(TIMESTAMP_FORMAT).to_string();
    let (image_path, raw_path) = storage::artifact_paths(results_dir, &timestamp);

    let request = device.capture_still()?;
    storage::save_image(&request.image, &image_path)?;
    storage::save_raw(&request.raw, &raw_path)?;
    // Release the in-flight request before the caller stops the device
    drop(request);

    info!(
        image = %image_path.display(),
        raw = %raw_path.display(),
        "Still capture saved"
    );
    Ok(StillCaptureResult {
        image_path,
        raw_path,
        timestamp,
    })
}

/// Every failure inside the capture boundary surfaces as CaptureFailed
fn as_capture_error(err: CameraError) -> CameraError {
    match err {
        CameraError::CaptureFailed(_) => err,
        other => CameraError::CaptureFailed(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::mock::mock_factory;
    use crate::backends::camera::types::{AwbMode, NoiseReductionMode, ControlSet};
    use crate::config::ExposureMode;
    use std::path::PathBuf;

    fn temp_dir(name: &str) -> PathBuf {
        let dir =
            std::env::temp_dir().join(format!("spectrocam-capture-{name}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_select_prefers_deep_modes() {
        let modes = [
            SensorMode { width: 4000, height: 3000, bit_depth: 8 },
            SensorMode { width: 1296, height: 972, bit_depth: 10 },
            SensorMode { width: 2028, height: 1520, bit_depth: 12 },
        ];
        // The 8-bit mode has the largest area but is filtered out
        assert_eq!(select_capture_resolution(&modes), Some((2028, 1520)));
    }

    #[test]
    fn test_select_falls_back_to_all_modes() {
        let modes = [
            SensorMode { width: 640, height: 480, bit_depth: 8 },
            SensorMode { width: 1920, height: 1080, bit_depth: 8 },
        ];
        assert_eq!(select_capture_resolution(&modes), Some((1920, 1080)));
    }

    #[test]
    fn test_select_empty_modes() {
        assert_eq!(select_capture_resolution(&[]), None);
    }

    #[test]
    fn test_capture_produces_artifact_pair() {
        let (factory, hub) = mock_factory();
        hub.set_sensor_modes(vec![SensorMode { width: 64, height: 48, bit_depth: 10 }]);
        let dir = temp_dir("pair");

        let mut settings = CameraSettings::default();
        settings.awb_mode = AwbMode::Daylight;
        settings.exposure_mode = ExposureMode::Custom;
        settings.set_exposure_s(2.5);

        let result = take_still(&factory, &settings, None, &dir).unwrap();
        assert!(result.image_path.is_file());
        assert!(result.raw_path.is_file());
        assert!(result
            .image_path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with(&result.timestamp));
        assert!(result
            .raw_path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with(&result.timestamp));

        // Merged controls match the requested snapshot
        let controls = hub.last_controls().unwrap();
        assert_eq!(controls.exposure_time_us, Some(2_500_000));
        assert_eq!(controls.ae_enable, Some(false));
        assert_eq!(controls.awb_mode, Some(AwbMode::Daylight));

        // Device fully released
        assert_eq!(hub.concurrent_open(), 0);
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_capture_uses_default_resolution_on_enumeration_failure() {
        let (factory, hub) = mock_factory();
        hub.set_fail_sensor_modes(true);
        let dir = temp_dir("fallback");

        take_still(&factory, &CameraSettings::default(), None, &dir).unwrap();
        let config = hub.still_configs().pop().unwrap();
        assert_eq!((config.width, config.height), DEFAULT_STILL_RESOLUTION);
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_capture_failure_still_releases_device() {
        let (factory, hub) = mock_factory();
        hub.set_sensor_modes(vec![SensorMode { width: 64, height: 48, bit_depth: 10 }]);
        hub.set_fail_still(true);
        let dir = temp_dir("fail");

        let result = take_still(&factory, &CameraSettings::default(), None, &dir);
        assert!(matches!(result, Err(CameraError::CaptureFailed(_))));
        assert_eq!(hub.concurrent_open(), 0);
        assert_eq!(hub.close_count(), 1);
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_capture_carries_noise_reduction() {
        let (factory, hub) = mock_factory();
        hub.set_sensor_modes(vec![SensorMode { width: 64, height: 48, bit_depth: 10 }]);
        let dir = temp_dir("carry");

        let carried = CarriedState {
            controls: ControlSet {
                noise_reduction: Some(NoiseReductionMode::HighQuality),
                ..Default::default()
            },
            ..Default::default()
        };
        take_still(&factory, &CameraSettings::default(), Some(&carried), &dir).unwrap();
        assert_eq!(
            hub.last_controls().unwrap().noise_reduction,
            Some(NoiseReductionMode::HighQuality)
        );
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_capture_rejected_controls_fail_the_operation() {
        let (factory, hub) = mock_factory();
        hub.set_reject_controls(true);
        let dir = temp_dir("reject");

        let result = take_still(&factory, &CameraSettings::default(), None, &dir);
        assert!(matches!(result, Err(CameraError::CaptureFailed(_))));
        assert_eq!(hub.concurrent_open(), 0);
        let _ = std::fs::remove_dir_all(dir);
    }
}
