// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for the settings record and its conversions

use spectrocam::backends::camera::controls::{exposure_micros, exposure_seconds,
    lens_position_for};
use spectrocam::config::{load_settings, save_settings};
use spectrocam::{AwbMode, CameraSettings, ExposureMode, MemoryPreferenceStore};

#[test]
fn test_lens_position_finite_and_decreasing_over_full_range() {
    let mut prev = f32::INFINITY;
    for mm in 10..=10_000u32 {
        let position = lens_position_for(mm);
        assert!(position.is_finite(), "lens position must be finite at {mm} mm");
        assert!(
            position < prev,
            "lens position must decrease monotonically at {mm} mm"
        );
        prev = position;
    }
}

#[test]
fn test_zero_distance_is_unreachable_through_the_record() {
    let mut settings = CameraSettings::default();
    settings.set_focus_mm(0);
    // Clamping keeps the conversion's divisor strictly positive
    assert_eq!(settings.focus_mm, 10);
    assert!(lens_position_for(settings.focus_mm).is_finite());
}

#[test]
fn test_exposure_round_trip_recovers_six_decimals() {
    for step in 0..=299 {
        let exposure = 0.1 + step as f64 * 0.1;
        let recovered = exposure_seconds(exposure_micros(exposure));
        assert!(
            (recovered - exposure).abs() < 5e-7,
            "lost precision at {exposure} s: {recovered}"
        );
    }
}

#[test]
fn test_out_of_range_exposure_is_clamped_before_conversion() {
    let mut settings = CameraSettings::default();
    settings.set_exposure_s(45.0);
    assert_eq!(settings.exposure_s, 30.0);
    assert_eq!(exposure_micros(settings.exposure_s), 30_000_000);
}

#[test]
fn test_every_field_survives_the_preference_store() {
    let store = MemoryPreferenceStore::new();
    let mut settings = CameraSettings::default();
    settings.brightness = 0.25;
    settings.set_contrast(1.3);
    settings.set_saturation(0.8);
    settings.set_sharpness(1.6);
    settings.awb_mode = AwbMode::Fluorescent;
    settings.exposure_mode = ExposureMode::Long;
    settings.set_focus_mm(250);
    settings.set_exposure_s(12.5);
    settings.lens1_pos = -7;
    settings.lens2_pos = 33;

    save_settings(&store, &settings);
    assert_eq!(load_settings(&store), settings);
}

#[test]
fn test_empty_store_yields_defaults() {
    let store = MemoryPreferenceStore::new();
    assert_eq!(load_settings(&store), CameraSettings::default());
}
