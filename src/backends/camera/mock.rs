// SPDX-License-Identifier: GPL-3.0-only

//! Mock camera backend for testing without hardware.
//!
//! Every device produced by [`mock_factory`] reports into one shared
//! [`MockHub`], which records control history and open/close accounting
//! and lets tests script failures and device-side clamping.

use super::types::{ChannelOrder, ControlSet, FrameBuffer, PreviewConfig, SensorMode,
    StillConfig, StillRequest};
use super::{CameraDevice, DeviceFactory};
use crate::errors::{CameraError, CameraResult};
use std::sync::{Arc, Mutex};

/// Synthetic preview frame geometry; deliberately small so tests stay fast
const MOCK_FRAME_WIDTH: u32 = 32;
const MOCK_FRAME_HEIGHT: u32 = 24;

/// Pixel repeated across synthetic preview frames, chosen so a
/// channel-order swap is observable
const MOCK_PIXEL: [u8; 3] = [10, 20, 30];

#[derive(Debug)]
struct HubState {
    // accounting
    opened: usize,
    closed: usize,
    concurrent_open: usize,
    max_concurrent_open: usize,
    starts: usize,
    stops: usize,
    frames_captured: u32,
    stills_captured: u32,
    control_history: Vec<ControlSet>,
    preview_configs: Vec<PreviewConfig>,
    still_configs: Vec<StillConfig>,
    // scripting
    base_metadata: ControlSet,
    sensor_modes: Vec<SensorMode>,
    frame_order: ChannelOrder,
    exposure_limits_us: Option<(i64, i64)>,
    reject_controls: bool,
    fail_open: bool,
    fail_start: bool,
    fail_capture_after: Option<u32>,
    fail_still: bool,
    fail_sensor_modes: bool,
}

impl Default for HubState {
    fn default() -> Self {
        Self {
            opened: 0,
            closed: 0,
            concurrent_open: 0,
            max_concurrent_open: 0,
            starts: 0,
            stops: 0,
            frames_captured: 0,
            stills_captured: 0,
            control_history: Vec::new(),
            preview_configs: Vec::new(),
            still_configs: Vec::new(),
            base_metadata: ControlSet::default(),
            sensor_modes: vec![
                SensorMode { width: 640, height: 480, bit_depth: 8 },
                SensorMode { width: 1296, height: 972, bit_depth: 10 },
                SensorMode { width: 2028, height: 1520, bit_depth: 12 },
            ],
            frame_order: ChannelOrder::Bgr,
            exposure_limits_us: None,
            reject_controls: false,
            fail_open: false,
            fail_start: false,
            fail_capture_after: None,
            fail_still: false,
            fail_sensor_modes: false,
        }
    }
}

/// Shared observer and script surface for all devices of one factory
#[derive(Clone)]
pub struct MockHub {
    state: Arc<Mutex<HubState>>,
}

impl MockHub {
    fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(HubState::default())),
        }
    }

    // ----- scripting -----

    /// Make every subsequent open fail with DeviceUnavailable
    pub fn set_fail_open(&self, fail: bool) {
        self.state.lock().unwrap().fail_open = fail;
    }

    /// Make every subsequent start fail with DeviceUnavailable
    pub fn set_fail_start(&self, fail: bool) {
        self.state.lock().unwrap().fail_start = fail;
    }

    /// Reject every control-set call
    pub fn set_reject_controls(&self, reject: bool) {
        self.state.lock().unwrap().reject_controls = reject;
    }

    /// Clamp commanded exposure times into the given microsecond range,
    /// modeling a device that accepts but adjusts the value
    pub fn set_exposure_limits_us(&self, min: i64, max: i64) {
        self.state.lock().unwrap().exposure_limits_us = Some((min, max));
    }

    /// Fail preview capture once the given number of frames was delivered
    pub fn set_fail_capture_after(&self, frames: u32) {
        self.state.lock().unwrap().fail_capture_after = Some(frames);
    }

    /// Fail the one-shot still request
    pub fn set_fail_still(&self, fail: bool) {
        self.state.lock().unwrap().fail_still = fail;
    }

    /// Fail sensor-mode enumeration
    pub fn set_fail_sensor_modes(&self, fail: bool) {
        self.state.lock().unwrap().fail_sensor_modes = fail;
    }

    /// Replace the advertised sensor modes
    pub fn set_sensor_modes(&self, modes: Vec<SensorMode>) {
        self.state.lock().unwrap().sensor_modes = modes;
    }

    /// Controls the device reports in metadata before any set-call, e.g.
    /// a hardware-default noise-reduction mode
    pub fn set_base_metadata(&self, controls: ControlSet) {
        self.state.lock().unwrap().base_metadata = controls;
    }

    /// Channel order of synthetic preview frames (default Bgr)
    pub fn set_frame_order(&self, order: ChannelOrder) {
        self.state.lock().unwrap().frame_order = order;
    }

    // ----- observation -----

    pub fn open_count(&self) -> usize {
        self.state.lock().unwrap().opened
    }

    pub fn close_count(&self) -> usize {
        self.state.lock().unwrap().closed
    }

    /// Devices currently open; the mutual-exclusion invariant requires
    /// this never to exceed one in session tests
    pub fn concurrent_open(&self) -> usize {
        self.state.lock().unwrap().concurrent_open
    }

    pub fn max_concurrent_open(&self) -> usize {
        self.state.lock().unwrap().max_concurrent_open
    }

    pub fn start_count(&self) -> usize {
        self.state.lock().unwrap().starts
    }

    pub fn stop_count(&self) -> usize {
        self.state.lock().unwrap().stops
    }

    pub fn frames_captured(&self) -> u32 {
        self.state.lock().unwrap().frames_captured
    }

    pub fn stills_captured(&self) -> u32 {
        self.state.lock().unwrap().stills_captured
    }

    /// Every control batch any device accepted, in order
    pub fn control_history(&self) -> Vec<ControlSet> {
        self.state.lock().unwrap().control_history.clone()
    }

    pub fn last_controls(&self) -> Option<ControlSet> {
        self.state.lock().unwrap().control_history.last().cloned()
    }

    /// Merged view of every accepted control batch
    pub fn merged_controls(&self) -> ControlSet {
        let state = self.state.lock().unwrap();
        let mut merged = ControlSet::default();
        for set in &state.control_history {
            merged.merge(set);
        }
        merged
    }

    pub fn preview_configs(&self) -> Vec<PreviewConfig> {
        self.state.lock().unwrap().preview_configs.clone()
    }

    pub fn still_configs(&self) -> Vec<StillConfig> {
        self.state.lock().unwrap().still_configs.clone()
    }
}

/// Mock device; all interesting state lives in the shared hub
pub struct MockCamera {
    hub: MockHub,
    started: bool,
    closed: bool,
    frames_delivered: u32,
    still_config: Option<StillConfig>,
}

impl MockCamera {
    fn new(hub: MockHub) -> Self {
        Self {
            hub,
            started: false,
            closed: false,
            frames_delivered: 0,
            still_config: None,
        }
    }

    fn clamp_effective(state: &HubState, controls: &ControlSet) -> ControlSet {
        let mut effective = controls.clone();
        if let (Some((min, max)), Some(us)) = (state.exposure_limits_us, controls.exposure_time_us)
        {
            effective.exposure_time_us = Some(us.clamp(min, max));
        }
        effective
    }
}

impl CameraDevice for MockCamera {
    fn configure_preview(&mut self, config: &PreviewConfig) -> CameraResult<()> {
        self.hub
            .state
            .lock()
            .unwrap()
            .preview_configs
            .push(config.clone());
        Ok(())
    }

    fn configure_still(&mut self, config: &StillConfig) -> CameraResult<()> {
        self.hub
            .state
            .lock()
            .unwrap()
            .still_configs
            .push(config.clone());
        self.still_config = Some(config.clone());
        Ok(())
    }

    fn set_controls(&mut self, controls: &ControlSet) -> CameraResult<ControlSet> {
        if self.closed {
            return Err(CameraError::DeviceNotReady);
        }
        let mut state = self.hub.state.lock().unwrap();
        if state.reject_controls {
            return Err(CameraError::ControlsRejected("scripted rejection".into()));
        }
        let effective = Self::clamp_effective(&state, controls);
        state.control_history.push(effective.clone());
        Ok(effective)
    }

    fn start(&mut self) -> CameraResult<()> {
        let mut state = self.hub.state.lock().unwrap();
        if state.fail_start {
            return Err(CameraError::DeviceUnavailable("scripted start failure".into()));
        }
        state.starts += 1;
        self.started = true;
        Ok(())
    }

    fn stop(&mut self) -> CameraResult<()> {
        if self.started {
            self.hub.state.lock().unwrap().stops += 1;
            self.started = false;
        }
        Ok(())
    }

    fn is_started(&self) -> bool {
        self.started && !self.closed
    }

    fn sensor_modes(&mut self) -> CameraResult<Vec<SensorMode>> {
        let state = self.hub.state.lock().unwrap();
        if state.fail_sensor_modes {
            return Err(CameraError::CaptureFailed("scripted enumeration failure".into()));
        }
        Ok(state.sensor_modes.clone())
    }

    fn metadata(&mut self) -> CameraResult<ControlSet> {
        if self.closed {
            return Err(CameraError::DeviceNotReady);
        }
        let state = self.hub.state.lock().unwrap();
        let mut merged = state.base_metadata.clone();
        for set in &state.control_history {
            merged.merge(set);
        }
        Ok(merged)
    }

    fn capture_frame(&mut self) -> CameraResult<(FrameBuffer, ChannelOrder)> {
        if !self.is_started() {
            return Err(CameraError::DeviceNotReady);
        }
        let order = {
            let mut state = self.hub.state.lock().unwrap();
            if let Some(limit) = state.fail_capture_after {
                if self.frames_delivered >= limit {
                    return Err(CameraError::CaptureFailed("scripted capture failure".into()));
                }
            }
            state.frames_captured += 1;
            state.frame_order
        };
        self.frames_delivered += 1;

        let pixel_count = (MOCK_FRAME_WIDTH * MOCK_FRAME_HEIGHT) as usize;
        let mut data = Vec::with_capacity(pixel_count * 3);
        for _ in 0..pixel_count {
            data.extend_from_slice(&MOCK_PIXEL);
        }
        Ok((
            FrameBuffer {
                width: MOCK_FRAME_WIDTH,
                height: MOCK_FRAME_HEIGHT,
                channels: 3,
                stride: MOCK_FRAME_WIDTH * 3,
                data,
            },
            order,
        ))
    }

    fn capture_still(&mut self) -> CameraResult<StillRequest> {
        if !self.is_started() {
            return Err(CameraError::DeviceNotReady);
        }
        let mut state = self.hub.state.lock().unwrap();
        if state.fail_still {
            return Err(CameraError::CaptureFailed("scripted still failure".into()));
        }
        state.stills_captured += 1;
        drop(state);

        let (width, height) = self
            .still_config
            .as_ref()
            .map(|c| (c.width, c.height))
            .unwrap_or((MOCK_FRAME_WIDTH, MOCK_FRAME_HEIGHT));
        let pixel_count = (width * height) as usize;
        Ok(StillRequest {
            image: FrameBuffer {
                width,
                height,
                channels: 3,
                stride: width * 3,
                data: vec![128; pixel_count * 3],
            },
            // 16-bit-per-pixel stand-in for the unprocessed sensor dump
            raw: vec![0xA5; pixel_count * 2],
        })
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.started = false;
            let mut state = self.hub.state.lock().unwrap();
            state.closed += 1;
            state.concurrent_open = state.concurrent_open.saturating_sub(1);
        }
    }
}

impl Drop for MockCamera {
    fn drop(&mut self) {
        self.close();
    }
}

/// Build a factory producing mock devices plus the hub observing them
pub fn mock_factory() -> (DeviceFactory, MockHub) {
    let hub = MockHub::new();
    let factory_hub = hub.clone();
    let factory: DeviceFactory = Arc::new(move || {
        let mut state = factory_hub.state.lock().unwrap();
        if state.fail_open {
            return Err(CameraError::DeviceUnavailable("scripted open failure".into()));
        }
        state.opened += 1;
        state.concurrent_open += 1;
        state.max_concurrent_open = state.max_concurrent_open.max(state.concurrent_open);
        drop(state);
        Ok(Box::new(MockCamera::new(factory_hub.clone())) as Box<dyn CameraDevice>)
    });
    (factory, hub)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_close_accounting() {
        let (factory, hub) = mock_factory();
        {
            let mut a = factory().unwrap();
            assert_eq!(hub.concurrent_open(), 1);
            let _b = factory().unwrap();
            assert_eq!(hub.concurrent_open(), 2);
            assert_eq!(hub.max_concurrent_open(), 2);
            a.close();
            assert_eq!(hub.concurrent_open(), 1);
        }
        // Drop closes the second device
        assert_eq!(hub.concurrent_open(), 0);
        assert_eq!(hub.open_count(), 2);
        assert_eq!(hub.close_count(), 2);
    }

    #[test]
    fn test_close_is_idempotent() {
        let (factory, hub) = mock_factory();
        let mut device = factory().unwrap();
        device.close();
        device.close();
        drop(device);
        assert_eq!(hub.close_count(), 1);
    }

    #[test]
    fn test_scripted_open_failure() {
        let (factory, hub) = mock_factory();
        hub.set_fail_open(true);
        assert!(factory().is_err());
        assert_eq!(hub.open_count(), 0);
    }

    #[test]
    fn test_capture_requires_start() {
        let (factory, _hub) = mock_factory();
        let mut device = factory().unwrap();
        assert!(device.capture_frame().is_err());
        device.start().unwrap();
        assert!(device.capture_frame().is_ok());
    }

    #[test]
    fn test_scripted_capture_failure_after_n_frames() {
        let (factory, hub) = mock_factory();
        hub.set_fail_capture_after(2);
        let mut device = factory().unwrap();
        device.start().unwrap();
        assert!(device.capture_frame().is_ok());
        assert!(device.capture_frame().is_ok());
        assert!(device.capture_frame().is_err());
    }

    #[test]
    fn test_exposure_clamping_reports_effective_value() {
        let (factory, hub) = mock_factory();
        hub.set_exposure_limits_us(100_000, 10_000_000);
        let mut device = factory().unwrap();
        device.start().unwrap();

        let controls = ControlSet {
            exposure_time_us: Some(25_000_000),
            ..Default::default()
        };
        let effective = device.set_controls(&controls).unwrap();
        assert_eq!(effective.exposure_time_us, Some(10_000_000));
        assert_eq!(hub.last_controls().unwrap().exposure_time_us, Some(10_000_000));
    }

    #[test]
    fn test_still_uses_configured_size() {
        let (factory, _hub) = mock_factory();
        let mut device = factory().unwrap();
        device
            .configure_still(&StillConfig {
                width: 64,
                height: 48,
                buffer_count: 2,
                transform: Default::default(),
                enable_raw: true,
            })
            .unwrap();
        device.start().unwrap();
        let request = device.capture_still().unwrap();
        assert_eq!(request.image.width, 64);
        assert_eq!(request.image.height, 48);
        assert_eq!(request.raw.len(), 64 * 48 * 2);
    }
}
