// SPDX-License-Identifier: GPL-3.0-only

//! Camera device abstraction
//!
//! A [`CameraDevice`] is exclusive ownership of the physical camera: at
//! most one holder drives it at any instant. The session layer enforces
//! that by fully tearing one holder down before standing up the next, so
//! the trait itself carries no locking.
//!
//! Devices come from a [`DeviceFactory`] so the session layer can open
//! independent instances for preview and still capture, and so tests can
//! substitute the mock backend.

pub mod controls;
pub mod mock;
pub mod types;
pub mod v4l2;

pub use types::*;

use crate::errors::CameraResult;
use std::sync::Arc;

/// Exclusive handle to the physical camera resource
pub trait CameraDevice: Send {
    /// Apply the continuous-preview configuration
    fn configure_preview(&mut self, config: &PreviewConfig) -> CameraResult<()>;

    /// Apply a one-shot still-capture configuration
    fn configure_still(&mut self, config: &StillConfig) -> CameraResult<()>;

    /// Apply a batch of controls in one call.
    ///
    /// Returns the effective values the device accepted, which may be
    /// clamped relative to the request; a rejected control fails the
    /// whole batch and the device retains its prior state.
    fn set_controls(&mut self, controls: &ControlSet) -> CameraResult<ControlSet>;

    /// Start streaming
    fn start(&mut self) -> CameraResult<()>;

    /// Stop streaming; safe to call when not started
    fn stop(&mut self) -> CameraResult<()>;

    fn is_started(&self) -> bool;

    /// Enumerate the hardware-supported sensor modes
    fn sensor_modes(&mut self) -> CameraResult<Vec<SensorMode>>;

    /// Report the device's current control state, used to carry settings
    /// across a preview/capture transition
    fn metadata(&mut self) -> CameraResult<ControlSet>;

    /// Capture the next preview frame together with its channel order
    fn capture_frame(&mut self) -> CameraResult<(FrameBuffer, ChannelOrder)>;

    /// Capture exactly one still request (normalized image + raw buffer)
    fn capture_still(&mut self) -> CameraResult<StillRequest>;

    /// Release the underlying device resource; safe to call repeatedly
    fn close(&mut self);
}

/// Shared constructor for independent device instances
pub type DeviceFactory = Arc<dyn Fn() -> CameraResult<Box<dyn CameraDevice>> + Send + Sync>;

/// Factory producing V4L2 devices at the given index (/dev/video{index})
pub fn v4l2_factory(index: usize) -> DeviceFactory {
    Arc::new(move || {
        let device = v4l2::V4l2Camera::open(index)?;
        Ok(Box::new(device) as Box<dyn CameraDevice>)
    })
}
