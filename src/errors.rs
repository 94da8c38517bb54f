// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the camera session controller

use std::fmt;

/// Result type alias using CameraError
pub type CameraResult<T> = Result<T, CameraError>;

/// Main error type for device, capture and storage failures
#[derive(Debug, Clone)]
pub enum CameraError {
    /// Device failed to open or start; acquisition does not retry automatically
    DeviceUnavailable(String),
    /// A control-set call was rejected; prior device state presumed unchanged
    ControlsRejected(String),
    /// Device exists but is not started; callers treat this as a no-op
    DeviceNotReady,
    /// Any failure during still capture (mode selection, configuration,
    /// controls, request, artifact write)
    CaptureFailed(String),
    /// The acquisition thread did not join within the bounded wait
    StopTimeout,
    /// Storage/filesystem errors
    Storage(String),
}

impl fmt::Display for CameraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraError::DeviceUnavailable(msg) => write!(f, "Device unavailable: {}", msg),
            CameraError::ControlsRejected(msg) => write!(f, "Controls rejected: {}", msg),
            CameraError::DeviceNotReady => write!(f, "Device not ready"),
            CameraError::CaptureFailed(msg) => write!(f, "Capture failed: {}", msg),
            CameraError::StopTimeout => write!(f, "Acquisition loop did not stop in time"),
            CameraError::Storage(msg) => write!(f, "Storage error: {}", msg),
        }
    }
}

impl std::error::Error for CameraError {}

impl From<std::io::Error> for CameraError {
    fn from(err: std::io::Error) -> Self {
        CameraError::Storage(err.to_string())
    }
}

impl From<image::ImageError> for CameraError {
    fn from(err: image::ImageError) -> Self {
        CameraError::CaptureFailed(err.to_string())
    }
}
