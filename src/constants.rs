// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use std::time::Duration;

/// Preview stream width in pixels
pub const PREVIEW_WIDTH: u32 = 1280;

/// Preview stream height in pixels
pub const PREVIEW_HEIGHT: u32 = 720;

/// Sleep between preview capture cycles (~33 fps).
///
/// This is a deliberate throttle, not a precision timer; jitter is
/// acceptable. It also bounds the worst-case cooperative-stop latency of
/// the acquisition loop.
pub const FRAME_INTERVAL: Duration = Duration::from_millis(30);

/// Bounded wait for the acquisition thread to join during a mode switch
/// or shutdown. Expiry is a warning, not a fatal error.
pub const STOP_TIMEOUT: Duration = Duration::from_secs(2);

/// Delay before the deferred full-settings apply after preview start.
///
/// The device layer offers no readiness signal, so this is a heuristic
/// letting the freshly configured stream settle; treat as a tunable, not
/// a guarantee.
pub const SETTINGS_APPLY_DELAY: Duration = Duration::from_millis(500);

/// Settle time between starting the still-capture device and issuing the
/// one-shot request, giving the sensor time to converge to the commanded
/// exposure. Heuristic, not a readiness poll.
pub const CAPTURE_SETTLE: Duration = Duration::from_secs(1);

/// Interval of the periodic exposure re-push toward the device
pub const SYNC_INTERVAL: Duration = Duration::from_secs(1);

/// Buffer pool size for the still-capture configuration
pub const STILL_BUFFER_COUNT: u32 = 2;

/// Fallback still resolution when sensor-mode enumeration fails
pub const DEFAULT_STILL_RESOLUTION: (u32, u32) = (1920, 1080);

/// Minimum sensor bit depth preferred for still capture
pub const MIN_STILL_BIT_DEPTH: u8 = 10;

/// Valid manual focus distance range in millimeters
pub const FOCUS_RANGE_MM: (u32, u32) = (10, 10_000);

/// Valid manual exposure range in seconds
pub const EXPOSURE_RANGE_S: (f64, f64) = (0.1, 30.0);

/// Shared timestamp token format for the artifact pair of one capture
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Default directory for capture artifacts, relative to the working
/// directory unless the caller overrides it
pub const RESULTS_DIR: &str = "results";
