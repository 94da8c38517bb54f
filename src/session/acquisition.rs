// SPDX-License-Identifier: GPL-3.0-only

//! Continuous preview acquisition
//!
//! The loop runs on a dedicated thread and owns the device handle for
//! its whole life: open, configure, restore persisted settings, stream.
//! Each cycle first drains queued control requests (the only path by
//! which foreground settings reach the streaming device), then captures
//! one frame, normalizes its channel order and delivers it to the frame
//! binding, then sleeps the fixed inter-frame interval.
//!
//! Any error during a capture cycle is reported once through the error
//! binding and stops the loop. A half-broken device must not be retried
//! silently at 30 ms intervals; the session controller restarts
//! acquisition explicitly after handling the error.

use crate::backends::camera::controls;
use crate::backends::camera::types::{AppliedState, CarriedState, ChannelOrder, PreviewConfig,
    Transform};
use crate::backends::camera::{CameraDevice, DeviceFactory};
use crate::config::CameraSettings;
use crate::constants::FRAME_INTERVAL;
use crate::errors::CameraError;
use crate::session::sinks::{Binding, FrameBinding};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Foreground-to-producer control message, consumed between capture
/// cycles so the producer never reads the settings record directly
#[derive(Debug, Clone)]
pub enum ControlRequest {
    /// Apply the full settings record
    ApplyFull(CameraSettings),
    /// Apply only the supplied keys
    ApplyPartial {
        focus_mm: Option<u32>,
        exposure_s: Option<f64>,
    },
}

/// Shared slot holding the live loop's control sender, if any.
///
/// The periodic settings sync writes into whichever loop instance is
/// current; between instances the slot is empty and ticks are no-ops.
pub type ControlSlot = Arc<Mutex<Option<Sender<ControlRequest>>>>;

/// Outcome of a bounded stop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// The producer thread exited and the device handle is released
    Stopped,
    /// The producer did not exit within the wait; it may still hold the
    /// device briefly. Callers decide whether to escalate.
    TimedOut,
}

/// Handle to a running acquisition loop
pub struct AcquisitionLoop {
    handle: Option<JoinHandle<()>>,
    running: Arc<AtomicBool>,
    control_tx: Sender<ControlRequest>,
    carried: Arc<Mutex<Option<CarriedState>>>,
}

impl AcquisitionLoop {
    /// Spawn the producer thread. The device is opened inside the thread;
    /// an open or start failure fires the error binding once and the
    /// thread exits.
    pub fn spawn(
        factory: DeviceFactory,
        config: PreviewConfig,
        initial: CameraSettings,
        frames: FrameBinding,
        errors: Binding<CameraError>,
        applied: Binding<AppliedState>,
    ) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let carried = Arc::new(Mutex::new(None));
        let (control_tx, control_rx) = mpsc::channel();

        let thread_running = Arc::clone(&running);
        let thread_carried = Arc::clone(&carried);
        info!("Starting acquisition loop");
        let handle = thread::spawn(move || {
            run_loop(
                factory,
                config,
                initial,
                frames,
                errors,
                applied,
                control_rx,
                thread_running,
                thread_carried,
            );
        });

        Self {
            handle: Some(handle),
            running,
            control_tx,
            carried,
        }
    }

    /// Sender for foreground control requests
    pub fn control_sender(&self) -> Sender<ControlRequest> {
        self.control_tx.clone()
    }

    /// Controls the loop last confirmed applied, for capture carry-over
    pub fn carried_state(&self) -> Option<CarriedState> {
        self.carried.lock().unwrap().clone()
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Request a cooperative stop and wait up to `timeout` for the
    /// producer to exit. Safe to call if the loop never started cleanly
    /// or already exited.
    pub fn stop(&mut self, timeout: Duration) -> StopOutcome {
        self.running.store(false, Ordering::SeqCst);

        let Some(handle) = self.handle.take() else {
            return StopOutcome::Stopped;
        };

        let deadline = Instant::now() + timeout;
        while !handle.is_finished() {
            if Instant::now() >= deadline {
                warn!("Acquisition loop did not stop within the bounded wait");
                // Leave the thread detached; its exit path still stops
                // and closes the device
                return StopOutcome::TimedOut;
            }
            thread::sleep(Duration::from_millis(5));
        }
        if handle.join().is_err() {
            warn!("Acquisition loop thread panicked");
        }
        debug!("Acquisition loop stopped");
        StopOutcome::Stopped
    }
}

impl Drop for AcquisitionLoop {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.stop(crate::constants::STOP_TIMEOUT);
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn run_loop(
    factory: DeviceFactory,
    config: PreviewConfig,
    initial: CameraSettings,
    frames: FrameBinding,
    errors: Binding<CameraError>,
    applied: Binding<AppliedState>,
    control_rx: Receiver<ControlRequest>,
    running: Arc<AtomicBool>,
    carried: Arc<Mutex<Option<CarriedState>>>,
) {
    let mut device = match open_device(&factory, &config, &initial) {
        Ok(device) => device,
        Err(err) => {
            warn!(%err, "Failed to initialize camera");
            errors.send(err);
            running.store(false, Ordering::SeqCst);
            return;
        }
    };

    publish_carried(&mut *device, &carried);

    while running.load(Ordering::SeqCst) {
        while let Ok(request) = control_rx.try_recv() {
            handle_control_request(&mut *device, request, &applied);
            publish_carried(&mut *device, &carried);
        }

        match device.capture_frame() {
            Ok((mut frame, order)) => {
                if order == ChannelOrder::Bgr {
                    frame.swap_channels_rb();
                }
                frames.send(frame);
            }
            Err(err) => {
                warn!(%err, "Camera capture error");
                errors.send(err);
                break;
            }
        }

        thread::sleep(FRAME_INTERVAL);
    }

    if let Err(err) = device.stop() {
        warn!(%err, "Error stopping camera on loop exit");
    }
    device.close();
    running.store(false, Ordering::SeqCst);
    info!("Acquisition loop exited");
}

fn open_device(
    factory: &DeviceFactory,
    config: &PreviewConfig,
    initial: &CameraSettings,
) -> Result<Box<dyn CameraDevice>, CameraError> {
    let mut device = factory()?;
    device.configure_preview(config)?;
    // Basic image controls restore before streaming; focus and exposure
    // arrive with the deferred full apply
    if let Err(err) = controls::restore_basic(device.as_mut(), initial) {
        warn!(%err, "Failed to restore persisted settings");
    }
    device.start()?;
    Ok(device)
}

fn handle_control_request(
    device: &mut dyn CameraDevice,
    request: ControlRequest,
    applied: &Binding<AppliedState>,
) {
    match request {
        ControlRequest::ApplyFull(settings) => {
            match controls::apply_full(device, &settings) {
                Ok(state) => {
                    applied.send(state);
                }
                Err(CameraError::DeviceNotReady) => {
                    debug!("Device not ready for full settings apply");
                }
                Err(err) => warn!(%err, "Full settings apply failed"),
            }
        }
        ControlRequest::ApplyPartial {
            focus_mm,
            exposure_s,
        } => match controls::apply_partial(device, focus_mm, exposure_s) {
            Ok(Some(state)) => {
                applied.send(state);
            }
            Ok(None) => {}
            Err(err) => warn!(%err, "Partial settings apply failed"),
        },
    }
}

/// Publish the device's current control state for capture carry-over
fn publish_carried(device: &mut dyn CameraDevice, carried: &Arc<Mutex<Option<CarriedState>>>) {
    match device.metadata() {
        Ok(controls) => {
            *carried.lock().unwrap() = Some(CarriedState {
                controls,
                transform: Transform::default(),
            });
        }
        Err(err) => debug!(%err, "No device metadata available"),
    }
}
