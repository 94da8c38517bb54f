// SPDX-License-Identifier: GPL-3.0-only

//! Camera session control
//!
//! The [`SessionController`] owns the device lifecycle: it stands up the
//! acquisition loop for preview, suspends it for one-shot still
//! captures, and restores preview afterward. At most one of the
//! acquisition loop and the capture operation ever holds the device;
//! the controller enforces that by fully stopping and joining one
//! before standing up the other, not by locking the device itself.
//!
//! States: `Idle → Previewing → SuspendedForCapture → Previewing → …`,
//! terminal `Stopped`.

pub mod acquisition;
pub mod capture;
pub mod reconcile;
pub mod sinks;

use crate::backends::camera::types::{AppliedState, CarriedState, FrameBuffer, PreviewConfig,
    StillCaptureResult};
use crate::backends::camera::DeviceFactory;
use crate::config::{clamp_exposure_s, save_settings, CameraSettings, PreferenceStore,
    SettingsStore};
use crate::constants::{RESULTS_DIR, SETTINGS_APPLY_DELAY, STOP_TIMEOUT};
use crate::errors::{CameraError, CameraResult};
use acquisition::{AcquisitionLoop, ControlRequest, ControlSlot, StopOutcome};
use reconcile::{Reconciler, SyncTicker};
use sinks::{Binding, BindingToken, FrameBinding};
use std::path::PathBuf;
use std::sync::mpsc::{self, Sender, SyncSender};
use std::sync::{Arc, Mutex};
use std::thread;
use tracing::{info, warn};

/// Session lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Previewing,
    SuspendedForCapture,
    Stopped,
}

/// Client-supplied event channels.
///
/// Frames arrive at ~33 Hz while previewing on a depth-1 channel; the
/// error channel fires at most once per acquisition-loop instance; the
/// settings channel carries hardware-confirmed corrections to the
/// client record.
pub struct EventSinks {
    pub frames: SyncSender<FrameBuffer>,
    pub errors: Sender<CameraError>,
    pub settings: Sender<AppliedState>,
}

pub struct SessionController {
    factory: DeviceFactory,
    prefs: Arc<dyn PreferenceStore>,
    settings: SettingsStore,
    sinks: EventSinks,
    results_dir: PathBuf,
    state: SessionState,
    acquisition: Option<AcquisitionLoop>,
    /// Revocation tokens of the current loop's bindings
    tokens: Vec<BindingToken>,
    control_slot: ControlSlot,
    applied_tx: Sender<AppliedState>,
    reconciler: Option<Reconciler>,
    ticker: Option<SyncTicker>,
    _settings_token: BindingToken,
}

impl SessionController {
    /// Build a session. Settings load from the preference store here and
    /// are written back on [`SessionController::stop`].
    pub fn new(factory: DeviceFactory, prefs: Arc<dyn PreferenceStore>, sinks: EventSinks) -> Self {
        let settings = SettingsStore::new(crate::config::load_settings(prefs.as_ref()));
        let control_slot: ControlSlot = Arc::new(Mutex::new(None));

        let (applied_tx, applied_rx) = mpsc::channel();
        let (changed, settings_token) = Binding::new(sinks.settings.clone());
        let reconciler = Reconciler::spawn(applied_rx, settings.clone(), changed);
        let ticker = SyncTicker::spawn(settings.clone(), Arc::clone(&control_slot));

        Self {
            factory,
            prefs,
            settings,
            sinks,
            results_dir: PathBuf::from(RESULTS_DIR),
            state: SessionState::Idle,
            acquisition: None,
            tokens: Vec::new(),
            control_slot,
            applied_tx,
            reconciler: Some(reconciler),
            ticker: Some(ticker),
            _settings_token: settings_token,
        }
    }

    /// Override the capture artifact directory
    pub fn with_results_dir(mut self, dir: PathBuf) -> Self {
        self.results_dir = dir;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Copy-out snapshot of the client-visible settings record
    pub fn settings(&self) -> CameraSettings {
        self.settings.snapshot()
    }

    /// Start (or restart) preview acquisition.
    ///
    /// Any previous loop is stopped with a bounded wait first and its
    /// sink bindings revoked; the returned outcome reports whether that
    /// stop completed or timed out (a timeout is degraded-but-safe, not
    /// fatal). A fresh loop is then bound to the client sinks, and a
    /// full-settings apply is scheduled after a short settle delay.
    /// Calling this while already previewing leaves exactly one loop.
    pub fn start_preview(&mut self) -> CameraResult<StopOutcome> {
        if self.state == SessionState::Stopped {
            return Err(CameraError::DeviceUnavailable("session is stopped".into()));
        }

        let outcome = self.teardown_acquisition();

        let (frames, frame_token) = FrameBinding::new(self.sinks.frames.clone());
        let (errors, error_token) = Binding::new(self.sinks.errors.clone());
        let (applied, applied_token) = Binding::new(self.applied_tx.clone());
        self.tokens = vec![frame_token, error_token, applied_token];

        let acquisition = AcquisitionLoop::spawn(
            Arc::clone(&self.factory),
            PreviewConfig::default(),
            self.settings.snapshot(),
            frames,
            errors,
            applied,
        );
        let control_tx = acquisition.control_sender();
        *self.control_slot.lock().unwrap() = Some(control_tx.clone());
        self.acquisition = Some(acquisition);

        // Deferred full apply: the device layer offers no readiness
        // signal, so give the fresh configuration a moment to settle
        let settings = self.settings.clone();
        thread::spawn(move || {
            thread::sleep(SETTINGS_APPLY_DELAY);
            let _ = control_tx.send(ControlRequest::ApplyFull(settings.snapshot()));
        });

        self.state = SessionState::Previewing;
        info!(?outcome, "Preview started");
        Ok(outcome)
    }

    /// Suspend preview for a still capture.
    ///
    /// Returns the settings snapshot and carried device state the
    /// capture operation needs. The acquisition loop is fully stopped
    /// and its bindings revoked so stale frames cannot arrive
    /// mid-capture; a stop timeout is logged and capture proceeds.
    pub fn begin_capture_session(&mut self) -> CameraResult<(CameraSettings, Option<CarriedState>)> {
        if self.state != SessionState::Previewing {
            return Err(CameraError::CaptureFailed(
                "capture requires an active preview".into(),
            ));
        }

        let carried = self.acquisition.as_ref().and_then(|a| a.carried_state());
        let snapshot = self.settings.snapshot();

        if self.teardown_acquisition() == StopOutcome::TimedOut {
            warn!("Acquisition loop stop timed out; proceeding with capture");
        }
        self.state = SessionState::SuspendedForCapture;
        Ok((snapshot, carried))
    }

    /// Return to preview after a capture, successful or not
    pub fn end_capture_session(&mut self) {
        if let Err(err) = self.start_preview() {
            warn!(%err, "Failed to restore preview after capture");
        }
    }

    /// Take one high-resolution still.
    ///
    /// Preview is suspended for the duration and restored on every exit
    /// path, including failures.
    pub fn capture_still(&mut self) -> CameraResult<StillCaptureResult> {
        let (snapshot, carried) = self.begin_capture_session()?;
        let result = capture::take_still(
            &self.factory,
            &snapshot,
            carried.as_ref(),
            &self.results_dir,
        );
        self.end_capture_session();
        result
    }

    /// Set the manual exposure time; the value is clamped, stored and
    /// pushed to the device
    pub fn set_exposure(&self, seconds: f64) {
        let value = self.settings.update(|s| {
            s.set_exposure_s(seconds);
            s.exposure_s
        });
        self.push_partial(None, Some(value));
    }

    /// Step the exposure time, clamping and rounding to one decimal
    pub fn adjust_exposure(&self, delta: f64) {
        let value = self.settings.update(|s| {
            let stepped = clamp_exposure_s(s.exposure_s + delta);
            s.exposure_s = (stepped * 10.0).round() / 10.0;
            s.exposure_s
        });
        self.push_partial(None, Some(value));
    }

    /// Set the manual focus distance; clamped, stored and pushed
    pub fn set_focus(&self, distance_mm: i64) {
        let value = self.settings.update(|s| {
            s.set_focus_mm(distance_mm);
            s.focus_mm
        });
        self.push_partial(Some(value), None);
    }

    /// Step the focus distance
    pub fn adjust_focus(&self, delta_mm: i64) {
        let value = self.settings.update(|s| {
            s.set_focus_mm(i64::from(s.focus_mm) + delta_mm);
            s.focus_mm
        });
        self.push_partial(Some(value), None);
    }

    /// Select the white balance mode and re-apply the full record
    pub fn set_white_balance(&self, mode: crate::backends::camera::types::AwbMode) {
        self.settings.update(|s| s.awb_mode = mode);
        self.apply_all();
    }

    /// Select the exposure mode and re-apply the full record
    pub fn set_exposure_mode(&self, mode: crate::config::ExposureMode) {
        self.settings.update(|s| s.exposure_mode = mode);
        self.apply_all();
    }

    /// Update the tone controls and re-apply the full record
    pub fn set_tone_controls(
        &self,
        brightness: f32,
        contrast: f32,
        saturation: f32,
        sharpness: f32,
    ) {
        self.settings.update(|s| {
            s.brightness = brightness;
            s.set_contrast(contrast);
            s.set_saturation(saturation);
            s.set_sharpness(sharpness);
        });
        self.apply_all();
    }

    /// Accessory lens offsets are recorded only; they never reach the
    /// camera device
    pub fn set_lens1_offset(&self, value: i32) {
        self.settings.update(|s| s.lens1_pos = value);
    }

    pub fn set_lens2_offset(&self, value: i32) {
        self.settings.update(|s| s.lens2_pos = value);
    }

    /// Push the whole settings record to the device
    pub fn apply_all(&self) {
        let snapshot = self.settings.snapshot();
        self.send_control(ControlRequest::ApplyFull(snapshot));
    }

    /// Stop the session: tear down all service threads, release the
    /// device and write every settings field back to the store.
    pub fn stop(&mut self) {
        if self.state == SessionState::Stopped {
            return;
        }
        self.teardown_acquisition();
        if let Some(mut ticker) = self.ticker.take() {
            ticker.stop();
        }
        if let Some(mut reconciler) = self.reconciler.take() {
            reconciler.stop();
        }
        save_settings(self.prefs.as_ref(), &self.settings.snapshot());
        self.state = SessionState::Stopped;
        info!("Session stopped");
    }

    fn push_partial(&self, focus_mm: Option<u32>, exposure_s: Option<f64>) {
        self.send_control(ControlRequest::ApplyPartial {
            focus_mm,
            exposure_s,
        });
    }

    fn send_control(&self, request: ControlRequest) {
        let sender = self.control_slot.lock().unwrap().clone();
        if let Some(sender) = sender {
            let _ = sender.send(request);
        }
    }

    /// Detach and stop the current loop, if any. The control slot is
    /// cleared and every binding revoked before the bounded stop, so a
    /// straggling producer cannot deliver into the next session phase.
    fn teardown_acquisition(&mut self) -> StopOutcome {
        *self.control_slot.lock().unwrap() = None;
        for token in self.tokens.drain(..) {
            token.revoke();
        }
        match self.acquisition.take() {
            Some(mut acquisition) => acquisition.stop(STOP_TIMEOUT),
            None => StopOutcome::Stopped,
        }
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.stop();
    }
}
