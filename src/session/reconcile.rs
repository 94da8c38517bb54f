// SPDX-License-Identifier: GPL-3.0-only

//! Settings reconciliation
//!
//! Keeps the client-visible settings record consistent with what the
//! device actually applied. Hardware may clamp or adjust commanded
//! values; the [`Reconciler`] folds every confirmed snapshot back into
//! the record and notifies the client sink only on genuine differences,
//! so no redundant churn reaches the presentation layer.
//!
//! The [`SyncTicker`] separately re-pushes the client's current exposure
//! toward the device once per second. It reads the record at each tick,
//! so it only ever pushes the client's latest value and cannot fight an
//! explicit user edit.

use crate::backends::camera::types::AppliedState;
use crate::config::{clamp_exposure_s, CameraSettings, SettingsStore};
use crate::constants::SYNC_INTERVAL;
use crate::session::acquisition::{ControlRequest, ControlSlot};
use crate::session::sinks::Binding;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Exposure comparisons tolerate float noise up to this bound
const EXPOSURE_EPSILON: f64 = 1e-6;

/// Fold a confirmed snapshot into the record.
///
/// Integer fields compare exactly; floating fields within an epsilon.
/// Returns the genuine differences written, or `None` when the record
/// already matched.
pub fn reconcile(settings: &mut CameraSettings, applied: &AppliedState) -> Option<AppliedState> {
    let mut delta = AppliedState::default();

    if let Some(exposure) = applied.exposure_s {
        let exposure = clamp_exposure_s(exposure);
        if (exposure - settings.exposure_s).abs() > EXPOSURE_EPSILON {
            settings.exposure_s = exposure;
            delta.exposure_s = Some(exposure);
        }
    }
    if let Some(focus) = applied.focus_mm {
        if focus != settings.focus_mm {
            settings.set_focus_mm(i64::from(focus));
            delta.focus_mm = Some(settings.focus_mm);
        }
    }

    if delta.is_empty() {
        None
    } else {
        Some(delta)
    }
}

/// Service thread draining confirmed-applied snapshots into the record
pub struct Reconciler {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Reconciler {
    pub fn spawn(
        applied_rx: Receiver<AppliedState>,
        settings: SettingsStore,
        changed: Binding<AppliedState>,
    ) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let thread_running = Arc::clone(&running);

        let handle = thread::spawn(move || {
            while thread_running.load(Ordering::SeqCst) {
                match applied_rx.recv_timeout(Duration::from_millis(250)) {
                    Ok(applied) => {
                        if let Some(delta) = settings.update(|s| reconcile(s, &applied)) {
                            debug!(?delta, "Settings corrected from device feedback");
                            changed.send(delta);
                        }
                    }
                    Err(RecvTimeoutError::Timeout) => continue,
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            trace!("Reconciler exited");
        });

        Self {
            running,
            handle: Some(handle),
        }
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Reconciler thread panicked");
            }
        }
    }
}

impl Drop for Reconciler {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Periodic exposure re-push guarding against silent device-side drift
pub struct SyncTicker {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl SyncTicker {
    pub fn spawn(settings: SettingsStore, slot: ControlSlot) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let thread_running = Arc::clone(&running);

        let handle = thread::spawn(move || {
            while sleep_while_running(&thread_running, SYNC_INTERVAL) {
                let exposure = settings.snapshot().exposure_s;
                let sender = slot.lock().unwrap().clone();
                if let Some(sender) = sender {
                    // A dead loop just drops the request
                    let _ = sender.send(ControlRequest::ApplyPartial {
                        focus_mm: None,
                        exposure_s: Some(exposure),
                    });
                }
            }
            trace!("Sync ticker exited");
        });

        Self {
            running,
            handle: Some(handle),
        }
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Sync ticker thread panicked");
            }
        }
    }
}

impl Drop for SyncTicker {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Sleep in small steps so stop requests stay responsive; returns false
/// once the flag clears
fn sleep_while_running(running: &AtomicBool, total: Duration) -> bool {
    let step = Duration::from_millis(50);
    let mut slept = Duration::ZERO;
    while slept < total {
        if !running.load(Ordering::SeqCst) {
            return false;
        }
        thread::sleep(step);
        slept += step;
    }
    running.load(Ordering::SeqCst)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn test_reconcile_updates_on_genuine_difference() {
        let mut settings = CameraSettings::default();
        let applied = AppliedState {
            focus_mm: Some(5000),
            exposure_s: Some(2.5),
        };
        let delta = reconcile(&mut settings, &applied).expect("difference expected");
        assert_eq!(delta.focus_mm, Some(5000));
        assert_eq!(delta.exposure_s, Some(2.5));
        assert_eq!(settings.focus_mm, 5000);
        assert_eq!(settings.exposure_s, 2.5);
    }

    #[test]
    fn test_reconcile_ignores_matching_values() {
        let mut settings = CameraSettings::default();
        let applied = AppliedState {
            focus_mm: Some(settings.focus_mm),
            exposure_s: Some(settings.exposure_s),
        };
        assert!(reconcile(&mut settings, &applied).is_none());
    }

    #[test]
    fn test_reconcile_tolerates_float_noise() {
        let mut settings = CameraSettings::default();
        settings.set_exposure_s(2.5);
        let applied = AppliedState {
            focus_mm: None,
            exposure_s: Some(2.5 + 1e-9),
        };
        assert!(reconcile(&mut settings, &applied).is_none());
        assert_eq!(settings.exposure_s, 2.5);
    }

    #[test]
    fn test_reconcile_partial_snapshot() {
        let mut settings = CameraSettings::default();
        let applied = AppliedState {
            focus_mm: None,
            exposure_s: Some(10.0),
        };
        let delta = reconcile(&mut settings, &applied).expect("difference expected");
        assert_eq!(delta.focus_mm, None);
        assert_eq!(delta.exposure_s, Some(10.0));
        assert_eq!(settings.focus_mm, 1000);
    }

    #[test]
    fn test_reconciler_forwards_deltas_to_client_sink() {
        let (applied_tx, applied_rx) = mpsc::channel();
        let (changed_tx, changed_rx) = mpsc::channel();
        let (changed, _token) = Binding::new(changed_tx);
        let store = SettingsStore::default();
        let mut reconciler = Reconciler::spawn(applied_rx, store.clone(), changed);

        applied_tx
            .send(AppliedState {
                focus_mm: Some(2000),
                exposure_s: None,
            })
            .unwrap();

        let delta = changed_rx
            .recv_timeout(Duration::from_secs(2))
            .expect("delta should be forwarded");
        assert_eq!(delta.focus_mm, Some(2000));
        assert_eq!(store.snapshot().focus_mm, 2000);

        // A matching snapshot produces no client churn
        applied_tx
            .send(AppliedState {
                focus_mm: Some(2000),
                exposure_s: None,
            })
            .unwrap();
        assert!(changed_rx.recv_timeout(Duration::from_millis(400)).is_err());

        reconciler.stop();
    }

    #[test]
    fn test_ticker_pushes_current_exposure() {
        let (control_tx, control_rx) = mpsc::channel();
        let slot: ControlSlot = Arc::new(std::sync::Mutex::new(Some(control_tx)));
        let store = SettingsStore::default();
        store.update(|s| s.set_exposure_s(4.2));

        let mut ticker = SyncTicker::spawn(store, slot);
        let request = control_rx
            .recv_timeout(Duration::from_secs(3))
            .expect("tick should arrive");
        match request {
            ControlRequest::ApplyPartial {
                focus_mm,
                exposure_s,
            } => {
                assert_eq!(focus_mm, None);
                assert_eq!(exposure_s, Some(4.2));
            }
            other => panic!("unexpected request {other:?}"),
        }
        ticker.stop();
    }

    #[test]
    fn test_ticker_with_empty_slot_is_noop() {
        let slot: ControlSlot = Arc::new(std::sync::Mutex::new(None));
        let mut ticker = SyncTicker::spawn(SettingsStore::default(), slot);
        thread::sleep(Duration::from_millis(100));
        ticker.stop();
    }
}
