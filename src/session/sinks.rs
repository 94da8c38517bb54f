// SPDX-License-Identifier: GPL-3.0-only

//! Revocable sink bindings
//!
//! Each acquisition-loop instance delivers events through bindings the
//! session controller can revoke exactly once at detach. A straggling
//! producer thread therefore cannot deliver stale frames or errors into
//! a session that has already moved on.

use crate::backends::camera::types::FrameBuffer;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Sender, SyncSender, TrySendError};
use std::sync::Arc;

/// Revocation capability for one binding; consuming it revokes exactly once
pub struct BindingToken {
    revoked: Arc<AtomicBool>,
}

impl BindingToken {
    pub fn revoke(self) {
        self.revoked.store(true, Ordering::SeqCst);
    }
}

/// Unbounded event binding (errors, applied-state snapshots)
pub struct Binding<T> {
    tx: Sender<T>,
    revoked: Arc<AtomicBool>,
}

impl<T> Binding<T> {
    pub fn new(tx: Sender<T>) -> (Self, BindingToken) {
        let revoked = Arc::new(AtomicBool::new(false));
        (
            Self {
                tx,
                revoked: Arc::clone(&revoked),
            },
            BindingToken { revoked },
        )
    }

    /// Deliver unless revoked or disconnected
    pub fn send(&self, value: T) -> bool {
        if self.revoked.load(Ordering::SeqCst) {
            return false;
        }
        self.tx.send(value).is_ok()
    }
}

/// Bounded frame binding with at most one in-flight frame.
///
/// Delivery never blocks the producer: when the consumer has not taken
/// the previous frame yet, the new one is dropped, preserving order
/// without building a queue.
pub struct FrameBinding {
    tx: SyncSender<FrameBuffer>,
    revoked: Arc<AtomicBool>,
}

impl FrameBinding {
    pub fn new(tx: SyncSender<FrameBuffer>) -> (Self, BindingToken) {
        let revoked = Arc::new(AtomicBool::new(false));
        (
            Self {
                tx,
                revoked: Arc::clone(&revoked),
            },
            BindingToken { revoked },
        )
    }

    /// Deliver unless revoked; a full channel drops the frame
    pub fn send(&self, frame: FrameBuffer) -> bool {
        if self.revoked.load(Ordering::SeqCst) {
            return false;
        }
        match self.tx.try_send(frame) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => true,
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    fn frame() -> FrameBuffer {
        FrameBuffer {
            width: 2,
            height: 2,
            channels: 3,
            stride: 6,
            data: vec![0; 12],
        }
    }

    #[test]
    fn test_binding_delivers_until_revoked() {
        let (tx, rx) = mpsc::channel();
        let (binding, token) = Binding::new(tx);
        assert!(binding.send(1u32));
        assert_eq!(rx.try_recv().unwrap(), 1);

        token.revoke();
        assert!(!binding.send(2u32));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_binding_reports_disconnect() {
        let (tx, rx) = mpsc::channel();
        let (binding, _token) = Binding::new(tx);
        drop(rx);
        assert!(!binding.send(1u32));
    }

    #[test]
    fn test_frame_binding_drops_instead_of_blocking() {
        let (tx, rx) = mpsc::sync_channel(1);
        let (binding, _token) = FrameBinding::new(tx);
        assert!(binding.send(frame()));
        // Consumer has not drained; the second frame is dropped, not queued
        assert!(binding.send(frame()));
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_frame_binding_revocation() {
        let (tx, rx) = mpsc::sync_channel(1);
        let (binding, token) = FrameBinding::new(tx);
        token.revoke();
        assert!(!binding.send(frame()));
        assert!(rx.try_recv().is_err());
    }
}
