// SPDX-License-Identifier: GPL-3.0-only

use spectrocam::session::{EventSinks, SessionController};
use spectrocam::{v4l2_factory, JsonPreferenceStore};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;
use tracing::{debug, error, info, trace};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=spectrocam=debug, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let shutdown = Arc::new(AtomicBool::new(false));
    let ctrlc_shutdown = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        info!("Shutdown requested");
        ctrlc_shutdown.store(true, Ordering::SeqCst);
    })?;

    let (frame_tx, frame_rx) = mpsc::sync_channel(1);
    let (error_tx, error_rx) = mpsc::channel();
    let (settings_tx, settings_rx) = mpsc::channel();

    let prefs = Arc::new(JsonPreferenceStore::open_default());
    let mut session = SessionController::new(
        v4l2_factory(0),
        prefs,
        EventSinks {
            frames: frame_tx,
            errors: error_tx,
            settings: settings_tx,
        },
    );

    session.start_preview()?;
    info!("Previewing; press Ctrl-C to stop");

    let mut frame_count: u64 = 0;
    while !shutdown.load(Ordering::SeqCst) {
        match frame_rx.recv_timeout(Duration::from_millis(250)) {
            Ok(frame) => {
                frame_count += 1;
                if frame_count % 100 == 0 {
                    trace!(
                        frame_count,
                        width = frame.width,
                        height = frame.height,
                        "Preview streaming"
                    );
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }

        while let Ok(err) = error_rx.try_recv() {
            // Acquisition is fail-stop; a client decides when to restart
            error!(%err, "Camera acquisition error; preview halted");
        }
        while let Ok(delta) = settings_rx.try_recv() {
            debug!(?delta, "Settings corrected from device");
        }
    }

    session.stop();
    info!(frame_count, "Session closed");
    Ok(())
}
