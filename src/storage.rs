// SPDX-License-Identifier: GPL-3.0-only

//! Artifact storage for still captures
//!
//! Every capture produces two files named from one shared timestamp
//! token: the normalized image as lossless TIFF and the raw sensor
//! buffer as an uninterpreted binary dump.

use crate::backends::camera::types::FrameBuffer;
use crate::errors::{CameraError, CameraResult};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Create the results directory if absent
pub fn ensure_results_dir(path: &Path) -> CameraResult<()> {
    std::fs::create_dir_all(path)?;
    Ok(())
}

/// Artifact path pair for one timestamp token
pub fn artifact_paths(dir: &Path, timestamp: &str) -> (PathBuf, PathBuf) {
    (
        dir.join(format!("{timestamp}.tiff")),
        dir.join(format!("{timestamp}.raw")),
    )
}

/// Save a normalized RGB frame as maximum-quality (lossless) TIFF
pub fn save_image(frame: &FrameBuffer, path: &Path) -> CameraResult<()> {
    if frame.channels != 3 {
        return Err(CameraError::CaptureFailed(format!(
            "expected 3-channel frame, got {}",
            frame.channels
        )));
    }

    let packed = packed_rows(frame);
    let image: image::RgbImage =
        image::ImageBuffer::from_raw(frame.width, frame.height, packed).ok_or_else(|| {
            CameraError::CaptureFailed("frame dimensions do not match buffer size".to_string())
        })?;
    image.save(path)?;
    debug!(path = %path.display(), "Image artifact saved");
    Ok(())
}

/// Write the raw sensor buffer as-is
pub fn save_raw(data: &[u8], path: &Path) -> CameraResult<()> {
    std::fs::write(path, data)?;
    debug!(path = %path.display(), bytes = data.len(), "Raw artifact saved");
    Ok(())
}

/// Strip row padding so the pixel data is densely packed
fn packed_rows(frame: &FrameBuffer) -> Vec<u8> {
    let row_bytes = (frame.width * u32::from(frame.channels)) as usize;
    let stride = frame.stride as usize;
    if stride == row_bytes {
        return frame.data.clone();
    }
    let mut packed = Vec::with_capacity(row_bytes * frame.height as usize);
    for row in 0..frame.height as usize {
        let start = row * stride;
        let end = (start + row_bytes).min(frame.data.len());
        packed.extend_from_slice(&frame.data[start..end]);
    }
    packed
}
