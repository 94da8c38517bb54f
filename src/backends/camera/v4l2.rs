// SPDX-License-Identifier: GPL-3.0-only

//! V4L2 camera backend
//!
//! Format negotiation and mmap streaming go through the `v4l` crate;
//! controls are set with raw `VIDIOC_*` ioctls so the driver's write-back
//! of accepted values can be surfaced as the effective control set.
//!
//! Semantic units are rescaled onto whatever range the driver reports:
//! exposure microseconds map to `EXPOSURE_ABSOLUTE` (100 µs units), the
//! lens position maps proportionally onto `FOCUS_ABSOLUTE`, and the
//! normalized tone controls map onto each control's min/max. White
//! balance presets select a color temperature with auto white balance
//! disabled.
//!
//! V4L2 exposes a single capture stream, so a still request yields the
//! normalized RGB image plus the untranslated driver buffer as the raw
//! artifact.

use super::types::{AfMode, AwbMode, ChannelOrder, ControlSet, FrameBuffer, PreviewConfig,
    SensorMode, StillConfig, StillRequest};
use super::CameraDevice;
use crate::errors::{CameraError, CameraResult};
use std::fs::File;
use std::os::unix::io::AsRawFd;
use tracing::{debug, info, warn};
use v4l::buffer::Type;
use v4l::io::mmap::Stream as MmapStream;
use v4l::io::traits::CaptureStream;
use v4l::video::Capture;
use v4l::{Device, Format, FourCC};

// ===== V4L2 control IDs =====

const V4L2_CTRL_CLASS_USER: u32 = 0x0098_0000;
const V4L2_CTRL_CLASS_CAMERA: u32 = 0x009a_0000;

const V4L2_CID_BASE: u32 = V4L2_CTRL_CLASS_USER | 0x900;
const V4L2_CID_CAMERA_CLASS_BASE: u32 = V4L2_CTRL_CLASS_CAMERA | 0x900;

const V4L2_CID_BRIGHTNESS: u32 = V4L2_CID_BASE;
const V4L2_CID_CONTRAST: u32 = V4L2_CID_BASE + 1;
const V4L2_CID_SATURATION: u32 = V4L2_CID_BASE + 2;
const V4L2_CID_AUTO_WHITE_BALANCE: u32 = V4L2_CID_BASE + 12;
const V4L2_CID_WHITE_BALANCE_TEMPERATURE: u32 = V4L2_CID_BASE + 26;
const V4L2_CID_SHARPNESS: u32 = V4L2_CID_BASE + 27;

const V4L2_CID_EXPOSURE_AUTO: u32 = V4L2_CID_CAMERA_CLASS_BASE + 1;
const V4L2_CID_EXPOSURE_ABSOLUTE: u32 = V4L2_CID_CAMERA_CLASS_BASE + 2;
const V4L2_CID_FOCUS_ABSOLUTE: u32 = V4L2_CID_CAMERA_CLASS_BASE + 10;
const V4L2_CID_FOCUS_AUTO: u32 = V4L2_CID_CAMERA_CLASS_BASE + 12;

/// Automatic exposure time and iris
const V4L2_EXPOSURE_AUTO: i32 = 0;
/// Manual exposure time and iris
const V4L2_EXPOSURE_MANUAL: i32 = 1;
/// Auto exposure time, manual iris
const V4L2_EXPOSURE_APERTURE_PRIORITY: i32 = 3;

// ===== V4L2 ioctl numbers =====
// (dir << 30) | (size << 16) | ('V' << 8) | nr

/// Get control value (v4l2_control: 8 bytes)
const VIDIOC_G_CTRL: libc::c_ulong = 0xC008_561B;
/// Set control value (v4l2_control: 8 bytes)
const VIDIOC_S_CTRL: libc::c_ulong = 0xC008_561C;
/// Query control info (v4l2_queryctrl: 68 bytes)
const VIDIOC_QUERYCTRL: libc::c_ulong = 0xC044_5624;

#[repr(C)]
struct V4l2Control {
    id: u32,
    value: i32,
}

#[repr(C)]
struct V4l2Queryctrl {
    id: u32,
    ctrl_type: u32,
    name: [u8; 32],
    minimum: i32,
    maximum: i32,
    step: i32,
    default_value: i32,
    flags: u32,
    reserved: [u32; 2],
}

/// Numeric bounds of one driver control
#[derive(Debug, Clone, Copy)]
struct ControlRange {
    minimum: i32,
    maximum: i32,
}

/// Query a control's range; `None` when the device lacks the control
fn query_control(device_path: &str, control_id: u32) -> Option<ControlRange> {
    let file = File::open(device_path).ok()?;
    let fd = file.as_raw_fd();

    let mut qctrl = V4l2Queryctrl {
        id: control_id,
        ctrl_type: 0,
        name: [0; 32],
        minimum: 0,
        maximum: 0,
        step: 0,
        default_value: 0,
        flags: 0,
        reserved: [0; 2],
    };

    let result = unsafe { libc::ioctl(fd, VIDIOC_QUERYCTRL, &mut qctrl as *mut V4l2Queryctrl) };
    if result < 0 {
        return None;
    }
    Some(ControlRange {
        minimum: qctrl.minimum,
        maximum: qctrl.maximum,
    })
}

/// Get the current value of a control
fn get_control(device_path: &str, control_id: u32) -> Option<i32> {
    let file = File::open(device_path).ok()?;
    let fd = file.as_raw_fd();

    let mut ctrl = V4l2Control {
        id: control_id,
        value: 0,
    };
    let result = unsafe { libc::ioctl(fd, VIDIOC_G_CTRL, &mut ctrl as *mut V4l2Control) };
    if result < 0 {
        debug!(device_path, control_id, "Failed to get V4L2 control");
        return None;
    }
    Some(ctrl.value)
}

/// Set a control value; the driver may clamp, so callers read back the
/// effective value afterwards
fn set_control(device_path: &str, control_id: u32, value: i32) -> CameraResult<()> {
    let file = File::open(device_path)
        .map_err(|e| CameraError::ControlsRejected(format!("open {device_path}: {e}")))?;
    let fd = file.as_raw_fd();

    let mut ctrl = V4l2Control {
        id: control_id,
        value,
    };
    let result = unsafe { libc::ioctl(fd, VIDIOC_S_CTRL, &mut ctrl as *mut V4l2Control) };
    if result < 0 {
        let errno = std::io::Error::last_os_error();
        return Err(CameraError::ControlsRejected(format!(
            "control {control_id:#x} = {value}: {errno}"
        )));
    }
    if ctrl.value != value {
        debug!(
            device_path,
            control_id,
            requested = value,
            actual = ctrl.value,
            "V4L2 control value was clamped"
        );
    }
    Ok(())
}

// ===== Semantic-to-native scaling =====

/// Semantic lens position bounds corresponding to the 10–10000 mm focus
/// range (position = 1000 / mm)
const LENS_POSITION_RANGE: (f32, f32) = (0.1, 100.0);
/// Semantic brightness bounds
const BRIGHTNESS_RANGE: (f32, f32) = (-1.0, 1.0);
/// Semantic bounds of contrast/saturation/sharpness, 1.0 = neutral
const TONE_RANGE: (f32, f32) = (0.0, 2.0);

/// Map a semantic value onto a driver control range proportionally
fn scale_to_range(value: f32, semantic: (f32, f32), range: ControlRange) -> i32 {
    let (lo, hi) = semantic;
    let t = ((value - lo) / (hi - lo)).clamp(0.0, 1.0);
    let span = (range.maximum - range.minimum) as f32;
    (range.minimum as f32 + t * span).round() as i32
}

/// Invert [`scale_to_range`]
fn scale_from_range(value: i32, semantic: (f32, f32), range: ControlRange) -> f32 {
    let (lo, hi) = semantic;
    let span = (range.maximum - range.minimum) as f32;
    if span == 0.0 {
        return lo;
    }
    let t = (value - range.minimum) as f32 / span;
    lo + t * (hi - lo)
}

/// Color temperature preset for a white balance mode, `None` for the
/// automatic mode
fn awb_temperature(mode: AwbMode) -> Option<i32> {
    match mode {
        AwbMode::Auto => None,
        AwbMode::Incandescent => Some(2800),
        AwbMode::Tungsten => Some(3200),
        AwbMode::Fluorescent => Some(4000),
        AwbMode::Indoor => Some(3000),
        AwbMode::Daylight => Some(5500),
        AwbMode::Cloudy => Some(6500),
        // Manual white balance without a preset keeps the current temperature
        AwbMode::Custom => None,
    }
}

/// Sensor bit depth implied by a pixel format
fn fourcc_bit_depth(fourcc: &FourCC) -> u8 {
    match &fourcc.repr {
        b"RG10" | b"BA10" | b"GB10" | b"BG10" | b"pRAA" => 10,
        b"RG12" | b"BA12" | b"GB12" | b"BG12" | b"pRCC" => 12,
        b"RG16" | b"BYR2" => 16,
        _ => 8,
    }
}

/// Convert one YUYV pixel pair's YUV sample to RGB (ITU-R BT.601)
fn yuv_to_rgb(y: u8, u: u8, v: u8) -> (u8, u8, u8) {
    let y = f32::from(y);
    let u = f32::from(u) - 128.0;
    let v = f32::from(v) - 128.0;

    let r = y + 1.402 * v;
    let g = y - 0.344_14 * u - 0.714_14 * v;
    let b = y + 1.772 * u;

    let clamp = |val: f32| val.clamp(0.0, 255.0) as u8;
    (clamp(r), clamp(g), clamp(b))
}

/// Expand a YUYV buffer into packed RGB
fn yuyv_to_rgb888(data: &[u8], width: u32, height: u32) -> Vec<u8> {
    let mut rgb = Vec::with_capacity((width * height * 3) as usize);
    for pair in data.chunks_exact(4).take((width * height / 2) as usize) {
        let (y0, u, y1, v) = (pair[0], pair[1], pair[2], pair[3]);
        let (r, g, b) = yuv_to_rgb(y0, u, v);
        rgb.extend_from_slice(&[r, g, b]);
        let (r, g, b) = yuv_to_rgb(y1, u, v);
        rgb.extend_from_slice(&[r, g, b]);
    }
    rgb
}

/// V4L2-backed camera device
pub struct V4l2Camera {
    path: String,
    // The mmap stream borrows the device for its whole life, so the
    // device is boxed and leaked at open and reclaimed at close, after
    // the stream is dropped.
    device: *mut Device,
    stream: Option<MmapStream<'static>>,
    format: Option<Format>,
    buffer_count: u32,
    started: bool,
    closed: bool,
}

// The raw device pointer is owned exclusively by this struct; Device
// itself is a Send fd wrapper.
unsafe impl Send for V4l2Camera {}

impl V4l2Camera {
    /// Open /dev/video{index}
    pub fn open(index: usize) -> CameraResult<Self> {
        let device = Device::new(index)
            .map_err(|e| CameraError::DeviceUnavailable(format!("/dev/video{index}: {e}")))?;
        let path = format!("/dev/video{index}");
        info!(%path, "Opened V4L2 device");
        Ok(Self {
            path,
            device: Box::into_raw(Box::new(device)),
            stream: None,
            format: None,
            buffer_count: 4,
            started: false,
            closed: false,
        })
    }

    fn dev(&self) -> CameraResult<&Device> {
        if self.closed {
            return Err(CameraError::DeviceNotReady);
        }
        Ok(unsafe { &*self.device })
    }

    fn negotiate(&mut self, width: u32, height: u32) -> CameraResult<()> {
        let requested = Format::new(width, height, FourCC::new(b"RGB3"));
        let actual = self
            .dev()?
            .set_format(&requested)
            .map_err(|e| CameraError::DeviceUnavailable(format!("set format: {e}")))?;
        debug!(
            width = actual.width,
            height = actual.height,
            fourcc = %actual.fourcc,
            "Negotiated format"
        );
        self.format = Some(actual);
        Ok(())
    }

    /// Convert one driver buffer to a normalized interleaved frame
    fn normalize(&self, data: &[u8]) -> CameraResult<(FrameBuffer, ChannelOrder)> {
        let format = self
            .format
            .as_ref()
            .ok_or(CameraError::DeviceNotReady)?;
        let (width, height) = (format.width, format.height);

        let (pixels, order) = match &format.fourcc.repr {
            b"RGB3" => (data.to_vec(), ChannelOrder::Rgb),
            b"BGR3" => (data.to_vec(), ChannelOrder::Bgr),
            b"YUYV" | b"YUY2" => (yuyv_to_rgb888(data, width, height), ChannelOrder::Rgb),
            other => {
                return Err(CameraError::CaptureFailed(format!(
                    "unsupported pixel format {:?}",
                    String::from_utf8_lossy(other)
                )))
            }
        };

        let expected = (width * height * 3) as usize;
        if pixels.len() < expected {
            return Err(CameraError::CaptureFailed(format!(
                "short frame: {} of {expected} bytes",
                pixels.len()
            )));
        }

        Ok((
            FrameBuffer {
                width,
                height,
                channels: 3,
                stride: width * 3,
                data: pixels,
            },
            order,
        ))
    }

    /// Apply one semantic control if the driver exposes it. A missing
    /// control is skipped (common on UVC hardware); a refused set fails
    /// the batch.
    fn try_set(&self, id: u32, value: i32) -> CameraResult<bool> {
        match query_control(&self.path, id) {
            Some(_) => {
                set_control(&self.path, id, value)?;
                Ok(true)
            }
            None => {
                debug!(control_id = id, "Control not present, skipped");
                Ok(false)
            }
        }
    }
}

impl CameraDevice for V4l2Camera {
    fn configure_preview(&mut self, config: &PreviewConfig) -> CameraResult<()> {
        self.buffer_count = 4;
        self.negotiate(config.width, config.height)
    }

    fn configure_still(&mut self, config: &StillConfig) -> CameraResult<()> {
        self.buffer_count = config.buffer_count.max(1);
        if config.enable_raw {
            // Single-stream backend: the raw artifact is the untranslated
            // driver buffer of the same request
            debug!("Raw stream folded into the capture buffer");
        }
        self.negotiate(config.width, config.height)
    }

    fn set_controls(&mut self, controls: &ControlSet) -> CameraResult<ControlSet> {
        if self.closed {
            return Err(CameraError::DeviceNotReady);
        }
        let mut effective = ControlSet::default();

        if let Some(enable) = controls.ae_enable {
            let target = if enable {
                // Drivers expose either full auto or aperture priority
                if set_control(&self.path, V4L2_CID_EXPOSURE_AUTO, V4L2_EXPOSURE_AUTO).is_ok() {
                    V4L2_EXPOSURE_AUTO
                } else {
                    set_control(
                        &self.path,
                        V4L2_CID_EXPOSURE_AUTO,
                        V4L2_EXPOSURE_APERTURE_PRIORITY,
                    )?;
                    V4L2_EXPOSURE_APERTURE_PRIORITY
                }
            } else {
                set_control(&self.path, V4L2_CID_EXPOSURE_AUTO, V4L2_EXPOSURE_MANUAL)?;
                V4L2_EXPOSURE_MANUAL
            };
            effective.ae_enable = Some(target != V4L2_EXPOSURE_MANUAL);
        }

        if let Some(us) = controls.exposure_time_us {
            // EXPOSURE_ABSOLUTE is in 100 µs units
            if let Some(range) = query_control(&self.path, V4L2_CID_EXPOSURE_ABSOLUTE) {
                let units = (us / 100).clamp(i64::from(range.minimum), i64::from(range.maximum));
                set_control(&self.path, V4L2_CID_EXPOSURE_ABSOLUTE, units as i32)?;
                let actual = get_control(&self.path, V4L2_CID_EXPOSURE_ABSOLUTE)
                    .map(|v| i64::from(v) * 100)
                    .unwrap_or(units * 100);
                effective.exposure_time_us = Some(actual);
            } else {
                debug!("Exposure control not present, skipped");
            }
        }

        if let Some(mode) = controls.af_mode {
            let auto = !matches!(mode, AfMode::Manual);
            if self.try_set(V4L2_CID_FOCUS_AUTO, i32::from(auto))? {
                effective.af_mode = Some(mode);
            }
        }

        if let Some(position) = controls.lens_position {
            if let Some(range) = query_control(&self.path, V4L2_CID_FOCUS_ABSOLUTE) {
                let value = scale_to_range(position, LENS_POSITION_RANGE, range);
                set_control(&self.path, V4L2_CID_FOCUS_ABSOLUTE, value)?;
                let actual = get_control(&self.path, V4L2_CID_FOCUS_ABSOLUTE).unwrap_or(value);
                effective.lens_position =
                    Some(scale_from_range(actual, LENS_POSITION_RANGE, range));
            } else {
                debug!("Focus control not present, skipped");
            }
        }

        if let Some(mode) = controls.awb_mode {
            match awb_temperature(mode) {
                None if mode == AwbMode::Auto => {
                    if self.try_set(V4L2_CID_AUTO_WHITE_BALANCE, 1)? {
                        effective.awb_mode = Some(mode);
                    }
                }
                temperature => {
                    let applied = self.try_set(V4L2_CID_AUTO_WHITE_BALANCE, 0)?;
                    if let Some(kelvin) = temperature {
                        self.try_set(V4L2_CID_WHITE_BALANCE_TEMPERATURE, kelvin)?;
                    }
                    if applied {
                        effective.awb_mode = Some(mode);
                    }
                }
            }
        }

        let tone_controls = [
            (controls.brightness, V4L2_CID_BRIGHTNESS, BRIGHTNESS_RANGE),
            (controls.contrast, V4L2_CID_CONTRAST, TONE_RANGE),
            (controls.saturation, V4L2_CID_SATURATION, TONE_RANGE),
            (controls.sharpness, V4L2_CID_SHARPNESS, TONE_RANGE),
        ];
        let mut tone_effective = [None; 4];
        for (slot, (value, id, semantic)) in tone_effective.iter_mut().zip(tone_controls) {
            if let Some(value) = value {
                if let Some(range) = query_control(&self.path, id) {
                    set_control(&self.path, id, scale_to_range(value, semantic, range))?;
                    let actual = get_control(&self.path, id)
                        .map(|v| scale_from_range(v, semantic, range));
                    *slot = actual.or(Some(value));
                }
            }
        }
        [
            effective.brightness,
            effective.contrast,
            effective.saturation,
            effective.sharpness,
        ] = tone_effective;

        if controls.noise_reduction.is_some() {
            debug!("Noise reduction has no V4L2 counterpart, skipped");
        }
        if controls.ae_exposure_mode.is_some() {
            debug!("AE program selection has no V4L2 counterpart, skipped");
        }

        Ok(effective)
    }

    fn start(&mut self) -> CameraResult<()> {
        if self.started {
            return Ok(());
        }
        // The device box outlives the stream until close(), which drops
        // the stream before reclaiming the box
        let device: &'static Device = unsafe {
            if self.closed {
                return Err(CameraError::DeviceNotReady);
            }
            &*self.device
        };
        let stream = MmapStream::with_buffers(device, Type::VideoCapture, self.buffer_count)
            .map_err(|e| CameraError::DeviceUnavailable(format!("start stream: {e}")))?;
        self.stream = Some(stream);
        self.started = true;
        info!(path = %self.path, "Streaming started");
        Ok(())
    }

    fn stop(&mut self) -> CameraResult<()> {
        if self.started {
            self.stream = None;
            self.started = false;
            info!(path = %self.path, "Streaming stopped");
        }
        Ok(())
    }

    fn is_started(&self) -> bool {
        self.started && !self.closed
    }

    fn sensor_modes(&mut self) -> CameraResult<Vec<SensorMode>> {
        let dev = self.dev()?;
        let descriptions = dev
            .enum_formats()
            .map_err(|e| CameraError::CaptureFailed(format!("enumerate formats: {e}")))?;

        let mut modes = Vec::new();
        for desc in descriptions {
            let bit_depth = fourcc_bit_depth(&desc.fourcc);
            let sizes = match dev.enum_framesizes(desc.fourcc) {
                Ok(sizes) => sizes,
                Err(_) => continue,
            };
            for framesize in sizes {
                match framesize.size {
                    v4l::framesize::FrameSizeEnum::Discrete(discrete) => {
                        modes.push(SensorMode {
                            width: discrete.width,
                            height: discrete.height,
                            bit_depth,
                        });
                    }
                    v4l::framesize::FrameSizeEnum::Stepwise(stepwise) => {
                        modes.push(SensorMode {
                            width: stepwise.max_width,
                            height: stepwise.max_height,
                            bit_depth,
                        });
                    }
                }
            }
        }
        if modes.is_empty() {
            return Err(CameraError::CaptureFailed("no sensor modes reported".into()));
        }
        Ok(modes)
    }

    fn metadata(&mut self) -> CameraResult<ControlSet> {
        if self.closed {
            return Err(CameraError::DeviceNotReady);
        }
        let mut controls = ControlSet::default();
        if let Some(units) = get_control(&self.path, V4L2_CID_EXPOSURE_ABSOLUTE) {
            controls.exposure_time_us = Some(i64::from(units) * 100);
        }
        if let (Some(value), Some(range)) = (
            get_control(&self.path, V4L2_CID_FOCUS_ABSOLUTE),
            query_control(&self.path, V4L2_CID_FOCUS_ABSOLUTE),
        ) {
            controls.lens_position = Some(scale_from_range(value, LENS_POSITION_RANGE, range));
        }
        if let Some(auto) = get_control(&self.path, V4L2_CID_AUTO_WHITE_BALANCE) {
            controls.awb_mode = Some(if auto != 0 { AwbMode::Auto } else { AwbMode::Custom });
        }
        Ok(controls)
    }

    fn capture_frame(&mut self) -> CameraResult<(FrameBuffer, ChannelOrder)> {
        if !self.is_started() {
            return Err(CameraError::DeviceNotReady);
        }
        let stream = self.stream.as_mut().ok_or(CameraError::DeviceNotReady)?;
        let (buf, meta) = stream
            .next()
            .map_err(|e| CameraError::CaptureFailed(format!("dequeue: {e}")))?;
        let used = (meta.bytesused as usize).min(buf.len());
        let data = buf[..used].to_vec();
        // Drop the stream borrow before normalizing
        self.normalize(&data)
    }

    fn capture_still(&mut self) -> CameraResult<StillRequest> {
        if !self.is_started() {
            return Err(CameraError::DeviceNotReady);
        }
        let stream = self.stream.as_mut().ok_or(CameraError::DeviceNotReady)?;
        let (buf, meta) = stream
            .next()
            .map_err(|e| CameraError::CaptureFailed(format!("dequeue: {e}")))?;
        let used = (meta.bytesused as usize).min(buf.len());
        let raw = buf[..used].to_vec();
        let (image, order) = self.normalize(&raw)?;
        let mut image = image;
        if order == ChannelOrder::Bgr {
            image.swap_channels_rb();
        }
        Ok(StillRequest { image, raw })
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.started = false;
        // Stream first: it borrows the leaked device box
        self.stream = None;
        if !self.device.is_null() {
            unsafe {
                drop(Box::from_raw(self.device));
            }
            self.device = std::ptr::null_mut();
        }
        info!(path = %self.path, "Device closed");
    }
}

impl Drop for V4l2Camera {
    fn drop(&mut self) {
        if !self.closed {
            warn!(path = %self.path, "Device dropped without close");
            self.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_id_values() {
        assert_eq!(V4L2_CID_EXPOSURE_AUTO, 0x009a_0901);
        assert_eq!(V4L2_CID_EXPOSURE_ABSOLUTE, 0x009a_0902);
        assert_eq!(V4L2_CID_FOCUS_ABSOLUTE, 0x009a_090a);
        assert_eq!(V4L2_CID_BRIGHTNESS, 0x0098_0900);
    }

    #[test]
    fn test_scale_round_trip() {
        let range = ControlRange {
            minimum: 0,
            maximum: 255,
        };
        for value in [-1.0f32, -0.5, 0.0, 0.5, 1.0] {
            let native = scale_to_range(value, BRIGHTNESS_RANGE, range);
            let back = scale_from_range(native, BRIGHTNESS_RANGE, range);
            assert!((back - value).abs() < 0.01, "{value} -> {native} -> {back}");
        }
    }

    #[test]
    fn test_scale_clamps_out_of_range_input() {
        let range = ControlRange {
            minimum: -100,
            maximum: 100,
        };
        assert_eq!(scale_to_range(5.0, TONE_RANGE, range), 100);
        assert_eq!(scale_to_range(-5.0, TONE_RANGE, range), -100);
    }

    #[test]
    fn test_fourcc_bit_depth() {
        assert_eq!(fourcc_bit_depth(&FourCC::new(b"YUYV")), 8);
        assert_eq!(fourcc_bit_depth(&FourCC::new(b"RG10")), 10);
        assert_eq!(fourcc_bit_depth(&FourCC::new(b"BG12")), 12);
    }

    #[test]
    fn test_awb_temperature_presets() {
        assert_eq!(awb_temperature(AwbMode::Auto), None);
        assert_eq!(awb_temperature(AwbMode::Daylight), Some(5500));
        assert_eq!(awb_temperature(AwbMode::Cloudy), Some(6500));
    }

    #[test]
    fn test_yuyv_conversion_size() {
        // 4x2 YUYV frame: 16 bytes in, 24 RGB bytes out
        let data = vec![128u8; 16];
        let rgb = yuyv_to_rgb888(&data, 4, 2);
        assert_eq!(rgb.len(), 24);
    }

    // Hardware-dependent paths are exercised on a device, not in CI
    #[test]
    #[ignore = "requires /dev/video0"]
    fn test_open_real_device() {
        let mut camera = V4l2Camera::open(0).expect("open device");
        let modes = camera.sensor_modes().expect("sensor modes");
        assert!(!modes.is_empty());
        camera.close();
    }
}
