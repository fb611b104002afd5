//! Camera stream management.
//!
//! The [`CameraManager`] owns at most one active [`VideoStream`]. Starting a
//! new capture releases the previous stream and waits a settle delay before
//! reacquiring the device, so the platform has time to let go of it.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use image::ExtendedColorType;
use image::codecs::jpeg::JpegEncoder;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use nimbus_types::ParseError;

use crate::error::{Error, Result};

/// Pause between releasing a stream and acquiring the next one.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(500);

/// JPEG quality for captured stills.
pub const JPEG_QUALITY: u8 = 80;

/// Which way the camera faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    /// Front camera.
    User,
    /// Rear camera.
    #[default]
    Environment,
}

impl fmt::Display for FacingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FacingMode::User => f.write_str("user"),
            FacingMode::Environment => f.write_str("environment"),
        }
    }
}

impl FromStr for FacingMode {
    type Err = ParseError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "user" | "front" => Ok(FacingMode::User),
            "environment" | "rear" | "back" => Ok(FacingMode::Environment),
            _ => Err(ParseError::InvalidData(format!("unknown facing mode: {s}"))),
        }
    }
}

/// Description of an open stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamInfo {
    /// Device label.
    pub device: String,
    /// Facing mode, if the device reports one.
    pub facing: Option<FacingMode>,
    pub width: u32,
    pub height: u32,
}

/// A raw RGB8 frame.
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl Frame {
    /// Encode the frame as a `data:image/jpeg;base64,...` URL.
    pub fn to_jpeg_data_url(&self, quality: u8) -> Result<String> {
        let expected = self.width as usize * self.height as usize * 3;
        if self.pixels.len() != expected || expected == 0 {
            return Err(Error::Encoding(format!(
                "frame is {}x{} but has {} bytes",
                self.width,
                self.height,
                self.pixels.len()
            )));
        }

        let mut jpeg = Vec::new();
        JpegEncoder::new_with_quality(&mut jpeg, quality)
            .encode(&self.pixels, self.width, self.height, ExtendedColorType::Rgb8)
            .map_err(|e| Error::Encoding(e.to_string()))?;

        Ok(format!("data:image/jpeg;base64,{}", BASE64.encode(&jpeg)))
    }
}

/// A camera device (or the platform's camera selection).
#[async_trait]
pub trait Camera: Send + Sync {
    /// Open a stream. `None` lets the platform pick its default camera.
    ///
    /// Returns [`Error::FacingUnavailable`] when no camera faces the
    /// requested way and [`Error::CameraBusy`] when the device is held.
    async fn open(&self, facing: Option<FacingMode>) -> Result<Box<dyn VideoStream>>;
}

/// An open camera stream.
pub trait VideoStream: Send {
    fn info(&self) -> &StreamInfo;

    /// Grab the current frame.
    fn grab_frame(&mut self) -> Result<Frame>;

    /// Release the device. Idempotent.
    fn stop(&mut self);
}

/// Owns the single active camera stream.
pub struct CameraManager {
    camera: Arc<dyn Camera>,
    settle_delay: Duration,
    quality: u8,
    active: Mutex<Option<Box<dyn VideoStream>>>,
}

impl fmt::Debug for CameraManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CameraManager")
            .field("settle_delay", &self.settle_delay)
            .field("quality", &self.quality)
            .finish_non_exhaustive()
    }
}

impl CameraManager {
    pub fn new(camera: Arc<dyn Camera>) -> Self {
        Self {
            camera,
            settle_delay: DEFAULT_SETTLE_DELAY,
            quality: JPEG_QUALITY,
            active: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    #[must_use]
    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality.clamp(1, 100);
        self
    }

    /// Start capturing, preferring `facing`.
    ///
    /// Any active stream is stopped first. If no camera faces the preferred
    /// way, the platform default camera is used instead.
    pub async fn start_capture(&self, facing: FacingMode) -> Result<StreamInfo> {
        let mut active = self.active.lock().await;

        if let Some(mut previous) = active.take() {
            debug!("Releasing camera {}", previous.info().device);
            previous.stop();
            tokio::time::sleep(self.settle_delay).await;
        }

        let stream = match self.camera.open(Some(facing)).await {
            Ok(stream) => stream,
            Err(Error::FacingUnavailable(mode)) => {
                warn!("No {} camera, falling back to default camera", mode);
                self.camera.open(None).await?
            }
            Err(e) => return Err(e),
        };

        let info = stream.info().clone();
        info!(
            "Camera started: {} ({}x{})",
            info.device, info.width, info.height
        );
        *active = Some(stream);
        Ok(info)
    }

    /// Stop the active stream. Returns whether one was active.
    pub async fn stop_capture(&self) -> bool {
        match self.active.lock().await.take() {
            Some(mut stream) => {
                stream.stop();
                debug!("Camera stopped");
                true
            }
            None => false,
        }
    }

    pub async fn is_active(&self) -> bool {
        self.active.lock().await.is_some()
    }

    pub async fn stream_info(&self) -> Option<StreamInfo> {
        self.active.lock().await.as_ref().map(|s| s.info().clone())
    }

    /// Grab the current frame of the active stream as a JPEG data URL.
    pub async fn capture_still(&self) -> Result<String> {
        let mut active = self.active.lock().await;
        let stream = active.as_mut().ok_or(Error::NoActiveStream)?;
        let frame = stream.grab_frame()?;
        frame.to_jpeg_data_url(self.quality)
    }
}

/// A synthetic camera rendering a moving test pattern.
///
/// Enforces single ownership like real hardware: opening while another
/// stream is live fails with [`Error::CameraBusy`].
#[derive(Debug)]
pub struct TestPatternCamera {
    width: u32,
    height: u32,
    facings: Vec<FacingMode>,
    open_streams: Arc<AtomicUsize>,
    opened: AtomicU32,
    unavailable: AtomicBool,
}

impl TestPatternCamera {
    /// A camera offering both facing modes at the given resolution.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            facings: vec![FacingMode::Environment, FacingMode::User],
            open_streams: Arc::new(AtomicUsize::new(0)),
            opened: AtomicU32::new(0),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Restrict the facing modes this camera provides.
    #[must_use]
    pub fn with_facings(mut self, facings: &[FacingMode]) -> Self {
        self.facings = facings.to_vec();
        self
    }

    /// Simulate an unplugged or blocked camera.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of streams currently open.
    pub fn open_streams(&self) -> usize {
        self.open_streams.load(Ordering::SeqCst)
    }

    /// Number of successful opens so far.
    pub fn open_count(&self) -> u32 {
        self.opened.load(Ordering::SeqCst)
    }
}

impl Default for TestPatternCamera {
    fn default() -> Self {
        Self::new(320, 240)
    }
}

#[async_trait]
impl Camera for TestPatternCamera {
    async fn open(&self, facing: Option<FacingMode>) -> Result<Box<dyn VideoStream>> {
        if self.unavailable.load(Ordering::SeqCst) || self.facings.is_empty() {
            return Err(Error::CameraUnavailable("no camera connected".into()));
        }
        let facing = match facing {
            Some(mode) if self.facings.contains(&mode) => mode,
            Some(mode) => return Err(Error::FacingUnavailable(mode)),
            None => self.facings[0],
        };
        if self.open_streams.load(Ordering::SeqCst) > 0 {
            return Err(Error::CameraBusy("device is already in use".into()));
        }

        self.open_streams.fetch_add(1, Ordering::SeqCst);
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(TestPatternStream {
            info: StreamInfo {
                device: format!("Test pattern ({facing})"),
                facing: Some(facing),
                width: self.width,
                height: self.height,
            },
            frame: 0,
            open_streams: Arc::clone(&self.open_streams),
            stopped: false,
        }))
    }
}

struct TestPatternStream {
    info: StreamInfo,
    frame: u32,
    open_streams: Arc<AtomicUsize>,
    stopped: bool,
}

impl VideoStream for TestPatternStream {
    fn info(&self) -> &StreamInfo {
        &self.info
    }

    fn grab_frame(&mut self) -> Result<Frame> {
        if self.stopped {
            return Err(Error::NoActiveStream);
        }
        let (w, h) = (self.info.width, self.info.height);
        let shift = self.frame;
        self.frame = self.frame.wrapping_add(1);

        let mut pixels = Vec::with_capacity(w as usize * h as usize * 3);
        for y in 0..h {
            for x in 0..w {
                pixels.push(((x + shift) * 255 / w.max(1)) as u8);
                pixels.push((y * 255 / h.max(1)) as u8);
                pixels.push((((x + y + shift) / 16) % 2 * 255) as u8);
            }
        }
        Ok(Frame {
            width: w,
            height: h,
            pixels,
        })
    }

    fn stop(&mut self) {
        if !self.stopped {
            self.stopped = true;
            self.open_streams.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

impl Drop for TestPatternStream {
    fn drop(&mut self) {
        self.stop();
    }
}
