use serde::{Deserialize, Serialize};
use std::fmt;

/// Sample streams tracked by the aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modality {
    Depth,
    Visible,
    Infrared,
    Accelerometer,
    Gyroscope,
}

impl Modality {
    pub const ALL: [Modality; 5] = [
        Modality::Depth,
        Modality::Visible,
        Modality::Infrared,
        Modality::Accelerometer,
        Modality::Gyroscope,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::Depth => "depth",
            Modality::Visible => "visible",
            Modality::Infrared => "infrared",
            Modality::Accelerometer => "accelerometer",
            Modality::Gyroscope => "gyroscope",
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A row-major image with one value per pixel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame<P> {
    /// Seconds since the capture source started producing samples.
    pub timestamp: f64,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<P>,
}

impl<P> Frame<P> {
    pub fn new(timestamp: f64, width: u32, height: u32, pixels: Vec<P>) -> Self {
        Self {
            timestamp,
            width,
            height,
            pixels,
        }
    }

    /// Returns true if the frame has non-zero dimensions and a matching pixel buffer.
    pub fn is_valid(&self) -> bool {
        self.width > 0
            && self.height > 0
            && self.pixels.len() == (self.width as usize) * (self.height as usize)
    }
}

/// Depth in millimetres; `0.0` marks a pixel without a reading.
pub type DepthFrame = Frame<f32>;

/// 8-bit grayscale visible camera image.
pub type VisibleFrame = Frame<u8>;

/// 16-bit infrared image. With both cameras enabled the images sit side by side.
pub type InfraredFrame = Frame<u16>;

/// One accelerometer (g) or gyroscope (rad/s) reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionEvent {
    pub timestamp: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Image modalities captured at the same instant. Any slot may be absent.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SynchronizedFrames {
    pub depth: Option<DepthFrame>,
    pub visible: Option<VisibleFrame>,
    pub infrared: Option<InfraredFrame>,
}

/// Everything a capture source can deliver on the sample path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum CaptureSample {
    Depth(DepthFrame),
    Visible(VisibleFrame),
    Infrared(InfraredFrame),
    Accelerometer(MotionEvent),
    Gyroscope(MotionEvent),
    Synchronized(SynchronizedFrames),
}

impl CaptureSample {
    pub fn kind(&self) -> &'static str {
        match self {
            CaptureSample::Depth(_) => "depth",
            CaptureSample::Visible(_) => "visible",
            CaptureSample::Infrared(_) => "infrared",
            CaptureSample::Accelerometer(_) => "accelerometer",
            CaptureSample::Gyroscope(_) => "gyroscope",
            CaptureSample::Synchronized(_) => "synchronized",
        }
    }
}

/// Lifecycle notifications from a capture source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    Connected,
    Booting,
    Ready,
    Disconnected,
    EndOfFile,
    Error,
    PowerSaving,
}

impl fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionEvent::Connected => "Connected",
            SessionEvent::Booting => "Booting",
            SessionEvent::Ready => "Ready",
            SessionEvent::Disconnected => "Disconnected",
            SessionEvent::EndOfFile => "EndOfFile",
            SessionEvent::Error => "Error",
            SessionEvent::PowerSaving => "PowerSaving",
        };
        f.write_str(name)
    }
}

/// Message delivered from a capture source to its listener.
#[derive(Debug, Clone)]
pub enum CaptureMessage {
    Event(SessionEvent),
    Sample(CaptureSample),
}
