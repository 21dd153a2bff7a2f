//! Streaming media encoder interface.
//!
//! Encoders accept raw RGBA frames and report their output asynchronously
//! through an [`EncoderEvent`] channel. Finalization is a two-step affair:
//! [`MediaEncoder::finalize`] only signals end of input, and the encoder
//! later sends [`EncoderEvent::Finished`] once every chunk has been emitted.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use slidecast_common::error::{SlidecastError, SlidecastResult};
use tokio::sync::mpsc;

/// Codec/container combinations an encoder may produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContainerFormat {
    /// VP9 in WebM. Preferred.
    WebmVp9,
    /// VP8 in WebM. The broadly supported fallback.
    WebmVp8,
    /// H.264 in fragmented MP4.
    Mp4H264,
}

impl ContainerFormat {
    /// All formats, most preferred first.
    pub const ALL: [ContainerFormat; 3] = [Self::WebmVp9, Self::WebmVp8, Self::Mp4H264];

    /// Configuration key (e.g. `webm-vp9`).
    pub fn key(self) -> &'static str {
        match self {
            Self::WebmVp9 => "webm-vp9",
            Self::WebmVp8 => "webm-vp8",
            Self::Mp4H264 => "mp4-h264",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::WebmVp9 => "video/webm;codecs=vp9",
            Self::WebmVp8 => "video/webm;codecs=vp8",
            Self::Mp4H264 => "video/mp4;codecs=avc1",
        }
    }

    /// File extension for hosts that save the blob.
    pub fn extension(self) -> &'static str {
        match self {
            Self::WebmVp9 | Self::WebmVp8 => "webm",
            Self::Mp4H264 => "mp4",
        }
    }

    /// ffmpeg encoder name.
    pub fn codec_name(self) -> &'static str {
        match self {
            Self::WebmVp9 => "libvpx-vp9",
            Self::WebmVp8 => "libvpx",
            Self::Mp4H264 => "libx264",
        }
    }

    /// ffmpeg muxer name.
    pub fn muxer(self) -> &'static str {
        match self {
            Self::WebmVp9 | Self::WebmVp8 => "webm",
            Self::Mp4H264 => "mp4",
        }
    }

    /// Parse a list of configuration keys, preserving order.
    pub fn parse_list<S: AsRef<str>>(keys: &[S]) -> SlidecastResult<Vec<Self>> {
        keys.iter().map(|key| key.as_ref().parse()).collect()
    }
}

impl fmt::Display for ContainerFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for ContainerFormat {
    type Err = SlidecastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|format| format.key().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| SlidecastError::config(format!("Unknown container format '{s}'")))
    }
}

/// Geometry and rate of the stream an encoder is opened for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSpec {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub format: ContainerFormat,
}

impl StreamSpec {
    /// Bytes in one raw RGBA frame.
    pub fn frame_len(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}

/// Output reported by an encoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncoderEvent {
    /// A piece of the container, in output order.
    Chunk(Vec<u8>),
    /// Every chunk has been emitted; the container is complete.
    Finished,
    /// The encoder failed; no further events follow.
    Failed(String),
}

/// Sending half of an encoder's event channel.
pub type EncoderEventSender = mpsc::UnboundedSender<EncoderEvent>;

/// Receiving half of an encoder's event channel.
pub type EncoderEventReceiver = mpsc::UnboundedReceiver<EncoderEvent>;

/// Create a fresh event channel.
pub fn event_channel() -> (EncoderEventSender, EncoderEventReceiver) {
    mpsc::unbounded_channel()
}

/// Trait for streaming encoders (ffmpeg subprocess, in-memory, ...).
#[async_trait::async_trait]
pub trait MediaEncoder: Send {
    /// Encoder name for logs.
    fn name(&self) -> &str;

    /// Probe capabilities ahead of [`supports`](Self::supports). Called
    /// once by the session before format negotiation.
    async fn prepare(&mut self) -> SlidecastResult<()> {
        Ok(())
    }

    /// Whether this encoder can produce `format`.
    fn supports(&self, format: ContainerFormat) -> bool;

    /// Open the encoder. Chunks and completion are reported on `events`.
    async fn open(&mut self, spec: StreamSpec, events: EncoderEventSender) -> SlidecastResult<()>;

    /// Deliver one raw RGBA frame of `spec.frame_len()` bytes.
    async fn write_frame(&mut self, frame: &[u8]) -> SlidecastResult<()>;

    /// Signal end of input. Completion arrives later as
    /// [`EncoderEvent::Finished`].
    async fn finalize(&mut self) -> SlidecastResult<()>;
}
