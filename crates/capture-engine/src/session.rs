//! Recording session management.

use slidecast_common::config::EncoderConfig;
use slidecast_common::error::{SlidecastError, SlidecastResult};
use slidecast_project_model::FrameTarget;
use tokio::sync::mpsc::error::TryRecvError;

use crate::encoder::{
    event_channel, ContainerFormat, EncoderEvent, EncoderEventReceiver, MediaEncoder, StreamSpec,
};

/// Configuration for a recording session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Container formats to try, most preferred first.
    pub preferred_formats: Vec<ContainerFormat>,
}

impl SessionConfig {
    /// Build from the encoder section of the app config.
    pub fn from_encoder_config(config: &EncoderConfig) -> SlidecastResult<Self> {
        let preferred_formats = ContainerFormat::parse_list(&config.preferred_formats)?;
        if preferred_formats.is_empty() {
            return Err(SlidecastError::config(
                "At least one preferred container format is required",
            ));
        }
        Ok(Self { preferred_formats })
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            preferred_formats: vec![ContainerFormat::WebmVp9, ContainerFormat::WebmVp8],
        }
    }
}

/// State of a recording session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Session created but not started.
    Idle,
    /// Frames are being accepted.
    Recording,
    /// Finalize was signalled; waiting for the encoder to drain.
    Stopping,
    /// The container is assembled.
    Complete,
    /// The encoder failed. Terminal.
    Failed,
}

impl SessionState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Recording => "Recording",
            Self::Stopping => "Stopping",
            Self::Complete => "Complete",
            Self::Failed => "Failed",
        }
    }
}

/// The assembled result of a completed session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingOutput {
    /// All chunks concatenated in emission order.
    pub blob: Vec<u8>,
    /// Number of chunks that made up the blob.
    pub chunk_count: usize,
    /// Negotiated container format.
    pub format: ContainerFormat,
    /// Frames delivered to the encoder.
    pub frames_delivered: u64,
}

/// Lifecycle wrapper around a streaming media encoder.
///
/// `Idle -> Recording -> Stopping -> Complete`, with any encoder failure
/// in `Recording` or `Stopping` ending in `Failed`.
pub struct RecordingSession {
    config: SessionConfig,
    encoder: Box<dyn MediaEncoder>,
    state: SessionState,
    spec: Option<StreamSpec>,
    events: Option<EncoderEventReceiver>,
    chunks: Vec<Vec<u8>>,
    frames_delivered: u64,
}

impl std::fmt::Debug for RecordingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingSession")
            .field("encoder", &self.encoder.name())
            .field("state", &self.state)
            .field("spec", &self.spec)
            .field("chunks", &self.chunks.len())
            .field("frames_delivered", &self.frames_delivered)
            .finish()
    }
}

impl RecordingSession {
    /// Create a new session around `encoder`.
    pub fn new(config: SessionConfig, encoder: Box<dyn MediaEncoder>) -> Self {
        Self {
            config,
            encoder,
            state: SessionState::Idle,
            spec: None,
            events: None,
            chunks: Vec::new(),
            frames_delivered: 0,
        }
    }

    /// Current session state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The negotiated format, once started.
    pub fn format(&self) -> Option<ContainerFormat> {
        self.spec.map(|spec| spec.format)
    }

    /// Frames delivered to the encoder so far.
    pub fn frames_delivered(&self) -> u64 {
        self.frames_delivered
    }

    /// Chunks collected so far.
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Start recording frames of `target`'s size at `fps`.
    ///
    /// Picks the first preferred format the encoder supports. Falling back
    /// past the first choice is logged but not an error.
    pub async fn start(&mut self, target: &FrameTarget, fps: u32) -> SlidecastResult<ContainerFormat> {
        if self.state != SessionState::Idle {
            return Err(SlidecastError::invalid_state(
                SessionState::Idle.as_str(),
                self.state.as_str(),
            ));
        }
        if fps == 0 {
            return Err(SlidecastError::recording("Frame rate must be non-zero"));
        }

        self.encoder.prepare().await?;
        let format = self.negotiate_format()?;
        let (width, height) = target.dimensions();
        let spec = StreamSpec {
            width,
            height,
            fps,
            format,
        };

        tracing::info!(
            encoder = self.encoder.name(),
            %format,
            width,
            height,
            fps,
            "Starting recording session"
        );

        let (tx, rx) = event_channel();
        self.encoder.open(spec, tx).await?;

        self.spec = Some(spec);
        self.events = Some(rx);
        self.state = SessionState::Recording;
        Ok(format)
    }

    /// Deliver the current contents of `target` as the next frame.
    pub async fn capture_frame(&mut self, target: &FrameTarget) -> SlidecastResult<()> {
        if self.state != SessionState::Recording {
            return Err(SlidecastError::invalid_state(
                SessionState::Recording.as_str(),
                self.state.as_str(),
            ));
        }

        if let Some(spec) = self.spec {
            if target.dimensions() != (spec.width, spec.height) {
                let (w, h) = target.dimensions();
                return Err(SlidecastError::recording(format!(
                    "Frame size mismatch: got {w}x{h}, expected {}x{}",
                    spec.width, spec.height
                )));
            }
        }

        if let Err(e) = self.encoder.write_frame(target.as_bytes()).await {
            return Err(self.fail(format!("Failed to deliver frame: {e}")));
        }
        self.frames_delivered += 1;

        self.drain_pending()
    }

    /// Finalize the encoder and assemble the container.
    ///
    /// Must only be called once every frame has been delivered and any
    /// trailing margin has elapsed; the encoder finishes asynchronously
    /// and this waits for its completion event.
    pub async fn stop(&mut self) -> SlidecastResult<RecordingOutput> {
        if self.state != SessionState::Recording {
            return Err(SlidecastError::invalid_state(
                SessionState::Recording.as_str(),
                self.state.as_str(),
            ));
        }

        tracing::info!(
            frames = self.frames_delivered,
            chunks = self.chunks.len(),
            "Stopping recording session"
        );
        self.state = SessionState::Stopping;

        if let Err(e) = self.encoder.finalize().await {
            return Err(self.fail(format!("Failed to finalize encoder: {e}")));
        }

        let Some(mut events) = self.events.take() else {
            return Err(self.fail("Encoder event channel missing"));
        };

        loop {
            match events.recv().await {
                Some(EncoderEvent::Chunk(chunk)) => self.chunks.push(chunk),
                Some(EncoderEvent::Finished) => break,
                Some(EncoderEvent::Failed(message)) => {
                    return Err(self.fail(format!("Encoder failed while stopping: {message}")));
                }
                None => {
                    return Err(self.fail("Encoder event channel closed before completion"));
                }
            }
        }

        let format = match self.spec {
            Some(spec) => spec.format,
            None => return Err(self.fail("Session has no stream spec")),
        };
        let chunk_count = self.chunks.len();
        let blob = std::mem::take(&mut self.chunks).concat();
        self.state = SessionState::Complete;

        tracing::info!(
            bytes = blob.len(),
            chunk_count,
            %format,
            "Recording complete"
        );

        Ok(RecordingOutput {
            blob,
            chunk_count,
            format,
            frames_delivered: self.frames_delivered,
        })
    }

    // Internal helpers

    fn negotiate_format(&self) -> SlidecastResult<ContainerFormat> {
        let mut rejected = Vec::new();
        for format in &self.config.preferred_formats {
            if self.encoder.supports(*format) {
                if !rejected.is_empty() {
                    tracing::warn!(
                        encoder = self.encoder.name(),
                        unsupported = ?rejected,
                        fallback = %format,
                        "Preferred container format unavailable; using fallback"
                    );
                }
                return Ok(*format);
            }
            rejected.push(format.key());
        }

        Err(SlidecastError::unsupported(format!(
            "Encoder '{}' supports none of the configured formats: {}",
            self.encoder.name(),
            rejected.join(", ")
        )))
    }

    /// Collect chunks already emitted without waiting for more.
    fn drain_pending(&mut self) -> SlidecastResult<()> {
        let Some(events) = self.events.as_mut() else {
            return Ok(());
        };

        loop {
            match events.try_recv() {
                Ok(EncoderEvent::Chunk(chunk)) => self.chunks.push(chunk),
                Ok(EncoderEvent::Finished) => {
                    return Err(self.fail("Encoder finished before it was stopped"));
                }
                Ok(EncoderEvent::Failed(message)) => {
                    return Err(self.fail(format!("Encoder failed while recording: {message}")));
                }
                Err(TryRecvError::Empty) => return Ok(()),
                Err(TryRecvError::Disconnected) => {
                    return Err(self.fail("Encoder event channel closed while recording"));
                }
            }
        }
    }

    fn fail(&mut self, message: impl Into<String>) -> SlidecastError {
        let message = message.into();
        tracing::error!(state = self.state.as_str(), %message, "Recording session failed");
        self.state = SessionState::Failed;
        self.chunks.clear();
        self.events = None;
        SlidecastError::recording(message)
    }
}
