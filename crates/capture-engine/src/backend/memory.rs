//! In-process encoder that never leaves the address space.
//!
//! Each frame becomes one small chunk holding the frame index and a
//! digest of its pixels, which makes the output deterministic and cheap to
//! inspect. Hosts use it for previews and dry runs; tests use it to drive
//! the session through success and failure paths.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use slidecast_common::clock::Clock;
use slidecast_common::error::{SlidecastError, SlidecastResult};

use crate::encoder::{ContainerFormat, EncoderEvent, EncoderEventSender, MediaEncoder, StreamSpec};

/// Magic bytes at the start of every memory-encoded container.
pub const MEMORY_MAGIC: &[u8; 4] = b"SLDC";

/// Shared view of what a [`MemoryEncoder`] has been asked to do.
#[derive(Debug, Clone, Default)]
pub struct EncoderProbe {
    inner: Arc<Mutex<ProbeState>>,
}

#[derive(Debug, Default)]
struct ProbeState {
    opened: Option<StreamSpec>,
    prepare_calls: u32,
    frames_written: u64,
    finalize_calls: u32,
    last_frame_at: Option<Duration>,
    finalized_at: Option<Duration>,
}

impl EncoderProbe {
    fn with<R>(&self, f: impl FnOnce(&mut ProbeState) -> R) -> R {
        let mut state = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut state)
    }

    /// Spec the encoder was opened with.
    pub fn opened(&self) -> Option<StreamSpec> {
        self.with(|s| s.opened)
    }

    pub fn prepare_calls(&self) -> u32 {
        self.with(|s| s.prepare_calls)
    }

    pub fn frames_written(&self) -> u64 {
        self.with(|s| s.frames_written)
    }

    pub fn finalize_calls(&self) -> u32 {
        self.with(|s| s.finalize_calls)
    }

    /// Clock time of the last accepted frame, when a clock is attached.
    pub fn last_frame_at(&self) -> Option<Duration> {
        self.with(|s| s.last_frame_at)
    }

    /// Clock time of the first `finalize` call, when a clock is attached.
    pub fn finalized_at(&self) -> Option<Duration> {
        self.with(|s| s.finalized_at)
    }
}

/// Deterministic in-memory encoder.
#[derive(Debug)]
pub struct MemoryEncoder {
    supported: Vec<ContainerFormat>,
    fail_after_frames: Option<u64>,
    probe: EncoderProbe,
    clock: Option<Arc<dyn Clock>>,
    spec: Option<StreamSpec>,
    events: Option<EncoderEventSender>,
}

impl MemoryEncoder {
    /// Encoder that supports every format.
    pub fn new() -> Self {
        Self::with_supported(ContainerFormat::ALL.to_vec())
    }

    /// Encoder that only claims support for `supported`.
    pub fn with_supported(supported: Vec<ContainerFormat>) -> Self {
        Self {
            supported,
            fail_after_frames: None,
            probe: EncoderProbe::default(),
            clock: None,
            spec: None,
            events: None,
        }
    }

    /// Report a runtime failure when frame `frames + 1` arrives.
    pub fn fail_after_frames(mut self, frames: u64) -> Self {
        self.fail_after_frames = Some(frames);
        self
    }

    /// Timestamp frames and finalization against `clock` in the probe.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    fn now(&self) -> Option<Duration> {
        self.clock.as_ref().map(|clock| clock.elapsed())
    }

    /// Handle for observing the encoder after it has been boxed.
    pub fn probe(&self) -> EncoderProbe {
        self.probe.clone()
    }

    fn send(&self, event: EncoderEvent) -> SlidecastResult<()> {
        let Some(events) = self.events.as_ref() else {
            return Err(SlidecastError::encoder("Memory encoder is not open"));
        };
        events
            .send(event)
            .map_err(|_| SlidecastError::encoder("Memory encoder event receiver dropped"))
    }
}

impl Default for MemoryEncoder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl MediaEncoder for MemoryEncoder {
    fn name(&self) -> &str {
        "memory"
    }

    async fn prepare(&mut self) -> SlidecastResult<()> {
        self.probe.with(|s| s.prepare_calls += 1);
        Ok(())
    }

    fn supports(&self, format: ContainerFormat) -> bool {
        self.supported.contains(&format)
    }

    async fn open(&mut self, spec: StreamSpec, events: EncoderEventSender) -> SlidecastResult<()> {
        let mut header = MEMORY_MAGIC.to_vec();
        header.extend_from_slice(&spec.width.to_le_bytes());
        header.extend_from_slice(&spec.height.to_le_bytes());
        header.extend_from_slice(&spec.fps.to_le_bytes());
        header.extend_from_slice(spec.format.key().as_bytes());

        self.events = Some(events);
        self.spec = Some(spec);
        self.probe.with(|s| s.opened = Some(spec));
        self.send(EncoderEvent::Chunk(header))
    }

    async fn write_frame(&mut self, frame: &[u8]) -> SlidecastResult<()> {
        let Some(spec) = self.spec else {
            return Err(SlidecastError::encoder("Memory encoder is not open"));
        };
        if frame.len() != spec.frame_len() {
            return Err(SlidecastError::encoder(format!(
                "Frame is {} bytes, expected {}",
                frame.len(),
                spec.frame_len()
            )));
        }

        let index = self.probe.with(|s| s.frames_written);
        if self.fail_after_frames.is_some_and(|limit| index >= limit) {
            return self.send(EncoderEvent::Failed(format!(
                "injected failure at frame {index}"
            )));
        }

        let mut chunk = Vec::with_capacity(16);
        chunk.extend_from_slice(&index.to_le_bytes());
        chunk.extend_from_slice(&fnv1a_64(frame).to_le_bytes());
        let now = self.now();
        self.probe.with(|s| {
            s.frames_written += 1;
            s.last_frame_at = now;
        });
        self.send(EncoderEvent::Chunk(chunk))
    }

    async fn finalize(&mut self) -> SlidecastResult<()> {
        let now = self.now();
        self.probe.with(|s| {
            s.finalize_calls += 1;
            s.finalized_at = s.finalized_at.or(now);
        });
        let Some(events) = self.events.take() else {
            return Err(SlidecastError::encoder("Memory encoder is not open"));
        };
        let frames = self.probe.frames_written();

        // Completion is reported from another task, like a real encoder
        // flushing its tail after end of input.
        tokio::spawn(async move {
            tokio::task::yield_now().await;
            let mut trailer = b"END".to_vec();
            trailer.extend_from_slice(&frames.to_le_bytes());
            let _ = events.send(EncoderEvent::Chunk(trailer));
            let _ = events.send(EncoderEvent::Finished);
        });
        Ok(())
    }
}

fn fnv1a_64(input: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in input {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::event_channel;

    fn spec() -> StreamSpec {
        StreamSpec {
            width: 2,
            height: 1,
            fps: 30,
            format: ContainerFormat::WebmVp8,
        }
    }

    #[tokio::test]
    async fn test_emits_header_frames_and_trailer() {
        let mut encoder = MemoryEncoder::new();
        let (tx, mut rx) = event_channel();
        encoder.open(spec(), tx).await.unwrap();
        encoder.write_frame(&[0u8; 8]).await.unwrap();
        encoder.finalize().await.unwrap();

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }

        assert_eq!(events.len(), 4);
        assert!(matches!(&events[0], EncoderEvent::Chunk(h) if h.starts_with(MEMORY_MAGIC)));
        assert!(matches!(&events[2], EncoderEvent::Chunk(t) if t.starts_with(b"END")));
        assert_eq!(events[3], EncoderEvent::Finished);
    }

    #[tokio::test]
    async fn test_rejects_wrong_frame_length() {
        let mut encoder = MemoryEncoder::new();
        let (tx, _rx) = event_channel();
        encoder.open(spec(), tx).await.unwrap();
        assert!(encoder.write_frame(&[0u8; 3]).await.is_err());
    }

    #[tokio::test]
    async fn test_probe_timestamps_follow_clock() {
        use slidecast_common::clock::VirtualClock;

        let clock = Arc::new(VirtualClock::new());
        let mut encoder = MemoryEncoder::new().with_clock(clock.clone());
        let probe = encoder.probe();
        let (tx, _rx) = event_channel();
        encoder.open(spec(), tx).await.unwrap();

        clock.advance(Duration::from_millis(40));
        encoder.write_frame(&[0u8; 8]).await.unwrap();
        clock.advance(Duration::from_millis(1000));
        encoder.finalize().await.unwrap();

        assert_eq!(probe.last_frame_at(), Some(Duration::from_millis(40)));
        assert_eq!(probe.finalized_at(), Some(Duration::from_millis(1040)));
    }

    #[test]
    fn test_digest_differs_per_content() {
        assert_ne!(fnv1a_64(&[0, 0, 0, 255]), fnv1a_64(&[255, 0, 0, 255]));
    }
}
