//! Render-and-record orchestration.
//!
//! [`RenderPipeline::run`] plays a sequence into a [`RecordingSession`] in
//! real time: every item is held on screen for its planned duration, one
//! frame per tick of the injected [`Clock`], while captions are handed to
//! the narrator as the item appears.

use std::sync::Arc;
use std::time::Duration;

use slidecast_audio_ai::narration::{narrator_from_config, NarrationPort, NarrationRequest};
use slidecast_capture_engine::backend::{default_encoder, FfmpegEncoder};
use slidecast_capture_engine::encoder::ContainerFormat;
use slidecast_capture_engine::session::{RecordingSession, SessionConfig};
use slidecast_common::clock::{frame_interval, secs_to_ns, Clock, DriftMeasurement, SystemClock};
use slidecast_common::config::AppConfig;
use slidecast_common::error::{SlidecastError, SlidecastResult};
use slidecast_processing_core::duration::DurationEstimator;
use slidecast_processing_core::timing::{plan_sequence, planned_total_frames, planned_total_secs};
use slidecast_project_model::{FrameTarget, ItemSequence, RenderMetadata};

use crate::frame::FrameRenderer;

/// Drift between planned and observed item boundaries worth a warning.
const DRIFT_WARN_MS: f64 = 100.0;

/// Output and narration settings for a render.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    /// Frames per second delivered to the recorder.
    pub fps: u32,

    /// Frame target width.
    pub width: u32,

    /// Frame target height.
    pub height: u32,

    /// Hold after the last item before the recorder is stopped.
    pub trailing_margin: Duration,

    /// Narration speaking rate.
    pub narration_rate: f32,

    /// Narration pitch.
    pub narration_pitch: f32,

    /// Narration volume.
    pub narration_volume: f32,
}

impl RenderOptions {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            fps: config.render.fps,
            width: config.render.width,
            height: config.render.height,
            trailing_margin: Duration::from_millis(config.render.trailing_margin_ms),
            narration_rate: config.narration.rate,
            narration_pitch: config.narration.pitch,
            narration_volume: config.narration.volume,
        }
    }
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self::from_app_config(&AppConfig::default())
    }
}

/// Progress callback for a render.
pub type ProgressCallback = Box<dyn Fn(RenderProgress) + Send>;

/// Render progress report.
#[derive(Debug, Clone)]
pub struct RenderProgress {
    /// Current progress [0.0, 1.0].
    pub progress: f64,

    /// Index of the item being rendered (or last rendered).
    pub item_index: usize,

    /// Items in the sequence.
    pub item_count: usize,

    /// Frames delivered so far.
    pub frames_rendered: u64,

    /// Frames planned for the whole sequence.
    pub total_frames: u64,

    /// Current stage.
    pub stage: RenderStage,
}

/// Stages of a render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStage {
    Preparing,
    Rendering,
    Finalizing,
    Complete,
    Failed,
}

/// Everything a successful render produces.
#[derive(Debug, Clone)]
pub struct RenderOutput {
    /// The encoded container.
    pub blob: Vec<u8>,

    /// Summary of the render.
    pub metadata: RenderMetadata,

    /// Negotiated container format.
    pub format: ContainerFormat,

    /// Clock time, relative to recording start, at which stop was requested.
    pub stop_requested_at: Duration,
}

/// Single-use render job over one recording session.
pub struct RenderPipeline {
    options: RenderOptions,
    session: RecordingSession,
    narrator: Arc<dyn NarrationPort>,
    clock: Arc<dyn Clock>,
    estimator: DurationEstimator,
    renderer: FrameRenderer,
    progress: Option<ProgressCallback>,
}

impl std::fmt::Debug for RenderPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderPipeline")
            .field("options", &self.options)
            .field("session", &self.session)
            .field("clock", &self.clock)
            .field("estimator", &self.estimator)
            .finish_non_exhaustive()
    }
}

/// Running counters used for progress reports.
struct Progress {
    item_count: usize,
    total_frames: u64,
    frames_rendered: u64,
}

impl RenderPipeline {
    pub fn new(
        options: RenderOptions,
        session: RecordingSession,
        narrator: Arc<dyn NarrationPort>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            options,
            session,
            narrator,
            clock,
            estimator: DurationEstimator::with_defaults(),
            renderer: FrameRenderer::default(),
            progress: None,
        }
    }

    /// Production pipeline: ffmpeg encoder, configured narrator, wall clock.
    pub fn from_app_config(config: &AppConfig) -> SlidecastResult<Self> {
        config.validate()?;
        let session = RecordingSession::new(
            SessionConfig::from_encoder_config(&config.encoder)?,
            default_encoder(&config.encoder),
        );
        Ok(Self::new(
            RenderOptions::from_app_config(config),
            session,
            narrator_from_config(&config.narration),
            Arc::new(SystemClock::start()),
        ))
    }

    pub fn with_estimator(mut self, estimator: DurationEstimator) -> Self {
        self.estimator = estimator;
        self
    }

    pub fn with_renderer(mut self, renderer: FrameRenderer) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Render `sequence` into the recorder and return the finished container.
    ///
    /// The sequence is borrowed for the whole run, so it cannot change
    /// while frames are being produced.
    pub async fn run(mut self, sequence: &ItemSequence) -> SlidecastResult<RenderOutput> {
        if sequence.is_empty() {
            return Err(SlidecastError::EmptySequence);
        }
        if self.options.fps == 0 {
            return Err(SlidecastError::config("Frame rate must be greater than zero"));
        }

        let fps = self.options.fps;
        let timings = plan_sequence(&self.estimator, sequence, fps);
        let total_secs = planned_total_secs(&timings);
        if Duration::try_from_secs_f64(total_secs).is_err() {
            return Err(SlidecastError::config(format!(
                "Planned duration of {total_secs}s cannot be rendered"
            )));
        }
        let mut progress = Progress {
            item_count: sequence.len(),
            total_frames: planned_total_frames(&timings),
            frames_rendered: 0,
        };

        tracing::info!(
            items = progress.item_count,
            total_secs,
            total_frames = progress.total_frames,
            fps,
            "Starting render"
        );
        self.report(&progress, 0, RenderStage::Preparing);

        let mut target = FrameTarget::new(self.options.width, self.options.height);
        let format = match self.session.start(&target, fps).await {
            Ok(format) => format,
            Err(e) => return Err(self.abort(&progress, 0, e)),
        };

        let interval = frame_interval(fps);
        let started_at = self.clock.elapsed();
        let mut planned_secs = 0.0;

        for (index, (item, timing)) in sequence.iter().zip(&timings).enumerate() {
            if item.has_caption() {
                self.narrator.request(NarrationRequest::new(
                    item.caption(),
                    self.options.narration_rate,
                    self.options.narration_pitch,
                    self.options.narration_volume,
                ));
            }

            for _ in 0..timing.frame_count {
                self.renderer.render(item.image(), &mut target);
                if let Err(e) = self.session.capture_frame(&target).await {
                    return Err(self.abort(&progress, index, e));
                }
                progress.frames_rendered += 1;
                self.clock.sleep(interval).await;
            }

            // Hold until the item's planned boundary; covers the sub-frame
            // remainder and rounding in the frame interval.
            planned_secs += timing.total_secs;
            let boundary = Duration::from_secs_f64(planned_secs);
            let observed = self.clock.elapsed().saturating_sub(started_at);
            if observed < boundary {
                self.clock.sleep(boundary - observed).await;
            }

            let drift = DriftMeasurement {
                reference_ns: secs_to_ns(planned_secs),
                measured_ns: self.clock.elapsed().saturating_sub(started_at).as_nanos() as u64,
            };
            if drift.exceeds_threshold_ms(DRIFT_WARN_MS) {
                tracing::warn!(
                    item = %item.id(),
                    index,
                    drift_ms = drift.drift_ms(),
                    "Item boundary drifted from plan"
                );
            } else {
                tracing::debug!(
                    item = %item.id(),
                    index,
                    frames = timing.frame_count,
                    drift_ms = drift.drift_ms(),
                    "Item rendered"
                );
            }

            self.report(&progress, index, RenderStage::Rendering);
        }

        let last_index = progress.item_count - 1;
        self.report(&progress, last_index, RenderStage::Finalizing);
        self.clock.sleep(self.options.trailing_margin).await;
        let stop_requested_at = self.clock.elapsed().saturating_sub(started_at);

        let recording = match self.session.stop().await {
            Ok(recording) => recording,
            Err(e) => return Err(self.abort(&progress, last_index, e)),
        };

        let metadata = RenderMetadata {
            item_count: progress.item_count,
            total_duration_seconds: total_secs,
            size_bytes: recording.blob.len() as u64,
            frame_count: recording.frames_delivered,
            chunk_count: recording.chunk_count,
            mime_type: recording.format.mime_type().to_string(),
            rendered_at: String::new(),
        }
        .stamped();

        tracing::info!(
            format = %format,
            size_bytes = metadata.size_bytes,
            frames = metadata.frame_count,
            stop_requested_secs = stop_requested_at.as_secs_f64(),
            "Render complete"
        );
        self.report(&progress, last_index, RenderStage::Complete);

        Ok(RenderOutput {
            blob: recording.blob,
            metadata,
            format: recording.format,
            stop_requested_at,
        })
    }

    fn report(&self, progress: &Progress, item_index: usize, stage: RenderStage) {
        let Some(callback) = &self.progress else {
            return;
        };
        let fraction = match stage {
            RenderStage::Complete => 1.0,
            _ if progress.total_frames == 0 => 0.0,
            _ => progress.frames_rendered as f64 / progress.total_frames as f64,
        };
        callback(RenderProgress {
            progress: fraction.clamp(0.0, 1.0),
            item_index,
            item_count: progress.item_count,
            frames_rendered: progress.frames_rendered,
            total_frames: progress.total_frames,
            stage,
        });
    }

    fn abort(&self, progress: &Progress, item_index: usize, error: SlidecastError) -> SlidecastError {
        tracing::error!(
            error = %error,
            session = self.session.state().as_str(),
            frames = progress.frames_rendered,
            "Render failed"
        );
        self.report(progress, item_index, RenderStage::Failed);
        error
    }
}

/// Render `sequence` with the production stack described by `config`.
pub async fn render_sequence(
    sequence: &ItemSequence,
    config: &AppConfig,
) -> SlidecastResult<RenderOutput> {
    if !FfmpegEncoder::from_config(&config.encoder).is_available().await {
        return Err(SlidecastError::unsupported(format!(
            "ffmpeg not found at '{}'",
            config.encoder.ffmpeg_path
        )));
    }
    RenderPipeline::from_app_config(config)?.run(sequence).await
}
