use std::sync::{Arc, Mutex};
use std::time::Duration;

use image::{Rgba, RgbaImage};
use slidecast_audio_ai::narration::{CollectingNarrator, NarrationPort, SilentNarrator};
use slidecast_capture_engine::backend::{EncoderProbe, MemoryEncoder, MEMORY_MAGIC};
use slidecast_capture_engine::encoder::ContainerFormat;
use slidecast_capture_engine::session::{RecordingSession, SessionConfig};
use slidecast_common::clock::{Clock, VirtualClock};
use slidecast_common::error::SlidecastError;
use slidecast_project_model::ItemSequence;
use slidecast_render_engine::pipeline::{RenderOptions, RenderPipeline, RenderStage};

fn options() -> RenderOptions {
    RenderOptions {
        fps: 30,
        width: 64,
        height: 36,
        trailing_margin: Duration::from_millis(1000),
        ..RenderOptions::default()
    }
}

fn slide() -> Arc<RgbaImage> {
    Arc::new(RgbaImage::from_pixel(20, 10, Rgba([200, 40, 40, 255])))
}

struct Harness {
    pipeline: RenderPipeline,
    probe: EncoderProbe,
    clock: Arc<VirtualClock>,
}

fn harness(encoder: MemoryEncoder, narrator: Arc<dyn NarrationPort>) -> Harness {
    let clock = Arc::new(VirtualClock::new());
    let encoder = encoder.with_clock(clock.clone());
    let probe = encoder.probe();
    let pipeline = RenderPipeline::new(
        options(),
        RecordingSession::new(SessionConfig::default(), Box::new(encoder)),
        narrator,
        clock.clone(),
    );
    Harness {
        pipeline,
        probe,
        clock,
    }
}

fn sequence_of(count: usize, pad: f64) -> ItemSequence {
    let mut sequence = ItemSequence::new();
    for _ in 0..count {
        sequence.push(slide(), pad, "");
    }
    sequence
}

#[tokio::test]
async fn uncaptioned_items_hold_five_seconds_each() {
    let sequence = sequence_of(3, 2.0);
    let Harness {
        pipeline,
        probe,
        clock,
    } = harness(MemoryEncoder::new(), Arc::new(SilentNarrator));

    let output = pipeline.run(&sequence).await.unwrap();

    assert_eq!(probe.frames_written(), 450);
    assert_eq!(probe.finalize_calls(), 1);
    assert_eq!(output.metadata.frame_count, 450);
    assert_eq!(output.metadata.item_count, 3);
    assert!((output.metadata.total_duration_seconds - 15.0).abs() < 1e-9);
    assert_eq!(output.metadata.size_bytes, output.blob.len() as u64);
    assert_eq!(output.metadata.mime_type, "video/webm;codecs=vp9");
    assert!(!output.metadata.rendered_at.is_empty());
    assert!(output.blob.starts_with(MEMORY_MAGIC));

    // Stop lands no earlier than the planned total plus the trailing margin.
    assert!(output.stop_requested_at.as_secs_f64() >= 16.0 - 1e-6);
    assert!(clock.elapsed() >= output.stop_requested_at);

    // Seen from the encoder: every frame arrived before finalize, and
    // finalize came at least one margin after the last frame.
    let last_frame_at = probe.last_frame_at().unwrap();
    let finalized_at = probe.finalized_at().unwrap();
    assert!(finalized_at.as_secs_f64() >= 16.0 - 1e-6);
    assert!(finalized_at >= last_frame_at + Duration::from_millis(1000));
}

#[tokio::test]
async fn stop_is_requested_after_sum_of_totals_plus_margin() {
    let mut sequence = ItemSequence::new();
    sequence.push(slide(), 0.0, "");
    sequence.push(slide(), 1.25, "one two three four five six seven eight nine ten");
    sequence.push(slide(), 0.01, "");

    let Harness {
        pipeline, probe, ..
    } = harness(MemoryEncoder::new(), Arc::new(SilentNarrator));
    let output = pipeline.run(&sequence).await.unwrap();

    // 3.0 + (10 / 2.5 + 0.5 + 1.25) + 3.01
    let planned = 3.0 + 5.75 + 3.01;
    assert!((output.metadata.total_duration_seconds - planned).abs() < 1e-9);
    assert!(output.stop_requested_at.as_secs_f64() >= planned + 1.0 - 1e-6);
    // 90 + 172 + 90
    assert_eq!(output.metadata.frame_count, 352);

    assert_eq!(probe.frames_written(), 352);
    let finalized_at = probe.finalized_at().unwrap();
    assert!(finalized_at.as_secs_f64() >= planned + 1.0 - 1e-6);
    assert!(finalized_at >= probe.last_frame_at().unwrap() + Duration::from_millis(1000));
}

#[tokio::test]
async fn empty_sequence_never_opens_the_encoder() {
    let Harness {
        pipeline, probe, ..
    } = harness(MemoryEncoder::new(), Arc::new(SilentNarrator));

    let result = pipeline.run(&ItemSequence::new()).await;

    assert!(matches!(result, Err(SlidecastError::EmptySequence)));
    assert!(probe.opened().is_none());
    assert_eq!(probe.frames_written(), 0);
}

#[tokio::test]
async fn removed_item_contributes_nothing() {
    let mut sequence = sequence_of(2, 2.0);
    let doomed = sequence.push(slide(), 7.0, "this one is removed before rendering");
    assert!(sequence.remove_by_id(doomed).is_some());

    let Harness {
        pipeline, probe, ..
    } = harness(MemoryEncoder::new(), Arc::new(SilentNarrator));
    let output = pipeline.run(&sequence).await.unwrap();

    assert_eq!(probe.frames_written(), 300);
    assert_eq!(output.metadata.item_count, 2);
    assert!((output.metadata.total_duration_seconds - 10.0).abs() < 1e-9);
}

#[tokio::test]
async fn captions_are_narrated_once_each() {
    let mut sequence = ItemSequence::new();
    sequence.push(slide(), 0.0, "Hello world");
    sequence.push(slide(), 0.0, "");
    sequence.push(slide(), 0.0, "   ");
    sequence.push(slide(), 0.0, "Third slide here");

    let narrator = CollectingNarrator::new();
    let Harness { pipeline, .. } = harness(MemoryEncoder::new(), Arc::new(narrator.clone()));
    pipeline.run(&sequence).await.unwrap();

    let requests = narrator.requests();
    let texts: Vec<&str> = requests.iter().map(|r| r.text.as_str()).collect();
    assert_eq!(texts, vec!["Hello world", "Third slide here"]);
    for request in &requests {
        assert!((request.rate - 0.9).abs() < f32::EPSILON);
        assert_eq!(request.pitch, 1.0);
        assert_eq!(request.volume, 1.0);
    }
}

#[tokio::test]
async fn falls_back_to_vp8_when_vp9_is_unsupported() {
    let Harness { pipeline, .. } = harness(
        MemoryEncoder::with_supported(vec![ContainerFormat::WebmVp8]),
        Arc::new(SilentNarrator),
    );
    let output = pipeline.run(&sequence_of(1, 0.0)).await.unwrap();

    assert_eq!(output.format, ContainerFormat::WebmVp8);
    assert_eq!(output.metadata.mime_type, "video/webm;codecs=vp8");
}

#[tokio::test]
async fn encoder_failure_fails_the_render() {
    let stages = Arc::new(Mutex::new(Vec::new()));
    let sink = stages.clone();
    let Harness {
        pipeline, probe, ..
    } = harness(
        MemoryEncoder::new().fail_after_frames(10),
        Arc::new(SilentNarrator),
    );

    let result = pipeline
        .with_progress(Box::new(move |p| sink.lock().unwrap().push(p.stage)))
        .run(&sequence_of(2, 0.0))
        .await;

    assert!(matches!(result, Err(SlidecastError::Recording { .. })));
    assert_eq!(probe.frames_written(), 10);
    assert_eq!(probe.finalize_calls(), 0);
    assert_eq!(stages.lock().unwrap().last(), Some(&RenderStage::Failed));
}

#[tokio::test]
async fn unsupported_encoder_fails_before_any_frame() {
    let Harness {
        pipeline, probe, ..
    } = harness(
        MemoryEncoder::with_supported(vec![ContainerFormat::Mp4H264]),
        Arc::new(SilentNarrator),
    );

    let result = pipeline.run(&sequence_of(1, 0.0)).await;

    assert!(matches!(result, Err(SlidecastError::Unsupported { .. })));
    assert_eq!(probe.frames_written(), 0);
}
