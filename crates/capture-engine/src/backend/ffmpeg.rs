//! Streaming encoder backed by the system `ffmpeg` binary.
//!
//! Raw RGBA frames go in on stdin; the container comes out on stdout and
//! is forwarded chunk by chunk as it is produced. The process is the
//! source of truth for completion: `Finished` is only sent after stdout
//! hits EOF and ffmpeg exits successfully.

use std::process::Stdio;
use std::sync::OnceLock;

use slidecast_common::config::EncoderConfig;
use slidecast_common::error::{SlidecastError, SlidecastResult};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{ChildStdin, Command};

use crate::encoder::{ContainerFormat, EncoderEvent, EncoderEventSender, MediaEncoder, StreamSpec};

/// Encoder that pipes frames through an ffmpeg subprocess.
#[derive(Debug)]
pub struct FfmpegEncoder {
    ffmpeg_path: String,
    chunk_size: usize,
    available_encoders: OnceLock<Vec<String>>,
    stdin: Option<ChildStdin>,
    reader_task: Option<tokio::task::JoinHandle<()>>,
}

impl FfmpegEncoder {
    pub fn new(ffmpeg_path: impl Into<String>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            chunk_size: 64 * 1024,
            available_encoders: OnceLock::new(),
            stdin: None,
            reader_task: None,
        }
    }

    pub fn from_config(config: &EncoderConfig) -> Self {
        let mut encoder = Self::new(config.ffmpeg_path.clone());
        encoder.chunk_size = config.chunk_size_bytes.max(1);
        encoder
    }

    /// Whether the configured ffmpeg binary runs at all.
    pub async fn is_available(&self) -> bool {
        Command::new(&self.ffmpeg_path)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|status| status.success())
            .unwrap_or(false)
    }

    /// Video encoders compiled into the ffmpeg binary.
    async fn probe_encoders(&self) -> Vec<String> {
        let output = Command::new(&self.ffmpeg_path)
            .args(["-hide_banner", "-encoders"])
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .await;
        match output {
            Ok(output) if output.status.success() => {
                parse_encoder_list(&String::from_utf8_lossy(&output.stdout))
            }
            Ok(output) => {
                tracing::warn!(status = %output.status, "ffmpeg -encoders failed");
                Vec::new()
            }
            Err(e) => {
                tracing::warn!(path = %self.ffmpeg_path, error = %e, "ffmpeg not found");
                Vec::new()
            }
        }
    }
}

#[async_trait::async_trait]
impl MediaEncoder for FfmpegEncoder {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn prepare(&mut self) -> SlidecastResult<()> {
        if self.available_encoders.get().is_none() {
            let encoders = self.probe_encoders().await;
            tracing::debug!(count = encoders.len(), "Probed ffmpeg video encoders");
            let _ = self.available_encoders.set(encoders);
        }
        Ok(())
    }

    /// Answers from the list probed in [`prepare`](MediaEncoder::prepare);
    /// nothing is supported before that.
    fn supports(&self, format: ContainerFormat) -> bool {
        self.available_encoders
            .get()
            .is_some_and(|encoders| encoders.iter().any(|name| name == format.codec_name()))
    }

    async fn open(&mut self, spec: StreamSpec, events: EncoderEventSender) -> SlidecastResult<()> {
        if self.stdin.is_some() {
            return Err(SlidecastError::encoder("ffmpeg encoder is already open"));
        }

        let args = build_ffmpeg_args(&spec);
        tracing::debug!(args = ?args, "Running ffmpeg");

        let mut child = Command::new(&self.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SlidecastError::encoder(format!("Failed to start ffmpeg: {e}")))?;

        tracing::info!(pid = child.id(), format = %spec.format, "ffmpeg process started");

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| SlidecastError::encoder("Failed to capture ffmpeg stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SlidecastError::encoder("Failed to capture ffmpeg stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| SlidecastError::encoder("Failed to capture ffmpeg stderr"))?;

        // Drain stderr concurrently to avoid ffmpeg blocking on a full stderr pipe.
        let stderr_task = tokio::spawn(async move {
            let mut stderr = stderr;
            let mut output = String::new();
            match stderr.read_to_string(&mut output).await {
                Ok(_) => output,
                Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
            }
        });

        let chunk_size = self.chunk_size;
        self.reader_task = Some(tokio::spawn(async move {
            if let Err(message) = forward_chunks(stdout, chunk_size, &events).await {
                let _ = events.send(EncoderEvent::Failed(message));
                return;
            }

            let status = child.wait().await;
            let stderr_output = stderr_task
                .await
                .unwrap_or_else(|_| "<failed to join stderr reader>".to_string());

            let event = match status {
                Ok(status) if status.success() => EncoderEvent::Finished,
                Ok(status) => EncoderEvent::Failed(format!(
                    "ffmpeg exited with {status}: {}",
                    stderr_output.trim()
                )),
                Err(e) => EncoderEvent::Failed(format!("Failed to wait on ffmpeg: {e}")),
            };
            let _ = events.send(event);
        }));

        self.stdin = Some(stdin);
        Ok(())
    }

    async fn write_frame(&mut self, frame: &[u8]) -> SlidecastResult<()> {
        let Some(stdin) = self.stdin.as_mut() else {
            return Err(SlidecastError::encoder("ffmpeg encoder is not open"));
        };
        stdin
            .write_all(frame)
            .await
            .map_err(|e| SlidecastError::encoder(format!("Failed to write frame to ffmpeg: {e}")))
    }

    async fn finalize(&mut self) -> SlidecastResult<()> {
        let Some(mut stdin) = self.stdin.take() else {
            return Err(SlidecastError::encoder("ffmpeg encoder is not open"));
        };
        // Closing stdin is ffmpeg's end-of-input; it then flushes the
        // encoder and writes the container tail to stdout.
        stdin
            .shutdown()
            .await
            .map_err(|e| SlidecastError::encoder(format!("Failed to close ffmpeg stdin: {e}")))?;
        drop(stdin);
        Ok(())
    }
}

impl Drop for FfmpegEncoder {
    fn drop(&mut self) {
        if let Some(task) = self.reader_task.take() {
            task.abort();
        }
    }
}

/// Read `stdout` to EOF, sending each read as one chunk.
async fn forward_chunks<R>(
    mut stdout: R,
    chunk_size: usize,
    events: &EncoderEventSender,
) -> Result<(), String>
where
    R: AsyncRead + Unpin,
{
    loop {
        let mut buf = vec![0u8; chunk_size];
        let read = stdout
            .read(&mut buf)
            .await
            .map_err(|e| format!("Failed reading ffmpeg output: {e}"))?;
        if read == 0 {
            return Ok(());
        }
        buf.truncate(read);
        if events.send(EncoderEvent::Chunk(buf)).is_err() {
            return Err("Recording session dropped its event receiver".to_string());
        }
    }
}

fn build_ffmpeg_args(spec: &StreamSpec) -> Vec<String> {
    let mut args = vec![
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-nostats".to_string(),
        "-f".to_string(),
        "rawvideo".to_string(),
        "-pix_fmt".to_string(),
        "rgba".to_string(),
        "-s".to_string(),
        format!("{}x{}", spec.width, spec.height),
        "-r".to_string(),
        spec.fps.to_string(),
        "-i".to_string(),
        "pipe:0".to_string(),
        "-an".to_string(),
    ];

    let mut codec_args = codec_args_for_format(spec.format, spec.fps);
    args.append(&mut codec_args);

    args.push("-f".to_string());
    args.push(spec.format.muxer().to_string());
    args.push("pipe:1".to_string());
    args
}

fn codec_args_for_format(format: ContainerFormat, fps: u32) -> Vec<String> {
    // One keyframe every 2 seconds keeps the stream seekable.
    let keyint = fps.saturating_mul(2).max(2).to_string();

    match format {
        ContainerFormat::WebmVp9 => vec![
            "-c:v".to_string(),
            "libvpx-vp9".to_string(),
            "-deadline".to_string(),
            "realtime".to_string(),
            "-cpu-used".to_string(),
            "8".to_string(),
            "-row-mt".to_string(),
            "1".to_string(),
            "-b:v".to_string(),
            "2500k".to_string(),
            "-g".to_string(),
            keyint,
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
        ],
        ContainerFormat::WebmVp8 => vec![
            "-c:v".to_string(),
            "libvpx".to_string(),
            "-deadline".to_string(),
            "realtime".to_string(),
            "-cpu-used".to_string(),
            "8".to_string(),
            "-b:v".to_string(),
            "2500k".to_string(),
            "-g".to_string(),
            keyint,
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
        ],
        ContainerFormat::Mp4H264 => vec![
            "-c:v".to_string(),
            "libx264".to_string(),
            "-preset".to_string(),
            "veryfast".to_string(),
            "-tune".to_string(),
            "stillimage".to_string(),
            "-g".to_string(),
            keyint,
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
            // A pipe cannot be seeked back into, so the moov atom has to
            // come first and the rest is written as fragments.
            "-movflags".to_string(),
            "frag_keyframe+empty_moov+default_base_moof".to_string(),
        ],
    }
}

/// Extract encoder names from `ffmpeg -encoders` output.
///
/// Lines look like ` V....D libvpx-vp9  libvpx VP9 (codec vp9)`; the
/// listing starts after a ` ------` separator.
fn parse_encoder_list(output: &str) -> Vec<String> {
    output
        .lines()
        .skip_while(|line| !line.trim_start().starts_with("---"))
        .skip(1)
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let flags = parts.next()?;
            let name = parts.next()?;
            flags.starts_with('V').then(|| name.to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENCODERS_SAMPLE: &str = "Encoders:
 V..... = Video
 A..... = Audio
 ------
 V....D libx264              libx264 H.264 / AVC / MPEG-4 AVC (codec h264)
 V....D libvpx               libvpx VP8 (codec vp8)
 A....D libopus              libopus Opus (codec opus)
";

    #[test]
    fn test_parse_encoder_list_keeps_video_encoders() {
        let encoders = parse_encoder_list(ENCODERS_SAMPLE);
        assert_eq!(encoders, vec!["libx264".to_string(), "libvpx".to_string()]);
    }

    #[test]
    fn test_supports_uses_probed_list() {
        let encoder = FfmpegEncoder::new("ffmpeg");
        let _ = encoder
            .available_encoders
            .set(parse_encoder_list(ENCODERS_SAMPLE));

        assert!(!encoder.supports(ContainerFormat::WebmVp9));
        assert!(encoder.supports(ContainerFormat::WebmVp8));
        assert!(encoder.supports(ContainerFormat::Mp4H264));
    }

    #[test]
    fn test_unprepared_encoder_supports_nothing() {
        let encoder = FfmpegEncoder::new("ffmpeg");
        assert!(!encoder.supports(ContainerFormat::WebmVp8));
    }

    #[tokio::test]
    async fn test_missing_binary_supports_nothing() {
        let mut encoder = FfmpegEncoder::new("/nonexistent/ffmpeg-binary");
        assert!(!encoder.is_available().await);

        encoder.prepare().await.unwrap();
        assert_eq!(encoder.available_encoders.get().map(Vec::len), Some(0));
        assert!(!encoder.supports(ContainerFormat::WebmVp8));
    }

    #[test]
    fn test_ffmpeg_args_stream_webm_to_stdout() {
        let args = build_ffmpeg_args(&StreamSpec {
            width: 1280,
            height: 720,
            fps: 30,
            format: ContainerFormat::WebmVp9,
        });
        let joined = args.join(" ");
        assert!(joined.contains("-f rawvideo -pix_fmt rgba -s 1280x720 -r 30 -i pipe:0"));
        assert!(joined.contains("-c:v libvpx-vp9"));
        assert!(joined.contains("-g 60"));
        assert!(joined.ends_with("-f webm pipe:1"));
    }

    #[test]
    fn test_mp4_args_are_fragmented() {
        let args = build_ffmpeg_args(&StreamSpec {
            width: 640,
            height: 360,
            fps: 24,
            format: ContainerFormat::Mp4H264,
        });
        assert!(args.iter().any(|a| a.contains("empty_moov")));
        assert!(args.join(" ").ends_with("-f mp4 pipe:1"));
    }

    #[tokio::test]
    async fn test_forward_chunks_splits_by_size() {
        let (tx, mut rx) = crate::encoder::event_channel();
        let data: &[u8] = &[1, 2, 3, 4, 5];
        forward_chunks(data, 2, &tx).await.unwrap();
        drop(tx);

        let mut total = Vec::new();
        while let Some(EncoderEvent::Chunk(chunk)) = rx.recv().await {
            assert!(chunk.len() <= 2);
            total.extend(chunk);
        }
        assert_eq!(total, vec![1, 2, 3, 4, 5]);
    }
}
