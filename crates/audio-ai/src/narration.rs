//! Narration requests.
//!
//! A [`NarrationPort`] accepts a caption and returns immediately. Whatever
//! happens afterwards (speech, failure, nothing) is invisible to the
//! caller.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use slidecast_common::config::NarrationConfig;

/// One request to speak a caption.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrationRequest {
    /// Text to speak.
    pub text: String,
    /// Speaking rate multiplier (1.0 = engine default).
    pub rate: f32,
    /// Pitch multiplier (1.0 = engine default).
    pub pitch: f32,
    /// Volume in `[0.0, 1.0]`.
    pub volume: f32,
}

impl NarrationRequest {
    pub fn new(text: impl Into<String>, rate: f32, pitch: f32, volume: f32) -> Self {
        Self {
            text: text.into(),
            rate,
            pitch,
            volume,
        }
    }

    /// Request using the rate/pitch/volume from `config`.
    pub fn from_config(text: impl Into<String>, config: &NarrationConfig) -> Self {
        Self::new(text, config.rate, config.pitch, config.volume)
    }
}

/// Fire-and-forget capability to request speech for a caption.
///
/// Implementations must not block the caller and must swallow their own
/// failures.
pub trait NarrationPort: Send + Sync {
    fn request(&self, request: NarrationRequest);
}

/// Narrator that spawns a local text-to-speech command per request.
///
/// The argument layout follows espeak/espeak-ng:
/// `-s <words per minute> -p <pitch 0-99> -a <amplitude 0-200> <text>`.
#[derive(Debug, Clone)]
pub struct SpeechCommandNarrator {
    command: String,
    base_words_per_minute: u32,
}

impl SpeechCommandNarrator {
    pub fn new(command: impl Into<String>, base_words_per_minute: u32) -> Self {
        Self {
            command: command.into(),
            base_words_per_minute,
        }
    }

    pub fn from_config(config: &NarrationConfig) -> Self {
        Self::new(config.command.clone(), config.base_words_per_minute)
    }

    fn command_args(&self, request: &NarrationRequest) -> Vec<String> {
        let wpm = (self.base_words_per_minute as f32 * request.rate.max(0.2)).round() as u32;
        let pitch = (50.0 * request.pitch).round().clamp(0.0, 99.0) as u32;
        let amplitude = (100.0 * request.volume).round().clamp(0.0, 200.0) as u32;
        vec![
            "-s".to_string(),
            wpm.to_string(),
            "-p".to_string(),
            pitch.to_string(),
            "-a".to_string(),
            amplitude.to_string(),
            "--".to_string(),
            request.text.clone(),
        ]
    }
}

impl NarrationPort for SpeechCommandNarrator {
    fn request(&self, request: NarrationRequest) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("No async runtime available; narration request dropped");
            return;
        };

        let command = self.command.clone();
        let args = self.command_args(&request);
        runtime.spawn(async move {
            let status = tokio::process::Command::new(&command)
                .args(&args)
                .stdin(std::process::Stdio::null())
                .stdout(std::process::Stdio::null())
                .stderr(std::process::Stdio::null())
                .status()
                .await;
            match status {
                Ok(status) if status.success() => {
                    tracing::debug!(%command, "Narration finished");
                }
                Ok(status) => {
                    tracing::warn!(%command, %status, "Narration command failed");
                }
                Err(e) => {
                    tracing::warn!(%command, error = %e, "Failed to start narration command");
                }
            }
        });
    }
}

/// Narrator that discards every request.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentNarrator;

impl NarrationPort for SilentNarrator {
    fn request(&self, request: NarrationRequest) {
        tracing::debug!(chars = request.text.len(), "Narration disabled; request discarded");
    }
}

/// Narrator that records requests in order, for previews and tests.
#[derive(Debug, Clone, Default)]
pub struct CollectingNarrator {
    requests: Arc<Mutex<Vec<NarrationRequest>>>,
}

impl CollectingNarrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<NarrationRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl NarrationPort for CollectingNarrator {
    fn request(&self, request: NarrationRequest) {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request);
    }
}

/// Build the narrator described by `config`.
pub fn narrator_from_config(config: &NarrationConfig) -> Arc<dyn NarrationPort> {
    if config.enabled {
        Arc::new(SpeechCommandNarrator::from_config(config))
    } else {
        Arc::new(SilentNarrator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_args_scale_rate_pitch_volume() {
        let narrator = SpeechCommandNarrator::new("espeak-ng", 175);
        let args = narrator.command_args(&NarrationRequest::new("hello there", 0.8, 1.0, 1.0));
        assert_eq!(
            args,
            vec!["-s", "140", "-p", "50", "-a", "100", "--", "hello there"]
        );
    }

    #[test]
    fn test_command_args_clamp_extremes() {
        let narrator = SpeechCommandNarrator::new("espeak", 175);
        let args = narrator.command_args(&NarrationRequest::new("x", 0.0, 5.0, 9.0));
        assert_eq!(args[1], "35");
        assert_eq!(args[3], "99");
        assert_eq!(args[5], "200");
    }

    #[test]
    fn test_request_without_runtime_is_dropped() {
        let narrator = SpeechCommandNarrator::new("espeak-ng", 175);
        narrator.request(NarrationRequest::new("no runtime", 1.0, 1.0, 1.0));
    }

    #[tokio::test]
    async fn test_missing_command_is_swallowed() {
        let narrator = SpeechCommandNarrator::new("/nonexistent/tts-binary", 175);
        narrator.request(NarrationRequest::new("ignored", 1.0, 1.0, 1.0));
        tokio::task::yield_now().await;
    }

    #[test]
    fn test_collecting_narrator_keeps_order() {
        let narrator = CollectingNarrator::new();
        narrator.request(NarrationRequest::new("first", 0.9, 1.0, 1.0));
        narrator.request(NarrationRequest::new("second", 0.9, 1.0, 1.0));

        let texts: Vec<String> = narrator.requests().into_iter().map(|r| r.text).collect();
        assert_eq!(texts, vec!["first", "second"]);
    }

    #[test]
    fn test_request_from_config() {
        let request = NarrationRequest::from_config("caption", &NarrationConfig::default());
        assert!((request.rate - 0.9).abs() < f32::EPSILON);
        assert_eq!(request.pitch, 1.0);
        assert_eq!(request.volume, 1.0);
    }

    #[test]
    fn test_disabled_config_yields_silent_narrator() {
        let config = NarrationConfig {
            enabled: false,
            ..NarrationConfig::default()
        };
        narrator_from_config(&config).request(NarrationRequest::new("quiet", 1.0, 1.0, 1.0));
    }
}
