//! Narration duration estimation.
//!
//! Captions are never synthesized here. The estimate models a narrator
//! speaking at about 150 words per minute (2.5 words per second), plus a
//! fixed buffer, with a floor so short captions stay readable.

use slidecast_common::error::{SlidecastError, SlidecastResult};

/// Configuration for the duration estimator.
#[derive(Debug, Clone)]
pub struct EstimatorConfig {
    /// Hold used when the caption is empty or whitespace-only (seconds).
    pub default_hold_secs: f64,

    /// Assumed narration speed in words per second.
    pub words_per_second: f64,

    /// Fixed buffer added to every spoken caption (seconds).
    pub buffer_secs: f64,

    /// Lower bound for any spoken caption (seconds).
    pub min_hold_secs: f64,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            default_hold_secs: 3.0,
            words_per_second: 2.5,
            buffer_secs: 0.5,
            min_hold_secs: 2.0,
        }
    }
}

impl EstimatorConfig {
    /// Reject values that would make an estimate non-finite or negative.
    pub fn validate(&self) -> SlidecastResult<()> {
        if !self.words_per_second.is_finite() || self.words_per_second <= 0.0 {
            return Err(SlidecastError::config(format!(
                "Estimator words_per_second must be positive and finite, got {}",
                self.words_per_second
            )));
        }

        for (name, value) in [
            ("default_hold_secs", self.default_hold_secs),
            ("buffer_secs", self.buffer_secs),
            ("min_hold_secs", self.min_hold_secs),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(SlidecastError::config(format!(
                    "Estimator {name} must be non-negative and finite, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Maps caption text to an estimated narration length in seconds.
#[derive(Debug, Clone, Default)]
pub struct DurationEstimator {
    config: EstimatorConfig,
}

impl DurationEstimator {
    pub fn new(config: EstimatorConfig) -> SlidecastResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Estimator with the standard 150 wpm model.
    pub fn with_defaults() -> Self {
        Self::default()
    }

    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    /// Estimated narration time for `caption`, in seconds.
    ///
    /// Total: never fails, never returns less than the configured floor
    /// for a spoken caption.
    pub fn estimate(&self, caption: &str) -> f64 {
        let words = count_words(caption);
        if words == 0 {
            return self.config.default_hold_secs;
        }

        let raw = words as f64 / self.config.words_per_second + self.config.buffer_secs;
        raw.max(self.config.min_hold_secs)
    }

    /// Hold used for captionless items.
    pub fn default_hold_secs(&self) -> f64 {
        self.config.default_hold_secs
    }
}

/// Number of whitespace-separated tokens.
pub fn count_words(caption: &str) -> usize {
    caption.split_whitespace().count()
}
