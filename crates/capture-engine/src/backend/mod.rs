use slidecast_common::config::EncoderConfig;

use crate::encoder::MediaEncoder;

pub mod ffmpeg;
pub mod memory;

pub use ffmpeg::FfmpegEncoder;
pub use memory::{EncoderProbe, MemoryEncoder, MEMORY_MAGIC};

/// Get the production encoder described by `config`.
pub fn default_encoder(config: &EncoderConfig) -> Box<dyn MediaEncoder> {
    Box::new(FfmpegEncoder::from_config(config))
}
