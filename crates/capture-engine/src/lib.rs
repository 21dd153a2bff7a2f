//! Slidecast Capture Engine
//!
//! Records rendered frames into a single streaming video container.
//! A [`RecordingSession`] owns the encoder lifecycle; encoders push
//! container chunks back over a channel as they produce them.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │               RecordingSession                │
//! │                                               │
//! │  FrameTarget ──capture_frame──▶ MediaEncoder  │
//! │                                     │         │
//! │                         EncoderEvent channel  │
//! │                                     ▼         │
//! │        [chunk 0] [chunk 1] ... [chunk n]      │
//! │                     │ stop()                  │
//! │                     ▼                         │
//! │              RecordingOutput (blob)           │
//! └───────────────────────────────────────────────┘
//! ```

pub mod backend;
pub mod encoder;
pub mod session;

pub use encoder::*;
pub use session::*;
