//! Slidecast Render Engine
//!
//! Drives a slideshow through the recorder at a fixed frame rate.
//!
//! # Pipeline Architecture
//!
//! ```text
//! ItemSequence ──┐
//!                ├── DurationEstimator (hold + pad, frame count)
//!                │         │
//!                │         ├── NarrationPort (fire-and-forget)
//!                │         │
//!                └─────────┴── FrameRenderer ──▶ FrameTarget
//!                                                    │  every 1/fps
//!                                                    ▼
//!                                            RecordingSession
//!                                                    │  trailing margin, stop()
//!                                                    ▼
//!                                          blob + RenderMetadata
//! ```

pub mod frame;
pub mod pipeline;

pub use frame::*;
pub use pipeline::*;
