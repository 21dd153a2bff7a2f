//! Slidecast Audio Intelligence
//!
//! Caption narration as a best-effort side channel:
//! - **NarrationPort:** Fire-and-forget speech request capability
//! - **Speech command:** Spawns a local TTS program (espeak-ng by default)
//! - **Silent / collecting narrators:** For headless runs and previews
//!
//! Requests are never awaited. Speech and video line up only
//! approximately; capturing the synthesized audio into the recorded
//! stream would need a different design.

pub mod narration;

pub use narration::*;
