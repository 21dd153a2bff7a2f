//! Slidecast Processing Core
//!
//! Turns captions into hold times:
//! - **Duration Estimation:** How long a caption takes to narrate
//! - **Timing Plans:** Hold, pad, total duration, and frame count per item
//!
//! This crate is pure computation. No I/O, no clocks, no encoders.
//! All inputs are data; all outputs are data.

pub mod duration;
pub mod timing;

pub use duration::DurationEstimator;
pub use timing::ItemTiming;
