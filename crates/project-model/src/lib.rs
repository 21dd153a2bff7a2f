//! Slidecast Project Model
//!
//! Defines the core data contracts for a slideshow render:
//! - **Items:** An image, its caption, and a transition hold pad
//! - **Sequence:** Insertion-ordered items; insertion order is playback order
//! - **Frame target:** The fixed-size surface frames are drawn into
//! - **Metadata:** The summary record returned alongside the encoded video
//!
//! The model carries no UI coupling. A host list view observes and mutates
//! an [`ItemSequence`] through its add/remove operations.

pub mod frame;
pub mod item;
pub mod metadata;
pub mod sequence;

pub use frame::*;
pub use item::*;
pub use metadata::*;
pub use sequence::*;
