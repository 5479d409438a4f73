//! Playback primitives
//!
//! The Director never talks to an output device directly; it creates
//! `PlaybackHandle`s through an `AudioBackend` and drives them through
//! the handle contract alone.

pub mod handle;
pub mod silent;

pub use handle::{AudioBackend, PlaybackHandle};
pub use silent::SilentBackend;
