//! Playback handle abstraction
//!
//! A `PlaybackHandle` wraps one unit of audio output: load source,
//! play, pause, stop, set volume, detect natural completion, detect
//! start failure. The Director is generic over the backend so tests
//! and headless runs substitute their own implementations.

use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// One unit of audio output
///
/// Contract:
/// - `start` is asynchronous and rejects on decode/permission failure;
///   a rejected start leaves the handle inert.
/// - `set_volume` clamps internally to [0, 1].
/// - `stop` is idempotent and releases the underlying resource, so
///   repeated create/stop cycles do not leak output channels.
/// - `wait_ended` resolves on natural completion for non-looping
///   handles and only on `stop` for looping ones.
#[async_trait]
pub trait PlaybackHandle: Send + Sync {
    /// Begin playback from the start of the source
    async fn start(&self) -> Result<()>;

    /// Pause without releasing the source (resumable)
    fn pause(&self);

    /// Resume after a pause; the output may refuse
    async fn resume(&self) -> Result<()>;

    /// Adjust volume, clamped to [0, 1]
    fn set_volume(&self, volume: f32);

    /// Stop and release the output resource; safe to call repeatedly
    fn stop(&self);

    /// Wait for natural completion (or `stop`, whichever comes first)
    async fn wait_ended(&self);
}

/// Factory for playback handles over some local output primitive
pub trait AudioBackend: Send + Sync {
    /// Create a handle for `src`; looping handles repeat indefinitely
    fn create(&self, src: &str, looping: bool) -> Arc<dyn PlaybackHandle>;
}
