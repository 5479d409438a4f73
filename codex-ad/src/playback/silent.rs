//! Silent playback backend
//!
//! Reference implementation of the handle contract with no output
//! device behind it. Used by the headless binary and anywhere a real
//! device is unavailable: handles keep honest state (volume, playing,
//! stopped) and one-shots "finish" after a fixed duration on the tokio
//! clock, so the full Director lifecycle is exercisable end to end.

use crate::error::Result;
use crate::playback::handle::{AudioBackend, PlaybackHandle};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use tracing::debug;

/// Backend producing silent handles
pub struct SilentBackend {
    /// Simulated length of non-looping sounds
    one_shot: Duration,
}

impl SilentBackend {
    pub fn new() -> Self {
        Self {
            one_shot: Duration::from_millis(1500),
        }
    }

    /// Override the simulated one-shot duration
    pub fn with_one_shot_duration(one_shot: Duration) -> Self {
        Self { one_shot }
    }
}

impl Default for SilentBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioBackend for SilentBackend {
    fn create(&self, src: &str, looping: bool) -> Arc<dyn PlaybackHandle> {
        Arc::new(SilentHandle {
            src: src.to_string(),
            looping,
            one_shot: self.one_shot,
            volume: Mutex::new(1.0),
            playing: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
            stop_notify: Notify::new(),
        })
    }
}

/// A handle that tracks state without producing sound
pub struct SilentHandle {
    src: String,
    looping: bool,
    one_shot: Duration,
    volume: Mutex<f32>,
    playing: AtomicBool,
    stopped: AtomicBool,
    stop_notify: Notify,
}

impl SilentHandle {
    pub fn volume(&self) -> f32 {
        *self.volume.lock().expect("volume lock poisoned")
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Acquire)
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Wait until the stop flag is raised
    async fn stopped_wait(&self) {
        loop {
            let notified = self.stop_notify.notified();
            if self.stopped.load(Ordering::Acquire) {
                return;
            }
            notified.await;
        }
    }
}

#[async_trait]
impl PlaybackHandle for SilentHandle {
    async fn start(&self) -> Result<()> {
        debug!(src = %self.src, looping = self.looping, "silent handle start");
        self.playing.store(true, Ordering::Release);
        Ok(())
    }

    fn pause(&self) {
        self.playing.store(false, Ordering::Release);
    }

    async fn resume(&self) -> Result<()> {
        self.playing.store(true, Ordering::Release);
        Ok(())
    }

    fn set_volume(&self, volume: f32) {
        *self.volume.lock().expect("volume lock poisoned") = volume.clamp(0.0, 1.0);
    }

    fn stop(&self) {
        if !self.stopped.swap(true, Ordering::AcqRel) {
            debug!(src = %self.src, "silent handle stopped");
            self.playing.store(false, Ordering::Release);
            self.stop_notify.notify_waiters();
        }
    }

    async fn wait_ended(&self) {
        if self.looping {
            // Loops never end naturally.
            self.stopped_wait().await;
        } else {
            tokio::select! {
                _ = tokio::time::sleep(self.one_shot) => {}
                _ = self.stopped_wait() => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn concrete(looping: bool) -> SilentHandle {
        SilentHandle {
            src: "/audio/test.mp3".to_string(),
            looping,
            one_shot: Duration::from_millis(500),
            volume: Mutex::new(1.0),
            playing: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
            stop_notify: Notify::new(),
        }
    }

    fn handle(looping: bool) -> Arc<dyn PlaybackHandle> {
        Arc::new(concrete(looping))
    }

    #[tokio::test]
    async fn volume_clamps() {
        let handle = concrete(true);

        handle.set_volume(1.7);
        assert_eq!(handle.volume(), 1.0);

        handle.set_volume(-0.3);
        assert_eq!(handle.volume(), 0.0);

        handle.set_volume(0.42);
        assert_eq!(handle.volume(), 0.42);
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let handle = handle(true);
        handle.start().await.unwrap();
        handle.stop();
        handle.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn one_shot_ends_naturally() {
        let handle = handle(false);
        handle.start().await.unwrap();

        tokio::time::timeout(Duration::from_secs(2), handle.wait_ended())
            .await
            .expect("one-shot should end within its simulated duration");
    }

    #[tokio::test(start_paused = true)]
    async fn loop_ends_only_on_stop() {
        let handle = handle(true);
        handle.start().await.unwrap();

        // A looping handle outlives any fixed wait.
        let still_going =
            tokio::time::timeout(Duration::from_secs(5), handle.wait_ended()).await;
        assert!(still_going.is_err());

        handle.stop();
        tokio::time::timeout(Duration::from_millis(10), handle.wait_ended())
            .await
            .expect("stop should release waiters");
    }
}
