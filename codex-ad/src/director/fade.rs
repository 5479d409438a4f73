//! Timed crossfade between two loop handles
//!
//! Fixed-step linear interpolation on a tokio interval: each tick
//! raises the incoming volume and lowers the outgoing one, and the
//! final tick stops the outgoing handle. At most one fade runs at a
//! time; a newer track change cancels the task and disposes the
//! outgoing handle immediately, so a stale timer can never fire.

use crate::playback::PlaybackHandle;
use chrono::Utc;
use codex_common::DirectorEvent;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::debug;

/// Crossfade timing knobs, taken from `Config`
#[derive(Debug, Clone, Copy)]
pub(crate) struct FadeSettings {
    /// Total crossfade duration
    pub crossfade: Duration,
    /// Interval between volume steps
    pub step: Duration,
}

impl FadeSettings {
    /// Number of interpolation steps (at least one)
    pub fn steps(&self) -> u64 {
        let step_ms = self.step.as_millis().max(1);
        ((self.crossfade.as_millis() / step_ms) as u64).max(1)
    }

    pub fn duration_ms(&self) -> u64 {
        self.crossfade.as_millis() as u64
    }
}

/// An in-flight crossfade: the interval task plus the handle it is
/// fading out
pub(crate) struct ActiveFade {
    task: JoinHandle<()>,
    outgoing: Arc<dyn PlaybackHandle>,
}

impl ActiveFade {
    /// Cancel the timer and dispose the outgoing handle
    ///
    /// Safe to call after natural completion: aborting a finished task
    /// is a no-op and `stop` is idempotent.
    pub fn cancel(self) {
        self.task.abort();
        self.outgoing.stop();
    }
}

/// Start a crossfade task ramping `incoming` up to `incoming_target`
/// while ramping `outgoing` down from `outgoing_start`
pub(crate) fn spawn(
    incoming: Arc<dyn PlaybackHandle>,
    outgoing: Arc<dyn PlaybackHandle>,
    incoming_target: f32,
    outgoing_start: f32,
    settings: FadeSettings,
    to_track_id: String,
    events: broadcast::Sender<DirectorEvent>,
) -> ActiveFade {
    let fading_out = Arc::clone(&outgoing);
    let task = tokio::spawn(async move {
        let steps = settings.steps();
        let mut ticker = tokio::time::interval(settings.step);
        // An interval yields immediately on its first tick; the first
        // volume step belongs one full interval out.
        ticker.tick().await;

        for frame in 1..=steps {
            ticker.tick().await;
            let ratio = (frame as f32 / steps as f32).min(1.0);
            incoming.set_volume(incoming_target * ratio);
            fading_out.set_volume(outgoing_start * (1.0 - ratio));
        }

        fading_out.stop();
        debug!(track_id = %to_track_id, "crossfade settled");
        let _ = events.send(DirectorEvent::CrossfadeCompleted {
            track_id: to_track_id,
            timestamp: Utc::now(),
        });
    });

    ActiveFade { task, outgoing }
}
