//! Test support: a recording playback backend
//!
//! `FakeBackend` hands out handles that track every state change and
//! can be told to reject starts or resumes, so tests can observe
//! exactly what the Director did to the output layer.

use async_trait::async_trait;
use codex_ad::playback::{AudioBackend, PlaybackHandle};
use codex_ad::{Error, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

/// Sources with this prefix reject their start attempt
pub const REJECT_PREFIX: &str = "reject:";

/// Simulated length of non-looping fake sounds
const ONE_SHOT: Duration = Duration::from_millis(1000);

pub struct FakeHandle {
    pub src: String,
    pub looping: bool,
    volume: Mutex<f32>,
    started: AtomicBool,
    playing: AtomicBool,
    stopped: AtomicBool,
    fail_resume: AtomicBool,
    stop_notify: Notify,
}

impl FakeHandle {
    fn new(src: &str, looping: bool) -> Self {
        Self {
            src: src.to_string(),
            looping,
            volume: Mutex::new(1.0),
            started: AtomicBool::new(false),
            playing: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
            fail_resume: AtomicBool::new(false),
            stop_notify: Notify::new(),
        }
    }

    pub fn volume(&self) -> f32 {
        *self.volume.lock().unwrap()
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Acquire)
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    pub fn was_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    /// Make the next resume attempt fail
    pub fn set_fail_resume(&self, fail: bool) {
        self.fail_resume.store(fail, Ordering::Release);
    }

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
impl PlaybackHandle for FakeHandle {
    async fn start(&self) -> Result<()> {
        if self.src.starts_with(REJECT_PREFIX) {
            return Err(Error::StartRejected(self.src.clone()));
        }
        self.started.store(true, Ordering::Release);
        self.playing.store(true, Ordering::Release);
        Ok(())
    }

    fn pause(&self) {
        self.playing.store(false, Ordering::Release);
    }

    async fn resume(&self) -> Result<()> {
        if self.fail_resume.load(Ordering::Acquire) {
            return Err(Error::ResumeRejected(self.src.clone()));
        }
        self.playing.store(true, Ordering::Release);
        Ok(())
    }

    fn set_volume(&self, volume: f32) {
        *self.volume.lock().unwrap() = volume.clamp(0.0, 1.0);
    }

    fn stop(&self) {
        if !self.stopped.swap(true, Ordering::AcqRel) {
            self.playing.store(false, Ordering::Release);
            self.stop_notify.notify_waiters();
        }
    }

    async fn wait_ended(&self) {
        if self.looping {
            self.stopped_wait().await;
        } else {
            tokio::select! {
                _ = tokio::time::sleep(ONE_SHOT) => {}
                _ = self.stopped_wait() => {}
            }
        }
    }
}

/// Backend that records every handle it creates
#[derive(Default)]
pub struct FakeBackend {
    created: Mutex<Vec<Arc<FakeHandle>>>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Every handle created so far, in creation order
    pub fn handles(&self) -> Vec<Arc<FakeHandle>> {
        self.created.lock().unwrap().clone()
    }

    /// Looping handles only
    pub fn loops(&self) -> Vec<Arc<FakeHandle>> {
        self.handles().into_iter().filter(|h| h.looping).collect()
    }

    /// Looping handles that started and have not been stopped
    pub fn active_loops(&self) -> Vec<Arc<FakeHandle>> {
        self.loops()
            .into_iter()
            .filter(|h| h.was_started() && !h.is_stopped())
            .collect()
    }

    /// Non-looping handles (stingers and overlays)
    pub fn one_shots(&self) -> Vec<Arc<FakeHandle>> {
        self.handles().into_iter().filter(|h| !h.looping).collect()
    }

    /// Most recently created looping handle
    pub fn last_loop(&self) -> Arc<FakeHandle> {
        self.loops().last().cloned().expect("no loop handle created")
    }
}

impl AudioBackend for FakeBackend {
    fn create(&self, src: &str, looping: bool) -> Arc<dyn PlaybackHandle> {
        let handle = Arc::new(FakeHandle::new(src, looping));
        self.created.lock().unwrap().push(Arc::clone(&handle));
        handle
    }
}
