//! Audio Director - sole owner of audio output
//!
//! Reconciles automatic (scene-driven) and manual (command-driven)
//! playback intent. Owns exactly one current looping handle plus any
//! transient overlay handles, performs crossfades between loops, and
//! enforces the one-way manual override lock.
//!
//! All operations serialize on one internal lock, so the Director
//! behaves as a single logical actor: scene signals, transport calls,
//! and bus commands each run to completion before the next begins.
//! The only concurrency left is the crossfade interval task, which
//! touches nothing but the two handles it interpolates.

mod fade;

use crate::config::Config;
use crate::playback::{AudioBackend, PlaybackHandle};
use chrono::Utc;
use codex_common::{AudioCommand, CommandBus, DirectorEvent, SceneSignal, Track, TrackCatalog};
use fade::{ActiveFade, FadeSettings};
use serde::Serialize;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Intensity changes at or below this delta are treated as noise
const INTENSITY_EPSILON: f32 = 0.04;

/// Intensity used when the first playback is triggered by a scene
/// signal that carries a zero weight
const FIRST_PLAY_FALLBACK_INTENSITY: f32 = 0.6;

/// Prefix for synthetic ids of override tracks outside the catalog
const CUSTOM_TRACK_PREFIX: &str = "custom:";

/// UI-facing transport state
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportStatus {
    pub track_id: Option<String>,
    pub label: Option<String>,
    pub mood: Option<String>,
    pub intensity_percent: u8,
    pub is_playing: bool,
    pub override_locked: bool,
}

/// The loop presently audible
struct CurrentLoop {
    track_id: String,
    label: String,
    mood: Option<String>,
    handle: Arc<dyn PlaybackHandle>,
}

/// Where a track change is headed: a catalog entry, or an ad-hoc
/// source forced by an override command
enum LoopTarget {
    Catalog(Track),
    Custom { id: String, src: String, label: String },
}

impl LoopTarget {
    fn id(&self) -> &str {
        match self {
            LoopTarget::Catalog(track) => &track.id,
            LoopTarget::Custom { id, .. } => id,
        }
    }

    fn src(&self) -> &str {
        match self {
            LoopTarget::Catalog(track) => &track.src,
            LoopTarget::Custom { src, .. } => src,
        }
    }

    fn label(&self) -> &str {
        match self {
            LoopTarget::Catalog(track) => &track.label,
            LoopTarget::Custom { label, .. } => label,
        }
    }

    fn mood(&self) -> Option<String> {
        match self {
            LoopTarget::Catalog(track) => Some(track.mood.clone()),
            LoopTarget::Custom { .. } => None,
        }
    }
}

/// Mutable director record, guarded by the actor lock
struct DirectorState {
    current: Option<CurrentLoop>,
    current_intensity: f32,
    is_playing: bool,
    /// No autonomous playback happens before the first user-triggered
    /// start (audio output requires a user gesture)
    user_started: bool,
    /// One-way latch: once a manual track is forced, scene signals no
    /// longer change the loop for the rest of the session
    override_locked: bool,
    /// Last scene a stinger fired for, so intensity-only updates do
    /// not re-fire it
    active_scene: String,
    /// Most recently observed scene signal (last-write-wins)
    last_signal: Option<SceneSignal>,
    fade: Option<ActiveFade>,
    /// The one stinger slot; a newer stinger replaces the old one
    stinger: Option<Arc<dyn PlaybackHandle>>,
    /// Overlays own themselves via their completion tasks; weak refs
    /// remain only so shutdown can silence the ones still alive
    overlays: Vec<Weak<dyn PlaybackHandle>>,
}

impl DirectorState {
    fn new(initial_intensity: f32) -> Self {
        Self {
            current: None,
            current_intensity: initial_intensity,
            is_playing: false,
            user_started: false,
            override_locked: false,
            active_scene: String::new(),
            last_signal: None,
            fade: None,
            stinger: None,
            overlays: Vec::new(),
        }
    }
}

/// Background-music controller
pub struct Director {
    catalog: TrackCatalog,
    backend: Arc<dyn AudioBackend>,
    base_volume: f32,
    initial_intensity: f32,
    stinger_gain: f32,
    default_track_id: Option<String>,
    fade_settings: FadeSettings,
    events: broadcast::Sender<DirectorEvent>,
    state: Mutex<DirectorState>,
    /// Command bus listener, aborted on shutdown (the unsubscribe)
    bus_task: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl Director {
    /// Create the director and subscribe it to the command bus
    ///
    /// The subscription lives until `shutdown`; commands published
    /// before this call are never seen (the bus does not buffer for
    /// absent subscribers).
    pub fn new(
        catalog: TrackCatalog,
        backend: Arc<dyn AudioBackend>,
        bus: &CommandBus,
        config: &Config,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(64);

        let director = Arc::new(Self {
            catalog,
            backend,
            base_volume: config.base_volume,
            initial_intensity: config.initial_intensity,
            stinger_gain: config.stinger_gain,
            default_track_id: config.default_track_id.clone(),
            fade_settings: FadeSettings {
                crossfade: Duration::from_millis(config.crossfade_ms),
                step: Duration::from_millis(config.fade_step_ms),
            },
            events,
            state: Mutex::new(DirectorState::new(config.initial_intensity)),
            bus_task: std::sync::Mutex::new(None),
        });

        info!(
            tracks = director.catalog.len(),
            base_volume = director.base_volume,
            "audio director created"
        );

        let weak = Arc::downgrade(&director);
        let mut rx = bus.subscribe();
        let listener = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(command) => {
                        let Some(director) = weak.upgrade() else { break };
                        director.handle_command(command).await;
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "command bus receiver lagged; commands dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        *director
            .bus_task
            .lock()
            .expect("bus task lock poisoned") = Some(listener);

        director
    }

    /// Subscribe to director state-change events
    pub fn subscribe_events(&self) -> broadcast::Receiver<DirectorEvent> {
        self.events.subscribe()
    }

    /// Current transport display state
    pub async fn status(&self) -> TransportStatus {
        let st = self.state.lock().await;
        TransportStatus {
            track_id: st.current.as_ref().map(|c| c.track_id.clone()),
            label: st.current.as_ref().map(|c| c.label.clone()),
            mood: st.current.as_ref().and_then(|c| c.mood.clone()),
            intensity_percent: (st.current_intensity * 100.0).round() as u8,
            is_playing: st.is_playing,
            override_locked: st.override_locked,
        }
    }

    /// Observe a scene change from the navigation layer
    ///
    /// The signal is retained as the latest ambient intent even before
    /// the user has started playback, but no handle is created until
    /// then. Stingers fire on every distinct scene entry regardless of
    /// the override lock; track and intensity changes honor it.
    pub async fn on_scene_signal(&self, signal: SceneSignal) {
        let mut st = self.state.lock().await;
        st.last_signal = Some(signal.clone());

        if !st.user_started {
            debug!(scene_id = %signal.scene_id, "scene observed before user start");
            return;
        }

        if signal.scene_id != st.active_scene {
            st.active_scene = signal.scene_id.clone();
            if let Some(src) = &signal.stinger {
                self.play_stinger(&mut st, src);
            }
        }

        if st.override_locked {
            debug!(scene_id = %signal.scene_id, "override lock active; scene track ignored");
            return;
        }

        let track_changed = st
            .current
            .as_ref()
            .map_or(true, |current| current.track_id != signal.track_id);

        if track_changed {
            match self.catalog.get(&signal.track_id) {
                Some(track) => {
                    let target = LoopTarget::Catalog(track.clone());
                    self.change_track(&mut st, target, signal.intensity, true)
                        .await;
                }
                None => {
                    warn!(track_id = %signal.track_id, "scene signal references unknown track");
                }
            }
        } else if (signal.intensity - st.current_intensity).abs() > INTENSITY_EPSILON {
            // Same loop, meaningfully different loudness: no crossfade,
            // just re-apply the volume law.
            st.current_intensity = signal.intensity;
            if let Some(current) = &st.current {
                current.handle.set_volume(self.target_volume(signal.intensity));
            }
        }
    }

    /// User-facing transport toggle
    pub async fn toggle_play_pause(&self) {
        let mut st = self.state.lock().await;

        if st.current.is_none() {
            self.start_playback(&mut st).await;
            return;
        }

        if st.is_playing {
            if let Some(current) = &st.current {
                current.handle.pause();
            }
            st.is_playing = false;
            self.emit_playback_state(false);
            return;
        }

        let handle = st
            .current
            .as_ref()
            .map(|current| Arc::clone(&current.handle));
        if let Some(handle) = handle {
            match handle.resume().await {
                Ok(()) => {
                    st.is_playing = true;
                    self.emit_playback_state(true);
                }
                Err(e) => {
                    // Recoverable: the next toggle retries naturally.
                    warn!(error = %e, "resume rejected");
                    st.is_playing = false;
                }
            }
        }
    }

    /// Advance to the next catalog track, wrapping at the end
    ///
    /// A skip counts as user interaction, so it also unlocks the first
    /// playback. The current intensity is preserved.
    pub async fn skip_to_next(&self) {
        let mut st = self.state.lock().await;

        if self.catalog.is_empty() {
            warn!("skip requested with an empty catalog");
            return;
        }
        st.user_started = true;

        let base_id = st
            .current
            .as_ref()
            .map(|current| current.track_id.clone())
            .unwrap_or_else(|| self.default_track_id());
        let Some(next) = self.catalog.next_after(&base_id).cloned() else {
            return;
        };

        let intensity = st.current_intensity;
        let fade = st.current.is_some();
        self.change_track(&mut st, LoopTarget::Catalog(next), intensity, fade)
            .await;
    }

    /// Command bus delivery point
    pub async fn handle_command(&self, command: AudioCommand) {
        debug!(?command, "audio command received");
        match command {
            AudioCommand::Start => {
                let mut st = self.state.lock().await;
                // Idempotent: a second start while a loop exists is a no-op.
                if st.current.is_none() {
                    self.start_playback(&mut st).await;
                }
            }

            AudioCommand::Sfx { src, intensity } => {
                let mut st = self.state.lock().await;
                self.play_overlay(&mut st, &src, intensity);
            }

            AudioCommand::Track {
                track_id,
                src,
                label,
                intensity,
            } => {
                let mut st = self.state.lock().await;

                // An unresolvable override leaves the director untouched,
                // lock included.
                let target = if let Some(id) = track_id {
                    match self.catalog.get(&id) {
                        Some(track) => LoopTarget::Catalog(track.clone()),
                        None => {
                            warn!(track_id = %id, "override references unknown track");
                            return;
                        }
                    }
                } else if let Some(src) = src {
                    LoopTarget::Custom {
                        id: format!("{CUSTOM_TRACK_PREFIX}{src}"),
                        label: label.unwrap_or_else(|| "Custom".to_string()),
                        src,
                    }
                } else {
                    warn!("track command carried neither a track id nor a source");
                    return;
                };

                if !st.override_locked {
                    info!("manual override engaged; scene-driven track changes suspended");
                }
                // One-way latch: no unlock path exists by design.
                st.override_locked = true;
                st.user_started = true;

                self.change_track(&mut st, target, intensity, true).await;
            }
        }
    }

    /// Stop every handle, cancel the fade timer, and detach from the bus
    pub async fn shutdown(&self) {
        info!("audio director shutting down");
        if let Some(task) = self
            .bus_task
            .lock()
            .expect("bus task lock poisoned")
            .take()
        {
            task.abort();
        }

        let mut st = self.state.lock().await;
        if let Some(fade) = st.fade.take() {
            fade.cancel();
        }
        if let Some(current) = st.current.take() {
            current.handle.stop();
        }
        if let Some(stinger) = st.stinger.take() {
            stinger.stop();
        }
        for overlay in st.overlays.drain(..) {
            if let Some(handle) = overlay.upgrade() {
                handle.stop();
            }
        }
        if st.is_playing {
            st.is_playing = false;
            self.emit_playback_state(false);
        }
    }

    // ===== Internals =====

    /// Volume law: `base_volume * intensity`, clamped to [0, 1]
    fn target_volume(&self, intensity: f32) -> f32 {
        (self.base_volume * intensity).clamp(0.0, 1.0)
    }

    fn default_track_id(&self) -> String {
        self.default_track_id
            .clone()
            .or_else(|| self.catalog.first().map(|track| track.id.clone()))
            .unwrap_or_default()
    }

    /// First playback, triggered by the user (toggle or Start command)
    ///
    /// Uses the latest observed scene signal, falling back to the
    /// configured default track; fires the scene's stinger on success.
    async fn start_playback(&self, st: &mut DirectorState) {
        st.user_started = true;

        let (track_id, intensity, stinger, scene_id) = match &st.last_signal {
            Some(signal) => {
                let intensity = if signal.intensity > 0.0 {
                    signal.intensity
                } else {
                    FIRST_PLAY_FALLBACK_INTENSITY
                };
                (
                    signal.track_id.clone(),
                    intensity,
                    signal.stinger.clone(),
                    signal.scene_id.clone(),
                )
            }
            None => (
                self.default_track_id(),
                self.initial_intensity,
                None,
                String::new(),
            ),
        };

        let Some(track) = self.catalog.get(&track_id).cloned() else {
            warn!(track_id = %track_id, "no playable track for first start");
            return;
        };

        self.change_track(st, LoopTarget::Catalog(track), intensity, false)
            .await;

        if st.current.is_some() {
            st.active_scene = scene_id;
            if let Some(src) = stinger {
                self.play_stinger(st, &src);
            }
        }
    }

    /// Switch the current loop to `target`, crossfading when a loop is
    /// already audible
    ///
    /// A rejected start is recovered locally: the failed handle is
    /// disposed, the previous loop keeps playing untouched, and only
    /// `is_playing` records that the attempt failed.
    async fn change_track(
        &self,
        st: &mut DirectorState,
        target: LoopTarget,
        intensity: f32,
        fade_from_current: bool,
    ) {
        let fade_from_current = fade_from_current && st.current.is_some();

        let handle = self.backend.create(target.src(), true);
        handle.set_volume(if fade_from_current {
            0.0
        } else {
            self.target_volume(intensity)
        });

        if let Err(e) = handle.start().await {
            warn!(track_id = %target.id(), error = %e, "loop start rejected; keeping previous audio");
            handle.stop();
            st.is_playing = false;
            self.emit_playback_state(false);
            return;
        }

        // A newer track change supersedes any fade still in flight:
        // cancel its timer and dispose its outgoing handle before
        // installing the new loop.
        if let Some(fade) = st.fade.take() {
            fade.cancel();
        }

        let previous_intensity = st.current_intensity;
        let previous = st.current.take();

        info!(
            track_id = %target.id(),
            label = %target.label(),
            intensity,
            crossfade = fade_from_current,
            "current loop changed"
        );

        st.current = Some(CurrentLoop {
            track_id: target.id().to_string(),
            label: target.label().to_string(),
            mood: target.mood(),
            handle: Arc::clone(&handle),
        });
        st.current_intensity = intensity;
        st.is_playing = true;

        self.emit(DirectorEvent::TrackChanged {
            track_id: target.id().to_string(),
            label: target.label().to_string(),
            timestamp: Utc::now(),
        });
        self.emit_playback_state(true);

        match previous {
            Some(previous) if fade_from_current => {
                self.emit(DirectorEvent::CrossfadeStarted {
                    from_track_id: previous.track_id.clone(),
                    to_track_id: target.id().to_string(),
                    duration_ms: self.fade_settings.duration_ms(),
                    timestamp: Utc::now(),
                });
                st.fade = Some(fade::spawn(
                    handle,
                    previous.handle,
                    self.target_volume(intensity),
                    self.target_volume(previous_intensity),
                    self.fade_settings,
                    target.id().to_string(),
                    self.events.clone(),
                ));
            }
            Some(previous) => {
                // Replaced without interpolation (fresh start paths).
                previous.handle.stop();
            }
            None => {}
        }
    }

    /// Fire a scene-transition stinger; at most one plays at a time
    fn play_stinger(&self, st: &mut DirectorState, src: &str) {
        if let Some(previous) = st.stinger.take() {
            previous.stop();
        }

        let handle = self.backend.create(src, false);
        handle.set_volume((self.base_volume * self.stinger_gain).clamp(0.0, 1.0));
        st.stinger = Some(Arc::clone(&handle));

        self.emit(DirectorEvent::OverlayStarted {
            src: src.to_string(),
            timestamp: Utc::now(),
        });

        // Best effort: a rejected start is silently dropped.
        tokio::spawn(async move {
            if handle.start().await.is_err() {
                handle.stop();
                return;
            }
            handle.wait_ended().await;
            handle.stop();
        });
    }

    /// Fire a one-shot overlay; overlays are unbounded and never touch
    /// the current loop
    fn play_overlay(&self, st: &mut DirectorState, src: &str, gain: f32) {
        st.overlays.retain(|weak| weak.strong_count() > 0);

        let handle = self.backend.create(src, false);
        handle.set_volume((self.base_volume * gain).clamp(0.0, 1.0));
        st.overlays.push(Arc::downgrade(&handle));

        self.emit(DirectorEvent::OverlayStarted {
            src: src.to_string(),
            timestamp: Utc::now(),
        });

        // Self-disposing: the task owns the handle and releases it on
        // natural completion.
        tokio::spawn(async move {
            if handle.start().await.is_err() {
                handle.stop();
                return;
            }
            handle.wait_ended().await;
            handle.stop();
        });
    }

    fn emit(&self, event: DirectorEvent) {
        // No subscribers is fine for state-change notifications.
        let _ = self.events.send(event);
    }

    fn emit_playback_state(&self, playing: bool) {
        self.emit(DirectorEvent::PlaybackStateChanged {
            playing,
            timestamp: Utc::now(),
        });
    }
}
