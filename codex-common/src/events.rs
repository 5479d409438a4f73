//! Command and event types for the Codex audio system
//!
//! Two channels exist:
//! - `CommandBus` carries `AudioCommand` messages from anywhere in the
//!   UI to the Director (fire-and-forget, no buffering for absent
//!   subscribers).
//! - The Director broadcasts `DirectorEvent` state changes for any
//!   listening UI surface.
//!
//! Both are backed by `tokio::sync::broadcast`, so slow subscribers
//! never block publishers and receivers clean up when dropped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// "What the ambient mix should be right now"
///
/// Pushed by the scene layer on every navigation/visibility change.
/// The Director treats this as a last-write-wins value, not a queue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SceneSignal {
    /// Narrative section currently visible
    pub scene_id: String,
    /// Catalog track the section wants as its ambient loop
    pub track_id: String,
    /// Loudness weight in [0, 1], multiplied into the base volume
    pub intensity: f32,
    /// Optional one-shot accent fired on entry to this scene
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stinger: Option<String>,
}

/// Command published on the bus by scattered UI triggers
///
/// Wire format: `{ "action": "start" | "sfx" | "track", ... }`, the
/// same payload shape the web UI dispatches.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum AudioCommand {
    /// Begin playback using the most recent scene signal
    Start,

    /// Fire a one-shot, non-looping, non-exclusive overlay sound
    Sfx {
        /// Source locator of the overlay
        src: String,
        /// Gain weight multiplied into the base volume
        #[serde(default = "default_overlay_gain")]
        intensity: f32,
    },

    /// Force a specific loop and engage the override lock
    ///
    /// Either a catalog `track_id` or a raw `src` locator; with only a
    /// locator the Director synthesizes a `custom:<src>` track id and
    /// tracks `label` outside the catalog.
    #[serde(rename_all = "camelCase")]
    Track {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        track_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        src: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<String>,
        intensity: f32,
    },
}

fn default_overlay_gain() -> f32 {
    1.0
}

/// State changes broadcast by the Director for UI synchronization
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DirectorEvent {
    /// Playback started or paused
    PlaybackStateChanged {
        playing: bool,
        timestamp: DateTime<Utc>,
    },

    /// The current loop changed (first start, crossfade, or override)
    TrackChanged {
        track_id: String,
        label: String,
        timestamp: DateTime<Utc>,
    },

    /// A crossfade began between two loops
    CrossfadeStarted {
        from_track_id: String,
        to_track_id: String,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// The crossfade settled; the outgoing loop was disposed
    CrossfadeCompleted {
        track_id: String,
        timestamp: DateTime<Utc>,
    },

    /// A one-shot overlay or stinger started
    OverlayStarted {
        src: String,
        timestamp: DateTime<Utc>,
    },
}

impl DirectorEvent {
    /// Event type name, for logging and filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            DirectorEvent::PlaybackStateChanged { .. } => "PlaybackStateChanged",
            DirectorEvent::TrackChanged { .. } => "TrackChanged",
            DirectorEvent::CrossfadeStarted { .. } => "CrossfadeStarted",
            DirectorEvent::CrossfadeCompleted { .. } => "CrossfadeCompleted",
            DirectorEvent::OverlayStarted { .. } => "OverlayStarted",
        }
    }
}

/// Process-wide publish/subscribe channel for `AudioCommand`
///
/// Decouples UI triggers from the Director: emitters never hold a
/// Director reference. Dispatch is fire-and-forget; commands published
/// while no subscriber is attached are dropped.
#[derive(Clone)]
pub struct CommandBus {
    tx: broadcast::Sender<AudioCommand>,
    capacity: usize,
}

impl CommandBus {
    /// Create a bus with the given channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future commands
    ///
    /// Commands published before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<AudioCommand> {
        self.tx.subscribe()
    }

    /// Publish a command, ignoring the no-subscriber case
    ///
    /// This is the normal dispatch path: a command fired before the
    /// Director attaches is dropped by design.
    pub fn publish(&self, command: AudioCommand) {
        if self.tx.send(command).is_err() {
            tracing::debug!("audio command dropped: no subscribers attached");
        }
    }

    /// Current number of attached subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for CommandBus {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_reaches_subscriber() {
        let bus = CommandBus::new(8);
        let mut rx = bus.subscribe();

        bus.publish(AudioCommand::Start);

        assert_eq!(rx.recv().await.unwrap(), AudioCommand::Start);
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_dropped() {
        let bus = CommandBus::new(8);
        assert_eq!(bus.subscriber_count(), 0);

        // Must not panic or block.
        bus.publish(AudioCommand::Sfx {
            src: "/audio/sfx/clang.mp3".to_string(),
            intensity: 1.0,
        });

        // A subscriber attached afterwards sees nothing.
        let mut rx = bus.subscribe();
        bus.publish(AudioCommand::Start);
        assert_eq!(rx.recv().await.unwrap(), AudioCommand::Start);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn delivery_in_subscription_order() {
        let bus = CommandBus::new(8);
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();

        bus.publish(AudioCommand::Start);

        assert_eq!(first.recv().await.unwrap(), AudioCommand::Start);
        assert_eq!(second.recv().await.unwrap(), AudioCommand::Start);
    }

    #[test]
    fn sfx_wire_format() {
        let command = AudioCommand::Sfx {
            src: "/audio/sfx/dragon-roar.mp3".to_string(),
            intensity: 1.0,
        };

        let json = serde_json::to_value(&command).unwrap();
        assert_eq!(json["action"], "sfx");
        assert_eq!(json["src"], "/audio/sfx/dragon-roar.mp3");
    }

    #[test]
    fn track_wire_format_uses_camel_case() {
        let json = r#"{"action":"track","trackId":"veil-of-glyphs","intensity":0.52}"#;
        let command: AudioCommand = serde_json::from_str(json).unwrap();

        assert_eq!(
            command,
            AudioCommand::Track {
                track_id: Some("veil-of-glyphs".to_string()),
                src: None,
                label: None,
                intensity: 0.52,
            }
        );
    }

    #[test]
    fn track_command_with_raw_src() {
        let json = r#"{"action":"track","src":"/audio/public.mp3","label":"PUBLIC","intensity":0.64}"#;
        let command: AudioCommand = serde_json::from_str(json).unwrap();

        match command {
            AudioCommand::Track { track_id, src, label, intensity } => {
                assert!(track_id.is_none());
                assert_eq!(src.as_deref(), Some("/audio/public.mp3"));
                assert_eq!(label.as_deref(), Some("PUBLIC"));
                assert!((intensity - 0.64).abs() < f32::EPSILON);
            }
            other => panic!("expected Track command, got {other:?}"),
        }
    }

    #[test]
    fn sfx_gain_defaults_to_full() {
        let json = r#"{"action":"sfx","src":"/audio/sfx/chime.mp3"}"#;
        let command: AudioCommand = serde_json::from_str(json).unwrap();

        match command {
            AudioCommand::Sfx { intensity, .. } => assert_eq!(intensity, 1.0),
            other => panic!("expected Sfx command, got {other:?}"),
        }
    }

    #[test]
    fn scene_signal_wire_format() {
        let json = r#"{"sceneId":"ch-3","trackId":"ember-waltz","intensity":0.8,"stinger":"/audio/sfx/rider-oath.mp3"}"#;
        let signal: SceneSignal = serde_json::from_str(json).unwrap();

        assert_eq!(signal.scene_id, "ch-3");
        assert_eq!(signal.track_id, "ember-waltz");
        assert_eq!(signal.stinger.as_deref(), Some("/audio/sfx/rider-oath.mp3"));
    }
}
