//! # Codex Audio Director Library (codex-ad)
//!
//! Background-music controller for the Codex narrative experience.
//!
//! **Purpose:** Select, crossfade, and interrupt looping ambient
//! tracks in response to scene navigation, layer one-shot stinger and
//! overlay sounds on top, and honor manual override commands arriving
//! on the process-wide command bus.
//!
//! **Architecture:** A single `Director` owns every playback handle.
//! Scene signals and transport calls mutate its state under one lock
//! (one logical actor); the timed crossfade runs on a tokio interval
//! task that is cancelled structurally whenever a newer track change
//! supersedes it.

pub mod config;
pub mod director;
pub mod error;
pub mod playback;

pub use config::Config;
pub use director::{Director, TransportStatus};
pub use error::{Error, Result};
