//! # Codex Common Library
//!
//! Shared code for the Codex audio system:
//! - Command and event types (`AudioCommand`, `SceneSignal`, `DirectorEvent`)
//! - The process-wide `CommandBus`
//! - Track catalog data model

pub mod catalog;
pub mod events;

pub use catalog::{Track, TrackCatalog};
pub use events::{AudioCommand, CommandBus, DirectorEvent, SceneSignal};
