//! # Remix Common Library
//!
//! Shared code for the techno remix workspace including:
//! - Error type used by configuration and validation
//! - Configuration loading (TOML file, environment, defaults)
//! - Event types (RemixEvent enum) and the EventBus
//! - Human-readable time formatting

pub mod config;
pub mod error;
pub mod events;
pub mod human_time;

pub use error::{Error, Result};
pub use events::{AppMode, EventBus, NotificationLevel, RemixEvent, TrackSlot};
