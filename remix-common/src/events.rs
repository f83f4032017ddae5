//! Event types for the remix event system
//!
//! Provides shared event definitions and the EventBus used by the engine to
//! publish mode changes, progress and user notifications.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Orchestration mode of a remix session
///
/// upload → analyzing → analyzed → matching → remixing → complete
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AppMode {
    /// No analysis yet, waiting for a track
    #[default]
    Upload,
    /// A track analysis is in flight
    Analyzing,
    /// At least one analysis is available
    Analyzed,
    /// A match search is in flight
    Matching,
    /// A remix generation is in flight
    Remixing,
    /// A remix result is available
    Complete,
}

impl AppMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppMode::Upload => "upload",
            AppMode::Analyzing => "analyzing",
            AppMode::Analyzed => "analyzed",
            AppMode::Matching => "matching",
            AppMode::Remixing => "remixing",
            AppMode::Complete => "complete",
        }
    }
}

impl std::fmt::Display for AppMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which of the two track inputs an action refers to
///
/// Track 1 drives the top-level mode; track 2 is optional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackSlot {
    Track1,
    Track2,
}

impl TrackSlot {
    /// 1-based slot number as shown to users
    pub fn number(&self) -> u8 {
        match self {
            TrackSlot::Track1 => 1,
            TrackSlot::Track2 => 2,
        }
    }

    /// Array index for per-slot storage (0 or 1)
    pub fn position(&self) -> usize {
        self.number() as usize - 1
    }
}

impl TryFrom<u8> for TrackSlot {
    type Error = crate::Error;

    fn try_from(value: u8) -> crate::Result<Self> {
        match value {
            1 => Ok(TrackSlot::Track1),
            2 => Ok(TrackSlot::Track2),
            other => Err(crate::Error::InvalidInput(format!(
                "Track slot must be 1 or 2, got {}",
                other
            ))),
        }
    }
}

impl std::fmt::Display for TrackSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "track{}", self.number())
    }
}

/// Severity of a user notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Info,
    Success,
    Error,
}

/// Remix session events
///
/// Broadcast via EventBus and serialized for SSE transmission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RemixEvent {
    /// Session mode changed
    ModeChanged {
        old_mode: AppMode,
        new_mode: AppMode,
        timestamp: DateTime<Utc>,
    },

    /// A track analysis finished and was applied to the session
    AnalysisCompleted {
        slot: TrackSlot,
        analysis_id: String,
        file_name: String,
        bpm: f64,
        key: String,
        timestamp: DateTime<Utc>,
    },

    /// A track selection was cleared
    TrackCleared {
        slot: TrackSlot,
        timestamp: DateTime<Utc>,
    },

    /// Match list replaced after a successful search
    MatchesUpdated {
        count: usize,
        timestamp: DateTime<Utc>,
    },

    /// Simulated remix progress
    ///
    /// Values stay at or below 90 until the remix resolves; 100 only on success.
    RemixProgress {
        progress: f64,
        stage: String,
        timestamp: DateTime<Utc>,
    },

    /// Remix result applied to the session
    RemixCompleted {
        remix_id: String,
        duration: f64,
        timestamp: DateTime<Utc>,
    },

    /// Transient user-facing notification (toast)
    Notification {
        level: NotificationLevel,
        title: String,
        message: String,
        timestamp: DateTime<Utc>,
    },
}

impl RemixEvent {
    /// Event name used as the SSE `event:` field
    pub fn event_type(&self) -> &str {
        match self {
            RemixEvent::ModeChanged { .. } => "ModeChanged",
            RemixEvent::AnalysisCompleted { .. } => "AnalysisCompleted",
            RemixEvent::TrackCleared { .. } => "TrackCleared",
            RemixEvent::MatchesUpdated { .. } => "MatchesUpdated",
            RemixEvent::RemixProgress { .. } => "RemixProgress",
            RemixEvent::RemixCompleted { .. } => "RemixCompleted",
            RemixEvent::Notification { .. } => "Notification",
        }
    }

    /// Build an error notification stamped with the current time
    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        RemixEvent::Notification {
            level: NotificationLevel::Error,
            title: title.into(),
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    /// Build a success notification stamped with the current time
    pub fn success(title: impl Into<String>, message: impl Into<String>) -> Self {
        RemixEvent::Notification {
            level: NotificationLevel::Success,
            title: title.into(),
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    /// True for error-level notifications
    pub fn is_error_notification(&self) -> bool {
        matches!(
            self,
            RemixEvent::Notification {
                level: NotificationLevel::Error,
                ..
            }
        )
    }
}

/// Broadcast bus for [`RemixEvent`]s
///
/// Cloning shares the same channel.
///
/// # Examples
///
/// ```
/// use remix_common::events::{EventBus, RemixEvent};
///
/// let bus = EventBus::new(16);
/// let mut rx = bus.subscribe();
/// bus.emit_lossy(RemixEvent::error("Analysis failed", "boom"));
/// assert!(rx.try_recv().unwrap().is_error_notification());
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<RemixEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<RemixEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: RemixEvent,
    ) -> Result<usize, broadcast::error::SendError<RemixEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: RemixEvent) {
        let _ = self.tx.send(event);
    }

    /// Current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
