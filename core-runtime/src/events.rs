//! # Event Bus System
//!
//! Broadcasts review-session progress and user-facing notifications using
//! `tokio::sync::broadcast`.
//!
//! ## Overview
//!
//! The event bus system consists of:
//! - **Event Types**: [`SyncEvent`] for workflow progress and
//!   [`Notification`] for dismissible, user-visible messages (toasts)
//! - **EventBus**: Central broadcast channel for publishing events
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, Notification};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let event_bus = EventBus::new(100);
//! let mut stream = event_bus.subscribe();
//!
//! event_bus.emit(CoreEvent::Notification(Notification::error("Import failed")));
//!
//! let event = stream.recv().await.unwrap();
//! assert!(matches!(event, CoreEvent::Notification(_)));
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Subscribers may receive `RecvError::Lagged(n)` when they fall behind;
//! this is non-fatal. `RecvError::Closed` means every sender was dropped.
//! Publishing with no subscribers is not an error for the core: events are
//! informational, and the session state remains the source of truth.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::RecvError;
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum published through the event bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Review workflow progress
    Sync(SyncEvent),
    /// User-visible, dismissible message
    Notification(Notification),
}

impl CoreEvent {
    /// Get a human-readable description of the event
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Sync(e) => e.description(),
            CoreEvent::Notification(n) => &n.message,
        }
    }

    /// Get the severity level of the event
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Sync(SyncEvent::Failed { .. }) => EventSeverity::Error,
            CoreEvent::Sync(_) => EventSeverity::Info,
            CoreEvent::Notification(n) => n.severity,
        }
    }
}

/// Event severity levels for filtering and display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventSeverity {
    Debug,
    Info,
    Success,
    Warning,
    Error,
}

// ============================================================================
// Sync Events
// ============================================================================

/// Bulk operation kinds reported in progress events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BulkKind {
    Import,
    Skip,
}

/// Events emitted by a review session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum SyncEvent {
    /// A library snapshot replaced the session state.
    LibraryLoaded {
        session_id: String,
        platform: String,
        candidates: usize,
        needs_sync: bool,
    },
    /// A platform resync was requested.
    ResyncStarted { session_id: String, platform: String },
    /// The platform resync finished.
    ResyncCompleted {
        session_id: String,
        platform: String,
        new_count: u32,
    },
    /// Progress of a bulk operation.
    BulkProgress {
        session_id: String,
        kind: BulkKind,
        current: usize,
        total: usize,
    },
    /// Candidates were imported into the collection.
    Imported { session_id: String, count: usize },
    /// Candidates were skipped.
    Skipped { session_id: String, count: usize },
    /// A skipped candidate was restored.
    Restored {
        session_id: String,
        platform_id: String,
    },
    /// A manual catalog match was saved.
    MatchFixed {
        session_id: String,
        platform_id: String,
        catalog_id: u64,
    },
    /// An operation failed.
    Failed {
        session_id: String,
        operation: String,
        message: String,
    },
}

impl SyncEvent {
    fn description(&self) -> &str {
        match self {
            SyncEvent::LibraryLoaded { .. } => "Library loaded",
            SyncEvent::ResyncStarted { .. } => "Resync started",
            SyncEvent::ResyncCompleted { .. } => "Resync completed",
            SyncEvent::BulkProgress { .. } => "Bulk operation in progress",
            SyncEvent::Imported { .. } => "Games imported",
            SyncEvent::Skipped { .. } => "Games skipped",
            SyncEvent::Restored { .. } => "Game restored",
            SyncEvent::MatchFixed { .. } => "Match fixed",
            SyncEvent::Failed { .. } => "Operation failed",
        }
    }
}

// ============================================================================
// Notifications
// ============================================================================

/// A dismissible message intended for the user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub severity: EventSeverity,
    pub message: String,
}

impl Notification {
    pub fn new(severity: EventSeverity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(EventSeverity::Success, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(EventSeverity::Info, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(EventSeverity::Error, message)
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for broadcasting events to multiple subscribers.
///
/// Cloning the bus yields another handle to the same channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event; zero when
    /// nobody is listening.
    pub fn emit(&self, event: CoreEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// Creates a new subscriber to receive events.
    ///
    /// Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}
