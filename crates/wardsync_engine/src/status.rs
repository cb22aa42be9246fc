//! Sync status broadcasting and the remote health flag.
//!
//! The engine is a pure producer of [`SyncStatus`] values. Observers
//! subscribe to a [`StatusBroadcaster`] and receive every status emitted
//! after they subscribed, in emission order.
//!
//! # Usage
//!
//! ```rust
//! use wardsync_engine::{StatusBroadcaster, StatusSink, SyncStatus};
//!
//! let broadcaster = StatusBroadcaster::new();
//! let receiver = broadcaster.subscribe();
//!
//! broadcaster.broadcast(SyncStatus::Started);
//! assert_eq!(receiver.recv().unwrap(), SyncStatus::Started);
//! ```

use parking_lot::RwLock;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};

/// A sync lifecycle notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncStatus {
    /// A sync began.
    Started,
    /// A sync is running.
    InProgress {
        /// Completion, 0 to 100.
        percent: u8,
        /// What is happening now.
        label: String,
    },
    /// The sync committed.
    Completed,
    /// The sync failed and was rolled back.
    Failed,
    /// The sync was cancelled and rolled back.
    Canceled,
}

impl SyncStatus {
    /// Creates a progress status.
    pub fn progress(percent: u8, label: impl Into<String>) -> Self {
        Self::InProgress {
            percent: percent.min(100),
            label: label.into(),
        }
    }

    /// Returns true for statuses that end a sync.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SyncStatus::Completed | SyncStatus::Failed | SyncStatus::Canceled
        )
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncStatus::Started => f.write_str("STARTED"),
            SyncStatus::InProgress { percent, label } => {
                write!(f, "IN_PROGRESS({percent}%, {label})")
            }
            SyncStatus::Completed => f.write_str("COMPLETED"),
            SyncStatus::Failed => f.write_str("FAILED"),
            SyncStatus::Canceled => f.write_str("CANCELED"),
        }
    }
}

/// Receives status notifications from the engine.
///
/// Called from the sync worker thread; implementations synchronize
/// internally.
pub trait StatusSink: Send + Sync {
    /// Delivers one status.
    fn broadcast(&self, status: SyncStatus);
}

/// Fans statuses out to any number of subscribers.
///
/// The broadcaster:
/// - Preserves emission order
/// - Supports multiple subscribers
/// - Drops subscribers whose receiver is gone
/// - Keeps the most recent status for late observers
#[derive(Default)]
pub struct StatusBroadcaster {
    subscribers: RwLock<Vec<Sender<SyncStatus>>>,
    last: RwLock<Option<SyncStatus>>,
}

impl StatusBroadcaster {
    /// Creates a broadcaster with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes to future statuses.
    ///
    /// The receiver should be drained regularly to avoid unbounded memory
    /// growth.
    pub fn subscribe(&self) -> Receiver<SyncStatus> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.write().push(tx);
        rx
    }

    /// The most recently broadcast status.
    pub fn last_status(&self) -> Option<SyncStatus> {
        self.last.read().clone()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }
}

impl StatusSink for StatusBroadcaster {
    fn broadcast(&self, status: SyncStatus) {
        *self.last.write() = Some(status.clone());
        let mut subscribers = self.subscribers.write();
        subscribers.retain(|tx| tx.send(status.clone()).is_ok());
    }
}

/// Reports whether the remote API is known to be unavailable.
///
/// Maintained by an external monitor and read once at the start of every
/// sync, so a sync without connectivity fails fast instead of hanging.
pub trait ApiHealth: Send + Sync {
    /// Returns true if the remote API is known to be unreachable.
    fn is_api_unavailable(&self) -> bool;
}

/// A settable [`ApiHealth`] flag.
#[derive(Debug, Default)]
pub struct HealthFlag {
    unavailable: AtomicBool,
}

impl HealthFlag {
    /// Creates a flag reporting the API as available.
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the API as unavailable (`true`) or available (`false`).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

impl ApiHealth for HealthFlag {
    fn is_api_unavailable(&self) -> bool {
        self.unavailable.load(Ordering::SeqCst)
    }
}
