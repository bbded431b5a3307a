//! Watch event types
//!
//! Events carry the set of filesystem operations observed for a path
//! within one debounce window, collapsed into a small bitset so a burst
//! of notifications becomes a single handler call.

use notify::event::ModifyKind;
use notify::EventKind;
use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::path::PathBuf;
use std::sync::Arc;

/// Bitset of filesystem operations coalesced for one path
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct EventOp(u8);

impl EventOp {
    pub const CREATE: EventOp = EventOp(1);
    pub const WRITE: EventOp = EventOp(1 << 1);
    pub const REMOVE: EventOp = EventOp(1 << 2);
    pub const RENAME: EventOp = EventOp(1 << 3);
    pub const CHMOD: EventOp = EventOp(1 << 4);

    /// The empty operation set
    pub fn empty() -> Self {
        Self(0)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Check whether all operations in `other` are present
    pub fn contains(self, other: EventOp) -> bool {
        self.0 & other.0 == other.0
    }

    /// Map a notify event kind to an operation bit
    ///
    /// Kinds with no counterpart (access notifications, catch-alls)
    /// map to the empty set and are dropped by the observer.
    pub fn from_kind(kind: &EventKind) -> Self {
        match kind {
            EventKind::Create(_) => Self::CREATE,
            EventKind::Modify(ModifyKind::Name(_)) => Self::RENAME,
            EventKind::Modify(ModifyKind::Metadata(_)) => Self::CHMOD,
            EventKind::Modify(_) => Self::WRITE,
            EventKind::Remove(_) => Self::REMOVE,
            _ => Self::empty(),
        }
    }
}

impl BitOr for EventOp {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for EventOp {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for EventOp {
    /// Renders the most significant operation, matching the priority
    /// used for log labels: CREATE > WRITE > REMOVE > RENAME > CHMOD
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = if self.contains(Self::CREATE) {
            "CREATE"
        } else if self.contains(Self::WRITE) {
            "WRITE"
        } else if self.contains(Self::REMOVE) {
            "REMOVE"
        } else if self.contains(Self::RENAME) {
            "RENAME"
        } else if self.contains(Self::CHMOD) {
            "CHMOD"
        } else {
            "UNKNOWN"
        };
        write!(f, "{label}")
    }
}

/// A batched filesystem notification delivered to the handler
///
/// Error events carry no path; they report OS watcher failures the
/// handler must tolerate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// One or more operations observed on a path within a debounce window
    Change { path: PathBuf, op: EventOp },
    /// An error reported by the OS watcher
    Error(String),
}

/// Callback invoked once per batched event (or watcher error)
pub type EventHandler = Arc<dyn Fn(WatchEvent) + Send + Sync>;
