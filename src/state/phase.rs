//! Lifecycle phases of a crawl run
use std::fmt;

/// Represents the phase a crawl run is in
///
/// Runs move strictly forward: `Idle -> Running -> Draining -> Done`.
/// A run may also go from `Idle` to `Draining` when it is stopped before
/// any request was dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlPhase {
    /// Seeds are being loaded into the frontier
    Idle,

    /// Requests are being dispatched
    Running,

    /// No new dispatches; in-flight work finishes and the report is flushed
    Draining,

    /// Terminal phase; statistics are final
    Done,
}

impl CrawlPhase {
    /// Returns true if new requests may still be dispatched
    pub fn accepts_dispatch(&self) -> bool {
        matches!(self, Self::Running)
    }

    /// Returns true if `next` is a legal successor of this phase
    pub fn can_transition_to(&self, next: CrawlPhase) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Running)
                | (Self::Idle, Self::Draining)
                | (Self::Running, Self::Draining)
                | (Self::Draining, Self::Done)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Draining => "draining",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
