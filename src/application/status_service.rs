// Status reconciliation - merges push-channel and poll-channel status
use crate::domain::status::DisplayStatus;
use std::time::{Duration, Instant};

/// Resolves the two independent status inputs - asynchronous push frames on
/// the duplex connection and a fixed-interval poll - into one canonical
/// `DisplayStatus`.
///
/// Last writer wins, with one tie-break: a poll result is authoritative
/// only if no push update arrived within the current poll interval. The
/// poll is a liveness fallback for a silent push channel (typically a
/// dropped connection), not a complement to partial push data; every
/// adopted update fully replaces the previous status.
#[derive(Debug)]
pub struct StatusReconciler {
    poll_interval: Duration,
    current: Option<DisplayStatus>,
    last_push: Option<Instant>,
}

impl StatusReconciler {
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            poll_interval,
            current: None,
            last_push: None,
        }
    }

    pub fn current(&self) -> Option<&DisplayStatus> {
        self.current.as_ref()
    }

    /// Adopt a status pushed over the duplex connection. Push always wins.
    pub fn apply_push(&mut self, status: DisplayStatus, now: Instant) -> &DisplayStatus {
        self.last_push = Some(now);
        &*self.current.insert(status)
    }

    /// Offer a polled status. Adopted only when the push channel has been
    /// silent for at least one poll interval; returns the adopted status,
    /// or `None` when the poll result was discarded.
    pub fn apply_poll(&mut self, status: DisplayStatus, now: Instant) -> Option<&DisplayStatus> {
        let push_is_fresh = self
            .last_push
            .is_some_and(|at| now.duration_since(at) < self.poll_interval);
        if push_is_fresh {
            return None;
        }
        Some(&*self.current.insert(status))
    }
}
