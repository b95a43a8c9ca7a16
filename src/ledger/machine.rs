//! Pure transition table for ledger progress
//!
//! No I/O happens here. [`plan`] looks at persisted progress and says what the
//! driver must do next; [`apply`] folds the result of that step back into a
//! new progress value plus the effects the driver has to run.
//!
//! ```text
//! pending ──execute──┬─ final ───────> success
//!                    ├─ provisional ─> pending_hash ──poll── final ──> success
//!                    ├─ nothing ─────> pending            └─ stale ──> failure
//!                    └─ rejected ────> failure
//! ```

use chrono::{DateTime, Duration, Utc};

use super::status::{ExecutionStatus, Progress};
use crate::execution::ExecutionOutcome;

/// Default staleness bound for `pending_hash`
pub const DEFAULT_PENDING_HASH_TIMEOUT_SECS: u64 = 600;

/// What the driver has to do for the current progress
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Plan {
    /// Nothing to call, the outcome is already known
    Settle(Outcome),
    /// Ask the execution service whether the provisional handle resolved
    Poll(String),
    /// Dispatch a fresh execution
    Execute,
}

/// Result of one step, fed back into [`apply`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    AlreadyTerminal,
    Expired,
    CompletedWithoutProof,
    /// A final handle was already persisted without the status catching up
    Recovered(String),
    Executed(ExecutionOutcome),
    Polled(Option<String>),
    TransportFailed,
    Rejected,
}

/// New progress plus the effects the driver must run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub next: Progress,
    /// Write `next` to the store
    pub persist: bool,
    /// Fire webhook/analytics (only ever on entry into `success`)
    pub notify: bool,
    /// Tell the caller to stop retrying
    pub handled: bool,
}

impl Transition {
    fn unchanged(current: &Progress, handled: bool) -> Self {
        Self {
            next: current.clone(),
            persist: false,
            notify: false,
            handled,
        }
    }

    fn to(next: Progress, handled: bool) -> Self {
        let notify = next.status == ExecutionStatus::Success;
        Self {
            next,
            persist: true,
            notify,
            handled,
        }
    }
}

/// Whether a provisional execution has been outstanding for too long.
/// A record without a creation time counts as stale.
pub fn is_stale(progress: &Progress, now: DateTime<Utc>, timeout: Duration) -> bool {
    match progress.created_at {
        Some(created_at) => now - created_at > timeout,
        None => true,
    }
}

/// Decide the next step for persisted progress
pub fn plan(current: &Progress, now: DateTime<Utc>, timeout: Duration) -> Plan {
    if current.status.is_terminal() {
        return Plan::Settle(Outcome::AlreadyTerminal);
    }

    if let Some(hash) = &current.final_handle {
        return Plan::Settle(Outcome::Recovered(hash.clone()));
    }

    let awaiting_hash =
        current.status == ExecutionStatus::PendingHash || current.provisional_handle.is_some();

    if !awaiting_hash {
        return Plan::Execute;
    }

    if is_stale(current, now, timeout) {
        return Plan::Settle(Outcome::Expired);
    }

    match &current.provisional_handle {
        Some(handle) => Plan::Poll(handle.clone()),
        None => Plan::Settle(Outcome::CompletedWithoutProof),
    }
}

/// Fold a step's outcome into the next progress value
pub fn apply(current: &Progress, outcome: Outcome) -> Transition {
    match outcome {
        Outcome::AlreadyTerminal => Transition::unchanged(current, true),
        Outcome::TransportFailed => Transition::unchanged(current, false),
        Outcome::Expired | Outcome::Rejected => Transition::to(
            Progress {
                status: ExecutionStatus::Failure,
                ..current.clone()
            },
            true,
        ),
        Outcome::CompletedWithoutProof => Transition::to(
            Progress {
                status: ExecutionStatus::Success,
                ..current.clone()
            },
            true,
        ),
        Outcome::Recovered(hash) | Outcome::Polled(Some(hash)) => complete(current, hash),
        Outcome::Polled(None) => await_hash(current, None),
        Outcome::Executed(result) => match (result.final_handle, result.provisional_handle) {
            (Some(hash), _) => complete(current, hash),
            (None, Some(handle)) => await_hash(current, Some(handle)),
            (None, None) => Transition::unchanged(current, false),
        },
    }
}

fn complete(current: &Progress, hash: String) -> Transition {
    Transition::to(
        Progress {
            status: ExecutionStatus::Success,
            final_handle: Some(hash),
            ..current.clone()
        },
        true,
    )
}

fn await_hash(current: &Progress, handle: Option<String>) -> Transition {
    let next = Progress {
        status: ExecutionStatus::PendingHash,
        provisional_handle: handle.or_else(|| current.provisional_handle.clone()),
        ..current.clone()
    };

    if next == *current {
        return Transition::unchanged(current, false);
    }

    Transition {
        next,
        persist: true,
        notify: false,
        handled: false,
    }
}
