//! Per-session render status transitions
//!
//! `Pending` settles into `Ready` or `Error` once; a rebuild starts a fresh
//! session instead of moving a settled one.

use crate::types::RenderStatus;

/// Transition a session attempted but may not take
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("illegal render status transition {from} -> {to}")]
pub struct IllegalTransition {
    pub from: RenderStatus,
    pub to: RenderStatus,
}

/// Validates a status change within one render session.
///
/// A session is born `Pending` and settles exactly once. Leaving `Ready` or
/// `Error` only happens by starting a new generation, which is a new session
/// rather than a transition.
pub fn validate_transition(from: RenderStatus, to: RenderStatus) -> Result<(), IllegalTransition> {
    if allowed(from, to) {
        Ok(())
    } else {
        Err(IllegalTransition { from, to })
    }
}

pub fn allowed_transitions(from: RenderStatus) -> Vec<RenderStatus> {
    match from {
        RenderStatus::Pending => vec![RenderStatus::Ready, RenderStatus::Error],
        RenderStatus::Ready | RenderStatus::Error => vec![],
    }
}

fn allowed(from: RenderStatus, to: RenderStatus) -> bool {
    allowed_transitions(from).into_iter().any(|s| s == to)
}
