//! Per-session submission state: `Idle -> Submitting -> {Success, Failed} -> Idle`.

use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionState {
    Idle,
    Submitting { id: Uuid, started_at: DateTime<Utc> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failed,
}

#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("a submission is already in progress (started {since})")]
    InFlight { since: DateTime<Utc> },
}

/// Sessions with an outstanding submission. Idle sessions have no entry.
#[derive(Default)]
pub struct SubmissionRegistry {
    in_flight: Mutex<HashMap<String, (Uuid, DateTime<Utc>)>>,
}

impl SubmissionRegistry {
    pub fn new() -> Arc<Self> { Arc::default() }

    pub fn state(&self, session: &str) -> SubmissionState {
        match self.in_flight.lock().get(session) {
            Some(&(id, started_at)) => SubmissionState::Submitting { id, started_at },
            None => SubmissionState::Idle,
        }
    }

    /// Moves `session` to `Submitting`. The returned guard moves it back to
    /// `Idle` when dropped.
    pub fn begin(self: &Arc<Self>, session: &str) -> Result<SubmissionGuard, SubmissionError> {
        let mut in_flight = self.in_flight.lock();
        if let Some(&(_, since)) = in_flight.get(session) {
            return Err(SubmissionError::InFlight { since });
        }
        let id = Uuid::new_v4();
        let started_at = Utc::now();
        in_flight.insert(session.to_string(), (id, started_at));
        Ok(SubmissionGuard {
            registry: Arc::clone(self),
            session: session.to_string(),
            id,
            started_at,
            outcome: Outcome::Failed,
        })
    }

    fn finish(&self, session: &str, id: Uuid) {
        let mut in_flight = self.in_flight.lock();
        if in_flight.get(session).is_some_and(|(current, _)| *current == id) {
            in_flight.remove(session);
        }
    }
}

/// Outstanding submission. Counts as failed unless [`SubmissionGuard::succeed`]
/// is called before it drops.
pub struct SubmissionGuard {
    registry: Arc<SubmissionRegistry>,
    session: String,
    id: Uuid,
    started_at: DateTime<Utc>,
    outcome: Outcome,
}

impl SubmissionGuard {
    pub fn id(&self) -> Uuid { self.id }

    pub fn succeed(mut self) { self.outcome = Outcome::Success; }
}

impl Drop for SubmissionGuard {
    fn drop(&mut self) {
        self.registry.finish(&self.session, self.id);
        let elapsed_ms = (Utc::now() - self.started_at).num_milliseconds();
        info!(submission = %self.id, outcome = ?self.outcome, elapsed_ms, "submission finished");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_submission_is_rejected_while_first_is_outstanding() {
        let registry = SubmissionRegistry::new();
        let guard = registry.begin("s1").unwrap();
        assert!(matches!(registry.state("s1"), SubmissionState::Submitting { id, .. } if id == guard.id()));
        assert!(matches!(registry.begin("s1"), Err(SubmissionError::InFlight { .. })));
        // other sessions are independent
        assert!(registry.begin("s2").is_ok());
    }

    #[test]
    fn success_and_failure_both_return_to_idle() {
        let registry = SubmissionRegistry::new();
        registry.begin("s").unwrap().succeed();
        assert_eq!(registry.state("s"), SubmissionState::Idle);

        drop(registry.begin("s").unwrap());
        assert_eq!(registry.state("s"), SubmissionState::Idle);
        assert!(registry.begin("s").is_ok());
    }
}
