//! Aggregate attack detection.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::events::AttackEvent;

/// Process-wide alert flag used to deduplicate attack alerts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttackAlertState {
    pub active: bool,
    pub last_alerted_count: u32,
}

/// Raises an "ongoing attack" signal when the global failure count goes over
/// the activity threshold.
///
/// The first alert fires once the count is strictly greater than the
/// threshold. While the alert is active, another one only fires if the count
/// has grown by a further full threshold beyond the last alerted count.
#[derive(Debug, Default)]
pub struct AttackDetector {
    state: Mutex<AttackAlertState>,
}

fn threshold_of(threshold: i64) -> Option<u32> {
    if threshold <= 0 {
        return None;
    }
    Some(u32::try_from(threshold).unwrap_or(u32::MAX))
}

fn evaluate_locked(
    state: &mut AttackAlertState,
    global_count: u32,
    threshold: i64,
) -> Option<AttackEvent> {
    let threshold = threshold_of(threshold)?;
    if global_count <= threshold {
        return None;
    }

    let escalated = global_count > state.last_alerted_count.saturating_add(threshold);
    if state.active && !escalated {
        return None;
    }

    state.active = true;
    state.last_alerted_count = global_count;

    tracing::warn!(
        current_count = global_count,
        threshold = threshold,
        "Ongoing login attack detected"
    );

    Some(AttackEvent {
        current_count: global_count,
        threshold,
    })
}

fn settle_locked(
    state: &mut AttackAlertState,
    global_count: u32,
    threshold: i64,
) -> Option<AttackEvent> {
    if !state.active {
        return None;
    }

    let Some(threshold) = threshold_of(threshold) else {
        *state = AttackAlertState::default();
        return None;
    };

    if global_count > threshold {
        return None;
    }

    *state = AttackAlertState::default();
    tracing::info!(
        current_count = global_count,
        threshold = threshold,
        "Login attack no longer detected"
    );

    Some(AttackEvent {
        current_count: global_count,
        threshold,
    })
}

impl AttackDetector {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, AttackAlertState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn evaluate(&self, global_count: u32, threshold: i64) -> Option<AttackEvent> {
        evaluate_locked(&mut self.lock(), global_count, threshold)
    }

    /// Clear the alert if the count is back to or below the threshold.
    ///
    /// Returns the subsiding event when an active alert was cleared. A
    /// disabled threshold clears the alert silently.
    pub fn settle(&self, global_count: u32, threshold: i64) -> Option<AttackEvent> {
        settle_locked(&mut self.lock(), global_count, threshold)
    }

    /// Settle, then evaluate, against a single count read while the alert
    /// state is held.
    ///
    /// Concurrent callers are serialized, so each one sees a count at least
    /// as recent as the one the previous caller acted on.
    ///
    /// # Returns
    ///
    /// `(subsided, detected)`
    pub fn observe<F>(
        &self,
        global_count: F,
        threshold: i64,
    ) -> (Option<AttackEvent>, Option<AttackEvent>)
    where
        F: FnOnce() -> u32,
    {
        let mut state = self.lock();
        let count = global_count();
        let subsided = settle_locked(&mut state, count, threshold);
        let detected = evaluate_locked(&mut state, count, threshold);
        (subsided, detected)
    }

    /// Unconditionally clear the alert state.
    pub fn reset(&self) {
        *self.lock() = AttackAlertState::default();
    }

    pub fn is_active(&self) -> bool {
        self.lock().active
    }

    pub fn state(&self) -> AttackAlertState {
        *self.lock()
    }
}
