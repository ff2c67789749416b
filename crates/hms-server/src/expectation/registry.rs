//! Expectation registry: ordered storage, matching with call accounting, and
//! the verification cycle.
//!
//! All state lives behind one mutex. Matching a request (scan, increment,
//! limit check, failure recording) and verifying (check all, reset) each run
//! in a single critical section, so two requests racing on the same limit
//! cannot both be served past it.

use super::types::{Expectation, IncomingRequest, LimitViolation, RegistryError, ResponseTemplate};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

#[derive(Debug, Default)]
struct RegistryState {
    expectations: Vec<Expectation>,
    /// Unmatched-request failures since the last reset
    failures: Vec<String>,
}

/// Result of matching one request against the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    /// The expectation at `index` was selected and is within its limit
    Served {
        index: usize,
        response: ResponseTemplate,
    },
    /// The expectation at `index` was selected but its limit is used up
    LimitExceeded {
        index: usize,
        violation: LimitViolation,
    },
    /// Nothing matched; the failure has been recorded
    Unmatched { failure: String },
}

/// Outcome of a verification cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    Satisfied,
    /// Unmatched requests first, in arrival order, then limit failures in
    /// registration order
    Unsatisfied(Vec<String>),
}

impl Verification {
    pub fn is_satisfied(&self) -> bool {
        matches!(self, Verification::Satisfied)
    }
}

/// Ordered, shared store of expectations.
#[derive(Debug, Default)]
pub struct Registry {
    state: Mutex<RegistryState>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an expectation and return its index.
    pub fn append(&self, expectation: Expectation) -> usize {
        let mut state = self.state.lock();
        state.expectations.push(expectation);
        state.expectations.len() - 1
    }

    /// Replace the expectation at `index`. The replacement starts with its
    /// own call count.
    pub fn replace_at(&self, index: usize, expectation: Expectation) -> Result<(), RegistryError> {
        let mut state = self.state.lock();
        let slot = state
            .expectations
            .get_mut(index)
            .ok_or(RegistryError::IndexOutOfBounds(index))?;
        *slot = expectation;
        Ok(())
    }

    /// Drop every expectation and every recorded failure.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.expectations.clear();
        state.failures.clear();
    }

    /// Copy of the stored expectations, in insertion order.
    pub fn snapshot(&self) -> Vec<Expectation> {
        self.state.lock().expectations.clone()
    }

    /// Copy of the unmatched-request failures recorded so far.
    pub fn failures(&self) -> Vec<String> {
        self.state.lock().failures.clone()
    }

    pub fn len(&self) -> usize {
        self.state.lock().expectations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().expectations.is_empty()
    }

    /// Select the first expectation accepting `request`, count the call and
    /// check its limit. A request that matches nothing is recorded as a
    /// failure.
    pub fn match_request(&self, request: &IncomingRequest) -> MatchOutcome {
        let mut state = self.state.lock();

        let selected = state
            .expectations
            .iter_mut()
            .enumerate()
            .find(|(_, e)| e.predicate().matches(request));

        if let Some((index, expectation)) = selected {
            return match expectation.record_call() {
                Ok(()) => {
                    debug!(
                        index,
                        call_count = expectation.call_count(),
                        "{} {} matched expectation",
                        request.method(),
                        request.uri()
                    );
                    MatchOutcome::Served {
                        index,
                        response: expectation.response().clone(),
                    }
                }
                Err(violation) => {
                    warn!(index, "{}", violation);
                    MatchOutcome::LimitExceeded { index, violation }
                }
            };
        }

        let failure = format!(
            "{} request to \"{}\" did not match any rule",
            request.method(),
            request.uri()
        );
        debug!("{}", failure);
        state.failures.push(failure.clone());
        MatchOutcome::Unmatched { failure }
    }

    /// Run a verification cycle: collect unmatched-request failures and limit
    /// violations, then reset the registry whatever the outcome.
    pub fn verify(&self) -> Verification {
        let mut state = self.state.lock();
        let RegistryState {
            expectations,
            failures,
        } = std::mem::take(&mut *state);
        drop(state);

        let total = expectations.len();
        let mut failures = failures;
        failures.extend(
            expectations
                .iter()
                .filter_map(|e| e.check_limit().err())
                .map(|violation| violation.to_string()),
        );

        if failures.is_empty() {
            info!(expectations = total, "All expectations met");
            Verification::Satisfied
        } else {
            info!(
                expectations = total,
                failures = failures.len(),
                "Expectations not met"
            );
            Verification::Unsatisfied(failures)
        }
    }
}
