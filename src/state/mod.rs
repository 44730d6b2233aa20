//! Per-request session and authentication state.
//!
//! Both objects are rebuilt from their cookies on every request, mutated by
//! handlers, and written back only if something changed.

mod authentication;
mod session;

pub use authentication::{AuthenticationState, ExternalIdentity};
pub use session::{generate_csrf_token, SessionState};

/// Where a request is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestPhase {
    Received,
    CookiesParsed,
    FiltersEvaluated,
    HandlerExecuted,
    StateSerialized,
    ResponseSent(Outcome),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Denied,
    Completed,
}

impl RequestPhase {
    /// Whether `next` is a legal successor of `self`.
    #[must_use]
    pub const fn allows(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Received, Self::CookiesParsed)
                | (Self::CookiesParsed, Self::FiltersEvaluated)
                | (Self::FiltersEvaluated, Self::HandlerExecuted)
                | (Self::FiltersEvaluated, Self::ResponseSent(Outcome::Denied))
                | (Self::HandlerExecuted, Self::StateSerialized)
                | (Self::CookiesParsed, Self::HandlerExecuted)
                | (Self::StateSerialized, Self::ResponseSent(Outcome::Completed))
        )
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::ResponseSent(_))
    }
}

/// Everything the cookies carried for one request.
#[derive(Clone, Debug)]
pub struct RequestState {
    pub session: SessionState,
    pub authentication: AuthenticationState,
    phase: RequestPhase,
}

impl RequestState {
    #[must_use]
    pub fn new(session: SessionState, authentication: AuthenticationState) -> Self {
        Self {
            session,
            authentication,
            phase: RequestPhase::CookiesParsed,
        }
    }

    #[must_use]
    pub const fn phase(&self) -> RequestPhase {
        self.phase
    }

    /// Move to `next`, logging the transition. Illegal moves are logged and ignored.
    pub fn advance(&mut self, next: RequestPhase) {
        if self.phase.allows(next) {
            tracing::debug!(from = ?self.phase, to = ?next, "request phase");
            self.phase = next;
        } else {
            tracing::debug!(from = ?self.phase, to = ?next, "ignored request phase transition");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completed_lifecycle() {
        let mut state = RequestState::new(SessionState::new(), AuthenticationState::new());
        for phase in [
            RequestPhase::FiltersEvaluated,
            RequestPhase::HandlerExecuted,
            RequestPhase::StateSerialized,
            RequestPhase::ResponseSent(Outcome::Completed),
        ] {
            state.advance(phase);
            assert_eq!(state.phase(), phase);
        }
        assert!(state.phase().is_terminal());
    }

    #[test]
    fn denied_lifecycle_skips_serialization() {
        let mut state = RequestState::new(SessionState::new(), AuthenticationState::new());
        state.advance(RequestPhase::FiltersEvaluated);
        state.advance(RequestPhase::StateSerialized);
        assert_eq!(state.phase(), RequestPhase::FiltersEvaluated);

        state.advance(RequestPhase::ResponseSent(Outcome::Denied));
        assert_eq!(state.phase(), RequestPhase::ResponseSent(Outcome::Denied));
    }
}
