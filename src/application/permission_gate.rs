use crate::{
    application::ports::PermissionProbe,
    domain::{PermissionState, RequestCode},
};

/// Outcome of [`PermissionGate::check_and_run`].
#[derive(Debug, PartialEq, Eq)]
pub enum GateDecision<A> {
    /// Permission is held; run the action now.
    Run(A),
    /// A consent request was issued; the action waits for its answer.
    Requested(RequestCode),
    /// An earlier request is still unanswered; the new action is dropped.
    Waiting,
}

struct PendingRequest<A> {
    code: RequestCode,
    action: A,
}

/// Storage-write permission check with a deferred action.
pub struct PermissionGate<P, A> {
    probe: P,
    state: PermissionState,
    pending: Option<PendingRequest<A>>,
}

impl<P: PermissionProbe, A> PermissionGate<P, A> {
    pub fn new(probe: P) -> Self {
        Self {
            probe,
            state: PermissionState::Unknown,
            pending: None,
        }
    }

    pub fn state(&self) -> PermissionState {
        self.state
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Non-blocking query of the current grant.
    pub fn probe(&mut self) -> PermissionState {
        self.state = self.probe.check();
        self.state
    }

    pub fn check_and_run(&mut self, code: RequestCode, action: A) -> GateDecision<A> {
        if self.probe() == PermissionState::Granted {
            return GateDecision::Run(action);
        }
        if self.is_pending() {
            tracing::debug!(?code, "permission request already pending");
            return GateDecision::Waiting;
        }

        self.pending = Some(PendingRequest { code, action });
        GateDecision::Requested(code)
    }

    /// Deliver a consent answer. Yields the waiting action once on grant.
    pub fn on_request_result(&mut self, code: RequestCode, granted: bool) -> Option<A> {
        match &self.pending {
            Some(pending) if pending.code == code => {}
            _ => {
                tracing::debug!(?code, "ignoring unmatched permission result");
                return None;
            }
        }

        let pending = self.pending.take()?;
        self.probe.remember(granted);

        if granted {
            self.state = PermissionState::Granted;
            Some(pending.action)
        } else {
            // No notice and no retry on denial.
            tracing::debug!(?code, "storage permission denied");
            self.state = PermissionState::Denied;
            None
        }
    }
}
