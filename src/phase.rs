//! Test phases and the polling decision.
//!
//! The backend only reports free text, so [`BackendSignals`] is the one place
//! that looks at those strings. Everything downstream works with
//! [`PhaseEvent`]s and the pure [`Phase::on_event`] transition.

use std::fmt;

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Phase {
    Loading = 0,
    Welcome = 1,
    Preparing = 2,
    Upload = 3,
    Download = 4,
    Results = 5,
}

impl TryFrom<u8> for Phase {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Phase::Loading),
            1 => Ok(Phase::Welcome),
            2 => Ok(Phase::Preparing),
            3 => Ok(Phase::Upload),
            4 => Ok(Phase::Download),
            5 => Ok(Phase::Results),
            other => Err(Error::UnknownPhase(other)),
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Loading => "LOADING",
            Phase::Welcome => "WELCOME",
            Phase::Preparing => "PREPARING TEST",
            Phase::Upload => "UPLOAD TEST",
            Phase::Download => "DOWNLOAD TEST",
            Phase::Results => "SHOW RESULTS",
        };
        f.write_str(name)
    }
}

/// Something the backend reported, already translated from text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseEvent {
    NotRun,
    Completed,
    Failed,
    Outbound,
    Inbound,
    /// Status has moved past the pre-test states and the host looks like a
    /// real server, but no explicit transfer signal was seen.
    TransferInferred,
    HostResolved,
}

impl Phase {
    /// Phase that follows `event`, or `None` when the event does not apply.
    pub fn on_event(self, event: PhaseEvent) -> Option<Phase> {
        match event {
            PhaseEvent::NotRun if self != Phase::Loading => Some(Phase::Welcome),
            PhaseEvent::Completed | PhaseEvent::Failed if self < Phase::Results => {
                Some(Phase::Results)
            }
            PhaseEvent::Outbound if self < Phase::Upload => Some(Phase::Upload),
            PhaseEvent::Inbound if self < Phase::Download => Some(Phase::Download),
            PhaseEvent::TransferInferred if self == Phase::Preparing => Some(Phase::Upload),
            PhaseEvent::HostResolved if self < Phase::Preparing => Some(Phase::Preparing),
            _ => None,
        }
    }
}

/// The three strings read from the backend on each poll.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendSignals {
    pub errmsg: String,
    pub status: String,
    pub host: String,
}

impl BackendSignals {
    /// Candidate events in the order they must be evaluated.
    pub fn events(&self) -> Vec<PhaseEvent> {
        let mut events = Vec::new();

        if self.errmsg.contains("not run") {
            events.push(PhaseEvent::NotRun);
        }
        if self.errmsg.contains("completed") {
            events.push(PhaseEvent::Completed);
        }
        if self.errmsg.contains("failed") {
            events.push(PhaseEvent::Failed);
        }
        if self.status.contains("Outbound") {
            events.push(PhaseEvent::Outbound);
        }
        if self.status.contains("Inbound") {
            events.push(PhaseEvent::Inbound);
        }
        // Weak inference kept as-is: a host name containing "ndt" is taken
        // to be the discovery placeholder, which may hide real failures.
        if !self.status.contains("Middleboxes")
            && !self.status.contains("notStarted")
            && !self.host.contains("ndt")
        {
            events.push(PhaseEvent::TransferInferred);
        }
        if self.host != "unknown" {
            events.push(PhaseEvent::HostResolved);
        }

        events
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Keep polling.
    Continue,
    /// Backend says the test was never run; back to the welcome page.
    Abandoned,
    Completed,
    Failed,
}

impl PollOutcome {
    pub fn is_terminal(self) -> bool {
        self != PollOutcome::Continue
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollDecision {
    pub transitions: Vec<Phase>,
    pub outcome: PollOutcome,
}

/// Decide what one poll tick does, given the current phase.
pub fn decide(current: Phase, signals: &BackendSignals) -> PollDecision {
    let mut phase = current;
    let mut transitions = Vec::new();

    for event in signals.events() {
        let Some(next) = phase.on_event(event) else {
            continue;
        };
        transitions.push(next);
        phase = next;

        let outcome = match event {
            PhaseEvent::NotRun => PollOutcome::Abandoned,
            PhaseEvent::Completed => PollOutcome::Completed,
            PhaseEvent::Failed => PollOutcome::Failed,
            _ => continue,
        };
        return PollDecision {
            transitions,
            outcome,
        };
    }

    PollDecision {
        transitions,
        outcome: PollOutcome::Continue,
    }
}
