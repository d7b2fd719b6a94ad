//! The Node state machine, shared by every concrete `Node` implementation
//! so individual authors can't special-case a transition (spec §3's state
//! diagram, enforced centrally the way `moonshine`'s `ShutdownManager`
//! centralizes a cross-cutting lifecycle concern every subsystem
//! participates in rather than letting each reimplement it).

use std::sync::atomic::{AtomicU8, Ordering};

use qcnode_memory::Status;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum State {
    Initial = 0,
    Initializing = 1,
    Ready = 2,
    Starting = 3,
    Running = 4,
    Stopping = 5,
    Pausing = 6,
    Pause = 7,
    Resuming = 8,
    Deinitializing = 9,
    Error = 10,
}

impl State {
    fn from_u8(v: u8) -> State {
        match v {
            0 => State::Initial,
            1 => State::Initializing,
            2 => State::Ready,
            3 => State::Starting,
            4 => State::Running,
            5 => State::Stopping,
            6 => State::Pausing,
            7 => State::Pause,
            8 => State::Resuming,
            9 => State::Deinitializing,
            _ => State::Error,
        }
    }
}

/// Holds the current state as a single atomic scalar: written by whichever
/// thread drives a transition (the submitting thread for most Nodes, the
/// backend callback thread for codec event-driven transitions per spec
/// §5), read by anyone polling `GetState`.
pub struct NodeState {
    current: AtomicU8,
}

impl Default for NodeState {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeState {
    pub fn new() -> Self {
        Self {
            current: AtomicU8::new(State::Initial as u8),
        }
    }

    pub fn get(&self) -> State {
        State::from_u8(self.current.load(Ordering::SeqCst))
    }

    fn set(&self, next: State) {
        self.current.store(next as u8, Ordering::SeqCst);
    }

    /// Attempts the transition `expected -> next`. Returns `BAD_STATE`
    /// without any side effect when the current state doesn't match
    /// `expected` (spec §3: "any operation invoked in a non-matching
    /// source state must return BAD_STATE without side effects").
    pub fn transition(&self, expected: State, next: State) -> Result<(), Status> {
        match self.current.compare_exchange(
            expected as u8,
            next as u8,
            Ordering::SeqCst,
            Ordering::SeqCst,
        ) {
            Ok(_) => Ok(()),
            Err(_) => Err(Status::BadState),
        }
    }

    /// Transitions from any one of `expected` to `next`, used where a
    /// Node's event handler may arrive while in more than one source
    /// state (e.g. a driver event that can be observed from either
    /// `Starting` or `Running`, depending on scheduling).
    pub fn transition_from_any(&self, expected: &[State], next: State) -> Result<(), Status> {
        for &e in expected {
            if self.transition(e, next).is_ok() {
                return Ok(());
            }
        }
        Err(Status::BadState)
    }

    /// Unconditional transition to `ERROR`, used for driver events
    /// received in an unexpected state and for `ERR_HWFATAL`/
    /// `ERR_CLIENTFATAL` (spec §4.G.2: terminal until re-initialized).
    pub fn force_error(&self) {
        self.set(State::Error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_succeeds_from_matching_state() {
        let ns = NodeState::new();
        assert!(ns.transition(State::Initial, State::Initializing).is_ok());
        assert_eq!(ns.get(), State::Initializing);
    }

    #[test]
    fn transition_rejects_non_matching_source_state() {
        let ns = NodeState::new();
        assert_eq!(
            ns.transition(State::Running, State::Stopping),
            Err(Status::BadState)
        );
        assert_eq!(ns.get(), State::Initial);
    }

    #[test]
    fn force_error_is_reachable_from_any_state() {
        let ns = NodeState::new();
        ns.transition(State::Initial, State::Initializing).unwrap();
        ns.force_error();
        assert_eq!(ns.get(), State::Error);
    }
}
