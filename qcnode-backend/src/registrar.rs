//! `BackendRegistrar`: the per-engine registration primitive the
//! `RegistrationService` caches results of (spec §4.F: "RegBuf(descriptor,
//! direction) -> handle" / "DeregBuf(virtualAddress)").

use qcnode_memory::{Descriptor, Status};

use crate::kind::{BackendHandle, Direction};

/// Implemented once per concrete engine. Registration/deregistration must
/// not block the submitting thread beyond the time needed to call the
/// underlying backend primitive (spec §4.F) — heavyweight one-time setup
/// (device creation, session negotiation) belongs in the registrar's own
/// constructor, called at Node init, not here.
pub trait BackendRegistrar: Send + Sync {
    fn register(&self, descriptor: &Descriptor, direction: Direction) -> Result<BackendHandle, Status>;

    /// Deregistration is refcount-free and terminal: once called, the next
    /// `register` call for the same address re-registers from scratch.
    fn deregister(&self, virtual_address: usize);
}
