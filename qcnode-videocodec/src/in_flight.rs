//! Input/output in-flight buffer maps, grounded in `VidcDrvClient`'s
//! `m_inputMap`/`m_outputMap` and their separate `m_inLock`/`m_outLock`
//! mutexes (spec §5: "separate input and output locks; callbacks acquire
//! under the corresponding lock, copy the descriptor out, release, then
//! invoke user callbacks").

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use qcnode_memory::{Descriptor, Status};

use crate::buffer_mode::BufferMode;

#[derive(Debug, Clone)]
struct Slot {
    used: bool,
    descriptor: Descriptor,
}

/// One side's (input or output) in-flight buffer bookkeeping, keyed by
/// `dmaHandle` (the driver's `frm_clnt_data`). Stores a copy of the
/// submitted descriptor alongside the in-use flag, mirroring
/// `VideoCodec_InputInfo_t`/`VideoCodec_OutputInfo_t`, so a completion
/// event can be forwarded to the user callback without the caller having
/// to keep its own side table.
pub struct InFlightMap {
    slots: Mutex<HashMap<u64, Slot>>,
    declared_count: AtomicU32,
}

impl InFlightMap {
    pub fn new(declared_count: u32) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            declared_count: AtomicU32::new(declared_count),
        }
    }

    /// Updates the dynamic-mode recycling cap once buffer-requirement
    /// negotiation with the driver has settled on a count (spec §4.G.2
    /// step 5 runs after this map is constructed).
    pub fn set_declared_count(&self, count: u32) {
        self.declared_count.store(count, Ordering::SeqCst);
    }

    /// Marks `handle` in-use for submission, per spec §4.G.2's dynamic vs
    /// static lookup rule. Returns `NOMEM` when the mode's capacity is
    /// exhausted or the handle is already in-use.
    pub fn mark_in_use(&self, handle: u64, descriptor: Descriptor, mode: BufferMode) -> Status {
        let mut slots = self.slots.lock().unwrap();
        match slots.get_mut(&handle) {
            Some(slot) if slot.used => Status::NoMem,
            Some(slot) => {
                slot.used = true;
                slot.descriptor = descriptor;
                Status::Ok
            }
            None => {
                if mode.is_dynamic() {
                    if slots.len() as u32 >= self.declared_count.load(Ordering::SeqCst) {
                        Status::NoMem
                    } else {
                        slots.insert(
                            handle,
                            Slot {
                                used: true,
                                descriptor,
                            },
                        );
                        Status::Ok
                    }
                } else {
                    // Static mode: every handle must have been enrolled
                    // at init via SetBuffer.
                    Status::NoMem
                }
            }
        }
    }

    /// Reverts an in-use mark after a failed ioctl submission (spec
    /// §4.G.2: "If the ioctl fails, revert the in-use mark").
    pub fn revert(&self, handle: u64) {
        if let Some(slot) = self.slots.lock().unwrap().get_mut(&handle) {
            slot.used = false;
        }
    }

    /// Clears the in-use mark on completion and returns the descriptor
    /// that was submitted, for the caller to patch completion fields onto
    /// and forward (`RESP_INPUT_DONE`/`RESP_OUTPUT_DONE`). Locks only long
    /// enough to copy the descriptor out, per spec §5.
    pub fn clear_and_take(&self, handle: u64) -> Option<Descriptor> {
        let mut slots = self.slots.lock().unwrap();
        let slot = slots.get_mut(&handle)?;
        slot.used = false;
        Some(slot.descriptor)
    }

    /// Enrolls every address up front for static mode (spec §4.G.2 step
    /// 6: "enroll buffer descriptors").
    pub fn enroll_static(&self, descriptors: &[Descriptor]) {
        let mut slots = self.slots.lock().unwrap();
        slots.clear();
        for d in descriptors {
            if let Some(base) = d.base() {
                slots.insert(
                    base.dma_handle,
                    Slot {
                        used: false,
                        descriptor: *d,
                    },
                );
            }
        }
    }

    pub fn in_flight_count(&self) -> usize {
        self.slots.lock().unwrap().len()
    }

    /// Drops every enrolled slot without re-enrolling anything, for
    /// dynamic-mode `OUTPUT_RECONFIG`: there are no Node-owned descriptors
    /// to reallocate, so reconfig just invalidates whatever was in flight
    /// under the old parameters.
    pub fn clear(&self) {
        self.slots.lock().unwrap().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qcnode_memory::BaseFields;

    fn raw(handle: u64) -> Descriptor {
        Descriptor::Raw(BaseFields {
            dma_handle: handle,
            ..Default::default()
        })
    }

    #[test]
    fn dynamic_mode_recycles_up_to_declared_count() {
        let map = InFlightMap::new(2);
        assert_eq!(map.mark_in_use(1, raw(1), BufferMode::Dynamic), Status::Ok);
        assert_eq!(map.mark_in_use(2, raw(2), BufferMode::Dynamic), Status::Ok);
        assert_eq!(map.mark_in_use(3, raw(3), BufferMode::Dynamic), Status::NoMem);
        map.clear_and_take(1);
        assert_eq!(map.mark_in_use(1, raw(1), BufferMode::Dynamic), Status::Ok);
    }

    #[test]
    fn static_mode_rejects_unenrolled_handle() {
        let map = InFlightMap::new(2);
        let mode = BufferMode::Static {
            count: 2,
            allocated_by: crate::buffer_mode::AllocatedBy::App,
        };
        assert_eq!(map.mark_in_use(7, raw(7), mode), Status::NoMem);
        map.enroll_static(&[raw(7), raw(8)]);
        assert_eq!(map.mark_in_use(7, raw(7), mode), Status::Ok);
        assert_eq!(map.mark_in_use(7, raw(7), mode), Status::NoMem);
    }

    #[test]
    fn revert_allows_resubmission_after_ioctl_failure() {
        let map = InFlightMap::new(1);
        assert_eq!(map.mark_in_use(1, raw(1), BufferMode::Dynamic), Status::Ok);
        map.revert(1);
        assert_eq!(map.mark_in_use(1, raw(1), BufferMode::Dynamic), Status::Ok);
    }

    #[test]
    fn clear_and_take_returns_stored_descriptor() {
        let map = InFlightMap::new(1);
        map.mark_in_use(1, raw(1), BufferMode::Dynamic);
        let d = map.clear_and_take(1).unwrap();
        assert_eq!(d.base().unwrap().dma_handle, 1);
        assert!(map.clear_and_take(99).is_none());
    }
}
