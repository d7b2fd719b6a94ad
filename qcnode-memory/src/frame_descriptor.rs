//! `FrameDescriptor`: a fixed-arity slot table of [`Descriptor`] values,
//! grounded in `NodeFrameDescriptor`/`QCFrameDescriptorNodeIfs`.
//!
//! The source stores `reference_wrapper<QCBufferDescriptorBase_t>` slots
//! all pointing at a mutable global `s_dummy` when empty (spec §9, Open
//! Question 4/5: the global is mutable and `GetBuffer` in one code path
//! can return a reference to a stack temporary). This implementation
//! sidesteps both bugs by storing [`Descriptor`] values directly — empty
//! slots just hold `Descriptor::Dummy`, an ordinary by-value variant, so
//! there is no shared mutable global and no temporary to dangle.

use crate::descriptor::Descriptor;
use crate::status::Status;

/// A fixed-arity slot table of buffer descriptors, used both as the
/// payload of `ProcessFrameDescriptor` and as the unit of work handed out
/// by [`crate::FrameDescriptorPool`].
#[derive(Debug, Clone, PartialEq)]
pub struct FrameDescriptor {
    slots: Vec<Descriptor>,
}

impl FrameDescriptor {
    /// Constructs a descriptor with `arity` slots, all initialized to
    /// `Descriptor::Dummy`.
    pub fn new(arity: usize) -> Self {
        Self {
            slots: vec![Descriptor::Dummy; arity],
        }
    }

    pub fn arity(&self) -> usize {
        self.slots.len()
    }

    /// `GetBuffer(globalBufferId)`: returns a reference to the slot, or to
    /// a fresh `Descriptor::Dummy` if `global_buffer_id` is out of range.
    pub fn get_buffer(&self, global_buffer_id: usize) -> &Descriptor {
        self.slots.get(global_buffer_id).unwrap_or(&Descriptor::Dummy)
    }

    /// `SetBuffer(globalBufferId, buffer)`: bounds-checked; returns
    /// `OUT_OF_BOUND` if `global_buffer_id >= arity()`.
    pub fn set_buffer(&mut self, global_buffer_id: usize, buffer: Descriptor) -> Status {
        match self.slots.get_mut(global_buffer_id) {
            Some(slot) => {
                *slot = buffer;
                Status::Ok
            }
            None => Status::OutOfBound,
        }
    }

    /// `Clear()`: resets every slot to `Dummy`.
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = Descriptor::Dummy;
        }
    }

    /// `operator=` across descriptors of possibly unequal arity: copies up
    /// to `min(self.arity(), other.arity())` slots and leaves any
    /// remaining destination slots untouched. This is documented, pinned
    /// behavior (spec §9 Open Question 2) rather than a defect — callers
    /// that want unequal arity rejected should use [`Self::try_assign_strict`].
    pub fn assign(&mut self, other: &FrameDescriptor) {
        let n = self.slots.len().min(other.slots.len());
        self.slots[..n].copy_from_slice(&other.slots[..n]);
    }

    /// Strict counterpart of [`Self::assign`]: rejects unequal arity
    /// instead of silently truncating.
    pub fn try_assign_strict(&mut self, other: &FrameDescriptor) -> Status {
        if self.arity() != other.arity() {
            return Status::BadArguments;
        }
        self.slots.copy_from_slice(&other.slots);
        Status::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_descriptor_is_all_dummy() {
        let fd = FrameDescriptor::new(3);
        assert_eq!(fd.arity(), 3);
        for i in 0..3 {
            assert_eq!(fd.get_buffer(i), &Descriptor::Dummy);
        }
    }

    #[test]
    fn get_buffer_out_of_range_returns_dummy() {
        let fd = FrameDescriptor::new(2);
        assert_eq!(fd.get_buffer(5), &Descriptor::Dummy);
    }

    #[test]
    fn set_buffer_out_of_range_reports_out_of_bound() {
        let mut fd = FrameDescriptor::new(2);
        assert_eq!(
            fd.set_buffer(5, Descriptor::Raw(Default::default())),
            Status::OutOfBound
        );
    }

    #[test]
    fn assign_truncates_to_min_arity_and_leaves_remainder() {
        let mut src = FrameDescriptor::new(3);
        src.set_buffer(0, Descriptor::Raw(Default::default()));
        src.set_buffer(1, Descriptor::Raw(Default::default()));
        src.set_buffer(2, Descriptor::Raw(Default::default()));

        let mut dst = FrameDescriptor::new(2);
        dst.assign(&src);
        assert_eq!(dst.get_buffer(0).kind(), src.get_buffer(0).kind());
        assert_eq!(dst.get_buffer(1).kind(), src.get_buffer(1).kind());

        let mut bigger_dst = FrameDescriptor::new(4);
        bigger_dst.set_buffer(3, Descriptor::Raw(Default::default()));
        bigger_dst.assign(&src);
        assert_ne!(bigger_dst.get_buffer(3), &Descriptor::Dummy);
    }

    #[test]
    fn try_assign_strict_rejects_unequal_arity() {
        let src = FrameDescriptor::new(3);
        let mut dst = FrameDescriptor::new(2);
        assert_eq!(dst.try_assign_strict(&src), Status::BadArguments);
    }

    #[test]
    fn clear_resets_every_slot_to_dummy() {
        let mut fd = FrameDescriptor::new(2);
        fd.set_buffer(0, Descriptor::Raw(Default::default()));
        fd.clear();
        assert_eq!(fd.get_buffer(0), &Descriptor::Dummy);
    }
}
