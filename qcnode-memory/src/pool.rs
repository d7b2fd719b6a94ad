//! `FrameDescriptorPool`: a fixed-size, thread-safe FIFO pool of
//! [`FrameDescriptor`] values, grounded in `NodeFrameDescriptorPool`.
//!
//! The source's `Get()` is mutex-protected but `Put()` is not (spec §9,
//! Open Question 3) — a real bug, since two threads returning descriptors
//! concurrently can race on the backing `std::queue`. This implementation
//! uses a bounded `crossbeam_channel`, whose `send`/`recv` are internally
//! synchronized on both ends, so there is no unprotected path at all.

use crossbeam_channel::{Receiver, Sender, TryRecvError};

use crate::frame_descriptor::FrameDescriptor;
use crate::status::Status;

pub struct PoolGetResult {
    pub status: Status,
    pub descriptor: FrameDescriptor,
}

/// Preallocates `num_frame_desc` descriptors, each with `num_buffers`
/// slots, and never grows beyond that — `Get` on an empty pool
/// back-pressures the caller with [`Status::OutOfBound`] rather than
/// allocating on demand (spec §4.D: "a bounded resource").
pub struct FrameDescriptorPool {
    sender: Sender<FrameDescriptor>,
    receiver: Receiver<FrameDescriptor>,
    num_buffers: usize,
}

impl FrameDescriptorPool {
    pub fn new(num_frame_desc: usize, num_buffers: usize) -> Self {
        let (sender, receiver) = crossbeam_channel::bounded(num_frame_desc);
        for _ in 0..num_frame_desc {
            sender
                .send(FrameDescriptor::new(num_buffers))
                .expect("channel sized to num_frame_desc, cannot be full during construction");
        }
        Self {
            sender,
            receiver,
            num_buffers,
        }
    }

    /// `Get()`: pops a descriptor and clears it. Returns
    /// `Status::OutOfBound` with a fresh, empty descriptor of this pool's
    /// arity when the pool has nothing to hand out (never blocks, never
    /// allocates beyond the pool's original capacity).
    pub fn get(&self) -> PoolGetResult {
        match self.receiver.try_recv() {
            Ok(mut descriptor) => {
                descriptor.clear();
                PoolGetResult {
                    status: Status::Ok,
                    descriptor,
                }
            }
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => PoolGetResult {
                status: Status::OutOfBound,
                descriptor: FrameDescriptor::new(self.num_buffers),
            },
        }
    }

    /// `Put(frameDesc)`: returns a descriptor to the pool. If the pool is
    /// somehow already at capacity (a caller returning a descriptor that
    /// didn't come from this pool), the descriptor is dropped rather than
    /// panicking or overflowing capacity.
    pub fn put(&self, descriptor: FrameDescriptor) {
        let _ = self.sender.try_send(descriptor);
    }

    pub fn capacity(&self) -> usize {
        self.sender.capacity().unwrap_or(0)
    }

    pub fn available(&self) -> usize {
        self.receiver.len()
    }
}
