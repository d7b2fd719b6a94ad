//! The platform DMA allocator boundary. Real platform allocators (PMEM on
//! QNX, dma-buf on Linux) are out of scope for this crate (spec Non-goal);
//! `DmaAllocator` is the trait the rest of this crate consumes, and
//! [`SimulatedDmaAllocator`] is the in-process stand-in used by tests and
//! the `qcnode` demo binary.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// A raw platform allocation: a virtual address plus an opaque DMA handle
/// describing the same memory region to hardware engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawAllocation {
    pub virtual_address: usize,
    pub dma_handle: u64,
    pub size: usize,
}

pub trait DmaAllocator: Send + Sync {
    /// Allocates `size` bytes aligned to `alignment`. Returns `None` on
    /// allocation failure (mapped to [`crate::Status::NoMem`] by callers).
    fn allocate(&self, size: usize, alignment: usize) -> Option<RawAllocation>;

    /// Frees a previously returned allocation. A double-free or an
    /// allocation this allocator never produced is a caller bug; this
    /// trait doesn't define behavior for it beyond "don't panic across the
    /// FFI boundary" in real implementations. The simulated allocator
    /// below treats it as a no-op.
    fn free(&self, allocation: RawAllocation);
}

/// Heap-backed allocator used by tests and the demo binary. Each
/// allocation is a boxed byte slice; `dma_handle` is a monotonically
/// increasing fake handle, distinct per allocation, so code exercising
/// "same dma_handle" invariants (descriptor conversions sharing a handle)
/// is meaningfully tested without real hardware.
pub struct SimulatedDmaAllocator {
    next_handle: AtomicU64,
    live: Mutex<HashMap<u64, Box<[u8]>>>,
}

impl Default for SimulatedDmaAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedDmaAllocator {
    pub fn new() -> Self {
        Self {
            next_handle: AtomicU64::new(1),
            live: Mutex::new(HashMap::new()),
        }
    }
}

impl DmaAllocator for SimulatedDmaAllocator {
    fn allocate(&self, size: usize, alignment: usize) -> Option<RawAllocation> {
        let aligned_size = if alignment > 1 {
            size.div_ceil(alignment) * alignment
        } else {
            size
        };
        let mut buf = vec![0u8; aligned_size].into_boxed_slice();
        let virtual_address = buf.as_mut_ptr() as usize;
        let handle = self.next_handle.fetch_add(1, Ordering::Relaxed);
        self.live.lock().unwrap().insert(handle, buf);
        Some(RawAllocation {
            virtual_address,
            dma_handle: handle,
            size: aligned_size,
        })
    }

    fn free(&self, allocation: RawAllocation) {
        self.live.lock().unwrap().remove(&allocation.dma_handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocations_get_distinct_handles() {
        let alloc = SimulatedDmaAllocator::new();
        let a = alloc.allocate(4096, 4096).unwrap();
        let b = alloc.allocate(4096, 4096).unwrap();
        assert_ne!(a.dma_handle, b.dma_handle);
    }

    #[test]
    fn free_then_allocate_does_not_reuse_handle() {
        let alloc = SimulatedDmaAllocator::new();
        let a = alloc.allocate(64, 0).unwrap();
        alloc.free(a);
        let b = alloc.allocate(64, 0).unwrap();
        assert_ne!(a.dma_handle, b.dma_handle);
    }
}
