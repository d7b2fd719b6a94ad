//! `SharedBuffer` (one DMA allocation plus property side-info) and
//! `BufferManager` (the id-assigning registry). The source keeps
//! `BufferManager` as a process-wide singleton; per spec's own guidance
//! (§9, "Recovering from source-language idioms") this crate makes it an
//! explicit context object instead — callers construct one
//! `BufferManager` and share it (typically via `Arc`) with every Node and
//! backend registrar that needs to resolve a descriptor back to its
//! allocation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::allocator::{DmaAllocator, RawAllocation};
use crate::base::{AllocationCache, BufferUsage, MemoryAllocator};
use crate::status::Status;

/// One DMA allocation owned by the process that created it, or imported
/// from a remote process. Mirrors the source's `SharedBuffer`.
#[derive(Debug, Clone)]
pub struct SharedBuffer {
    pub id: u64,
    pub virtual_address: usize,
    pub dma_handle: u64,
    pub total_size: usize,
    pub pid: u32,
    pub usage: BufferUsage,
    pub cache: AllocationCache,
    pub allocator_type: MemoryAllocator,
    imported: bool,
}

/// A SharedBuffer as exported to another process for `Import`. Carries
/// everything needed to map the same DMA region without re-running the
/// allocator.
#[derive(Debug, Clone, Copy)]
pub struct RemoteSharedBuffer {
    pub dma_handle: u64,
    pub total_size: usize,
    pub usage: BufferUsage,
    pub cache: AllocationCache,
    pub allocator_type: MemoryAllocator,
    pub owner_pid: u32,
}

struct Registered {
    buffer: SharedBuffer,
    allocation: Option<RawAllocation>,
}

/// Registry assigning monotonically increasing buffer IDs and supporting
/// lookup by id or by virtual address (the latter is what backend
/// registration services use to answer "have I already registered this
/// buffer with engine X?", spec §4.F).
pub struct BufferManager {
    allocator: Arc<dyn DmaAllocator>,
    current_pid: u32,
    next_id: AtomicU64,
    by_id: Mutex<HashMap<u64, Registered>>,
    by_address: Mutex<HashMap<usize, u64>>,
}

impl BufferManager {
    pub fn new(allocator: Arc<dyn DmaAllocator>, current_pid: u32) -> Self {
        Self {
            allocator,
            current_pid,
            next_id: AtomicU64::new(1),
            by_id: Mutex::new(HashMap::new()),
            by_address: Mutex::new(HashMap::new()),
        }
    }

    fn register(&self, buffer: SharedBuffer, allocation: Option<RawAllocation>) -> u64 {
        let id = buffer.id;
        self.by_address.lock().unwrap().insert(buffer.virtual_address, id);
        self.by_id.lock().unwrap().insert(id, Registered { buffer, allocation });
        id
    }

    fn deregister(&self, id: u64) -> Option<Registered> {
        let removed = self.by_id.lock().unwrap().remove(&id)?;
        self.by_address.lock().unwrap().remove(&removed.buffer.virtual_address);
        Some(removed)
    }

    /// `Allocate(size, usage, flags)`: performed by the calling process.
    /// On success the returned `SharedBuffer` is already registered.
    pub fn allocate(
        &self,
        size: usize,
        usage: BufferUsage,
        cache: AllocationCache,
    ) -> Result<SharedBuffer, Status> {
        if size == 0 {
            return Err(Status::BadArguments);
        }
        let Some(allocation) = self.allocator.allocate(size, 0) else {
            return Err(Status::NoMem);
        };
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let buffer = SharedBuffer {
            id,
            virtual_address: allocation.virtual_address,
            dma_handle: allocation.dma_handle,
            total_size: allocation.size,
            pid: self.current_pid,
            usage,
            cache,
            allocator_type: MemoryAllocator::Dma,
            imported: false,
        };
        self.register(buffer.clone(), Some(allocation));
        Ok(buffer)
    }

    /// `Free()`: rejected when `pid != current pid`, deregisters before
    /// calling the platform free.
    pub fn free(&self, buffer: &SharedBuffer) -> Result<(), Status> {
        if buffer.imported {
            return Err(Status::BadState);
        }
        if buffer.pid != self.current_pid {
            return Err(Status::InvalidBuf);
        }
        let Some(registered) = self.deregister(buffer.id) else {
            return Err(Status::OutOfBound);
        };
        if let Some(allocation) = registered.allocation {
            self.allocator.free(allocation);
        }
        Ok(())
    }

    /// `Import(remote)`: rejected when `remote.owner_pid == current pid`.
    /// Maps the remote handle into the local address space using the same
    /// allocator abstraction (a real platform import re-maps an existing
    /// fd/handle rather than allocating fresh memory; the simulated
    /// allocator below approximates this by allocating a same-sized local
    /// region, which is sufficient for exercising the registry contract).
    pub fn import(&self, remote: RemoteSharedBuffer) -> Result<SharedBuffer, Status> {
        if remote.owner_pid == self.current_pid {
            return Err(Status::BadArguments);
        }
        let Some(allocation) = self.allocator.allocate(remote.total_size, 0) else {
            return Err(Status::NoMem);
        };
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let buffer = SharedBuffer {
            id,
            virtual_address: allocation.virtual_address,
            dma_handle: remote.dma_handle,
            total_size: remote.total_size,
            pid: remote.owner_pid,
            usage: remote.usage,
            cache: remote.cache,
            allocator_type: remote.allocator_type,
            imported: true,
        };
        self.register(buffer.clone(), Some(allocation));
        Ok(buffer)
    }

    /// `UnImport()`: inverse of `import`, rejected when `pid == current
    /// pid` (i.e. rejected for buffers this process actually owns).
    pub fn unimport(&self, buffer: &SharedBuffer) -> Result<(), Status> {
        if buffer.pid == self.current_pid {
            return Err(Status::BadArguments);
        }
        let Some(registered) = self.deregister(buffer.id) else {
            return Err(Status::OutOfBound);
        };
        if let Some(allocation) = registered.allocation {
            self.allocator.free(allocation);
        }
        Ok(())
    }

    pub fn lookup_by_id(&self, id: u64) -> Option<SharedBuffer> {
        self.by_id.lock().unwrap().get(&id).map(|r| r.buffer.clone())
    }

    pub fn lookup_by_address(&self, virtual_address: usize) -> Option<SharedBuffer> {
        let id = *self.by_address.lock().unwrap().get(&virtual_address)?;
        self.lookup_by_id(id)
    }

    pub fn export(&self, buffer: &SharedBuffer) -> RemoteSharedBuffer {
        RemoteSharedBuffer {
            dma_handle: buffer.dma_handle,
            total_size: buffer.total_size,
            usage: buffer.usage,
            cache: buffer.cache,
            allocator_type: buffer.allocator_type,
            owner_pid: buffer.pid,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::SimulatedDmaAllocator;

    fn manager(pid: u32) -> BufferManager {
        BufferManager::new(Arc::new(SimulatedDmaAllocator::new()), pid)
    }

    #[test]
    fn allocate_assigns_monotonic_ids() {
        let mgr = manager(100);
        let a = mgr.allocate(4096, BufferUsage::Camera, AllocationCache::Cacheable).unwrap();
        let b = mgr.allocate(4096, BufferUsage::Camera, AllocationCache::Cacheable).unwrap();
        assert!(b.id > a.id);
    }

    #[test]
    fn free_rejects_wrong_pid() {
        let mgr = manager(100);
        let mut buf = mgr.allocate(4096, BufferUsage::Camera, AllocationCache::Cacheable).unwrap();
        buf.pid = 999;
        assert_eq!(mgr.free(&buf), Err(Status::InvalidBuf));
    }

    #[test]
    fn ids_are_not_reused_after_free() {
        let mgr = manager(100);
        let a = mgr.allocate(64, BufferUsage::Generic, AllocationCache::Cacheable).unwrap();
        mgr.free(&a).unwrap();
        let b = mgr.allocate(64, BufferUsage::Generic, AllocationCache::Cacheable).unwrap();
        assert!(b.id > a.id);
    }

    #[test]
    fn import_rejects_own_pid() {
        let owner = manager(100);
        let buf = owner.allocate(64, BufferUsage::Generic, AllocationCache::Cacheable).unwrap();
        let remote = owner.export(&buf);
        assert_eq!(owner.import(remote), Err(Status::BadArguments));
    }

    #[test]
    fn import_then_unimport_round_trips() {
        let owner = manager(100);
        let importer = manager(200);
        let buf = owner.allocate(64, BufferUsage::Generic, AllocationCache::Cacheable).unwrap();
        let remote = owner.export(&buf);
        let imported = importer.import(remote).unwrap();
        assert_eq!(imported.pid, 100);
        assert!(importer.lookup_by_id(imported.id).is_some());
        importer.unimport(&imported).unwrap();
        assert!(importer.lookup_by_id(imported.id).is_none());
    }

    #[test]
    fn unimport_rejects_locally_owned_buffer() {
        let mgr = manager(100);
        let buf = mgr.allocate(64, BufferUsage::Generic, AllocationCache::Cacheable).unwrap();
        assert_eq!(mgr.unimport(&buf), Err(Status::BadArguments));
    }

    #[test]
    fn lookup_by_address_resolves_registered_buffer() {
        let mgr = manager(100);
        let buf = mgr.allocate(64, BufferUsage::Generic, AllocationCache::Cacheable).unwrap();
        let found = mgr.lookup_by_address(buf.virtual_address).unwrap();
        assert_eq!(found.id, buf.id);
    }
}
