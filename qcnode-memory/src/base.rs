//! Shared scalar types and the base buffer fields every descriptor variant
//! carries, grounded in `QCBufferPropBase`/`QCBufferDescriptorBase` and
//! `BufferDescriptor.hpp`.

pub const MAX_IMAGE_PLANES: usize = 4;
pub const MAX_TENSOR_DIMS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryAllocator {
    Dma,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationCache {
    Cacheable,
    NonCacheable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferUsage {
    Camera,
    VideoCodec,
    Tensor,
    Generic,
}

/// Requested properties for a to-be-allocated buffer. Mirrors
/// `BufferProps`/`QCBufferPropBase`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferProps {
    pub size: usize,
    pub alignment: usize,
    pub usage: BufferUsage,
    pub cache: AllocationCache,
    pub allocator_type: MemoryAllocator,
}

impl Default for BufferProps {
    fn default() -> Self {
        Self {
            size: 0,
            alignment: 0,
            usage: BufferUsage::Generic,
            cache: AllocationCache::Cacheable,
            allocator_type: MemoryAllocator::Dma,
        }
    }
}

impl BufferProps {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            ..Default::default()
        }
    }
}

/// Fields every descriptor variant carries regardless of kind, mirroring
/// `QCBufferDescriptorBase`/`BufferDescriptor`.
///
/// `virtual_address`/`dma_handle` describe one large backing DMA
/// allocation; `offset`/`valid_size` describe the portion of it this
/// descriptor actually refers to. The invariant `valid_size + offset <=
/// size` is checked by [`BaseFields::data_ptr`]'s callers, not enforced by
/// this struct's constructors (the source doesn't enforce it either — it's
/// a documented caller contract).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaseFields {
    pub name: &'static str,
    /// Base virtual address of the whole DMA allocation (`pBufBase`).
    pub virtual_address_base: usize,
    /// Virtual address of this descriptor's view (`pBuf`).
    pub virtual_address: usize,
    /// Size of the whole DMA allocation.
    pub dma_size: usize,
    /// Size of this descriptor's own buffer region.
    pub size: usize,
    pub alignment: usize,
    pub cache: AllocationCache,
    pub allocator_type: MemoryAllocator,
    /// Opaque platform DMA handle (fd, PMEM handle, ...), shared by every
    /// view derived from the same allocation.
    pub dma_handle: u64,
    pub pid: u32,
    pub usage: BufferUsage,
    pub valid_size: usize,
    pub offset: usize,
    /// Unique ID assigned by the [`crate::BufferManager`].
    pub id: u64,
}

impl Default for BaseFields {
    fn default() -> Self {
        Self {
            name: "",
            virtual_address_base: 0,
            virtual_address: 0,
            dma_size: 0,
            size: 0,
            alignment: 0,
            cache: AllocationCache::Cacheable,
            allocator_type: MemoryAllocator::Dma,
            dma_handle: 0,
            pid: 0,
            usage: BufferUsage::Generic,
            valid_size: 0,
            offset: 0,
            id: 0,
        }
    }
}

impl BaseFields {
    /// Pointer to the start of valid data (`GetDataPtr`): `pBuf + offset`.
    pub fn data_ptr(&self) -> usize {
        self.virtual_address + self.offset
    }

    /// Size of valid data (`GetDataSize`): `validSize`.
    pub fn data_size(&self) -> usize {
        self.valid_size
    }
}
