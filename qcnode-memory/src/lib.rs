//! DMA buffer descriptor family, SharedBuffer/BufferManager, and the
//! FrameDescriptor pool — the memory model shared by every Node.

mod allocator;
mod base;
mod descriptor;
mod frame_descriptor;
mod pool;
mod shared_buffer;
mod status;

pub use allocator::{DmaAllocator, RawAllocation, SimulatedDmaAllocator};
pub use base::{AllocationCache, BaseFields, BufferProps, BufferUsage, MemoryAllocator, MAX_IMAGE_PLANES, MAX_TENSOR_DIMS};
pub use descriptor::{CameraFrameFields, Descriptor, DescriptorKind, FrameType, ImageFields, TensorFields};
pub use frame_descriptor::FrameDescriptor;
pub use pool::{FrameDescriptorPool, PoolGetResult};
pub use shared_buffer::{BufferManager, RemoteSharedBuffer, SharedBuffer};
pub use status::{QcResult, Status};
