//! EGL/GBM backend registrar: imports a descriptor's backing DMA-BUF as a
//! Vulkan image with an explicit DRM format modifier, the same import
//! shape as `moonshine`'s `DmaBufImporter::import_nv12` (`pipeline/
//! dmabuf.rs`), generalized from "NV12 specifically" to any image
//! descriptor's plane layout.
//!
//! The GBM/EGL device context itself (`ash::Device`/`ash::Instance`) is a
//! process-wide resource created on first use and destroyed when the last
//! Node releases it (spec §9's "explicit context object ... with an
//! internal refcount for platform-device wrappers" guidance); this crate
//! takes it as a constructor argument rather than owning its lifecycle,
//! so that lifecycle sits with whichever process wiring (the `qcnode`
//! demo binary, or a real host) actually creates the Vulkan device.

use std::os::fd::RawFd;
use std::sync::Mutex;

use ash::vk;
use qcnode_memory::{Descriptor, Status};

use crate::kind::{BackendHandle, Direction};
use crate::registrar::BackendRegistrar;

/// One imported Vulkan image kept alive for as long as its backing
/// address stays registered.
struct ImportedImage {
    image: vk::Image,
    memory: vk::DeviceMemory,
}

pub struct EglGbmRegistrar {
    device: ash::Device,
    #[allow(dead_code)]
    external_memory_fd: ash::khr::external_memory_fd::Device,
    imported: Mutex<std::collections::HashMap<usize, ImportedImage>>,
}

impl EglGbmRegistrar {
    pub fn new(instance: &ash::Instance, device: ash::Device) -> Self {
        let external_memory_fd = ash::khr::external_memory_fd::Device::new(instance, &device);
        Self {
            device,
            external_memory_fd,
            imported: Mutex::new(std::collections::HashMap::new()),
        }
    }

    /// Derives the Vulkan image description deterministically from the
    /// descriptor's `format/width/height/stride/planeBufSize` (spec
    /// §4.F: "engines that require their own descriptor shape ... derive
    /// that shape deterministically from the image descriptor").
    fn import(&self, descriptor: &Descriptor, dma_fd: RawFd) -> Result<ImportedImage, Status> {
        let img = descriptor.image_fields().ok_or(Status::InvalidBuf)?;

        let mut plane_layouts = Vec::with_capacity(img.num_planes as usize);
        let mut offset = 0u64;
        for plane in 0..img.num_planes as usize {
            plane_layouts.push(
                vk::SubresourceLayout::default()
                    .offset(offset)
                    .row_pitch(img.stride[plane] as u64),
            );
            offset += img.plane_buf_size[plane] as u64;
        }

        let format = match img.num_planes {
            1 => vk::Format::R8G8B8A8_UNORM,
            2 => vk::Format::G8_B8R8_2PLANE_420_UNORM,
            _ => return Err(Status::Unsupported),
        };

        let mut drm_format_modifier_info = vk::ImageDrmFormatModifierExplicitCreateInfoEXT::default()
            .drm_format_modifier(0)
            .plane_layouts(&plane_layouts);

        let mut external_memory_info = vk::ExternalMemoryImageCreateInfo::default()
            .handle_types(vk::ExternalMemoryHandleTypeFlags::DMA_BUF_EXT);
        external_memory_info.p_next =
            &mut drm_format_modifier_info as *mut vk::ImageDrmFormatModifierExplicitCreateInfoEXT as *mut _;

        let mut image_create_info = vk::ImageCreateInfo::default()
            .image_type(vk::ImageType::TYPE_2D)
            .format(format)
            .extent(vk::Extent3D {
                width: img.width,
                height: img.height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(1)
            .samples(vk::SampleCountFlags::TYPE_1)
            .tiling(vk::ImageTiling::DRM_FORMAT_MODIFIER_EXT)
            .usage(vk::ImageUsageFlags::TRANSFER_SRC | vk::ImageUsageFlags::SAMPLED)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);
        image_create_info.p_next = &mut external_memory_info as *mut vk::ExternalMemoryImageCreateInfo as *mut _;

        let image = unsafe { self.device.create_image(&image_create_info, None) }
            .map_err(|_| Status::Fail)?;

        let mem_requirements = unsafe { self.device.get_image_memory_requirements(image) };

        let mut import_memory_fd_info = vk::ImportMemoryFdInfoKHR::default()
            .handle_type(vk::ExternalMemoryHandleTypeFlags::DMA_BUF_EXT)
            .fd(dma_fd);

        let mut dedicated_alloc_info = vk::MemoryDedicatedAllocateInfo::default().image(image);
        import_memory_fd_info.p_next =
            &mut dedicated_alloc_info as *mut vk::MemoryDedicatedAllocateInfo as *mut _;

        let mut alloc_info = vk::MemoryAllocateInfo::default()
            .allocation_size(mem_requirements.size)
            .memory_type_index(0);
        alloc_info.p_next = &mut import_memory_fd_info as *mut vk::ImportMemoryFdInfoKHR as *mut _;

        let memory = match unsafe { self.device.allocate_memory(&alloc_info, None) } {
            Ok(m) => m,
            Err(_) => {
                unsafe { self.device.destroy_image(image, None) };
                return Err(Status::NoMem);
            }
        };

        if unsafe { self.device.bind_image_memory(image, memory, 0) }.is_err() {
            unsafe {
                self.device.destroy_image(image, None);
                self.device.free_memory(memory, None);
            }
            return Err(Status::Fail);
        }

        Ok(ImportedImage { image, memory })
    }
}

impl BackendRegistrar for EglGbmRegistrar {
    fn register(&self, descriptor: &Descriptor, _direction: Direction) -> Result<BackendHandle, Status> {
        let base = descriptor.base().ok_or(Status::InvalidBuf)?;
        // `dma_handle` stands in for the DMA-BUF fd on this platform boundary;
        // real hosts keep the two in a 1:1 mapping established at allocation
        // time (see qcnode-memory's allocator boundary).
        let dma_fd = base.dma_handle as RawFd;

        let imported = self.import(descriptor, dma_fd)?;
        let raw = ash::vk::Handle::as_raw(imported.image);
        self.imported.lock().unwrap().insert(base.virtual_address, imported);
        Ok(BackendHandle(raw))
    }

    fn deregister(&self, virtual_address: usize) {
        if let Some(imported) = self.imported.lock().unwrap().remove(&virtual_address) {
            unsafe {
                self.device.destroy_image(imported.image, None);
                self.device.free_memory(imported.memory, None);
            }
        }
    }
}
