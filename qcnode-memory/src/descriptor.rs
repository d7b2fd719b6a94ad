//! The buffer descriptor family: a closed sum type replacing the source's
//! `dynamic_cast`-based hierarchy (`BufferDescriptor` -> `TensorDescriptor`
//! / `ImageDescriptor` -> `CameraFrameDescriptor` / `VideoFrameDescriptor`).
//!
//! Every variant carries [`BaseFields`] plus its own extra fields. The
//! conversions below (`image_to_tensor`, `image_to_tensor_yuv`,
//! `sub_batch_view`) are pure: they never reallocate and always share the
//! source's `dma_handle`/`virtual_address`, matching the source's
//! `ImageToTensor`/`GetImageDesc` contract.

use crate::base::{BaseFields, MAX_IMAGE_PLANES, MAX_TENSOR_DIMS};
use crate::status::Status;
use qcnode_datatree::{ImageFormat, TensorType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TensorFields {
    pub tensor_type: TensorType,
    pub dims: [u32; MAX_TENSOR_DIMS],
    pub num_dims: u32,
}

impl Default for TensorFields {
    fn default() -> Self {
        Self {
            tensor_type: TensorType::Max,
            dims: [0; MAX_TENSOR_DIMS],
            num_dims: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageFields {
    pub format: ImageFormat,
    pub batch_size: u32,
    pub width: u32,
    pub height: u32,
    pub stride: [u32; MAX_IMAGE_PLANES],
    pub actual_height: [u32; MAX_IMAGE_PLANES],
    pub plane_buf_size: [u32; MAX_IMAGE_PLANES],
    pub num_planes: u32,
}

impl Default for ImageFields {
    fn default() -> Self {
        Self {
            format: ImageFormat::Max,
            batch_size: 1,
            width: 0,
            height: 0,
            stride: [0; MAX_IMAGE_PLANES],
            actual_height: [0; MAX_IMAGE_PLANES],
            plane_buf_size: [0; MAX_IMAGE_PLANES],
            num_planes: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraFrameFields {
    pub timestamp: u64,
    pub timestamp_gptp: u64,
    pub frame_idx: u32,
    pub flags: u32,
    pub stream_id: u32,
}

impl Default for CameraFrameFields {
    fn default() -> Self {
        Self {
            timestamp: 0,
            timestamp_gptp: 0,
            frame_idx: 0,
            flags: 0,
            stream_id: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameType {
    NotCoded,
    I,
    P,
    B,
    Idr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoFrameFields {
    pub timestamp_ns: u64,
    pub app_mark_data: u64,
    pub frame_type: FrameType,
    pub frame_flag: u32,
}

impl Default for VideoFrameFields {
    fn default() -> Self {
        Self {
            timestamp_ns: 0,
            app_mark_data: 0,
            frame_type: FrameType::NotCoded,
            frame_flag: 0,
        }
    }
}

fn bytes_per_pixel(format: ImageFormat) -> u32 {
    match format {
        ImageFormat::Rgb | ImageFormat::Bgr => 3,
        ImageFormat::Uyvy => 2,
        ImageFormat::Nv12 | ImageFormat::Nv12Ubwc => 1,
        ImageFormat::P010 | ImageFormat::Tp10Ubwc => 2,
        ImageFormat::H264 | ImageFormat::H265 | ImageFormat::Max => 1,
    }
}

/// Runtime type tag recovering the `QCBufferType_e`/RTTI check the source
/// uses before a `dynamic_cast`. Every [`Descriptor`] variant carries a tag
/// implied by its discriminant; [`Descriptor::kind`] exposes it directly so
/// callers never need to match on the enum just to ask "what is this".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorKind {
    Dummy,
    Raw,
    Tensor,
    Image,
    CameraFrame,
    VideoFrame,
}

/// The buffer descriptor family. `Dummy` replaces the source's mutable
/// global `s_dummy`/`QCDummyBufferDescriptor`: it is an ordinary variant,
/// constructed fresh wherever a slot is empty, never a shared mutable
/// singleton (see DESIGN.md, Open Question 4).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Descriptor {
    Dummy,
    Raw(BaseFields),
    Tensor(BaseFields, TensorFields),
    Image(BaseFields, ImageFields),
    CameraFrame(BaseFields, ImageFields, CameraFrameFields),
    VideoFrame(BaseFields, ImageFields, VideoFrameFields),
}

impl Default for Descriptor {
    fn default() -> Self {
        Descriptor::Dummy
    }
}

impl Descriptor {
    pub fn kind(&self) -> DescriptorKind {
        match self {
            Descriptor::Dummy => DescriptorKind::Dummy,
            Descriptor::Raw(_) => DescriptorKind::Raw,
            Descriptor::Tensor(..) => DescriptorKind::Tensor,
            Descriptor::Image(..) => DescriptorKind::Image,
            Descriptor::CameraFrame(..) => DescriptorKind::CameraFrame,
            Descriptor::VideoFrame(..) => DescriptorKind::VideoFrame,
        }
    }

    pub fn base(&self) -> Option<&BaseFields> {
        match self {
            Descriptor::Dummy => None,
            Descriptor::Raw(b)
            | Descriptor::Tensor(b, _)
            | Descriptor::Image(b, _)
            | Descriptor::CameraFrame(b, _, _)
            | Descriptor::VideoFrame(b, _, _) => Some(b),
        }
    }

    pub fn image_fields(&self) -> Option<&ImageFields> {
        match self {
            Descriptor::Image(_, img)
            | Descriptor::CameraFrame(_, img, _)
            | Descriptor::VideoFrame(_, img, _) => Some(img),
            _ => None,
        }
    }

    /// `ImageToTensor(TensorDescriptor_t&)`: requires exactly one plane and
    /// no row padding (`stride[0] == width * bytes_per_pixel(format)`).
    /// Produces a `[batchSize, height, width, bytesPerPixel]` tensor.
    pub fn image_to_tensor(&self) -> Result<Descriptor, Status> {
        let (base, img) = match self {
            Descriptor::Image(b, i) => (b, i),
            _ => return Err(Status::BadArguments),
        };
        if img.num_planes != 1 {
            return Err(Status::Unsupported);
        }
        let bpp = bytes_per_pixel(img.format);
        if img.stride[0] != img.width * bpp {
            return Err(Status::Unsupported);
        }
        let tensor = TensorFields {
            tensor_type: TensorType::UFixedPoint8,
            dims: {
                let mut d = [0u32; MAX_TENSOR_DIMS];
                d[0] = img.batch_size;
                d[1] = img.height;
                d[2] = img.width;
                d[3] = bpp;
                d
            },
            num_dims: 4,
        };
        Ok(Descriptor::Tensor(*base, tensor))
    }

    /// `ImageToTensor(luma, chroma)`: NV12/P010-shaped 2-plane image to a
    /// luma tensor `[1,H,W,1]` + chroma tensor `[1,H/2,W/2,2]` sharing the
    /// same underlying allocation. Requires even `width`/`height` and
    /// `batchSize == 1` (sub-sampled chroma conversion invariant, spec §3).
    pub fn image_to_tensor_yuv(&self) -> Result<(Descriptor, Descriptor), Status> {
        let (base, img) = match self {
            Descriptor::Image(b, i) => (b, i),
            _ => return Err(Status::BadArguments),
        };
        if img.num_planes != 2 {
            return Err(Status::Unsupported);
        }
        if img.batch_size != 1 || img.width % 2 != 0 || img.height % 2 != 0 {
            return Err(Status::Unsupported);
        }
        let chroma_type = match img.format {
            ImageFormat::P010 | ImageFormat::Tp10Ubwc => TensorType::UFixedPoint16,
            _ => TensorType::UFixedPoint8,
        };
        let luma_fields = TensorFields {
            tensor_type: TensorType::UFixedPoint8,
            dims: {
                let mut d = [0u32; MAX_TENSOR_DIMS];
                d[0] = 1;
                d[1] = img.height;
                d[2] = img.width;
                d[3] = 1;
                d
            },
            num_dims: 4,
        };
        let mut chroma_base = *base;
        chroma_base.offset += img.plane_buf_size[0] as usize;
        let chroma_fields = TensorFields {
            tensor_type: chroma_type,
            dims: {
                let mut d = [0u32; MAX_TENSOR_DIMS];
                d[0] = 1;
                d[1] = img.height / 2;
                d[2] = img.width / 2;
                d[3] = 2;
                d
            },
            num_dims: 4,
        };
        Ok((
            Descriptor::Tensor(*base, luma_fields),
            Descriptor::Tensor(chroma_base, chroma_fields),
        ))
    }

    /// `GetImageDesc(batchOffset, batchSize)`: a view over a sub-range of
    /// the batch dimension, sharing `dma_handle`/`virtual_address` with
    /// `self` and offsetting into the backing allocation by whole batch
    /// strides. `singleImageSize = totalSize/batchSize` (exact division),
    /// not the sum of plane sizes, since `size` may include alignment
    /// padding beyond the planes (source: `ImageDescriptor.cpp`'s
    /// `singleImageSize = this->size / this->batchSize`).
    pub fn sub_batch_view(&self, batch_offset: u32, batch_size: u32) -> Result<Descriptor, Status> {
        let (base, img) = match self {
            Descriptor::Image(b, i) => (b, i),
            _ => return Err(Status::BadArguments),
        };
        if batch_size == 0 || batch_offset + batch_size > img.batch_size {
            return Err(Status::OutOfBound);
        }
        if img.batch_size == 0 || base.size % img.batch_size as usize != 0 {
            return Err(Status::BadArguments);
        }
        let per_batch_size = (base.size / img.batch_size as usize) as u32;
        let mut new_base = *base;
        new_base.offset += (per_batch_size * batch_offset) as usize;
        new_base.valid_size = (per_batch_size * batch_size) as usize;
        let new_img = ImageFields {
            batch_size,
            ..*img
        };
        Ok(Descriptor::Image(new_base, new_img))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_image(num_planes: u32, plane_size: u32, batch_size: u32) -> Descriptor {
        let base = BaseFields {
            virtual_address: 0x1000,
            dma_handle: 42,
            size: (plane_size * num_planes * batch_size) as usize,
            valid_size: (plane_size * num_planes * batch_size) as usize,
            ..Default::default()
        };
        let img = ImageFields {
            format: ImageFormat::Nv12,
            batch_size,
            width: 64,
            height: 64,
            num_planes,
            stride: {
                let mut s = [0u32; MAX_IMAGE_PLANES];
                s[0] = 64;
                s
            },
            plane_buf_size: {
                let mut p = [0u32; MAX_IMAGE_PLANES];
                for slot in p.iter_mut().take(num_planes as usize) {
                    *slot = plane_size;
                }
                p
            },
            ..Default::default()
        };
        Descriptor::Image(base, img)
    }

    #[test]
    fn image_to_tensor_requires_single_plane() {
        let img = sample_image(2, 4096, 1);
        assert_eq!(img.image_to_tensor(), Err(Status::Unsupported));
    }

    #[test]
    fn image_to_tensor_shares_dma_handle() {
        let img = sample_image(1, 4096, 1);
        let tensor = img.image_to_tensor().unwrap();
        assert_eq!(tensor.base().unwrap().dma_handle, img.base().unwrap().dma_handle);
        assert_eq!(
            tensor.base().unwrap().virtual_address,
            img.base().unwrap().virtual_address
        );
    }

    #[test]
    fn yuv_split_offsets_chroma_past_luma_plane() {
        let img = sample_image(2, 4096, 1);
        let (luma, chroma) = img.image_to_tensor_yuv().unwrap();
        assert_eq!(luma.base().unwrap().offset, 0);
        assert_eq!(chroma.base().unwrap().offset, 4096);
        assert_eq!(chroma.base().unwrap().dma_handle, 42);
    }

    #[test]
    fn sub_batch_view_rejects_out_of_range() {
        let img = sample_image(1, 4096, 4);
        assert_eq!(img.sub_batch_view(3, 2), Err(Status::OutOfBound));
        assert!(img.sub_batch_view(3, 1).is_ok());
    }

    #[test]
    fn sub_batch_view_offsets_by_whole_batches() {
        let img = sample_image(1, 4096, 4);
        let view = img.sub_batch_view(2, 1).unwrap();
        assert_eq!(view.base().unwrap().offset, 2 * 4096);
        assert_eq!(view.base().unwrap().valid_size, 4096);
    }
}
