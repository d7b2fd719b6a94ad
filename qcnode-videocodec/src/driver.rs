//! `VideoDriver`: the ioctl-style command/event channel boundary to the
//! video IP kernel driver, grounded in `VidcDrvClient`'s ioctl surface
//! (`VIDC_IOCTL_*`) and event list (`VideoCodec_EventType_e`). The real
//! driver stays external per spec.md §6; this trait exists so
//! `qcnode-videocodec`'s node logic can be exercised against
//! [`crate::simulated_driver::SimulatedVideoDriver`] without one.

use crossbeam_channel::Receiver;
use qcnode_memory::Descriptor;
use thiserror::Error;

/// Errors a driver call can fail with, in the same
/// status-code-to-error-enum shape `nvfbc::error` wraps its FFI return
/// codes in.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DriverError {
    #[error("driver is not open")]
    NotOpen,
    #[error("ioctl {0} failed")]
    IoctlFailed(&'static str),
    #[error("buffer requirement negotiation rejected: caller has {given}, driver needs {needed}")]
    InsufficientBuffers { given: u32, needed: u32 },
    #[error("unsupported uncompressed format")]
    UnsupportedFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufSide {
    Input,
    Output,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecSession {
    Encode,
    Decode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecType {
    H264,
    Hevc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartType {
    Output,
    Input,
    All,
}

/// The platform color format tags a descriptor's `ImageFormat` maps to,
/// per spec §4.G.3's translation table (`NV12->NV12`,
/// `NV12_UBWC->NV12_UBWC`, `P010->NV12_P010`; everything else rejects).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VidcColorFormat {
    Nv12,
    Nv12Ubwc,
    Nv12P010,
}

pub fn translate_color_format(format: qcnode_datatree::ImageFormat) -> Result<VidcColorFormat, DriverError> {
    use qcnode_datatree::ImageFormat::*;
    match format {
        Nv12 => Ok(VidcColorFormat::Nv12),
        Nv12Ubwc => Ok(VidcColorFormat::Nv12Ubwc),
        P010 => Ok(VidcColorFormat::Nv12P010),
        _ => Err(DriverError::UnsupportedFormat),
    }
}

/// `frame_clnt_data/frame_addr/alloc_len/data_len/timestamp/mark_data`
/// carried by `EMPTY_INPUT_BUFFER`/`FILL_OUTPUT_BUFFER` (spec §4.G.2).
#[derive(Debug, Clone, Copy)]
pub struct FrameSubmission {
    pub client_data: u64,
    pub address: usize,
    pub alloc_len: u32,
    pub data_len: u32,
    pub timestamp_us: u64,
    pub mark_data: u64,
}

/// Completion fields restored onto a `RESP_OUTPUT_DONE` event (spec
/// §4.G.2: `data_len -> validSize`, `timestamp*1000 -> timestampNs`,
/// `mark_data -> appMarkData`, `flags -> frameFlags`, `frame_type ->
/// frameKind`).
#[derive(Debug, Clone, Copy)]
pub struct OutputCompletion {
    pub client_data: u64,
    pub address: usize,
    pub data_len: u32,
    pub timestamp_us: u64,
    pub mark_data: u64,
    pub flags: u32,
    pub frame_type: qcnode_memory::FrameType,
}

#[derive(Debug, Clone, Copy)]
pub struct InputCompletion {
    pub client_data: u64,
    pub timestamp_us: u64,
    pub mark_data: u64,
}

/// Every event `VideoCodec_EventType_e` lists, carried on the driver's
/// callback thread (spec §4.G.2/§5).
#[derive(Debug, Clone, Copy)]
pub enum DriverEvent {
    RespLoadResources,
    RespReleaseResources,
    RespStart,
    RespStartInputDone,
    RespStartOutputDone,
    RespPause,
    RespResume,
    RespStop,
    RespDrain,
    LastFlag,
    StopInputDone,
    StopOutputDone,
    FlushInputDone,
    FlushOutputDone,
    OutputReconfig,
    InputDone(InputCompletion),
    OutputDone(OutputCompletion),
    ErrHwFatal,
    ErrClientFatal,
}

/// The driver boundary. Methods that map to a "Synchronous" ioctl in
/// `VidcDrvClient.hpp` return their result directly; methods whose
/// completion arrives later on the callback thread (`LoadResources`,
/// `ReleaseResources`, `StartDriver`, `Stop*`, `Drain`,
/// `EmptyBuffer`/`FillBuffer`) return only whether the ioctl was
/// *submitted* successfully — the caller awaits the matching
/// [`DriverEvent`] via [`VideoDriver::events`] (spec §4.G.4).
pub trait VideoDriver: Send {
    fn open(&mut self) -> Result<(), DriverError>;
    fn close(&mut self);

    fn set_session(&mut self, session: CodecSession, codec: CodecType) -> Result<(), DriverError>;
    fn set_frame_rate(&mut self, side: BufSide, fps: u32) -> Result<(), DriverError>;
    fn set_frame_size(&mut self, side: BufSide, width: u32, height: u32) -> Result<(), DriverError>;
    fn set_dynamic_mode(&mut self, side: BufSide, dynamic: bool) -> Result<(), DriverError>;

    /// `NegotiateBufferReq`: `requested` is the caller's (static-mode)
    /// buffer count, `0` in dynamic mode. Returns the driver's
    /// authoritative `(count, size)`.
    fn negotiate_buffer_req(&mut self, side: BufSide, requested: u32) -> Result<(u32, u32), DriverError>;

    fn set_buffer(&mut self, side: BufSide, buffers: &[Descriptor]) -> Result<(), DriverError>;
    fn free_buffers(&mut self, side: BufSide) -> Result<(), DriverError>;

    fn load_resources(&mut self) -> Result<(), DriverError>;
    fn release_resources(&mut self) -> Result<(), DriverError>;
    fn start(&mut self, start_type: StartType) -> Result<(), DriverError>;
    /// `None` is the encoder's single combined stop; `Some(side)` is one
    /// leg of the decoder's two-phase stop.
    fn stop(&mut self, side: Option<BufSide>) -> Result<(), DriverError>;
    fn drain(&mut self) -> Result<(), DriverError>;

    fn empty_input_buffer(&mut self, frame: FrameSubmission) -> Result<(), DriverError>;
    fn fill_output_buffer(&mut self, frame: FrameSubmission) -> Result<(), DriverError>;

    /// A cloneable receiving end of the event stream; cheap per
    /// `crossbeam_channel`'s MPMC semantics.
    fn events(&self) -> Receiver<DriverEvent>;

    /// Test/demo hook: synthesizes an `OUTPUT_RECONFIG` event as if the
    /// driver had just detected a mid-stream parameter change. A no-op on
    /// drivers with no simulated equivalent.
    fn inject_output_reconfig(&self) {}
}
