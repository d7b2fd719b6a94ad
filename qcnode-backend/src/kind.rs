//! The engines a descriptor can be registered against (spec §4.F).

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    EvaDsp,
    Htp,
    C2d,
    EglGbm,
    VideoCodec,
}

/// Direction a buffer is registered for, since some engines need to know
/// (e.g. to pick read-only vs read-write mapping flags).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

/// An opaque engine-specific registration result: a DSP remote handle, an
/// EGL image name, a C2D surface id, or a video-codec-IP handle. Kept as
/// a plain `u64` at this layer since the service only needs to cache and
/// return it; the concrete meaning is owned by the `BackendRegistrar`
/// implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendHandle(pub u64);
