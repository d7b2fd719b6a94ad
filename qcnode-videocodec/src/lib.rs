//! Video codec Node core: the shared encoder/decoder state machine that
//! sits over the video IP driver boundary (spec §4.G).

mod buffer_mode;
mod config;
mod driver;
mod in_flight;
mod node;
mod simulated_driver;

pub use buffer_mode::{AllocatedBy, BufferMode};
pub use config::{
    parse_static, CodecConfig, CodecProfile, CodecRole, CompressedFormat, EncoderFields, FormatTag,
    RateControlMode,
};
pub use driver::{
    BufSide, CodecSession, CodecType, DriverError, DriverEvent, FrameSubmission, InputCompletion,
    OutputCompletion, StartType, VidcColorFormat, VideoDriver, translate_color_format,
};
pub use in_flight::InFlightMap;
pub use node::VideoCodecNode;
pub use simulated_driver::SimulatedVideoDriver;
