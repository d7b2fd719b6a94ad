//! The closed result-code enum every public operation in this workspace
//! returns. No exceptions or panics cross a Node/component boundary; a
//! `Status` is returned instead, the same convention the source enforces
//! across its entire public API surface.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    BadArguments,
    BadState,
    InvalidBuf,
    OutOfBound,
    NoMem,
    Timeout,
    Already,
    Unsupported,
    Fail,
}

impl Status {
    pub fn is_ok(self) -> bool {
        matches!(self, Status::Ok)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Ok => "OK",
            Status::BadArguments => "BAD_ARGUMENTS",
            Status::BadState => "BAD_STATE",
            Status::InvalidBuf => "INVALID_BUF",
            Status::OutOfBound => "OUT_OF_BOUND",
            Status::NoMem => "NOMEM",
            Status::Timeout => "TIMEOUT",
            Status::Already => "ALREADY",
            Status::Unsupported => "UNSUPPORTED",
            Status::Fail => "FAIL",
        };
        f.write_str(s)
    }
}

/// Result alias used throughout the workspace for operations whose
/// failure mode is fully captured by [`Status`].
pub type QcResult<T> = Result<T, Status>;
