//! Per-engine backend buffer registration service (spec §4.F).

mod egl_gbm;
mod kind;
mod registrar;
mod service;

pub use egl_gbm::EglGbmRegistrar;
pub use kind::{BackendHandle, BackendKind, Direction};
pub use registrar::BackendRegistrar;
pub use service::RegistrationService;
