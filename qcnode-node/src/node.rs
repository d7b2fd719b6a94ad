//! The `Node` contract (spec §4.E): a uniformly controlled processing
//! element with a typed configuration surface and an asynchronous
//! frame-processing protocol. Object-safe so an outer scheduler (out of
//! scope here) can hold `Box<dyn Node>`.

use qcnode_memory::{FrameDescriptor, Status};

use crate::state::State;

/// `f(frameDesc, nodeId, status, state)`. Invoked from a backend-owned
/// thread or the caller's thread depending on the backend; each Node
/// implementation documents which (spec §4.E).
pub type EventCallback = Box<dyn Fn(&FrameDescriptor, u32, Status, State) + Send + Sync>;

/// Caller-supplied prepared buffers passed at init time, keyed the same
/// way the buffer map keys config-time logical ports.
#[derive(Default)]
pub struct PreparedBuffers {
    pub buffers: Vec<qcnode_memory::Descriptor>,
}

/// `NodeInit = {configText, optional callback, optional buffer refs}`.
pub struct NodeInit {
    pub config_text: String,
    pub callback: Option<EventCallback>,
    pub prepared_buffers: Option<PreparedBuffers>,
}

impl NodeInit {
    pub fn new(config_text: impl Into<String>) -> Self {
        Self {
            config_text: config_text.into(),
            callback: None,
            prepared_buffers: None,
        }
    }

    pub fn with_callback(mut self, callback: EventCallback) -> Self {
        self.callback = Some(callback);
        self
    }
}

/// Every pipeline stage implements this trait. `ProcessFrameDescriptor` is
/// explicitly **not** thread-safe per instance (spec §4.E): callers must
/// serialize submissions to a single Node, though distinct Node instances
/// may run concurrently.
pub trait Node: Send {
    /// `Initialize`: `INITIAL -> INITIALIZING -> READY`.
    fn initialize(&mut self, init: NodeInit) -> Status;

    /// `Start`: `READY -> STARTING -> RUNNING`.
    fn start(&mut self) -> Status;

    /// `ProcessFrameDescriptor`: the descriptor's slot count must match
    /// the init-time buffer map's arity.
    fn process_frame_descriptor(&mut self, frame: &mut FrameDescriptor) -> Status;

    /// `Stop`: `RUNNING -> STOPPING -> READY`.
    fn stop(&mut self) -> Status;

    /// `DeInitialize`: `READY -> DEINITIALIZING -> INITIAL`.
    fn deinitialize(&mut self) -> Status;

    fn get_state(&self) -> State;

    /// Re-verifies/applies a `dynamic` config section at run time (spec
    /// §4.H step 3). Most Nodes accept only a subset of fields here.
    fn apply_dynamic_config(&mut self, config_text: &str) -> Status;
}
