//! `PassthroughNode`: a minimal CPU Node copying its `"input"` slot to its
//! `"output"` slot. Exists to exercise the Node contract, the init-time
//! buffer map, and the event callback end-to-end without needing real
//! accelerator hardware — the same role `moonshine`'s simplest pipeline
//! stage plays relative to its more elaborate encode path.

use qcnode_datatree::DataTree;
use qcnode_memory::{Descriptor, FrameDescriptor, Status};

use crate::buffer_map::BufferIdMap;
use crate::config_shim::ConfigShim;
use crate::node::{EventCallback, Node, NodeInit};
use crate::state::{NodeState, State};

pub struct PassthroughNode {
    state: NodeState,
    config_shim: ConfigShim,
    node_id: u32,
    buffer_map: BufferIdMap,
    deregister_all_buffers_when_stop: bool,
    callback: Option<EventCallback>,
}

impl Default for PassthroughNode {
    fn default() -> Self {
        Self::new()
    }
}

impl PassthroughNode {
    pub fn new() -> Self {
        Self {
            state: NodeState::new(),
            config_shim: ConfigShim::new(),
            node_id: 0,
            buffer_map: BufferIdMap::default(),
            deregister_all_buffers_when_stop: false,
            callback: None,
        }
    }

    fn default_buffer_map() -> BufferIdMap {
        BufferIdMap::from_pairs([("input".to_owned(), 0), ("output".to_owned(), 1)])
    }
}

impl Node for PassthroughNode {
    fn initialize(&mut self, init: NodeInit) -> Status {
        if self.state.transition(State::Initial, State::Initializing).is_err() {
            return Status::BadState;
        }

        let mut errors = Vec::new();
        let mut parsed: Option<crate::config_shim::StaticConfig> = None;
        let status = self.config_shim.verify_and_set(
            &init.config_text,
            &mut errors,
            |tree: &DataTree, errs| {
                let cfg = ConfigShim::read_common_static(tree, errs)?;
                parsed = Some(cfg.clone());
                Ok(cfg)
            },
            |_, _| Ok(()),
        );
        if !status.is_ok() {
            for e in &errors {
                tracing::error!(error = %e, "passthrough node config rejected");
            }
            self.state.force_error();
            return status;
        }
        let cfg = match parsed {
            Some(cfg) => cfg,
            None => {
                self.state.force_error();
                return Status::BadArguments;
            }
        };

        self.node_id = cfg.id;
        self.buffer_map = cfg.global_buffer_id_map.unwrap_or_else(Self::default_buffer_map);
        self.deregister_all_buffers_when_stop = cfg.deregister_all_buffers_when_stop;
        self.callback = init.callback;

        match self.state.transition(State::Initializing, State::Ready) {
            Ok(()) => Status::Ok,
            Err(s) => s,
        }
    }

    fn start(&mut self) -> Status {
        if self.state.transition(State::Ready, State::Starting).is_err() {
            return Status::BadState;
        }
        match self.state.transition(State::Starting, State::Running) {
            Ok(()) => Status::Ok,
            Err(s) => s,
        }
    }

    fn process_frame_descriptor(&mut self, frame: &mut FrameDescriptor) -> Status {
        if self.state.get() != State::Running {
            return Status::BadState;
        }
        let Some(input_id) = self.buffer_map.get("input") else {
            return Status::BadArguments;
        };
        let Some(output_id) = self.buffer_map.get("output") else {
            return Status::BadArguments;
        };
        let input = frame.get_buffer(input_id as usize).clone();
        if matches!(input, Descriptor::Dummy) {
            return Status::InvalidBuf;
        }
        let status = frame.set_buffer(output_id as usize, input);
        if let Some(cb) = &self.callback {
            cb(frame, self.node_id, status, self.state.get());
        }
        status
    }

    fn stop(&mut self) -> Status {
        if self.state.transition(State::Running, State::Stopping).is_err() {
            return Status::BadState;
        }
        if self.deregister_all_buffers_when_stop {
            self.buffer_map = BufferIdMap::new();
        }
        match self.state.transition(State::Stopping, State::Ready) {
            Ok(()) => Status::Ok,
            Err(s) => s,
        }
    }

    fn deinitialize(&mut self) -> Status {
        if self
            .state
            .transition(State::Ready, State::Deinitializing)
            .is_err()
        {
            return Status::BadState;
        }
        self.callback = None;
        match self.state.transition(State::Deinitializing, State::Initial) {
            Ok(()) => Status::Ok,
            Err(s) => s,
        }
    }

    fn get_state(&self) -> State {
        self.state.get()
    }

    fn apply_dynamic_config(&mut self, config_text: &str) -> Status {
        let mut errors = Vec::new();
        self.config_shim.verify_and_set(
            config_text,
            &mut errors,
            ConfigShim::read_common_static,
            |_, _| Ok(()),
        )
    }
}
