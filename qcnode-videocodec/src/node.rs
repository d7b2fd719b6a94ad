//! `VideoCodecNode`: the encoder/decoder `Node` implementation, grounded
//! in `VidcNodeBase`/`VidcDrvClient`. Two roles share this one type
//! (spec §4.G: "Two Node variants share almost all logic: encoder and
//! decoder") — [`CodecRole`] picks the few branches that differ.

use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{bounded, select, Receiver, Sender};
use qcnode_datatree::DataTree;
use qcnode_memory::{Descriptor, FrameDescriptor, Status, VideoFrameFields};
use qcnode_node::{BufferIdMap, ConfigShim, EventCallback, Node, NodeInit, NodeState, State};

use crate::buffer_mode::{AllocatedBy, BufferMode};
use crate::config::{self, CodecConfig, CodecRole};
use crate::driver::{BufSide, CodecSession, CodecType, DriverEvent, FrameSubmission, StartType, VideoDriver};
use crate::in_flight::InFlightMap;

/// Timeouts from spec §4.G.4: "order of ~10 ms for load/start/stop/drain;
/// ~1 ms for general state settle".
const CMD_TIMEOUT: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CmdTag {
    LoadResources,
    ReleaseResources,
    Start,
    Pause,
    Resume,
    Stop,
    Drain,
    LastFlag,
    StopInput,
    StopOutput,
}

#[derive(Default)]
struct WaitInner {
    completed: Vec<CmdTag>,
}

struct WaitBoard {
    inner: Mutex<WaitInner>,
    condvar: Condvar,
}

impl WaitBoard {
    fn new() -> Self {
        Self {
            inner: Mutex::new(WaitInner::default()),
            condvar: Condvar::new(),
        }
    }

    fn signal(&self, tag: CmdTag) {
        let mut inner = self.inner.lock().unwrap();
        inner.completed.push(tag);
        self.condvar.notify_all();
    }

    /// `WaitForCmdCompleted`: blocks until `tag` appears on the board or
    /// `timeout` elapses, consuming the matching entry.
    fn wait_for(&self, tag: CmdTag, timeout: Duration) -> Status {
        let deadline = std::time::Instant::now() + timeout;
        let mut inner = self.inner.lock().unwrap();
        loop {
            if let Some(pos) = inner.completed.iter().position(|t| *t == tag) {
                inner.completed.remove(pos);
                return Status::Ok;
            }
            let now = std::time::Instant::now();
            if now >= deadline {
                return Status::Timeout;
            }
            let (guard, result) = self
                .condvar
                .wait_timeout(inner, deadline - now)
                .unwrap();
            inner = guard;
            if result.timed_out() && !inner.completed.iter().any(|t| *t == tag) {
                return Status::Timeout;
            }
        }
    }
}

/// State shared between the owning thread and the per-Node event
/// dispatcher thread (spec §5: "the state flag is a single scalar written
/// by the callback thread and polled by the submitting thread"). The
/// driver itself lives here too: `OUTPUT_RECONFIG` (spec §4.G.2 step 6,
/// §4.G.2 events) is handled on the dispatcher thread and must be able to
/// re-negotiate and re-enroll output buffers the same way the owning
/// thread does at init, the way `VidcDrvClient::DeviceCallback` issues
/// ioctls directly from the driver's own callback thread.
struct Shared {
    state: NodeState,
    wait_board: WaitBoard,
    input_in_flight: InFlightMap,
    output_in_flight: InFlightMap,
    callback: Mutex<Option<EventCallback>>,
    node_id: Mutex<u32>,
    role: CodecRole,
    output_port: Mutex<u32>,
    driver: Mutex<Box<dyn VideoDriver>>,
    output_mode: Mutex<BufferMode>,
    /// Every descriptor the caller prepared at `Initialize`, keyed by
    /// nothing in particular — input buffers are claimed up front by
    /// `run_init_sequence`; whatever remains is the pool a decoder's
    /// deferred output enrollment draws from on `OUTPUT_RECONFIG` (spec
    /// §4.G.2 step 6: "decoder enrolls output only after the first
    /// output-reconfig event").
    prepared_buffers: Mutex<Vec<Descriptor>>,
}

fn build_frame_submission(descriptor: &Descriptor) -> Option<FrameSubmission> {
    let base = descriptor.base()?;
    let video = match descriptor {
        Descriptor::VideoFrame(_, _, v) => *v,
        _ => VideoFrameFields::default(),
    };
    Some(FrameSubmission {
        client_data: base.dma_handle,
        address: base.virtual_address,
        alloc_len: base.size as u32,
        data_len: base.valid_size as u32,
        timestamp_us: video.timestamp_ns / 1000,
        mark_data: video.app_mark_data,
    })
}

fn patch_output_completion(mut descriptor: Descriptor, completion: &crate::driver::OutputCompletion) -> Descriptor {
    if let Descriptor::VideoFrame(base, _, video) = &mut descriptor {
        base.valid_size = completion.data_len as usize;
        video.timestamp_ns = completion.timestamp_us * 1000;
        video.app_mark_data = completion.mark_data;
        video.frame_flag = completion.flags;
        video.frame_type = completion.frame_type;
    }
    descriptor
}

/// Drains `events` and drives `shared` accordingly until the node shuts
/// the dispatcher down via `stop_rx`. Spawned once per Node instance, the
/// way `VidcDrvClient::DeviceCallback` runs on the driver's own callback
/// thread (spec §5).
fn run_dispatcher(shared: Arc<Shared>, events: Receiver<DriverEvent>, stop_rx: Receiver<()>) {
    loop {
        select! {
            recv(events) -> msg => {
                let Ok(event) = msg else { break };
                dispatch_event(&shared, event);
            }
            recv(stop_rx) -> _ => break,
        }
    }
}

/// `OUTPUT_RECONFIG` (spec §4.G.2: "output-side parameters changed;
/// suspend output submission, reallocate output descriptors under the new
/// requirements, re-enroll, resume"). Dynamic-mode output has no
/// Node-owned descriptors to reallocate, so reconfig just invalidates the
/// in-flight set; static-mode output re-negotiates the buffer count with
/// the driver and draws fresh descriptors from the buffers the caller
/// prepared at `Initialize` but the decoder held back from the init-time
/// enrollment pass (spec §4.G.2 step 6). Submission is implicitly
/// "suspended" until re-enrollment completes: a static-mode handle that
/// isn't enrolled yet is rejected `NOMEM` by `InFlightMap::mark_in_use`,
/// the same path an unenrolled handle always takes.
fn handle_output_reconfig(shared: &Shared) {
    let prior = *shared.output_mode.lock().unwrap();
    let requested = match prior {
        BufferMode::Static { count, .. } => count,
        BufferMode::Dynamic => {
            shared.output_in_flight.clear();
            notify(shared, Status::Ok);
            return;
        }
    };

    let mut driver = shared.driver.lock().unwrap();
    let (count, _size) = match driver.negotiate_buffer_req(BufSide::Output, requested) {
        Ok(r) => r,
        Err(e) => {
            drop(driver);
            tracing::error!(error = %e, "output-reconfig renegotiation failed");
            shared.state.force_error();
            notify(shared, Status::Fail);
            return;
        }
    };

    let bufs: Vec<Descriptor> = {
        let pool = shared.prepared_buffers.lock().unwrap();
        if (pool.len() as u32) < count {
            drop(pool);
            drop(driver);
            tracing::error!(available = pool.len(), needed = count, "not enough prepared buffers for output reconfig");
            shared.state.force_error();
            notify(shared, Status::Fail);
            return;
        }
        pool[pool.len() - count as usize..].to_vec()
    };

    if driver.set_buffer(BufSide::Output, &bufs).is_err() {
        drop(driver);
        shared.state.force_error();
        notify(shared, Status::Fail);
        return;
    }
    drop(driver);

    shared.output_in_flight.set_declared_count(count);
    shared.output_in_flight.enroll_static(&bufs);
    *shared.output_mode.lock().unwrap() = BufferMode::Static {
        count,
        allocated_by: AllocatedBy::App,
    };
    notify(shared, Status::Ok);
}

fn dispatch_event(shared: &Shared, event: DriverEvent) {
    match event {
        DriverEvent::RespLoadResources => {
            let _ = shared.state.transition(State::Initializing, State::Ready);
            shared.wait_board.signal(CmdTag::LoadResources);
        }
        DriverEvent::RespReleaseResources => {
            let _ = shared.state.transition(State::Deinitializing, State::Initial);
            shared.wait_board.signal(CmdTag::ReleaseResources);
        }
        DriverEvent::RespStart => {
            let _ = shared.state.transition(State::Starting, State::Running);
            shared.wait_board.signal(CmdTag::Start);
        }
        DriverEvent::RespStartInputDone | DriverEvent::RespStartOutputDone => {}
        DriverEvent::RespPause => {
            let _ = shared.state.transition(State::Pausing, State::Pause);
            shared.wait_board.signal(CmdTag::Pause);
        }
        DriverEvent::RespResume => {
            let _ = shared.state.transition(State::Resuming, State::Running);
            shared.wait_board.signal(CmdTag::Resume);
        }
        DriverEvent::RespStop => {
            let _ = shared.state.transition(State::Stopping, State::Ready);
            shared.wait_board.signal(CmdTag::Stop);
        }
        DriverEvent::RespDrain => shared.wait_board.signal(CmdTag::Drain),
        DriverEvent::LastFlag => shared.wait_board.signal(CmdTag::LastFlag),
        DriverEvent::StopInputDone => shared.wait_board.signal(CmdTag::StopInput),
        DriverEvent::StopOutputDone => {
            let _ = shared.state.transition(State::Stopping, State::Ready);
            shared.wait_board.signal(CmdTag::StopOutput);
        }
        DriverEvent::OutputReconfig => handle_output_reconfig(shared),
        DriverEvent::FlushInputDone | DriverEvent::FlushOutputDone => {
            notify(shared, Status::Ok);
        }
        DriverEvent::InputDone(completion) => {
            if let Some(descriptor) = shared.input_in_flight.clear_and_take(completion.client_data) {
                let node_id = *shared.node_id.lock().unwrap();
                let mut frame = FrameDescriptor::new(1);
                frame.set_buffer(0, descriptor);
                invoke_callback(shared, &frame, node_id, Status::Ok);
            }
        }
        DriverEvent::OutputDone(completion) => {
            if let Some(descriptor) = shared.output_in_flight.clear_and_take(completion.client_data) {
                let patched = patch_output_completion(descriptor, &completion);
                if patched.base().map(|b| b.virtual_address) != Some(completion.address)
                    && completion.address != 0
                {
                    tracing::error!("output completion address mismatch with submitted buffer");
                    shared.state.force_error();
                    notify(shared, Status::Fail);
                    return;
                }
                let node_id = *shared.node_id.lock().unwrap();
                let port = *shared.output_port.lock().unwrap();
                let mut frame = FrameDescriptor::new(port as usize + 1);
                frame.set_buffer(port as usize, patched);
                invoke_callback(shared, &frame, node_id, Status::Ok);
            }
        }
        DriverEvent::ErrHwFatal | DriverEvent::ErrClientFatal => {
            shared.state.force_error();
            notify(shared, Status::Fail);
        }
    }
}

fn notify(shared: &Shared, status: Status) {
    let node_id = *shared.node_id.lock().unwrap();
    let empty = FrameDescriptor::new(0);
    invoke_callback(shared, &empty, node_id, status);
}

fn invoke_callback(shared: &Shared, frame: &FrameDescriptor, node_id: u32, status: Status) {
    if let Some(cb) = shared.callback.lock().unwrap().as_ref() {
        cb(frame, node_id, status, shared.state.get());
    }
}

pub struct VideoCodecNode {
    shared: Arc<Shared>,
    config_shim: ConfigShim,
    config: Option<CodecConfig>,
    buffer_map: BufferIdMap,
    deregister_all_buffers_when_stop: bool,
    input_mode: BufferMode,
    dispatcher: Option<JoinHandle<()>>,
    dispatcher_stop: Option<Sender<()>>,
}

impl VideoCodecNode {
    pub fn new(role: CodecRole, driver: Box<dyn VideoDriver>) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: NodeState::new(),
                wait_board: WaitBoard::new(),
                input_in_flight: InFlightMap::new(0),
                output_in_flight: InFlightMap::new(0),
                callback: Mutex::new(None),
                node_id: Mutex::new(0),
                role,
                output_port: Mutex::new(1),
                driver: Mutex::new(driver),
                output_mode: Mutex::new(BufferMode::Dynamic),
                prepared_buffers: Mutex::new(Vec::new()),
            }),
            config_shim: ConfigShim::new(),
            config: None,
            buffer_map: BufferIdMap::from_pairs([("input".to_owned(), 0), ("output".to_owned(), 1)]),
            deregister_all_buffers_when_stop: false,
            input_mode: BufferMode::Dynamic,
            dispatcher: None,
            dispatcher_stop: None,
        }
    }

    /// Test/demo hook forwarding to the underlying driver's own
    /// `inject_output_reconfig`, for exercising `OUTPUT_RECONFIG` handling
    /// end to end without a real driver.
    pub fn inject_driver_output_reconfig(&self) {
        self.shared.driver.lock().unwrap().inject_output_reconfig();
    }

    fn default_buffer_map() -> BufferIdMap {
        BufferIdMap::from_pairs([("input".to_owned(), 0), ("output".to_owned(), 1)])
    }

    fn codec_type(cfg: &CodecConfig) -> CodecType {
        match cfg.codec_type() {
            Some(crate::config::CompressedFormat::H264) => CodecType::H264,
            _ => CodecType::Hevc,
        }
    }

    fn negotiate_side(&self, side: BufSide, requested: u32, dynamic: bool) -> Result<(BufferMode, u32), Status> {
        let mut driver = self.shared.driver.lock().unwrap();
        let (count, _size) = driver
            .negotiate_buffer_req(side, if dynamic { 0 } else { requested })
            .map_err(|e| {
                tracing::error!(error = %e, "buffer requirement negotiation failed");
                Status::Fail
            })?;

        if dynamic {
            return Ok((BufferMode::Dynamic, count));
        }

        if requested < count {
            tracing::error!(requested, needed = count, "insufficient caller-provided buffers");
            return Err(Status::BadArguments);
        }
        // caller has >= driver's count: write caller's count back and
        // require exact equality on re-query (spec §4.G.2 step 5).
        let (final_count, _) = driver.negotiate_buffer_req(side, requested).map_err(|_| Status::Fail)?;
        if final_count != requested {
            return Err(Status::BadArguments);
        }
        Ok((
            BufferMode::Static {
                count: final_count,
                allocated_by: AllocatedBy::App,
            },
            final_count,
        ))
    }

    fn run_init_sequence(&mut self, cfg: &CodecConfig, prepared: &[Descriptor]) -> Status {
        {
            let mut driver = self.shared.driver.lock().unwrap();
            if driver.open().is_err() {
                return Status::Fail;
            }

            let session = match cfg.role {
                CodecRole::Encoder => CodecSession::Encode,
                CodecRole::Decoder => CodecSession::Decode,
            };
            if driver.set_session(session, Self::codec_type(cfg)).is_err() {
                return Status::Fail;
            }

            for side in [BufSide::Input, BufSide::Output] {
                if driver.set_frame_rate(side, cfg.frame_rate).is_err() {
                    return Status::Fail;
                }
                if driver.set_frame_size(side, cfg.width, cfg.height).is_err() {
                    return Status::Fail;
                }
            }

            if driver.set_dynamic_mode(BufSide::Input, cfg.input_dynamic_mode).is_err()
                || driver.set_dynamic_mode(BufSide::Output, cfg.output_dynamic_mode).is_err()
            {
                return Status::Fail;
            }
        }

        let (input_mode, input_count) =
            match self.negotiate_side(BufSide::Input, cfg.num_input_buffer_req, cfg.input_dynamic_mode) {
                Ok(m) => m,
                Err(s) => return s,
            };
        let (output_mode, output_count) =
            match self.negotiate_side(BufSide::Output, cfg.num_output_buffer_req, cfg.output_dynamic_mode) {
                Ok(m) => m,
                Err(s) => return s,
            };
        self.input_mode = input_mode;
        *self.shared.output_mode.lock().unwrap() = output_mode;
        self.shared.input_in_flight.set_declared_count(input_count);
        self.shared.output_in_flight.set_declared_count(output_count);

        // step 6: enroll + SET_BUFFER for static sides. Decoder enrolls
        // output only after the first OUTPUT_RECONFIG (spec §4.G.2); this
        // Node accepts prepared input buffers up front for both roles and
        // prepared output buffers up front only for the encoder, holding
        // the rest of `prepared` back in `shared.prepared_buffers` for the
        // decoder's deferred output enrollment.
        let mut driver = self.shared.driver.lock().unwrap();
        if let BufferMode::Static { count, .. } = input_mode {
            let bufs: Vec<Descriptor> = prepared.iter().take(count as usize).copied().collect();
            if (bufs.len() as u32) < count || driver.set_buffer(BufSide::Input, &bufs).is_err() {
                return Status::NoMem;
            }
            self.shared.input_in_flight.enroll_static(&bufs);
        }
        if cfg.role == CodecRole::Encoder {
            if let BufferMode::Static { count, .. } = output_mode {
                let bufs: Vec<Descriptor> = prepared.iter().skip(prepared.len().saturating_sub(count as usize)).copied().collect();
                if (bufs.len() as u32) < count || driver.set_buffer(BufSide::Output, &bufs).is_err() {
                    return Status::NoMem;
                }
                self.shared.output_in_flight.enroll_static(&bufs);
            }
        }

        if driver.load_resources().is_err() {
            return Status::Fail;
        }
        drop(driver);
        self.shared.wait_board.wait_for(CmdTag::LoadResources, CMD_TIMEOUT)
    }
}

impl Node for VideoCodecNode {
    fn initialize(&mut self, init: NodeInit) -> Status {
        if self.shared.state.transition(State::Initial, State::Initializing).is_err() {
            return Status::BadState;
        }

        let role = self.shared.role;
        let mut errors = Vec::new();
        let mut parsed: Option<CodecConfig> = None;
        let status = self.config_shim.verify_and_set(
            &init.config_text,
            &mut errors,
            |tree: &DataTree, errs| {
                let cfg = config::parse_static(role, tree, errs)?;
                parsed = Some(cfg.clone());
                Ok(cfg.common.clone())
            },
            |_, _| Ok(()),
        );
        if !status.is_ok() {
            for e in &errors {
                tracing::error!(error = %e, "video codec config rejected");
            }
            self.shared.state.force_error();
            return status;
        }
        let cfg = match parsed {
            Some(cfg) => cfg,
            None => {
                self.shared.state.force_error();
                return Status::BadArguments;
            }
        };

        *self.shared.node_id.lock().unwrap() = cfg.common.id;
        *self.shared.callback.lock().unwrap() = init.callback;
        self.buffer_map = cfg
            .common
            .global_buffer_id_map
            .clone()
            .unwrap_or_else(Self::default_buffer_map);
        self.deregister_all_buffers_when_stop = cfg.common.deregister_all_buffers_when_stop;
        *self.shared.output_port.lock().unwrap() = 1;

        let prepared = init
            .prepared_buffers
            .as_ref()
            .map(|p| p.buffers.clone())
            .unwrap_or_default();
        *self.shared.prepared_buffers.lock().unwrap() = prepared.clone();

        let (events_rx, stop_rx, stop_tx) = {
            let (stop_tx, stop_rx) = bounded(1);
            (self.shared.driver.lock().unwrap().events(), stop_rx, stop_tx)
        };
        let shared = Arc::clone(&self.shared);
        self.dispatcher = Some(
            std::thread::Builder::new()
                .name(format!("vidc-node-{}", cfg.common.name))
                .spawn(move || run_dispatcher(shared, events_rx, stop_rx))
                .expect("failed to spawn video codec event dispatcher"),
        );
        self.dispatcher_stop = Some(stop_tx);

        let init_status = self.run_init_sequence(&cfg, &prepared);
        if !init_status.is_ok() {
            self.shared.state.force_error();
            return init_status;
        }

        self.config = Some(cfg);
        Status::Ok
    }

    fn start(&mut self) -> Status {
        if self.shared.state.transition(State::Ready, State::Starting).is_err() {
            return Status::BadState;
        }
        let start_type = match self.shared.role {
            CodecRole::Encoder => StartType::All,
            CodecRole::Decoder => StartType::Input,
        };
        if self.shared.driver.lock().unwrap().start(start_type).is_err() {
            self.shared.state.force_error();
            return Status::Fail;
        }
        self.shared.wait_board.wait_for(CmdTag::Start, CMD_TIMEOUT)
    }

    fn process_frame_descriptor(&mut self, frame: &mut FrameDescriptor) -> Status {
        if self.shared.state.get() != State::Running {
            return Status::BadState;
        }
        let Some(input_id) = self.buffer_map.get("input") else {
            return Status::BadArguments;
        };
        let Some(output_id) = self.buffer_map.get("output") else {
            return Status::BadArguments;
        };

        let input = *frame.get_buffer(input_id as usize);
        if let Some(base) = input.base() {
            let handle = base.dma_handle;
            let status = self.shared.input_in_flight.mark_in_use(handle, input, self.input_mode);
            if !status.is_ok() {
                return status;
            }
            let Some(submission) = build_frame_submission(&input) else {
                self.shared.input_in_flight.revert(handle);
                return Status::BadArguments;
            };
            if self.shared.driver.lock().unwrap().empty_input_buffer(submission).is_err() {
                self.shared.input_in_flight.revert(handle);
                return Status::Fail;
            }
        }

        let output = *frame.get_buffer(output_id as usize);
        if let Some(base) = output.base() {
            let handle = base.dma_handle;
            let output_mode = *self.shared.output_mode.lock().unwrap();
            let status = self.shared.output_in_flight.mark_in_use(handle, output, output_mode);
            if !status.is_ok() {
                return status;
            }
            let Some(submission) = build_frame_submission(&output) else {
                self.shared.output_in_flight.revert(handle);
                return Status::BadArguments;
            };
            if self.shared.driver.lock().unwrap().fill_output_buffer(submission).is_err() {
                self.shared.output_in_flight.revert(handle);
                return Status::Fail;
            }
        }

        Status::Ok
    }

    fn stop(&mut self) -> Status {
        if self.shared.state.transition(State::Running, State::Stopping).is_err() {
            return Status::BadState;
        }

        if self.deregister_all_buffers_when_stop {
            self.buffer_map = BufferIdMap::new();
        }

        match self.shared.role {
            CodecRole::Encoder => {
                if self.shared.driver.lock().unwrap().stop(None).is_err() {
                    self.shared.state.force_error();
                    return Status::Fail;
                }
                self.shared.wait_board.wait_for(CmdTag::Stop, CMD_TIMEOUT)
            }
            CodecRole::Decoder => {
                if self.shared.driver.lock().unwrap().drain().is_err() {
                    self.shared.state.force_error();
                    return Status::Fail;
                }
                if !self.shared.wait_board.wait_for(CmdTag::Drain, CMD_TIMEOUT).is_ok() {
                    self.shared.state.force_error();
                    return Status::Fail;
                }
                if !self.shared.wait_board.wait_for(CmdTag::LastFlag, CMD_TIMEOUT).is_ok() {
                    self.shared.state.force_error();
                    return Status::Fail;
                }
                if self.shared.driver.lock().unwrap().stop(Some(BufSide::Input)).is_err() {
                    self.shared.state.force_error();
                    return Status::Fail;
                }
                if !self.shared.wait_board.wait_for(CmdTag::StopInput, CMD_TIMEOUT).is_ok() {
                    self.shared.state.force_error();
                    return Status::Fail;
                }
                if self.shared.driver.lock().unwrap().stop(Some(BufSide::Output)).is_err() {
                    self.shared.state.force_error();
                    return Status::Fail;
                }
                self.shared.wait_board.wait_for(CmdTag::StopOutput, CMD_TIMEOUT)
            }
        }
    }

    fn deinitialize(&mut self) -> Status {
        if self
            .shared
            .state
            .transition(State::Ready, State::Deinitializing)
            .is_err()
        {
            return Status::BadState;
        }

        if self.shared.driver.lock().unwrap().release_resources().is_err() {
            self.shared.state.force_error();
            return Status::Fail;
        }
        let status = self.shared.wait_board.wait_for(CmdTag::ReleaseResources, CMD_TIMEOUT);
        if !status.is_ok() {
            self.shared.state.force_error();
            return status;
        }

        let output_mode = *self.shared.output_mode.lock().unwrap();
        {
            let mut driver = self.shared.driver.lock().unwrap();
            if let BufferMode::Static { .. } = self.input_mode {
                let _ = driver.free_buffers(BufSide::Input);
            }
            if let BufferMode::Static { .. } = output_mode {
                let _ = driver.free_buffers(BufSide::Output);
            }
            driver.close();
        }

        if let Some(stop_tx) = self.dispatcher_stop.take() {
            let _ = stop_tx.send(());
        }
        if let Some(handle) = self.dispatcher.take() {
            let _ = handle.join();
        }

        *self.shared.callback.lock().unwrap() = None;
        *self.shared.output_mode.lock().unwrap() = BufferMode::Dynamic;
        self.shared.prepared_buffers.lock().unwrap().clear();
        self.config = None;
        Status::Ok
    }

    fn get_state(&self) -> State {
        self.shared.state.get()
    }

    fn apply_dynamic_config(&mut self, config_text: &str) -> Status {
        // This Node takes no runtime-adjustable fields yet; a `dynamic`
        // section is accepted but has no effect beyond being logged.
        let mut errors = Vec::new();
        self.config_shim.verify_and_set(
            config_text,
            &mut errors,
            qcnode_node::ConfigShim::read_common_static,
            |_, _| Ok(()),
        )
    }
}

impl Drop for VideoCodecNode {
    fn drop(&mut self) {
        if let Some(stop_tx) = self.dispatcher_stop.take() {
            let _ = stop_tx.send(());
        }
        if let Some(handle) = self.dispatcher.take() {
            let _ = handle.join();
        }
    }
}
