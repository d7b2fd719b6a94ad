//! Cross-module scenario: a running decoder's `Stop` must observe
//! `RESP_DRAIN`, `LAST_FLAG`, `RESP_STOP_INPUT_DONE`,
//! `RESP_STOP_OUTPUT_DONE` in that order and land back in `Ready` (spec's
//! "decoder stop sequence" scenario).

use std::sync::{Arc, Mutex};
use std::time::Duration;

use qcnode_memory::{BaseFields, Descriptor, FrameDescriptor};
use qcnode_node::{Node, NodeInit, State};
use qcnode_videocodec::{CodecRole, SimulatedVideoDriver, VideoCodecNode};

const DYNAMIC_DECODER_CONFIG: &str = "\
[static]\n\
name = \"dec0\"\n\
id = 1\n\
width = 1920\n\
height = 1080\n\
frameRate = 30\n\
inputDynamicMode = true\n\
outputDynamicMode = true\n\
inFormat = \"h264\"\n\
outFormat = \"nv12\"\n";

#[test]
fn decoder_stop_reaches_ready_through_the_drain_flush_sequence() {
    let mut node = VideoCodecNode::new(CodecRole::Decoder, Box::new(SimulatedVideoDriver::new()));

    let status = node.initialize(NodeInit::new(DYNAMIC_DECODER_CONFIG));
    assert!(status.is_ok(), "initialize failed: {status}");
    assert_eq!(node.get_state(), State::Ready);

    let status = node.start();
    assert!(status.is_ok(), "start failed: {status}");
    assert_eq!(node.get_state(), State::Running);

    let status = node.stop();
    assert!(status.is_ok(), "stop failed: {status}");
    assert_eq!(node.get_state(), State::Ready);

    let status = node.deinitialize();
    assert!(status.is_ok());
    assert_eq!(node.get_state(), State::Initial);
}

#[test]
fn callback_receives_the_completed_input_buffer() {
    let completions: Arc<Mutex<Vec<u32>>> = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::clone(&completions);

    let mut node = VideoCodecNode::new(CodecRole::Decoder, Box::new(SimulatedVideoDriver::new()));
    let init = NodeInit::new(DYNAMIC_DECODER_CONFIG).with_callback(Box::new(move |_frame, node_id, status, _state| {
        if status.is_ok() {
            recorder.lock().unwrap().push(node_id);
        }
    }));

    assert!(node.initialize(init).is_ok());
    assert!(node.start().is_ok());

    let mut frame = FrameDescriptor::new(2);
    frame.set_buffer(
        0,
        Descriptor::Raw(BaseFields {
            virtual_address: 0x2000,
            dma_handle: 42,
            size: 4096,
            valid_size: 4096,
            ..Default::default()
        }),
    );
    assert!(node.process_frame_descriptor(&mut frame).is_ok());

    // The simulated driver's completion travels through its own worker
    // thread and the node's dispatcher thread before reaching the
    // callback; give both a moment to settle.
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(*completions.lock().unwrap(), vec![1]);

    assert!(node.stop().is_ok());
    assert!(node.deinitialize().is_ok());
}
