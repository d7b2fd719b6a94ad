//! Cross-module scenario: a decoder with static-mode output buffers never
//! enrolls any output descriptors at init (the decoder side enrolls
//! output only after the first `OUTPUT_RECONFIG` event, spec's "decoder
//! enrolls input at init and output only after the first output-reconfig
//! event"). Submitting an output buffer before that event must fail
//! `NO_MEM`; after `SimulatedVideoDriver::inject_output_reconfig()` fires,
//! the same buffer must be accepted.

use std::time::Duration;

use qcnode_memory::{BaseFields, Descriptor, FrameDescriptor};
use qcnode_node::{Node, NodeInit, PreparedBuffers, State};
use qcnode_videocodec::{CodecRole, SimulatedVideoDriver, VideoCodecNode};

const STATIC_OUTPUT_DECODER_CONFIG: &str = "\
[static]\n\
name = \"dec0\"\n\
id = 1\n\
width = 1920\n\
height = 1080\n\
frameRate = 30\n\
inputDynamicMode = true\n\
outputDynamicMode = false\n\
numOutputBufferReq = 2\n\
inFormat = \"h264\"\n\
outFormat = \"nv12\"\n";

fn output_buffer(dma_handle: u64) -> Descriptor {
    Descriptor::Raw(BaseFields {
        virtual_address: dma_handle as usize * 0x1000,
        dma_handle,
        size: 4096,
        valid_size: 4096,
        ..Default::default()
    })
}

#[test]
fn static_output_decoder_enrolls_output_only_after_reconfig() {
    let mut node = VideoCodecNode::new(CodecRole::Decoder, Box::new(SimulatedVideoDriver::new()));
    let mut init = NodeInit::new(STATIC_OUTPUT_DECODER_CONFIG);
    init.prepared_buffers = Some(PreparedBuffers {
        buffers: vec![output_buffer(10), output_buffer(11)],
    });

    assert!(node.initialize(init).is_ok());
    assert_eq!(node.get_state(), State::Ready);
    assert!(node.start().is_ok());
    assert_eq!(node.get_state(), State::Running);

    let mut frame = FrameDescriptor::new(2);
    frame.set_buffer(1, output_buffer(10));
    assert!(
        !node.process_frame_descriptor(&mut frame).is_ok(),
        "output buffer should be rejected before any output-reconfig event enrolls it"
    );

    node.inject_driver_output_reconfig();
    std::thread::sleep(Duration::from_millis(50));

    let mut frame = FrameDescriptor::new(2);
    frame.set_buffer(1, output_buffer(10));
    assert!(
        node.process_frame_descriptor(&mut frame).is_ok(),
        "output buffer should be accepted once output-reconfig has enrolled it"
    );

    assert!(node.stop().is_ok());
    assert!(node.deinitialize().is_ok());
}
