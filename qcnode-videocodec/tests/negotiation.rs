//! Cross-module scenario: static-mode buffer negotiation between a
//! `VideoCodecNode` and its driver (spec's "codec buffer negotiation"
//! scenario). `SimulatedVideoDriver` insists on at least 2 buffers per
//! side, so a caller declaring fewer is the "driver needs more than the
//! caller has" case, and a caller declaring at least that many is the
//! "enrolls exactly what was negotiated" case.

use qcnode_memory::{BaseFields, Descriptor};
use qcnode_node::{Node, NodeInit, PreparedBuffers, State};
use qcnode_videocodec::{CodecRole, SimulatedVideoDriver, VideoCodecNode};

fn decoder_config(num_input_buffer_req: u32) -> String {
    format!(
        "[static]\n\
         name = \"dec0\"\n\
         id = 1\n\
         width = 1920\n\
         height = 1080\n\
         frameRate = 30\n\
         inputDynamicMode = false\n\
         outputDynamicMode = true\n\
         numInputBufferReq = {num_input_buffer_req}\n\
         inFormat = \"h264\"\n\
         outFormat = \"nv12\"\n"
    )
}

fn raw_buffer(dma_handle: u64) -> Descriptor {
    Descriptor::Raw(BaseFields {
        virtual_address: dma_handle as usize * 0x1000,
        dma_handle,
        size: 4096,
        valid_size: 4096,
        ..Default::default()
    })
}

#[test]
fn insufficient_static_buffers_reject_with_bad_arguments() {
    let mut node = VideoCodecNode::new(CodecRole::Decoder, Box::new(SimulatedVideoDriver::new()));
    let init = NodeInit::new(decoder_config(1)).with_callback(Box::new(|_, _, _, _| {}));
    let status = node.initialize(init);
    assert!(!status.is_ok());
    assert_eq!(node.get_state(), State::Error);
}

#[test]
fn sufficient_static_buffers_enroll_the_negotiated_count() {
    let mut node = VideoCodecNode::new(CodecRole::Decoder, Box::new(SimulatedVideoDriver::new()));
    let mut init = NodeInit::new(decoder_config(3)).with_callback(Box::new(|_, _, _, _| {}));
    init.prepared_buffers = Some(PreparedBuffers {
        buffers: vec![raw_buffer(1), raw_buffer(2), raw_buffer(3)],
    });

    let status = node.initialize(init);
    assert!(status.is_ok(), "initialize failed: {status}");
    assert_eq!(node.get_state(), State::Ready);

    let status = node.deinitialize();
    assert!(status.is_ok());
    assert_eq!(node.get_state(), State::Initial);
}

#[test]
fn too_few_prepared_buffers_for_the_negotiated_count_fails_with_no_mem() {
    let mut node = VideoCodecNode::new(CodecRole::Decoder, Box::new(SimulatedVideoDriver::new()));
    let mut init = NodeInit::new(decoder_config(3));
    init.prepared_buffers = Some(PreparedBuffers {
        buffers: vec![raw_buffer(1)],
    });

    let status = node.initialize(init);
    assert!(!status.is_ok());
    assert_eq!(node.get_state(), State::Error);
}
