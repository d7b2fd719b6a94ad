//! `qcnode`: a small demonstration process wiring a software
//! `PassthroughNode` and a simulated video decoder `Node` together.
//!
//! This binary is not part of the core (spec.md §1: "the broker/pub-sub
//! sample harness ... and CLI packaging" are external collaborators); it
//! exists to exercise `Initialize -> Start -> ProcessFrameDescriptor ->
//! Stop -> DeInitialize` against real crate implementations end to end,
//! the same way `moonshine`'s top-level binary wires its RTSP server,
//! session manager and webserver together without itself being part of
//! any of those subsystems.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use qcnode_memory::{
    AllocationCache, BufferManager, BufferUsage, Descriptor, FrameDescriptor, SimulatedDmaAllocator,
};
use qcnode_node::{Node, NodeInit, PassthroughNode};
use qcnode_videocodec::{CodecRole, SimulatedVideoDriver, VideoCodecNode};

/// Runs a short demonstration pipeline: a passthrough Node followed by a
/// simulated H.264 decoder Node.
#[derive(Parser, Debug)]
#[clap(version)]
struct Args {
	/// Path to a TOML demo configuration file. When omitted, built-in
	/// default configuration text is used for both Nodes.
	config: Option<std::path::PathBuf>,

	/// Show more log messages.
	#[clap(long, short)]
	#[clap(action = clap::ArgAction::Count)]
	verbose: u8,

	/// Show less log messages.
	#[clap(long, short)]
	#[clap(action = clap::ArgAction::Count)]
	quiet: u8,
}

const DEFAULT_PASSTHROUGH_CONFIG: &str = "[static]\nname = \"passthrough0\"\nid = 1\nlogLevel = \"INFO\"\n";

const DEFAULT_DECODER_CONFIG: &str = "\
[static]\n\
name = \"decoder0\"\n\
id = 2\n\
logLevel = \"INFO\"\n\
width = 1920\n\
height = 1080\n\
frameRate = 30\n\
inputDynamicMode = true\n\
outputDynamicMode = true\n\
inFormat = \"h264\"\n\
outFormat = \"nv12\"\n";

fn log_level_from_verbosity(verbose: u8, quiet: u8) -> tracing::Level {
	match i16::from(verbose) - i16::from(quiet) {
		..=-2 => tracing::Level::ERROR,
		-1 => tracing::Level::WARN,
		0 => tracing::Level::INFO,
		1 => tracing::Level::DEBUG,
		2.. => tracing::Level::TRACE,
	}
}

fn read_config(path: &Option<std::path::PathBuf>, default: &str) -> Result<String> {
	match path {
		Some(path) => std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display())),
		None => Ok(default.to_owned()),
	}
}

fn main() -> Result<()> {
	let args = Args::parse();

	let log_level = log_level_from_verbosity(args.verbose, args.quiet);
	tracing_subscriber::fmt()
		.with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(log_level.into()))
		.init();

	let buffer_manager = Arc::new(BufferManager::new(Arc::new(SimulatedDmaAllocator::new()), std::process::id()));

	run_passthrough_demo(&buffer_manager, &read_config(&args.config, DEFAULT_PASSTHROUGH_CONFIG)?)?;
	run_decoder_demo(&read_config(&args.config, DEFAULT_DECODER_CONFIG)?)?;

	Ok(())
}

/// Initializes a [`PassthroughNode`], submits one frame carrying a
/// `BufferManager`-allocated buffer, and tears the Node down.
fn run_passthrough_demo(buffer_manager: &Arc<BufferManager>, config_text: &str) -> Result<()> {
	tracing::info!("starting passthrough demo");

	let shared = buffer_manager
		.allocate(1920 * 1080 * 3 / 2, BufferUsage::Camera, AllocationCache::Cacheable)
		.map_err(|status| anyhow::anyhow!("buffer allocation failed: {status}"))?;

	let mut node = PassthroughNode::new();
	let status = node.initialize(NodeInit::new(config_text.to_owned()));
	anyhow::ensure!(status.is_ok(), "passthrough initialize failed: {status}");

	let status = node.start();
	anyhow::ensure!(status.is_ok(), "passthrough start failed: {status}");

	let mut frame = FrameDescriptor::new(2);
	frame.set_buffer(
		0,
		Descriptor::Raw(qcnode_memory::BaseFields {
			virtual_address: shared.virtual_address,
			dma_handle: shared.dma_handle,
			size: shared.total_size,
			valid_size: shared.total_size,
			pid: shared.pid,
			..Default::default()
		}),
	);

	let status = node.process_frame_descriptor(&mut frame);
	anyhow::ensure!(status.is_ok(), "passthrough frame submission failed: {status}");
	tracing::info!(output_kind = ?frame.get_buffer(1).kind(), "passthrough copied input to output");

	let status = node.stop();
	anyhow::ensure!(status.is_ok(), "passthrough stop failed: {status}");
	let status = node.deinitialize();
	anyhow::ensure!(status.is_ok(), "passthrough deinitialize failed: {status}");

	buffer_manager
		.free(&shared)
		.map_err(|status| anyhow::anyhow!("buffer free failed: {status}"))?;

	tracing::info!("passthrough demo complete");
	Ok(())
}

/// Initializes a simulated decoder [`VideoCodecNode`], runs it through
/// `Start -> ProcessFrameDescriptor -> Stop -> DeInitialize`, logging each
/// transition the way a real driver-backed decoder would.
fn run_decoder_demo(config_text: &str) -> Result<()> {
	tracing::info!("starting simulated decoder demo");

	let mut node = VideoCodecNode::new(CodecRole::Decoder, Box::new(SimulatedVideoDriver::new()));

	let status = node.initialize(NodeInit::new(config_text.to_owned()));
	anyhow::ensure!(status.is_ok(), "decoder initialize failed: {status}");

	let status = node.start();
	anyhow::ensure!(status.is_ok(), "decoder start failed: {status}");

	// Give the simulated driver's background thread a moment to settle
	// RESP_START before submitting; a real driver callback would already
	// have fired synchronously with `start()`'s wait.
	std::thread::sleep(Duration::from_millis(20));

	let mut frame = FrameDescriptor::new(2);
	frame.set_buffer(
		0,
		Descriptor::VideoFrame(
			qcnode_memory::BaseFields {
				virtual_address: 0x1000,
				dma_handle: 7,
				size: 4096,
				valid_size: 4096,
				..Default::default()
			},
			qcnode_memory::ImageFields::default(),
			qcnode_memory::VideoFrameFields::default(),
		),
	);
	let status = node.process_frame_descriptor(&mut frame);
	anyhow::ensure!(status.is_ok(), "decoder frame submission failed: {status}");

	std::thread::sleep(Duration::from_millis(20));

	let status = node.stop();
	anyhow::ensure!(status.is_ok(), "decoder stop failed: {status}");
	let status = node.deinitialize();
	anyhow::ensure!(status.is_ok(), "decoder deinitialize failed: {status}");

	tracing::info!("simulated decoder demo complete");
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn verbosity_maps_to_expected_levels() {
		assert_eq!(log_level_from_verbosity(0, 0), tracing::Level::INFO);
		assert_eq!(log_level_from_verbosity(2, 0), tracing::Level::TRACE);
		assert_eq!(log_level_from_verbosity(0, 2), tracing::Level::ERROR);
	}

	#[test]
	fn passthrough_demo_runs_end_to_end() {
		let buffer_manager = Arc::new(BufferManager::new(Arc::new(SimulatedDmaAllocator::new()), std::process::id()));
		assert!(run_passthrough_demo(&buffer_manager, DEFAULT_PASSTHROUGH_CONFIG).is_ok());
	}

	#[test]
	fn decoder_demo_runs_end_to_end() {
		assert!(run_decoder_demo(DEFAULT_DECODER_CONFIG).is_ok());
	}

	#[test]
	fn read_config_prefers_file_over_default() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("passthrough.toml");
		std::fs::write(&path, "[static]\nname = \"from-file\"\nid = 9\n").unwrap();
		let text = read_config(&Some(path), DEFAULT_PASSTHROUGH_CONFIG).unwrap();
		assert!(text.contains("from-file"));
	}

	#[test]
	fn read_config_falls_back_to_default_when_no_path_given() {
		let text = read_config(&None, DEFAULT_PASSTHROUGH_CONFIG).unwrap();
		assert_eq!(text, DEFAULT_PASSTHROUGH_CONFIG);
	}
}
