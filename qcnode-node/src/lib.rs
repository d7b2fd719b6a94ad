//! The Node lifecycle contract, the config-verification shim every Node's
//! configuration interface embeds, and the `PassthroughNode` reference
//! implementation.

mod buffer_map;
mod config_shim;
mod node;
mod passthrough;
mod state;

pub use buffer_map::BufferIdMap;
pub use config_shim::{ConfigShim, LogLevel, StaticConfig};
pub use node::{EventCallback, Node, NodeInit, PreparedBuffers};
pub use passthrough::PassthroughNode;
pub use state::{NodeState, State};
