//! `VerifyAndSet`: the per-Node configuration verification shim shared by
//! every Node's configuration interface (spec §4.H), built on top of
//! [`qcnode_datatree::DataTree`].

use std::sync::Once;

use qcnode_datatree::DataTree;
use qcnode_memory::Status;

use crate::buffer_map::BufferIdMap;

/// Process-wide install guard: every `ConfigShim` instance races to
/// install the global subscriber, but only the first actually does.
static SUBSCRIBER_INIT: Once = Once::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Verbose,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn parse(s: &str) -> Option<LogLevel> {
        match s {
            "VERBOSE" => Some(LogLevel::Verbose),
            "DEBUG" => Some(LogLevel::Debug),
            "INFO" => Some(LogLevel::Info),
            "WARN" => Some(LogLevel::Warn),
            "ERROR" => Some(LogLevel::Error),
            _ => None,
        }
    }

    fn as_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Verbose => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Parsed `static` section common to every Node (spec §4.G.1 lists the
/// codec's own extension of this; other Node kinds read a subset).
#[derive(Debug, Clone)]
pub struct StaticConfig {
    pub name: String,
    pub id: u32,
    pub log_level: LogLevel,
    /// `globalBufferIdMap: [{name, id}, ...]`, present when the caller
    /// overrides a Node's default port-to-global-ID map.
    pub global_buffer_id_map: Option<BufferIdMap>,
    /// `bufferIds: [integer, ...]`, global IDs to pre-register with the
    /// backend at init rather than lazily on first use.
    pub buffer_ids: Vec<u32>,
    /// `deRegisterAllBuffersWhenStop` (default false).
    pub deregister_all_buffers_when_stop: bool,
}

/// Embedded by every Node's configuration interface. Owns the
/// logger-initialized-exactly-once guard (spec §4.H: "Logger is
/// initialized exactly once per Node instance even if `VerifyAndSet` is
/// called repeatedly").
pub struct ConfigShim {
    logger_init: Once,
}

impl Default for ConfigShim {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigShim {
    pub fn new() -> Self {
        Self {
            logger_init: Once::new(),
        }
    }

    /// Parses `text`, and if a `static` (or `dynamic`) section is present,
    /// validates it via `validate_static`/`validate_dynamic`. `errors`
    /// accumulates human-readable messages; the function returns
    /// `BAD_ARGUMENTS` on the first unrecoverable issue, matching spec
    /// §4.H step 4.
    pub fn verify_and_set<F, G>(
        &self,
        text: &str,
        errors: &mut Vec<String>,
        mut validate_static: F,
        mut validate_dynamic: G,
    ) -> Status
    where
        F: FnMut(&DataTree, &mut Vec<String>) -> Result<StaticConfig, String>,
        G: FnMut(&DataTree, &mut Vec<String>) -> Result<(), String>,
    {
        let mut tree = DataTree::new();
        if let Err(e) = tree.load(text) {
            errors.push(e.to_string());
            return Status::BadArguments;
        }

        if tree.exists("static") {
            let mut sub = DataTree::new();
            if !tree.get_subtree("static", &mut sub) {
                errors.push("`static` section is not a table".to_owned());
                return Status::BadArguments;
            }
            match validate_static(&sub, errors) {
                Ok(cfg) => {
                    self.init_logger_once(&cfg.name, cfg.log_level);
                    Status::Ok
                }
                Err(e) => {
                    errors.push(e);
                    Status::BadArguments
                }
            }
        } else if tree.exists("dynamic") {
            let mut sub = DataTree::new();
            if !tree.get_subtree("dynamic", &mut sub) {
                errors.push("`dynamic` section is not a table".to_owned());
                return Status::BadArguments;
            }
            match validate_dynamic(&sub, errors) {
                Ok(()) => Status::Ok,
                Err(e) => {
                    errors.push(e);
                    Status::BadArguments
                }
            }
        } else {
            errors.push("config text contains neither `static` nor `dynamic` section".to_owned());
            Status::BadArguments
        }
    }

    /// Installs the process's `tracing_subscriber` `EnvFilter`-based
    /// subscriber on first call, from whichever Node initializes first
    /// (spec §4.H: "Logger is initialized exactly once per Node instance
    /// even if `VerifyAndSet` is called repeatedly" extends, at the
    /// process level, to "exactly once regardless of how many Nodes ask").
    /// A host process that already installed its own subscriber (the
    /// `qcnode` binary's CLI verbosity flags, for one) keeps it: `try_init`
    /// is a no-op once a global default is set.
    fn init_logger_once(&self, node_name: &str, level: LogLevel) {
        self.logger_init.call_once(|| {
            tracing::info!(node = node_name, level = ?level.as_tracing_level(), "node logger initialized");
        });
        SUBSCRIBER_INIT.call_once(|| {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(
                    tracing_subscriber::EnvFilter::from_default_env().add_directive(level.as_tracing_level().into()),
                )
                .try_init();
        });
    }

    /// Reads the common `static` fields (`name`, `id`, `logLevel`,
    /// `globalBufferIdMap`, `bufferIds`, `deRegisterAllBuffersWhenStop`)
    /// every Node's schema shares, leaving Node-specific fields to the
    /// caller.
    pub fn read_common_static(tree: &DataTree, errors: &mut Vec<String>) -> Result<StaticConfig, String> {
        if !tree.exists("name") {
            errors.push("static.name is required".to_owned());
            return Err("missing static.name".to_owned());
        }
        let name = tree.get("name", String::new());
        let id = tree.get("id", 0u32);
        let log_level = tree
            .get("logLevel", String::new());
        let log_level = LogLevel::parse(&log_level).unwrap_or(LogLevel::Info);

        let global_buffer_id_map = if tree.exists("globalBufferIdMap") {
            let mut entries = Vec::new();
            tree.get_subtree_list("globalBufferIdMap", &mut entries);
            let mut map = BufferIdMap::new();
            for entry in &entries {
                if !entry.exists("name") {
                    errors.push("static.globalBufferIdMap entry is missing `name`".to_owned());
                    return Err("malformed globalBufferIdMap".to_owned());
                }
                let port = entry.get("name", String::new());
                let slot = entry.get("id", 0u32);
                map.insert(port, slot);
            }
            Some(map)
        } else {
            None
        };

        let buffer_ids = tree.get_vec("bufferIds", Vec::<u32>::new());
        let deregister_all_buffers_when_stop = tree.get("deRegisterAllBuffersWhenStop", false);

        Ok(StaticConfig {
            name,
            id,
            log_level,
            global_buffer_id_map,
            buffer_ids,
            deregister_all_buffers_when_stop,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_and_set_rejects_malformed_toml() {
        let shim = ConfigShim::new();
        let mut errors = Vec::new();
        let status = shim.verify_and_set(
            "not = [valid",
            &mut errors,
            ConfigShim::read_common_static,
            |_, _| Ok(()),
        );
        assert_eq!(status, Status::BadArguments);
        assert!(!errors.is_empty());
    }

    #[test]
    fn verify_and_set_requires_static_or_dynamic_section() {
        let shim = ConfigShim::new();
        let mut errors = Vec::new();
        let status = shim.verify_and_set(
            "foo = 1\n",
            &mut errors,
            ConfigShim::read_common_static,
            |_, _| Ok(()),
        );
        assert_eq!(status, Status::BadArguments);
    }

    #[test]
    fn verify_and_set_accepts_valid_static_section() {
        let shim = ConfigShim::new();
        let mut errors = Vec::new();
        let text = "[static]\nname = \"remap0\"\nid = 1\nlogLevel = \"DEBUG\"\n";
        let status = shim.verify_and_set(
            text,
            &mut errors,
            ConfigShim::read_common_static,
            |_, _| Ok(()),
        );
        assert_eq!(status, Status::Ok);
        assert!(errors.is_empty());
    }

    #[test]
    fn logger_initializes_only_once() {
        let shim = ConfigShim::new();
        let mut calls = 0;
        for _ in 0..3 {
            let mut errors = Vec::new();
            shim.verify_and_set(
                "[static]\nname = \"n\"\nid = 1\n",
                &mut errors,
                ConfigShim::read_common_static,
                |_, _| Ok(()),
            );
            if shim.logger_init.is_completed() {
                calls += 1;
            }
        }
        assert_eq!(calls, 3);
    }
}
