use std::{collections::BTreeMap, fs, path::Path};

use serde::Deserialize;

use crate::errors::PlatformError;

pub const DEFAULT_PLATFORM: &str = "basic_platform";
pub const DEFAULT_LOG_PATH: &str = "/dev/stdout";
pub const DEFAULT_MODULES: &[&str] = &["fault", "basic_platform"];

/// The daemon configuration file, parsed but not yet validated.
///
/// Validation (required nodes, hostnames, port ranges) happens when the
/// [`crate::topology::Topology`] is built from it.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfig {
    pub platform: Option<String>,
    pub modules: Option<Vec<String>>,
    pub log: Option<LogConfig>,
    pub nodes: Option<BTreeMap<String, RawNode>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    pub path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawNode {
    pub hostname: Option<String>,
    pub trogdor_agent_port: Option<i64>,
    pub trogdor_coordinator_port: Option<i64>,
    pub tags: Option<Vec<String>>,
}

impl RawConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PlatformError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|err| {
            PlatformError::Config(format!("unable to read '{}': {err}", path.display()))
        })?;
        serde_json::from_str(&text).map_err(|err| {
            PlatformError::Config(format!("unable to parse '{}': {err}", path.display()))
        })
    }

    pub fn platform_name(&self) -> &str {
        self.platform.as_deref().unwrap_or(DEFAULT_PLATFORM)
    }

    pub fn log_path(&self) -> &str {
        self.log
            .as_ref()
            .and_then(|log| log.path.as_deref())
            .unwrap_or(DEFAULT_LOG_PATH)
    }

    pub fn module_names(&self) -> Vec<String> {
        match &self.modules {
            Some(modules) => modules.clone(),
            None => DEFAULT_MODULES.iter().map(|name| name.to_string()).collect(),
        }
    }
}
