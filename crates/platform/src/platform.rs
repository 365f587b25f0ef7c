use std::{path::Path, sync::Arc};

use serde_json::Value;

use crate::{
    config::RawConfig,
    errors::PlatformError,
    fault::{Fault, FaultHandle, FaultSpec},
    registry::FaultRegistry,
    topology::Topology,
};

/// The platform a daemon is running on: the node directory plus the fault
/// kind registry. Built once at startup; read-only afterwards.
#[derive(Debug)]
pub struct Platform {
    name: String,
    pub topology: Topology,
    pub registry: Arc<FaultRegistry>,
}

impl Platform {
    pub fn new(
        name: impl Into<String>,
        topology: Topology,
        registry: Arc<FaultRegistry>,
    ) -> Self {
        Self {
            name: name.into(),
            topology,
            registry,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Build a typed fault spec from its wire representation.
    pub fn create_fault_spec(&self, value: Value) -> Result<Arc<dyn FaultSpec>, PlatformError> {
        self.registry.build_spec(value)
    }

    /// Build a fault object from a name and a wire spec. This does not
    /// activate the fault.
    pub fn create_fault(&self, name: &str, spec: Value) -> Result<FaultHandle, PlatformError> {
        Fault::new(name, self.create_fault_spec(spec)?)
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Create a platform from a configuration file.
///
/// The `modules` entry selects the registration bundles, and the `platform`
/// entry selects which registered platform factory builds the handle.
pub fn create_platform(config_path: impl AsRef<Path>) -> Result<Platform, PlatformError> {
    let config = RawConfig::load(config_path)?;
    let registry = Arc::new(FaultRegistry::with_modules(&config.module_names())?);
    let name = config.platform_name();
    let registration = registry
        .find_platform(name)
        .ok_or_else(|| PlatformError::Resolution {
            symbol: name.to_owned(),
            bundles: registry.bundle_names(),
        })?;
    (registration.build)(&config, registry.clone())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use serde_json::json;

    use super::*;

    fn write_config(contents: &Value) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.to_string().as_bytes()).unwrap();
        file
    }

    #[test]
    fn create_platform_should_build_the_basic_platform() {
        let file = write_config(&json!({
            "log": { "path": "/dev/stdout" },
            "nodes": {
                "node01": { "hostname": "node01", "trogdor_agent_port": 8888 }
            }
        }));
        let platform = create_platform(file.path()).unwrap();
        assert_eq!(platform.name(), "basic_platform");
        assert_eq!(platform.topology.node_names(), vec!["node01"]);
    }

    #[test]
    fn create_platform_should_fail_on_an_unknown_platform_name() {
        let file = write_config(&json!({
            "platform": "quantum_platform",
            "nodes": { "node01": { "hostname": "node01" } }
        }));
        let err = create_platform(file.path()).unwrap_err();
        assert!(err.to_string().contains("quantum_platform"));
        assert!(err.to_string().contains("fault, basic_platform"));
    }

    #[test]
    fn create_fault_should_reject_unknown_kinds() {
        let file = write_config(&json!({
            "nodes": { "node01": { "hostname": "node01" } }
        }));
        let platform = create_platform(file.path()).unwrap();
        let err = platform
            .create_fault(
                "f1",
                json!({ "kind": "MysteryFault", "start_ms": 0, "duration_ms": 0 }),
            )
            .unwrap_err();
        assert!(matches!(err, PlatformError::Resolution { .. }));

        let fault = platform
            .create_fault(
                "f1",
                json!({ "kind": "NoOpFault", "start_ms": 0, "duration_ms": 0 }),
            )
            .unwrap();
        assert_eq!(fault.name(), "f1");
    }
}
