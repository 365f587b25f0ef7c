use std::sync::Arc;

use crate::{
    config::RawConfig,
    errors::PlatformError,
    log::init_logging,
    platform::Platform,
    registry::{Bundle, FaultRegistry, PlatformRegistration},
    topology::Topology,
};

/// The registration bundle holding the basic platform factory.
pub static BASIC_PLATFORM_BUNDLE: Bundle = Bundle {
    name: "basic_platform",
    kinds: &[],
    platforms: &[PlatformRegistration {
        name: "basic_platform",
        build: build_platform,
    }],
};

/// Build the basic platform: install the log sink, then validate the node
/// topology. Nodes are assumed reachable by hostname.
fn build_platform(
    config: &RawConfig,
    registry: Arc<FaultRegistry>,
) -> Result<Platform, PlatformError> {
    init_logging(config.log_path())?;
    let topology = Topology::from_config(config)?;
    Ok(Platform::new("basic_platform", topology, registry))
}
