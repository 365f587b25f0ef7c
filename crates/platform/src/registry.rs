use std::sync::Arc;

use serde_json::{Map, Value};

use crate::{
    basic::BASIC_PLATFORM_BUNDLE,
    config::RawConfig,
    errors::PlatformError,
    fault::{FaultSpec, FAULT_BUNDLE},
    platform::Platform,
};

/// Constructor for a concrete fault spec. Receives the wire payload with the
/// `kind` discriminator already removed.
pub type SpecCtor = fn(Map<String, Value>) -> Result<Arc<dyn FaultSpec>, PlatformError>;

/// Constructor for a platform implementation.
pub type PlatformCtor = fn(&RawConfig, Arc<FaultRegistry>) -> Result<Platform, PlatformError>;

pub struct KindRegistration {
    pub kind: &'static str,
    pub build_spec: SpecCtor,
}

pub struct PlatformRegistration {
    pub name: &'static str,
    pub build: PlatformCtor,
}

/// A statically registered module of fault kinds and platform factories.
///
/// This is the typed replacement for the original's dynamic module walking:
/// the `modules` entry of the configuration file selects which bundles are
/// consulted, in order, and the first bundle exporting a symbol wins.
pub struct Bundle {
    pub name: &'static str,
    pub kinds: &'static [KindRegistration],
    pub platforms: &'static [PlatformRegistration],
}

pub fn builtin_bundles() -> &'static [&'static Bundle] {
    static BUNDLES: [&Bundle; 2] = [&FAULT_BUNDLE, &BASIC_PLATFORM_BUNDLE];
    &BUNDLES
}

/// The ordered list of bundles configured for this process.
pub struct FaultRegistry {
    bundles: Vec<&'static Bundle>,
}

impl FaultRegistry {
    /// Select bundles by name, in configuration order.
    pub fn with_modules(names: &[String]) -> Result<Self, PlatformError> {
        let mut bundles = Vec::with_capacity(names.len());
        for name in names {
            let bundle = builtin_bundles()
                .iter()
                .find(|bundle| bundle.name == name)
                .ok_or_else(|| {
                    PlatformError::Config(format!("unknown module '{name}' in configuration"))
                })?;
            bundles.push(*bundle);
        }
        Ok(Self { bundles })
    }

    pub fn bundle_names(&self) -> String {
        self.bundles
            .iter()
            .map(|bundle| bundle.name)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Build a concrete fault spec from its wire representation, routing on
    /// the `kind` discriminator.
    pub fn build_spec(&self, value: Value) -> Result<Arc<dyn FaultSpec>, PlatformError> {
        let mut payload = match value {
            Value::Object(map) => map,
            other => {
                return Err(PlatformError::Ingest(format!(
                    "fault spec must be a JSON object, got {other}"
                )))
            }
        };
        let kind = match payload.remove("kind") {
            Some(Value::String(kind)) => kind,
            Some(other) => {
                return Err(PlatformError::Ingest(format!(
                    "fault spec 'kind' must be a string, got {other}"
                )))
            }
            None => {
                return Err(PlatformError::Ingest(
                    "the fault specification does not include a 'kind'".to_owned(),
                ))
            }
        };
        for bundle in &self.bundles {
            for registration in bundle.kinds {
                if registration.kind == kind {
                    return (registration.build_spec)(payload);
                }
            }
        }
        Err(PlatformError::Resolution {
            symbol: format!("{kind}Spec"),
            bundles: self.bundle_names(),
        })
    }

    pub(crate) fn find_platform(&self, name: &str) -> Option<&'static PlatformRegistration> {
        self.bundles
            .iter()
            .flat_map(|bundle| bundle.platforms.iter())
            .find(|registration| registration.name == name)
    }
}

impl std::fmt::Debug for FaultRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FaultRegistry")
            .field("bundles", &self.bundle_names())
            .finish()
    }
}
