use std::fmt;

use serde_json::Value;

use crate::errors::PlatformError;

/// The immutable description of a fault: the kind discriminator, the timing
/// window and any kind-specific payload.
///
/// Concrete spec variants are registered in a
/// [`crate::registry::FaultRegistry`] bundle and constructed from the wire
/// JSON by their registered constructor.
pub trait FaultSpec: fmt::Debug + Send + Sync {
    /// The kind discriminator, e.g. `NoOpFault`.
    fn kind(&self) -> &'static str;

    /// Scheduled start, in ms since the epoch.
    fn start_ms(&self) -> i64;

    /// Scheduled duration in ms.
    fn duration_ms(&self) -> i64;

    /// Designated end, in ms since the epoch.
    fn end_ms(&self) -> i64 {
        self.start_ms().saturating_add(self.duration_ms())
    }

    /// The full wire representation, including the `kind` discriminator.
    fn to_value(&self) -> Value;

    /// Build the runtime hooks for a fault described by this spec.
    fn make_handler(&self, name: &str) -> Result<Box<dyn FaultHandler>, PlatformError>;
}

/// The kind-specific activate/deactivate hooks of a fault.
///
/// Hooks run on the scheduler task, outside any lock; a hook that never
/// returns stalls the scheduler, and any OS resources a hook acquires must
/// be released in `deactivate`.
pub trait FaultHandler: Send {
    fn activate(&mut self) -> anyhow::Result<()>;

    fn deactivate(&mut self) -> anyhow::Result<()>;
}
