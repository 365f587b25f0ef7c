mod fault;
mod fault_set;
mod noop;
mod spec;
mod state;

pub use fault::{Fault, FaultHandle};
pub use fault_set::{FaultSet, MAX_SCHEDULER_SLEEP_MS};
pub use noop::{NoOpFaultSpec, FAULT_BUNDLE, NOOP_FAULT_KIND};
pub use spec::{FaultHandler, FaultSpec};
pub use state::FaultState;
