use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::info;

use crate::{
    errors::PlatformError,
    fault::{FaultHandler, FaultSpec, FaultState},
    wire::{FaultRecord, FaultStatus},
};

/// One scheduled disruption: a named spec plus its lifecycle state and the
/// kind-specific hooks built from the spec.
///
/// Both FaultSet orderings share the same fault through a [`FaultHandle`];
/// state transitions are driven exclusively by the owning scheduler task.
pub struct Fault {
    name: String,
    spec: Arc<dyn FaultSpec>,
    state: Mutex<FaultState>,
    handler: Mutex<Box<dyn FaultHandler>>,
}

pub type FaultHandle = Arc<Fault>;

impl Fault {
    pub fn new(name: impl Into<String>, spec: Arc<dyn FaultSpec>) -> Result<FaultHandle, PlatformError> {
        let name = name.into();
        let handler = spec.make_handler(&name)?;
        Ok(Arc::new(Self {
            name,
            spec,
            state: Mutex::new(FaultState::Pending),
            handler: Mutex::new(handler),
        }))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn spec(&self) -> &Arc<dyn FaultSpec> {
        &self.spec
    }

    pub fn start_ms(&self) -> i64 {
        self.spec.start_ms()
    }

    pub fn end_ms(&self) -> i64 {
        self.spec.end_ms()
    }

    pub fn state(&self) -> FaultState {
        *self.lock_state()
    }

    pub fn is_pending(&self) -> bool {
        self.state() == FaultState::Pending
    }

    pub fn is_active(&self) -> bool {
        self.state() == FaultState::Active
    }

    pub fn is_finished(&self) -> bool {
        self.state() == FaultState::Finished
    }

    /// Activate the fault.
    ///
    /// Only legal while pending. When the activate hook fails the fault goes
    /// straight to finished, without ever being observable as active.
    pub fn start(&self) -> Result<(), PlatformError> {
        {
            let state = self.lock_state();
            if *state != FaultState::Pending {
                return Err(PlatformError::State {
                    action: "start",
                    fault: self.name.clone(),
                    state: *state,
                });
            }
        }
        info!("starting fault '{}'", self.name);
        match self.lock_handler().activate() {
            Ok(()) => {
                *self.lock_state() = FaultState::Active;
                Ok(())
            }
            Err(err) => {
                *self.lock_state() = FaultState::Finished;
                Err(PlatformError::Hook(err))
            }
        }
    }

    /// Deactivate the fault. Only legal while active.
    pub fn end(&self) -> Result<(), PlatformError> {
        {
            let state = self.lock_state();
            if *state != FaultState::Active {
                return Err(PlatformError::State {
                    action: "end",
                    fault: self.name.clone(),
                    state: *state,
                });
            }
        }
        info!("ending fault '{}'", self.name);
        *self.lock_state() = FaultState::Finished;
        self.lock_handler()
            .deactivate()
            .map_err(PlatformError::Hook)
    }

    /// Mark the fault finished without running any hook. Used by the
    /// coordinator once a fault has been handed off to every target node.
    pub fn finish(&self) {
        *self.lock_state() = FaultState::Finished;
    }

    pub fn to_record(&self) -> FaultRecord {
        FaultRecord {
            name: self.name.clone(),
            spec: self.spec.to_value(),
            status: FaultStatus {
                state: self.state(),
            },
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, FaultState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_handler(&self) -> MutexGuard<'_, Box<dyn FaultHandler>> {
        self.handler.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Fault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fault")
            .field("name", &self.name)
            .field("spec", &self.spec)
            .field("state", &self.state())
            .finish()
    }
}
