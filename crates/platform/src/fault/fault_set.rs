use crate::fault::FaultHandle;

/// Upper bound on how long a scheduler sleeps when no fault bounds the
/// horizon: six minutes.
pub const MAX_SCHEDULER_SLEEP_MS: i64 = 360_000;

/// The set of faults owned by one daemon, held in two parallel orderings:
/// ascending by start time and ascending by end time.
///
/// Cardinalities are small (typically tens of faults), so insertion simply
/// appends and re-sorts. The sort is stable, so ties keep insertion order.
#[derive(Debug, Default)]
pub struct FaultSet {
    by_start: Vec<FaultHandle>,
    by_end: Vec<FaultHandle>,
}

impl FaultSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.by_start.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_start.is_empty()
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.by_start.iter().any(|fault| fault.name() == name)
    }

    pub fn insert(&mut self, fault: FaultHandle) {
        self.by_start.push(fault.clone());
        self.by_end.push(fault);
        self.by_start.sort_by_key(|fault| fault.start_ms());
        self.by_end.sort_by_key(|fault| fault.end_ms());
    }

    /// The faults in start-time order.
    pub fn by_start_time(&self) -> impl Iterator<Item = &FaultHandle> {
        self.by_start.iter()
    }

    /// The faults in end-time order.
    pub fn by_end_time(&self) -> impl Iterator<Item = &FaultHandle> {
        self.by_end.iter()
    }

    pub fn first_to_start(&self) -> Option<&FaultHandle> {
        self.by_start.first()
    }

    pub fn first_to_end(&self) -> Option<&FaultHandle> {
        self.by_end.first()
    }

    /// Collect the pending faults whose start time has arrived.
    ///
    /// Walks the start-time ordering up to the first fault scheduled after
    /// `now`; that fault's start time becomes the next wake-up, bounded by
    /// [`MAX_SCHEDULER_SLEEP_MS`] when nothing is scheduled.
    pub fn due_to_start(&self, now: i64) -> (Vec<FaultHandle>, i64) {
        let mut next_wakeup = now + MAX_SCHEDULER_SLEEP_MS;
        let mut due = Vec::new();
        for fault in &self.by_start {
            if fault.start_ms() > now {
                next_wakeup = fault.start_ms();
                break;
            }
            if fault.is_pending() {
                due.push(fault.clone());
            }
        }
        (due, next_wakeup)
    }

    /// Collect the active faults whose end time has arrived; symmetric to
    /// [`Self::due_to_start`] over the end-time ordering.
    pub fn due_to_end(&self, now: i64) -> (Vec<FaultHandle>, i64) {
        let mut next_wakeup = now + MAX_SCHEDULER_SLEEP_MS;
        let mut due = Vec::new();
        for fault in &self.by_end {
            if fault.end_ms() > now {
                next_wakeup = fault.end_ms();
                break;
            }
            if fault.is_active() {
                due.push(fault.clone());
            }
        }
        (due, next_wakeup)
    }
}
