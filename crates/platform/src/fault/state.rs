use std::fmt;

use serde::{Deserialize, Serialize};

/// The lifecycle of a fault.
///
/// A fault only ever moves forward: pending, then active, then finished.
/// A fault whose activation fails skips straight from pending to finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FaultState {
    Pending,
    Active,
    Finished,
}

impl fmt::Display for FaultState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            FaultState::Pending => "pending",
            FaultState::Active => "active",
            FaultState::Finished => "finished",
        };
        write!(f, "{text}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_should_serialize_lowercase() {
        assert_eq!(
            serde_json::to_string(&FaultState::Pending).unwrap(),
            "\"pending\""
        );
        assert_eq!(
            serde_json::from_str::<FaultState>("\"finished\"").unwrap(),
            FaultState::Finished
        );
        assert_eq!(FaultState::Active.to_string(), "active");
    }
}
