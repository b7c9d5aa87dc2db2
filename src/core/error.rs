//! Engine errors

use std::fmt;

use super::EngineState;

/// Errors surfaced by the engine lifecycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Entering `state` needed a resource that could not be acquired
    Acquisition {
        /// State whose setup failed
        state: EngineState,
        /// What went wrong
        reason: String,
    },
    /// A transition out of the terminal state was requested
    Terminal {
        /// The rejected target state
        requested: EngineState,
    },
    /// The platform event loop failed
    EventLoop(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Acquisition { state, reason } => {
                write!(f, "failed to enter {state:?}: {reason}")
            }
            Self::Terminal { requested } => {
                write!(f, "cannot leave ShuttingDown for {requested:?}")
            }
            Self::EventLoop(e) => write!(f, "event loop error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {}
