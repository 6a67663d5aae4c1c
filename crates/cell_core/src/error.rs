use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BandEdge {
    Low,
    High,
}

impl std::fmt::Display for BandEdge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Low => "low",
            Self::High => "high",
        })
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InitError {
    #[error("{edge} threshold restored as non-finite value {value}")]
    NonFiniteThreshold { edge: BandEdge, value: f32 },
}

/// Faults the controller records instead of propagating.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ControllerFault {
    #[error("missing collaborator: {}", describe_missing(*charge_source, *generator))]
    MissingCollaborator {
        /// True when the charge source could not be located.
        charge_source: bool,
        /// True when the generator could not be located.
        generator: bool,
    },

    #[error("collaborator panicked during {phase}: {message}")]
    CollaboratorPanicked {
        phase: &'static str,
        message: String,
    },
}

fn describe_missing(charge_source: bool, generator: bool) -> &'static str {
    match (charge_source, generator) {
        (true, true) => "charge source and generator",
        (true, false) => "charge source",
        (false, true) => "generator",
        (false, false) => "none",
    }
}
