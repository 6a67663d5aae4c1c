//! Type definitions for `cell_core`.
//!
//! Configuration, decisions, operator commands and the events the engine emits.

use serde::{Deserialize, Deserializer, Serialize};

use crate::band::ThresholdBand;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Name of the buffered resource the controller watches.
pub const ELECTRIC_CHARGE: &str = "ElectricCharge";

/// Lowest threshold a band edge may take, in percent.
pub const MIN_PERCENT: f32 = 15.0;

/// Highest threshold a band edge may take, in percent.
pub const MAX_PERCENT: f32 = 85.0;

/// Minimum distance between the low and high edges, in percent.
pub const MIN_GAP: f32 = 1.0;

// ---------------------------------------------------------------------------
// ID newtypes
// ---------------------------------------------------------------------------

macro_rules! string_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(CommandId);
string_id!(EventId);

// ---------------------------------------------------------------------------
// Core enums
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationMode {
    #[default]
    Automatic,
    Manual,
}

impl OperationMode {
    pub fn toggled(self) -> Self {
        match self {
            Self::Automatic => Self::Manual,
            Self::Manual => Self::Automatic,
        }
    }
}

impl std::fmt::Display for OperationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Automatic => "Automatic",
            Self::Manual => "Manual",
        })
    }
}

/// Decision produced by one controller tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    Start,
    Stop,
    #[default]
    NoOp,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::NoOp => "noop",
        })
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Everything the host persists for one controller.
///
/// `advanced_controls_enabled` mirrors the host-wide setting. While it is off the
/// controller behaves as if `mode` were `Manual` and refuses mode edits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControllerConfig {
    #[serde(default)]
    pub band: ThresholdBand,
    /// Also accepts the legacy boolean form, where `true` means Automatic.
    #[serde(default, deserialize_with = "deserialize_mode")]
    pub mode: OperationMode,
    #[serde(default = "default_advanced_controls")]
    pub advanced_controls_enabled: bool,
}

fn default_advanced_controls() -> bool {
    true
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PersistedMode {
    Named(OperationMode),
    Automatic(bool),
}

fn deserialize_mode<'de, D>(deserializer: D) -> Result<OperationMode, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match PersistedMode::deserialize(deserializer)? {
        PersistedMode::Named(mode) => mode,
        PersistedMode::Automatic(true) => OperationMode::Automatic,
        PersistedMode::Automatic(false) => OperationMode::Manual,
    })
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            band: ThresholdBand::default(),
            mode: OperationMode::Automatic,
            advanced_controls_enabled: true,
        }
    }
}

impl ControllerConfig {
    /// True when the controller is allowed to issue start/stop commands.
    pub fn automatic_enabled(&self) -> bool {
        self.advanced_controls_enabled && self.mode == OperationMode::Automatic
    }
}

/// Tick counter and id allocator threaded through [`crate::step`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Counters {
    pub tick: u64,
    pub next_event_id: u64,
    /// Set once `ControllerDisabled` has been emitted.
    #[serde(default)]
    pub disabled_reported: bool,
}

// ---------------------------------------------------------------------------
// Command types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandEnvelope {
    pub id: CommandId,
    pub issued_tick: u64,
    pub execute_at_tick: u64,
    pub command: OperatorCommand,
}

/// Edits a user or an action group can make to a running controller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum OperatorCommand {
    ToggleMode,
    SetMode { mode: OperationMode },
    SetLowThreshold { percent: f32 },
    SetHighThreshold { percent: f32 },
    /// Host-wide settings change, not a per-controller edit.
    SetAdvancedControls { enabled: bool },
}

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub id: EventId,
    pub tick: u64,
    pub event: Event,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    GeneratorStarted {
        charge_percent: f64,
    },
    GeneratorStopped {
        charge_percent: f64,
    },
    ModeChanged {
        mode: OperationMode,
    },
    ThresholdsChanged {
        band: ThresholdBand,
    },
    AdvancedControlsChanged {
        enabled: bool,
    },
    CommandIgnored {
        command: OperatorCommand,
        reason: String,
    },
    /// Emitted once per run when a collaborator was missing at initialization.
    ControllerDisabled {
        reason: String,
    },
    TickFaulted {
        message: String,
    },
}
