use super::*;
use crate::test_fixtures::{wired_controller, PanickingBattery, TestBattery, TestGenerator};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;


// --- Shared test helpers ------------------------------------------------

fn make_rng() -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(42)
}

fn manual_config() -> ControllerConfig {
    ControllerConfig {
        mode: OperationMode::Manual,
        ..ControllerConfig::default()
    }
}

fn gated_config() -> ControllerConfig {
    ControllerConfig {
        advanced_controls_enabled: false,
        ..ControllerConfig::default()
    }
}

fn command_at(tick: u64, command: OperatorCommand) -> CommandEnvelope {
    CommandEnvelope {
        id: CommandId(format!("cmd_{tick:06}")),
        issued_tick: tick,
        execute_at_tick: tick,
        command,
    }
}

fn close(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-5
}
