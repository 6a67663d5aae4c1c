use crate::{
    Action, ChargeSource, CommandEnvelope, Counters, Event, EventEnvelope, GeneratorHandle,
    OperatorCommand, ThresholdController,
};

/// Advance the controller by one fixed step.
///
/// Order of operations:
/// 1. Apply operator commands scheduled for this tick, in the order given.
/// 2. Tick the controller.
/// 3. Execute the returned action against the generator.
/// 4. Increment tick counter.
///
/// Returns all events produced this tick.
pub fn step<C: ChargeSource, G: GeneratorHandle>(
    controller: &mut ThresholdController<C, G>,
    counters: &mut Counters,
    commands: &[CommandEnvelope],
) -> Vec<EventEnvelope> {
    let mut events = Vec::new();

    apply_commands(controller, counters, commands, &mut events);
    run_controller(controller, counters, &mut events);

    counters.tick += 1;
    events
}

fn apply_commands<C: ChargeSource, G: GeneratorHandle>(
    controller: &mut ThresholdController<C, G>,
    counters: &mut Counters,
    commands: &[CommandEnvelope],
    events: &mut Vec<EventEnvelope>,
) {
    let current_tick = counters.tick;

    for envelope in commands {
        if envelope.execute_at_tick != current_tick {
            continue;
        }
        let event = apply_command(controller, envelope.command);
        if let Some(event) = event {
            events.push(crate::emit(counters, current_tick, event));
        }
    }
}

fn apply_command<C: ChargeSource, G: GeneratorHandle>(
    controller: &mut ThresholdController<C, G>,
    command: OperatorCommand,
) -> Option<Event> {
    let before = *controller.config();
    let applied = match command {
        OperatorCommand::ToggleMode => controller.toggle_mode(),
        OperatorCommand::SetMode { mode } => controller.set_mode(mode),
        OperatorCommand::SetLowThreshold { percent } => {
            controller.set_low_threshold(percent);
            true
        }
        OperatorCommand::SetHighThreshold { percent } => {
            controller.set_high_threshold(percent);
            true
        }
        OperatorCommand::SetAdvancedControls { enabled } => {
            controller.set_advanced_controls(enabled);
            true
        }
    };
    if !applied {
        return Some(Event::CommandIgnored {
            command,
            reason: "advanced controls disabled".to_string(),
        });
    }

    let after = *controller.config();
    if after.mode != before.mode {
        Some(Event::ModeChanged { mode: after.mode })
    } else if after.band != before.band {
        Some(Event::ThresholdsChanged { band: after.band })
    } else if after.advanced_controls_enabled != before.advanced_controls_enabled {
        Some(Event::AdvancedControlsChanged {
            enabled: after.advanced_controls_enabled,
        })
    } else {
        None
    }
}

fn run_controller<C: ChargeSource, G: GeneratorHandle>(
    controller: &mut ThresholdController<C, G>,
    counters: &mut Counters,
    events: &mut Vec<EventEnvelope>,
) {
    let current_tick = counters.tick;

    if let Some(fault) = controller.fault() {
        if !counters.disabled_reported {
            counters.disabled_reported = true;
            let reason = fault.to_string();
            events.push(crate::emit(
                counters,
                current_tick,
                Event::ControllerDisabled { reason },
            ));
        }
        return;
    }

    let action = controller.tick();
    if let Some(fault) = controller.take_last_fault() {
        events.push(crate::emit(
            counters,
            current_tick,
            Event::TickFaulted {
                message: fault.to_string(),
            },
        ));
        return;
    }

    let charge_percent = controller.charge_level().unwrap_or_default();
    if controller.execute(action) {
        let event = match action {
            Action::Start => Event::GeneratorStarted { charge_percent },
            Action::Stop => Event::GeneratorStopped { charge_percent },
            Action::NoOp => return,
        };
        events.push(crate::emit(counters, current_tick, event));
    } else if let Some(fault) = controller.take_last_fault() {
        events.push(crate::emit(
            counters,
            current_tick,
            Event::TickFaulted {
                message: fault.to_string(),
            },
        ));
    }
}
