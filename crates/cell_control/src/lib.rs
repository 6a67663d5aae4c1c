use cell_core::{CommandEnvelope, CommandId, OperatorCommand};
use serde::{Deserialize, Serialize};

/// Anything that issues operator commands to a controller: a player, an action
/// group, a test script.
pub trait CommandSource {
    fn generate_commands(&mut self, tick: u64, next_command_id: &mut u64) -> Vec<CommandEnvelope>;
}

/// Allocates a command ID and builds a `CommandEnvelope` for immediate execution.
pub fn make_cmd(tick: u64, next_id: &mut u64, command: OperatorCommand) -> CommandEnvelope {
    let cmd_id = CommandId(format!("cmd_{:06}", *next_id));
    *next_id += 1;
    CommandEnvelope {
        id: cmd_id,
        issued_tick: tick,
        execute_at_tick: tick,
        command,
    }
}

/// Never issues anything; the controller runs on its own.
pub struct IdleOperator;

impl CommandSource for IdleOperator {
    fn generate_commands(&mut self, _tick: u64, _next_command_id: &mut u64) -> Vec<CommandEnvelope> {
        Vec::new()
    }
}

/// One scripted operator action.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScheduledCommand {
    pub at_tick: u64,
    pub command: OperatorCommand,
}

/// Replays a fixed schedule of operator actions, like an action group bound to a
/// timer.
///
/// Entries are issued in tick order; entries sharing a tick keep their schedule order.
/// Entries whose tick has already passed when the operator is first polled are
/// dropped, not replayed late.
pub struct ScriptedOperator {
    schedule: Vec<ScheduledCommand>,
    cursor: usize,
}

impl ScriptedOperator {
    pub fn new(mut schedule: Vec<ScheduledCommand>) -> Self {
        // Stable sort keeps same-tick entries in authoring order.
        schedule.sort_by_key(|entry| entry.at_tick);
        Self {
            schedule,
            cursor: 0,
        }
    }

    /// Entries not yet issued.
    pub fn remaining(&self) -> usize {
        self.schedule.len() - self.cursor
    }
}

impl CommandSource for ScriptedOperator {
    fn generate_commands(&mut self, tick: u64, next_command_id: &mut u64) -> Vec<CommandEnvelope> {
        let mut commands = Vec::new();
        while let Some(entry) = self.schedule.get(self.cursor) {
            if entry.at_tick > tick {
                break;
            }
            if entry.at_tick == tick {
                commands.push(make_cmd(tick, next_command_id, entry.command));
            }
            self.cursor += 1;
        }
        commands
    }
}
