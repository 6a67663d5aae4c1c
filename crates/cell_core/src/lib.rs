//! `cell_core` — automatic fuel cell threshold controller.
//!
//! No IO. The host supplies charge readings and a generator handle; the controller
//! answers start, stop or leave it, once per fixed step.

mod band;
mod collaborators;
mod controller;
mod engine;
mod error;
#[cfg(any(test, feature = "test-support"))]
pub mod test_fixtures;
mod types;

pub use band::ThresholdBand;
pub use collaborators::{charge_level, ChargeSource, GeneratorHandle};
pub use controller::{decide, ThresholdController};
pub use engine::step;
pub use error::{BandEdge, ControllerFault, InitError};
pub use types::*;

pub(crate) fn emit(counters: &mut Counters, tick: u64, event: Event) -> EventEnvelope {
    let id = EventId(format!("evt_{:06}", counters.next_event_id));
    counters.next_event_id += 1;
    EventEnvelope { id, tick, event }
}

#[cfg(test)]
mod tests;
