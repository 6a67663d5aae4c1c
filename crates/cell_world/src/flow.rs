//! Resource flow step — flat per-tick rates, no conversion chemistry.
//!
//! Runs after the controller step in the host loop:
//! 1. Every activated converter draws its inputs and fills its outputs, throttled by
//!    the scarcest input and capped by output headroom.
//! 2. The load drains the watched resource.

use crate::part::{ModuleKind, PartState, ResourceState};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FlowReport {
    /// Amount of the watched resource added by converters this tick.
    pub produced: f64,
    /// Amount of the watched resource the load actually drew.
    pub consumed: f64,
    /// Load that could not be served because the buffer ran dry.
    pub shortfall: f64,
    /// Activated converters that produced nothing for lack of input.
    pub starved_converters: usize,
}

fn find_mut<'a>(resources: &'a mut [ResourceState], name: &str) -> Option<&'a mut ResourceState> {
    resources.iter_mut().find(|r| r.name == name)
}

/// Advance the part by one tick with `load_per_tick` drawn from `resource`.
pub fn advance_part(part: &mut PartState, resource: &str, load_per_tick: f64) -> FlowReport {
    let mut report = FlowReport::default();
    let PartState {
        ref modules,
        ref mut resources,
        ..
    } = *part;

    for module in modules {
        let ModuleKind::Converter(converter) = &module.kind else {
            continue;
        };
        if !converter.activated {
            continue;
        }

        // Fraction of a full tick the scarcest input can sustain.
        let throttle = converter
            .inputs
            .iter()
            .filter(|flow| flow.rate_per_tick > 0.0)
            .map(|flow| {
                find_mut(resources, &flow.resource)
                    .map_or(0.0, |r| (r.amount / flow.rate_per_tick).clamp(0.0, 1.0))
            })
            .fold(1.0_f64, f64::min);

        if throttle <= 0.0 {
            report.starved_converters += 1;
            continue;
        }

        for flow in &converter.inputs {
            if let Some(input) = find_mut(resources, &flow.resource) {
                input.amount = (input.amount - flow.rate_per_tick * throttle).max(0.0);
            }
        }
        for flow in &converter.outputs {
            // Outputs with no container on the part are vented.
            let Some(output) = find_mut(resources, &flow.resource) else {
                continue;
            };
            let headroom = (output.max_amount - output.amount).max(0.0);
            let added = (flow.rate_per_tick * throttle).min(headroom);
            output.amount += added;
            if output.name == resource {
                report.produced += added;
            }
        }
    }

    if let Some(buffer) = find_mut(resources, resource) {
        let load = load_per_tick.max(0.0);
        let drawn = load.min(buffer.amount);
        buffer.amount -= drawn;
        report.consumed = drawn;
        report.shortfall = load - drawn;
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::part::{ConverterState, ModuleState, ResourceFlow};
    use cell_core::ELECTRIC_CHARGE;

    fn resource(name: &str, amount: f64, max_amount: f64) -> ResourceState {
        ResourceState {
            name: name.to_string(),
            amount,
            max_amount,
        }
    }

    fn flow(resource: &str, rate_per_tick: f64) -> ResourceFlow {
        ResourceFlow {
            resource: resource.to_string(),
            rate_per_tick,
        }
    }

    fn fuel_cell_part(fuel: f64, charge: f64, activated: bool) -> PartState {
        PartState {
            name: "fuel_cell".to_string(),
            resources: vec![
                resource(ELECTRIC_CHARGE, charge, 100.0),
                resource("LiquidFuel", fuel, 100.0),
            ],
            modules: vec![ModuleState {
                name: "FuelCell".to_string(),
                kind: ModuleKind::Converter(ConverterState {
                    inputs: vec![flow("LiquidFuel", 1.0)],
                    outputs: vec![flow(ELECTRIC_CHARGE, 10.0)],
                    activated,
                }),
            }],
        }
    }

    fn amount(part: &PartState, name: &str) -> f64 {
        part.resource(name).unwrap().amount
    }

    #[test]
    fn active_converter_produces_and_load_drains() {
        let mut part = fuel_cell_part(50.0, 40.0, true);
        let report = advance_part(&mut part, ELECTRIC_CHARGE, 4.0);

        assert!((report.produced - 10.0).abs() < 1e-9);
        assert!((report.consumed - 4.0).abs() < 1e-9);
        assert!((amount(&part, ELECTRIC_CHARGE) - 46.0).abs() < 1e-9);
        assert!((amount(&part, "LiquidFuel") - 49.0).abs() < 1e-9);
    }

    #[test]
    fn inactive_converter_only_drains() {
        let mut part = fuel_cell_part(50.0, 40.0, false);
        let report = advance_part(&mut part, ELECTRIC_CHARGE, 4.0);
        assert!(report.produced.abs() < 1e-9);
        assert!((amount(&part, ELECTRIC_CHARGE) - 36.0).abs() < 1e-9);
        assert!((amount(&part, "LiquidFuel") - 50.0).abs() < 1e-9);
    }

    #[test]
    fn scarce_input_throttles_output() {
        let mut part = fuel_cell_part(0.25, 40.0, true);
        let report = advance_part(&mut part, ELECTRIC_CHARGE, 0.0);
        assert!((report.produced - 2.5).abs() < 1e-9);
        assert!(amount(&part, "LiquidFuel").abs() < 1e-9);
    }

    #[test]
    fn empty_input_starves_converter() {
        let mut part = fuel_cell_part(0.0, 40.0, true);
        let report = advance_part(&mut part, ELECTRIC_CHARGE, 0.0);
        assert_eq!(report.starved_converters, 1);
        assert!(report.produced.abs() < 1e-9);
    }

    #[test]
    fn output_capped_at_capacity() {
        let mut part = fuel_cell_part(50.0, 95.0, true);
        let report = advance_part(&mut part, ELECTRIC_CHARGE, 0.0);
        assert!((report.produced - 5.0).abs() < 1e-9);
        assert!((amount(&part, ELECTRIC_CHARGE) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn load_beyond_buffer_reports_shortfall() {
        let mut part = fuel_cell_part(50.0, 3.0, false);
        let report = advance_part(&mut part, ELECTRIC_CHARGE, 5.0);
        assert!((report.consumed - 3.0).abs() < 1e-9);
        assert!((report.shortfall - 2.0).abs() < 1e-9);
        assert!(amount(&part, ELECTRIC_CHARGE).abs() < 1e-9);
    }
}
