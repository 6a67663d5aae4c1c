//! Simulated host for the fuel cell controller: part model, collaborator lookup,
//! resource flows and scenario loading, shared between `cell_cli` and tests.

mod flow;
mod part;

use std::cell::RefCell;
use std::collections::HashSet;
use std::path::Path;
use std::rc::Rc;

use anyhow::{ensure, Context, Result};
use cell_control::ScheduledCommand;
use cell_core::{ControllerConfig, ELECTRIC_CHARGE};
use rand::Rng;
use serde::{Deserialize, Serialize};

pub use flow::{advance_part, FlowReport};
pub use part::{
    find_generator, find_resource, ConverterHandle, ConverterState, ModuleKind, ModuleState,
    PartState, ResourceFlow, ResourceHandle, ResourceState, SharedPart,
};

/// Constant draw with optional uniform jitter, in resource units per tick.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LoadProfile {
    pub base_per_tick: f64,
    #[serde(default)]
    pub jitter_per_tick: f64,
}

impl LoadProfile {
    /// Draw this tick's load. Never negative.
    pub fn sample(&self, rng: &mut impl Rng) -> f64 {
        let jitter = if self.jitter_per_tick > 0.0 {
            rng.gen_range(-1.0..=1.0) * self.jitter_per_tick
        } else {
            0.0
        };
        (self.base_per_tick + jitter).max(0.0)
    }
}

/// One simulated part, its load and the controller settings it was saved with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    /// Resource the controller watches and the converter must output.
    #[serde(default = "default_resource")]
    pub resource: String,
    pub part: PartState,
    pub load: LoadProfile,
    #[serde(default)]
    pub controller: ControllerConfig,
    #[serde(default)]
    pub script: Vec<ScheduledCommand>,
}

fn default_resource() -> String {
    ELECTRIC_CHARGE.to_string()
}

fn ensure_rate(value: f64, what: &str) -> Result<()> {
    ensure!(
        value.is_finite() && value >= 0.0,
        "{what} must be a finite, non-negative number, got {value}"
    );
    Ok(())
}

/// Validates authoring errors in a scenario.
///
/// Catches mistakes like: duplicate resource containers, an amount above its
/// capacity, negative or non-finite rates. A part without a matching converter is
/// valid: the controller comes up disabled on it.
pub fn validate_scenario(scenario: &Scenario) -> Result<()> {
    ensure!(!scenario.name.is_empty(), "scenario has an empty name");
    ensure!(
        !scenario.resource.is_empty(),
        "scenario '{}' watches an empty resource name",
        scenario.name
    );

    let mut seen: HashSet<&str> = HashSet::new();
    for resource in &scenario.part.resources {
        ensure!(
            seen.insert(resource.name.as_str()),
            "part '{}' declares resource '{}' twice",
            scenario.part.name,
            resource.name
        );
        ensure_rate(resource.max_amount, &format!("resource '{}' max_amount", resource.name))?;
        ensure_rate(resource.amount, &format!("resource '{}' amount", resource.name))?;
        ensure!(
            resource.amount <= resource.max_amount,
            "resource '{}' amount {} exceeds max_amount {}",
            resource.name,
            resource.amount,
            resource.max_amount
        );
    }

    for module in &scenario.part.modules {
        if let ModuleKind::Converter(converter) = &module.kind {
            ensure!(
                !converter.outputs.is_empty(),
                "converter '{}' has no outputs",
                module.name
            );
            for flow in converter.inputs.iter().chain(&converter.outputs) {
                ensure_rate(
                    flow.rate_per_tick,
                    &format!("converter '{}' rate for '{}'", module.name, flow.resource),
                )?;
            }
        }
    }

    ensure_rate(scenario.load.base_per_tick, "load base_per_tick")?;
    ensure_rate(scenario.load.jitter_per_tick, "load jitter_per_tick")?;
    ensure!(
        (scenario.load.base_per_tick + scenario.load.jitter_per_tick).is_finite(),
        "load base_per_tick {} plus jitter_per_tick {} overflows",
        scenario.load.base_per_tick,
        scenario.load.jitter_per_tick
    );
    Ok(())
}

pub fn load_scenario(path: impl AsRef<Path>) -> Result<Scenario> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading scenario: {}", path.display()))?;
    let scenario: Scenario = serde_json::from_str(&json)
        .with_context(|| format!("parsing scenario: {}", path.display()))?;
    validate_scenario(&scenario)
        .with_context(|| format!("validating scenario: {}", path.display()))?;
    Ok(scenario)
}

/// Fresh shared copy of the scenario's part, ready to hand out handles from.
pub fn build_part(scenario: &Scenario) -> SharedPart {
    Rc::new(RefCell::new(scenario.part.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn minimal_scenario() -> Scenario {
        Scenario {
            name: "minimal".to_string(),
            resource: ELECTRIC_CHARGE.to_string(),
            part: PartState {
                name: "part".to_string(),
                resources: vec![ResourceState {
                    name: ELECTRIC_CHARGE.to_string(),
                    amount: 10.0,
                    max_amount: 100.0,
                }],
                modules: vec![ModuleState {
                    name: "FuelCell".to_string(),
                    kind: ModuleKind::Converter(ConverterState {
                        inputs: vec![],
                        outputs: vec![ResourceFlow {
                            resource: ELECTRIC_CHARGE.to_string(),
                            rate_per_tick: 1.0,
                        }],
                        activated: false,
                    }),
                }],
            },
            load: LoadProfile {
                base_per_tick: 0.5,
                jitter_per_tick: 0.0,
            },
            controller: ControllerConfig::default(),
            script: vec![],
        }
    }

    #[test]
    fn valid_scenario_passes_validation() {
        validate_scenario(&minimal_scenario()).unwrap();
    }

    #[test]
    fn duplicate_resource_rejected() {
        let mut scenario = minimal_scenario();
        let duplicate = scenario.part.resources[0].clone();
        scenario.part.resources.push(duplicate);
        let err = validate_scenario(&scenario).unwrap_err();
        assert!(err.to_string().contains("twice"), "{err}");
    }

    #[test]
    fn overfull_resource_rejected() {
        let mut scenario = minimal_scenario();
        scenario.part.resources[0].amount = 150.0;
        assert!(validate_scenario(&scenario).is_err());
    }

    #[test]
    fn negative_rate_rejected() {
        let mut scenario = minimal_scenario();
        if let ModuleKind::Converter(converter) = &mut scenario.part.modules[0].kind {
            converter.outputs[0].rate_per_tick = -1.0;
        }
        assert!(validate_scenario(&scenario).is_err());
    }

    #[test]
    fn overflowing_load_rejected() {
        let mut scenario = minimal_scenario();
        scenario.load.jitter_per_tick = 1e308;
        scenario.load.base_per_tick = 1e308;
        let err = validate_scenario(&scenario).unwrap_err();
        assert!(err.to_string().contains("overflows"), "{err}");
    }

    #[test]
    fn huge_jitter_samples_without_panicking() {
        let profile = LoadProfile {
            base_per_tick: 0.0,
            jitter_per_tick: 1e308,
        };
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        for _ in 0..100 {
            let load = profile.sample(&mut rng);
            assert!(load.is_finite() && load >= 0.0, "load {load}");
        }
    }

    #[test]
    fn part_without_converter_is_valid() {
        let mut scenario = minimal_scenario();
        scenario.part.modules.clear();
        validate_scenario(&scenario).unwrap();
    }

    #[test]
    fn load_sample_stays_within_jitter() {
        let profile = LoadProfile {
            base_per_tick: 1.0,
            jitter_per_tick: 2.0,
        };
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        for _ in 0..1_000 {
            let load = profile.sample(&mut rng);
            assert!((0.0..=3.0).contains(&load), "load {load} out of range");
        }
    }

    #[test]
    fn build_part_copies_scenario_state() {
        let scenario = minimal_scenario();
        let part = build_part(&scenario);
        part.borrow_mut().resources[0].amount = 0.0;
        assert!((scenario.part.resources[0].amount - 10.0).abs() < 1e-9);
    }
}
