//! Simulated host part: resource containers, modules and the handles the controller
//! is wired to.

use std::cell::RefCell;
use std::rc::Rc;

use cell_core::{ChargeSource, GeneratorHandle};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceState {
    pub name: String,
    pub amount: f64,
    pub max_amount: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceFlow {
    pub resource: String,
    pub rate_per_tick: f64,
}

/// A module that turns input resources into output resources while activated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConverterState {
    #[serde(default)]
    pub inputs: Vec<ResourceFlow>,
    pub outputs: Vec<ResourceFlow>,
    #[serde(default)]
    pub activated: bool,
}

impl ConverterState {
    /// True when any output is `resource`, ignoring ASCII case.
    pub fn outputs_resource(&self, resource: &str) -> bool {
        self.outputs
            .iter()
            .any(|flow| flow.resource.eq_ignore_ascii_case(resource))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ModuleKind {
    Converter(ConverterState),
    /// Anything the controller has no business with (command pods, antennas, ...).
    Passive,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleState {
    pub name: String,
    pub kind: ModuleKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartState {
    pub name: String,
    pub resources: Vec<ResourceState>,
    pub modules: Vec<ModuleState>,
}

impl PartState {
    pub fn resource(&self, name: &str) -> Option<&ResourceState> {
        self.resources.iter().find(|r| r.name == name)
    }

    /// Charge of `name` in percent, when the part carries it with a non-zero capacity.
    pub fn resource_percent(&self, name: &str) -> Option<f64> {
        self.resource(name)
            .filter(|r| r.max_amount > 0.0)
            .map(|r| r.amount / r.max_amount * 100.0)
    }

    pub fn converter(&self, index: usize) -> Option<&ConverterState> {
        match &self.modules.get(index)?.kind {
            ModuleKind::Converter(converter) => Some(converter),
            ModuleKind::Passive => None,
        }
    }

    fn converter_mut(&mut self, index: usize) -> Option<&mut ConverterState> {
        match &mut self.modules.get_mut(index)?.kind {
            ModuleKind::Converter(converter) => Some(converter),
            ModuleKind::Passive => None,
        }
    }
}

/// The part is shared between the host loop and the controller's handles. All access
/// happens on the simulation thread.
pub type SharedPart = Rc<RefCell<PartState>>;

/// Charge source view of one resource container on a shared part.
#[derive(Debug, Clone)]
pub struct ResourceHandle {
    part: SharedPart,
    index: usize,
}

impl ChargeSource for ResourceHandle {
    fn current_amount(&self) -> Option<f64> {
        self.part.borrow().resources.get(self.index).map(|r| r.amount)
    }

    fn max_amount(&self) -> Option<f64> {
        self.part
            .borrow()
            .resources
            .get(self.index)
            .map(|r| r.max_amount)
    }
}

/// Generator view of one converter module on a shared part.
#[derive(Debug, Clone)]
pub struct ConverterHandle {
    part: SharedPart,
    index: usize,
}

impl ConverterHandle {
    pub fn module_name(&self) -> String {
        self.part
            .borrow()
            .modules
            .get(self.index)
            .map(|m| m.name.clone())
            .unwrap_or_default()
    }
}

impl GeneratorHandle for ConverterHandle {
    fn is_running(&self) -> bool {
        self.part
            .borrow()
            .converter(self.index)
            .is_some_and(|c| c.activated)
    }

    fn request_start(&mut self) {
        if let Some(converter) = self.part.borrow_mut().converter_mut(self.index) {
            converter.activated = true;
        }
    }

    fn request_stop(&mut self) {
        if let Some(converter) = self.part.borrow_mut().converter_mut(self.index) {
            converter.activated = false;
        }
    }
}

/// Locate the resource container called `name` (exact match).
pub fn find_resource(part: &SharedPart, name: &str) -> Option<ResourceHandle> {
    let index = part.borrow().resources.iter().position(|r| r.name == name);
    if index.is_none() {
        tracing::debug!(part = %part.borrow().name, resource = name, "resource not found");
    }
    index.map(|index| ResourceHandle {
        part: Rc::clone(part),
        index,
    })
}

/// Locate the first converter module whose outputs include `resource`, compared
/// case-insensitively.
pub fn find_generator(part: &SharedPart, resource: &str) -> Option<ConverterHandle> {
    let index = part.borrow().modules.iter().position(|m| match &m.kind {
        ModuleKind::Converter(converter) => converter.outputs_resource(resource),
        ModuleKind::Passive => false,
    });
    if index.is_none() {
        tracing::debug!(part = %part.borrow().name, resource, "no converter outputs resource");
    }
    index.map(|index| ConverterHandle {
        part: Rc::clone(part),
        index,
    })
}
