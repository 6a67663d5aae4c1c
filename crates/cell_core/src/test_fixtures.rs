//! Shared test fixtures for `cell_core` and downstream crates.
//!
//! `TestBattery` and `TestGenerator` share their state through `Rc` so a test can
//! keep a copy and move the charge (or the run state) after the controller has
//! taken ownership of its handles.

use std::cell::Cell;
use std::rc::Rc;

use crate::{ChargeSource, ControllerConfig, GeneratorHandle, ThresholdController};

/// In-memory charge buffer. Cloning shares the underlying readings.
#[derive(Debug, Clone)]
pub struct TestBattery {
    amount: Rc<Cell<Option<f64>>>,
    max_amount: Rc<Cell<Option<f64>>>,
}

impl TestBattery {
    /// Buffer of capacity 100 holding `percent`.
    pub fn at_percent(percent: f64) -> Self {
        Self::new(percent, 100.0)
    }

    pub fn new(amount: f64, max_amount: f64) -> Self {
        Self {
            amount: Rc::new(Cell::new(Some(amount))),
            max_amount: Rc::new(Cell::new(Some(max_amount))),
        }
    }

    pub fn set_amount(&self, amount: f64) {
        self.amount.set(Some(amount));
    }

    pub fn set_max_amount(&self, max_amount: f64) {
        self.max_amount.set(Some(max_amount));
    }

    /// Makes both readings unavailable.
    pub fn go_dark(&self) {
        self.amount.set(None);
        self.max_amount.set(None);
    }
}

impl ChargeSource for TestBattery {
    fn current_amount(&self) -> Option<f64> {
        self.amount.get()
    }

    fn max_amount(&self) -> Option<f64> {
        self.max_amount.get()
    }
}

/// In-memory generator that counts the requests it receives.
#[derive(Debug, Clone, Default)]
pub struct TestGenerator {
    running: Rc<Cell<bool>>,
    start_requests: Rc<Cell<u32>>,
    stop_requests: Rc<Cell<u32>>,
}

impl TestGenerator {
    pub fn stopped() -> Self {
        Self::default()
    }

    pub fn running() -> Self {
        let generator = Self::default();
        generator.running.set(true);
        generator
    }

    /// Flip the run state from outside the controller (player or another part).
    pub fn set_running(&self, running: bool) {
        self.running.set(running);
    }

    pub fn start_requests(&self) -> u32 {
        self.start_requests.get()
    }

    pub fn stop_requests(&self) -> u32 {
        self.stop_requests.get()
    }
}

impl GeneratorHandle for TestGenerator {
    fn is_running(&self) -> bool {
        self.running.get()
    }

    fn request_start(&mut self) {
        self.start_requests.set(self.start_requests.get() + 1);
        self.running.set(true);
    }

    fn request_stop(&mut self) {
        self.stop_requests.set(self.stop_requests.get() + 1);
        self.running.set(false);
    }
}

/// Charge source that panics on every read.
#[derive(Debug, Clone, Copy, Default)]
pub struct PanickingBattery;

impl ChargeSource for PanickingBattery {
    fn current_amount(&self) -> Option<f64> {
        panic!("resource list torn down");
    }

    fn max_amount(&self) -> Option<f64> {
        panic!("resource list torn down");
    }
}

pub type TestController = ThresholdController<TestBattery, TestGenerator>;

/// Controller wired to a fresh battery at `percent` and a generator in the given state.
/// The returned handles share state with the ones the controller owns.
pub fn wired_controller(
    percent: f64,
    running: bool,
    config: ControllerConfig,
) -> (TestController, TestBattery, TestGenerator) {
    let battery = TestBattery::at_percent(percent);
    let generator = if running {
        TestGenerator::running()
    } else {
        TestGenerator::stopped()
    };
    let controller = ThresholdController::initialize(
        Some(battery.clone()),
        Some(generator.clone()),
        config,
    )
    .expect("default-derived configs always initialize");
    (controller, battery, generator)
}
