//! The threshold controller: one hysteresis decision per fixed step.
//!
//! The controller keeps no history between ticks beyond its configuration. Every
//! decision is a function of the current charge reading, the generator run state and
//! the band/mode/gate it was configured with.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use crate::band::ThresholdBand;
use crate::collaborators::{charge_level, ChargeSource, GeneratorHandle};
use crate::error::{ControllerFault, InitError};
use crate::{Action, ControllerConfig, OperationMode};

/// Pure hysteresis rule for a defined charge level.
///
/// Gate and mode are checked before any threshold comparison; `running` is only
/// consulted once automatic control is known to be allowed.
pub fn decide(
    charge_percent: f64,
    running: impl FnOnce() -> bool,
    config: &ControllerConfig,
) -> Action {
    if !config.automatic_enabled() {
        return Action::NoOp;
    }
    let band = config.band;
    if charge_percent <= f64::from(band.low()) {
        if running() {
            Action::NoOp
        } else {
            Action::Start
        }
    } else if charge_percent >= f64::from(band.high()) {
        if running() {
            Action::Stop
        } else {
            Action::NoOp
        }
    } else {
        Action::NoOp
    }
}

pub struct ThresholdController<C, G> {
    charge: Option<C>,
    generator: Option<G>,
    config: ControllerConfig,
    /// Set at initialization when a collaborator is missing. Never cleared.
    disabled: Option<ControllerFault>,
    /// Most recent caught panic, until taken by the caller.
    last_fault: Option<ControllerFault>,
    /// Published for display only; carries no control semantics.
    charge_percent: Option<f64>,
}

impl<C: ChargeSource, G: GeneratorHandle> ThresholdController<C, G> {
    /// Records the located collaborators and the (restored) configuration.
    ///
    /// A missing collaborator does not fail initialization: the controller comes up
    /// disabled and every tick is a no-op. Only a non-finite persisted threshold is
    /// rejected.
    pub fn initialize(
        charge: Option<C>,
        generator: Option<G>,
        config: ControllerConfig,
    ) -> Result<Self, InitError> {
        let band = ThresholdBand::restore(config.band.low(), config.band.high())?;
        let config = ControllerConfig { band, ..config };

        let disabled = if charge.is_none() || generator.is_none() {
            let fault = ControllerFault::MissingCollaborator {
                charge_source: charge.is_none(),
                generator: generator.is_none(),
            };
            tracing::warn!(%fault, "threshold controller disabled");
            Some(fault)
        } else {
            None
        };

        Ok(Self {
            charge,
            generator,
            config,
            disabled,
            last_fault: None,
            charge_percent: None,
        })
    }

    /// Decide what the generator should do this step.
    ///
    /// Never panics on behalf of a collaborator: a panic raised while reading the
    /// charge source or the generator is caught, recorded in [`Self::take_last_fault`]
    /// and turned into [`Action::NoOp`].
    pub fn tick(&mut self) -> Action {
        if self.disabled.is_some() {
            return Action::NoOp;
        }
        let (Some(charge), Some(generator)) = (self.charge.as_ref(), self.generator.as_ref())
        else {
            return Action::NoOp;
        };
        let config = self.config;

        let outcome = guarded("tick", || {
            let Some(percent) = charge_level(charge) else {
                tracing::trace!("charge level undefined, skipping tick");
                return (None, Action::NoOp);
            };
            tracing::trace!("current charge = {percent:.2}%");
            (Some(percent), decide(percent, || generator.is_running(), &config))
        });

        match outcome {
            Ok((percent, action)) => {
                self.charge_percent = percent;
                action
            }
            Err(fault) => {
                tracing::error!(%fault, "tick treated as no-op");
                self.charge_percent = None;
                self.last_fault = Some(fault);
                Action::NoOp
            }
        }
    }

    /// Apply `action` to the generator. Returns true when a request was issued.
    pub fn execute(&mut self, action: Action) -> bool {
        if self.disabled.is_some() || action == Action::NoOp {
            return false;
        }
        let Some(generator) = self.generator.as_mut() else {
            return false;
        };

        let outcome = guarded("execute", || match action {
            Action::Start => {
                tracing::debug!("starting generator");
                generator.request_start();
            }
            Action::Stop => {
                tracing::debug!("stopping generator");
                generator.request_stop();
            }
            Action::NoOp => {}
        });

        match outcome {
            Ok(()) => true,
            Err(fault) => {
                tracing::error!(%fault, "generator request dropped");
                self.last_fault = Some(fault);
                false
            }
        }
    }

    /// Moves the low edge; the band stays valid. Returns the resulting band.
    pub fn set_low_threshold(&mut self, percent: f32) -> ThresholdBand {
        self.config.band = self.config.band.with_low(percent);
        self.config.band
    }

    /// Moves the high edge; the band stays valid. Returns the resulting band.
    pub fn set_high_threshold(&mut self, percent: f32) -> ThresholdBand {
        self.config.band = self.config.band.with_high(percent);
        self.config.band
    }

    /// Flips Automatic/Manual. Returns false, leaving the mode alone, while
    /// advanced controls are off.
    pub fn toggle_mode(&mut self) -> bool {
        if !self.config.advanced_controls_enabled {
            return false;
        }
        self.config.mode = self.config.mode.toggled();
        true
    }

    /// Sets the mode. Returns false, leaving the mode alone, while advanced
    /// controls are off.
    pub fn set_mode(&mut self, mode: OperationMode) -> bool {
        if !self.config.advanced_controls_enabled {
            return false;
        }
        self.config.mode = mode;
        true
    }

    /// Host-wide advanced controls switch changed.
    pub fn set_advanced_controls(&mut self, enabled: bool) {
        self.config.advanced_controls_enabled = enabled;
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn band(&self) -> ThresholdBand {
        self.config.band
    }

    pub fn mode(&self) -> OperationMode {
        self.config.mode
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled.is_some()
    }

    /// Why the controller is disabled, if it is.
    pub fn fault(&self) -> Option<&ControllerFault> {
        self.disabled.as_ref()
    }

    pub fn take_last_fault(&mut self) -> Option<ControllerFault> {
        self.last_fault.take()
    }

    /// Charge level published by the last tick, if it was defined.
    pub fn charge_level(&self) -> Option<f64> {
        self.charge_percent
    }

    /// Published charge level formatted for display, e.g. `"42.50%"`.
    pub fn charge_display(&self) -> String {
        match self.charge_percent {
            Some(percent) => format!("{percent:.2}%"),
            None => "--".to_string(),
        }
    }

    pub fn generator(&self) -> Option<&G> {
        self.generator.as_ref()
    }
}

fn guarded<T>(phase: &'static str, f: impl FnOnce() -> T) -> Result<T, ControllerFault> {
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| {
        ControllerFault::CollaboratorPanicked {
            phase,
            message: panic_message(payload.as_ref()),
        }
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
