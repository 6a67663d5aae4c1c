//! Seams to the host: where the charge comes from and what gets switched.

/// Read side of the buffered resource.
///
/// `None` means the host has no reading this tick.
pub trait ChargeSource {
    fn current_amount(&self) -> Option<f64>;
    fn max_amount(&self) -> Option<f64>;
}

/// The generator the controller commands.
///
/// Implementations must tolerate redundant requests: starting a running generator or
/// stopping a stopped one leaves it as it was.
pub trait GeneratorHandle {
    fn is_running(&self) -> bool;
    fn request_start(&mut self);
    fn request_stop(&mut self);
}

/// Charge level in percent, or `None` when it cannot be derived.
pub fn charge_level(source: &impl ChargeSource) -> Option<f64> {
    let current = source.current_amount()?;
    let max = source.max_amount()?;
    if !current.is_finite() || !max.is_finite() || max <= 0.0 {
        return None;
    }
    Some(current / max * 100.0)
}
