//! Hysteresis band math — pure functions, no controller state.

use serde::{Deserialize, Serialize};

use crate::error::{BandEdge, InitError};
use crate::{MAX_PERCENT, MIN_GAP, MIN_PERCENT};

/// The (low, high) percentage pair the controller cycles between.
///
/// Both edges lie in `[MIN_PERCENT, MAX_PERCENT]` and `high >= low + MIN_GAP`.
/// Deserialized values are not trusted: run them through [`ThresholdBand::restore`]
/// before use, which the controller does on initialization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdBand {
    low: f32,
    high: f32,
}

impl Default for ThresholdBand {
    fn default() -> Self {
        Self {
            low: MIN_PERCENT,
            high: MAX_PERCENT,
        }
    }
}

impl ThresholdBand {
    /// Builds a band from persisted edges, clamping both into a valid band.
    ///
    /// The low edge is normalized first so that it always leaves room for the high
    /// edge; the high edge is then clamped against it.
    pub fn restore(low: f32, high: f32) -> Result<Self, InitError> {
        if !low.is_finite() {
            return Err(InitError::NonFiniteThreshold {
                edge: BandEdge::Low,
                value: low,
            });
        }
        if !high.is_finite() {
            return Err(InitError::NonFiniteThreshold {
                edge: BandEdge::High,
                value: high,
            });
        }
        let low = low.clamp(MIN_PERCENT, MAX_PERCENT - MIN_GAP);
        let high = high.clamp(low + MIN_GAP, MAX_PERCENT);
        Ok(Self { low, high })
    }

    pub fn low(&self) -> f32 {
        self.low
    }

    pub fn high(&self) -> f32 {
        self.high
    }

    /// Returns the band with its low edge moved to `percent`, clamped to
    /// `[MIN_PERCENT, high - MIN_GAP]`. NaN leaves the band unchanged.
    pub fn with_low(self, percent: f32) -> Self {
        if percent.is_nan() {
            return self;
        }
        let low = percent
            .clamp(MIN_PERCENT, MAX_PERCENT)
            .min(self.high - MIN_GAP)
            .max(MIN_PERCENT);
        Self { low, ..self }
    }

    /// Returns the band with its high edge moved to `percent`, clamped to
    /// `[low + MIN_GAP, MAX_PERCENT]`. NaN leaves the band unchanged.
    pub fn with_high(self, percent: f32) -> Self {
        if percent.is_nan() {
            return self;
        }
        let high = percent
            .clamp(MIN_PERCENT, MAX_PERCENT)
            .max(self.low + MIN_GAP)
            .min(MAX_PERCENT);
        Self { high, ..self }
    }

    /// True when the invariant holds. Always the case for bands built through this API.
    pub fn is_valid(&self) -> bool {
        self.low >= MIN_PERCENT
            && self.high <= MAX_PERCENT
            && self.high >= self.low + MIN_GAP
    }
}

impl std::fmt::Display for ThresholdBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:.0}%, {:.0}%]", self.low, self.high)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn default_band_spans_full_range() {
        let band = ThresholdBand::default();
        assert!(close(band.low(), 15.0));
        assert!(close(band.high(), 85.0));
        assert!(band.is_valid());
    }

    #[test]
    fn low_above_high_clamps_to_gap() {
        let band = ThresholdBand::default().with_low(90.0);
        assert!(close(band.low(), 84.0), "low should be 84, got {}", band.low());
    }

    #[test]
    fn low_below_minimum_clamps_to_minimum() {
        let band = ThresholdBand::default().with_low(3.0);
        assert!(close(band.low(), MIN_PERCENT));
    }

    #[test]
    fn high_below_low_clamps_to_gap() {
        let band = ThresholdBand::default().with_low(40.0).with_high(10.0);
        assert!(close(band.high(), 41.0), "high should be 41, got {}", band.high());
    }

    #[test]
    fn high_above_maximum_clamps_to_maximum() {
        let band = ThresholdBand::default().with_high(99.0);
        assert!(close(band.high(), MAX_PERCENT));
    }

    #[test]
    fn nan_edit_is_ignored() {
        let band = ThresholdBand::default().with_low(30.0);
        assert_eq!(band.with_low(f32::NAN), band);
        assert_eq!(band.with_high(f32::NAN), band);
    }

    #[test]
    fn restore_normalizes_inverted_band() {
        let band = ThresholdBand::restore(70.0, 20.0).unwrap();
        assert!(close(band.low(), 70.0));
        assert!(close(band.high(), 71.0));
    }

    #[test]
    fn restore_pulls_low_below_maximum() {
        let band = ThresholdBand::restore(85.0, 85.0).unwrap();
        assert!(close(band.low(), 84.0));
        assert!(close(band.high(), 85.0));
    }

    #[test]
    fn restore_rejects_non_finite() {
        assert!(matches!(
            ThresholdBand::restore(f32::NAN, 50.0),
            Err(InitError::NonFiniteThreshold {
                edge: BandEdge::Low,
                ..
            })
        ));
        assert!(matches!(
            ThresholdBand::restore(20.0, f32::INFINITY),
            Err(InitError::NonFiniteThreshold {
                edge: BandEdge::High,
                ..
            })
        ));
    }
}
