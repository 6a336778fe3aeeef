//! Configuration for learning-rate controllers.
//!
//! Each controller is parameterized by a [`ControllerConfig`]: a meta
//! learning rate (the step size applied to the meta-gradient) and an
//! [`LrBounds`] clamp range. Preset constructors carry the per-variant
//! tuning of the reference implementation; plain-gradient variants use
//! wider bounds than adaptive-moment variants, whose underlying step
//! directions are naturally smaller.

use serde::{Deserialize, Serialize};

use crate::error::{ControllerError, Result};

/// Inclusive learning-rate clamp range.
///
/// Proposed rates outside the range saturate silently; callers cannot
/// observe whether clamping occurred.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LrBounds {
    /// Minimum allowed learning rate.
    pub min_lr: f64,
    /// Maximum allowed learning rate.
    pub max_lr: f64,
}

impl LrBounds {
    /// Create a new bounds pair.
    #[must_use]
    pub const fn new(min_lr: f64, max_lr: f64) -> Self {
        Self { min_lr, max_lr }
    }

    /// Clamp a proposed learning rate into the range.
    #[must_use]
    pub fn clamp(&self, lr: f64) -> f64 {
        lr.clamp(self.min_lr, self.max_lr)
    }
}

/// Configuration for a learning-rate controller.
///
/// # Example
///
/// ```
/// use hypergrad_lr_rs::ControllerConfig;
///
/// let config = ControllerConfig::immediate_gradient().with_meta_lr(5e-4);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Step size applied to the meta-gradient when updating a group's rate.
    pub meta_lr: f64,
    /// Clamp range for computed rates, fixed for the controller's lifetime.
    pub bounds: LrBounds,
}

impl ControllerConfig {
    /// Preset for the immediate-feedback controller on raw gradients.
    #[must_use]
    pub const fn immediate_gradient() -> Self {
        Self {
            meta_lr: 1e-4,
            bounds: LrBounds::new(1e-6, 0.5),
        }
    }

    /// Preset for the immediate-feedback controller on momentum buffers.
    #[must_use]
    pub const fn immediate_momentum() -> Self {
        Self {
            meta_lr: 1e-4,
            bounds: LrBounds::new(1e-6, 0.5),
        }
    }

    /// Preset for the immediate-feedback controller on adaptive-moment
    /// step directions.
    #[must_use]
    pub const fn immediate_adaptive() -> Self {
        Self {
            meta_lr: 1e-6,
            bounds: LrBounds::new(1e-6, 5e-3),
        }
    }

    /// Preset for the windowed controller on raw gradients.
    #[must_use]
    pub const fn windowed_gradient() -> Self {
        Self {
            meta_lr: 2e-4,
            bounds: LrBounds::new(1e-3, 0.2),
        }
    }

    /// Preset for the windowed controller on momentum buffers.
    #[must_use]
    pub const fn windowed_momentum() -> Self {
        Self {
            meta_lr: 5e-5,
            bounds: LrBounds::new(1e-3, 0.2),
        }
    }

    /// Preset for the windowed controller on adaptive-moment step directions.
    #[must_use]
    pub const fn windowed_adaptive() -> Self {
        Self {
            meta_lr: 1e-6,
            bounds: LrBounds::new(1e-5, 2e-3),
        }
    }

    /// Set the meta learning rate.
    #[must_use]
    pub const fn with_meta_lr(mut self, meta_lr: f64) -> Self {
        self.meta_lr = meta_lr;
        self
    }

    /// Set the clamp bounds.
    #[must_use]
    pub const fn with_bounds(mut self, bounds: LrBounds) -> Self {
        self.bounds = bounds;
        self
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::InvalidConfig`] if the meta learning rate
    /// is not finite, the minimum rate is not positive, or the range is
    /// empty.
    pub fn validate(&self) -> Result<()> {
        if !self.meta_lr.is_finite() {
            return Err(ControllerError::InvalidConfig(format!(
                "meta_lr must be finite, got {}",
                self.meta_lr
            )));
        }
        if self.bounds.min_lr <= 0.0 {
            return Err(ControllerError::InvalidConfig(format!(
                "min_lr must be positive, got {}",
                self.bounds.min_lr
            )));
        }
        if self.bounds.min_lr >= self.bounds.max_lr {
            return Err(ControllerError::InvalidConfig(format!(
                "min_lr {} must be below max_lr {}",
                self.bounds.min_lr, self.bounds.max_lr
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_validate() {
        for config in [
            ControllerConfig::immediate_gradient(),
            ControllerConfig::immediate_momentum(),
            ControllerConfig::immediate_adaptive(),
            ControllerConfig::windowed_gradient(),
            ControllerConfig::windowed_momentum(),
            ControllerConfig::windowed_adaptive(),
        ] {
            assert!(config.validate().is_ok());
        }
    }

    #[test]
    fn test_preset_values() {
        let config = ControllerConfig::windowed_gradient();
        assert!((config.meta_lr - 2e-4).abs() < 1e-12);
        assert!((config.bounds.min_lr - 1e-3).abs() < 1e-12);
        assert!((config.bounds.max_lr - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_builder() {
        let config = ControllerConfig::immediate_gradient()
            .with_meta_lr(3e-4)
            .with_bounds(LrBounds::new(1e-5, 0.1));
        assert!((config.meta_lr - 3e-4).abs() < 1e-12);
        assert!((config.bounds.max_lr - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_clamp_saturates() {
        let bounds = LrBounds::new(1e-4, 0.1);
        assert!((bounds.clamp(1e3) - 0.1).abs() < 1e-12);
        assert!((bounds.clamp(-5.0) - 1e-4).abs() < 1e-12);
        assert!((bounds.clamp(0.05) - 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_min_lr() {
        let config = ControllerConfig::immediate_gradient().with_bounds(LrBounds::new(0.0, 0.5));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_inverted_bounds() {
        let config = ControllerConfig::immediate_gradient().with_bounds(LrBounds::new(0.5, 0.1));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_non_finite_meta_lr() {
        let config = ControllerConfig::immediate_gradient().with_meta_lr(f64::NAN);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_serde_round_trip() {
        let config = ControllerConfig::windowed_adaptive();
        let json = serde_json::to_string(&config).unwrap();
        let back: ControllerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }
}
