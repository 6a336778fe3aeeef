//! Immediate-feedback learning-rate controller.
//!
//! Recomputes every group's learning rate on every optimization step from
//! the correlation between the previous step's update signal and the
//! current gradient — single-step memory. A positive correlation means
//! consecutive steps agree in direction and the rate can grow; a negative
//! one means the trajectory is oscillating and the rate shrinks.

use candle_core::Tensor;
use tracing::debug;

use crate::buffers;
use crate::config::ControllerConfig;
use crate::error::Result;
use crate::group::GroupView;
use crate::signal::{self, SignalKind};
use crate::LrController;

/// Immediate-feedback controller: one lagged signal per parameter.
///
/// # Example
///
/// ```no_run
/// use hypergrad_lr_rs::{GroupView, HyperGradientLr, LrController, ParamView};
/// # fn run(param: candle_core::Tensor, grad: candle_core::Tensor) -> hypergrad_lr_rs::Result<()> {
/// let groups = vec![GroupView::new(0.1, vec![ParamView::new(&param, Some(&grad))])];
/// let mut controller = HyperGradientLr::gradient(&groups)?;
///
/// // Once per optimization step, after the backward pass:
/// let rates = controller.compute_rates(&groups)?;
/// // Install `rates[g]` as group g's learning rate before the next step.
/// # Ok(())
/// # }
/// ```
pub struct HyperGradientLr {
    kind: SignalKind,
    config: ControllerConfig,
    /// Lagged update signal per group/param, zeroed at construction.
    lagged: Vec<Vec<Tensor>>,
}

impl HyperGradientLr {
    /// Create a controller with an explicit signal kind and configuration.
    ///
    /// Buffers are allocated zero-filled, shaped and placed like each
    /// parameter in `groups`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or buffer
    /// allocation fails.
    pub fn new(groups: &[GroupView<'_>], kind: SignalKind, config: ControllerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            kind,
            config,
            lagged: buffers::allocate(groups)?,
        })
    }

    /// Controller correlating raw gradients, with the tuned default config.
    ///
    /// # Errors
    ///
    /// Returns an error if buffer allocation fails.
    pub fn gradient(groups: &[GroupView<'_>]) -> Result<Self> {
        Self::new(groups, SignalKind::Gradient, ControllerConfig::immediate_gradient())
    }

    /// Controller correlating momentum buffers, with the tuned default config.
    ///
    /// # Errors
    ///
    /// Returns an error if buffer allocation fails.
    pub fn momentum(groups: &[GroupView<'_>]) -> Result<Self> {
        Self::new(groups, SignalKind::Momentum, ControllerConfig::immediate_momentum())
    }

    /// Controller correlating reconstructed adaptive-moment step directions,
    /// with the tuned default config.
    ///
    /// # Errors
    ///
    /// Returns an error if buffer allocation fails.
    pub fn adaptive(groups: &[GroupView<'_>]) -> Result<Self> {
        Self::new(groups, SignalKind::AdaptiveMoment, ControllerConfig::immediate_adaptive())
    }

    /// The controller's configuration.
    #[must_use]
    pub const fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Which signal this controller correlates against the gradient.
    #[must_use]
    pub const fn signal_kind(&self) -> SignalKind {
        self.kind
    }

    /// Zero all lagged buffers, forgetting the previous step's signal.
    ///
    /// # Errors
    ///
    /// Returns an error if a tensor operation fails.
    pub fn reset(&mut self) -> Result<()> {
        for group_buffers in &mut self.lagged {
            buffers::zero_group(group_buffers)?;
        }
        Ok(())
    }
}

impl LrController for HyperGradientLr {
    /// Compute new per-group learning rates from the current gradients.
    ///
    /// For each parameter with a gradient, the correlation
    /// `sum(lagged * grad)` is added to the group's meta-gradient and the
    /// lagged buffer is replaced by the current signal. Parameters without
    /// a gradient contribute nothing and their lagged buffer is zeroed —
    /// there is no signal to carry forward.
    fn compute_rates(&mut self, groups: &[GroupView<'_>]) -> Result<Vec<f64>> {
        buffers::check_topology(&self.lagged, groups)?;

        let mut rates = Vec::with_capacity(groups.len());
        for (g, group) in groups.iter().enumerate() {
            let mut corr = 0.0;
            for (i, view) in group.params.iter().enumerate() {
                let buffer = &mut self.lagged[g][i];
                if let Some(grad) = view.grad {
                    buffers::check_shape(buffer, grad, g, i)?;
                    corr += signal::correlation(buffer, grad)?;
                    *buffer = signal::extract(self.kind, view, grad, &group.hyper, g, i)?;
                } else {
                    *buffer = buffer.zeros_like()?;
                }
            }
            let rate = self.config.bounds.clamp(group.lr + self.config.meta_lr * corr);
            debug!(group = g, meta_grad = corr, lr = rate, "hypergradient rate");
            rates.push(rate);
        }
        Ok(rates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::ParamView;
    use candle_core::Device;

    fn tensor(vals: &[f32]) -> Tensor {
        Tensor::new(vals, &Device::Cpu).unwrap()
    }

    #[test]
    fn test_first_step_has_zero_correlation() {
        let param = tensor(&[1.0]);
        let grad = tensor(&[2.0]);
        let groups = vec![GroupView::new(0.1, vec![ParamView::new(&param, Some(&grad))])];
        let mut controller = HyperGradientLr::gradient(&groups).unwrap();

        let rates = controller.compute_rates(&groups).unwrap();
        assert_eq!(rates.len(), 1);
        assert!((rates[0] - 0.1).abs() < 1e-9, "lagged buffer starts at zero");
    }

    #[test]
    fn test_second_step_correlates_against_lagged_gradient() {
        let param = tensor(&[1.0]);
        let g1 = tensor(&[2.0]);
        let g2 = tensor(&[3.0]);

        let step1 = vec![GroupView::new(0.1, vec![ParamView::new(&param, Some(&g1))])];
        let mut controller =
            HyperGradientLr::new(&step1, SignalKind::Gradient, ControllerConfig::immediate_gradient().with_meta_lr(0.1))
                .unwrap();
        controller.compute_rates(&step1).unwrap();

        let step2 = vec![GroupView::new(0.1, vec![ParamView::new(&param, Some(&g2))])];
        let rates = controller.compute_rates(&step2).unwrap();
        // corr = 2.0 * 3.0, proposed = 0.1 + 0.1 * 6.0 = 0.7, clamped to 0.5.
        assert!((rates[0] - 0.5).abs() < 1e-9, "rate = {}", rates[0]);
    }

    #[test]
    fn test_missing_gradient_zeroes_lagged_buffer() {
        let param = tensor(&[1.0]);
        let g1 = tensor(&[2.0]);
        let g3 = tensor(&[5.0]);

        let step1 = vec![GroupView::new(0.1, vec![ParamView::new(&param, Some(&g1))])];
        let mut controller = HyperGradientLr::gradient(&step1).unwrap();
        controller.compute_rates(&step1).unwrap();

        // No gradient: zero contribution, buffer reset.
        let step2 = vec![GroupView::new(0.1, vec![ParamView::new(&param, None)])];
        let rates = controller.compute_rates(&step2).unwrap();
        assert!((rates[0] - 0.1).abs() < 1e-9);

        // The zeroed buffer makes the next correlation zero too.
        let step3 = vec![GroupView::new(0.1, vec![ParamView::new(&param, Some(&g3))])];
        let rates = controller.compute_rates(&step3).unwrap();
        assert!((rates[0] - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_negative_correlation_shrinks_rate() {
        let param = tensor(&[1.0]);
        let g1 = tensor(&[2.0]);
        let g2 = tensor(&[-2.0]);

        let step1 = vec![GroupView::new(0.01, vec![ParamView::new(&param, Some(&g1))])];
        let mut controller =
            HyperGradientLr::new(&step1, SignalKind::Gradient, ControllerConfig::immediate_gradient().with_meta_lr(1e-3))
                .unwrap();
        controller.compute_rates(&step1).unwrap();

        let step2 = vec![GroupView::new(0.01, vec![ParamView::new(&param, Some(&g2))])];
        let rates = controller.compute_rates(&step2).unwrap();
        // corr = -4.0, proposed = 0.01 - 0.004 = 0.006.
        assert!((rates[0] - 0.006).abs() < 1e-9, "rate = {}", rates[0]);
    }

    #[test]
    fn test_rates_stay_within_bounds() {
        let param = tensor(&[1.0]);
        let huge = tensor(&[1e6]);

        let step1 = vec![GroupView::new(0.1, vec![ParamView::new(&param, Some(&huge))])];
        let mut controller = HyperGradientLr::gradient(&step1).unwrap();
        controller.compute_rates(&step1).unwrap();

        let rates = controller.compute_rates(&step1).unwrap();
        assert!((rates[0] - 0.5).abs() < 1e-9, "clamped to max_lr");
    }

    #[test]
    fn test_group_count_change_is_an_error() {
        let param = tensor(&[1.0]);
        let groups = vec![GroupView::new(0.1, vec![ParamView::new(&param, None)])];
        let mut controller = HyperGradientLr::gradient(&groups).unwrap();

        let two = vec![
            GroupView::new(0.1, vec![ParamView::new(&param, None)]),
            GroupView::new(0.2, vec![ParamView::new(&param, None)]),
        ];
        assert!(controller.compute_rates(&two).is_err());
    }

    #[test]
    fn test_reset_zeroes_lagged_signal() {
        let param = tensor(&[1.0]);
        let grad = tensor(&[2.0]);
        let groups = vec![GroupView::new(0.1, vec![ParamView::new(&param, Some(&grad))])];
        let mut controller = HyperGradientLr::gradient(&groups).unwrap();
        controller.compute_rates(&groups).unwrap();
        controller.reset().unwrap();

        // After reset the next call sees a zero lagged buffer again.
        let rates = controller.compute_rates(&groups).unwrap();
        assert!((rates[0] - 0.1).abs() < 1e-9);
    }
}
