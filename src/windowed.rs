//! Windowed learning-rate controller.
//!
//! Decouples correlation accumulation (cheap, once per optimization step)
//! from the rate adjustment (once per window of `num_batch` steps). Each
//! [`WindowedLr::accumulate`] call correlates the current gradient against
//! the running sum of signals collected so far in the window, so the
//! meta-gradient measures sustained directional consistency across the
//! window rather than agreement between two single steps.

use candle_core::Tensor;
use tracing::{debug, trace};

use crate::buffers;
use crate::config::ControllerConfig;
use crate::error::{ControllerError, Result};
use crate::group::GroupView;
use crate::signal::{self, SignalKind};
use crate::LrController;

/// Windowed controller: accumulated signal sums plus one meta-gradient
/// scalar per group.
///
/// # Example
///
/// ```no_run
/// use hypergrad_lr_rs::{GroupView, LrController, ParamView, WindowedLr};
/// # fn run(param: candle_core::Tensor, grad: candle_core::Tensor) -> hypergrad_lr_rs::Result<()> {
/// let groups = vec![GroupView::new(0.05, vec![ParamView::new(&param, Some(&grad))])];
/// let mut controller = WindowedLr::gradient(&groups)?;
///
/// let window = 100;
/// for step in 0..1_000 {
///     // ... backward pass, rebuild views ...
///     controller.accumulate(&groups, window)?;
///     if (step + 1) % window == 0 {
///         let rates = controller.compute_rates(&groups)?;
///         // Install the rates on the base optimizer.
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub struct WindowedLr {
    kind: SignalKind,
    config: ControllerConfig,
    /// Running sum of update signals per group/param within the window.
    accumulated: Vec<Vec<Tensor>>,
    /// Accumulated meta-gradient per group.
    last_lr_grad: Vec<f64>,
}

impl WindowedLr {
    /// Create a controller with an explicit signal kind and configuration.
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
            accumulated: buffers::allocate(groups)?,
            last_lr_grad: vec![0.0; groups.len()],
        })
    }

    /// Controller accumulating raw gradients, with the tuned default config.
    ///
    /// # Errors
    ///
    /// Returns an error if buffer allocation fails.
    pub fn gradient(groups: &[GroupView<'_>]) -> Result<Self> {
        Self::new(groups, SignalKind::Gradient, ControllerConfig::windowed_gradient())
    }

    /// Controller accumulating momentum buffers, with the tuned default config.
    ///
    /// # Errors
    ///
    /// Returns an error if buffer allocation fails.
    pub fn momentum(groups: &[GroupView<'_>]) -> Result<Self> {
        Self::new(groups, SignalKind::Momentum, ControllerConfig::windowed_momentum())
    }

    /// Controller accumulating reconstructed adaptive-moment step
    /// directions, with the tuned default config.
    ///
    /// # Errors
    ///
    /// Returns an error if buffer allocation fails.
    pub fn adaptive(groups: &[GroupView<'_>]) -> Result<Self> {
        Self::new(groups, SignalKind::AdaptiveMoment, ControllerConfig::windowed_adaptive())
    }

    /// Fold the current step's correlation into the window.
    ///
    /// Call exactly once per optimization step, after the backward pass and
    /// before the base optimizer advances its internal state. For each
    /// parameter with a gradient, the correlation against the buffer's
    /// pre-update running sum is added to the group's meta-gradient
    /// (scaled by `1 / num_batch`), then the current signal is added to the
    /// buffer. Parameters without a gradient are skipped entirely: their
    /// buffer keeps the window's partial sum.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::InvalidConfig`] when `num_batch` is zero,
    /// or a state/shape error when the views are inconsistent.
    #[allow(clippy::cast_precision_loss)]
    pub fn accumulate(&mut self, groups: &[GroupView<'_>], num_batch: usize) -> Result<()> {
        if num_batch == 0 {
            return Err(ControllerError::InvalidConfig(
                "num_batch must be non-zero".to_string(),
            ));
        }
        buffers::check_topology(&self.accumulated, groups)?;

        for (g, group) in groups.iter().enumerate() {
            let mut corr = 0.0;
            for (i, view) in group.params.iter().enumerate() {
                let Some(grad) = view.grad else {
                    continue;
                };
                let buffer = &mut self.accumulated[g][i];
                buffers::check_shape(buffer, grad, g, i)?;
                corr += signal::correlation(buffer, grad)?;
                let current = signal::extract(self.kind, view, grad, &group.hyper, g, i)?;
                *buffer = buffer.add(&current)?;
            }
            self.last_lr_grad[g] += corr / num_batch as f64;
            trace!(group = g, step_corr = corr, acc = self.last_lr_grad[g], "window accumulate");
        }
        Ok(())
    }

    /// The accumulated meta-gradient for one group, if the group exists.
    #[must_use]
    pub fn last_lr_grad(&self, group: usize) -> Option<f64> {
        self.last_lr_grad.get(group).copied()
    }

    /// The controller's configuration.
    #[must_use]
    pub const fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Which signal this controller accumulates.
    #[must_use]
    pub const fn signal_kind(&self) -> SignalKind {
        self.kind
    }

    /// Discard the current window: zero all buffers and meta-gradients.
    ///
    /// # Errors
    ///
    /// Returns an error if a tensor operation fails.
    pub fn reset(&mut self) -> Result<()> {
        for group_buffers in &mut self.accumulated {
            buffers::zero_group(group_buffers)?;
        }
        self.last_lr_grad.fill(0.0);
        Ok(())
    }
}

impl LrController for WindowedLr {
    /// Fold the window's meta-gradient into each group's learning rate.
    ///
    /// Call once per window boundary. Clamps `lr + meta_lr * last_lr_grad`
    /// per group, then starts a fresh window: the group's meta-gradient and
    /// every accumulated buffer are reset to zero.
    fn compute_rates(&mut self, groups: &[GroupView<'_>]) -> Result<Vec<f64>> {
        buffers::check_topology(&self.accumulated, groups)?;

        let mut rates = Vec::with_capacity(groups.len());
        for (g, group) in groups.iter().enumerate() {
            let rate = self
                .config
                .bounds
                .clamp(group.lr + self.config.meta_lr * self.last_lr_grad[g]);
            debug!(group = g, meta_grad = self.last_lr_grad[g], lr = rate, "windowed rate");
            rates.push(rate);

            self.last_lr_grad[g] = 0.0;
            buffers::zero_group(&mut self.accumulated[g])?;
        }
        Ok(rates)
    }
}
