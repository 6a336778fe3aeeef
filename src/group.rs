//! Read-only views of the base optimizer's parameter groups.
//!
//! The controllers never reach into a live optimizer. Instead the host
//! builds a [`GroupView`] per parameter group each step, borrowing exactly
//! the fields the controllers depend on: the parameter tensor, its gradient
//! (absent when no backward pass touched it), the group's current learning
//! rate and hyperparameters, and — for the momentum and adaptive-moment
//! variants — the optimizer-internal per-parameter state. The borrows make
//! the read-only contract explicit: the controller can observe the
//! optimizer's state but never mutate it.
//!
//! Ordering contract: views must reflect the state as of the most recent
//! completed optimizer step, and momentum / adaptive-moment state must not
//! have been advanced past the gradient it was produced with when the
//! controller reads it.

use candle_core::Tensor;
use serde::{Deserialize, Serialize};

/// Hyperparameters shared by one parameter group.
///
/// Only the fields the adaptive-moment signal reconstruction needs are
/// carried; groups driven by plain gradient or momentum signals can use
/// [`GroupHyperParams::default`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroupHyperParams {
    /// Exponential decay rates for the first and second moment estimates.
    pub betas: (f64, f64),
    /// Denominator epsilon.
    pub eps: f64,
    /// Decoupled L2 penalty coefficient; `0.0` disables it.
    pub weight_decay: f64,
}

impl Default for GroupHyperParams {
    fn default() -> Self {
        Self {
            betas: (0.9, 0.999),
            eps: 1e-8,
            weight_decay: 0.0,
        }
    }
}

/// Per-parameter optimizer-internal state, borrowed read-only.
#[derive(Debug, Clone, Copy)]
pub enum SlotState<'a> {
    /// No optimizer-internal state (plain gradient descent).
    None,
    /// Momentum buffer: exponential moving average of past gradients.
    Momentum {
        /// The momentum buffer, shaped like the parameter.
        buffer: &'a Tensor,
    },
    /// Adaptive-moment state as of the most recent completed optimizer step.
    AdaptiveMoment {
        /// First moment estimate.
        exp_avg: &'a Tensor,
        /// Second (uncentered) moment estimate.
        exp_avg_sq: &'a Tensor,
        /// Completed optimizer step count; at least 1 once state exists.
        step: u64,
    },
}

/// One parameter slot as seen at the current step.
#[derive(Debug, Clone, Copy)]
pub struct ParamView<'a> {
    /// The parameter tensor.
    pub param: &'a Tensor,
    /// Gradient from the most recent backward pass, if any.
    pub grad: Option<&'a Tensor>,
    /// Optimizer-internal state for this parameter.
    pub state: SlotState<'a>,
}

impl<'a> ParamView<'a> {
    /// View of a parameter with a plain gradient and no optimizer state.
    #[must_use]
    pub const fn new(param: &'a Tensor, grad: Option<&'a Tensor>) -> Self {
        Self {
            param,
            grad,
            state: SlotState::None,
        }
    }

    /// Attach optimizer-internal state to the view.
    #[must_use]
    pub const fn with_state(mut self, state: SlotState<'a>) -> Self {
        self.state = state;
        self
    }
}

/// Read-only view of one parameter group.
#[derive(Debug, Clone)]
pub struct GroupView<'a> {
    /// The group's current learning rate.
    pub lr: f64,
    /// The group's optimizer hyperparameters.
    pub hyper: GroupHyperParams,
    /// Ordered parameter slots. Order must be stable across calls; buffers
    /// are keyed by position within the group.
    pub params: Vec<ParamView<'a>>,
}

impl<'a> GroupView<'a> {
    /// Create a group view with default hyperparameters.
    #[must_use]
    pub fn new(lr: f64, params: Vec<ParamView<'a>>) -> Self {
        Self {
            lr,
            hyper: GroupHyperParams::default(),
            params,
        }
    }

    /// Set the group hyperparameters.
    #[must_use]
    pub fn with_hyper(mut self, hyper: GroupHyperParams) -> Self {
        self.hyper = hyper;
        self
    }

    /// Number of parameters in the group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Whether the group has no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}
