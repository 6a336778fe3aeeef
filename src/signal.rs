//! Per-parameter update-signal extraction.
//!
//! Both controller families correlate the current gradient against a lagged
//! or accumulated copy of an update signal. The three variants differ only
//! in which signal they read, so extraction is factored into one place and
//! the accumulate/correlate/clamp logic stays identical across variants.
//!
//! The adaptive-moment variant is the delicate one: it recomputes the
//! bias-corrected step direction the base optimizer would itself take,
//! from the optimizer's stored moments, without advancing them.

use candle_core::Tensor;
use serde::{Deserialize, Serialize};

use crate::error::{ControllerError, Result};
use crate::group::{GroupHyperParams, ParamView, SlotState};

/// Which per-parameter signal a controller correlates against the gradient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalKind {
    /// The raw gradient itself (plain gradient descent).
    Gradient,
    /// The base optimizer's momentum buffer.
    Momentum,
    /// The base optimizer's bias-corrected first/second moment ratio,
    /// reconstructed from its stored moments.
    AdaptiveMoment,
}

/// Reconstruct the bias-corrected adaptive-moment step direction.
///
/// Mirrors the arithmetic the base adaptive-moment optimizer performs for
/// its own parameter update, evaluated without advancing `exp_avg`,
/// `exp_avg_sq`, or `step`:
///
/// ```text
/// g'     = grad + weight_decay * param        (when weight_decay != 0)
/// numer  = (beta1 * m + (1 - beta1) * g') / (1 - beta1^t)
/// denom  = sqrt(beta2 * v + (1 - beta2) * g'^2) / sqrt(1 - beta2^t) + eps
/// signal = numer / denom
/// ```
///
/// Deterministic: identical inputs produce identical outputs.
///
/// # Errors
///
/// Returns a tensor error if shapes or devices are inconsistent.
#[allow(clippy::cast_precision_loss)]
pub fn adaptive_moment_direction(
    param: &Tensor,
    grad: &Tensor,
    exp_avg: &Tensor,
    exp_avg_sq: &Tensor,
    step: u64,
    hyper: &GroupHyperParams,
) -> Result<Tensor> {
    let (beta1, beta2) = hyper.betas;
    let bias_correction1 = 1.0 - beta1.powf(step as f64);
    let bias_correction2 = 1.0 - beta2.powf(step as f64);

    let grad = if hyper.weight_decay == 0.0 {
        grad.clone()
    } else {
        grad.add(&param.affine(hyper.weight_decay, 0.0)?)?
    };

    let numer = exp_avg
        .affine(beta1, 0.0)?
        .add(&grad.affine(1.0 - beta1, 0.0)?)?
        .affine(1.0 / bias_correction1, 0.0)?;
    let denom = exp_avg_sq
        .affine(beta2, 0.0)?
        .add(&grad.sqr()?.affine(1.0 - beta2, 0.0)?)?
        .sqrt()?
        .affine(1.0 / bias_correction2.sqrt(), hyper.eps)?;

    Ok(numer.div(&denom)?)
}

/// Extract the current update signal for one parameter slot.
///
/// Callers handle the missing-gradient case themselves; `grad` here is the
/// gradient that is known to be present for this step.
pub(crate) fn extract(
    kind: SignalKind,
    view: &ParamView<'_>,
    grad: &Tensor,
    hyper: &GroupHyperParams,
    group: usize,
    param: usize,
) -> Result<Tensor> {
    match kind {
        SignalKind::Gradient => Ok(grad.clone()),
        SignalKind::Momentum => match view.state {
            SlotState::Momentum { buffer } => Ok(buffer.clone()),
            _ => Err(ControllerError::MissingState {
                group,
                param,
                what: "momentum buffer",
            }),
        },
        SignalKind::AdaptiveMoment => match view.state {
            SlotState::AdaptiveMoment {
                exp_avg,
                exp_avg_sq,
                step,
            } => {
                if step == 0 {
                    return Err(ControllerError::MissingState {
                        group,
                        param,
                        what: "adaptive-moment state read before first optimizer step",
                    });
                }
                adaptive_moment_direction(view.param, grad, exp_avg, exp_avg_sq, step, hyper)
            }
            _ => Err(ControllerError::MissingState {
                group,
                param,
                what: "first/second moment state",
            }),
        },
    }
}

/// Elementwise product of buffer and gradient, summed to a scalar.
pub(crate) fn correlation(buffer: &Tensor, grad: &Tensor) -> Result<f64> {
    Ok(f64::from(buffer.mul(grad)?.sum_all()?.to_scalar::<f32>()?))
}
