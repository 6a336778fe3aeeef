//! # hypergrad-lr-rs
//!
//! Online learning-rate adaptation via hypergradients: instead of following
//! a fixed schedule, each parameter group's learning rate follows an
//! estimated meta-gradient — the correlation between the current gradient
//! and the update signal used previously. When consecutive updates agree in
//! direction the rate grows; when they fight each other it shrinks. All
//! rates saturate inside fixed per-variant bounds.
//!
//! ## Controller families
//!
//! - [`HyperGradientLr`]: immediate feedback. Every call correlates the
//!   current gradient against the previous step's signal and returns new
//!   rates. Single-step memory.
//! - [`WindowedLr`]: windowed feedback. [`WindowedLr::accumulate`] folds a
//!   correlation into the window once per step; `compute_rates` applies the
//!   accumulated meta-gradient once per window and starts a fresh one.
//!
//! Each family supports three update signals, selected by [`SignalKind`]:
//! the raw gradient, the base optimizer's momentum buffer, or the
//! bias-corrected adaptive-moment step direction reconstructed from the
//! optimizer's stored moments (see [`adaptive_moment_direction`]).
//!
//! ## Quick start
//!
//! ```no_run
//! use hypergrad_lr_rs::{GroupView, HyperGradientLr, LrController, ParamView};
//! # fn run(param: candle_core::Tensor, grad: candle_core::Tensor) -> hypergrad_lr_rs::Result<()> {
//! // Build read-only views of the base optimizer's groups each step.
//! let groups = vec![GroupView::new(0.1, vec![ParamView::new(&param, Some(&grad))])];
//!
//! let mut controller = HyperGradientLr::gradient(&groups)?;
//! let rates = controller.compute_rates(&groups)?;
//! // The caller installs rates[g] as group g's learning rate.
//! # Ok(())
//! # }
//! ```
//!
//! ## Contracts
//!
//! - The controller only ever reads the optimizer's state; buffers it owns
//!   are invisible to the optimizer.
//! - Views must reflect the most recent completed backward pass, and for
//!   momentum / adaptive-moment signals the optimizer must not have
//!   advanced its internal state past that gradient yet.
//! - Group order and per-group parameter order must be stable across calls;
//!   count changes are reported as errors.
//!
//! ## Modules
//!
//! - [`config`]: meta learning rate and clamp bounds, per-variant presets
//! - [`error`]: error types and result alias
//! - [`group`]: read-only views of the base optimizer's parameter groups
//! - [`signal`]: update-signal extraction, adaptive-moment reconstruction
//! - [`hypergrad`]: immediate-feedback controller family
//! - [`windowed`]: windowed controller family

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod group;
pub mod hypergrad;
pub mod signal;
pub mod windowed;

mod buffers;

pub use config::{ControllerConfig, LrBounds};
pub use error::{ControllerError, Result};
pub use group::{GroupHyperParams, GroupView, ParamView, SlotState};
pub use hypergrad::HyperGradientLr;
pub use signal::{adaptive_moment_direction, SignalKind};
pub use windowed::WindowedLr;

/// Common interface of the learning-rate controllers.
///
/// `compute_rates` is a pure function of the controller's state and the
/// supplied views; the returned values become the groups' learning rates
/// for the next step once the caller installs them on the base optimizer.
pub trait LrController {
    /// Compute new per-group learning rates, in group order.
    ///
    /// # Errors
    ///
    /// Returns an error when the views' topology no longer matches
    /// construction, required optimizer state is missing, or a tensor
    /// operation fails.
    fn compute_rates(&mut self, groups: &[GroupView<'_>]) -> Result<Vec<f64>>;
}
