//! Controller-owned per-parameter buffer state.
//!
//! Buffers are allocated zero-filled at construction, one per parameter per
//! group, shaped and placed like the parameter they shadow (`zeros_like`
//! guarantees the shape/device match). They are exclusively owned by the
//! controller; the base optimizer never sees them.

use candle_core::Tensor;

use crate::error::{ControllerError, Result};
use crate::group::GroupView;

/// Allocate one zero buffer per parameter per group.
pub(crate) fn allocate(groups: &[GroupView<'_>]) -> Result<Vec<Vec<Tensor>>> {
    groups
        .iter()
        .map(|group| {
            group
                .params
                .iter()
                .map(|view| Ok(view.param.zeros_like()?))
                .collect()
        })
        .collect()
}

/// Zero-fill every buffer of one group.
pub(crate) fn zero_group(buffers: &mut [Tensor]) -> Result<()> {
    for buffer in buffers {
        *buffer = buffer.zeros_like()?;
    }
    Ok(())
}

/// Verify the group/param topology still matches construction.
///
/// Group membership changing under the controller would silently misalign
/// the positional buffers, so counts are re-checked on every call.
pub(crate) fn check_topology(buffers: &[Vec<Tensor>], groups: &[GroupView<'_>]) -> Result<()> {
    if buffers.len() != groups.len() {
        return Err(ControllerError::GroupCountMismatch {
            expected: buffers.len(),
            actual: groups.len(),
        });
    }
    for (g, (group_buffers, group)) in buffers.iter().zip(groups).enumerate() {
        if group_buffers.len() != group.params.len() {
            return Err(ControllerError::ParamCountMismatch {
                group: g,
                expected: group_buffers.len(),
                actual: group.params.len(),
            });
        }
    }
    Ok(())
}

/// Verify a gradient is shaped like its buffer.
pub(crate) fn check_shape(
    buffer: &Tensor,
    grad: &Tensor,
    group: usize,
    param: usize,
) -> Result<()> {
    if buffer.dims() != grad.dims() {
        return Err(ControllerError::ShapeMismatch {
            group,
            param,
            expected: buffer.dims().to_vec(),
            actual: grad.dims().to_vec(),
        });
    }
    Ok(())
}
