//! Residual block interface, as consumed by nonlinear least squares solvers
use nalgebra::SMatrix;

use crate::prelude::Error;

/// Per parameter block Jacobian output slots (row major).
/// A `None` slot means this block's Jacobian is not requested.
pub type JacobianSlots<'a, 'b> = &'a mut [Option<&'b mut [f64]>];

/// [ResidualBlock] evaluates a weighted residual and its Jacobians
/// for the current parameter values. Implementations are immutable
/// once built and may be evaluated concurrently.
pub trait ResidualBlock: Send + Sync {
    /// Residual dimension
    fn num_residuals(&self) -> usize;

    /// Ambient dimension of each parameter block
    fn parameter_block_sizes(&self) -> &'static [usize];

    /// Minimal (tangent space) dimension of each parameter block
    fn minimal_parameter_block_sizes(&self) -> &'static [usize];

    /// Evaluates residuals and (optionally) ambient and minimal Jacobians.
    fn evaluate_with_minimal_jacobians(
        &self,
        parameters: &[&[f64]],
        residuals: &mut [f64],
        jacobians: Option<JacobianSlots>,
        jacobians_minimal: Option<JacobianSlots>,
    ) -> Result<(), Error>;

    /// Evaluates residuals and (optionally) ambient Jacobians.
    fn evaluate(
        &self,
        parameters: &[&[f64]],
        residuals: &mut [f64],
        jacobians: Option<JacobianSlots>,
    ) -> Result<(), Error> {
        self.evaluate_with_minimal_jacobians(parameters, residuals, jacobians, None)
    }
}

/// Returns the slot for this block, if any was requested.
pub(crate) fn requested<'s>(
    slots: &'s mut Option<JacobianSlots<'_, '_>>,
    block: usize,
) -> Option<&'s mut [f64]> {
    slots
        .as_mut()
        .and_then(|slots| slots.get_mut(block))
        .and_then(|slot| slot.as_deref_mut())
}

/// Writes this 1×N row into a Jacobian slot
pub(crate) fn write_row<const N: usize>(
    slot: &mut [f64],
    row: &SMatrix<f64, 1, N>,
) -> Result<(), Error> {
    if slot.len() != N {
        return Err(Error::JacobianDimension);
    }
    slot.copy_from_slice(row.as_slice());
    Ok(())
}

/// Checks Jacobian slots against the parameter block sizes, prior to any write:
/// one slot per block, and requested slots of the block dimension.
pub(crate) fn validate_slots(
    slots: &Option<JacobianSlots<'_, '_>>,
    block_sizes: &[usize],
) -> Result<(), Error> {
    let Some(slots) = slots else {
        return Ok(());
    };

    if slots.len() != block_sizes.len() {
        return Err(Error::JacobianDimension);
    }

    let valid = slots
        .iter()
        .zip(block_sizes.iter())
        .all(|(slot, size)| slot.as_ref().map_or(true, |slot| slot.len() == *size));

    if valid {
        Ok(())
    } else {
        Err(Error::JacobianDimension)
    }
}
