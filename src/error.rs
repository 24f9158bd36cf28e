use anise::errors::PhysicsError;
use thiserror::Error;

use crate::prelude::Constellation;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// The parameter blocks bound to a [DopplerError](crate::prelude::DopplerError)
    /// match neither supported layout: {3,3,1} (direct ECEF states)
    /// or {7,9,3,1} (platform pose, speed and biases, lever arm, clock drift).
    /// This is a setup error, the residual block must not be used.
    #[error("invalid parameter block signature: [{0}]")]
    InvalidParameterSignature(String),

    /// Platform states are expressed in a local tangent frame.
    /// Evaluating them requires the shared [Coordinate](crate::prelude::Coordinate)
    /// to have its origin established beforehand.
    #[error("coordinate reference (local origin) is not set")]
    MissingCoordinateReference,

    /// Noise configuration leads to a covariance that is not positive definite:
    /// null or negative error factors, or non finite values.
    #[error("degenerate weighting: covariance is not positive definite")]
    DegenerateWeighting,

    /// Noise configuration does not define an error ratio for this constellation.
    #[error("no error ratio defined for {0}")]
    MissingSystemErrorRatio(Constellation),

    /// Satellite index does not exist in the measurement.
    #[error("invalid measurement index #{0}")]
    InvalidMeasurementIndex(usize),

    /// Parameter values presented at evaluation time do not match
    /// the declared parameter blocks.
    #[error("parameter block dimension mismatch")]
    ParameterBlockDimension,

    /// Residual output slot does not have the expected length.
    #[error("residual dimension mismatch")]
    ResidualDimension,

    /// Jacobian slots do not match the parameter blocks: wrong number of slots,
    /// or a requested slot with the wrong length. Nothing is written.
    #[error("jacobian slot dimension mismatch")]
    JacobianDimension,

    /// Receiver position coincides with the satellite position:
    /// the line of sight is not defined.
    #[error("null geometric range: receiver is at the satellite position")]
    NullRange,

    /// Rotations are only defined between cartesian frames (ECEF, ENU).
    #[error("rotation involving a non cartesian frame")]
    NonCartesianFrame,

    /// Any physical non sense detected by ANISE, while converting coordinates.
    #[error("physics issue: {0}")]
    Physics(PhysicsError),
}
