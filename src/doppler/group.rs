//! Supported parameter block layouts
use itertools::Itertools;
use nalgebra::{UnitQuaternion, Vector3};

use crate::{
    pose::{pose_position, pose_quaternion, AmbientPose},
    prelude::Error,
};

/// [ParameterGroup] identifies the state layout a Doppler residual expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterGroup {
    /// Receiver states expressed directly in ECEF:
    /// position (3), velocity (3), clock frequency drift (1).
    Direct,
    /// Platform states expressed in the local (ENU) frame:
    /// pose (7 = position + quaternion), speed and biases (9),
    /// receiver lever arm in body frame (3), clock frequency drift (1).
    Platform,
}

impl std::fmt::Display for ParameterGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Direct => write!(f, "direct (ECEF)"),
            Self::Platform => write!(f, "platform (ENU)"),
        }
    }
}

impl ParameterGroup {
    const DIRECT_SIZES: [usize; 3] = [3, 3, 1];
    const PLATFORM_SIZES: [usize; 4] = [7, 9, 3, 1];
    const PLATFORM_MINIMAL_SIZES: [usize; 4] = [6, 9, 3, 1];

    /// Resolves the [ParameterGroup] from the declared parameter block sizes.
    pub fn from_block_sizes(sizes: &[usize]) -> Result<Self, Error> {
        if sizes == Self::DIRECT_SIZES {
            Ok(Self::Direct)
        } else if sizes == Self::PLATFORM_SIZES {
            Ok(Self::Platform)
        } else {
            Err(Error::InvalidParameterSignature(sizes.iter().join(",")))
        }
    }

    /// Ambient parameter block sizes
    pub fn block_sizes(&self) -> &'static [usize] {
        match self {
            Self::Direct => &Self::DIRECT_SIZES,
            Self::Platform => &Self::PLATFORM_SIZES,
        }
    }

    /// Minimal (tangent space) parameter block sizes
    pub fn minimal_block_sizes(&self) -> &'static [usize] {
        match self {
            Self::Direct => &Self::DIRECT_SIZES,
            Self::Platform => &Self::PLATFORM_MINIMAL_SIZES,
        }
    }

    /// Decodes current parameter values into [States]
    pub(crate) fn decode(&self, parameters: &[&[f64]]) -> Result<States, Error> {
        let sizes = self.block_sizes();

        if parameters.len() != sizes.len()
            || parameters
                .iter()
                .zip(sizes.iter())
                .any(|(block, size)| block.len() != *size)
        {
            return Err(Error::ParameterBlockDimension);
        }

        match self {
            Self::Direct => Ok(States::Direct(DirectStates {
                position_ecef_m: Vector3::from_column_slice(parameters[0]),
                velocity_ecef_m_s: Vector3::from_column_slice(parameters[1]),
                clock_drift_m_s: parameters[2][0],
            })),
            Self::Platform => {
                let pose = AmbientPose::from_column_slice(parameters[0]);
                Ok(States::Platform(PlatformStates {
                    position_enu_m: pose_position(&pose),
                    attitude: UnitQuaternion::from_quaternion(pose_quaternion(&pose)),
                    pose,
                    velocity_enu_m_s: Vector3::from_column_slice(&parameters[1][..3]),
                    lever_arm_m: Vector3::from_column_slice(parameters[2]),
                    clock_drift_m_s: parameters[3][0],
                }))
            },
        }
    }
}

/// Receiver states, in ECEF
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct DirectStates {
    pub position_ecef_m: Vector3<f64>,
    pub velocity_ecef_m_s: Vector3<f64>,
    pub clock_drift_m_s: f64,
}

/// Platform states, in the local (ENU) frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct PlatformStates {
    /// Raw ambient pose, as stored by the solver
    pub pose: AmbientPose,
    pub position_enu_m: Vector3<f64>,
    /// Body to ENU rotation
    pub attitude: UnitQuaternion<f64>,
    pub velocity_enu_m_s: Vector3<f64>,
    /// Receiver position in body frame
    pub lever_arm_m: Vector3<f64>,
    pub clock_drift_m_s: f64,
}

/// Decoded parameter values
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum States {
    Direct(DirectStates),
    Platform(PlatformStates),
}

impl States {
    pub fn clock_drift_m_s(&self) -> f64 {
        match self {
            Self::Direct(states) => states.clock_drift_m_s,
            Self::Platform(states) => states.clock_drift_m_s,
        }
    }
}
