//! Doppler residual block
use std::sync::Arc;

use log::{debug, error};
use nalgebra::{RowVector3, SMatrix, Vector3, U1};

use crate::{
    constants::{EARTH_ANGULAR_VEL_RAD, SPEED_OF_LIGHT_M_S},
    coordinate::{Coordinate, LocalFrame},
    measurement::{GnssMeasurement, Observation, SatelliteState},
    pose::{PoseLocalParameterization, PoseParameterization},
    prelude::{Epoch, Error, ErrorParameters},
    residual::{requested, validate_slots, write_row, JacobianSlots, ResidualBlock},
    weight::Weighting,
};

mod group;
pub use group::ParameterGroup;

use group::{PlatformStates, States};

/// Predicted Doppler observable, for one set of parameter values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DopplerPrediction {
    /// Receiver position, in ECEF meters
    pub receiver_position_ecef_m: Vector3<f64>,
    /// Receiver velocity, in ECEF m.s⁻¹
    pub receiver_velocity_ecef_m_s: Vector3<f64>,
    /// Geometric range (m)
    pub range_m: f64,
    /// Receiver to satellite unit vector (ECEF)
    pub line_of_sight: Vector3<f64>,
    /// Earth rotation (Sagnac) range rate correction, in m.s⁻¹
    pub earth_rotation_m_s: f64,
    /// Range rate, Earth rotation compensated, in m.s⁻¹
    pub range_rate_m_s: f64,
    /// Predicted Doppler, in m.s⁻¹
    pub doppler_m_s: f64,
    /// Satellite azimuth (ddeg) seen from the receiver. Only resolved by [DopplerError::predict].
    pub azimuth_deg: Option<f64>,
    /// Satellite elevation (ddeg) seen from the receiver. Only resolved by [DopplerError::predict].
    pub elevation_deg: Option<f64>,
}

/// Range rate correction induced by Earth rotation during signal propagation (m.s⁻¹).
pub fn earth_rotation_range_rate_m_s(
    sat_position_ecef_m: &Vector3<f64>,
    sat_velocity_ecef_m_s: &Vector3<f64>,
    rx_position_ecef_m: &Vector3<f64>,
    rx_velocity_ecef_m_s: &Vector3<f64>,
) -> f64 {
    EARTH_ANGULAR_VEL_RAD / SPEED_OF_LIGHT_M_S
        * (sat_velocity_ecef_m_s[1] * rx_position_ecef_m[0]
            + sat_position_ecef_m[1] * rx_velocity_ecef_m_s[0]
            - sat_velocity_ecef_m_s[0] * rx_position_ecef_m[1]
            - sat_position_ecef_m[0] * rx_velocity_ecef_m_s[1])
}

/// [DopplerError] is the weighted Doppler residual of one satellite,
/// at one measurement [Epoch]:
///
/// r = √Ω · (doppler - (vₛ·e + earth rotation + drift - satellite drift))
///
/// Residual and Jacobians are evaluated against one of the two supported
/// [ParameterGroup]s, resolved once when building.
#[derive(Debug, Clone)]
pub struct DopplerError<P: PoseParameterization = PoseLocalParameterization> {
    /// Resolved [ParameterGroup]
    group: ParameterGroup,
    /// [SatelliteState]
    satellite: SatelliteState,
    /// Doppler [Observation]
    observation: Observation,
    /// Measurement [Epoch]
    epoch: Epoch,
    /// [ErrorParameters] the [Weighting] derives from
    error_parameters: ErrorParameters,
    weighting: Weighting<U1>,
    /// Platform angular velocity, in ENU (rad.s⁻¹)
    angular_velocity: Vector3<f64>,
    /// Shared local frame, needed by [ParameterGroup::Platform]
    frame: Option<Arc<LocalFrame>>,
    parameterization: P,
}

impl DopplerError<PoseLocalParameterization> {
    /// Builds a new [DopplerError].
    /// ## Input
    /// - block_sizes: parameter block sizes this residual is bound to,
    ///   either [3, 3, 1] or [7, 9, 3, 1].
    /// - measurement: [GnssMeasurement]
    /// - index: satellite index within the measurement
    /// - error_parameters: [ErrorParameters] weighting this residual
    pub fn new(
        block_sizes: &[usize],
        measurement: &GnssMeasurement,
        index: usize,
        error_parameters: &ErrorParameters,
    ) -> Result<Self, Error> {
        let (satellite, observation) = measurement
            .get(index)
            .ok_or(Error::InvalidMeasurementIndex(index))?;

        let group = ParameterGroup::from_block_sizes(block_sizes).map_err(|e| {
            error!("{}({}) - doppler residual setup: {}", measurement.epoch, satellite.sv, e);
            e
        })?;

        let weighting = Weighting::<U1>::doppler(error_parameters, satellite.sv.constellation)
            .map_err(|e| {
                error!("{}({}) - doppler weighting: {}", measurement.epoch, satellite.sv, e);
                e
            })?;

        debug!(
            "{}({}) - doppler residual: {} sigma={:.3}m.s⁻¹",
            measurement.epoch,
            satellite.sv,
            group,
            weighting.covariance()[(0, 0)].sqrt()
        );

        Ok(Self {
            group,
            weighting,
            satellite: *satellite,
            observation: *observation,
            epoch: measurement.epoch,
            error_parameters: error_parameters.clone(),
            angular_velocity: Vector3::zeros(),
            frame: None,
            parameterization: PoseLocalParameterization,
        })
    }
}

impl<P: PoseParameterization> DopplerError<P> {
    /// Copies and returns [DopplerError] with platform angular velocity (rad.s⁻¹, ENU).
    /// Only [ParameterGroup::Platform] is affected: it couples the lever arm
    /// to the receiver velocity.
    pub fn with_angular_velocity(&self, angular_velocity: Vector3<f64>) -> Self
    where
        P: Clone,
    {
        let mut s = self.clone();
        s.angular_velocity = angular_velocity;
        s
    }

    /// Copies and returns [DopplerError] attached to this shared [LocalFrame].
    pub fn with_local_frame(&self, frame: Arc<LocalFrame>) -> Self
    where
        P: Clone,
    {
        let mut s = self.clone();
        s.frame = Some(frame);
        s
    }

    /// Copies and returns [DopplerError] attached to the local frame of this
    /// [Coordinate], which must have its origin established.
    pub fn with_coordinate(&self, coordinate: &Coordinate) -> Result<Self, Error>
    where
        P: Clone,
    {
        Ok(self.with_local_frame(coordinate.local_frame()?))
    }

    /// Replaces the [PoseParameterization] used to lift pose Jacobians.
    pub fn with_pose_parameterization<Q: PoseParameterization>(
        self,
        parameterization: Q,
    ) -> DopplerError<Q> {
        DopplerError {
            parameterization,
            group: self.group,
            satellite: self.satellite,
            observation: self.observation,
            epoch: self.epoch,
            error_parameters: self.error_parameters,
            weighting: self.weighting,
            angular_velocity: self.angular_velocity,
            frame: self.frame,
        }
    }

    /// Updates the [ErrorParameters] and recomputes the [Weighting].
    /// Current weighting is preserved on failure.
    pub fn set_error_parameters(
        &mut self,
        error_parameters: &ErrorParameters,
    ) -> Result<(), Error> {
        let weighting =
            Weighting::<U1>::doppler(error_parameters, self.satellite.sv.constellation)?;
        self.weighting = weighting;
        self.error_parameters = error_parameters.clone();
        Ok(())
    }

    pub fn parameter_group(&self) -> ParameterGroup {
        self.group
    }

    pub fn weighting(&self) -> &Weighting<U1> {
        &self.weighting
    }

    pub fn error_parameters(&self) -> &ErrorParameters {
        &self.error_parameters
    }

    pub fn satellite(&self) -> &SatelliteState {
        &self.satellite
    }

    pub fn observation(&self) -> &Observation {
        &self.observation
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub fn angular_velocity(&self) -> Vector3<f64> {
        self.angular_velocity
    }

    fn local_frame(&self) -> Result<&LocalFrame, Error> {
        self.frame
            .as_deref()
            .ok_or(Error::MissingCoordinateReference)
    }

    /// Predicts the Doppler observable for these parameter values,
    /// including satellite azimuth and elevation. Angles remain unresolved
    /// when the receiver lies on the polar axis.
    pub fn predict(&self, parameters: &[&[f64]]) -> Result<DopplerPrediction, Error> {
        let states = self.group.decode(parameters)?;
        let mut prediction = self.predict_states(&states)?;

        let receiver_frame = LocalFrame::from_ecef(prediction.receiver_position_ecef_m)?;

        if let Some((azimuth, elevation)) =
            receiver_frame.azimuth_elevation_deg(&self.satellite.position_ecef_m)?
        {
            prediction.azimuth_deg = Some(azimuth);
            prediction.elevation_deg = Some(elevation);
        }

        debug!(
            "{}({}) - doppler={:.4}m.s⁻¹ predicted={:.4}m.s⁻¹ range={:.3}m",
            self.epoch,
            self.satellite.sv,
            self.observation.doppler_m_s,
            prediction.doppler_m_s,
            prediction.range_m
        );

        Ok(prediction)
    }

    /// Receiver position and velocity in ECEF
    fn receiver_ecef(&self, states: &States) -> Result<(Vector3<f64>, Vector3<f64>), Error> {
        match states {
            States::Direct(states) => Ok((states.position_ecef_m, states.velocity_ecef_m_s)),
            States::Platform(states) => {
                let frame = self.local_frame()?;
                let lever_arm_enu = states.attitude * states.lever_arm_m;

                let position_enu = states.position_enu_m + lever_arm_enu;
                let velocity_enu =
                    states.velocity_enu_m_s + self.angular_velocity.cross(&lever_arm_enu);

                Ok((
                    frame.enu_to_ecef(&position_enu),
                    frame.rotate_enu_to_ecef(&velocity_enu),
                ))
            },
        }
    }

    fn predict_states(&self, states: &States) -> Result<DopplerPrediction, Error> {
        let (rx_position, rx_velocity) = self.receiver_ecef(states)?;

        let sat_position = &self.satellite.position_ecef_m;
        let sat_velocity = &self.satellite.velocity_ecef_m_s;

        let range_m = (sat_position - rx_position).norm();

        if range_m == 0.0 {
            return Err(Error::NullRange);
        }

        let line_of_sight = (sat_position - rx_position) / range_m;

        let relative_velocity = sat_velocity - rx_velocity;

        let earth_rotation_m_s =
            earth_rotation_range_rate_m_s(sat_position, sat_velocity, &rx_position, &rx_velocity);

        let range_rate_m_s = relative_velocity.dot(&line_of_sight) + earth_rotation_m_s;

        let doppler_m_s =
            range_rate_m_s + states.clock_drift_m_s() - self.satellite.frequency_offset_m_s;

        Ok(DopplerPrediction {
            receiver_position_ecef_m: rx_position,
            receiver_velocity_ecef_m_s: rx_velocity,
            range_m,
            line_of_sight,
            earth_rotation_m_s,
            range_rate_m_s,
            doppler_m_s,
            azimuth_deg: None,
            elevation_deg: None,
        })
    }

    /// Platform Jacobians (unweighted): pose (minimal), speed and biases, lever arm.
    /// Receiver position sensitivity is not modeled: the pose position part is null.
    fn platform_jacobians(
        &self,
        states: &PlatformStates,
        j_v_ecef: &RowVector3<f64>,
    ) -> Result<
        (
            SMatrix<f64, 1, 6>,
            SMatrix<f64, 1, 9>,
            SMatrix<f64, 1, 3>,
        ),
        Error,
    > {
        let frame = self.local_frame()?;

        let j_v_enu = j_v_ecef * frame.rotation_ecef_enu();

        let r_ws = states.attitude.to_rotation_matrix().into_inner();
        let lever_arm_enu = r_ws * states.lever_arm_m;

        let omega_skew = self.angular_velocity.cross_matrix();

        let j_q = j_v_enu * omega_skew * (-lever_arm_enu.cross_matrix());

        let mut j_pose = SMatrix::<f64, 1, 6>::zeros();
        j_pose.fixed_view_mut::<1, 3>(0, 3).copy_from(&j_q);

        let mut j_speed_and_bias = SMatrix::<f64, 1, 9>::zeros();
        j_speed_and_bias
            .fixed_view_mut::<1, 3>(0, 0)
            .copy_from(&j_v_enu);

        let j_lever_arm = j_v_enu * omega_skew * r_ws;

        Ok((j_pose, j_speed_and_bias, j_lever_arm))
    }
}

/// True if either Jacobian of this block was requested
fn is_requested(
    jacobians: &mut Option<JacobianSlots>,
    jacobians_minimal: &mut Option<JacobianSlots>,
    block: usize,
) -> bool {
    requested(jacobians, block).is_some() || requested(jacobians_minimal, block).is_some()
}

/// Writes one block, when requested, in ambient and minimal forms
fn write_block<const N: usize, const M: usize>(
    jacobians: &mut Option<JacobianSlots>,
    jacobians_minimal: &mut Option<JacobianSlots>,
    block: usize,
    ambient: &SMatrix<f64, 1, N>,
    minimal: &SMatrix<f64, 1, M>,
) -> Result<(), Error> {
    if let Some(slot) = requested(jacobians, block) {
        write_row(slot, ambient)?;
    }
    if let Some(slot) = requested(jacobians_minimal, block) {
        write_row(slot, minimal)?;
    }
    Ok(())
}

impl<P: PoseParameterization> ResidualBlock for DopplerError<P> {
    fn num_residuals(&self) -> usize {
        1
    }

    fn parameter_block_sizes(&self) -> &'static [usize] {
        self.group.block_sizes()
    }

    fn minimal_parameter_block_sizes(&self) -> &'static [usize] {
        self.group.minimal_block_sizes()
    }

    fn evaluate_with_minimal_jacobians(
        &self,
        parameters: &[&[f64]],
        residuals: &mut [f64],
        mut jacobians: Option<JacobianSlots>,
        mut jacobians_minimal: Option<JacobianSlots>,
    ) -> Result<(), Error> {
        if residuals.len() != 1 {
            return Err(Error::ResidualDimension);
        }

        validate_slots(&jacobians, self.group.block_sizes())?;
        validate_slots(&jacobians_minimal, self.group.minimal_block_sizes())?;

        let states = self.group.decode(parameters)?;
        let prediction = self.predict_states(&states)?;

        let sqrt_info = self.weighting.scalar_square_root_information();
        let error = self.observation.doppler_m_s - prediction.doppler_m_s;

        residuals[0] = sqrt_info * error;

        if jacobians.is_none() && jacobians_minimal.is_none() {
            return Ok(());
        }

        // ∂e/∂v_ECEF: receiver velocity only contributes through vₛ·e
        let j_v_ecef = -((prediction.receiver_position_ecef_m - self.satellite.position_ecef_m)
            / prediction.range_m)
            .transpose();

        let j_drift = SMatrix::<f64, 1, 1>::new(-sqrt_info);

        match &states {
            States::Direct(_) => {
                let j_position = SMatrix::<f64, 1, 3>::zeros();
                let j_velocity = j_v_ecef * sqrt_info;

                write_block(&mut jacobians, &mut jacobians_minimal, 0, &j_position, &j_position)?;
                write_block(&mut jacobians, &mut jacobians_minimal, 1, &j_velocity, &j_velocity)?;
                write_block(&mut jacobians, &mut jacobians_minimal, 2, &j_drift, &j_drift)?;
            },
            States::Platform(platform) => {
                let (j_pose, j_speed_and_bias, j_lever_arm) =
                    self.platform_jacobians(platform, &j_v_ecef)?;

                if is_requested(&mut jacobians, &mut jacobians_minimal, 0) {
                    let j_pose_minimal = j_pose * sqrt_info;
                    let j_pose_ambient =
                        j_pose_minimal * self.parameterization.lift_jacobian(&platform.pose);

                    write_block(
                        &mut jacobians,
                        &mut jacobians_minimal,
                        0,
                        &j_pose_ambient,
                        &j_pose_minimal,
                    )?;
                }

                let j_speed_and_bias = j_speed_and_bias * sqrt_info;
                let j_lever_arm = j_lever_arm * sqrt_info;

                write_block(
                    &mut jacobians,
                    &mut jacobians_minimal,
                    1,
                    &j_speed_and_bias,
                    &j_speed_and_bias,
                )?;
                write_block(
                    &mut jacobians,
                    &mut jacobians_minimal,
                    2,
                    &j_lever_arm,
                    &j_lever_arm,
                )?;
                write_block(&mut jacobians, &mut jacobians_minimal, 3, &j_drift, &j_drift)?;
            },
        }

        Ok(())
    }
}
