mod jacobians;

use log::LevelFilter;
use std::{str::FromStr, sync::Once};

use crate::prelude::{
    Constellation, Coordinate, Epoch, ErrorParameters, GnssMeasurement, ResidualBlock,
    SatelliteState, Vector3, SV,
};

static INIT: Once = Once::new();

pub fn init_logger() {
    INIT.call_once(|| {
        env_logger::builder()
            .is_test(true)
            .filter_level(LevelFilter::Trace)
            .init();
    });
}

/// Local origin (ddeg, ddeg, m) used by platform tests
pub const REFERENCE_ORIGIN: (f64, f64, f64) = (45.0, 10.0, 100.0);

pub const G01: SV = SV {
    prn: 1,
    constellation: Constellation::GPS,
};

pub const R05: SV = SV {
    prn: 5,
    constellation: Constellation::Glonass,
};

pub fn reference_epoch() -> Epoch {
    Epoch::from_str("2020-06-25T12:00:00 GPST").unwrap()
}

pub fn reference_coordinate() -> Coordinate {
    Coordinate::with_origin(REFERENCE_ORIGIN.0, REFERENCE_ORIGIN.1, REFERENCE_ORIGIN.2)
        .unwrap_or_else(|e| panic!("failed to set local origin: {}", e))
}

/// Error parameters leading to √Ω = 2.0 for GPS
pub fn unit_error_parameters() -> ErrorParameters {
    ErrorParameters::default()
        .with_doppler_error_factor(0.5)
        .with_system_error_ratio(Constellation::GPS, 1.0)
}

/// Satellite above the north pole: its position has no equatorial component,
/// and being static, the Earth rotation correction vanishes.
pub fn polar_satellite(sv: SV) -> SatelliteState {
    SatelliteState::new(sv, Vector3::new(0.0, 0.0, 2.6E7), Vector3::zeros())
        .with_frequency_offset_m_s(0.5)
}

/// Single satellite [GnssMeasurement]
pub fn single_measurement(satellite: SatelliteState, doppler_m_s: f64) -> GnssMeasurement {
    GnssMeasurement::new(reference_epoch()).with_satellite(satellite, doppler_m_s)
}

/// Full evaluation outcome: weighted residual, ambient and minimal Jacobians
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub residual: f64,
    pub jacobians: Vec<Vec<f64>>,
    pub jacobians_minimal: Vec<Vec<f64>>,
}

impl Evaluation {
    /// Bitwise comparison
    pub fn bits(&self) -> (u64, Vec<Vec<u64>>, Vec<Vec<u64>>) {
        let bits = |jacobians: &Vec<Vec<f64>>| {
            jacobians
                .iter()
                .map(|j| j.iter().map(|v| v.to_bits()).collect())
                .collect()
        };
        (
            self.residual.to_bits(),
            bits(&self.jacobians),
            bits(&self.jacobians_minimal),
        )
    }
}

/// Evaluates the residual and all Jacobians (ambient and minimal).
pub fn evaluate_all<R: ResidualBlock>(residual: &R, parameters: &[&[f64]]) -> Evaluation {
    let mut jacobians: Vec<Vec<f64>> = residual
        .parameter_block_sizes()
        .iter()
        .map(|size| vec![f64::NAN; *size])
        .collect();

    let mut jacobians_minimal: Vec<Vec<f64>> = residual
        .minimal_parameter_block_sizes()
        .iter()
        .map(|size| vec![f64::NAN; *size])
        .collect();

    let mut residuals = [f64::NAN];

    {
        let mut slots: Vec<Option<&mut [f64]>> = jacobians
            .iter_mut()
            .map(|j| Some(j.as_mut_slice()))
            .collect();

        let mut minimal_slots: Vec<Option<&mut [f64]>> = jacobians_minimal
            .iter_mut()
            .map(|j| Some(j.as_mut_slice()))
            .collect();

        residual
            .evaluate_with_minimal_jacobians(
                parameters,
                &mut residuals,
                Some(slots.as_mut_slice()),
                Some(minimal_slots.as_mut_slice()),
            )
            .unwrap_or_else(|e| panic!("evaluation failed: {}", e));
    }

    Evaluation {
        residual: residuals[0],
        jacobians,
        jacobians_minimal,
    }
}

/// Evaluates the weighted residual only.
pub fn evaluate_residual<R: ResidualBlock>(residual: &R, parameters: &[&[f64]]) -> f64 {
    let mut residuals = [f64::NAN];
    residual
        .evaluate(parameters, &mut residuals, None)
        .unwrap_or_else(|e| panic!("evaluation failed: {}", e));
    residuals[0]
}

/// Platform parameter blocks, as a solver would store them
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlatformBlocks {
    pub pose: [f64; 7],
    pub speed_and_bias: [f64; 9],
    pub lever_arm: [f64; 3],
    pub clock_drift: [f64; 1],
}

impl PlatformBlocks {
    pub fn new(
        position_enu_m: Vector3<f64>,
        attitude: nalgebra::UnitQuaternion<f64>,
        velocity_enu_m_s: Vector3<f64>,
        lever_arm_m: Vector3<f64>,
        clock_drift_m_s: f64,
    ) -> Self {
        let mut speed_and_bias = [0.0; 9];
        speed_and_bias[..3].copy_from_slice(velocity_enu_m_s.as_slice());
        // biases do not contribute
        speed_and_bias[3..].copy_from_slice(&[0.01, -0.02, 0.03, 0.001, 0.002, -0.003]);

        Self {
            pose: [
                position_enu_m[0],
                position_enu_m[1],
                position_enu_m[2],
                attitude.i,
                attitude.j,
                attitude.k,
                attitude.w,
            ],
            speed_and_bias,
            lever_arm: [lever_arm_m[0], lever_arm_m[1], lever_arm_m[2]],
            clock_drift: [clock_drift_m_s],
        }
    }

    pub fn blocks(&self) -> [&[f64]; 4] {
        [
            &self.pose,
            &self.speed_and_bias,
            &self.lever_arm,
            &self.clock_drift,
        ]
    }
}

/// Direct (ECEF) parameter blocks
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectBlocks {
    pub position: [f64; 3],
    pub velocity: [f64; 3],
    pub clock_drift: [f64; 1],
}

impl DirectBlocks {
    pub fn new(
        position_ecef_m: Vector3<f64>,
        velocity_ecef_m_s: Vector3<f64>,
        clock_drift_m_s: f64,
    ) -> Self {
        Self {
            position: [position_ecef_m[0], position_ecef_m[1], position_ecef_m[2]],
            velocity: [
                velocity_ecef_m_s[0],
                velocity_ecef_m_s[1],
                velocity_ecef_m_s[2],
            ],
            clock_drift: [clock_drift_m_s],
        }
    }

    pub fn blocks(&self) -> [&[f64]; 3] {
        [&self.position, &self.velocity, &self.clock_drift]
    }
}
