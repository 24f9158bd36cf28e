use nalgebra::{SMatrix, UnitQuaternion};
use rand::{rngs::SmallRng, Rng, SeedableRng};
use rstest::*;

use crate::{
    prelude::{
        AmbientPose, Constellation, DopplerError, ErrorParameters, PoseLocalParameterization,
        PoseParameterization, SatelliteState, Vector3,
    },
    tests::{
        evaluate_all, evaluate_residual, init_logger, reference_coordinate, single_measurement,
        DirectBlocks, PlatformBlocks, G01, R05,
    },
};

fn random_vector(rng: &mut SmallRng, amplitude: f64) -> Vector3<f64> {
    Vector3::new(
        rng.random_range(-amplitude..amplitude),
        rng.random_range(-amplitude..amplitude),
        rng.random_range(-amplitude..amplitude),
    )
}

/// Random satellite, roughly at MEO altitude
fn random_satellite(rng: &mut SmallRng, glonass: bool) -> SatelliteState {
    let direction = random_vector(rng, 1.0).normalize();
    let sv = if glonass { R05 } else { G01 };

    SatelliteState::new(sv, direction * 2.6E7, random_vector(rng, 3000.0))
        .with_frequency_offset_m_s(rng.random_range(-1.0..1.0))
}

fn random_platform_blocks(rng: &mut SmallRng) -> PlatformBlocks {
    PlatformBlocks::new(
        random_vector(rng, 100.0),
        UnitQuaternion::from_scaled_axis(random_vector(rng, 1.5)),
        random_vector(rng, 10.0),
        random_vector(rng, 2.0),
        rng.random_range(-50.0..50.0),
    )
}

#[rstest]
#[case(0.5, 1.0, false)]
#[case(0.1, 1.0, false)]
#[case(0.5, 1.5, true)]
#[case(2.0, 0.75, true)]
fn clock_drift_jacobian(#[case] factor: f64, #[case] ratio: f64, #[case] glonass: bool) {
    init_logger();

    let mut rng = SmallRng::seed_from_u64(0x1234);

    let params = ErrorParameters::default()
        .with_doppler_error_factor(factor)
        .with_system_error_ratio(Constellation::GPS, ratio)
        .with_system_error_ratio(Constellation::Glonass, ratio);

    let expected = -1.0 / (factor * ratio);

    for _ in 0..16 {
        let measurement = single_measurement(
            random_satellite(&mut rng, glonass),
            rng.random_range(-500.0..500.0),
        );

        let direct = DopplerError::new(&[3, 3, 1], &measurement, 0, &params).unwrap();

        let blocks = DirectBlocks::new(
            random_vector(&mut rng, 6.4E6),
            random_vector(&mut rng, 10.0),
            rng.random_range(-50.0..50.0),
        );

        let evaluation = evaluate_all(&direct, &blocks.blocks());
        assert!((evaluation.jacobians[2][0] - expected).abs() < 1e-9);
        assert!((evaluation.jacobians_minimal[2][0] - expected).abs() < 1e-9);

        let platform = DopplerError::new(&[7, 9, 3, 1], &measurement, 0, &params)
            .unwrap()
            .with_coordinate(&reference_coordinate())
            .unwrap()
            .with_angular_velocity(random_vector(&mut rng, 0.5));

        let blocks = random_platform_blocks(&mut rng);

        let evaluation = evaluate_all(&platform, &blocks.blocks());
        assert!((evaluation.jacobians[3][0] - expected).abs() < 1e-9);
        assert!((evaluation.jacobians_minimal[3][0] - expected).abs() < 1e-9);
    }
}

#[test]
fn pose_jacobian_consistency() {
    init_logger();

    let mut rng = SmallRng::seed_from_u64(42);
    let params = ErrorParameters::default();

    for _ in 0..32 {
        let measurement = single_measurement(random_satellite(&mut rng, false), 0.0);

        let residual = DopplerError::new(&[7, 9, 3, 1], &measurement, 0, &params)
            .unwrap()
            .with_coordinate(&reference_coordinate())
            .unwrap()
            .with_angular_velocity(random_vector(&mut rng, 0.5));

        let blocks = random_platform_blocks(&mut rng);
        let evaluation = evaluate_all(&residual, &blocks.blocks());

        let ambient = SMatrix::<f64, 1, 7>::from_row_slice(&evaluation.jacobians[0]);
        let minimal = SMatrix::<f64, 1, 6>::from_row_slice(&evaluation.jacobians_minimal[0]);

        let x = AmbientPose::from_column_slice(&blocks.pose);
        let projected = ambient * PoseLocalParameterization.plus_jacobian(&x);

        let scale = minimal.norm().max(1.0);
        assert!(
            (projected - minimal).norm() < 1e-9 * scale,
            "ambient pose jacobian is not consistent with minimal jacobian"
        );

        // position sensitivity is not modeled, in any representation
        for i in 0..3 {
            assert_eq!(evaluation.jacobians[0][i], 0.0);
            assert_eq!(evaluation.jacobians_minimal[0][i], 0.0);
        }
    }
}

#[test]
fn direct_velocity_jacobian() {
    init_logger();

    const STEP: f64 = 1.0E-4;

    let mut rng = SmallRng::seed_from_u64(7);
    let params = ErrorParameters::default();

    for _ in 0..32 {
        let measurement = single_measurement(
            random_satellite(&mut rng, false),
            rng.random_range(-500.0..500.0),
        );

        let residual = DopplerError::new(&[3, 3, 1], &measurement, 0, &params).unwrap();

        let blocks = DirectBlocks::new(
            random_vector(&mut rng, 6.4E6),
            random_vector(&mut rng, 10.0),
            rng.random_range(-50.0..50.0),
        );

        let evaluation = evaluate_all(&residual, &blocks.blocks());

        assert_eq!(evaluation.jacobians[0], vec![0.0; 3]);

        for i in 0..3 {
            let mut plus = blocks;
            plus.velocity[i] += STEP;

            let mut minus = blocks;
            minus.velocity[i] -= STEP;

            let numerical = (evaluate_residual(&residual, &plus.blocks())
                - evaluate_residual(&residual, &minus.blocks()))
                / (2.0 * STEP);

            // the Earth rotation term (|Ω/c·rₛ| ≈ 1E-5) is not differentiated
            assert!(
                (evaluation.jacobians[1][i] - numerical).abs() < 5.0E-5,
                "velocity #{}: analytical={} numerical={}",
                i,
                evaluation.jacobians[1][i],
                numerical
            );
        }
    }
}
