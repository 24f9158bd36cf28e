//! Pose manifold: ambient (position + quaternion) and minimal (tangent space) representations
use nalgebra::{Matrix3, Matrix4, Quaternion, SMatrix, SVector, UnitQuaternion, Vector3};

/// Ambient pose: position (3) and orientation quaternion stored as (x, y, z, w)
pub type AmbientPose = SVector<f64, 7>;

/// Minimal pose increment: position (3) and rotation vector (3)
pub type PoseIncrement = SVector<f64, 6>;

/// [PoseParameterization] relates an over parameterized pose and its tangent space.
/// Residual blocks use the lift operator to express minimal Jacobians
/// in the ambient representation the solver stores.
pub trait PoseParameterization: Send + Sync {
    /// x ⊞ δ
    fn plus(&self, x: &AmbientPose, delta: &PoseIncrement) -> AmbientPose;

    /// ∂(x ⊞ δ)/∂δ at δ = 0 (7×6)
    fn plus_jacobian(&self, x: &AmbientPose) -> SMatrix<f64, 7, 6>;

    /// Lift operator (6×7): maps minimal Jacobians to ambient Jacobians.
    /// lift · plus_jacobian = I₆ for a valid pose.
    fn lift_jacobian(&self, x: &AmbientPose) -> SMatrix<f64, 6, 7>;
}

/// [PoseLocalParameterization] perturbs the orientation on the left (world frame):
/// q' = exp(δθ) ⊗ q, and the position additively: t' = t + δt.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct PoseLocalParameterization;

/// Returns the orientation stored in this [AmbientPose]
pub(crate) fn pose_quaternion(x: &AmbientPose) -> Quaternion<f64> {
    Quaternion::new(x[6], x[3], x[4], x[5])
}

/// Returns the position stored in this [AmbientPose]
pub(crate) fn pose_position(x: &AmbientPose) -> Vector3<f64> {
    Vector3::new(x[0], x[1], x[2])
}

/// Right multiplication matrix, on (x, y, z, w) coefficients: Q⊕(q) · p = p ⊗ q
fn oplus(q: &Quaternion<f64>) -> Matrix4<f64> {
    let (x, y, z, w) = (q.i, q.j, q.k, q.w);
    Matrix4::new(
        w, z, -y, x, //
        -z, w, x, y, //
        y, -x, w, z, //
        -x, -y, -z, w,
    )
}

impl PoseParameterization for PoseLocalParameterization {
    fn plus(&self, x: &AmbientPose, delta: &PoseIncrement) -> AmbientPose {
        let position = pose_position(x) + Vector3::new(delta[0], delta[1], delta[2]);

        let dq = UnitQuaternion::from_scaled_axis(Vector3::new(delta[3], delta[4], delta[5]));
        let q = UnitQuaternion::from_quaternion(dq.into_inner() * pose_quaternion(x));

        AmbientPose::from_column_slice(&[
            position[0],
            position[1],
            position[2],
            q.i,
            q.j,
            q.k,
            q.w,
        ])
    }

    fn plus_jacobian(&self, x: &AmbientPose) -> SMatrix<f64, 7, 6> {
        let mut jacobian = SMatrix::<f64, 7, 6>::zeros();
        jacobian
            .fixed_view_mut::<3, 3>(0, 0)
            .copy_from(&Matrix3::identity());

        let mut s = SMatrix::<f64, 4, 3>::zeros();
        s.fixed_view_mut::<3, 3>(0, 0)
            .copy_from(&(Matrix3::identity() * 0.5));

        jacobian
            .fixed_view_mut::<4, 3>(3, 3)
            .copy_from(&(oplus(&pose_quaternion(x)) * s));

        jacobian
    }

    fn lift_jacobian(&self, x: &AmbientPose) -> SMatrix<f64, 6, 7> {
        let mut jacobian = SMatrix::<f64, 6, 7>::zeros();
        jacobian
            .fixed_view_mut::<3, 3>(0, 0)
            .copy_from(&Matrix3::identity());

        let q_inv = pose_quaternion(x).conjugate();

        let mut jq_pinv = SMatrix::<f64, 3, 4>::zeros();
        jq_pinv
            .fixed_view_mut::<3, 3>(0, 0)
            .copy_from(&(Matrix3::identity() * 2.0));

        jacobian
            .fixed_view_mut::<3, 4>(3, 3)
            .copy_from(&(jq_pinv * oplus(&q_inv)));

        jacobian
    }
}
