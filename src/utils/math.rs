//! Additional math helpers layered on top of `glam`.

use glam::{DMat3, DQuat, DVec3};

/// Converts a rotation vector (axis × angle, radians) into a quaternion via the exponential map.
pub fn rotation_from_vector(rotation: DVec3) -> DQuat {
    let angle = rotation.length();
    if angle < 1e-12 {
        return DQuat::IDENTITY;
    }
    DQuat::from_axis_angle(rotation / angle, angle)
}

/// Cross-product matrix `[v]×` such that `skew(v) * w == v.cross(w)`.
pub fn skew(v: DVec3) -> DMat3 {
    DMat3::from_cols(
        DVec3::new(0.0, v.z, -v.y),
        DVec3::new(-v.z, 0.0, v.x),
        DVec3::new(v.y, -v.x, 0.0),
    )
}

/// Re-expresses a tensor given in a rotated basis: `R · I · Rᵀ`.
pub fn transform_basis(tensor: DMat3, rotation: DQuat) -> DMat3 {
    let r = DMat3::from_quat(rotation);
    r * tensor * r.transpose()
}

/// Parallel-axis correction `m · (|d|²·𝟙 − d·dᵀ)` for a point mass offset by `offset`.
pub fn parallel_axis(offset: DVec3, mass: f64) -> DMat3 {
    // -[d]×² == |d|²·𝟙 − d·dᵀ
    let s = skew(offset);
    (s * s) * -mass
}

pub fn is_finite_mat3(m: &DMat3) -> bool {
    m.x_axis.is_finite() && m.y_axis.is_finite() && m.z_axis.is_finite()
}

/// Largest absolute difference between two tensors, element-wise.
pub fn max_abs_diff(a: &DMat3, b: &DMat3) -> f64 {
    let d = *a - *b;
    d.x_axis
        .abs()
        .max(d.y_axis.abs())
        .max(d.z_axis.abs())
        .max_element()
}
