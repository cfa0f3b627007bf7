use crate::core::models::fragment::COORDS_PER_FRAGMENT;
use nalgebra::Vector3;

/// Converts a torque (the energy derivative with respect to rotations about the lab axes) into
/// derivatives with respect to the z-x-z Euler angles `(a, b, c)`.
///
/// Only `a` and `b` enter the transform; `c` is the innermost rotation.
pub fn torque_to_angle_gradient(a: f64, b: f64, torque: &Vector3<f64>) -> [f64; 3] {
    let (sina, cosa) = a.sin_cos();
    let (sinb, cosb) = b.sin_cos();
    let (tx, ty, tz) = (torque.x, torque.y, torque.z);

    [
        tz,
        cosa * tx + sina * ty,
        sinb * sina * tx - sinb * cosa * ty + cosb * tz,
    ]
}

/// Rewrites the torque slots of a flattened `gx, gy, gz, tx, ty, tz` gradient in place into
/// Euler-angle derivatives, using the angles from the matching `x, y, z, a, b, c` coordinates.
pub fn torques_to_angle_gradients(coordinates: &[f64], gradient: &mut [f64]) {
    for (x, g) in coordinates
        .chunks_exact(COORDS_PER_FRAGMENT)
        .zip(gradient.chunks_exact_mut(COORDS_PER_FRAGMENT))
    {
        let torque = Vector3::new(g[3], g[4], g[5]);
        let angles = torque_to_angle_gradient(x[3], x[4], &torque);
        g[3..].copy_from_slice(&angles);
    }
}
