use nalgebra::{Matrix3, Point3, Vector3};

/// Rotation matrix for z-x-z Euler angles, `Rz(a) * Rx(b) * Rz(c)`.
pub fn euler_to_matrix(a: f64, b: f64, c: f64) -> Matrix3<f64> {
    let (sina, cosa) = a.sin_cos();
    let (sinb, cosb) = b.sin_cos();
    let (sinc, cosc) = c.sin_cos();

    Matrix3::new(
        cosa * cosc - sina * cosb * sinc,
        -cosa * sinc - sina * cosb * cosc,
        sinb * sina,
        sina * cosc + cosa * cosb * sinc,
        -sina * sinc + cosa * cosb * cosc,
        -sinb * cosa,
        sinb * sinc,
        sinb * cosc,
        cosb,
    )
}

#[inline]
pub fn move_point(
    center: &Point3<f64>,
    rotmat: &Matrix3<f64>,
    body: &Vector3<f64>,
) -> Point3<f64> {
    center + rotmat * body
}

/// Rotates a rank-2 tensor into the lab frame, `R * T * R^T`.
#[inline]
pub fn rotate_tensor(rotmat: &Matrix3<f64>, tensor: &Matrix3<f64>) -> Matrix3<f64> {
    rotmat * tensor * rotmat.transpose()
}
