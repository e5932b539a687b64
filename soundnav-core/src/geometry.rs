//! Homogeneous 4x4 transforms and their decomposition into the scalar values
//! instruments send: translation, distance, Euler angles and rotation angle.
//!
//! Angles are in degrees. Euler angles follow the host transform convention:
//! a matrix equals `Rz(z) * Rx(x) * Ry(y)`, i.e. rotate about Y, then X,
//! then Z.

use std::ops::Mul;

/// Below this length an axis is treated as degenerate.
const AXIS_EPSILON: f64 = 0.001;

/// Row-major 4x4 homogeneous transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix4(pub [[f64; 4]; 4]);

impl Default for Matrix4 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Matrix4 {
    pub const IDENTITY: Matrix4 = Matrix4([
        [1.0, 0.0, 0.0, 0.0],
        [0.0, 1.0, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ]);

    pub fn from_translation(x: f64, y: f64, z: f64) -> Self {
        let mut m = Self::IDENTITY;
        m.0[0][3] = x;
        m.0[1][3] = y;
        m.0[2][3] = z;
        m
    }

    pub fn rotation_x(degrees: f64) -> Self {
        let (s, c) = degrees.to_radians().sin_cos();
        Matrix4([
            [1.0, 0.0, 0.0, 0.0],
            [0.0, c, -s, 0.0],
            [0.0, s, c, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    pub fn rotation_y(degrees: f64) -> Self {
        let (s, c) = degrees.to_radians().sin_cos();
        Matrix4([
            [c, 0.0, s, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [-s, 0.0, c, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    pub fn rotation_z(degrees: f64) -> Self {
        let (s, c) = degrees.to_radians().sin_cos();
        Matrix4([
            [c, -s, 0.0, 0.0],
            [s, c, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    pub fn translation(&self) -> [f64; 3] {
        [self.0[0][3], self.0[1][3], self.0[2][3]]
    }

    /// Gauss-Jordan inverse with partial pivoting. `None` if singular.
    pub fn inverse(&self) -> Option<Matrix4> {
        let mut a = self.0;
        let mut inv = Self::IDENTITY.0;
        for col in 0..4 {
            let pivot = (col..4)
                .max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))
                .unwrap_or(col);
            if a[pivot][col].abs() < 1e-12 {
                return None;
            }
            a.swap(col, pivot);
            inv.swap(col, pivot);

            let p = a[col][col];
            for k in 0..4 {
                a[col][k] /= p;
                inv[col][k] /= p;
            }
            for row in 0..4 {
                if row != col {
                    let factor = a[row][col];
                    if factor != 0.0 {
                        for k in 0..4 {
                            a[row][k] -= factor * a[col][k];
                            inv[row][k] -= factor * inv[col][k];
                        }
                    }
                }
            }
        }
        Some(Matrix4(inv))
    }

    /// Rotation part with scale removed from each column. A reflection is
    /// turned back into a rotation by flipping the third column.
    fn orthonormal_rotation(&self) -> [[f64; 3]; 3] {
        let mut r = [[0.0; 3]; 3];
        for col in 0..3 {
            let norm = (0..3).map(|row| self.0[row][col].powi(2)).sum::<f64>().sqrt();
            for row in 0..3 {
                r[row][col] = if norm > 0.0 { self.0[row][col] / norm } else { 0.0 };
            }
        }
        if determinant3(&r) < 0.0 {
            for row in r.iter_mut() {
                row[2] = -row[2];
            }
        }
        r
    }
}

impl Mul for Matrix4 {
    type Output = Matrix4;

    fn mul(self, rhs: Matrix4) -> Matrix4 {
        let mut out = [[0.0; 4]; 4];
        for (i, row) in out.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                *cell = (0..4).map(|k| self.0[i][k] * rhs.0[k][j]).sum();
            }
        }
        Matrix4(out)
    }
}

fn determinant3(m: &[[f64; 3]; 3]) -> f64 {
    m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
}

/// Transform mapping the source frame into the reference frame.
/// With no reference the world frame is used. `None` if the reference is
/// singular.
pub fn relative_transform(
    source_to_world: &Matrix4,
    reference_to_world: Option<&Matrix4>,
) -> Option<Matrix4> {
    match reference_to_world {
        Some(reference) => Some(reference.inverse()? * *source_to_world),
        None => Some(*source_to_world),
    }
}

/// Scalar decomposition of a transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub translation: [f64; 3],
    /// Euler angles about X, Y, Z in degrees.
    pub orientation: [f64; 3],
    /// Rotation angle in degrees (`[0, 180]`) followed by the unit axis.
    pub orientation_wxyz: [f64; 4],
}

impl Pose {
    pub fn from_matrix(m: &Matrix4) -> Self {
        let r = m.orthonormal_rotation();
        Pose {
            translation: m.translation(),
            orientation: euler_orientation(&r),
            orientation_wxyz: axis_angle(&r),
        }
    }

    pub fn distance(&self) -> f64 {
        let [x, y, z] = self.translation;
        (x * x + y * y + z * z).sqrt()
    }
}

fn euler_orientation(r: &[[f64; 3]; 3]) -> [f64; 3] {
    let [x2, y2, z2] = r[2];
    let [x3, y3, z3] = r[1];

    // rotation about Y
    let d1 = (x2 * x2 + z2 * z2).sqrt();
    let (cos_theta, sin_theta) = if d1 < AXIS_EPSILON {
        (1.0, 0.0)
    } else {
        (z2 / d1, x2 / d1)
    };
    let y = -sin_theta.atan2(cos_theta).to_degrees();

    // rotation about X
    let d = (x2 * x2 + y2 * y2 + z2 * z2).sqrt();
    let (sin_phi, cos_phi) = if d < AXIS_EPSILON {
        (0.0, 1.0)
    } else if d1 < AXIS_EPSILON {
        (y2 / d, z2 / d)
    } else {
        (y2 / d, (x2 * x2 + z2 * z2) / (d1 * d))
    };
    let x = sin_phi.atan2(cos_phi).to_degrees();

    // rotation about Z
    let x3p = x3 * cos_theta - z3 * sin_theta;
    let y3p = -sin_phi * sin_theta * x3 + cos_phi * y3 - sin_phi * cos_theta * z3;
    let d2 = (x3p * x3p + y3p * y3p).sqrt();
    let (cos_alpha, sin_alpha) = if d2 < AXIS_EPSILON {
        (1.0, 0.0)
    } else {
        (y3p / d2, x3p / d2)
    };
    let z = sin_alpha.atan2(cos_alpha).to_degrees();

    [x, y, z]
}

fn axis_angle(r: &[[f64; 3]; 3]) -> [f64; 4] {
    let [w, x, y, z] = quaternion(r);
    let mag = (x * x + y * y + z * z).sqrt();
    if mag == 0.0 {
        return [0.0, 0.0, 0.0, 1.0];
    }
    let angle = 2.0 * mag.atan2(w).to_degrees();
    [angle, x / mag, y / mag, z / mag]
}

/// Unit quaternion (w, x, y, z) with `w >= 0`.
fn quaternion(r: &[[f64; 3]; 3]) -> [f64; 4] {
    let trace = r[0][0] + r[1][1] + r[2][2];
    let q = if trace > 0.0 {
        let s = (trace + 1.0).sqrt() * 2.0;
        [
            0.25 * s,
            (r[2][1] - r[1][2]) / s,
            (r[0][2] - r[2][0]) / s,
            (r[1][0] - r[0][1]) / s,
        ]
    } else if r[0][0] > r[1][1] && r[0][0] > r[2][2] {
        let s = (1.0 + r[0][0] - r[1][1] - r[2][2]).sqrt() * 2.0;
        [
            (r[2][1] - r[1][2]) / s,
            0.25 * s,
            (r[0][1] + r[1][0]) / s,
            (r[0][2] + r[2][0]) / s,
        ]
    } else if r[1][1] > r[2][2] {
        let s = (1.0 + r[1][1] - r[0][0] - r[2][2]).sqrt() * 2.0;
        [
            (r[0][2] - r[2][0]) / s,
            (r[0][1] + r[1][0]) / s,
            0.25 * s,
            (r[1][2] + r[2][1]) / s,
        ]
    } else {
        let s = (1.0 + r[2][2] - r[0][0] - r[1][1]).sqrt() * 2.0;
        [
            (r[1][0] - r[0][1]) / s,
            (r[0][2] + r[2][0]) / s,
            (r[1][2] + r[2][1]) / s,
            0.25 * s,
        ]
    };
    if q[0] < 0.0 {
        [-q[0], -q[1], -q[2], -q[3]]
    } else {
        q
    }
}
