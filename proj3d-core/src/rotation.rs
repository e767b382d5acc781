/// Camera orientation and the quaternion rotation into camera space
use nalgebra::Vector3;

/// Yaw and pitch of the camera, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Orientation {
    pub yaw: f64,
    pub pitch: f64,
}

impl Orientation {
    pub fn new(yaw: f64, pitch: f64) -> Self {
        Self { yaw, pitch }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    /// Rotate by delta amounts (in degrees)
    pub fn rotate(&mut self, dyaw: f64, dpitch: f64) {
        self.yaw += dyaw;
        self.pitch += dpitch;
    }

    /// Move a world-space direction into this orientation's camera space.
    pub fn apply(&self, v: Vector3<f64>) -> Vector3<f64> {
        rotate(v, self.yaw, self.pitch)
    }
}

/// Quaternion stored as `(x, y, z, w)` with `w` the scalar part.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Quat {
    x: f64,
    y: f64,
    z: f64,
    w: f64,
}

impl Quat {
    fn new(x: f64, y: f64, z: f64, w: f64) -> Self {
        Self { x, y, z, w }
    }

    fn pure(v: &Vector3<f64>) -> Self {
        Self::new(v.x, v.y, v.z, 0.0)
    }

    /// `self * rhs`, with the exact term order the projection was tuned on.
    fn compose(self, rhs: Quat) -> Quat {
        let (a, b) = (self, rhs);
        Quat {
            x: a.x * b.w + b.x * a.w + a.y * b.z - b.y * a.z,
            y: a.y * b.w + b.y * a.w + b.x * a.z - a.x * b.z,
            z: a.z * b.w + b.z * a.w + a.x * b.y - b.x * a.y,
            w: -(a.x * b.x + a.y * b.y + a.z * b.z - a.w * b.w),
        }
    }
}

/// Rotate `v` by `yaw` about the vertical axis, then by `pitch` about the
/// lateral axis. Angles are in degrees.
///
/// Positive yaw turns the view toward +x, positive pitch toward -y.
pub fn rotate(v: Vector3<f64>, yaw: f64, pitch: f64) -> Vector3<f64> {
    let (sy, cy) = (yaw / 2.0).to_radians().sin_cos();
    let (sp, cp) = (pitch / 2.0).to_radians().sin_cos();

    let yaw_q = Quat::new(0.0, -sy, 0.0, cy);
    let yaw_conj = Quat::new(0.0, sy, 0.0, cy);
    let pitch_q = Quat::new(-sp, 0.0, 0.0, cp);
    let pitch_conj = Quat::new(sp, 0.0, 0.0, cp);

    let r = pitch_q
        .compose(yaw_q)
        .compose(Quat::pure(&v))
        .compose(yaw_conj)
        .compose(pitch_conj);

    Vector3::new(r.x, r.y, r.z)
}
