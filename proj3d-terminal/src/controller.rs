/// Mouse-look and walking controls that move the camera between frames
use proj3d_core::Camera;

/// Direction of one movement step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Movement {
    Forward,
    Backward,
    Left,
    Right,
    Up,
    Down,
}

/// First-person camera controls
#[derive(Debug, Clone, Copy)]
pub struct CameraController {
    /// Degrees turned per unit of look input.
    pub look_speed: f64,
    /// World units travelled per step.
    pub step: f64,
}

impl CameraController {
    pub fn new(look_speed: f64, step: f64) -> Self {
        Self { look_speed, step }
    }

    /// Turn the camera. Yaw wraps into [0, 360), pitch is clamped to
    /// [-90, 90]. Positive `dy` looks down.
    pub fn look(&self, camera: &mut Camera, dx: f64, dy: f64) {
        let o = &mut camera.orientation;
        o.yaw = (o.yaw + dx * self.look_speed).rem_euclid(360.0);
        o.pitch = (o.pitch + dy * self.look_speed).clamp(-90.0, 90.0);
    }

    /// Move along the yaw heading; pitch does not tilt the walk direction.
    pub fn advance(&self, camera: &mut Camera, movement: Movement) {
        let (sin, cos) = camera.orientation.yaw.to_radians().sin_cos();
        let (sin, cos) = (self.step * sin, self.step * cos);
        let p = &mut camera.position;

        match movement {
            Movement::Forward => {
                p.x += sin;
                p.z += cos;
            }
            Movement::Backward => {
                p.x -= sin;
                p.z -= cos;
            }
            Movement::Left => {
                p.x -= cos;
                p.z += sin;
            }
            Movement::Right => {
                p.x += cos;
                p.z -= sin;
            }
            Movement::Up => p.y += self.step,
            Movement::Down => p.y -= self.step,
        }
    }
}

impl Default for CameraController {
    fn default() -> Self {
        Self::new(0.16, 0.15)
    }
}
