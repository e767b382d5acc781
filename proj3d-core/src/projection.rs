/// Camera and projection utilities
use nalgebra::{Point2, Point3};

use crate::error::CameraError;
use crate::rotation::Orientation;

/// A projected vertex: pixel coordinates plus camera-space depth.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
    pub depth: f64,
}

impl ScreenPoint {
    pub fn xy(&self) -> Point2<f64> {
        Point2::new(self.x, self.y)
    }
}

/// Pinhole camera with near/far rejection
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub width: usize,
    pub height: usize,
    pub near: f64,
    pub far: f64,
    /// Horizontal projection factor.
    pub scale_x: f64,
    /// Vertical projection factor.
    pub scale_y: f64,
    pub position: Point3<f64>,
    pub orientation: Orientation,
}

impl Camera {
    /// Camera at the origin looking down +z, with the projection factors
    /// derived from a field of view in degrees.
    pub fn new(
        width: usize,
        height: usize,
        fov: f64,
        near: f64,
        far: f64,
    ) -> Result<Self, CameraError> {
        if !(fov > 0.0 && fov < 180.0) {
            return Err(CameraError::FieldOfView(fov));
        }
        if width == 0 || height == 0 {
            return Err(CameraError::EmptyViewport { width, height });
        }
        let aspect = width as f64 / height as f64;
        let scale = 1.0 / (fov.to_radians() / 2.0).tan();
        Self::with_scales(width, height, near, far, scale, aspect * scale)
    }

    /// Camera with explicit projection factors.
    pub fn with_scales(
        width: usize,
        height: usize,
        near: f64,
        far: f64,
        scale_x: f64,
        scale_y: f64,
    ) -> Result<Self, CameraError> {
        if width == 0 || height == 0 {
            return Err(CameraError::EmptyViewport { width, height });
        }
        if !(near < far) {
            return Err(CameraError::ClipPlanes { near, far });
        }
        if !(scale_x > 0.0 && scale_y > 0.0) {
            return Err(CameraError::Scale(scale_x, scale_y));
        }
        Ok(Self {
            width,
            height,
            near,
            far,
            scale_x,
            scale_y,
            position: Point3::origin(),
            orientation: Orientation::zero(),
        })
    }

    /// Number of pixels in the viewport.
    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    /// Project a world-space point to pixel coordinates.
    ///
    /// Returns `None` when the camera-space depth is `<= near` or `> far`.
    pub fn project(&self, world: &Point3<f64>) -> Option<ScreenPoint> {
        let v = self.orientation.apply(*world - self.position);

        if v.z <= self.near || v.z > self.far {
            return None;
        }

        let ndc_x = self.scale_x * v.x / v.z;
        let ndc_y = self.scale_y * v.y / v.z;

        // Screen y grows downward
        Some(ScreenPoint {
            x: (1.0 + ndc_x) * self.width as f64 / 2.0,
            y: (1.0 - ndc_y) * self.height as f64 / 2.0,
            depth: v.z,
        })
    }

    /// Whether a projected point falls outside the viewport rectangle.
    pub fn is_outside(&self, p: &ScreenPoint) -> bool {
        p.x < 0.0 || p.x >= self.width as f64 || p.y < 0.0 || p.y >= self.height as f64
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            near: 0.1,
            far: 100.0,
            scale_x: 1.0 / 35f64.to_radians().tan(), // 70 degrees
            scale_y: 800.0 / 600.0 / 35f64.to_radians().tan(),
            position: Point3::origin(),
            orientation: Orientation::zero(),
        }
    }
}
