/// Vector helpers, 2D orientation tests and colour packing
use nalgebra::{Point2, Vector3};

/// Lengths below this are treated as zero.
pub const EPS: f64 = 1e-13;

/// Normalize `v`, returning it unchanged when its length is below [`EPS`].
///
/// Unlike `Vector3::normalize` this never produces NaNs for degenerate input.
pub fn normalized(v: Vector3<f64>) -> Vector3<f64> {
    let len = v.norm();
    if len < EPS {
        return v;
    }
    v / len
}

/// Lambertian term: cosine between `normal` and `light_dir`, clamped at zero.
pub fn lambert(normal: &Vector3<f64>, light_dir: &Vector3<f64>) -> f64 {
    normal.dot(light_dir).max(0.0)
}

pub fn min3(a: f64, b: f64, c: f64) -> f64 {
    a.min(b).min(c)
}

pub fn max3(a: f64, b: f64, c: f64) -> f64 {
    a.max(b).max(c)
}

/// Which side of the directed line `p2 -> p3` the point `p1` lies on.
pub fn orientation(p1: &Point2<f64>, p2: &Point2<f64>, p3: &Point2<f64>) -> f64 {
    (p1.x - p3.x) * (p2.y - p3.y) - (p2.x - p3.x) * (p1.y - p3.y)
}

/// Twice the signed area of the screen triangle `a, b, c`.
///
/// Positive for the winding that survives back-face culling.
pub fn signed_area(a: &Point2<f64>, b: &Point2<f64>, c: &Point2<f64>) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (c.x - a.x) * (b.y - a.y)
}

/// Point-in-triangle test built from three half-plane checks.
///
/// Each edge contributes `orientation < 0`; the point is inside when all three
/// agree. Points exactly on an edge therefore belong to triangles of one
/// winding only, which can double-cover or gap shared edges.
pub fn point_in_triangle(
    p: &Point2<f64>,
    a: &Point2<f64>,
    b: &Point2<f64>,
    c: &Point2<f64>,
) -> bool {
    let b1 = orientation(p, a, b) < 0.0;
    let b2 = orientation(p, b, c) < 0.0;
    let b3 = orientation(p, c, a) < 0.0;
    b1 == b2 && b2 == b3
}

/// Pack three channels and an opaque alpha into one pixel.
///
/// Red is the least significant byte, alpha the most. Channels are truncated
/// toward zero and never clamped: a channel above 255 carries into its
/// neighbour.
pub fn pack_rgb(r: f64, g: f64, b: f64) -> u32 {
    let packed = ((255 * 256 + b as i64) * 256 + g as i64) * 256 + r as i64;
    packed as u32
}

/// Flat 8-bit RGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn pack(self) -> u32 {
        pack_rgb(self.r as f64, self.g as f64, self.b as f64)
    }

    /// Each channel scaled by `k`, as unrounded floats.
    pub fn scaled(self, k: f64) -> [f64; 3] {
        [k * self.r as f64, k * self.g as f64, k * self.b as f64]
    }

    /// Colour scaled by `k` and packed.
    pub fn shade(self, k: f64) -> u32 {
        let [r, g, b] = self.scaled(k);
        pack_rgb(r, g, b)
    }

    /// Unpack the three colour channels of a packed pixel.
    pub fn unpack(pixel: u32) -> Self {
        Self {
            r: (pixel & 0xff) as u8,
            g: ((pixel >> 8) & 0xff) as u8,
            b: ((pixel >> 16) & 0xff) as u8,
        }
    }
}

impl Default for Rgb {
    fn default() -> Self {
        Self::WHITE
    }
}
