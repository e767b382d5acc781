/// Z-buffered triangle rasterizer with flat, Gouraud and per-pixel shading
///
/// Faces are drawn in list order. A pixel is overwritten only by a strictly
/// closer depth, so at equal depth the earlier face wins. `render_parallel`
/// splits the viewport into horizontal bands and walks every face in the same
/// order inside each band, producing identical buffers.
use log::debug;
use nalgebra::{Point2, Point3, Vector3};
use rayon::prelude::*;

use crate::error::RenderError;
use crate::geometry::{Face, Mesh, ShaderMode};
use crate::math::{lambert, max3, min3, normalized, pack_rgb, point_in_triangle, signed_area, Rgb};
use crate::projection::{Camera, ScreenPoint};

/// Rows per band in [`render_parallel`].
const BAND_ROWS: usize = 16;

/// Colour and depth buffers sized for one viewport.
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    pub width: usize,
    pub height: usize,
    pub color: Vec<u32>,
    pub depth: Vec<f64>,
}

impl FrameBuffer {
    pub fn new(width: usize, height: usize) -> Self {
        let size = width * height;
        Self {
            width,
            height,
            color: vec![Rgb::new(0, 0, 0).pack(); size],
            depth: vec![f64::INFINITY; size],
        }
    }

    pub fn for_camera(camera: &Camera) -> Self {
        Self::new(camera.width, camera.height)
    }

    /// Fill the colour buffer with `background` and reset every depth to +inf.
    pub fn clear(&mut self, background: u32) {
        self.color.fill(background);
        self.depth.fill(f64::INFINITY);
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<u32> {
        if x >= self.width {
            return None;
        }
        self.color.get(y * self.width + x).copied()
    }

    pub fn depth_at(&self, x: usize, y: usize) -> Option<f64> {
        if x >= self.width {
            return None;
        }
        self.depth.get(y * self.width + x).copied()
    }

    /// Draw `mesh` into these buffers. See [`render`].
    pub fn render(
        &mut self,
        camera: &Camera,
        mesh: &Mesh,
        light: &Point3<f64>,
    ) -> Result<RenderStats, RenderError> {
        render(&mut self.color, &mut self.depth, camera, mesh, light)
    }
}

/// Per-frame counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Faces that reached the rasterization loop.
    pub drawn: usize,
    /// Faces whose normals or vertices never resolved.
    pub unresolved: usize,
    /// Faces with a vertex outside the near/far band.
    pub clipped: usize,
    /// Faces with every vertex outside the viewport.
    pub offscreen: usize,
    /// Faces facing away from the camera or seen edge-on.
    pub backfacing: usize,
    /// Pixels that passed the depth test.
    pub pixels: usize,
}

impl RenderStats {
    fn record(&mut self, skip: Skip) {
        match skip {
            Skip::Unresolved => self.unresolved += 1,
            Skip::Clipped => self.clipped += 1,
            Skip::Offscreen => self.offscreen += 1,
            Skip::BackFacing => self.backfacing += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Skip {
    Unresolved,
    Clipped,
    Offscreen,
    BackFacing,
}

/// Per-triangle lighting state computed before the pixel loop.
#[derive(Debug, Clone, Copy)]
enum Shading {
    /// One colour for the whole triangle (no shading, flat shading).
    Constant(u32),
    /// Truncated per-vertex colours, blended per pixel.
    Gouraud([[f64; 3]; 3]),
    /// Normal and position interpolated per pixel.
    PerPixel,
}

/// A face that passed every gate, ready for the pixel loop.
#[derive(Debug, Clone, Copy)]
struct Triangle {
    screen: [ScreenPoint; 3],
    world: [Point3<f64>; 3],
    normals: [Vector3<f64>; 3],
    area: f64,
    shading: Shading,
    x_range: (i64, i64),
    y_range: (i64, i64),
}

/// Rows `first_row..` of the caller's buffers.
struct Band<'a> {
    color: &'a mut [u32],
    depth: &'a mut [f64],
    width: usize,
    first_row: usize,
}

impl Band<'_> {
    fn rows(&self) -> usize {
        self.color.len() / self.width
    }
}

/// Draw every visible face of `mesh` into caller-owned buffers.
///
/// Both buffers must hold `camera.width * camera.height` values and be
/// initialised by the caller (depth to something larger than any reachable
/// depth, e.g. `f64::INFINITY`). Pixels no triangle covers keep their value.
/// The only error is a buffer of the wrong size; faces that cannot be drawn
/// are skipped and counted in the returned [`RenderStats`].
pub fn render(
    color: &mut [u32],
    depth: &mut [f64],
    camera: &Camera,
    mesh: &Mesh,
    light: &Point3<f64>,
) -> Result<RenderStats, RenderError> {
    check_buffers(color, depth, camera)?;

    let mut band = Band {
        color,
        depth,
        width: camera.width,
        first_row: 0,
    };
    let mut stats = RenderStats::default();

    for face in mesh.faces() {
        match prepare(camera, mesh, face, light) {
            Ok(triangle) => {
                stats.drawn += 1;
                stats.pixels += rasterize(&triangle, &mut band, mesh.color, light);
            }
            Err(skip) => stats.record(skip),
        }
    }

    debug!("render: {:?}", stats);
    Ok(stats)
}

/// [`render`] with the viewport split into bands of rows drawn on the rayon
/// pool. Produces the same buffers as [`render`].
pub fn render_parallel(
    color: &mut [u32],
    depth: &mut [f64],
    camera: &Camera,
    mesh: &Mesh,
    light: &Point3<f64>,
) -> Result<RenderStats, RenderError> {
    check_buffers(color, depth, camera)?;

    let prepared: Vec<Result<Triangle, Skip>> = mesh
        .faces()
        .par_iter()
        .map(|face| prepare(camera, mesh, face, light))
        .collect();

    let mut stats = RenderStats::default();
    let mut triangles = Vec::with_capacity(prepared.len());
    for result in prepared {
        match result {
            Ok(triangle) => triangles.push(triangle),
            Err(skip) => stats.record(skip),
        }
    }
    stats.drawn = triangles.len();

    let width = camera.width;
    let chunk = width * BAND_ROWS;
    stats.pixels = color
        .par_chunks_mut(chunk)
        .zip(depth.par_chunks_mut(chunk))
        .enumerate()
        .map(|(i, (color, depth))| {
            let mut band = Band {
                color,
                depth,
                width,
                first_row: i * BAND_ROWS,
            };
            triangles
                .iter()
                .map(|t| rasterize(t, &mut band, mesh.color, light))
                .sum::<usize>()
        })
        .sum();

    debug!("render_parallel: {:?}", stats);
    Ok(stats)
}

fn check_buffers(color: &[u32], depth: &[f64], camera: &Camera) -> Result<(), RenderError> {
    // The fields are public, so a validated camera can still be emptied.
    if camera.width == 0 || camera.height == 0 {
        return Err(RenderError::EmptyViewport {
            width: camera.width,
            height: camera.height,
        });
    }
    let expected = camera.pixel_count();
    if color.len() != expected {
        return Err(RenderError::BufferSize {
            buffer: "color",
            expected,
            actual: color.len(),
        });
    }
    if depth.len() != expected {
        return Err(RenderError::BufferSize {
            buffer: "depth",
            expected,
            actual: depth.len(),
        });
    }
    Ok(())
}

/// Run the per-face gates and shading setup.
fn prepare(
    camera: &Camera,
    mesh: &Mesh,
    face: &Face,
    light: &Point3<f64>,
) -> Result<Triangle, Skip> {
    let resolved = mesh.resolve(face).ok_or(Skip::Unresolved)?;
    let world = resolved.positions.map(|p| p + mesh.position);

    let [v1, v2, v3] = [
        camera.project(&world[0]),
        camera.project(&world[1]),
        camera.project(&world[2]),
    ];
    let screen = [v1.ok_or(Skip::Clipped)?, v2.ok_or(Skip::Clipped)?, v3.ok_or(Skip::Clipped)?];

    if screen.iter().all(|p| camera.is_outside(p)) {
        return Err(Skip::Offscreen);
    }

    let area = signed_area(&screen[0].xy(), &screen[1].xy(), &screen[2].xy());
    // Negative is back-facing; zero (or NaN) covers no pixels.
    if !(area > 0.0) {
        return Err(Skip::BackFacing);
    }

    let shading = match mesh.shader {
        ShaderMode::None => Shading::Constant(mesh.color.pack()),
        ShaderMode::Flat => {
            let sum = world[0].coords + world[1].coords + world[2].coords;
            let centroid = Point3::from(sum / 3.0);
            let cos = lambert(&resolved.normal, &normalized(*light - centroid));
            Shading::Constant(mesh.color.shade(cos))
        }
        ShaderMode::Gouraud => {
            let vertex_color = |i: usize| {
                let cos = lambert(&resolved.vertex_normals[i], &normalized(*light - world[i]));
                mesh.color.scaled(cos).map(f64::trunc)
            };
            Shading::Gouraud([vertex_color(0), vertex_color(1), vertex_color(2)])
        }
        ShaderMode::PerPixelNormal => Shading::PerPixel,
    };

    let xs = (screen[0].x, screen[1].x, screen[2].x);
    let ys = (screen[0].y, screen[1].y, screen[2].y);
    let x_range = (
        min3(xs.0, xs.1, xs.2).max(0.0) as i64,
        max3(xs.0, xs.1, xs.2).min((camera.width - 1) as f64) as i64,
    );
    let y_range = (
        min3(ys.0, ys.1, ys.2).max(0.0) as i64,
        max3(ys.0, ys.1, ys.2).min((camera.height - 1) as f64) as i64,
    );

    Ok(Triangle {
        screen,
        world,
        normals: resolved.vertex_normals,
        area,
        shading,
        x_range,
        y_range,
    })
}

/// Fill the part of `triangle` that falls inside `band`. Returns the number of
/// pixels written.
fn rasterize(triangle: &Triangle, band: &mut Band<'_>, base: Rgb, light: &Point3<f64>) -> usize {
    let [s1, s2, s3] = triangle.screen;
    let (a, b, c) = (s1.xy(), s2.xy(), s3.xy());

    let first = band.first_row as i64;
    let last = first + band.rows() as i64 - 1;
    let y_min = triangle.y_range.0.max(first);
    let y_max = triangle.y_range.1.min(last);

    let mut written = 0;
    for y in y_min..=y_max {
        for x in triangle.x_range.0..=triangle.x_range.1 {
            let p = Point2::new(x as f64, y as f64);
            if !point_in_triangle(&p, &a, &b, &c) {
                continue;
            }

            // Perspective-correct barycentric weights
            let w1 = signed_area(&b, &c, &p) / (triangle.area * s1.depth);
            let w2 = signed_area(&c, &a, &p) / (triangle.area * s2.depth);
            let w3 = signed_area(&a, &b, &p) / (triangle.area * s3.depth);
            let z = 1.0 / (w1 + w2 + w3);

            let idx = (y - first) as usize * band.width + x as usize;
            if !(z < band.depth[idx]) {
                continue;
            }
            band.depth[idx] = z;

            band.color[idx] = match triangle.shading {
                Shading::Constant(color) => color,
                Shading::Gouraud([c1, c2, c3]) => {
                    let g = |k: usize| c1[k] * w1 + c2[k] * w2 + c3[k] * w3;
                    pack_rgb(z * g(0), z * g(1), z * g(2))
                }
                Shading::PerPixel => {
                    let [n1, n2, n3] = triangle.normals;
                    let [p1, p2, p3] = triangle.world;
                    let normal = normalized((n1 * w1 + n2 * w2 + n3 * w3) * z);
                    let coords = p1.coords * w1 + p2.coords * w2 + p3.coords * w3;
                    let point = Point3::from(coords * z);
                    let cos = lambert(&normal, &normalized(*light - point));
                    base.shade(cos)
                }
            };
            written += 1;
        }
    }
    written
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const BACKGROUND: u32 = 0xff20_2020;

    fn camera() -> Camera {
        let mut camera = Camera::with_scales(100, 100, 0.1, 100.0, 1.0, 1.0).unwrap();
        camera.position = Point3::new(0.0, 0.0, -5.0);
        camera
    }

    fn frame(camera: &Camera) -> FrameBuffer {
        let mut fb = FrameBuffer::for_camera(camera);
        fb.clear(BACKGROUND);
        fb
    }

    /// Camera-facing triangle at depth `z`.
    fn facing_triangle(z: f64, color: Rgb) -> Mesh {
        let mut mesh = Mesh::new(
            vec![
                Point3::new(-1.0, -1.0, z),
                Point3::new(0.0, 1.0, z),
                Point3::new(1.0, -1.0, z),
            ],
            vec![Face::new(1, 2, 3)],
        );
        mesh.color = color;
        mesh.prepare();
        mesh
    }

    #[test]
    fn test_frame_buffer_clear() {
        let mut fb = FrameBuffer::new(4, 3);
        fb.color[5] = 7;
        fb.depth[5] = 1.0;
        fb.clear(BACKGROUND);
        assert!(fb.color.iter().all(|&c| c == BACKGROUND));
        assert!(fb.depth.iter().all(|d| d.is_infinite()));
        assert_eq!(fb.pixel(3, 2), Some(BACKGROUND));
        assert_eq!(fb.pixel(4, 0), None);
        assert_eq!(fb.depth_at(0, 3), None);
    }

    #[test]
    fn test_buffer_size_mismatch() {
        let camera = camera();
        let mesh = facing_triangle(0.0, Rgb::WHITE);
        let mut color = vec![0; 99];
        let mut depth = vec![f64::INFINITY; 100 * 100];
        let err = render(&mut color, &mut depth, &camera, &mesh, &Point3::origin()).unwrap_err();
        assert_eq!(
            err,
            RenderError::BufferSize {
                buffer: "color",
                expected: 10_000,
                actual: 99
            }
        );
    }

    #[test]
    fn test_emptied_viewport_is_an_error() {
        let mut camera = camera();
        camera.width = 0;
        let mesh = facing_triangle(0.0, Rgb::WHITE);
        let expected = RenderError::EmptyViewport { width: 0, height: 100 };

        let (mut color, mut depth) = (Vec::new(), Vec::new());
        let err = render(&mut color, &mut depth, &camera, &mesh, &Point3::origin()).unwrap_err();
        assert_eq!(err, expected);
        let err = render_parallel(&mut color, &mut depth, &camera, &mesh, &Point3::origin())
            .unwrap_err();
        assert_eq!(err, expected);
    }

    #[test]
    fn test_facing_triangle_is_drawn() {
        let camera = camera();
        let mut fb = frame(&camera);
        let mesh = facing_triangle(0.0, Rgb::new(255, 0, 0));
        let stats = fb.render(&camera, &mesh, &Point3::origin()).unwrap();
        assert_eq!(stats.drawn, 1);
        assert!(stats.pixels > 0);
        assert_eq!(fb.pixel(50, 50), Some(0xff00_00ff));
        assert!((fb.depth_at(50, 50).unwrap() - 5.0).abs() < 1e-9);
        assert_eq!(fb.pixel(0, 0), Some(BACKGROUND));
    }

    #[test]
    fn test_back_face_is_culled() {
        let camera = camera();
        let mut fb = frame(&camera);
        let mut mesh = Mesh::new(
            vec![
                Point3::new(-1.0, -1.0, 0.0),
                Point3::new(1.0, -1.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            vec![Face::new(1, 2, 3)],
        );
        mesh.prepare();
        let stats = fb.render(&camera, &mesh, &Point3::origin()).unwrap();
        assert_eq!(stats.backfacing, 1);
        assert_eq!(stats.pixels, 0);
        assert!(fb.color.iter().all(|&c| c == BACKGROUND));
    }

    #[test]
    fn test_clipped_and_offscreen_faces_are_skipped() {
        let camera = camera();
        let mut fb = frame(&camera);

        let mut behind = facing_triangle(-10.0, Rgb::WHITE);
        behind.shader = ShaderMode::Flat;
        let stats = fb.render(&camera, &behind, &Point3::origin()).unwrap();
        assert_eq!(stats.clipped, 1);

        let mut aside = facing_triangle(0.0, Rgb::WHITE);
        aside.position = Vector3::new(50.0, 0.0, 0.0);
        let stats = fb.render(&camera, &aside, &Point3::origin()).unwrap();
        assert_eq!(stats.offscreen, 1);

        assert!(fb.color.iter().all(|&c| c == BACKGROUND));
        assert!(fb.depth.iter().all(|d| d.is_infinite()));
    }

    #[test]
    fn test_unresolved_face_is_skipped() {
        let camera = camera();
        let mut fb = frame(&camera);
        // Normals never computed.
        let mesh = Mesh::new(
            vec![
                Point3::new(-1.0, -1.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
                Point3::new(1.0, -1.0, 0.0),
            ],
            vec![Face::new(1, 2, 3)],
        );
        let stats = fb.render(&camera, &mesh, &Point3::origin()).unwrap();
        assert_eq!(stats.unresolved, 1);
        assert_eq!(stats.drawn, 0);
    }

    #[test]
    fn test_partially_visible_triangle_is_clamped() {
        let camera = camera();
        let mut fb = frame(&camera);
        let mut mesh = facing_triangle(0.0, Rgb::WHITE);
        mesh.position = Vector3::new(-5.0, 0.0, 0.0);
        let stats = fb.render(&camera, &mesh, &Point3::origin()).unwrap();
        assert_eq!(stats.drawn, 1);
        assert_eq!(fb.pixel(0, 50), Some(Rgb::WHITE.pack()));
    }

    #[test]
    fn test_flat_shading_uses_face_centroid() {
        let camera = camera();
        let mut fb = frame(&camera);
        let mut mesh = facing_triangle(0.0, Rgb::new(200, 100, 50));
        mesh.shader = ShaderMode::Flat;

        // Light straight in front of the face: full intensity.
        fb.render(&camera, &mesh, &Point3::new(0.0, -1.0 / 3.0, -5.0)).unwrap();
        assert_eq!(fb.pixel(50, 50), Some(Rgb::new(200, 100, 50).pack()));

        // Light behind the face: black.
        fb.clear(BACKGROUND);
        fb.render(&camera, &mesh, &Point3::new(0.0, 0.0, 5.0)).unwrap();
        assert_eq!(fb.pixel(50, 50), Some(0xff00_0000));
    }

    #[test]
    fn test_gouraud_constant_light_matches_flat() {
        let camera = camera();
        let light = Point3::new(0.0, 0.0, -1000.0);
        let mut mesh = facing_triangle(0.0, Rgb::new(255, 255, 255));

        mesh.shader = ShaderMode::Gouraud;
        let mut gouraud = frame(&camera);
        gouraud.render(&camera, &mesh, &light).unwrap();

        // Every vertex sees the light almost head on, so each channel lands
        // within one step of the flat colour.
        let pixel = Rgb::unpack(gouraud.pixel(50, 55).unwrap());
        assert!(pixel.r >= 253 && pixel.g >= 253 && pixel.b >= 253, "{:?}", pixel);
    }

    #[test]
    fn test_per_pixel_normal_shading() {
        let camera = camera();
        let mut fb = frame(&camera);
        let mut mesh = facing_triangle(0.0, Rgb::new(100, 100, 100));
        mesh.shader = ShaderMode::PerPixelNormal;
        // Light in the plane of the face: grazing everywhere.
        fb.render(&camera, &mesh, &Point3::new(0.0, 0.0, 0.0)).unwrap();
        assert_eq!(fb.pixel(50, 50), Some(0xff00_0000));

        fb.clear(BACKGROUND);
        fb.render(&camera, &mesh, &Point3::new(0.0, 0.0, -5.0)).unwrap();
        let centre = Rgb::unpack(fb.pixel(50, 50).unwrap());
        let edge = Rgb::unpack(fb.pixel(50, 58).unwrap());
        assert_eq!(centre, Rgb::new(100, 100, 100));
        assert!(edge.r < centre.r);
    }

    /// Two faces folded along a vertical ridge toward the camera. The ridge
    /// vertices average both faces, so their normals differ from the face
    /// normals.
    fn ridge(shader: ShaderMode) -> Mesh {
        let mut mesh = Mesh::new(
            vec![
                Point3::new(-1.5, 0.0, 0.5),
                Point3::new(0.0, 1.2, -0.3),
                Point3::new(0.0, -1.2, -0.3),
                Point3::new(1.5, 0.0, 0.5),
            ],
            vec![Face::new(1, 2, 3), Face::new(3, 2, 4)],
        );
        mesh.color = Rgb::new(200, 150, 100);
        mesh.shader = shader;
        mesh.prepare();
        mesh
    }

    #[test]
    fn test_ridge_vertex_normals_bend() {
        let mesh = ridge(ShaderMode::None);
        let left = Vector3::new(-8.0, 0.0, -15.0) / 17.0;
        assert_relative_eq!(mesh.face_normal(0).unwrap(), left, epsilon = 1e-12);
        assert_relative_eq!(mesh.vertex_normal(0).unwrap(), left, epsilon = 1e-12);
        for ridge_vertex in [1, 2] {
            assert_relative_eq!(
                mesh.vertex_normal(ridge_vertex).unwrap(),
                Vector3::new(0.0, 0.0, -1.0),
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn test_gouraud_blends_vertex_colours() {
        // Left face vertex colours truncate to (143,107,71), (171,128,85)
        // and (115,86,57); the right face's outer vertex to (56,42,28).
        // Each pixel is z * sum(colour_i * w_i), truncated when packed.
        let camera = camera();
        let mut fb = frame(&camera);
        let mesh = ridge(ShaderMode::Gouraud);
        let stats = fb.render(&camera, &mesh, &Point3::new(-1.0, 1.0, -2.0)).unwrap();
        assert_eq!(stats.drawn, 2);

        // (154.7, 115.8, 76.9)
        assert_eq!(fb.pixel(44, 45), Some(0xff4c_739a));
        // (129.1, 96.6, 64.0)
        assert_eq!(fb.pixel(45, 56), Some(0xff40_6081));
        // (121.2, 90.7, 60.2) on the right face
        assert_eq!(fb.pixel(55, 47), Some(0xff3c_5a79));
    }

    #[test]
    fn test_per_pixel_normal_interpolates_and_renormalises() {
        let camera = camera();
        let mut fb = frame(&camera);
        let mesh = ridge(ShaderMode::PerPixelNormal);
        fb.render(&camera, &mesh, &Point3::new(-1.0, 1.0, -2.0)).unwrap();

        // (194.4, 145.8, 97.2); without renormalising it would be (188, 141, 94).
        assert_eq!(fb.pixel(44, 45), Some(0xff61_91c2));
        // (156.5, 117.4, 78.3)
        assert_eq!(fb.pixel(45, 56), Some(0xff4e_759c));
        // (132.4, 99.3, 66.2)
        assert_eq!(fb.pixel(55, 47), Some(0xff42_6384));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let mut camera = Camera::with_scales(90, 70, 0.1, 100.0, 1.2, 1.5).unwrap();
        camera.position = Point3::new(1.0, 1.5, -4.0);
        camera.orientation = crate::rotation::Orientation::new(-12.0, 18.0);
        let light = Point3::new(2.0, 3.0, -3.0);

        for shader in [
            ShaderMode::None,
            ShaderMode::Flat,
            ShaderMode::Gouraud,
            ShaderMode::PerPixelNormal,
        ] {
            let mut mesh = Mesh::cube(2.0);
            mesh.shader = shader;
            mesh.color = Rgb::new(180, 120, 60);
            mesh.prepare();

            let mut seq = frame(&camera);
            let mut par = frame(&camera);
            let a = seq.render(&camera, &mesh, &light).unwrap();
            let b =
                render_parallel(&mut par.color, &mut par.depth, &camera, &mesh, &light).unwrap();
            assert_eq!(a, b);
            assert!(a.pixels > 0);
            assert_eq!(seq.color, par.color);
            assert_eq!(seq.depth, par.depth);
        }
    }
}
