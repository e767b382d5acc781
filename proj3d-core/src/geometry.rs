/// Indexed triangle meshes and their precomputed normals
use std::fmt;
use std::str::FromStr;

use log::{debug, warn};
use nalgebra::{Point3, Vector3};

use crate::math::{Rgb, EPS};

/// How a mesh is lit when rasterized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShaderMode {
    /// Flat mesh colour, no lighting.
    #[default]
    None,
    /// One Lambertian term per face.
    Flat,
    /// Lambertian term per vertex, colours interpolated across the face.
    Gouraud,
    /// Normals interpolated across the face, lit per pixel.
    PerPixelNormal,
}

impl FromStr for ShaderMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(ShaderMode::None),
            "flat" => Ok(ShaderMode::Flat),
            "gouraud" => Ok(ShaderMode::Gouraud),
            "phong" | "per-pixel" => Ok(ShaderMode::PerPixelNormal),
            other => Err(format!("unknown shader mode '{}'", other)),
        }
    }
}

impl fmt::Display for ShaderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ShaderMode::None => "none",
            ShaderMode::Flat => "flat",
            ShaderMode::Gouraud => "gouraud",
            ShaderMode::PerPixelNormal => "phong",
        };
        f.write_str(name)
    }
}

/// A triangle referencing three mesh vertices.
///
/// Vertex indices are 1-based, as in OBJ files. The normal slots stay `None`
/// until normal precomputation resolves them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Face {
    vertices: [usize; 3],
    face_normal: Option<usize>,
    vertex_normals: [Option<usize>; 3],
}

impl Face {
    pub fn new(a: usize, b: usize, c: usize) -> Self {
        Self {
            vertices: [a, b, c],
            face_normal: None,
            vertex_normals: [None; 3],
        }
    }

    /// 1-based vertex indices.
    pub fn vertices(&self) -> [usize; 3] {
        self.vertices
    }

    /// Index into the mesh's face normals, once resolved.
    pub fn face_normal(&self) -> Option<usize> {
        self.face_normal
    }

    /// Indices into the mesh's vertex normals, once resolved.
    pub fn vertex_normals(&self) -> [Option<usize>; 3] {
        self.vertex_normals
    }

    /// Which corner (0, 1 or 2) holds the 1-based `vertex`.
    pub fn corner_of(&self, vertex: usize) -> Option<usize> {
        self.vertices.iter().position(|&v| v == vertex)
    }
}

/// Everything the rasterizer needs about one drawable face.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedFace {
    pub positions: [Point3<f64>; 3],
    pub normal: Vector3<f64>,
    pub vertex_normals: [Vector3<f64>; 3],
}

/// Faces touching each vertex, used to average vertex normals.
///
/// Entry `i` lists 0-based face indices for the vertex with 1-based index
/// `i + 1`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Adjacency {
    faces: Vec<Vec<usize>>,
}

impl Adjacency {
    /// Adjacency supplied by an external loader.
    pub fn from_lists(faces: Vec<Vec<usize>>) -> Self {
        Self { faces }
    }

    /// Build the adjacency of `mesh`, in face order.
    ///
    /// Only faces with a resolved face normal are listed.
    pub fn build(mesh: &Mesh) -> Self {
        let mut faces = vec![Vec::new(); mesh.vertices.len()];
        for (fi, face) in mesh.faces.iter().enumerate() {
            if face.face_normal.is_none() {
                continue;
            }
            for &v in &face.vertices {
                if let Some(list) = v.checked_sub(1).and_then(|i| faces.get_mut(i)) {
                    list.push(fi);
                }
            }
        }
        Self { faces }
    }

    pub fn len(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Faces touching the 0-based vertex `vertex`.
    pub fn faces_of(&self, vertex: usize) -> &[usize] {
        self.faces.get(vertex).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// A positioned, coloured, indexed triangle mesh
#[derive(Debug, Clone)]
pub struct Mesh {
    vertices: Vec<Point3<f64>>,
    faces: Vec<Face>,
    face_normals: Vec<Option<Vector3<f64>>>,
    vertex_normals: Vec<Option<Vector3<f64>>>,
    /// World-space translation added to every vertex.
    pub position: Vector3<f64>,
    pub color: Rgb,
    pub shader: ShaderMode,
}

impl Mesh {
    pub fn new(vertices: Vec<Point3<f64>>, faces: Vec<Face>) -> Self {
        Self {
            face_normals: vec![None; faces.len()],
            vertex_normals: vec![None; vertices.len()],
            vertices,
            faces,
            position: Vector3::zeros(),
            color: Rgb::WHITE,
            shader: ShaderMode::None,
        }
    }

    pub fn vertices(&self) -> &[Point3<f64>] {
        &self.vertices
    }

    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    /// Vertex by 1-based index.
    pub fn vertex(&self, index: usize) -> Option<Point3<f64>> {
        index.checked_sub(1).and_then(|i| self.vertices.get(i)).copied()
    }

    pub fn face_normal(&self, index: usize) -> Option<Vector3<f64>> {
        self.face_normals.get(index).copied().flatten()
    }

    /// Vertex normal by 0-based vertex index.
    pub fn vertex_normal(&self, index: usize) -> Option<Vector3<f64>> {
        self.vertex_normals.get(index).copied().flatten()
    }

    /// Positions and normals of a face, or `None` if any part is unresolved
    /// or out of range.
    pub fn resolve(&self, face: &Face) -> Option<ResolvedFace> {
        let normal = self.face_normal(face.face_normal?)?;
        let [n1, n2, n3] = face.vertex_normals;
        let vertex_normals = [
            self.vertex_normal(n1?)?,
            self.vertex_normal(n2?)?,
            self.vertex_normal(n3?)?,
        ];
        Some(ResolvedFace {
            positions: corner_positions(&self.vertices, face)?,
            normal,
            vertex_normals,
        })
    }

    /// Compute a unit normal for every face.
    ///
    /// Faces with out-of-range indices or collinear vertices keep an
    /// unresolved normal. Returns the number of resolved faces.
    pub fn compute_face_normals(&mut self) -> usize {
        let Mesh {
            vertices,
            faces,
            face_normals,
            ..
        } = self;

        face_normals.clear();
        face_normals.resize(faces.len(), None);

        let mut resolved = 0;
        for (fi, face) in faces.iter_mut().enumerate() {
            face.face_normal = None;

            let Some([w1, w2, w3]) = corner_positions(vertices, face) else {
                warn!(
                    "face {} references missing vertices {:?} (mesh has {}), skipping it",
                    fi + 1,
                    face.vertices,
                    vertices.len()
                );
                continue;
            };

            let normal = (w2 - w1).cross(&(w3 - w1));
            let len = normal.norm();
            if len >= EPS {
                face_normals[fi] = Some(normal / len);
                face.face_normal = Some(fi);
                resolved += 1;
            }
        }

        debug!(
            "face normals: {} resolved, {} degenerate or invalid",
            resolved,
            faces.len() - resolved
        );
        resolved
    }

    /// Compute angle-weighted vertex normals from the faces in `adjacency`.
    ///
    /// Each adjacent face with a resolved normal contributes that normal
    /// weighted by its interior angle at the vertex, and gets the vertex's
    /// slot recorded in the matching corner. Returns the number of resolved
    /// vertex normals.
    pub fn compute_vertex_normals(&mut self, adjacency: &Adjacency) -> usize {
        let Mesh {
            vertices,
            faces,
            face_normals,
            vertex_normals,
            ..
        } = self;

        vertex_normals.clear();
        vertex_normals.resize(vertices.len(), None);
        for face in faces.iter_mut() {
            face.vertex_normals = [None; 3];
        }

        if adjacency.len() > vertices.len() {
            warn!(
                "adjacency lists {} vertices, mesh has {}; ignoring the extra lists",
                adjacency.len(),
                vertices.len()
            );
        }

        let mut resolved = 0;
        for vi in 0..vertices.len() {
            let mut sum = Vector3::zeros();

            for &fi in adjacency.faces_of(vi) {
                let Some(face) = faces.get_mut(fi) else {
                    warn!("vertex {} lists missing face {}", vi + 1, fi + 1);
                    continue;
                };
                let Some(normal) = face.face_normal.and_then(|k| face_normals[k]) else {
                    continue;
                };
                let Some(corner) = face.corner_of(vi + 1) else {
                    warn!("vertex {} lists face {} which does not use it", vi + 1, fi + 1);
                    continue;
                };
                let Some(angle) = corner_angle(vertices, face, corner) else {
                    continue;
                };

                face.vertex_normals[corner] = Some(vi);
                sum += normal * angle;
            }

            let len = sum.norm();
            if len >= EPS {
                vertex_normals[vi] = Some(sum / len);
                resolved += 1;
            }
        }

        debug!(
            "vertex normals: {} resolved, {} unresolved",
            resolved,
            vertices.len() - resolved
        );
        resolved
    }

    /// Run the full normal precomputation a loader performs after parsing:
    /// face normals, adjacency, vertex normals.
    pub fn prepare(&mut self) {
        self.compute_face_normals();
        let adjacency = Adjacency::build(self);
        self.compute_vertex_normals(&adjacency);
    }

    /// Create a cube centred on the origin with outward-facing triangles
    pub fn cube(size: f64) -> Self {
        let h = size / 2.0;
        let vertices = vec![
            Point3::new(-h, -h, -h),
            Point3::new(h, -h, -h),
            Point3::new(h, h, -h),
            Point3::new(-h, h, -h),
            Point3::new(-h, -h, h),
            Point3::new(h, -h, h),
            Point3::new(h, h, h),
            Point3::new(-h, h, h),
        ];
        let faces = vec![
            // Back
            Face::new(1, 4, 3),
            Face::new(1, 3, 2),
            // Front
            Face::new(5, 6, 7),
            Face::new(5, 7, 8),
            // Left
            Face::new(1, 5, 8),
            Face::new(1, 8, 4),
            // Right
            Face::new(2, 3, 7),
            Face::new(2, 7, 6),
            // Bottom
            Face::new(1, 2, 6),
            Face::new(1, 6, 5),
            // Top
            Face::new(4, 8, 7),
            Face::new(4, 7, 3),
        ];
        Self::new(vertices, faces)
    }
}

fn corner_positions(vertices: &[Point3<f64>], face: &Face) -> Option<[Point3<f64>; 3]> {
    let at = |i: usize| i.checked_sub(1).and_then(|i| vertices.get(i)).copied();
    Some([at(face.vertices[0])?, at(face.vertices[1])?, at(face.vertices[2])?])
}

/// Interior angle of `face` at `corner`, in radians.
fn corner_angle(vertices: &[Point3<f64>], face: &Face, corner: usize) -> Option<f64> {
    let w = corner_positions(vertices, face)?;
    let origin = w[corner];
    let e1 = w[(corner + 1) % 3] - origin;
    let e2 = w[(corner + 2) % 3] - origin;
    let cos = e1.dot(&e2) / (e1.norm() * e2.norm());
    Some(cos.clamp(-1.0, 1.0).acos())
}
