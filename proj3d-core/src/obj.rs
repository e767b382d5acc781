/// Wavefront OBJ loader for vertex positions and triangulated faces
use std::fs;
use std::path::Path;

use log::info;
use nalgebra::Point3;
use nom::{
    bytes::complete::{tag, take_till},
    character::complete::{i64 as integer, space1},
    multi::many1,
    number::complete::double,
    sequence::preceded,
    IResult,
};

use crate::error::{LoadError, LoadResult};
use crate::geometry::{Face, Mesh};

/// Load an OBJ file and precompute its normals.
pub fn load_obj_file<P: AsRef<Path>>(path: P) -> LoadResult<Mesh> {
    let path = path.as_ref();
    info!("Loading OBJ model from: {}.", path.display());
    let text = fs::read_to_string(path)?;
    let mesh = parse_obj(&text)?;
    info!(
        "OBJ loaded, vertices = {}, faces = {}.",
        mesh.vertices().len(),
        mesh.faces().len()
    );
    Ok(mesh)
}

/// Parse OBJ text and precompute its normals.
///
/// Only `v` and `f` statements are read. Polygons are fan-triangulated and
/// negative (relative) indices are resolved against the vertices read so far.
pub fn parse_obj(input: &str) -> LoadResult<Mesh> {
    let mut vertices = Vec::new();
    let mut faces = Vec::new();

    for (n, raw) in input.lines().enumerate() {
        let line_no = n + 1;
        let line = raw.trim();
        match line.split_whitespace().next() {
            Some("v") => {
                let (_, v) = parse_vertex(line).map_err(|_| LoadError::Parse {
                    line: line_no,
                    kind: "vertex",
                })?;
                vertices.push(v);
            }
            Some("f") => {
                let indices = match parse_face(line) {
                    Ok((rest, indices)) if is_trailing(rest) => indices,
                    _ => {
                        return Err(LoadError::Parse {
                            line: line_no,
                            kind: "face",
                        })
                    }
                };
                if indices.len() < 3 {
                    return Err(LoadError::ShortFace {
                        line: line_no,
                        count: indices.len(),
                    });
                }

                let resolved = indices
                    .iter()
                    .map(|&i| resolve_index(i, vertices.len(), line_no))
                    .collect::<LoadResult<Vec<_>>>()?;
                for k in 1..resolved.len() - 1 {
                    faces.push(Face::new(resolved[0], resolved[k], resolved[k + 1]));
                }
            }
            _ => {}
        }
    }

    let mut mesh = Mesh::new(vertices, faces);
    mesh.prepare();
    Ok(mesh)
}

fn is_trailing(rest: &str) -> bool {
    let rest = rest.trim_start();
    rest.is_empty() || rest.starts_with('#')
}

/// Turn an OBJ index (1-based, or negative from the end) into a 1-based one.
fn resolve_index(index: i64, len: usize, line: usize) -> LoadResult<usize> {
    let resolved = if index < 0 { len as i64 + 1 + index } else { index };
    if resolved < 1 || resolved > len as i64 {
        return Err(LoadError::VertexIndex { line, index, len });
    }
    Ok(resolved as usize)
}

fn parse_vertex(input: &str) -> IResult<&str, Point3<f64>> {
    let (input, _) = tag("v")(input)?;
    let (input, x) = preceded(space1, double)(input)?;
    let (input, y) = preceded(space1, double)(input)?;
    let (input, z) = preceded(space1, double)(input)?;
    Ok((input, Point3::new(x, y, z)))
}

fn parse_face(input: &str) -> IResult<&str, Vec<i64>> {
    let (input, _) = tag("f")(input)?;
    many1(preceded(space1, parse_face_vertex))(input)
}

/// `v`, `v/vt`, `v//vn` or `v/vt/vn`; only the position index is kept.
fn parse_face_vertex(input: &str) -> IResult<&str, i64> {
    let (input, index) = integer(input)?;
    let (input, _) = take_till(|c: char| c.is_whitespace())(input)?;
    Ok((input, index))
}
