/// Projection3D Core Library - Software rasterization of triangle meshes
///
/// This library provides the whole per-frame pipeline: quaternion camera
/// rotation, perspective projection, normal precomputation and a z-buffered
/// triangle rasterizer with flat, Gouraud and per-pixel normal shading.

pub mod error;
pub mod geometry;
pub mod math;
pub mod obj;
pub mod projection;
pub mod raster;
pub mod rotation;

// Re-export commonly used types
pub use error::{CameraError, LoadError, RenderError};
pub use geometry::{Adjacency, Face, Mesh, ShaderMode};
pub use math::Rgb;
pub use projection::{Camera, ScreenPoint};
pub use raster::{render, render_parallel, FrameBuffer, RenderStats};
pub use rotation::{rotate, Orientation};
