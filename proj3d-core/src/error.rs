/// Error types for camera setup, rendering and model loading
use thiserror::Error;

/// Errors raised while configuring a camera.
#[derive(Debug, Error, PartialEq)]
pub enum CameraError {
    /// Viewport has no pixels.
    #[error("Invalid viewport: {width}x{height}")]
    EmptyViewport { width: usize, height: usize },

    /// Near plane is not in front of the far plane.
    #[error("Invalid clip planes: near {near} must be less than far {far}")]
    ClipPlanes { near: f64, far: f64 },

    /// Projection scale factors must be positive.
    #[error("Invalid projection scale: ({0}, {1})")]
    Scale(f64, f64),

    /// Field of view outside (0, 180) degrees.
    #[error("Invalid field of view: {0} degrees")]
    FieldOfView(f64),
}

/// Errors raised by the render entry points.
#[derive(Debug, Error, PartialEq)]
pub enum RenderError {
    /// Camera viewport has no pixels.
    #[error("Invalid viewport: {width}x{height}")]
    EmptyViewport { width: usize, height: usize },

    /// A caller-supplied buffer does not match the camera viewport.
    #[error("{buffer} buffer holds {actual} values, viewport needs {expected}")]
    BufferSize {
        buffer: &'static str,
        expected: usize,
        actual: usize,
    },
}

/// Errors raised while loading a model.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Line could not be parsed.
    #[error("line {line}: malformed {kind} statement")]
    Parse { line: usize, kind: &'static str },

    /// Face with fewer than three corners.
    #[error("line {line}: face has {count} vertices, need at least 3")]
    ShortFace { line: usize, count: usize },

    /// Face refers to a vertex that does not exist.
    #[error("line {line}: vertex index {index} out of range (1..={len})")]
    VertexIndex { line: usize, index: i64, len: usize },
}

/// Result type for model loading.
pub type LoadResult<T> = std::result::Result<T, LoadError>;
