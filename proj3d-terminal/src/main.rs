/// proj3d terminal viewer
///
/// Renders an OBJ model, or a cube when no path is given.
/// Usage: proj3d-terminal [model.obj] [--shader none|flat|gouraud|phong] [--parallel]
/// Controls:
///   - WASD: Walk, Space/C: Fly up/down
///   - Arrow Keys: Look around
///   - 1-4: Switch shader, P: Toggle parallel rendering
///   - Q/ESC: Quit
use env_logger::Env;
use log::{error, info};
use nalgebra::Vector3;
use proj3d_core::{obj, Mesh};
use proj3d_terminal::{Options, TerminalApp};
use std::io;
use std::process::ExitCode;

const USAGE: &str =
    "Usage: proj3d-terminal [model.obj] [--shader none|flat|gouraud|phong] [--parallel]";

fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let options = match Options::parse(std::env::args().skip(1)) {
        Ok(options) => options,
        Err(e) => {
            error!("{}", e);
            eprintln!("{}", USAGE);
            return ExitCode::FAILURE;
        }
    };

    match run(options) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(options: Options) -> io::Result<()> {
    let mut mesh = match &options.model {
        Some(path) => obj::load_obj_file(path)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?,
        None => Mesh::cube(2.0),
    };
    mesh.shader = options.shader;
    // Place the model in front of a camera at the origin
    mesh.position = Vector3::new(0.0, 0.0, 5.0);

    info!(
        "Starting terminal renderer with {} faces, shader {} (press Q to quit)",
        mesh.faces().len(),
        mesh.shader
    );
    std::thread::sleep(std::time::Duration::from_secs(1));

    let mut app = TerminalApp::new(mesh, options.parallel)?;
    app.run()
}
