/// Load an OBJ file and print a one-frame summary.
///
/// Usage: cargo run --example load_obj -- path/to/file.obj
use nalgebra::{Point3, Vector3};
use proj3d_core::{obj, Camera, FrameBuffer, ShaderMode};
use std::env;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <file.obj>", args[0]);
        std::process::exit(1);
    }

    let mut mesh = obj::load_obj_file(&args[1])?;
    mesh.shader = ShaderMode::PerPixelNormal;
    mesh.position = Vector3::new(0.0, 0.0, 5.0);

    println!("Vertices: {}", mesh.vertices().len());
    println!("Faces: {}", mesh.faces().len());

    let camera = Camera::default();
    let mut frame = FrameBuffer::for_camera(&camera);
    frame.clear(0xff00_0000);
    let stats = frame.render(&camera, &mesh, &Point3::origin())?;

    println!("Frame {}x{}: {:?}", camera.width, camera.height, stats);
    Ok(())
}
