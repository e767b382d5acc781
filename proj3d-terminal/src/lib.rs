/// Terminal front end: renders a mesh into the terminal and walks the camera
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{self, ClearType},
};
use log::debug;
use nalgebra::Point3;
use proj3d_core::{render, render_parallel, Camera, CameraError, FrameBuffer, Mesh, ShaderMode};
use std::io::{self, stdout, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};

pub mod controller;
pub mod renderer;

pub use controller::{CameraController, Movement};
pub use renderer::AsciiRenderer;

/// Terminal cells are roughly twice as tall as they are wide.
const CELL_ASPECT: f64 = 2.0;
const FIELD_OF_VIEW: f64 = 70.0;
const NEAR: f64 = 0.1;
const FAR: f64 = 100.0;
/// Degrees turned per arrow key press.
const LOOK_STEP: f64 = 5.0;
const BACKGROUND: u32 = 0xff00_0000;
const CONTROLS: &str = "WASD move, Space/C fly, Arrows look, 1-4 shader, P parallel, Q quit";

/// Command line options for the terminal viewer
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Options {
    pub model: Option<PathBuf>,
    pub shader: ShaderMode,
    pub parallel: bool,
}

impl Options {
    /// Parse `[model.obj] [--shader <mode>] [--parallel]`, program name excluded.
    pub fn parse<I: IntoIterator<Item = String>>(args: I) -> Result<Self, String> {
        let mut options = Options::default();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--shader" => {
                    let mode = args.next().ok_or("--shader needs a mode")?;
                    options.shader = mode.parse()?;
                }
                "--parallel" => options.parallel = true,
                flag if flag.starts_with("--") => return Err(format!("unknown option: {}", flag)),
                _ if options.model.is_none() => options.model = Some(PathBuf::from(&arg)),
                _ => return Err(format!("unexpected argument: {}", arg)),
            }
        }
        Ok(options)
    }
}

/// Camera for a `cols` x `rows` grid of terminal cells, keeping the
/// position and orientation of `previous` if given.
pub fn terminal_camera(
    cols: usize,
    rows: usize,
    previous: Option<&Camera>,
) -> Result<Camera, CameraError> {
    let aspect = cols as f64 / rows.max(1) as f64;
    let scale = 1.0 / (FIELD_OF_VIEW.to_radians() / 2.0).tan();
    let scale_y = aspect * scale / CELL_ASPECT;
    let mut camera = Camera::with_scales(cols, rows, NEAR, FAR, scale, scale_y)?;
    if let Some(previous) = previous {
        camera.position = previous.position;
        camera.orientation = previous.orientation;
    }
    Ok(camera)
}

/// Main application struct for terminal 3D rendering
pub struct TerminalApp {
    mesh: Mesh,
    camera: Camera,
    controller: CameraController,
    frame: FrameBuffer,
    renderer: AsciiRenderer,
    parallel: bool,
    running: bool,
    last_frame: Instant,
    frame_count: u32,
    fps: f32,
}

impl TerminalApp {
    pub fn new(mesh: Mesh, parallel: bool) -> io::Result<Self> {
        let (width, height) = terminal::size()?;
        let camera = screen_camera(width, height, None)?;

        Ok(Self {
            mesh,
            frame: FrameBuffer::for_camera(&camera),
            camera,
            controller: CameraController::default(),
            renderer: AsciiRenderer::new(),
            parallel,
            running: true,
            last_frame: Instant::now(),
            frame_count: 0,
            fps: 0.0,
        })
    }

    pub fn run(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(stdout(), terminal::EnterAlternateScreen, cursor::Hide)?;

        let result = self.main_loop();

        // Cleanup
        terminal::disable_raw_mode()?;
        execute!(stdout(), terminal::LeaveAlternateScreen, cursor::Show)?;

        result
    }

    fn main_loop(&mut self) -> io::Result<()> {
        let target_frame_time = Duration::from_millis(1000 / 30); // 30 FPS target

        while self.running {
            let frame_start = Instant::now();

            while event::poll(Duration::from_millis(0))? {
                self.handle_input()?;
            }

            self.render()?;

            self.frame_count += 1;
            let elapsed = frame_start.elapsed();
            if elapsed < target_frame_time {
                std::thread::sleep(target_frame_time - elapsed);
            }

            let now = Instant::now();
            if (now - self.last_frame).as_secs() >= 1 {
                self.fps = self.frame_count as f32 / (now - self.last_frame).as_secs_f32();
                self.frame_count = 0;
                self.last_frame = now;
            }
        }

        Ok(())
    }

    fn handle_input(&mut self) -> io::Result<()> {
        match event::read()? {
            Event::Key(KeyEvent { code, kind, .. }) if kind != KeyEventKind::Release => {
                self.handle_key(code)
            }
            Event::Resize(width, height) => {
                self.camera = screen_camera(width, height, Some(&self.camera))?;
                self.frame = FrameBuffer::for_camera(&self.camera);
                queue!(stdout(), terminal::Clear(ClearType::All))?;
                debug!("Viewport resized to {}x{}", self.camera.width, self.camera.height);
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_key(&mut self, code: KeyCode) {
        let look = LOOK_STEP / self.controller.look_speed;
        match code {
            KeyCode::Char('q') | KeyCode::Esc => self.running = false,
            KeyCode::Char('w') => self.controller.advance(&mut self.camera, Movement::Forward),
            KeyCode::Char('s') => self.controller.advance(&mut self.camera, Movement::Backward),
            KeyCode::Char('a') => self.controller.advance(&mut self.camera, Movement::Left),
            KeyCode::Char('d') => self.controller.advance(&mut self.camera, Movement::Right),
            KeyCode::Char(' ') => self.controller.advance(&mut self.camera, Movement::Up),
            KeyCode::Char('c') => self.controller.advance(&mut self.camera, Movement::Down),
            KeyCode::Left => self.controller.look(&mut self.camera, -look, 0.0),
            KeyCode::Right => self.controller.look(&mut self.camera, look, 0.0),
            KeyCode::Up => self.controller.look(&mut self.camera, 0.0, -look),
            KeyCode::Down => self.controller.look(&mut self.camera, 0.0, look),
            KeyCode::Char('p') => self.parallel = !self.parallel,
            KeyCode::Char(c @ '1'..='4') => {
                self.mesh.shader = match c {
                    '1' => ShaderMode::None,
                    '2' => ShaderMode::Flat,
                    '3' => ShaderMode::Gouraud,
                    _ => ShaderMode::PerPixelNormal,
                };
                debug!("Shader switched to {}", self.mesh.shader);
            }
            _ => {}
        }
    }

    fn render(&mut self) -> io::Result<()> {
        // The light rides along with the camera
        let light: Point3<f64> = self.camera.position;

        self.frame.clear(BACKGROUND);
        let frame = &mut self.frame;
        let stats = if self.parallel {
            render_parallel(
                &mut frame.color,
                &mut frame.depth,
                &self.camera,
                &self.mesh,
                &light,
            )
        } else {
            render(&mut frame.color, &mut frame.depth, &self.camera, &self.mesh, &light)
        }
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

        let mut stdout = stdout();
        self.renderer.draw(&mut stdout, &self.frame, 1)?;

        let p = self.camera.position;
        queue!(
            stdout,
            cursor::MoveTo(0, 0),
            terminal::Clear(ClearType::CurrentLine),
            SetForegroundColor(Color::Yellow),
            Print(format!(
                "proj3d | FPS: {:.1} | {} {} | faces {}/{} | pos ({:.1}, {:.1}, {:.1}) | {}",
                self.fps,
                self.mesh.shader,
                if self.parallel { "parallel" } else { "single" },
                stats.drawn,
                self.mesh.faces().len(),
                p.x,
                p.y,
                p.z,
                CONTROLS,
            )),
            ResetColor
        )?;

        stdout.flush()?;
        Ok(())
    }
}

/// One status row at the top, the rest of the screen is the viewport.
fn screen_camera(width: u16, height: u16, previous: Option<&Camera>) -> io::Result<Camera> {
    let rows = (height as usize).saturating_sub(1).max(1);
    terminal_camera((width as usize).max(1), rows, previous)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_options_defaults() {
        let options = Options::parse(Vec::new()).unwrap();
        assert_eq!(options, Options::default());
        assert_eq!(options.shader, ShaderMode::None);
    }

    #[test]
    fn test_options_parse() {
        let options =
            Options::parse(args(&["teapot.obj", "--shader", "gouraud", "--parallel"])).unwrap();
        assert_eq!(options.model, Some(PathBuf::from("teapot.obj")));
        assert_eq!(options.shader, ShaderMode::Gouraud);
        assert!(options.parallel);

        let options = Options::parse(args(&["--shader", "phong"])).unwrap();
        assert_eq!(options.shader, ShaderMode::PerPixelNormal);
        assert!(options.model.is_none());
    }

    #[test]
    fn test_options_errors() {
        assert!(Options::parse(args(&["--shader"])).is_err());
        assert!(Options::parse(args(&["--shader", "toon"])).is_err());
        assert!(Options::parse(args(&["--fast"])).is_err());
        assert!(Options::parse(args(&["a.obj", "b.obj"])).is_err());
    }

    #[test]
    fn test_terminal_camera_squashes_rows() {
        let camera = terminal_camera(80, 40, None).unwrap();
        assert_eq!((camera.width, camera.height), (80, 40));
        assert!((camera.scale_y - camera.scale_x).abs() < 1e-12);

        let mut moved = camera.clone();
        moved.position = Point3::new(1.0, 2.0, 3.0);
        moved.orientation.rotate(30.0, 10.0);
        let resized = terminal_camera(120, 30, Some(&moved)).unwrap();
        assert_eq!(resized.position, moved.position);
        assert_eq!(resized.orientation, moved.orientation);
        assert_eq!(resized.pixel_count(), 3600);
    }

    #[test]
    fn test_frame_matches_terminal_camera() {
        let mut camera = terminal_camera(60, 20, None).unwrap();
        camera.position = Point3::new(0.0, 0.0, -5.0);
        let mut cube = Mesh::cube(2.0);
        cube.shader = ShaderMode::Flat;
        cube.prepare();

        let mut frame = FrameBuffer::for_camera(&camera);
        frame.clear(BACKGROUND);
        let stats = frame.render(&camera, &cube, &camera.position).unwrap();
        assert!(stats.pixels > 0);

        let renderer = AsciiRenderer::new();
        let lit = frame
            .color
            .iter()
            .zip(&frame.depth)
            .filter(|&(&p, &d)| renderer.cell(p, d).0 != ' ')
            .count();
        // Seam pixels shared by two triangles may be counted twice.
        assert!(lit > 0 && lit <= stats.pixels);
    }

    #[test]
    fn test_faces_turned_from_light_stay_visible() {
        let mut camera = terminal_camera(60, 20, None).unwrap();
        camera.position = Point3::new(0.0, 0.0, -5.0);
        let mut cube = Mesh::cube(2.0);
        cube.shader = ShaderMode::Flat;
        cube.prepare();

        // Light behind the cube: the visible face shades to pure black,
        // the same packed value as the cleared background.
        let mut frame = FrameBuffer::for_camera(&camera);
        frame.clear(BACKGROUND);
        let stats = frame.render(&camera, &cube, &Point3::new(0.0, 0.0, 10.0)).unwrap();
        assert!(stats.pixels > 0);
        assert!(frame.color.iter().all(|&p| p == BACKGROUND));

        let renderer = AsciiRenderer::new();
        let cells: Vec<_> = frame
            .color
            .iter()
            .zip(&frame.depth)
            .map(|(&p, &d)| renderer.cell(p, d))
            .filter(|&(c, _)| c != ' ')
            .collect();
        assert!(!cells.is_empty());
        assert!(cells.iter().all(|&cell| cell == ('.', Color::DarkGrey)));
    }
}
