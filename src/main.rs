use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use minifb::{Key, KeyRepeat, Window, WindowOptions};
use tracing::{debug, info};

use phasefield::config::{self, Config};
use phasefield::functions::{Builtins, FunctionId};
use phasefield::projection::{PlaneParams, SphereParams, ViewRange};
use phasefield::renderer::{self, PixelBuffer, RenderStats, ViewMode};
use phasefield::scene::ColorSource;
use phasefield::streamline;
use phasefield::telemetry;

struct Defaults;

impl Defaults {
    const ROT_STEP: f64 = 0.08;
    const PAN_STEP_PX: f64 = 20.0;
    const ZOOM_FACTOR: f64 = 1.25;
    /// World rectangle seeded and traced when streamlines are shown on the sphere.
    const SPHERE_TRACE_RANGE: ViewRange = ViewRange { x_min: -3.0, x_max: 3.0, y_min: -3.0, y_max: 3.0 };
}

/// Domain coloring viewer for complex functions.
#[derive(Parser, Debug)]
#[command(name = "phasefield", version, about)]
struct Args {
    /// YAML config file (default: ./phasefield.yaml if present)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Render one frame to a PNG instead of opening a window
    #[arg(long)]
    headless: bool,
    /// PNG path for headless mode
    #[arg(long, default_value = "phasefield.png")]
    output: PathBuf,
    #[arg(long)]
    width: Option<usize>,
    #[arg(long)]
    height: Option<usize>,
    /// Start in the Riemann sphere view
    #[arg(long)]
    sphere: bool,
    /// Function name (identity, square, polynomial, mobius, exp, sin, reciprocal, zeta)
    #[arg(long)]
    function: Option<String>,
    /// Overlay streamlines
    #[arg(long)]
    streamlines: bool,
}

impl Args {
    /// Command-line flags take precedence over the config file.
    fn apply(&self, cfg: &mut Config) -> Result<()> {
        if let Some(w) = self.width {
            cfg.display.width = w;
        }
        if let Some(h) = self.height {
            cfg.display.height = h;
        }
        if self.sphere {
            cfg.display.view = ViewMode::Sphere;
        }
        if let Some(name) = &self.function {
            cfg.function = FunctionId::from_name(name)?;
        }
        if self.streamlines {
            cfg.streamlines.enabled = true;
        }
        Ok(())
    }
}

/// Viewer commands, decoupled from the window's key codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Action {
    Up,
    Down,
    Left,
    Right,
    ZoomIn,
    ZoomOut,
    ToggleView,
    CycleFunction,
    CycleField,
    ToggleStreamlines,
    ToggleWorld,
    ToggleContinuation,
    Quit,
}

fn key_action(key: Key) -> Option<Action> {
    match key {
        Key::Up => Some(Action::Up),
        Key::Down => Some(Action::Down),
        Key::Left => Some(Action::Left),
        Key::Right => Some(Action::Right),
        Key::Equal | Key::NumPadPlus => Some(Action::ZoomIn),
        Key::Minus | Key::NumPadMinus => Some(Action::ZoomOut),
        Key::S => Some(Action::ToggleView),
        Key::F => Some(Action::CycleFunction),
        Key::V => Some(Action::CycleField),
        Key::L => Some(Action::ToggleStreamlines),
        Key::W => Some(Action::ToggleWorld),
        Key::Z => Some(Action::ToggleContinuation),
        Key::Escape => Some(Action::Quit),
        _ => None,
    }
}

/// Everything the viewer mutates between frames.
struct ViewState {
    cfg: Config,
    plane: PlaneParams,
    sphere: SphereParams,
}

impl ViewState {
    fn new(cfg: Config) -> Self {
        let plane = cfg.plane_params();
        let sphere = cfg.sphere_params();
        Self { cfg, plane, sphere }
    }

    fn view(&self) -> ViewMode {
        self.cfg.display.view
    }

    fn size(&self) -> (usize, usize) {
        (self.plane.width, self.plane.height)
    }

    /// Apply one command. Returns false for `Quit`.
    fn apply(&mut self, action: Action) -> bool {
        let sphere_view = self.view() == ViewMode::Sphere;
        match action {
            Action::Up if sphere_view => self.sphere.rot_x -= Defaults::ROT_STEP,
            Action::Down if sphere_view => self.sphere.rot_x += Defaults::ROT_STEP,
            Action::Left if sphere_view => self.sphere.rot_y -= Defaults::ROT_STEP,
            Action::Right if sphere_view => self.sphere.rot_y += Defaults::ROT_STEP,
            Action::Up => self.plane.pan(0.0, Defaults::PAN_STEP_PX),
            Action::Down => self.plane.pan(0.0, -Defaults::PAN_STEP_PX),
            Action::Left => self.plane.pan(Defaults::PAN_STEP_PX, 0.0),
            Action::Right => self.plane.pan(-Defaults::PAN_STEP_PX, 0.0),
            Action::ZoomIn | Action::ZoomOut => {
                let factor = if action == Action::ZoomIn {
                    Defaults::ZOOM_FACTOR
                } else {
                    1.0 / Defaults::ZOOM_FACTOR
                };
                if sphere_view {
                    self.sphere.radius *= factor;
                } else {
                    self.plane.zoom(factor);
                }
            }
            Action::ToggleView => self.cfg.display.view = self.view().toggle(),
            Action::CycleFunction => self.cfg.function = self.cfg.function.cycle(),
            Action::CycleField => self.cfg.streamlines.field_mode = self.cfg.streamlines.field_mode.next(),
            Action::ToggleStreamlines => self.cfg.streamlines.enabled = !self.cfg.streamlines.enabled,
            Action::ToggleWorld => self.cfg.coloring = self.cfg.coloring.toggle(),
            Action::ToggleContinuation => self.cfg.zeta_continuation = !self.cfg.zeta_continuation,
            Action::Quit => return false,
        }
        true
    }

    /// Follow a window resize, keeping the plane origin's relative position
    /// and the sphere's size relative to the shorter side.
    fn resize(&mut self, width: usize, height: usize) {
        let (old_w, old_h) = self.size();
        let old_short = old_w.min(old_h);
        self.plane.resize(width, height);
        self.sphere.center_x = width as f64 / 2.0;
        self.sphere.center_y = height as f64 / 2.0;
        if old_short > 0 {
            self.sphere.radius *= width.min(height) as f64 / old_short as f64;
        }
    }

    /// Color the active view into `buf`, then overlay streamlines if enabled.
    fn render(&self, buf: &mut PixelBuffer) -> RenderStats {
        let scene = self.cfg.scene();
        let (width, height) = self.size();
        let stats = match self.view() {
            ViewMode::Plane => renderer::render_plane(buf, &self.plane, &scene, &Builtins),
            ViewMode::Sphere => renderer::render_sphere(buf, width, height, &self.sphere, &scene, &Builtins),
        };

        if self.cfg.streamlines.enabled {
            let range = match self.view() {
                ViewMode::Plane => self.plane.range,
                ViewMode::Sphere => Defaults::SPHERE_TRACE_RANGE,
            };
            let params = self.cfg.trace_params();
            let lines = streamline::trace_grid(&scene, &Builtins, &range, &params, self.cfg.streamlines.seed_density);
            for line in &lines {
                match self.view() {
                    ViewMode::Plane => renderer::draw_streamline_planar(buf, &self.plane, line),
                    ViewMode::Sphere => renderer::draw_streamline_sphere(buf, &self.sphere, line),
                }
            }
        }
        stats
    }

    fn status(&self) -> String {
        let streams = if self.cfg.streamlines.enabled {
            self.cfg.streamlines.field_mode.label()
        } else {
            "off"
        };
        let coloring = match self.cfg.coloring {
            ColorSource::Function => self.cfg.function.name(),
            ColorSource::World => "world",
        };
        let mut status = format!("phasefield | {} | {} | streamlines {}", coloring, self.view().label(), streams);
        if self.cfg.function.is_zeta_family() && !self.cfg.zeta_continuation {
            status.push_str(" | no continuation");
        }
        status
    }
}

fn main() -> Result<()> {
    telemetry::init_tracing();
    let args = Args::parse();
    let mut cfg = config::load(args.config.as_deref());
    args.apply(&mut cfg)?;
    let state = ViewState::new(cfg);

    if args.headless {
        run_headless(&state, &args.output)
    } else {
        run_gui(state)
    }
}

/// Render one frame and write it as PNG. Uncolored pixels stay transparent.
fn run_headless(state: &ViewState, output: &Path) -> Result<()> {
    let mut buf = PixelBuffer::new(0, 0);
    let stats = state.render(&mut buf);
    let (w, h) = (buf.width() as u32, buf.height() as u32);
    let img = image::RgbaImage::from_raw(w, h, buf.into_bytes()).context("pixel buffer does not match image size")?;
    img.save(output)
        .with_context(|| format!("failed to write {}", output.display()))?;
    info!(
        path = %output.display(),
        width = w,
        height = h,
        colored = stats.colored,
        skipped = stats.skipped,
        "saved frame"
    );
    Ok(())
}

fn run_gui(mut state: ViewState) -> Result<()> {
    let (mut w, mut h) = state.size();
    let mut window = Window::new(
        &state.status(),
        w,
        h,
        WindowOptions {
            resize: true,
            ..WindowOptions::default()
        },
    )
    .context("failed to create window")?;
    window.set_target_fps(state.cfg.display.target_fps);

    // Ctrl+C handler
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .context("failed to set Ctrl+C handler")?;

    let mut framebuf = vec![0u32; w * h];
    let mut rgba_buf = PixelBuffer::new(w, h);
    let mut needs_redraw = true;
    let mut frame_count = 0u32;
    let mut last_fps_time = Instant::now();

    'frames: while window.is_open() && running.load(Ordering::SeqCst) {
        // --- Keyboard handling ---
        for key in window.get_keys_pressed(KeyRepeat::Yes) {
            if let Some(action) = key_action(key) {
                if !state.apply(action) {
                    break 'frames;
                }
                needs_redraw = true;
            }
        }

        // --- Check for window resize ---
        let (new_w, new_h) = window.get_size();
        if (new_w != w || new_h != h) && new_w > 0 && new_h > 0 {
            w = new_w;
            h = new_h;
            state.resize(w, h);
            framebuf = vec![0u32; w * h];
            needs_redraw = true;
        }

        if needs_redraw {
            let started = Instant::now();
            let stats = state.render(&mut rgba_buf);
            renderer::rgba_to_argb(rgba_buf.as_bytes(), &mut framebuf);
            window.set_title(&state.status());
            debug!(
                elapsed_ms = started.elapsed().as_millis() as u64,
                colored = stats.colored,
                "redraw"
            );
            needs_redraw = false;
        }

        window
            .update_with_buffer(&framebuf, w, h)
            .context("failed to present frame")?;

        frame_count += 1;
        let now = Instant::now();
        if now.duration_since(last_fps_time) >= Duration::from_secs(5) {
            debug!(fps = frame_count / 5, "display loop");
            frame_count = 0;
            last_fps_time = now;
        }
    }

    info!("shutting down");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use phasefield::streamline::FieldMode;

    fn small_state() -> ViewState {
        let mut cfg = Config::default();
        cfg.display.width = 40;
        cfg.display.height = 30;
        cfg.display.pixels_per_unit = 10.0;
        ViewState::new(cfg)
    }

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["phasefield"];
        argv.extend_from_slice(extra);
        Args::parse_from(argv)
    }

    #[test]
    fn test_key_action_mapping() {
        assert_eq!(key_action(Key::S), Some(Action::ToggleView));
        assert_eq!(key_action(Key::Equal), Some(Action::ZoomIn));
        assert_eq!(key_action(Key::NumPadMinus), Some(Action::ZoomOut));
        assert_eq!(key_action(Key::Escape), Some(Action::Quit));
        assert_eq!(key_action(Key::Q), None);
    }

    #[test]
    fn test_args_override_config() {
        let mut cfg = Config::default();
        args(&["--width", "64", "--height", "48", "--sphere", "--function", "zeta", "--streamlines"])
            .apply(&mut cfg)
            .unwrap();
        assert_eq!((cfg.display.width, cfg.display.height), (64, 48));
        assert_eq!(cfg.display.view, ViewMode::Sphere);
        assert_eq!(cfg.function, FunctionId::Zeta);
        assert!(cfg.streamlines.enabled);
    }

    #[test]
    fn test_args_unknown_function_is_error() {
        let mut cfg = Config::default();
        assert!(args(&["--function", "gamma"]).apply(&mut cfg).is_err());
    }

    #[test]
    fn test_arrows_pan_plane() {
        let mut state = small_state();
        let before = state.plane.range;
        assert!(state.apply(Action::Right));
        assert!(state.plane.range.x_min > before.x_min);
        assert_eq!(state.sphere.rot_y, Config::default().display.rot_y);
    }

    #[test]
    fn test_arrows_rotate_sphere() {
        let mut state = small_state();
        state.apply(Action::ToggleView);
        let plane_before = state.plane.clone();
        state.apply(Action::Right);
        state.apply(Action::Up);
        assert!((state.sphere.rot_y - (Config::default().display.rot_y + Defaults::ROT_STEP)).abs() < 1e-12);
        assert!((state.sphere.rot_x - (Config::default().display.rot_x - Defaults::ROT_STEP)).abs() < 1e-12);
        assert_eq!(state.plane, plane_before);
    }

    #[test]
    fn test_zoom_in_and_out_restores_scale() {
        let mut state = small_state();
        state.apply(Action::ZoomIn);
        assert!((state.plane.scale_x - 12.5).abs() < 1e-9);
        state.apply(Action::ZoomOut);
        assert!((state.plane.scale_x - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_toggles() {
        let mut state = small_state();
        state.apply(Action::ToggleWorld);
        assert_eq!(state.cfg.coloring, ColorSource::World);
        state.apply(Action::CycleField);
        assert_eq!(state.cfg.streamlines.field_mode, FieldMode::Reciprocal);
        state.apply(Action::ToggleContinuation);
        assert!(!state.cfg.zeta_continuation);
        state.apply(Action::CycleFunction);
        assert_eq!(state.cfg.function, FunctionId::cayley());
        assert!(!state.apply(Action::Quit));
    }

    #[test]
    fn test_status_line() {
        let mut state = small_state();
        assert_eq!(state.status(), "phasefield | polynomial | plane | streamlines off");
        state.cfg.function = FunctionId::Zeta;
        state.cfg.zeta_continuation = false;
        state.apply(Action::ToggleStreamlines);
        assert_eq!(state.status(), "phasefield | zeta | plane | streamlines f(z) | no continuation");
    }

    #[test]
    fn test_resize_follows_window() {
        let mut state = small_state();
        let radius = state.sphere.radius;
        state.resize(80, 60);
        assert_eq!(state.size(), (80, 60));
        assert_eq!((state.sphere.center_x, state.sphere.center_y), (40.0, 30.0));
        assert!((state.sphere.radius - 2.0 * radius).abs() < 1e-9);
    }

    #[test]
    fn test_streamline_overlay_changes_frame() {
        let mut state = small_state();
        state.cfg.function = FunctionId::Identity;
        let mut plain = PixelBuffer::new(0, 0);
        state.render(&mut plain);

        state.cfg.streamlines.enabled = true;
        state.cfg.streamlines.seed_density = 4;
        let mut overlaid = PixelBuffer::new(0, 0);
        state.render(&mut overlaid);
        assert_eq!((overlaid.width(), overlaid.height()), (40, 30));
        assert_ne!(plain, overlaid);
    }

    #[test]
    fn test_sphere_view_renders_disc() {
        let mut state = small_state();
        state.apply(Action::ToggleView);
        let mut buf = PixelBuffer::new(0, 0);
        let stats = state.render(&mut buf);
        assert!(stats.colored > 0);
        assert_eq!(buf.get(0, 0), Some([0, 0, 0, 0]));
    }

    #[test]
    fn test_headless_writes_png() {
        let state = small_state();
        let path = std::env::temp_dir().join(format!("phasefield-test-{}.png", std::process::id()));
        run_headless(&state, &path).unwrap();
        let img = image::open(&path).unwrap().to_rgba8();
        assert_eq!(img.dimensions(), (40, 30));
        assert_eq!(img.get_pixel(20, 15)[3], 255);
        let _ = std::fs::remove_file(&path);
    }
}
