use std::any::Any;
use std::env;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use glam::Vec2;
use log::{debug, error, info, warn};
use pollster::block_on;
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{DeviceEvent, DeviceId, ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode as WinitKey, PhysicalKey};
use winit::window::{CursorGrabMode, Window, WindowId};

use gallery_walkthrough::app::{print_summary, run_headless};
use gallery_walkthrough::{
    InputState, KeyCode, NamedKey, RenderError, Renderer, Walkthrough, WalkthroughConfig,
};

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        error!("{err:?}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = CliOptions::parse()?;
    let mut config = match &options.config {
        Some(path) => WalkthroughConfig::from_path(path)?,
        None => WalkthroughConfig::default(),
    };
    if let Some(root) = &options.assets {
        config.assets.root = root.clone();
    }
    config.validate().context("configuration rejected")?;

    if options.summary_only {
        headless(config, &options)
    } else {
        match run_interactive(config.clone()) {
            Ok(()) => Ok(()),
            Err(err) if err.downcast_ref::<WindowInitError>().is_some() => {
                warn!("{err}. Falling back to --summary-only mode.");
                headless(config, &options)
            }
            Err(err) => Err(err),
        }
    }
}

fn headless(config: WalkthroughConfig, options: &CliOptions) -> Result<()> {
    let run = run_headless(config, options.frames, &options.held)
        .context("headless walk-through failed")?;
    print_summary(&run);
    Ok(())
}

fn run_interactive(config: WalkthroughConfig) -> Result<()> {
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(|_| {}));
    let event_loop = panic::catch_unwind(AssertUnwindSafe(EventLoop::new));
    panic::set_hook(default_hook);
    let event_loop = event_loop
        .map_err(|panic| WindowInitError::from_panic("event loop", panic))?
        .map_err(|err| WindowInitError::from_error("event loop", err))?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let walkthrough = Walkthrough::new(config)?;
    let mut app = WalkthroughApp {
        walkthrough,
        input: Arc::new(InputState::new()),
        renderer: None,
        start: Instant::now(),
        failure: None,
    };
    event_loop
        .run_app(&mut app)
        .context("event loop terminated abnormally")?;

    if let Some(err) = app.failure {
        return Err(err);
    }
    println!("{}", app.walkthrough.describe());
    Ok(())
}

struct WalkthroughApp {
    walkthrough: Walkthrough,
    input: Arc<InputState>,
    renderer: Option<Renderer>,
    start: Instant,
    failure: Option<anyhow::Error>,
}

impl WalkthroughApp {
    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        self.failure = Some(err);
        event_loop.exit();
    }

    fn handle_keyboard(&self, event: &KeyEvent) {
        let PhysicalKey::Code(code) = event.physical_key else {
            return;
        };
        let Some(key) = map_keycode(code) else {
            return;
        };
        match event.state {
            ElementState::Pressed => self.input.set_key_down(key),
            ElementState::Released => self.input.set_key_up(key),
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };
        let time = self.start.elapsed().as_secs_f32();
        self.walkthrough.update(&self.input.snapshot(), time);
        if self.walkthrough.exit_requested() {
            info!("exit requested");
            event_loop.exit();
            return;
        }

        let size = renderer.size();
        let frame = self.walkthrough.frame_context(size.width, size.height, time);
        match renderer.render(&frame) {
            Ok(()) => {}
            Err(RenderError::Surface(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated)) => {
                let size = renderer.window().inner_size();
                renderer.resize(size);
            }
            Err(RenderError::Surface(wgpu::SurfaceError::OutOfMemory)) => {
                self.fail(event_loop, anyhow!("GPU is out of memory"));
            }
            Err(RenderError::Surface(err)) => {
                debug!("skipping frame {}: {err}", frame.frame_index);
            }
            Err(err @ RenderError::PassOrder(_)) => {
                warn!("frame {} dropped: {err}", frame.frame_index);
            }
        }
    }
}

impl ApplicationHandler for WalkthroughApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.renderer.is_some() {
            return;
        }
        let attributes = Window::default_attributes()
            .with_title("Gallery Walk-through")
            .with_inner_size(LogicalSize::new(1280.0, 720.0));
        let window = match event_loop.create_window(attributes) {
            Ok(window) => Arc::new(window),
            Err(err) => {
                let err = WindowInitError::from_error("window", err);
                self.fail(event_loop, err.into());
                return;
            }
        };

        let renderer = match block_on(Renderer::new(
            Arc::clone(&window),
            self.walkthrough.config(),
        )) {
            Ok(renderer) => renderer,
            Err(err) => {
                self.fail(event_loop, err.context("failed to initialize renderer"));
                return;
            }
        };

        if window
            .set_cursor_grab(CursorGrabMode::Confined)
            .or_else(|_| window.set_cursor_grab(CursorGrabMode::Locked))
            .is_err()
        {
            warn!("cursor could not be grabbed; mouse look may drift");
        }
        window.set_cursor_visible(false);

        self.start = Instant::now();
        self.renderer = Some(renderer);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };
        if window_id != renderer.window_id() {
            return;
        }
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => renderer.resize(size),
            WindowEvent::KeyboardInput { event, .. } => self.handle_keyboard(&event),
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _device_id: DeviceId, event: DeviceEvent) {
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            self.input.add_pointer_delta(Vec2::new(dx as f32, dy as f32));
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(renderer) = &self.renderer {
            renderer.window().request_redraw();
        }
    }
}

#[derive(Debug)]
struct WindowInitError {
    message: String,
}

impl WindowInitError {
    fn from_panic(stage: &str, panic: Box<dyn Any + Send>) -> Self {
        Self {
            message: format!("failed to initialize {stage}: {}", panic_message(panic)),
        }
    }

    fn from_error(stage: &str, err: impl fmt::Display) -> Self {
        Self {
            message: format!("failed to initialize {stage}: {err}"),
        }
    }
}

impl fmt::Display for WindowInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for WindowInitError {}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    match panic.downcast::<String>() {
        Ok(msg) => *msg,
        Err(panic) => match panic.downcast::<&'static str>() {
            Ok(msg) => (*msg).to_string(),
            Err(_) => "unknown panic".into(),
        },
    }
}

fn map_keycode(code: WinitKey) -> Option<KeyCode> {
    Some(match code {
        WinitKey::KeyW => KeyCode::Character('W'),
        WinitKey::KeyA => KeyCode::Character('A'),
        WinitKey::KeyS => KeyCode::Character('S'),
        WinitKey::KeyD => KeyCode::Character('D'),
        WinitKey::ArrowLeft => KeyCode::Named(NamedKey::Left),
        WinitKey::ArrowRight => KeyCode::Named(NamedKey::Right),
        WinitKey::ArrowUp => KeyCode::Named(NamedKey::Up),
        WinitKey::ArrowDown => KeyCode::Named(NamedKey::Down),
        WinitKey::Space => KeyCode::Named(NamedKey::Space),
        WinitKey::Escape => KeyCode::Named(NamedKey::Escape),
        WinitKey::F1 => KeyCode::Function(1),
        WinitKey::F2 => KeyCode::Function(2),
        _ => return None,
    })
}

struct CliOptions {
    config: Option<PathBuf>,
    assets: Option<PathBuf>,
    summary_only: bool,
    frames: u32,
    held: Vec<KeyCode>,
}

const USAGE: &str = "Usage: gallery-walkthrough [--config <file.json>] [--assets <dir>] \
[--summary-only] [--frames <n>] [--hold <key>]...";

impl CliOptions {
    fn parse() -> Result<Self> {
        let mut options = Self {
            config: None,
            assets: None,
            summary_only: false,
            frames: 1,
            held: Vec::new(),
        };
        let mut args = env::args().skip(1);
        while let Some(arg) = args.next() {
            let mut value = || args.next().ok_or_else(|| anyhow!("{arg} expects a value. {USAGE}"));
            match arg.as_str() {
                "--config" => options.config = Some(PathBuf::from(value()?)),
                "--assets" => options.assets = Some(PathBuf::from(value()?)),
                "--summary-only" => options.summary_only = true,
                "--frames" => {
                    let raw = value()?;
                    options.frames = raw
                        .parse()
                        .with_context(|| format!("--frames expects a count, got {raw}"))?;
                }
                "--hold" => {
                    let raw = value()?;
                    let key = KeyCode::from_name(&raw)
                        .ok_or_else(|| anyhow!("unknown key {raw} for --hold"))?;
                    options.held.push(key);
                }
                other => return Err(anyhow!("Unknown argument: {other}. {USAGE}")),
            }
        }
        Ok(options)
    }
}
