//! winit platform layer
//!
//! Turns OS callbacks into [`WindowEvent`]s and key-table updates, and runs
//! one engine iteration each time the event loop goes idle.

use std::sync::Arc;

use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{DeviceEvent, DeviceId, ElementState},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{CursorGrabMode, Window, WindowId},
};

use super::config::EngineConfig;
use super::engine::{Engine, EngineState, Platform};
use super::error::EngineError;
use super::events::WindowEvent;
use super::time::Clock;
use crate::input::Input;
use crate::renderer::WgpuBackend;

/// [`Platform`] backed by the live event loop
pub struct WinitPlatform<'a> {
    event_loop: &'a ActiveEventLoop,
}

impl<'a> WinitPlatform<'a> {
    /// Wrap the event loop for the duration of one callback
    pub fn new(event_loop: &'a ActiveEventLoop) -> Self {
        Self { event_loop }
    }
}

impl Platform for WinitPlatform<'_> {
    type Window = Arc<Window>;

    fn create_window(&mut self, width: u32, height: u32, title: &str) -> Result<Arc<Window>, EngineError> {
        let attributes = Window::default_attributes()
            .with_title(title)
            .with_inner_size(PhysicalSize::new(width, height));

        let window = self
            .event_loop
            .create_window(attributes)
            .map_err(|e| EngineError::Acquisition {
                state: EngineState::InitGL,
                reason: e.to_string(),
            })?;

        log::info!("Created {width}x{height} window '{title}'");
        Ok(Arc::new(window))
    }
}

/// Best effort: some platforms support only one grab mode, some none.
fn set_cursor_capture(window: &Window, capture: bool) {
    let result = if capture {
        window
            .set_cursor_grab(CursorGrabMode::Confined)
            .or_else(|_| window.set_cursor_grab(CursorGrabMode::Locked))
    } else {
        window.set_cursor_grab(CursorGrabMode::None)
    };

    if let Err(e) = result {
        log::warn!("Cursor grab unavailable: {e}");
    }
    window.set_cursor_visible(!capture);
}

/// Application driving the engine from winit callbacks
pub struct App {
    engine: Engine<WgpuBackend>,
    clock: Clock,
    booted: bool,
    cursor_captured: bool,
    error: Option<EngineError>,
}

impl App {
    /// Create the application; nothing is acquired until the loop resumes
    pub fn new(config: EngineConfig) -> Self {
        let backend = WgpuBackend::new(config.vsync);
        Self {
            engine: Engine::new(config, backend),
            clock: Clock::new(),
            booted: false,
            cursor_captured: false,
            error: None,
        }
    }

    /// The engine
    pub fn engine(&self) -> &Engine<WgpuBackend> {
        &self.engine
    }

    fn sync_cursor(&mut self) {
        let want = self.engine.config().capture_mouse && self.engine.state() == EngineState::Running;
        if want == self.cursor_captured {
            return;
        }
        if let Some(window) = self.engine.backend().window() {
            set_cursor_capture(window, want);
            self.cursor_captured = want;
        }
    }

    fn translate(&mut self, event: winit::event::WindowEvent) -> Option<WindowEvent> {
        use winit::event::WindowEvent as Os;

        match event {
            Os::CloseRequested => Some(WindowEvent::Close),
            Os::Resized(size) => Some(WindowEvent::Resize {
                width: size.width,
                height: size.height,
            }),
            Os::Focused(false) => Some(WindowEvent::FocusLost),
            Os::Focused(true) => Some(WindowEvent::FocusGained),
            Os::KeyboardInput { event, .. } => {
                let PhysicalKey::Code(code) = event.physical_key else {
                    return None;
                };
                translate_key(self.engine.input_mut(), code, event.state, event.repeat)
            }
            _ => None,
        }
    }
}

/// Record a key in the held-key table and turn it into an engine event.
///
/// OS auto-repeats keep the table current but never produce an event, so a
/// held key fires its action once.
pub(crate) fn translate_key(
    input: &mut Input,
    code: KeyCode,
    state: ElementState,
    repeat: bool,
) -> Option<WindowEvent> {
    input.process_keyboard(code, state);
    if repeat {
        return None;
    }
    Some(match state {
        ElementState::Pressed => WindowEvent::KeyDown(code),
        ElementState::Released => WindowEvent::KeyUp(code),
    })
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.booted {
            return;
        }
        self.booted = true;

        let mut platform = WinitPlatform::new(event_loop);
        if let Err(e) = self.engine.boot(&mut platform, self.clock.now()) {
            self.error = Some(e);
            event_loop.exit();
            return;
        }

        log::info!("Engine initialized successfully");
        self.sync_cursor();
    }

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, _window_id: WindowId, event: winit::event::WindowEvent) {
        if let Some(event) = self.translate(event) {
            self.engine.events_mut().push(event);
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _device_id: DeviceId, event: DeviceEvent) {
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            self.engine.on_mouse_delta(dx, dy);
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if !self.booted || self.engine.state().is_terminal() {
            return;
        }

        let mut platform = WinitPlatform::new(event_loop);
        self.engine.iterate(self.clock.now(), &mut platform);

        if !self.engine.is_running() {
            self.engine.shutdown(&mut platform);
            event_loop.exit();
            return;
        }
        self.sync_cursor();
    }

    fn exiting(&mut self, event_loop: &ActiveEventLoop) {
        self.engine.shutdown(&mut WinitPlatform::new(event_loop));
        log::info!("Shut down after {:.1}s", self.clock.now());
    }
}

/// Open the window and run until the user quits.
///
/// # Errors
///
/// Returns the boot failure if the window, GPU context or scene could not be
/// set up, or an event loop error.
pub fn run(config: EngineConfig) -> Result<(), EngineError> {
    log::info!("Starting {}", config.title);

    let event_loop = EventLoop::new().map_err(|e| EngineError::EventLoop(e.to_string()))?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config);
    event_loop
        .run_app(&mut app)
        .map_err(|e| EngineError::EventLoop(e.to_string()))?;

    match app.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
