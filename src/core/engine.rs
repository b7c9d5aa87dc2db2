//! Engine state machine and outer loop iteration
//!
//! The engine owns the camera, shader cache, input table, event queue and
//! render backend. Its lifecycle is an explicit state machine:
//!
//! ```text
//! Boot -> InitGL -> Loading -> Running <-> Paused
//!                                 ^  \
//!                                 |   v
//!                              Suspended
//!
//! any non-terminal state --Escape--> ShuttingDown
//! ```
//!
//! [`Engine::transition`] is the only way the state changes. Every state's
//! setup runs in `enter` and its teardown in `exit`, so resources acquired
//! by a state are always released by the matching exit or by `ShuttingDown`.

use std::f32::consts::{PI, TAU};

use winit::keyboard::KeyCode;

use super::config::EngineConfig;
use super::error::EngineError;
use super::events::{EventQueue, WindowEvent};
use super::stats::FrameStats;
use super::time::{FrameStep, FrameTiming};
use crate::input::Input;
use crate::renderer::{Camera, DrawParams, RenderBackend, ShaderCache};

// ============================================================================
// States
// ============================================================================

/// Engine lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineState {
    /// Constructed, nothing acquired
    Boot,
    /// Acquiring the window and GPU context
    InitGL,
    /// Building shaders and uploading geometry
    Loading,
    /// Simulating and drawing
    Running,
    /// Drawing a frozen scene on user request
    Paused,
    /// Drawing a frozen scene while the window is unfocused
    Suspended,
    /// Terminal; all resources released
    ShuttingDown,
}

impl EngineState {
    /// State an event leads to from `self`, if any.
    ///
    /// Pure table lookup; no side effects.
    pub fn on_event(self, event: &WindowEvent) -> Option<EngineState> {
        use EngineState::*;

        match (self, event) {
            (ShuttingDown, _) => None,
            (_, WindowEvent::KeyDown(KeyCode::Escape)) => Some(ShuttingDown),
            (Running, WindowEvent::FocusLost) => Some(Suspended),
            (Suspended, WindowEvent::FocusGained) => Some(Running),
            (Running, WindowEvent::KeyDown(KeyCode::KeyP)) => Some(Paused),
            (Paused, WindowEvent::KeyDown(KeyCode::KeyP)) => Some(Running),
            _ => None,
        }
    }

    /// Check if no transition can leave this state
    pub fn is_terminal(self) -> bool {
        self == EngineState::ShuttingDown
    }

    /// Check if the scene is drawn in this state
    pub fn draws_scene(self) -> bool {
        matches!(
            self,
            EngineState::Running | EngineState::Paused | EngineState::Suspended
        )
    }
}

/// Result of a successful [`Engine::transition`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// Exited the old state and entered the new one
    Changed,
    /// Already in the requested state; nothing ran
    Unchanged,
}

/// Window-system collaborator passed into engine calls that may need it.
pub trait Platform {
    /// Window handle given to the render backend
    type Window;

    /// Create the application window
    fn create_window(&mut self, width: u32, height: u32, title: &str) -> Result<Self::Window, EngineError>;
}

// ============================================================================
// Engine
// ============================================================================

const MOVE_FORWARD: [KeyCode; 2] = [KeyCode::KeyW, KeyCode::ArrowUp];
const MOVE_BACK: [KeyCode; 2] = [KeyCode::KeyS, KeyCode::ArrowDown];
const MOVE_LEFT: [KeyCode; 2] = [KeyCode::KeyA, KeyCode::ArrowLeft];
const MOVE_RIGHT: [KeyCode; 2] = [KeyCode::KeyD, KeyCode::ArrowRight];
const BOOST: [KeyCode; 2] = [KeyCode::ShiftLeft, KeyCode::ShiftRight];

/// Spin rate of the demo geometry in radians per second
const ANGULAR_VELOCITY: f32 = 1.0;

/// Wrap an angle into `(-PI, PI]`
fn wrap_angle(angle: f32) -> f32 {
    if angle > -PI && angle <= PI {
        return angle;
    }
    PI - (PI - angle).rem_euclid(TAU)
}

/// Lifecycle controller for the demo.
pub struct Engine<B: RenderBackend> {
    config: EngineConfig,
    state: EngineState,
    running: bool,
    width: u32,
    height: u32,
    backend: B,
    shaders: ShaderCache,
    camera: Camera,
    input: Input,
    events: EventQueue,
    timing: FrameTiming,
    stats: FrameStats,
    angle: f32,
    angular_velocity: f32,
    /// Simulated seconds, frozen outside `Running`
    sim_time: f64,
}

impl<B: RenderBackend> Engine<B> {
    /// Create an engine in the `Boot` state
    pub fn new(config: EngineConfig, backend: B) -> Self {
        let shaders = ShaderCache::new(config.asset_loader());
        let mut camera = Camera::new();
        camera.set_viewport(config.width, config.height);

        Self {
            width: config.width,
            height: config.height,
            config,
            state: EngineState::Boot,
            running: true,
            backend,
            shaders,
            camera,
            input: Input::new(),
            events: EventQueue::new(),
            timing: FrameTiming::default(),
            stats: FrameStats::new(),
            angle: 0.0,
            angular_velocity: ANGULAR_VELOCITY,
            sim_time: 0.0,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Check if the outer loop should keep going
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Last known drawable size
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// The active configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The camera
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// The camera, mutably
    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    /// Queue the platform pushes window events into
    pub fn events_mut(&mut self) -> &mut EventQueue {
        &mut self.events
    }

    /// Held-key table the platform keeps up to date
    pub fn input_mut(&mut self) -> &mut Input {
        &mut self.input
    }

    /// Spin angle of the demo geometry in radians
    pub fn angle(&self) -> f32 {
        self.angle
    }

    /// Frame timing state
    pub fn timing(&self) -> &FrameTiming {
        &self.timing
    }

    /// The render backend
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The shader cache
    pub fn shaders(&self) -> &ShaderCache {
        &self.shaders
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    fn enter<P>(&mut self, state: EngineState, platform: &mut P) -> Result<(), EngineError>
    where
        P: Platform<Window = B::Window>,
    {
        log::info!("Entering {state:?}");

        match state {
            EngineState::Boot | EngineState::Paused | EngineState::Suspended => {}
            EngineState::InitGL => {
                let window = platform.create_window(self.width, self.height, &self.config.title)?;
                self.backend
                    .create_context(window, self.width, self.height)
                    .map_err(|e| EngineError::Acquisition {
                        state,
                        reason: e.to_string(),
                    })?;
            }
            EngineState::Loading => {
                self.backend
                    .init(self.config.scene, &mut self.shaders)
                    .map_err(|e| EngineError::Acquisition {
                        state,
                        reason: e.to_string(),
                    })?;
                self.camera.update_vectors();
                self.camera.set_viewport(self.width, self.height);
            }
            EngineState::Running => self.camera.begin_capture(),
            EngineState::ShuttingDown => self.release_resources(),
        }

        Ok(())
    }

    fn exit(&mut self, state: EngineState) {
        log::info!("Leaving {state:?}");

        if state == EngineState::Running {
            self.input.release_all();
        }
    }

    fn release_resources(&mut self) {
        self.backend.shutdown();
        self.backend.shutdown_shaders(&mut self.shaders);
        self.backend.release_context();
        self.running = false;
    }

    /// Move to `next`, running the old state's exit and the new state's enter.
    ///
    /// # Errors
    ///
    /// [`EngineError::Terminal`] when the engine is already shutting down.
    /// An enter failure is returned as-is; the engine stays in `next`.
    pub fn transition<P>(&mut self, next: EngineState, platform: &mut P) -> Result<TransitionOutcome, EngineError>
    where
        P: Platform<Window = B::Window>,
    {
        if next == self.state {
            return Ok(TransitionOutcome::Unchanged);
        }
        if self.state.is_terminal() {
            return Err(EngineError::Terminal { requested: next });
        }

        let previous = self.state;
        self.exit(previous);
        self.state = next;
        self.enter(next, platform)?;

        Ok(TransitionOutcome::Changed)
    }

    /// Walk `Boot -> InitGL -> Loading -> Running`.
    ///
    /// On failure the engine is shut down so partial resources are released.
    ///
    /// # Errors
    ///
    /// The first acquisition failure.
    pub fn boot<P>(&mut self, platform: &mut P, now: f64) -> Result<(), EngineError>
    where
        P: Platform<Window = B::Window>,
    {
        for next in [EngineState::InitGL, EngineState::Loading, EngineState::Running] {
            if let Err(e) = self.transition(next, platform) {
                log::error!("Boot failed: {e}");
                self.shutdown(platform);
                return Err(e);
            }
        }

        self.timing.reset(now);
        Ok(())
    }

    /// Move to `ShuttingDown`, releasing everything. Idempotent.
    pub fn shutdown<P>(&mut self, platform: &mut P)
    where
        P: Platform<Window = B::Window>,
    {
        if let Err(e) = self.transition(EngineState::ShuttingDown, platform) {
            log::error!("Shutdown failed: {e}");
        }
    }

    // ------------------------------------------------------------------------
    // Per-iteration work
    // ------------------------------------------------------------------------

    /// Apply every queued event, oldest first
    pub fn drain_events<P>(&mut self, platform: &mut P)
    where
        P: Platform<Window = B::Window>,
    {
        while let Some(event) = self.events.pop() {
            match event {
                WindowEvent::Close => {
                    log::info!("Close requested");
                    self.running = false;
                }
                WindowEvent::Resize { width, height } => self.resize(width, height),
                WindowEvent::KeyUp(_) => {}
                WindowEvent::FocusLost | WindowEvent::FocusGained | WindowEvent::KeyDown(_) => {
                    let Some(next) = self.state.on_event(&event) else {
                        continue;
                    };
                    if let Err(e) = self.transition(next, platform) {
                        log::error!("Transition to {next:?} failed: {e}");
                    }
                }
            }
        }
    }

    fn resize(&mut self, width: u32, height: u32) {
        log::debug!("Resize to {width}x{height}");
        self.width = width;
        self.height = height;
        self.backend.resize(width, height);
        self.camera.set_viewport(width, height);
    }

    /// Advance the simulation by one fixed step
    pub fn fixed_update(&mut self, dt: f64) {
        if self.state != EngineState::Running {
            return;
        }
        self.angle = wrap_angle(self.angle + self.angular_velocity * dt as f32);
        self.sim_time += dt;
    }

    /// Per-frame update: held keys move the camera
    pub fn variable_update(&mut self, dt: f64) {
        if self.state != EngineState::Running {
            return;
        }

        let boost = if self.input.any_pressed(&BOOST) {
            self.config.boost_multiplier
        } else {
            1.0
        };

        self.camera.on_keyboard_intent_scaled(
            self.input.any_pressed(&MOVE_FORWARD),
            self.input.any_pressed(&MOVE_BACK),
            self.input.any_pressed(&MOVE_LEFT),
            self.input.any_pressed(&MOVE_RIGHT),
            dt as f32,
            boost,
        );
    }

    /// Feed a raw pointer delta to the camera
    pub fn on_mouse_delta(&mut self, dx: f64, dy: f64) {
        if self.state == EngineState::Running && self.config.capture_mouse {
            self.camera.on_mouse_delta(dx as f32, dy as f32);
        }
    }

    /// Draw one frame. Does nothing without a GPU context.
    pub fn render(&mut self) {
        if !self.backend.has_context() {
            return;
        }

        let params = DrawParams {
            angle: self.angle,
            view_projection: self.camera.view_projection(),
            camera_position: self.camera.position,
            time: self.sim_time as f32,
            viewport: (self.width, self.height),
            clear_color: self.config.clear_color,
            draw_scene: self.state.draws_scene(),
        };
        self.backend.draw(&params);
    }

    /// Run one outer loop iteration at wall-clock time `now`
    pub fn iterate<P>(&mut self, now: f64, platform: &mut P) -> FrameStep
    where
        P: Platform<Window = B::Window>,
    {
        self.drain_events(platform);

        let step = self.timing.advance(now);
        for _ in 0..step.steps {
            self.fixed_update(FrameTiming::DT);
        }
        self.variable_update(step.frame);
        self.render();

        if self.stats.record(step.frame) {
            log::debug!("{}", self.stats.summary());
        }

        step
    }
}

impl<B: RenderBackend> Drop for Engine<B> {
    fn drop(&mut self) {
        if !self.state.is_terminal() {
            self.release_resources();
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
