//! Space Monkeys: event loop and frame driver.
//!
//! winit drives the loop via `ApplicationHandler`. Everything GPU-related is
//! created lazily in `resumed`; if any of it fails the app logs the error and
//! exits with status 1. Each `RedrawRequested` runs one variable-dt frame:
//!
//!   1. `begin_frame()` measures the clamped wall-clock delta
//!   2. `GameWorld::tick` applies input, moves the player and NPCs, follows
//!      the camera
//!   3. level reload on `R` or when the level file changes on disk
//!   4. the world paints into a `SpriteBatch`, which is uploaded and drawn
//!   5. the egui overlay (FPS, F3 panel) is composited on top

mod level_watch;

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use wgpu::util::DeviceExt;
use winit::application::ApplicationHandler;
use winit::event::{ElementState, MouseButton, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use level_watch::LevelWatcher;
use smk_core::config::{load_config_or_default, GameConfig};
use smk_core::input::{InputState, Key, MouseBtn};
use smk_core::time::FrameClock;
use smk_core::GameWorld;
use smk_devtools::{DebugOverlay, OverlayStats};
use smk_platform::PlatformConfig;
use smk_render::{
    Camera2D, GpuContext, GpuInitError, SpriteBatch, SpriteBuffers, SpritePipeline, TextureCache,
};

const CONFIG_PATH: &str = "assets/config/game.json";

const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.0,
    g: 0.0,
    b: 0.0,
    a: 1.0,
};

#[derive(Debug, thiserror::Error)]
enum InitError {
    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),
    #[error("GPU initialisation failed: {0}")]
    Gpu(#[from] GpuInitError),
    #[error("{0}")]
    Asset(String),
}

/// Window, GPU resources and the world they present.
struct EngineState {
    window: Arc<Window>,
    gpu: GpuContext,
    clock: FrameClock,
    input: InputState,
    camera: Camera2D,
    sprite_pipeline: SpritePipeline,
    debug_overlay: DebugOverlay,
    textures: TextureCache,

    world: GameWorld,
    level_watcher: LevelWatcher,

    // The batch is rebuilt every frame and streamed into `buffers`, which
    // grow but never shrink.
    batch: SpriteBatch,
    buffers: SpriteBuffers,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
}

impl EngineState {
    fn new(window: Arc<Window>, config: GameConfig) -> Result<Self, InitError> {
        let gpu = GpuContext::new(window.clone())?;
        let sprite_pipeline = SpritePipeline::new(&gpu.device, gpu.config.format);
        let debug_overlay = DebugOverlay::new(&gpu.device, gpu.config.format, &window);
        let camera = Camera2D::new(config.screen_width, config.screen_height);
        let clock = FrameClock::new(config.max_frame_dt as f64);
        let mut textures = TextureCache::new();

        let level = config.level.clone();
        let mut world = GameWorld::new(config);
        {
            let mut loader = textures.loader(&gpu.device, &gpu.queue, &sprite_pipeline);
            world.load_cursor(&mut loader).map_err(InitError::Asset)?;
            world
                .load_level(&level, &mut loader)
                .map_err(InitError::Asset)?;
        }
        let level_watcher = LevelWatcher::new(world.level_path(&level));

        let camera_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Camera Uniform Buffer"),
                contents: bytemuck::cast_slice(&[camera.build_uniform()]),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });
        let camera_bind_group =
            sprite_pipeline.create_camera_bind_group(&gpu.device, &camera_buffer);
        let buffers = SpriteBuffers::new(&gpu.device);

        Ok(Self {
            window,
            gpu,
            clock,
            input: InputState::new(),
            camera,
            sprite_pipeline,
            debug_overlay,
            textures,
            world,
            level_watcher,
            batch: SpriteBatch::new(),
            buffers,
            camera_buffer,
            camera_bind_group,
        })
    }

    fn reload_level(&mut self, reason: &str) {
        log::info!("Reloading level ({reason})");
        let mut loader =
            self.textures
                .loader(&self.gpu.device, &self.gpu.queue, &self.sprite_pipeline);
        if let Err(err) = self.world.reload_level(&mut loader) {
            log::error!("Level reload failed: {err}");
        }
        self.level_watcher.mark_seen();
    }

    fn shutdown(&mut self) {
        let mut loader =
            self.textures
                .loader(&self.gpu.device, &self.gpu.queue, &self.sprite_pipeline);
        self.world.shutdown(&mut loader);
    }

    fn overlay_stats(&self) -> OverlayStats {
        OverlayStats {
            world: self.world.stats(),
            draw_calls: self.batch.draw_calls.len() as u32,
            texture_binds: self.batch.texture_binds() as u32,
            sprite_count: self.batch.sprite_count() as u32,
            memory_estimate_mb: self.textures.estimate_memory_mb(),
        }
    }

    /// Simulate and present one frame. Returns false when the game should
    /// quit.
    fn frame(&mut self) -> bool {
        let dt = self.clock.begin_frame();
        let outcome = self.world.tick(&self.input, dt);
        if outcome.quit {
            return false;
        }

        if self.input.is_just_pressed(Key::F3) {
            self.debug_overlay.toggle();
        }
        if outcome.reload_requested {
            self.reload_level("manual trigger (R)");
        } else if self.level_watcher.should_reload() {
            self.reload_level("file watcher");
        }

        self.batch.clear();
        self.world.render(&mut self.batch);
        self.buffers
            .upload(&self.gpu.device, &self.gpu.queue, &self.batch);
        self.gpu.queue.write_buffer(
            &self.camera_buffer,
            0,
            bytemuck::cast_slice(&[self.camera.build_uniform()]),
        );

        let Some((output, view)) = self.gpu.begin_frame() else {
            self.input.end_frame();
            return true;
        };

        let stats = self.overlay_stats();
        let (egui_primitives, egui_textures_delta) =
            self.debug_overlay
                .prepare(&self.window, &self.clock, Some(&stats));
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.gpu.size.0, self.gpu.size.1],
            pixels_per_point: self.window.scale_factor() as f32,
        };

        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Sprite Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                ..Default::default()
            });
            render_pass.set_pipeline(&self.sprite_pipeline.render_pipeline);
            render_pass.set_bind_group(0, &self.camera_bind_group, &[]);
            self.buffers
                .draw(&mut render_pass, &self.batch, &self.textures);
        }

        self.debug_overlay.upload(
            &self.gpu.device,
            &self.gpu.queue,
            &mut encoder,
            &egui_primitives,
            &egui_textures_delta,
            &screen_descriptor,
        );

        {
            let mut egui_pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("egui Render Pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    ..Default::default()
                })
                .forget_lifetime();
            self.debug_overlay
                .paint(&mut egui_pass, &egui_primitives, &screen_descriptor);
        }

        self.debug_overlay.cleanup(&egui_textures_delta);

        self.gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        self.input.end_frame();
        true
    }
}

struct App {
    game_config: GameConfig,
    config: PlatformConfig,
    state: Option<EngineState>,
    failed: bool,
}

impl App {
    fn new(game_config: GameConfig) -> Self {
        let config = PlatformConfig::new(
            game_config.title.clone(),
            game_config.screen_width,
            game_config.screen_height,
        );
        Self {
            game_config,
            config,
            state: None,
            failed: false,
        }
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<EngineState, InitError> {
        let window = smk_platform::create_window(event_loop, &self.config)?;
        EngineState::new(window, self.game_config.clone())
    }

    fn exit(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(state) = self.state.as_mut() {
            state.shutdown();
        }
        self.state = None;
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() || self.failed {
            return;
        }
        match self.init(event_loop) {
            Ok(state) => self.state = Some(state),
            Err(err) => {
                log::error!("Startup failed: {err}");
                self.failed = true;
                event_loop.exit();
            }
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = &self.state {
            state.window.request_redraw();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(state) = self.state.as_mut() else {
            return;
        };

        let egui_consumed = state
            .debug_overlay
            .handle_window_event(&state.window, &event);

        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, exiting.");
                self.exit(event_loop);
            }

            WindowEvent::Resized(physical_size) => {
                let w = physical_size.width;
                let h = physical_size.height;
                if w > 0 && h > 0 {
                    state.gpu.resize(w, h);
                    log::info!("Surface resized to {}x{}", w, h);
                }
            }

            WindowEvent::Focused(false) => state.input.release_all(),

            WindowEvent::KeyboardInput { event, .. } if !egui_consumed => {
                if let PhysicalKey::Code(key_code) = event.physical_key {
                    if let Some(game_key) = map_key(key_code) {
                        match event.state {
                            ElementState::Pressed => state.input.key_down(game_key),
                            ElementState::Released => state.input.key_up(game_key),
                        }
                    }
                }
            }

            WindowEvent::CursorMoved { position, .. } => {
                state.input.mouse_position = surface_to_game(
                    (position.x, position.y),
                    state.gpu.size,
                    state.camera.viewport,
                );
            }

            WindowEvent::MouseInput {
                state: button_state,
                button,
                ..
            } if !egui_consumed => {
                if let Some(btn) = map_mouse_button(button) {
                    match button_state {
                        ElementState::Pressed => state.input.mouse_down(btn),
                        ElementState::Released => state.input.mouse_up(btn),
                    }
                }
            }

            WindowEvent::RedrawRequested => {
                if state.gpu.size.0 == 0 || state.gpu.size.1 == 0 {
                    return;
                }
                if !state.frame() {
                    log::info!("Escape pressed, exiting.");
                    self.exit(event_loop);
                }
            }

            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = self.state.as_mut() {
            state.shutdown();
        }
        self.state = None;
    }
}

/// Map a physical-pixel surface position into the fixed game resolution the
/// world renders at.
fn surface_to_game(position: (f64, f64), surface: (u32, u32), game: (u32, u32)) -> (f64, f64) {
    let sx = game.0 as f64 / surface.0.max(1) as f64;
    let sy = game.1 as f64 / surface.1.max(1) as f64;
    (position.0 * sx, position.1 * sy)
}

fn map_key(key_code: KeyCode) -> Option<Key> {
    match key_code {
        KeyCode::ArrowLeft => Some(Key::Left),
        KeyCode::ArrowRight => Some(Key::Right),
        KeyCode::ArrowUp => Some(Key::Up),
        KeyCode::ArrowDown => Some(Key::Down),
        KeyCode::Escape => Some(Key::Escape),
        KeyCode::F3 => Some(Key::F3),
        KeyCode::KeyW => Some(Key::W),
        KeyCode::KeyA => Some(Key::A),
        KeyCode::KeyS => Some(Key::S),
        KeyCode::KeyD => Some(Key::D),
        KeyCode::KeyR => Some(Key::R),
        _ => None,
    }
}

fn map_mouse_button(button: MouseButton) -> Option<MouseBtn> {
    match button {
        MouseButton::Left => Some(MouseBtn::Left),
        MouseButton::Right => Some(MouseBtn::Right),
        MouseButton::Middle => Some(MouseBtn::Middle),
        _ => None,
    }
}

/// Config from disk, with the level optionally overridden by the first
/// command-line argument.
fn load_game_config(path: &Path, level_override: Option<String>) -> GameConfig {
    let mut config = load_config_or_default(path);
    if let Some(level) = level_override.filter(|l| !l.trim().is_empty()) {
        log::info!("Level overridden from command line: {level}");
        config.level = level;
    }
    config
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Space Monkeys starting...");

    let game_config = load_game_config(Path::new(CONFIG_PATH), std::env::args().nth(1));

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(err) => {
            log::error!("Failed to create event loop: {err}");
            return ExitCode::FAILURE;
        }
    };
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(game_config);
    if let Err(err) = event_loop.run_app(&mut app) {
        log::error!("Event loop error: {err}");
        return ExitCode::FAILURE;
    }
    if app.failed {
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
