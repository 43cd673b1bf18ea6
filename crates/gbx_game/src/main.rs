//! Greybox Engine -- main loop and application entry point.
//!
//! Architecture: winit drives the event loop via `ApplicationHandler`. All
//! per-frame work runs inside `RedrawRequested`:
//!
//!   1. `begin_frame()` -- measure wall-clock delta, feed the accumulator
//!   2. `while should_step()` -- consume fixed-dt slices: input edges, then
//!      `GameScene::update()` refreshes every instance's world matrix
//!   3. Upload the camera uniform and the per-instance transform uniforms
//!   4. Record the scene's three draw phases (background sprites, meshes,
//!      foreground sprites), composite the egui overlay, submit, present
//!
//! The level file and model directory are fixed paths below; there is no
//! CLI surface. A failed initial load terminates the process with the
//! loader's discriminated error message.

mod level;
mod registry;
mod scene;

use std::path::Path;
use std::sync::Arc;

use wgpu::util::DeviceExt;
use winit::application::ApplicationHandler;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use gbx_core::input::{InputState, Key};
use gbx_core::time::TimeState;
use gbx_devtools::{DebugOverlay, OverlayStats};
use gbx_platform::window::PlatformConfig;
use gbx_render::{GpuContext, ModelPipeline, SpriteRenderer};
use scene::{GameScene, ScenePasses};

const LEVEL_PATH: &str = "resources/levels/test.json";
const MODEL_DIR: &str = "resources/models";

/// All mutable engine state lives here. Constructed lazily in
/// `ApplicationHandler::resumed` once the window and GPU surface exist.
struct EngineState {
    window: Arc<Window>,
    gpu: GpuContext,
    time: TimeState,
    input: InputState,
    model_pipeline: ModelPipeline,
    sprites: SpriteRenderer,
    debug_overlay: DebugOverlay,

    scene: GameScene,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,

    paused: bool,
    single_step_requested: bool,
}

impl EngineState {
    fn new(window: Arc<Window>) -> Self {
        let gpu = GpuContext::new(window.clone());
        let time = TimeState::new();
        let input = InputState::new();
        let model_pipeline = ModelPipeline::new(&gpu.device, gpu.surface_format);
        let sprites = SpriteRenderer::new(&gpu.device, &gpu.queue, gpu.surface_format, gpu.size);
        let debug_overlay = DebugOverlay::new(&gpu.device, gpu.surface_format, &window);

        let scene = GameScene::new(
            &gpu,
            &model_pipeline,
            &sprites,
            Path::new(LEVEL_PATH),
            Path::new(MODEL_DIR),
        )
        .unwrap_or_else(|err| {
            panic!("Failed to load initial level '{}': {}", LEVEL_PATH, err);
        });
        log::info!(
            "Scene '{}' ready: {} instances over {} models",
            scene.level_name(),
            scene.instance_count(),
            scene.model_count()
        );

        let camera_uniform = scene.camera.build_uniform();
        let camera_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Camera Uniform Buffer"),
                contents: bytemuck::cast_slice(&[camera_uniform]),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });
        let camera_bind_group = model_pipeline.create_camera_bind_group(&gpu.device, &camera_buffer);

        Self {
            window,
            gpu,
            time,
            input,
            model_pipeline,
            sprites,
            debug_overlay,
            scene,
            camera_buffer,
            camera_bind_group,
            paused: false,
            single_step_requested: false,
        }
    }
}

struct App {
    config: PlatformConfig,
    state: Option<EngineState>,
}

impl App {
    fn new() -> Self {
        Self {
            config: PlatformConfig::default(),
            state: None,
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }
        let window = gbx_platform::window::create_window(event_loop, &self.config);
        log::info!(
            "Window created: {}x{}",
            self.config.width,
            self.config.height
        );
        self.state = Some(EngineState::new(window));
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
        let state = match self.state.as_mut() {
            Some(s) => s,
            None => return,
        };

        let egui_consumed = state
            .debug_overlay
            .handle_window_event(&state.window, &event);

        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, exiting.");
                event_loop.exit();
            }

            WindowEvent::Resized(physical_size) => {
                let w = physical_size.width;
                let h = physical_size.height;
                if w > 0 && h > 0 {
                    state.gpu.resize(w, h);
                    state.scene.camera.viewport = (w, h);
                    state.sprites.resize(&state.gpu.queue, w, h);
                    log::info!("Resized to {}x{}", w, h);
                }
            }

            WindowEvent::KeyboardInput { event, .. } if !egui_consumed => {
                if let PhysicalKey::Code(key_code) = event.physical_key {
                    if let Some(engine_key) = map_key(key_code) {
                        match event.state {
                            ElementState::Pressed => state.input.key_down(engine_key),
                            ElementState::Released => state.input.key_up(engine_key),
                        }
                    }
                }
            }

            WindowEvent::CursorMoved { position, .. } => {
                state.input.cursor_position = (position.x, position.y);
            }

            WindowEvent::RedrawRequested => {
                if state.gpu.size.0 == 0 || state.gpu.size.1 == 0 {
                    return;
                }

                // Fixed-step update phase.
                state.time.begin_frame();
                while state.time.should_step() {
                    if state.input.is_just_pressed(Key::Escape) {
                        event_loop.exit();
                        return;
                    }
                    if state.input.is_just_pressed(Key::F3) {
                        state.debug_overlay.toggle();
                    }
                    if state.input.is_just_pressed(Key::Space) {
                        state.paused = !state.paused;
                        log::info!("Update loop {}", if state.paused { "PAUSED" } else { "RESUMED" });
                    }

                    if state.paused && !state.single_step_requested {
                        break;
                    }
                    state.single_step_requested = false;

                    state.scene.update();
                }

                // Render phase reads the finalized transforms of this frame.
                let camera_uniform = state.scene.camera.build_uniform();
                state.gpu.queue.write_buffer(
                    &state.camera_buffer,
                    0,
                    bytemuck::cast_slice(&[camera_uniform]),
                );
                state.scene.upload_transforms(&state.gpu.queue);

                let Some((output, view)) = state.gpu.begin_frame() else {
                    return;
                };

                let (egui_primitives, egui_textures_delta, overlay_actions) =
                    state.debug_overlay.prepare(
                        &state.window,
                        &state.time,
                        Some(OverlayStats {
                            draw_calls: state.scene.instance_count() as u32,
                            instance_count: state.scene.instance_count() as u32,
                            model_count: state.scene.model_count() as u32,
                            memory_estimate_mb: state.scene.memory_estimate_mb(),
                            paused: state.paused,
                        }),
                    );

                if overlay_actions.toggle_pause {
                    state.paused = !state.paused;
                    log::info!(
                        "Update loop {} (overlay)",
                        if state.paused { "PAUSED" } else { "RESUMED" }
                    );
                }
                if overlay_actions.single_step {
                    state.single_step_requested = true;
                }
                let screen_descriptor = egui_wgpu::ScreenDescriptor {
                    size_in_pixels: [state.gpu.size.0, state.gpu.size.1],
                    pixels_per_point: state.window.scale_factor() as f32,
                };

                let mut encoder =
                    state
                        .gpu
                        .device
                        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                            label: Some("Render Encoder"),
                        });

                let passes = ScenePasses {
                    gpu: &state.gpu,
                    model_pipeline: &state.model_pipeline,
                    camera_bind_group: &state.camera_bind_group,
                    sprites: &state.sprites,
                };
                state.scene.draw(&mut encoder, &view, &passes);

                state.debug_overlay.upload(
                    &state.gpu.device,
                    &state.gpu.queue,
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

                    state
                        .debug_overlay
                        .paint(&mut egui_pass, &egui_primitives, &screen_descriptor);
                }

                state.debug_overlay.cleanup(&egui_textures_delta);

                state.gpu.queue.submit(std::iter::once(encoder.finish()));
                output.present();

                // Only clear edge-triggered input after at least one fixed
                // step consumed it. Otherwise a press that lands on a frame
                // with 0 simulation steps is silently lost.
                if state.time.steps_this_frame > 0 {
                    state.input.end_frame();
                }
            }

            _ => {}
        }
    }
}

fn map_key(key_code: KeyCode) -> Option<Key> {
    match key_code {
        KeyCode::Escape => Some(Key::Escape),
        KeyCode::Space => Some(Key::Space),
        KeyCode::F3 => Some(Key::F3),
        _ => None,
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Greybox Engine starting...");

    let event_loop = EventLoop::new().expect("Failed to create event loop");
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new();
    event_loop.run_app(&mut app).expect("Event loop error");
}
