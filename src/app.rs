//! Application shell: window, wgpu device setup, and the event loop that
//! drives one [`FrameDriver`] tick per redraw.
//!
//! The windowing layer is a thin collaborator: it supplies the frame-loop
//! drive signal, cursor position updates, and the stop condition. Cursor
//! coordinates are held as pass-through state and mapped to the attractor
//! position only when handed to the compute stage.

use std::sync::Arc;

use glam::Vec3;
use winit::{
    application::ApplicationHandler,
    event::*,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowId},
};

use crate::config::SimConfig;
use crate::driver::{ComputeStage, FrameDriver, RenderStage};
use crate::error::CoreError;
use crate::rendering::{GraphicsSurface, Spin};
use crate::simulation::tasks::{ApplyVelocityTask, InitCubeTask};
use crate::simulation::TaskPipeline;

/// What the event loop should do after handling a window event.
///
/// `Stop` is a clean shutdown (window close); `Fatal` is an unrecoverable
/// core error that must surface as a nonzero exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopControl {
    Continue,
    Stop,
    Fatal,
}

/// Apply a loop-control outcome to the fatal flag; returns whether the
/// event loop should exit.
fn loop_disposition(control: LoopControl, fatal: &mut bool) -> bool {
    match control {
        LoopControl::Continue => false,
        LoopControl::Stop => true,
        LoopControl::Fatal => {
            *fatal = true;
            true
        }
    }
}

/// Adapts the task pipeline (plus the device pair and the current attractor
/// position) to the driver's compute stage interface.
struct GpuComputeStage<'a> {
    device: &'a wgpu::Device,
    queue: &'a wgpu::Queue,
    pipeline: &'a mut TaskPipeline,
    attractor: Vec3,
}

impl ComputeStage for GpuComputeStage<'_> {
    fn acquire_shared_buffers(&mut self) -> Result<(), CoreError> {
        self.pipeline.acquire_shared_buffers()
    }

    fn step(&mut self, dt: f32) -> Result<(), CoreError> {
        self.pipeline.step(self.device, self.queue, self.attractor, dt)
    }

    fn release_shared_buffers(&mut self) -> Result<(), CoreError> {
        self.pipeline.release_shared_buffers()
    }
}

/// Adapts the graphics surface and the frame's target view to the driver's
/// render stage interface.
struct GpuRenderStage<'a> {
    device: &'a wgpu::Device,
    queue: &'a wgpu::Queue,
    surface: &'a mut GraphicsSurface,
    view: &'a wgpu::TextureView,
    particle_count: u32,
}

impl RenderStage for GpuRenderStage<'_> {
    fn update_dynamic_uniforms(&mut self, dt: f32) {
        self.surface.update_dynamic_uniforms(self.queue, dt);
    }

    fn draw(&mut self) -> Result<(), CoreError> {
        self.surface
            .draw(self.device, self.queue, self.view, self.particle_count)
    }
}

pub struct App {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    sim: SimConfig,
    graphics: GraphicsSurface,
    pipeline: TaskPipeline,
    driver: FrameDriver,
    cursor: (f64, f64),
}

impl App {
    pub fn window(&self) -> &Window {
        &self.window
    }

    /// Handle a window event and report how the loop should proceed.
    fn handle_event(&mut self, event: &WindowEvent) -> LoopControl {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested");
                return LoopControl::Stop;
            }
            WindowEvent::Resized(physical_size) => {
                if physical_size.width > 0 && physical_size.height > 0 {
                    self.config.width = physical_size.width;
                    self.config.height = physical_size.height;
                    self.surface.configure(&self.device, &self.config);
                    self.graphics.resize(
                        &self.device,
                        &self.queue,
                        physical_size.width,
                        physical_size.height,
                    );
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = (position.x, position.y);
            }
            WindowEvent::RedrawRequested => {
                return self.render();
            }
            _ => {}
        }
        LoopControl::Continue
    }

    /// Map the raw cursor position into world coordinates on the Z=0 plane.
    fn attractor(&self) -> Vec3 {
        let nx = (self.cursor.0 / self.config.width.max(1) as f64) * 2.0 - 1.0;
        let ny = 1.0 - (self.cursor.1 / self.config.height.max(1) as f64) * 2.0;
        Vec3::new(
            nx as f32 * self.sim.border_size,
            ny as f32 * self.sim.border_size,
            0.0,
        )
    }

    fn render(&mut self) -> LoopControl {
        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.surface.configure(&self.device, &self.config);
                return LoopControl::Continue;
            }
            Err(e) => {
                log::error!("Failed to acquire surface frame: {}", e);
                return LoopControl::Fatal;
            }
        };
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let attractor = self.attractor();
        let mut compute = GpuComputeStage {
            device: &self.device,
            queue: &self.queue,
            pipeline: &mut self.pipeline,
            attractor,
        };
        let mut render = GpuRenderStage {
            device: &self.device,
            queue: &self.queue,
            surface: &mut self.graphics,
            view: &view,
            particle_count: self.sim.particle_count,
        };

        if let Err(e) = self.driver.tick(&mut compute, &mut render) {
            log::error!("Fatal tick error: {}", e);
            return LoopControl::Fatal;
        }

        frame.present();
        LoopControl::Continue
    }

    pub fn request_redraw(&self) {
        self.window.request_redraw();
    }
}

struct AppState {
    app: Option<App>,
    fatal: bool,
}

impl AppState {
    fn setup(&mut self, event_loop: &ActiveEventLoop) -> Result<App, CoreError> {
        let sim = SimConfig::load_or_default();

        let window_attributes = Window::default_attributes()
            .with_title("Gravity Points")
            .with_inner_size(winit::dpi::PhysicalSize::new(sim.width, sim.height));

        let window = Arc::new(
            event_loop
                .create_window(window_attributes)
                .map_err(|e| CoreError::Config(format!("window creation failed: {}", e)))?,
        );

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .map_err(|e| CoreError::Config(format!("surface creation failed: {}", e)))?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .ok_or_else(|| CoreError::Config("no compatible GPU adapter".into()))?;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
            },
            None,
        ))
        .map_err(|e| CoreError::Config(format!("device request failed: {}", e)))?;

        let size = window.inner_size();
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .unwrap_or(surface_caps.formats[0]);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let graphics = GraphicsSurface::new(
            &device,
            &queue,
            surface_format,
            config.width,
            config.height,
            sim.particle_count,
            sim.border_size,
            Spin::new(sim.auto_rotate, sim.rotation_speed),
        )?;

        let mut pipeline = TaskPipeline::new(&device, sim.particle_count, sim.workgroup_size);

        let mut gravity = ApplyVelocityTask::new();
        gravity.set_particle_count(sim.particle_count)?;
        gravity.set_workgroup_size(sim.workgroup_size)?;
        gravity.set_gravity(sim.mass_point, sim.mass_particles, sim.gravitational_constant)?;
        pipeline.register_task(Box::new(gravity));
        pipeline.build_tasks(&device, graphics.shared_buffers())?;

        // Seed the field once, through the same hand-off protocol as a tick
        let mut seed = InitCubeTask::new();
        seed.configure(sim.particle_count, sim.border_size * 0.5, sim.workgroup_size)?;
        pipeline.build_task(&device, graphics.shared_buffers(), &mut seed)?;
        pipeline.acquire_shared_buffers()?;
        pipeline.run_task_once(&device, &queue, &seed)?;
        pipeline.release_shared_buffers()?;

        log::info!(
            "Initialized: {} particles, workgroup size {}",
            sim.particle_count,
            sim.workgroup_size
        );

        Ok(App {
            window,
            surface,
            device,
            queue,
            config,
            sim,
            graphics,
            pipeline,
            driver: FrameDriver::new(),
            cursor: (0.0, 0.0),
        })
    }
}

impl ApplicationHandler for AppState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.app.is_some() {
            return;
        }

        match self.setup(event_loop) {
            Ok(app) => self.app = Some(app),
            Err(e) => {
                log::error!("Fatal initialization error: {}", e);
                self.fatal = true;
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(app) = &mut self.app else { return };

        if window_id != app.window().id() {
            return;
        }

        if loop_disposition(app.handle_event(&event), &mut self.fatal) {
            event_loop.exit();
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        event_loop.set_control_flow(ControlFlow::Poll);
        if let Some(app) = &self.app {
            app.request_redraw();
        }
    }
}

pub fn run() {
    env_logger::init();

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(e) => {
            log::error!("Failed to create event loop: {}", e);
            std::process::exit(1);
        }
    };

    let mut state = AppState {
        app: None,
        fatal: false,
    };

    if let Err(e) = event_loop.run_app(&mut state) {
        log::error!("Event loop error: {}", e);
        std::process::exit(1);
    }

    if state.fatal {
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_outcome_sets_flag_and_exits_loop() {
        let mut fatal = false;
        assert!(loop_disposition(LoopControl::Fatal, &mut fatal));
        assert!(fatal);
    }

    #[test]
    fn clean_stop_exits_without_fatal_flag() {
        let mut fatal = false;
        assert!(loop_disposition(LoopControl::Stop, &mut fatal));
        assert!(!fatal);
    }

    #[test]
    fn continue_neither_exits_nor_flags() {
        let mut fatal = false;
        assert!(!loop_disposition(LoopControl::Continue, &mut fatal));
        assert!(!fatal);
    }
}
