//! Platform layer: window, event loop and frame pacing around the renderer.

pub mod state;

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use asset::{DecodedImage, MeshStreams};
use corelib::{Mat4, clock::TickDecision};
use renderer::{Renderer, RendererConfig};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::PhysicalKey,
    window::{Window, WindowId},
};

pub use state::{InputEvent, LoopConfig, LoopState, RenderContext, map_key};

const FPS_WINDOW: Duration = Duration::from_secs(1);

/// Meshes and images waiting for the window to exist.
struct PendingAssets {
    mesh: MeshStreams,
    images: Vec<DecodedImage>,
}

struct RenderLoop {
    config: LoopConfig,
    renderer_config: RendererConfig,
    pending: Option<PendingAssets>,
    context: RenderContext,

    // Dropped in this order: renderer before the window it draws to.
    renderer: Option<Renderer>,
    window: Option<Arc<Window>>,

    error: Option<anyhow::Error>,
    fps_window_start: Instant,
    fps_ticks: u64,
}

impl RenderLoop {
    fn new(
        config: LoopConfig,
        renderer_config: RendererConfig,
        mesh: MeshStreams,
        images: Vec<DecodedImage>,
        model: Mat4,
    ) -> Self {
        let context = RenderContext::new(&config, model);
        Self {
            config,
            renderer_config,
            pending: Some(PendingAssets { mesh, images }),
            context,
            renderer: None,
            window: None,
            error: None,
            fps_window_start: Instant::now(),
            fps_ticks: 0,
        }
    }

    fn setup(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attributes = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(PhysicalSize::new(self.config.width, self.config.height))
            .with_resizable(false);
        let window = Arc::new(
            event_loop
                .create_window(attributes)
                .context("failed to create window")?,
        );
        let size = window.inner_size();
        log::info!("Window created: {}x{}", size.width, size.height);
        self.window = Some(window.clone());

        let PendingAssets { mesh, images } = self
            .pending
            .take()
            .context("render resources were already created")?;
        let renderer = pollster::block_on(Renderer::new(
            window.clone(),
            &self.renderer_config,
            &mesh,
            images,
        ))
        .context("failed to initialise renderer")?;
        for line in renderer.shader_diagnostics() {
            log::warn!("{line}");
        }

        let (width, height) = renderer.size();
        self.context.resize(width, height);
        self.renderer = Some(renderer);
        window.request_redraw();
        Ok(())
    }

    fn input(&mut self, event_loop: &ActiveEventLoop, event: InputEvent) {
        let state = self.context.handle_input(event);
        match state {
            LoopState::Running => log::info!("Animation resumed"),
            LoopState::Paused => log::info!("Animation paused"),
            LoopState::Closing => {
                log::info!("Close requested. Exiting event loop.");
                event_loop.exit();
            }
            LoopState::Terminated => {}
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };
        match renderer.render(self.context.transform(), self.context.light_position()) {
            Ok(()) => {}
            Err(e) if Renderer::is_surface_lost(&e) => {
                log::warn!("Surface lost/outdated: {e:?}. Recreating...");
                renderer.recreate_surface();
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("Out of GPU memory. Exiting.");
                self.error = Some(anyhow::anyhow!("out of GPU memory"));
                self.input(event_loop, InputEvent::Quit);
            }
            Err(e) => log::warn!("Frame skipped: {e:?}"),
        }
    }

    fn report_fps(&mut self, now: Instant) {
        self.fps_ticks += 1;
        let elapsed = now.saturating_duration_since(self.fps_window_start);
        if elapsed >= FPS_WINDOW {
            let fps = self.fps_ticks as f64 / elapsed.as_secs_f64();
            log::info!("FPS: {fps:.1} ({} ticks total)", self.context.ticks());
            self.fps_ticks = 0;
            self.fps_window_start = now;
        }
    }
}

impl ApplicationHandler for RenderLoop {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        event_loop.set_control_flow(ControlFlow::Poll);
        if let Err(e) = self.setup(event_loop) {
            log::error!("{e:#}");
            self.error = Some(e);
            self.input(event_loop, InputEvent::Quit);
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => self.input(event_loop, InputEvent::WindowClose),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => {
                if let Some(input) = map_key(code) {
                    self.input(event_loop, input);
                }
            }
            WindowEvent::Resized(size) => {
                log::info!("Resized: {}x{}", size.width, size.height);
                if let Some(renderer) = self.renderer.as_mut() {
                    renderer.resize(size.width, size.height);
                }
                self.context.resize(size.width, size.height);
            }
            WindowEvent::RedrawRequested => {
                if self.context.is_live() {
                    self.redraw(event_loop);
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if self.renderer.is_none() || !self.context.is_live() {
            return;
        }
        if self.context.pace() == TickDecision::Accept {
            if let Some(now) = self.context.last_tick().filter(|_| self.config.show_fps) {
                self.report_fps(now);
            }
            if let Some(window) = &self.window {
                window.request_redraw();
            }
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.renderer.take();
        self.pending.take();
        self.window.take();
        self.context.finish();
        log::info!("Render loop terminated");
    }
}

/// Open the window and run until it closes. Any setup failure is returned
/// after the partially created resources have been released.
pub fn run(
    config: LoopConfig,
    renderer_config: RendererConfig,
    mesh: MeshStreams,
    images: Vec<DecodedImage>,
    model: Mat4,
) -> Result<()> {
    let event_loop = EventLoop::new().context("failed to create event loop")?;
    let mut app = RenderLoop::new(config, renderer_config, mesh, images, model);
    event_loop
        .run_app(&mut app)
        .map_err(|e| anyhow::anyhow!("Event loop error: {e:?}"))?;

    match app.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
