//! Render-loop state: animation toggle, close handling and the per-tick
//! model update. Owned by the event loop and passed to handlers explicitly.

use std::time::{Duration, Instant};

use corelib::{
    Mat4, Vec3,
    camera::Camera,
    clock::{FrameClock, TickDecision},
    transform::{TransformState, tick_rotation},
};
use winit::keyboard::KeyCode;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Running,
    /// Animation frozen; frames are still drawn.
    Paused,
    Closing,
    Terminated,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputEvent {
    Quit,
    ToggleAnimation,
    WindowClose,
}

pub fn map_key(code: KeyCode) -> Option<InputEvent> {
    match code {
        KeyCode::Escape => Some(InputEvent::Quit),
        KeyCode::Space => Some(InputEvent::ToggleAnimation),
        _ => None,
    }
}

/// Loop and animation settings.
#[derive(Clone, Debug)]
pub struct LoopConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub tick_interval: Duration,
    pub degrees_per_tick: f32,
    pub start_paused: bool,
    pub show_fps: bool,
    pub light_position: Vec3,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            title: "meshview".to_owned(),
            width: 800,
            height: 600,
            tick_interval: corelib::clock::DEFAULT_TICK_INTERVAL,
            degrees_per_tick: 1.0,
            start_paused: false,
            show_fps: false,
            light_position: Vec3::new(4.0, 4.0, 4.0),
        }
    }
}

pub struct RenderContext {
    state: LoopState,
    camera: Camera,
    transform: TransformState,
    rotation: Mat4,
    clock: FrameClock,
    light_position: Vec3,
    ticks: u64,
}

impl RenderContext {
    pub fn new(config: &LoopConfig, model: Mat4) -> Self {
        let camera = Camera::viewer(aspect(config.width, config.height));
        Self {
            state: if config.start_paused {
                LoopState::Paused
            } else {
                LoopState::Running
            },
            camera,
            transform: TransformState::from_camera(model, &camera),
            rotation: tick_rotation(config.degrees_per_tick),
            clock: FrameClock::new(config.tick_interval),
            light_position: config.light_position,
            ticks: 0,
        }
    }

    #[inline]
    pub fn state(&self) -> LoopState {
        self.state
    }

    #[inline]
    pub fn transform(&self) -> &TransformState {
        &self.transform
    }

    #[inline]
    pub fn light_position(&self) -> Vec3 {
        self.light_position
    }

    /// Accepted ticks so far.
    #[inline]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    #[inline]
    pub fn is_live(&self) -> bool {
        matches!(self.state, LoopState::Running | LoopState::Paused)
    }

    pub fn handle_input(&mut self, event: InputEvent) -> LoopState {
        self.state = match (self.state, event) {
            (LoopState::Running, InputEvent::ToggleAnimation) => LoopState::Paused,
            (LoopState::Paused, InputEvent::ToggleAnimation) => LoopState::Running,
            (
                LoopState::Running | LoopState::Paused,
                InputEvent::Quit | InputEvent::WindowClose,
            ) => LoopState::Closing,
            (state, _) => state,
        };
        log::debug!("{event:?} -> {:?}", self.state);
        self.state
    }

    /// Time of the last accepted tick.
    #[inline]
    pub fn last_tick(&self) -> Option<Instant> {
        self.clock.last_tick()
    }

    /// Pace the loop: accept a tick when due (sleeping one short slice when
    /// not). The model only rotates on accepted ticks while running.
    pub fn pace(&mut self) -> TickDecision {
        if !self.is_live() {
            return TickDecision::Wait(self.clock.min_interval());
        }
        let decision = self.clock.pace();
        if decision == TickDecision::Accept {
            self.ticks += 1;
            if self.state == LoopState::Running {
                self.transform.rotate_world(&self.rotation);
            }
        }
        decision
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.transform.set_aspect(&self.camera, aspect(width, height));
    }

    /// Mark the loop terminated once every resource is released.
    pub fn finish(&mut self) {
        self.state = LoopState::Terminated;
    }
}

fn aspect(width: u32, height: u32) -> f32 {
    width.max(1) as f32 / height.max(1) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx_with_interval(tick_interval: Duration) -> RenderContext {
        let config = LoopConfig {
            tick_interval,
            ..LoopConfig::default()
        };
        RenderContext::new(&config, Mat4::IDENTITY)
    }

    fn ctx() -> RenderContext {
        ctx_with_interval(Duration::from_secs(10))
    }

    #[test]
    fn keys_map_to_loop_events() {
        assert_eq!(map_key(KeyCode::Escape), Some(InputEvent::Quit));
        assert_eq!(map_key(KeyCode::Space), Some(InputEvent::ToggleAnimation));
        assert_eq!(map_key(KeyCode::KeyA), None);
    }

    #[test]
    fn toggle_and_close_transitions() {
        let mut c = ctx();
        assert_eq!(c.state(), LoopState::Running);
        assert_eq!(c.handle_input(InputEvent::ToggleAnimation), LoopState::Paused);
        assert_eq!(c.handle_input(InputEvent::ToggleAnimation), LoopState::Running);
        assert_eq!(c.handle_input(InputEvent::ToggleAnimation), LoopState::Paused);
        assert_eq!(c.handle_input(InputEvent::WindowClose), LoopState::Closing);
        // Closing ignores further input.
        assert_eq!(c.handle_input(InputEvent::ToggleAnimation), LoopState::Closing);
        c.finish();
        assert_eq!(c.state(), LoopState::Terminated);
        assert_eq!(c.handle_input(InputEvent::Quit), LoopState::Terminated);
    }

    #[test]
    fn paused_ticks_keep_the_model() {
        let mut c = ctx();
        c.handle_input(InputEvent::ToggleAnimation);
        assert_eq!(c.pace(), TickDecision::Accept);
        assert_eq!(c.transform().model, Mat4::IDENTITY);
        assert_eq!(c.ticks(), 1);
    }

    #[test]
    fn running_ticks_rotate_only_when_due() {
        let mut c = ctx();
        assert_eq!(c.pace(), TickDecision::Accept);
        let once = c.transform().model;
        assert_ne!(once, Mat4::IDENTITY);

        assert!(matches!(c.pace(), TickDecision::Wait(_)));
        assert_eq!(c.transform().model, once);
        assert_eq!(c.ticks(), 1);
    }

    #[test]
    fn loop_ticks_are_spaced_by_the_interval() {
        let interval = Duration::from_millis(10);
        let mut c = ctx_with_interval(interval);
        let mut accepted = Vec::new();
        while accepted.len() < 5 {
            if c.pace() == TickDecision::Accept {
                accepted.extend(c.last_tick());
            }
        }
        for pair in accepted.windows(2) {
            assert!(pair[1].duration_since(pair[0]) >= interval);
        }
        assert_eq!(c.ticks(), 5);
    }

    #[test]
    fn closing_stops_ticking() {
        let mut c = ctx();
        c.handle_input(InputEvent::Quit);
        assert!(!c.is_live());
        assert!(matches!(c.pace(), TickDecision::Wait(_)));
        assert_eq!(c.ticks(), 0);
        assert_eq!(c.last_tick(), None);
    }

    #[test]
    fn resize_updates_projection_only() {
        let mut c = ctx();
        let before = *c.transform();
        c.resize(1600, 600);
        assert_eq!(c.transform().view, before.view);
        assert_ne!(c.transform().projection, before.projection);
    }
}
