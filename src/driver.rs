//! Per-tick orchestration.
//!
//! One tick hands the shared buffers to compute, runs the task pipeline,
//! hands the buffers back, and draws — in that order, every time:
//!
//! ```text
//! acquire -> step -> release -> update uniforms -> draw -> clock advance
//! ```
//!
//! No step may be reordered or overlapped with another: both subsystems
//! touch the same GPU memory, and the exclusive-ownership invariant only
//! holds if compute finishes before render starts and render finishes
//! before the next acquire. The driver owns neither resource set; it sees
//! the two subsystems through the [`ComputeStage`] and [`RenderStage`]
//! traits, which is also the seam that lets tests assert the ordering with
//! mocks instead of real GPU timing.

use std::time::Instant;

use crate::error::CoreError;

/// Compute half of a tick, as the driver sees it.
pub trait ComputeStage {
    fn acquire_shared_buffers(&mut self) -> Result<(), CoreError>;
    fn step(&mut self, dt: f32) -> Result<(), CoreError>;
    fn release_shared_buffers(&mut self) -> Result<(), CoreError>;
}

/// Render half of a tick, as the driver sees it.
pub trait RenderStage {
    fn update_dynamic_uniforms(&mut self, dt: f32);
    fn draw(&mut self) -> Result<(), CoreError>;
}

/// Monotonic frame timing: per-tick dt plus a once-per-second FPS report.
///
/// Timing is observational only; nothing in the tick sequence depends on it
/// for correctness.
pub struct FrameClock {
    last_tick: Instant,
    fps_window: Instant,
    frames_in_window: u32,
    frame_count: u64,
}

impl FrameClock {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            last_tick: now,
            fps_window: now,
            frames_in_window: 0,
            frame_count: 0,
        }
    }

    /// Seconds since the previous tick.
    pub fn begin_tick(&mut self) -> f32 {
        let now = Instant::now();
        let dt = now.duration_since(self.last_tick).as_secs_f32();
        self.last_tick = now;
        dt
    }

    /// Count the finished frame and log FPS once per second.
    pub fn end_tick(&mut self) {
        self.frame_count += 1;
        self.frames_in_window += 1;
        if self.fps_window.elapsed().as_secs_f32() >= 1.0 {
            log::info!("FPS: {}", self.frames_in_window);
            self.frames_in_window = 0;
            self.fps_window = Instant::now();
        }
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Executes the tick sequence. Holds only the clock; the stages are borrowed
/// per tick from their owners.
pub struct FrameDriver {
    clock: FrameClock,
}

impl FrameDriver {
    pub fn new() -> Self {
        Self {
            clock: FrameClock::new(),
        }
    }

    /// One full frame cycle. Any failure aborts the tick and propagates;
    /// there is no mid-tick recovery.
    pub fn tick<C: ComputeStage, R: RenderStage>(
        &mut self,
        compute: &mut C,
        render: &mut R,
    ) -> Result<(), CoreError> {
        let dt = self.clock.begin_tick();

        compute.acquire_shared_buffers()?;
        compute.step(dt)?;
        compute.release_shared_buffers()?;

        render.update_dynamic_uniforms(dt);
        render.draw()?;

        self.clock.end_tick();
        Ok(())
    }

    pub fn frame_count(&self) -> u64 {
        self.clock.frame_count()
    }
}

impl Default for FrameDriver {
    fn default() -> Self {
        Self::new()
    }
}
