//! # Gravity Points: GPU particle field with shared compute/render buffers
//!
//! A large point-particle field whose motion is computed by GPU compute
//! kernels and displayed through a GPU graphics pipeline. Both stages touch
//! the *same* buffer memory; there is no host round-trip per frame.
//!
//! ## Architecture Overview
//!
//! ### 1. Compute Side ([`simulation`])
//!
//! - [`simulation::SharedParticleBuffers`] - the two vertex streams shared
//!   with the graphics pipeline (positions, attractor distances)
//! - [`simulation::OwnershipLedger`] - explicit per-buffer ownership tokens;
//!   exactly one of {graphics, compute} may touch a stream at any instant
//! - [`simulation::TaskCore`] / [`simulation::ComputeTask`] - a kernel
//!   packaged with its define table and build/dispatch lifecycle
//! - [`simulation::DefineTable`] - compile-time kernel specialization with
//!   round-trip-exact numeric formatting
//! - [`simulation::TaskPipeline`] - ordered task registry plus the
//!   acquire/step/release protocol around the shared streams
//!
//! ### 2. Render Side ([`rendering`])
//!
//! - [`rendering::GraphicsSurface`] - point-render pipeline, shared buffer
//!   allocation, projection/rotation/translation uniforms, blocking draw
//! - [`rendering::Spin`] - the optional automatic field rotation
//!
//! ### 3. Orchestration ([`driver`], [`app`])
//!
//! - [`driver::FrameDriver`] - the strict per-tick sequence
//!   acquire → compute → release → render, with frame timing
//! - [`app::App`] - winit shell, wgpu setup, cursor pass-through
//!
//! ## Frame Cycle
//!
//! ```text
//! acquire shared buffers -> pipeline step (blocks until queue drains)
//!   -> release shared buffers -> update rotation uniform
//!   -> draw points (blocks until frame completes)
//! ```
//!
//! Both blocking points are deliberate barriers upholding the
//! exclusive-buffer-access invariant, not incidental stalls. All kernel-level
//! parallelism happens inside a dispatch; the host side is a single logical
//! thread.
//!
//! ## Error Policy
//!
//! Shader/kernel compilation failures and buffer protocol violations are
//! unrecoverable ([`error::CoreError`]); they propagate to the entry point,
//! which logs the diagnostic and terminates.

pub mod app;
pub mod config;
pub mod driver;
pub mod error;
pub mod rendering;
pub mod simulation;
