//! Compute side of the frame cycle: shared buffers, kernel tasks, and the
//! ordered pipeline that executes them.

pub mod buffers;
pub mod define_table;
pub mod pipeline;
pub mod task;
pub mod tasks;

pub use buffers::{Owner, OwnershipLedger, SharedBufferId, SharedParticleBuffers};
pub use define_table::{DefineTable, DefineValue};
pub use pipeline::TaskPipeline;
pub use task::{ComputeTask, TaskBindings, TaskCore};
