//! Fatal error taxonomy for the compute/render core.
//!
//! Every variant is unrecoverable at the point of occurrence: a broken shader
//! or kernel has no degraded mode in a real-time renderer, and a buffer
//! ownership violation means the tick sequence itself is wrong. Errors
//! propagate with `?` up to the application entry point, which logs the
//! diagnostic and terminates.

use std::path::PathBuf;

/// Errors raised by the compute/render interop core.
///
/// Variants that wrap a device compiler carry the full diagnostic log so the
/// failure is actionable from the terminal.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// The graphics program failed to compile or link.
    #[error("shader compilation failed ({stage}): {log}")]
    ShaderCompilation { stage: &'static str, log: String },

    /// A vertex attribute name has no known shader location.
    #[error("vertex attribute `{name}` not found ({stage})")]
    AttributeBinding { name: String, stage: &'static str },

    /// A compute kernel failed to compile into a pipeline.
    #[error("kernel `{kernel}` failed to build: {log}")]
    KernelBuild { kernel: String, log: String },

    /// A shared buffer could not be handed to the compute context.
    #[error("cannot acquire buffer `{buffer}` for compute: {reason}")]
    BufferAcquire { buffer: &'static str, reason: String },

    /// A shared buffer could not be handed back to the graphics context.
    #[error("cannot release buffer `{buffer}` to graphics: {reason}")]
    BufferRelease { buffer: &'static str, reason: String },

    /// A task operation was invoked in the wrong lifecycle state
    /// (e.g. dispatch before build, configuration after build).
    #[error("task `{task}`: {reason}")]
    TaskState { task: String, reason: String },

    /// Kernel source could not be read from disk.
    #[error("failed to read kernel source `{path}`: {source}")]
    KernelSourceIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid startup configuration (e.g. zero particles).
    #[error("invalid configuration: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kernel_build_error_carries_log() {
        let err = CoreError::KernelBuild {
            kernel: "apply_vel".into(),
            log: "expected ';'".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("apply_vel"));
        assert!(msg.contains("expected ';'"));
    }
}
