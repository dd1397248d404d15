//! Compute task abstraction.
//!
//! A task packages one compute kernel: its source path and entry point, the
//! define table that specializes the source, the compiled pipeline, and a
//! dispatch operation. Concrete tasks (see [`super::tasks`]) derive their
//! defines from physically meaningful inputs and bind the shared buffers in
//! a fixed, task-defined order.
//!
//! ## Lifecycle
//!
//! ```text
//! Configured --build()--> Built/Dispatchable
//! ```
//!
//! `build` runs exactly once per task instance; configuration after build and
//! dispatch before build are rejected with [`CoreError::TaskState`] — fail
//! fast, not retried, because both indicate a broken setup sequence rather
//! than a transient fault.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::CoreError;
use crate::simulation::define_table::DefineTable;

/// Shared buffer handles a task may bind as kernel arguments.
///
/// Positions and distances are the graphics-shared streams; velocities are
/// compute-private; the frame uniform carries per-tick state (attractor
/// position, dt).
pub struct TaskBindings<'a> {
    pub positions: &'a wgpu::Buffer,
    pub distances: &'a wgpu::Buffer,
    pub velocities: &'a wgpu::Buffer,
    pub frame_uniform: &'a wgpu::Buffer,
}

/// One unit of GPU compute work, executed in registration order by the
/// task pipeline.
pub trait ComputeTask {
    fn label(&self) -> &str;

    /// Compile the kernel and create its bind group. Exactly once per task.
    fn build(&mut self, device: &wgpu::Device, bindings: &TaskBindings<'_>)
        -> Result<(), CoreError>;

    /// Enqueue the kernel for `global_size` invocations in groups of
    /// `local_size`. Non-blocking; completion is observed by the caller via
    /// queue synchronization.
    fn dispatch(
        &self,
        pass: &mut wgpu::ComputePass<'_>,
        global_size: u32,
        local_size: u32,
    ) -> Result<(), CoreError>;
}

/// State and plumbing common to every concrete task.
pub struct TaskCore {
    label: String,
    source_path: PathBuf,
    entry_point: String,
    defines: DefineTable,
    pipeline: Option<wgpu::ComputePipeline>,
}

impl TaskCore {
    pub fn new(label: &str, source_path: impl Into<PathBuf>, entry_point: &str) -> Self {
        Self {
            label: label.to_string(),
            source_path: source_path.into(),
            entry_point: entry_point.to_string(),
            defines: DefineTable::new(),
            pipeline: None,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn defines(&self) -> &DefineTable {
        &self.defines
    }

    /// Mutable access to the define table. Rejected once the kernel is built,
    /// since the defines are baked into the compiled source.
    pub fn defines_mut(&mut self) -> Result<&mut DefineTable, CoreError> {
        if self.pipeline.is_some() {
            return Err(CoreError::TaskState {
                task: self.label.clone(),
                reason: "cannot change defines after build".into(),
            });
        }
        Ok(&mut self.defines)
    }

    pub fn is_built(&self) -> bool {
        self.pipeline.is_some()
    }

    /// Read the kernel source and prepend the define header.
    pub fn preprocess(&self) -> Result<String, CoreError> {
        let source =
            fs::read_to_string(&self.source_path).map_err(|e| CoreError::KernelSourceIo {
                path: self.source_path.clone(),
                source: e,
            })?;
        let mut full = self.defines.to_wgsl_header();
        full.push('\n');
        full.push_str(&source);
        Ok(full)
    }

    /// Compile the specialized source into a compute pipeline.
    ///
    /// Compilation runs inside a validation error scope so the device
    /// compiler log surfaces as [`CoreError::KernelBuild`] instead of an
    /// uncaptured-error panic.
    pub fn build(
        &mut self,
        device: &wgpu::Device,
        bind_group_layouts: &[&wgpu::BindGroupLayout],
    ) -> Result<(), CoreError> {
        if self.pipeline.is_some() {
            return Err(CoreError::TaskState {
                task: self.label.clone(),
                reason: "already built".into(),
            });
        }

        let source = self.preprocess()?;

        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&format!("{} Kernel", self.label)),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("{} Pipeline Layout", self.label)),
            bind_group_layouts,
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some(&format!("{} Pipeline", self.label)),
            layout: Some(&layout),
            module: &module,
            entry_point: Some(&self.entry_point),
            compilation_options: Default::default(),
            cache: None,
        });

        let _ = device.poll(wgpu::Maintain::Wait);
        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            return Err(CoreError::KernelBuild {
                kernel: self.label.clone(),
                log: error.to_string(),
            });
        }

        self.pipeline = Some(pipeline);
        Ok(())
    }

    /// The compiled pipeline; an error before `build` succeeds.
    pub fn pipeline(&self) -> Result<&wgpu::ComputePipeline, CoreError> {
        self.pipeline.as_ref().ok_or_else(|| CoreError::TaskState {
            task: self.label.clone(),
            reason: "dispatch before build".into(),
        })
    }

    /// Bind and enqueue; shared by the concrete tasks' `dispatch` impls.
    pub fn bind_and_dispatch(
        &self,
        pass: &mut wgpu::ComputePass<'_>,
        bind_group: Option<&wgpu::BindGroup>,
        global_size: u32,
        local_size: u32,
    ) -> Result<(), CoreError> {
        let pipeline = self.pipeline()?;
        let bind_group = bind_group.ok_or_else(|| CoreError::TaskState {
            task: self.label.clone(),
            reason: "dispatch before build".into(),
        })?;
        if local_size == 0 {
            return Err(CoreError::TaskState {
                task: self.label.clone(),
                reason: "local work size must be > 0".into(),
            });
        }
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, bind_group, &[]);
        pass.dispatch_workgroups(global_size.div_ceil(local_size), 1, 1);
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    /// Headless device for GPU-touching tests; `None` means no adapter is
    /// available and the test should skip.
    pub fn test_device() -> Option<(wgpu::Device, wgpu::Queue)> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::LowPower,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))?;
        pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults(),
                memory_hints: Default::default(),
            },
            None,
        ))
        .ok()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::test_device;
    use super::*;
    use crate::simulation::define_table::DefineValue;

    fn write_temp_kernel(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn pipeline_access_before_build_is_rejected() {
        let core = TaskCore::new("test", "kernels/apply_vel.wgsl", "apply_vel");
        let err = core.pipeline().unwrap_err();
        assert!(matches!(err, CoreError::TaskState { .. }));
    }

    #[test]
    fn preprocess_prepends_define_header() {
        let path = write_temp_kernel(
            "gravity_points_preprocess.wgsl",
            "fn noop() -> f32 { return G_CONST; }\n",
        );
        let mut core = TaskCore::new("test", &path, "main");
        core.defines_mut()
            .unwrap()
            .set("G_CONST", DefineValue::F32(6.674e-11));
        let source = core.preprocess().unwrap();
        assert!(source.starts_with("const G_CONST: f32 = "));
        assert!(source.contains("fn noop()"));
    }

    #[test]
    fn missing_kernel_source_is_an_io_error() {
        let core = TaskCore::new("test", "/nonexistent/kernel.wgsl", "main");
        let err = core.preprocess().unwrap_err();
        assert!(matches!(err, CoreError::KernelSourceIo { .. }));
    }

    #[test]
    fn broken_kernel_source_fails_build_with_diagnostic() {
        let Some((device, _queue)) = test_device() else {
            eprintln!("no GPU adapter available, skipping");
            return;
        };

        let path = write_temp_kernel(
            "gravity_points_broken.wgsl",
            "@compute @workgroup_size(64) fn main( { this is not wgsl",
        );
        let mut core = TaskCore::new("broken", &path, "main");
        let err = core.build(&device, &[]).unwrap_err();
        match err {
            CoreError::KernelBuild { log, .. } => assert!(!log.is_empty()),
            other => panic!("expected KernelBuild, got {:?}", other),
        }
        // A failed build leaves the task non-dispatchable
        assert!(!core.is_built());
        assert!(core.pipeline().is_err());
    }

    #[test]
    fn build_is_idempotent_once() {
        let Some((device, _queue)) = test_device() else {
            eprintln!("no GPU adapter available, skipping");
            return;
        };

        let path = write_temp_kernel(
            "gravity_points_valid.wgsl",
            "@compute @workgroup_size(64) fn main() { }\n",
        );
        let mut core = TaskCore::new("valid", &path, "main");
        core.build(&device, &[]).unwrap();
        assert!(core.is_built());

        let err = core.build(&device, &[]).unwrap_err();
        assert!(matches!(err, CoreError::TaskState { .. }));

        // Defines are baked into the compiled source by now
        let err = core.defines_mut().unwrap_err();
        assert!(matches!(err, CoreError::TaskState { .. }));
    }
}
