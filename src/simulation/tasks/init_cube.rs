//! One-shot particle seeding task.
//!
//! Fills the position stream with a deterministic cube lattice centered on
//! the origin and zeroes velocities and distances. Runs once at startup
//! through the same acquire/step/release protocol as the per-frame tasks.

use crate::error::CoreError;
use crate::simulation::task::{ComputeTask, TaskBindings, TaskCore};

pub const KERNEL_PATH: &str = "kernels/init_cube.wgsl";

pub struct InitCubeTask {
    core: TaskCore,
    bind_group: Option<wgpu::BindGroup>,
}

impl InitCubeTask {
    pub fn new() -> Self {
        Self::with_source(KERNEL_PATH)
    }

    pub fn with_source(source_path: &str) -> Self {
        Self {
            core: TaskCore::new("init_cube", source_path, "init_cube"),
            bind_group: None,
        }
    }

    /// Derive the lattice defines: side length (smallest cube holding
    /// `count` particles), spacing, and centering offset.
    pub fn configure(
        &mut self,
        count: u32,
        half_extent: f32,
        workgroup_size: u32,
    ) -> Result<(), CoreError> {
        if count == 0 {
            return Err(CoreError::Config("particle count must be > 0".into()));
        }
        let side = ((count as f64).cbrt().ceil() as u32).max(1);
        let spacing = (2.0 * half_extent) / side as f32;
        let defines = self.core.defines_mut()?;
        defines.set_u32("NB_PARTICLES", count);
        defines.set_u32("CUBE_SIDE", side);
        defines.set_f32("SPACING", spacing);
        defines.set_f32("HALF_EXTENT", half_extent);
        defines.set_u32("WORKGROUP_SIZE", workgroup_size);
        Ok(())
    }

    pub fn core(&self) -> &TaskCore {
        &self.core
    }
}

impl Default for InitCubeTask {
    fn default() -> Self {
        Self::new()
    }
}

impl ComputeTask for InitCubeTask {
    fn label(&self) -> &str {
        self.core.label()
    }

    fn build(
        &mut self,
        device: &wgpu::Device,
        bindings: &TaskBindings<'_>,
    ) -> Result<(), CoreError> {
        let storage_entry = |binding: u32| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only: false },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Init Cube Bind Group Layout"),
            entries: &[storage_entry(0), storage_entry(1), storage_entry(2)],
        });

        self.core.build(device, &[&layout])?;

        self.bind_group = Some(device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Init Cube Bind Group"),
            layout: &layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: bindings.positions.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: bindings.velocities.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: bindings.distances.as_entire_binding(),
                },
            ],
        }));

        Ok(())
    }

    fn dispatch(
        &self,
        pass: &mut wgpu::ComputePass<'_>,
        global_size: u32,
        local_size: u32,
    ) -> Result<(), CoreError> {
        self.core
            .bind_and_dispatch(pass, self.bind_group.as_ref(), global_size, local_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lattice_side_covers_all_particles() {
        let mut task = InitCubeTask::new();
        task.configure(100_000, 250.0, 64).unwrap();
        let side: u32 = task
            .core()
            .defines()
            .value_str("CUBE_SIDE")
            .unwrap()
            .parse()
            .unwrap();
        assert!(side * side * side >= 100_000);
        assert!((side - 1).pow(3) < 100_000);
    }

    #[test]
    fn zero_particles_is_a_config_error() {
        let mut task = InitCubeTask::new();
        let err = task.configure(0, 250.0, 64).unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
        // Nothing was committed to the define table
        assert!(task.core().defines().is_empty());
    }

    #[test]
    fn spacing_spans_the_cube() {
        let mut task = InitCubeTask::new();
        task.configure(1000, 100.0, 64).unwrap();
        let side: f32 = task
            .core()
            .defines()
            .value_str("CUBE_SIDE")
            .unwrap()
            .parse()
            .unwrap();
        let spacing: f32 = task
            .core()
            .defines()
            .value_str("SPACING")
            .unwrap()
            .parse()
            .unwrap();
        assert!((spacing * side - 200.0).abs() < 1e-3);
    }
}
