//! Gravity integration task.
//!
//! One kernel invocation per particle: accelerate toward the attractor point
//! under Newtonian gravity, integrate velocity into position, and record the
//! distance to the attractor for the color ramp.
//!
//! The force numerator `MASS_POINT * MASS_PARTICLES * G_CONST` is precomputed
//! on the host and baked in as the `DIVIDEND` define so the kernel never
//! re-multiplies three constants per invocation per frame.

use crate::error::CoreError;
use crate::simulation::task::{ComputeTask, TaskBindings, TaskCore};

/// Default on-disk location of the kernel source.
pub const KERNEL_PATH: &str = "kernels/apply_vel.wgsl";

pub struct ApplyVelocityTask {
    core: TaskCore,
    bind_group: Option<wgpu::BindGroup>,
}

impl ApplyVelocityTask {
    pub fn new() -> Self {
        Self::with_source(KERNEL_PATH)
    }

    pub fn with_source(source_path: &str) -> Self {
        Self {
            core: TaskCore::new("apply_vel", source_path, "apply_vel"),
            bind_group: None,
        }
    }

    /// Bake the particle count into the kernel.
    pub fn set_particle_count(&mut self, count: u32) -> Result<(), CoreError> {
        self.core.defines_mut()?.set_u32("NB_PARTICLES", count);
        Ok(())
    }

    /// Bake the workgroup size into the kernel's `@workgroup_size`.
    pub fn set_workgroup_size(&mut self, size: u32) -> Result<(), CoreError> {
        self.core.defines_mut()?.set_u32("WORKGROUP_SIZE", size);
        Ok(())
    }

    /// Derive the gravity defines from physical inputs.
    ///
    /// Masses and the proportionality constant arrive as f64 but the device
    /// computes in f32, so the precomputed dividend is narrowed on the host
    /// and formatted with full round-trip precision.
    pub fn set_gravity(
        &mut self,
        mass_point: f64,
        mass_particles: f64,
        g_const: f64,
    ) -> Result<(), CoreError> {
        let defines = self.core.defines_mut()?;
        defines.set_f32("MASS_POINT", mass_point as f32);
        defines.set_f32("MASS_PARTICLES", mass_particles as f32);
        defines.set_f32("G_CONST", g_const as f32);
        defines.set_f32("DIVIDEND", (mass_point * mass_particles * g_const) as f32);
        Ok(())
    }

    pub fn core(&self) -> &TaskCore {
        &self.core
    }
}

impl Default for ApplyVelocityTask {
    fn default() -> Self {
        Self::new()
    }
}

impl ComputeTask for ApplyVelocityTask {
    fn label(&self) -> &str {
        self.core.label()
    }

    fn build(
        &mut self,
        device: &wgpu::Device,
        bindings: &TaskBindings<'_>,
    ) -> Result<(), CoreError> {
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Apply Velocity Bind Group Layout"),
            entries: &[
                // Frame params (attractor position, dt)
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                // Positions (shared with graphics)
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: false },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                // Velocities (compute-private)
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: false },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                // Distances (shared with graphics)
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: false },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        self.core.build(device, &[&layout])?;

        self.bind_group = Some(device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Apply Velocity Bind Group"),
            layout: &layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: bindings.frame_uniform.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: bindings.positions.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: bindings.velocities.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
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
    use crate::simulation::task::test_support::test_device;

    #[test]
    fn gravity_defines_are_derived_from_physical_inputs() {
        let mut task = ApplyVelocityTask::new();
        task.set_gravity(1000.0, 1.0, 6.674e-11).unwrap();

        let defines = task.core().defines();
        assert!(defines.value_str("MASS_POINT").is_some());
        assert!(defines.value_str("MASS_PARTICLES").is_some());
        assert!(defines.value_str("G_CONST").is_some());

        // dividend = massPoint * massParticles * G, narrowed to f32
        let dividend = defines.value_str("DIVIDEND").unwrap();
        assert_eq!(dividend.parse::<f32>().unwrap(), 6.674e-8f32);
    }

    #[test]
    fn particle_count_define_is_exact() {
        let mut task = ApplyVelocityTask::new();
        task.set_particle_count(100_000).unwrap();
        assert_eq!(
            task.core().defines().value_str("NB_PARTICLES").unwrap(),
            "100000"
        );
    }

    #[test]
    fn dispatch_before_build_is_rejected() {
        let Some((device, _queue)) = test_device() else {
            eprintln!("no GPU adapter available, skipping");
            return;
        };

        let task = ApplyVelocityTask::new();
        let mut encoder =
            device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: None,
            timestamp_writes: None,
        });
        let err = task.dispatch(&mut pass, 1024, 64).unwrap_err();
        assert!(matches!(err, CoreError::TaskState { .. }));
    }
}
