//! Ordered task registry and the compute half of the frame cycle.
//!
//! The pipeline owns every registered task plus the compute-private
//! resources (velocity buffer, per-frame uniform) and enforces the buffer
//! hand-off protocol around the graphics surface's shared streams:
//!
//! ```text
//! acquire_shared_buffers -> step -> release_shared_buffers
//! ```
//!
//! `step` dispatches every task in registration order — order is significant
//! because later tasks may depend on buffer state written by earlier ones —
//! and then blocks until the device queue drains. That barrier is what makes
//! the following `release` safe: without it the graphics stage could read a
//! buffer whose writes are still in flight.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use crate::error::CoreError;
use crate::simulation::buffers::{
    velocities_byte_size, OwnershipLedger, SharedBufferId, SharedParticleBuffers,
};
use crate::simulation::task::{ComputeTask, TaskBindings};

/// Per-tick state consumed by the kernels (attractor position, timestep).
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct FrameParams {
    attractor: [f32; 4],
    dt: f32,
    _pad: [f32; 3],
}

/// Ordered collection of compute tasks plus the compute context's private
/// buffers and the shared-buffer ownership ledger.
pub struct TaskPipeline {
    tasks: Vec<Box<dyn ComputeTask>>,
    ledger: OwnershipLedger,
    velocities: wgpu::Buffer,
    frame_uniform: wgpu::Buffer,
    particle_count: u32,
    workgroup_size: u32,
}

impl TaskPipeline {
    pub fn new(device: &wgpu::Device, particle_count: u32, workgroup_size: u32) -> Self {
        let velocities = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Particle Velocities"),
            size: velocities_byte_size(particle_count),
            usage: wgpu::BufferUsages::STORAGE,
            mapped_at_creation: false,
        });

        let frame_uniform = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Frame Params"),
            size: std::mem::size_of::<FrameParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut ledger = OwnershipLedger::new();
        ledger.register(SharedBufferId::Positions);
        ledger.register(SharedBufferId::Distances);

        Self {
            tasks: Vec::new(),
            ledger,
            velocities,
            frame_uniform,
            particle_count,
            workgroup_size,
        }
    }

    /// Append a task; tasks execute in registration order.
    pub fn register_task(&mut self, task: Box<dyn ComputeTask>) {
        log::debug!("Registered compute task `{}`", task.label());
        self.tasks.push(task);
    }

    pub fn task_labels(&self) -> Vec<&str> {
        self.tasks.iter().map(|t| t.label()).collect()
    }

    /// Build every registered task against the shared buffers.
    pub fn build_tasks(
        &mut self,
        device: &wgpu::Device,
        shared: &SharedParticleBuffers,
    ) -> Result<(), CoreError> {
        let bindings = TaskBindings {
            positions: &shared.positions,
            distances: &shared.distances,
            velocities: &self.velocities,
            frame_uniform: &self.frame_uniform,
        };
        for task in &mut self.tasks {
            task.build(device, &bindings)?;
        }
        Ok(())
    }

    /// Build a task that is driven outside the per-frame list (e.g. the
    /// one-shot seeding task).
    pub fn build_task(
        &self,
        device: &wgpu::Device,
        shared: &SharedParticleBuffers,
        task: &mut dyn ComputeTask,
    ) -> Result<(), CoreError> {
        let bindings = TaskBindings {
            positions: &shared.positions,
            distances: &shared.distances,
            velocities: &self.velocities,
            frame_uniform: &self.frame_uniform,
        };
        task.build(device, &bindings)
    }

    /// Transfer access rights for both shared streams to compute.
    pub fn acquire_shared_buffers(&mut self) -> Result<(), CoreError> {
        for id in [SharedBufferId::Positions, SharedBufferId::Distances] {
            self.ledger.acquire(id)?;
        }
        Ok(())
    }

    /// Transfer access rights for both shared streams back to graphics.
    pub fn release_shared_buffers(&mut self) -> Result<(), CoreError> {
        for id in [SharedBufferId::Positions, SharedBufferId::Distances] {
            self.ledger.release(id)?;
        }
        Ok(())
    }

    pub fn ledger(&self) -> &OwnershipLedger {
        &self.ledger
    }

    fn ensure_held_by_compute(&self) -> Result<(), CoreError> {
        for id in [SharedBufferId::Positions, SharedBufferId::Distances] {
            if self.ledger.owner(id) != Some(crate::simulation::buffers::Owner::Compute) {
                return Err(CoreError::BufferAcquire {
                    buffer: id.name(),
                    reason: "step without a preceding acquire".into(),
                });
            }
        }
        Ok(())
    }

    /// Run every registered task in order, then drain the queue.
    pub fn step(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        attractor: Vec3,
        dt: f32,
    ) -> Result<(), CoreError> {
        self.ensure_held_by_compute()?;

        let params = FrameParams {
            attractor: [attractor.x, attractor.y, attractor.z, 1.0],
            dt,
            _pad: [0.0; 3],
        };
        queue.write_buffer(&self.frame_uniform, 0, bytemuck::bytes_of(&params));

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Simulation Step Encoder"),
        });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Simulation Step"),
                timestamp_writes: None,
            });
            for task in &self.tasks {
                task.dispatch(&mut pass, self.particle_count, self.workgroup_size)?;
            }
        }
        queue.submit(std::iter::once(encoder.finish()));

        // Barrier: release must not happen while writes are in flight
        let _ = device.poll(wgpu::Maintain::Wait);
        Ok(())
    }

    /// Dispatch a single externally owned task through the same protocol
    /// (ownership check, ordered pass, queue drain).
    pub fn run_task_once(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        task: &dyn ComputeTask,
    ) -> Result<(), CoreError> {
        self.ensure_held_by_compute()?;

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("One-Shot Task Encoder"),
        });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some(task.label()),
                timestamp_writes: None,
            });
            task.dispatch(&mut pass, self.particle_count, self.workgroup_size)?;
        }
        queue.submit(std::iter::once(encoder.finish()));
        let _ = device.poll(wgpu::Maintain::Wait);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::task::test_support::test_device;
    use crate::simulation::tasks::{ApplyVelocityTask, InitCubeTask};

    #[test]
    fn step_without_acquire_is_rejected() {
        let Some((device, queue)) = test_device() else {
            eprintln!("no GPU adapter available, skipping");
            return;
        };

        let mut pipeline = TaskPipeline::new(&device, 1024, 64);
        let err = pipeline
            .step(&device, &queue, Vec3::ZERO, 0.016)
            .unwrap_err();
        assert!(matches!(err, CoreError::BufferAcquire { .. }));
    }

    #[test]
    fn tasks_execute_in_registration_order() {
        let Some((device, _queue)) = test_device() else {
            eprintln!("no GPU adapter available, skipping");
            return;
        };

        let mut pipeline = TaskPipeline::new(&device, 1024, 64);
        pipeline.register_task(Box::new(InitCubeTask::new()));
        pipeline.register_task(Box::new(ApplyVelocityTask::new()));
        assert_eq!(pipeline.task_labels(), vec!["init_cube", "apply_vel"]);
    }

    #[test]
    fn seed_and_step_end_to_end() {
        let Some((device, queue)) = test_device() else {
            eprintln!("no GPU adapter available, skipping");
            return;
        };

        let n = 4096u32;
        let workgroup = 64u32;
        let shared = SharedParticleBuffers::new(&device, n).unwrap();
        let mut pipeline = TaskPipeline::new(&device, n, workgroup);

        let mut seed = InitCubeTask::new();
        seed.configure(n, 250.0, workgroup).unwrap();
        pipeline.build_task(&device, &shared, &mut seed).unwrap();

        let mut gravity = ApplyVelocityTask::new();
        gravity.set_particle_count(n).unwrap();
        gravity.set_workgroup_size(workgroup).unwrap();
        gravity.set_gravity(1000.0, 1.0, 6.674e-11).unwrap();
        pipeline.register_task(Box::new(gravity));
        pipeline.build_tasks(&device, &shared).unwrap();

        pipeline.acquire_shared_buffers().unwrap();
        pipeline.run_task_once(&device, &queue, &seed).unwrap();
        pipeline
            .step(&device, &queue, Vec3::new(10.0, 0.0, 0.0), 0.016)
            .unwrap();
        pipeline.release_shared_buffers().unwrap();

        // Second acquire after a clean release must succeed
        pipeline.acquire_shared_buffers().unwrap();
        pipeline.release_shared_buffers().unwrap();
    }
}
