//! Shared particle buffers and the ownership ledger.
//!
//! The two vertex streams (positions, distances) are the only resources that
//! cross the compute/render boundary. Both subsystems reference the *same*
//! GPU memory; lawful access is exclusive-but-transferable, modeled here as
//! an explicit per-buffer ownership token held by exactly one of
//! {graphics, compute} at any instant. The ledger makes the hand-off a
//! first-class, testable operation instead of an implicit assumption.
//!
//! ## Buffer Layout
//! - `positions`: vec4<f32> per particle (x, y, z, w) — 16 bytes
//! - `distances`: f32 per particle (distance to the attractor, drives color)
//!
//! Both are allocated once at startup with `VERTEX | STORAGE` usage so the
//! render pipeline can scan them as vertex streams and the compute kernels
//! can mutate them in place, with no host round-trip.

use std::collections::HashMap;

use crate::error::CoreError;

/// Bytes per particle in the position stream (vec4<f32>).
pub const POSITION_STRIDE: u64 = 16;
/// Bytes per particle in the distance stream (f32).
pub const DISTANCE_STRIDE: u64 = 4;
/// Bytes per particle in the compute-private velocity buffer (vec4<f32>).
pub const VELOCITY_STRIDE: u64 = 16;

/// Identity of a shared buffer in the ownership ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SharedBufferId {
    Positions,
    Distances,
}

impl SharedBufferId {
    pub fn name(self) -> &'static str {
        match self {
            SharedBufferId::Positions => "positions",
            SharedBufferId::Distances => "distances",
        }
    }
}

/// Which execution context currently holds a buffer's access token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Owner {
    Graphics,
    Compute,
}

/// Host-side tracking of buffer ownership tokens.
///
/// Buffers start owned by graphics (they are allocated by the graphics
/// surface). `acquire` transfers a token to compute, `release` hands it
/// back; violations of the single-owner protocol are hard errors because
/// they mean the tick sequence itself is broken.
#[derive(Debug, Default)]
pub struct OwnershipLedger {
    owners: HashMap<SharedBufferId, Owner>,
}

impl OwnershipLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a buffer with the compute context. Registered buffers start
    /// owned by graphics.
    pub fn register(&mut self, id: SharedBufferId) {
        self.owners.insert(id, Owner::Graphics);
    }

    pub fn owner(&self, id: SharedBufferId) -> Option<Owner> {
        self.owners.get(&id).copied()
    }

    /// Transfer the token from graphics to compute.
    pub fn acquire(&mut self, id: SharedBufferId) -> Result<(), CoreError> {
        match self.owners.get_mut(&id) {
            None => Err(CoreError::BufferAcquire {
                buffer: id.name(),
                reason: "not registered with the compute context".into(),
            }),
            Some(owner @ Owner::Graphics) => {
                *owner = Owner::Compute;
                Ok(())
            }
            Some(Owner::Compute) => Err(CoreError::BufferAcquire {
                buffer: id.name(),
                reason: "already held by compute".into(),
            }),
        }
    }

    /// Transfer the token from compute back to graphics.
    pub fn release(&mut self, id: SharedBufferId) -> Result<(), CoreError> {
        match self.owners.get_mut(&id) {
            None => Err(CoreError::BufferRelease {
                buffer: id.name(),
                reason: "not registered with the compute context".into(),
            }),
            Some(owner @ Owner::Compute) => {
                *owner = Owner::Graphics;
                Ok(())
            }
            Some(Owner::Graphics) => Err(CoreError::BufferRelease {
                buffer: id.name(),
                reason: "not currently held by compute".into(),
            }),
        }
    }
}

/// Exact allocation size of the position stream for `n` particles.
pub fn positions_byte_size(n: u32) -> u64 {
    n as u64 * POSITION_STRIDE
}

/// Exact allocation size of the distance stream for `n` particles.
pub fn distances_byte_size(n: u32) -> u64 {
    n as u64 * DISTANCE_STRIDE
}

/// Exact allocation size of the velocity buffer for `n` particles.
pub fn velocities_byte_size(n: u32) -> u64 {
    n as u64 * VELOCITY_STRIDE
}

/// The two GPU buffers shared between the graphics and compute pipelines.
pub struct SharedParticleBuffers {
    pub positions: wgpu::Buffer,
    pub distances: wgpu::Buffer,
    particle_count: u32,
}

impl SharedParticleBuffers {
    /// Allocate both streams sized exactly for `particle_count` records.
    pub fn new(device: &wgpu::Device, particle_count: u32) -> Result<Self, CoreError> {
        if particle_count == 0 {
            return Err(CoreError::Config("particle count must be > 0".into()));
        }

        let positions = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Particle Positions"),
            size: positions_byte_size(particle_count),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::STORAGE,
            mapped_at_creation: false,
        });

        let distances = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Particle Distances"),
            size: distances_byte_size(particle_count),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::STORAGE,
            mapped_at_creation: false,
        });

        Ok(Self {
            positions,
            distances,
            particle_count,
        })
    }

    pub fn particle_count(&self) -> u32 {
        self.particle_count
    }
}
