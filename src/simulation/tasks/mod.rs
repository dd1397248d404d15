//! Concrete compute tasks.

pub mod apply_velocity;
pub mod init_cube;

pub use apply_velocity::ApplyVelocityTask;
pub use init_cube::InitCubeTask;
