//! Simulation configuration loaded from a RON file next to the executable.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tunable parameters for the particle field.
///
/// All values have working defaults; `gravity_points.ron` in the working
/// directory overrides them when present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    /// Initial window width in pixels
    pub width: u32,

    /// Initial window height in pixels
    pub height: u32,

    /// Number of particles (fixed for the run)
    pub particle_count: u32,

    /// Half-extent of the simulation cube; also sets the camera pull-back
    pub border_size: f32,

    /// Mass of the attractor point (kg)
    pub mass_point: f64,

    /// Mass of a single particle (kg)
    pub mass_particles: f64,

    /// Gravitational proportionality constant
    pub gravitational_constant: f64,

    /// Whether the field slowly rotates around the vertical axis
    pub auto_rotate: bool,

    /// Rotation speed in radians per second (used when `auto_rotate` is on)
    pub rotation_speed: f32,

    /// Compute workgroup size baked into every kernel
    pub workgroup_size: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            particle_count: 100_000,
            border_size: 500.0,
            mass_point: 1000.0,
            mass_particles: 1.0,
            gravitational_constant: 6.674e-11,
            auto_rotate: false,
            rotation_speed: 0.3,
            workgroup_size: 64,
        }
    }
}

impl SimConfig {
    /// Load from `gravity_points.ron`, falling back to defaults when the file
    /// is absent or unreadable. A malformed file is reported but not fatal.
    pub fn load_or_default() -> Self {
        let path = Path::new("gravity_points.ron");
        match std::fs::read_to_string(path) {
            Ok(contents) => match ron::from_str(&contents) {
                Ok(config) => {
                    log::info!("Loaded config from {:?}", path);
                    config
                }
                Err(e) => {
                    log::warn!("Failed to parse {:?}: {} (using defaults)", path, e);
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = SimConfig::default();
        assert!(config.particle_count > 0);
        assert!(config.workgroup_size > 0);
        assert!(config.border_size > 0.0);
    }

    #[test]
    fn round_trips_through_ron() {
        let config = SimConfig::default();
        let text = ron::ser::to_string_pretty(&config, ron::ser::PrettyConfig::default()).unwrap();
        let back: SimConfig = ron::from_str(&text).unwrap();
        assert_eq!(back.particle_count, config.particle_count);
        assert_eq!(back.mass_point, config.mass_point);
    }
}
