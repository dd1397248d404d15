//! Render side of the frame cycle.

pub mod spin;
pub mod surface;

pub use spin::Spin;
pub use surface::GraphicsSurface;
