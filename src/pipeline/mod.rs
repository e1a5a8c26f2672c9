pub mod camera;
pub mod compositor;
pub mod landmarks;
pub mod rgba_converter;
pub mod session;
pub mod skeleton;

// Re-exports for convenience
#[cfg(feature = "camera-nokhwa")]
pub use camera::available_cameras;
pub use session::{ChannelDisplay, SessionError, spawn_session};
