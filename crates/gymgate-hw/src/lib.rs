//! gymgate-hw — Hardware abstraction for V4L2 camera capture.

pub mod camera;
pub mod frame;

pub use camera::{Camera, CameraError, DeviceInfo, PixelFormat};
pub use frame::Frame;
