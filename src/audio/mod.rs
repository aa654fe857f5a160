//! Audio capture subsystem

pub mod capture;
pub mod device;
pub mod handoff;
pub mod level;

pub use capture::{CaptureHandle, CaptureWorker};
pub use device::list_input_devices;
pub use handoff::HandoffBuffer;
pub use level::MicLevel;
