//! Typed NVML surface
//!
//! Every call goes through the runtime resolver: entry points are looked
//! up by name when invoked, so a driver missing an export only fails the
//! calls that need it.

pub mod device;
pub mod event;
pub mod return_code;
pub mod sampling;
pub mod session;
pub mod sys;

pub use device::Device;
pub use event::EventSet;
pub use return_code::ReturnCode;
pub use session::Nvml;
