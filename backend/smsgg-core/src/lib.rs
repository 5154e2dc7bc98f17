mod api;
mod audio;
mod bus;
mod input;
mod memory;
pub mod psg;
mod vdp;

pub use api::{SmsGgEmulator, SmsGgEmulatorConfig, SmsGgError, SmsGgResult, SmsRegion};
pub use input::{SmsGgInputs, SmsGgJoypadState};
pub use vdp::VdpVersion;
