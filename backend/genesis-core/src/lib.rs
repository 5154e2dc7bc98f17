mod api;
mod audio;
mod input;
mod memory;
mod vdp;
mod ym2612;

pub use api::{
    GenesisAspectRatio, GenesisEmulator, GenesisEmulatorConfig, GenesisError, GenesisResult,
};
pub use input::{GenesisControllerType, GenesisInputs, GenesisJoypadState};
