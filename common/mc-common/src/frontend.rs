//! Trait contracts at the host/core boundary (§6 external interfaces): the
//! core produces frames and samples and asks a host-supplied object to
//! render/play/persist them, but never touches a window handle, an audio
//! device, or a filesystem path itself.

use bincode::{Decode, Encode};
use mc_macros::{EnumAll, EnumDisplay, EnumFromStr};
use std::fmt::{Debug, Display};

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable, Encode, Decode)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Self = Self::rgb(0, 0, 0);

    #[must_use]
    #[inline]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }
}

impl Default for Color {
    #[inline]
    fn default() -> Self {
        Self::BLACK
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

/// Number of tiles per row a debug pattern-table viewer lays 8x8 tiles out in.
pub const VRAM_DEBUG_ROW_LEN: u32 = 64;

#[derive(Debug, Clone, Copy, PartialEq, Encode, Decode)]
pub struct PixelAspectRatio(f64);

impl PixelAspectRatio {
    pub const SQUARE: Self = Self(1.0);
}

impl From<PixelAspectRatio> for f64 {
    #[inline]
    fn from(value: PixelAspectRatio) -> Self {
        value.0
    }
}

impl TryFrom<f64> for PixelAspectRatio {
    type Error = String;

    #[inline]
    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if value.is_finite() && value > 0.0 {
            Ok(Self(value))
        } else {
            Err(format!("invalid pixel aspect ratio: {value}"))
        }
    }
}

pub trait Renderer {
    type Err;

    /// Render a frame.
    ///
    /// The frame buffer may be larger than the specified frame size, but the len must be at least
    /// (`frame_width` * `frame_height`). Colors past the first (`frame_width` * `frame_height`)
    /// will be ignored.
    ///
    /// If pixel aspect ratio is None, the frame will be stretched to fill the window. If it is
    /// Some, the frame will be rendered in the largest possible area that maintains the specified
    /// pixel aspect ratio.
    ///
    /// # Errors
    ///
    /// This method will return an error if it is unable to render the frame.
    fn render_frame(
        &mut self,
        frame_buffer: &[Color],
        frame_size: FrameSize,
        pixel_aspect_ratio: Option<PixelAspectRatio>,
    ) -> Result<(), Self::Err>;
}

pub trait AudioOutput {
    type Err;

    /// Push a stereo audio sample.
    ///
    /// # Errors
    ///
    /// This method will return an error if it is unable to push the sample to the audio device.
    fn push_sample(&mut self, sample_l: f64, sample_r: f64) -> Result<(), Self::Err>;
}

pub trait SaveWriter {
    type Err;

    /// Persist cartridge/disc save RAM.
    ///
    /// # Errors
    ///
    /// This method will return an error if it is unable to persist the given save bytes.
    fn persist_save(&mut self, save_bytes: &[u8]) -> Result<(), Self::Err>;
}

pub trait TakeRomFrom {
    fn take_rom_from(&mut self, other: &mut Self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickEffect {
    None,
    FrameRendered,
}

#[allow(clippy::type_complexity)]
pub trait TickableEmulator {
    type Inputs;
    type Err<RErr: Debug + Display + Send + Sync + 'static, AErr: Debug + Display + Send + Sync + 'static, SErr: Debug + Display + Send + Sync + 'static>;

    /// Tick the emulator for a small amount of time, e.g. a single CPU instruction.
    ///
    /// # Errors
    ///
    /// This method should propagate any errors encountered while rendering frames, pushing audio
    /// samples, or persisting save files.
    fn tick<R, A, S>(
        &mut self,
        renderer: &mut R,
        audio_output: &mut A,
        inputs: &Self::Inputs,
        save_writer: &mut S,
    ) -> Result<TickEffect, Self::Err<R::Err, A::Err, S::Err>>
    where
        R: Renderer,
        A: AudioOutput,
        S: SaveWriter,
        R::Err: Debug + Display + Send + Sync + 'static,
        A::Err: Debug + Display + Send + Sync + 'static,
        S::Err: Debug + Display + Send + Sync + 'static;
}

pub trait Resettable {
    fn soft_reset(&mut self);

    fn hard_reset(&mut self);
}

/// Combines the trait bounds every system type (Genesis, Sega CD, SMS, Game Gear) satisfies.
pub trait EmulatorTrait<Inputs>:
    TickableEmulator<Inputs = Inputs> + Encode + Decode<()> + TakeRomFrom + Resettable
{
}

pub trait ConfigReload {
    type Config;

    fn reload_config(&mut self, config: &Self::Config);
}

/// Clones emulator state while resetting non-portable fields (ROM images) to empty instead of
/// deep copying them, for swapping the active context (e.g. game vs. BIOS menu on Sega CD)
/// without re-parsing the ROM/disc image that's staying loaded.
pub trait LightClone {
    type Clone;

    fn light_clone(&self) -> Self::Clone;

    fn reconstruct_from(&mut self, clone: Self::Clone);
}

pub trait EmulatorDebug {
    const NUM_PALETTES: u32;
    const PALETTE_LEN: u32;
    const PATTERN_TABLE_LEN: u32;

    fn debug_cram(&self, out: &mut [Color]);

    fn debug_vram(&self, out: &mut [Color], palette: u8);
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Encode, Decode, EnumDisplay, EnumFromStr, EnumAll,
)]
#[cfg_attr(feature = "clap", derive(mc_macros::CustomValueEnum))]
pub enum TimingMode {
    #[default]
    Ntsc,
    Pal,
}

pub trait MappableInputs<Button> {
    fn set_field(&mut self, button: Button, player: crate::input::Player, pressed: bool);
}

pub trait EmulatorConfigTrait: Clone {}

pub trait PartialClone {
    #[must_use]
    fn partial_clone(&self) -> Self;
}

pub use mc_macros::PartialClone;
