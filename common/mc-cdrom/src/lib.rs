//! CUE/BIN CD-ROM image support: disc-time addressing, track-list parsing,
//! and raw sector reads (including EDC validation) for Sega CD images.
//!
//! The actual end-user media loading pipeline (drag-and-drop, ZIP archive
//! traversal) lives outside this crate; this crate is the collaborator that
//! pipeline hands a `.cue` path to, and gets back readable disc sectors.

pub mod cdtime;
pub mod cue;
pub mod reader;

use std::io;
use thiserror::Error;

pub const BYTES_PER_SECTOR: u64 = 2352;

#[derive(Debug, Error)]
pub enum CdRomError {
    #[error("unable to determine parent directory of CUE file path '{0}'")]
    CueParentDir(String),
    #[error("error parsing CUE file: {0}")]
    CueParse(String),
    #[error("invalid FILE line in CUE file: '{0}'")]
    CueInvalidFileLine(String),
    #[error("invalid TRACK line in CUE file: '{0}'")]
    CueInvalidTrackLine(String),
    #[error("invalid INDEX line in CUE file: '{0}'")]
    CueInvalidIndexLine(String),
    #[error("invalid PREGAP line in CUE file: '{0}'")]
    CueInvalidPregapLine(String),
    #[error("error reading file metadata from '{path}': {source}")]
    FsMetadata { path: String, source: io::Error },
    #[error("error opening CUE file at '{path}': {source}")]
    CueOpen { path: String, source: io::Error },
    #[error("error opening BIN file at '{path}': {source}")]
    BinOpen { path: String, source: io::Error },
    #[error("I/O error reading CD-ROM sector: {0}")]
    DiscReadIo(#[source] io::Error),
    #[error(
        "invalid checksum reading track {track_number} sector {sector_number}: expected {expected:08X}, was {actual:08X}"
    )]
    DiscReadInvalidChecksum { track_number: u8, sector_number: u32, expected: u32, actual: u32 },
}

pub type CdRomResult<T> = Result<T, CdRomError>;
