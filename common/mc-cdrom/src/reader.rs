//! Top-level disc-image abstraction: a parsed CUE sheet plus whatever is
//! backing the actual sector bytes (a BIN file on disk, or an in-memory
//! buffer loaded from inside an archive).

pub mod cuebin;
pub mod seekvec;

use crate::cdtime::CdTime;
use crate::cue::{CueSheet, TrackType};
use crate::reader::cuebin::CdBinFiles;
use crate::reader::seekvec::SeekableVec;
use crate::{CdRomError, CdRomResult};
use crc::Crc;
use std::fs::File;
use std::ops::Range;
use std::path::Path;

/// Which of the two Mode 2 sub-forms a sector uses, determined by bit 5 of
/// the submode byte at offset 18 in the sector header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode2Form {
    One,
    Two,
}

impl Mode2Form {
    fn from_submode_byte(submode: u8) -> Self {
        if submode & 0x20 != 0 { Self::Two } else { Self::One }
    }
}

#[derive(Debug)]
enum CdRomReader {
    CueBin(CdBinFiles<File>),
    CueBinMemory(CdBinFiles<SeekableVec>),
}

#[derive(Debug)]
pub struct CdRom {
    cue_sheet: CueSheet,
    reader: CdRomReader,
}

impl CdRom {
    /// # Errors
    ///
    /// Returns an error if the CUE sheet cannot be parsed or any referenced
    /// BIN file cannot be opened.
    pub fn open<P: AsRef<Path>>(cue_path: P) -> CdRomResult<Self> {
        let (files, cue_sheet) = CdBinFiles::create(cue_path, |path| File::open(path))?;
        Ok(Self { cue_sheet, reader: CdRomReader::CueBin(files) })
    }

    /// Open a CUE sheet whose track files are read fully into memory rather
    /// than streamed from disk, e.g. when the disc image was extracted from
    /// a ZIP archive into a temp buffer ahead of time.
    ///
    /// # Errors
    ///
    /// Returns an error if the CUE sheet cannot be parsed or a referenced
    /// track file cannot be read.
    pub fn open_in_memory<P: AsRef<Path>>(cue_path: P) -> CdRomResult<Self> {
        let (files, cue_sheet) = CdBinFiles::create(cue_path, |path| {
            std::fs::read(path).map(SeekableVec::new)
        })?;
        Ok(Self { cue_sheet, reader: CdRomReader::CueBinMemory(files) })
    }

    #[must_use]
    pub fn cue(&self) -> &CueSheet {
        &self.cue_sheet
    }

    /// Read one 2352-byte raw sector for the given track at a time relative
    /// to the start of that track's actual data (i.e. excluding pregap).
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying file I/O fails or if the sector's
    /// EDC/checksum does not match the expected value.
    pub fn read_sector(
        &mut self,
        track_number: u8,
        relative_time: CdTime,
        out: &mut [u8],
    ) -> CdRomResult<()> {
        let track = *self.cue_sheet.track(track_number);

        if relative_time < track.pregap_len {
            write_fake_data_pregap(track.mode, relative_time, out);
            return Ok(());
        }

        let time_past_pregap = relative_time - track.pregap_len;
        let relative_sector_number = time_past_pregap.to_sector_number();

        match &mut self.reader {
            CdRomReader::CueBin(files) => {
                files.read_sector(track_number, relative_sector_number, out)?;
            }
            CdRomReader::CueBinMemory(files) => {
                files.read_sector(track_number, relative_sector_number, out)?;
            }
        }

        if track.track_type == TrackType::Data {
            validate_edc(out, track_number, relative_sector_number)?;
        }

        Ok(())
    }
}

/// The BIN file does not store bytes for the pregap, so synthesize a sector
/// that looks like a valid (silent / zeroed) one instead of reading garbage.
fn write_fake_data_pregap(mode: crate::cue::TrackMode, relative_time: CdTime, out: &mut [u8]) {
    out.fill(0);

    if mode == crate::cue::TrackMode::Audio {
        return;
    }

    // Sync pattern + mode-1-style absolute header full of BCD time bytes.
    out[0] = 0x00;
    out[1..11].fill(0xFF);
    out[11] = 0x00;
    out[12] = time_component_to_bcd(relative_time.minutes);
    out[13] = time_component_to_bcd(relative_time.seconds);
    out[14] = time_component_to_bcd(relative_time.frames);
    out[15] = 0x01;
}

fn time_component_to_bcd(value: u8) -> u8 {
    ((value / 10) << 4) | (value % 10)
}

const MODE_1_DIGEST_RANGE: Range<usize> = 0..2064;
const MODE_1_CHECKSUM_LOCATION: Range<usize> = 2064..2068;
const MODE_2_SUBMODE_LOCATION: usize = 18;
const MODE_2_FORM_1_DIGEST_RANGE: Range<usize> = 16..2072;
const MODE_2_FORM_1_CHECKSUM_LOCATION: Range<usize> = 2072..2076;
const MODE_2_FORM_2_DIGEST_RANGE: Range<usize> = 16..2348;
const MODE_2_FORM_2_CHECKSUM_LOCATION: Range<usize> = 2348..2352;

fn validate_edc(sector: &[u8], track_number: u8, sector_number: u32) -> CdRomResult<()> {
    static CD_ROM_CRC: Crc<u32> = Crc::<u32>::new(&crc::CRC_32_CD_ROM_EDC);

    let (digest_range, checksum_location) = match Mode2Form::from_submode_byte(
        sector.get(MODE_2_SUBMODE_LOCATION).copied().unwrap_or(0),
    ) {
        _ if is_mode_1(sector) => (MODE_1_DIGEST_RANGE, MODE_1_CHECKSUM_LOCATION),
        Mode2Form::One => (MODE_2_FORM_1_DIGEST_RANGE, MODE_2_FORM_1_CHECKSUM_LOCATION),
        Mode2Form::Two => (MODE_2_FORM_2_DIGEST_RANGE, MODE_2_FORM_2_CHECKSUM_LOCATION),
    };

    let expected = u32::from_le_bytes(sector[checksum_location.clone()].try_into().unwrap());
    let actual = CD_ROM_CRC.checksum(&sector[digest_range]);

    if expected != actual {
        return Err(CdRomError::DiscReadInvalidChecksum {
            track_number,
            sector_number,
            expected,
            actual,
        });
    }

    Ok(())
}

fn is_mode_1(sector: &[u8]) -> bool {
    sector.get(15).copied() == Some(0x01)
}
