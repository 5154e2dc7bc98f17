//! Parsed CUE-sheet track list: the disc-layout half of CUE/TOC support.
//! The actual `FILE`/`TRACK`/`INDEX` line parsing lives in `reader::cuebin`;
//! this module owns the resulting in-memory representation.

use crate::cdtime::CdTime;
use bincode::{Decode, Encode};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub enum TrackMode {
    Mode1,
    Mode2,
    Audio,
}

impl TrackMode {
    #[must_use]
    pub fn to_type(self) -> TrackType {
        match self {
            Self::Mode1 | Self::Mode2 => TrackType::Data,
            Self::Audio => TrackType::Audio,
        }
    }
}

impl FromStr for TrackMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MODE1/2048" | "MODE1/2352" => Ok(Self::Mode1),
            "MODE2/2048" | "MODE2/2324" | "MODE2/2336" | "MODE2/2352" => Ok(Self::Mode2),
            "AUDIO" => Ok(Self::Audio),
            _ => Err(format!("unsupported CUE track mode: '{s}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub enum TrackType {
    Data,
    Audio,
}

impl TrackType {
    /// Data tracks are followed by a fixed 2-second postgap; audio tracks
    /// have none unless explicitly specified (rare, and not modeled here).
    #[must_use]
    pub fn default_postgap_len(self) -> CdTime {
        match self {
            Self::Data => CdTime::new(0, 2, 0),
            Self::Audio => CdTime::ZERO,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub struct Track {
    pub number: u8,
    pub mode: TrackMode,
    pub track_type: TrackType,
    /// Absolute start time of this track on the virtual disc timeline.
    pub start_time: CdTime,
    /// Absolute end time (exclusive), including pregap/pause/postgap padding.
    pub end_time: CdTime,
    pub pregap_len: CdTime,
    pub pause_len: CdTime,
    pub postgap_len: CdTime,
}

#[derive(Debug, Clone, Encode, Decode)]
pub struct CueSheet {
    tracks: Vec<Track>,
}

impl CueSheet {
    #[must_use]
    pub fn new(tracks: Vec<Track>) -> Self {
        Self { tracks }
    }

    #[must_use]
    pub fn empty() -> Self {
        Self { tracks: Vec::new() }
    }

    #[must_use]
    pub fn track(&self, track_number: u8) -> &Track {
        &self.tracks[(track_number - 1) as usize]
    }

    #[must_use]
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    #[must_use]
    pub fn last_track(&self) -> &Track {
        self.tracks.last().expect("a valid disc always has at least one track")
    }

    /// Find the track containing the given absolute disc time, if any.
    #[must_use]
    pub fn find_track_by_time(&self, time: CdTime) -> Option<&Track> {
        self.tracks.iter().find(|track| time >= track.start_time && time < track.end_time)
    }
}

/// Clamp each track's `end_time` to the next track's `start_time` so the
/// track list has no gaps or overlaps once padding has been computed.
pub fn finalize_track_list(tracks: &mut [Track]) {
    let len = tracks.len();
    for i in 0..len.saturating_sub(1) {
        tracks[i].end_time = tracks[i + 1].start_time;
    }
}

#[must_use]
pub fn tracks_are_continuous(tracks: &[Track]) -> bool {
    tracks.windows(2).all(|w| w[0].end_time == w[1].start_time)
}
