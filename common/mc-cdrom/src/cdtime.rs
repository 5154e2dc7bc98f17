//! CD-ROM "MM:SS:FF" addressing (75 frames/sectors per second of audio).

use bincode::{Decode, Encode};
use std::fmt::{Display, Formatter};
use std::ops::{Add, AddAssign, Sub};
use std::str::FromStr;

pub const FRAMES_PER_SECOND: u32 = 75;
const SECONDS_PER_MINUTE: u32 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Encode, Decode)]
pub struct CdTime {
    pub minutes: u8,
    pub seconds: u8,
    pub frames: u8,
}

impl CdTime {
    pub const ZERO: Self = Self { minutes: 0, seconds: 0, frames: 0 };

    #[must_use]
    pub fn new(minutes: u8, seconds: u8, frames: u8) -> Self {
        assert!(seconds < 60, "seconds must be < 60, was {seconds}");
        assert!(
            frames < FRAMES_PER_SECOND as u8,
            "frames must be < {FRAMES_PER_SECOND}, was {frames}"
        );
        Self { minutes, seconds, frames }
    }

    #[must_use]
    pub fn to_sector_number(self) -> u32 {
        (u32::from(self.minutes) * SECONDS_PER_MINUTE + u32::from(self.seconds))
            * FRAMES_PER_SECOND
            + u32::from(self.frames)
    }

    #[must_use]
    pub fn from_sector_number(sector_number: u32) -> Self {
        let frames = sector_number % FRAMES_PER_SECOND;
        let total_seconds = sector_number / FRAMES_PER_SECOND;
        let seconds = total_seconds % SECONDS_PER_MINUTE;
        let minutes = total_seconds / SECONDS_PER_MINUTE;
        Self { minutes: minutes as u8, seconds: seconds as u8, frames: frames as u8 }
    }
}

impl Add for CdTime {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self::from_sector_number(self.to_sector_number() + rhs.to_sector_number())
    }
}

impl AddAssign for CdTime {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for CdTime {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        let lhs = self.to_sector_number();
        let rhs = rhs.to_sector_number();
        Self::from_sector_number(lhs.saturating_sub(rhs))
    }
}

impl Display for CdTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}:{:02}", self.minutes, self.seconds, self.frames)
    }
}

impl FromStr for CdTime {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<_> = s.split(':').collect();
        let [m, s_, f] = parts.as_slice() else {
            return Err(format!("invalid CD time string: '{s}'"));
        };

        let minutes = m.parse::<u8>().map_err(|e| e.to_string())?;
        let seconds = s_.parse::<u8>().map_err(|e| e.to_string())?;
        let frames = f.parse::<u8>().map_err(|e| e.to_string())?;

        if seconds >= 60 || u32::from(frames) >= FRAMES_PER_SECOND {
            return Err(format!("invalid CD time string: '{s}'"));
        }

        Ok(Self { minutes, seconds, frames })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_sector_number() {
        for raw in [0, 1, 74, 75, 76, 4499, 4500, 1_000_000] {
            assert_eq!(CdTime::from_sector_number(raw).to_sector_number(), raw);
        }
    }

    #[test]
    fn parses_and_displays() {
        let t: CdTime = "02:15:30".parse().unwrap();
        assert_eq!(t, CdTime::new(2, 15, 30));
        assert_eq!(t.to_string(), "02:15:30");
    }

    #[test]
    fn arithmetic() {
        let a = CdTime::new(0, 1, 0);
        let b = CdTime::new(0, 0, 10);
        assert_eq!(a + b, CdTime::new(0, 1, 10));
        assert_eq!(a - b, CdTime::new(0, 0, 65));
    }
}
