//! An in-memory `Read + Seek` byte buffer, used when a disc image is loaded
//! entirely into RAM (e.g. from inside a ZIP archive) rather than read
//! lazily from a BIN file on disk.

use std::io::{self, Read, Seek, SeekFrom};

#[derive(Debug)]
pub struct SeekableVec {
    bytes: Vec<u8>,
    position: usize,
}

impl SeekableVec {
    #[must_use]
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes, position: 0 }
    }
}

impl Read for SeekableVec {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = &self.bytes[self.position.min(self.bytes.len())..];
        let len = remaining.len().min(buf.len());
        buf[..len].copy_from_slice(&remaining[..len]);
        self.position += len;
        Ok(len)
    }
}

impl Seek for SeekableVec {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let new_position = match pos {
            SeekFrom::Start(offset) => offset as i64,
            SeekFrom::End(offset) => self.bytes.len() as i64 + offset,
            SeekFrom::Current(offset) => self.position as i64 + offset,
        };

        if new_position < 0 {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "seek to negative position"));
        }

        self.position = new_position as usize;
        Ok(self.position as u64)
    }
}
