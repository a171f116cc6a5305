//! Movie (record/replay) subsystem.
//!
//! A movie captures every input sample the core reads, plus keyboard events
//! and periodic core-state checkpoints, into one seekable stream, and plays
//! the stream back bit-exactly. The aggregator substitutes movie samples for
//! live device state during playback and taps final values during recording.

pub mod movie;

pub use movie::{MovieHandle, MovieMode, StateLoadOutcome, timestamp_identifier};

use std::io::{Cursor, Read, Seek, Write};

use axon_types::error::Result;

/// Backing storage for a movie stream.
///
/// Rewind-while-recording truncates the stream, which `Seek` alone cannot
/// express, so backends supply it explicitly.
pub trait MovieStream: Read + Write + Seek {
    /// Shrink the stream to `len` bytes.
    fn truncate(&mut self, len: u64) -> std::io::Result<()>;
}

impl MovieStream for std::fs::File {
    fn truncate(&mut self, len: u64) -> std::io::Result<()> {
        self.set_len(len)
    }
}

impl MovieStream for Cursor<Vec<u8>> {
    fn truncate(&mut self, len: u64) -> std::io::Result<()> {
        self.get_mut().truncate(len as usize);
        Ok(())
    }
}

/// Core-state snapshot interface consumed by checkpoints and save states.
///
/// The emulated core itself lives outside this workspace; movies only need
/// the ability to capture and restore its state as opaque bytes.
pub trait CoreState {
    fn serialize(&self) -> Result<Vec<u8>>;
    fn deserialize(&mut self, data: &[u8]) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::SeekFrom;

    #[test]
    fn cursor_truncate_shrinks() {
        let mut cur = Cursor::new(vec![1u8, 2, 3, 4]);
        cur.truncate(2).unwrap();
        assert_eq!(cur.get_ref().as_slice(), &[1, 2]);
    }

    #[test]
    fn file_truncate_shrinks() {
        let mut file = tempfile::tempfile().unwrap();
        file.write_all(b"abcdef").unwrap();
        MovieStream::truncate(&mut file, 3).unwrap();
        file.seek(SeekFrom::Start(0)).unwrap();
        let mut buf = Vec::new();
        file.read_to_end(&mut buf).unwrap();
        assert_eq!(buf, b"abc");
    }
}
