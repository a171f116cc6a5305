//! The movie handle: stream layout, frame boundaries, rewind.
//!
//! Stream layout (all multi-byte fields little-endian):
//!
//! ```text
//! [magic "AXMV"] [u32 version] [i64 identifier]
//! per frame:
//!   [i16 sample]*                      one per aggregator query, in order
//!   [u8 key-event count]
//!   count x [u8 down][u16 mods][u32 code][u32 character]
//!   [u8 frame token]
//!   token CHECKPOINT: [u64 length][core-state bytes]
//! ```

use std::io::{ErrorKind, SeekFrom};
use std::time::{SystemTime, UNIX_EPOCH};

use axon_types::error::{AxonError, Result};
use axon_types::keys::{Key, KeyEvent, KeyMods};
use axon_types::settings::MovieSettings;
use log::{info, warn};

use crate::{CoreState, MovieStream};

/// Stream magic, the first four bytes of every movie.
pub const MAGIC: [u8; 4] = *b"AXMV";
/// Current stream format version.
pub const VERSION: u32 = 1;
/// Length of the fixed stream header.
pub const HEADER_LEN: u64 = 16;
/// Byte offset of the identifier within the stream.
pub const IDENTIFIER_OFFSET: usize = 8;

/// Frame rate assumed when converting the checkpoint interval to frames.
const FPS: u64 = 60;

/// Key-event capacity of one frame; the on-disk count is a single byte.
const MAX_KEY_EVENTS: usize = u8::MAX as usize;

/// Upper bound accepted for a checkpoint blob when reading.
const MAX_CHECKPOINT_LEN: u64 = 256 << 20;

const TOKEN_REGULAR: u8 = 1;
const TOKEN_CHECKPOINT: u8 = 2;

/// Whether a handle writes samples or reads them back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovieMode {
    Recording,
    Playback,
}

/// Result of re-aligning a movie with a save state's embedded stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateLoadOutcome {
    /// Identifiers matched; the movie continues from the state's position.
    Resumed,
    /// Identifiers differed during playback; the handle must be dropped.
    Halted,
}

/// Identifier for a fresh recording: seconds since the Unix epoch.
pub fn timestamp_identifier() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// One active movie, either recording or playing back.
pub struct MovieHandle {
    stream: Box<dyn MovieStream>,
    mode: MovieMode,
    identifier: i64,
    frame_counter: u64,
    /// Ring of frame start offsets, indexed by `frame_counter & frame_mask`.
    frame_pos: Vec<u64>,
    frame_mask: u64,
    /// First byte after the header; rewind never goes earlier.
    min_file_pos: u64,
    /// Checkpoint cadence in frames, 0 when disabled.
    checkpoint_every: u64,
    /// Key events seen this frame, flushed at the boundary when recording.
    key_events: Vec<KeyEvent>,
    ended: bool,
    first_rewind: bool,
    did_rewind: bool,
}

impl std::fmt::Debug for MovieHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MovieHandle")
            .field("mode", &self.mode)
            .field("identifier", &self.identifier)
            .field("frame_counter", &self.frame_counter)
            .finish_non_exhaustive()
    }
}

impl MovieHandle {
    /// Start recording into `stream`, replacing any existing content.
    pub fn record(
        mut stream: Box<dyn MovieStream>,
        identifier: i64,
        settings: &MovieSettings,
    ) -> Result<MovieHandle> {
        stream.seek(SeekFrom::Start(0))?;
        stream.truncate(0)?;
        stream.write_all(&MAGIC)?;
        stream.write_all(&VERSION.to_le_bytes())?;
        stream.write_all(&identifier.to_le_bytes())?;
        info!("movie recording started, identifier {identifier}");
        Ok(Self::new(stream, MovieMode::Recording, identifier, settings))
    }

    /// Open `stream` for playback, validating the header.
    pub fn playback(
        mut stream: Box<dyn MovieStream>,
        settings: &MovieSettings,
    ) -> Result<MovieHandle> {
        stream.seek(SeekFrom::Start(0))?;
        let mut magic = [0u8; 4];
        stream
            .read_exact(&mut magic)
            .map_err(|_| AxonError::Movie("stream too short for a header".into()))?;
        if magic != MAGIC {
            return Err(AxonError::Movie("bad magic, not a movie stream".into()));
        }
        let version = read_u32(stream.as_mut())?;
        if version > VERSION {
            return Err(AxonError::Movie(format!(
                "unsupported stream version {version}"
            )));
        }
        let identifier = read_i64(stream.as_mut())?;
        info!("movie playback started, identifier {identifier}");
        Ok(Self::new(stream, MovieMode::Playback, identifier, settings))
    }

    fn new(
        stream: Box<dyn MovieStream>,
        mode: MovieMode,
        identifier: i64,
        settings: &MovieSettings,
    ) -> MovieHandle {
        let window = settings.frame_window.max(2).next_power_of_two();
        let mut frame_pos = vec![0u64; window];
        frame_pos[0] = HEADER_LEN;
        MovieHandle {
            stream,
            mode,
            identifier,
            frame_counter: 0,
            frame_pos,
            frame_mask: (window - 1) as u64,
            min_file_pos: HEADER_LEN,
            checkpoint_every: u64::from(settings.checkpoint_interval_secs) * FPS,
            key_events: Vec::new(),
            ended: false,
            first_rewind: true,
            did_rewind: false,
        }
    }

    pub fn mode(&self) -> MovieMode {
        self.mode
    }

    pub fn identifier(&self) -> i64 {
        self.identifier
    }

    pub fn frame_counter(&self) -> u64 {
        self.frame_counter
    }

    /// Whether playback ran out of data (or recording hit an I/O fault).
    pub fn ended(&self) -> bool {
        self.ended
    }

    // ---- per-query sample I/O ----

    /// Append one input sample. Recording only.
    pub fn push_sample(&mut self, value: i16) -> Result<()> {
        if self.mode != MovieMode::Recording || self.ended {
            return Ok(());
        }
        self.stream.write_all(&value.to_le_bytes())?;
        Ok(())
    }

    /// Read the next input sample. Playback only; `None` marks the end.
    pub fn next_sample(&mut self) -> Option<i16> {
        if self.mode != MovieMode::Playback || self.ended {
            return None;
        }
        let mut buf = [0u8; 2];
        match self.stream.read_exact(&mut buf) {
            Ok(()) => Some(i16::from_le_bytes(buf)),
            Err(e) => {
                if e.kind() != ErrorKind::UnexpectedEof {
                    warn!("movie sample read failed: {e}");
                }
                self.ended = true;
                None
            }
        }
    }

    // ---- key events ----

    /// Queue a keyboard event for the current frame. Recording only.
    pub fn push_key_event(&mut self, event: KeyEvent) {
        if self.mode != MovieMode::Recording {
            return;
        }
        if self.key_events.len() >= MAX_KEY_EVENTS {
            warn!("movie frame key-event capacity reached, dropping event");
            return;
        }
        self.key_events.push(event);
    }

    // ---- frame boundary ----

    /// Finish the frame that just ran.
    ///
    /// Recording writes the key-event block and frame token (plus a
    /// checkpoint when due and a core is supplied). Playback consumes the
    /// same data and returns the key events so the caller can replay them
    /// through the keyboard path.
    pub fn frame_boundary(&mut self, core: Option<&mut dyn CoreState>) -> Result<Vec<KeyEvent>> {
        if self.ended {
            return Ok(Vec::new());
        }
        let replayed = match self.mode {
            MovieMode::Recording => {
                self.write_frame_epilogue(core)?;
                Vec::new()
            }
            MovieMode::Playback => self.read_frame_epilogue(core),
        };
        self.frame_counter += 1;
        self.first_rewind = !self.did_rewind;
        self.did_rewind = false;
        let pos = self.stream.stream_position()?;
        let idx = (self.frame_counter & self.frame_mask) as usize;
        self.frame_pos[idx] = pos;
        Ok(replayed)
    }

    fn write_frame_epilogue(&mut self, core: Option<&mut dyn CoreState>) -> Result<()> {
        let events = std::mem::take(&mut self.key_events);
        self.stream.write_all(&[events.len() as u8])?;
        for event in &events {
            self.stream.write_all(&[u8::from(event.down)])?;
            self.stream.write_all(&event.mods.bits().to_le_bytes())?;
            self.stream.write_all(&event.key.code().to_le_bytes())?;
            self.stream.write_all(&event.character.to_le_bytes())?;
        }
        let checkpoint_due = self.checkpoint_every != 0
            && self.frame_counter > 0
            && self.frame_counter % self.checkpoint_every == 0;
        match core {
            Some(core) if checkpoint_due => {
                let state = core.serialize()?;
                self.stream.write_all(&[TOKEN_CHECKPOINT])?;
                self.stream.write_all(&(state.len() as u64).to_le_bytes())?;
                self.stream.write_all(&state)?;
            }
            _ => self.stream.write_all(&[TOKEN_REGULAR])?,
        }
        Ok(())
    }

    fn read_frame_epilogue(&mut self, core: Option<&mut dyn CoreState>) -> Vec<KeyEvent> {
        let mut events = Vec::new();
        let count = match read_u8(self.stream.as_mut()) {
            Ok(n) => n,
            Err(_) => {
                self.ended = true;
                return events;
            }
        };
        for _ in 0..count {
            let parsed = read_u8(self.stream.as_mut()).and_then(|down| {
                let mods = read_u16(self.stream.as_mut())?;
                let code = read_u32(self.stream.as_mut())?;
                let character = read_u32(self.stream.as_mut())?;
                Ok(KeyEvent {
                    down: down != 0,
                    key: Key::from_code(code),
                    character,
                    mods: KeyMods::from_bits(mods),
                })
            });
            match parsed {
                Ok(event) => events.push(event),
                Err(_) => {
                    self.ended = true;
                    return events;
                }
            }
        }
        match read_u8(self.stream.as_mut()) {
            Ok(TOKEN_REGULAR) => {}
            Ok(TOKEN_CHECKPOINT) => self.read_checkpoint(core),
            Ok(other) => {
                warn!("unrecognized movie frame token {other}, stopping playback");
                self.ended = true;
            }
            Err(_) => self.ended = true,
        }
        events
    }

    fn read_checkpoint(&mut self, core: Option<&mut dyn CoreState>) {
        let len = match read_u64(self.stream.as_mut()) {
            Ok(len) if len <= MAX_CHECKPOINT_LEN => len,
            Ok(len) => {
                warn!("movie checkpoint length {len} out of range, stopping playback");
                self.ended = true;
                return;
            }
            Err(_) => {
                self.ended = true;
                return;
            }
        };
        match core {
            Some(core) => {
                let mut blob = vec![0u8; len as usize];
                if self.stream.read_exact(&mut blob).is_err() {
                    warn!("movie checkpoint truncated, stopping playback");
                    self.ended = true;
                    return;
                }
                if let Err(e) = core.deserialize(&blob) {
                    warn!("failed to load movie checkpoint: {e}");
                }
            }
            None => {
                if self.stream.seek(SeekFrom::Current(len as i64)).is_err() {
                    self.ended = true;
                }
            }
        }
    }

    // ---- rewind ----

    /// Step the movie back one frame in concert with a host rewind.
    ///
    /// The first rewind of a run replays the frame that just ran; further
    /// consecutive rewinds must also skip the data that replaying pushed,
    /// hence the step of two.
    pub fn frame_rewind(&mut self) -> Result<()> {
        self.did_rewind = true;
        let recording = self.mode == MovieMode::Recording;
        if (self.frame_counter & self.frame_mask) <= 1 && self.frame_pos[0] == self.min_file_pos {
            self.frame_counter = 0;
            self.stream.seek(SeekFrom::Start(self.min_file_pos))?;
            if recording {
                self.stream.truncate(self.min_file_pos)?;
            }
            info!("movie rewound to beginning");
        } else {
            let delta: u64 = if self.first_rewind { 1 } else { 2 };
            self.frame_counter = self.frame_counter.saturating_sub(delta);
            let pos = self.frame_pos[(self.frame_counter & self.frame_mask) as usize];
            self.stream.seek(SeekFrom::Start(pos))?;
            if recording {
                self.stream.truncate(pos)?;
            }
            info!("movie rewound to frame {}", self.frame_counter);
        }
        if self.stream.stream_position()? <= self.min_file_pos {
            // Rewound past the retained window.
            if recording {
                self.reset_recording()?;
            } else {
                self.stream.seek(SeekFrom::Start(self.min_file_pos))?;
            }
        }
        Ok(())
    }

    fn reset_recording(&mut self) -> Result<()> {
        self.stream.seek(SeekFrom::Start(HEADER_LEN))?;
        self.stream.truncate(HEADER_LEN)?;
        self.frame_counter = 0;
        self.frame_pos[0] = HEADER_LEN;
        Ok(())
    }

    // ---- save-state embedding ----

    /// Capture the stream for embedding into a save state:
    /// `[u32 length][stream bytes]`.
    pub fn serialize_embed(&mut self) -> Result<Vec<u8>> {
        let pos = self.stream.stream_position()?;
        let mut out = Vec::with_capacity(4 + pos as usize);
        out.extend_from_slice(&(pos as u32).to_le_bytes());
        self.stream.seek(SeekFrom::Start(0))?;
        let mut content = vec![0u8; pos as usize];
        self.stream.read_exact(&mut content)?;
        out.extend_from_slice(&content);
        self.stream.seek(SeekFrom::Start(pos))?;
        Ok(out)
    }

    /// Re-align the movie with the stream a save state carries.
    ///
    /// A matching identifier moves the movie to the state's position (and,
    /// when recording, rewrites the stream to the embedded timeline). A
    /// mismatch aborts recording with an error and halts playback
    /// gracefully.
    pub fn load_embed(&mut self, embed: &[u8]) -> Result<StateLoadOutcome> {
        let Some(len_bytes) = embed.get(..4) else {
            return Err(AxonError::Movie("embedded movie too short".into()));
        };
        let len = u32::from_le_bytes([len_bytes[0], len_bytes[1], len_bytes[2], len_bytes[3]]);
        let content = embed
            .get(4..4 + len as usize)
            .ok_or_else(|| AxonError::Movie("embedded movie truncated".into()))?;
        if (content.len() as u64) < HEADER_LEN {
            return Err(AxonError::Movie("embedded movie missing header".into()));
        }
        let mut ident = [0u8; 8];
        ident.copy_from_slice(&content[IDENTIFIER_OFFSET..IDENTIFIER_OFFSET + 8]);
        let identifier = i64::from_le_bytes(ident);

        if identifier != self.identifier {
            return match self.mode {
                MovieMode::Recording => Err(AxonError::Incompatible(
                    "save state belongs to a different recording".into(),
                )),
                MovieMode::Playback => {
                    warn!("save state belongs to a different recording, halting playback");
                    self.ended = true;
                    Ok(StateLoadOutcome::Halted)
                }
            };
        }

        match self.mode {
            MovieMode::Recording => {
                self.stream.seek(SeekFrom::Start(0))?;
                self.stream.write_all(content)?;
                self.stream.truncate(content.len() as u64)?;
            }
            MovieMode::Playback => {
                let cur = self.stream.stream_position()?;
                let stream_len = self.stream.seek(SeekFrom::End(0))?;
                if content.len() as u64 > stream_len {
                    self.stream.seek(SeekFrom::Start(cur))?;
                    return Err(AxonError::Movie(
                        "save state lies beyond the end of this replay".into(),
                    ));
                }
                self.stream.seek(SeekFrom::Start(content.len() as u64))?;
            }
        }

        // The loaded position becomes the new rewind floor; positions from
        // before the load no longer correspond to stream offsets.
        let pos = self.stream.stream_position()?;
        self.frame_counter = 0;
        self.frame_pos.fill(pos);
        self.ended = false;
        self.first_rewind = true;
        self.did_rewind = false;
        self.key_events.clear();
        Ok(StateLoadOutcome::Resumed)
    }
}

// ---- little-endian read helpers ----

fn read_u8(stream: &mut dyn MovieStream) -> std::io::Result<u8> {
    let mut buf = [0u8; 1];
    stream.read_exact(&mut buf)?;
    Ok(buf[0])
}

fn read_u16(stream: &mut dyn MovieStream) -> std::io::Result<u16> {
    let mut buf = [0u8; 2];
    stream.read_exact(&mut buf)?;
    Ok(u16::from_le_bytes(buf))
}

fn read_u32(stream: &mut dyn MovieStream) -> std::io::Result<u32> {
    let mut buf = [0u8; 4];
    stream.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_u64(stream: &mut dyn MovieStream) -> std::io::Result<u64> {
    let mut buf = [0u8; 8];
    stream.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

fn read_i64(stream: &mut dyn MovieStream) -> std::io::Result<i64> {
    let mut buf = [0u8; 8];
    stream.read_exact(&mut buf)?;
    Ok(i64::from_le_bytes(buf))
}
