//! Song buffer and note decoding.
//!
//! A song is an ordered list of [`NoteEntry`] values. Pitches 0-127 are
//! played through the pitch tables; the top three byte values are control
//! codes that the playback interpreter handles itself.

use heapless::Vec;

use crate::error::SongError;
use crate::tables::TimerReload;

/// Maximum number of entries a song can hold.
pub const MAX_NOTES: usize = 600;

/// Highest pitch with a timer reload entry.
pub const MAX_PITCH: u8 = 127;

/// Pause until a sync acknowledgement arrives.
pub const SYNC_BARRIER: u8 = 253;

/// End of the song.
pub const END_OF_SONG: u8 = 254;

/// Silence for the entry's duration.
pub const REST: u8 = 255;

/// Bytes per entry on the wire: pitch, duration high, duration low.
pub const ENTRY_WIRE_LEN: usize = 3;

/// One entry of the song: a pitch or control code and a duration in ms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NoteEntry {
    pub pitch: u8,
    pub duration: u16,
}

/// Decoded meaning of a [`NoteEntry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Note {
    /// Audible pitch with its timer reload value.
    Tone {
        pitch: u8,
        reload: TimerReload,
        duration: u16,
    },
    /// Silence that still takes up `duration` ms.
    Rest { duration: u16 },
    /// End of the song.
    End,
    /// Wait here until the bus releases the barrier.
    SyncBarrier,
    /// Pitch 128-252: neither playable nor a control code.
    Invalid(u8),
}

impl NoteEntry {
    pub const fn new(pitch: u8, duration: u16) -> Self {
        Self { pitch, duration }
    }

    pub const fn rest(duration: u16) -> Self {
        Self::new(REST, duration)
    }

    pub const fn end() -> Self {
        Self::new(END_OF_SONG, 0)
    }

    pub const fn sync_barrier() -> Self {
        Self::new(SYNC_BARRIER, 0)
    }

    /// Decodes the pitch byte.
    pub fn note(self) -> Note {
        if let Some(reload) = TimerReload::for_pitch(self.pitch) {
            return Note::Tone {
                pitch: self.pitch,
                reload,
                duration: self.duration,
            };
        }
        match self.pitch {
            REST => Note::Rest {
                duration: self.duration,
            },
            END_OF_SONG => Note::End,
            SYNC_BARRIER => Note::SyncBarrier,
            other => Note::Invalid(other),
        }
    }
}

/// Returns true if a payload of `declared_len` bytes fits in the buffer.
pub const fn fits_declared_length(declared_len: u16) -> bool {
    (declared_len as usize) / ENTRY_WIRE_LEN <= MAX_NOTES
}

/// Fixed-capacity song storage.
///
/// Entries past [`len`](Self::len) are never readable; writes past
/// [`MAX_NOTES`] are rejected rather than wrapped or truncated silently.
#[derive(Debug, Clone)]
pub struct SongBuffer {
    entries: Vec<NoteEntry, MAX_NOTES>,
}

impl SongBuffer {
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Appends an entry.
    ///
    /// # Errors
    /// * [`SongError::Full`] if the buffer already holds [`MAX_NOTES`] entries
    pub fn push(&mut self, entry: NoteEntry) -> Result<(), SongError> {
        self.entries.push(entry).map_err(|_| SongError::Full)
    }

    /// Entry at `pos`, or `None` past the loaded length.
    pub fn get(&self, pos: u16) -> Option<NoteEntry> {
        self.entries.get(usize::from(pos)).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub const fn capacity(&self) -> usize {
        MAX_NOTES
    }

    pub fn entries(&self) -> &[NoteEntry] {
        &self.entries
    }
}

impl Default for SongBuffer {
    fn default() -> Self {
        Self::new()
    }
}
