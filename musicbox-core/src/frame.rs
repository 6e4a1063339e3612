//! Bus frame reception.
//!
//! # Wire format
//!
//! ```text
//! header            = event:4 | param:4
//! load (event == 1) = header len_hi len_lo payload[len] check
//! payload           = (pitch dur_hi dur_lo)*
//! check             = XOR of every payload byte
//! ```
//!
//! Every other event is a single header byte. [`FrameReceiver`] consumes
//! one byte per call and never blocks, so it can sit directly behind the
//! UART receive path.

use crate::node::NodeId;
use crate::song::{ENTRY_WIRE_LEN, NoteEntry, SongBuffer, fits_declared_length};

/// Event code of a song data transfer.
pub const LOAD_EVENT: u8 = 1;

/// Frame header split into its nibbles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Header {
    pub event: u8,
    pub param: u8,
}

impl Header {
    /// Builds a header, keeping only the low nibble of each field.
    pub const fn new(event: u8, param: u8) -> Self {
        Self {
            event: event & 0x0F,
            param: param & 0x0F,
        }
    }

    pub const fn from_byte(byte: u8) -> Self {
        Self::new(byte >> 4, byte)
    }

    pub const fn to_byte(self) -> u8 {
        (self.event << 4) | self.param
    }
}

/// One-byte messages a node transmits on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Response {
    /// Song finished playing (coordinator only).
    SongEnded = 0x20,
    /// Sync barrier reached (coordinator only).
    SyncReached = 0x70,
    /// Load accepted and committed.
    LoadOk = 0xE0,
    /// Check byte did not match the payload.
    ChecksumMismatch = 0xF0,
    /// Declared length exceeds the song buffer.
    SizeExceeded = 0xF1,
}

impl From<Response> for u8 {
    fn from(response: Response) -> u8 {
        response as u8
    }
}

/// Outcome of feeding one byte that completed something.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameEvent {
    /// Single-byte command frame, ready for dispatch.
    Header(Header),
    /// A load header was read; `addressed` if it targets this node.
    LoadStarted { addressed: bool },
    /// A load addressed to this node finished with the given acknowledgement.
    LoadComplete(Response),
    /// A load for another node was consumed without effect.
    Skipped,
}

/// Who a load frame is for, latched from the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Local,
    Foreign,
}

/// What happens to payload bytes once the length is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Disposition {
    /// Store and checksum.
    Store,
    /// Local but larger than the buffer: count only.
    Oversize,
    /// Another node's data: count only.
    Discard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    LengthHigh {
        target: Target,
    },
    LengthLow {
        target: Target,
        high: u8,
    },
    Payload {
        disposition: Disposition,
        declared: u16,
        consumed: u16,
        checksum: u8,
    },
    Check {
        disposition: Disposition,
        checksum: u8,
    },
}

/// Byte-at-a-time frame assembler.
///
/// The target comparison for a load is made once, when its header arrives;
/// a node ID change while the payload is in flight does not redirect it.
pub struct FrameReceiver {
    state: State,
    /// First two bytes of the entry currently being assembled.
    partial: [u8; 2],
}

impl FrameReceiver {
    pub const fn new() -> Self {
        Self {
            state: State::Idle,
            partial: [0; 2],
        }
    }

    /// Abandons any frame in flight; the next byte is read as a header.
    pub fn reset(&mut self) {
        self.state = State::Idle;
    }

    /// True between frames.
    pub fn is_idle(&self) -> bool {
        self.state == State::Idle
    }

    /// Consumes one bus byte.
    ///
    /// `node_id` is only consulted when `byte` is a load header. Payload
    /// for this node goes straight into `song`; the buffer is cleared when
    /// an in-range length is accepted.
    pub fn feed(&mut self, byte: u8, node_id: NodeId, song: &mut SongBuffer) -> Option<FrameEvent> {
        match self.state {
            State::Idle => self.start(byte, node_id),
            State::LengthHigh { target } => {
                self.state = State::LengthLow { target, high: byte };
                None
            }
            State::LengthLow { target, high } => {
                let declared = u16::from_be_bytes([high, byte]);
                let disposition = match target {
                    Target::Foreign => Disposition::Discard,
                    Target::Local if fits_declared_length(declared) => {
                        song.clear();
                        Disposition::Store
                    }
                    Target::Local => Disposition::Oversize,
                };
                self.state = if declared == 0 {
                    State::Check {
                        disposition,
                        checksum: 0,
                    }
                } else {
                    State::Payload {
                        disposition,
                        declared,
                        consumed: 0,
                        checksum: 0,
                    }
                };
                None
            }
            State::Payload {
                disposition,
                declared,
                consumed,
                checksum,
            } => {
                let checksum = if disposition == Disposition::Store {
                    self.store(byte, consumed, song);
                    checksum ^ byte
                } else {
                    checksum
                };
                let consumed = consumed + 1;
                self.state = if consumed == declared {
                    State::Check {
                        disposition,
                        checksum,
                    }
                } else {
                    State::Payload {
                        disposition,
                        declared,
                        consumed,
                        checksum,
                    }
                };
                None
            }
            State::Check {
                disposition,
                checksum,
            } => {
                self.state = State::Idle;
                Some(match disposition {
                    Disposition::Store if byte == checksum => FrameEvent::LoadComplete(Response::LoadOk),
                    Disposition::Store => FrameEvent::LoadComplete(Response::ChecksumMismatch),
                    Disposition::Oversize => FrameEvent::LoadComplete(Response::SizeExceeded),
                    Disposition::Discard => FrameEvent::Skipped,
                })
            }
        }
    }

    fn start(&mut self, byte: u8, node_id: NodeId) -> Option<FrameEvent> {
        let header = Header::from_byte(byte);
        if header.event != LOAD_EVENT {
            return Some(FrameEvent::Header(header));
        }
        if header.param == node_id.get() {
            self.state = State::LengthHigh {
                target: Target::Local,
            };
            Some(FrameEvent::LoadStarted { addressed: true })
        } else {
            self.state = State::LengthHigh {
                target: Target::Foreign,
            };
            Some(FrameEvent::LoadStarted { addressed: false })
        }
    }

    /// Places payload byte number `index` into the entry being assembled.
    /// A trailing partial entry is never stored.
    fn store(&mut self, byte: u8, index: u16, song: &mut SongBuffer) {
        match usize::from(index) % ENTRY_WIRE_LEN {
            0 => self.partial[0] = byte,
            1 => self.partial[1] = byte,
            _ => {
                let entry = NoteEntry::new(self.partial[0], u16::from_be_bytes([self.partial[1], byte]));
                if let Err(_e) = song.push(entry) {
                    #[cfg(feature = "defmt")]
                    defmt::warn!("Dropping note {}: {}", entry, _e);
                }
            }
        }
    }
}

impl Default for FrameReceiver {
    fn default() -> Self {
        Self::new()
    }
}
