//! Playback interpreter.
//!
//! [`Playback`] owns the node's mode and the cursor into the song buffer.
//! The main loop feeds it bus controls with [`Playback::apply`] and asks
//! it for one [`Step`] at a time; timing the step (tone or silence) is the
//! caller's job.
//!
//! ```text
//! Configuring --Start--> Playing --barrier--> BlockedOnSync
//!      ^                  |  ^                    |
//!      +---Stop / end-----+  +------SyncAck-------+
//! ```
//!
//! Stop from `BlockedOnSync` also returns to `Configuring`, and Start from
//! any mode rewinds and plays.

use crate::dispatch::Control;
use crate::frame::Response;
use crate::node::NodeId;
use crate::song::{Note, NoteEntry};
use crate::tables::TimerReload;

/// Node mode, one of exactly three.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    /// Idle: node ID may change, no playback.
    #[default]
    Configuring,
    /// Advancing through the song.
    Playing,
    /// Parked after a sync barrier until a sync acknowledgement.
    BlockedOnSync,
}

/// What the main loop should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Step {
    /// Not playing; nothing consumed.
    Idle,
    /// Sound `reload` for `duration` ms.
    Tone {
        pitch: u8,
        reload: TimerReload,
        duration: u16,
    },
    /// Stay silent for `duration` ms.
    Rest { duration: u16 },
    /// Song finished; back to configuring.
    Ended { notify: Option<Response> },
    /// Barrier reached; blocked until released.
    SyncWait { notify: Option<Response> },
    /// Entry with an unplayable pitch was passed over.
    Skipped { pitch: u8 },
}

impl Step {
    /// Bus notification produced by this step, if any.
    pub fn notification(self) -> Option<Response> {
        match self {
            Step::Ended { notify } | Step::SyncWait { notify } => notify,
            _ => None,
        }
    }
}

/// Mode and cursor of the playback engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Playback {
    mode: Mode,
    cursor: u16,
}

impl Playback {
    pub const fn new() -> Self {
        Self {
            mode: Mode::Configuring,
            cursor: 0,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn cursor(&self) -> u16 {
        self.cursor
    }

    /// The main loop should be running the interpreter.
    pub fn is_music_playing(&self) -> bool {
        self.mode != Mode::Configuring
    }

    /// The interpreter must not advance past the current barrier.
    pub fn is_waiting_for_sync(&self) -> bool {
        self.mode == Mode::BlockedOnSync
    }

    /// Applies a bus control and returns the resulting mode.
    pub fn apply(&mut self, control: Control) -> Mode {
        match control {
            Control::Start => {
                self.cursor = 0;
                self.mode = Mode::Playing;
            }
            Control::Stop => self.mode = Mode::Configuring,
            Control::SyncAck => {
                if self.mode == Mode::BlockedOnSync {
                    self.mode = Mode::Playing;
                }
            }
        }
        self.mode
    }

    /// Consumes `entry`, the song entry under the cursor.
    ///
    /// Only advances while [`Mode::Playing`]. `None` (reading past the
    /// loaded entries) behaves like an end-of-song entry.
    pub fn step(&mut self, entry: Option<NoteEntry>, node_id: NodeId) -> Step {
        if self.mode != Mode::Playing {
            return Step::Idle;
        }
        let Some(entry) = entry else {
            return self.finish(node_id);
        };
        match entry.note() {
            Note::Tone {
                pitch,
                reload,
                duration,
            } => {
                self.advance();
                Step::Tone {
                    pitch,
                    reload,
                    duration,
                }
            }
            Note::Rest { duration } => {
                self.advance();
                Step::Rest { duration }
            }
            Note::End => self.finish(node_id),
            Note::SyncBarrier => {
                // Resume with the entry after the barrier.
                self.advance();
                self.mode = Mode::BlockedOnSync;
                Step::SyncWait {
                    notify: node_id.is_coordinator().then_some(Response::SyncReached),
                }
            }
            Note::Invalid(pitch) => {
                self.advance();
                Step::Skipped { pitch }
            }
        }
    }

    fn advance(&mut self) {
        self.cursor = self.cursor.wrapping_add(1);
    }

    fn finish(&mut self, node_id: NodeId) -> Step {
        self.cursor = 0;
        self.mode = Mode::Configuring;
        Step::Ended {
            notify: node_id.is_coordinator().then_some(Response::SongEnded),
        }
    }
}
