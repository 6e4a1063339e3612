//! Hardware-independent core of a bus-connected music box node.
//!
//! Each node on the shared half-duplex bus owns a 4-bit node ID, receives
//! song data and playback commands one byte at a time, and plays the song
//! back as a square-wave tone sequence. Nodes can be held at sync barriers
//! so that several boxes start, stop and resume together.
//!
//! # Module Organization
//!
//! - [`tables`] - Pitch-to-timer-reload tables and digit segment codes
//! - [`song`] - Fixed-capacity song buffer and note decoding
//! - [`frame`] - Byte-at-a-time frame receiver and wire constants
//! - [`dispatch`] - Header decoding and per-node addressing
//! - [`playback`] - Playback interpreter and node mode state machine
//! - [`node`] - Node identity and its persistence
//! - [`store`] - Non-volatile byte store interface
//! - [`shared`] - State shared between the bus task and the main loop
//!
//! # Crate Features
//!
//! - **`defmt`** - structured logging and `defmt::Format` derives.

#![cfg_attr(not(test), no_std)]

pub mod dispatch;
pub mod error;
pub mod frame;
pub mod node;
pub mod playback;
pub mod shared;
pub mod song;
pub mod store;
pub mod tables;

pub use dispatch::{Control, Event, dispatch};
pub use error::{NodeError, SongError};
pub use frame::{FrameEvent, FrameReceiver, Header, Response};
pub use node::{NodeId, NodeSelector};
pub use playback::{Mode, Playback, Step};
pub use shared::{BusPort, PlayerPort, ResponsePort, SharedState};
pub use song::{MAX_NOTES, Note, NoteEntry, SongBuffer};
pub use store::{NODE_ID_ADDRESS, NodeStore, StorageStore};
pub use tables::TimerReload;
