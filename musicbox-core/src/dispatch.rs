//! Command dispatch.
//!
//! Turns a completed single-byte frame into the playback control it asks
//! of this node, if any. Broadcast commands apply to every node; unicast
//! commands only when the header's parameter equals this node's ID.

use crate::frame::Header;
use crate::node::NodeId;

/// Event codes carried in the header's high nibble.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    /// 0: nothing.
    Nop,
    /// 1: song data follows; handled by the frame receiver.
    Load,
    /// 2 and 7: reserved for the host.
    Reserved(u8),
    /// 3: every node starts from the top.
    StartAll,
    /// 4: every node stops.
    StopAll,
    /// 5: addressed node starts from the top.
    Start,
    /// 6: addressed node stops.
    Stop,
    /// 8: release nodes held at a sync barrier.
    SyncAck,
    /// 0xE and 0xF: traffic addressed to the host.
    HostBound(u8),
    /// Anything else.
    Unknown(u8),
}

impl Event {
    pub const fn from_code(code: u8) -> Self {
        match code {
            0 => Event::Nop,
            1 => Event::Load,
            2 | 7 => Event::Reserved(code),
            3 => Event::StartAll,
            4 => Event::StopAll,
            5 => Event::Start,
            6 => Event::Stop,
            8 => Event::SyncAck,
            0xE | 0xF => Event::HostBound(code),
            other => Event::Unknown(other),
        }
    }
}

/// Playback change requested by the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Control {
    /// Rewind to the first entry and play.
    Start,
    /// Stop playing; leaves any sync wait.
    Stop,
    /// Leave a sync barrier wait.
    SyncAck,
}

/// Maps a header to the control it asks of `node_id`.
///
/// Returns `None` for no-ops, host traffic, unknown codes and unicast
/// commands addressed to other nodes. Nothing is acknowledged on the bus.
pub fn dispatch(header: Header, node_id: NodeId) -> Option<Control> {
    let addressed = header.param == node_id.get();
    match Event::from_code(header.event) {
        Event::StartAll => Some(Control::Start),
        Event::StopAll => Some(Control::Stop),
        Event::Start if addressed => Some(Control::Start),
        Event::Stop if addressed => Some(Control::Stop),
        Event::SyncAck => Some(Control::SyncAck),
        _ => None,
    }
}
