//! Node identity.
//!
//! Every node on the bus answers to a 4-bit ID. The ID is chosen with two
//! buttons, wraps at both ends of 0-15, and is persisted to the
//! non-volatile store so it survives power cycles.

use crate::error::NodeError;
use crate::store::{NODE_ID_ADDRESS, NodeStore};

/// Highest valid node ID.
pub const MAX_NODE_ID: u8 = 0x0F;

/// Validated 4-bit node address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NodeId(u8);

impl NodeId {
    /// The coordinator reports song-ended and sync-wait to the host.
    pub const COORDINATOR: NodeId = NodeId(0);

    /// # Errors
    /// * [`NodeError::OutOfRange`] if `raw > 15`
    pub const fn new(raw: u8) -> Result<Self, NodeError> {
        if raw > MAX_NODE_ID {
            return Err(NodeError::OutOfRange(raw));
        }
        Ok(Self(raw))
    }

    /// Interprets a byte read back from storage; corrupt values become 0.
    pub const fn from_stored(raw: u8) -> Self {
        if raw > MAX_NODE_ID {
            Self::COORDINATOR
        } else {
            Self(raw)
        }
    }

    pub const fn get(self) -> u8 {
        self.0
    }

    /// Next ID, wrapping 15 to 0.
    pub const fn next(self) -> Self {
        Self((self.0 + 1) & MAX_NODE_ID)
    }

    /// Previous ID, wrapping 0 to 15.
    pub const fn prev(self) -> Self {
        Self(self.0.wrapping_sub(1) & MAX_NODE_ID)
    }

    pub const fn is_coordinator(self) -> bool {
        self.0 == Self::COORDINATOR.0
    }
}

/// Button-driven node ID selection backed by a [`NodeStore`].
///
/// Every change performs exactly one persistence write of the new value.
pub struct NodeSelector<S> {
    store: S,
    current: NodeId,
}

impl<S: NodeStore> NodeSelector<S> {
    /// Creates a selector at the coordinator ID; call
    /// [`restore`](Self::restore) to load the persisted value.
    pub fn new(store: S) -> Self {
        Self {
            store,
            current: NodeId::COORDINATOR,
        }
    }

    /// Loads the persisted ID. Out-of-range values are treated as corrupt
    /// and replaced with 0; a failed read leaves the current ID in place.
    pub fn restore(&mut self) -> Result<NodeId, S::Error> {
        let raw = self.store.read(NODE_ID_ADDRESS)?;
        self.current = NodeId::from_stored(raw);
        Ok(self.current)
    }

    pub fn current(&self) -> NodeId {
        self.current
    }

    pub fn increment(&mut self) -> Result<NodeId, S::Error> {
        self.change(self.current.next())
    }

    pub fn decrement(&mut self) -> Result<NodeId, S::Error> {
        self.change(self.current.prev())
    }

    /// Switches to `id` and persists it. The in-memory ID changes even if
    /// the write fails.
    fn change(&mut self, id: NodeId) -> Result<NodeId, S::Error> {
        self.current = id;
        self.store.write(NODE_ID_ADDRESS, id.get())?;
        Ok(id)
    }
}
