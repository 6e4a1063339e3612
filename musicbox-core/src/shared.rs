//! State shared between the bus receive path and the main loop.
//!
//! [`SharedState`] is meant to live in a `static`. It is split exactly once
//! into three ports, each moved into the one context allowed to use it:
//!
//! | Port | Context | Writes | Reads |
//! |---|---|---|---|
//! | [`BusPort`] | bus receive task | song buffer, data-ready, pending controls, responses | node ID |
//! | [`PlayerPort`] | main loop | node ID, responses; owns mode and cursor | song buffer, pending controls |
//! | [`ResponsePort`] | bus transmit task | | responses |
//!
//! Every field therefore has one writer, and the playback mode and cursor
//! are not shared at all: the bus posts [`Control`] values into a latch
//! instead of flipping flags. Start and Stop override each other, so the
//! latch keeps the latest of the two plus a pending sync acknowledgement.
//! No control is ever lost, however many arrive during one note. Song
//! writes happen before any later control is posted, so a start always
//! sees a finished load.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use portable_atomic::{AtomicBool, AtomicU8, Ordering};

use crate::dispatch::{Control, dispatch};
use crate::error::NodeError;
use crate::frame::{FrameEvent, FrameReceiver, Response};
use crate::node::NodeId;
use crate::playback::{Mode, Playback, Step};
use crate::song::{NoteEntry, SongBuffer};

/// Pending outbound response bytes.
pub const RESPONSE_QUEUE_DEPTH: usize = 4;

const PENDING_START: u8 = 1 << 0;
const PENDING_STOP: u8 = 1 << 1;
const PENDING_SYNC_ACK: u8 = 1 << 2;

/// Controls posted by the bus since the main loop last looked.
struct ControlLatch {
    pending: AtomicU8,
    wake: Signal<CriticalSectionRawMutex, ()>,
}

impl ControlLatch {
    const fn new() -> Self {
        Self {
            pending: AtomicU8::new(0),
            wake: Signal::new(),
        }
    }

    fn post(&self, control: Control) {
        let (set, clear) = match control {
            Control::Start => (PENDING_START, PENDING_STOP),
            Control::Stop => (PENDING_STOP, PENDING_START),
            Control::SyncAck => (PENDING_SYNC_ACK, 0),
        };
        let _ = self
            .pending
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |bits| Some((bits & !clear) | set));
        self.wake.signal(());
    }

    fn take(&self) -> PendingControls {
        PendingControls(self.pending.swap(0, Ordering::AcqRel))
    }
}

/// Snapshot of a [`ControlLatch`].
#[derive(Clone, Copy)]
struct PendingControls(u8);

impl PendingControls {
    fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Start or Stop first, then the sync acknowledgement.
    fn controls(self) -> impl Iterator<Item = Control> {
        let run = if self.0 & PENDING_START != 0 {
            Some(Control::Start)
        } else if self.0 & PENDING_STOP != 0 {
            Some(Control::Stop)
        } else {
            None
        };
        run.into_iter()
            .chain((self.0 & PENDING_SYNC_ACK != 0).then_some(Control::SyncAck))
    }
}

/// Song buffer, flags, control latch and response queue for one node.
pub struct SharedState {
    song: Mutex<CriticalSectionRawMutex, RefCell<SongBuffer>>,
    node_id: AtomicU8,
    data_ready: AtomicBool,
    controls: ControlLatch,
    responses: Channel<CriticalSectionRawMutex, Response, RESPONSE_QUEUE_DEPTH>,
    split: AtomicBool,
}

impl SharedState {
    pub const fn new() -> Self {
        Self {
            song: Mutex::new(RefCell::new(SongBuffer::new())),
            node_id: AtomicU8::new(0),
            data_ready: AtomicBool::new(false),
            controls: ControlLatch::new(),
            responses: Channel::new(),
            split: AtomicBool::new(false),
        }
    }

    /// Hands out the three ports. Returns `None` on every call after the
    /// first.
    pub fn split(&self) -> Option<(BusPort<'_>, PlayerPort<'_>, ResponsePort<'_>)> {
        if self.split.swap(true, Ordering::AcqRel) {
            return None;
        }
        Some((
            BusPort {
                shared: self,
                receiver: FrameReceiver::new(),
            },
            PlayerPort {
                shared: self,
                playback: Playback::new(),
            },
            ResponsePort { shared: self },
        ))
    }

    pub fn node_id(&self) -> NodeId {
        NodeId::from_stored(self.node_id.load(Ordering::Acquire))
    }

    /// The last load seen on the bus was addressed here and committed.
    pub fn data_ready(&self) -> bool {
        self.data_ready.load(Ordering::Acquire)
    }

    /// Copy of the song entry at `pos`.
    pub fn song_entry(&self, pos: u16) -> Option<NoteEntry> {
        self.song.lock(|song| song.borrow().get(pos))
    }

    /// Number of entries currently loaded.
    pub fn song_len(&self) -> usize {
        self.song.lock(|song| song.borrow().len())
    }

    /// Queues a response without waiting; drops it if the queue is full.
    fn queue_response(&self, response: Response) {
        if self.responses.try_send(response).is_err() {
            #[cfg(feature = "defmt")]
            defmt::warn!("Response queue full, dropping {}", response);
        }
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}

/// Receive-side access: frame assembly, song writes and dispatch.
pub struct BusPort<'a> {
    shared: &'a SharedState,
    receiver: FrameReceiver,
}

impl BusPort<'_> {
    /// Processes one received byte. Never blocks.
    ///
    /// Every load header clears data-ready. A load addressed to this node
    /// also stops playback silently, since its buffer is about to be
    /// replaced.
    pub fn on_byte(&mut self, byte: u8) -> Option<FrameEvent> {
        let shared = self.shared;
        let node_id = shared.node_id();
        let receiver = &mut self.receiver;
        let event = shared
            .song
            .lock(|song| receiver.feed(byte, node_id, &mut song.borrow_mut()))?;

        match event {
            FrameEvent::LoadStarted { addressed } => {
                shared.data_ready.store(false, Ordering::Release);
                if addressed {
                    shared.controls.post(Control::Stop);
                }
            }
            FrameEvent::LoadComplete(response) => {
                shared
                    .data_ready
                    .store(response == Response::LoadOk, Ordering::Release);
                shared.queue_response(response);
            }
            FrameEvent::Header(header) => {
                if let Some(control) = dispatch(header, node_id) {
                    shared.controls.post(control);
                }
            }
            FrameEvent::Skipped => {}
        }
        Some(event)
    }

    /// Drops any partially received frame, e.g. after a UART error.
    ///
    /// Returns `true` if a frame was in flight.
    pub fn resync(&mut self) -> bool {
        let abandoned = !self.receiver.is_idle();
        self.receiver.reset();
        abandoned
    }
}

/// Main-loop access: owns the playback mode and cursor.
pub struct PlayerPort<'a> {
    shared: &'a SharedState,
    playback: Playback,
}

impl PlayerPort<'_> {
    pub fn mode(&self) -> Mode {
        self.playback.mode()
    }

    pub fn playback(&self) -> &Playback {
        &self.playback
    }

    pub fn node_id(&self) -> NodeId {
        self.shared.node_id()
    }

    pub fn data_ready(&self) -> bool {
        self.shared.data_ready()
    }

    /// Changes the node ID the bus side filters on.
    ///
    /// # Errors
    /// * [`NodeError::Busy`] unless the node is configuring
    pub fn set_node_id(&mut self, id: NodeId) -> Result<(), NodeError> {
        if self.playback.mode() != Mode::Configuring {
            return Err(NodeError::Busy);
        }
        self.shared.node_id.store(id.get(), Ordering::Release);
        Ok(())
    }

    /// Waits until the bus posts a control, applies everything pending and
    /// returns the new mode.
    pub async fn wait_control(&mut self) -> Mode {
        loop {
            if let Some(mode) = self.apply_pending() {
                return mode;
            }
            self.shared.controls.wake.wait().await;
        }
    }

    /// Applies whatever controls are pending.
    pub fn drain_controls(&mut self) -> Mode {
        self.apply_pending();
        self.playback.mode()
    }

    fn apply_pending(&mut self) -> Option<Mode> {
        let pending = self.shared.controls.take();
        if pending.is_empty() {
            return None;
        }
        for control in pending.controls() {
            self.playback.apply(control);
        }
        Some(self.playback.mode())
    }

    /// Applies pending controls, then consumes one song entry if playing.
    ///
    /// Coordinator notifications are queued for transmission here.
    pub fn step(&mut self) -> Step {
        self.drain_controls();
        let entry = self.shared.song_entry(self.playback.cursor());
        let step = self.playback.step(entry, self.shared.node_id());
        if let Some(response) = step.notification() {
            self.shared.queue_response(response);
        }
        step
    }
}

/// Transmit-side access: drains queued responses.
pub struct ResponsePort<'a> {
    shared: &'a SharedState,
}

impl ResponsePort<'_> {
    pub async fn next(&self) -> Response {
        self.shared.responses.receive().await
    }

    /// Next response if one is already queued.
    pub fn try_next(&self) -> Option<Response> {
        self.shared.responses.try_receive().ok()
    }
}
