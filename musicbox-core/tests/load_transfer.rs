mod common;

use musicbox_core::{FrameEvent, MAX_NOTES, NodeId, NoteEntry, Response, SharedState};
use proptest::prelude::*;

use common::{checksum, load_frame, raw_load_frame};

fn entry_strategy() -> impl Strategy<Value = NoteEntry> {
    (any::<u8>(), any::<u16>()).prop_map(|(pitch, duration)| NoteEntry::new(pitch, duration))
}

fn song_strategy() -> impl Strategy<Value = Vec<NoteEntry>> {
    prop::collection::vec(entry_strategy(), 0..64)
}

fn preload(state: &SharedState, bus: &mut musicbox_core::BusPort<'_>, node: u8, entries: &[NoteEntry]) {
    for byte in load_frame(node, entries) {
        bus.on_byte(byte);
    }
    assert!(state.data_ready());
}

proptest! {
    #[test]
    fn valid_load_is_acknowledged_and_stored(node in 0u8..16, entries in song_strategy()) {
        let state = SharedState::new();
        let (mut bus, mut player, responses) = state.split().unwrap();
        player.set_node_id(NodeId::new(node).unwrap()).unwrap();

        for byte in load_frame(node, &entries) {
            bus.on_byte(byte);
        }

        prop_assert_eq!(responses.try_next(), Some(Response::LoadOk));
        prop_assert_eq!(responses.try_next(), None);
        prop_assert!(state.data_ready());
        prop_assert_eq!(state.song_len(), entries.len());
        for (pos, entry) in entries.iter().enumerate() {
            prop_assert_eq!(state.song_entry(pos as u16), Some(*entry));
        }
    }

    #[test]
    fn corrupted_check_byte_is_rejected(
        node in 0u8..16,
        entries in song_strategy(),
        flip in 1u8..=255,
    ) {
        let state = SharedState::new();
        let (mut bus, mut player, responses) = state.split().unwrap();
        player.set_node_id(NodeId::new(node).unwrap()).unwrap();

        let mut frame = load_frame(node, &entries);
        if let Some(check) = frame.last_mut() {
            *check ^= flip;
        }
        for byte in frame {
            bus.on_byte(byte);
        }

        prop_assert_eq!(responses.try_next(), Some(Response::ChecksumMismatch));
        prop_assert!(!state.data_ready());
    }

    #[test]
    fn oversize_load_reports_size_and_keeps_song(
        node in 0u8..16,
        extra in 0u16..600,
        fill in any::<u8>(),
        check in any::<u8>(),
    ) {
        let state = SharedState::new();
        let (mut bus, mut player, responses) = state.split().unwrap();
        player.set_node_id(NodeId::new(node).unwrap()).unwrap();
        let original = [NoteEntry::new(60, 100), NoteEntry::end()];
        preload(&state, &mut bus, node, &original);
        responses.try_next();

        let declared = (MAX_NOTES as u16 + 1) * 3 + extra;
        let payload = vec![fill; declared as usize];
        for byte in raw_load_frame(node, declared, &payload, check) {
            bus.on_byte(byte);
        }

        prop_assert_eq!(responses.try_next(), Some(Response::SizeExceeded));
        prop_assert!(!state.data_ready());
        prop_assert_eq!(state.song_len(), original.len());
        prop_assert_eq!(state.song_entry(0), Some(original[0]));
    }

    #[test]
    fn foreign_load_is_silent(
        node in 0u8..16,
        offset in 1u8..16,
        entries in song_strategy(),
        corrupt in any::<bool>(),
    ) {
        let state = SharedState::new();
        let (mut bus, mut player, responses) = state.split().unwrap();
        player.set_node_id(NodeId::new(node).unwrap()).unwrap();
        let original = [NoteEntry::new(72, 5), NoteEntry::rest(5), NoteEntry::end()];
        preload(&state, &mut bus, node, &original);
        responses.try_next();

        let target = (node + offset) & 0x0F;
        let mut frame = load_frame(target, &entries);
        if corrupt {
            if let Some(check) = frame.last_mut() {
                *check ^= 0xFF;
            }
        }
        let mut events = Vec::new();
        for byte in frame {
            events.extend(bus.on_byte(byte));
        }

        prop_assert_eq!(
            events,
            vec![FrameEvent::LoadStarted { addressed: false }, FrameEvent::Skipped]
        );
        prop_assert_eq!(responses.try_next(), None);
        // Any load header on the bus invalidates the committed song.
        prop_assert!(!state.data_ready());
        prop_assert_eq!(state.song_len(), original.len());
        for (pos, entry) in original.iter().enumerate() {
            prop_assert_eq!(state.song_entry(pos as u16), Some(*entry));
        }
    }
}

#[test]
fn largest_declared_length_is_consumed_in_full() {
    let state = SharedState::new();
    let (mut bus, _player, responses) = state.split().unwrap();
    let payload = vec![0xAA; u16::MAX as usize];
    for byte in raw_load_frame(0, u16::MAX, &payload, checksum(&payload)) {
        bus.on_byte(byte);
    }
    assert_eq!(responses.try_next(), Some(Response::SizeExceeded));

    // The very next byte is read as a fresh header.
    assert_eq!(
        bus.on_byte(common::command(4, 0)),
        Some(FrameEvent::Header(musicbox_core::Header::new(4, 0)))
    );
}

#[test]
fn full_capacity_load_fits() {
    let state = SharedState::new();
    let (mut bus, _player, responses) = state.split().unwrap();
    let entries: Vec<NoteEntry> = (0..MAX_NOTES).map(|i| NoteEntry::new((i % 128) as u8, i as u16)).collect();
    for byte in load_frame(0, &entries) {
        bus.on_byte(byte);
    }
    assert_eq!(responses.try_next(), Some(Response::LoadOk));
    assert_eq!(state.song_len(), MAX_NOTES);
    assert_eq!(state.song_entry((MAX_NOTES - 1) as u16), entries.last().copied());
}

#[test]
fn failed_load_recovers_on_next_frame() {
    let state = SharedState::new();
    let (mut bus, _player, responses) = state.split().unwrap();
    let entries = [NoteEntry::new(64, 200), NoteEntry::end()];

    let mut bad = load_frame(0, &entries);
    if let Some(check) = bad.last_mut() {
        *check = check.wrapping_add(1);
    }
    for byte in bad {
        bus.on_byte(byte);
    }
    assert_eq!(responses.try_next(), Some(Response::ChecksumMismatch));
    assert!(!state.data_ready());

    for byte in load_frame(0, &entries) {
        bus.on_byte(byte);
    }
    assert_eq!(responses.try_next(), Some(Response::LoadOk));
    assert!(state.data_ready());
}
