mod common;

use musicbox_core::{Mode, NodeId, NoteEntry, Response, SharedState, Step};

use common::{command, load_frame};

const START_ALL: u8 = 3;
const STOP_ALL: u8 = 4;
const START: u8 = 5;
const STOP: u8 = 6;
const SYNC_ACK: u8 = 8;

fn send(bus: &mut musicbox_core::BusPort<'_>, bytes: &[u8]) {
    for &byte in bytes {
        bus.on_byte(byte);
    }
}

#[test]
fn tone_rest_end() {
    let state = SharedState::new();
    let (mut bus, mut player, responses) = state.split().unwrap();
    player.set_node_id(NodeId::new(3).unwrap()).unwrap();

    let song = [NoteEntry::new(60, 100), NoteEntry::rest(50), NoteEntry::end()];
    send(&mut bus, &load_frame(3, &song));
    send(&mut bus, &[command(START_ALL, 0)]);
    assert_eq!(responses.try_next(), Some(Response::LoadOk));

    match player.step() {
        Step::Tone {
            pitch,
            reload,
            duration,
        } => {
            assert_eq!(pitch, 60);
            assert_eq!(duration, 100);
            assert!(reload.tone_hz() > 0);
        }
        other => panic!("expected tone, got {:?}", other),
    }
    assert_eq!(player.step(), Step::Rest { duration: 50 });
    assert_eq!(player.step(), Step::Ended { notify: None });
    assert_eq!(player.playback().cursor(), 0);
    assert!(!player.playback().is_music_playing());
    assert_eq!(player.mode(), Mode::Configuring);

    // Not the coordinator: nothing announced.
    assert_eq!(responses.try_next(), None);
}

#[test]
fn coordinator_waits_at_barrier_until_sync_ack() {
    let state = SharedState::new();
    let (mut bus, mut player, responses) = state.split().unwrap();

    let song = [
        NoteEntry::new(60, 10),
        NoteEntry::new(62, 10),
        NoteEntry::sync_barrier(),
        NoteEntry::new(64, 10),
        NoteEntry::end(),
    ];
    send(&mut bus, &load_frame(0, &song));
    send(&mut bus, &[command(START_ALL, 0)]);
    assert_eq!(responses.try_next(), Some(Response::LoadOk));

    assert!(matches!(player.step(), Step::Tone { pitch: 60, .. }));
    assert!(matches!(player.step(), Step::Tone { pitch: 62, .. }));
    assert_eq!(
        player.step(),
        Step::SyncWait {
            notify: Some(Response::SyncReached)
        }
    );
    assert_eq!(responses.try_next(), Some(Response::SyncReached));
    assert!(player.playback().is_waiting_for_sync());
    assert_eq!(player.mode(), Mode::BlockedOnSync);

    // Nothing is consumed while blocked.
    for _ in 0..5 {
        assert_eq!(player.step(), Step::Idle);
    }
    assert_eq!(player.playback().cursor(), 3);

    send(&mut bus, &[command(SYNC_ACK, 0)]);
    assert!(matches!(player.step(), Step::Tone { pitch: 64, .. }));
    assert_eq!(
        player.step(),
        Step::Ended {
            notify: Some(Response::SongEnded)
        }
    );
    assert_eq!(responses.try_next(), Some(Response::SongEnded));
}

#[test]
fn stop_takes_effect_at_next_step() {
    let state = SharedState::new();
    let (mut bus, mut player, _responses) = state.split().unwrap();
    let song = [NoteEntry::new(60, 10), NoteEntry::new(61, 10), NoteEntry::end()];
    send(&mut bus, &load_frame(0, &song));
    send(&mut bus, &[command(START_ALL, 0)]);

    assert!(matches!(player.step(), Step::Tone { pitch: 60, .. }));
    send(&mut bus, &[command(STOP_ALL, 0)]);
    assert_eq!(player.step(), Step::Idle);
    assert_eq!(player.mode(), Mode::Configuring);
}

#[test]
fn stop_after_burst_of_commands_is_not_lost() {
    let state = SharedState::new();
    let (mut bus, mut player, _responses) = state.split().unwrap();
    send(&mut bus, &load_frame(0, &[NoteEntry::new(60, 60_000), NoteEntry::end()]));
    send(&mut bus, &[command(START_ALL, 0)]);
    assert!(matches!(player.step(), Step::Tone { duration: 60_000, .. }));

    // Host chatter while the long note sounds, then a stop.
    for _ in 0..16 {
        send(&mut bus, &[command(SYNC_ACK, 0), command(START, 7)]);
    }
    send(&mut bus, &[command(STOP_ALL, 0)]);

    assert_eq!(player.drain_controls(), Mode::Configuring);
    assert_eq!(player.step(), Step::Idle);
}

#[test]
fn load_during_playback_stops_without_song_ended() {
    let state = SharedState::new();
    let (mut bus, mut player, responses) = state.split().unwrap();
    send(&mut bus, &load_frame(0, &[NoteEntry::new(60, 10), NoteEntry::new(62, 10), NoteEntry::end()]));
    assert_eq!(responses.try_next(), Some(Response::LoadOk));
    send(&mut bus, &[command(START_ALL, 0)]);
    assert!(matches!(player.step(), Step::Tone { pitch: 60, .. }));

    // Only the header and length of the next song have arrived.
    let next_song = [NoteEntry::new(70, 10), NoteEntry::end()];
    let frame = load_frame(0, &next_song);
    send(&mut bus, &frame[..3]);
    assert!(!state.data_ready());

    assert_eq!(player.step(), Step::Idle);
    assert_eq!(player.mode(), Mode::Configuring);
    assert_eq!(responses.try_next(), None);

    send(&mut bus, &frame[3..]);
    assert_eq!(responses.try_next(), Some(Response::LoadOk));
    send(&mut bus, &[command(START_ALL, 0)]);
    assert!(matches!(player.step(), Step::Tone { pitch: 70, .. }));
}

#[test]
fn foreign_load_during_playback_keeps_playing() {
    let state = SharedState::new();
    let (mut bus, mut player, _responses) = state.split().unwrap();
    send(&mut bus, &load_frame(0, &[NoteEntry::new(60, 10), NoteEntry::new(62, 10), NoteEntry::end()]));
    send(&mut bus, &[command(START_ALL, 0)]);
    assert!(matches!(player.step(), Step::Tone { pitch: 60, .. }));

    send(&mut bus, &load_frame(5, &[NoteEntry::new(70, 10)]));
    assert!(matches!(player.step(), Step::Tone { pitch: 62, .. }));
}

#[test]
fn stop_releases_sync_wait() {
    let state = SharedState::new();
    let (mut bus, mut player, _responses) = state.split().unwrap();
    player.set_node_id(NodeId::new(2).unwrap()).unwrap();
    send(&mut bus, &load_frame(2, &[NoteEntry::sync_barrier(), NoteEntry::end()]));
    send(&mut bus, &[command(START, 2)]);
    assert_eq!(player.step(), Step::SyncWait { notify: None });

    send(&mut bus, &[command(STOP, 2)]);
    assert_eq!(player.drain_controls(), Mode::Configuring);
    assert!(!player.playback().is_waiting_for_sync());
}

#[test]
fn unicast_for_other_node_is_ignored() {
    let state = SharedState::new();
    let (mut bus, mut player, _responses) = state.split().unwrap();
    player.set_node_id(NodeId::new(9).unwrap()).unwrap();
    send(&mut bus, &load_frame(9, &[NoteEntry::new(60, 10), NoteEntry::end()]));

    send(&mut bus, &[command(START, 8)]);
    assert_eq!(player.step(), Step::Idle);

    send(&mut bus, &[command(START, 9)]);
    assert!(matches!(player.step(), Step::Tone { pitch: 60, .. }));

    send(&mut bus, &[command(STOP, 8)]);
    assert_eq!(player.step(), Step::Ended { notify: None });
}

#[test]
fn start_queued_behind_load_sees_whole_song() {
    let state = SharedState::new();
    let (mut bus, mut player, _responses) = state.split().unwrap();
    let song: Vec<NoteEntry> = (0..40).map(|i| NoteEntry::new(40 + i, 5)).chain([NoteEntry::end()]).collect();

    // Load and start arrive back to back before the main loop runs.
    let mut bytes = load_frame(0, &song);
    bytes.push(command(START_ALL, 0));
    send(&mut bus, &bytes);

    for expected in 40..80u8 {
        match player.step() {
            Step::Tone { pitch, .. } => assert_eq!(pitch, expected),
            other => panic!("expected tone {}, got {:?}", expected, other),
        }
    }
    assert!(matches!(player.step(), Step::Ended { .. }));
}

#[test]
fn restart_while_playing_rewinds() {
    let state = SharedState::new();
    let (mut bus, mut player, _responses) = state.split().unwrap();
    send(&mut bus, &load_frame(0, &[NoteEntry::new(60, 1), NoteEntry::new(62, 1), NoteEntry::end()]));
    send(&mut bus, &[command(START_ALL, 0)]);
    assert!(matches!(player.step(), Step::Tone { pitch: 60, .. }));
    send(&mut bus, &[command(START_ALL, 0)]);
    assert!(matches!(player.step(), Step::Tone { pitch: 60, .. }));
}

#[test]
fn host_traffic_changes_nothing() {
    let state = SharedState::new();
    let (mut bus, mut player, responses) = state.split().unwrap();
    send(&mut bus, &[0x00, command(2, 0), command(7, 3), 0xE0, 0xF1, 0x20, 0x70]);
    assert_eq!(player.drain_controls(), Mode::Configuring);
    assert_eq!(responses.try_next(), None);
}
