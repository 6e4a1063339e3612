//! Frame builders shared by the integration tests.

#![allow(dead_code)]

use musicbox_core::{Header, NoteEntry};

/// Encodes a load frame for `target` carrying `entries`, with the correct
/// check byte.
pub fn load_frame(target: u8, entries: &[NoteEntry]) -> Vec<u8> {
    let mut payload = Vec::with_capacity(entries.len() * 3);
    for entry in entries {
        payload.push(entry.pitch);
        payload.extend_from_slice(&entry.duration.to_be_bytes());
    }
    raw_load_frame(target, payload.len() as u16, &payload, checksum(&payload))
}

/// Encodes a load frame with an explicit declared length and check byte.
pub fn raw_load_frame(target: u8, declared: u16, payload: &[u8], check: u8) -> Vec<u8> {
    let mut frame = vec![Header::new(1, target).to_byte()];
    frame.extend_from_slice(&declared.to_be_bytes());
    frame.extend_from_slice(payload);
    frame.push(check);
    frame
}

pub fn checksum(payload: &[u8]) -> u8 {
    payload.iter().fold(0, |acc, b| acc ^ b)
}

pub fn command(event: u8, param: u8) -> u8 {
    Header::new(event, param).to_byte()
}
