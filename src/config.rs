//! Compile-time configuration for the music box node.

/// RS-485 bus speed, 8N1.
pub const BUS_BAUD_RATE: u32 = 115_200;

/// Interrupt-side receive ring size. Holds a burst of payload while the
/// receive task is catching up.
pub const BUS_RX_BUFFER_LEN: usize = 64;

/// Interrupt-side transmit ring size. Responses are single bytes.
pub const BUS_TX_BUFFER_LEN: usize = 8;

/// Most response bytes sent in one bus turnaround.
pub const BUS_TX_BATCH_LEN: usize = 4;

/// Bytes pulled from the receive ring per read.
pub const BUS_RX_CHUNK_LEN: usize = 16;

/// Settle time before a button press is confirmed.
pub const BUTTON_DEBOUNCE_MS: u64 = 10;

/// Flash page reserved at the top of flash for the node ID. Must equal the
/// flash erase size.
pub const STORE_PAGE_SIZE: usize = 128;

/// PWM frequency the buzzer timer is configured with before the first note.
pub const BUZZER_IDLE_HZ: u32 = 1_000;

/// Boot delay that keeps the debug probe attached.
#[cfg(feature = "debug-mode")]
pub const DEBUGGER_ATTACH_SECS: u64 = 3;
