//! Static lookup tables.
//!
//! The pitch tables hold timer reload values for MIDI note numbers 0-127.
//! They were generated for a timer clocked at 11.0592 MHz with 12 clocks
//! per count that toggles the buzzer line on every overflow:
//!
//! ```text
//! f      = 440 * 2^((n - 69) / 12)
//! counts = floor(F_TIMER / (2 * TIMER_CYCLE * f))
//! reload = 65536 - counts
//! ```
//!
//! The reload value stays the source of truth for pitch on any target;
//! [`TimerReload::tone_hz`] converts it back into the square-wave frequency
//! it produces so a PWM timer can be programmed from it.

/// Clock feeding the reference tone timer, in Hz.
pub const F_TIMER: u32 = 11_059_200;

/// System clocks per timer count.
pub const TIMER_CYCLE: u32 = 12;

/// Reload value used where a pitch has no representable period.
pub const SILENT_RELOAD: u16 = 0xFFFF;

/// High byte of the timer reload value, indexed by pitch.
pub static PITCH_RELOAD_HIGH: [u8; 128] = [
    35, 48, 59, 70, 81, 91, 100, 109, 117, 125, 132, 139, 145, 152, 157, 163, 168, 173, 178,
    182, 186, 190, 194, 197, 200, 204, 206, 209, 212, 214, 217, 219, 221, 223, 225, 226, 228, 230,
    231, 232, 234, 235, 236, 237, 238, 239, 240, 241, 242, 243, 243, 244, 245, 245, 246, 246, 247,
    247, 248, 248, 249, 249, 249, 250, 250, 250, 251, 251, 251, 251, 252, 252, 252, 252, 252, 253,
    253, 253, 253, 253, 253, 253, 254, 254, 254, 254, 254, 254, 254, 254, 254, 254, 254, 254, 255,
    255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255,
    255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255,
];

/// Low byte of the timer reload value, indexed by pitch.
pub static PITCH_RELOAD_LOW: [u8; 128] = [
    215, 50, 220, 222, 66, 17, 83, 16, 79, 24, 113, 96, 236, 25, 238, 111, 161, 137, 42,
    136, 168, 140, 57, 176, 246, 13, 247, 184, 81, 197, 21, 68, 84, 70, 29, 216, 123, 7,
    124, 220, 41, 99, 139, 162, 170, 163, 143, 108, 62, 4, 190, 110, 21, 178, 70, 209, 85,
    210, 72, 182, 31, 130, 223, 55, 139, 217, 35, 105, 171, 233, 36, 91, 144, 193, 240, 28,
    70, 109, 146, 181, 214, 245, 18, 46, 72, 97, 120, 142, 163, 183, 201, 219, 235, 251, 9,
    23, 36, 49, 60, 71, 82, 92, 101, 110, 118, 126, 133, 140, 146, 153, 158, 164, 169, 174,
    179, 183, 187, 191, 195, 198, 201, 205, 207, 210, 213, 215, 218, 220,
];

/// Seven-segment codes for hex digits 0-F, followed by a blank digit.
pub static DIGIT_SEGMENTS: [u8; 17] = [
    0x3F, 0x06, 0x5B, 0x4F, 0x66, 0x6D, 0x7D, 0x07, 0x7F, 0x6F, 0x77, 0x7C, 0x39, 0x5E, 0x79, 0x71,
    0x00,
];

/// Index of the blank entry in [`DIGIT_SEGMENTS`].
pub const DIGIT_BLANK: usize = 16;

/// Timer reload value for one pitch, split into its register halves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimerReload {
    pub high: u8,
    pub low: u8,
}

impl TimerReload {
    /// Looks up the reload value for a playable pitch (0-127).
    pub fn for_pitch(pitch: u8) -> Option<Self> {
        let index = usize::from(pitch);
        Some(Self {
            high: *PITCH_RELOAD_HIGH.get(index)?,
            low: *PITCH_RELOAD_LOW.get(index)?,
        })
    }

    /// Full 16-bit reload value.
    pub const fn value(self) -> u16 {
        u16::from_be_bytes([self.high, self.low])
    }

    /// Timer counts between overflows.
    pub const fn counts(self) -> u32 {
        65_536 - self.value() as u32
    }

    /// Returns true for the reserved "no representable pitch" reload.
    pub const fn is_silent(self) -> bool {
        self.value() == SILENT_RELOAD
    }

    /// Frequency of the square wave this reload produces, in Hz.
    ///
    /// The output toggles once per overflow, so one period spans two
    /// overflows. Returns 0 for [`SILENT_RELOAD`].
    pub const fn tone_hz(self) -> u32 {
        if self.is_silent() {
            return 0;
        }
        F_TIMER / (2 * TIMER_CYCLE * self.counts())
    }
}

/// Segment code for a hex digit; anything above 0xF renders blank.
pub fn digit_segments(digit: u8) -> u8 {
    let index = usize::from(digit).min(DIGIT_BLANK);
    DIGIT_SEGMENTS[index]
}
