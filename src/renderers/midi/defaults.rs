//! Default values for MIDI export

use crate::models::DEFAULT_QPM;

/// Tempo written when the document has none
pub const DEFAULT_TEMPO_QPM: f64 = DEFAULT_QPM;

/// Ticks per quarter note
pub const DEFAULT_TPQ: u16 = 480;

/// General MIDI percussion channel (10 in 1-indexed terms)
pub const DRUM_CHANNEL: u8 = 9;

/// Assign a MIDI channel to the `part_index`-th melodic track
/// - Channels 0-15 are available
/// - Channel 9 is reserved for drums and skipped
pub fn assign_channel(part_index: usize) -> u8 {
    let channel = part_index % 16;
    if channel >= 9 {
        ((channel + 1) % 16) as u8
    } else {
        channel as u8
    }
}

/// Clamp a value into the 7-bit MIDI data range
pub fn clamp_u7(value: i64) -> u8 {
    value.clamp(0, 127) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assign_channel() {
        assert_eq!(assign_channel(0), 0);
        assert_eq!(assign_channel(8), 8);
        assert_eq!(assign_channel(9), 10);
        assert_eq!(assign_channel(14), 15);
        assert_eq!(assign_channel(15), 0);
        assert!((0..64).all(|index| assign_channel(index) != DRUM_CHANNEL));
    }

    #[test]
    fn test_clamp_u7() {
        assert_eq!(clamp_u7(-3), 0);
        assert_eq!(clamp_u7(64), 64);
        assert_eq!(clamp_u7(300), 127);
    }
}
