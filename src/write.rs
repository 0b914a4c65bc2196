//! Standard MIDI File byte assembly
//!
//! Hand-rolled format 1 writer: a 14-byte header chunk plus one `MTrk`
//! chunk per track, built through [`TrackChunk`] so the chunk length can
//! be patched in once the body is complete. Events are appended exactly
//! as requested: no running status, every event carries its own status
//! byte.

use crate::model::TICKS_PER_QUARTER;

/// MIDI clocks per metronome click in the time signature meta-event.
const CLOCKS_PER_CLICK: u8 = 24;

/// Notated 32nd notes per MIDI quarter note in the time signature
/// meta-event.
const NOTATED_32NDS_PER_QUARTER: u8 = 8;

/// Largest value a variable-length quantity can carry (28 bits).
const VLQ_MAX: u32 = 0x0FFF_FFFF;

/// Build the 14-byte `MThd` chunk for a format 1 file with the given
/// number of tracks.
pub fn header_chunk(num_tracks: u16) -> Vec<u8> {
    let mut buf = Vec::with_capacity(14);
    buf.extend_from_slice(b"MThd");
    buf.extend_from_slice(&6u32.to_be_bytes()); // header length, always 6
    buf.extend_from_slice(&1u16.to_be_bytes()); // format 1
    buf.extend_from_slice(&num_tracks.to_be_bytes());
    buf.extend_from_slice(&TICKS_PER_QUARTER.to_be_bytes());
    buf
}

/// One `MTrk` chunk under construction.
///
/// Two-pass: events accumulate in a buffer behind a zeroed length field,
/// and [`finish`](TrackChunk::finish) patches the real length in before
/// handing the bytes back. Dropping a chunk without finishing it emits
/// nothing.
pub struct TrackChunk {
    buf: Vec<u8>,
}

impl TrackChunk {
    pub fn new() -> Self {
        let mut buf = Vec::with_capacity(64);
        buf.extend_from_slice(b"MTrk");
        buf.extend_from_slice(&[0, 0, 0, 0]); // length, patched in finish()
        TrackChunk { buf }
    }

    /// Program change at delta 0 on the given channel.
    pub fn program_change(&mut self, channel: u8, program: u8) {
        self.buf
            .extend_from_slice(&[0x00, 0xC0 | (channel & 0x0F), program & 0x7F]);
    }

    /// Time signature meta-event at delta 0.
    ///
    /// The denominator byte carries the beat type as notated (4 means 4)
    /// rather than the power-of-two encoding; players that honor the
    /// field literally read it back unchanged.
    pub fn time_signature(&mut self, beats: u8, beat_type: u8) {
        self.buf.extend_from_slice(&[
            0x00,
            0xFF,
            0x58,
            0x04,
            beats,
            beat_type,
            CLOCKS_PER_CLICK,
            NOTATED_32NDS_PER_QUARTER,
        ]);
    }

    /// Key signature meta-event at delta 0. Negative `fifths` (flat
    /// keys) pass through as their two's-complement byte; mode is always
    /// major.
    pub fn key_signature(&mut self, fifths: i8) {
        self.buf
            .extend_from_slice(&[0x00, 0xFF, 0x59, 0x02, fifths as u8, 0x00]);
    }

    /// A sounding note: note-on after `delta` ticks, note-off `duration`
    /// ticks later. The note-off is written as a true 0x8n event with
    /// velocity 0.
    pub fn note_pair(&mut self, delta: u32, duration: u32, key: u8, velocity: u8, channel: u8) {
        push_vlq(&mut self.buf, delta);
        self.buf
            .extend_from_slice(&[0x90 | (channel & 0x0F), key & 0x7F, velocity & 0x7F]);
        push_vlq(&mut self.buf, duration);
        self.buf
            .extend_from_slice(&[0x80 | (channel & 0x0F), key & 0x7F, 0x00]);
    }

    /// Mandatory end-of-track meta-event at delta 0.
    pub fn end_of_track(&mut self) {
        self.buf.extend_from_slice(&[0x00, 0xFF, 0x2F, 0x00]);
    }

    /// Patch the length field and return the finished chunk bytes.
    pub fn finish(mut self) -> Vec<u8> {
        let body_len = (self.buf.len() - 8) as u32;
        self.buf[4..8].copy_from_slice(&body_len.to_be_bytes());
        self.buf
    }
}

impl Default for TrackChunk {
    fn default() -> Self {
        Self::new()
    }
}

/// Append `value` as a variable-length quantity: 7 bits per byte, high
/// bit set on every byte but the last. Values beyond the 28-bit format
/// limit are clamped rather than wrapped.
fn push_vlq(buf: &mut Vec<u8>, value: u32) {
    let mut value = value.min(VLQ_MAX);
    let mut stack = [0u8; 4];
    let mut n = 0;
    loop {
        stack[n] = (value & 0x7F) as u8;
        value >>= 7;
        n += 1;
        if value == 0 {
            break;
        }
    }
    while n > 1 {
        n -= 1;
        buf.push(stack[n] | 0x80);
    }
    buf.push(stack[0]);
}
