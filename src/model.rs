//! Session model for MusicXML → MIDI transcoding
//!
//! Not a full music object model - just the per-track state and transient
//! note values the encoders need, plus the pitch arithmetic that turns
//! `<step>`/`<octave>`/`<alter>` into a MIDI note number.

use std::collections::HashMap;

/// Ticks per quarter note declared in the header chunk.
///
/// MusicXML `<duration>` values are passed through as ticks unscaled, so
/// this is the resolution the output claims rather than a conversion
/// target.
pub const TICKS_PER_QUARTER: u16 = 384;

/// Playback volume, used as the note-on velocity (0-127).
///
/// The instrument model is fixed: every track plays at full volume.
pub const DEFAULT_VOLUME: u8 = 127;

/// MIDI channel used when a `score-part` declares none.
pub const DEFAULT_CHANNEL: u8 = 0;

/// MIDI program used when a `score-part` declares none
/// (0 = Acoustic Grand Piano in General MIDI).
pub const DEFAULT_PROGRAM: u8 = 0;

/// Per-part playback state, one per `<score-part>` declaration.
///
/// Built during the part-list pre-pass and read-only afterwards; the
/// matching `<part>` element is resolved back to this record through
/// [`TrackRegistry::get`].
#[derive(Debug, Clone)]
pub struct Track {
    pub index: usize,      // 0-based, in declaration order
    pub source_id: String, // the score-part's id attribute
    pub channel: u8,       // MIDI channel 0-15
    pub program: u8,       // MIDI program 0-127 (GM instrument)
    pub volume: u8,        // note-on velocity 0-127
}

impl Track {
    pub fn new(index: usize, source_id: String) -> Self {
        Track {
            index,
            source_id,
            channel: DEFAULT_CHANNEL,
            program: DEFAULT_PROGRAM,
            volume: DEFAULT_VOLUME,
        }
    }
}

/// Ordered, append-only collection of [`Track`]s for one document.
///
/// Tracks live in a `Vec` in declaration order with a side index from
/// source id to position. Fully populated before any part is encoded;
/// lookups never observe a half-built registry.
#[derive(Debug, Default)]
pub struct TrackRegistry {
    tracks: Vec<Track>,
    by_source: HashMap<String, usize>,
}

impl TrackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered tracks; this is the track count the header
    /// chunk advertises.
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    /// Append a track, preserving declaration order. When two score-parts
    /// share an id the first declaration wins the lookup.
    pub fn push(&mut self, track: Track) {
        self.by_source
            .entry(track.source_id.clone())
            .or_insert(self.tracks.len());
        self.tracks.push(track);
    }

    pub fn get(&self, source_id: &str) -> Option<&Track> {
        self.by_source.get(source_id).map(|&i| &self.tracks[i])
    }
}

/// Transient value extracted from one `<note>` element.
///
/// `pitch` is present only when the element carries a `<pitch>` child;
/// rests never do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteEvent {
    pub rest: bool,
    pub duration: u32, // raw MusicXML duration units, used as ticks
    pub pitch: Option<u8>,
}

/// Convert a MusicXML pitch to a MIDI note number.
///
/// The step letter is folded case-insensitively onto its alphabetical
/// index (A..G → 0..6) and the note is anchored so that C4 = middle C =
/// 60: `12 * (octave + 1) + index + alter - 2`, where the `-2` squares
/// the A-based letter index with the C-based octave anchor. Results are
/// clamped to the valid MIDI range.
///
/// # Arguments
/// * `step` - Note letter (`A`-`G`, either case)
/// * `octave` - Octave number (C4 = middle C)
/// * `alter` - Semitone alteration (-1 = flat, 0 = natural, 1 = sharp)
pub fn pitch_to_midi(step: char, octave: i32, alter: i32) -> u8 {
    let note = 12 * (octave + 1) + step_index(step) + alter - 2;
    note.clamp(0, 127) as u8
}

/// Alphabetical index of a step letter: 0 for `A`/`a` through 6 for
/// `G`/`g`. Letters outside that range still resolve to their ordinal
/// distance rather than failing.
fn step_index(step: char) -> i32 {
    let c = step as i32;
    if c >= 97 {
        c - 97 // lowercase
    } else {
        c - 65
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pitch_to_midi_anchor() {
        assert_eq!(pitch_to_midi('C', 4, 0), 60); // Middle C
        assert_eq!(pitch_to_midi('C', 4, 1), 61); // C#
        assert_eq!(pitch_to_midi('C', 4, -1), 59); // Cb
    }

    #[test]
    fn test_pitch_to_midi_case_insensitive() {
        assert_eq!(pitch_to_midi('a', 3, 0), pitch_to_midi('A', 3, 0));
        assert_eq!(pitch_to_midi('c', 4, 0), pitch_to_midi('C', 4, 0));
        assert_eq!(pitch_to_midi('g', 5, 2), pitch_to_midi('G', 5, 2));
    }

    #[test]
    fn test_pitch_to_midi_letter_index() {
        // Letters map by alphabetical index, one number per letter.
        assert_eq!(pitch_to_midi('A', 3, 0), 46);
        assert_eq!(pitch_to_midi('B', 3, 0), 47);
        assert_eq!(pitch_to_midi('G', 3, 0), 52);
    }

    #[test]
    fn test_pitch_to_midi_octaves() {
        // One octave is always twelve numbers apart.
        assert_eq!(pitch_to_midi('C', 5, 0), 72);
        assert_eq!(pitch_to_midi('C', 3, 0), 48);
        assert_eq!(
            pitch_to_midi('E', 6, 0) - pitch_to_midi('E', 5, 0),
            12
        );
    }

    #[test]
    fn test_pitch_to_midi_clamping() {
        assert_eq!(pitch_to_midi('A', -4, 0), 0); // below MIDI range
        assert_eq!(pitch_to_midi('G', 12, 0), 127); // above MIDI range
    }

    #[test]
    fn test_registry_preserves_declaration_order() {
        let mut registry = TrackRegistry::new();
        registry.push(Track::new(0, "P1".to_string()));
        registry.push(Track::new(1, "P2".to_string()));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("P1").unwrap().index, 0);
        assert_eq!(registry.get("P2").unwrap().index, 1);
        assert!(registry.get("P3").is_none());
    }

    #[test]
    fn test_registry_duplicate_id_first_wins() {
        let mut registry = TrackRegistry::new();
        let mut first = Track::new(0, "P1".to_string());
        first.program = 40;
        registry.push(first);
        registry.push(Track::new(1, "P1".to_string()));

        // Both tracks are kept (the header counts two), but lookups
        // resolve to the first declaration.
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("P1").unwrap().program, 40);
    }

    #[test]
    fn test_track_defaults() {
        let track = Track::new(0, "P1".to_string());
        assert_eq!(track.channel, 0);
        assert_eq!(track.program, 0);
        assert_eq!(track.volume, 127);
    }
}
