//! Document traversal and event encoding
//!
//! Walks a parsed `score-partwise` document top-down and appends SMF
//! bytes as the interesting elements go by. The `<part-list>` is
//! encoded first in document order, which fills the track registry and
//! emits the header chunk; each `<part>` then becomes one track chunk,
//! or nothing when its id never appeared in the part-list.

use roxmltree::{Document, Node};

use crate::model::{pitch_to_midi, NoteEvent, Track, TrackRegistry};
use crate::write::{header_chunk, TrackChunk};

/// One transcoding session. Holds the registry built from the
/// part-list; a fresh session is created per document.
pub(crate) struct Transcoder {
    registry: TrackRegistry,
}

impl Transcoder {
    pub(crate) fn new() -> Self {
        Transcoder {
            registry: TrackRegistry::new(),
        }
    }

    /// Encode the whole document into an SMF byte stream.
    pub(crate) fn transcode(mut self, doc: &Document) -> Vec<u8> {
        let mut out = Vec::new();
        self.walk(doc.root(), &mut out);
        out
    }

    /// Recursive dispatch: encode the elements we understand, descend
    /// through the ones we don't.
    fn walk(&mut self, node: Node, out: &mut Vec<u8>) {
        for child in node.children().filter(|n| n.is_element()) {
            match child.tag_name().name() {
                "part-list" => self.encode_part_list(child, out),
                "part" => self.encode_part(child, out),
                _ => self.walk(child, out),
            }
        }
    }

    /// Register every `<score-part>`, then emit the header chunk
    /// counting one track per registration.
    fn encode_part_list(&mut self, node: Node, out: &mut Vec<u8>) {
        for score_part in node
            .children()
            .filter(|n| n.tag_name().name() == "score-part")
        {
            self.register_score_part(score_part);
        }
        log::debug!(
            "part-list registered {} track(s), emitting header",
            self.registry.len()
        );
        out.extend_from_slice(&header_chunk(self.registry.len() as u16));
    }

    /// Read one `<score-part>` declaration into the registry. Channel
    /// and program come from the nested `<midi-instrument>` when
    /// present; everything else keeps the track defaults.
    fn register_score_part(&mut self, node: Node) {
        let source_id = node.attribute("id").unwrap_or_default().to_string();
        let mut track = Track::new(self.registry.len(), source_id);

        for instrument in node
            .children()
            .filter(|n| n.tag_name().name() == "midi-instrument")
        {
            if let Some(channel) = instrument
                .children()
                .find(|n| n.tag_name().name() == "midi-channel")
                .and_then(|n| n.text())
                .and_then(|t| t.trim().parse::<u8>().ok())
            {
                track.channel = channel;
            }
            if let Some(program) = instrument
                .children()
                .find(|n| n.tag_name().name() == "midi-program")
                .and_then(|n| n.text())
                .and_then(|t| t.trim().parse::<u8>().ok())
            {
                track.program = program;
            }
        }

        log::debug!(
            "score-part {:?} -> channel {} program {}",
            track.source_id,
            track.channel,
            track.program
        );
        self.registry.push(track);
    }

    /// Encode one `<part>` as a complete track chunk, or nothing when
    /// the part has no score-part declaration to play it with.
    fn encode_part(&self, node: Node, out: &mut Vec<u8>) {
        let id = node.attribute("id").unwrap_or_default();
        let track = match self.registry.get(id) {
            Some(track) => track,
            None => {
                log::warn!(
                    "part {:?} has no matching score-part; it will not be heard",
                    id
                );
                return;
            }
        };
        log::debug!("encoding part {:?} as track {}", id, track.index);

        let mut chunk = TrackChunk::new();
        chunk.program_change(track.channel, track.program);

        // Rests don't become events; their duration is carried into the
        // delta-time of the next sounding note.
        let mut pending: u32 = 0;
        for measure in node.children().filter(|n| n.tag_name().name() == "measure") {
            for child in measure.children().filter(|n| n.is_element()) {
                match child.tag_name().name() {
                    "attributes" => encode_attributes(child, &mut chunk),
                    "note" => {
                        let note = extract_note(child);
                        if note.rest {
                            log::trace!("rest for {} ticks", note.duration);
                            pending = pending.saturating_add(note.duration);
                        } else {
                            log::trace!(
                                "note {} for {} ticks after {}",
                                note.pitch.unwrap_or(0),
                                note.duration,
                                pending
                            );
                            chunk.note_pair(
                                pending,
                                note.duration,
                                note.pitch.unwrap_or(0),
                                track.volume,
                                track.channel,
                            );
                            pending = 0;
                        }
                    }
                    _ => {}
                }
            }
        }

        chunk.end_of_track();
        out.extend_from_slice(&chunk.finish());
    }
}

/// Encode the children of one `<attributes>` element in document order.
/// A `<time>` is written only when both beats and beat-type are present
/// and nonzero; a `<key>` is always written, defaulting to C major.
fn encode_attributes(node: Node, chunk: &mut TrackChunk) {
    for child in node.children().filter(|n| n.is_element()) {
        match child.tag_name().name() {
            "time" => {
                let beats = child
                    .children()
                    .find(|n| n.tag_name().name() == "beats")
                    .and_then(|n| n.text())
                    .and_then(|t| t.trim().parse::<u8>().ok())
                    .unwrap_or(0);
                let beat_type = child
                    .children()
                    .find(|n| n.tag_name().name() == "beat-type")
                    .and_then(|n| n.text())
                    .and_then(|t| t.trim().parse::<u8>().ok())
                    .unwrap_or(0);
                if beats != 0 && beat_type != 0 {
                    chunk.time_signature(beats, beat_type);
                }
            }
            "key" => {
                let fifths = child
                    .children()
                    .find(|n| n.tag_name().name() == "fifths")
                    .and_then(|n| n.text())
                    .and_then(|t| t.trim().parse::<i8>().ok())
                    .unwrap_or(0);
                chunk.key_signature(fifths);
            }
            _ => {}
        }
    }
}

/// Pull duration, rest flag, and pitch out of one `<note>` element.
fn extract_note(node: Node) -> NoteEvent {
    let duration = node
        .children()
        .find(|n| n.tag_name().name() == "duration")
        .and_then(|n| n.text())
        .and_then(|t| t.trim().parse::<u32>().ok())
        .unwrap_or(0);
    let rest = node.children().any(|n| n.tag_name().name() == "rest");
    let pitch = node
        .children()
        .find(|n| n.tag_name().name() == "pitch")
        .map(extract_pitch);

    NoteEvent {
        rest,
        duration,
        pitch,
    }
}

/// Resolve a `<pitch>` element to its MIDI note number.
fn extract_pitch(node: Node) -> u8 {
    let step = node
        .children()
        .find(|n| n.tag_name().name() == "step")
        .and_then(|n| n.text())
        .and_then(|t| t.trim().chars().next())
        .unwrap_or('A');
    let octave = node
        .children()
        .find(|n| n.tag_name().name() == "octave")
        .and_then(|n| n.text())
        .and_then(|t| t.trim().parse::<i32>().ok())
        .unwrap_or(0);
    let alter = node
        .children()
        .find(|n| n.tag_name().name() == "alter")
        .and_then(|n| n.text())
        .and_then(|t| t.trim().parse::<i32>().ok())
        .unwrap_or(0);

    pitch_to_midi(step, octave, alter)
}
