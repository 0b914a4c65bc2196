//! MusicXML → Standard MIDI File transcoder
//!
//! Converts `score-partwise` MusicXML documents into format 1 SMF byte
//! streams. The `<part-list>` is encoded first and builds one track per
//! `<score-part>`; each `<part>` then becomes a track chunk of
//! program-change, time/key signature, and note events, with rest
//! durations folded into the next note's delta-time.
//!
//! Unplayable input degrades instead of failing: a `<part>` whose id
//! never appeared in the part-list is skipped with a warning, and
//! missing numeric fields fall back to defaults. The only error
//! surfaced to the caller is malformed XML.

mod model;
mod walk;
mod write;

pub use model::{pitch_to_midi, DEFAULT_VOLUME, TICKS_PER_QUARTER};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The input is not well-formed XML.
    #[error("xml parse error: {0}")]
    Xml(#[from] roxmltree::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Encode an already-parsed document as an SMF byte stream.
///
/// Structural problems inside the document produce warnings and
/// degraded output, never errors; a document with no `<part-list>`
/// encodes to an empty stream.
pub fn transcode(doc: &roxmltree::Document) -> Vec<u8> {
    walk::Transcoder::new().transcode(doc)
}

/// Parse `xml` and encode it in one step.
///
/// ```
/// let xml = r#"<score-partwise>
///   <part-list><score-part id="P1"/></part-list>
///   <part id="P1"><measure number="1">
///     <note><pitch><step>C</step><octave>4</octave></pitch><duration>96</duration></note>
///   </measure></part>
/// </score-partwise>"#;
/// let midi = musicxml2midi::musicxml_to_midi(xml)?;
/// assert_eq!(&midi[0..4], b"MThd");
/// # Ok::<(), musicxml2midi::Error>(())
/// ```
pub fn musicxml_to_midi(xml: &str) -> Result<Vec<u8>> {
    let doc = roxmltree::Document::parse(xml)?;
    Ok(transcode(&doc))
}
