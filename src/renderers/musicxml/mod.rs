//! MusicXML 3.1 partwise output
//!
//! One part per document track. Measures follow the document's time
//! signatures (4/4 when there are none), divisions equal the document
//! resolution, and overlapping notes are split into voices joined with
//! `<backup>` / `<forward>`. Notes crossing a barline are cut at the barline.

pub mod builder;

use std::path::Path;

pub use builder::{score_partwise, Clef, MeasureAttributes, PartBuilder, ScorePart, XmlNote};

use super::midi::defaults::{assign_channel, DRUM_CHANNEL};
use crate::error::RenderError;
use crate::models::{Annotation, MusicDocument, Note, Track};

/// One measure `[start, end)` and the meter in force
#[derive(Debug, Clone, Copy, PartialEq)]
struct Measure {
    start: i64,
    end: i64,
    time: (i64, i64),
    fifths: i64,
}

/// Lay out measures over `[0, song_length)`; always at least one
fn measures(document: &MusicDocument) -> Vec<Measure> {
    let resolution = document.resolution;
    let song_length = document.song_length();
    let mut measures = Vec::new();
    let mut start = 0;

    loop {
        let active = document.time_signatures.iter().filter(|ts| ts.time <= start).last();
        let time = active
            .map(|ts| (ts.numerator.filter(|n| *n > 0).unwrap_or(4), ts.denominator.filter(|d| *d > 0).unwrap_or(4)))
            .unwrap_or((4, 4));
        let length = active.map_or(resolution * 4, |ts| ts.measure_length(resolution));
        let next_change = document
            .time_signatures
            .iter()
            .map(|ts| ts.time)
            .find(|time| *time > start && *time < start + length);
        let end = next_change.unwrap_or(start + length);
        let fifths = document
            .key_signatures
            .iter()
            .filter(|ks| ks.time <= start)
            .filter_map(|ks| ks.fifths)
            .last()
            .unwrap_or(0);

        measures.push(Measure { start, end, time, fifths });
        start = end;
        if start >= song_length {
            break;
        }
    }
    measures
}

/// A note placed in a voice, with its duration cut at the barline
struct Placed<'a> {
    note: &'a Note,
    duration: i64,
    grace: bool,
    chord: bool,
}

/// Greedy voice assignment: a note joins the chord it matches, else the
/// first voice that is free at its onset, else a new voice
fn assign_voices<'a>(notes: &[&'a Note], measure_end: i64) -> Vec<Vec<Placed<'a>>> {
    let mut voices: Vec<(i64, Vec<Placed<'a>>)> = Vec::new();

    for note in notes {
        let duration = note.duration.min(measure_end - note.time).max(0);
        let grace = note.is_grace || duration == 0;

        if !grace {
            let chord_voice = voices.iter_mut().find(|(_, placed)| {
                placed.last().is_some_and(|last| !last.grace && last.note.time == note.time && last.duration == duration)
            });
            if let Some((_, placed)) = chord_voice {
                placed.push(Placed { note, duration, grace, chord: true });
                continue;
            }
        }

        let placed = Placed { note, duration, grace, chord: false };
        let cursor = note.time + duration;
        match voices.iter_mut().find(|(free_at, _)| *free_at <= note.time) {
            Some((free_at, voice)) => {
                *free_at = cursor;
                voice.push(placed);
            }
            None => voices.push((cursor, vec![placed])),
        }
    }
    voices.into_iter().map(|(_, voice)| voice).collect()
}

fn clef_for(track: &Track) -> Clef {
    if track.notes.is_empty() {
        return Clef::Treble;
    }
    let total: i64 = track.notes.iter().map(|note| note.pitch).sum();
    if total / track.notes.len() as i64 >= 60 {
        Clef::Treble
    } else {
        Clef::Bass
    }
}

fn write_measure(
    builder: &mut PartBuilder,
    document: &MusicDocument,
    track: &Track,
    directions: &[&Annotation],
    with_tempos: bool,
    measure: &Measure,
) {
    let resolution = document.resolution;
    let in_measure = |time: i64| time >= measure.start && time < measure.end;

    if with_tempos {
        for tempo in document.tempos.iter().filter(|tempo| in_measure(tempo.time)) {
            if let Some(qpm) = tempo.qpm.filter(|qpm| *qpm > 0.0) {
                builder.write_tempo(qpm, tempo.time - measure.start);
            }
        }
    }
    for annotation in directions.iter().filter(|annotation| in_measure(annotation.time)) {
        if let Some(text) = annotation.annotation.text().filter(|text| !text.is_empty()) {
            builder.write_words(text, annotation.time - measure.start);
        }
    }

    let notes: Vec<&Note> = track.notes.iter().filter(|note| in_measure(note.time)).collect();
    if notes.is_empty() {
        builder.write_measure_rest(measure.end - measure.start);
        return;
    }

    let voices = assign_voices(&notes, measure.end);
    let last_voice = voices.len() - 1;
    for (index, voice) in voices.iter().enumerate() {
        let mut cursor = measure.start;
        for placed in voice {
            if !placed.chord {
                builder.write_forward(placed.note.time - cursor);
                cursor = cursor.max(placed.note.time);
            }
            builder.write_note(&XmlNote {
                pitch: placed.note.pitch,
                duration: placed.duration,
                quarters: placed.duration as f64 / resolution as f64,
                voice: index + 1,
                chord: placed.chord,
                grace: placed.grace,
            });
            if !placed.chord && !placed.grace {
                cursor = placed.note.time + placed.duration;
            }
        }
        if index < last_voice {
            builder.write_backup(cursor - measure.start);
        }
    }
}

/// Render a document as a MusicXML string
pub fn to_musicxml(document: &MusicDocument) -> String {
    let layout = measures(document);
    let system_directions: Vec<&Annotation> = document.annotations.iter().collect();

    let mut melodic_index = 0;
    let mut parts = Vec::with_capacity(document.tracks.len());
    for (track_index, track) in document.tracks.iter().enumerate() {
        let mut directions: Vec<&Annotation> = track.annotations.iter().collect();
        if track_index == 0 {
            directions.extend(system_directions.iter().copied());
        }

        let mut builder = PartBuilder::new();
        let mut previous: Option<Measure> = None;
        for measure in &layout {
            let attributes = MeasureAttributes {
                divisions: previous.is_none().then_some(document.resolution),
                fifths: (previous.map(|p| p.fifths) != Some(measure.fifths)).then_some(measure.fifths),
                time: (previous.map(|p| p.time) != Some(measure.time)).then_some(measure.time),
                clef: previous.is_none().then(|| clef_for(track)),
            };
            builder.start_measure(&attributes);
            write_measure(&mut builder, document, track, &directions, track_index == 0, measure);
            builder.end_measure();
            previous = Some(*measure);
        }

        let channel = if track.is_drum {
            DRUM_CHANNEL
        } else {
            melodic_index += 1;
            assign_channel(melodic_index - 1)
        };
        parts.push(ScorePart {
            id: format!("P{}", track_index + 1),
            name: track.name.clone().unwrap_or_else(|| format!("Track {}", track_index + 1)),
            program: track.program,
            channel,
            measures: builder.finish(),
        });
    }

    score_partwise(document.metadata.title.as_deref(), &parts)
}

/// Write a document to a `.musicxml` file
pub fn write_musicxml(document: &MusicDocument, path: &Path) -> Result<(), RenderError> {
    let xml = to_musicxml(document);
    std::fs::write(path, xml)?;
    log::debug!("wrote {} MusicXML parts to {}", document.tracks.len(), path.display());
    Ok(())
}
