//! Music document -> Standard MIDI File (format 1)
//!
//! Track 0 is a conductor track carrying tempos, time signatures and key
//! signatures; every document track follows as its own MIDI track. Drum
//! tracks play on channel 9, melodic tracks get channels in order, skipping 9.

use std::path::Path;

use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind};

use super::defaults::{assign_channel, clamp_u7, DEFAULT_TEMPO_QPM, DEFAULT_TPQ, DRUM_CHANNEL};
use crate::error::RenderError;
use crate::models::{MusicDocument, Track as DocumentTrack};

/// Tie-break rank for events on the same tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Rank {
    Meta,
    Setup,
    NoteOff,
    NoteOn,
}

/// An event at an absolute tick
type TimedEvent<'a> = (u32, Rank, TrackEventKind<'a>);

/// Rescale document time steps to MIDI ticks
fn to_tick(time: i64, resolution: i64) -> u32 {
    let ticks = time.max(0) * i64::from(DEFAULT_TPQ) / resolution.max(1);
    u32::try_from(ticks).unwrap_or(u32::MAX)
}

/// Encode a document as SMF bytes
pub fn to_smf_bytes(document: &MusicDocument) -> Result<Vec<u8>, RenderError> {
    let mut tracks = vec![build_conductor_track(document)];

    let mut melodic_index = 0;
    for track in &document.tracks {
        let channel = if track.is_drum {
            DRUM_CHANNEL
        } else {
            let channel = assign_channel(melodic_index);
            melodic_index += 1;
            channel
        };
        tracks.push(build_part_track(track, channel, document.resolution));
    }

    let smf = Smf {
        header: Header { format: Format::Parallel, timing: Timing::Metrical(DEFAULT_TPQ.into()) },
        tracks,
    };

    let mut out = Vec::new();
    smf.write(&mut out).map_err(|e| RenderError::Midi(format!("failed to write MIDI: {}", e)))?;
    Ok(out)
}

/// Write a document to a `.mid` file
pub fn write_midi(document: &MusicDocument, path: &Path) -> Result<(), RenderError> {
    let bytes = to_smf_bytes(document)?;
    std::fs::write(path, bytes)?;
    log::debug!("wrote {} MIDI tracks to {}", document.tracks.len() + 1, path.display());
    Ok(())
}

fn build_conductor_track<'a>(document: &MusicDocument) -> Track<'a> {
    let resolution = document.resolution;
    let mut events: Vec<TimedEvent<'a>> = Vec::new();

    let tempos: Vec<(i64, f64)> = document
        .tempos
        .iter()
        .filter_map(|tempo| tempo.qpm.filter(|qpm| *qpm > 0.0).map(|qpm| (tempo.time, qpm)))
        .collect();
    if tempos.first().map_or(true, |(time, _)| *time > 0) {
        events.push((0, Rank::Meta, tempo_event(DEFAULT_TEMPO_QPM)));
    }
    for (time, qpm) in tempos {
        events.push((to_tick(time, resolution), Rank::Meta, tempo_event(qpm)));
    }

    for time_signature in &document.time_signatures {
        let numerator = time_signature.numerator.filter(|n| *n > 0).unwrap_or(4);
        let denominator = time_signature.denominator.filter(|d| *d > 0).unwrap_or(4);
        // denominator as a power of two (4 -> 2, 8 -> 3)
        let denominator_power = (denominator as f64).log2().round() as u8;
        events.push((
            to_tick(time_signature.time, resolution),
            Rank::Meta,
            TrackEventKind::Meta(MetaMessage::TimeSignature(clamp_u7(numerator), denominator_power, 24, 8)),
        ));
    }

    for key_signature in &document.key_signatures {
        let Some(fifths) = key_signature.fifths else {
            continue;
        };
        let minor = key_signature.mode.as_deref() == Some("minor");
        events.push((
            to_tick(key_signature.time, resolution),
            Rank::Meta,
            TrackEventKind::Meta(MetaMessage::KeySignature(fifths.clamp(-7, 7) as i8, minor)),
        ));
    }

    finish_track(events)
}

fn tempo_event<'a>(qpm: f64) -> TrackEventKind<'a> {
    let microseconds_per_quarter = (60_000_000.0 / qpm).round() as u32;
    TrackEventKind::Meta(MetaMessage::Tempo(microseconds_per_quarter.into()))
}

fn build_part_track(track: &DocumentTrack, channel: u8, resolution: i64) -> Track<'_> {
    let mut events: Vec<TimedEvent<'_>> = Vec::new();

    if let Some(name) = &track.name {
        events.push((0, Rank::Meta, TrackEventKind::Meta(MetaMessage::TrackName(name.as_bytes()))));
    }
    if !track.is_drum {
        let program = clamp_u7(track.program.unwrap_or(0));
        events.push((
            0,
            Rank::Setup,
            TrackEventKind::Midi { channel: channel.into(), message: MidiMessage::ProgramChange { program: program.into() } },
        ));
    }

    for note in &track.notes {
        let key = clamp_u7(note.pitch);
        let start = to_tick(note.time, resolution);
        let end = to_tick(note.time + note.duration.max(0), resolution);
        events.push((
            start,
            Rank::NoteOn,
            TrackEventKind::Midi {
                channel: channel.into(),
                message: MidiMessage::NoteOn { key: key.into(), vel: clamp_u7(note.velocity).max(1).into() },
            },
        ));
        events.push((
            end,
            Rank::NoteOff,
            TrackEventKind::Midi { channel: channel.into(), message: MidiMessage::NoteOff { key: key.into(), vel: 0.into() } },
        ));
    }

    finish_track(events)
}

/// Order events, convert absolute ticks to deltas and close the track
fn finish_track(mut events: Vec<TimedEvent<'_>>) -> Track<'_> {
    events.sort_by_key(|(tick, rank, _)| (*tick, *rank));

    let mut previous = 0u32;
    let mut track: Track<'_> = events
        .into_iter()
        .map(|(tick, _, kind)| {
            let delta = tick.saturating_sub(previous);
            previous = tick;
            TrackEvent { delta: delta.into(), kind }
        })
        .collect();
    track.push(TrackEvent { delta: 0.into(), kind: TrackEventKind::Meta(MetaMessage::EndOfTrack) });
    track
}
