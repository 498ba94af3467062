//! Track-level ("staff") features
//!
//! Notes, the track's own annotations, and two derived feature classes:
//! articulation chunks and long slur / pedal spans.

use super::system::scrape_annotations;
use super::text::articulation_label;
use super::{EventValue, ExtractConfig, ScrapedEvent};
use crate::encoding::vocabulary::{PEDAL, SLUR};
use crate::encoding::EventType;
use crate::models::{Annotation, AnnotationPayload, MusicDocument, Note, TempoMap, Track};

/// Scrape every feature of one track
pub fn scrape_staff(
    track: &Track,
    document: &MusicDocument,
    tempo_map: &TempoMap,
    config: &ExtractConfig,
) -> Vec<ScrapedEvent> {
    let maximum_gap = config.articulation_max_gap_beats * document.resolution;

    let mut events = scrape_notes(&track.notes);
    events.extend(scrape_annotations(&track.annotations, document.song_length(), config.use_implied_duration));
    events.extend(scrape_articulations(&track.annotations, maximum_gap, config.articulation_count_threshold));
    events.extend(scrape_slurs(&track.annotations, config.minimum_span_seconds, tempo_map));
    events.extend(scrape_pedals(&track.annotations, config.minimum_span_seconds, tempo_map));
    events
}

pub fn scrape_notes(notes: &[Note]) -> Vec<ScrapedEvent> {
    notes
        .iter()
        .map(|note| ScrapedEvent {
            event_type: if note.is_grace { EventType::GraceNote } else { EventType::Note },
            time: note.time,
            duration: note.duration,
            value: EventValue::Pitch(note.pitch),
        })
        .collect()
}

#[derive(Debug, Clone)]
struct Chunk {
    subtype: Option<String>,
    start: i64,
    end: i64,
    count: usize,
}

/// Close (and possibly emit) every open chunk whose last mark is more than
/// `maximum_gap` before `time`
fn close_chunks(
    chunks: &mut Vec<Chunk>,
    time: i64,
    maximum_gap: i64,
    threshold: usize,
    events: &mut Vec<ScrapedEvent>,
) {
    chunks.retain(|chunk| {
        if time - chunk.end <= maximum_gap {
            return true;
        }
        if chunk.count >= threshold {
            if let Some(value) = articulation_label(chunk.subtype.as_deref()) {
                events.push(ScrapedEvent {
                    event_type: EventType::ExpressiveFeature,
                    time: chunk.start,
                    duration: chunk.end - chunk.start,
                    value: EventValue::Label(value),
                });
            }
        }
        false
    });
}

/// Merge runs of same-subtype articulations into chunk features
///
/// A chunk stays open while marks of its subtype keep arriving within
/// `maximum_gap` time steps of each other; any annotation (articulation or
/// not) arriving later than that closes it. Chunks with fewer than
/// `threshold` marks are dropped.
pub fn scrape_articulations(annotations: &[Annotation], maximum_gap: i64, threshold: usize) -> Vec<ScrapedEvent> {
    let mut events = Vec::new();
    let mut chunks: Vec<Chunk> = Vec::new();

    for annotation in annotations {
        close_chunks(&mut chunks, annotation.time, maximum_gap, threshold, &mut events);

        let AnnotationPayload::Articulation { subtype } = &annotation.annotation else {
            continue;
        };
        match chunks.iter_mut().find(|chunk| chunk.subtype == *subtype) {
            Some(chunk) => {
                chunk.end = annotation.time;
                chunk.count += 1;
            }
            None => chunks.push(Chunk {
                subtype: subtype.clone(),
                start: annotation.time,
                end: annotation.time,
                count: 1,
            }),
        }
    }

    if let Some(last) = annotations.last() {
        close_chunks(&mut chunks, last.time + 2 * maximum_gap + 1, maximum_gap, threshold, &mut events);
    }
    events
}

/// Slack on the span threshold so the divide-by-zero epsilon cannot reject a
/// span of exactly `minimum_seconds`
const SPAN_TOLERANCE: f64 = 1e-6;

/// Whether `[time, time + duration)` lasts at least `minimum_seconds`
fn is_long_span(tempo_map: &TempoMap, time: i64, duration: i64, minimum_seconds: f64) -> bool {
    let seconds = tempo_map.absolute_time(time.saturating_add(duration)) - tempo_map.absolute_time(time);
    seconds + SPAN_TOLERANCE >= minimum_seconds
}

/// Slurs lasting at least `minimum_seconds`; ties are skipped
pub fn scrape_slurs(annotations: &[Annotation], minimum_seconds: f64, tempo_map: &TempoMap) -> Vec<ScrapedEvent> {
    annotations
        .iter()
        .filter_map(|annotation| match annotation.annotation {
            AnnotationPayload::SlurSpanner { duration, is_slur: true }
                if is_long_span(tempo_map, annotation.time, duration, minimum_seconds) =>
            {
                Some(span_feature(annotation.time, duration, SLUR))
            }
            _ => None,
        })
        .collect()
}

/// Pedal markings lasting at least `minimum_seconds`
pub fn scrape_pedals(annotations: &[Annotation], minimum_seconds: f64, tempo_map: &TempoMap) -> Vec<ScrapedEvent> {
    annotations
        .iter()
        .filter_map(|annotation| match annotation.annotation {
            AnnotationPayload::PedalSpanner { duration }
                if is_long_span(tempo_map, annotation.time, duration, minimum_seconds) =>
            {
                Some(span_feature(annotation.time, duration, PEDAL))
            }
            _ => None,
        })
        .collect()
}

fn span_feature(time: i64, duration: i64, label: &str) -> ScrapedEvent {
    ScrapedEvent {
        event_type: EventType::ExpressiveFeature,
        time,
        duration,
        value: EventValue::Label(label.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Tempo;

    fn staccato(time: i64) -> Annotation {
        Annotation::new(time, AnnotationPayload::Articulation { subtype: Some("articStaccatoAbove".into()) })
    }

    #[test]
    fn test_chunk_below_threshold_is_dropped() {
        let annotations: Vec<Annotation> = [0, 12, 24].into_iter().map(staccato).collect();
        assert!(scrape_articulations(&annotations, 24, 4).is_empty());
    }

    #[test]
    fn test_chunk_at_threshold_spans_first_to_last() {
        let annotations: Vec<Annotation> = [0, 12, 24, 36].into_iter().map(staccato).collect();
        let events = scrape_articulations(&annotations, 24, 4);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].time, 0);
        assert_eq!(events[0].duration, 36);
        assert_eq!(events[0].value, EventValue::Label("staccato".into()));
    }

    #[test]
    fn test_gap_splits_chunks() {
        let annotations: Vec<Annotation> = [0, 4, 8, 12, 100, 104, 108, 112].into_iter().map(staccato).collect();
        let events = scrape_articulations(&annotations, 24, 4);
        let times: Vec<i64> = events.iter().map(|event| event.time).collect();
        assert_eq!(times, vec![0, 100]);
    }

    #[test]
    fn test_subtypes_chunk_independently() {
        let mut annotations = Vec::new();
        for time in [0, 6, 12, 18] {
            annotations.push(staccato(time));
            annotations.push(Annotation::new(
                time,
                AnnotationPayload::Articulation { subtype: Some("articTenutoBelow".into()) },
            ));
        }
        let mut labels: Vec<String> =
            scrape_articulations(&annotations, 24, 4).iter().map(|event| event.value.to_string()).collect();
        labels.sort();
        assert_eq!(labels, vec!["staccato", "tenuto"]);
    }

    fn tempo_map_at_60_qpm(resolution: i64) -> TempoMap {
        let mut document = MusicDocument::new(resolution).unwrap();
        document.tempos.push(Tempo::new(0, 60.0));
        let mut track = Track::new(0);
        track.notes.push(Note::new(0, 60, resolution * 16, 64));
        document.tracks.push(track);
        document.normalize();
        document.tempo_map()
    }

    #[test]
    fn test_short_slurs_and_ties_rejected() {
        // one second per quarter
        let tempo_map = tempo_map_at_60_qpm(4);
        let annotations = vec![
            Annotation::new(0, AnnotationPayload::SlurSpanner { duration: 5, is_slur: true }),
            Annotation::new(8, AnnotationPayload::SlurSpanner { duration: 6, is_slur: true }),
            Annotation::new(16, AnnotationPayload::SlurSpanner { duration: 12, is_slur: false }),
        ];
        let events = scrape_slurs(&annotations, 1.5, &tempo_map);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].time, 8);
        assert_eq!(events[0].value, EventValue::Label("slur".into()));
    }

    #[test]
    fn test_long_pedals_kept() {
        let tempo_map = tempo_map_at_60_qpm(4);
        let annotations = vec![
            Annotation::new(0, AnnotationPayload::PedalSpanner { duration: 4 }),
            Annotation::new(4, AnnotationPayload::PedalSpanner { duration: 16 }),
        ];
        let events = scrape_pedals(&annotations, 1.5, &tempo_map);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].duration, 16);
    }
}
