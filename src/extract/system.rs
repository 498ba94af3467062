//! Document-level ("system") expressive features
//!
//! Annotations, barlines and the tempo / key / meter timelines. The same
//! annotation scraper is reused for each track's own annotations.

use super::text::{check_text, clean_up_text, split_camel_case};
use super::{EventValue, ExtractConfig, ScrapedEvent};
use crate::encoding::vocabulary::{
    is_known_dynamic, is_sustained_dynamic, key_signature_change_label, key_signature_distance, qpm_tempo_label,
    time_signature_change_label, BARLINE, DYNAMIC_MARKING, FERMATA, REHEARSAL_MARK,
};
use crate::encoding::EventType;
use crate::models::{Annotation, Barline, KeySignature, MusicDocument, Tempo, TimeSignature};

/// Annotation kinds that become expressive features
pub const EXPRESSIVE_ANNOTATION_KINDS: [&str; 8] = [
    "Text",
    "TextSpanner",
    "RehearsalMark",
    "Dynamic",
    "HairPinSpanner",
    "Fermata",
    "TempoSpanner",
    "TechAnnotation",
];

/// Scrape every document-level feature
pub fn scrape_system(document: &MusicDocument, config: &ExtractConfig) -> Vec<ScrapedEvent> {
    let song_length = document.song_length();
    let implied = config.use_implied_duration;

    let mut events = scrape_annotations(&document.annotations, song_length, implied);
    events.extend(scrape_barlines(&document.barlines, song_length, implied));
    events.extend(scrape_time_signatures(&document.time_signatures, song_length, implied));
    events.extend(scrape_key_signatures(&document.key_signatures, song_length, implied));
    events.extend(scrape_tempos(&document.tempos, song_length, implied));
    events
}

fn feature(time: i64, duration: i64, value: impl Into<String>) -> ScrapedEvent {
    ScrapedEvent {
        event_type: EventType::ExpressiveFeature,
        time,
        duration,
        value: EventValue::Label(value.into()),
    }
}

/// Duration of each item until the next one, the last running to `song_length`
fn durations_to_next(times: &[i64], song_length: i64, implied: bool) -> Vec<i64> {
    times
        .iter()
        .enumerate()
        .map(|(i, time)| match (implied, times.get(i + 1)) {
            (false, _) => 0,
            (true, Some(next)) => next - time,
            (true, None) => song_length - time,
        })
        .collect()
}

/// Value label for an annotation payload
fn annotation_value(annotation: &Annotation) -> String {
    let payload = &annotation.annotation;
    let kind = payload.name();

    let value = if let Some(text) = payload.text() {
        clean_up_text(text)
    } else {
        payload.subtype().map(split_camel_case).unwrap_or_default()
    };
    let value = if value.is_empty() { split_camel_case(&kind.replace("Spanner", "")) } else { value };

    let value = if value == "dynamic" || value == "other-dynamics" {
        DYNAMIC_MARKING.to_string()
    } else if kind == "Dynamic" && !is_known_dynamic(&value) {
        DYNAMIC_MARKING.to_string()
    } else if kind == "Fermata" {
        FERMATA.to_string()
    } else if kind == "RehearsalMark" && value.chars().all(char::is_numeric) {
        REHEARSAL_MARK.to_string()
    } else {
        value
    };
    check_text(&value)
}

/// Scrape expressive annotations
///
/// Durations come from the payload when it has one. Otherwise, with implied
/// durations on, a feature lasts until the next feature of the same kind and
/// the last one of each kind lasts until `song_length`. Hike dynamics (accents
/// such as `sfz`) always get 0 and do not end the dynamic before them.
pub fn scrape_annotations(annotations: &[Annotation], song_length: i64, implied: bool) -> Vec<ScrapedEvent> {
    let mut events: Vec<ScrapedEvent> = Vec::new();
    // index of the open event of each kind still waiting for its duration
    let mut encounters: [Option<usize>; EXPRESSIVE_ANNOTATION_KINDS.len()] = Default::default();

    for annotation in annotations {
        let kind = annotation.annotation.name();
        let Some(slot) = EXPRESSIVE_ANNOTATION_KINDS.iter().position(|candidate| *candidate == kind) else {
            continue;
        };

        let is_hike_dynamic =
            kind == "Dynamic" && !annotation.annotation.subtype().map_or(false, is_sustained_dynamic);

        let duration = match annotation.annotation.duration() {
            Some(duration) => duration,
            None if !implied || is_hike_dynamic => 0,
            None => {
                if let Some(open) = encounters[slot] {
                    events[open].duration = annotation.time - events[open].time;
                }
                encounters[slot] = Some(events.len());
                // settled by the next encounter or at the end
                0
            }
        };

        events.push(feature(annotation.time, duration, annotation_value(annotation)));
    }

    for open in encounters.into_iter().flatten() {
        events[open].duration = song_length - events[open].time;
    }
    events
}

/// Scrape barlines other than plain and repeat barlines
pub fn scrape_barlines(barlines: &[Barline], song_length: i64, implied: bool) -> Vec<ScrapedEvent> {
    let kept: Vec<&Barline> = barlines
        .iter()
        .filter(|barline| match barline.subtype.as_deref() {
            Some(subtype) => subtype != "single" && !subtype.to_lowercase().contains("repeat"),
            None => true,
        })
        .collect();
    let times: Vec<i64> = kept.iter().map(|barline| barline.time).collect();
    let durations = durations_to_next(&times, song_length, implied);

    kept.iter()
        .zip(durations)
        .map(|(barline, duration)| {
            let value = match barline.subtype.as_deref() {
                Some(subtype) => check_text(&format!("{}-{}", subtype.to_lowercase(), BARLINE)),
                None => BARLINE.to_string(),
            };
            feature(barline.time, duration, value)
        })
        .collect()
}

/// Scrape meter changes (every time signature after the first)
pub fn scrape_time_signatures(time_signatures: &[TimeSignature], song_length: i64, implied: bool) -> Vec<ScrapedEvent> {
    let times: Vec<i64> = time_signatures.iter().map(|ts| ts.time).collect();
    let durations = durations_to_next(&times, song_length, implied);
    let meter = |ts: &TimeSignature| ts.numerator.zip(ts.denominator);

    time_signatures
        .windows(2)
        .zip(durations.into_iter().skip(1))
        .map(|(pair, duration)| {
            let value = time_signature_change_label(meter(&pair[0]), meter(&pair[1]));
            feature(pair[1].time, duration, value)
        })
        .collect()
}

/// Scrape key changes (every key signature after the first)
pub fn scrape_key_signatures(key_signatures: &[KeySignature], song_length: i64, implied: bool) -> Vec<ScrapedEvent> {
    let times: Vec<i64> = key_signatures.iter().map(|ks| ks.time).collect();
    let durations = durations_to_next(&times, song_length, implied);

    key_signatures
        .windows(2)
        .zip(durations.into_iter().skip(1))
        .map(|(pair, duration)| {
            let distance = key_signature_distance(pair[0].fifths, pair[1].fifths);
            feature(pair[1].time, duration, key_signature_change_label(distance))
        })
        .collect()
}

/// Scrape every tempo as an Italian tempo marking
pub fn scrape_tempos(tempos: &[Tempo], song_length: i64, implied: bool) -> Vec<ScrapedEvent> {
    let times: Vec<i64> = tempos.iter().map(|tempo| tempo.time).collect();
    let durations = durations_to_next(&times, song_length, implied);

    tempos
        .iter()
        .zip(durations)
        .map(|(tempo, duration)| feature(tempo.time, duration, qpm_tempo_label(tempo.qpm)))
        .collect()
}
