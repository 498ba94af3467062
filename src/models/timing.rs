//! Metrical time (time steps) to absolute time (seconds)
//!
//! Tempo and time-signature changes split the song into segments with a
//! constant rate. The walk is seeded with 4/4 at 60 qpm at time 0 and closed
//! by a synthetic 4/4 boundary at `song_length`:
//!
//! ```text
//! seconds(segment) = steps / resolution * 60 / qpm * 4 / denominator
//! ```
//!
//! Divisions are guarded with a tiny epsilon so malformed data (zero qpm or
//! denominator) degrades numerically instead of failing. Results built on the
//! epsilon are not meant to be exact.

use super::events::{Tempo, TimeSignature};
use super::music::MusicDocument;

/// Added to every divisor
pub const DIVIDE_BY_ZERO_EPSILON: f64 = 1e-10;

/// Tempo assumed before the first tempo change
pub const DEFAULT_QPM: f64 = 60.0;
const DEFAULT_DENOMINATOR: f64 = 4.0;

/// A timeline change that alters the rate of the following segment
#[derive(Debug, Clone, Copy)]
enum Change {
    Tempo(f64),
    Meter(f64),
}

#[derive(Debug, Clone, Copy)]
struct Boundary {
    time: i64,
    change: Change,
}

/// One constant-rate stretch `[start, end]` of the timeline
#[derive(Debug, Clone, Copy)]
struct Segment {
    start: i64,
    end: i64,
    /// Seconds elapsed at `start`
    elapsed: f64,
    seconds_per_step: f64,
}

/// Precomputed segment table for repeated conversions over one document
#[derive(Debug, Clone)]
pub struct TempoMap {
    segments: Vec<Segment>,
    total: f64,
}

impl TempoMap {
    /// Build the segment table for a document
    pub fn new(document: &MusicDocument) -> Self {
        Self::from_parts(
            &document.tempos,
            &document.time_signatures,
            document.resolution,
            document.song_length(),
        )
    }

    fn from_parts(tempos: &[Tempo], time_signatures: &[TimeSignature], resolution: i64, song_length: i64) -> Self {
        let meters = time_signatures.iter().map(|ts| Boundary {
            time: ts.time,
            change: Change::Meter(ts.denominator.unwrap_or(4) as f64),
        });
        let tempo_changes = tempos.iter().map(|tempo| Boundary {
            time: tempo.time,
            change: Change::Tempo(tempo.qpm.unwrap_or(0.0)),
        });
        // stable: meters sort ahead of tempos at equal times
        let mut boundaries: Vec<Boundary> = meters.chain(tempo_changes).collect();
        boundaries.sort_by_key(|boundary| boundary.time);
        boundaries.push(Boundary { time: song_length, change: Change::Meter(DEFAULT_DENOMINATOR) });

        let resolution = resolution as f64;
        let mut qpm = DEFAULT_QPM;
        let mut denominator = DEFAULT_DENOMINATOR;
        let mut most_recent = 0i64;
        let mut elapsed = 0.0f64;
        let mut segments = Vec::with_capacity(boundaries.len());

        for boundary in boundaries {
            let seconds_per_step = (1.0 / resolution)
                * (60.0 / (qpm + DIVIDE_BY_ZERO_EPSILON))
                * (4.0 / (denominator + DIVIDE_BY_ZERO_EPSILON));
            segments.push(Segment { start: most_recent, end: boundary.time, elapsed, seconds_per_step });
            elapsed += (boundary.time - most_recent) as f64 * seconds_per_step;
            most_recent = boundary.time;

            match boundary.change {
                Change::Tempo(value) => qpm = value,
                Change::Meter(value) => denominator = value,
            }
        }

        Self { segments, total: elapsed }
    }

    /// Seconds elapsed at `time_steps`
    ///
    /// Only the part of the segment up to `time_steps` is counted. Positions
    /// past the last boundary return the total length of the song.
    pub fn absolute_time(&self, time_steps: i64) -> f64 {
        for segment in &self.segments {
            if time_steps <= segment.end {
                return segment.elapsed + (time_steps - segment.start) as f64 * segment.seconds_per_step;
            }
        }
        self.total
    }
}

impl MusicDocument {
    /// Convert a position in time steps to seconds from the start of the song
    pub fn metrical_time_to_absolute_time(&self, time_steps: i64) -> f64 {
        TempoMap::new(self).absolute_time(time_steps)
    }

    /// Segment table for converting many positions of this document
    pub fn tempo_map(&self) -> TempoMap {
        TempoMap::new(self)
    }
}
