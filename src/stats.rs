//! Movement statistics: moving distance and time, average speed and the
//! local start/end clock times of a parsed document.

use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;

use crate::geo::point_distance;
use crate::gpx_types::{GpxData, GpxPoint};
use crate::options::ViewerOptions;

const SECONDS_PER_HOUR: f64 = 3600.0;

/// Distance and time split into moving and stationary parts.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MovingData {
    pub moving_time_s: f64,
    pub moving_distance_m: f64,
    pub stopped_time_s: f64,
    pub stopped_distance_m: f64,
    pub max_speed_kmh: f64,
}

/// Classify every consecutive pair of points within each segment.
///
/// A timed pair slower than `stopped_speed_threshold_kmh` is stationary.
/// Within a segment that has timed pairs, a pair without usable elapsed time
/// (missing timestamp, or the clock not advancing) is dropped entirely. A
/// segment with no timed pair at all still contributes its distance, but no
/// time.
pub fn moving_data(segments: &[&[GpxPoint]], stopped_speed_threshold_kmh: f64) -> MovingData {
    let mut data = MovingData::default();

    for segment in segments {
        let timed = segment
            .windows(2)
            .any(|pair| elapsed_seconds(&pair[0], &pair[1]).is_some());
        let mut dropped = 0usize;

        for pair in segment.windows(2) {
            let (prev, curr) = (&pair[0], &pair[1]);

            match elapsed_seconds(prev, curr) {
                Some(seconds) => {
                    let distance = point_distance(prev, curr);
                    let speed_kmh = (distance / 1000.0) / (seconds / SECONDS_PER_HOUR);
                    if speed_kmh <= stopped_speed_threshold_kmh {
                        data.stopped_time_s += seconds;
                        data.stopped_distance_m += distance;
                    } else {
                        data.moving_time_s += seconds;
                        data.moving_distance_m += distance;
                        data.max_speed_kmh = data.max_speed_kmh.max(speed_kmh);
                    }
                }
                None if timed => dropped += 1,
                None => data.moving_distance_m += point_distance(prev, curr),
            }
        }

        if dropped > 0 {
            log::debug!("dropped {dropped} pair(s) without usable time from a timed segment");
        }
    }

    data
}

/// Seconds between two stamped points, if the clock advanced.
fn elapsed_seconds(prev: &GpxPoint, curr: &GpxPoint) -> Option<f64> {
    let (start, end) = (prev.time?, curr.time?);
    let seconds = (end - start).num_milliseconds() as f64 / 1000.0;
    (seconds > 0.0).then_some(seconds)
}

/// Earliest and latest timestamp across the segments.
pub fn time_bounds(segments: &[&[GpxPoint]]) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let mut times = segments.iter().flat_map(|seg| seg.iter()).filter_map(|pt| pt.time);
    let first = times.next()?;
    Some(times.fold((first, first), |(lo, hi), t| (lo.min(t), hi.max(t))))
}

/// `distance / time`, or 0 when no moving time was recorded.
pub fn average_speed_kmh(distance_km: f64, moving_time_s: f64) -> f64 {
    if moving_time_s > 0.0 {
        distance_km / (moving_time_s / SECONDS_PER_HOUR)
    } else {
        0.0
    }
}

/// Local clock strings for the start and end of a tour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClockTimes {
    pub start: String,
    pub end: String,
    pub date: String,
}

/// Format both bounds as `HH:MM <suffix>` after shifting them by a fixed
/// offset; the date comes from the shifted start.
pub fn clock_times(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    utc_offset_hours: i32,
    suffix: &str,
) -> Option<ClockTimes> {
    let offset = FixedOffset::east_opt(utc_offset_hours.checked_mul(3600)?)?;
    let start = start.with_timezone(&offset);
    let end = end.with_timezone(&offset);

    Some(ClockTimes {
        start: format!("{} {suffix}", start.format("%H:%M")),
        end: format!("{} {suffix}", end.format("%H:%M")),
        date: start.format("%d.%m.%Y").to_string(),
    })
}

/// Summary values shown on the dashboard. Recomputed for every upload.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementSummary {
    pub distance_km: f64,
    pub moving_time_seconds: f64,
    pub average_speed_kmh: f64,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub date: Option<String>,
}

impl MovementSummary {
    pub fn from_document(data: &GpxData, opts: &ViewerOptions) -> Self {
        let segments = data.segments();
        let moving = moving_data(&segments, opts.stopped_speed_threshold_kmh);

        let distance_km = moving.moving_distance_m / 1000.0;
        let clock = time_bounds(&segments).and_then(|(start, end)| {
            clock_times(start, end, opts.utc_offset_hours, &opts.clock_suffix)
        });
        if clock.is_none() {
            log::debug!("no usable timestamps; clock times left empty");
        }

        let (start_time, end_time, date) = match clock {
            Some(c) => (Some(c.start), Some(c.end), Some(c.date)),
            None => (None, None, None),
        };

        Self {
            distance_km,
            moving_time_seconds: moving.moving_time_s,
            average_speed_kmh: average_speed_kmh(distance_km, moving.moving_time_s),
            start_time,
            end_time,
            date,
        }
    }
}
