use chrono::{DateTime, Utc};

/// Parsed GPX document: the tracks and routes it contains.
#[derive(Debug, Default)]
pub struct GpxData {
    pub tracks: Vec<GpxTrack>,
    pub routes: Vec<GpxRoute>,
}

impl GpxData {
    /// Point sequences the statistics and the map work on: all non-empty
    /// track segments, or every route when the document has no track points.
    pub fn segments(&self) -> Vec<&[GpxPoint]> {
        let track_segments: Vec<&[GpxPoint]> = self
            .tracks
            .iter()
            .flat_map(|trk| trk.segments.iter())
            .map(|seg| seg.points.as_slice())
            .filter(|points| !points.is_empty())
            .collect();

        if !track_segments.is_empty() {
            return track_segments;
        }

        self.routes
            .iter()
            .map(|rte| rte.points.as_slice())
            .filter(|points| !points.is_empty())
            .collect()
    }

    /// First track name, falling back to the first route name.
    pub fn name(&self) -> Option<&str> {
        self.tracks
            .iter()
            .find_map(|trk| trk.name.as_deref())
            .or_else(|| self.routes.iter().find_map(|rte| rte.name.as_deref()))
    }
}

/// A single GPX point (rtept or trkpt).
#[derive(Debug, Clone)]
pub struct GpxPoint {
    pub lat: f64,
    pub lon: f64,
    pub ele: Option<f64>,
    pub time: Option<DateTime<Utc>>,
}

impl GpxPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            ele: None,
            time: None,
        }
    }
}

/// A GPX route (<rte>).
#[derive(Debug, Default)]
pub struct GpxRoute {
    pub name: Option<String>,
    pub points: Vec<GpxPoint>,
}

/// A GPX track (<trk>).
#[derive(Debug, Default)]
pub struct GpxTrack {
    pub name: Option<String>,
    pub segments: Vec<GpxSegment>,
}

/// A GPX track segment (<trkseg>).
#[derive(Debug, Default)]
pub struct GpxSegment {
    pub points: Vec<GpxPoint>,
}
