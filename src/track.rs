//! The flattened track shown on the map.

use chrono::{DateTime, Utc};

use crate::gpx_types::GpxData;

/// A single recorded sample along a track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Waypoint {
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: Option<DateTime<Utc>>,
}

/// Ordered waypoints in recording order; track/segment/route grouping is
/// discarded. May be empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Track {
    waypoints: Vec<Waypoint>,
}

impl Track {
    pub fn from_document(data: &GpxData) -> Self {
        let waypoints = data
            .segments()
            .into_iter()
            .flatten()
            .map(|pt| Waypoint {
                latitude: pt.lat,
                longitude: pt.lon,
                timestamp: pt.time,
            })
            .collect();
        Self { waypoints }
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn first(&self) -> Option<&Waypoint> {
        self.waypoints.first()
    }

    pub fn last(&self) -> Option<&Waypoint> {
        self.waypoints.last()
    }

    /// The middle waypoint, used to centre the map.
    pub fn center(&self) -> Option<&Waypoint> {
        self.waypoints.get(self.waypoints.len() / 2)
    }

    /// `(lat, lon)` pairs in order.
    pub fn coordinates(&self) -> Vec<(f64, f64)> {
        self.waypoints
            .iter()
            .map(|wp| (wp.latitude, wp.longitude))
            .collect()
    }
}
