use serde::Deserialize;

use crate::error::ViewerError;

pub const DEFAULT_HEADER_HEIGHT_PX: u32 = 420;
/// Fixed local-time correction applied to GPX (UTC) timestamps. This is a
/// summer-time offset with no calendar awareness.
pub const DEFAULT_UTC_OFFSET_HOURS: i32 = 2;
pub const DEFAULT_STOPPED_SPEED_THRESHOLD_KMH: f64 = 1.0;
pub const DEFAULT_CLOCK_SUFFIX: &str = "Uhr";
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 200 * 1024 * 1024;
pub const DEFAULT_EXPORT_FILE_NAME: &str = "LKW_Tour_Karte.html";
pub const DEFAULT_PAGE_TITLE: &str = "LKW Touren Viewer";
pub const DEFAULT_BRAND_TEXT: &str = "movis";

const MAX_UTC_OFFSET_HOURS: i32 = 23;
const MAX_ZOOM: u8 = 19;
const LOGO_URL_PREFIX: &str = "data:image/";

/// Viewer settings, handed in once when the page starts.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ViewerOptions {
    /// Top padding of the scrollable area, so the fixed header and the
    /// statistics never cover the map.
    pub header_height_px: u32,

    /// Offset added to UTC timestamps before formatting clock strings.
    pub utc_offset_hours: i32,

    /// Pairs of points slower than this are counted as standing still.
    pub stopped_speed_threshold_kmh: f64,

    /// Appended to formatted clock times ("12:00 Uhr").
    pub clock_suffix: String,

    /// Soft limit checked by the page before reading a file.
    pub max_upload_bytes: u64,

    pub export_file_name: String,
    pub page_title: String,
    pub brand_text: String,

    /// Company logo as a `data:image/...` URL; replaces the brand text in
    /// the header when set.
    pub logo_data_url: Option<String>,

    pub map: MapStyle,
}

impl Default for ViewerOptions {
    fn default() -> Self {
        Self {
            header_height_px: DEFAULT_HEADER_HEIGHT_PX,
            utc_offset_hours: DEFAULT_UTC_OFFSET_HOURS,
            stopped_speed_threshold_kmh: DEFAULT_STOPPED_SPEED_THRESHOLD_KMH,
            clock_suffix: DEFAULT_CLOCK_SUFFIX.to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            export_file_name: DEFAULT_EXPORT_FILE_NAME.to_string(),
            page_title: DEFAULT_PAGE_TITLE.to_string(),
            brand_text: DEFAULT_BRAND_TEXT.to_string(),
            logo_data_url: None,
            map: MapStyle::default(),
        }
    }
}

impl ViewerOptions {
    pub fn validate(&self) -> Result<(), ViewerError> {
        let threshold = self.stopped_speed_threshold_kmh;
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(ViewerError::Options(format!(
                "stoppedSpeedThresholdKmh must be a non-negative number, got {threshold}"
            )));
        }
        if self.utc_offset_hours.abs() > MAX_UTC_OFFSET_HOURS {
            return Err(ViewerError::Options(format!(
                "utcOffsetHours must be within ±{MAX_UTC_OFFSET_HOURS}, got {}",
                self.utc_offset_hours
            )));
        }
        if self.export_file_name.trim().is_empty() {
            return Err(ViewerError::Options(
                "exportFileName must not be empty".to_string(),
            ));
        }
        if let Some(logo) = &self.logo_data_url {
            if !logo.starts_with(LOGO_URL_PREFIX) {
                return Err(ViewerError::Options(format!(
                    "logoDataUrl must be a {LOGO_URL_PREFIX}... URL"
                )));
            }
        }
        self.map.validate()
    }
}

/// How the track is drawn on the map.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MapStyle {
    pub line_color: String,
    pub line_weight: u32,
    pub line_opacity: f64,
    pub zoom_start: u8,
    /// Height of the in-page map frame.
    pub height_px: u32,
}

impl Default for MapStyle {
    fn default() -> Self {
        Self {
            line_color: "red".to_string(),
            line_weight: 5,
            line_opacity: 0.8,
            zoom_start: 12,
            height_px: 800,
        }
    }
}

impl MapStyle {
    fn validate(&self) -> Result<(), ViewerError> {
        if !(0.0..=1.0).contains(&self.line_opacity) {
            return Err(ViewerError::Options(format!(
                "map.lineOpacity must be within [0, 1], got {}",
                self.line_opacity
            )));
        }
        if self.zoom_start > MAX_ZOOM {
            return Err(ViewerError::Options(format!(
                "map.zoomStart must be at most {MAX_ZOOM}, got {}",
                self.zoom_start
            )));
        }
        Ok(())
    }
}
