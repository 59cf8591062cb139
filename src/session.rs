//! One upload-render cycle per file, held for the lifetime of a page.

use log::{info, warn};
use serde::Serialize;

use crate::error::{ParseError, ViewerError};
use crate::options::ViewerOptions;
use crate::parser::parse_gpx_bytes;
use crate::render;
use crate::stats::MovementSummary;
use crate::tour_info::{tour_info_line, tour_number};
use crate::track::Track;

pub const EXPORT_MIME_TYPE: &str = "text/html";

/// Everything derived from one successfully parsed upload.
#[derive(Debug, Clone)]
pub struct TourReport {
    pub file_name: String,
    pub title: Option<String>,
    pub track: Track,
    pub summary: MovementSummary,
    pub tour_info: Option<String>,
}

impl TourReport {
    /// Parse and summarize one file. An empty track is not an error here;
    /// the caller decides how to present it.
    pub fn analyze(
        file_name: &str,
        bytes: &[u8],
        opts: &ViewerOptions,
    ) -> Result<Self, ParseError> {
        let data = parse_gpx_bytes(bytes)?;
        let track = Track::from_document(&data);
        let summary = MovementSummary::from_document(&data, opts);
        let tour_info = tour_info_line(tour_number(file_name), summary.date.as_deref());

        Ok(Self {
            file_name: file_name.to_string(),
            title: data.name().map(str::to_string),
            track,
            summary,
            tour_info,
        })
    }

    pub fn map_document(&self, opts: &ViewerOptions) -> Result<Option<String>, ViewerError> {
        render::map_document(&self.track, self.title.as_deref(), &opts.map)
    }
}

#[derive(Debug, Default)]
pub enum UploadState {
    #[default]
    Idle,
    Rendered(TourReport),
    Empty { file_name: String },
    Failed { file_name: String, message: String },
}

/// The downloadable standalone map.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapExport {
    pub file_name: String,
    pub mime_type: &'static str,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewStatus {
    Idle,
    Rendered,
    Empty,
    Error,
}

/// What the page shows for the current state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageView {
    pub status: ViewStatus,
    pub message: Option<String>,
    pub dashboard_html: String,
    pub map_html: Option<String>,
    pub tour_info: Option<String>,
    pub summary: Option<MovementSummary>,
    pub can_download: bool,
    /// The upload this view belongs to; `None` while idle.
    pub file_name: Option<String>,
}

pub struct TourSession {
    options: ViewerOptions,
    state: UploadState,
}

impl TourSession {
    pub fn new(options: ViewerOptions) -> Result<Self, ViewerError> {
        options.validate()?;
        Ok(Self {
            options,
            state: UploadState::Idle,
        })
    }

    pub fn options(&self) -> &ViewerOptions {
        &self.options
    }

    pub fn state(&self) -> &UploadState {
        &self.state
    }

    pub fn reset(&mut self) {
        self.state = UploadState::Idle;
    }

    /// Replace whatever the previous upload left behind with the outcome of
    /// this one.
    pub fn upload(&mut self, file_name: &str, bytes: &[u8]) -> &UploadState {
        self.state = UploadState::Idle;
        info!("received {file_name} ({} bytes)", bytes.len());

        self.state = match TourReport::analyze(file_name, bytes, &self.options) {
            Ok(report) if report.track.is_empty() => {
                info!("{file_name}: no waypoints");
                UploadState::Empty {
                    file_name: file_name.to_string(),
                }
            }
            Ok(report) => {
                info!(
                    "{file_name}: {} waypoints, {:.2} km",
                    report.track.len(),
                    report.summary.distance_km
                );
                UploadState::Rendered(report)
            }
            Err(e) => {
                warn!("{file_name}: {e}");
                UploadState::Failed {
                    file_name: file_name.to_string(),
                    message: e.to_string(),
                }
            }
        };
        &self.state
    }

    pub fn view(&self) -> Result<PageView, ViewerError> {
        let view = match &self.state {
            UploadState::Idle => PageView::blank(ViewStatus::Idle, None, String::new(), None),
            UploadState::Empty { file_name } => PageView::blank(
                ViewStatus::Empty,
                Some(render::NO_WAYPOINTS_MESSAGE.to_string()),
                render::notice_html(render::NO_WAYPOINTS_MESSAGE),
                Some(file_name.as_str()),
            ),
            UploadState::Failed { file_name, message } => PageView::blank(
                ViewStatus::Error,
                Some(message.clone()),
                render::error_html(message),
                Some(file_name.as_str()),
            ),
            UploadState::Rendered(report) => {
                let map_html = report
                    .map_document(&self.options)?
                    .map(|doc| render::map_frame_html(&doc, self.options.map.height_px));
                PageView {
                    status: ViewStatus::Rendered,
                    message: None,
                    dashboard_html: render::dashboard_html(
                        &report.summary,
                        report.tour_info.as_deref(),
                    ),
                    can_download: map_html.is_some(),
                    map_html,
                    tour_info: report.tour_info.clone(),
                    summary: Some(report.summary.clone()),
                    file_name: Some(report.file_name.clone()),
                }
            }
        };
        Ok(view)
    }

    pub fn map_export(&self) -> Result<MapExport, ViewerError> {
        let UploadState::Rendered(report) = &self.state else {
            return Err(ViewerError::NothingToExport);
        };
        let content = report
            .map_document(&self.options)?
            .ok_or(ViewerError::NothingToExport)?;

        Ok(MapExport {
            file_name: self.options.export_file_name.clone(),
            mime_type: EXPORT_MIME_TYPE,
            content,
        })
    }
}

impl PageView {
    fn blank(
        status: ViewStatus,
        message: Option<String>,
        dashboard_html: String,
        file_name: Option<&str>,
    ) -> Self {
        Self {
            status,
            message,
            dashboard_html,
            map_html: None,
            tour_info: None,
            summary: None,
            can_download: false,
            file_name: file_name.map(str::to_string),
        }
    }
}
