pub mod error;
pub mod geo;
pub mod gpx_types;
pub mod logging;
pub mod options;
pub mod parser;
pub mod render;
pub mod session;
pub mod stats;
pub mod tour_info;
pub mod track;

use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::error::ViewerError;
use crate::options::ViewerOptions;
use crate::session::TourSession;
use crate::stats::MovementSummary;
use crate::track::Track;

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    logging::init(log::LevelFilter::Info);
}

/// Viewer state for one page: options fixed at construction, plus the
/// outcome of the latest upload.
#[wasm_bindgen]
pub struct TourViewer {
    session: TourSession,
}

#[wasm_bindgen]
impl TourViewer {
    #[wasm_bindgen(constructor)]
    pub fn new(options: JsValue) -> Result<TourViewer, JsValue> {
        let opts = parse_options(options)?;
        let session = TourSession::new(opts)?;
        Ok(TourViewer { session })
    }

    /// Stylesheet for the page shell.
    #[wasm_bindgen(js_name = pageStyles)]
    pub fn page_styles(&self) -> String {
        render::page_styles(self.session.options())
    }

    /// The fixed page header with logo or brand text.
    #[wasm_bindgen(js_name = headerHtml)]
    pub fn header_html(&self) -> String {
        render::header_html(self.session.options())
    }

    #[wasm_bindgen(getter, js_name = maxUploadBytes)]
    pub fn max_upload_bytes(&self) -> f64 {
        self.session.options().max_upload_bytes as f64
    }

    #[wasm_bindgen(getter, js_name = pageTitle)]
    pub fn page_title(&self) -> String {
        self.session.options().page_title.clone()
    }

    #[wasm_bindgen(getter, js_name = brandText)]
    pub fn brand_text(&self) -> String {
        self.session.options().brand_text.clone()
    }

    /// Parse and summarize an uploaded file, returning the page view.
    /// Parse failures are part of the view, not a thrown error.
    #[wasm_bindgen(js_name = handleUpload)]
    pub fn handle_upload(&mut self, file_name: &str, bytes: &[u8]) -> Result<JsValue, JsValue> {
        self.session.upload(file_name, bytes);
        to_js(&self.session.view()?)
    }

    /// The standalone map of the current upload, ready for download.
    #[wasm_bindgen(js_name = mapExport)]
    pub fn map_export(&self) -> Result<JsValue, JsValue> {
        to_js(&self.session.map_export()?)
    }

    pub fn reset(&mut self) {
        self.session.reset();
    }
}

#[derive(Serialize)]
struct Analysis {
    points: Vec<(f64, f64)>,
    summary: MovementSummary,
}

/// Analyze a GPX string without touching any viewer state.
#[wasm_bindgen(js_name = analyzeGpx)]
pub fn analyze_gpx(gpx_string: &str, options: JsValue) -> Result<JsValue, JsValue> {
    let opts = parse_options(options)?;
    let data = parser::parse_gpx(gpx_string).map_err(ViewerError::from)?;
    let analysis = Analysis {
        points: Track::from_document(&data).coordinates(),
        summary: MovementSummary::from_document(&data, &opts),
    };
    to_js(&analysis)
}

/// The flattened track as a GeoJSON FeatureCollection string.
#[wasm_bindgen(js_name = trackGeoJson)]
pub fn track_geojson(gpx_string: &str) -> Result<String, JsValue> {
    let data = parser::parse_gpx(gpx_string).map_err(ViewerError::from)?;
    let fc = render::track_geojson(&Track::from_document(&data));
    serde_json::to_string(&fc).map_err(|e| ViewerError::from(e).into())
}

#[wasm_bindgen(js_name = tourNumber)]
pub fn tour_number(file_name: &str) -> Option<String> {
    tour_info::tour_number(file_name).map(str::to_string)
}

fn parse_options(options: JsValue) -> Result<ViewerOptions, JsValue> {
    let opts: ViewerOptions = if options.is_undefined() || options.is_null() {
        ViewerOptions::default()
    } else {
        serde_wasm_bindgen::from_value(options).map_err(ViewerError::from)?
    };
    opts.validate()?;
    Ok(opts)
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    let serializer = serde_wasm_bindgen::Serializer::json_compatible();
    value
        .serialize(&serializer)
        .map_err(|e| ViewerError::from(e).into())
}
