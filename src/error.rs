use std::str::Utf8Error;

use thiserror::Error;
use wasm_bindgen::JsValue;

/// Failure to read an uploaded file as a GPX document.
///
/// Always fatal for the upload it belongs to; the message is shown to the
/// user verbatim.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("XML parse error: {0}")]
    XmlParse(#[from] quick_xml::Error),
    #[error("file is not valid UTF-8: {0}")]
    Encoding(#[from] Utf8Error),
    #[error("document has no <gpx> root element")]
    MissingRoot,
    #[error("unexpected root element <{0}>, expected <gpx>")]
    NotGpx(String),
    #[error("document ends inside <{0}>")]
    UnexpectedEof(String),
    #[error("unexpected {0} after the closing </gpx>")]
    TrailingContent(String),
    #[error("Missing attribute '{attribute}' on <{element}>")]
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
    },
    #[error("Invalid value '{value}' for attribute '{attribute}' on <{element}>")]
    InvalidAttribute {
        element: &'static str,
        attribute: &'static str,
        value: String,
    },
}

#[derive(Debug, Error)]
pub enum ViewerError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("invalid viewer options: {0}")]
    Options(String),
    #[error("no rendered tour to export")]
    NothingToExport,
    #[error("serialization failed: {0}")]
    Serialize(String),
}

impl From<serde_json::Error> for ViewerError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialize(e.to_string())
    }
}

impl From<serde_wasm_bindgen::Error> for ViewerError {
    fn from(e: serde_wasm_bindgen::Error) -> Self {
        Self::Serialize(e.to_string())
    }
}

impl From<ViewerError> for JsValue {
    fn from(e: ViewerError) -> Self {
        js_sys::Error::new(&e.to_string()).into()
    }
}
