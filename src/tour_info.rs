//! Tour number taken from the upload's file name.
//!
//! Dispatch exports are named `DL<digits>.gpx`; the digits are the tour
//! number printed on the dashboard.
//!
//! ```
//! use tour_viewer_wasm::tour_info::tour_number;
//!
//! assert_eq!(tour_number("DL12345.gpx"), Some("12345"));
//! assert_eq!(tour_number("DL007.GPX"), Some("007"));
//! assert_eq!(tour_number("Route.gpx"), None);
//! ```

const PREFIX: &str = "DL";
const EXTENSION: &str = ".gpx";

pub const TOUR_LABEL: &str = "Tour Nr.";
pub const DATE_LABEL: &str = "Datum:";
pub const SEPARATOR: &str = " | ";

/// The text between `DL` and the `.gpx` extension (extension matched
/// case-insensitively). Directory components are ignored. The number is
/// returned as written, leading zeros included.
pub fn tour_number(file_name: &str) -> Option<&str> {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    let split = base.len().checked_sub(EXTENSION.len())?;
    if !base.is_char_boundary(split) || !base[split..].eq_ignore_ascii_case(EXTENSION) {
        return None;
    }

    let number = base[..split].strip_prefix(PREFIX)?;
    if number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(number)
}

/// `Tour Nr. 12345 | Datum: 01.06.2024`, with either part omitted when
/// unknown. `None` when there is nothing to show.
pub fn tour_info_line(tour_number: Option<&str>, date: Option<&str>) -> Option<String> {
    let parts: Vec<String> = [
        tour_number.map(|n| format!("{TOUR_LABEL} {n}")),
        date.map(|d| format!("{DATE_LABEL} {d}")),
    ]
    .into_iter()
    .flatten()
    .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(SEPARATOR))
    }
}
