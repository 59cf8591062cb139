//! HTML rendering for the dashboard, inline messages, the standalone map
//! document and the page stylesheet.

use geojson::{Feature, FeatureCollection, Geometry, Value};
use serde_json::{Map, Value as JsonValue, json};

use crate::error::ViewerError;
use crate::options::{MapStyle, ViewerOptions};
use crate::stats::MovementSummary;
use crate::track::{Track, Waypoint};

pub const PLACEHOLDER: &str = "-";
pub const NO_WAYPOINTS_MESSAGE: &str = "Keine Wegpunkte in der GPX-Datei gefunden.";
pub const DEFAULT_MAP_TITLE: &str = "LKW Tour";

const BRAND_BLUE: &str = "#2654aa";
const HEADER_BAR_PX: u32 = 80;

const LEAFLET_CSS: &str = "https://cdn.jsdelivr.net/npm/leaflet@1.9.3/dist/leaflet.css";
const LEAFLET_JS: &str = "https://cdn.jsdelivr.net/npm/leaflet@1.9.3/dist/leaflet.js";
const AWESOME_MARKERS_CSS: &str =
    "https://cdnjs.cloudflare.com/ajax/libs/Leaflet.awesome-markers/2.0.2/leaflet.awesome-markers.css";
const AWESOME_MARKERS_JS: &str =
    "https://cdnjs.cloudflare.com/ajax/libs/Leaflet.awesome-markers/2.0.2/leaflet.awesome-markers.js";
const GLYPHICONS_CSS: &str =
    "https://netdna.bootstrapcdn.com/bootstrap/3.0.0/css/bootstrap-glyphicons.css";

const MAP_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>__TITLE__</title>
<link rel="stylesheet" href="__LEAFLET_CSS__">
<link rel="stylesheet" href="__AWESOME_MARKERS_CSS__">
<link rel="stylesheet" href="__GLYPHICONS_CSS__">
<script src="__LEAFLET_JS__"></script>
<script src="__AWESOME_MARKERS_JS__"></script>
<style>
html, body { width: 100%; height: 100%; margin: 0; padding: 0; }
#map { position: absolute; top: 0; bottom: 0; right: 0; left: 0; }
</style>
</head>
<body>
<div id="map"></div>
<script>
const tour = __TOUR__;
const lineStyle = __STYLE__;
const map = L.map("map", { center: __CENTER__, zoom: __ZOOM__ });
L.tileLayer("https://tile.openstreetmap.org/{z}/{x}/{y}.png", {
  maxZoom: 19,
  attribution: "&copy; OpenStreetMap contributors",
}).addTo(map);
L.geoJSON(tour, {
  style: () => lineStyle,
  pointToLayer: (feature, latlng) => L.marker(latlng, {
    icon: L.AwesomeMarkers.icon({
      icon: feature.properties.icon,
      markerColor: feature.properties.markerColor,
      prefix: "glyphicon",
    }),
  }),
  onEachFeature: (feature, layer) => {
    if (feature.properties.popup) {
      layer.bindPopup(feature.properties.popup);
    }
  },
}).addTo(map);
</script>
</body>
</html>
"#;

const PAGE_STYLE_TEMPLATE: &str = r#"body { margin: 0; background-color: __BLUE__; color: white; font-family: "Source Sans Pro", sans-serif; }
.header { position: fixed; top: 0; left: 0; width: 100%; height: __BAR__px; box-sizing: border-box; background-color: white; padding: 10px 30px; z-index: 10000; box-shadow: 0 2px 5px rgba(0,0,0,0.1); display: flex; align-items: center; }
.header img { height: 60px; width: auto; }
.header h2 { color: __BLUE__; margin: 0; }
.controls { position: fixed; top: __BAR__px; left: 0; width: 100%; box-sizing: border-box; background-color: __BLUE__; z-index: 9999; padding: 0 5rem 20px; }
.controls h2 { text-align: center; margin-top: 20px; }
.content { padding: __HEADER__px 5rem 2rem; }
.upload { display: block; text-align: center; font-weight: bold; padding: 1rem; border: 2px dashed rgba(255,255,255,0.5); border-radius: 10px; }
.tour-info { text-align: center; font-weight: bold; }
.metric-row { display: flex; gap: 1rem; }
.metric { flex: 1; text-align: center; background: rgba(255,255,255,0.1); padding: 10px; border-radius: 10px; }
.message { padding: 10px; border-radius: 10px; }
.message.error { background-color: #ffdddd; color: #8a1f11; }
.message.notice { background-color: #fff3cd; color: black; }
.map-frame { width: 100%; border: 0; }
"#;

/// Escape text for use in HTML content and attribute values.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

pub fn format_distance(distance_km: f64) -> String {
    format!("{distance_km:.2} km")
}

/// Average speed for display; anything but a positive finite number shows
/// as the placeholder.
pub fn format_speed(speed_kmh: f64) -> String {
    if speed_kmh.is_finite() && speed_kmh > 0.0 {
        format!("{speed_kmh:.1} km/h")
    } else {
        PLACEHOLDER.to_string()
    }
}

/// Statistics cards for one tour.
pub fn dashboard_html(summary: &MovementSummary, tour_info: Option<&str>) -> String {
    let clock = |value: &Option<String>| escape_html(value.as_deref().unwrap_or(PLACEHOLDER));

    let mut lines = vec![r#"<div class="tour-dashboard">"#.to_string()];
    if let Some(info) = tour_info {
        lines.push(format!(
            r#"<p class="tour-info">📋 {}</p>"#,
            escape_html(info)
        ));
    }
    lines.push(r#"<div class="metric-row">"#.to_string());
    lines.push(format!(
        r#"<h3 class="metric">📏 Distanz: {}</h3>"#,
        format_distance(summary.distance_km)
    ));
    lines.push(format!(
        r#"<h3 class="metric">🚚 Ø Geschw.: {}</h3>"#,
        format_speed(summary.average_speed_kmh)
    ));
    lines.push("</div>".to_string());
    lines.push(r#"<div class="metric-row">"#.to_string());
    lines.push(format!(
        r#"<h3 class="metric">🕒 Start: {}</h3>"#,
        clock(&summary.start_time)
    ));
    lines.push(format!(
        r#"<h3 class="metric">🏁 Ende: {}</h3>"#,
        clock(&summary.end_time)
    ));
    lines.push("</div>".to_string());
    lines.push("</div>".to_string());
    lines.join("\n")
}

pub fn error_html(message: &str) -> String {
    format!(
        r#"<div class="message error" role="alert">Fehler: {}</div>"#,
        escape_html(message)
    )
}

pub fn notice_html(message: &str) -> String {
    format!(
        r#"<div class="message notice">{}</div>"#,
        escape_html(message)
    )
}

/// The track as GeoJSON: one LineString plus start and end markers.
pub fn track_geojson(track: &Track) -> FeatureCollection {
    let mut features = Vec::new();

    if track.len() >= 2 {
        let coords: Vec<Vec<f64>> = track.waypoints().iter().map(position).collect();
        let mut props = Map::new();
        props.insert("role".to_string(), JsonValue::String("track".to_string()));
        features.push(feature(Value::LineString(coords), props));
    }

    if let (Some(first), Some(last)) = (track.first(), track.last()) {
        features.push(marker_feature(first, "start", "Start", "green", "play"));
        features.push(marker_feature(last, "end", "Ziel", "black", "flag"));
    }

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

fn marker_feature(wp: &Waypoint, role: &str, popup: &str, color: &str, icon: &str) -> Feature {
    let mut props = Map::new();
    props.insert("role".to_string(), JsonValue::String(role.to_string()));
    props.insert("popup".to_string(), JsonValue::String(popup.to_string()));
    props.insert("markerColor".to_string(), JsonValue::String(color.to_string()));
    props.insert("icon".to_string(), JsonValue::String(icon.to_string()));
    feature(Value::Point(position(wp)), props)
}

fn feature(value: Value, props: Map<String, JsonValue>) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(value)),
        id: None,
        properties: Some(props),
        foreign_members: None,
    }
}

/// GeoJSON order: [lon, lat].
fn position(wp: &Waypoint) -> Vec<f64> {
    vec![wp.longitude, wp.latitude]
}

/// Self-contained Leaflet page showing the track. `None` for an empty track.
pub fn map_document(
    track: &Track,
    title: Option<&str>,
    style: &MapStyle,
) -> Result<Option<String>, ViewerError> {
    let Some(center) = track.center() else {
        return Ok(None);
    };

    let tour = serde_json::to_string(&track_geojson(track))?;
    let line_style = json!({
        "color": style.line_color,
        "weight": style.line_weight,
        "opacity": style.line_opacity,
    });
    let center = json!([center.latitude, center.longitude]);

    let title = escape_html(title.unwrap_or(DEFAULT_MAP_TITLE));
    let html = fill_template(
        MAP_TEMPLATE,
        &[
            ("__LEAFLET_CSS__", LEAFLET_CSS),
            ("__LEAFLET_JS__", LEAFLET_JS),
            ("__AWESOME_MARKERS_CSS__", AWESOME_MARKERS_CSS),
            ("__AWESOME_MARKERS_JS__", AWESOME_MARKERS_JS),
            ("__GLYPHICONS_CSS__", GLYPHICONS_CSS),
            ("__TITLE__", title.as_str()),
            ("__CENTER__", center.to_string().as_str()),
            ("__ZOOM__", style.zoom_start.to_string().as_str()),
            ("__STYLE__", script_json(&line_style.to_string()).as_str()),
            ("__TOUR__", script_json(&tour).as_str()),
        ],
    );
    Ok(Some(html))
}

/// Substitute `__KEY__` placeholders in one pass; substituted values are
/// never scanned again.
fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("__") {
        let tail = &rest[start..];
        match values.iter().find(|(key, _)| tail.starts_with(key)) {
            Some((key, value)) => {
                out.push_str(&rest[..start]);
                out.push_str(value);
                rest = &tail[key.len()..];
            }
            None => {
                out.push_str(&rest[..start + 2]);
                rest = &tail[2..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// JSON embedded in a <script> block must not close it early.
fn script_json(json: &str) -> String {
    json.replace("</", "<\\/")
}

/// The map document shown inline, inside a sandboxed frame.
pub fn map_frame_html(document: &str, height_px: u32) -> String {
    format!(
        r#"<iframe class="map-frame" title="Karte" height="{height_px}" sandbox="allow-scripts" srcdoc="{}"></iframe>"#,
        escape_html(document)
    )
}

/// Stylesheet for the page shell.
pub fn page_styles(opts: &ViewerOptions) -> String {
    fill_template(
        PAGE_STYLE_TEMPLATE,
        &[
            ("__BLUE__", BRAND_BLUE),
            ("__BAR__", HEADER_BAR_PX.to_string().as_str()),
            ("__HEADER__", opts.header_height_px.to_string().as_str()),
        ],
    )
}

/// The fixed page header: the logo when one is configured, else the brand
/// text.
pub fn header_html(opts: &ViewerOptions) -> String {
    match &opts.logo_data_url {
        Some(logo) => format!(
            r#"<div class="header"><img src="{}" alt="{}"></div>"#,
            escape_html(logo),
            escape_html(&opts.brand_text)
        ),
        None => format!(
            r#"<div class="header"><h2>{}</h2></div>"#,
            escape_html(&opts.brand_text)
        ),
    }
}
