use chrono::{DateTime, NaiveDateTime, Utc};
use log::{debug, warn};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::ParseError;
use crate::gpx_types::*;

type Result<T> = std::result::Result<T, ParseError>;

const UTF8_BOM: char = '\u{feff}';

/// Parse raw upload bytes into GpxData.
pub fn parse_gpx_bytes(bytes: &[u8]) -> Result<GpxData> {
    let xml = std::str::from_utf8(bytes)?;
    parse_gpx(xml.strip_prefix(UTF8_BOM).unwrap_or(xml))
}

/// Parse a GPX XML string into GpxData.
///
/// The whole input must be well formed, including anything after the
/// closing `</gpx>`; a truncated or otherwise broken document yields no data
/// at all.
pub fn parse_gpx(xml: &str) -> Result<GpxData> {
    let mut reader = Reader::from_str(xml);

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                check_root(&e)?;
                let data = parse_document(&mut reader)?;
                check_epilog(&mut reader)?;
                return Ok(data);
            }
            Ok(Event::Empty(e)) => {
                check_root(&e)?;
                check_epilog(&mut reader)?;
                return Ok(GpxData::default());
            }
            Ok(Event::Eof) => return Err(ParseError::MissingRoot),
            Err(e) => return Err(ParseError::XmlParse(e)),
            // declaration, doctype, comments, whitespace
            _ => {}
        }
    }
}

fn check_root(e: &BytesStart<'_>) -> Result<()> {
    if e.local_name().as_ref() == b"gpx" {
        Ok(())
    } else {
        Err(ParseError::NotGpx(element_name(e)))
    }
}

/// Only comments, processing instructions and whitespace may follow the root.
fn check_epilog(reader: &mut Reader<&[u8]>) -> Result<()> {
    loop {
        match reader.read_event() {
            Ok(Event::Eof) => return Ok(()),
            Ok(Event::Start(e) | Event::Empty(e)) => {
                return Err(ParseError::TrailingContent(format!("<{}>", element_name(&e))));
            }
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                return Err(ParseError::TrailingContent(format!("</{name}>")));
            }
            Ok(Event::Text(e)) if !e.iter().all(u8::is_ascii_whitespace) => {
                return Err(ParseError::TrailingContent("text".to_string()));
            }
            Ok(Event::CData(_)) | Ok(Event::GeneralRef(_)) => {
                return Err(ParseError::TrailingContent("text".to_string()));
            }
            Err(e) => return Err(ParseError::XmlParse(e)),
            _ => {}
        }
    }
}

/// Parse the children of <gpx>.
fn parse_document<'a>(reader: &mut Reader<&'a [u8]>) -> Result<GpxData> {
    let mut data = GpxData::default();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"trk" => data.tracks.push(parse_track(reader)?),
                b"rte" => data.routes.push(parse_route(reader)?),
                _ => {
                    // metadata, wpt, extensions
                    reader
                        .read_to_end(e.name())
                        .map_err(ParseError::XmlParse)?;
                }
            },
            Ok(Event::End(e)) if e.local_name().as_ref() == b"gpx" => break,
            Ok(Event::Eof) => return Err(ParseError::UnexpectedEof("gpx".to_string())),
            Err(e) => return Err(ParseError::XmlParse(e)),
            _ => {}
        }
    }

    debug!(
        "parsed GPX document with {} track(s) and {} route(s)",
        data.tracks.len(),
        data.routes.len()
    );
    Ok(data)
}

/// Parse lat/lon attributes from a point element's start tag.
fn parse_lat_lon(e: &BytesStart<'_>, element: &'static str) -> Result<(f64, f64)> {
    let mut lat: Option<f64> = None;
    let mut lon: Option<f64> = None;

    for attr_result in e.attributes() {
        let attr = attr_result.map_err(|e| ParseError::XmlParse(e.into()))?;
        let val = std::str::from_utf8(&attr.value).unwrap_or_default();
        match attr.key.local_name().as_ref() {
            b"lat" => lat = Some(parse_coordinate(val, element, "lat", 90.0)?),
            b"lon" => lon = Some(parse_coordinate(val, element, "lon", 180.0)?),
            _ => {}
        }
    }

    let lat = lat.ok_or(ParseError::MissingAttribute {
        element,
        attribute: "lat",
    })?;
    let lon = lon.ok_or(ParseError::MissingAttribute {
        element,
        attribute: "lon",
    })?;

    Ok((lat, lon))
}

fn parse_coordinate(
    val: &str,
    element: &'static str,
    attribute: &'static str,
    limit: f64,
) -> Result<f64> {
    let invalid = || ParseError::InvalidAttribute {
        element,
        attribute,
        value: val.to_string(),
    };
    let parsed = val.trim().parse::<f64>().map_err(|_| invalid())?;
    if parsed.is_finite() && (-limit..=limit).contains(&parsed) {
        Ok(parsed)
    } else {
        Err(invalid())
    }
}

/// Parse a point element (rtept, trkpt) and its children.
/// Called after receiving Event::Start for the point element.
fn parse_point<'a>(
    start: &BytesStart<'a>,
    reader: &mut Reader<&'a [u8]>,
    element: &'static str,
) -> Result<GpxPoint> {
    let (lat, lon) = parse_lat_lon(start, element)?;
    let mut point = GpxPoint::new(lat, lon);
    let end_name = start.name().0.to_vec();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"ele" => {
                    point.ele = read_text_owned(reader, &e)?.trim().parse::<f64>().ok();
                }
                b"time" => {
                    let text = read_text_owned(reader, &e)?;
                    point.time = parse_time(&text);
                    if point.time.is_none() {
                        warn!("ignoring unreadable timestamp {text:?} on <{element}>");
                    }
                }
                _ => {
                    // name, desc, speed, extensions, ...
                    reader
                        .read_to_end(e.name())
                        .map_err(ParseError::XmlParse)?;
                }
            },
            Ok(Event::End(e)) if e.name().0 == end_name.as_slice() => break,
            Ok(Event::Eof) => return Err(ParseError::UnexpectedEof(element.to_string())),
            Err(e) => return Err(ParseError::XmlParse(e)),
            _ => {}
        }
    }

    Ok(point)
}

/// GPX times are RFC 3339; a value without zone designator is taken as UTC.
pub fn parse_time(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Parse a <rte> element.
fn parse_route<'a>(reader: &mut Reader<&'a [u8]>) -> Result<GpxRoute> {
    let mut route = GpxRoute::default();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"name" => route.name = Some(read_text_owned(reader, &e)?),
                b"rtept" => route.points.push(parse_point(&e, reader, "rtept")?),
                _ => {
                    reader
                        .read_to_end(e.name())
                        .map_err(ParseError::XmlParse)?;
                }
            },
            Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() == b"rtept" {
                    let (lat, lon) = parse_lat_lon(&e, "rtept")?;
                    route.points.push(GpxPoint::new(lat, lon));
                }
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"rte" => break,
            Ok(Event::Eof) => return Err(ParseError::UnexpectedEof("rte".to_string())),
            Err(e) => return Err(ParseError::XmlParse(e)),
            _ => {}
        }
    }

    Ok(route)
}

/// Parse a <trk> element.
fn parse_track<'a>(reader: &mut Reader<&'a [u8]>) -> Result<GpxTrack> {
    let mut track = GpxTrack::default();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"name" => track.name = Some(read_text_owned(reader, &e)?),
                b"trkseg" => {
                    let seg = parse_segment(reader)?;
                    if !seg.points.is_empty() {
                        track.segments.push(seg);
                    }
                }
                _ => {
                    reader
                        .read_to_end(e.name())
                        .map_err(ParseError::XmlParse)?;
                }
            },
            Ok(Event::End(e)) if e.local_name().as_ref() == b"trk" => break,
            Ok(Event::Eof) => return Err(ParseError::UnexpectedEof("trk".to_string())),
            Err(e) => return Err(ParseError::XmlParse(e)),
            _ => {}
        }
    }

    Ok(track)
}

/// Parse a <trkseg> element.
fn parse_segment<'a>(reader: &mut Reader<&'a [u8]>) -> Result<GpxSegment> {
    let mut segment = GpxSegment::default();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"trkpt" => segment.points.push(parse_point(&e, reader, "trkpt")?),
                _ => {
                    reader
                        .read_to_end(e.name())
                        .map_err(ParseError::XmlParse)?;
                }
            },
            Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() == b"trkpt" {
                    let (lat, lon) = parse_lat_lon(&e, "trkpt")?;
                    segment.points.push(GpxPoint::new(lat, lon));
                }
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"trkseg" => break,
            Ok(Event::Eof) => return Err(ParseError::UnexpectedEof("trkseg".to_string())),
            Err(e) => return Err(ParseError::XmlParse(e)),
            _ => {}
        }
    }

    Ok(segment)
}

/// Read text content of an element as an owned String.
/// Handles regular text, CDATA sections, and entity references (Event::GeneralRef).
fn read_text_owned<'a>(reader: &mut Reader<&'a [u8]>, start: &BytesStart<'_>) -> Result<String> {
    let end_name = start.name().0.to_vec();
    let mut text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Text(e)) => {
                text.push_str(std::str::from_utf8(e.as_ref()).unwrap_or_default());
            }
            Ok(Event::CData(e)) => {
                text.push_str(std::str::from_utf8(e.as_ref()).unwrap_or_default());
            }
            Ok(Event::GeneralRef(e)) => {
                if let Ok(Some(ch)) = e.resolve_char_ref() {
                    text.push(ch);
                } else {
                    match std::str::from_utf8(e.as_ref()).unwrap_or_default() {
                        "amp" => text.push('&'),
                        "lt" => text.push('<'),
                        "gt" => text.push('>'),
                        "quot" => text.push('"'),
                        "apos" => text.push('\''),
                        _ => {}
                    }
                }
            }
            Ok(Event::End(e)) if e.name().0 == end_name.as_slice() => break,
            Ok(Event::Eof) => return Err(ParseError::UnexpectedEof(element_name(start))),
            Err(e) => return Err(ParseError::XmlParse(e)),
            _ => {}
        }
    }

    Ok(text)
}

fn element_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_simple_track() {
        let xml = r#"<?xml version="1.0"?>
<gpx version="1.1">
  <trk>
    <name>Morning Tour</name>
    <trkseg>
      <trkpt lat="50.0" lon="8.0"><ele>10.0</ele></trkpt>
      <trkpt lat="50.001" lon="8.001"><ele>11.0</ele></trkpt>
      <trkpt lat="50.002" lon="8.002"><ele>12.0</ele></trkpt>
    </trkseg>
  </trk>
</gpx>"#;
        let data = parse_gpx(xml).unwrap();
        assert_eq!(data.tracks.len(), 1);
        assert_eq!(data.tracks[0].name.as_deref(), Some("Morning Tour"));
        assert_eq!(data.tracks[0].segments[0].points.len(), 3);
        assert_eq!(data.tracks[0].segments[0].points[2].ele, Some(12.0));
    }

    #[test]
    fn test_multi_segment_track() {
        let xml = r#"<?xml version="1.0"?>
<gpx version="1.1">
  <trk>
    <trkseg>
      <trkpt lat="50.0" lon="8.0"/>
      <trkpt lat="50.001" lon="8.001"/>
    </trkseg>
    <trkseg>
      <trkpt lat="51.0" lon="9.0"/>
    </trkseg>
  </trk>
</gpx>"#;
        let data = parse_gpx(xml).unwrap();
        assert_eq!(data.tracks[0].segments.len(), 2);
        assert_eq!(data.segments().len(), 2);
    }

    #[test]
    fn test_empty_segment_skipped() {
        let xml = r#"<?xml version="1.0"?>
<gpx version="1.1">
  <trk>
    <trkseg></trkseg>
    <trkseg><trkpt lat="50.0" lon="8.0"/></trkseg>
  </trk>
</gpx>"#;
        let data = parse_gpx(xml).unwrap();
        assert_eq!(data.tracks[0].segments.len(), 1);
    }

    #[test]
    fn test_route_points() {
        let xml = r#"<?xml version="1.0"?>
<gpx version="1.1">
  <rte>
    <name>Depot Run</name>
    <rtept lat="50.0" lon="8.0"/>
    <rtept lat="50.1" lon="8.1"><name>Stop</name></rtept>
  </rte>
</gpx>"#;
        let data = parse_gpx(xml).unwrap();
        assert_eq!(data.routes[0].points.len(), 2);
        assert_eq!(data.name(), Some("Depot Run"));
        assert_eq!(data.segments().len(), 1);
    }

    #[test]
    fn test_tracks_win_over_routes() {
        let xml = r#"<?xml version="1.0"?>
<gpx version="1.1">
  <rte><rtept lat="1.0" lon="1.0"/><rtept lat="2.0" lon="2.0"/></rte>
  <trk><trkseg><trkpt lat="50.0" lon="8.0"/></trkseg></trk>
</gpx>"#;
        let data = parse_gpx(xml).unwrap();
        let segments = data.segments();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0][0].lat, 50.0);
    }

    #[test]
    fn test_empty_gpx() {
        let data = parse_gpx(r#"<?xml version="1.0"?><gpx version="1.1"></gpx>"#).unwrap();
        assert!(data.tracks.is_empty());
        assert!(data.routes.is_empty());

        let data = parse_gpx(r#"<gpx version="1.1"/>"#).unwrap();
        assert!(data.segments().is_empty());
    }

    #[test]
    fn test_waypoints_and_metadata_skipped() {
        let xml = r#"<?xml version="1.0"?>
<gpx xmlns="http://www.topografix.com/GPX/1/1" version="1.1">
  <metadata><name>Export</name><time>2024-06-01T08:00:00Z</time></metadata>
  <wpt lat="35.0" lon="139.0"><name>Depot</name></wpt>
</gpx>"#;
        let data = parse_gpx(xml).unwrap();
        assert!(data.segments().is_empty());
    }

    #[test]
    fn test_extensions_skipped() {
        let xml = r#"<?xml version="1.0"?>
<gpx version="1.1">
  <trk>
    <trkseg>
      <trkpt lat="50.0" lon="8.0">
        <time>2024-06-01T10:00:00Z</time>
        <extensions>
          <gpxtpx:TrackPointExtension xmlns:gpxtpx="http://www.garmin.com/xmlschemas/TrackPointExtension/v1">
            <gpxtpx:speed>12.5</gpxtpx:speed>
          </gpxtpx:TrackPointExtension>
        </extensions>
      </trkpt>
    </trkseg>
  </trk>
</gpx>"#;
        let data = parse_gpx(xml).unwrap();
        let pt = &data.tracks[0].segments[0].points[0];
        assert_eq!(pt.time, Some(Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap()));
    }

    #[test]
    fn test_prefixed_namespace() {
        let xml = r#"<?xml version="1.0"?>
<g:gpx xmlns:g="http://www.topografix.com/GPX/1/1" version="1.1">
  <g:trk><g:trkseg><g:trkpt lat="50.0" lon="8.0"/></g:trkseg></g:trk>
</g:gpx>"#;
        let data = parse_gpx(xml).unwrap();
        assert_eq!(data.segments()[0].len(), 1);
    }

    #[test]
    fn test_cdata_and_entities_in_name() {
        let xml = r#"<?xml version="1.0"?>
<gpx version="1.1">
  <trk><name><![CDATA[Nord & Süd]]></name><trkseg><trkpt lat="50.0" lon="8.0"/></trkseg></trk>
  <rte><name>A &amp; B</name></rte>
</gpx>"#;
        let data = parse_gpx(xml).unwrap();
        assert_eq!(data.tracks[0].name.as_deref(), Some("Nord & Süd"));
        assert_eq!(data.routes[0].name.as_deref(), Some("A & B"));
    }

    #[test]
    fn test_truncated_document_fails() {
        let xml = r#"<?xml version="1.0"?>
<gpx version="1.1">
  <trk>
    <trkseg>
      <trkpt lat="50.0" lon="8.0"/>"#;
        assert!(parse_gpx(xml).is_err());
    }

    #[test]
    fn test_truncated_inside_tag_fails() {
        let xml = r#"<gpx version="1.1"><trk><trkseg><trkpt lat="50.0" lo"#;
        assert!(parse_gpx(xml).is_err());
    }

    #[test]
    fn test_mismatched_end_tag_fails() {
        let xml = r#"<gpx version="1.1"><trk><trkseg></trk></trkseg></gpx>"#;
        assert!(matches!(parse_gpx(xml), Err(ParseError::XmlParse(_))));
    }

    #[test]
    fn test_content_after_root_fails() {
        let xml = r#"<gpx version="1.1"><trk><trkseg><trkpt lat="50.0" lon="8.0"/></trkseg></trk></gpx><trk><broken"#;
        assert!(parse_gpx(xml).is_err());

        let xml = r#"<gpx version="1.1"></gpx><trk></trk>"#;
        assert!(matches!(parse_gpx(xml), Err(ParseError::TrailingContent(_))));

        let xml = r#"<gpx version="1.1"/><wpt lat="1.0" lon="1.0"/>"#;
        assert!(matches!(parse_gpx(xml), Err(ParseError::TrailingContent(_))));

        let xml = r#"<gpx version="1.1"></gpx> leftovers"#;
        assert!(matches!(parse_gpx(xml), Err(ParseError::TrailingContent(_))));
    }

    #[test]
    fn test_comments_after_root_are_fine() {
        let xml = "<gpx version=\"1.1\"></gpx>\n<!-- exported by fleet tool -->\n";
        assert!(parse_gpx(xml).is_ok());
    }

    #[test]
    fn test_missing_root() {
        assert!(matches!(parse_gpx(""), Err(ParseError::MissingRoot)));
        assert!(matches!(parse_gpx("just some text"), Err(ParseError::MissingRoot)));
    }

    #[test]
    fn test_wrong_root() {
        let err = parse_gpx(r#"<kml><Document/></kml>"#).unwrap_err();
        assert!(matches!(err, ParseError::NotGpx(ref name) if name == "kml"));
    }

    #[test]
    fn test_missing_lat_is_an_error() {
        let xml = r#"<gpx version="1.1"><trk><trkseg><trkpt lon="8.0"/></trkseg></trk></gpx>"#;
        let err = parse_gpx(xml).unwrap_err();
        assert!(matches!(
            err,
            ParseError::MissingAttribute {
                element: "trkpt",
                attribute: "lat"
            }
        ));
    }

    #[test]
    fn test_invalid_and_out_of_range_coordinates() {
        let xml = r#"<gpx version="1.1"><rte><rtept lat="abc" lon="8.0"/></rte></gpx>"#;
        assert!(matches!(
            parse_gpx(xml),
            Err(ParseError::InvalidAttribute { attribute: "lat", .. })
        ));

        let xml = r#"<gpx version="1.1"><rte><rtept lat="50.0" lon="181.0"/></rte></gpx>"#;
        assert!(matches!(
            parse_gpx(xml),
            Err(ParseError::InvalidAttribute { attribute: "lon", .. })
        ));
    }

    #[test]
    fn test_unreadable_time_is_dropped() {
        let xml = r#"<gpx version="1.1"><trk><trkseg>
  <trkpt lat="50.0" lon="8.0"><time>yesterday</time></trkpt>
</trkseg></trk></gpx>"#;
        let data = parse_gpx(xml).unwrap();
        assert!(data.tracks[0].segments[0].points[0].time.is_none());
    }

    #[test]
    fn test_parse_time_variants() {
        let expected = Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap();
        assert_eq!(parse_time("2024-06-01T10:00:00Z"), Some(expected));
        assert_eq!(parse_time(" 2024-06-01T12:00:00+02:00 "), Some(expected));
        assert_eq!(parse_time("2024-06-01T10:00:00"), Some(expected));
        assert!(parse_time("2024-06-01T10:00:00.250Z").is_some());
        assert!(parse_time("").is_none());
    }

    #[test]
    fn test_bytes_with_bom_and_bad_utf8() {
        let mut bytes = "\u{feff}".as_bytes().to_vec();
        bytes.extend_from_slice(br#"<gpx version="1.1"></gpx>"#);
        assert!(parse_gpx_bytes(&bytes).is_ok());

        assert!(matches!(
            parse_gpx_bytes(&[0x3c, 0xff, 0xfe]),
            Err(ParseError::Encoding(_))
        ));
    }
}
