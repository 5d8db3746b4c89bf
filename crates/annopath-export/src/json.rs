//! Annotation path JSON serializer and lenient parser.
//!
//! The document is a top-level array with one object per class color,
//! in ascending color order:
//!
//! ```text
//! [
//!     {
//!         "color": { "r": 255, "g": 0, "b": 0, "a": 255 },
//!         "color_paths": [
//!             [ { "x": 1, "y": 1 }, { "x": 1, "y": 2 }, ... ],
//!             ...
//!         ]
//!     },
//!     ...
//! ]
//! ```
//!
//! Encoding is pretty-printed with a four-space indent and a fixed key
//! order so output diffs cleanly between runs.
//!
//! Decoding never fails. Previously written files may have been edited by
//! hand or by other tools, so anything that does not fit the schema is
//! skipped at the smallest possible granularity (document, entry, path or
//! point) and reported as a [`DecodeIssue`].

use serde::Serialize;
use serde_json::Value;

use annopath_pipeline::{AnnotationDocument, PixelColor, Point, Polygon};

/// Errors that can occur while encoding a document.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The JSON serializer failed.
    #[error("failed to serialize annotation document: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Serialize)]
struct EntryRecord<'a> {
    color: PixelColor,
    color_paths: &'a [Polygon],
}

/// Serialize a document to pretty-printed JSON.
///
/// # Errors
///
/// Returns [`CodecError::Serialize`] if the serializer fails, which does
/// not happen for in-memory output in practice.
///
/// # Examples
///
/// ```
/// use annopath_pipeline::{AnnotationDocument, PixelColor, Point, Polygon};
///
/// let mut doc = AnnotationDocument::new();
/// doc.replace(
///     PixelColor::rgba(255, 0, 0, 255),
///     vec![Polygon::new(vec![Point::new(1, 1), Point::new(2, 1)])],
/// );
/// let json = annopath_export::encode_document(&doc).unwrap();
/// assert!(json.contains("\"color_paths\""));
/// ```
pub fn encode_document(document: &AnnotationDocument) -> Result<String, CodecError> {
    let records: Vec<EntryRecord<'_>> = document
        .iter()
        .map(|(color, color_paths)| EntryRecord { color, color_paths })
        .collect();

    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    records.serialize(&mut serializer)?;

    // serde_json only ever writes valid UTF-8.
    Ok(String::from_utf8_lossy(&out).into_owned())
}

/// A problem found while decoding, together with what was skipped.
///
/// `entry`, `path` and `point` are zero-based array indices.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeIssue {
    /// The bytes are not valid JSON.
    #[error("malformed JSON: {0}")]
    Malformed(String),

    /// The top-level value is not an array.
    #[error("top-level value is not an array; ignoring document")]
    NotAnArray,

    /// An entry is not a JSON object.
    #[error("entry {entry}: not an object; skipping entry")]
    EntryNotObject {
        /// Entry index.
        entry: usize,
    },

    /// An entry lacks `color` or `color_paths`.
    #[error("entry {entry}: missing `{field}`; skipping entry")]
    MissingField {
        /// Entry index.
        entry: usize,
        /// Name of the missing field.
        field: &'static str,
    },

    /// The `color` value is not an object.
    #[error("entry {entry}: `color` is not an object; skipping entry")]
    ColorNotObject {
        /// Entry index.
        entry: usize,
    },

    /// A required color channel is missing.
    #[error("entry {entry}: color has no `{channel}` channel; skipping entry")]
    MissingChannel {
        /// Entry index.
        entry: usize,
        /// Channel name.
        channel: &'static str,
    },

    /// A color channel is not an integer in `0..=255`.
    #[error("entry {entry}: color channel `{channel}` is not an integer in 0..=255; using 255")]
    InvalidChannel {
        /// Entry index.
        entry: usize,
        /// Channel name.
        channel: &'static str,
    },

    /// `color_paths` is not an array.
    #[error("entry {entry}: `color_paths` is not an array; skipping entry")]
    PathsNotArray {
        /// Entry index.
        entry: usize,
    },

    /// A path is not an array.
    #[error("entry {entry}, path {path}: not an array; skipping path")]
    PathNotArray {
        /// Entry index.
        entry: usize,
        /// Path index.
        path: usize,
    },

    /// A point is not an object with numeric `x` and `y`.
    #[error("entry {entry}, path {path}, point {point}: expected numeric `x` and `y`; skipping point")]
    InvalidPoint {
        /// Entry index.
        entry: usize,
        /// Path index.
        path: usize,
        /// Point index.
        point: usize,
    },

    /// A path had no usable points.
    #[error("entry {entry}, path {path}: no valid points; skipping path")]
    EmptyPath {
        /// Entry index.
        entry: usize,
        /// Path index.
        path: usize,
    },
}

/// The result of leniently decoding a document.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Decoded {
    /// Everything that could be recovered.
    pub document: AnnotationDocument,
    /// Problems encountered, in input order.
    pub issues: Vec<DecodeIssue>,
}

impl Decoded {
    /// Returns `true` if the input matched the schema exactly.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Parse a document, skipping anything that does not fit the schema.
///
/// Never fails: malformed input yields an empty or partial document plus
/// the list of problems found. Entries repeating a color are merged in
/// input order. An entry with a valid color and an empty `color_paths`
/// array still produces an (empty) entry.
#[must_use = "returns the decoded document and any issues"]
pub fn decode_document(bytes: &[u8]) -> Decoded {
    let mut decoded = Decoded::default();

    let value: Value = match serde_json::from_slice(bytes) {
        Ok(value) => value,
        Err(e) => {
            decoded.issues.push(DecodeIssue::Malformed(e.to_string()));
            return decoded;
        }
    };

    let Value::Array(entries) = value else {
        decoded.issues.push(DecodeIssue::NotAnArray);
        return decoded;
    };

    for (index, entry) in entries.iter().enumerate() {
        if let Some((color, polygons)) = decode_entry(index, entry, &mut decoded.issues) {
            decoded.document.append_polygons(color, polygons);
        }
    }

    tracing::debug!(
        classes = decoded.document.len(),
        polygons = decoded.document.polygon_count(),
        issues = decoded.issues.len(),
        "decoded annotation document"
    );
    decoded
}

fn decode_entry(
    entry: usize,
    value: &Value,
    issues: &mut Vec<DecodeIssue>,
) -> Option<(PixelColor, Vec<Polygon>)> {
    let Some(object) = value.as_object() else {
        issues.push(DecodeIssue::EntryNotObject { entry });
        return None;
    };

    let mut field = |name: &'static str| {
        let found = object.get(name);
        if found.is_none() {
            issues.push(DecodeIssue::MissingField { entry, field: name });
        }
        found
    };
    let color = field("color");
    let paths = field("color_paths");
    let (color, paths) = (color?, paths?);

    let color = decode_color(entry, color, issues)?;

    let Some(paths) = paths.as_array() else {
        issues.push(DecodeIssue::PathsNotArray { entry });
        return None;
    };

    let polygons = paths
        .iter()
        .enumerate()
        .filter_map(|(path, value)| decode_path(entry, path, value, issues))
        .collect();
    Some((color, polygons))
}

fn decode_color(entry: usize, value: &Value, issues: &mut Vec<DecodeIssue>) -> Option<PixelColor> {
    let Some(object) = value.as_object() else {
        issues.push(DecodeIssue::ColorNotObject { entry });
        return None;
    };

    let mut missing = false;
    for channel in ["r", "g", "b"] {
        if !object.contains_key(channel) {
            issues.push(DecodeIssue::MissingChannel { entry, channel });
            missing = true;
        }
    }
    if missing {
        return None;
    }

    let mut channel = |name: &'static str| match object.get(name) {
        None => PixelColor::OPAQUE,
        Some(v) => v.as_u64().and_then(|n| u8::try_from(n).ok()).unwrap_or_else(|| {
            issues.push(DecodeIssue::InvalidChannel {
                entry,
                channel: name,
            });
            PixelColor::OPAQUE
        }),
    };
    let r = channel("r");
    let g = channel("g");
    let b = channel("b");
    let a = channel("a");
    Some(PixelColor::rgba(r, g, b, a))
}

fn decode_path(
    entry: usize,
    path: usize,
    value: &Value,
    issues: &mut Vec<DecodeIssue>,
) -> Option<Polygon> {
    let Some(points) = value.as_array() else {
        issues.push(DecodeIssue::PathNotArray { entry, path });
        return None;
    };

    let polygon: Polygon = points
        .iter()
        .enumerate()
        .filter_map(|(point, value)| {
            let decoded = decode_point(value);
            if decoded.is_none() {
                issues.push(DecodeIssue::InvalidPoint { entry, path, point });
            }
            decoded
        })
        .collect();

    if polygon.is_empty() {
        issues.push(DecodeIssue::EmptyPath { entry, path });
        return None;
    }
    Some(polygon)
}

fn decode_point(value: &Value) -> Option<Point> {
    let object = value.as_object()?;
    let x = coordinate(object.get("x")?)?;
    let y = coordinate(object.get("y")?)?;
    Some(Point::new(x, y))
}

/// Integers must fit in `i32`; fractional numbers are truncated toward zero.
#[allow(clippy::cast_possible_truncation)]
fn coordinate(value: &Value) -> Option<i32> {
    if let Some(n) = value.as_i64() {
        return i32::try_from(n).ok();
    }
    let f = value.as_f64()?;
    let in_range = f.is_finite() && f > f64::from(i32::MIN) - 1.0 && f < f64::from(i32::MAX) + 1.0;
    in_range.then(|| f.trunc() as i32)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const RED: PixelColor = PixelColor::rgba(255, 0, 0, 255);

    fn polygon(coords: &[(i32, i32)]) -> Polygon {
        coords.iter().map(|&(x, y)| Point::new(x, y)).collect()
    }

    fn square() -> Polygon {
        polygon(&[(1, 1), (1, 2), (2, 2), (2, 1)])
    }

    // --- encode ---

    #[test]
    fn empty_document_encodes_as_empty_array() {
        let json = encode_document(&AnnotationDocument::new()).unwrap();
        assert_eq!(json, "[]");
    }

    #[test]
    fn encode_uses_schema_and_key_order() {
        let mut doc = AnnotationDocument::new();
        doc.replace(RED, vec![square()]);
        let json = encode_document(&doc).unwrap();

        let color_pos = json.find("\"color\"").unwrap();
        let paths_pos = json.find("\"color_paths\"").unwrap();
        assert!(color_pos < paths_pos);

        let order: Vec<usize> = ["\"r\"", "\"g\"", "\"b\"", "\"a\""]
            .iter()
            .map(|k| json.find(k).unwrap())
            .collect();
        assert!(order.windows(2).all(|w| w[0] < w[1]), "channel order: {order:?}");
        assert!(json.find("\"x\"").unwrap() < json.find("\"y\"").unwrap());

        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["color"]["r"], 255);
        assert_eq!(value[0]["color"]["a"], 255);
        assert_eq!(value[0]["color_paths"][0].as_array().unwrap().len(), 4);
        assert_eq!(value[0]["color_paths"][0][2]["x"], 2);
    }

    #[test]
    fn encode_is_pretty_with_four_space_indent() {
        let mut doc = AnnotationDocument::new();
        doc.replace(RED, vec![polygon(&[(0, 0)])]);
        let json = encode_document(&doc).unwrap();
        assert!(json.starts_with("[\n    {\n        \"color\": {\n            \"r\": 255,"));
    }

    #[test]
    fn encode_orders_entries_by_color() {
        let mut doc = AnnotationDocument::new();
        doc.replace(PixelColor::rgba(9, 0, 0, 255), vec![square()]);
        doc.replace(PixelColor::rgba(3, 0, 0, 255), vec![square()]);
        let value: Value = serde_json::from_str(&encode_document(&doc).unwrap()).unwrap();
        assert_eq!(value[0]["color"]["r"], 3);
        assert_eq!(value[1]["color"]["r"], 9);
    }

    // --- decode ---

    #[test]
    fn round_trip_reconstructs_document() {
        let mut doc = AnnotationDocument::new();
        doc.replace(RED, vec![square(), polygon(&[(5, 5)])]);
        doc.replace(PixelColor::rgba(0, 0, 255, 128), vec![polygon(&[(-1, 3), (4, 3)])]);

        let decoded = decode_document(encode_document(&doc).unwrap().as_bytes());
        assert!(decoded.is_clean(), "issues: {:?}", decoded.issues);
        assert_eq!(decoded.document, doc);
    }

    #[test]
    fn entry_without_fields_is_skipped() {
        let decoded = decode_document(br#"[{"foo":1}]"#);
        assert!(decoded.document.is_empty());
        assert_eq!(
            decoded.issues,
            vec![
                DecodeIssue::MissingField {
                    entry: 0,
                    field: "color"
                },
                DecodeIssue::MissingField {
                    entry: 0,
                    field: "color_paths"
                },
            ]
        );
    }

    #[test]
    fn non_array_top_level_yields_empty_document() {
        let decoded = decode_document(br#"{"color": {}}"#);
        assert!(decoded.document.is_empty());
        assert_eq!(decoded.issues, vec![DecodeIssue::NotAnArray]);
    }

    #[test]
    fn malformed_json_yields_empty_document() {
        let decoded = decode_document(b"[{\"color\":");
        assert!(decoded.document.is_empty());
        assert!(matches!(decoded.issues[..], [DecodeIssue::Malformed(_)]));
    }

    #[test]
    fn missing_alpha_defaults_to_opaque() {
        let decoded = decode_document(
            br#"[{"color":{"r":1,"g":2,"b":3},"color_paths":[[{"x":0,"y":0}]]}]"#,
        );
        assert!(decoded.is_clean());
        assert!(decoded.document.contains(PixelColor::rgba(1, 2, 3, 255)));
    }

    #[test]
    fn missing_blue_skips_entry() {
        let decoded = decode_document(
            br#"[{"color":{"r":1,"g":2,"a":3},"color_paths":[[{"x":0,"y":0}]]},
                {"color":{"r":4,"g":5,"b":6},"color_paths":[[{"x":0,"y":0}]]}]"#,
        );
        assert_eq!(decoded.document.len(), 1);
        assert!(decoded.document.contains(PixelColor::rgb(4, 5, 6)));
        assert_eq!(
            decoded.issues,
            vec![DecodeIssue::MissingChannel {
                entry: 0,
                channel: "b"
            }]
        );
    }

    #[test]
    fn non_integer_channels_default_to_255() {
        let decoded = decode_document(
            br#"[{"color":{"r":1.5,"g":"x","b":300,"a":-1},"color_paths":[[{"x":0,"y":0}]]}]"#,
        );
        assert!(decoded.document.contains(PixelColor::rgba(255, 255, 255, 255)));
        assert_eq!(decoded.issues.len(), 4);
    }

    #[test]
    fn bad_points_are_dropped_and_empty_paths_omitted() {
        let decoded = decode_document(
            br#"[{"color":{"r":1,"g":2,"b":3,"a":4},"color_paths":[
                [{"x":1,"y":2},{"x":"a","y":3},{"y":4},5,{"x":6.9,"y":-7.9}],
                [{"x":null,"y":0}],
                "not a path",
                []
            ]}]"#,
        );
        let polygons = decoded.document.get(PixelColor::rgba(1, 2, 3, 4)).unwrap();
        assert_eq!(polygons, &[polygon(&[(1, 2), (6, -7)])]);
        assert_eq!(
            decoded.issues,
            vec![
                DecodeIssue::InvalidPoint {
                    entry: 0,
                    path: 0,
                    point: 1
                },
                DecodeIssue::InvalidPoint {
                    entry: 0,
                    path: 0,
                    point: 2
                },
                DecodeIssue::InvalidPoint {
                    entry: 0,
                    path: 0,
                    point: 3
                },
                DecodeIssue::InvalidPoint {
                    entry: 0,
                    path: 1,
                    point: 0
                },
                DecodeIssue::EmptyPath { entry: 0, path: 1 },
                DecodeIssue::PathNotArray { entry: 0, path: 2 },
                DecodeIssue::EmptyPath { entry: 0, path: 3 },
            ]
        );
    }

    #[test]
    fn out_of_range_coordinates_are_dropped() {
        let decoded = decode_document(
            br#"[{"color":{"r":1,"g":1,"b":1},"color_paths":[[{"x":3000000000,"y":0},{"x":1,"y":1}]]}]"#,
        );
        let polygons = decoded.document.get(PixelColor::rgb(1, 1, 1)).unwrap();
        assert_eq!(polygons, &[polygon(&[(1, 1)])]);
    }

    #[test]
    fn repeated_colors_are_merged_in_order() {
        let decoded = decode_document(
            br#"[{"color":{"r":1,"g":1,"b":1},"color_paths":[[{"x":1,"y":1}]]},
                {"color":{"r":1,"g":1,"b":1},"color_paths":[[{"x":2,"y":2}]]}]"#,
        );
        let polygons = decoded.document.get(PixelColor::rgb(1, 1, 1)).unwrap();
        assert_eq!(polygons, &[polygon(&[(1, 1)]), polygon(&[(2, 2)])]);
    }

    #[test]
    fn empty_paths_array_keeps_entry() {
        let decoded = decode_document(br#"[{"color":{"r":1,"g":1,"b":1},"color_paths":[]}]"#);
        assert!(decoded.is_clean());
        assert_eq!(decoded.document.get(PixelColor::rgb(1, 1, 1)).unwrap().len(), 0);
    }

    #[test]
    fn non_array_paths_skips_entry() {
        let decoded = decode_document(br#"[{"color":{"r":1,"g":1,"b":1},"color_paths":{}}]"#);
        assert!(decoded.document.is_empty());
        assert_eq!(decoded.issues, vec![DecodeIssue::PathsNotArray { entry: 0 }]);
    }

    #[test]
    fn issues_have_readable_messages() {
        let issue = DecodeIssue::InvalidPoint {
            entry: 2,
            path: 0,
            point: 7,
        };
        assert_eq!(
            issue.to_string(),
            "entry 2, path 0, point 7: expected numeric `x` and `y`; skipping point"
        );
    }
}
