use std::io::Cursor;
use std::str::FromStr;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Seconds between the Unix epoch and the legacy store's reference epoch
/// (2001-01-01T00:00:00Z). Legacy dates are REAL offsets from the latter.
pub const LEGACY_EPOCH_UNIX_SECS: i64 = 978_307_200;

/// Neutral gray emitted when an archived color cannot be decoded.
pub const COLOR_FALLBACK: i64 = 0x8080_80FF;

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Per-field fallback counters, folded into the run statistics. Decode
/// failures at this level never abort the run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ConvertCounts {
    pub color_fallbacks: u64,
    pub photo_list_fallbacks: u64,
    pub money_fallbacks: u64,
}

/// Convert a legacy reference-epoch offset into canonical UTC date text.
pub fn date_from_offset(offset_secs: f64) -> Option<String> {
    if !offset_secs.is_finite() {
        return None;
    }
    let unix = offset_secs + LEGACY_EPOCH_UNIX_SECS as f64;
    let secs = unix.floor() as i64;
    let nanos = ((unix - unix.floor()) * 1e9) as u32;
    DateTime::<Utc>::from_timestamp(secs, nanos).map(|dt| dt.format(DATE_FORMAT).to_string())
}

/// Exact decimal from the legacy textual form. The text is authoritative:
/// it is parsed only to prove it is a decimal, then re-emitted at the same
/// scale, so "99.90" stays "99.90".
pub fn decimal_from_text(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .ok()
        .map(|d| d.to_string())
}

/// Decimal derived from the binary floating-point form. Uses the shortest
/// round-trip rendering of the double, which recovers "99.99" from the
/// nearest representable double rather than its full base-2 expansion.
pub fn decimal_from_float(value: f64) -> Option<String> {
    if !value.is_finite() {
        return None;
    }
    let shortest = format!("{value}");
    decimal_from_text(&shortest)
}

/// Monetary cell conversion. The textual form wins whenever both storage
/// classes are available; the float path is a fallback only.
pub fn money_from_cell(text: Option<&str>, real: Option<f64>) -> Option<String> {
    if let Some(t) = text {
        if let Some(d) = decimal_from_text(t) {
            return Some(d);
        }
    }
    real.and_then(decimal_from_float)
}

/// One photo reference in the target store's canonical JSON list form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoRef {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

#[derive(Deserialize)]
struct PlistPhotoRef {
    path: String,
    #[serde(default)]
    created_at: Option<plist::Date>,
}

#[derive(Deserialize)]
struct JsonPhotoRef {
    path: String,
    #[serde(default)]
    created_at: Option<String>,
}

fn plist_date_to_text(date: plist::Date) -> String {
    let st: SystemTime = date.into();
    DateTime::<Utc>::from(st).format(DATE_FORMAT).to_string()
}

/// Decode a legacy photo-list cell into canonical JSON text.
///
/// Legacy cells are either an old binary property list or JSON text,
/// detected by byte content. The typed decode path runs first because the
/// generic path silently drops embedded dates; total failure degrades to an
/// empty list rather than aborting the run.
pub fn photo_list_from_cell(cell: Option<&[u8]>, counts: &mut ConvertCounts) -> String {
    let Some(bytes) = cell else {
        return "[]".to_string();
    };
    if bytes.is_empty() {
        return "[]".to_string();
    }

    let refs = if bytes.starts_with(b"bplist") {
        decode_plist_photos(bytes, counts)
    } else {
        decode_json_photos(bytes, counts)
    };

    serde_json::to_string(&refs).unwrap_or_else(|_| "[]".to_string())
}

fn decode_plist_photos(bytes: &[u8], counts: &mut ConvertCounts) -> Vec<PhotoRef> {
    if let Ok(typed) = plist::from_bytes::<Vec<PlistPhotoRef>>(bytes) {
        return typed
            .into_iter()
            .map(|p| PhotoRef {
                path: p.path,
                created_at: p.created_at.map(plist_date_to_text),
            })
            .collect();
    }

    // Generic decode keeps the paths but loses any non-string fields.
    counts.photo_list_fallbacks += 1;
    match plist::Value::from_reader(Cursor::new(bytes)) {
        Ok(plist::Value::Array(values)) => values
            .into_iter()
            .filter_map(|v| match v {
                plist::Value::String(s) => Some(PhotoRef {
                    path: s,
                    created_at: None,
                }),
                plist::Value::Dictionary(dict) => dict
                    .get("path")
                    .and_then(|p| p.as_string())
                    .map(|s| PhotoRef {
                        path: s.to_string(),
                        created_at: None,
                    }),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn decode_json_photos(bytes: &[u8], counts: &mut ConvertCounts) -> Vec<PhotoRef> {
    if let Ok(typed) = serde_json::from_slice::<Vec<JsonPhotoRef>>(bytes) {
        return typed
            .into_iter()
            .map(|p| PhotoRef {
                path: p.path,
                created_at: p.created_at,
            })
            .collect();
    }
    if let Ok(paths) = serde_json::from_slice::<Vec<String>>(bytes) {
        return paths
            .into_iter()
            .map(|path| PhotoRef {
                path,
                created_at: None,
            })
            .collect();
    }

    counts.photo_list_fallbacks += 1;
    match serde_json::from_slice::<serde_json::Value>(bytes) {
        Ok(serde_json::Value::Array(values)) => values
            .into_iter()
            .filter_map(|v| match v {
                serde_json::Value::String(s) => Some(PhotoRef {
                    path: s,
                    created_at: None,
                }),
                serde_json::Value::Object(map) => {
                    map.get("path").and_then(|p| p.as_str()).map(|s| PhotoRef {
                        path: s.to_string(),
                        created_at: None,
                    })
                }
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn pack_rgba(r: f64, g: f64, b: f64, a: f64) -> i64 {
    let channel = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as i64;
    (channel(r) << 24) | (channel(g) << 16) | (channel(b) << 8) | channel(a)
}

fn color_from_hex(text: &str) -> Option<i64> {
    let hex = text.trim().strip_prefix('#')?;
    match hex.len() {
        6 => i64::from_str_radix(hex, 16).ok().map(|rgb| (rgb << 8) | 0xFF),
        8 => i64::from_str_radix(hex, 16).ok(),
        _ => None,
    }
}

fn color_from_json(bytes: &[u8]) -> Option<i64> {
    let components: Vec<f64> = serde_json::from_slice(bytes).ok()?;
    match components.as_slice() {
        [r, g, b] => Some(pack_rgba(*r, *g, *b, 1.0)),
        [r, g, b, a] => Some(pack_rgba(*r, *g, *b, *a)),
        _ => None,
    }
}

fn color_from_plist(bytes: &[u8]) -> Option<i64> {
    let value = plist::Value::from_reader(Cursor::new(bytes)).ok()?;
    let dict = value.as_dictionary()?;
    let channel = |key: &str| dict.get(key).and_then(|v| v.as_real());
    Some(pack_rgba(
        channel("red")?,
        channel("green")?,
        channel("blue")?,
        channel("alpha").unwrap_or(1.0),
    ))
}

/// Decode an archived color value to a packed RGBA integer. A NULL cell
/// stays NULL; an unreadable cell becomes the gray sentinel and is counted,
/// never fatal.
pub fn color_from_cell(cell: Option<&[u8]>, counts: &mut ConvertCounts) -> Option<i64> {
    let bytes = cell?;
    if bytes.is_empty() {
        return None;
    }

    if let Ok(text) = std::str::from_utf8(bytes) {
        if let Some(packed) = color_from_hex(text) {
            return Some(packed);
        }
    }
    if let Some(packed) = color_from_json(bytes) {
        return Some(packed);
    }
    if bytes.starts_with(b"bplist") {
        if let Some(packed) = color_from_plist(bytes) {
            return Some(packed);
        }
    }

    counts.color_fallbacks += 1;
    Some(COLOR_FALLBACK)
}
