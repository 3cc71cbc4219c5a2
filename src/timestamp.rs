//! Timestamp encoding for stored records
//!
//! Records are written with the store's timestamp shape `{ seconds, nanos }`,
//! but older records and exports carry dates in several other shapes. Every
//! read path funnels through [`from_value`] so callers only ever see
//! `DateTime<Utc>`.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::{json, Value};

/// Encode a point in time in the store's timestamp shape
pub fn to_value(at: DateTime<Utc>) -> Value {
    json!({
        "seconds": at.timestamp(),
        "nanos": at.timestamp_subsec_nanos(),
    })
}

/// Decode any supported stored temporal representation
///
/// Accepted shapes:
/// - `{ "seconds": i64, "nanos": u32 }` (written by this crate)
/// - `{ "_seconds": i64, "_nanoseconds": u32 }` (store JSON exports)
/// - RFC 3339 strings and bare `YYYY-MM-DD` dates
/// - epoch milliseconds as a number
///
/// Anything else decodes to `None`.
pub fn from_value(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Object(map) => {
            let seconds = map
                .get("seconds")
                .or_else(|| map.get("_seconds"))?
                .as_i64()?;
            let nanos = map
                .get("nanos")
                .or_else(|| map.get("_nanoseconds"))
                .and_then(Value::as_u64)
                .unwrap_or(0);
            Utc.timestamp_opt(seconds, u32::try_from(nanos).ok()?).single()
        }
        Value::String(text) => parse_text(text),
        Value::Number(number) => {
            let millis = number
                .as_i64()
                .or_else(|| number.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))?;
            Utc.timestamp_millis_opt(millis).single()
        }
        _ => None,
    }
}

/// Parse a textual date (RFC 3339 or `YYYY-MM-DD`, midnight UTC)
pub fn parse_text(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(text) {
        return Some(at.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_shape_round_trips() {
        let at = Utc.with_ymd_and_hms(2026, 3, 2, 8, 30, 0).unwrap();
        assert_eq!(from_value(&to_value(at)), Some(at));
    }

    #[test]
    fn test_legacy_shapes() {
        let expected = Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap();

        assert_eq!(from_value(&json!("2026-03-02")), Some(expected));
        assert_eq!(from_value(&json!("2026-03-02T00:00:00Z")), Some(expected));
        assert_eq!(
            from_value(&json!({ "_seconds": expected.timestamp(), "_nanoseconds": 0 })),
            Some(expected)
        );
        assert_eq!(
            from_value(&json!(expected.timestamp_millis())),
            Some(expected)
        );
    }

    #[test]
    fn test_unreadable_values() {
        assert_eq!(from_value(&json!("last tuesday")), None);
        assert_eq!(from_value(&json!(null)), None);
        assert_eq!(from_value(&json!({ "nanos": 5 })), None);
    }
}
