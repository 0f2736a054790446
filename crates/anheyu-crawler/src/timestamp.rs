//! Timestamp normalization: every timestamp scraped off a friend site, in
//! whatever format that site's feed or theme happens to emit, is normalized
//! to `"YYYY-MM-DD HH:MM:SS"` against a closed list of 22 known formats.

use anheyu_clock::Clock;
use chrono::{DateTime, NaiveDateTime};

const OUTPUT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// The closed list of 22 formats tried in order; the first one that parses
/// wins. Covers RFC 1123/822 feed dates (numeric offset and named-timezone
/// variants), RFC 3339 in its common permutations, and the plain date/time
/// and locale short forms seen in theme-rendered HTML.
const FORMATS: &[&str] = &[
    "%a, %d %b %Y %H:%M:%S %z", // RFC 1123: "Mon, 02 Jan 2006 15:04:05 -0700"
    "%a, %d %b %Y %H:%M:%S GMT",
    "%a, %d %b %Y %H:%M:%S UTC",
    "%a, %d %b %Y %H:%M:%S EST",
    "%a, %d %b %Y %H:%M:%S PST",
    "%d %b %Y %H:%M:%S %z", // RFC 822 without weekday
    "%d %b %Y %H:%M:%S GMT",
    "%Y-%m-%dT%H:%M:%S%.f%:z", // RFC 3339 with fractional seconds, colon offset
    "%Y-%m-%dT%H:%M:%S%.fZ",   // RFC 3339 with fractional seconds, Z
    "%Y-%m-%dT%H:%M:%S%:z",    // RFC 3339, colon offset
    "%Y-%m-%dT%H:%M:%SZ",
    "%Y-%m-%dT%H:%M:%S%z", // RFC 3339, no-colon offset
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d %b %Y",    // "02 Jan 2006"
    "%b %d, %Y",   // "Jan 02, 2006"
    "%m/%d/%Y",    // US short form
    "%d-%m-%Y",    // EU short form
];

/// Parse `raw` against the closed format list and render it as
/// `"YYYY-MM-DD HH:MM:SS"`. An empty string becomes "now" in `clock`'s zone,
/// not the process's local zone. An unrecognized format is passed through
/// unchanged, per spec.
pub fn normalize(raw: &str, clock: &Clock) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return clock.now().format(OUTPUT_FORMAT).to_string();
    }

    for fmt in FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(raw, fmt) {
            return dt.format(OUTPUT_FORMAT).to_string();
        }
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return dt.format(OUTPUT_FORMAT).to_string();
        }
        if let Ok(date) = chrono::NaiveDate::parse_from_str(raw, fmt) {
            return date
                .and_hms_opt(0, 0, 0)
                .expect("midnight is always valid")
                .format(OUTPUT_FORMAT)
                .to_string();
        }
    }

    raw.to_string()
}
