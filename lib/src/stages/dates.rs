use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

use crate::error::Result;
use crate::snapshot::Snapshot;
use crate::stage::{Context, Stage};

/// Derives integer `year`, `month` (1-indexed) and `day` metadata from each
/// entry's `date` field, for permalinks and templates to consume. Entries
/// without a `date` are left untouched; a `date` that does not parse is a
/// stage error.
///
/// A `date` may be an ISO date or datetime string, a unix timestamp, or a
/// TOML front matter datetime.
#[derive(Debug, Default)]
pub struct Dates;

impl Stage for Dates {
    fn name(&self) -> &str {
        "dates"
    }

    fn run(&self, snapshot: &mut Snapshot, _: &mut Context) -> Result<()> {
        for (path, entry) in snapshot.iter_mut() {
            let date = match entry.meta("date") {
                None => continue,
                Some(value) => parse(value).ok_or_else(|| error! {
                    "unparseable date",
                    "path" => path,
                    "date" => value,
                })?,
            };

            entry.set_meta("year", date.year());
            entry.set_meta("month", date.month());
            entry.set_meta("day", date.day());
        }

        Ok(())
    }
}

fn parse(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::String(string) => parse_str(string),
        Value::Number(number) => number.as_i64()
            .and_then(|ts| DateTime::from_timestamp(ts, 0))
            .map(|datetime| datetime.date_naive()),
        // TOML front matter encodes datetimes as a single-key table.
        Value::Object(map) => map.get("$__toml_private_datetime")
            .and_then(Value::as_str)
            .and_then(parse_str),
        _ => None,
    }
}

fn parse_str(string: &str) -> Option<NaiveDate> {
    string.parse::<NaiveDate>().ok()
        .or_else(|| string.parse::<NaiveDateTime>().ok().map(|dt| dt.date()))
        .or_else(|| string.parse::<DateTime<Utc>>().ok().map(|dt| dt.date_naive()))
}
