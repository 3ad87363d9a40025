//! FHIR `date` / `dateTime` handling.
//!
//! Bundles assembled from several sources mix precisions (`2020`, `2020-05`,
//! `2020-05-17`, `2020-05-17T10:00:00-04:00`) and occasionally drop seconds or the
//! offset. Grouping compares calendar days as written; ordering compares instants.

use crate::error::{CoreError, Result};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, Month, OffsetDateTime, PrimitiveDateTime, Time};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FhirDateTime(pub OffsetDateTime);

impl FhirDateTime {
    /// Parse any FHIR date or dateTime precision into an instant.
    ///
    /// Partial values resolve to the start of the period they denote, at UTC.
    pub fn parse_lenient(raw: &str) -> Result<Self> {
        let s = raw.trim();
        if let Ok(datetime) = OffsetDateTime::parse(s, &Rfc3339) {
            return Ok(Self(datetime));
        }
        let date = parse_date_prefix(s)?;
        Ok(Self(PrimitiveDateTime::new(date, Time::MIDNIGHT).assume_utc()))
    }
}

/// Normalize a FHIR date/dateTime to the key used for grouping.
///
/// Full dates and dateTimes become `YYYY-MM-DD` of the calendar day as written (no
/// timezone shift). Year and year-month precision are kept as-is, so `2020` never
/// equals `2020-01-01`.
pub fn normalize_date(raw: &str) -> Result<String> {
    let s = raw.trim();
    match s.len() {
        4 | 7 => {
            parse_date_prefix(s)?;
            Ok(s.to_string())
        }
        _ => {
            let date = parse_date_prefix(s)?;
            Ok(format!(
                "{:04}-{:02}-{:02}",
                date.year(),
                u8::from(date.month()),
                date.day()
            ))
        }
    }
}

fn parse_date_prefix(s: &str) -> Result<Date> {
    let invalid = || CoreError::invalid_date_time(format!("Unrecognized FHIR date '{s}'"));

    match s.len() {
        4 => {
            let year: i32 = s.parse().map_err(|_| invalid())?;
            Date::from_calendar_date(year, Month::January, 1).map_err(|_| invalid())
        }
        7 => {
            let padded = format!("{s}-01");
            Ok(Date::parse(&padded, format_description!("[year]-[month]-[day]"))?)
        }
        len if len >= 10 => {
            let (day, rest) = s.split_at_checked(10).ok_or_else(invalid)?;
            if !(rest.is_empty() || rest.starts_with('T') || rest.starts_with(' ')) {
                return Err(invalid());
            }
            Ok(Date::parse(day, format_description!("[year]-[month]-[day]"))?)
        }
        _ => Err(invalid()),
    }
}
