//! Report identifiers and the measurement uid layout.
//!
//! A measurement uid looks like `20260124093015.412305_IT_webconnectivity_1a2b3c`:
//! UTC timestamp, country code, test name and a random suffix. The first ten
//! digits of the timestamp (year, month, day, hour) select the spool bucket.

use std::fmt;

use time::{Duration, OffsetDateTime, UtcOffset};

use crate::error::{ResolveError, Result};

/// Age below which a report is expected in the spool or on a peer collector.
pub const FRESH_HORIZON: Duration = Duration::hours(1);

const UID_FIELDS: usize = 4;
const HOUR_PREFIX_LEN: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportIdentifier {
    /// `input` of `None` matches the index's empty-string sentinel.
    Report {
        report_id: String,
        input: Option<String>,
    },
    MeasurementUid(String),
}

impl ReportIdentifier {
    pub fn report(report_id: impl Into<String>, input: Option<String>) -> Self {
        ReportIdentifier::Report {
            report_id: report_id.into(),
            input,
        }
    }

    pub fn uid(uid: impl Into<String>) -> Self {
        ReportIdentifier::MeasurementUid(uid.into())
    }

    pub fn measurement_uid(&self) -> Option<&str> {
        match self {
            ReportIdentifier::MeasurementUid(uid) => Some(uid),
            ReportIdentifier::Report { .. } => None,
        }
    }
}

impl fmt::Display for ReportIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportIdentifier::Report { report_id, input } => {
                write!(f, "{report_id} {}", input.as_deref().unwrap_or(""))
            }
            ReportIdentifier::MeasurementUid(uid) => write!(f, "{uid}"),
        }
    }
}

/// Borrowed view over the fields of a well-formed measurement uid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UidParts<'a> {
    pub uid: &'a str,
    pub timestamp: &'a str,
    pub country: &'a str,
    pub test_name: &'a str,
}

impl<'a> UidParts<'a> {
    pub fn parse(uid: &'a str) -> Result<Self> {
        let fields: Vec<&str> = uid.split('_').collect();
        if fields.len() != UID_FIELDS {
            return Err(malformed(uid, "expected 4 underscore-separated fields"));
        }
        let timestamp = fields[0];
        if !timestamp.starts_with("20") {
            return Err(malformed(uid, "timestamp does not start with 20"));
        }
        let hour = timestamp
            .get(..HOUR_PREFIX_LEN)
            .ok_or_else(|| malformed(uid, "timestamp shorter than an hour prefix"))?;
        if !hour.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed(uid, "non-numeric hour prefix"));
        }
        if !timestamp.bytes().all(|b| b.is_ascii_digit() || b == b'.') {
            return Err(malformed(uid, "timestamp is not digits and '.'"));
        }
        validate_component(uid, "country code", fields[1])?;
        validate_component(uid, "test name", fields[2])?;
        validate_component(uid, "suffix", fields[3])?;

        Ok(Self {
            uid,
            timestamp,
            country: fields[1],
            test_name: fields[2],
        })
    }

    /// `YYYYMMDDHH`
    pub fn hour(&self) -> &'a str {
        &self.timestamp[..HOUR_PREFIX_LEN]
    }

    pub fn bucket_name(&self) -> String {
        format!("{}_{}_{}", self.hour(), self.country, self.test_name)
    }

    pub fn file_name(&self, extension: &str) -> String {
        format!("{}.{}", self.uid, extension)
    }

    /// `<hour>_<cc>_<test>/<uid>.<ext>`, shared by the spool and peer hosts.
    pub fn relative_path(&self, extension: &str) -> String {
        format!("{}/{}", self.bucket_name(), self.file_name(extension))
    }
}

fn validate_component(uid: &str, field: &'static str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(malformed(uid, &format!("empty {field}")));
    }
    if value == "." || value == ".." || value.contains(['/', '\\', '\0']) {
        return Err(malformed(uid, &format!("invalid {field}")));
    }
    Ok(())
}

fn malformed(uid: &str, reason: &str) -> ResolveError {
    ResolveError::MalformedIdentifier(format!("{uid}: {reason}"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Fresh,
    Archived,
}

/// Classifies an identifier against `now - horizon`.
///
/// The uid is compared as a string against the cutoff rendered as
/// `YYYYMMDDHHMM`, so a uid stamped within the horizon sorts after it.
/// Report-id lookups carry no usable timestamp and are always archived.
pub fn classify(id: &ReportIdentifier, now: OffsetDateTime, horizon: Duration) -> Freshness {
    let uid = match id {
        ReportIdentifier::MeasurementUid(uid) => uid,
        ReportIdentifier::Report { .. } => return Freshness::Archived,
    };
    if UidParts::parse(uid).is_err() {
        return Freshness::Archived;
    }
    let cutoff = match now.checked_sub(horizon) {
        Some(cutoff) => minute_stamp(cutoff),
        None => return Freshness::Archived,
    };
    if uid.as_str() > cutoff.as_str() {
        Freshness::Fresh
    } else {
        Freshness::Archived
    }
}

fn minute_stamp(at: OffsetDateTime) -> String {
    let at = at.to_offset(UtcOffset::UTC);
    format!(
        "{:04}{:02}{:02}{:02}{:02}",
        at.year(),
        at.month() as u8,
        at.day(),
        at.hour(),
        at.minute()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::{Date, Month, Time};

    const UID: &str = "20260124093015.412305_IT_webconnectivity_01a2b3c4";

    fn at(hour: u8, minute: u8) -> OffsetDateTime {
        let date = Date::from_calendar_date(2026, Month::January, 24).expect("date");
        let time = Time::from_hms(hour, minute, 0).expect("time");
        date.with_time(time).assume_utc()
    }

    #[test]
    fn parse_uid_fields() {
        let parts = UidParts::parse(UID).expect("parse");
        assert_eq!(parts.hour(), "2026012409");
        assert_eq!(parts.country, "IT");
        assert_eq!(parts.test_name, "webconnectivity");
        assert_eq!(
            parts.relative_path("post"),
            "2026012409_IT_webconnectivity/20260124093015.412305_IT_webconnectivity_01a2b3c4.post"
        );
    }

    #[test]
    fn reject_wrong_field_count() {
        for uid in [
            "20260124093015_IT_webconnectivity",
            "20260124093015_IT_web_connectivity_01a2",
            "",
        ] {
            let err = UidParts::parse(uid).unwrap_err();
            assert!(matches!(err, ResolveError::MalformedIdentifier(_)), "{uid}");
        }
    }

    #[test]
    fn reject_non_numeric_hour() {
        let err = UidParts::parse("2026012x093015_IT_webconnectivity_01a2").unwrap_err();
        assert!(matches!(err, ResolveError::MalformedIdentifier(_)));
        let err = UidParts::parse("19990124093015_IT_webconnectivity_01a2").unwrap_err();
        assert!(matches!(err, ResolveError::MalformedIdentifier(_)));
        let err = UidParts::parse("2026012_IT_webconnectivity_01a2").unwrap_err();
        assert!(matches!(err, ResolveError::MalformedIdentifier(_)));
    }

    #[test]
    fn reject_path_components() {
        let err = UidParts::parse("20260124093015_../x_webconnectivity_01a2").unwrap_err();
        assert!(matches!(err, ResolveError::MalformedIdentifier(_)));
        let err = UidParts::parse("20260124093015_.._webconnectivity_01a2").unwrap_err();
        assert!(matches!(err, ResolveError::MalformedIdentifier(_)));
        for uid in [
            "2026012409/../../../secret_IT_web_x",
            "2026012409\\..\\x_IT_web_x",
            "20260124093015.4a_IT_web_x",
        ] {
            let err = UidParts::parse(uid).unwrap_err();
            assert!(matches!(err, ResolveError::MalformedIdentifier(_)), "{uid}");
        }
    }

    #[test]
    fn uid_within_horizon_is_fresh() {
        let id = ReportIdentifier::uid(UID);
        assert_eq!(classify(&id, at(10, 0), FRESH_HORIZON), Freshness::Fresh);
        assert_eq!(classify(&id, at(10, 30), FRESH_HORIZON), Freshness::Fresh);
    }

    #[test]
    fn uid_past_horizon_is_archived() {
        let id = ReportIdentifier::uid(UID);
        assert_eq!(classify(&id, at(10, 31), FRESH_HORIZON), Freshness::Archived);
        assert_eq!(classify(&id, at(23, 0), FRESH_HORIZON), Freshness::Archived);
    }

    #[test]
    fn report_form_is_archived() {
        let id = ReportIdentifier::report("20260124T093015Z_webconnectivity_IT_30722_n1_x", None);
        assert_eq!(classify(&id, at(9, 31), FRESH_HORIZON), Freshness::Archived);
    }

    #[test]
    fn malformed_uid_is_archived() {
        let id = ReportIdentifier::uid("not-a-uid");
        assert_eq!(classify(&id, at(9, 31), FRESH_HORIZON), Freshness::Archived);
    }
}
