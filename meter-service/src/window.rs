//! Resolution of symbolic query windows into concrete instants.
//!
//! Every wall-clock boundary is taken in the business offset (UTC+8), whatever
//! offset `now` or a client-supplied instant arrives in.

use meter_client::domain::BUSINESS_OFFSET;
use time::{
    format_description::{well_known::Rfc3339, FormatItem},
    macros::{format_description, time},
    Date, Duration, OffsetDateTime, PrimitiveDateTime, Time,
};

use crate::error::CoreError;

const BUSINESS_OPEN: Time = time!(08:00);
const DAY_SHIFT_END: Time = time!(17:00);
const NIGHT_SHIFT_START: Time = time!(19:00);
const NIGHT_SHIFT_END: Time = time!(05:00);

type Format = &'static [FormatItem<'static>];

/// ISO-8601 forms with an explicit offset that RFC 3339 does not cover:
/// minute precision and the basic `+HHMM` offset.
const OFFSET_FORMATS: &[Format] = &[
    format_description!("[year]-[month]-[day]T[hour]:[minute][offset_hour sign:mandatory]:[offset_minute]"),
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second][offset_hour sign:mandatory]:[offset_minute]"),
    format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond][offset_hour sign:mandatory]:[offset_minute]"
    ),
    format_description!("[year]-[month]-[day]T[hour]:[minute][offset_hour sign:mandatory][offset_minute]"),
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second][offset_hour sign:mandatory][offset_minute]"),
    format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond][offset_hour sign:mandatory][offset_minute]"
    ),
];

const NAIVE_FORMATS: &[Format] = &[
    format_description!("[year]-[month]-[day]T[hour]:[minute]"),
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]"),
];

const DATE_ONLY: Format = format_description!("[year]-[month]-[day]");

/// A window as requested by a client, before resolution against a clock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowRequest {
    Custom { start: String, end: String },
    DayShift,
    NightShift,
    SinceMorning,
    SinceBusinessOpen,
}

impl WindowRequest {
    /// Build a request from a kind name and the optional custom bounds.
    pub fn from_parts(kind: &str, start: Option<&str>, end: Option<&str>) -> Result<Self, CoreError> {
        match kind {
            "custom" => {
                let start = start.ok_or_else(|| CoreError::InvalidTimeFormat("start_iso is required".to_string()))?;
                let end = end.ok_or_else(|| CoreError::InvalidTimeFormat("end_iso is required".to_string()))?;
                Ok(WindowRequest::Custom {
                    start: start.to_string(),
                    end: end.to_string(),
                })
            }
            "day_shift" => Ok(WindowRequest::DayShift),
            "night_shift" => Ok(WindowRequest::NightShift),
            "since_morning" => Ok(WindowRequest::SinceMorning),
            "since_business_open" => Ok(WindowRequest::SinceBusinessOpen),
            other => Err(CoreError::UnknownWindowKind(other.to_string())),
        }
    }
}

/// Closed interval `[start, end]`. `end == None` means "up to the most recent
/// sample".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: OffsetDateTime,
    pub end: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedWindow {
    Active(Window),
    /// The business day has not started yet; totals are zero by definition.
    NotYetOpen,
}

impl ResolvedWindow {
    pub fn active(self) -> Option<Window> {
        match self {
            ResolvedWindow::Active(w) => Some(w),
            ResolvedWindow::NotYetOpen => None,
        }
    }
}

fn at_local(date: Date, time: Time) -> OffsetDateTime {
    PrimitiveDateTime::new(date, time).assume_offset(BUSINESS_OFFSET)
}

fn truncate_subsecond(ts: OffsetDateTime) -> OffsetDateTime {
    ts - Duration::nanoseconds(i64::from(ts.nanosecond()))
}

/// Space separator becomes `T`, trailing `Z` becomes `+00:00`.
fn normalize_iso(s: &str) -> String {
    let mut out = if s.len() > 10 && s.as_bytes()[10] == b' ' {
        format!("{}T{}", &s[..10], &s[11..])
    } else {
        s.to_string()
    };
    if out.ends_with(['Z', 'z']) {
        out.pop();
        out.push_str("+00:00");
    }
    out
}

/// Parse an ISO-8601 instant and express it in business time.
///
/// Offset-carrying strings keep their offset; strings without one are read
/// as UTC, a bare date as UTC midnight. Seconds and fractions are optional
/// and the offset may be extended (`+08:00`) or basic (`+0800`).
pub fn parse_instant(s: &str) -> Result<OffsetDateTime, CoreError> {
    let s = s.trim();
    if let Ok(ts) = OffsetDateTime::parse(s, &Rfc3339) {
        return Ok(ts.to_offset(BUSINESS_OFFSET));
    }

    let normalized = normalize_iso(s);
    let parsed = OFFSET_FORMATS
        .iter()
        .find_map(|f| OffsetDateTime::parse(&normalized, *f).ok())
        .or_else(|| {
            NAIVE_FORMATS
                .iter()
                .find_map(|f| PrimitiveDateTime::parse(&normalized, *f).ok())
                .map(PrimitiveDateTime::assume_utc)
        })
        .or_else(|| Date::parse(&normalized, DATE_ONLY).ok().map(|d| d.midnight().assume_utc()))
        .ok_or_else(|| CoreError::InvalidTimeFormat(format!("'{s}' is not an ISO-8601 instant")))?;

    Ok(parsed.to_offset(BUSINESS_OFFSET))
}

pub fn resolve(request: &WindowRequest, now: OffsetDateTime) -> Result<ResolvedWindow, CoreError> {
    let now = now.to_offset(BUSINESS_OFFSET);
    let today = now.date();
    let yesterday = today.saturating_sub(Duration::DAY);

    let window = match request {
        WindowRequest::Custom { start, end } => Window {
            start: parse_instant(start)?,
            end: Some(parse_instant(end)?),
        },
        WindowRequest::DayShift => Window {
            start: at_local(yesterday, BUSINESS_OPEN),
            end: Some(at_local(yesterday, DAY_SHIFT_END)),
        },
        // Crosses midnight: starts the previous evening, ends this morning.
        WindowRequest::NightShift => Window {
            start: at_local(yesterday, NIGHT_SHIFT_START),
            end: Some(at_local(today, NIGHT_SHIFT_END)),
        },
        WindowRequest::SinceMorning => Window {
            start: at_local(today, BUSINESS_OPEN),
            end: Some(truncate_subsecond(now)),
        },
        WindowRequest::SinceBusinessOpen => {
            let open = at_local(today, BUSINESS_OPEN);
            if now < open {
                return Ok(ResolvedWindow::NotYetOpen);
            }
            Window { start: open, end: None }
        }
    };

    Ok(ResolvedWindow::Active(window))
}
