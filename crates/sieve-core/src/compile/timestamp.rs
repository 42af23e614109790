//! Timestamp literals.
//!
//! A timestamp is either ISO 8601 text (a date, a date with time, with or
//! without an offset) or an anchor such as `today`, optionally shifted by an
//! ISO 8601 period: `today-P1D`, `now+PT6H`, `som+P1M`. Dates and times
//! without an offset are read as UTC.

use std::fmt;
use thiserror::Error as ThisError;
use time::{
    Date, Duration, Month, OffsetDateTime, PrimitiveDateTime,
    format_description::well_known::{Iso8601, Rfc3339},
};

///
/// TimestampError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum TimestampError {
    #[error("expected '+', '-' or ' ' after anchor '{anchor}', got '{found}'")]
    AnchorOperator { anchor: Anchor, found: char },

    #[error("invalid period '{period}': {reason}")]
    Period { period: String, reason: &'static str },

    #[error("{0}")]
    Format(String),

    #[error("date arithmetic overflowed")]
    Overflow,
}

///
/// Anchor
///
/// Named reference points, resolved against the current UTC time. Every
/// anchor but `now` falls on midnight.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Anchor {
    Now,
    Today,
    Tomorrow,
    Yesterday,
    /// Start of the week (Monday).
    StartOfWeek,
    StartOfMonth,
    StartOfYear,
}

impl Anchor {
    pub const ALL: [Self; 7] = [
        Self::Now,
        Self::Today,
        Self::Tomorrow,
        Self::Yesterday,
        Self::StartOfWeek,
        Self::StartOfMonth,
        Self::StartOfYear,
    ];

    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Now => "now",
            Self::Today => "today",
            Self::Tomorrow => "tomorrow",
            Self::Yesterday => "yesterday",
            Self::StartOfWeek => "sow",
            Self::StartOfMonth => "som",
            Self::StartOfYear => "soy",
        }
    }

    /// The anchor `text` starts with, if any.
    fn prefix_of(text: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|anchor| {
            text.get(..anchor.keyword().len())
                .is_some_and(|head| head.eq_ignore_ascii_case(anchor.keyword()))
        })
    }

    fn resolve(self, now: OffsetDateTime) -> Result<OffsetDateTime, TimestampError> {
        let today = now.date();
        let date = match self {
            Self::Now => return Ok(now),
            Self::Today => today,
            Self::Tomorrow => today.next_day().ok_or(TimestampError::Overflow)?,
            Self::Yesterday => today.previous_day().ok_or(TimestampError::Overflow)?,
            Self::StartOfWeek => {
                let back = i64::from(today.weekday().number_days_from_monday());
                today
                    .checked_sub(Duration::days(back))
                    .ok_or(TimestampError::Overflow)?
            }
            Self::StartOfMonth => today.replace_day(1).map_err(|_| TimestampError::Overflow)?,
            Self::StartOfYear => Date::from_calendar_date(today.year(), Month::January, 1)
                .map_err(|_| TimestampError::Overflow)?,
        };

        Ok(date.midnight().assume_utc())
    }
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Resolve a timestamp literal relative to `now`.
pub fn resolve_timestamp(
    raw: &str,
    now: OffsetDateTime,
) -> Result<OffsetDateTime, TimestampError> {
    let Some(anchor) = Anchor::prefix_of(raw) else {
        return parse_iso(raw);
    };

    let base = anchor.resolve(now)?;
    let rest = &raw[anchor.keyword().len()..];
    let mut chars = rest.chars();
    let Some(sign) = chars.next() else {
        return Ok(base);
    };

    let period = Period::parse(chars.as_str())?;
    match sign {
        '+' | ' ' => period.add_to(base),
        '-' => period.negated().add_to(base),
        found => Err(TimestampError::AnchorOperator { anchor, found }),
    }
}

// ----------------------------------------------------------------------
// ISO 8601 text
// ----------------------------------------------------------------------

fn parse_iso(raw: &str) -> Result<OffsetDateTime, TimestampError> {
    if let Ok(parsed) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Ok(parsed);
    }

    // reduced precision: `2024` and `2024-03` mean the first day
    let expanded = match raw.len() {
        4 if raw.bytes().all(|b| b.is_ascii_digit()) => format!("{raw}-01-01"),
        7 if raw.as_bytes()[4] == b'-' => format!("{raw}-01"),
        _ => raw.to_string(),
    };

    if let Ok(parsed) = OffsetDateTime::parse(&expanded, &Iso8601::DEFAULT) {
        return Ok(parsed);
    }
    if let Ok(parsed) = PrimitiveDateTime::parse(&expanded, &Iso8601::DEFAULT) {
        return Ok(parsed.assume_utc());
    }

    Date::parse(&expanded, &Iso8601::DEFAULT)
        .map(|date| date.midnight().assume_utc())
        .map_err(|err| TimestampError::Format(err.to_string()))
}

// ----------------------------------------------------------------------
// Period
// ----------------------------------------------------------------------

// Designators in the order they may appear, before and after `T`.
const DATE_DESIGNATORS: [u8; 4] = [b'Y', b'M', b'W', b'D'];
const TIME_DESIGNATORS: [u8; 3] = [b'H', b'M', b'S'];

///
/// Period
///
/// ISO 8601 period (`P1Y2M3W4DT5H6M7.5S`). Years and months move along the
/// calendar, clamping the day of month; the remaining fields are fixed
/// lengths.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Period {
    pub years: i64,
    pub months: i64,
    pub weeks: i64,
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
    pub nanos: i64,
}

impl Period {
    pub fn parse(text: &str) -> Result<Self, TimestampError> {
        let invalid = |reason| TimestampError::Period {
            period: text.to_string(),
            reason,
        };

        let body = match text.as_bytes().first() {
            Some(b'P' | b'p') => &text[1..],
            _ => return Err(invalid("must start with 'P'")),
        };
        if body.is_empty() {
            return Err(invalid("no fields"));
        }

        let mut period = Self::default();
        let mut in_time = false;
        let mut next = 0;
        let mut fields = 0;
        let mut rest = body;

        while !rest.is_empty() {
            if rest.as_bytes()[0].eq_ignore_ascii_case(&b'T') {
                if in_time {
                    return Err(invalid("'T' given twice"));
                }
                in_time = true;
                next = 0;
                rest = &rest[1..];
                if rest.is_empty() {
                    return Err(invalid("no time fields after 'T'"));
                }
                continue;
            }

            let number_len = rest
                .bytes()
                .enumerate()
                .take_while(|&(i, b)| {
                    b.is_ascii_digit() || matches!(b, b'.' | b',') || (i == 0 && b == b'-')
                })
                .count();
            let (number, tail) = rest.split_at(number_len);
            let Some(designator) = tail
                .bytes()
                .next()
                .filter(u8::is_ascii_alphabetic)
                .map(|b| b.to_ascii_uppercase())
            else {
                return Err(invalid("expected a designator after each number"));
            };
            rest = &tail[1..];

            let order: &[u8] = if in_time {
                &TIME_DESIGNATORS
            } else {
                &DATE_DESIGNATORS
            };
            let Some(position) = order[next..].iter().position(|&d| d == designator) else {
                return Err(invalid("unknown or out-of-order designator"));
            };
            next += position + 1;

            let (whole, fraction) = match number.split_once(['.', ',']) {
                Some((whole, fraction)) => (whole, Some(fraction)),
                None => (number, None),
            };
            let value: i64 = whole.parse().map_err(|_| invalid("malformed number"))?;
            fields += 1;

            match (in_time, designator) {
                (true, b'S') => {
                    period.seconds = value;
                    if let Some(fraction) = fraction {
                        period.nanos =
                            parse_nanos(fraction).ok_or_else(|| invalid("malformed fraction"))?;
                        if whole.starts_with('-') {
                            period.nanos = -period.nanos;
                        }
                    }
                }
                _ if fraction.is_some() => return Err(invalid("only seconds may be fractional")),
                (false, b'Y') => period.years = value,
                (false, b'M') => period.months = value,
                (false, b'W') => period.weeks = value,
                (false, b'D') => period.days = value,
                (true, b'H') => period.hours = value,
                (true, b'M') => period.minutes = value,
                _ => return Err(invalid("unknown or out-of-order designator")),
            }
        }

        if fields == 0 {
            return Err(invalid("no fields"));
        }

        Ok(period)
    }

    #[must_use]
    pub const fn negated(self) -> Self {
        Self {
            years: -self.years,
            months: -self.months,
            weeks: -self.weeks,
            days: -self.days,
            hours: -self.hours,
            minutes: -self.minutes,
            seconds: -self.seconds,
            nanos: -self.nanos,
        }
    }

    /// Shift `at` by this period: years, then months, then the fixed fields.
    pub fn add_to(self, at: OffsetDateTime) -> Result<OffsetDateTime, TimestampError> {
        let years_in_months = self.years.checked_mul(12).ok_or(TimestampError::Overflow)?;
        let at = shift_months(at, years_in_months)?;
        let at = shift_months(at, self.months)?;

        let seconds = [
            (self.weeks, 604_800),
            (self.days, 86_400),
            (self.hours, 3_600),
            (self.minutes, 60),
            (self.seconds, 1),
        ]
        .into_iter()
        .try_fold(0i64, |total, (count, unit)| {
            count.checked_mul(unit).and_then(|s| total.checked_add(s))
        })
        .ok_or(TimestampError::Overflow)?;
        let shift = Duration::seconds(seconds)
            .checked_add(Duration::nanoseconds(self.nanos))
            .ok_or(TimestampError::Overflow)?;

        at.checked_add(shift).ok_or(TimestampError::Overflow)
    }
}

fn parse_nanos(fraction: &str) -> Option<i64> {
    if fraction.is_empty() || fraction.len() > 9 {
        return None;
    }
    if !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let digits: i64 = fraction.parse().ok()?;
    let scale = 10i64.pow(9 - u32::try_from(fraction.len()).ok()?);

    Some(digits * scale)
}

fn shift_months(at: OffsetDateTime, months: i64) -> Result<OffsetDateTime, TimestampError> {
    if months == 0 {
        return Ok(at);
    }

    let date = at.date();
    let index = i64::from(date.year())
        .checked_mul(12)
        .and_then(|m| m.checked_add(i64::from(u8::from(date.month())) - 1))
        .and_then(|m| m.checked_add(months))
        .ok_or(TimestampError::Overflow)?;

    let year = i32::try_from(index.div_euclid(12)).map_err(|_| TimestampError::Overflow)?;
    let month = u8::try_from(index.rem_euclid(12) + 1)
        .ok()
        .and_then(|m| Month::try_from(m).ok())
        .ok_or(TimestampError::Overflow)?;
    let day = date.day().min(month.length(year));
    let date =
        Date::from_calendar_date(year, month, day).map_err(|_| TimestampError::Overflow)?;

    Ok(at.replace_date(date))
}
