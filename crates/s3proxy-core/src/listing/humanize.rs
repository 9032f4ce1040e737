//! Human-readable sizes and relative times for listing entries.

use chrono::{DateTime, Utc};

const SIZE_UNITS: [&str; 7] = ["B", "kB", "MB", "GB", "TB", "PB", "EB"];

const SECOND: i64 = 1;
const MINUTE: i64 = 60 * SECOND;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;
const WEEK: i64 = 7 * DAY;
const MONTH: i64 = 30 * DAY;
const YEAR: i64 = 12 * MONTH;
const LONG_TIME: i64 = 37 * YEAR;

#[derive(Debug, Clone, Copy)]
enum Label {
    Now,
    Fixed(&'static str),
    Count(&'static str, i64),
}

/// Upper bounds (exclusive) and the label used below each.
const MAGNITUDES: [(i64, Label); 17] = [
    (SECOND, Label::Now),
    (2 * SECOND, Label::Fixed("1 second")),
    (MINUTE, Label::Count("seconds", SECOND)),
    (2 * MINUTE, Label::Fixed("1 minute")),
    (HOUR, Label::Count("minutes", MINUTE)),
    (2 * HOUR, Label::Fixed("1 hour")),
    (DAY, Label::Count("hours", HOUR)),
    (2 * DAY, Label::Fixed("1 day")),
    (WEEK, Label::Count("days", DAY)),
    (2 * WEEK, Label::Fixed("1 week")),
    (MONTH, Label::Count("weeks", WEEK)),
    (2 * MONTH, Label::Fixed("1 month")),
    (YEAR, Label::Count("months", MONTH)),
    (18 * MONTH, Label::Fixed("1 year")),
    (2 * YEAR, Label::Fixed("2 years")),
    (LONG_TIME, Label::Count("years", YEAR)),
    (i64::MAX, Label::Fixed("a long while")),
];

/// Format a byte count with SI units, e.g. `1.0 kB` for 1024.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn bytes(size: u64) -> String {
    if size < 10 {
        return format!("{size} B");
    }
    let mut exp = 0;
    let mut scale: u64 = 1;
    while exp + 1 < SIZE_UNITS.len() && size / scale >= 1000 {
        scale *= 1000;
        exp += 1;
    }
    let val = ((size as f64 / scale as f64) * 10.0 + 0.5).floor() / 10.0;
    if val < 10.0 {
        format!("{val:.1} {}", SIZE_UNITS[exp])
    } else {
        format!("{val:.0} {}", SIZE_UNITS[exp])
    }
}

/// Describe `then` relative to `now`, e.g. `3 days ago` or `1 hour from now`.
#[must_use]
pub fn relative_time(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let (diff, suffix) = if then > now {
        ((then - now).num_seconds(), "from now")
    } else {
        ((now - then).num_seconds(), "ago")
    };

    let label = MAGNITUDES
        .iter()
        .find(|(bound, _)| diff < *bound)
        .map_or(Label::Fixed("a long while"), |(_, label)| *label);

    match label {
        Label::Now => "now".to_owned(),
        Label::Fixed(text) => format!("{text} {suffix}"),
        Label::Count(unit, div) => format!("{} {unit} {suffix}", diff / div),
    }
}
