use std::fmt::{self, Formatter};

use jiff::{civil::Time, tz::TimeZone, RoundMode, Timestamp, TimestampRound, Unit, Zoned};
use log::warn;

use crate::error::Error;
use crate::interval::{month::Month, IntervalTzLike};

/// A calendar month in a given timezone, from local midnight on the first day
/// to local midnight on the first day of the next month.
#[derive(PartialEq, Debug, Clone, Eq, PartialOrd, Ord, Hash)]
pub struct MonthTz {
    start: Zoned,
    end: Zoned,
    period: Period,
}

/// The absolute boundaries of a local month, and the hourly samples that
/// cover it.
///
/// The API serves samples for whole UTC hours.  A sample belongs to the
/// month in which its hour begins, so for a zone with a sub-hour offset
/// (e.g. Asia/Kolkata, local midnight at `18:30Z`) the request starts at the
/// first whole UTC hour after local midnight.  The requests of consecutive
/// months never overlap and leave no hour out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period {
    pub start_utc: Timestamp,
    pub end_utc: Timestamp,
    request_start: Timestamp,
    request_end: Timestamp,
}

/// Start instant and hour count of a local calendar month.
///
/// The number of hours is 24 times the number of days, minus one for a month
/// with a spring forward transition and plus one for a month with a fall back
/// transition.
pub fn compute_period(year: i64, month: i64, tz: &str) -> Result<Period, Error> {
    let tz = TimeZone::get(tz).map_err(|source| Error::InvalidTimezone {
        name: tz.to_string(),
        source,
    })?;
    let month = Month::new(year, month)?;
    Ok(MonthTz::new(month, &tz)?.period())
}

/// Local midnight on the first day of the month.  A midnight that falls into
/// a DST gap resolves to the first valid instant after it.
fn local_midnight(month: Month, tz: &TimeZone) -> Result<Zoned, Error> {
    month
        .start_date()?
        .to_datetime(Time::midnight())
        .to_zoned(tz.clone())
        .map_err(|_| invalid_period(month))
}

fn invalid_period(month: Month) -> Error {
    Error::InvalidPeriod {
        year: month.year().into(),
        month: month.month().into(),
    }
}

/// The first whole UTC hour at or after `ts`.
fn ceil_hour(ts: Timestamp) -> Result<Timestamp, jiff::Error> {
    ts.round(
        TimestampRound::new()
            .smallest(Unit::Hour)
            .mode(RoundMode::Ceil),
    )
}

impl MonthTz {
    /// Fails with `InvalidPeriod` if the month or the one after it are
    /// outside the supported range, e.g. 9999-12.
    pub fn new(month: Month, tz: &TimeZone) -> Result<MonthTz, Error> {
        let start = local_midnight(month, tz)?;
        let end = local_midnight(month.next(), tz)?;
        let period = Period::new(start.timestamp(), end.timestamp())
            .map_err(|_| invalid_period(month))?;
        Ok(MonthTz { start, end, period })
    }

    pub fn month(&self) -> Month {
        Month::containing(self.start.date())
    }

    pub fn time_zone(&self) -> &TimeZone {
        self.start.time_zone()
    }

    pub fn next(&self) -> Result<MonthTz, Error> {
        MonthTz::new(self.month().next(), self.time_zone())
    }

    pub fn period(&self) -> Period {
        self.period
    }
}

impl IntervalTzLike for MonthTz {
    fn start(&self) -> Zoned {
        self.start.clone()
    }
    fn end(&self) -> Zoned {
        self.end.clone()
    }
}

impl fmt::Display for MonthTz {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let out = format!(
            "[{}, {})",
            self.start.strftime("%Y-%m-%dT%H:%M:%S%:z"),
            self.end.strftime("%Y-%m-%dT%H:%M:%S%:z")
        );
        f.write_str(&out)
    }
}

impl Period {
    fn new(start_utc: Timestamp, end_utc: Timestamp) -> Result<Period, jiff::Error> {
        let period = Period {
            start_utc,
            end_utc,
            request_start: ceil_hour(start_utc)?,
            request_end: ceil_hour(end_utc)?,
        };
        if period.request_start != start_utc || period.request_end != end_utc {
            warn!(
                "Period [{}, {}) is not on whole UTC hours, requesting the hours beginning in [{}, {})",
                start_utc, end_utc, period.request_start, period.request_end
            );
        }
        Ok(period)
    }

    /// Elapsed hours between the two boundaries.  Fractional only for zones
    /// whose DST shift is not a whole hour.
    pub fn hour_count(&self) -> f64 {
        self.end_utc.duration_since(self.start_utc).as_secs_f64() / 3600.0
    }

    /// UTC hour of the first sample to request.
    pub fn request_start(&self) -> Timestamp {
        self.request_start
    }

    /// Number of hourly samples to request: the UTC hours that begin within
    /// the period.  Differs from `hour_count` only for zones with sub-hour
    /// offsets or DST shifts.
    pub fn sample_count(&self) -> u32 {
        let hours = self.request_end.duration_since(self.request_start).as_hours();
        u32::try_from(hours).unwrap_or(0)
    }
}
